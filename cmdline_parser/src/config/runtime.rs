// RUNTIME PREFERENCES (User Experience)

use crate::completion::StaticCandidates;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserPreferences {
    /// Whether an argument name without `=` is accepted as a flag
    pub allow_flag_arguments: bool,

    /// Whether a backslash followed by a newline joins two physical lines
    pub join_continuation_lines: bool,

    /// Whether to log every state transition at debug level
    pub trace_state_transitions: bool,
}

impl Default for ParserPreferences {
    fn default() -> Self {
        Self {
            allow_flag_arguments: env::var(env_vars::PARSER_ALLOW_FLAGS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            join_continuation_lines: env::var(env_vars::PARSER_JOIN_CONTINUATIONS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            trace_state_transitions: env::var(env_vars::PARSER_TRACE_TRANSITIONS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionPreferences {
    /// Whether closing delimiters and separators are offered as candidates
    pub include_structural_candidates: bool,

    /// Whether the partial token must match candidates case-sensitively
    pub case_sensitive: bool,
}

impl Default for CompletionPreferences {
    fn default() -> Self {
        Self {
            include_structural_candidates: env::var(env_vars::COMPLETION_STRUCTURAL)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            case_sensitive: env::var(env_vars::COMPLETION_CASE_SENSITIVE)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingPreferences {
    /// Whether to use structured JSON logging
    pub use_structured_logging: bool,

    /// Whether to enable console output
    pub enable_console_logging: bool,

    /// Preferred minimum log level
    pub min_log_level: LogLevel,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env::var(env_vars::LOGGING_USE_STRUCTURED)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            enable_console_logging: env::var(env_vars::LOGGING_ENABLE_CONSOLE)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            min_log_level: env::var(env_vars::LOGGING_MIN_LEVEL)
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Info),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Convert to events::LogLevel
    pub fn to_events_log_level(&self) -> crate::logging::events::LogLevel {
        match self {
            LogLevel::Error => crate::logging::events::LogLevel::Error,
            LogLevel::Warning => crate::logging::events::LogLevel::Warning,
            LogLevel::Info => crate::logging::events::LogLevel::Info,
            LogLevel::Debug => crate::logging::events::LogLevel::Debug,
        }
    }
}

/// Parse log level from string (used for environment variables)
fn parse_log_level(level: &str) -> Option<LogLevel> {
    match level.to_lowercase().as_str() {
        "error" | "0" => Some(LogLevel::Error),
        "warning" | "warn" | "1" => Some(LogLevel::Warning),
        "info" | "2" => Some(LogLevel::Info),
        "debug" | "3" => Some(LogLevel::Debug),
        _ => None,
    }
}

/// Errors raised while loading a preferences file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in '{path}': {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub parser: ParserPreferences,
    pub completion: CompletionPreferences,
    pub logging: LoggingPreferences,
    /// Domain candidates offered by the binary's completion
    pub candidates: StaticCandidates,
}

impl RuntimeConfig {
    /// Parse preferences from TOML text; missing sections keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load preferences from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&text).map_err(|source| ConfigError::Toml {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Environment variable names for configuration
pub mod env_vars {
    // Parser
    pub const PARSER_ALLOW_FLAGS: &str = "CLI_PARSER_ALLOW_FLAGS";
    pub const PARSER_JOIN_CONTINUATIONS: &str = "CLI_PARSER_JOIN_CONTINUATIONS";
    pub const PARSER_TRACE_TRANSITIONS: &str = "CLI_PARSER_TRACE_TRANSITIONS";

    // Completion
    pub const COMPLETION_STRUCTURAL: &str = "CLI_COMPLETION_STRUCTURAL";
    pub const COMPLETION_CASE_SENSITIVE: &str = "CLI_COMPLETION_CASE_SENSITIVE";

    // Logging
    pub const LOGGING_USE_STRUCTURED: &str = "CLI_LOGGING_USE_STRUCTURED";
    pub const LOGGING_ENABLE_CONSOLE: &str = "CLI_LOGGING_ENABLE_CONSOLE";
    pub const LOGGING_MIN_LEVEL: &str = "CLI_LOGGING_MIN_LEVEL";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("error"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("ERROR"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("warn"), Some(LogLevel::Warning));
        assert_eq!(parse_log_level("2"), Some(LogLevel::Info));
        assert_eq!(parse_log_level("debug"), Some(LogLevel::Debug));
        assert_eq!(parse_log_level("invalid"), None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [parser]
            allow_flag_arguments = false

            [logging]
            min_log_level = "debug"
            "#,
        )
        .unwrap();

        assert!(!config.parser.allow_flag_arguments);
        assert_eq!(config.logging.min_log_level, LogLevel::Debug);
        assert_eq!(config.completion, CompletionPreferences::default());
    }

    #[test]
    fn test_candidates_table() {
        use crate::completion::{CompletionEngine, StaticCandidates};

        let config = RuntimeConfig::from_toml_str(
            r#"
            [candidates]
            commands = ["deploy", "ls"]
            operations = ["read-resource"]

            [candidates.arguments]
            read-resource = ["recursive"]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.candidates,
            StaticCandidates::new()
                .with_commands(&["deploy", "ls"])
                .with_operations(&["read-resource"])
                .with_arguments("read-resource", &["recursive"])
        );

        let engine = CompletionEngine::with_preferences(
            config.candidates,
            config.parser,
            config.completion,
        );
        assert_eq!(engine.complete("de", 2), vec!["deploy"]);
        assert_eq!(engine.complete(":read-resource(rec", 18), vec!["recursive"]);
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(RuntimeConfig::from_toml_str("[parser]\nallow_flag_arguments = 3").is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = RuntimeConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
