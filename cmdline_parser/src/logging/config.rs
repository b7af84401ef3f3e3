//! Configuration module for logging
//!
//! Combines the compile-time limits generated by build.rs with the runtime
//! preferences chosen by the embedding application.

use crate::config::compile_time::logging::{
    LOG_BUFFER_SIZE, MAX_LOG_MESSAGE_LENGTH, SECURITY_MIN_LOG_LEVEL,
};
use crate::config::runtime::LoggingPreferences;
use std::sync::OnceLock;

type EventsLogLevel = crate::logging::events::LogLevel;

static RUNTIME_PREFERENCES: OnceLock<LoggingPreferences> = OnceLock::new();

/// Initialize runtime preferences
pub fn init_runtime_preferences(preferences: LoggingPreferences) -> Result<(), String> {
    RUNTIME_PREFERENCES
        .set(preferences)
        .map_err(|_| "Runtime preferences already initialized".to_string())
}

/// Get runtime preferences (with fallback to defaults)
fn get_runtime_preferences() -> LoggingPreferences {
    RUNTIME_PREFERENCES.get().cloned().unwrap_or_default()
}

/// Minimum level requested by the user
pub fn get_min_log_level() -> EventsLogLevel {
    get_runtime_preferences().min_log_level.to_events_log_level()
}

/// Level at or below which halting errors are always emitted
pub fn get_security_log_level() -> EventsLogLevel {
    EventsLogLevel::from_u8(SECURITY_MIN_LOG_LEVEL)
}

pub fn use_structured_logging() -> bool {
    get_runtime_preferences().use_structured_logging
}

pub fn use_console_logging() -> bool {
    get_runtime_preferences().enable_console_logging
}

/// Capacity of the in-memory logger
pub fn get_log_buffer_size() -> usize {
    LOG_BUFFER_SIZE
}

/// Messages longer than this are truncated before emission
pub fn get_max_log_message_length() -> usize {
    MAX_LOG_MESSAGE_LENGTH
}

/// Truncate a message to the configured length on a char boundary
pub fn clamp_message(message: &str) -> &str {
    let limit = get_max_log_message_length();
    if message.len() <= limit {
        return message;
    }

    let mut end = limit;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    &message[..end]
}

/// Validate current configuration settings
pub fn validate_config() -> Result<(), String> {
    if LOG_BUFFER_SIZE == 0 {
        return Err("Log buffer size must be positive".to_string());
    }

    if MAX_LOG_MESSAGE_LENGTH < 16 {
        return Err(format!(
            "Max log message length too small: {}",
            MAX_LOG_MESSAGE_LENGTH
        ));
    }

    if SECURITY_MIN_LOG_LEVEL > 2 {
        return Err(format!(
            "Security minimum log level must be error, warning or info, got {}",
            SECURITY_MIN_LOG_LEVEL
        ));
    }

    Ok(())
}

/// Get configuration summary for diagnostics
pub fn get_config_summary() -> String {
    let preferences = get_runtime_preferences();

    format!(
        "Logging Configuration:\n\
         === Compile-time ===\n\
         - Log buffer size: {}\n\
         - Max message length: {}\n\
         - Security min level: {}\n\
         === Runtime ===\n\
         - Min log level: {:?}\n\
         - Structured logging: {}\n\
         - Console logging: {}",
        LOG_BUFFER_SIZE,
        MAX_LOG_MESSAGE_LENGTH,
        SECURITY_MIN_LOG_LEVEL,
        preferences.min_log_level,
        preferences.use_structured_logging,
        preferences.enable_console_logging,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(validate_config().is_ok());
    }

    #[test]
    fn test_security_level_is_warning_or_stricter_in_shipped_profiles() {
        assert!(get_security_log_level() <= EventsLogLevel::Info);
    }

    #[test]
    fn test_clamp_message_respects_char_boundaries() {
        let short = "fine";
        assert_eq!(clamp_message(short), short);

        let long = "é".repeat(get_max_log_message_length());
        let clamped = clamp_message(&long);
        assert!(clamped.len() <= get_max_log_message_length());
        assert!(clamped.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_summary_mentions_limits() {
        let summary = get_config_summary();
        assert!(summary.contains("Log buffer size"));
        assert!(summary.contains("Min log level"));
    }
}
