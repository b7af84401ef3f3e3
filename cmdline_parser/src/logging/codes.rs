//! Consolidated error codes and classification system
//!
//! Single source of truth for all codes, their metadata, and classification functions.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for a code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        requires_halt: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            requires_halt,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

/// Parsing (format) error codes
pub mod parsing {
    use super::Code;

    pub const UNEXPECTED_CHARACTER: Code = Code::new("E020");
    pub const UNTERMINATED_QUOTE: Code = Code::new("E021");
    pub const UNTERMINATED_BACK_QUOTE: Code = Code::new("E022");
    pub const UNTERMINATED_EXPRESSION: Code = Code::new("E023");
    pub const UNTERMINATED_COMPOSITE: Code = Code::new("E024");
    pub const MISSING_VALUE: Code = Code::new("E025");
    pub const TRAILING_SEPARATOR: Code = Code::new("E026");
    pub const DANGLING_ESCAPE: Code = Code::new("E027");
    pub const NESTING_TOO_DEEP: Code = Code::new("E028");
    pub const INPUT_TOO_LONG: Code = Code::new("E029");
    pub const CONTEXT_NOT_RESET: Code = Code::new("E030");
    pub const TOO_MANY_ARGUMENTS: Code = Code::new("E031");
}

/// Request construction error codes
pub mod request {
    use super::Code;

    pub const NODE_TYPE_WITHOUT_NAME: Code = Code::new("E060");
    pub const MISSING_OPERATION: Code = Code::new("E061");
    pub const NOT_AN_OPERATION: Code = Code::new("E062");
    pub const PARENT_OF_ROOT: Code = Code::new("E063");
    pub const UNRESOLVED_EXPRESSION: Code = Code::new("E070");
}

/// Completion codes
pub mod completion {
    use super::Code;

    pub const PREFIX_NOT_PARSEABLE: Code = Code::new("W080");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

/// Success codes
pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");
    pub const LINE_PARSED: Code = Code::new("I020");
    pub const VALUE_PARSED: Code = Code::new("I021");
    pub const REQUEST_BUILT: Code = Code::new("I060");
    pub const COMPLETION_RESOLVED: Code = Code::new("I080");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        let entries = [
            // System
            ErrorMetadata::new(
                "ERR001",
                "System",
                Severity::Critical,
                false,
                true,
                "Critical internal system error",
                "File a bug report with the input line that triggered it",
            ),
            ErrorMetadata::new(
                "ERR002",
                "System",
                Severity::Critical,
                false,
                true,
                "System initialization failure",
                "Check logging configuration and environment variables",
            ),
            // Parsing
            ErrorMetadata::new(
                "E020",
                "Parsing",
                Severity::Medium,
                true,
                false,
                "Character not allowed at this position",
                "Check delimiters and separators around the reported offset",
            ),
            ErrorMetadata::new(
                "E021",
                "Parsing",
                Severity::Medium,
                true,
                false,
                "Quoted string is missing its closing quote",
                "Add the closing '\"' or escape the quote with '\\'",
            ),
            ErrorMetadata::new(
                "E022",
                "Parsing",
                Severity::Medium,
                true,
                false,
                "Back-quoted command is missing its closing back quote",
                "Add the closing '`'",
            ),
            ErrorMetadata::new(
                "E023",
                "Parsing",
                Severity::Medium,
                true,
                false,
                "Expression is missing its closing brace",
                "Close the '${' expression with '}'",
            ),
            ErrorMetadata::new(
                "E024",
                "Parsing",
                Severity::Medium,
                true,
                false,
                "Object, list or argument list is not closed",
                "Add the matching closing delimiter",
            ),
            ErrorMetadata::new(
                "E025",
                "Parsing",
                Severity::Medium,
                true,
                false,
                "A value is required at this position",
                "Provide a value after '=' or remove the entry",
            ),
            ErrorMetadata::new(
                "E026",
                "Parsing",
                Severity::Low,
                true,
                false,
                "Separator is not followed by another item",
                "Remove the trailing separator",
            ),
            ErrorMetadata::new(
                "E027",
                "Parsing",
                Severity::Low,
                true,
                false,
                "Escape character at end of input",
                "Remove the trailing '\\' or escape it as '\\\\'",
            ),
            ErrorMetadata::new(
                "E028",
                "Parsing",
                Severity::High,
                false,
                true,
                "Composite values are nested too deeply",
                "Flatten the value or raise max_nesting_depth",
            ),
            ErrorMetadata::new(
                "E029",
                "Parsing",
                Severity::High,
                false,
                true,
                "Command line exceeds maximum length",
                "Split the command or raise max_line_length",
            ),
            ErrorMetadata::new(
                "E030",
                "Parsing",
                Severity::Critical,
                false,
                true,
                "Parsing context reused without reset",
                "Call reset() on the context before parsing again",
            ),
            ErrorMetadata::new(
                "E031",
                "Parsing",
                Severity::High,
                false,
                true,
                "Too many arguments or chained commands",
                "Split the command or raise the configured limit",
            ),
            // Request
            ErrorMetadata::new(
                "E060",
                "Request",
                Severity::Medium,
                true,
                false,
                "Address node type has no node name",
                "Complete the address segment as type=name",
            ),
            ErrorMetadata::new(
                "E061",
                "Request",
                Severity::Medium,
                true,
                false,
                "Operation name is missing",
                "Add ':operation-name' after the address",
            ),
            ErrorMetadata::new(
                "E062",
                "Request",
                Severity::Low,
                true,
                false,
                "Command line is a command, not an operation request",
                "Hand commands to the command handler instead",
            ),
            ErrorMetadata::new(
                "E063",
                "Request",
                Severity::Low,
                true,
                false,
                "Address navigates above the root node",
                "Remove the extra '..' segments",
            ),
            ErrorMetadata::new(
                "E070",
                "Request",
                Severity::Medium,
                true,
                false,
                "Expression could not be resolved",
                "Define the referenced property or provide a default",
            ),
            // Completion
            ErrorMetadata::new(
                "W080",
                "Completion",
                Severity::Low,
                true,
                false,
                "Text before the cursor could not be parsed",
                "No candidates are offered for malformed input",
            ),
        ];

        entries
            .into_iter()
            .map(|metadata| (metadata.code, metadata))
            .collect()
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

/// Get error metadata for a specific code
pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

/// Get error severity from code
pub fn get_severity(code: &str) -> Severity {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

/// Check if error is recoverable
pub fn is_recoverable(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

/// Check if error requires immediate halt
pub fn requires_halt(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.requires_halt)
        .unwrap_or(false)
}

/// Get human-readable description for code
pub fn get_description(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

/// Get recommended action for code
pub fn get_action(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

/// Get category from code
pub fn get_category(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_error_code_has_metadata() {
        let codes = [
            system::INTERNAL_ERROR,
            system::INITIALIZATION_FAILURE,
            parsing::UNEXPECTED_CHARACTER,
            parsing::UNTERMINATED_QUOTE,
            parsing::UNTERMINATED_BACK_QUOTE,
            parsing::UNTERMINATED_EXPRESSION,
            parsing::UNTERMINATED_COMPOSITE,
            parsing::MISSING_VALUE,
            parsing::TRAILING_SEPARATOR,
            parsing::DANGLING_ESCAPE,
            parsing::NESTING_TOO_DEEP,
            parsing::INPUT_TOO_LONG,
            parsing::CONTEXT_NOT_RESET,
            parsing::TOO_MANY_ARGUMENTS,
            request::NODE_TYPE_WITHOUT_NAME,
            request::MISSING_OPERATION,
            request::NOT_AN_OPERATION,
            request::PARENT_OF_ROOT,
            request::UNRESOLVED_EXPRESSION,
            completion::PREFIX_NOT_PARSEABLE,
        ];

        for code in codes {
            assert!(
                get_error_metadata(code.as_str()).is_some(),
                "missing metadata for {}",
                code
            );
        }
    }

    #[test]
    fn test_unknown_code_defaults() {
        assert_eq!(get_description("X999"), "Unknown error");
        assert_eq!(get_category("X999"), "Unknown");
        assert!(is_recoverable("X999"));
        assert!(!requires_halt("X999"));
    }

    #[test]
    fn test_classification() {
        assert_eq!(get_category("E021"), "Parsing");
        assert_eq!(get_severity("E028"), Severity::High);
        assert!(requires_halt("E030"));
        assert!(is_recoverable("E060"));
    }
}
