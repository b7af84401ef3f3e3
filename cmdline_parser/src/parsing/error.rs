//! Format errors raised by the parsing state machine

use crate::config::compile_time::parsing::{
    MAX_ARGUMENTS, MAX_CHAINED_COMMANDS, MAX_LINE_LENGTH, MAX_NESTING_DEPTH,
};
use crate::logging::codes;
use crate::utils::{SourceMap, Span};

/// Malformed command-line syntax. Offsets are byte offsets into the parsed
/// text; unterminated constructs report the input length.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("Expected {expected} but found '{found}' at offset {offset}")]
    UnexpectedCharacter {
        expected: String,
        found: char,
        offset: usize,
    },

    #[error("Unterminated quoted string at offset {offset}")]
    UnterminatedQuote { offset: usize },

    #[error("Unterminated back-quoted command at offset {offset}")]
    UnterminatedBackQuote { offset: usize },

    #[error("Unterminated expression at offset {offset}")]
    UnterminatedExpression { offset: usize },

    #[error("Missing closing delimiter for '{delimiter}' at offset {offset}")]
    UnterminatedComposite { delimiter: char, offset: usize },

    #[error("Missing value at offset {offset}")]
    MissingValue { offset: usize },

    #[error("Missing {what} at offset {offset}")]
    MissingName { what: &'static str, offset: usize },

    #[error("'{separator}' must be followed by another item (offset {offset})")]
    TrailingSeparator { separator: char, offset: usize },

    #[error("Escape character at end of input (offset {offset})")]
    DanglingEscape { offset: usize },

    #[error("Nesting depth {depth} exceeds maximum of {MAX_NESTING_DEPTH} at offset {offset}")]
    NestingTooDeep { depth: usize, offset: usize },

    #[error("More than {MAX_ARGUMENTS} arguments in one command (offset {offset})")]
    TooManyArguments { offset: usize },

    #[error("More than {MAX_CHAINED_COMMANDS} chained commands (offset {offset})")]
    TooManyCommands { offset: usize },

    #[error("Input of {length} bytes exceeds maximum line length of {MAX_LINE_LENGTH}")]
    InputTooLong { length: usize },

    #[error("Parsing context must be reset before it is reused")]
    ContextNotReset,
}

impl FormatError {
    pub fn unexpected(expected: &str, found: char, offset: usize) -> Self {
        Self::UnexpectedCharacter {
            expected: expected.to_string(),
            found,
            offset,
        }
    }

    pub fn unterminated_composite(delimiter: char, offset: usize) -> Self {
        Self::UnterminatedComposite { delimiter, offset }
    }

    pub fn missing_name(what: &'static str, offset: usize) -> Self {
        Self::MissingName { what, offset }
    }

    /// Offset of the first offending character
    pub fn offset(&self) -> usize {
        match self {
            FormatError::UnexpectedCharacter { offset, .. }
            | FormatError::UnterminatedQuote { offset }
            | FormatError::UnterminatedBackQuote { offset }
            | FormatError::UnterminatedExpression { offset }
            | FormatError::UnterminatedComposite { offset, .. }
            | FormatError::MissingValue { offset }
            | FormatError::MissingName { offset, .. }
            | FormatError::TrailingSeparator { offset, .. }
            | FormatError::DanglingEscape { offset }
            | FormatError::NestingTooDeep { offset, .. }
            | FormatError::TooManyArguments { offset }
            | FormatError::TooManyCommands { offset } => *offset,
            FormatError::InputTooLong { .. } => MAX_LINE_LENGTH,
            FormatError::ContextNotReset => 0,
        }
    }

    pub fn span(&self) -> Span {
        Span::at(self.offset())
    }

    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            FormatError::UnexpectedCharacter { .. } => codes::parsing::UNEXPECTED_CHARACTER,
            FormatError::UnterminatedQuote { .. } => codes::parsing::UNTERMINATED_QUOTE,
            FormatError::UnterminatedBackQuote { .. } => codes::parsing::UNTERMINATED_BACK_QUOTE,
            FormatError::UnterminatedExpression { .. } => codes::parsing::UNTERMINATED_EXPRESSION,
            FormatError::UnterminatedComposite { .. } => codes::parsing::UNTERMINATED_COMPOSITE,
            FormatError::MissingValue { .. } | FormatError::MissingName { .. } => {
                codes::parsing::MISSING_VALUE
            }
            FormatError::TrailingSeparator { .. } => codes::parsing::TRAILING_SEPARATOR,
            FormatError::DanglingEscape { .. } => codes::parsing::DANGLING_ESCAPE,
            FormatError::NestingTooDeep { .. } => codes::parsing::NESTING_TOO_DEEP,
            FormatError::TooManyArguments { .. } | FormatError::TooManyCommands { .. } => {
                codes::parsing::TOO_MANY_ARGUMENTS
            }
            FormatError::InputTooLong { .. } => codes::parsing::INPUT_TOO_LONG,
            FormatError::ContextNotReset => codes::parsing::CONTEXT_NOT_RESET,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        codes::is_recoverable(self.error_code().as_str())
    }

    /// True when the offset points past the last character, i.e. more input
    /// could still complete the line
    pub fn is_at_end_of(&self, input: &str) -> bool {
        self.offset() >= input.len()
    }

    /// Render the error with a caret under the offending character
    pub fn render(&self, input: &str) -> String {
        SourceMap::new(input).format_error(self.offset(), &self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_and_codes() {
        let err = FormatError::unexpected("',' or ')'", 'x', 7);
        assert_eq!(err.offset(), 7);
        assert_eq!(err.error_code(), codes::parsing::UNEXPECTED_CHARACTER);
        assert_eq!(err.span(), Span::at(7));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_messages_include_limits() {
        let err = FormatError::NestingTooDeep { depth: 99, offset: 3 };
        assert!(err
            .to_string()
            .contains(&format!("maximum of {}", MAX_NESTING_DEPTH)));
        assert!(!FormatError::ContextNotReset.is_recoverable());
    }

    #[test]
    fn test_render_points_at_offset() {
        let input = "cmd --x=\"abc";
        let err = FormatError::UnterminatedQuote { offset: input.len() };
        assert!(err.is_at_end_of(input));
        let rendered = err.render(input);
        assert!(rendered.contains("Unterminated quoted string"));
        assert!(rendered.contains(&format!("--> 1:{}", input.len() + 1)));
    }
}
