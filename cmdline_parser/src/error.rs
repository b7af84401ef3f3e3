//! Umbrella error for callers that run several stages

use crate::config::runtime::ConfigError;
use crate::logging::{codes, Code};
use crate::parsing::FormatError;
use crate::request::{IncompleteRequestError, RequestError, UnresolvedExpressionError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Syntax error: {0}")]
    Format(#[from] FormatError),

    #[error("{0}")]
    Request(#[from] RequestError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Usage error: {message}")]
    Usage { message: String },
}

impl CliError {
    pub fn usage(message: &str) -> Self {
        Self::Usage {
            message: message.to_string(),
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::Format(error) => error.error_code(),
            Self::Request(error) => error.error_code(),
            Self::Config(_) | Self::Usage { .. } => codes::system::INITIALIZATION_FAILURE,
        }
    }
}

impl From<IncompleteRequestError> for CliError {
    fn from(error: IncompleteRequestError) -> Self {
        Self::Request(error.into())
    }
}

impl From<UnresolvedExpressionError> for CliError {
    fn from(error: UnresolvedExpressionError) -> Self {
        Self::Request(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_stage_errors_convert() {
        let err: CliError = FormatError::UnterminatedQuote { offset: 3 }.into();
        assert_eq!(err.error_code(), codes::parsing::UNTERMINATED_QUOTE);

        let err: CliError = IncompleteRequestError::MissingOperation.into();
        assert_matches!(
            err,
            CliError::Request(RequestError::Incomplete(IncompleteRequestError::MissingOperation))
        );
        assert_eq!(err.error_code(), codes::request::MISSING_OPERATION);

        let err: CliError = UnresolvedExpressionError::new("${x}", "no value").into();
        assert_eq!(err.error_code(), codes::request::UNRESOLVED_EXPRESSION);
        assert!(err.to_string().contains("${x}"));
    }
}
