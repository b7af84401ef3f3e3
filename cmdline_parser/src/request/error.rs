use crate::logging::{codes, Code};

/// A parsed line that cannot become an operation request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IncompleteRequestError {
    #[error("Node type '{node_type}' has no name")]
    NodeTypeWithoutName { node_type: String },

    #[error("No operation name given")]
    MissingOperation,

    #[error("'{command}' is a command, not an operation request")]
    NotAnOperation { command: String },

    #[error("Address goes above the root node")]
    ParentOfRoot,
}

impl IncompleteRequestError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::NodeTypeWithoutName { .. } => codes::request::NODE_TYPE_WITHOUT_NAME,
            Self::MissingOperation => codes::request::MISSING_OPERATION,
            Self::NotAnOperation { .. } => codes::request::NOT_AN_OPERATION,
            Self::ParentOfRoot => codes::request::PARENT_OF_ROOT,
        }
    }
}

/// Raised by an expression resolver for a `${...}` or back-quoted value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot resolve '{expression}': {reason}")]
pub struct UnresolvedExpressionError {
    pub expression: String,
    pub reason: String,
}

impl UnresolvedExpressionError {
    pub fn new(expression: &str, reason: impl Into<String>) -> Self {
        Self {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    pub fn error_code(&self) -> Code {
        codes::request::UNRESOLVED_EXPRESSION
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Incomplete request: {0}")]
    Incomplete(#[from] IncompleteRequestError),

    #[error("Expression resolution failed: {0}")]
    Unresolved(#[from] UnresolvedExpressionError),
}

impl RequestError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::Incomplete(error) => error.error_code(),
            Self::Unresolved(error) => error.error_code(),
        }
    }
}
