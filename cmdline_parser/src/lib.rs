// Internal modules
pub mod completion;
pub mod config;
pub mod error;
#[macro_use]
pub mod logging;
pub mod parsing;
pub mod request;
pub mod utils;
pub mod value;

// Re-export key types for library consumers
pub use completion::{CandidateProvider, Completion, CompletionContext, CompletionEngine, StaticCandidates};
pub use error::CliError;
pub use parsing::{
    parse_command, parse_line, parse_value, FormatError, LineParser, ParsedLine,
};
pub use request::{
    ExpressionResolver, IncompleteRequestError, OperationRequest, RequestBuilder, RequestError,
    UnresolvedExpressionError,
};
pub use value::ArgumentValue;
