//! Shared location types used by the parser, completion and error rendering.

pub mod span;

pub use span::{Position, SourceMap, Span};
