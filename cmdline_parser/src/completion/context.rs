//! Syntactic position at the end of a completion prefix

use crate::parsing::{AddressNode, Frame, ParsedLine, Phase, StateId};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CompletionContext {
    /// Nothing useful can be offered here
    Empty,
    CommandName,
    NodeType,
    NodeName { node_type: String },
    OperationName,
    ArgumentName,
    ArgumentValue { argument: String },
    ObjectKey,
    ObjectSeparator,
    ListItem,
    ListSeparator,
    ArgumentSeparator,
    HeaderName,
    Quoted,
    Expression,
}

impl CompletionContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::CommandName => "command-name",
            Self::NodeType => "node-type",
            Self::NodeName { .. } => "node-name",
            Self::OperationName => "operation-name",
            Self::ArgumentName => "argument-name",
            Self::ArgumentValue { .. } => "argument-value",
            Self::ObjectKey => "object-key",
            Self::ObjectSeparator => "object-separator",
            Self::ListItem => "list-item",
            Self::ListSeparator => "list-separator",
            Self::ArgumentSeparator => "argument-separator",
            Self::HeaderName => "header-name",
            Self::Quoted => "quoted",
            Self::Expression => "expression",
        }
    }
}

impl fmt::Display for CompletionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the engine needs to know about the cursor position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub context: CompletionContext,
    /// Byte offset where the token being completed starts
    pub start: usize,
    /// Grammar characters that may legally come next
    pub structural: Vec<&'static str>,
    /// Candidates get this prefix, e.g. `--` for command options
    pub insert_prefix: &'static str,
}

impl Resolved {
    fn at(context: CompletionContext, start: usize) -> Self {
        Self {
            context,
            start,
            structural: Vec::new(),
            insert_prefix: "",
        }
    }

    fn with_structural(mut self, structural: &[&'static str]) -> Self {
        self.structural = structural.to_vec();
        self
    }

    fn with_prefix(mut self, insert_prefix: &'static str) -> Self {
        self.insert_prefix = insert_prefix;
        self
    }
}

/// States whose frame text is the token under the cursor
fn holds_token(id: StateId) -> bool {
    matches!(
        id,
        StateId::CommandName
            | StateId::OptionName
            | StateId::NodeType
            | StateId::NodeName
            | StateId::OperationName
            | StateId::ArgumentName
            | StateId::HeaderName
            | StateId::ObjectKey
            | StateId::Scalar
            | StateId::Quoted
            | StateId::BackQuoted
            | StateId::Expression
    )
}

/// Name of the argument or header whose value is being typed
fn value_owner(frames: &[Frame], line: &ParsedLine) -> String {
    let headers = frames
        .iter()
        .rev()
        .find(|frame| frame.id != StateId::ArgumentValue && frame.id != StateId::Scalar)
        .is_some_and(|frame| frame.id == StateId::Headers);
    let named = if headers { &line.headers } else { &line.arguments };
    named
        .last()
        .and_then(|argument| argument.name.clone())
        .unwrap_or_default()
}

fn last_node_type(line: &ParsedLine) -> String {
    match line.address.last() {
        Some(AddressNode::Segment { node_type, .. }) => node_type.clone(),
        _ => String::new(),
    }
}

/// Map the open states at the end of the prefix to a completion context
pub fn resolve(frames: &[Frame], line: &ParsedLine, prefix: &str, end: usize) -> Resolved {
    let Some(top) = frames.last() else {
        return Resolved::at(CompletionContext::Empty, end);
    };
    let parent = frames.len().checked_sub(2).and_then(|i| frames.get(i)).map(|f| f.id);
    let start = if holds_token(top.id) { top.start } else { end };

    match (top.id, top.phase) {
        (StateId::Line, Phase::Initial | Phase::AfterPipe) => {
            Resolved::at(CompletionContext::CommandName, start)
        }
        (StateId::CommandName, _) => Resolved::at(CompletionContext::CommandName, start),

        (StateId::Command, _) => {
            Resolved::at(CompletionContext::ArgumentName, start).with_prefix("--")
        }
        (StateId::OptionName, _) => Resolved::at(CompletionContext::ArgumentName, start),

        (StateId::Address, Phase::NodeStart) => Resolved::at(CompletionContext::NodeType, start),
        (StateId::Address, Phase::AfterOperation) => {
            Resolved::at(CompletionContext::Empty, start).with_structural(&["(", "{"])
        }
        (StateId::NodeType, _) => Resolved::at(CompletionContext::NodeType, start),
        (StateId::NodeName, _) => Resolved::at(
            CompletionContext::NodeName {
                node_type: last_node_type(line),
            },
            start,
        ),
        (StateId::OperationName, _) => Resolved::at(CompletionContext::OperationName, start),

        (StateId::OperationArgs, Phase::Initial) => {
            Resolved::at(CompletionContext::ArgumentName, start).with_structural(&[")"])
        }
        (StateId::OperationArgs, Phase::AfterSeparator) => {
            Resolved::at(CompletionContext::ArgumentName, start)
        }
        (StateId::OperationArgs, _) => {
            Resolved::at(CompletionContext::ArgumentSeparator, start).with_structural(&[",", ")"])
        }
        (StateId::ArgumentName, _) => Resolved::at(CompletionContext::ArgumentName, start),

        (StateId::Headers, Phase::Initial) => {
            Resolved::at(CompletionContext::HeaderName, start).with_structural(&["}"])
        }
        (StateId::Headers, Phase::AfterSeparator) => {
            Resolved::at(CompletionContext::HeaderName, start)
        }
        (StateId::Headers, _) => {
            Resolved::at(CompletionContext::ArgumentSeparator, start).with_structural(&[";", "}"])
        }
        (StateId::HeaderName, _) => Resolved::at(CompletionContext::HeaderName, start),

        (StateId::Object, Phase::Initial) => {
            Resolved::at(CompletionContext::ObjectKey, start).with_structural(&["}"])
        }
        (StateId::Object, Phase::AfterSeparator) => {
            Resolved::at(CompletionContext::ObjectKey, start)
        }
        (StateId::Object, _) => {
            Resolved::at(CompletionContext::ObjectSeparator, start).with_structural(&[",", "}"])
        }
        (StateId::ObjectKey, Phase::TrailingSpace) => {
            Resolved::at(CompletionContext::Empty, end).with_structural(&["="])
        }
        (StateId::ObjectKey, _) => Resolved::at(CompletionContext::ObjectKey, start),

        (StateId::List, Phase::Initial) => {
            Resolved::at(CompletionContext::ListItem, start).with_structural(&["]"])
        }
        (StateId::List, Phase::AfterSeparator) => Resolved::at(CompletionContext::ListItem, start),
        (StateId::List, _) => {
            Resolved::at(CompletionContext::ListSeparator, start).with_structural(&[",", "]"])
        }

        (StateId::Quoted | StateId::BackQuoted, _) => {
            Resolved::at(CompletionContext::Quoted, start)
        }
        (StateId::Expression, _) => Resolved::at(CompletionContext::Expression, start),

        (StateId::Scalar, _) => match parent {
            Some(StateId::ArgumentValue) => Resolved::at(
                CompletionContext::ArgumentValue {
                    argument: value_owner(frames, line),
                },
                start,
            ),
            Some(StateId::List) => Resolved::at(CompletionContext::ListItem, start),
            Some(StateId::PositionalValue) if prefix.get(start..end) == Some("-") => {
                Resolved::at(CompletionContext::ArgumentName, start).with_prefix("--")
            }
            _ => Resolved::at(CompletionContext::Empty, start),
        },

        _ => Resolved::at(CompletionContext::Empty, end),
    }
}
