use super::context::CompletionContext;
use crate::parsing::ParsedLine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What the engine asks a provider
#[derive(Debug, Clone, Copy)]
pub struct CompletionQuery<'q> {
    pub context: &'q CompletionContext,
    /// Raw text of the token under the cursor
    pub partial: &'q str,
    /// Best-effort structure of the command being typed
    pub line: &'q ParsedLine,
}

/// Source of domain candidates (commands, node names, argument names...).
/// The engine filters, sorts and truncates whatever is returned.
pub trait CandidateProvider {
    fn candidates(&self, query: &CompletionQuery<'_>) -> Vec<String>;
}

/// In-memory provider; also read from the `[candidates]` table of a
/// preferences file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticCandidates {
    commands: Vec<String>,
    node_types: Vec<String>,
    node_names: HashMap<String, Vec<String>>,
    operations: Vec<String>,
    /// Argument names keyed by operation or command name
    arguments: HashMap<String, Vec<String>>,
    /// Values keyed by argument name
    values: HashMap<String, Vec<String>>,
    object_keys: Vec<String>,
    headers: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

impl StaticCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commands(mut self, commands: &[&str]) -> Self {
        self.commands.extend(owned(commands));
        self
    }

    pub fn with_node_types(mut self, node_types: &[&str]) -> Self {
        self.node_types.extend(owned(node_types));
        self
    }

    pub fn with_node_names(mut self, node_type: &str, names: &[&str]) -> Self {
        self.node_names
            .entry(node_type.to_string())
            .or_default()
            .extend(owned(names));
        self
    }

    pub fn with_operations(mut self, operations: &[&str]) -> Self {
        self.operations.extend(owned(operations));
        self
    }

    /// Argument names for one operation or command
    pub fn with_arguments(mut self, owner: &str, names: &[&str]) -> Self {
        self.arguments
            .entry(owner.to_string())
            .or_default()
            .extend(owned(names));
        self
    }

    pub fn with_values(mut self, argument: &str, values: &[&str]) -> Self {
        self.values
            .entry(argument.to_string())
            .or_default()
            .extend(owned(values));
        self
    }

    pub fn with_object_keys(mut self, keys: &[&str]) -> Self {
        self.object_keys.extend(owned(keys));
        self
    }

    pub fn with_headers(mut self, headers: &[&str]) -> Self {
        self.headers.extend(owned(headers));
        self
    }
}

impl CandidateProvider for StaticCandidates {
    fn candidates(&self, query: &CompletionQuery<'_>) -> Vec<String> {
        let list = match query.context {
            CompletionContext::CommandName => Some(&self.commands),
            CompletionContext::NodeType => Some(&self.node_types),
            CompletionContext::NodeName { node_type } => self.node_names.get(node_type),
            CompletionContext::OperationName => Some(&self.operations),
            CompletionContext::ArgumentName => query
                .line
                .operation
                .as_ref()
                .or(query.line.command.as_ref())
                .and_then(|owner| self.arguments.get(owner)),
            CompletionContext::ArgumentValue { argument } => self.values.get(argument),
            CompletionContext::ObjectKey => Some(&self.object_keys),
            CompletionContext::HeaderName => Some(&self.headers),
            _ => None,
        };
        list.cloned().unwrap_or_default()
    }
}
