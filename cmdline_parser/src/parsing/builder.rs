//! Incremental construction of parsed lines from state-machine events
//!
//! The builder never looks at the source text. It keeps a stack of value
//! frames that mirrors the open composite states and a buffer for the name
//! currently being read.

use super::callback::ParsingCallback;
use super::state::StateId;
use crate::value::{escape_name, ArgumentValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Character that ended a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Pipe,
    Sequence,
}

impl Operator {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '|' => Some(Operator::Pipe),
            ';' => Some(Operator::Sequence),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Operator::Pipe => '|',
            Operator::Sequence => ';',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineForm {
    #[default]
    Empty,
    /// `[address]:operation(arguments){headers}`
    Operation,
    /// `name --option=value positional`
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AddressNode {
    Segment {
        node_type: String,
        name: Option<String>,
    },
    /// `..`
    Parent,
    /// `.`
    Current,
}

/// A named argument, a flag (no value) or a positional value (no name)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Option<ArgumentValue>,
}

impl Argument {
    pub fn named(name: impl Into<String>, value: ArgumentValue) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value),
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: None,
        }
    }

    pub fn positional(value: ArgumentValue) -> Self {
        Self {
            name: None,
            value: Some(value),
        }
    }

    pub fn is_flag(&self) -> bool {
        self.name.is_some() && self.value.is_none()
    }
}

/// One command of a command line
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedLine {
    pub form: LineForm,
    /// Address started with '/'
    pub absolute: bool,
    pub address: Vec<AddressNode>,
    pub command: Option<String>,
    pub operation: Option<String>,
    pub arguments: Vec<Argument>,
    pub headers: Vec<Argument>,
    pub terminator: Option<Operator>,
}

impl ParsedLine {
    pub fn is_empty(&self) -> bool {
        self.form == LineForm::Empty
            && self.address.is_empty()
            && self.arguments.is_empty()
            && self.terminator.is_none()
    }

    /// Named argument by name; the last occurrence wins
    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments
            .iter()
            .rev()
            .find(|argument| argument.name.as_deref() == Some(name))
    }

    pub fn value_of(&self, name: &str) -> Option<&ArgumentValue> {
        self.argument(name)?.value.as_ref()
    }

    pub fn has_argument(&self, name: &str) -> bool {
        self.argument(name).is_some()
    }

    pub fn named_arguments(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter().filter(|argument| argument.name.is_some())
    }

    pub fn positionals(&self) -> impl Iterator<Item = &ArgumentValue> {
        self.arguments
            .iter()
            .filter(|argument| argument.name.is_none())
            .filter_map(|argument| argument.value.as_ref())
    }

    pub fn header(&self, name: &str) -> Option<&Argument> {
        self.headers
            .iter()
            .rev()
            .find(|header| header.name.as_deref() == Some(name))
    }
}

fn write_address(f: &mut fmt::Formatter<'_>, line: &ParsedLine) -> fmt::Result {
    if line.absolute {
        f.write_str("/")?;
    }
    for (index, node) in line.address.iter().enumerate() {
        if index > 0 {
            f.write_str("/")?;
        }
        match node {
            AddressNode::Segment { node_type, name } => {
                f.write_str(node_type)?;
                if let Some(name) = name {
                    write!(f, "={}", escape_name(name))?;
                }
            }
            AddressNode::Parent => f.write_str("..")?,
            AddressNode::Current => f.write_str(".")?,
        }
    }
    Ok(())
}

fn write_argument(f: &mut fmt::Formatter<'_>, argument: &Argument) -> fmt::Result {
    match (&argument.name, &argument.value) {
        (Some(name), Some(value)) => write!(f, "{}={}", escape_name(name), value),
        (Some(name), None) => f.write_str(&escape_name(name)),
        (None, Some(value)) => write!(f, "{}", value),
        (None, None) => Ok(()),
    }
}

impl fmt::Display for ParsedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.form {
            LineForm::Empty => Ok(()),
            LineForm::Operation => {
                write_address(f, self)?;
                if let Some(operation) = &self.operation {
                    write!(f, ":{}", operation)?;
                }
                if !self.arguments.is_empty() {
                    f.write_str("(")?;
                    for (index, argument) in self.arguments.iter().enumerate() {
                        if index > 0 {
                            f.write_str(",")?;
                        }
                        write_argument(f, argument)?;
                    }
                    f.write_str(")")?;
                }
                if !self.headers.is_empty() {
                    f.write_str("{")?;
                    for (index, header) in self.headers.iter().enumerate() {
                        if index > 0 {
                            f.write_str(";")?;
                        }
                        write_argument(f, header)?;
                    }
                    f.write_str("}")?;
                }
                Ok(())
            }
            LineForm::Command => {
                f.write_str(&escape_name(self.command.as_deref().unwrap_or_default()))?;
                for argument in &self.arguments {
                    f.write_str(" ")?;
                    if argument.name.is_some() {
                        f.write_str("--")?;
                    }
                    write_argument(f, argument)?;
                }
                Ok(())
            }
        }
    }
}

/// Value under construction
#[derive(Debug)]
enum ValueFrame {
    /// `raw` keeps literal `$` and `\` escaped so references stay distinct
    Scalar {
        text: String,
        raw: String,
        expression: bool,
    },
    BackQuoted(String),
    Object {
        entries: Vec<(String, ArgumentValue)>,
        key: Option<String>,
    },
    List(Vec<ArgumentValue>),
}

impl ValueFrame {
    fn finish(self) -> ArgumentValue {
        match self {
            ValueFrame::Scalar {
                raw,
                expression: true,
                ..
            } => ArgumentValue::Expression(raw),
            ValueFrame::Scalar { text, .. } => ArgumentValue::Scalar(text),
            ValueFrame::BackQuoted(text) => ArgumentValue::BackQuoted(text),
            ValueFrame::Object { entries, .. } => ArgumentValue::Object(entries),
            ValueFrame::List(items) => ArgumentValue::List(items),
        }
    }
}

/// Where a finished name goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NamedTarget {
    Arguments,
    Headers,
}

/// `ParsingCallback` that assembles `ParsedLine`s and standalone values
#[derive(Debug)]
pub struct LineBuilder {
    lines: Vec<ParsedLine>,
    current: ParsedLine,
    states: Vec<StateId>,
    frames: Vec<ValueFrame>,
    token: String,
    named_target: NamedTarget,
    root_value: Option<ArgumentValue>,
    operator_offsets: Vec<usize>,
}

impl Default for LineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuilder {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            current: ParsedLine::default(),
            states: Vec::new(),
            frames: Vec::new(),
            token: String::new(),
            named_target: NamedTarget::Arguments,
            root_value: None,
            operator_offsets: Vec::new(),
        }
    }

    /// Completed lines followed by the line in progress, if any
    pub fn finish(mut self) -> Vec<ParsedLine> {
        if !self.current.is_empty() {
            self.lines.push(self.current);
        }
        self.lines
    }

    /// Value produced by a standalone value parse
    pub fn take_value(&mut self) -> Option<ArgumentValue> {
        self.root_value.take()
    }

    /// The line in progress, for completion queries
    pub fn partial(&self) -> &ParsedLine {
        &self.current
    }

    /// Offsets of the operators seen so far
    pub fn operator_offsets(&self) -> &[usize] {
        &self.operator_offsets
    }

    /// Innermost state that owns content; quotes and expressions only
    /// change how characters are read, not where they go
    /// Name collected by the name state being left
    fn take_token(&mut self) -> String {
        std::mem::take(&mut self.token)
    }

    /// Whether content currently belongs to a `${...}` reference
    fn in_expression(&self) -> bool {
        self.states
            .iter()
            .rev()
            .find(|id| matches!(id, StateId::Scalar | StateId::Expression))
            == Some(&StateId::Expression)
    }

    fn content_owner(&self) -> Option<StateId> {
        self.states
            .iter()
            .rev()
            .copied()
            .find(|id| !matches!(id, StateId::Quoted | StateId::Expression))
    }

    fn deliver(&mut self, value: ArgumentValue) {
        match self.frames.last_mut() {
            Some(ValueFrame::Object { entries, key }) => {
                let name = key.take().unwrap_or_default();
                entries.push((name, value));
            }
            Some(ValueFrame::List(items)) => items.push(value),
            _ => match self.states.last() {
                Some(StateId::ArgumentValue) => {
                    let target = match self.named_target {
                        NamedTarget::Arguments => &mut self.current.arguments,
                        NamedTarget::Headers => &mut self.current.headers,
                    };
                    if let Some(argument) = target.last_mut() {
                        argument.value = Some(value);
                    }
                }
                Some(StateId::PositionalValue) => {
                    self.current.arguments.push(Argument::positional(value));
                }
                _ => self.root_value = Some(value),
            },
        }
    }

    fn end_line(&mut self) {
        let line = std::mem::take(&mut self.current);
        if !line.is_empty() {
            self.lines.push(line);
        }
    }
}

impl ParsingCallback for LineBuilder {
    fn enter_state(&mut self, state: StateId, _offset: usize) {
        match state {
            StateId::Address => self.current.form = LineForm::Operation,
            StateId::Command => self.current.form = LineForm::Command,
            StateId::CommandName
            | StateId::OptionName
            | StateId::NodeType
            | StateId::NodeName
            | StateId::OperationName
            | StateId::ArgumentName
            | StateId::HeaderName
            | StateId::ObjectKey => self.token.clear(),
            StateId::Scalar => self.frames.push(ValueFrame::Scalar {
                text: String::new(),
                raw: String::new(),
                expression: false,
            }),
            StateId::BackQuoted => self.frames.push(ValueFrame::BackQuoted(String::new())),
            StateId::Object => self.frames.push(ValueFrame::Object {
                entries: Vec::new(),
                key: None,
            }),
            StateId::List => self.frames.push(ValueFrame::List(Vec::new())),
            StateId::Expression => {
                if let Some(ValueFrame::Scalar { expression, .. }) = self.frames.last_mut() {
                    *expression = true;
                }
            }
            _ => {}
        }
        self.states.push(state);
    }

    fn leave_state(&mut self, state: StateId, _offset: usize) {
        self.states.pop();

        match state {
            StateId::CommandName => self.current.command = Some(self.take_token()),
            StateId::NodeType => {
                let token = self.take_token();
                let node = match token.as_str() {
                    ".." => AddressNode::Parent,
                    "." => AddressNode::Current,
                    _ => AddressNode::Segment {
                        node_type: token,
                        name: None,
                    },
                };
                self.current.address.push(node);
            }
            StateId::NodeName => {
                let token = self.take_token();
                if let Some(AddressNode::Segment { name, .. }) = self.current.address.last_mut() {
                    *name = Some(token);
                }
            }
            StateId::OperationName => {
                let token = self.take_token();
                if !token.is_empty() {
                    self.current.operation = Some(token);
                }
            }
            StateId::ArgumentName | StateId::OptionName => {
                let token = self.take_token();
                self.current.arguments.push(Argument::flag(token));
                self.named_target = NamedTarget::Arguments;
            }
            StateId::HeaderName => {
                let token = self.take_token();
                self.current.headers.push(Argument::flag(token));
                self.named_target = NamedTarget::Headers;
            }
            StateId::ObjectKey => {
                let token = self.take_token();
                if let Some(ValueFrame::Object { key, .. }) = self.frames.last_mut() {
                    *key = Some(token);
                }
            }
            StateId::Scalar | StateId::BackQuoted | StateId::Object | StateId::List => {
                if let Some(frame) = self.frames.pop() {
                    self.deliver(frame.finish());
                }
            }
            StateId::Operator | StateId::Line => self.end_line(),
            _ => {}
        }
    }

    fn character(&mut self, ch: char, offset: usize) {
        match self.content_owner() {
            Some(StateId::Scalar) => {
                let literal = !self.in_expression();
                if let Some(ValueFrame::Scalar { text, raw, .. }) = self.frames.last_mut() {
                    text.push(ch);
                    if literal && matches!(ch, '$' | '\\') {
                        raw.push('\\');
                    }
                    raw.push(ch);
                }
            }
            Some(StateId::BackQuoted) => {
                if let Some(ValueFrame::BackQuoted(text)) = self.frames.last_mut() {
                    text.push(ch);
                }
            }
            Some(StateId::Address) => {
                if self.current.address.is_empty() {
                    self.current.absolute = true;
                }
            }
            Some(StateId::Operator) => {
                self.current.terminator = Operator::from_char(ch);
                self.operator_offsets.push(offset);
            }
            _ => self.token.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_assembles_values_from_events() {
        let mut builder = LineBuilder::new();
        builder.enter_state(StateId::ValueRoot, 0);
        builder.enter_state(StateId::List, 0);
        builder.enter_state(StateId::Scalar, 1);
        builder.character('a', 1);
        builder.leave_state(StateId::Scalar, 2);
        builder.enter_state(StateId::Object, 3);
        builder.leave_state(StateId::Object, 5);
        builder.leave_state(StateId::List, 6);
        builder.leave_state(StateId::ValueRoot, 6);

        assert_eq!(
            builder.take_value(),
            Some(ArgumentValue::List(vec![
                "a".into(),
                ArgumentValue::empty_object()
            ]))
        );
    }

    #[test]
    fn test_parsed_line_lookup() {
        let line = ParsedLine {
            form: LineForm::Command,
            command: Some("deploy".to_string()),
            arguments: vec![
                Argument::named("name", "a".into()),
                Argument::positional("file.war".into()),
                Argument::flag("force"),
                Argument::named("name", "b".into()),
            ],
            ..ParsedLine::default()
        };

        assert_eq!(line.value_of("name"), Some(&ArgumentValue::scalar("b")));
        assert!(line.argument("force").is_some_and(Argument::is_flag));
        assert_eq!(line.positionals().count(), 1);
        assert_eq!(line.named_arguments().count(), 3);
        assert_eq!(line.to_string(), "deploy --name=a file.war --force --name=b");
    }

    #[test]
    fn test_operation_display() {
        let line = ParsedLine {
            form: LineForm::Operation,
            absolute: true,
            address: vec![
                AddressNode::Segment {
                    node_type: "subsystem".to_string(),
                    name: Some("data sources".to_string()),
                },
                AddressNode::Parent,
            ],
            operation: Some("read-resource".to_string()),
            arguments: vec![Argument::flag("recursive")],
            headers: vec![Argument::named("rollback-on-runtime-failure", "false".into())],
            ..ParsedLine::default()
        };
        assert_eq!(
            line.to_string(),
            r"/subsystem=data\ sources/..:read-resource(recursive){rollback-on-runtime-failure=false}"
        );
    }
}
