//! Immutable state descriptors and the transition table that drives the parser
//!
//! A `StateTable` is built once by whoever owns the parser and is shared by
//! reference with every `ParsingContext`. Nothing in a descriptor changes
//! during a parse, so one table can serve concurrent parses.

use super::callback::ParsingCallback;
use super::context::ParsingContext;
use super::error::FormatError;
use super::handlers;
use std::collections::HashMap;
use std::fmt;

/// Stable name of a parsing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateId {
    Line,
    Operator,
    Command,
    CommandName,
    OptionName,
    PositionalValue,
    Address,
    NodeType,
    NodeName,
    OperationName,
    OperationArgs,
    ArgumentName,
    ArgumentValue,
    Headers,
    HeaderName,
    Scalar,
    Quoted,
    BackQuoted,
    Expression,
    Object,
    ObjectKey,
    List,
    ValueRoot,
}

impl StateId {
    pub const ALL: [StateId; 23] = [
        StateId::Line,
        StateId::Operator,
        StateId::Command,
        StateId::CommandName,
        StateId::OptionName,
        StateId::PositionalValue,
        StateId::Address,
        StateId::NodeType,
        StateId::NodeName,
        StateId::OperationName,
        StateId::OperationArgs,
        StateId::ArgumentName,
        StateId::ArgumentValue,
        StateId::Headers,
        StateId::HeaderName,
        StateId::Scalar,
        StateId::Quoted,
        StateId::BackQuoted,
        StateId::Expression,
        StateId::Object,
        StateId::ObjectKey,
        StateId::List,
        StateId::ValueRoot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateId::Line => "line",
            StateId::Operator => "operator",
            StateId::Command => "command",
            StateId::CommandName => "command-name",
            StateId::OptionName => "option-name",
            StateId::PositionalValue => "positional-value",
            StateId::Address => "address",
            StateId::NodeType => "node-type",
            StateId::NodeName => "node-name",
            StateId::OperationName => "operation-name",
            StateId::OperationArgs => "operation-arguments",
            StateId::ArgumentName => "argument-name",
            StateId::ArgumentValue => "argument-value",
            StateId::Headers => "headers",
            StateId::HeaderName => "header-name",
            StateId::Scalar => "scalar",
            StateId::Quoted => "quoted",
            StateId::BackQuoted => "back-quoted",
            StateId::Expression => "expression",
            StateId::Object => "object",
            StateId::ObjectKey => "object-key",
            StateId::List => "list",
            StateId::ValueRoot => "value",
        }
    }

    /// States that count towards the nesting limit
    pub fn is_composite(&self) -> bool {
        matches!(self, StateId::Object | StateId::List)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-frame progress marker. Each state only uses the phases that apply to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Initial,

    // Line
    AfterCommand,
    AfterPipe,

    // Address
    NodeStart,
    AfterType,
    AfterName,
    AfterOperation,
    AfterArgs,
    Complete,

    // Delimited sequences: argument lists, headers, objects, lists
    AfterSeparator,
    AfterItem,

    // Object key with whitespace before '='
    TrailingSpace,

    // Scalar that only stops at whitespace and operators
    Loose,

    // Expression brace depth
    Depth(usize),
}

/// Character handler: works only through the context and the callback
pub type Handler = fn(&mut ParsingContext<'_>, &mut dyn ParsingCallback) -> Result<(), FormatError>;

/// Validation run before a frame is popped
pub type LeaveCheck = fn(&ParsingContext<'_>) -> Result<(), FormatError>;

/// What happens to a frame still open when the input runs out
#[derive(Clone, Copy)]
pub enum EndOfInput {
    /// Leave normally
    Finish,
    /// Fail with the error built from the input length
    Fail(fn(usize) -> FormatError),
}

/// Immutable state descriptor
pub struct ParsingState {
    id: StateId,
    transitions: HashMap<char, Handler>,
    default_handler: Handler,
    on_enter: Option<Handler>,
    on_return: Option<Handler>,
    on_leave: Option<LeaveCheck>,
    end_of_input: EndOfInput,
    escapes: bool,
}

impl ParsingState {
    pub fn new(id: StateId, default_handler: Handler) -> Self {
        Self {
            id,
            transitions: HashMap::new(),
            default_handler,
            on_enter: None,
            on_return: None,
            on_leave: None,
            end_of_input: EndOfInput::Finish,
            escapes: false,
        }
    }

    /// Route the given trigger characters to a handler
    pub fn on(mut self, triggers: &[char], handler: Handler) -> Self {
        for &trigger in triggers {
            self.transitions.insert(trigger, handler);
        }
        self
    }

    pub fn entered_by(mut self, handler: Handler) -> Self {
        self.on_enter = Some(handler);
        self
    }

    /// Handler run when a child state returns control to this one
    pub fn returned_to_by(mut self, handler: Handler) -> Self {
        self.on_return = Some(handler);
        self
    }

    pub fn checked_on_leave(mut self, check: LeaveCheck) -> Self {
        self.on_leave = Some(check);
        self
    }

    pub fn at_end(mut self, policy: EndOfInput) -> Self {
        self.end_of_input = policy;
        self
    }

    /// Treat '\' as an escape for the following character
    pub fn with_escapes(mut self) -> Self {
        self.escapes = true;
        self
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn handler_for(&self, ch: char) -> Handler {
        self.transitions
            .get(&ch)
            .copied()
            .unwrap_or(self.default_handler)
    }

    pub fn has_transition(&self, ch: char) -> bool {
        self.transitions.contains_key(&ch)
    }

    pub fn on_enter(&self) -> Option<Handler> {
        self.on_enter
    }

    pub fn on_return(&self) -> Option<Handler> {
        self.on_return
    }

    pub fn on_leave(&self) -> Option<LeaveCheck> {
        self.on_leave
    }

    pub fn end_of_input(&self) -> EndOfInput {
        self.end_of_input
    }

    pub fn escapes(&self) -> bool {
        self.escapes
    }
}

impl fmt::Debug for ParsingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut triggers: Vec<char> = self.transitions.keys().copied().collect();
        triggers.sort_unstable();
        f.debug_struct("ParsingState")
            .field("id", &self.id)
            .field("triggers", &triggers)
            .field("escapes", &self.escapes)
            .finish()
    }
}

pub const WHITESPACE: [char; 4] = [' ', '\t', '\n', '\r'];

/// The complete set of state descriptors, indexed by `StateId`
#[derive(Debug)]
pub struct StateTable {
    states: Vec<ParsingState>,
}

impl StateTable {
    pub fn new() -> Self {
        let states: Vec<ParsingState> = StateId::ALL.iter().map(|&id| describe(id)).collect();
        debug_assert!(states
            .iter()
            .enumerate()
            .all(|(index, state)| state.id as usize == index));
        Self { states }
    }

    pub fn get(&self, id: StateId) -> &ParsingState {
        &self.states[id as usize]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Default for StateTable {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(id: StateId) -> ParsingState {
    use handlers::*;

    match id {
        StateId::Line => ParsingState::new(id, line_content)
            .on(&WHITESPACE, skip)
            .checked_on_leave(check_line_end),

        StateId::Operator => ParsingState::new(id, leave_here).entered_by(operator_enter),

        StateId::Command => ParsingState::new(id, command_content)
            .entered_by(command_enter)
            .on(&WHITESPACE, skip)
            .on(&['|', ';'], leave_here),

        StateId::CommandName => ParsingState::new(id, emit_content)
            .on(&WHITESPACE, leave_here)
            .on(&['|', ';'], leave_here)
            .on(&['"'], enter_quoted)
            .with_escapes(),

        StateId::OptionName => ParsingState::new(id, emit_content)
            .entered_by(option_enter)
            .on(&['='], name_then_value)
            .on(&WHITESPACE, leave_here)
            .on(&['|', ';'], leave_here)
            .on(&['"'], enter_quoted)
            .checked_on_leave(check_argument_name)
            .with_escapes(),

        StateId::PositionalValue => ParsingState::new(id, leave_here)
            .entered_by(positional_enter)
            .returned_to_by(leave_here),

        StateId::Address => ParsingState::new(id, address_content)
            .entered_by(address_enter)
            .on(&WHITESPACE, skip)
            .on(&['/'], address_slash)
            .on(&['='], address_equals)
            .on(&[':'], address_colon)
            .on(&['('], address_open_args)
            .on(&['{'], address_open_headers)
            .on(&['|', ';'], leave_here),

        StateId::NodeType => ParsingState::new(id, emit_content)
            .on(&['='], node_type_end)
            .on(&['/', ':', '(', '{', '|', ';'], leave_here)
            .on(&WHITESPACE, leave_here),

        StateId::NodeName => ParsingState::new(id, emit_content)
            .entered_by(consume_trigger)
            .on(&['/', ':', '(', '{', '|', ';'], leave_here)
            .on(&WHITESPACE, leave_here)
            .on(&['='], node_name_equals)
            .on(&['"'], enter_quoted)
            .checked_on_leave(check_node_name)
            .with_escapes(),

        StateId::OperationName => ParsingState::new(id, emit_content)
            .entered_by(consume_trigger)
            .on(&['(', '{', '|', ';'], leave_here)
            .on(&WHITESPACE, leave_here),

        StateId::OperationArgs => ParsingState::new(id, arguments_item)
            .entered_by(consume_trigger)
            .on(&WHITESPACE, skip)
            .on(&[')'], arguments_close)
            .on(&[','], arguments_separator)
            .at_end(EndOfInput::Fail(|offset| {
                FormatError::unterminated_composite('(', offset)
            })),

        StateId::ArgumentName => ParsingState::new(id, emit_content)
            .entered_by(count_argument)
            .on(&['='], name_then_value)
            .on(&[',', ')'], leave_here)
            .on(&WHITESPACE, leave_here)
            .on(&['"'], enter_quoted)
            .checked_on_leave(check_argument_name)
            .with_escapes(),

        StateId::ArgumentValue => ParsingState::new(id, leave_here)
            .entered_by(argument_value_enter)
            .returned_to_by(leave_here),

        StateId::Headers => ParsingState::new(id, headers_item)
            .entered_by(consume_trigger)
            .on(&WHITESPACE, skip)
            .on(&['}'], headers_close)
            .on(&[';'], headers_separator)
            .at_end(EndOfInput::Fail(|offset| {
                FormatError::unterminated_composite('{', offset)
            })),

        StateId::HeaderName => ParsingState::new(id, emit_content)
            .entered_by(count_argument)
            .on(&['='], name_then_value)
            .on(&[';', '}'], leave_here)
            .on(&WHITESPACE, leave_here)
            .checked_on_leave(check_argument_name)
            .with_escapes(),

        StateId::Scalar => ParsingState::new(id, scalar_content)
            .on(&['"'], enter_quoted)
            .on(&['$'], scalar_dollar)
            .with_escapes(),

        StateId::Quoted => ParsingState::new(id, emit_content)
            .entered_by(consume_trigger)
            .on(&['"'], close_here)
            .at_end(EndOfInput::Fail(|offset| FormatError::UnterminatedQuote { offset }))
            .with_escapes(),

        StateId::BackQuoted => ParsingState::new(id, emit_content)
            .entered_by(consume_trigger)
            .on(&['`'], close_here)
            .at_end(EndOfInput::Fail(|offset| FormatError::UnterminatedBackQuote { offset }))
            .with_escapes(),

        StateId::Expression => ParsingState::new(id, emit_content)
            .entered_by(expression_enter)
            .on(&['{'], expression_open)
            .on(&['}'], expression_close)
            .at_end(EndOfInput::Fail(|offset| FormatError::UnterminatedExpression { offset })),

        StateId::Object => ParsingState::new(id, object_item)
            .entered_by(consume_trigger)
            .on(&WHITESPACE, skip)
            .on(&['}'], object_close)
            .on(&[','], object_separator)
            .at_end(EndOfInput::Fail(|offset| {
                FormatError::unterminated_composite('{', offset)
            })),

        StateId::ObjectKey => ParsingState::new(id, object_key_content)
            .on(&['='], object_key_end)
            .on(&WHITESPACE, object_key_space)
            .on(&[',', '}', '[', ']', '{'], object_key_unexpected)
            .on(&['"'], enter_quoted)
            .at_end(EndOfInput::Fail(|offset| {
                FormatError::unterminated_composite('{', offset)
            }))
            .with_escapes(),

        StateId::List => ParsingState::new(id, list_item)
            .entered_by(consume_trigger)
            .on(&WHITESPACE, skip)
            .on(&[']'], list_close)
            .on(&[','], list_separator)
            .at_end(EndOfInput::Fail(|offset| {
                FormatError::unterminated_composite('[', offset)
            })),

        StateId::ValueRoot => ParsingState::new(id, leave_here)
            .entered_by(value_root_enter)
            .returned_to_by(leave_here),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_id() {
        let table = StateTable::new();
        assert_eq!(table.len(), StateId::ALL.len());
        for id in StateId::ALL {
            assert_eq!(table.get(id).id(), id);
        }
    }

    #[test]
    fn test_transition_triggers() {
        let table = StateTable::new();
        let object = table.get(StateId::Object);
        assert!(object.has_transition('}'));
        assert!(object.has_transition(','));
        assert!(!object.has_transition('a'));

        assert!(table.get(StateId::Quoted).escapes());
        assert!(!table.get(StateId::Expression).escapes());
        assert!(table.get(StateId::ArgumentValue).on_return().is_some());
    }

    #[test]
    fn test_only_object_and_list_are_composite() {
        let composite: Vec<StateId> = StateId::ALL
            .into_iter()
            .filter(StateId::is_composite)
            .collect();
        assert_eq!(composite, vec![StateId::Object, StateId::List]);
    }

    #[test]
    fn test_unterminated_policies_report_offset() {
        let table = StateTable::new();
        match table.get(StateId::Quoted).end_of_input() {
            EndOfInput::Fail(make) => {
                assert_eq!(make(4), FormatError::UnterminatedQuote { offset: 4 })
            }
            EndOfInput::Finish => panic!("quoted strings must be closed"),
        }
    }
}
