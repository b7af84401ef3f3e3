//! Events emitted by the state machine while it walks the input

use super::state::StateId;

/// Receives content characters and state boundaries in input order.
///
/// Delimiters, separators and quotes are not passed to `character`. Content
/// arrives already unescaped, as do the two structural characters a consumer
/// needs: the leading `/` of an address and the operator ending a command.
pub trait ParsingCallback {
    fn enter_state(&mut self, state: StateId, offset: usize);

    fn leave_state(&mut self, state: StateId, offset: usize);

    fn character(&mut self, ch: char, offset: usize);
}

/// Records every event; used to inspect the machine in tests and traces
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventRecorder {
    pub events: Vec<ParseEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseEvent {
    Enter(StateId),
    Leave(StateId),
    Char(char),
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content characters joined together
    pub fn text(&self) -> String {
        self.events
            .iter()
            .filter_map(|event| match event {
                ParseEvent::Char(ch) => Some(*ch),
                _ => None,
            })
            .collect()
    }

    /// States entered, in order
    pub fn entered(&self) -> Vec<StateId> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ParseEvent::Enter(id) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl ParsingCallback for EventRecorder {
    fn enter_state(&mut self, state: StateId, _offset: usize) {
        self.events.push(ParseEvent::Enter(state));
    }

    fn leave_state(&mut self, state: StateId, _offset: usize) {
        self.events.push(ParseEvent::Leave(state));
    }

    fn character(&mut self, ch: char, _offset: usize) {
        self.events.push(ParseEvent::Char(ch));
    }
}
