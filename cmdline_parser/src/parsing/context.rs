//! Mutable cursor over one command line plus the stack of active states

use super::callback::ParsingCallback;
use super::error::FormatError;
use super::state::{EndOfInput, Phase, StateId, StateTable, WHITESPACE};
use crate::config::compile_time::parsing::{
    MAX_ARGUMENTS, MAX_CHAINED_COMMANDS, MAX_LINE_LENGTH, MAX_NESTING_DEPTH,
};
use crate::config::runtime::ParserPreferences;
use crate::log_debug;

/// Whether the parse must succeed completely or may stop with open states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Execute,
    /// Unterminated constructs at the end of input are left open
    Completion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub mode: ParseMode,
    pub allow_flag_arguments: bool,
    pub join_continuation_lines: bool,
    pub trace_state_transitions: bool,
}

impl ParseOptions {
    pub fn from_preferences(preferences: &ParserPreferences, mode: ParseMode) -> Self {
        Self {
            mode,
            allow_flag_arguments: preferences.allow_flag_arguments,
            join_continuation_lines: preferences.join_continuation_lines,
            trace_state_transitions: preferences.trace_state_transitions,
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::from_preferences(&ParserPreferences::default(), ParseMode::Execute)
    }
}

/// One active state on the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub id: StateId,
    pub phase: Phase,
    /// Byte offset where the state's own content starts
    pub start: usize,
    start_index: usize,
}

/// Counters collected during one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseMetrics {
    pub states_entered: usize,
    pub max_depth: usize,
    pub characters: usize,
}

pub struct ParsingContext<'t> {
    table: &'t StateTable,
    options: ParseOptions,
    chars: Vec<(usize, char)>,
    input_len: usize,
    pos: usize,
    stack: Vec<Frame>,
    composite_depth: usize,
    arguments: usize,
    commands: usize,
    metrics: ParseMetrics,
    dirty: bool,
}

impl<'t> ParsingContext<'t> {
    pub fn new(table: &'t StateTable, options: ParseOptions) -> Self {
        Self {
            table,
            options,
            chars: Vec::new(),
            input_len: 0,
            pos: 0,
            stack: Vec::new(),
            composite_depth: 0,
            arguments: 0,
            commands: 0,
            metrics: ParseMetrics::default(),
            dirty: false,
        }
    }

    /// Clear all per-run state so the context can parse again
    pub fn reset(&mut self) {
        self.chars.clear();
        self.input_len = 0;
        self.pos = 0;
        self.stack.clear();
        self.composite_depth = 0;
        self.arguments = 0;
        self.commands = 0;
        self.metrics = ParseMetrics::default();
        self.dirty = false;
    }

    /// Run the machine over `input` starting in `root`. Returns the byte
    /// offset where parsing stopped.
    pub fn run(
        &mut self,
        input: &str,
        root: StateId,
        callback: &mut dyn ParsingCallback,
    ) -> Result<usize, FormatError> {
        if self.dirty {
            return Err(FormatError::ContextNotReset);
        }
        self.dirty = true;

        if input.len() > MAX_LINE_LENGTH {
            return Err(FormatError::InputTooLong {
                length: input.len(),
            });
        }

        self.chars = input.char_indices().collect();
        self.input_len = input.len();
        self.metrics.characters = self.chars.len();

        self.enter(root, callback)?;
        self.drive(callback)?;
        Ok(self.offset())
    }

    fn drive(&mut self, callback: &mut dyn ParsingCallback) -> Result<(), FormatError> {
        let table = self.table;

        loop {
            let Some(frame) = self.stack.last().copied() else {
                return Ok(());
            };
            let Some(ch) = self.current() else {
                break;
            };
            let state = table.get(frame.id);

            if ch == '\\' {
                if self.options.join_continuation_lines && self.skip_continuation() {
                    continue;
                }
                if state.escapes() {
                    let escape_offset = self.offset();
                    self.advance();
                    match self.current() {
                        Some(escaped) => {
                            self.emit(callback, escaped);
                            self.advance();
                        }
                        None if self.options.mode == ParseMode::Completion => {}
                        None => {
                            return Err(FormatError::DanglingEscape {
                                offset: escape_offset,
                            })
                        }
                    }
                    continue;
                }
            }

            let position = self.pos;
            let depth = self.stack.len();
            let handler = state.handler_for(ch);
            handler(self, callback)?;

            debug_assert!(
                self.pos != position
                    || self.stack.len() != depth
                    || self.stack.last() != Some(&frame),
                "state {} made no progress on {:?}",
                frame.id,
                ch
            );
        }

        if self.options.mode == ParseMode::Completion {
            return Ok(());
        }

        while let Some(frame) = self.stack.last().copied() {
            match table.get(frame.id).end_of_input() {
                EndOfInput::Finish => self.leave(callback)?,
                EndOfInput::Fail(make_error) => return Err(make_error(self.input_len)),
            }
        }

        Ok(())
    }

    /// Backslash followed by a line break joins the two physical lines
    fn skip_continuation(&mut self) -> bool {
        match (self.peek_at(1), self.peek_at(2)) {
            (Some('\n'), _) => {
                self.pos += 2;
                true
            }
            (Some('\r'), Some('\n')) => {
                self.pos += 3;
                true
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    pub fn current(&self) -> Option<char> {
        self.peek_at(0)
    }

    pub fn peek(&self) -> Option<char> {
        self.peek_at(1)
    }

    pub fn peek_at(&self, distance: usize) -> Option<char> {
        self.chars.get(self.pos + distance).map(|&(_, ch)| ch)
    }

    /// Byte offset of the current character, or the input length at the end
    pub fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(offset, _)| offset)
            .unwrap_or(self.input_len)
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn advance(&mut self) {
        if self.pos < self.chars.len() {
            self.pos += 1;
        }
    }

    pub fn skip_whitespace(&mut self) {
        while matches!(self.current(), Some(ch) if WHITESPACE.contains(&ch)) {
            self.advance();
        }
    }

    /// Pass a content character to the callback
    pub fn emit(&mut self, callback: &mut dyn ParsingCallback, ch: char) {
        callback.character(ch, self.offset());
    }

    // ------------------------------------------------------------------
    // State stack
    // ------------------------------------------------------------------

    pub fn enter(
        &mut self,
        id: StateId,
        callback: &mut dyn ParsingCallback,
    ) -> Result<(), FormatError> {
        if id.is_composite() {
            self.composite_depth += 1;
            if self.composite_depth > MAX_NESTING_DEPTH {
                return Err(FormatError::NestingTooDeep {
                    depth: self.composite_depth,
                    offset: self.offset(),
                });
            }
        }

        if self.options.trace_state_transitions {
            log_debug!("Entering parsing state",
                "state" => id,
                "offset" => self.offset(),
                "depth" => self.stack.len()
            );
        }

        self.stack.push(Frame {
            id,
            phase: Phase::Initial,
            start: self.offset(),
            start_index: self.pos,
        });
        self.metrics.states_entered += 1;
        self.metrics.max_depth = self.metrics.max_depth.max(self.stack.len());
        callback.enter_state(id, self.offset());

        if let Some(on_enter) = self.table.get(id).on_enter() {
            on_enter(self, callback)?;
        }
        Ok(())
    }

    /// Pop the active state and hand control back to its parent
    pub fn leave(&mut self, callback: &mut dyn ParsingCallback) -> Result<(), FormatError> {
        let table = self.table;
        let Some(frame) = self.stack.last().copied() else {
            return Ok(());
        };

        if let Some(check) = table.get(frame.id).on_leave() {
            check(self)?;
        }

        self.stack.pop();
        if frame.id.is_composite() {
            self.composite_depth -= 1;
        }

        if self.options.trace_state_transitions {
            log_debug!("Leaving parsing state", "state" => frame.id, "offset" => self.offset());
        }
        callback.leave_state(frame.id, self.offset());

        if let Some(parent) = self.stack.last() {
            if let Some(on_return) = table.get(parent.id).on_return() {
                on_return(self, callback)?;
            }
        }
        Ok(())
    }

    pub fn top_id(&self) -> Option<StateId> {
        self.stack.last().map(|frame| frame.id)
    }

    /// The state below the active one
    pub fn parent_id(&self) -> Option<StateId> {
        self.stack
            .len()
            .checked_sub(2)
            .and_then(|index| self.stack.get(index))
            .map(|frame| frame.id)
    }

    pub fn phase(&self) -> Phase {
        self.stack
            .last()
            .map(|frame| frame.phase)
            .unwrap_or_default()
    }

    pub fn set_phase(&mut self, phase: Phase) {
        if let Some(frame) = self.stack.last_mut() {
            frame.phase = phase;
        }
    }

    /// Restart the active state's content at the current offset
    pub fn mark_content_start(&mut self) {
        let (offset, pos) = (self.offset(), self.pos);
        if let Some(frame) = self.stack.last_mut() {
            frame.start = offset;
            frame.start_index = pos;
        }
    }

    /// Raw source text of the active state's content so far
    pub fn token(&self) -> String {
        let start = self
            .stack
            .last()
            .map(|frame| frame.start_index)
            .unwrap_or(self.pos);
        self.chars[start.min(self.pos)..self.pos]
            .iter()
            .map(|&(_, ch)| ch)
            .collect()
    }

    pub fn token_is_empty(&self) -> bool {
        self.stack
            .last()
            .map(|frame| frame.start_index >= self.pos)
            .unwrap_or(true)
    }

    /// States still open, outermost first
    pub fn open_states(&self) -> &[Frame] {
        &self.stack
    }

    // ------------------------------------------------------------------
    // Limits and options
    // ------------------------------------------------------------------

    /// Arguments of the current command; the count restarts with each command
    pub fn count_argument(&mut self) -> Result<(), FormatError> {
        self.arguments += 1;
        if self.arguments > MAX_ARGUMENTS {
            return Err(FormatError::TooManyArguments {
                offset: self.offset(),
            });
        }
        Ok(())
    }

    /// Called as each command starts
    pub fn count_command(&mut self) -> Result<(), FormatError> {
        self.commands += 1;
        self.arguments = 0;
        if self.commands > MAX_CHAINED_COMMANDS {
            return Err(FormatError::TooManyCommands {
                offset: self.offset(),
            });
        }
        Ok(())
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn mode(&self) -> ParseMode {
        self.options.mode
    }

    pub fn metrics(&self) -> &ParseMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::callback::{EventRecorder, ParseEvent};
    use assert_matches::assert_matches;

    fn execute() -> ParseOptions {
        ParseOptions {
            mode: ParseMode::Execute,
            allow_flag_arguments: true,
            join_continuation_lines: true,
            trace_state_transitions: false,
        }
    }

    #[test]
    fn test_reuse_requires_reset() {
        let table = StateTable::new();
        let mut ctx = ParsingContext::new(&table, execute());
        let mut recorder = EventRecorder::new();

        ctx.run("abc", StateId::ValueRoot, &mut recorder).unwrap();
        assert_matches!(
            ctx.run("abc", StateId::ValueRoot, &mut recorder),
            Err(FormatError::ContextNotReset)
        );

        ctx.reset();
        assert!(ctx.run("abc", StateId::ValueRoot, &mut recorder).is_ok());
    }

    #[test]
    fn test_escape_emits_literal_character() {
        let table = StateTable::new();
        let mut ctx = ParsingContext::new(&table, execute());
        let mut recorder = EventRecorder::new();

        ctx.run(r"a\,b", StateId::ValueRoot, &mut recorder).unwrap();
        assert_eq!(recorder.text(), "a,b");
    }

    #[test]
    fn test_dangling_escape_reports_backslash_offset() {
        let table = StateTable::new();
        let mut ctx = ParsingContext::new(&table, execute());
        let mut recorder = EventRecorder::new();

        assert_matches!(
            ctx.run(r"ab\", StateId::ValueRoot, &mut recorder),
            Err(FormatError::DanglingEscape { offset: 2 })
        );
    }

    #[test]
    fn test_continuation_lines_are_joined() {
        let table = StateTable::new();
        let mut ctx = ParsingContext::new(&table, execute());
        let mut recorder = EventRecorder::new();

        ctx.run("ab\\\ncd", StateId::ValueRoot, &mut recorder).unwrap();
        assert_eq!(recorder.text(), "abcd");
    }

    #[test]
    fn test_completion_mode_leaves_states_open() {
        let table = StateTable::new();
        let options = ParseOptions {
            mode: ParseMode::Completion,
            ..execute()
        };
        let mut ctx = ParsingContext::new(&table, options);
        let mut recorder = EventRecorder::new();

        ctx.run("{a=[1,", StateId::ValueRoot, &mut recorder).unwrap();
        let open: Vec<StateId> = ctx.open_states().iter().map(|f| f.id).collect();
        assert_eq!(
            open,
            vec![StateId::ValueRoot, StateId::Object, StateId::List]
        );
        assert!(!recorder.events.contains(&ParseEvent::Leave(StateId::Object)));
    }

    #[test]
    fn test_metrics_track_depth() {
        let table = StateTable::new();
        let mut ctx = ParsingContext::new(&table, execute());
        let mut recorder = EventRecorder::new();

        ctx.run("[[[]]]", StateId::ValueRoot, &mut recorder).unwrap();
        assert_eq!(ctx.metrics().max_depth, 4);
        assert_eq!(ctx.metrics().characters, 6);
    }
}
