//! Character handlers referenced by the state table
//!
//! Every handler either consumes the current character or changes the state
//! stack. Handlers never touch a `ParsingState`; all mutation goes through the
//! context and the callback.

use super::callback::ParsingCallback;
use super::context::{ParseMode, ParsingContext};
use super::error::FormatError;
use super::state::{Phase, StateId, WHITESPACE};

type Outcome = Result<(), FormatError>;

/// Characters that end an unquoted value. Inside argument lists and
/// composites the delimiters of the enclosing construct also end it.
pub fn is_value_terminator(ch: char, loose: bool) -> bool {
    match ch {
        '|' | ';' => true,
        _ if WHITESPACE.contains(&ch) => true,
        ',' | ')' | '}' | ']' => !loose,
        _ => false,
    }
}

fn unexpected(ctx: &ParsingContext<'_>, expected: &str, ch: char) -> FormatError {
    FormatError::unexpected(expected, ch, ctx.offset())
}

// ----------------------------------------------------------------------------
// Shared
// ----------------------------------------------------------------------------

pub fn skip(ctx: &mut ParsingContext<'_>, _cb: &mut dyn ParsingCallback) -> Outcome {
    ctx.advance();
    Ok(())
}

/// Return to the parent without consuming the current character
pub fn leave_here(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    ctx.leave(cb)
}

pub fn emit_content(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    if let Some(ch) = ctx.current() {
        ctx.emit(cb, ch);
        ctx.advance();
    }
    Ok(())
}

/// Consume the character that triggered the state
pub fn consume_trigger(ctx: &mut ParsingContext<'_>, _cb: &mut dyn ParsingCallback) -> Outcome {
    ctx.advance();
    ctx.mark_content_start();
    Ok(())
}

/// Consume the closing delimiter and leave
pub fn close_here(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    ctx.advance();
    ctx.leave(cb)
}

pub fn enter_quoted(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    ctx.enter(StateId::Quoted, cb)
}

pub fn count_argument(ctx: &mut ParsingContext<'_>, _cb: &mut dyn ParsingCallback) -> Outcome {
    ctx.count_argument()
}

/// Name finished at '=': hand over to the value state
pub fn name_then_value(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    ctx.leave(cb)?;
    ctx.enter(StateId::ArgumentValue, cb)
}

pub fn check_argument_name(ctx: &ParsingContext<'_>) -> Outcome {
    if ctx.token_is_empty() {
        return Err(FormatError::missing_name("argument name", ctx.offset()));
    }
    if ctx.current() != Some('=') && !ctx.options().allow_flag_arguments {
        return Err(FormatError::MissingValue {
            offset: ctx.offset(),
        });
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Line and operators
// ----------------------------------------------------------------------------

pub fn line_content(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    let Some(ch) = ctx.current() else {
        return Ok(());
    };
    let after_command = ctx.phase() == Phase::AfterCommand;

    match ch {
        '|' | ';' if after_command => {
            ctx.set_phase(if ch == '|' {
                Phase::AfterPipe
            } else {
                Phase::Initial
            });
            ctx.enter(StateId::Operator, cb)
        }
        '|' | ';' => Err(unexpected(ctx, "command", ch)),
        _ if after_command => Err(unexpected(ctx, "'|' or ';'", ch)),
        '/' | '.' | ':' => {
            ctx.count_command()?;
            ctx.set_phase(Phase::AfterCommand);
            ctx.enter(StateId::Address, cb)
        }
        _ => {
            ctx.count_command()?;
            ctx.set_phase(Phase::AfterCommand);
            ctx.enter(StateId::Command, cb)
        }
    }
}

pub fn check_line_end(ctx: &ParsingContext<'_>) -> Outcome {
    if ctx.phase() == Phase::AfterPipe {
        return Err(FormatError::TrailingSeparator {
            separator: '|',
            offset: ctx.input_len(),
        });
    }
    Ok(())
}

/// Zero-width: report the operator and return immediately
pub fn operator_enter(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    if let Some(ch) = ctx.current() {
        ctx.emit(cb, ch);
        ctx.advance();
    }
    ctx.leave(cb)
}

// ----------------------------------------------------------------------------
// Command form
// ----------------------------------------------------------------------------

pub fn command_enter(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    ctx.enter(StateId::CommandName, cb)
}

pub fn command_content(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    if ctx.current() == Some('-') && ctx.peek() == Some('-') {
        ctx.enter(StateId::OptionName, cb)
    } else {
        ctx.enter(StateId::PositionalValue, cb)
    }
}

pub fn option_enter(ctx: &mut ParsingContext<'_>, _cb: &mut dyn ParsingCallback) -> Outcome {
    ctx.count_argument()?;
    ctx.advance();
    ctx.advance();
    ctx.mark_content_start();
    Ok(())
}

pub fn positional_enter(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    ctx.count_argument()?;
    enter_value(ctx, cb, true, false)
}

// ----------------------------------------------------------------------------
// Address and operation
// ----------------------------------------------------------------------------

fn address_expectation(phase: Phase) -> &'static str {
    match phase {
        Phase::NodeStart => "node type or ':'",
        Phase::AfterType => "'=', '/' or ':'",
        Phase::AfterName => "'/' or ':'",
        Phase::AfterOperation => "'(' or '{'",
        Phase::AfterArgs => "'{'",
        _ => "'|', ';' or end of line",
    }
}

pub fn address_enter(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    ctx.set_phase(Phase::NodeStart);
    if ctx.current() == Some('/') {
        ctx.emit(cb, '/');
        ctx.advance();
    }
    Ok(())
}

pub fn address_content(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    let Some(ch) = ctx.current() else {
        return Ok(());
    };
    match ctx.phase() {
        Phase::NodeStart => {
            ctx.set_phase(Phase::AfterType);
            ctx.enter(StateId::NodeType, cb)
        }
        phase => Err(unexpected(ctx, address_expectation(phase), ch)),
    }
}

pub fn address_slash(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    match ctx.phase() {
        Phase::AfterType | Phase::AfterName => {
            ctx.emit(cb, '/');
            ctx.advance();
            ctx.set_phase(Phase::NodeStart);
            Ok(())
        }
        Phase::NodeStart => Err(unexpected(ctx, "node type", '/')),
        phase => Err(unexpected(ctx, address_expectation(phase), '/')),
    }
}

pub fn address_equals(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    match ctx.phase() {
        Phase::AfterType => {
            ctx.set_phase(Phase::AfterName);
            ctx.enter(StateId::NodeName, cb)
        }
        phase => Err(unexpected(ctx, address_expectation(phase), '=')),
    }
}

pub fn address_colon(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    match ctx.phase() {
        Phase::NodeStart | Phase::AfterType | Phase::AfterName => {
            ctx.set_phase(Phase::AfterOperation);
            ctx.enter(StateId::OperationName, cb)
        }
        phase => Err(unexpected(ctx, address_expectation(phase), ':')),
    }
}

pub fn address_open_args(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    match ctx.phase() {
        Phase::AfterOperation => {
            ctx.set_phase(Phase::AfterArgs);
            ctx.enter(StateId::OperationArgs, cb)
        }
        phase => Err(unexpected(ctx, address_expectation(phase), '(')),
    }
}

pub fn address_open_headers(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    match ctx.phase() {
        Phase::AfterOperation | Phase::AfterArgs => {
            ctx.set_phase(Phase::Complete);
            ctx.enter(StateId::Headers, cb)
        }
        phase => Err(unexpected(ctx, address_expectation(phase), '{')),
    }
}

/// `..` and `.` are complete nodes and cannot take a name
pub fn node_type_end(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    let token = ctx.token();
    if token.is_empty() {
        return Err(FormatError::missing_name("node type", ctx.offset()));
    }
    if token == "." || token == ".." {
        return Err(unexpected(ctx, "'/' or ':'", '='));
    }
    ctx.leave(cb)
}

pub fn node_name_equals(ctx: &mut ParsingContext<'_>, _cb: &mut dyn ParsingCallback) -> Outcome {
    Err(unexpected(ctx, "'/' or ':'", '='))
}

pub fn check_node_name(ctx: &ParsingContext<'_>) -> Outcome {
    if ctx.token_is_empty() {
        return Err(FormatError::missing_name("node name", ctx.offset()));
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Delimited sequences
// ----------------------------------------------------------------------------

fn sequence_close(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback, separator: char) -> Outcome {
    if ctx.phase() == Phase::AfterSeparator {
        return Err(FormatError::TrailingSeparator {
            separator,
            offset: ctx.offset(),
        });
    }
    ctx.advance();
    ctx.leave(cb)
}

fn sequence_separator(ctx: &mut ParsingContext<'_>, separator: char, expected_item: &str) -> Outcome {
    if ctx.phase() != Phase::AfterItem {
        return Err(unexpected(ctx, expected_item, separator));
    }
    ctx.advance();
    ctx.set_phase(Phase::AfterSeparator);
    Ok(())
}

/// Returns true when an item may start here, marking the sequence as
/// waiting for a separator once the item returns
fn sequence_item_allowed(ctx: &mut ParsingContext<'_>) -> bool {
    match ctx.phase() {
        Phase::Initial | Phase::AfterSeparator => {
            ctx.set_phase(Phase::AfterItem);
            true
        }
        _ => false,
    }
}

pub fn arguments_item(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    let Some(ch) = ctx.current() else {
        return Ok(());
    };
    if !sequence_item_allowed(ctx) {
        return Err(unexpected(ctx, "',' or ')'", ch));
    }
    ctx.enter(StateId::ArgumentName, cb)
}

pub fn arguments_close(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    sequence_close(ctx, cb, ',')
}

pub fn arguments_separator(ctx: &mut ParsingContext<'_>, _cb: &mut dyn ParsingCallback) -> Outcome {
    sequence_separator(ctx, ',', "argument name")
}

pub fn argument_value_enter(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    if ctx.current() == Some('=') {
        ctx.advance();
    }
    let loose = ctx.parent_id() == Some(StateId::Command);
    enter_value(ctx, cb, loose, false)
}

pub fn headers_item(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    let Some(ch) = ctx.current() else {
        return Ok(());
    };
    if !sequence_item_allowed(ctx) {
        return Err(unexpected(ctx, "';' or '}'", ch));
    }
    ctx.enter(StateId::HeaderName, cb)
}

pub fn headers_close(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    sequence_close(ctx, cb, ';')
}

pub fn headers_separator(ctx: &mut ParsingContext<'_>, _cb: &mut dyn ParsingCallback) -> Outcome {
    sequence_separator(ctx, ';', "header name")
}

pub fn object_item(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    let Some(ch) = ctx.current() else {
        return Ok(());
    };
    if !sequence_item_allowed(ctx) {
        return Err(unexpected(ctx, "',' or '}'", ch));
    }
    ctx.enter(StateId::ObjectKey, cb)
}

pub fn object_close(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    sequence_close(ctx, cb, ',')
}

pub fn object_separator(ctx: &mut ParsingContext<'_>, _cb: &mut dyn ParsingCallback) -> Outcome {
    sequence_separator(ctx, ',', "object key or '}'")
}

pub fn list_item(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    let Some(ch) = ctx.current() else {
        return Ok(());
    };
    if !sequence_item_allowed(ctx) {
        return Err(unexpected(ctx, "',' or ']'", ch));
    }
    enter_value(ctx, cb, false, true)
}

pub fn list_close(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    sequence_close(ctx, cb, ',')
}

pub fn list_separator(ctx: &mut ParsingContext<'_>, _cb: &mut dyn ParsingCallback) -> Outcome {
    sequence_separator(ctx, ',', "list item or ']'")
}

// ----------------------------------------------------------------------------
// Object keys
// ----------------------------------------------------------------------------

pub fn object_key_content(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    let Some(ch) = ctx.current() else {
        return Ok(());
    };
    if ctx.phase() == Phase::TrailingSpace {
        return Err(unexpected(ctx, "'='", ch));
    }
    ctx.emit(cb, ch);
    ctx.advance();
    Ok(())
}

pub fn object_key_space(ctx: &mut ParsingContext<'_>, _cb: &mut dyn ParsingCallback) -> Outcome {
    ctx.set_phase(Phase::TrailingSpace);
    ctx.advance();
    Ok(())
}

pub fn object_key_end(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    if ctx.token_is_empty() {
        return Err(FormatError::missing_name("object key", ctx.offset()));
    }
    ctx.leave(cb)?;
    ctx.advance();
    enter_value(ctx, cb, false, true)
}

pub fn object_key_unexpected(ctx: &mut ParsingContext<'_>, _cb: &mut dyn ParsingCallback) -> Outcome {
    let Some(ch) = ctx.current() else {
        return Ok(());
    };
    Err(unexpected(ctx, "'='", ch))
}

// ----------------------------------------------------------------------------
// Values
// ----------------------------------------------------------------------------

/// Dispatch on the first character of a value. `loose` values only stop at
/// whitespace and operators; `required` values may not be empty.
pub fn enter_value(
    ctx: &mut ParsingContext<'_>,
    cb: &mut dyn ParsingCallback,
    loose: bool,
    required: bool,
) -> Outcome {
    if required {
        ctx.skip_whitespace();
    }

    match ctx.current() {
        Some('{') => ctx.enter(StateId::Object, cb),
        Some('[') => ctx.enter(StateId::List, cb),
        Some('`') => ctx.enter(StateId::BackQuoted, cb),
        Some(ch) if !is_value_terminator(ch, loose) => enter_scalar(ctx, cb, loose),
        current => {
            if required && (current.is_some() || ctx.mode() == ParseMode::Execute) {
                return Err(FormatError::MissingValue {
                    offset: ctx.offset(),
                });
            }
            enter_scalar(ctx, cb, loose)
        }
    }
}

fn enter_scalar(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback, loose: bool) -> Outcome {
    ctx.enter(StateId::Scalar, cb)?;
    if loose {
        ctx.set_phase(Phase::Loose);
    }
    Ok(())
}

pub fn value_root_enter(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    enter_value(ctx, cb, false, true)
}

pub fn scalar_content(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    let Some(ch) = ctx.current() else {
        return Ok(());
    };
    if is_value_terminator(ch, ctx.phase() == Phase::Loose) {
        return ctx.leave(cb);
    }
    ctx.emit(cb, ch);
    ctx.advance();
    Ok(())
}

pub fn scalar_dollar(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    if ctx.peek() == Some('{') {
        return ctx.enter(StateId::Expression, cb);
    }
    ctx.emit(cb, '$');
    ctx.advance();
    Ok(())
}

fn expression_depth(ctx: &ParsingContext<'_>) -> usize {
    match ctx.phase() {
        Phase::Depth(depth) => depth,
        _ => 1,
    }
}

/// Expressions keep their raw text, including `${` and the closing brace
pub fn expression_enter(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    ctx.emit(cb, '$');
    ctx.advance();
    ctx.emit(cb, '{');
    ctx.advance();
    ctx.set_phase(Phase::Depth(1));
    Ok(())
}

pub fn expression_open(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    let depth = expression_depth(ctx);
    ctx.emit(cb, '{');
    ctx.advance();
    ctx.set_phase(Phase::Depth(depth + 1));
    Ok(())
}

pub fn expression_close(ctx: &mut ParsingContext<'_>, cb: &mut dyn ParsingCallback) -> Outcome {
    let depth = expression_depth(ctx);
    ctx.emit(cb, '}');
    ctx.advance();
    if depth <= 1 {
        return ctx.leave(cb);
    }
    ctx.set_phase(Phase::Depth(depth - 1));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminators_depend_on_context() {
        assert!(is_value_terminator(' ', true));
        assert!(is_value_terminator('|', true));
        assert!(!is_value_terminator(',', true));
        assert!(is_value_terminator(',', false));
        assert!(is_value_terminator(']', false));
        assert!(!is_value_terminator('>', false));
        assert!(!is_value_terminator('=', false));
    }
}
