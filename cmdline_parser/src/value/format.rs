//! Canonical text form of values. Parsing the output yields the same value.

use super::ArgumentValue;
use std::fmt::{self, Write};

/// Characters with a grammar meaning somewhere in a value
const SPECIAL: &[char] = &[
    '"', '\\', ',', '=', '{', '}', '[', ']', '(', ')', '|', ';', '$', '`',
];

fn is_special(ch: char) -> bool {
    ch.is_whitespace() || SPECIAL.contains(&ch)
}

pub fn needs_quoting(text: &str) -> bool {
    text.is_empty() || text.chars().any(is_special)
}

/// Scalar text, quoted only when it would not survive unquoted
pub fn quote_scalar(text: &str) -> String {
    if !needs_quoting(text) {
        return text.to_string();
    }
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// Backslash-escape grammar characters in a name; an empty name is `""`
pub fn escape_name(name: &str) -> String {
    if name.is_empty() {
        return "\"\"".to_string();
    }
    let mut escaped = String::with_capacity(name.len());
    for ch in name.chars() {
        if is_special(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Expression text: `${...}` references verbatim, everything else escaped.
/// Outside references `raw` carries literal characters behind a backslash.
fn write_expression(f: &mut fmt::Formatter<'_>, raw: &str) -> fmt::Result {
    let mut depth = 0usize;
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        if depth > 0 {
            match ch {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            f.write_char(ch)?;
        } else if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            depth = 1;
            f.write_str("${")?;
        } else if ch == '\\' {
            if let Some(literal) = chars.next() {
                f.write_char('\\')?;
                f.write_char(literal)?;
            }
        } else {
            if is_special(ch) {
                f.write_char('\\')?;
            }
            f.write_char(ch)?;
        }
    }
    Ok(())
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::Scalar(text) => f.write_str(&quote_scalar(text)),
            ArgumentValue::Expression(raw) => write_expression(f, raw),
            ArgumentValue::BackQuoted(command) => {
                f.write_char('`')?;
                for ch in command.chars() {
                    if ch == '`' || ch == '\\' {
                        f.write_char('\\')?;
                    }
                    f.write_char(ch)?;
                }
                f.write_char('`')
            }
            ArgumentValue::Object(entries) => {
                f.write_char('{')?;
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, "{}={}", escape_name(key), value)?;
                }
                f.write_char('}')
            }
            ArgumentValue::List(items) => {
                f.write_char('[')?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_char(']')
            }
        }
    }
}
