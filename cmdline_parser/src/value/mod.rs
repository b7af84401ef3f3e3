//! Argument values produced by the parser
//!
//! A value is either a scalar, an unresolved `${...}` expression, a
//! back-quoted command, or a composite (object or list) nesting further
//! values. Objects keep their entries in input order; duplicate keys are kept
//! and the last one wins on lookup.

mod format;

pub use format::{escape_name, needs_quoting, quote_scalar};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum ArgumentValue {
    Scalar(String),
    /// Raw text containing at least one `${...}` reference. Outside the
    /// references, literal `$` and `\` are written as `\$` and `\\`.
    Expression(String),
    /// Content of a back-quoted command, substituted by its output later
    BackQuoted(String),
    Object(Vec<(String, ArgumentValue)>),
    List(Vec<ArgumentValue>),
}

impl ArgumentValue {
    pub fn scalar(text: impl Into<String>) -> Self {
        ArgumentValue::Scalar(text.into())
    }

    pub fn empty_object() -> Self {
        ArgumentValue::Object(Vec::new())
    }

    pub fn empty_list() -> Self {
        ArgumentValue::List(Vec::new())
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, ArgumentValue::Object(_) | ArgumentValue::List(_))
    }

    /// Text of a scalar-like value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgumentValue::Scalar(text)
            | ArgumentValue::Expression(text)
            | ArgumentValue::BackQuoted(text) => Some(text),
            ArgumentValue::Object(_) | ArgumentValue::List(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, ArgumentValue)]> {
        match self {
            ArgumentValue::Object(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ArgumentValue]> {
        match self {
            ArgumentValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up an object entry; the last duplicate wins
    pub fn get(&self, key: &str) -> Option<&ArgumentValue> {
        self.as_object()?
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Number of entries or items of a composite, 0 for scalars
    pub fn len(&self) -> usize {
        match self {
            ArgumentValue::Object(entries) => entries.len(),
            ArgumentValue::List(items) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when any part of the tree still needs substitution
    pub fn has_unresolved(&self) -> bool {
        match self {
            ArgumentValue::Scalar(_) => false,
            ArgumentValue::Expression(_) | ArgumentValue::BackQuoted(_) => true,
            ArgumentValue::Object(entries) => entries.iter().any(|(_, v)| v.has_unresolved()),
            ArgumentValue::List(items) => items.iter().any(ArgumentValue::has_unresolved),
        }
    }

    /// Management-model JSON: scalar-like values become strings
    pub fn to_json(&self) -> Value {
        match self {
            ArgumentValue::Scalar(text)
            | ArgumentValue::Expression(text)
            | ArgumentValue::BackQuoted(text) => Value::String(text.clone()),
            ArgumentValue::Object(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.to_json());
                }
                Value::Object(map)
            }
            ArgumentValue::List(items) => {
                Value::Array(items.iter().map(ArgumentValue::to_json).collect())
            }
        }
    }
}

impl From<&str> for ArgumentValue {
    fn from(text: &str) -> Self {
        ArgumentValue::Scalar(text.to_string())
    }
}
