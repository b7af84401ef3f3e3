//! Substitution of `${...}` expressions and back-quoted commands
//!
//! A reference body is `name` or `name:default`. The default, and the name
//! itself, may contain further references. Looked-up values are inserted
//! verbatim and not substituted again.

use super::error::UnresolvedExpressionError;
use std::collections::HashMap;

pub trait ExpressionResolver {
    /// Value of a single property name
    fn lookup(&self, name: &str) -> Option<String>;

    /// Substitute every reference in `raw`
    fn resolve(&self, raw: &str) -> Result<String, UnresolvedExpressionError> {
        substitute(raw, &|name| self.lookup(name))
    }

    /// Output of a back-quoted command; no command runner by default
    fn substitute_command(&self, command: &str) -> Result<String, UnresolvedExpressionError> {
        Err(UnresolvedExpressionError::new(
            command,
            "command substitution is not available",
        ))
    }
}

/// Byte index of the `}` closing a reference whose body starts at `start`
fn closing_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (index, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `name:default` at the first ':' outside nested references
fn split_default(body: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    for (index, ch) in body.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => return (&body[..index], Some(&body[index + 1..])),
            _ => {}
        }
    }
    (body, None)
}

/// Substitute every `${...}` in `raw`. Outside references a backslash
/// marks the next character as literal.
pub fn substitute(
    raw: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String, UnresolvedExpressionError> {
    let mut resolved = String::with_capacity(raw.len());
    let mut chars = raw.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        match ch {
            '\\' => {
                if let Some((_, literal)) = chars.next() {
                    resolved.push(literal);
                }
            }
            '$' if raw[index + 1..].starts_with('{') => {
                let body_start = index + 2;
                let close = closing_brace(raw, body_start)
                    .ok_or_else(|| UnresolvedExpressionError::new(raw, "unterminated reference"))?;
                resolved.push_str(&reference(raw, &raw[body_start..close], lookup)?);
                while chars.next_if(|(next, _)| *next <= close).is_some() {}
            }
            _ => resolved.push(ch),
        }
    }

    Ok(resolved)
}

/// Value of one reference body, `name` or `name:default`
fn reference(
    raw: &str,
    body: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String, UnresolvedExpressionError> {
    let (name, default) = split_default(body);
    let name = if name.contains("${") {
        substitute(name, lookup)?
    } else {
        name.to_string()
    };

    match (lookup(&name), default) {
        (Some(value), _) => Ok(value),
        (None, Some(default)) => substitute(default, lookup),
        (None, None) => Err(UnresolvedExpressionError::new(
            raw,
            format!("no value for '{}'", name),
        )),
    }
}

/// In-memory properties
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    properties: HashMap<String, String>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.properties.insert(name.to_string(), value.to_string());
    }
}

impl FromIterator<(String, String)> for MapResolver {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            properties: iter.into_iter().collect(),
        }
    }
}

impl ExpressionResolver for MapResolver {
    fn lookup(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }
}

/// Process environment; `env.NAME` and `NAME` both read `NAME`
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvResolver;

impl ExpressionResolver for EnvResolver {
    fn lookup(&self, name: &str) -> Option<String> {
        let name = name.strip_prefix("env.").unwrap_or(name);
        std::env::var(name).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn resolver() -> MapResolver {
        MapResolver::new()
            .with("host", "localhost")
            .with("port", "9990")
            .with("which", "port")
    }

    #[test]
    fn test_plain_and_embedded_references() {
        let r = resolver();
        assert_eq!(r.resolve("${host}").unwrap(), "localhost");
        assert_eq!(r.resolve("http://${host}:${port}/x").unwrap(), "http://localhost:9990/x");
        assert_eq!(r.resolve("no references").unwrap(), "no references");
    }

    #[test]
    fn test_defaults_and_nesting() {
        let r = resolver();
        assert_eq!(r.resolve("${missing:fallback}").unwrap(), "fallback");
        assert_eq!(r.resolve("${missing:${host}}").unwrap(), "localhost");
        assert_eq!(r.resolve("${${which}}").unwrap(), "9990");
        assert_eq!(r.resolve("${missing:}").unwrap(), "");
    }

    #[test]
    fn test_escaped_dollar_stays_literal() {
        let r = resolver();
        assert_eq!(r.resolve(r"\${host}:${port}").unwrap(), "${host}:9990");
        assert_eq!(r.resolve(r"c:\\${host}").unwrap(), r"c:\localhost");
    }

    #[test]
    fn test_failures() {
        let r = resolver();
        assert_matches!(
            r.resolve("${missing}"),
            Err(UnresolvedExpressionError { reason, .. }) if reason.contains("missing")
        );
        assert!(r.resolve("${host").is_err());
        assert!(r.substitute_command("ls").is_err());
    }

    #[test]
    fn test_env_resolver_reads_process_environment() {
        let path = std::env::var("PATH").unwrap_or_default();
        if !path.is_empty() {
            assert_eq!(EnvResolver.resolve("${env.PATH}").unwrap(), path);
        }
        assert!(EnvResolver.resolve("${CLI_SURELY_UNSET_VARIABLE_42}").is_err());
    }
}
