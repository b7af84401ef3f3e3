//! Completion over a partially typed command line
//!
//! The prefix up to the cursor is replayed through the parsing state machine
//! in completion mode, which leaves unterminated states open instead of
//! failing. The innermost open state and its phase give the completion
//! context; a `CandidateProvider` supplies the domain candidates.

mod context;
mod provider;

pub use context::{resolve, CompletionContext, Resolved};
pub use provider::{CandidateProvider, CompletionQuery, StaticCandidates};

use crate::config::compile_time::completion::{MAX_CANDIDATES, MAX_PREFIX_LENGTH};
use crate::config::runtime::{CompletionPreferences, ParserPreferences};
use crate::logging::codes;
use crate::parsing::{LineBuilder, LineParser, ParseMode, ParsedLine, ParsingContext, StateId};
use crate::{log_debug, log_success, log_warning};
use serde::Serialize;

/// Candidates plus the byte offset where the replaced token starts
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Completion {
    pub start: usize,
    pub candidates: Vec<String>,
}

pub struct CompletionEngine<P: CandidateProvider> {
    parser: LineParser,
    provider: P,
    preferences: CompletionPreferences,
}

/// Largest char boundary not after `offset`
fn clamp_to_boundary(text: &str, offset: usize) -> usize {
    let mut end = offset.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    end
}

impl<P: CandidateProvider> CompletionEngine<P> {
    pub fn new(provider: P) -> Self {
        Self::with_preferences(
            provider,
            ParserPreferences::default(),
            CompletionPreferences::default(),
        )
    }

    pub fn with_preferences(
        provider: P,
        parser: ParserPreferences,
        preferences: CompletionPreferences,
    ) -> Self {
        Self {
            parser: LineParser::with_preferences(parser),
            provider,
            preferences,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn complete(&self, text: &str, offset: usize) -> Vec<String> {
        self.complete_with_start(text, offset).candidates
    }

    pub fn complete_with_start(&self, text: &str, offset: usize) -> Completion {
        let end = clamp_to_boundary(text, offset);
        let Some((resolved, line)) = self.context_at(text, end) else {
            return Completion {
                start: end,
                candidates: Vec::new(),
            };
        };

        let prefix = &text[..end];
        let partial = if resolved.insert_prefix.is_empty() {
            &prefix[resolved.start..]
        } else {
            ""
        };

        let query = CompletionQuery {
            context: &resolved.context,
            partial,
            line: &line,
        };
        let mut candidates = self.filter(self.provider.candidates(&query), partial);

        if resolved.context == CompletionContext::ArgumentName {
            candidates.retain(|name| !line.has_argument(name));
        } else if resolved.context == CompletionContext::HeaderName {
            candidates.retain(|name| line.header(name).is_none());
        }
        if !resolved.insert_prefix.is_empty() {
            for candidate in &mut candidates {
                candidate.insert_str(0, resolved.insert_prefix);
            }
        }

        if self.preferences.include_structural_candidates && partial.is_empty() {
            candidates.extend(resolved.structural.iter().map(|s| s.to_string()));
        }

        log_success!(codes::success::COMPLETION_RESOLVED, "Completion resolved",
            "context" => resolved.context,
            "candidates" => candidates.len()
        );

        Completion {
            start: resolved.start,
            candidates,
        }
    }

    /// Resolve the completion context at a byte offset. `None` when the
    /// prefix cannot be parsed even in completion mode.
    pub fn context_at(&self, text: &str, offset: usize) -> Option<(Resolved, ParsedLine)> {
        let end = clamp_to_boundary(text, offset);
        if end > MAX_PREFIX_LENGTH {
            log_warning!(codes::completion::PREFIX_NOT_PARSEABLE, "Completion prefix too long",
                "length" => end
            );
            return None;
        }
        let prefix = &text[..end];

        let mut builder = LineBuilder::new();
        let mut ctx = ParsingContext::new(
            self.parser.table(),
            self.parser.options(ParseMode::Completion),
        );

        if let Err(error) = ctx.run(prefix, StateId::Line, &mut builder) {
            log_warning!(codes::completion::PREFIX_NOT_PARSEABLE, "No completion for malformed prefix",
                "offset" => error.offset(),
                "error" => error
            );
            return None;
        }

        let resolved = resolve(ctx.open_states(), builder.partial(), prefix, end);
        log_debug!("Completion context resolved",
            "context" => resolved.context,
            "start" => resolved.start
        );
        Some((resolved, builder.partial().clone()))
    }

    fn filter(&self, candidates: Vec<String>, partial: &str) -> Vec<String> {
        let mut matching: Vec<String> = if self.preferences.case_sensitive {
            candidates
                .into_iter()
                .filter(|candidate| candidate.starts_with(partial))
                .collect()
        } else {
            let partial = partial.to_lowercase();
            candidates
                .into_iter()
                .filter(|candidate| candidate.to_lowercase().starts_with(&partial))
                .collect()
        };
        matching.sort();
        matching.dedup();
        matching.truncate(MAX_CANDIDATES);
        matching
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CompletionEngine<StaticCandidates> {
        let provider = StaticCandidates::new()
            .with_commands(&["deploy", "data-source", "ls", "deploy"])
            .with_node_types(&["subsystem", "deployment", "socket-binding-group"])
            .with_node_names("subsystem", &["datasources", "logging", "undertow"])
            .with_operations(&["read-resource", "read-attribute", "write-attribute"])
            .with_arguments("read-resource", &["recursive", "include-runtime", "recursive-depth"])
            .with_arguments("deploy", &["name", "runtime-name", "force"])
            .with_values("recursive", &["true", "false"])
            .with_object_keys(&["min-pool-size", "max-pool-size"])
            .with_headers(&["rollback-on-runtime-failure", "allow-resource-service-restart"]);

        CompletionEngine::with_preferences(
            provider,
            ParserPreferences {
                allow_flag_arguments: true,
                join_continuation_lines: true,
                trace_state_transitions: false,
            },
            CompletionPreferences {
                include_structural_candidates: true,
                case_sensitive: true,
            },
        )
    }

    fn context_of(text: &str) -> CompletionContext {
        engine()
            .context_at(text, text.len())
            .map(|(resolved, _)| resolved.context)
            .unwrap_or(CompletionContext::Empty)
    }

    #[test]
    fn test_command_names_are_sorted_and_unique() {
        assert_eq!(engine().complete("d", 1), vec!["data-source", "deploy"]);
        assert_eq!(engine().complete("", 0), vec!["data-source", "deploy", "ls"]);
        assert_eq!(engine().complete("ls | de", 7), vec!["deploy"]);
    }

    #[test]
    fn test_address_contexts() {
        assert_eq!(engine().complete("/sub", 4), vec!["subsystem"]);
        assert_eq!(engine().complete("/subsystem=", 11).len(), 3);
        assert_eq!(engine().complete("/subsystem=lo", 13), vec!["logging"]);
        assert_eq!(
            context_of("/subsystem=lo"),
            CompletionContext::NodeName {
                node_type: "subsystem".to_string()
            }
        );
        assert_eq!(
            engine().complete("/subsystem=logging:read-r", 25),
            vec!["read-resource"]
        );
    }

    #[test]
    fn test_operation_arguments() {
        let text = ":read-resource(";
        assert_eq!(
            engine().complete(text, text.len()),
            vec!["include-runtime", "recursive", "recursive-depth", ")"]
        );

        let text = ":read-resource(recursive=true,re";
        let completion = engine().complete_with_start(text, text.len());
        assert_eq!(completion.candidates, vec!["recursive-depth"]);
        assert_eq!(completion.start, text.len() - 2);

        let text = ":read-resource(recursive=";
        assert_eq!(engine().complete(text, text.len()), vec!["false", "true"]);
        assert_eq!(
            context_of(text),
            CompletionContext::ArgumentValue {
                argument: "recursive".to_string()
            }
        );
    }

    #[test]
    fn test_open_object_expects_key_or_close() {
        let text = ":op(props={";
        assert_eq!(context_of(text), CompletionContext::ObjectKey);
        assert_eq!(
            engine().complete(text, text.len()),
            vec!["max-pool-size", "min-pool-size", "}"]
        );

        let text = ":op(props={min-pool-size=1";
        assert_eq!(context_of(text), CompletionContext::Empty);
        let text = ":op(props={min-pool-size=1,";
        assert_eq!(engine().complete(text, text.len()), vec!["max-pool-size", "min-pool-size"]);
        let text = ":op(props={min-pool-size=1 ";
        assert_eq!(context_of(text), CompletionContext::ObjectSeparator);
        assert_eq!(engine().complete(text, text.len()), vec![",", "}"]);
    }

    #[test]
    fn test_lists_and_headers() {
        assert_eq!(engine().complete(":op(a=[", 7), vec!["]"]);
        assert_eq!(engine().complete(":op(a=[x ", 9), vec![",", "]"]);
        assert_eq!(context_of(":op(a=[x"), CompletionContext::ListItem);

        let text = ":op(){rollback-on-runtime-failure=true;";
        assert_eq!(
            engine().complete(text, text.len()),
            vec!["allow-resource-service-restart"]
        );
    }

    #[test]
    fn test_command_options() {
        assert_eq!(
            engine().complete("deploy ", 7),
            vec!["--force", "--name", "--runtime-name"]
        );
        assert_eq!(engine().complete("deploy --name=x --", 18), vec!["force", "runtime-name"]);
        assert_eq!(engine().complete("deploy --r", 10), vec!["runtime-name"]);
        assert_eq!(engine().complete("deploy -", 8), vec!["--force", "--name", "--runtime-name"]);
    }

    #[test]
    fn test_quoted_and_expression_contexts() {
        assert_eq!(context_of(":op(a=\"x y"), CompletionContext::Quoted);
        assert_eq!(context_of(":op(a=${x"), CompletionContext::Expression);
        assert!(engine().complete(":op(a=\"x y", 10).is_empty());
    }

    #[test]
    fn test_malformed_prefix_gives_nothing() {
        assert!(engine().complete("/a=b=c", 6).is_empty());
        assert!(engine().complete(":op(a=[1 2", 10).is_empty());
        assert!(engine().context_at("/a=b=c", 6).is_none());
    }

    #[test]
    fn test_offsets_are_clamped() {
        let e = engine();
        assert_eq!(e.complete("d", 100), vec!["data-source", "deploy"]);
        let text = "lé";
        assert_eq!(e.complete(text, 2), e.complete(text, 1));
        assert_eq!(e.complete("deploy x", 1), e.complete("d", 1));
    }

    #[test]
    fn test_completion_is_deterministic() {
        let e = engine();
        let text = ":read-resource(recursive=true,";
        assert_eq!(e.complete(text, text.len()), e.complete(text, text.len()));
    }
}
