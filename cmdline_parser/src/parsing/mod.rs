//! Character-level command-line parser
//!
//! A shared, immutable `StateTable` describes every parsing state. Each parse
//! creates a `ParsingContext` (cursor plus state stack) and a callback that
//! receives content characters and state boundaries. `LineBuilder` is the
//! callback that produces `ParsedLine`s; completion runs the same machine
//! over a prefix with its own callback.

pub mod builder;
pub mod callback;
pub mod context;
pub mod error;
pub mod handlers;
pub mod state;

pub use builder::{AddressNode, Argument, LineBuilder, LineForm, Operator, ParsedLine};
pub use callback::{EventRecorder, ParseEvent, ParsingCallback};
pub use context::{Frame, ParseMetrics, ParseMode, ParseOptions, ParsingContext};
pub use error::FormatError;
pub use state::{Phase, StateId, StateTable};

use crate::config::runtime::ParserPreferences;
use crate::logging::codes;
use crate::value::ArgumentValue;
use crate::{log_debug, log_error, log_success};

/// Owns the state table and the parser preferences. Cheap to share; every
/// call builds its own context.
#[derive(Debug)]
pub struct LineParser {
    table: StateTable,
    preferences: ParserPreferences,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineParser {
    pub fn new() -> Self {
        Self::with_preferences(ParserPreferences::default())
    }

    pub fn with_preferences(preferences: ParserPreferences) -> Self {
        Self {
            table: StateTable::new(),
            preferences,
        }
    }

    pub fn table(&self) -> &StateTable {
        &self.table
    }

    pub fn preferences(&self) -> &ParserPreferences {
        &self.preferences
    }

    pub fn options(&self, mode: ParseMode) -> ParseOptions {
        ParseOptions::from_preferences(&self.preferences, mode)
    }

    /// Parse a full line into its commands, each with the operator that
    /// ended it. Blank input yields no commands.
    pub fn parse_line(&self, input: &str) -> Result<Vec<ParsedLine>, FormatError> {
        log_debug!("Parsing command line", "length" => input.len());

        let result = self.run_line(input).map(|builder| builder.finish());
        match &result {
            Ok(lines) => {
                log_success!(codes::success::LINE_PARSED, "Command line parsed",
                    "commands" => lines.len()
                );
            }
            Err(error) => report_failure(error, "Command line rejected"),
        }
        result
    }

    /// Parse exactly one command; an operator is an error
    pub fn parse_command(&self, input: &str) -> Result<ParsedLine, FormatError> {
        let result = self.run_line(input).and_then(|builder| {
            if let Some(&offset) = builder.operator_offsets().first() {
                let found = input[offset..].chars().next().unwrap_or('|');
                return Err(FormatError::unexpected("end of line", found, offset));
            }
            Ok(builder.finish().into_iter().next().unwrap_or_default())
        });

        match &result {
            Ok(line) => {
                log_success!(codes::success::LINE_PARSED, "Command parsed",
                    "form" => format!("{:?}", line.form)
                );
            }
            Err(error) => report_failure(error, "Command rejected"),
        }
        result
    }

    /// Parse one value from the start of `input` (leading whitespace is
    /// skipped). Returns the value and the text that follows it.
    pub fn parse_value<'a>(
        &self,
        input: &'a str,
    ) -> Result<(ArgumentValue, &'a str), FormatError> {
        let mut builder = LineBuilder::new();
        let mut ctx = ParsingContext::new(&self.table, self.options(ParseMode::Execute));

        let result = ctx
            .run(input, StateId::ValueRoot, &mut builder)
            .and_then(|end| {
                let value = builder
                    .take_value()
                    .ok_or(FormatError::MissingValue { offset: end })?;
                Ok((value, &input[end..]))
            });

        match &result {
            Ok((value, rest)) => {
                log_success!(codes::success::VALUE_PARSED, "Value parsed",
                    "items" => value.len(),
                    "remaining" => rest.len()
                );
            }
            Err(error) => report_failure(error, "Value rejected"),
        }
        result
    }

    fn run_line(&self, input: &str) -> Result<LineBuilder, FormatError> {
        let mut builder = LineBuilder::new();
        let mut ctx = ParsingContext::new(&self.table, self.options(ParseMode::Execute));
        ctx.run(input, StateId::Line, &mut builder)?;
        log_debug!("Line parse finished",
            "states" => ctx.metrics().states_entered,
            "max_depth" => ctx.metrics().max_depth
        );
        Ok(builder)
    }
}

fn report_failure(error: &FormatError, message: &str) {
    log_error!(error.error_code(), message,
        span = error.span(),
        "error" => error
    );
}

/// Parse a line with default preferences
pub fn parse_line(input: &str) -> Result<Vec<ParsedLine>, FormatError> {
    LineParser::new().parse_line(input)
}

/// Parse a single command with default preferences
pub fn parse_command(input: &str) -> Result<ParsedLine, FormatError> {
    LineParser::new().parse_command(input)
}

/// Parse one value with default preferences
pub fn parse_value(input: &str) -> Result<(ArgumentValue, &str), FormatError> {
    LineParser::new().parse_value(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn parser() -> LineParser {
        LineParser::with_preferences(ParserPreferences {
            allow_flag_arguments: true,
            join_continuation_lines: true,
            trace_state_transitions: false,
        })
    }

    fn value(text: &str) -> ArgumentValue {
        parser().parse_value(text).unwrap().0
    }

    #[test]
    fn test_object_stops_at_matching_brace() {
        let (parsed, rest) = parser()
            .parse_value("{az=10,ax={}, az=[{},{},{}]} --doit={}")
            .unwrap();
        assert_eq!(rest, " --doit={}");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.get("az").map(ArgumentValue::len), Some(3));
        assert_eq!(parsed.get("ax"), Some(&ArgumentValue::empty_object()));
    }

    #[test]
    fn test_empty_object_leaves_remainder() {
        let (parsed, rest) = parser().parse_value("{} --doit={}").unwrap();
        assert_eq!(parsed, ArgumentValue::empty_object());
        assert_eq!(rest, " --doit={}");
    }

    #[test]
    fn test_list_of_nested_objects_with_surrounding_whitespace() {
        let item = "{az=10,ax={}, az=[{},{},{}]}";
        for text in [
            format!("[{item}, {item}] --doit={{}}"),
            format!("  [ {item} , {item} ]   --doit={{}}  "),
        ] {
            let (parsed, rest) = parser().parse_value(&text).unwrap();
            assert_eq!(parsed.len(), 2);
            assert_eq!(parsed.as_list().map(|items| items[0] == items[1]), Some(true));
            assert_eq!(rest.trim(), "--doit={}");
        }
    }

    #[test]
    fn test_canonical_form_is_stable() {
        for text in [
            "{az=10,ax={}, az=[{},{},{}]}",
            r#"{name="a b",list=[1, "", x\,y],e=${host:local}/path}"#,
            "[`ls -l`, \"q\\\"uote\", {k={}}]",
            "plain",
        ] {
            let first = value(text);
            let second = value(&first.to_string());
            assert_eq!(first, second, "canonical form of {text}");
        }
    }

    #[test]
    fn test_unterminated_quote_reports_input_length() {
        let input = "\"abc";
        assert_matches!(
            parser().parse_value(input),
            Err(FormatError::UnterminatedQuote { offset }) if offset == input.len()
        );
    }

    #[test]
    fn test_escaped_quote_inside_quotes() {
        assert_eq!(value(r#""a\"b""#), ArgumentValue::scalar("a\"b"));
    }

    #[test]
    fn test_expressions_and_back_quotes() {
        assert_eq!(
            value("${jboss.home:${user.home}}/x"),
            ArgumentValue::Expression("${jboss.home:${user.home}}/x".to_string())
        );
        assert_eq!(value("`echo hi`"), ArgumentValue::BackQuoted("echo hi".to_string()));
        assert_eq!(value("\"${x}\""), ArgumentValue::scalar("${x}"));
        assert_eq!(value("cost$5"), ArgumentValue::scalar("cost$5"));
    }

    #[test]
    fn test_composite_errors() {
        let p = parser();
        assert_matches!(
            p.parse_value("[1,2,]"),
            Err(FormatError::TrailingSeparator { separator: ',', offset: 5 })
        );
        assert_matches!(
            p.parse_value("{a=1"),
            Err(FormatError::UnterminatedComposite { delimiter: '{', offset: 4 })
        );
        assert_matches!(
            p.parse_value("{a=}"),
            Err(FormatError::MissingValue { offset: 3 })
        );
        assert_matches!(
            p.parse_value("{=1}"),
            Err(FormatError::MissingName { offset: 1, .. })
        );
        assert_matches!(
            p.parse_value("{a b=1}"),
            Err(FormatError::UnexpectedCharacter { found: 'b', offset: 3, .. })
        );
        assert_matches!(
            p.parse_value("[1 2]"),
            Err(FormatError::UnexpectedCharacter { found: '2', offset: 3, .. })
        );
        assert_matches!(p.parse_value("${x"), Err(FormatError::UnterminatedExpression { .. }));
    }

    #[test]
    fn test_quoted_names_keep_their_text() {
        assert_eq!(
            value(r#"{"my key"=1}"#),
            ArgumentValue::Object(vec![("my key".to_string(), "1".into())])
        );

        let line = parser().parse_command(r#":op("a b"=1)"#).unwrap();
        assert_eq!(line.value_of("a b"), Some(&ArgumentValue::scalar("1")));
        assert_eq!(line.to_string(), r":op(a\ b=1)");

        let line = parser().parse_command(r#""my cmd" x"#).unwrap();
        assert_eq!(line.command.as_deref(), Some("my cmd"));
    }

    #[test]
    fn test_empty_names_round_trip() {
        let parsed = value(r#"{""=1}"#);
        assert_eq!(parsed.to_string(), r#"{""=1}"#);
        assert_eq!(value(&parsed.to_string()), parsed);

        let first = parser().parse_command(r#":op(""=1)"#).unwrap();
        assert_eq!(first.value_of(""), Some(&ArgumentValue::scalar("1")));
        let second = parser().parse_command(&first.to_string()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_escaped_dollar_is_not_a_reference() {
        use crate::request::{ExpressionResolver, MapResolver};

        let line = parser().parse_command(r"cmd --a=\${x}${y}").unwrap();
        let raw = ArgumentValue::Expression(r"\${x}${y}".to_string());
        assert_eq!(line.value_of("a"), Some(&raw));
        assert_eq!(line.to_string(), r"cmd --a=\$\{x\}${y}");

        let resolver = MapResolver::new().with("x", "X").with("y", "Y");
        assert_eq!(resolver.resolve(r"\${x}${y}").unwrap(), "${x}Y");

        let reparsed = parser().parse_command(&line.to_string()).unwrap();
        assert_eq!(reparsed, line);
    }

    #[test]
    fn test_command_limit_counts_commands() {
        use crate::config::compile_time::parsing::MAX_CHAINED_COMMANDS;
        let at_limit = "ls;".repeat(MAX_CHAINED_COMMANDS);
        assert_eq!(parser().parse_line(&at_limit).unwrap().len(), MAX_CHAINED_COMMANDS);

        let over = "ls;".repeat(MAX_CHAINED_COMMANDS + 1);
        assert_matches!(parser().parse_line(&over), Err(FormatError::TooManyCommands { .. }));
    }

    #[test]
    fn test_argument_limit_is_per_command() {
        use crate::config::compile_time::parsing::MAX_ARGUMENTS;
        let full = format!(":op({})", vec!["a=1"; MAX_ARGUMENTS].join(","));
        let twice = format!("{full};{full}");
        assert_eq!(parser().parse_line(&twice).unwrap().len(), 2);

        let over = format!(":op({})", vec!["a=1"; MAX_ARGUMENTS + 1].join(","));
        assert_matches!(parser().parse_line(&over), Err(FormatError::TooManyArguments { .. }));
    }

    #[test]
    fn test_nesting_limit() {
        use crate::config::compile_time::parsing::MAX_NESTING_DEPTH;
        let deep = format!(
            "{}{}",
            "[".repeat(MAX_NESTING_DEPTH + 1),
            "]".repeat(MAX_NESTING_DEPTH + 1)
        );
        assert_matches!(
            parser().parse_value(&deep),
            Err(FormatError::NestingTooDeep { .. })
        );
        let ok = format!(
            "{}{}",
            "[".repeat(MAX_NESTING_DEPTH),
            "]".repeat(MAX_NESTING_DEPTH)
        );
        assert!(parser().parse_value(&ok).is_ok());
    }

    #[test]
    fn test_operation_line() {
        let line = parser()
            .parse_command(
                r#"/subsystem=datasources/data-source="Example DS":write-attribute(name=max-pool-size, value=${pool:20}){rollback-on-runtime-failure=false}"#,
            )
            .unwrap();

        assert_eq!(line.form, LineForm::Operation);
        assert!(line.absolute);
        assert_eq!(
            line.address,
            vec![
                AddressNode::Segment {
                    node_type: "subsystem".to_string(),
                    name: Some("datasources".to_string()),
                },
                AddressNode::Segment {
                    node_type: "data-source".to_string(),
                    name: Some("Example DS".to_string()),
                },
            ]
        );
        assert_eq!(line.operation.as_deref(), Some("write-attribute"));
        assert_eq!(line.value_of("name"), Some(&ArgumentValue::scalar("max-pool-size")));
        assert_eq!(
            line.value_of("value"),
            Some(&ArgumentValue::Expression("${pool:20}".to_string()))
        );
        assert_eq!(
            line.header("rollback-on-runtime-failure")
                .and_then(|h| h.value.clone()),
            Some(ArgumentValue::scalar("false"))
        );
    }

    #[test]
    fn test_relative_addresses_and_flags() {
        let line = parser().parse_command("../host=master:read-resource(recursive, depth=2)").unwrap();
        assert!(!line.absolute);
        assert_eq!(line.address[0], AddressNode::Parent);
        assert!(line.argument("recursive").is_some_and(Argument::is_flag));
        assert_eq!(line.value_of("depth"), Some(&ArgumentValue::scalar("2")));

        let root = parser().parse_command(":read-resource").unwrap();
        assert!(root.address.is_empty());
        assert_eq!(root.operation.as_deref(), Some("read-resource"));
    }

    #[test]
    fn test_address_errors() {
        let p = parser();
        assert_matches!(
            p.parse_command("/a=b=c:op"),
            Err(FormatError::UnexpectedCharacter { found: '=', offset: 4, .. })
        );
        assert_matches!(
            p.parse_command("/..=x:op"),
            Err(FormatError::UnexpectedCharacter { found: '=', offset: 3, .. })
        );
        assert_matches!(
            p.parse_command("/a=:op"),
            Err(FormatError::MissingName { what: "node name", offset: 3 })
        );
        assert_matches!(
            p.parse_command(":op(a=1,)"),
            Err(FormatError::TrailingSeparator { separator: ',', offset: 8 })
        );
        assert_matches!(
            p.parse_command(":op(a=1"),
            Err(FormatError::UnterminatedComposite { delimiter: '(', offset: 7 })
        );
    }

    #[test]
    fn test_command_form() {
        let line = parser()
            .parse_command("deploy app.war --name=test --runtime-name=\"my app\" --force --props={a=1,b=[x,y]}")
            .unwrap();

        assert_eq!(line.form, LineForm::Command);
        assert_eq!(line.command.as_deref(), Some("deploy"));
        assert_eq!(line.positionals().collect::<Vec<_>>(), vec![&ArgumentValue::scalar("app.war")]);
        assert_eq!(line.value_of("runtime-name"), Some(&ArgumentValue::scalar("my app")));
        assert!(line.argument("force").is_some_and(Argument::is_flag));
        assert_eq!(
            line.value_of("props").and_then(|v| v.get("b")).map(ArgumentValue::len),
            Some(2)
        );
    }

    #[test]
    fn test_doit_option_takes_empty_object() {
        let line = parser().parse_command("cmd --doit={}").unwrap();
        assert_eq!(line.value_of("doit"), Some(&ArgumentValue::empty_object()));
    }

    #[test]
    fn test_flags_can_be_disabled() {
        let strict = LineParser::with_preferences(ParserPreferences {
            allow_flag_arguments: false,
            ..ParserPreferences::default()
        });
        assert_matches!(
            strict.parse_command(":read-resource(recursive)"),
            Err(FormatError::MissingValue { offset: 24 })
        );
    }

    #[test]
    fn test_operators_split_commands() {
        let lines = parser()
            .parse_line(":read-resource | grep name; ls -l ;")
            .unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].terminator, Some(Operator::Pipe));
        assert_eq!(lines[1].command.as_deref(), Some("grep"));
        assert_eq!(lines[1].terminator, Some(Operator::Sequence));
        assert_eq!(lines[2].command.as_deref(), Some("ls"));
        assert_eq!(lines[2].terminator, Some(Operator::Sequence));

        assert_matches!(
            parser().parse_line("ls |"),
            Err(FormatError::TrailingSeparator { separator: '|', offset: 4 })
        );
        assert_matches!(
            parser().parse_line("ls || wc"),
            Err(FormatError::UnexpectedCharacter { found: '|', offset: 4, .. })
        );
        assert_matches!(
            parser().parse_command("ls | wc"),
            Err(FormatError::UnexpectedCharacter { found: '|', offset: 3, .. })
        );
    }

    #[test]
    fn test_redirection_is_content() {
        let line = parser().parse_command("echo a > out.txt").unwrap();
        assert_eq!(line.positionals().count(), 3);
    }

    #[test]
    fn test_blank_input() {
        assert!(parser().parse_line("   ").unwrap().is_empty());
        assert_eq!(parser().parse_command("").unwrap(), ParsedLine::default());
    }

    #[test]
    fn test_line_round_trips_through_display() {
        for text in [
            "/subsystem=logging/logger=\"a b\":write-attribute(name=level,value=DEBUG){allow-resource-service-restart=true}",
            "data-source add --name=ds --props={a=[1,2]} extra",
            "..:read-resource(recursive)",
        ] {
            let first = parser().parse_command(text).unwrap();
            let second = parser().parse_command(&first.to_string()).unwrap();
            assert_eq!(first, second, "round trip of {text}");
        }
    }

    #[test]
    fn test_input_length_limit() {
        use crate::config::compile_time::parsing::MAX_LINE_LENGTH;
        let long = "a".repeat(MAX_LINE_LENGTH + 1);
        assert_matches!(
            parser().parse_line(&long),
            Err(FormatError::InputTooLong { length }) if length == MAX_LINE_LENGTH + 1
        );
    }
}
