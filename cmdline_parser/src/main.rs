use cmdline_parser::completion::CompletionEngine;
use cmdline_parser::config::runtime::RuntimeConfig;
use cmdline_parser::parsing::{LineForm, LineParser};
use cmdline_parser::request::{EnvResolver, RequestBuilder};
use cmdline_parser::{logging, CliError};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args: Vec<String> = env::args().collect();

    let config = match take_config_path(&mut args) {
        Some(path) => match RuntimeConfig::load(&path) {
            Ok(config) => config,
            Err(error) => {
                let error = CliError::from(error);
                eprintln!("Error [{}]: {}", error.error_code(), error);
                std::process::exit(1);
            }
        },
        None => RuntimeConfig::default(),
    };

    // Initialize global logging system
    logging::config::init_runtime_preferences(config.logging.clone())?;
    logging::init_global_logging()?;

    if args.len() < 2 {
        eprintln!("Usage: {} [--resolve] <line>", args[0]);
        eprintln!("       {} --value <text>", args[0]);
        eprintln!("       {} --complete <offset> <line>", args[0]);
        eprintln!("       {} --help", args[0]);
        eprintln!("Any form accepts --config <file.toml>");
        std::process::exit(1);
    }

    let resolve = args.iter().any(|arg| arg == "--resolve");
    let rest: Vec<&str> = args[1..]
        .iter()
        .map(String::as_str)
        .filter(|arg| *arg != "--resolve")
        .collect();

    let outcome = match rest.first().copied() {
        Some("--help") => {
            print_help(&args[0]);
            return Ok(());
        }
        Some("--diagnostics") => {
            println!("{}", logging::get_system_diagnostics());
            return Ok(());
        }
        Some("--complete") => complete(&rest[1..], &config),
        Some("--value") => parse_value(&rest[1..].join(" "), &config),
        _ => parse(&rest.join(" "), resolve, &config),
    };

    if let Err(error) = outcome {
        eprintln!("Error [{}]: {}", error.error_code(), error);
        std::process::exit(1);
    }
    Ok(())
}

fn print_help(program_name: &str) {
    println!("cmdline-parser v{}", env!("CARGO_PKG_VERSION"));
    println!("Parse management command lines and compute completions");
    println!();
    println!("USAGE:");
    println!("    {} <line>                       # Parse and print as JSON", program_name);
    println!("    {} --value <text>               # Parse one argument value", program_name);
    println!("    {} --complete <offset> <line>   # Candidates at a byte offset", program_name);
    println!();
    println!("OPTIONS:");
    println!("    --help          Show this help message");
    println!("    --diagnostics   Show logging and build configuration");
    println!("    --resolve       Substitute ${{...}} from the environment when building requests");
    println!("    --config        Load preferences and completion candidates from TOML");
    println!("                    (without a [candidates] table only delimiters are offered)");
    println!();
    println!("EXAMPLES:");
    println!("    {} '/subsystem=logging:read-resource(recursive)'", program_name);
    println!("    {} 'deploy app.war --name=app --force'", program_name);
    println!("    {} --complete 11 ':op(props={{'", program_name);
    println!();
    println!("Configuration: {}", cmdline_parser::config::build_info::source_info());
}

/// Remove `--config <path>` from the arguments, returning the path
fn take_config_path(args: &mut Vec<String>) -> Option<String> {
    let index = args.iter().position(|arg| arg == "--config")?;
    if index + 1 >= args.len() {
        args.remove(index);
        return None;
    }
    let path = args.remove(index + 1);
    args.remove(index);
    Some(path)
}

fn parse(line: &str, resolve: bool, config: &RuntimeConfig) -> Result<(), CliError> {
    let commands = LineParser::with_preferences(config.parser.clone()).parse_line(line)?;

    let mut builder = RequestBuilder::new();
    if resolve {
        builder = builder.with_resolver(Box::new(EnvResolver));
    }

    for command in commands {
        println!("{}", to_json(&command));
        println!("# {}", command);
        if command.form == LineForm::Operation {
            let request = builder.build(command)?;
            println!("{}", to_json(&request));
        }
    }
    Ok(())
}

fn parse_value(text: &str, config: &RuntimeConfig) -> Result<(), CliError> {
    let (value, rest) = LineParser::with_preferences(config.parser.clone()).parse_value(text)?;
    println!(
        "{}",
        to_json(&serde_json::json!({
            "value": value,
            "canonical": value.to_string(),
            "rest": rest,
        }))
    );
    Ok(())
}

fn complete(args: &[&str], config: &RuntimeConfig) -> Result<(), CliError> {
    let (Some(offset), Some(line)) = (args.first(), args.get(1)) else {
        return Err(CliError::usage("--complete requires <offset> <line>"));
    };
    let offset: usize = offset
        .parse()
        .map_err(|_| CliError::usage("offset must be a non-negative integer"))?;

    let engine = CompletionEngine::with_preferences(
        config.candidates.clone(),
        config.parser.clone(),
        config.completion.clone(),
    );
    let completion = engine.complete_with_start(line, offset);
    let context = engine
        .context_at(line, offset)
        .map(|(resolved, _)| resolved.context.to_string())
        .unwrap_or_else(|| "unparseable".to_string());

    println!(
        "{}",
        to_json(&serde_json::json!({ "context": context, "completion": completion }))
    );
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}
