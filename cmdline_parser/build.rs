// build.rs - TOML-driven compile-time limit generation
use std::env;
use std::fs;
use std::path::Path;

#[derive(serde::Deserialize)]
struct CompileTimeConfig {
    parsing: ParsingLimits,
    completion: CompletionLimits,
    logging: LoggingLimits,
}

#[derive(serde::Deserialize)]
struct ParsingLimits {
    max_line_length: usize,
    max_nesting_depth: usize,
    max_arguments: usize,
    max_chained_commands: usize,
}

#[derive(serde::Deserialize)]
struct CompletionLimits {
    max_candidates: usize,
    max_prefix_length: usize,
}

#[derive(serde::Deserialize)]
struct LoggingLimits {
    log_buffer_size: usize,
    max_log_message_length: usize,
    security_min_log_level: u8,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=CLI_BUILD_PROFILE");
    println!("cargo:rerun-if-env-changed=CLI_CONFIG_DIR");

    let profile = env::var("CLI_BUILD_PROFILE").unwrap_or_else(|_| "development".to_string());
    let config_dir = env::var("CLI_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

    // Workspace root is the parent of the crate directory
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = Path::new(&manifest_dir)
        .parent()
        .expect("Could not find workspace root (parent directory)");

    let config_path = workspace_root
        .join(&config_dir)
        .join(format!("{}.toml", profile));

    println!("cargo:rerun-if-changed={}", config_path.display());

    if !config_path.exists() {
        panic!(
            "Configuration file not found: {}\nWorkspace root: {}\nLooking for: {}/{}/{}.toml",
            config_path.display(),
            workspace_root.display(),
            workspace_root.display(),
            config_dir,
            profile
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", config_path.display(), e));

    let config: CompileTimeConfig = toml::from_str(&config_content)
        .unwrap_or_else(|e| panic!("Invalid TOML in {}: {}", config_path.display(), e));

    validate_limits(&config, &profile);
    generate_constants(&config, &profile);
}

fn validate_limits(config: &CompileTimeConfig, profile: &str) {
    const ABSOLUTE_MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;
    const ABSOLUTE_MAX_NESTING_DEPTH: usize = 1024;

    if config.parsing.max_line_length > ABSOLUTE_MAX_LINE_LENGTH {
        panic!("LIMITS: max_line_length exceeds absolute maximum");
    }

    if config.parsing.max_nesting_depth == 0
        || config.parsing.max_nesting_depth > ABSOLUTE_MAX_NESTING_DEPTH
    {
        panic!("LIMITS: max_nesting_depth must be between 1 and {ABSOLUTE_MAX_NESTING_DEPTH}");
    }

    if config.parsing.max_chained_commands == 0 {
        panic!("LIMITS: max_chained_commands must be at least 1");
    }

    if config.completion.max_candidates == 0 {
        panic!("LIMITS: max_candidates must be at least 1");
    }

    if config.logging.security_min_log_level > 2 {
        panic!("LIMITS: security_min_log_level too high (max: 2)");
    }

    if profile == "production" && config.parsing.max_nesting_depth > 128 {
        panic!("PRODUCTION: max_nesting_depth too high for production");
    }
}

fn generate_constants(config: &CompileTimeConfig, profile: &str) {
    let out_dir = env::var("OUT_DIR").unwrap();
    let output_path = Path::new(&out_dir).join("constants.rs");

    let constants_code = format!(
        r#"
// Generated compile-time constants from TOML configuration
// Profile: {}
// DO NOT EDIT - Generated by build.rs

pub mod compile_time {{
    pub mod parsing {{
        pub const MAX_LINE_LENGTH: usize = {};
        pub const MAX_NESTING_DEPTH: usize = {};
        pub const MAX_ARGUMENTS: usize = {};
        pub const MAX_CHAINED_COMMANDS: usize = {};
    }}

    pub mod completion {{
        pub const MAX_CANDIDATES: usize = {};
        pub const MAX_PREFIX_LENGTH: usize = {};
    }}

    pub mod logging {{
        pub const LOG_BUFFER_SIZE: usize = {};
        pub const MAX_LOG_MESSAGE_LENGTH: usize = {};
        pub const SECURITY_MIN_LOG_LEVEL: u8 = {};
    }}
}}
"#,
        profile,
        config.parsing.max_line_length,
        config.parsing.max_nesting_depth,
        config.parsing.max_arguments,
        config.parsing.max_chained_commands,
        config.completion.max_candidates,
        config.completion.max_prefix_length,
        config.logging.log_buffer_size,
        config.logging.max_log_message_length,
        config.logging.security_min_log_level,
    );

    fs::write(output_path, constants_code).unwrap();
}
