//! Configuration module for the command-line parser
//! Compile-time limits come from the TOML profile read by build.rs

// Include generated constants from build.rs
include!(concat!(env!("OUT_DIR"), "/constants.rs"));

pub mod runtime;

/// Build information and configuration metadata
pub mod build_info {
    /// Returns the configuration profile used during build
    pub fn profile() -> &'static str {
        option_env!("CLI_BUILD_PROFILE").unwrap_or("development")
    }

    /// Returns the configuration directory used during build
    pub fn config_dir() -> &'static str {
        option_env!("CLI_CONFIG_DIR").unwrap_or("config")
    }

    /// Returns configuration source information
    pub fn source_info() -> String {
        format!("Generated from {}/{}.toml", config_dir(), profile())
    }
}

#[cfg(test)]
mod tests {
    use super::compile_time;

    #[test]
    fn test_generated_limits_are_sane() {
        assert!(compile_time::parsing::MAX_NESTING_DEPTH > 0);
        assert!(compile_time::parsing::MAX_LINE_LENGTH > 0);
        assert!(compile_time::completion::MAX_CANDIDATES > 0);
        assert!(compile_time::logging::SECURITY_MIN_LOG_LEVEL <= 2);
    }

    #[test]
    fn test_source_info_names_profile() {
        let info = super::build_info::source_info();
        assert!(info.ends_with(".toml"));
        assert!(info.contains(super::build_info::profile()));
    }
}
