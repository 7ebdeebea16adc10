//! Default configuration values

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "matr.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "matr.yaml";

/// Task deadline used when none is configured (five minutes)
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Dispatch policy used when none is configured
pub const DEFAULT_DISPATCH: &str = "strict";

/// Compiler used when none is configured
pub const DEFAULT_CARGO: &str = "cargo";

/// Environment variable overriding `compiler.cargo`
pub const ENV_CARGO: &str = "MATR_CARGO";

/// Environment variable overriding `runtime.path`
pub const ENV_RUNTIME_PATH: &str = "MATR_RUNTIME_PATH";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![DEFAULT_CONFIG_TOML, DEFAULT_CONFIG_YAML, ".matr.toml"]
}
