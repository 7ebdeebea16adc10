//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, MatrError, Result};

use super::defaults::{config_file_names, ENV_CARGO, ENV_RUNTIME_PATH};
use super::types::Config;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: Config = if format == "TOML" {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find configuration file in directory or parent directories.
///
/// The first match wins. Parents are walked until the filesystem root.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.is_file() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(Config, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration or use defaults when no file exists.
///
/// A file that exists but fails to parse or validate is an error.
/// Environment overrides are applied in both cases.
pub fn load_config_or_default(dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    let (mut config, path) = match load_config_from_dir(dir) {
        Ok((config, path)) => (config, Some(path)),
        Err(MatrError::Config(ConfigError::NotFound(_))) => {
            debug!(dir = %dir.display(), "no config found, using defaults");
            (Config::default(), None)
        }
        Err(e) => return Err(e),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config)?;
    Ok((config, path))
}

/// Apply `MATR_*` overrides using the given variable lookup
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(cargo) = lookup(ENV_CARGO).filter(|v| !v.is_empty()) {
        debug!(cargo = %cargo, "compiler overridden from environment");
        config.compiler.cargo = cargo;
    }

    if let Some(path) = lookup(ENV_RUNTIME_PATH).filter(|v| !v.is_empty()) {
        debug!(path = %path, "runtime path overridden from environment");
        config.runtime.path = Some(PathBuf::from(path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matr_runtime::DispatchPolicy;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("matr.toml");
        std::fs::write(&config_path, "timeout_secs = 60").unwrap();

        let found = find_config(temp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("matr.toml");
        std::fs::write(&config_path, "timeout_secs = 60").unwrap();
        let nested = temp.path().join("tools").join("ci");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config(&nested), Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_toml_over_yaml() {
        let temp = TempDir::new().unwrap();
        let toml_path = temp.path().join("matr.toml");
        std::fs::write(&toml_path, "timeout_secs = 60").unwrap();
        std::fs::write(temp.path().join("matr.yaml"), "timeout_secs: 30").unwrap();

        assert_eq!(find_config(temp.path()).unwrap(), toml_path);
    }

    #[test]
    fn test_load_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("matr.toml");
        std::fs::write(
            &config_path,
            r#"
timeout_secs = 60
dispatch = "fallback"

[compiler]
release = true

[dependencies]
xshell = "0.2"
serde = { version = "1", features = ["derive"] }
"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.dispatch_policy(), DispatchPolicy::FallbackToDefault);
        assert!(config.compiler.release);
        assert_eq!(config.compiler.cargo, "cargo");
        assert_eq!(config.dependencies.len(), 2);
    }

    #[test]
    fn test_load_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("matr.yaml");
        std::fs::write(
            &config_path,
            "timeout_secs: 30\ncompiler:\n  args: [\"--offline\"]\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.compiler.args, vec!["--offline"]);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("matr.toml"), "dispatch = \"sometimes\"").unwrap();

        let err = load_config_or_default(temp.path()).unwrap_err();
        assert!(matches!(
            err,
            MatrError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "dispatch"
        ));
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let (config, path) = load_config_or_default(temp.path()).unwrap();
        assert!(path.is_none());
        assert_eq!(config.timeout_secs, 300);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| match key {
            "MATR_CARGO" => Some("/opt/rust/bin/cargo".to_string()),
            "MATR_RUNTIME_PATH" => Some("/src/matr/crates/matr-runtime".to_string()),
            _ => None,
        });

        assert_eq!(config.compiler.cargo, "/opt/rust/bin/cargo");
        assert_eq!(
            config.runtime.path,
            Some(PathBuf::from("/src/matr/crates/matr-runtime"))
        );
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |_| Some(String::new()));
        assert_eq!(config, Config::default());
    }
}
