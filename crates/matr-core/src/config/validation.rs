//! Configuration validation

use matr_runtime::DispatchPolicy;
use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");

    if config.timeout_secs == 0 {
        return Err(invalid("timeout_secs", "must be greater than zero"));
    }

    if DispatchPolicy::parse(&config.dispatch).is_none() {
        return Err(invalid("dispatch", "must be one of: strict, fallback"));
    }

    if config.compiler.cargo.trim().is_empty() {
        return Err(invalid("compiler.cargo", "cannot be empty"));
    }

    if config.runtime.path.is_none() && config.runtime.version.trim().is_empty() {
        return Err(invalid("runtime.version", "required when runtime.path is not set"));
    }

    if config.dependencies.contains_key("matr") {
        return Err(invalid("dependencies.matr", "name is reserved for the runtime crate"));
    }

    debug!("configuration validation passed");
    Ok(())
}

fn invalid(field: &str, message: &str) -> crate::error::MatrError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}
