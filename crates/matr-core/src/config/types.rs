//! Configuration types

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use matr_runtime::DispatchPolicy;
use serde::{Deserialize, Serialize};

use super::defaults::{DEFAULT_CARGO, DEFAULT_DISPATCH, DEFAULT_TIMEOUT_SECS};

/// Main configuration for matr
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overall deadline for a task run, in seconds
    pub timeout_secs: u64,

    /// Policy for unknown task names ("strict" or "fallback")
    pub dispatch: String,

    /// Where the generated driver gets the runtime crate from
    pub runtime: RuntimeConfig,

    /// How the driver is compiled
    pub compiler: CompilerConfig,

    /// Extra dependencies available to the Matrfile, in Cargo.toml syntax
    pub dependencies: BTreeMap<String, toml::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            dispatch: DEFAULT_DISPATCH.to_string(),
            runtime: RuntimeConfig::default(),
            compiler: CompilerConfig::default(),
            dependencies: BTreeMap::new(),
        }
    }
}

impl Config {
    /// The run deadline as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The dispatch policy; validation guarantees the name is known
    pub fn dispatch_policy(&self) -> DispatchPolicy {
        DispatchPolicy::parse(&self.dispatch).unwrap_or_default()
    }
}

/// Runtime crate source for the generated driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Version requirement for the registry crate
    pub version: String,

    /// Local checkout of the runtime crate; takes precedence over `version`
    pub path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            path: None,
        }
    }
}

/// Compiler invocation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Cargo executable name or path
    pub cargo: String,

    /// Build the driver with the release profile
    pub release: bool,

    /// Extra arguments passed to `cargo build`
    pub args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            cargo: DEFAULT_CARGO.to_string(),
            release: false,
            args: Vec::new(),
        }
    }
}
