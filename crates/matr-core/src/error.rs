//! Error types for matr

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Result type alias using MatrError
pub type Result<T> = std::result::Result<T, MatrError>;

/// Main error type for discovery, generation and build operations
#[derive(Debug, Error)]
pub enum MatrError {
    /// No task-definition file could be resolved
    #[error("unable to find Matrfile: {0}")]
    DefinitionNotFound(PathBuf),

    /// The build marker comment is missing or wrong
    #[error("invalid Matrfile {0}: matr build marker missing or incorrect")]
    InvalidDefinitionFile(PathBuf),

    /// The definition file is not valid Rust
    #[error("failed to parse {path}:{line}:{column}: {message}")]
    ParseFailure {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// The compiler reported errors (its output was passed through).
    ///
    /// Without `runtime.path` the driver depends on `matr-runtime` from
    /// crates.io, so an offline machine fails here too.
    #[error(
        "compiling the matr driver failed ({status}); if matr-runtime could not be \
         resolved, point runtime.path in matr.toml or MATR_RUNTIME_PATH at a local checkout"
    )]
    CompileFailure { status: ExitStatus },

    /// The compiler executable could not be located
    #[error("compiler not found: {0}")]
    CompilerNotFound(String),

    /// Execution was attempted before a successful build
    #[error("matr binary not found at {0}; rebuild with --no-cache")]
    ArtifactMissing(PathBuf),

    /// The driver manifest could not be serialized
    #[error("failed to render driver manifest: {0}")]
    Manifest(#[from] toml::ser::Error),

    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}
