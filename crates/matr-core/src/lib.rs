//! matr core - discovery, generation and build caching
//!
//! This crate turns a `Matrfile.rs` into a runnable driver binary:
//! the parser extracts one command per top-level function, the generator
//! renders a driver crate registering the exported ones, and the cache
//! controller skips regeneration and recompilation while the file's content
//! hash is unchanged.

pub mod build;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod error;
pub mod executor;
pub mod generator;
pub mod parser;

pub use build::{resolve_definition, BuildOutcome, Builder};
pub use cache::{BuildCache, CacheInfo, CacheResolution, CacheStatus};
pub use compiler::{CargoCompiler, CompileJob, Compiler};
pub use config::{load_config_or_default, Config};
pub use error::{ConfigError, MatrError, Result};
pub use executor::Executor;
pub use generator::{generate, generate_manifest, DriverOptions, ManifestOptions};
pub use parser::{parse, parse_source, Command, BUILD_MARKER};
