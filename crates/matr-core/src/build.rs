//! Build orchestration
//!
//! Ties the cache, parser, generator and compiler together. On a cache hit
//! the build returns straight away; on a miss the definition file is
//! parsed, the driver crate regenerated and compiled. The cache is keyed on
//! the definition file and on the settings baked into the driver, so a
//! config change rebuilds even when the file is untouched.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::cache::{hash_bytes, BuildCache};
use crate::compiler::{CompileJob, Compiler};
use crate::config::{Config, RuntimeConfig};
use crate::error::{MatrError, Result};
use crate::generator::{generate, generate_manifest, DriverOptions, ManifestOptions};
use crate::parser::parse;

/// File names probed when the definition path is a directory
pub const DEFINITION_FILE_NAMES: &[&str] = &["Matrfile.rs", "Matrfile"];

/// Resolve a user-supplied path to an absolute definition file path
pub fn resolve_definition(path: &Path) -> Result<PathBuf> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    if path.is_file() {
        return Ok(path);
    }

    if path.is_dir() {
        for name in DEFINITION_FILE_NAMES {
            let candidate = path.join(name);
            if candidate.is_file() {
                debug!(path = %candidate.display(), "found definition file");
                return Ok(candidate);
            }
        }
    }

    Err(MatrError::DefinitionNotFound(path))
}

/// What a build produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub cache_dir: PathBuf,
    pub artifact: PathBuf,
    /// False when the cache was current and nothing ran
    pub rebuilt: bool,
}

/// Builds the driver for one definition file
pub struct Builder<'a, C: Compiler> {
    definition: PathBuf,
    config: &'a Config,
    compiler: C,
}

impl<'a, C: Compiler> Builder<'a, C> {
    /// Create a builder for an absolute definition file path
    pub fn new(definition: impl Into<PathBuf>, config: &'a Config, compiler: C) -> Self {
        Self {
            definition: definition.into(),
            config,
            compiler,
        }
    }

    pub fn definition(&self) -> &Path {
        &self.definition
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Bring the cached driver up to date with the definition file
    #[instrument(skip(self), fields(definition = %self.definition.display()))]
    pub fn build(&self, bypass_cache: bool) -> Result<BuildOutcome> {
        let options = DriverOptions::from_config(self.config);
        let runtime = self.runtime_config();
        let manifest = generate_manifest(&ManifestOptions {
            runtime: &runtime,
            dependencies: &self.config.dependencies,
        })?;

        let cache = BuildCache::for_definition(&self.definition)
            .with_settings(self.settings_fingerprint(&options, &manifest));
        let resolution = cache.resolve(bypass_cache)?;

        let mut outcome = BuildOutcome {
            cache_dir: resolution.dir.clone(),
            artifact: cache.artifact_path(),
            rebuilt: false,
        };

        if resolution.is_hit() {
            debug!("driver is up to date");
            return Ok(outcome);
        }

        let commands = parse(&self.definition)?;
        info!(
            commands = commands.len(),
            exported = commands.iter().filter(|c| c.is_exported).count(),
            "parsed definition file"
        );

        let driver = generate(&commands, &options);
        fs::write(cache.driver_source_path(), driver)?;
        fs::write(cache.manifest_path(), manifest)?;

        self.compiler.compile(&CompileJob {
            cache_dir: cache.dir().to_path_buf(),
            manifest: cache.manifest_path(),
            target_dir: cache.target_dir(),
            artifact: cache.artifact_path(),
            release: self.config.compiler.release,
            args: self.config.compiler.args.clone(),
        })?;

        info!(artifact = %outcome.artifact.display(), "driver built");
        outcome.rebuilt = true;
        Ok(outcome)
    }

    /// Hash of everything besides the definition file that shapes the driver
    fn settings_fingerprint(&self, options: &DriverOptions, manifest: &str) -> String {
        let compiler = &self.config.compiler;
        let settings = format!(
            "policy={}\ntimeout={}\nrelease={}\nargs={:?}\n{}",
            options.policy.variant_name(),
            options.timeout.as_secs(),
            compiler.release,
            compiler.args,
            manifest
        );
        hash_bytes(settings.as_bytes())
    }

    /// Runtime source with a relative path anchored at the definition file's directory
    fn runtime_config(&self) -> RuntimeConfig {
        let mut runtime = self.config.runtime.clone();
        if let Some(path) = runtime.path.as_mut() {
            if path.is_relative() {
                let base = self.definition.parent().unwrap_or_else(|| Path::new("."));
                *path = base.join(&*path);
            }
        }
        runtime
    }
}
