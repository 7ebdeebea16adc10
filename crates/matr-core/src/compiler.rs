//! Compiling the generated driver

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::cache::artifact_file_name;
use crate::config::CompilerConfig;
use crate::error::{MatrError, Result};

/// Everything a compiler needs to turn a cache directory into an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    /// Cache directory holding the driver crate
    pub cache_dir: PathBuf,
    /// Generated driver manifest
    pub manifest: PathBuf,
    /// Compiler working directory
    pub target_dir: PathBuf,
    /// Where the finished binary must end up
    pub artifact: PathBuf,
    /// Use the release profile
    pub release: bool,
    /// Extra arguments for the compiler
    pub args: Vec<String>,
}

/// The seam to the external toolchain
pub trait Compiler {
    /// Produce `job.artifact`. Compiler output goes straight to the terminal.
    fn compile(&self, job: &CompileJob) -> Result<()>;
}

/// Compiles the driver with `cargo build`
#[derive(Debug, Clone)]
pub struct CargoCompiler {
    program: String,
}

impl CargoCompiler {
    /// Create a compiler running the given cargo executable
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(config.cargo.clone())
    }

    /// Locate the cargo executable on PATH (or verify an explicit path)
    pub fn resolve_program(&self) -> Result<PathBuf> {
        which::which(&self.program).map_err(|_| MatrError::CompilerNotFound(self.program.clone()))
    }

    /// Arguments passed to cargo for a job
    pub fn build_args(job: &CompileJob) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "--manifest-path".to_string(),
            job.manifest.to_string_lossy().into_owned(),
            "--target-dir".to_string(),
            job.target_dir.to_string_lossy().into_owned(),
        ];
        if job.release {
            args.push("--release".to_string());
        }
        args.extend(job.args.iter().cloned());
        args
    }

    fn built_binary(job: &CompileJob) -> PathBuf {
        let profile = if job.release { "release" } else { "debug" };
        job.target_dir.join(profile).join(artifact_file_name())
    }
}

impl Default for CargoCompiler {
    fn default() -> Self {
        Self::from_config(&CompilerConfig::default())
    }
}

impl Compiler for CargoCompiler {
    fn compile(&self, job: &CompileJob) -> Result<()> {
        let program = self.resolve_program()?;
        let args = Self::build_args(job);
        info!(program = %program.display(), args = ?args, "compiling driver");

        let status = Command::new(&program)
            .args(&args)
            .current_dir(&job.cache_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;

        if !status.success() {
            return Err(MatrError::CompileFailure { status });
        }

        let built = Self::built_binary(job);
        if !built.is_file() {
            return Err(MatrError::ArtifactMissing(built));
        }
        debug!(from = %built.display(), to = %job.artifact.display(), "installing driver binary");
        fs::copy(&built, &job.artifact)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(release: bool) -> CompileJob {
        let cache_dir = PathBuf::from("/work/.matr");
        CompileJob {
            manifest: cache_dir.join("Cargo.toml"),
            target_dir: cache_dir.join("target"),
            artifact: cache_dir.join("matr"),
            cache_dir,
            release,
            args: vec!["--offline".to_string()],
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_debug_build_args() {
        assert_eq!(
            CargoCompiler::build_args(&job(false)),
            vec![
                "build",
                "--manifest-path",
                "/work/.matr/Cargo.toml",
                "--target-dir",
                "/work/.matr/target",
                "--offline",
            ]
        );
    }

    #[test]
    fn test_release_build_args() {
        let args = CargoCompiler::build_args(&job(true));
        assert_eq!(args[5], "--release");
        assert_eq!(args.last().map(String::as_str), Some("--offline"));
    }

    #[test]
    fn test_built_binary_location() {
        let name = artifact_file_name();
        assert_eq!(
            CargoCompiler::built_binary(&job(false)),
            PathBuf::from("/work/.matr/target/debug").join(&name)
        );
        assert_eq!(
            CargoCompiler::built_binary(&job(true)),
            PathBuf::from("/work/.matr/target/release").join(&name)
        );
    }

    #[test]
    fn test_missing_compiler() {
        let compiler = CargoCompiler::new("matr-definitely-not-a-compiler");
        let err = compiler.compile(&job(false)).unwrap_err();
        assert!(matches!(
            err,
            MatrError::CompilerNotFound(ref p) if p == "matr-definitely-not-a-compiler"
        ));
    }
}
