//! Running the compiled driver

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tracing::debug;

use crate::cache::artifact_file_name;
use crate::error::{MatrError, Result};

/// Runs the driver binary from a cache directory
#[derive(Debug, Clone)]
pub struct Executor {
    artifact: PathBuf,
}

impl Executor {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            artifact: cache_dir.join(artifact_file_name()),
        }
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// Run the driver with the given arguments and inherited stdio.
    ///
    /// A missing binary is reported instead of triggering a rebuild.
    pub fn run(cache_dir: &Path, args: &[String]) -> Result<ExitStatus> {
        Self::new(cache_dir).execute(args)
    }

    pub fn execute(&self, args: &[String]) -> Result<ExitStatus> {
        if !self.artifact.is_file() {
            return Err(MatrError::ArtifactMissing(self.artifact.clone()));
        }

        debug!(artifact = %self.artifact.display(), args = ?args, "running driver");
        let status = Command::new(&self.artifact).args(args).status()?;
        debug!(status = %status, "driver exited");
        Ok(status)
    }
}
