//! Exit codes for the CLI
//!
//! When a task runs, the driver's own exit code is passed through instead.

use std::process::ExitStatus;

use matr_core::MatrError;

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// The Matrfile could not be parsed or the driver failed to compile
pub const BUILD_ERROR: i32 = 3;

/// Map a top-level error to an exit code
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<MatrError>() {
        Some(MatrError::Config(_)) => CONFIG_ERROR,
        Some(
            MatrError::InvalidDefinitionFile(_)
            | MatrError::ParseFailure { .. }
            | MatrError::CompileFailure { .. }
            | MatrError::CompilerNotFound(_)
            | MatrError::Manifest(_),
        ) => BUILD_ERROR,
        _ => ERROR,
    }
}

/// Exit code to report for a finished driver process
pub fn for_status(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    ERROR
}
