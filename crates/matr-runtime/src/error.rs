//! Dispatch errors

use thiserror::Error;

/// Errors returned by [`Registry::run`](crate::Registry::run)
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Fallback dispatch was requested but no default task is registered
    #[error("no handler found for target \"{0}\" and no default task is registered")]
    NoDefaultHandler(String),

    /// The task handler returned an error
    #[error("{error:#}")]
    Task { task: String, error: anyhow::Error },

    /// The task handler panicked
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl DispatchError {
    /// The handler error, if this is a task failure
    pub fn task_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Task { error, .. } => Some(error),
            _ => None,
        }
    }
}
