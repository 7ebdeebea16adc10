//! Per-run execution context

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// Execution context handed to a task handler.
///
/// Carries the residual command-line arguments (everything after the task
/// name), the overall deadline of the run, and a cancellation token that is
/// triggered when the deadline passes or the process receives an interrupt.
/// Handlers that run for a long time should poll [`Context::is_cancelled`]
/// or call [`Context::ensure_active`] between steps.
#[derive(Debug, Clone, Default)]
pub struct Context {
    args: Vec<String>,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Context {
    /// Create an empty context with no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the residual arguments
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Set the deadline
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Arguments passed after the task name
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Argument at `index`, if present
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// The instant after which the run is abandoned
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Whether the run has been cancelled or its deadline has passed
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail with an error if the run should stop
    pub fn ensure_active(&self) -> anyhow::Result<()> {
        if self.cancel.is_cancelled() {
            anyhow::bail!("run cancelled");
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            anyhow::bail!("deadline exceeded");
        }
        Ok(())
    }

    /// The token cancelled on deadline or interrupt
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}
