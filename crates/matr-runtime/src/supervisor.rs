//! Driver supervisor
//!
//! The generated driver hands its registry to [`supervise`], which runs the
//! requested task on a blocking worker thread while waiting on the task,
//! the run deadline and SIGINT/SIGTERM. Whichever fires first decides the
//! outcome. A handler abandoned on deadline or signal is not awaited; its
//! context is cancelled so cooperative handlers can stop early.

use std::future::Future;
use std::io::Write;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::DispatchError;
use crate::registry::{Dispatch, Registry};

/// Process exit codes reported by the driver
pub mod exit_codes {
    /// The task completed (or only usage was printed)
    pub const SUCCESS: i32 = 0;
    /// The task or dispatch failed
    pub const TASK_FAILED: i32 = 1;
    /// The run deadline passed
    pub const TIMED_OUT: i32 = 124;
    /// Interrupted by SIGINT/SIGTERM
    pub const INTERRUPTED: i32 = 130;
}

/// Result of a supervised run
#[derive(Debug)]
pub enum Outcome {
    /// The registry returned before the deadline or a signal
    Completed(Result<Dispatch, DispatchError>),
    /// The deadline fired first
    TimedOut,
    /// An interrupt or termination signal arrived first
    Interrupted,
}

impl Outcome {
    /// Exit code for the driver process
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed(Ok(_)) => exit_codes::SUCCESS,
            Self::Completed(Err(_)) => exit_codes::TASK_FAILED,
            Self::TimedOut => exit_codes::TIMED_OUT,
            Self::Interrupted => exit_codes::INTERRUPTED,
        }
    }

    /// Write the single status line for this outcome, if any
    pub fn report<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        match self {
            Self::Completed(Ok(_)) => Ok(()),
            Self::Completed(Err(e)) => writeln!(w, "ERROR: {}", e),
            Self::TimedOut => writeln!(w, "ERROR: Context timed out"),
            Self::Interrupted => writeln!(w, "INFO: Received signal, shutting down"),
        }
    }
}

/// Run the requested task under a deadline with signal handling.
///
/// Builds its own tokio runtime; call it from a synchronous `main`.
pub fn supervise(
    registry: Registry,
    args: Vec<String>,
    timeout: Duration,
) -> std::io::Result<Outcome> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let outcome = runtime.block_on(race(registry, args, timeout, shutdown_signal()));

    // Do not wait for a handler that lost the race.
    runtime.shutdown_background();
    Ok(outcome)
}

/// Race the task against `timeout` and `shutdown`
pub async fn race<S>(
    mut registry: Registry,
    args: Vec<String>,
    timeout: Duration,
    shutdown: S,
) -> Outcome
where
    S: Future<Output = ()>,
{
    let cancel = CancellationToken::new();
    let ctx = Context::new()
        .with_deadline(Instant::now() + timeout)
        .with_cancellation(cancel.clone());

    let worker = tokio::task::spawn_blocking(move || registry.run(ctx, &args));

    tokio::select! {
        joined = worker => match joined {
            Ok(result) => Outcome::Completed(result),
            Err(e) => Outcome::Completed(Err(DispatchError::Panicked(e.to_string()))),
        },
        _ = tokio::time::sleep(timeout) => {
            warn!(timeout_secs = timeout.as_secs(), "task deadline exceeded");
            cancel.cancel();
            Outcome::TimedOut
        }
        _ = shutdown => {
            debug!("shutdown signal received");
            cancel.cancel();
            Outcome::Interrupted
        }
    }
}

/// Resolves on SIGINT or SIGTERM (Ctrl+C elsewhere)
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install interrupt handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
}
