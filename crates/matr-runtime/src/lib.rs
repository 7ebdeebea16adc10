//! matr runtime - task registry and dispatcher
//!
//! This crate is linked into every generated matr driver (where it is
//! imported as `matr`). It provides the task registry, the per-run
//! execution context, and the supervisor that races a running task against
//! its deadline and OS signals.

pub mod context;
pub mod error;
pub mod naming;
pub mod registry;
pub mod supervisor;
pub mod task;

pub use context::Context;
pub use error::DispatchError;
pub use naming::task_name;
pub use registry::{Dispatch, DispatchPolicy, Registry, RegistryState, DEFAULT_TASK};
pub use supervisor::{supervise, Outcome};
pub use task::{deps, HandlerFn, Task};

/// Re-exported so task definitions can use `?` on any error type
pub use anyhow;

/// Result type returned by task handlers
pub type Result<T = ()> = anyhow::Result<T>;

/// Install a console tracing subscriber for the driver process.
///
/// Verbosity is controlled by `MATR_LOG` (default: warn). Calling this more
/// than once is harmless.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("MATR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
