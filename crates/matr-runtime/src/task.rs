//! Runtime task definitions

use std::fmt;
use std::sync::Arc;

use crate::context::Context;

/// Signature every task handler satisfies
pub type HandlerFn = dyn Fn(&Context) -> anyhow::Result<()> + Send + Sync;

/// A runnable task registered with the [`Registry`](crate::Registry)
#[derive(Clone)]
pub struct Task {
    /// Name used on the command line; empty means the default task
    pub name: String,
    /// One-line summary for the target listing
    pub summary: String,
    /// Full documentation shown by `-h <task>`
    pub doc: String,
    handler: Arc<HandlerFn>,
}

impl Task {
    /// Create a new task
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Context) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            summary: String::new(),
            doc: String::new(),
            handler: Arc::new(handler),
        }
    }

    /// Set the summary
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Set the documentation
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Invoke the handler
    pub fn call(&self, ctx: &Context) -> anyhow::Result<()> {
        (self.handler)(ctx)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

/// Run dependent handlers in the given order, stopping at the first error.
///
/// ```ignore
/// fn Build(ctx: &matr::Context) -> matr::Result {
///     matr::deps(ctx, &[Proto, Test])?;
///     // ...
///     Ok(())
/// }
/// ```
pub fn deps(ctx: &Context, handlers: &[fn(&Context) -> anyhow::Result<()>]) -> anyhow::Result<()> {
    for handler in handlers {
        ctx.ensure_active()?;
        handler(ctx)?;
    }
    Ok(())
}
