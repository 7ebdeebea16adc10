//! Task registry and dispatcher

use std::collections::HashMap;
use std::any::Any;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info};

use crate::context::Context;
use crate::error::DispatchError;
use crate::task::Task;

/// Name under which the default task is registered
pub const DEFAULT_TASK: &str = "default";

type ExitHook = Arc<dyn Fn(&Context, Option<&anyhow::Error>) + Send + Sync>;

/// How an unknown task name is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DispatchPolicy {
    /// Report "no handler" with the usage text and return without error
    #[default]
    Strict,
    /// Run the `default` task instead; fail if there is none
    FallbackToDefault,
}

impl DispatchPolicy {
    /// Configuration name of the policy
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::FallbackToDefault => "fallback",
        }
    }

    /// Parse a policy from its configuration name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strict" => Some(Self::Strict),
            "fallback" => Some(Self::FallbackToDefault),
            _ => None,
        }
    }

    /// Variant name, as written in generated source
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::FallbackToDefault => "FallbackToDefault",
        }
    }
}

/// What a call to [`Registry::run`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Printed the full usage
    Usage,
    /// Printed the usage of a single task
    TaskUsage(String),
    /// No task matched the requested name
    NoHandler(String),
    /// The named task ran to successful completion
    Completed(String),
}

/// Lifecycle of a registry within one process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RegistryState {
    /// No task selected yet
    #[default]
    Idle,
    /// A task was resolved and its handler is running
    Dispatching(String),
    /// The handler returned
    Completed { task: String, success: bool },
}

/// Maps task names to handlers and dispatches command-line requests.
///
/// Tasks are listed in registration order. Re-registering a name replaces
/// the handler but keeps its original position.
pub struct Registry {
    tasks: HashMap<String, Task>,
    order: Vec<String>,
    policy: DispatchPolicy,
    on_exit: Option<ExitHook>,
    state: RegistryState,
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
}

impl Registry {
    /// Create an empty registry printing to stdout/stderr
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            order: Vec::new(),
            policy: DispatchPolicy::default(),
            on_exit: None,
            state: RegistryState::default(),
            out: Box::new(io::stdout()),
            err: Box::new(io::stderr()),
        }
    }

    /// Set the policy for unknown task names
    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Redirect usage output and error messages
    pub fn with_output<O, E>(mut self, out: O, err: E) -> Self
    where
        O: Write + Send + 'static,
        E: Write + Send + 'static,
    {
        self.out = Box::new(out);
        self.err = Box::new(err);
        self
    }

    /// Register a task. An empty name registers the default task.
    pub fn handle(&mut self, mut task: Task) {
        if task.name.is_empty() {
            task.name = DEFAULT_TASK.to_string();
        }
        if self.tasks.contains_key(&task.name) {
            debug!(task = %task.name, "replacing registered task");
        } else {
            self.order.push(task.name.clone());
        }
        self.tasks.insert(task.name.clone(), task);
    }

    /// Install a hook invoked after every handler run, successful or not
    pub fn on_exit<F>(&mut self, hook: F)
    where
        F: Fn(&Context, Option<&anyhow::Error>) + Send + Sync + 'static,
    {
        self.on_exit = Some(Arc::new(hook));
    }

    /// Registered task names in registration order
    pub fn task_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Look up a task by name
    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// The active dispatch policy
    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Current lifecycle state
    pub fn state(&self) -> &RegistryState {
        &self.state
    }

    /// Dispatch `args` (task name first) to the matching handler.
    ///
    /// The handler runs on the calling thread with a context carrying the
    /// residual arguments. Usage requests and, under
    /// [`DispatchPolicy::Strict`], unknown names are reported on the output
    /// streams and are not errors.
    pub fn run(&mut self, ctx: Context, args: &[String]) -> Result<Dispatch, DispatchError> {
        self.state = RegistryState::Idle;

        let Some((first, rest)) = args.split_first() else {
            self.print_usage();
            return Ok(Dispatch::Usage);
        };

        if is_help_flag(first) {
            return Ok(match rest.first() {
                Some(name) => self.print_task_usage(name),
                None => {
                    self.print_usage();
                    Dispatch::Usage
                }
            });
        }

        if rest.first().is_some_and(|a| is_help_flag(a)) {
            return Ok(self.print_task_usage(first));
        }

        let (task, residual) = match self.tasks.get(first.as_str()) {
            Some(task) => (task.clone(), rest.to_vec()),
            None => match self.policy {
                DispatchPolicy::Strict => {
                    debug!(target_name = %first, "no handler for target");
                    let _ = writeln!(self.err, "ERROR: no handler found for target \"{}\"", first);
                    self.print_usage();
                    return Ok(Dispatch::NoHandler(first.clone()));
                }
                DispatchPolicy::FallbackToDefault => match self.tasks.get(DEFAULT_TASK) {
                    Some(task) => {
                        debug!(target_name = %first, "falling back to default task");
                        (task.clone(), args.to_vec())
                    }
                    None => return Err(DispatchError::NoDefaultHandler(first.clone())),
                },
            },
        };

        info!(task = %task.name, args = residual.len(), "dispatching task");
        self.state = RegistryState::Dispatching(task.name.clone());

        let ctx = ctx.with_args(residual);
        let (result, panicked) = match panic::catch_unwind(AssertUnwindSafe(|| task.call(&ctx))) {
            Ok(result) => (result, None),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                (Err(anyhow::anyhow!("task panicked: {}", message)), Some(message))
            }
        };

        if let Some(hook) = &self.on_exit {
            hook(&ctx, result.as_ref().err());
        }

        self.state = RegistryState::Completed {
            task: task.name.clone(),
            success: result.is_ok(),
        };

        if let Some(message) = panicked {
            return Err(DispatchError::Panicked(message));
        }

        match result {
            Ok(()) => Ok(Dispatch::Completed(task.name)),
            Err(error) => Err(DispatchError::Task {
                task: task.name,
                error,
            }),
        }
    }

    /// Print the target listing
    pub fn print_usage(&mut self) {
        let visible: Vec<&Task> = self
            .order
            .iter()
            .filter(|name| name.as_str() != DEFAULT_TASK)
            .filter_map(|name| self.tasks.get(name))
            .collect();
        let width = visible.iter().map(|t| t.name.len()).max().unwrap_or(0);

        let mut text = String::from("\nRun Task: matr <opts> [target] args...\n\nTargets:\n");
        for task in visible {
            let line = format!("  {:<width$}   {}", task.name, task.summary, width = width);
            text.push_str(line.trim_end());
            text.push('\n');
        }
        text.push('\n');

        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    fn print_task_usage(&mut self, name: &str) -> Dispatch {
        let Some(task) = self.tasks.get(name) else {
            let _ = writeln!(self.err, "ERROR: no handler found for target \"{}\"", name);
            self.print_usage();
            return Dispatch::NoHandler(name.to_string());
        };

        let doc = if task.doc.is_empty() { &task.summary } else { &task.doc };
        let _ = write!(self.out, "matr {} :\n\n{}\n\n", task.name, doc);
        let _ = self.out.flush();
        Dispatch::TaskUsage(name.to_string())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tasks", &self.order)
            .field("policy", &self.policy)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn is_help_flag(arg: &str) -> bool {
    arg == "-h" || arg == "--help"
}
