//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

/// matr - run tasks defined in a Rust Matrfile
#[derive(Debug, Parser)]
#[command(name = "matr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the Matrfile, or a directory containing one
    #[arg(long, default_value = ".", value_name = "PATH")]
    pub matrfile: PathBuf,

    /// Remove the matr cache and exit
    #[arg(long, conflicts_with = "status")]
    pub clean: bool,

    /// Rebuild the driver even if the Matrfile is unchanged
    #[arg(long)]
    pub no_cache: bool,

    /// Show the cache state and exit
    #[arg(long)]
    pub status: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Task to run, followed by its arguments
    #[arg(
        value_name = "TASK",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}

impl Cli {
    /// Execute the CLI command, returning the process exit code
    pub fn execute(&self) -> anyhow::Result<i32> {
        if self.clean {
            return commands::clean::execute(self);
        }

        if self.status {
            return commands::status::execute(self);
        }

        commands::run::execute(self)
    }
}
