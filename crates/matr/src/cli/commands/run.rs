//! Build the driver if needed and run the requested task

use std::path::Path;

use tracing::{debug, info};

use matr_core::{load_config_or_default, resolve_definition, Builder, CargoCompiler, Executor};

use crate::cli::Cli;
use crate::exit_codes;

pub fn execute(cli: &Cli) -> anyhow::Result<i32> {
    let definition = resolve_definition(&cli.matrfile)?;
    let definition_dir = definition.parent().unwrap_or_else(|| Path::new("."));

    let (config, config_path) = load_config_or_default(definition_dir)?;
    match &config_path {
        Some(path) => debug!(config = %path.display(), "using config file"),
        None => debug!("using default config"),
    }

    let compiler = CargoCompiler::from_config(&config.compiler);
    let outcome = Builder::new(&definition, &config, compiler).build(cli.no_cache)?;
    info!(
        cache_dir = %outcome.cache_dir.display(),
        rebuilt = outcome.rebuilt,
        "driver ready"
    );

    let status = Executor::run(&outcome.cache_dir, &cli.args)?;
    Ok(exit_codes::for_status(status))
}
