//! Remove the cache directory

use matr_core::{resolve_definition, BuildCache};

use crate::cli::{output, Cli};
use crate::exit_codes;

pub fn execute(cli: &Cli) -> anyhow::Result<i32> {
    let definition = resolve_definition(&cli.matrfile)?;
    let cache = BuildCache::for_definition(definition);
    let dir = output::path_style().apply_to(cache.dir().display());

    if cache.clean()? {
        output::success(&format!("Removed {}", dir));
    } else {
        output::info(&format!("Nothing to clean at {}", dir));
    }

    Ok(exit_codes::SUCCESS)
}
