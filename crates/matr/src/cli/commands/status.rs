//! Show what the cache holds for a Matrfile

use matr_core::{resolve_definition, BuildCache};

use crate::cli::{output, Cli};
use crate::exit_codes;

pub fn execute(cli: &Cli) -> anyhow::Result<i32> {
    let definition = resolve_definition(&cli.matrfile)?;
    let cache = BuildCache::for_definition(&definition);
    let info = cache.status()?;

    println!("{}", output::header("matr cache"));
    println!(
        "{}",
        output::key_value(
            "Matrfile",
            &output::path_style().apply_to(definition.display()).to_string()
        )
    );
    println!(
        "{}",
        output::key_value(
            "Directory",
            &output::path_style().apply_to(info.dir.display()).to_string()
        )
    );

    if !info.exists {
        output::info("Not built yet");
        return Ok(exit_codes::SUCCESS);
    }

    let hash = info.stored_hash.as_deref().unwrap_or("none");
    println!("{}", output::key_value("Stored hash", hash));
    println!("{}", output::key_value("Up to date", &output::flag(info.up_to_date)));
    println!(
        "{}",
        output::key_value("Driver built", &output::flag(info.artifact_present))
    );
    println!("{}", output::key_value("Size", &info.formatted_size()));

    Ok(exit_codes::SUCCESS)
}
