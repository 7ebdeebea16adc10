//! Driver generation
//!
//! Renders the driver crate for a parsed Matrfile: `main.rs`, which
//! includes the Matrfile and registers its exported functions, and the
//! `Cargo.toml` that builds it. Output depends only on the inputs, so an
//! unchanged Matrfile always regenerates byte-identical files.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use matr_runtime::{task_name, DispatchPolicy};
use serde::Serialize;

use crate::cache::{ARTIFACT_NAME, LINKED_DEFINITION};
use crate::config::{Config, RuntimeConfig};
use crate::error::Result;
use crate::parser::Command;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Settings rendered into the driver's `main`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    /// Policy for unknown task names
    pub policy: DispatchPolicy,
    /// Overall deadline for a run
    pub timeout: Duration,
}

impl DriverOptions {
    /// Options taken from configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            policy: config.dispatch_policy(),
            timeout: config.timeout(),
        }
    }
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Inputs to the driver manifest
#[derive(Debug, Clone, Copy)]
pub struct ManifestOptions<'a> {
    /// Runtime crate source
    pub runtime: &'a RuntimeConfig,
    /// Extra Matrfile dependencies
    pub dependencies: &'a BTreeMap<String, toml::Value>,
}

/// Render the driver's `main.rs`
pub fn generate(commands: &[Command], options: &DriverOptions) -> String {
    let mut src = String::new();

    let _ = writeln!(src, "// Code generated by matr v{}. DO NOT EDIT.", VERSION);
    src.push_str("#![allow(non_snake_case, dead_code, unused_imports)]\n\n");
    let _ = writeln!(src, "include!({:?});", LINKED_DEFINITION);
    src.push_str("\nfn main() {\n");
    src.push_str("    matr::init_logging();\n\n");
    let _ = writeln!(
        src,
        "    let mut registry = matr::Registry::new().with_policy(matr::DispatchPolicy::{});",
        options.policy.variant_name()
    );

    for cmd in commands.iter().filter(|c| c.is_exported) {
        let comment = if cmd.summary.is_empty() {
            cmd.name.as_str()
        } else {
            cmd.summary.as_str()
        };
        let _ = writeln!(src, "\n    // {}", comment);
        src.push_str("    registry.handle(\n");
        let _ = writeln!(
            src,
            "        matr::Task::new({:?}, {})",
            task_name(&cmd.name),
            cmd.name
        );
        let _ = writeln!(src, "            .summary({:?})", cmd.summary.trim());
        let _ = writeln!(src, "            .doc({:?}),", cmd.doc.trim());
        src.push_str("    );\n");
    }

    src.push_str("\n    let args: Vec<String> = std::env::args().skip(1).collect();\n");
    let _ = writeln!(
        src,
        "    let timeout = std::time::Duration::from_secs({});",
        options.timeout.as_secs()
    );
    src.push_str(
        r#"
    let outcome = match matr::supervise(registry, args, timeout) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };
    let _ = outcome.report(&mut std::io::stderr());
    std::process::exit(outcome.exit_code());
}
"#,
    );

    src
}

#[derive(Serialize)]
struct DriverManifest {
    package: ManifestPackage,
    bin: Vec<ManifestBin>,
    workspace: toml::Table,
    dependencies: toml::Table,
}

#[derive(Serialize)]
struct ManifestPackage {
    name: &'static str,
    version: &'static str,
    edition: &'static str,
    publish: bool,
}

#[derive(Serialize)]
struct ManifestBin {
    name: &'static str,
    path: &'static str,
}

/// Render the driver's `Cargo.toml`
pub fn generate_manifest(options: &ManifestOptions<'_>) -> Result<String> {
    let mut runtime = toml::Table::new();
    runtime.insert(
        "package".to_string(),
        toml::Value::String("matr-runtime".to_string()),
    );
    match &options.runtime.path {
        Some(path) => {
            runtime.insert(
                "path".to_string(),
                toml::Value::String(path.to_string_lossy().into_owned()),
            );
        }
        None => {
            runtime.insert(
                "version".to_string(),
                toml::Value::String(options.runtime.version.clone()),
            );
        }
    }

    let mut dependencies = toml::Table::new();
    dependencies.insert("matr".to_string(), toml::Value::Table(runtime));
    for (name, spec) in options.dependencies {
        dependencies.insert(name.clone(), spec.clone());
    }

    let manifest = DriverManifest {
        package: ManifestPackage {
            name: "matr-driver",
            version: "0.0.0",
            edition: "2021",
            publish: false,
        },
        bin: vec![ManifestBin {
            name: ARTIFACT_NAME,
            path: "main.rs",
        }],
        workspace: toml::Table::new(),
        dependencies,
    };

    let body = toml::to_string(&manifest)?;
    Ok(format!(
        "# Code generated by matr v{}. DO NOT EDIT.\n\n{}",
        VERSION, body
    ))
}
