//! `keel import`: run the header importer and print what it registered.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use keel_core::{DeclRegistry, Declaration};
use keel_import::{HeaderStatus, ImportConfig, ImportSummary, Importer, SourceFrontend};
use keel_mangle::mangle_function;
use tracing::info;

pub fn run(
    config_path: Option<&Path>,
    headers: &[PathBuf],
    format: Option<&str>,
    symbols: bool,
) -> Result<()> {
    let json = match format {
        Some("json") => true,
        Some("human") | None => false,
        Some(other) => bail!("unknown output format: '{other}'. Choose: human, json"),
    };
    let config = resolve_config(config_path, headers)?;
    let (summary, registry) = import(&config)?;

    let output = if json {
        render_json(&summary, &registry, symbols)?
    } else {
        render_human(&summary, &registry, symbols)?
    };
    print!("{output}");
    Ok(())
}

/// The configuration file (or the defaults), with `--header` files
/// replacing the configured header list.
fn resolve_config(path: Option<&Path>, headers: &[PathBuf]) -> Result<ImportConfig> {
    let mut config = match path {
        Some(path) => {
            ImportConfig::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => ImportConfig::default(),
    };
    if !headers.is_empty() {
        config.headers = headers
            .iter()
            .map(|h| h.to_string_lossy().into_owned())
            .collect();
        config.search_prefix = PathBuf::new();
        config.runtime_header = None;
    }
    Ok(config)
}

fn import(config: &ImportConfig) -> Result<(ImportSummary, DeclRegistry)> {
    info!(headers = config.header_paths().len(), "importing headers");
    let mut registry = DeclRegistry::new();
    let summary = Importer::new(&mut registry)
        .run(&mut SourceFrontend::new(), config)
        .context("import aborted")?;
    Ok((summary, registry))
}

fn render_human(summary: &ImportSummary, registry: &DeclRegistry, symbols: bool) -> Result<String> {
    let mut out = String::new();
    for header in &summary.headers {
        match &header.status {
            HeaderStatus::Imported { declarations } => {
                writeln!(out, "{}: {declarations} declarations", header.path.display())?
            }
            HeaderStatus::Failed { error } => {
                writeln!(out, "{}: failed ({error})", header.path.display())?
            }
        }
    }
    writeln!(out, "Imported {}", summary.stats)?;
    writeln!(out)?;

    for decl in registry.declarations() {
        writeln!(out, "{decl}")?;
        if let (true, Declaration::Function(func)) = (symbols, decl) {
            writeln!(out, "    symbol: {}", mangle_function(func))?;
        }
    }
    Ok(out)
}

fn render_json(summary: &ImportSummary, registry: &DeclRegistry, symbols: bool) -> Result<String> {
    let mut json = serde_json::json!({
        "summary": summary,
        "declarations": registry.declarations(),
    });
    if symbols {
        json["symbols"] = registry
            .declarations()
            .iter()
            .filter_map(|decl| match decl {
                Declaration::Function(func) => Some(serde_json::json!({
                    "name": func.name,
                    "symbol": mangle_function(func),
                })),
                _ => None,
            })
            .collect();
    }
    Ok(serde_json::to_string_pretty(&json)? + "\n")
}
