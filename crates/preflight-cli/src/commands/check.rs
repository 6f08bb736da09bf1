//! Check command - run preflight checks against planned changes

use console::style;
use preflight_core::{CancellationToken, ChangeGraph, PreflightConfig, PreflightError};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CliError, Result};

pub fn run(
    existing: &[PathBuf],
    desired: &[PathBuf],
    preflight: Option<&str>,
    config: Option<&Path>,
) -> Result<()> {
    let graph = ChangeGraph::from_manifests(&read_manifests(existing)?, &read_manifests(desired)?)?;
    debug!(
        existing = existing.len(),
        desired = desired.len(),
        changes = graph.len(),
        "built change graph"
    );

    let mut registry = super::default_registry()?;
    if let Some(enable_list) = preflight {
        registry.set(enable_list)?;
    }
    if let Some(path) = config {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
        let document = PreflightConfig::from_yaml(&content)?;
        debug!(path = %path.display(), rules = document.rules.len(), "loaded preflight configuration");
        registry.set_config(&document)?;
    }

    let enabled = registry.to_string();
    if enabled.is_empty() {
        debug!("every preflight check is disabled, skipping run");
        println!(
            "{} No preflight checks enabled ({} change(s) planned)",
            style("⚠").yellow(),
            graph.len()
        );
        return Ok(());
    }

    println!(
        "{} Running preflight checks {} against {} change(s)",
        style("→").blue(),
        style(&enabled).cyan(),
        graph.len()
    );

    let ctx = CancellationToken::new();
    match registry.run(&ctx, &graph) {
        Ok(()) => {
            println!("{} Preflight checks passed", style("✓").green());
            Ok(())
        }
        Err(PreflightError::ChecksFailed(failures)) => {
            for failure in &failures {
                for line in failure.to_string().lines() {
                    println!("  {} {}", style("✗").red(), line);
                }
            }
            Err(CliError::ChecksFailed {
                count: failures.len(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Concatenate every file into one multi-document YAML stream
fn read_manifests(paths: &[PathBuf]) -> Result<String> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        debug!(path = %path.display(), "reading manifest");
        documents.push(std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?);
    }
    Ok(documents.join("\n---\n"))
}
