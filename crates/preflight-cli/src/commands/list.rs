//! List command - show known preflight checks

use console::style;
use preflight_crd::{CRD_UPGRADE_SAFETY, VALIDATION_NAMES};

use crate::error::Result;

pub fn run() -> Result<()> {
    let registry = super::default_registry()?;

    println!("{}", style("Preflight checks:").bold());
    for name in registry.names() {
        let state = if registry.is_enabled(name) {
            style("enabled").green()
        } else {
            style("disabled").dim()
        };
        println!("  {:<20} {} by default", name, state);

        if name == CRD_UPGRADE_SAFETY {
            println!("    validations: {}", VALIDATION_NAMES.join(", "));
        }
    }

    let defaults = registry.to_string();
    println!();
    println!(
        "Default --preflight: {}",
        if defaults.is_empty() { "(none)" } else { defaults.as_str() }
    );

    Ok(())
}
