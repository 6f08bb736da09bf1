//! CLI commands

pub mod check;
pub mod list;

use preflight_core::Registry;
use preflight_crd::{CRD_UPGRADE_SAFETY, CrdUpgradeSafetyCheck};

use crate::error::Result;

/// Registry with every check this binary ships, in run order
pub fn default_registry() -> Result<Registry> {
    let mut registry = Registry::new();
    registry.register(CRD_UPGRADE_SAFETY, CrdUpgradeSafetyCheck::new())?;
    Ok(registry)
}
