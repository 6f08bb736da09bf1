//! Preflight CRD - upgrade safety for CustomResourceDefinitions
//!
//! Provides the `CRDUpgradeSafety` preflight check. For every CRD that is
//! about to be updated, both revisions are parsed into a structural
//! [`CrdSchema`] and compared by a set of validations:
//!
//! - `NoScopeChange`: the resource scope stays the same
//! - `NoStoredVersionRemoved`: versions objects are persisted in survive
//! - `NoExistingFieldRemoved`: declared fields stay declared
//! - `FieldConstraints`: no constraint on a retained field narrows
//!
//! # Example
//!
//! ```
//! use preflight_core::Registry;
//! use preflight_crd::{CRD_UPGRADE_SAFETY, CrdUpgradeSafetyCheck};
//!
//! let mut registry = Registry::new();
//! registry.register(CRD_UPGRADE_SAFETY, CrdUpgradeSafetyCheck::new()).unwrap();
//! registry.set(CRD_UPGRADE_SAFETY).unwrap();
//! assert_eq!(registry.to_string(), "CRDUpgradeSafety");
//! ```

pub mod check;
pub mod constraints;
pub mod error;
pub mod parser;
pub mod schema;
pub mod validations;

pub use check::{CRD_UPGRADE_SAFETY, CrdUpgradeSafetyCheck, CrdUpgradeSafetyOptions};
pub use error::{CrdError, Result};
pub use parser::CrdParser;
pub use schema::{
    AdditionalProperties, CRD_KIND, CrdSchema, CrdScope, CrdVersionSchema, PropertyType,
    SchemaProperty,
};
pub use validations::{UpgradeViolation, VALIDATION_NAMES, default_validator};
