//! CRD upgrade validations
//!
//! Each validation compares the CRD currently installed with the one about to
//! be applied and rejects changes that could invalidate objects already
//! stored under the old definition.

use thiserror::Error;

use preflight_core::{BoxError, ValidationFn, Validator};

use crate::constraints;
use crate::schema::{CrdSchema, CrdScope, SchemaProperty};

pub const NO_SCOPE_CHANGE: &str = "NoScopeChange";
pub const NO_STORED_VERSION_REMOVED: &str = "NoStoredVersionRemoved";
pub const NO_EXISTING_FIELD_REMOVED: &str = "NoExistingFieldRemoved";
pub const FIELD_CONSTRAINTS: &str = "FieldConstraints";

/// Names of the validations in [`default_validator`], in run order
pub const VALIDATION_NAMES: &[&str] = &[
    NO_SCOPE_CHANGE,
    NO_STORED_VERSION_REMOVED,
    NO_EXISTING_FIELD_REMOVED,
    FIELD_CONSTRAINTS,
];

/// Why a CRD upgrade is unsafe
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UpgradeViolation {
    #[error("scope changed from {old} to {new}")]
    ScopeChanged { old: CrdScope, new: CrdScope },

    #[error("stored versions removed: {}", .versions.join(", "))]
    StoredVersionRemoved { versions: Vec<String> },

    #[error("existing fields removed: {}", .fields.join(", "))]
    FieldRemoved { fields: Vec<String> },

    #[error("{}", .changes.join("; "))]
    ConstraintsNarrowed { changes: Vec<String> },
}

/// Validator with every CRD upgrade validation registered
pub fn default_validator() -> Validator<CrdSchema> {
    Validator::new()
        .with(ValidationFn::new::<CrdSchema>(NO_SCOPE_CHANGE, no_scope_change))
        .with(ValidationFn::new::<CrdSchema>(
            NO_STORED_VERSION_REMOVED,
            no_stored_version_removed,
        ))
        .with(ValidationFn::new::<CrdSchema>(
            NO_EXISTING_FIELD_REMOVED,
            no_existing_field_removed,
        ))
        .with(ValidationFn::new::<CrdSchema>(FIELD_CONSTRAINTS, field_constraints))
}

/// Objects cannot move between namespaced and cluster scope
pub fn no_scope_change(old: &CrdSchema, new: &CrdSchema) -> Result<(), BoxError> {
    if old.scope != new.scope {
        return Err(UpgradeViolation::ScopeChanged {
            old: old.scope,
            new: new.scope,
        }
        .into());
    }
    Ok(())
}

/// Every version objects may be persisted in must survive
pub fn no_stored_version_removed(old: &CrdSchema, new: &CrdSchema) -> Result<(), BoxError> {
    let versions: Vec<String> = old
        .persisted_versions()
        .into_iter()
        .filter(|v| !new.has_version(v))
        .map(String::from)
        .collect();

    if versions.is_empty() {
        Ok(())
    } else {
        Err(UpgradeViolation::StoredVersionRemoved { versions }.into())
    }
}

/// Fields declared in a retained version must stay declared
pub fn no_existing_field_removed(old: &CrdSchema, new: &CrdSchema) -> Result<(), BoxError> {
    let mut fields = Vec::new();

    for (version, old_root, new_root) in shared_schemas(old, new) {
        let mut removed = Vec::new();
        collect_removed(old_root, new_root, "", &mut removed);
        fields.extend(
            removed
                .into_iter()
                .map(|path| format!("{} in version {}", path, version)),
        );
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(UpgradeViolation::FieldRemoved { fields }.into())
    }
}

/// No constraint on a retained field may narrow
pub fn field_constraints(old: &CrdSchema, new: &CrdSchema) -> Result<(), BoxError> {
    let mut changes = Vec::new();

    for (version, old_root, new_root) in shared_schemas(old, new) {
        walk_constraints(old_root, new_root, "", version, &mut changes);
    }

    if changes.is_empty() {
        Ok(())
    } else {
        Err(UpgradeViolation::ConstraintsNarrowed { changes }.into())
    }
}

/// Versions present in both revisions with a schema on both sides
fn shared_schemas<'a>(
    old: &'a CrdSchema,
    new: &'a CrdSchema,
) -> impl Iterator<Item = (&'a str, &'a SchemaProperty, &'a SchemaProperty)> + 'a {
    old.versions.iter().filter_map(move |old_version| {
        let new_version = new.version(&old_version.name)?;
        Some((
            old_version.name.as_str(),
            old_version.schema.as_ref()?,
            new_version.schema.as_ref()?,
        ))
    })
}

fn walk_constraints(
    old: &SchemaProperty,
    new: &SchemaProperty,
    path: &str,
    version: &str,
    changes: &mut Vec<String>,
) {
    for change in constraints::narrowed(old, new) {
        changes.push(format!(
            "{} in version {}: {}",
            display_path(path),
            version,
            change
        ));
    }

    for (name, old_child) in &old.properties {
        if let Some(new_child) = new.properties.get(name) {
            walk_constraints(old_child, new_child, &child_path(path, name), version, changes);
        }
    }

    if let (Some(old_items), Some(new_items)) = (&old.items, &new.items) {
        walk_constraints(old_items, new_items, &format!("{}[*]", path), version, changes);
    }

    if let (Some(old_extra), Some(new_extra)) = (old.additional_schema(), new.additional_schema()) {
        walk_constraints(old_extra, new_extra, &child_path(path, "*"), version, changes);
    }
}

fn collect_removed(old: &SchemaProperty, new: &SchemaProperty, path: &str, removed: &mut Vec<String>) {
    for (name, old_child) in &old.properties {
        let field = child_path(path, name);
        match new.properties.get(name) {
            Some(new_child) => collect_removed(old_child, new_child, &field, removed),
            // Unknown fields survive pruning, so the stored data is kept
            None if new.x_preserve_unknown => {}
            None => removed.push(field),
        }
    }

    if let (Some(old_items), Some(new_items)) = (&old.items, &new.items) {
        collect_removed(old_items, new_items, &format!("{}[*]", path), removed);
    }

    if let (Some(old_extra), Some(new_extra)) = (old.additional_schema(), new.additional_schema()) {
        collect_removed(old_extra, new_extra, &child_path(path, "*"), removed);
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "(root)" } else { path }
}
