//! Change graph consumed by preflight checks
//!
//! The graph is built outside this crate (by the host's diff engine) and is
//! only read here. Each [`Change`] pairs the revision currently in the cluster
//! with the revision about to be applied:
//!
//! | existing | desired | [`ChangeOp`] |
//! |----------|---------|--------------|
//! | none     | some    | `Create`     |
//! | some     | some    | `Update`     |
//! | some     | none    | `Delete`     |

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::error::{PreflightError, Result};

/// Something that can be named in an error report
pub trait ResourceIdentity {
    /// Resource kind (e.g., "CustomResourceDefinition")
    fn kind(&self) -> &str;
    /// Resource name (e.g., "certificates.cert-manager.io")
    fn name(&self) -> &str;
}

/// Key identifying a resource across revisions
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// One revision of a resource, already decoded
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    value: Value,
    key: ResourceKey,
    api_version: String,
}

impl Resource {
    /// Wrap a decoded object
    ///
    /// Fails if the object has no `kind` or no `metadata.name`.
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| PreflightError::InvalidManifest("missing 'kind' field".to_string()))?
            .to_string();

        let metadata = value.get("metadata");
        let name = metadata
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                PreflightError::InvalidManifest(format!("{} is missing 'metadata.name'", kind))
            })?
            .to_string();

        let namespace = metadata
            .and_then(|m| m.get("namespace"))
            .and_then(Value::as_str)
            .map(String::from);

        let api_version = value
            .get("apiVersion")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            value,
            key: ResourceKey {
                kind,
                namespace,
                name,
            },
            api_version,
        })
    }

    /// Parse a single YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)
            .map_err(|e| PreflightError::InvalidManifest(format!("failed to parse YAML: {}", e)))?;
        Self::from_value(value)
    }

    /// The full decoded object
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Identity key
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// `apiVersion` as written (e.g., "apiextensions.k8s.io/v1")
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// API group, empty for the core group
    pub fn group(&self) -> &str {
        self.api_version
            .split_once('/')
            .map(|(group, _)| group)
            .unwrap_or_default()
    }

    /// Namespace, if the object carries one
    pub fn namespace(&self) -> Option<&str> {
        self.key.namespace.as_deref()
    }
}

impl ResourceIdentity for Resource {
    fn kind(&self) -> &str {
        &self.key.kind
    }

    fn name(&self) -> &str {
        &self.key.name
    }
}

/// Classification of a planned change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeOp {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A planned change to a single resource
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    existing: Option<Resource>,
    desired: Option<Resource>,
}

impl Change {
    /// Resource that does not exist yet
    pub fn create(desired: Resource) -> Self {
        Self {
            existing: None,
            desired: Some(desired),
        }
    }

    /// Resource that exists and will be replaced
    pub fn update(existing: Resource, desired: Resource) -> Self {
        Self {
            existing: Some(existing),
            desired: Some(desired),
        }
    }

    /// Resource that exists and will be removed
    pub fn delete(existing: Resource) -> Self {
        Self {
            existing: Some(existing),
            desired: None,
        }
    }

    /// Revision currently in the cluster
    pub fn existing(&self) -> Option<&Resource> {
        self.existing.as_ref()
    }

    /// Revision about to be applied
    pub fn desired(&self) -> Option<&Resource> {
        self.desired.as_ref()
    }

    /// Classify the change
    pub fn op(&self) -> ChangeOp {
        match (&self.existing, &self.desired) {
            (None, _) => ChangeOp::Create,
            (Some(_), Some(_)) => ChangeOp::Update,
            (Some(_), None) => ChangeOp::Delete,
        }
    }

    /// Kind of the resource, taken from whichever revision is present
    pub fn kind(&self) -> &str {
        self.desired
            .as_ref()
            .or(self.existing.as_ref())
            .map(|r| r.kind())
            .unwrap_or_default()
    }

    /// Both revisions, if this change is an update
    pub fn as_update(&self) -> Option<(&Resource, &Resource)> {
        self.existing.as_ref().zip(self.desired.as_ref())
    }
}

/// The full set of planned changes for one deployment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeGraph {
    changes: Vec<Change>,
}

impl ChangeGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    /// All changes in plan order
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Number of changes
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Check if nothing is planned
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Updates (both revisions present) of the given kind, in plan order
    pub fn updates_of_kind<'a>(
        &'a self,
        kind: &'a str,
    ) -> impl Iterator<Item = (&'a Resource, &'a Resource)> + 'a {
        self.changes
            .iter()
            .filter(move |c| c.kind() == kind)
            .filter_map(Change::as_update)
    }

    /// Pair two multi-document manifests into a graph
    ///
    /// Resources are matched by kind, namespace and name. The result lists
    /// creates and updates in `desired` order, then deletions in `existing`
    /// order. Empty documents are skipped. A resource listed twice in the
    /// same manifest is an error.
    pub fn from_manifests(existing: &str, desired: &str) -> Result<Self> {
        let mut remaining: IndexMap<ResourceKey, Resource> = IndexMap::new();
        for resource in parse_manifest_resources(existing)? {
            if remaining.contains_key(resource.key()) {
                return Err(duplicate("existing", resource.key()));
            }
            remaining.insert(resource.key().clone(), resource);
        }

        let mut seen = HashSet::new();
        let mut graph = Self::new();
        for resource in parse_manifest_resources(desired)? {
            if !seen.insert(resource.key().clone()) {
                return Err(duplicate("desired", resource.key()));
            }
            let change = match remaining.shift_remove(resource.key()) {
                Some(old) => Change::update(old, resource),
                None => Change::create(resource),
            };
            graph.push(change);
        }

        for (_, old) in remaining {
            graph.push(Change::delete(old));
        }

        tracing::debug!(changes = graph.len(), "built change graph from manifests");
        Ok(graph)
    }
}

impl FromIterator<Change> for ChangeGraph {
    fn from_iter<I: IntoIterator<Item = Change>>(iter: I) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

fn duplicate(manifest: &str, key: &ResourceKey) -> PreflightError {
    PreflightError::InvalidManifest(format!(
        "{} appears more than once in the {} manifest",
        key, manifest
    ))
}

/// Parse every non-empty document of a YAML stream into resources
fn parse_manifest_resources(manifest: &str) -> Result<Vec<Resource>> {
    let mut resources = Vec::new();

    for document in serde_yaml::Deserializer::from_str(manifest) {
        let value = Value::deserialize(document)
            .map_err(|e| PreflightError::InvalidManifest(format!("failed to parse YAML: {}", e)))?;

        match value {
            Value::Null => continue,
            Value::Object(_) => resources.push(Resource::from_value(value)?),
            other => {
                return Err(PreflightError::InvalidManifest(format!(
                    "expected a mapping, found {}",
                    other
                )));
            }
        }
    }

    Ok(resources)
}
