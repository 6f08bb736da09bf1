//! CRD schema representation for upgrade safety analysis
//!
//! A simplified, structural view of a CustomResourceDefinition: only the
//! parts that decide whether objects stored under the old definition stay
//! valid under the new one.

use preflight_core::ResourceIdentity;
use std::collections::BTreeMap;

/// Kind of every CRD manifest
pub const CRD_KIND: &str = "CustomResourceDefinition";

/// A parsed CustomResourceDefinition ready for comparison
#[derive(Debug, Clone, PartialEq)]
pub struct CrdSchema {
    /// Full CRD name (e.g., "certificates.cert-manager.io")
    pub name: String,
    /// API group (e.g., "cert-manager.io")
    pub group: String,
    /// Resource scope
    pub scope: CrdScope,
    /// API versions with their schemas
    pub versions: Vec<CrdVersionSchema>,
    /// Versions objects have ever been persisted in (`status.storedVersions`)
    pub stored_versions: Vec<String>,
}

impl CrdSchema {
    /// Get the storage version
    pub fn storage_version(&self) -> Option<&CrdVersionSchema> {
        self.versions.iter().find(|v| v.storage)
    }

    /// Get a version by name
    pub fn version(&self, name: &str) -> Option<&CrdVersionSchema> {
        self.versions.iter().find(|v| v.name == name)
    }

    /// Check if a specific version exists
    pub fn has_version(&self, name: &str) -> bool {
        self.version(name).is_some()
    }

    /// Versions that may hold persisted objects
    ///
    /// Falls back to the storage version when the status was not captured.
    pub fn persisted_versions(&self) -> Vec<&str> {
        if !self.stored_versions.is_empty() {
            return self.stored_versions.iter().map(String::as_str).collect();
        }
        self.storage_version()
            .map(|v| vec![v.name.as_str()])
            .unwrap_or_default()
    }
}

impl ResourceIdentity for CrdSchema {
    fn kind(&self) -> &str {
        CRD_KIND
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// CRD scope - whether resources are namespaced or cluster-wide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CrdScope {
    #[default]
    Namespaced,
    Cluster,
}

impl std::fmt::Display for CrdScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Namespaced => write!(f, "Namespaced"),
            Self::Cluster => write!(f, "Cluster"),
        }
    }
}

/// A single API version of a CRD
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CrdVersionSchema {
    /// Version name (e.g., "v1", "v1beta1", "v1alpha1")
    pub name: String,
    /// Whether this version is served by the API server
    pub served: bool,
    /// Whether this is the storage version
    pub storage: bool,
    /// Root of the OpenAPI v3 schema (`schema.openAPIV3Schema`)
    pub schema: Option<SchemaProperty>,
}

/// Schema for a single node of the OpenAPI tree
///
/// Only structural and validation keywords are kept.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaProperty {
    /// Declared type, if any
    pub type_: Option<PropertyType>,
    /// Regex pattern for strings
    pub pattern: Option<String>,
    /// Allowed values (enum)
    pub enum_values: Option<Vec<serde_json::Value>>,
    /// Minimum value for numbers
    pub minimum: Option<f64>,
    /// Whether `minimum` itself is excluded
    pub exclusive_minimum: bool,
    /// Maximum value for numbers
    pub maximum: Option<f64>,
    /// Whether `maximum` itself is excluded
    pub exclusive_maximum: bool,
    /// Minimum string length
    pub min_length: Option<u64>,
    /// Maximum string length
    pub max_length: Option<u64>,
    /// Minimum array items
    pub min_items: Option<u64>,
    /// Maximum array items
    pub max_items: Option<u64>,
    /// Minimum object properties
    pub min_properties: Option<u64>,
    /// Maximum object properties
    pub max_properties: Option<u64>,
    /// Whether null is allowed
    pub nullable: bool,
    /// Nested object properties
    pub properties: BTreeMap<String, SchemaProperty>,
    /// Required nested properties
    pub required: Vec<String>,
    /// Array item schema
    pub items: Option<Box<SchemaProperty>>,
    /// Additional properties for objects
    pub additional_properties: Option<AdditionalProperties>,
    /// Preserve unknown fields
    pub x_preserve_unknown: bool,
    /// Integer or string (for ports, etc.)
    pub x_int_or_string: bool,
}

impl SchemaProperty {
    /// Create a simple string property
    pub fn string() -> Self {
        Self {
            type_: Some(PropertyType::String),
            ..Default::default()
        }
    }

    /// Create a simple integer property
    pub fn integer() -> Self {
        Self {
            type_: Some(PropertyType::Integer),
            ..Default::default()
        }
    }

    /// Create an object property with nested properties
    pub fn object(properties: BTreeMap<String, SchemaProperty>) -> Self {
        Self {
            type_: Some(PropertyType::Object),
            properties,
            ..Default::default()
        }
    }

    /// Create an array property with item schema
    pub fn array(items: SchemaProperty) -> Self {
        Self {
            type_: Some(PropertyType::Array),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    /// Get a nested property by path (dot-separated)
    pub fn get_nested(&self, path: &str) -> Option<&SchemaProperty> {
        let mut current = self;
        for part in path.split('.') {
            current = current.properties.get(part)?;
        }
        Some(current)
    }

    /// Check if a nested property is required
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Schema that additional properties must match, if any
    pub fn additional_schema(&self) -> Option<&SchemaProperty> {
        match &self.additional_properties {
            Some(AdditionalProperties::Schema(schema)) => Some(schema),
            _ => None,
        }
    }
}

/// Property type in OpenAPI schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    /// Unknown type name, kept verbatim
    Unknown(String),
}

impl PropertyType {
    /// Parse from string representation
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Check if every value valid for `self` is also valid for `other`
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            // Every integer is a number
            (Self::Integer, Self::Number) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Array => write!(f, "array"),
            Self::Object => write!(f, "object"),
            Self::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// Additional properties configuration for objects
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AdditionalProperties {
    /// Additional properties are allowed (any type)
    #[default]
    Allowed,
    /// Additional properties are not allowed
    Denied,
    /// Additional properties must match a schema
    Schema(Box<SchemaProperty>),
}
