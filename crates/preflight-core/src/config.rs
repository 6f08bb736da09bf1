//! Preflight configuration document
//!
//! Hosts hand the registry an already-parsed [`PreflightConfig`]. Each rule
//! names a check and carries an opaque [`CheckConfig`] that only that check
//! interprets:
//!
//! ```yaml
//! apiVersion: preflight.dev/v1alpha1
//! kind: Config
//! preflightRules:
//! - name: CRDUpgradeSafety
//!   config:
//!     skipValidations: [NoExistingFieldRemoved]
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Document kind that carries preflight rules
pub const CONFIG_KIND: &str = "Config";

/// Opaque per-check configuration (a string-keyed map of decoded values)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckConfig(Map<String, Value>);

impl CheckConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a raw value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Check if a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Set a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Check if no keys are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over entries
    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.0.iter()
    }

    /// Decode the whole mapping into a typed options struct
    ///
    /// Absent keys are left to the target type's `#[serde(default)]`.
    pub fn decode<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }
}

impl From<Map<String, Value>> for CheckConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for CheckConfig {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A single rule of the configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreflightRule {
    /// Name of the check the rule applies to
    pub name: String,
    /// Configuration forwarded to the check
    #[serde(default)]
    pub config: CheckConfig,
}

impl PreflightRule {
    /// Create a rule
    pub fn new(name: impl Into<String>, config: CheckConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

/// Parsed configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreflightConfig {
    /// Per-check rules, in document order
    #[serde(rename = "preflightRules", default)]
    pub rules: Vec<PreflightRule>,
}

impl PreflightConfig {
    /// Create a configuration from rules
    pub fn new(rules: Vec<PreflightRule>) -> Self {
        Self { rules }
    }

    /// Add a rule (builder style)
    pub fn with_rule(mut self, name: impl Into<String>, config: CheckConfig) -> Self {
        self.rules.push(PreflightRule::new(name, config));
        self
    }

    /// Parse a (possibly multi-document) YAML stream
    ///
    /// Rules are collected from every document of kind `Config`, in order.
    /// Other documents and empty documents are ignored. Duplicates are kept
    /// so the registry can reject them.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut rules = Vec::new();

        for document in serde_yaml::Deserializer::from_str(yaml) {
            let value = serde_yaml::Value::deserialize(document)?;
            if value.is_null() {
                continue;
            }

            let kind = value.get("kind").and_then(serde_yaml::Value::as_str);
            if kind != Some(CONFIG_KIND) {
                continue;
            }

            let config: PreflightConfig = serde_yaml::from_value(value)?;
            rules.extend(config.rules);
        }

        Ok(Self { rules })
    }

    /// Check if the document has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_yaml_single_document() {
        let yaml = r#"
apiVersion: preflight.dev/v1alpha1
kind: Config
preflightRules:
- name: someCheck
  config:
    foo: bar
"#;
        let config = PreflightConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].name, "someCheck");
        assert_eq!(config.rules[0].config.get("foo"), Some(&json!("bar")));
    }

    #[test]
    fn test_from_yaml_collects_across_documents() {
        let yaml = r#"
---
kind: Config
preflightRules:
- name: a
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: ignored
---
kind: Config
preflightRules:
- name: a
  config:
    x: 1
"#;
        let config = PreflightConfig::from_yaml(yaml).unwrap();
        let names: Vec<_> = config.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "a"]);
        assert!(config.rules[0].config.is_empty());
        assert_eq!(config.rules[1].config.get("x"), Some(&json!(1)));
    }

    #[test]
    fn test_from_yaml_without_rules() {
        let config = PreflightConfig::from_yaml("kind: Config\n").unwrap();
        assert!(config.is_empty());
        assert!(PreflightConfig::from_yaml("").unwrap().is_empty());
    }

    #[test]
    fn test_from_yaml_rejects_malformed() {
        let yaml = "kind: Config\npreflightRules: notalist\n";
        assert!(PreflightConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_decode_typed_options() {
        #[derive(Deserialize, Default)]
        #[serde(rename_all = "camelCase", default)]
        struct Options {
            skip_validations: Vec<String>,
        }

        let mut config = CheckConfig::new();
        config.insert("skipValidations", json!(["NoScopeChange"]));
        let options: Options = config.decode().unwrap();
        assert_eq!(options.skip_validations, vec!["NoScopeChange"]);

        let empty: Options = CheckConfig::new().decode().unwrap();
        assert!(empty.skip_validations.is_empty());
    }
}
