//! CRD manifest parser
//!
//! Turns a CustomResourceDefinition manifest (YAML text or an already decoded
//! object from the change graph) into a structured [`CrdSchema`].

use serde_json::Value;

use crate::error::{CrdError, Result};
use crate::schema::{
    AdditionalProperties, CRD_KIND, CrdSchema, CrdScope, CrdVersionSchema, PropertyType,
    SchemaProperty,
};

/// Parser for CRD manifests
pub struct CrdParser;

impl CrdParser {
    /// Parse a CRD YAML manifest into a structured schema
    pub fn parse(yaml: &str) -> Result<CrdSchema> {
        let value: Value = serde_yaml::from_str(yaml)?;

        Self::parse_value(&value)
    }

    /// Parse from a decoded object
    pub fn parse_value(value: &Value) -> Result<CrdSchema> {
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| CrdError::Invalid("missing 'kind' field".to_string()))?;

        if kind != CRD_KIND {
            return Err(CrdError::Invalid(format!(
                "expected {}, got {}",
                CRD_KIND, kind
            )));
        }

        let name = value
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| CrdError::Invalid("missing 'metadata.name' field".to_string()))?
            .to_string();

        let spec = value
            .get("spec")
            .ok_or_else(|| CrdError::Invalid("missing 'spec' field".to_string()))?;

        let group = spec
            .get("group")
            .and_then(Value::as_str)
            .ok_or_else(|| CrdError::Invalid("missing 'spec.group' field".to_string()))?
            .to_string();

        let scope = match spec.get("scope").and_then(Value::as_str) {
            Some("Cluster") => CrdScope::Cluster,
            Some("Namespaced") | None => CrdScope::Namespaced,
            Some(other) => {
                return Err(CrdError::Invalid(format!(
                    "unknown scope '{}' (expected Namespaced or Cluster)",
                    other
                )));
            }
        };

        let versions = Self::parse_versions(spec.get("versions"))?;

        let stored_versions = value
            .get("status")
            .and_then(|s| s.get("storedVersions"))
            .map(string_list)
            .unwrap_or_default();

        Ok(CrdSchema {
            name,
            group,
            scope,
            versions,
            stored_versions,
        })
    }

    /// Parse CRD versions array
    fn parse_versions(versions_value: Option<&Value>) -> Result<Vec<CrdVersionSchema>> {
        let versions = versions_value
            .and_then(Value::as_array)
            .ok_or_else(|| CrdError::Invalid("missing 'spec.versions' array".to_string()))?;

        versions.iter().map(Self::parse_version).collect()
    }

    /// Parse a single CRD version
    fn parse_version(version: &Value) -> Result<CrdVersionSchema> {
        let name = version
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| CrdError::Invalid("version missing 'name' field".to_string()))?
            .to_string();

        let served = version
            .get("served")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let storage = version
            .get("storage")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let schema = version
            .get("schema")
            .and_then(|s| s.get("openAPIV3Schema"))
            .map(Self::parse_schema_property);

        Ok(CrdVersionSchema {
            name,
            served,
            storage,
            schema,
        })
    }

    /// Parse a single schema node (recursive)
    pub fn parse_schema_property(prop: &Value) -> SchemaProperty {
        let type_ = prop
            .get("type")
            .and_then(Value::as_str)
            .map(PropertyType::parse);

        let pattern = prop
            .get("pattern")
            .and_then(Value::as_str)
            .map(String::from);

        let enum_values = prop.get("enum").and_then(Value::as_array).cloned();

        let properties = prop
            .get("properties")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.clone(), Self::parse_schema_property(v)))
                    .collect()
            })
            .unwrap_or_default();

        let items = prop
            .get("items")
            .map(|v| Box::new(Self::parse_schema_property(v)));

        let additional_properties = prop.get("additionalProperties").map(|v| match v {
            Value::Bool(true) => AdditionalProperties::Allowed,
            Value::Bool(false) => AdditionalProperties::Denied,
            schema => AdditionalProperties::Schema(Box::new(Self::parse_schema_property(schema))),
        });

        SchemaProperty {
            type_,
            pattern,
            enum_values,
            minimum: prop.get("minimum").and_then(Value::as_f64),
            exclusive_minimum: flag(prop, "exclusiveMinimum"),
            maximum: prop.get("maximum").and_then(Value::as_f64),
            exclusive_maximum: flag(prop, "exclusiveMaximum"),
            min_length: prop.get("minLength").and_then(Value::as_u64),
            max_length: prop.get("maxLength").and_then(Value::as_u64),
            min_items: prop.get("minItems").and_then(Value::as_u64),
            max_items: prop.get("maxItems").and_then(Value::as_u64),
            min_properties: prop.get("minProperties").and_then(Value::as_u64),
            max_properties: prop.get("maxProperties").and_then(Value::as_u64),
            nullable: flag(prop, "nullable"),
            properties,
            required: prop.get("required").map(string_list).unwrap_or_default(),
            items,
            additional_properties,
            x_preserve_unknown: flag(prop, "x-kubernetes-preserve-unknown-fields"),
            x_int_or_string: flag(prop, "x-kubernetes-int-or-string"),
        }
    }
}

fn flag(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: certificates.cert-manager.io
spec:
  group: cert-manager.io
  scope: Namespaced
  names:
    kind: Certificate
    plural: certificates
  versions:
    - name: v1
      served: true
      storage: true
      schema:
        openAPIV3Schema:
          type: object
          required:
            - spec
          properties:
            spec:
              type: object
              required:
                - secretName
              properties:
                secretName:
                  type: string
                  minLength: 1
                  maxLength: 253
                  pattern: "^[a-z0-9-]+$"
                duration:
                  type: integer
                  minimum: 0
                  exclusiveMinimum: true
                  maximum: 8760
                usages:
                  type: array
                  maxItems: 10
                  items:
                    type: string
                    enum: [signing, digital signature]
                labels:
                  type: object
                  additionalProperties:
                    type: string
                    maxLength: 63
                port:
                  x-kubernetes-int-or-string: true
    - name: v1beta1
      served: false
      storage: false
status:
  storedVersions:
    - v1beta1
    - v1
"#;

    #[test]
    fn test_parse_sample_crd() {
        let crd = CrdParser::parse(SAMPLE_CRD).unwrap();

        assert_eq!(crd.name, "certificates.cert-manager.io");
        assert_eq!(crd.group, "cert-manager.io");
        assert_eq!(crd.scope, CrdScope::Namespaced);
        assert_eq!(crd.versions.len(), 2);
        assert_eq!(crd.stored_versions, vec!["v1beta1", "v1"]);

        let v1 = crd.version("v1").unwrap();
        assert!(v1.served && v1.storage);
        let beta = crd.version("v1beta1").unwrap();
        assert!(!beta.served);
        assert!(beta.schema.is_none());
    }

    #[test]
    fn test_parse_constraints() {
        let crd = CrdParser::parse(SAMPLE_CRD).unwrap();
        let root = crd.version("v1").unwrap().schema.as_ref().unwrap();
        assert!(root.is_required("spec"));

        let spec = root.get_nested("spec").unwrap();
        assert!(spec.is_required("secretName"));

        let secret = spec.get_nested("secretName").unwrap();
        assert_eq!(secret.type_, Some(PropertyType::String));
        assert_eq!(secret.min_length, Some(1));
        assert_eq!(secret.max_length, Some(253));
        assert_eq!(secret.pattern.as_deref(), Some("^[a-z0-9-]+$"));

        let duration = spec.get_nested("duration").unwrap();
        assert_eq!(duration.minimum, Some(0.0));
        assert!(duration.exclusive_minimum);
        assert_eq!(duration.maximum, Some(8760.0));
        assert!(!duration.exclusive_maximum);

        let usages = spec.get_nested("usages").unwrap();
        assert_eq!(usages.max_items, Some(10));
        let item = usages.items.as_ref().unwrap();
        assert_eq!(item.enum_values.as_ref().unwrap().len(), 2);

        let labels = spec.get_nested("labels").unwrap();
        assert_eq!(labels.additional_schema().unwrap().max_length, Some(63));

        let port = spec.get_nested("port").unwrap();
        assert!(port.x_int_or_string);
        assert_eq!(port.type_, None);
    }

    #[test]
    fn test_parse_cluster_scope() {
        let yaml = r#"
kind: CustomResourceDefinition
metadata:
  name: widgets.example.com
spec:
  group: example.com
  scope: Cluster
  versions:
    - name: v1
      storage: true
"#;
        let crd = CrdParser::parse(yaml).unwrap();
        assert_eq!(crd.scope, CrdScope::Cluster);
        assert!(crd.versions[0].served);
        assert!(crd.stored_versions.is_empty());
    }

    #[test]
    fn test_parse_rejects_other_kinds() {
        let err = CrdParser::parse("kind: ConfigMap\nmetadata:\n  name: x\n").unwrap_err();
        assert!(err.to_string().contains("expected CustomResourceDefinition"));
    }

    #[test]
    fn test_parse_malformed_yaml() {
        let err = CrdParser::parse("kind: [unclosed").unwrap_err();
        assert!(matches!(err, CrdError::Serialization(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_scope() {
        let yaml = r#"
kind: CustomResourceDefinition
metadata:
  name: widgets.example.com
spec:
  group: example.com
  scope: Galaxy
  versions: []
"#;
        assert!(CrdParser::parse(yaml).is_err());
    }

    #[test]
    fn test_parse_requires_versions() {
        let yaml = r#"
kind: CustomResourceDefinition
metadata:
  name: widgets.example.com
spec:
  group: example.com
"#;
        let err = CrdParser::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("spec.versions"));
    }
}
