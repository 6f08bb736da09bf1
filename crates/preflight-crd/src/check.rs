//! The `CRDUpgradeSafety` preflight check

use serde::Deserialize;
use tracing::{debug, warn};

use preflight_core::{
    BoxError, CancellationToken, Check, CheckConfig, CheckError, ChangeGraph, ErrorList, Resource,
    ResourceIdentity, Validator,
};

use crate::error::CrdError;
use crate::parser::CrdParser;
use crate::schema::{CRD_KIND, CrdSchema};
use crate::validations::default_validator;

/// Name the check is registered under
pub const CRD_UPGRADE_SAFETY: &str = "CRDUpgradeSafety";

/// Options accepted in the check's `config` mapping
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CrdUpgradeSafetyOptions {
    /// Validations to leave out of the run
    pub skip_validations: Vec<String>,
}

impl CrdUpgradeSafetyOptions {
    /// Check if a validation is skipped
    pub fn skips(&self, validation: &str) -> bool {
        self.skip_validations.iter().any(|v| v == validation)
    }
}

/// Rejects CRD updates that could invalidate objects already stored
///
/// Only updates are inspected: creating or deleting a CRD cannot strand
/// stored objects under a stricter schema.
pub struct CrdUpgradeSafetyCheck {
    enabled: bool,
    options: CrdUpgradeSafetyOptions,
    validator: Validator<CrdSchema>,
}

impl CrdUpgradeSafetyCheck {
    /// Create the check, disabled, with every validation registered
    pub fn new() -> Self {
        Self::with_validator(default_validator())
    }

    /// Create the check around a custom validator
    pub fn with_validator(validator: Validator<CrdSchema>) -> Self {
        Self {
            enabled: false,
            options: CrdUpgradeSafetyOptions::default(),
            validator,
        }
    }

    /// Options currently installed
    pub fn options(&self) -> &CrdUpgradeSafetyOptions {
        &self.options
    }

    fn validate_pair(&self, existing: &Resource, desired: &Resource) -> Result<(), ErrorList<BoxError>> {
        let (old, new) = match (parse_revision(existing), parse_revision(desired)) {
            (Ok(old), Ok(new)) => (old, new),
            (Err(e), _) | (_, Err(e)) => {
                warn!(crd = desired.name(), error = %e, "could not analyze CRD revision");
                return Err(ErrorList::from(vec![BoxError::from(e)]));
            }
        };

        debug!(crd = new.name.as_str(), "validating CRD upgrade");
        self.validator
            .validate_where(&old, &new, |name| !self.options.skips(name))
            .map_err(|failures| failures.into_iter().map(BoxError::from).collect())
    }
}

impl Default for CrdUpgradeSafetyCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for CrdUpgradeSafetyCheck {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn set_config(&mut self, config: CheckConfig) -> Result<(), BoxError> {
        let options: CrdUpgradeSafetyOptions = config.decode()?;

        let known: Vec<&str> = self.validator.names().collect();
        if let Some(unknown) = options
            .skip_validations
            .iter()
            .find(|name| !known.contains(&name.as_str()))
        {
            return Err(format!(
                "unknown validation {:?} in skipValidations (known: {})",
                unknown,
                known.join(", ")
            )
            .into());
        }

        self.options = options;
        Ok(())
    }

    fn run(&self, ctx: &CancellationToken, graph: &ChangeGraph) -> Result<(), CheckError> {
        let mut errors = ErrorList::new();

        for (existing, desired) in graph.updates_of_kind(CRD_KIND) {
            if ctx.is_cancelled() {
                return Err(CheckError::Cancelled);
            }
            if let Err(failures) = self.validate_pair(existing, desired) {
                errors.extend(failures);
            }
        }

        errors.into_result().map_err(CheckError::Failed)
    }
}

impl std::fmt::Debug for CrdUpgradeSafetyCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrdUpgradeSafetyCheck")
            .field("enabled", &self.enabled)
            .field("options", &self.options)
            .field("validator", &self.validator)
            .finish()
    }
}

fn parse_revision(resource: &Resource) -> Result<CrdSchema, CrdError> {
    CrdParser::parse_value(resource.value()).map_err(|e| CrdError::Unanalyzable {
        resource: resource.name().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use preflight_core::{Change, Registry, ValidationFailure};
    use serde_json::json;

    fn crd(min_length: u64, scope: &str) -> String {
        format!(
            r#"---
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  annotations:
    controller-gen.kubebuilder.io/version: v0.13.0
  name: memcacheds.example.com
spec:
  group: example.com
  names:
    kind: Memcached
    listKind: MemcachedList
    plural: memcacheds
    singular: memcached
  scope: {scope}
  versions:
  - name: v1alpha1
    schema:
      openAPIV3Schema:
        properties:
          apiVersion:
            type: string
          kind:
            type: string
          metadata:
            type: object
          spec:
            minLength: {min_length}
            type: string
          status:
            type: object
        type: object
    served: true
    storage: true
    subresources:
      status: {{}}
"#
        )
    }

    fn enabled_check() -> CrdUpgradeSafetyCheck {
        let mut check = CrdUpgradeSafetyCheck::new();
        check.set_enabled(true);
        check
    }

    fn run(check: &CrdUpgradeSafetyCheck, existing: &str, desired: &str) -> Result<(), CheckError> {
        let graph = ChangeGraph::from_manifests(existing, desired).unwrap();
        check.run(&CancellationToken::new(), &graph)
    }

    fn failure_lines(result: Result<(), CheckError>) -> Vec<String> {
        match result {
            Err(CheckError::Failed(errors)) => errors.iter().map(|e| e.to_string()).collect(),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_disabled_by_default() {
        assert!(!CrdUpgradeSafetyCheck::new().enabled());
    }

    #[test]
    fn test_min_length_decreased_passes() {
        let check = enabled_check();
        assert!(run(&check, &crd(10, "Namespaced"), &crd(5, "Namespaced")).is_ok());
    }

    #[test]
    fn test_min_length_increased_fails() {
        let check = enabled_check();
        let lines = failure_lines(run(&check, &crd(5, "Namespaced"), &crd(10, "Namespaced")));

        insta::assert_snapshot!(lines.join("\n"), @r#"CustomResourceDefinition memcacheds.example.com failed upgrade safety validation. "FieldConstraints" validation failed: spec in version v1alpha1: minLength increased from 5 to 10"#);
    }

    #[test]
    fn test_scope_change_fails() {
        let check = enabled_check();
        let result = run(&check, &crd(5, "Namespaced"), &crd(5, "Cluster"));

        match result {
            Err(CheckError::Failed(errors)) => {
                let failure = errors
                    .iter()
                    .find_map(|e| e.downcast_ref::<ValidationFailure>())
                    .unwrap();
                assert_eq!(failure.validation, "NoScopeChange");
                assert_eq!(failure.resource, "memcacheds.example.com");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_creates_and_deletes_are_exempt() {
        let check = enabled_check();
        assert!(run(&check, "", &crd(10, "Cluster")).is_ok());
        assert!(run(&check, &crd(10, "Cluster"), "").is_ok());
    }

    #[test]
    fn test_other_kinds_are_ignored() {
        let check = enabled_check();
        let existing = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\ndata:\n  a: b\n";
        let desired = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n";
        assert!(run(&check, existing, desired).is_ok());
    }

    #[test]
    fn test_failures_across_crds_are_aggregated() {
        let other = |min: u64| crd(min, "Namespaced").replace("memcacheds.example.com", "caches.example.com");
        let existing = format!("{}{}", crd(5, "Namespaced"), other(1));
        let desired = format!("{}{}", crd(10, "Namespaced"), other(2));

        let lines = failure_lines(run(&enabled_check(), &existing, &desired));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("memcacheds.example.com"));
        assert!(lines[1].contains("caches.example.com"));
    }

    #[test]
    fn test_unparseable_revision_fails_closed() {
        let existing = "apiVersion: apiextensions.k8s.io/v1\nkind: CustomResourceDefinition\nmetadata:\n  name: broken.example.com\n";
        let desired = crd(5, "Namespaced").replace("memcacheds.example.com", "broken.example.com");

        let lines = failure_lines(run(&enabled_check(), existing, &desired));
        assert_eq!(
            lines,
            vec![
                "CustomResourceDefinition broken.example.com could not be analyzed: invalid CustomResourceDefinition: missing 'spec' field"
            ]
        );
    }

    #[test]
    fn test_skip_validations() {
        let mut check = enabled_check();
        let config: CheckConfig = [("skipValidations".to_string(), json!(["FieldConstraints"]))]
            .into_iter()
            .collect();
        check.set_config(config).unwrap();

        assert!(check.options().skips("FieldConstraints"));
        assert!(run(&check, &crd(5, "Namespaced"), &crd(10, "Namespaced")).is_ok());
        assert!(run(&check, &crd(5, "Namespaced"), &crd(5, "Cluster")).is_err());
    }

    #[test]
    fn test_config_rejects_unknown_validation() {
        let mut check = CrdUpgradeSafetyCheck::new();
        let config: CheckConfig = [("skipValidations".to_string(), json!(["FieldConstraint"]))]
            .into_iter()
            .collect();

        let err = check.set_config(config).unwrap_err();
        assert!(err.to_string().contains("unknown validation \"FieldConstraint\""));
        assert!(check.options().skip_validations.is_empty());
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        let mut check = CrdUpgradeSafetyCheck::new();
        let config: CheckConfig = [("strict".to_string(), json!(true))].into_iter().collect();
        assert!(check.set_config(config).is_err());
        assert!(check.set_config(CheckConfig::new()).is_ok());
    }

    #[test]
    fn test_cancelled_before_first_pair() {
        let check = enabled_check();
        let graph: ChangeGraph = vec![Change::update(
            Resource::from_yaml(&crd(5, "Namespaced")).unwrap(),
            Resource::from_yaml(&crd(10, "Namespaced")).unwrap(),
        )]
        .into_iter()
        .collect();

        let ctx = CancellationToken::new();
        ctx.cancel();
        assert!(matches!(check.run(&ctx, &graph), Err(CheckError::Cancelled)));
    }

    #[test]
    fn test_through_registry() {
        let mut registry = Registry::new();
        registry
            .register(CRD_UPGRADE_SAFETY, CrdUpgradeSafetyCheck::new())
            .unwrap();

        let graph =
            ChangeGraph::from_manifests(&crd(5, "Namespaced"), &crd(10, "Namespaced")).unwrap();
        let ctx = CancellationToken::new();

        // Disabled until named in the enable-list
        assert!(registry.run(&ctx, &graph).is_ok());

        registry.set(CRD_UPGRADE_SAFETY).unwrap();
        let err = registry.run(&ctx, &graph).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @r#"
        1 preflight check(s) failed:
        running preflight check "CRDUpgradeSafety": CustomResourceDefinition memcacheds.example.com failed upgrade safety validation. "FieldConstraints" validation failed: spec in version v1alpha1: minLength increased from 5 to 10
        "#);

        let failures = err.failures().unwrap();
        let failure = failures.iter().next().unwrap();
        assert_eq!(failure.find::<ValidationFailure>().count(), 1);
    }
}
