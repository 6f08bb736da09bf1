//! Validation composition
//!
//! A [`Validation`] is a named, pure predicate over an old and a new revision
//! of a resource. A [`Validator`] runs every registered validation against the
//! same pair, never stopping at the first failure, and reports all failures
//! as one [`ValidationErrors`] list, each entry attributed to the resource and
//! to the validation that raised it.

use thiserror::Error;

use crate::aggregate::ErrorList;
use crate::error::BoxError;
use crate::graph::ResourceIdentity;

/// A single comparison rule between two revisions of a resource
///
/// Implementations must be pure: no I/O and no shared mutable state, so that
/// a validator can run all of them unconditionally.
pub trait Validation<T>: Send + Sync {
    /// Human-readable name, used to attribute failures
    fn name(&self) -> &str;

    /// Return an error if going from `old` to `new` is unsafe
    fn validate(&self, old: &T, new: &T) -> Result<(), BoxError>;
}

/// Adapter turning a closure into a named [`Validation`]
pub struct ValidationFn<F> {
    name: String,
    func: F,
}

impl<F> ValidationFn<F> {
    /// Wrap `func` under `name`
    pub fn new<T>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&T, &T) -> Result<(), BoxError> + Send + Sync,
    {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<T, F> Validation<T> for ValidationFn<F>
where
    F: Fn(&T, &T) -> Result<(), BoxError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, old: &T, new: &T) -> Result<(), BoxError> {
        (self.func)(old, new)
    }
}

impl<F> std::fmt::Debug for ValidationFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationFn")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A failed validation, attributed to a resource and a validation name
#[derive(Debug, Error)]
#[error("{kind} {resource} failed upgrade safety validation. {validation:?} validation failed: {source}")]
pub struct ValidationFailure {
    /// Kind of the validated resource
    pub kind: String,
    /// Name of the validated resource (taken from the new revision)
    pub resource: String,
    /// Name of the validation that failed
    pub validation: String,
    /// Why it failed
    #[source]
    pub source: BoxError,
}

/// All failures from one validator run
pub type ValidationErrors = ErrorList<ValidationFailure>;

/// An ordered set of validations run together
pub struct Validator<T> {
    validations: Vec<Box<dyn Validation<T>>>,
}

impl<T> Validator<T> {
    /// Create a validator with no validations
    pub fn new() -> Self {
        Self {
            validations: Vec::new(),
        }
    }

    /// Add a validation (builder style)
    pub fn with(mut self, validation: impl Validation<T> + 'static) -> Self {
        self.push(validation);
        self
    }

    /// Add a validation
    pub fn push(&mut self, validation: impl Validation<T> + 'static) {
        self.validations.push(Box::new(validation));
    }

    /// Number of validations
    pub fn len(&self) -> usize {
        self.validations.len()
    }

    /// Check if no validations are registered
    pub fn is_empty(&self) -> bool {
        self.validations.is_empty()
    }

    /// Validation names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validations.iter().map(|v| v.name())
    }
}

impl<T: ResourceIdentity> Validator<T> {
    /// Run every validation against `old` and `new`
    pub fn validate(&self, old: &T, new: &T) -> Result<(), ValidationErrors> {
        self.validate_where(old, new, |_| true)
    }

    /// Run the validations whose name satisfies `include`
    pub fn validate_where(
        &self,
        old: &T,
        new: &T,
        include: impl Fn(&str) -> bool,
    ) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for validation in self.validations.iter().filter(|v| include(v.name())) {
            if let Err(source) = validation.validate(old, new) {
                tracing::debug!(
                    resource = new.name(),
                    validation = validation.name(),
                    "validation failed"
                );
                errors.push(ValidationFailure {
                    kind: new.kind().to_string(),
                    resource: new.name().to_string(),
                    validation: validation.name().to_string(),
                    source,
                });
            }
        }

        errors.into_result()
    }
}

impl<T> Default for Validator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Widget {
        name: String,
        size: u32,
    }

    impl ResourceIdentity for Widget {
        fn kind(&self) -> &str {
            "Widget"
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn pass() -> ValidationFn<impl Fn(&Widget, &Widget) -> Result<(), BoxError> + Send + Sync> {
        ValidationFn::new("pass", |_: &Widget, _: &Widget| Ok(()))
    }

    fn fail(
        name: &str,
    ) -> ValidationFn<impl Fn(&Widget, &Widget) -> Result<(), BoxError> + Send + Sync> {
        ValidationFn::new(name, |_: &Widget, _: &Widget| Err("boom".into()))
    }

    #[test]
    fn test_no_validations_no_error() {
        let validator: Validator<Widget> = Validator::new();
        assert!(validator.validate(&Widget::default(), &Widget::default()).is_ok());
    }

    #[test]
    fn test_passing_validation_no_error() {
        let validator = Validator::new().with(pass());
        assert!(validator.validate(&Widget::default(), &Widget::default()).is_ok());
    }

    #[test]
    fn test_failing_validation_error() {
        let validator = Validator::new().with(fail("fail"));
        let errors = validator
            .validate(&Widget::default(), &Widget::default())
            .unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_passing_and_failing_validation_error() {
        let validator = Validator::new().with(pass()).with(fail("fail"));
        let errors = validator
            .validate(&Widget::default(), &Widget::default())
            .unwrap_err();

        let names: Vec<_> = errors.iter().map(|e| e.validation.as_str()).collect();
        assert_eq!(names, vec!["fail"]);
    }

    #[test]
    fn test_runs_every_validation_in_order() {
        let validator = Validator::new()
            .with(fail("first"))
            .with(pass())
            .with(fail("second"))
            .with(fail("third"));

        let errors = validator
            .validate(&Widget::default(), &Widget::default())
            .unwrap_err();

        let names: Vec<_> = errors.iter().map(|e| e.validation.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_failure_is_attributed_to_new_revision() {
        let old = Widget {
            name: "old-name".to_string(),
            size: 1,
        };
        let new = Widget {
            name: "new-name".to_string(),
            size: 2,
        };
        let validator = Validator::new().with(ValidationFn::new(
            "NoShrink",
            |old: &Widget, new: &Widget| {
                if new.size < old.size {
                    Err(format!("size decreased from {} to {}", old.size, new.size).into())
                } else {
                    Ok(())
                }
            },
        ));

        assert!(validator.validate(&old, &new).is_ok());

        let errors = validator.validate(&new, &old).unwrap_err();
        let failure = errors.iter().next().unwrap();
        assert_eq!(failure.resource, "old-name");
        assert_eq!(
            failure.to_string(),
            "Widget old-name failed upgrade safety validation. \"NoShrink\" validation failed: size decreased from 2 to 1"
        );
    }

    #[test]
    fn test_validate_where_filters_by_name() {
        let validator = Validator::new().with(fail("skipped")).with(fail("kept"));
        let errors = validator
            .validate_where(&Widget::default(), &Widget::default(), |name| {
                name != "skipped"
            })
            .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors.iter().next().unwrap().validation, "kept");
    }
}
