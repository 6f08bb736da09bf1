//! Preflight check abstraction
//!
//! A [`Check`] is a named unit of pre-apply validation that can be switched on
//! or off and configured independently. The registry owns checks by name, so
//! a check itself carries no name.

use thiserror::Error;

use crate::aggregate::ErrorList;
use crate::config::CheckConfig;
use crate::context::CancellationToken;
use crate::error::BoxError;
use crate::graph::ChangeGraph;

/// Outcome of a failed check run
#[derive(Debug, Error)]
pub enum CheckError {
    /// The execution context was cancelled before the check finished
    #[error("check cancelled")]
    Cancelled,

    /// The check found one or more problems with the planned changes
    #[error("{0}")]
    Failed(ErrorList<BoxError>),
}

impl CheckError {
    /// A failure with a single cause
    pub fn failed(error: impl Into<BoxError>) -> Self {
        Self::Failed(ErrorList::from(vec![error.into()]))
    }
}

impl<E: Into<BoxError>> From<ErrorList<E>> for CheckError {
    fn from(errors: ErrorList<E>) -> Self {
        Self::Failed(errors.into_iter().map(Into::into).collect())
    }
}

/// A pre-apply check
///
/// `run` must be read-only with respect to the change graph and must return
/// [`CheckError::Cancelled`] promptly once `ctx` is cancelled.
pub trait Check: Send + Sync {
    /// Whether the registry should run this check
    fn enabled(&self) -> bool;

    /// Switch the check on or off
    fn set_enabled(&mut self, enabled: bool);

    /// Install configuration from the configuration document
    fn set_config(&mut self, config: CheckConfig) -> Result<(), BoxError>;

    /// Run the check against the planned changes
    fn run(&self, ctx: &CancellationToken, graph: &ChangeGraph) -> Result<(), CheckError>;
}

type RunFn = dyn Fn(&CancellationToken, &ChangeGraph, Option<&CheckConfig>) -> Result<(), CheckError>
    + Send
    + Sync;

type ConfigHook = dyn Fn(&CheckConfig) -> Result<(), BoxError> + Send + Sync;

/// Adapter turning a closure into a [`Check`]
///
/// The closure receives the configuration installed through
/// [`set_config`](Check::set_config), or `None` if none was set. An optional
/// hook can validate configuration before it is stored.
pub struct CheckFn {
    enabled: bool,
    config: Option<CheckConfig>,
    run: Box<RunFn>,
    config_hook: Option<Box<ConfigHook>>,
}

impl CheckFn {
    /// Create a check from a run function and its default enabled state
    pub fn new<F>(run: F, enabled: bool) -> Self
    where
        F: Fn(&CancellationToken, &ChangeGraph, Option<&CheckConfig>) -> Result<(), CheckError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            enabled,
            config: None,
            run: Box::new(run),
            config_hook: None,
        }
    }

    /// Validate configuration with `hook` before storing it
    pub fn with_config_hook<G>(mut self, hook: G) -> Self
    where
        G: Fn(&CheckConfig) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.config_hook = Some(Box::new(hook));
        self
    }

    /// Configuration installed so far
    pub fn config(&self) -> Option<&CheckConfig> {
        self.config.as_ref()
    }
}

impl Check for CheckFn {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn set_config(&mut self, config: CheckConfig) -> Result<(), BoxError> {
        if let Some(hook) = &self.config_hook {
            hook(&config)?;
        }
        self.config = Some(config);
        Ok(())
    }

    fn run(&self, ctx: &CancellationToken, graph: &ChangeGraph) -> Result<(), CheckError> {
        if ctx.is_cancelled() {
            return Err(CheckError::Cancelled);
        }
        (self.run)(ctx, graph, self.config.as_ref())
    }
}

impl std::fmt::Debug for CheckFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckFn")
            .field("enabled", &self.enabled)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_enabled_toggle() {
        let mut check = CheckFn::new(|_, _, _| Ok(()), false);
        assert!(!check.enabled());

        check.set_enabled(true);
        assert!(check.enabled());
    }

    #[test]
    fn test_run_receives_installed_config() {
        let mut check = CheckFn::new(
            |_, _, config| match config.and_then(|c| c.get("foo")) {
                Some(value) if value == "bar" => Ok(()),
                _ => Err(CheckError::failed("foo should equal 'bar'")),
            },
            true,
        );

        let ctx = CancellationToken::new();
        let graph = ChangeGraph::new();
        assert!(check.run(&ctx, &graph).is_err());

        let mut config = CheckConfig::new();
        config.insert("foo", json!("bar"));
        check.set_config(config).unwrap();
        assert!(check.run(&ctx, &graph).is_ok());
    }

    #[test]
    fn test_config_hook_rejects_before_storing() {
        let mut check = CheckFn::new(|_, _, _| Ok(()), true).with_config_hook(|config| {
            if config.contains_key("forbidden") {
                return Err("forbidden key".into());
            }
            Ok(())
        });

        let mut config = CheckConfig::new();
        config.insert("forbidden", json!(true));
        assert!(check.set_config(config).is_err());
        assert!(check.config().is_none());

        check.set_config(CheckConfig::new()).unwrap();
        assert!(check.config().is_some());
    }

    #[test]
    fn test_cancelled_context_skips_body() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let check = CheckFn::new(
            move |_, _, _| {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            },
            true,
        );

        let ctx = CancellationToken::new();
        ctx.cancel();

        assert!(matches!(
            check.run(&ctx, &ChangeGraph::new()),
            Err(CheckError::Cancelled)
        ));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_error_list_converts_into_failure() {
        let errors: ErrorList<String> = vec!["a".to_string(), "b".to_string()].into();
        match CheckError::from(errors) {
            CheckError::Failed(list) => assert_eq!(list.len(), 2),
            CheckError::Cancelled => panic!("expected failure"),
        }
    }
}
