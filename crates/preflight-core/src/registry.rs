//! Preflight check registry
//!
//! The registry owns every known [`Check`] by name and drives the
//! configuration lifecycle:
//!
//! ```text
//! Unconfigured ──set()──► EnableListApplied ──┐
//!      │                                      ├──run()──► Executed (repeatable)
//!      └──set_config()──► ConfigApplied ──────┘
//! ```
//!
//! `set` and `set_config` are independent and may be called in either order.
//! Both validate their whole input before touching any check, so a rejected
//! enable-list or configuration document leaves no half-applied state behind.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

use crate::aggregate::ErrorList;
use crate::check::{Check, CheckError};
use crate::config::PreflightConfig;
use crate::context::CancellationToken;
use crate::error::{BoxError, PreflightError, Result};
use crate::graph::ChangeGraph;
use crate::suggest::unknown_check_help;

/// Failures reported by one check during a run
#[derive(Debug)]
pub struct CheckFailure {
    /// Name the check is registered under
    pub check: String,
    /// Every problem the check found
    pub errors: ErrorList<BoxError>,
}

impl CheckFailure {
    /// Find a cause of a specific type, e.g. a validation failure
    pub fn find<E: std::error::Error + 'static>(&self) -> impl Iterator<Item = &E> {
        self.errors.iter().filter_map(|e| e.downcast_ref::<E>())
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "running preflight check {:?}: {}", self.check, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for CheckFailure {}

/// Registry of all known preflight checks
///
/// Checks run in registration order. A registry with no checks is inert: it
/// accepts any enable-list and every run succeeds.
#[derive(Default)]
pub struct Registry {
    known: IndexMap<String, Box<dyn Check>>,
    requested: IndexSet<String>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check under a unique name
    pub fn register(&mut self, name: impl Into<String>, check: impl Check + 'static) -> Result<()> {
        let name = name.into();
        if self.known.contains_key(&name) {
            return Err(PreflightError::DuplicateCheck { name });
        }

        debug!(check = %name, enabled = check.enabled(), "registered preflight check");
        self.known.insert(name, Box::new(check));
        Ok(())
    }

    /// Check if no checks are registered
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Number of registered checks
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Registered check names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.known.keys().map(String::as_str)
    }

    /// Look up a check by name
    pub fn get(&self, name: &str) -> Option<&dyn Check> {
        self.known.get(name).map(|check| check.as_ref())
    }

    /// Whether the named check is registered and enabled
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(|check| check.enabled())
    }

    /// Names of enabled checks in registration order
    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.known
            .iter()
            .filter(|(_, check)| check.enabled())
            .map(|(name, _)| name.as_str())
    }

    /// Names given by the last accepted enable-list, in the order given
    pub fn requested(&self) -> impl Iterator<Item = &str> {
        self.requested.iter().map(String::as_str)
    }

    /// Apply a comma-separated enable-list
    ///
    /// Named checks are enabled and every other registered check is disabled.
    /// Whitespace around each name is trimmed, so `"a, b"` names `a` and `b`.
    /// On an empty registry this is a no-op that accepts any input.
    pub fn set(&mut self, enable_list: &str) -> Result<()> {
        if self.known.is_empty() {
            debug!("no preflight checks registered, ignoring enable-list");
            return Ok(());
        }

        let mut requested = IndexSet::new();
        for token in enable_list.split(',') {
            let name = token.trim();
            if name.is_empty() {
                return Err(PreflightError::InvalidFormat {
                    value: enable_list.to_string(),
                });
            }
            if !self.known.contains_key(name) {
                return Err(PreflightError::UnknownCheck {
                    name: name.to_string(),
                    help: self.help_for(name),
                });
            }
            requested.insert(name.to_string());
        }

        for (name, check) in self.known.iter_mut() {
            check.set_enabled(requested.contains(name));
        }
        debug!(checks = ?requested, "applied preflight enable-list");
        self.requested = requested;

        Ok(())
    }

    /// Distribute per-check configuration from the configuration document
    ///
    /// Unknown and duplicate rule names are rejected before any check is
    /// configured. A check refusing its configuration stops the operation;
    /// rules before it have been applied.
    pub fn set_config(&mut self, config: &PreflightConfig) -> Result<()> {
        let mut seen = HashSet::new();
        for rule in &config.rules {
            if !self.known.contains_key(&rule.name) {
                return Err(PreflightError::UnrecognizedCheck {
                    name: rule.name.clone(),
                    help: self.help_for(&rule.name),
                });
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(PreflightError::DuplicateConfig {
                    name: rule.name.clone(),
                });
            }
        }

        for rule in &config.rules {
            // presence checked above
            let Some(check) = self.known.get_mut(&rule.name) else {
                continue;
            };
            check
                .set_config(rule.config.clone())
                .map_err(|source| PreflightError::InvalidCheckConfig {
                    name: rule.name.clone(),
                    source,
                })?;
            debug!(check = %rule.name, keys = rule.config.len(), "configured preflight check");
        }

        Ok(())
    }

    /// Run every enabled check against the planned changes
    ///
    /// All failures are collected before returning. Cancellation aborts the
    /// run immediately and is reported as [`PreflightError::Cancelled`];
    /// failures collected up to that point are logged, not returned.
    pub fn run(&self, ctx: &CancellationToken, graph: &ChangeGraph) -> Result<()> {
        let mut failures = ErrorList::new();

        for (name, check) in &self.known {
            if !check.enabled() {
                debug!(check = %name, "skipping disabled preflight check");
                continue;
            }
            if ctx.is_cancelled() {
                return Err(cancelled(&failures));
            }

            info!(check = %name, "running preflight check");
            match check.run(ctx, graph) {
                Ok(()) => debug!(check = %name, "preflight check passed"),
                Err(CheckError::Cancelled) => {
                    warn!(check = %name, "preflight check cancelled");
                    return Err(cancelled(&failures));
                }
                Err(CheckError::Failed(errors)) => {
                    warn!(check = %name, problems = errors.len(), "preflight check failed");
                    failures.push(CheckFailure {
                        check: name.clone(),
                        errors,
                    });
                }
            }
        }

        failures.into_result().map_err(PreflightError::ChecksFailed)
    }

    fn help_for(&self, name: &str) -> Option<String> {
        let names: Vec<&str> = self.names().collect();
        unknown_check_help(name, &names)
    }
}

fn cancelled(failures: &ErrorList<CheckFailure>) -> PreflightError {
    if !failures.is_empty() {
        warn!(
            discarded = failures.len(),
            "preflight run cancelled, discarding failures already reported:\n{}",
            failures
        );
    }
    PreflightError::Cancelled
}

impl fmt::Display for Registry {
    /// Comma-separated names of enabled checks, the same shape `set` accepts
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let enabled: Vec<&str> = self.enabled().collect();
        write!(f, "{}", enabled.join(","))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.known.iter().map(|(name, check)| (name, check.enabled())))
            .finish()
    }
}
