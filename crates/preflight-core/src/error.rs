//! Error types for preflight-core

use miette::Diagnostic;
use thiserror::Error;

use crate::aggregate::ErrorList;
use crate::registry::CheckFailure;

/// Boxed error used at plug-in seams (check and validation bodies)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for preflight-core operations
pub type Result<T> = std::result::Result<T, PreflightError>;

/// Errors surfaced by the preflight registry
///
/// Configuration-time errors (`InvalidFormat`, `UnknownCheck`,
/// `UnrecognizedCheck`, `DuplicateConfig`, `InvalidCheckConfig`) leave the
/// registry untouched or stop at the failing check. `ChecksFailed` is the
/// aggregated veto from a run, `Cancelled` means the run did not finish.
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum PreflightError {
    /// Enable-list contains an empty check name
    #[error("invalid preflight checks {value:?}: check names must be non-empty and separated by single commas")]
    #[diagnostic(
        code(preflight::invalid_format),
        help("pass a comma-separated list, e.g. --preflight=CRDUpgradeSafety")
    )]
    InvalidFormat { value: String },

    /// Enable-list names a check that is not registered
    #[error("unknown preflight check {name:?}")]
    #[diagnostic(code(preflight::unknown_check))]
    UnknownCheck {
        name: String,
        #[help]
        help: Option<String>,
    },

    /// Configuration document has a rule for a check that is not registered
    #[error("unrecognized preflight check {name:?} in configuration")]
    #[diagnostic(code(preflight::unrecognized_check))]
    UnrecognizedCheck {
        name: String,
        #[help]
        help: Option<String>,
    },

    /// Configuration document has more than one rule for the same check
    #[error("duplicate configuration for preflight check {name:?}")]
    #[diagnostic(
        code(preflight::duplicate_config),
        help("merge the rules for this check into a single entry")
    )]
    DuplicateConfig { name: String },

    /// A check rejected the configuration forwarded to it
    #[error("invalid configuration for preflight check {name:?}: {source}")]
    #[diagnostic(code(preflight::invalid_check_config))]
    InvalidCheckConfig {
        name: String,
        #[source]
        source: BoxError,
    },

    /// The same check name was registered twice
    #[error("preflight check {name:?} is already registered")]
    #[diagnostic(code(preflight::duplicate_check))]
    DuplicateCheck { name: String },

    /// Configuration document could not be decoded
    #[error("failed to parse preflight configuration: {0}")]
    #[diagnostic(code(preflight::config_parse))]
    ConfigParse(#[from] serde_yaml::Error),

    /// Manifest could not be turned into a change graph
    #[error("invalid manifest: {0}")]
    #[diagnostic(code(preflight::invalid_manifest))]
    InvalidManifest(String),

    /// One or more enabled checks vetoed the change set
    #[error("{count} preflight check(s) failed:\n{0}", count = .0.len())]
    #[diagnostic(
        code(preflight::checks_failed),
        help("the pending changes were not applied")
    )]
    ChecksFailed(ErrorList<CheckFailure>),

    /// Run was cancelled before every enabled check completed
    #[error("preflight checks cancelled before completion")]
    #[diagnostic(code(preflight::cancelled))]
    Cancelled,
}

impl PreflightError {
    /// Failures reported by individual checks, if this is a veto
    pub fn failures(&self) -> Option<&ErrorList<CheckFailure>> {
        match self {
            Self::ChecksFailed(failures) => Some(failures),
            _ => None,
        }
    }

    /// Check if the run was cancelled rather than vetoed
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if this error was raised while configuring the registry
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat { .. }
                | Self::UnknownCheck { .. }
                | Self::UnrecognizedCheck { .. }
                | Self::DuplicateConfig { .. }
                | Self::InvalidCheckConfig { .. }
                | Self::DuplicateCheck { .. }
                | Self::ConfigParse(_)
        )
    }
}
