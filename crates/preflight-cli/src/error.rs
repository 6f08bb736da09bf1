//! CLI error types with exit code handling
//!
//! Every failure a command can hit is folded into [`CliError`], which knows
//! the process exit code it maps to.

use miette::Diagnostic;
use preflight_core::PreflightError;
use std::path::Path;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Bad enable-list, configuration document or manifest
    #[error("{message}")]
    #[diagnostic(code(preflight::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Enabled checks vetoed the planned changes
    #[error("{count} preflight check(s) failed")]
    #[diagnostic(
        code(preflight::cli::checks_failed),
        help("fix the reported problems or disable the check with --preflight")
    )]
    ChecksFailed { count: usize },

    /// The run was cancelled before all checks completed
    #[error("preflight checks cancelled before completion")]
    #[diagnostic(code(preflight::cli::cancelled))]
    Cancelled,

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(preflight::cli::io))]
    Io { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::ChecksFailed { .. } => exit_codes::CHECKS_FAILED,
            CliError::Cancelled => exit_codes::ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }

    /// Create an IO error for a file that could not be read
    pub fn io(path: &Path, err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{}: {}", path.display(), err),
        }
    }
}

impl From<PreflightError> for CliError {
    fn from(err: PreflightError) -> Self {
        match err {
            PreflightError::ChecksFailed(failures) => CliError::ChecksFailed {
                count: failures.len(),
            },
            PreflightError::Cancelled => CliError::Cancelled,
            other => CliError::Usage {
                message: other.to_string(),
                help: other.help().map(|h| h.to_string()),
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let usage = CliError::Usage {
            message: "bad".to_string(),
            help: None,
        };
        assert_eq!(usage.exit_code(), exit_codes::USAGE_ERROR);
        assert_eq!(
            CliError::ChecksFailed { count: 1 }.exit_code(),
            exit_codes::CHECKS_FAILED
        );
        assert_eq!(CliError::Cancelled.exit_code(), exit_codes::ERROR);
        assert_eq!(
            CliError::io(
                Path::new("missing.yaml"),
                std::io::Error::from(std::io::ErrorKind::NotFound)
            )
            .exit_code(),
            exit_codes::IO_ERROR
        );
    }

    #[test]
    fn test_unknown_check_keeps_help() {
        let err = CliError::from(PreflightError::UnknownCheck {
            name: "CRDUpgradeSafty".to_string(),
            help: Some("did you mean `CRDUpgradeSafety`?".to_string()),
        });

        match err {
            CliError::Usage { message, help } => {
                assert_eq!(message, "unknown preflight check \"CRDUpgradeSafty\"");
                assert_eq!(help.as_deref(), Some("did you mean `CRDUpgradeSafety`?"));
            }
            other => panic!("expected usage error, got {:?}", other),
        }
    }

    #[test]
    fn test_cancellation_is_not_a_veto() {
        let err = CliError::from(PreflightError::Cancelled);
        assert_ne!(err.exit_code(), exit_codes::CHECKS_FAILED);
    }
}
