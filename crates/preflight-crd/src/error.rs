//! Error types for preflight-crd

use thiserror::Error;

/// Result type for preflight-crd operations
pub type Result<T> = std::result::Result<T, CrdError>;

/// Errors raised while reading CustomResourceDefinitions
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CrdError {
    /// Manifest is not a well-formed CRD
    #[error("invalid CustomResourceDefinition: {0}")]
    Invalid(String),

    /// YAML could not be decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A revision taken from the change graph could not be analyzed
    #[error("CustomResourceDefinition {resource} could not be analyzed: {message}")]
    Unanalyzable { resource: String, message: String },
}

impl From<serde_yaml::Error> for CrdError {
    fn from(e: serde_yaml::Error) -> Self {
        CrdError::Serialization(e.to_string())
    }
}
