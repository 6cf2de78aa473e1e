//! Domain error types
//!
//! `ContractError` is the crate-wide error. Request validation failures travel
//! inside it as [`ValidationErrors`], never as the first violation encountered.
//! Store failures have their own enum so callers can react to a version
//! conflict without string matching.

use super::violation::ValidationErrors;
use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum ContractError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// One or more validation violations
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Persistence collaborator errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Communication delivery errors
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Export generation errors
    #[error("Export error: {0}")]
    Export(String),

    /// Audit log errors
    #[error("Audit error: {0}")]
    Audit(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Returns the validation violations carried by this error, if any
    pub fn violations(&self) -> Option<&ValidationErrors> {
        match self {
            ContractError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Errors reported by a [`PatientStore`](crate::adapters::PatientStore)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record with the given identifier
    #[error("Patient not found: {0}")]
    NotFound(String),

    /// The caller's version token is stale
    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    /// A record with the same identity already exists
    #[error("Duplicate patient: {0}")]
    Duplicate(String),

    /// The backing store cannot serve requests
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for ContractError {
    fn from(err: std::io::Error) -> Self {
        ContractError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ContractError {
    fn from(err: serde_json::Error) -> Self {
        ContractError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ContractError {
    fn from(err: toml::de::Error) -> Self {
        ContractError::Configuration(format!("TOML parse error: {err}"))
    }
}
