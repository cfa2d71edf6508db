// src/error.rs

use crate::validate::ValidationIssue;
use thiserror::Error;

/// Core error types for Curator
#[derive(Error, Debug)]
pub enum Error {
    /// Process-level initialization failures (config, storage, workers).
    /// Fatal; surfaced to the operator, never to registry callers.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// The registry has not been loaded from storage yet
    #[error("Registry not loaded; load it before performing operations")]
    RegistryNotLoaded,

    /// The submitted package failed validation
    #[error("Validation failed with {} issue(s)", .0.len())]
    ValidationFailed(Vec<ValidationIssue>),

    /// The submitted version does not sort after the latest published one
    #[error("Version {candidate} is not newer than published version {current}")]
    BadVersion { candidate: String, current: String },

    /// The caller may not mutate the named package
    #[error("User '{identity}' is not authorized to modify package '{name}'")]
    NotAuthorized { identity: String, name: String },

    /// No entry exists for the given package name
    #[error("No package named '{0}' in the registry")]
    UnknownPackage(String),

    /// Semantic version parse errors
    #[error("Version parse error: {0}")]
    Version(#[from] semver::Error),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    /// The individual problems behind a `ValidationFailed`, if any.
    pub fn validation_issues(&self) -> &[ValidationIssue] {
        match self {
            Error::ValidationFailed(issues) => issues,
            _ => &[],
        }
    }
}

/// Result type alias using Curator's Error type
pub type Result<T> = std::result::Result<T, Error>;
