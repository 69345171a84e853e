//! Error types for the kinetic_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for kinetic_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Lookup of an unknown id (catalog variant, scheduled task, ...)
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Rejected user input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Key-value storage could not be read or written
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// The AI gateway could not produce a response
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn persistence(key: &str, err: impl std::fmt::Display) -> Self {
        Error::PersistenceUnavailable(format!("{}: {}", key, err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
