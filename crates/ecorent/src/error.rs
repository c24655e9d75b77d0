//! Error types for ecorent.
//!
//! This module defines all error types used throughout the ecorent crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for ecorent operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Contract Errors ===
    /// The submitted contract form is incomplete or malformed.
    #[error("invalid contract form: {0}")]
    Validation(#[from] ValidationError),

    // === Sync Errors ===
    /// No remote endpoint is configured.
    #[error("sync endpoint is not configured")]
    SyncNotConfigured,

    /// The outbound push did not reach the endpoint.
    #[error("sync transport failed: {0}")]
    Transport(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A required field of a contract form that was missing or unparsable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty.
    #[error("missing required field '{0}'")]
    Missing(&'static str),

    /// A field could not be parsed.
    #[error("field '{field}' has an invalid value '{value}'")]
    Invalid {
        /// Name of the field.
        field: &'static str,
        /// The raw value that was rejected.
        value: String,
    },

    /// The return schedule is before the pickup schedule.
    #[error("return {end} is not after pickup {start}")]
    ReturnBeforePickup {
        /// Pickup instant.
        start: String,
        /// Return instant.
        end: String,
    },
}

/// A specialized Result type for ecorent operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Check if this error means sync has no endpoint to push to.
    #[must_use]
    pub fn is_sync_not_configured(&self) -> bool {
        matches!(self, Self::SyncNotConfigured)
    }

    /// Check if this error comes from form validation.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl ValidationError {
    /// Create an invalid-value error.
    #[must_use]
    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            value: value.into(),
        }
    }
}
