//! Error types for citizen-registry.
//!
//! This module defines all error types used throughout the crate. Domain
//! failures (validation, conflicts, missing records, malformed keys) carry
//! enough context to build a client-facing message; infrastructure failures
//! keep their source for logging.

use std::path::PathBuf;
use thiserror::Error;

use crate::record::REQUIRED_FIELDS;

/// The main error type for citizen-registry operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Domain Errors ===
    /// One or more required fields were missing or empty after trimming.
    #[error("missing required fields: {}", .missing.join(", "))]
    Validation {
        /// Names of the fields that were missing, in schema order.
        missing: Vec<&'static str>,
    },

    /// A record with the same national ID already exists.
    #[error("citizen already exists with national ID {national_id}")]
    Conflict {
        /// The colliding national ID.
        national_id: String,
    },

    /// No record matched the requested key.
    #[error("citizen not found")]
    NotFound,

    /// A record id did not have the storage identifier format.
    #[error("invalid record id: {key}")]
    MalformedKey {
        /// The offending key, as received.
        key: String,
    },

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

    // === I/O Errors ===
    /// File system or socket operation failed.
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

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for citizen-registry operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a validation error for the given missing fields.
    #[must_use]
    pub fn validation(missing: Vec<&'static str>) -> Self {
        Self::Validation { missing }
    }

    /// Create a conflict error for a duplicate national ID.
    #[must_use]
    pub fn conflict(national_id: impl Into<String>) -> Self {
        Self::Conflict {
            national_id: national_id.into(),
        }
    }

    /// Create a malformed key error.
    #[must_use]
    pub fn malformed_key(key: impl Into<String>) -> Self {
        Self::MalformedKey { key: key.into() }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error means no record matched.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Check if this error is a duplicate-key rejection.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// HTTP status code this error maps to at the API boundary.
    ///
    /// Anything that is not a client-side rejection is a server error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::MalformedKey { .. } => 400,
            Self::NotFound => 404,
            Self::Conflict { .. } => 409,
            _ => 500,
        }
    }

    /// Message safe to return to API clients.
    ///
    /// Server-side failures are reported generically; their details go to
    /// the log instead.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Validation { .. } => {
                format!("Missing required fields: {}", REQUIRED_FIELDS.join(", "))
            }
            Self::Conflict { .. } => "Citizen already exists with this NDI/NIC".to_string(),
            Self::NotFound => "Citizen not found".to_string(),
            Self::MalformedKey { .. } => "Invalid record id".to_string(),
            _ => "Server error".to_string(),
        }
    }
}
