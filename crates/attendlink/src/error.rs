//! Error types for attendlink.
//!
//! This module defines all error types used throughout the attendlink crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// The main error type for attendlink operations.
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

    // === Domain Errors ===
    /// An argument could not be used (empty student id, week 0, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Guardian contact data or student data failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No student record exists for the given identifier.
    #[error("student not found: {id}")]
    StudentNotFound {
        /// The identifier that was looked up.
        id: String,
    },

    /// The outbound message channel could not be opened.
    #[error("message channel unavailable: {0}")]
    ChannelUnavailable(String),

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

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for attendlink operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a new channel unavailable error.
    #[must_use]
    pub fn channel_unavailable(message: impl Into<String>) -> Self {
        Self::ChannelUnavailable(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a student-not-found error.
    #[must_use]
    pub fn student_not_found(id: impl Into<String>) -> Self {
        Self::StudentNotFound { id: id.into() }
    }

    /// Check if this error indicates a missing student record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::StudentNotFound { .. })
    }

    /// Check if this error is a data validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Reasons a notification attempt is rejected before anything is sent.
///
/// Every kind maps to a short message an operator can act on.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// The guardian phone is absent or contains no digits.
    #[error("Missing parent phone number")]
    MissingPhone,

    /// The digit count does not match the national format.
    #[error("Invalid phone number: must be exactly {expected} digits, got {actual}")]
    InvalidLength {
        /// Digits found after stripping formatting.
        actual: usize,
        /// Digits the national format requires.
        expected: usize,
    },

    /// The number does not carry the mobile prefix.
    #[error("Invalid phone number: must start with {expected}")]
    InvalidPrefix {
        /// The required prefix.
        expected: String,
    },

    /// Every digit is identical (`01111111111` and friends).
    #[error("Invalid phone number format")]
    SuspiciousPattern,

    /// The student record has no usable display name.
    #[error("Student data incomplete - missing name")]
    MissingName,
}

impl ValidationError {
    /// Short machine-friendly name of the failure kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingPhone => "missing_phone",
            Self::InvalidLength { .. } => "invalid_length",
            Self::InvalidPrefix { .. } => "invalid_prefix",
            Self::SuspiciousPattern => "suspicious_pattern",
            Self::MissingName => "missing_name",
        }
    }
}
