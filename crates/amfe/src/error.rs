//! Error types for amfe.
//!
//! This module defines all error types used throughout the amfe crate,
//! providing detailed context for debugging and user-facing messages that
//! the CLI can print inline.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::document::NodeKind;

/// A single failed form rule, attached to the field it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted name of the offending field (e.g. `header.servicio`).
    pub field: String,
    /// Message suitable for showing next to the field.
    pub message: String,
}

impl FieldError {
    /// Create a new field error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The main error type for amfe operations.
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

    // === Backend Errors ===
    /// The HTTP request could not be completed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {detail}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The `detail` field of the response body, or the raw body.
        detail: String,
    },

    /// The session token was rejected; stored credentials were cleared.
    #[error("session expired or invalid, log in again")]
    Unauthorized,

    /// The current user lacks the role required for the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The requested record does not exist.
    #[error("{what} {id} not found")]
    NotFound {
        /// Kind of record.
        what: &'static str,
        /// Identifier that was looked up.
        id: i64,
    },

    /// No session is stored; the user must log in first.
    #[error("not logged in")]
    NoSession,

    // === Document Errors ===
    /// Form validation failed.
    #[error("validation failed: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// Removing the node would leave its parent list empty.
    #[error("{}", .kind.minimum_warning())]
    MinimumChildren {
        /// Level of the list that would have become empty.
        kind: NodeKind,
    },

    /// A scoping identifier did not match any node.
    #[error("{kind} '{id}' not found")]
    NodeNotFound {
        /// Level that was searched.
        kind: NodeKind,
        /// Identifier that was looked up.
        id: String,
    },

    /// A score outside the 1-5 range.
    #[error("score must be between 1 and 5, got {0}")]
    InvalidScore(i64),

    /// A color that is not `#RRGGBB`.
    #[error("invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    /// The operation needs a saved matrix.
    #[error("matrix must be saved before {0}")]
    Unsaved(&'static str),

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
}

/// A specialized Result type for amfe operations.
pub type Result<T> = std::result::Result<T, Error>;

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an API status error.
    #[must_use]
    pub fn api(status: u16, detail: impl Into<String>) -> Self {
        Self::Api {
            status,
            detail: detail.into(),
        }
    }

    /// Create a forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Create a node-not-found error.
    #[must_use]
    pub fn node_not_found(kind: NodeKind, id: impl Into<String>) -> Self {
        Self::NodeNotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create a validation error holding a single field error.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// Check if this error means the user has to log in again.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::NoSession)
    }

    /// Field errors carried by a validation failure, empty otherwise.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation(errors) => errors,
            _ => &[],
        }
    }
}
