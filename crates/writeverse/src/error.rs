//! Error types for writeverse.
//!
//! This module defines the error types used throughout the writeverse crate.
//! Local precondition failures inside a secure input session are not errors in
//! this sense; see [`crate::session::Rejection`].

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for writeverse operations.
#[derive(Error, Debug)]
pub enum Error {
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

    // === Transport Errors ===
    /// The HTTP request could not be completed.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status or a non-JSON body.
    #[error("server returned HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Body excerpt or reason phrase.
        message: String,
    },

    /// The server processed the request and reported failure.
    #[error("server rejected request: {message}")]
    Server {
        /// Human-readable message from the server.
        message: String,
    },

    /// No CSRF token could be obtained for a state-changing request.
    #[error("no CSRF token available (cookie '{cookie}' not set)")]
    MissingCsrfToken {
        /// Name of the cookie that should carry the token.
        cookie: String,
    },

    /// A request was refused before being sent.
    #[error("{0}")]
    Validation(String),

    // === Storage Errors ===
    /// Failed to open or create the outbox database.
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

    // === Terminal Errors ===
    /// The terminal input surface failed.
    #[error("terminal error: {0}")]
    Terminal(String),

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

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for writeverse operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new server-reported failure.
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Create a new terminal error.
    #[must_use]
    pub fn terminal(message: impl Into<String>) -> Self {
        Self::Terminal(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error came from the network path (connect or HTTP
    /// status) and may go away on retry. A server that answered and refused
    /// the request is not a transport failure.
    #[must_use]
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Http { .. } | Self::MissingCsrfToken { .. }
        )
    }
}
