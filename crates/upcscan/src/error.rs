//! Error types for upcscan.
//!
//! This module defines all error types used throughout the upcscan crate.
//! Lookup errors are shown to the user verbatim, so their display text is
//! kept short and free of internal detail.

use std::path::PathBuf;
use thiserror::Error;

use crate::scanner::DecoderError;

/// The main error type for upcscan operations.
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

    // === Lookup Errors ===
    /// A lookup was attempted while the device is offline.
    #[error("No internet connection")]
    Offline,

    /// The product API could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The product API answered with a body that is not the expected JSON.
    #[error("invalid response from product API: {0}")]
    InvalidResponse(String),

    /// A lookup was requested while another one is still running.
    #[error("a product lookup is already in progress")]
    LookupInProgress,

    // === Scanner Errors ===
    /// The barcode decoder failed.
    #[error(transparent)]
    Decoder(#[from] DecoderError),

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

/// A specialized Result type for upcscan operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl Error {
    /// Create a new network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a new invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Check if this error is the offline short-circuit.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline)
    }

    /// Check if this error ends a single lookup attempt.
    ///
    /// Lookup failures are reported to the user and never retried.
    #[must_use]
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            Self::Offline | Self::Network(_) | Self::InvalidResponse(_)
        )
    }
}
