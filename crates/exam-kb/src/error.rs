//! Error types for the knowledge base

use std::path::PathBuf;
use thiserror::Error;

use crate::ingestion::ParseError;

/// Result type alias for knowledge base operations
pub type Result<T> = std::result::Result<T, Error>;

/// Knowledge base errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document could not be parsed (recoverable, see `ParseError::diagnostic`)
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Unknown session
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Unknown file id within a session
    #[error("File '{file_id}' not found in session {session_id}")]
    FileNotFound { session_id: String, file_id: String },

    /// Disk write failure
    #[error("Storage error at '{}': {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rejected input (bad session token, bucket name, oversized upload)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model call failure
    #[error("Model error: {0}")]
    Model(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a storage error for a path
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a file-not-found error
    pub fn file_not_found(session_id: impl Into<String>, file_id: impl Into<String>) -> Self {
        Self::FileNotFound {
            session_id: session_id.into(),
            file_id: file_id.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a model error
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this is one of the not-found variants
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound(_) | Self::FileNotFound { .. })
    }
}
