//! Error types for the memory crate.

use thiserror::Error;

/// Errors that can occur in the memory crate.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Database connection or operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Embedding the record or query text failed.
    #[error("Embedding error: {0}")]
    Embedding(#[from] skein_llm::LlmError),

    /// Reading or writing a file failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Requested resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied an unusable argument (bad export format, zero TTL, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid data or state.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A capability call failed; the message carries the operation context.
    #[error("{operation} failed: {message}")]
    Capability { operation: String, message: String },
}

impl MemoryError {
    /// Wrap an error with the operation that produced it.
    pub fn capability(operation: impl Into<String>, err: impl std::fmt::Display) -> Self {
        MemoryError::Capability {
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    /// Attach operation context to backend failures.
    ///
    /// Caller errors (not found, invalid argument, invalid data) pass through
    /// unchanged so they stay matchable.
    pub fn context(self, operation: impl Into<String>) -> Self {
        match self {
            MemoryError::NotFound(_)
            | MemoryError::InvalidArgument(_)
            | MemoryError::InvalidData(_)
            | MemoryError::Capability { .. } => self,
            other => MemoryError::capability(operation, other),
        }
    }

    /// Returns true for caller errors that retrying will not fix.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, MemoryError::InvalidArgument(_))
    }
}

/// Result type alias for memory operations.
pub type Result<T> = std::result::Result<T, MemoryError>;
