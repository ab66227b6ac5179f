//! Validation for data entering a vector store.

use crate::error::MemoryError;

/// Specific validation failures for records and collections.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    /// Collection name is empty.
    #[error("collection name is empty")]
    EmptyCollection,

    /// Embedding dimension mismatch.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// Embedding contains invalid values (NaN or Inf).
    #[error("embedding contains {count} invalid values (NaN or Inf)")]
    InvalidEmbeddingValues {
        /// Number of invalid values found.
        count: usize,
    },
}

impl From<ValidationError> for MemoryError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyCollection => MemoryError::InvalidArgument(err.to_string()),
            _ => MemoryError::InvalidData(err.to_string()),
        }
    }
}

/// Validate an embedding vector against the collection's dimensionality.
pub fn validate_embedding(
    embedding: &[f32],
    expected_dim: usize,
) -> std::result::Result<(), ValidationError> {
    if embedding.len() != expected_dim {
        return Err(ValidationError::DimensionMismatch {
            expected: expected_dim,
            actual: embedding.len(),
        });
    }

    let invalid = embedding.iter().filter(|v| !v.is_finite()).count();
    if invalid > 0 {
        return Err(ValidationError::InvalidEmbeddingValues { count: invalid });
    }

    Ok(())
}

/// Validate a collection name.
pub fn validate_collection(name: &str) -> std::result::Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyCollection);
    }
    Ok(())
}
