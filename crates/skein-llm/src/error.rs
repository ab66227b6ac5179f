//! Errors from completion backends and embedders.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

/// Failure talking to a completion or embedding provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider answered with an error status or an unusable body.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Request never got an answer: timeout, refused connection, DNS.
    #[error("Network error: {0}")]
    Network(String),

    /// Embedder could not be built from `[embedding]`.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP 429.
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// HTTP 401 or 403.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Client construction or an empty provider answer.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LlmError {
    /// Whether [`with_retry`](crate::with_retry) should try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimit(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "timed out"
        } else if err.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        LlmError::Network(format!("{kind}: {err}"))
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Serialization(err.to_string())
    }
}
