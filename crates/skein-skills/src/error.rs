//! Error types for skills.

use thiserror::Error;

/// Errors raised while resolving or invoking a skill function.
#[derive(Debug, Error)]
pub enum SkillError {
    /// No skill, or no function within a skill, has this name.
    #[error("Function '{function}' not found in skill '{skill}'")]
    NotFound { skill: String, function: String },

    /// A required parameter was not supplied.
    #[error("Missing required parameter '{name}': {hint}")]
    MissingParameter { name: String, hint: String },

    /// A parameter was supplied with an unusable value.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// Memory or knowledge store failure.
    #[error("Memory error: {0}")]
    Memory(#[from] skein_memory::MemoryError),

    /// LLM backend failure.
    #[error("LLM error: {0}")]
    Llm(#[from] skein_llm::LlmError),

    /// Result could not be converted to JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything else a custom function wants to report.
    #[error("Skill failed: {0}")]
    Failed(String),
}

impl SkillError {
    pub fn missing(name: impl Into<String>, hint: impl Into<String>) -> Self {
        SkillError::MissingParameter {
            name: name.into(),
            hint: hint.into(),
        }
    }

    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        SkillError::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SkillError::NotFound { .. })
    }

    /// Caller mistakes: missing or invalid parameters.
    pub fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            SkillError::MissingParameter { .. } | SkillError::InvalidParameter { .. }
        )
    }
}

/// Result type alias for skill operations.
pub type Result<T> = std::result::Result<T, SkillError>;
