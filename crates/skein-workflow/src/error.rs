//! Error types for the workflow orchestrator.

use thiserror::Error;

use skein_skills::SkillError;

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors that can occur while registering or executing workflows.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No workflow registered under this name.
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    /// A step names a skill that is not registered.
    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    /// The skill exists but has no such function.
    #[error("Function '{function}' not found in skill '{skill}'")]
    FunctionNotFound { skill: String, function: String },

    /// Required workflow parameters were not supplied. Lists every one.
    #[error("Workflow '{workflow}' is missing required parameters: {}", .missing.join(", "))]
    MissingParameters {
        workflow: String,
        missing: Vec<String>,
    },

    /// The definition is malformed.
    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),

    /// A step's skill function failed.
    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: SkillError,
    },

    /// Reading a definition file failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl WorkflowError {
    /// Workflow, skill or function lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WorkflowError::WorkflowNotFound(_)
                | WorkflowError::SkillNotFound(_)
                | WorkflowError::FunctionNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameters_lists_all() {
        let err = WorkflowError::MissingParameters {
            workflow: "wf".into(),
            missing: vec!["text".into(), "lang".into()],
        };
        assert_eq!(
            err.to_string(),
            "Workflow 'wf' is missing required parameters: text, lang"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_variants() {
        assert!(WorkflowError::WorkflowNotFound("x".into()).is_not_found());
        assert!(WorkflowError::SkillNotFound("x".into()).is_not_found());
        assert!(
            WorkflowError::FunctionNotFound {
                skill: "s".into(),
                function: "f".into()
            }
            .is_not_found()
        );
    }
}
