//! Declarative workflow definitions.
//!
//! Definitions are plain data: an ordered list of steps, each naming a skill
//! function and its literal parameters. They can be written as JSON or TOML.
//!
//! # Example TOML
//!
//! ```toml
//! name = "digest"
//! description = "Summarize a document and pick a title"
//! version = "1.0.0"
//!
//! [parameters]
//! required = ["context"]
//! optional = ["max_length"]
//!
//! [[steps]]
//! name = "summarize"
//! skill = "SummarizationSkill"
//! function = "summarize_text"
//! parameters = { max_length = 120 }
//! continue_if = { contains = "Summarize" }
//!
//! [[steps]]
//! name = "title"
//! skill = "SummarizationSkill"
//! function = "generate_title"
//! parameters = { style = "creative" }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skein_skills::Params;

use crate::error::{Result, WorkflowError};

/// Continuation conditions for a step: condition name to expected value.
pub type Conditions = serde_json::Map<String, Value>;

/// Which caller parameters a workflow expects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterContract {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
}

/// One skill-function invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub skill: String,
    pub function: String,
    /// Literal parameters. They win over caller parameters with the same key.
    #[serde(default)]
    pub parameters: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_if: Option<Conditions>,
}

impl Step {
    pub fn new(
        name: impl Into<String>,
        skill: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            skill: skill.into(),
            function: function.into(),
            parameters: Params::new(),
            continue_if: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.continue_if
            .get_or_insert_with(Conditions::new)
            .insert(condition.into(), expected.into());
        self
    }

    /// Caller parameters overlaid with this step's literals.
    pub fn merged_params(&self, caller: &Params) -> Params {
        let mut merged = caller.clone();
        for (k, v) in &self.parameters {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }
}

/// A complete workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ParameterContract>,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Construction and parsing
// ---------------------------------------------------------------------------

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            description: None,
            version: None,
            parameters: None,
            steps,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_required(mut self, names: &[&str]) -> Self {
        self.parameters
            .get_or_insert_with(ParameterContract::default)
            .required = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| WorkflowError::InvalidWorkflow(format!("JSON parse error: {}", e)))
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| WorkflowError::InvalidWorkflow(format!("TOML parse error: {}", e)))
    }

    /// Build from an untyped value, as handed over by an API caller.
    ///
    /// `steps` must be present. A missing `name` is filled from `fallback_name`.
    pub fn from_value(fallback_name: &str, value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(WorkflowError::InvalidWorkflow(
                "workflow definition must be an object".into(),
            ));
        };
        if !map.contains_key("steps") {
            return Err(WorkflowError::InvalidWorkflow(
                "workflow definition missing required field: steps".into(),
            ));
        }
        map.entry("name")
            .or_insert_with(|| Value::String(fallback_name.to_string()));
        serde_json::from_value(Value::Object(map))
            .map_err(|e| WorkflowError::InvalidWorkflow(e.to_string()))
    }

    /// Load a `.json` or `.toml` file, chosen by extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| WorkflowError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            _ => Err(WorkflowError::InvalidWorkflow(format!(
                "unsupported workflow file type: {}",
                path.display()
            ))),
        }
    }

    pub fn required_parameters(&self) -> &[String] {
        self.parameters
            .as_ref()
            .map(|p| p.required.as_slice())
            .unwrap_or(&[])
    }

    /// Every required parameter absent from `params`, in declaration order.
    pub fn missing_parameters(&self, params: &Params) -> Vec<String> {
        self.required_parameters()
            .iter()
            .filter(|name| !params.contains_key(name.as_str()))
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl WorkflowDefinition {
    /// Check structural rules:
    /// - non-empty workflow name
    /// - every step has a name, skill and function
    /// - step names are unique
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(WorkflowError::InvalidWorkflow(
                "Workflow name cannot be empty".into(),
            ));
        }

        let mut seen = HashSet::new();
        for (i, step) in self.steps.iter().enumerate() {
            if step.name.is_empty() {
                return Err(WorkflowError::InvalidWorkflow(format!(
                    "Step {} has no name",
                    i + 1
                )));
            }
            if step.skill.is_empty() || step.function.is_empty() {
                return Err(WorkflowError::InvalidWorkflow(format!(
                    "Step '{}' must name both a skill and a function",
                    step.name
                )));
            }
            if !seen.insert(step.name.as_str()) {
                return Err(WorkflowError::InvalidWorkflow(format!(
                    "Duplicate step name: {}",
                    step.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE_JSON: &str = r#"{
        "name": "test_workflow",
        "description": "A test workflow",
        "version": "1.0.0",
        "parameters": {"required": ["text"], "optional": ["lang"]},
        "steps": [
            {
                "name": "summarize",
                "skill": "SummarizationSkill",
                "function": "summarize_text",
                "parameters": {"context": "Sample text", "max_length": 100},
                "continue_if": {"success": true}
            },
            {
                "name": "extract_points",
                "skill": "SummarizationSkill",
                "function": "extract_key_points"
            }
        ],
        "metadata": {"owner": "docs"}
    }"#;

    #[test]
    fn test_parse_json() {
        let wf = WorkflowDefinition::from_json(SAMPLE_JSON).unwrap();
        assert_eq!(wf.name, "test_workflow");
        assert_eq!(wf.version.as_deref(), Some("1.0.0"));
        assert_eq!(wf.steps.len(), 2);
        assert_eq!(wf.steps[0].parameters["max_length"], 100);
        assert_eq!(wf.steps[0].continue_if.as_ref().unwrap()["success"], true);
        assert!(wf.steps[1].parameters.is_empty());
        assert_eq!(wf.metadata["owner"], "docs");
        wf.validate().unwrap();
    }

    #[test]
    fn test_parse_toml() {
        let wf = WorkflowDefinition::from_toml(
            r#"
name = "digest"

[parameters]
required = ["context"]

[[steps]]
name = "summarize"
skill = "SummarizationSkill"
function = "summarize_text"
parameters = { max_length = 120 }
continue_if = { contains = "Summarize" }
"#,
        )
        .unwrap();
        assert_eq!(wf.required_parameters(), ["context".to_string()]);
        assert_eq!(wf.steps[0].parameters["max_length"], 120);
        assert_eq!(wf.steps[0].continue_if.as_ref().unwrap()["contains"], "Summarize");
    }

    #[test]
    fn test_from_value_requires_steps() {
        let err = WorkflowDefinition::from_value("x", json!({"name": "x"})).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidWorkflow(ref m) if m.contains("steps")));

        let wf = WorkflowDefinition::from_value("fallback", json!({"steps": []})).unwrap();
        assert_eq!(wf.name, "fallback");
    }

    #[test]
    fn test_missing_parameters_reports_all() {
        let wf = WorkflowDefinition::new("wf", vec![]).with_required(&["a", "b", "c"]);
        let mut params = Params::new();
        params.insert("b".into(), json!(1));
        assert_eq!(wf.missing_parameters(&params), vec!["a", "c"]);
    }

    #[test]
    fn test_step_literals_win() {
        let step = Step::new("s", "Skill", "f").with_param("context", "literal");
        let mut caller = Params::new();
        caller.insert("context".into(), json!("caller"));
        caller.insert("extra".into(), json!(true));

        let merged = step.merged_params(&caller);
        assert_eq!(merged["context"], "literal");
        assert_eq!(merged["extra"], true);
    }

    #[test]
    fn test_validate_rules() {
        let dup = WorkflowDefinition::new(
            "wf",
            vec![Step::new("a", "S", "f"), Step::new("a", "S", "g")],
        );
        assert!(dup.validate().is_err());

        let blank = WorkflowDefinition::new("wf", vec![Step::new("a", "", "f")]);
        assert!(blank.validate().is_err());

        assert!(WorkflowDefinition::new(" ", vec![]).validate().is_err());
        assert!(WorkflowDefinition::new("ok", vec![]).validate().is_ok());
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("wf.json");
        std::fs::write(&json_path, SAMPLE_JSON).unwrap();
        assert_eq!(WorkflowDefinition::from_file(&json_path).unwrap().name, "test_workflow");

        let yaml_path = dir.path().join("wf.yaml");
        std::fs::write(&yaml_path, "name: x").unwrap();
        assert!(WorkflowDefinition::from_file(&yaml_path).is_err());

        let err = WorkflowDefinition::from_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, WorkflowError::Io { .. }));
    }
}
