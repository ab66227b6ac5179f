//! Workflow directory loader.
//!
//! Reads every `*.json` and `*.toml` file in a directory. A file that fails to
//! parse or validate is reported and skipped; it never blocks the others.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::definition::WorkflowDefinition;
use crate::error::Result;

/// Outcome for one file.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// A workflow was loaded.
    Loaded { name: String, path: PathBuf },
    /// A file failed to parse or validate.
    Error { path: PathBuf, error: String },
}

/// Loads workflow definitions from a directory.
#[derive(Debug, Clone)]
pub struct WorkflowLoader {
    workflow_dir: PathBuf,
}

impl WorkflowLoader {
    pub fn new(workflow_dir: impl Into<PathBuf>) -> Self {
        Self {
            workflow_dir: workflow_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.workflow_dir
    }

    /// Load all workflow files, in file-name order.
    ///
    /// Returns the valid definitions plus one event per file. A missing
    /// directory yields nothing.
    pub fn load_all(&self) -> (Vec<WorkflowDefinition>, Vec<WorkflowEvent>) {
        let mut definitions = Vec::new();
        let mut events = Vec::new();

        let entries = match std::fs::read_dir(&self.workflow_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    dir = %self.workflow_dir.display(),
                    error = %e,
                    "Workflow directory not readable"
                );
                return (definitions, events);
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| Self::is_workflow_file(path))
            .collect();
        paths.sort();

        for path in paths {
            match Self::load_file(&path) {
                Ok(definition) => {
                    info!(workflow = %definition.name, path = %path.display(), "Workflow loaded");
                    events.push(WorkflowEvent::Loaded {
                        name: definition.name.clone(),
                        path,
                    });
                    definitions.push(definition);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping workflow file");
                    events.push(WorkflowEvent::Error {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            count = definitions.len(),
            dir = %self.workflow_dir.display(),
            "Loaded workflows"
        );
        (definitions, events)
    }

    /// Parse and validate a single file.
    pub fn load_file(path: &Path) -> Result<WorkflowDefinition> {
        let definition = WorkflowDefinition::from_file(path)?;
        definition.validate()?;
        Ok(definition)
    }

    fn is_workflow_file(path: &Path) -> bool {
        path.is_file()
            && matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("json") | Some("toml")
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_toml(dir: &Path, filename: &str, name: &str) {
        let content = format!(
            r#"
name = "{name}"

[[steps]]
name = "step1"
skill = "SummarizationSkill"
function = "summarize_text"
"#,
        );
        std::fs::write(dir.join(filename), content).unwrap();
    }

    fn write_json(dir: &Path, filename: &str, name: &str) {
        let content = format!(
            r#"{{"name": "{name}", "steps": [{{"name": "s", "skill": "SummarizationSkill", "function": "generate_title"}}]}}"#
        );
        std::fs::write(dir.join(filename), content).unwrap();
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let loader = WorkflowLoader::new(dir.path().join("nope"));
        let (defs, events) = loader.load_all();
        assert!(defs.is_empty() && events.is_empty());
    }

    #[test]
    fn test_loads_json_and_toml_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_toml(dir.path(), "b.toml", "from_toml");
        write_json(dir.path(), "a.json", "from_json");
        std::fs::write(dir.path().join("notes.md"), "# not a workflow").unwrap();

        let (defs, events) = WorkflowLoader::new(dir.path()).load_all();
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["from_json", "from_toml"]);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_bad_file_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        write_toml(dir.path(), "good.toml", "good");
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        std::fs::write(
            dir.path().join("invalid.json"),
            r#"{"name": "", "steps": []}"#,
        )
        .unwrap();

        let (defs, events) = WorkflowLoader::new(dir.path()).load_all();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "good");
        let errors = events
            .iter()
            .filter(|e| matches!(e, WorkflowEvent::Error { .. }))
            .count();
        assert_eq!(errors, 2);
    }
}
