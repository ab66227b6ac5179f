//! Workflow orchestrator: registers definitions and runs them against a
//! [`SkillRegistry`].
//!
//! Steps run strictly in order. Each step sees the caller's parameters
//! overlaid with its own literals; its result is appended to the run and
//! then checked against `continue_if`. A false condition halts the run
//! with the results gathered so far. That is a normal outcome, not an error.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use skein_skills::{Params, SharedSkillFunction, SkillRegistry};
use tracing::{debug, error, info, warn};

use crate::condition::should_continue;
use crate::definition::{Step, WorkflowDefinition};
use crate::error::{Result, WorkflowError};
use crate::loader::{WorkflowEvent, WorkflowLoader};

/// Orchestrator behaviour switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Treat unknown `continue_if` keys as failed conditions.
    pub strict_conditions: bool,
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Every step ran.
    Completed,
    /// A `continue_if` check failed after this step.
    Stopped { step_index: usize, step: String },
}

/// Outcome of [`WorkflowOrchestrator::execute_workflow`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowRun {
    pub workflow: String,
    #[serde(flatten)]
    pub status: ExecutionStatus,
    /// One entry per executed step, in declaration order.
    pub results: Vec<Value>,
}

impl WorkflowRun {
    pub fn is_completed(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }
}

/// Lifecycle of the most recent execution of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExecutionState {
    Running { step: String },
    Completed,
    Stopped { step: String },
    Failed { step: Option<String>, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    #[serde(flatten)]
    pub state: ExecutionState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps_completed: usize,
}

/// Introspection view returned by [`WorkflowOrchestrator::get_workflow_status`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowStatus {
    pub name: String,
    pub step_count: usize,
    pub registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub metadata: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<ExecutionRecord>,
}

/// Runs registered workflows.
///
/// Locks are only held for map lookups and updates, never across a skill
/// invocation, so concurrent runs of different workflows do not block
/// each other.
pub struct WorkflowOrchestrator {
    skills: Arc<SkillRegistry>,
    workflows: RwLock<BTreeMap<String, Arc<WorkflowDefinition>>>,
    executions: Mutex<HashMap<String, ExecutionRecord>>,
    config: OrchestratorConfig,
}

impl WorkflowOrchestrator {
    pub fn new(skills: Arc<SkillRegistry>) -> Self {
        Self {
            skills,
            workflows: RwLock::new(BTreeMap::new()),
            executions: Mutex::new(HashMap::new()),
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn skills(&self) -> &SkillRegistry {
        &self.skills
    }

    // ─────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────

    /// Register a definition under `name`, replacing any existing one.
    pub fn register_workflow(&self, name: &str, definition: WorkflowDefinition) -> Result<()> {
        definition.validate().map_err(|e| {
            error!(workflow = %name, error = %e, "Failed to register workflow");
            e
        })?;
        let step_count = definition.steps.len();
        let previous = self
            .workflows
            .write()
            .insert(name.to_string(), Arc::new(definition));
        if previous.is_some() {
            warn!(workflow = %name, "Overwriting existing workflow");
        }
        info!(workflow = %name, steps = step_count, "Registered workflow");
        Ok(())
    }

    /// Register an untyped definition. `steps` must be present.
    pub fn register_workflow_value(&self, name: &str, definition: Value) -> Result<()> {
        let definition = WorkflowDefinition::from_value(name, definition).map_err(|e| {
            error!(workflow = %name, error = %e, "Failed to register workflow");
            e
        })?;
        self.register_workflow(name, definition)
    }

    /// Remove a workflow. Returns whether it was registered.
    pub fn unregister_workflow(&self, name: &str) -> bool {
        let removed = self.workflows.write().remove(name).is_some();
        if removed {
            self.executions.lock().remove(name);
            info!(workflow = %name, "Unregistered workflow");
        }
        removed
    }

    pub fn get_workflow(&self, name: &str) -> Option<Arc<WorkflowDefinition>> {
        self.workflows.read().get(name).cloned()
    }

    /// Registered workflow names, sorted.
    pub fn list_workflows(&self) -> Vec<String> {
        self.workflows.read().keys().cloned().collect()
    }

    pub fn get_workflow_status(&self, name: &str) -> Result<WorkflowStatus> {
        let definition = self
            .get_workflow(name)
            .ok_or_else(|| WorkflowError::WorkflowNotFound(name.to_string()))?;
        let last_execution = self.executions.lock().get(name).cloned();
        Ok(WorkflowStatus {
            name: name.to_string(),
            step_count: definition.steps.len(),
            registered: true,
            description: definition.description.clone(),
            version: definition.version.clone(),
            metadata: definition.metadata.clone(),
            last_execution,
        })
    }

    /// Register every definition the loader finds, keyed by definition name.
    pub fn load_workflows(&self, loader: &WorkflowLoader) -> Vec<WorkflowEvent> {
        let (definitions, mut events) = loader.load_all();
        for definition in definitions {
            let name = definition.name.clone();
            if let Err(e) = self.register_workflow(&name, definition) {
                events.push(WorkflowEvent::Error {
                    path: loader.dir().to_path_buf(),
                    error: e.to_string(),
                });
            }
        }
        events
    }

    /// Steps whose `(skill, function)` pair is not in the registry.
    pub fn unresolved_steps(&self, definition: &WorkflowDefinition) -> Vec<String> {
        definition
            .steps
            .iter()
            .filter(|step| self.resolve(step).is_err())
            .map(|step| step.name.clone())
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Execution
    // ─────────────────────────────────────────────────────────────────────

    /// Run a registered workflow.
    pub async fn execute_workflow(&self, name: &str, params: Params) -> Result<WorkflowRun> {
        let definition = self.get_workflow(name).ok_or_else(|| {
            error!(workflow = %name, "Workflow not found");
            WorkflowError::WorkflowNotFound(name.to_string())
        })?;

        let missing = definition.missing_parameters(&params);
        if !missing.is_empty() {
            let err = WorkflowError::MissingParameters {
                workflow: name.to_string(),
                missing,
            };
            error!(workflow = %name, error = %err, "Workflow not started");
            return Err(err);
        }

        let started_at = Utc::now();
        let mut results = Vec::with_capacity(definition.steps.len());
        info!(workflow = %name, steps = definition.steps.len(), "Executing workflow");

        for (index, step) in definition.steps.iter().enumerate() {
            self.record(name, started_at, results.len(), ExecutionState::Running {
                step: step.name.clone(),
            });

            let result = match self.execute_step(step, &params).await {
                Ok(result) => result,
                Err(e) => {
                    error!(workflow = %name, step = %step.name, error = %e, "Workflow step failed");
                    self.finish(name, started_at, results.len(), ExecutionState::Failed {
                        step: Some(step.name.clone()),
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            };
            results.push(result);

            let last = results.last().unwrap_or(&Value::Null);
            if !should_continue(
                &step.name,
                step.continue_if.as_ref(),
                last,
                self.config.strict_conditions,
            ) {
                info!(workflow = %name, step = %step.name, "Workflow stopped by condition");
                self.finish(name, started_at, results.len(), ExecutionState::Stopped {
                    step: step.name.clone(),
                });
                return Ok(WorkflowRun {
                    workflow: name.to_string(),
                    status: ExecutionStatus::Stopped {
                        step_index: index,
                        step: step.name.clone(),
                    },
                    results,
                });
            }
        }

        info!(workflow = %name, steps = results.len(), "Workflow completed");
        self.finish(name, started_at, results.len(), ExecutionState::Completed);
        Ok(WorkflowRun {
            workflow: name.to_string(),
            status: ExecutionStatus::Completed,
            results,
        })
    }

    /// Resolve and invoke one step with the merged parameters.
    pub async fn execute_step(&self, step: &Step, params: &Params) -> Result<Value> {
        let function = self.resolve(step)?;
        let merged = step.merged_params(params);
        debug!(
            step = %step.name,
            skill = %step.skill,
            function = %step.function,
            "Executing step"
        );
        function
            .invoke(merged)
            .await
            .map_err(|source| WorkflowError::StepFailed {
                step: step.name.clone(),
                source,
            })
    }

    /// Run steps concurrently, wait for all of them, and return results in
    /// input order. If any failed, the first failure in input order is
    /// returned and every result is discarded.
    pub async fn run_parallel_steps(&self, steps: &[Step], params: &Params) -> Result<Vec<Value>> {
        let outcomes = join_all(steps.iter().map(|step| self.execute_step(step, params))).await;
        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Ok(value) => results.push(value),
                Err(e) => {
                    error!(error = %e, "Parallel step execution failed");
                    return Err(e);
                }
            }
        }
        Ok(results)
    }

    fn resolve(&self, step: &Step) -> Result<SharedSkillFunction> {
        if !self.skills.has_skill(&step.skill) {
            return Err(WorkflowError::SkillNotFound(step.skill.clone()));
        }
        self.skills
            .get(&step.skill, &step.function)
            .ok_or_else(|| WorkflowError::FunctionNotFound {
                skill: step.skill.clone(),
                function: step.function.clone(),
            })
    }

    fn record(&self, name: &str, started_at: DateTime<Utc>, done: usize, state: ExecutionState) {
        self.executions.lock().insert(
            name.to_string(),
            ExecutionRecord {
                state,
                started_at,
                finished_at: None,
                steps_completed: done,
            },
        );
    }

    fn finish(&self, name: &str, started_at: DateTime<Utc>, done: usize, state: ExecutionState) {
        self.executions.lock().insert(
            name.to_string(),
            ExecutionRecord {
                state,
                started_at,
                finished_at: Some(Utc::now()),
                steps_completed: done,
            },
        );
    }
}

impl std::fmt::Debug for WorkflowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowOrchestrator")
            .field("workflows", &self.list_workflows())
            .field("skills", &self.skills.len())
            .field("config", &self.config)
            .finish()
    }
}
