//! Declarative workflows over Skein skills.
//!
//! A workflow is an ordered list of steps; each step names a
//! `(skill, function)` pair in a [`SkillRegistry`](skein_skills::SkillRegistry)
//! and carries literal parameters plus optional `continue_if` conditions.
//!
//! ```text
//! caller params ──┐
//!                 ▼
//!   step 1 ── merge(step literals win) ── invoke ── result ── continue_if?
//!   step 2 ── ...                                              │
//!                                                  false ──► Stopped(partial)
//! ```
//!
//! Definitions are loaded from JSON or TOML files by [`WorkflowLoader`] and
//! registered by name in a [`WorkflowOrchestrator`].

pub mod condition;
pub mod definition;
pub mod error;
pub mod loader;
pub mod orchestrator;

pub use condition::{ConditionError, evaluate, is_truthy, should_continue};
pub use definition::{Conditions, ParameterContract, Step, WorkflowDefinition};
pub use error::{Result, WorkflowError};
pub use loader::{WorkflowEvent, WorkflowLoader};
pub use orchestrator::{
    ExecutionRecord, ExecutionState, ExecutionStatus, OrchestratorConfig, WorkflowOrchestrator,
    WorkflowRun, WorkflowStatus,
};
