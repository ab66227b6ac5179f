//! Skills for Skein: named groups of callable functions.
//!
//! Workflows address functions as `(skill, function)` pairs. Everything
//! callable lives in a [`SkillRegistry`] built once at startup, so an unknown
//! name is a lookup miss rather than a runtime reflection failure.
//!
//! Built-in skills:
//! - [`SummarizationSkill`]: prompt builders for summaries, key points, titles,
//!   sentiment and abstracts
//! - [`CompletionSkill`]: sends a prompt to an [`LlmBackend`](skein_llm::LlmBackend)
//! - [`MemorySkill`] / [`KnowledgeSkill`]: tiered memory and GraphRAG lookups

pub mod builtin;
pub mod error;
pub mod params;
pub mod registry;

pub use builtin::{
    COMPLETION_SKILL, CompletionSkill, KNOWLEDGE_SKILL, KnowledgeSkill, MEMORY_SKILL, MemorySkill,
    RecallDefaults, SUMMARIZATION_SKILL, SummarizationSkill,
};
pub use error::{Result, SkillError};
pub use params::{ParamExt, Params};
pub use registry::{
    FnSkillFunction, FunctionInfo, SharedSkillFunction, Skill, SkillFunction, SkillInfo,
    SkillRegistry,
};
