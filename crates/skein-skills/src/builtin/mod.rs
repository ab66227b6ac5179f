//! Skills that ship with Skein.

mod completion;
mod memory;
mod summarization;

pub use completion::{COMPLETION_SKILL, CompletionSkill};
pub use memory::{KNOWLEDGE_SKILL, KnowledgeSkill, MEMORY_SKILL, MemorySkill, RecallDefaults};
pub use summarization::{
    SUMMARIZATION_SKILL, SummarizationSkill, abstract_prompt, key_points_prompt, sentiment_prompt,
    summarize_prompt, title_prompt, title_style_guidance,
};
