//! Text summarization and analysis prompts.
//!
//! These functions build instructions for an LLM; they do not call one. Chain
//! them into [`CompletionSkill`](super::CompletionSkill) to get an answer.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use crate::error::{Result, SkillError};
use crate::params::{ParamExt, Params};
use crate::registry::{SharedSkillFunction, Skill, SkillFunction};

pub const SUMMARIZATION_SKILL: &str = "SummarizationSkill";

const DEFAULT_KEY_POINTS: u64 = 5;
const CONTEXT_HINT: &str = "the text to work on";

// ─────────────────────────────────────────────────────────────────────────────
// Prompt Builders
// ─────────────────────────────────────────────────────────────────────────────

pub fn summarize_prompt(context: &str, max_length: Option<u64>) -> String {
    let mut prompt = format!(
        "Summarize the text below concisely.\n\n{context}\n\n\
         Keep the central message and the key points, use plain professional \
         language, and do not introduce facts that are not in the text."
    );
    if let Some(words) = max_length {
        prompt.push_str(&format!("\nThe summary must be shorter than {words} words."));
    }
    prompt
}

pub fn key_points_prompt(context: &str, num_points: u64) -> String {
    format!(
        "List the {num_points} most important points of the text below.\n\n{context}\n\n\
         Order them by importance, one bullet each, short but informative and \
         faithful to the source."
    )
}

/// Title style guidance. Unknown styles fall back to `professional`.
pub fn title_style_guidance(style: &str) -> &'static str {
    match style {
        "creative" => "catchy and memorable",
        "academic" => "formal and descriptive",
        _ => "clear and businesslike",
    }
}

pub fn title_prompt(context: &str, style: &str) -> String {
    format!(
        "Write a {} title for the text below.\n\n{context}\n\n\
         It should be short, name the main topic, suit a {style} setting and \
         make a reader want to continue.",
        title_style_guidance(style)
    )
}

pub fn sentiment_prompt(context: &str) -> String {
    format!(
        "Analyze the sentiment of the text below.\n\n{context}\n\n\
         Report the overall polarity (positive, negative or neutral), the \
         emotional tones present, the indicators behind that reading, and how \
         confident the assessment is. Structure the answer as sections."
    )
}

pub fn abstract_prompt(context: &str, target_audience: &str) -> String {
    format!(
        "Write an abstract of the text below for a {target_audience} audience.\n\n{context}\n\n\
         Follow the usual abstract structure: context, method where there is \
         one, main findings or arguments, and implications. Stay under 250 words."
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Skill
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Summarize,
    KeyPoints,
    Title,
    Sentiment,
    Abstract,
}

impl Operation {
    const ALL: [Operation; 5] = [
        Operation::Summarize,
        Operation::KeyPoints,
        Operation::Title,
        Operation::Sentiment,
        Operation::Abstract,
    ];

    fn name(self) -> &'static str {
        match self {
            Operation::Summarize => "summarize_text",
            Operation::KeyPoints => "extract_key_points",
            Operation::Title => "generate_title",
            Operation::Sentiment => "analyze_sentiment",
            Operation::Abstract => "create_abstract",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Operation::Summarize => "Summarize text while keeping its key information",
            Operation::KeyPoints => "Extract the main points of a text",
            Operation::Title => "Generate a title (professional, creative or academic)",
            Operation::Sentiment => "Analyze sentiment and emotional tone",
            Operation::Abstract => "Write an abstract for a target audience",
        }
    }
}

struct SummarizationFunction(Operation);

#[async_trait]
impl SkillFunction for SummarizationFunction {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    async fn invoke(&self, params: Params) -> Result<Value> {
        let context = params.required_str("context", CONTEXT_HINT)?;

        let output = match self.0 {
            Operation::Summarize => {
                let max_length = params.optional_u64("max_length")?;
                info!(chars = context.len(), ?max_length, "Building summary prompt");
                Value::String(summarize_prompt(context, max_length))
            }
            Operation::KeyPoints => {
                if context.trim().is_empty() {
                    return Err(SkillError::invalid("context", "text must not be empty"));
                }
                let num_points = params
                    .optional_u64("num_points")?
                    .unwrap_or(DEFAULT_KEY_POINTS);
                if num_points == 0 {
                    return Err(SkillError::invalid("num_points", "must be at least 1"));
                }
                info!(num_points, "Building key points prompt");
                Value::String(key_points_prompt(context, num_points))
            }
            Operation::Title => {
                let style = params.optional_str("style")?.unwrap_or("professional");
                info!(style, "Building title prompt");
                Value::String(title_prompt(context, style))
            }
            Operation::Sentiment => {
                info!("Building sentiment prompt");
                json!({ "prompt": sentiment_prompt(context) })
            }
            Operation::Abstract => {
                let audience = params.optional_str("target_audience")?.unwrap_or("general");
                info!(audience, "Building abstract prompt");
                Value::String(abstract_prompt(context, audience))
            }
        };
        Ok(output)
    }
}

/// Prompt builders for summaries, key points, titles, sentiment and abstracts.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummarizationSkill;

impl SummarizationSkill {
    pub fn new() -> Self {
        Self
    }
}

impl Skill for SummarizationSkill {
    fn name(&self) -> &str {
        SUMMARIZATION_SKILL
    }

    fn functions(&self) -> Vec<SharedSkillFunction> {
        Operation::ALL
            .into_iter()
            .map(|op| Arc::new(SummarizationFunction(op)) as SharedSkillFunction)
            .collect()
    }
}
