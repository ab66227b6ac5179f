//! Send a prompt to the configured LLM backend.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use skein_llm::{CompletionRequest, DEFAULT_MAX_TOKENS, SharedBackend};
use tracing::{debug, error};

use crate::error::Result;
use crate::params::{ParamExt, Params};
use crate::registry::{SharedSkillFunction, Skill, SkillFunction};

pub const COMPLETION_SKILL: &str = "CompletionSkill";

/// LLM completion as a skill. Accepts either `prompt` or `context` (so the
/// output of a prompt-building step can be passed straight through) plus
/// optional `system`, `max_tokens` and `temperature`.
#[derive(Clone)]
pub struct CompletionSkill {
    backend: SharedBackend,
    model: String,
    max_tokens: u32,
}

impl CompletionSkill {
    pub fn new(backend: SharedBackend, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

struct Complete(CompletionSkill);

#[async_trait]
impl SkillFunction for Complete {
    fn name(&self) -> &str {
        "complete"
    }

    fn description(&self) -> &str {
        "Send a prompt to the language model and return its reply"
    }

    async fn invoke(&self, params: Params) -> Result<Value> {
        let prompt = match params.optional_str("prompt")? {
            Some(prompt) => prompt,
            None => params.required_str("context", "the prompt to send")?,
        };
        let max_tokens = params
            .optional_u64("max_tokens")?
            .map(|n| n.min(u32::MAX as u64) as u32)
            .unwrap_or(self.0.max_tokens);

        let mut request = CompletionRequest::prompt(&self.0.model, prompt, max_tokens);
        if let Some(system) = params.optional_str("system")? {
            request = request.with_system(system);
        }
        if let Some(temperature) = params.optional_f64("temperature")? {
            request = request.with_temperature(temperature as f32);
        }

        let response = self.0.backend.complete(request).await.map_err(|e| {
            error!(backend = self.0.backend.name(), error = %e, "Completion failed");
            e
        })?;
        debug!(
            backend = self.0.backend.name(),
            output_tokens = response.usage.output_tokens,
            "Completion finished"
        );
        Ok(Value::String(response.text))
    }
}

impl Skill for CompletionSkill {
    fn name(&self) -> &str {
        COMPLETION_SKILL
    }

    fn functions(&self) -> Vec<SharedSkillFunction> {
        vec![Arc::new(Complete(self.clone()))]
    }
}
