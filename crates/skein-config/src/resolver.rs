//! LLM config resolution: turns the `[llm]` section into a concrete backend config.

use tracing::debug;

use crate::{Backend, ConfigError, LlmConfig, Result, SkeinConfig};

/// A fully resolved LLM configuration ready to construct a backend.
#[derive(Debug, Clone)]
pub struct ResolvedLlm {
    /// The backend provider.
    pub backend: Backend,
    /// Model identifier.
    pub model: String,
    /// API base URL.
    pub base_url: String,
    /// Resolved API key.
    pub api_key: Option<String>,
    /// Where the API key was resolved from.
    pub api_key_source: ApiKeySource,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum retry attempts for failed requests.
    pub retry_max: Option<u32>,
    /// Backoff delay between retries in milliseconds.
    pub retry_backoff_ms: Option<u64>,
}

/// How an API key was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeySource {
    /// From environment variable.
    EnvVar(String),
    /// From config file (not recommended).
    ConfigFile,
    /// No API key needed or found.
    NotFound,
}

impl std::fmt::Display for ApiKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiKeySource::EnvVar(var) => write!(f, "env:{}", var),
            ApiKeySource::ConfigFile => write!(f, "config file"),
            ApiKeySource::NotFound => write!(f, "none"),
        }
    }
}

/// Resolve the `[llm]` section, reading API keys from the process environment.
pub fn resolve_llm(config: &SkeinConfig) -> Result<ResolvedLlm> {
    let llm = config.llm.as_ref().ok_or(ConfigError::NoLlm)?;
    resolve_llm_with(llm, |var| std::env::var(var).ok())
}

/// Resolve an LLM config using `lookup` for environment access.
///
/// API key resolution: backend env var, then the config file. Backends that
/// require a key fail with [`ConfigError::ApiKeyNotFound`] when neither is set.
pub fn resolve_llm_with<F>(llm: &LlmConfig, lookup: F) -> Result<ResolvedLlm>
where
    F: Fn(&str) -> Option<String>,
{
    let backend = llm.backend.ok_or_else(|| ConfigError::MissingField {
        field: "backend".to_string(),
        context: "[llm]".to_string(),
    })?;

    let model = llm.model.clone().ok_or_else(|| ConfigError::MissingField {
        field: "model".to_string(),
        context: "[llm]".to_string(),
    })?;

    let base_url = llm
        .base_url
        .clone()
        .or_else(|| backend.default_base_url().map(str::to_string))
        .ok_or_else(|| ConfigError::MissingField {
            field: "base_url".to_string(),
            context: format!("[llm] ({} backend)", backend),
        })?;

    let env_var = backend.env_var();
    let (api_key, api_key_source) = match lookup(env_var).filter(|k| !k.is_empty()) {
        Some(key) => (Some(key), ApiKeySource::EnvVar(env_var.to_string())),
        None => match &llm.api_key {
            Some(key) => (Some(key.clone()), ApiKeySource::ConfigFile),
            None => (None, ApiKeySource::NotFound),
        },
    };

    if api_key.is_none() && backend.requires_api_key() {
        return Err(ConfigError::ApiKeyNotFound {
            backend: backend.to_string(),
            env_var: env_var.to_string(),
        });
    }

    debug!(
        backend = %backend,
        model = %model,
        api_key_source = %api_key_source,
        "Resolved LLM config"
    );

    Ok(ResolvedLlm {
        backend,
        model,
        base_url,
        api_key,
        api_key_source,
        max_tokens: llm.max_tokens,
        temperature: llm.temperature,
        retry_max: llm.retry_max,
        retry_backoff_ms: llm.retry_backoff_ms,
    })
}
