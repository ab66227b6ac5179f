//! Configuration system for Skein.
//!
//! Provides TOML-based configuration with:
//! - Sections for the LLM backend, embeddings, memory, knowledge, workflows,
//!   skills and logging
//! - Config file layering (XDG user config + project-local overrides)
//! - Environment variable overrides
//! - API key resolution (env var → config file)

pub mod discovery;
pub mod error;
pub mod resolver;
pub mod types;

pub use discovery::{
    LoadedConfig, apply_env_overrides, default_workflow_dir, load_config, load_config_file,
    load_config_with_options, load_explicit, save_config, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use resolver::{ApiKeySource, ResolvedLlm, resolve_llm, resolve_llm_with};
pub use types::*;
