//! Config file discovery, layered merging and environment overrides.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/skein/config.toml` (XDG user config)
//! 2. `./skein.toml` (project-local)
//! 3. Environment variables (`LLM_MODEL`, `MIN_RELEVANCE_SCORE`, ...)
//! 4. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{ConfigError, Result, SkeinConfig, types::APP_NAME};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "skein.toml";

/// Default config filename within XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "SKEIN_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: SkeinConfig,
    /// Sources that were checked, in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
    /// Warnings generated during loading (e.g., plaintext API keys).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Get paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration by discovering and merging all config layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Load configuration with explicit control over the user config directory.
///
/// `config_dir` overrides both `SKEIN_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut config = SkeinConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    check_plaintext_keys(&config, &mut warnings);

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load config from a specific file path (no discovery), then apply env overrides.
pub fn load_explicit(path: &Path) -> Result<LoadedConfig> {
    let mut config = load_config_file(path)?;
    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    let mut warnings = Vec::new();
    check_plaintext_keys(&config, &mut warnings);
    Ok(LoadedConfig {
        config,
        sources: vec![ConfigSource {
            path: path.to_path_buf(),
            loaded: true,
        }],
        warnings,
    })
}

/// Load config from a specific file path.
pub fn load_config_file(path: &Path) -> Result<SkeinConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    SkeinConfig::from_toml(&contents)
}

/// Save configuration to a file, creating parent directories.
pub fn save_config(config: &SkeinConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Get the XDG config file path for skein.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Get the XDG config directory for skein.
///
/// Checks `SKEIN_CONFIG_DIR` first, then falls back to the platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Default workflow directory (`<config dir>/workflows`).
pub fn default_workflow_dir() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join("workflows"))
}

/// Apply environment variable overrides on top of file configuration.
///
/// `lookup` returns the value of an environment variable; tests pass a
/// closure over a map instead of mutating the process environment.
pub fn apply_env_overrides<F>(config: &mut SkeinConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(model) = lookup("LLM_MODEL") {
        debug!(var = "LLM_MODEL", "Applied environment override");
        config.llm.get_or_insert_with(Default::default).model = Some(model);
    }

    if let Some(raw) = lookup("MIN_RELEVANCE_SCORE") {
        let score = parse_env::<f32>("MIN_RELEVANCE_SCORE", &raw)?;
        let mut memory = config.memory();
        memory.min_relevance = score;
        config.memory = Some(memory);
    }

    if let Some(level) = lookup("LOG_LEVEL") {
        debug!(var = "LOG_LEVEL", "Applied environment override");
        let mut logging = config.logging();
        logging.level = level.to_lowercase();
        config.logging = Some(logging);
    }

    if let Some(raw) = lookup("SKILL_MAX_RETRIES") {
        let mut skills = config.skills();
        skills.max_retries = parse_env("SKILL_MAX_RETRIES", &raw)?;
        config.skills = Some(skills);
    }

    if let Some(raw) = lookup("SKILL_RETRY_DELAY") {
        let mut skills = config.skills();
        skills.retry_delay_secs = parse_env("SKILL_RETRY_DELAY", &raw)?;
        config.skills = Some(skills);
    }

    if let Some(raw) = lookup("SKILL_TIMEOUT") {
        let mut skills = config.skills();
        skills.timeout_secs = parse_env("SKILL_TIMEOUT", &raw)?;
        config.skills = Some(skills);
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T> {
    let value = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: raw.to_string(),
    })?;
    debug!(var, "Applied environment override");
    Ok(value)
}

/// Try to load a config file and merge it into the existing config.
///
/// A file that fails to parse is reported as a warning, not an error.
fn load_layer(config: &mut SkeinConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            debug!(path = %path.display(), "Loaded config layer");
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

/// Check for plaintext API keys in the config and emit warnings.
fn check_plaintext_keys(config: &SkeinConfig, warnings: &mut Vec<String>) {
    if let Some(ref llm) = config.llm
        && llm.has_plaintext_api_key()
    {
        warnings.push(
            "[llm] config contains a plaintext API key. \
             Consider using an environment variable instead."
                .to_string(),
        );
    }

    if let Some(ref embedding) = config.embedding
        && let Some(ref openai) = embedding.openai
        && openai.api_key.is_some()
    {
        warnings.push(
            "[embedding.openai] contains a plaintext API key. \
             Consider using an environment variable instead."
                .to_string(),
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
