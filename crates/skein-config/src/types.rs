//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [llm]          # completion backend
//! [embedding]    # embedding provider
//! [memory]       # vector store + tiered memory
//! [knowledge]    # knowledge graph collection and snapshot
//! [workflows]    # workflow definitions directory
//! [skills]       # skill execution limits
//! [logging]      # log level and file output
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application name used for platform directories.
pub const APP_NAME: &str = "skein";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeinConfig {
    /// Completion backend.
    pub llm: Option<LlmConfig>,

    /// Embedding provider configuration.
    pub embedding: Option<EmbeddingConfig>,

    /// Vector store and tiered memory configuration.
    pub memory: Option<MemoryConfig>,

    /// Knowledge store configuration.
    pub knowledge: Option<KnowledgeConfig>,

    /// Workflow loading and execution configuration.
    pub workflows: Option<WorkflowsConfig>,

    /// Skill execution configuration.
    pub skills: Option<SkillsConfig>,

    /// Log output configuration.
    pub logging: Option<LoggingConfig>,
}

impl SkeinConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Merging is section-wise: a section present in `other` replaces the
    /// whole section here.
    pub fn merge(&mut self, other: SkeinConfig) {
        if other.llm.is_some() {
            self.llm = other.llm;
        }

        if other.embedding.is_some() {
            self.embedding = other.embedding;
        }

        if other.memory.is_some() {
            self.memory = other.memory;
        }

        if other.knowledge.is_some() {
            self.knowledge = other.knowledge;
        }

        if other.workflows.is_some() {
            self.workflows = other.workflows;
        }

        if other.skills.is_some() {
            self.skills = other.skills;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Memory section, or defaults.
    pub fn memory(&self) -> MemoryConfig {
        self.memory.clone().unwrap_or_default()
    }

    /// Embedding section, or defaults.
    pub fn embedding(&self) -> EmbeddingConfig {
        self.embedding.clone().unwrap_or_default()
    }

    /// Knowledge section, or defaults.
    pub fn knowledge(&self) -> KnowledgeConfig {
        self.knowledge.clone().unwrap_or_default()
    }

    /// Workflows section, or defaults.
    pub fn workflows(&self) -> WorkflowsConfig {
        self.workflows.clone().unwrap_or_default()
    }

    /// Skills section, or defaults.
    pub fn skills(&self) -> SkillsConfig {
        self.skills.clone().unwrap_or_default()
    }

    /// Logging section, or defaults.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

/// Platform data directory for skein (`~/.local/share/skein` on Linux).
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Completion backend configuration.
///
/// ```toml
/// [llm]
/// backend = "openai"
/// model = "gpt-4o-mini"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend provider.
    pub backend: Option<Backend>,
    /// Model identifier.
    pub model: Option<String>,
    /// Custom API base URL (Azure deployments, proxies, Ollama).
    pub base_url: Option<String>,
    /// API key (prefer an env var; warns if set here).
    pub api_key: Option<String>,
    /// Maximum tokens to generate per completion.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum retry attempts for failed requests.
    pub retry_max: Option<u32>,
    /// Backoff delay between retries in milliseconds.
    pub retry_backoff_ms: Option<u64>,
}

impl LlmConfig {
    /// Returns true if an API key is stored directly in the config file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Get the environment variable name for this backend's API key.
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.env_var())
    }
}

/// Supported LLM backend providers.
///
/// All of them speak the OpenAI-compatible chat completions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Openai,
    Azure,
    Groq,
    Ollama,
    Custom,
}

impl Backend {
    /// Environment variable name for this backend's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            Backend::Openai => "OPENAI_API_KEY",
            Backend::Azure => "AZURE_OPENAI_API_KEY",
            Backend::Groq => "GROQ_API_KEY",
            Backend::Ollama => "OLLAMA_API_KEY",
            Backend::Custom => "LLM_API_KEY",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Openai => "OpenAI",
            Backend::Azure => "Azure OpenAI",
            Backend::Groq => "Groq",
            Backend::Ollama => "Ollama",
            Backend::Custom => "Custom",
        }
    }

    /// Whether requests to this backend need an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Backend::Ollama)
    }

    /// Default API base URL when none is configured.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Backend::Openai => Some("https://api.openai.com/v1"),
            Backend::Groq => Some("https://api.groq.com/openai/v1"),
            Backend::Ollama => Some("http://localhost:11434/v1"),
            Backend::Azure | Backend::Custom => None,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedding Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Embedding provider configuration.
///
/// ```toml
/// [embedding]
/// provider = "hash"        # "hash" or "openai"
/// dimensions = 384
///
/// [embedding.openai]
/// model = "text-embedding-3-small"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider: "hash" (local, offline) or "openai".
    pub provider: EmbeddingProvider,
    /// Output embedding dimensions. Default depends on provider.
    pub dimensions: Option<usize>,
    /// OpenAI-specific embedding settings.
    pub openai: Option<EmbeddingOpenAiConfig>,
}

impl EmbeddingConfig {
    /// Effective dimensions for the configured provider.
    pub fn effective_dimensions(&self) -> usize {
        if let Some(d) = self.dimensions {
            return d;
        }
        match self.provider {
            EmbeddingProvider::Hash => 384,
            EmbeddingProvider::OpenAi => self
                .openai
                .as_ref()
                .and_then(|c| c.dimensions)
                .unwrap_or(1536),
        }
    }
}

/// Supported embedding providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local feature-hashing embedder (default, offline).
    #[default]
    Hash,
    /// OpenAI embeddings API.
    OpenAi,
}

/// OpenAI embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingOpenAiConfig {
    /// Model name. Default: "text-embedding-3-small".
    pub model: String,
    /// Override dimensions (OpenAI supports reduced output).
    pub dimensions: Option<usize>,
    /// Custom base URL (for proxies).
    pub base_url: Option<String>,
    /// API key (prefer the OPENAI_API_KEY env var).
    pub api_key: Option<String>,
}

impl Default for EmbeddingOpenAiConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: None,
            base_url: None,
            api_key: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Vector store and tiered memory configuration.
///
/// ```toml
/// [memory]
/// backend = "sqlite"
/// database = "memory.db"
/// collection = "semantic_memory"
/// min_relevance = 0.7
/// short_term_ttl_secs = 3600
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Vector store backend.
    pub backend: StoreBackend,
    /// Path to the SQLite database. Relative paths resolve from the data directory.
    pub database: Option<PathBuf>,
    /// Default memory collection.
    pub collection: String,
    /// Minimum relevance score for search results (0.0–1.0).
    pub min_relevance: f32,
    /// Default short-term TTL in seconds.
    pub short_term_ttl_secs: u64,
    /// Default number of search results.
    pub search_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            database: None,
            collection: "semantic_memory".to_string(),
            min_relevance: 0.7,
            short_term_ttl_secs: 3600,
            search_limit: 5,
        }
    }
}

impl MemoryConfig {
    /// Resolve the database path against the platform data directory.
    pub fn database_path(&self) -> Option<PathBuf> {
        match &self.database {
            Some(p) if p.is_absolute() => Some(p.clone()),
            Some(p) => default_data_dir().map(|d| d.join(p)),
            None => default_data_dir().map(|d| d.join("memory.db")),
        }
    }
}

/// Vector store implementations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local, lost on exit.
    Memory,
    /// SQLite database file.
    #[default]
    Sqlite,
}

// ─────────────────────────────────────────────────────────────────────────────
// Knowledge Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Knowledge store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Vector collection backing knowledge entries.
    pub collection: String,
    /// Graph snapshot file. Relative paths resolve from the data directory.
    pub graph_snapshot: Option<PathBuf>,
    /// Default hop limit for related-entity queries.
    pub max_distance: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            collection: "semantic_knowledge".to_string(),
            graph_snapshot: None,
            max_distance: 2,
        }
    }
}

impl KnowledgeConfig {
    /// Resolve the graph snapshot path against the platform data directory.
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        match &self.graph_snapshot {
            Some(p) if p.is_absolute() => Some(p.clone()),
            Some(p) => default_data_dir().map(|d| d.join(p)),
            None => default_data_dir().map(|d| d.join("knowledge_graph.json")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Workflow Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Workflow loading and execution configuration.
///
/// ```toml
/// [workflows]
/// dir = "./workflows"
/// strict_conditions = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowsConfig {
    /// Directory containing workflow definitions (`*.json`, `*.toml`).
    /// Defaults to `<config dir>/workflows`.
    pub dir: Option<PathBuf>,
    /// Treat unknown `continue_if` keys as a failed condition.
    pub strict_conditions: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Skills Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Skill execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    /// Retries for capability calls made by skills.
    pub max_retries: u32,
    /// Delay before the first retry, in seconds.
    pub retry_delay_secs: u64,
    /// Per-call timeout for LLM-backed skills, in seconds.
    pub timeout_secs: u64,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_secs: 1,
            timeout_secs: 30,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `SKEIN_LOG` is unset.
    pub level: String,
    /// Directory for rolling JSON log files. Defaults to `<data dir>/logs`.
    pub dir: Option<PathBuf>,
    /// Log file name prefix.
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            file_name: "skein.log".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Resolve the log directory.
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.dir
            .clone()
            .or_else(|| default_data_dir().map(|d| d.join("logs")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
