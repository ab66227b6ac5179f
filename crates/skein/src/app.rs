//! Application wiring. Every command that touches storage, skills or
//! workflows builds one [`AppContext`] from the loaded configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use skein_config::{Backend, SkeinConfig, StoreBackend};
use skein_llm::{OpenAiConfig, SharedBackend, build_embedder, create_shared_backend};
use skein_memory::{
    InMemoryVectorStore, KnowledgeStore, MemoryStore, SharedVectorStore, SqliteVectorStore,
};
use skein_skills::{
    CompletionSkill, KnowledgeSkill, MemorySkill, RecallDefaults, SkillRegistry,
    SummarizationSkill,
};
use skein_workflow::{OrchestratorConfig, WorkflowEvent, WorkflowLoader, WorkflowOrchestrator};
use tracing::{debug, info, warn};

pub struct AppContext {
    pub config: SkeinConfig,
    pub memory: Arc<MemoryStore>,
    pub knowledge: Arc<KnowledgeStore>,
    pub orchestrator: WorkflowOrchestrator,
    pub llm: Option<SharedBackend>,
    pub workflow_dir: Option<PathBuf>,
    pub workflow_events: Vec<WorkflowEvent>,
    /// Graph snapshot path; only set when the vector store is persistent.
    pub snapshot_path: Option<PathBuf>,
}

impl AppContext {
    pub fn build(config: &SkeinConfig) -> Result<Self> {
        let memory_config = config.memory();
        let knowledge_config = config.knowledge();
        let workflows_config = config.workflows();

        let embedder = build_embedder(&config.embedding())
            .context("Failed to build embedder")?;

        let (vectors, snapshot_path): (SharedVectorStore, Option<PathBuf>) =
            match memory_config.backend {
                StoreBackend::Memory => (Arc::new(InMemoryVectorStore::new(embedder)), None),
                StoreBackend::Sqlite => {
                    let path = memory_config
                        .database_path()
                        .context("No data directory available for the memory database")?;
                    let store = SqliteVectorStore::open(&path, embedder)
                        .with_context(|| format!("Failed to open {}", path.display()))?;
                    (Arc::new(store), knowledge_config.snapshot_path())
                }
            };

        let memory = Arc::new(
            MemoryStore::new(vectors.clone()).with_default_ttl(memory_config.short_term_ttl_secs),
        );

        let knowledge = Arc::new(KnowledgeStore::new(vectors));
        if let Some(path) = &snapshot_path {
            knowledge
                .load_graph(path)
                .with_context(|| format!("Failed to load graph snapshot {}", path.display()))?;
        }

        let llm = build_llm(config);

        let mut skills = SkillRegistry::new();
        skills.register_skill(SummarizationSkill::new());
        skills.register_skill(MemorySkill::new(
            memory.clone(),
            RecallDefaults::new(&memory_config.collection)
                .with_limit(memory_config.search_limit)
                .with_min_relevance(memory_config.min_relevance),
        ));
        skills.register_skill(
            KnowledgeSkill::new(
                knowledge.clone(),
                RecallDefaults::new(&knowledge_config.collection)
                    .with_limit(memory_config.search_limit)
                    .with_min_relevance(memory_config.min_relevance),
            )
            .with_max_distance(knowledge_config.max_distance),
        );
        if let Some((backend, model, max_tokens)) = &llm {
            let mut skill = CompletionSkill::new(backend.clone(), model);
            if let Some(max_tokens) = max_tokens {
                skill = skill.with_max_tokens(*max_tokens);
            }
            skills.register_skill(skill);
        }

        let orchestrator = WorkflowOrchestrator::new(Arc::new(skills)).with_config(
            OrchestratorConfig {
                strict_conditions: workflows_config.strict_conditions,
            },
        );

        let workflow_dir = workflows_config
            .dir
            .clone()
            .or_else(skein_config::default_workflow_dir);
        let workflow_events = match &workflow_dir {
            Some(dir) => orchestrator.load_workflows(&WorkflowLoader::new(dir)),
            None => Vec::new(),
        };

        debug!(
            workflows = orchestrator.list_workflows().len(),
            llm = llm.is_some(),
            "Application context ready"
        );

        Ok(Self {
            config: config.clone(),
            memory,
            knowledge,
            orchestrator,
            llm: llm.map(|(backend, _, _)| backend),
            workflow_dir,
            workflow_events,
            snapshot_path,
        })
    }

    pub fn memory_collection(&self) -> String {
        self.config.memory().collection
    }

    pub fn knowledge_collection(&self) -> String {
        self.config.knowledge().collection
    }

    /// Write the graph snapshot after a knowledge mutation.
    pub fn persist_graph(&self) -> Result<()> {
        if let Some(path) = &self.snapshot_path {
            self.knowledge
                .save_graph(path)
                .with_context(|| format!("Failed to save graph snapshot {}", path.display()))?;
            debug!(path = %path.display(), "Graph snapshot saved");
        }
        Ok(())
    }
}

/// Construct the LLM backend, if one is configured and usable.
///
/// A configured backend that cannot be resolved (usually a missing API key)
/// is reported and skipped; only `CompletionSkill` depends on it.
fn build_llm(config: &SkeinConfig) -> Option<(SharedBackend, String, Option<u32>)> {
    config.llm.as_ref()?;
    let resolved = match skein_config::resolve_llm(config) {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!(error = %e, "LLM backend not available");
            return None;
        }
    };

    let skills = config.skills();
    let mut openai = OpenAiConfig::from_resolved(&resolved);
    if resolved.retry_max.is_none() {
        openai = openai
            .with_max_retries(skills.max_retries)
            .with_retry_backoff(Duration::from_secs(skills.retry_delay_secs));
    }
    if resolved.backend != Backend::Ollama {
        openai = openai.with_timeout(Duration::from_secs(skills.timeout_secs));
    }

    match create_shared_backend(openai) {
        Ok(backend) => {
            info!(backend = backend.name(), model = %resolved.model, "LLM backend ready");
            Some((backend, resolved.model, resolved.max_tokens))
        }
        Err(e) => {
            warn!(error = %e, "Failed to create LLM backend");
            None
        }
    }
}
