//! Memory and knowledge stores exposed as skills.

use std::sync::Arc;

use serde_json::{Value, json};
use skein_memory::{KnowledgeStore, MemoryRecord, MemoryStore, MemoryTier};

use crate::error::{Result, SkillError};
use crate::params::{ParamExt, Params};
use crate::registry::{FnSkillFunction, SharedSkillFunction, Skill};

pub const MEMORY_SKILL: &str = "MemorySkill";
pub const KNOWLEDGE_SKILL: &str = "KnowledgeSkill";

/// Search defaults shared by both skills.
#[derive(Debug, Clone, PartialEq)]
pub struct RecallDefaults {
    pub collection: String,
    pub limit: usize,
    pub min_relevance: f32,
}

impl RecallDefaults {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            limit: 5,
            min_relevance: 0.7,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_min_relevance(mut self, min_relevance: f32) -> Self {
        self.min_relevance = min_relevance;
        self
    }

    fn limit(&self, params: &Params) -> Result<usize> {
        Ok(params
            .optional_u64("limit")?
            .map(|n| n as usize)
            .unwrap_or(self.limit))
    }

    fn min_relevance(&self, params: &Params) -> Result<f32> {
        Ok(params
            .optional_f64("min_relevance")?
            .map(|n| n as f32)
            .unwrap_or(self.min_relevance))
    }

    fn collection<'a>(&'a self, params: &'a Params) -> Result<&'a str> {
        Ok(params
            .optional_str("collection")?
            .unwrap_or(&self.collection))
    }
}

fn record_from(params: &Params) -> Result<MemoryRecord> {
    let text = params.required_str("text", "the text to store")?;
    let key = params.optional_str("key")?.unwrap_or_default();
    let mut record = MemoryRecord::new(key, text);
    if let Some(meta) = params.get("metadata").filter(|v| !v.is_null()) {
        let Value::Object(map) = meta else {
            return Err(SkillError::invalid("metadata", "expected an object"));
        };
        record = record.with_metadata_map(map.clone());
    }
    Ok(record)
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Skill
// ─────────────────────────────────────────────────────────────────────────────

/// `save_short_term`, `save_long_term`, `search` and `get` over a [`MemoryStore`].
#[derive(Clone)]
pub struct MemorySkill {
    store: Arc<MemoryStore>,
    defaults: RecallDefaults,
}

impl MemorySkill {
    pub fn new(store: Arc<MemoryStore>, defaults: RecallDefaults) -> Self {
        Self { store, defaults }
    }
}

impl Skill for MemorySkill {
    fn name(&self) -> &str {
        MEMORY_SKILL
    }

    fn functions(&self) -> Vec<SharedSkillFunction> {
        let this = Arc::new(self.clone());
        let short = this.clone();
        let long = this.clone();
        let search = this.clone();
        let get = this;

        vec![
            Arc::new(FnSkillFunction::new(
                "save_short_term",
                "Store text in short-term memory (params: text, key?, ttl?, metadata?)",
                move |params| {
                    let this = short.clone();
                    async move {
                        let record = record_from(&params)?;
                        let ttl = params.optional_u64("ttl")?;
                        let collection = this.defaults.collection(&params)?;
                        let key = this.store.save_short_term_memory(collection, record, ttl).await?;
                        Ok(json!({ "key": key }))
                    }
                },
            )),
            Arc::new(FnSkillFunction::new(
                "save_long_term",
                "Store text in long-term memory (params: text, key?, metadata?)",
                move |params| {
                    let this = long.clone();
                    async move {
                        let record = record_from(&params)?;
                        let collection = this.defaults.collection(&params)?;
                        let key = this.store.save_long_term_memory(collection, record).await?;
                        Ok(json!({ "key": key }))
                    }
                },
            )),
            Arc::new(FnSkillFunction::new(
                "search",
                "Search memories by relevance (params: query, limit?, min_relevance?, memory_type?)",
                move |params| {
                    let this = search.clone();
                    async move {
                        let query = params.required_str("query", "what to look for")?;
                        let tier = params
                            .optional_str("memory_type")?
                            .map(str::parse::<MemoryTier>)
                            .transpose()?;
                        let hits = this
                            .store
                            .search_memory(
                                this.defaults.collection(&params)?,
                                query,
                                this.defaults.limit(&params)?,
                                this.defaults.min_relevance(&params)?,
                                tier,
                            )
                            .await?;
                        Ok(serde_json::to_value(hits)?)
                    }
                },
            )),
            Arc::new(FnSkillFunction::new(
                "get",
                "Fetch a memory by key (params: key)",
                move |params| {
                    let this = get.clone();
                    async move {
                        let key = params.required_str("key", "the memory key")?;
                        let record = this
                            .store
                            .get_memory(this.defaults.collection(&params)?, key, false)
                            .await?;
                        Ok(serde_json::to_value(record)?)
                    }
                },
            )),
        ]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Knowledge Skill
// ─────────────────────────────────────────────────────────────────────────────

/// `search` (GraphRAG) and `related` (graph-only) over a [`KnowledgeStore`].
#[derive(Clone)]
pub struct KnowledgeSkill {
    store: Arc<KnowledgeStore>,
    defaults: RecallDefaults,
    max_distance: usize,
}

impl KnowledgeSkill {
    pub fn new(store: Arc<KnowledgeStore>, defaults: RecallDefaults) -> Self {
        Self {
            store,
            defaults,
            max_distance: 2,
        }
    }

    pub fn with_max_distance(mut self, max_distance: usize) -> Self {
        self.max_distance = max_distance;
        self
    }
}

impl Skill for KnowledgeSkill {
    fn name(&self) -> &str {
        KNOWLEDGE_SKILL
    }

    fn functions(&self) -> Vec<SharedSkillFunction> {
        let this = Arc::new(self.clone());
        let search = this.clone();
        let related = this;

        vec![
            Arc::new(FnSkillFunction::new(
                "search",
                "Vector search with graph expansion (params: query, limit?, min_relevance?, use_graph?)",
                move |params| {
                    let this = search.clone();
                    async move {
                        let query = params.required_str("query", "what to look for")?;
                        let use_graph = params.optional_bool("use_graph")?.unwrap_or(true);
                        let hits = this
                            .store
                            .search_knowledge(
                                this.defaults.collection(&params)?,
                                query,
                                this.defaults.limit(&params)?,
                                this.defaults.min_relevance(&params)?,
                                use_graph,
                            )
                            .await?;
                        Ok(serde_json::to_value(hits)?)
                    }
                },
            )),
            Arc::new(FnSkillFunction::new(
                "related",
                "Knowledge reachable from a key (params: key, max_distance?, relationship_types?)",
                move |params| {
                    let this = related.clone();
                    async move {
                        let key = params.required_str("key", "the starting knowledge key")?;
                        let max_distance = params
                            .optional_u64("max_distance")?
                            .map(|n| n as usize)
                            .unwrap_or(this.max_distance);
                        let types = params.optional_str_list("relationship_types")?;
                        let related =
                            this.store
                                .get_related_knowledge(key, max_distance, types.as_deref());
                        Ok(serde_json::to_value(related)?)
                    }
                },
            )),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SkillRegistry;
    use skein_llm::HashEmbedder;
    use skein_memory::{InMemoryVectorStore, Relationship};

    fn vectors() -> Arc<InMemoryVectorStore> {
        Arc::new(InMemoryVectorStore::new(Arc::new(HashEmbedder::new(128))))
    }

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_memory_skill_round_trip() {
        let store = Arc::new(MemoryStore::new(vectors()));
        let mut registry = SkillRegistry::new();
        registry.register_skill(MemorySkill::new(store, RecallDefaults::new("mem")));

        let saved = registry
            .invoke(
                MEMORY_SKILL,
                "save_long_term",
                params(json!({"text": "the deploy runs at noon", "key": "deploy"})),
            )
            .await
            .unwrap();
        assert_eq!(saved["key"], "deploy");

        let hits = registry
            .invoke(
                MEMORY_SKILL,
                "search",
                params(json!({"query": "the deploy runs at noon", "min_relevance": 0.5, "memory_type": "long_term"})),
            )
            .await
            .unwrap();
        assert_eq!(hits[0]["key"], "deploy");

        let got = registry
            .invoke(MEMORY_SKILL, "get", params(json!({"key": "deploy"})))
            .await
            .unwrap();
        assert_eq!(got["text"], "the deploy runs at noon");
    }

    #[tokio::test]
    async fn test_memory_skill_rejects_bad_tier_and_ttl() {
        let store = Arc::new(MemoryStore::new(vectors()));
        let mut registry = SkillRegistry::new();
        registry.register_skill(MemorySkill::new(store, RecallDefaults::new("mem")));

        let err = registry
            .invoke(
                MEMORY_SKILL,
                "search",
                params(json!({"query": "x", "memory_type": "episodic"})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SkillError::Memory(ref e) if e.is_invalid_argument()));

        let err = registry
            .invoke(
                MEMORY_SKILL,
                "save_short_term",
                params(json!({"text": "x", "ttl": 0})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SkillError::Memory(_)));
    }

    #[tokio::test]
    async fn test_knowledge_skill_related() {
        let store = Arc::new(KnowledgeStore::new(vectors()));
        store
            .add_knowledge(
                "kb",
                MemoryRecord::new("a", "alpha"),
                &[Relationship::new("b", "cites")],
            )
            .await
            .unwrap();
        store
            .add_knowledge("kb", MemoryRecord::new("b", "beta"), &[])
            .await
            .unwrap();

        let mut registry = SkillRegistry::new();
        registry.register_skill(KnowledgeSkill::new(store, RecallDefaults::new("kb")));

        let related = registry
            .invoke(
                KNOWLEDGE_SKILL,
                "related",
                params(json!({"key": "a", "relationship_types": "cites"})),
            )
            .await
            .unwrap();
        assert_eq!(related[0]["id"], "b");
        assert_eq!(related[0]["distance"], 1);

        let hits = registry
            .invoke(
                KNOWLEDGE_SKILL,
                "search",
                params(json!({"query": "alpha", "min_relevance": 0.9})),
            )
            .await
            .unwrap();
        assert_eq!(hits[0]["record"]["key"], "a");
        assert_eq!(hits[0]["related"][0]["id"], "b");
    }
}
