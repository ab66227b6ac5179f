//! Skill framework and registry.
//!
//! A [`Skill`] is a named group of [`SkillFunction`]s. The [`SkillRegistry`]
//! maps `(skill, function)` pairs to callables and is populated once at
//! startup; lookups of unknown names fail with [`SkillError::NotFound`].
//!
//! # Example
//!
//! ```rust,ignore
//! let mut registry = SkillRegistry::new();
//! registry.register_skill(SummarizationSkill::new());
//! registry.register_function(
//!     "Echo",
//!     FnSkillFunction::new("echo", "Return the params", |params| async move {
//!         Ok(Value::Object(params))
//!     }),
//! );
//!
//! let out = registry.invoke("Echo", "echo", params).await?;
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SkillError};
use crate::params::Params;

// ─────────────────────────────────────────────────────────────────────────────
// Traits
// ─────────────────────────────────────────────────────────────────────────────

/// A callable unit addressed by name within a skill.
#[async_trait]
pub trait SkillFunction: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn invoke(&self, params: Params) -> Result<Value>;
}

/// A shared skill function.
pub type SharedSkillFunction = Arc<dyn SkillFunction>;

/// A named collection of functions.
pub trait Skill {
    fn name(&self) -> &str;

    fn functions(&self) -> Vec<SharedSkillFunction>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Closure-backed functions
// ─────────────────────────────────────────────────────────────────────────────

type Handler = dyn Fn(Params) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// A [`SkillFunction`] backed by an async closure.
pub struct FnSkillFunction {
    name: String,
    description: String,
    handler: Box<Handler>,
}

impl FnSkillFunction {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            handler: Box::new(move |params| Box::pin(f(params))),
        }
    }
}

#[async_trait]
impl SkillFunction for FnSkillFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, params: Params) -> Result<Value> {
        (self.handler)(params).await
    }
}

impl std::fmt::Debug for FnSkillFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSkillFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Listing entry for one skill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillInfo {
    pub name: String,
    pub functions: Vec<FunctionInfo>,
}

/// Listing entry for one function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionInfo {
    pub name: String,
    pub description: String,
}

/// `(skill, function) -> callable` map, iterated in name order.
#[derive(Default, Clone)]
pub struct SkillRegistry {
    skills: BTreeMap<String, BTreeMap<String, SharedSkillFunction>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every function of a skill. Functions with the same name
    /// replace earlier ones.
    pub fn register_skill<S: Skill>(&mut self, skill: S) {
        let name = skill.name().to_string();
        for function in skill.functions() {
            self.register_arc(&name, function);
        }
        debug!(skill = %name, "Registered skill");
    }

    /// Register a single function under `skill`.
    pub fn register_function<F: SkillFunction + 'static>(&mut self, skill: &str, function: F) {
        self.register_arc(skill, Arc::new(function));
    }

    pub fn register_arc(&mut self, skill: &str, function: SharedSkillFunction) {
        self.skills
            .entry(skill.to_string())
            .or_default()
            .insert(function.name().to_string(), function);
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.contains_key(skill)
    }

    /// Look up a function.
    pub fn get(&self, skill: &str, function: &str) -> Option<SharedSkillFunction> {
        self.skills.get(skill)?.get(function).cloned()
    }

    /// Look up and invoke a function.
    pub async fn invoke(&self, skill: &str, function: &str, params: Params) -> Result<Value> {
        let callable = self.get(skill, function).ok_or_else(|| SkillError::NotFound {
            skill: skill.to_string(),
            function: function.to_string(),
        })?;
        debug!(skill, function, "Invoking skill function");
        callable.invoke(params).await
    }

    /// All skills and their functions, sorted by name.
    pub fn list(&self) -> Vec<SkillInfo> {
        self.skills
            .iter()
            .map(|(name, functions)| SkillInfo {
                name: name.clone(),
                functions: functions
                    .values()
                    .map(|f| FunctionInfo {
                        name: f.name().to_string(),
                        description: f.description().to_string(),
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.skills.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl std::fmt::Debug for SkillRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.skills
                    .iter()
                    .map(|(name, fns)| (name, fns.keys().collect::<Vec<_>>())),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo() -> FnSkillFunction {
        FnSkillFunction::new("echo", "Return the params", |params| async move {
            Ok(Value::Object(params))
        })
    }

    #[tokio::test]
    async fn test_register_and_invoke() {
        let mut registry = SkillRegistry::new();
        registry.register_function("Util", echo());

        let mut params = Params::new();
        params.insert("x".into(), json!(1));
        let out = registry.invoke("Util", "echo", params).await.unwrap();
        assert_eq!(out, json!({"x": 1}));
        assert!(registry.has_skill("Util"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_names_are_not_found() {
        let mut registry = SkillRegistry::new();
        registry.register_function("Util", echo());

        let err = registry.invoke("Util", "nope", Params::new()).await.unwrap_err();
        assert!(err.is_not_found());
        let err = registry.invoke("Nope", "echo", Params::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_sorted() {
        let mut registry = SkillRegistry::new();
        registry.register_function("B", echo());
        registry.register_function(
            "A",
            FnSkillFunction::new("zeta", "z", |_| async { Ok(Value::Null) }),
        );
        registry.register_function("A", echo());

        let listed = registry.list();
        assert_eq!(listed[0].name, "A");
        let names: Vec<_> = listed[0].functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "zeta"]);
        assert_eq!(listed[1].name, "B");
    }
}
