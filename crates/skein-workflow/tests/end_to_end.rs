//! Workflows over the real built-in skills and an in-memory vector store.

use std::sync::Arc;

use serde_json::{Value, json};
use skein_llm::HashEmbedder;
use skein_memory::{InMemoryVectorStore, MemoryStore};
use skein_skills::{
    FnSkillFunction, MEMORY_SKILL, MemorySkill, Params, RecallDefaults, SUMMARIZATION_SKILL,
    SkillError, SkillRegistry, SummarizationSkill,
};
use skein_workflow::{
    ExecutionStatus, Step, WorkflowDefinition, WorkflowError, WorkflowLoader,
    WorkflowOrchestrator,
};

fn orchestrator() -> WorkflowOrchestrator {
    let vectors = Arc::new(InMemoryVectorStore::new(Arc::new(HashEmbedder::new(128))));
    let memory = Arc::new(MemoryStore::new(vectors));

    let mut registry = SkillRegistry::new();
    registry.register_skill(SummarizationSkill::new());
    registry.register_skill(MemorySkill::new(memory, RecallDefaults::new("semantic_memory")));
    registry.register_function(
        "Test",
        FnSkillFunction::new("fail", "always fails", |_p: Params| async move {
            Err(SkillError::Failed("B failed".into()))
        }),
    );
    WorkflowOrchestrator::new(Arc::new(registry))
}

fn params(value: Value) -> Params {
    value.as_object().cloned().unwrap()
}

fn digest() -> WorkflowDefinition {
    WorkflowDefinition::new(
        "digest",
        vec![
            Step::new("summarize", SUMMARIZATION_SKILL, "summarize_text").with_param("max_length", 50),
            Step::new("points", SUMMARIZATION_SKILL, "extract_key_points").with_param("num_points", 3),
            Step::new("title", SUMMARIZATION_SKILL, "generate_title").with_param("style", "academic"),
        ],
    )
    .with_required(&["context"])
}

#[tokio::test]
async fn n_steps_produce_n_results_in_order() {
    let orch = orchestrator();
    orch.register_workflow("digest", digest()).unwrap();

    let run = orch
        .execute_workflow("digest", params(json!({"context": "Rust workspaces share a lockfile."})))
        .await
        .unwrap();

    assert_eq!(run.status, ExecutionStatus::Completed);
    assert_eq!(run.results.len(), 3);
    for result in &run.results {
        assert!(result.as_str().unwrap().contains("Rust workspaces share a lockfile."));
    }
    assert!(run.results[0].as_str().unwrap().contains("50"));
    assert!(run.results[1].as_str().unwrap().contains('3'));
    assert!(run.results[2].as_str().unwrap().to_lowercase().contains("academic"));
}

#[tokio::test]
async fn failed_condition_truncates_without_error() {
    let orch = orchestrator();
    let wf = WorkflowDefinition::new(
        "guarded",
        vec![
            Step::new("summarize", SUMMARIZATION_SKILL, "summarize_text")
                .with_condition("contains", "this text never appears"),
            Step::new("title", SUMMARIZATION_SKILL, "generate_title"),
        ],
    );
    orch.register_workflow("guarded", wf).unwrap();

    let run = orch
        .execute_workflow("guarded", params(json!({"context": "hello"})))
        .await
        .unwrap();
    assert_eq!(run.results.len(), 1);
    assert!(matches!(run.status, ExecutionStatus::Stopped { step_index: 0, .. }));
}

#[tokio::test]
async fn unknown_workflow_is_not_found_and_registry_unchanged() {
    let orch = orchestrator();
    orch.register_workflow("digest", digest()).unwrap();

    let err = orch.execute_workflow("nope", Params::new()).await.unwrap_err();
    assert!(matches!(err, WorkflowError::WorkflowNotFound(ref n) if n == "nope"));
    assert_eq!(orch.list_workflows(), vec!["digest"]);
}

#[tokio::test]
async fn missing_parameters_are_all_named() {
    let orch = orchestrator();
    let wf = digest().with_required(&["context", "audience", "language"]);
    orch.register_workflow("digest", wf).unwrap();

    let err = orch
        .execute_workflow("digest", params(json!({"audience": "devs"})))
        .await
        .unwrap_err();
    match err {
        WorkflowError::MissingParameters { missing, .. } => {
            assert_eq!(missing, vec!["context", "language"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn reregistering_overwrites_entirely() {
    let orch = orchestrator();
    orch.register_workflow("digest", digest()).unwrap();

    let replacement = WorkflowDefinition::new(
        "digest",
        vec![Step::new("only", SUMMARIZATION_SKILL, "generate_title")],
    );
    orch.register_workflow("digest", replacement).unwrap();

    let status = orch.get_workflow_status("digest").unwrap();
    assert_eq!(status.step_count, 1);

    // The replacement declares no required parameters.
    let run = orch
        .execute_workflow("digest", params(json!({"context": "x"})))
        .await
        .unwrap();
    assert_eq!(run.results.len(), 1);
}

#[tokio::test]
async fn parallel_failure_returns_error_and_no_results() {
    let orch = orchestrator();
    let caller = params(json!({"context": "some text"}));
    let steps = vec![
        Step::new("A", SUMMARIZATION_SKILL, "generate_title"),
        Step::new("B", "Test", "fail"),
        Step::new("C", SUMMARIZATION_SKILL, "create_abstract"),
    ];

    let err = orch.run_parallel_steps(&steps, &caller).await.unwrap_err();
    assert!(matches!(err, WorkflowError::StepFailed { ref step, .. } if step == "B"));

    let ok = orch
        .run_parallel_steps(&[steps[0].clone(), steps[2].clone()], &caller)
        .await
        .unwrap();
    assert_eq!(ok.len(), 2);
    assert!(ok[0].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn memory_steps_feed_each_other() {
    let orch = orchestrator();
    let wf = WorkflowDefinition::new(
        "remember",
        vec![
            Step::new("save", MEMORY_SKILL, "save_long_term").with_param("key", "note-1"),
            Step::new("fetch", MEMORY_SKILL, "get").with_param("key", "note-1"),
        ],
    )
    .with_required(&["text"]);
    orch.register_workflow("remember", wf).unwrap();

    let run = orch
        .execute_workflow("remember", params(json!({"text": "standup moved to 10am"})))
        .await
        .unwrap();
    assert_eq!(run.results[0]["key"], "note-1");
    assert_eq!(run.results[1]["text"], "standup moved to 10am");
}

#[tokio::test]
async fn loads_directory_and_runs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("titles.toml"),
        r#"
name = "titles"
description = "Pick a title"

[parameters]
required = ["context"]

[[steps]]
name = "title"
skill = "SummarizationSkill"
function = "generate_title"
parameters = { style = "creative" }
"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("broken.json"), "{").unwrap();

    let orch = orchestrator();
    let events = orch.load_workflows(&WorkflowLoader::new(dir.path()));
    assert_eq!(events.len(), 2);
    assert_eq!(orch.list_workflows(), vec!["titles"]);

    let run = orch
        .execute_workflow("titles", params(json!({"context": "ferris"})))
        .await
        .unwrap();
    assert!(run.is_completed());
    assert_eq!(
        orch.get_workflow_status("titles").unwrap().description.as_deref(),
        Some("Pick a title")
    );
}
