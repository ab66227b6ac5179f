//! CLI integration tests for the Skein command-line interface.
//!
//! Every test points `--config` at a file inside a temp directory so the
//! database, graph snapshot, workflows and logs never touch the real
//! user directories.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the skein binary.
fn skein() -> Command {
    let mut cmd = Command::cargo_bin("skein").unwrap();
    cmd.env_remove("SKEIN_LOG")
        .env_remove("SKEIN_CONFIG")
        .env_remove("LLM_MODEL")
        .env_remove("MIN_RELEVANCE_SCORE")
        .env_remove("LOG_LEVEL");
    cmd
}

/// A sandbox with its own config file.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("workflows")).unwrap();
        let config = format!(
            r#"
[memory]
backend = "sqlite"
database = "{db}"
min_relevance = 0.5

[knowledge]
graph_snapshot = "{graph}"

[workflows]
dir = "{workflows}"

[logging]
level = "warn"
dir = "{logs}"
"#,
            db = toml_path(&root.join("memory.db")),
            graph = toml_path(&root.join("graph.json")),
            workflows = toml_path(&root.join("workflows")),
            logs = toml_path(&root.join("logs")),
        );
        std::fs::write(root.join("skein.toml"), config).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = skein();
        cmd.arg("--config").arg(self.path().join("skein.toml"));
        cmd
    }

    fn write_workflow(&self, file: &str, content: &str) {
        std::fs::write(self.path().join("workflows").join(file), content).unwrap();
    }
}

fn toml_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

const DIGEST_WORKFLOW: &str = r#"
name = "digest"
description = "Summarize then title"

[parameters]
required = ["context"]

[[steps]]
name = "summarize"
skill = "SummarizationSkill"
function = "summarize_text"
parameters = { max_length = 40 }

[[steps]]
name = "title"
skill = "SummarizationSkill"
function = "generate_title"
"#;

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    skein()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Skein"))
        .stdout(predicate::str::contains("workflow"))
        .stdout(predicate::str::contains("skill"))
        .stdout(predicate::str::contains("memory"))
        .stdout(predicate::str::contains("knowledge"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    skein()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("skein"));
}

#[test]
fn test_unknown_subcommand_fails() {
    skein().arg("frobnicate").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Skills
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_skill_list_json() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["--json", "skill", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SummarizationSkill"))
        .stdout(predicate::str::contains("MemorySkill"))
        .stdout(predicate::str::contains("KnowledgeSkill"))
        .stdout(predicate::str::contains("CompletionSkill").not());
}

#[test]
fn test_skill_run_title() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args([
            "skill",
            "run",
            "SummarizationSkill",
            "generate_title",
            "--param",
            "context=ferris the crab",
            "--param",
            "style=creative",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ferris the crab"))
        .stdout(predicate::str::contains("catchy"));
}

#[test]
fn test_skill_run_unknown_function() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["skill", "run", "SummarizationSkill", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Workflows
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_workflow_list_and_run() {
    let sandbox = Sandbox::new();
    sandbox.write_workflow("digest.toml", DIGEST_WORKFLOW);

    sandbox
        .cmd()
        .args(["workflow", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("digest"));

    sandbox
        .cmd()
        .args(["--json", "workflow", "run", "digest", "--param", "context=Rust 2024 edition"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"completed\""))
        .stdout(predicate::str::contains("40 words"));
}

#[test]
fn test_workflow_missing_parameter() {
    let sandbox = Sandbox::new();
    sandbox.write_workflow("digest.toml", DIGEST_WORKFLOW);

    sandbox
        .cmd()
        .args(["workflow", "run", "digest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required parameters: context"));
}

#[test]
fn test_workflow_not_found() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["workflow", "run", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Workflow not found: nope"));
}

#[test]
fn test_workflow_validate() {
    let sandbox = Sandbox::new();
    let good = sandbox.path().join("good.toml");
    std::fs::write(&good, DIGEST_WORKFLOW).unwrap();
    sandbox
        .cmd()
        .args(["workflow", "validate"])
        .arg(&good)
        .assert()
        .success()
        .stdout(predicate::str::contains("digest"));

    let bad = sandbox.path().join("bad.json");
    std::fs::write(
        &bad,
        r#"{"name": "bad", "steps": [{"name": "s", "skill": "Ghost", "function": "boo"}]}"#,
    )
    .unwrap();
    sandbox
        .cmd()
        .args(["workflow", "validate"])
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown skill functions"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_memory_persists_between_runs() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["memory", "save", "the build cache lives in target", "--key", "cache", "--long-term"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["memory", "get", "cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("the build cache lives in target"));

    sandbox
        .cmd()
        .args(["--json", "memory", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"long_term\": 1"));

    sandbox
        .cmd()
        .args(["memory", "remove", "cache"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["memory", "get", "cache"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Memory not found: cache"));
}

#[test]
fn test_memory_rejects_bad_tier() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["memory", "search", "x", "--tier", "episodic"])
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Knowledge
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_knowledge_graph_survives_restart() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["knowledge", "add", "paper A", "--key", "a", "--rel", "b:cites"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["knowledge", "add", "paper B", "--key", "b"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["--json", "knowledge", "related", "a", "--type", "cites"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"b\""))
        .stdout(predicate::str::contains("\"distance\": 1"));

    sandbox
        .cmd()
        .args(["knowledge", "export", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"multigraph\":true"));
}

#[test]
fn test_knowledge_export_bad_format() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["knowledge", "export", "--format", "graphml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("graphml"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Verify and Config
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_verify_without_llm() {
    let sandbox = Sandbox::new();
    sandbox.write_workflow("digest.toml", DIGEST_WORKFLOW);
    sandbox
        .cmd()
        .args(["verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vector store"))
        .stdout(predicate::str::contains("1 loaded"));
}

#[test]
fn test_verify_reports_broken_workflow() {
    let sandbox = Sandbox::new();
    sandbox.write_workflow("broken.json", "{");
    sandbox.cmd().args(["verify"]).assert().failure();
}

#[test]
fn test_config_show_json() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["--json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"min_relevance\": 0.5"));
}
