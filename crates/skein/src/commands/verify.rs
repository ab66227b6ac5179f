//! Verify command - end-to-end health check of the configured setup.

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use serde::Serialize;
use skein_memory::{KnowledgeGraph, MemoryRecord};
use skein_workflow::WorkflowEvent;

use super::{Context, print_header, print_json};
use crate::app::AppContext;

const PROBE_COLLECTION: &str = "skein_verify";
const PROBE_KEY: &str = "skein-verify-probe";

/// Arguments for the verify command.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Skip the LLM backend health check
    #[arg(long)]
    pub skip_llm: bool,
}

#[derive(Debug, Serialize)]
struct Check {
    name: &'static str,
    ok: bool,
    detail: String,
}

impl Check {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: false,
            detail: detail.into(),
        }
    }
}

/// Run the verify command.
pub async fn run(args: VerifyArgs, ctx: &Context) -> Result<()> {
    let app = ctx.app()?;
    let mut checks = vec![check_vector_store(&app).await];
    checks.push(check_graph_snapshot(&app));
    checks.push(check_workflows(&app));
    if !args.skip_llm {
        checks.push(check_llm(&app).await);
    }

    if ctx.json_output {
        print_json(&checks)?;
    } else {
        let green = Style::new().green();
        let red = Style::new().red();
        let dim = Style::new().dim();
        print_header("Skein Verification");
        println!();
        for check in &checks {
            let mark = if check.ok {
                green.apply_to("✓")
            } else {
                red.apply_to("✗")
            };
            println!("  {} {:<16} {}", mark, check.name, dim.apply_to(&check.detail));
        }
    }

    let failed = checks.iter().filter(|c| !c.ok).count();
    if failed > 0 {
        bail!("{} verification check(s) failed", failed);
    }
    Ok(())
}

/// List collections, then write, read back and delete a probe record.
async fn check_vector_store(app: &AppContext) -> Check {
    const NAME: &str = "vector store";
    let vectors = app.memory.vectors();

    let collections = match vectors.list_collections().await {
        Ok(c) => c,
        Err(e) => return Check::fail(NAME, format!("list collections: {e}")),
    };

    let probe = MemoryRecord::new(PROBE_KEY, "skein verification probe");
    if let Err(e) = vectors.upsert(PROBE_COLLECTION, probe).await {
        return Check::fail(NAME, format!("write: {e}"));
    }
    let read_back = vectors.get(PROBE_COLLECTION, PROBE_KEY, false).await;
    let removed = vectors.remove(PROBE_COLLECTION, PROBE_KEY).await;

    match (read_back, removed) {
        (Ok(Some(record)), Ok(true)) if record.text == "skein verification probe" => Check::pass(
            NAME,
            format!("{} ({} collections)", vectors.name(), collections.len()),
        ),
        (Ok(_), Ok(_)) => Check::fail(NAME, "probe record did not round-trip"),
        (Err(e), _) | (_, Err(e)) => Check::fail(NAME, e.to_string()),
    }
}

fn check_graph_snapshot(app: &AppContext) -> Check {
    const NAME: &str = "graph snapshot";
    let Some(path) = &app.snapshot_path else {
        return Check::pass(NAME, "not persisted (in-memory store)");
    };
    if !path.exists() {
        return Check::pass(NAME, format!("{} (not created yet)", path.display()));
    }
    match KnowledgeGraph::load(path) {
        Ok(graph) => {
            let stats = graph.stats();
            Check::pass(
                NAME,
                format!(
                    "{} ({} nodes, {} edges)",
                    path.display(),
                    stats.node_count,
                    stats.edge_count
                ),
            )
        }
        Err(e) => Check::fail(NAME, format!("{}: {e}", path.display())),
    }
}

fn check_workflows(app: &AppContext) -> Check {
    const NAME: &str = "workflows";
    let Some(dir) = &app.workflow_dir else {
        return Check::pass(NAME, "no workflow directory configured");
    };
    let errors: Vec<String> = app
        .workflow_events
        .iter()
        .filter_map(|event| match event {
            WorkflowEvent::Error { path, error } => Some(format!("{}: {}", path.display(), error)),
            WorkflowEvent::Loaded { .. } => None,
        })
        .collect();
    if !errors.is_empty() {
        return Check::fail(NAME, errors.join("; "));
    }

    let unresolved: Vec<String> = app
        .orchestrator
        .list_workflows()
        .into_iter()
        .filter_map(|name| {
            let definition = app.orchestrator.get_workflow(&name)?;
            let steps = app.orchestrator.unresolved_steps(&definition);
            (!steps.is_empty()).then(|| format!("{}: {}", name, steps.join(", ")))
        })
        .collect();
    if !unresolved.is_empty() {
        return Check::fail(NAME, format!("unknown skill functions in {}", unresolved.join("; ")));
    }

    Check::pass(
        NAME,
        format!(
            "{} ({} loaded)",
            dir.display(),
            app.orchestrator.list_workflows().len()
        ),
    )
}

async fn check_llm(app: &AppContext) -> Check {
    const NAME: &str = "llm backend";
    if app.config.llm.is_none() {
        return Check::pass(NAME, "not configured");
    }
    let Some(backend) = &app.llm else {
        return Check::fail(NAME, "configured but could not be created (see log)");
    };
    match backend.health_check().await {
        Ok(()) => Check::pass(NAME, format!("{} ({})", backend.name(), backend.default_model())),
        Err(e) => Check::fail(NAME, format!("{}: {e}", backend.name())),
    }
}
