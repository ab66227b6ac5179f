//! Workflow command - list, inspect, run and validate workflows.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::{Style, style};
use serde_json::Value;
use skein_workflow::{ExecutionStatus, WorkflowEvent, WorkflowLoader};

use super::{Context, params_from, parse_param, print_header, print_json, render_value};

/// Arguments for the workflow command.
#[derive(Args, Debug)]
pub struct WorkflowArgs {
    #[command(subcommand)]
    pub command: WorkflowCommand,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommand {
    /// List registered workflows
    List,

    /// Show a workflow's definition summary and last execution
    Status {
        /// Workflow name
        name: String,
    },

    /// Execute a workflow
    Run {
        /// Workflow name
        name: String,

        /// Workflow parameter (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },

    /// Parse and check a workflow file without registering it
    Validate {
        /// Path to a .json or .toml workflow file
        file: PathBuf,
    },
}

/// Run the workflow command.
pub async fn run(args: WorkflowArgs, ctx: &Context) -> Result<()> {
    match args.command {
        WorkflowCommand::List => cmd_list(ctx),
        WorkflowCommand::Status { name } => cmd_status(&name, ctx),
        WorkflowCommand::Run { name, params } => cmd_run(&name, params, ctx).await,
        WorkflowCommand::Validate { file } => cmd_validate(&file, ctx),
    }
}

fn cmd_list(ctx: &Context) -> Result<()> {
    let app = ctx.app()?;
    let statuses = app
        .orchestrator
        .list_workflows()
        .iter()
        .map(|name| app.orchestrator.get_workflow_status(name))
        .collect::<skein_workflow::Result<Vec<_>>>()?;

    if ctx.json_output {
        return print_json(&statuses);
    }

    let dim = Style::new().dim();
    print_header("Workflows");
    if let Some(dir) = &app.workflow_dir {
        println!("{}", dim.apply_to(format!("from {}", dir.display())));
    }
    println!();

    if statuses.is_empty() {
        println!("{}", dim.apply_to("No workflows registered"));
    }
    for status in &statuses {
        println!(
            "  {} {}",
            style(&status.name).cyan(),
            dim.apply_to(format!("({} steps)", status.step_count))
        );
        if let Some(description) = &status.description {
            println!("    {}", description);
        }
    }

    let red = Style::new().red();
    for event in &app.workflow_events {
        if let WorkflowEvent::Error { path, error } = event {
            println!();
            println!("  {} {}: {}", red.apply_to("✗"), path.display(), error);
        }
    }
    Ok(())
}

fn cmd_status(name: &str, ctx: &Context) -> Result<()> {
    let app = ctx.app()?;
    let status = app.orchestrator.get_workflow_status(name)?;

    if ctx.json_output {
        return print_json(&status);
    }

    let dim = Style::new().dim();
    print_header(&format!("Workflow: {}", status.name));
    println!();
    println!("  Steps:        {}", style(status.step_count).cyan());
    if let Some(version) = &status.version {
        println!("  Version:      {}", version);
    }
    if let Some(description) = &status.description {
        println!("  Description:  {}", description);
    }
    if let Some(definition) = app.orchestrator.get_workflow(name) {
        println!();
        for (i, step) in definition.steps.iter().enumerate() {
            println!(
                "  {}. {} {}",
                i + 1,
                step.name,
                dim.apply_to(format!("{}.{}", step.skill, step.function))
            );
        }
    }
    match &status.last_execution {
        Some(record) => {
            println!();
            println!("  Last run:     {}", serde_json::to_string(&record.state)?);
            println!("  Started:      {}", record.started_at.to_rfc3339());
        }
        None => println!("\n  {}", dim.apply_to("Not executed in this process")),
    }
    Ok(())
}

async fn cmd_run(name: &str, params: Vec<(String, Value)>, ctx: &Context) -> Result<()> {
    let app = ctx.app()?;
    let run = app
        .orchestrator
        .execute_workflow(name, params_from(params))
        .await?;

    if ctx.json_output {
        return print_json(&run);
    }

    let dim = Style::new().dim();
    let steps = app
        .orchestrator
        .get_workflow(name)
        .map(|d| d.steps.clone())
        .unwrap_or_default();

    for (i, result) in run.results.iter().enumerate() {
        let step = steps.get(i).map(|s| s.name.as_str()).unwrap_or("?");
        print_header(&format!("{}. {}", i + 1, step));
        println!("{}", render_value(result)?);
        println!();
    }

    match &run.status {
        ExecutionStatus::Completed => {
            println!("{}", Style::new().green().apply_to("✓ completed"));
        }
        ExecutionStatus::Stopped { step, .. } => {
            println!(
                "{} {}",
                Style::new().yellow().apply_to("■ stopped after"),
                step
            );
            println!("{}", dim.apply_to("continue_if condition was not met"));
        }
    }
    Ok(())
}

fn cmd_validate(file: &std::path::Path, ctx: &Context) -> Result<()> {
    let definition = WorkflowLoader::load_file(file)?;
    let app = ctx.app()?;
    let unresolved = app.orchestrator.unresolved_steps(&definition);

    if ctx.json_output {
        print_json(&serde_json::json!({
            "name": definition.name,
            "steps": definition.steps.len(),
            "unresolved_steps": unresolved,
        }))?;
    } else if unresolved.is_empty() {
        println!(
            "{} {} ({} steps)",
            Style::new().green().apply_to("✓"),
            definition.name,
            definition.steps.len()
        );
    }

    if !unresolved.is_empty() {
        bail!(
            "Workflow '{}' references unknown skill functions in steps: {}",
            definition.name,
            unresolved.join(", ")
        );
    }
    Ok(())
}
