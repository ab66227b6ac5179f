//! Skein - skills, workflows and GraphRAG memory for LLM applications
//!
//! Main entry point for the Skein CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod app;
mod commands;
mod logging;

use commands::{config, knowledge, memory, skill, verify, workflow};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Skein - skills, workflows and GraphRAG memory for LLM applications
#[derive(Parser)]
#[command(name = "skein")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Use this config file instead of discovering one
    #[arg(long, global = true, env = "SKEIN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run and inspect workflows
    Workflow(workflow::WorkflowArgs),

    /// List and invoke skill functions
    Skill(skill::SkillArgs),

    /// Short-term and long-term memory operations
    Memory(memory::MemoryArgs),

    /// Knowledge graph operations
    Knowledge(knowledge::KnowledgeArgs),

    /// Check storage, workflows and the LLM backend
    Verify(verify::VerifyArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => skein_config::load_explicit(path)?,
        None => skein_config::load_config(None)?,
    };

    // Held until exit so buffered file logs are flushed.
    let _guard = logging::init(&loaded.config.logging(), cli.verbose);

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        loaded,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Workflow(args) => workflow::run(args, &ctx).await,
        Commands::Skill(args) => skill::run(args, &ctx).await,
        Commands::Memory(args) => memory::run(args, &ctx).await,
        Commands::Knowledge(args) => knowledge::run(args, &ctx).await,
        Commands::Verify(args) => verify::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
