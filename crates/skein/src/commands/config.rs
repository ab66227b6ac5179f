//! Config command - configuration inspection and initialization.

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};
use console::{Style, style};
use skein_config::{
    KnowledgeConfig, LoggingConfig, MemoryConfig, SkeinConfig, WorkflowsConfig, save_config,
};

use super::{Context, print_json};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the merged configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./skein.toml) instead of user config
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { local, force } => cmd_init(local, force),
    }
}

/// The merged config with any plaintext API keys masked.
fn redacted(config: &SkeinConfig) -> SkeinConfig {
    let mut config = config.clone();
    if let Some(llm) = config.llm.as_mut()
        && llm.api_key.is_some()
    {
        llm.api_key = Some("********".to_string());
    }
    if let Some(openai) = config.embedding.as_mut().and_then(|e| e.openai.as_mut())
        && openai.api_key.is_some()
    {
        openai.api_key = Some("********".to_string());
    }
    config
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let config = redacted(&loaded.config);

    if ctx.json_output {
        return print_json(&config);
    }

    println!("{}", style("# Skein Configuration").bold());
    println!();
    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
    }
    println!();

    let memory = config.memory();
    println!("Memory:");
    println!("  backend:        {:?}", memory.backend);
    if let Some(path) = memory.database_path() {
        println!("  database:       {}", path.display());
    }
    println!("  collection:     {}", memory.collection);
    println!("  min relevance:  {}", memory.min_relevance);
    println!("  short-term ttl: {}s", memory.short_term_ttl_secs);
    println!();

    match skein_config::resolve_llm(&loaded.config) {
        Ok(llm) => {
            println!("LLM:");
            println!("  {} / {}", llm.backend.display_name(), llm.model);
            println!("  base url: {}", llm.base_url);
            println!("  api key:  {}", llm.api_key_source);
        }
        Err(e) => println!("LLM: {}", Style::new().dim().apply_to(e.to_string())),
    }
    println!();

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    println!("---");
    println!("{}", config.to_toml()?);
    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    if ctx.json_output {
        let sources: Vec<_> = ctx
            .loaded
            .sources
            .iter()
            .map(|s| serde_json::json!({ "path": s.path, "loaded": s.loaded }))
            .collect();
        return print_json(&sources);
    }

    println!("Config file search order (later overrides earlier):\n");
    for source in &ctx.loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }
    println!();
    let loaded_count = ctx.loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'skein config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }
    Ok(())
}

fn cmd_init(local: bool, force: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("skein.toml")
    } else {
        skein_config::xdg_config_path().context("No config directory available")?
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let config = SkeinConfig {
        memory: Some(MemoryConfig::default()),
        knowledge: Some(KnowledgeConfig::default()),
        workflows: Some(WorkflowsConfig::default()),
        logging: Some(LoggingConfig::default()),
        ..SkeinConfig::default()
    };
    save_config(&config, &path)?;
    println!("{} {}", Style::new().green().apply_to("Created"), path.display());
    Ok(())
}
