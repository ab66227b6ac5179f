//! Memory command - tiered memory operations.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use skein_memory::{MemoryRecord, MemoryTier};

use super::{Context, not_found, print_header, print_json, truncate};

/// Arguments for the memory command.
#[derive(Args, Debug)]
pub struct MemoryArgs {
    /// Collection to operate on (default: [memory] collection)
    #[arg(long, global = true)]
    pub collection: Option<String>,

    #[command(subcommand)]
    pub command: MemoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum MemoryCommand {
    /// Store text in memory
    Save {
        /// Text to store
        text: String,

        /// Store in long-term memory (no expiry)
        #[arg(long)]
        long_term: bool,

        /// Short-term lifetime in seconds
        #[arg(long, conflicts_with = "long_term")]
        ttl: Option<u64>,

        /// Key to store under (generated if omitted)
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Semantic search through memories
    Search {
        /// Search query
        query: String,

        /// Maximum results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum relevance score (0.0 - 1.0)
        #[arg(long)]
        min_relevance: Option<f32>,

        /// Restrict to one tier: short_term or long_term
        #[arg(long)]
        tier: Option<MemoryTier>,
    },

    /// Fetch a memory by key
    Get {
        /// Memory key
        key: String,
    },

    /// Remove a memory by key
    Remove {
        /// Memory key
        key: String,
    },

    /// List collections
    Collections,

    /// Show short-term and long-term counts
    Stats,
}

/// Run the memory command.
pub async fn run(args: MemoryArgs, ctx: &Context) -> Result<()> {
    let app = ctx.app()?;
    let collection = args.collection.unwrap_or_else(|| app.memory_collection());
    let store = &app.memory;
    let dim = Style::new().dim();

    match args.command {
        MemoryCommand::Save {
            text,
            long_term,
            ttl,
            key,
        } => {
            let record = MemoryRecord::new(key.unwrap_or_default(), text);
            let key = if long_term {
                store.save_long_term_memory(&collection, record).await?
            } else {
                store.save_short_term_memory(&collection, record, ttl).await?
            };
            if ctx.json_output {
                print_json(&serde_json::json!({ "key": key }))?;
            } else {
                println!("{} {}", Style::new().green().apply_to("Stored"), key);
            }
        }

        MemoryCommand::Search {
            query,
            limit,
            min_relevance,
            tier,
        } => {
            let defaults = app.config.memory();
            let hits = store
                .search_memory(
                    &collection,
                    &query,
                    limit.unwrap_or(defaults.search_limit),
                    min_relevance.unwrap_or(defaults.min_relevance),
                    tier,
                )
                .await?;

            if ctx.json_output {
                return print_json(&hits);
            }
            if ctx.verbose {
                println!("{}", dim.apply_to(format!("Searching \"{}\" in {}", query, collection)));
            }
            if hits.is_empty() {
                println!("{}", dim.apply_to("No results found"));
                return Ok(());
            }
            print_header("Memory Search Results");
            println!();
            for (i, hit) in hits.iter().enumerate() {
                let tier = hit.tier().map(|t| t.as_str()).unwrap_or("untagged");
                println!("{}. {}", style(i + 1).cyan(), truncate(&hit.text, 70));
                println!(
                    "   {}",
                    dim.apply_to(format!(
                        "{} · {} · score {:.3}",
                        hit.key,
                        tier,
                        hit.relevance.unwrap_or_default()
                    ))
                );
            }
        }

        MemoryCommand::Get { key } => {
            let Some(record) = store.get_memory(&collection, &key, false).await? else {
                return not_found("Memory", &key);
            };
            if ctx.json_output {
                return print_json(&record);
            }
            println!("{}", record.text);
            if ctx.verbose {
                println!("{}", dim.apply_to(serde_json::to_string(&record.metadata)?));
            }
        }

        MemoryCommand::Remove { key } => {
            store.remove_memory(&collection, &key).await?;
            if ctx.json_output {
                print_json(&serde_json::json!({ "removed": key }))?;
            } else {
                println!("{} {}", Style::new().green().apply_to("Removed"), key);
            }
        }

        MemoryCommand::Collections => {
            let collections = store.get_collections().await?;
            if ctx.json_output {
                return print_json(&collections);
            }
            for name in collections {
                println!("{}", name);
            }
        }

        MemoryCommand::Stats => {
            let stats = store.stats(&collection).await?;
            if ctx.json_output {
                return print_json(&stats);
            }
            print_header("Memory Statistics");
            println!();
            println!("  Collection:  {}", collection);
            println!("  Short-term:  {}", style(stats.short_term).cyan());
            println!("  Long-term:   {}", style(stats.long_term).cyan());
            println!("  Total:       {}", style(stats.total()).cyan());
        }
    }
    Ok(())
}
