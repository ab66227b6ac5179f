//! Knowledge command - GraphRAG store operations.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use skein_memory::{KnowledgeExport, MemoryRecord, Relationship};

use super::{Context, not_found, print_header, print_json, truncate};

/// Arguments for the knowledge command.
#[derive(Args, Debug)]
pub struct KnowledgeArgs {
    /// Collection to operate on (default: [knowledge] collection)
    #[arg(long, global = true)]
    pub collection: Option<String>,

    #[command(subcommand)]
    pub command: KnowledgeCommand,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeCommand {
    /// Add a knowledge entry with optional relationships
    Add {
        /// Entry text
        text: String,

        /// Key to store under (generated if omitted)
        #[arg(short, long)]
        key: Option<String>,

        /// Relationship to another entry (repeatable)
        #[arg(long = "rel", value_name = "TARGET:TYPE", value_parser = parse_relationship)]
        relationships: Vec<Relationship>,
    },

    /// Vector search with graph expansion
    Search {
        /// Search query
        query: String,

        /// Maximum results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum relevance score (0.0 - 1.0)
        #[arg(long)]
        min_relevance: Option<f32>,

        /// Skip graph expansion
        #[arg(long)]
        no_graph: bool,
    },

    /// Fetch an entry and its direct relationships
    Get {
        /// Entry key
        key: String,
    },

    /// Entries reachable from a key
    Related {
        /// Starting key
        key: String,

        /// Maximum hops
        #[arg(long)]
        max_distance: Option<usize>,

        /// Only follow these relationship types (repeatable)
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<String>,
    },

    /// Remove an entry and its graph node
    Remove {
        /// Entry key
        key: String,
    },

    /// Export the graph
    Export {
        /// networkx, graph, dict or json
        #[arg(short, long, default_value = "dict")]
        format: String,
    },
}

/// Parse `target:type`. The type is everything after the last colon.
fn parse_relationship(arg: &str) -> Result<Relationship, String> {
    match arg.rsplit_once(':') {
        Some((target, rel_type)) if !target.is_empty() && !rel_type.is_empty() => {
            Ok(Relationship::new(target, rel_type))
        }
        _ => Err(format!("expected TARGET:TYPE, got '{arg}'")),
    }
}

/// Run the knowledge command.
pub async fn run(args: KnowledgeArgs, ctx: &Context) -> Result<()> {
    let app = ctx.app()?;
    let collection = args
        .collection
        .unwrap_or_else(|| app.knowledge_collection());
    let store = &app.knowledge;
    let dim = Style::new().dim();

    match args.command {
        KnowledgeCommand::Add {
            text,
            key,
            relationships,
        } => {
            let record = MemoryRecord::new(key.unwrap_or_default(), text);
            let key = store
                .add_knowledge(&collection, record, &relationships)
                .await?;
            app.persist_graph()?;
            if ctx.json_output {
                print_json(&serde_json::json!({ "key": key }))?;
            } else {
                println!(
                    "{} {} {}",
                    Style::new().green().apply_to("Stored"),
                    key,
                    dim.apply_to(format!("({} relationships)", relationships.len()))
                );
            }
        }

        KnowledgeCommand::Search {
            query,
            limit,
            min_relevance,
            no_graph,
        } => {
            let defaults = app.config.memory();
            let hits = store
                .search_knowledge(
                    &collection,
                    &query,
                    limit.unwrap_or(defaults.search_limit),
                    min_relevance.unwrap_or(defaults.min_relevance),
                    !no_graph,
                )
                .await?;

            if ctx.json_output {
                return print_json(&hits);
            }
            if hits.is_empty() {
                println!("{}", dim.apply_to("No results found"));
                return Ok(());
            }
            print_header("Knowledge Search Results");
            println!();
            for (i, hit) in hits.iter().enumerate() {
                println!("{}. {}", style(i + 1).cyan(), truncate(&hit.record.text, 70));
                println!(
                    "   {}",
                    dim.apply_to(format!(
                        "{} · score {:.3}",
                        hit.record.key,
                        hit.record.relevance.unwrap_or_default()
                    ))
                );
                for related in &hit.related {
                    println!(
                        "   ↳ {} {}",
                        truncate(&related.text, 60),
                        dim.apply_to(format!("({}, {} hops)", related.id, related.distance))
                    );
                }
            }
        }

        KnowledgeCommand::Get { key } => {
            let Some(entry) = store.get_knowledge(&collection, &key, false, true).await? else {
                return not_found("Knowledge", &key);
            };
            if ctx.json_output {
                return print_json(&entry);
            }
            println!("{}", entry.record.text);
            if !entry.relations.is_empty() {
                println!();
                for relation in &entry.relations {
                    println!(
                        "  {} {} {}",
                        dim.apply_to(format!("-[{}]->", relation.relationship)),
                        relation.id,
                        dim.apply_to(truncate(&relation.text, 50))
                    );
                }
            }
        }

        KnowledgeCommand::Related {
            key,
            max_distance,
            types,
        } => {
            let max_distance = max_distance.unwrap_or(app.config.knowledge().max_distance);
            let filter = (!types.is_empty()).then_some(types.as_slice());
            let related = store.get_related_knowledge(&key, max_distance, filter);

            if ctx.json_output {
                return print_json(&related);
            }
            if related.is_empty() {
                println!("{}", dim.apply_to("Nothing related"));
                return Ok(());
            }
            for entry in &related {
                println!(
                    "  {} {} {}",
                    style(entry.distance).cyan(),
                    entry.id,
                    dim.apply_to(truncate(&entry.text, 60))
                );
            }
        }

        KnowledgeCommand::Remove { key } => {
            store.remove_knowledge(&collection, &key).await?;
            app.persist_graph()?;
            if ctx.json_output {
                print_json(&serde_json::json!({ "removed": key }))?;
            } else {
                println!("{} {}", Style::new().green().apply_to("Removed"), key);
            }
        }

        KnowledgeCommand::Export { format } => match store.export_knowledge_graph(&format)? {
            KnowledgeExport::Graph(graph) => print_json(&graph.to_node_link())?,
            KnowledgeExport::NodeLink(data) => print_json(&data)?,
            KnowledgeExport::Json(json) => println!("{}", json),
        },
    }
    Ok(())
}
