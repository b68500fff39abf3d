//! noderec CLI: node recommendations from workflow usage statistics.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use node_recommender::config::EngineConfig;
use node_recommender::engine::Engine;
use node_recommender::index::{Direction, RecommendationEntry};
use node_recommender::join::JoinedRow;
use node_recommender::node::NodeId;
use node_recommender::query::{Lookup, SourceRecommendations};
use node_recommender::workflow::WorkflowGraph;

#[derive(Parser)]
#[command(name = "noderec", version, about = "Node recommendations from workflow usage statistics")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = "noderec.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file.
    Init {
        /// Overwrite an existing config.
        #[arg(long)]
        force: bool,
    },

    /// List configured statistics sources.
    Sources,

    /// Recommend nodes per statistics source.
    Recommend(QueryArgs),

    /// Show the overall most used nodes per statistics source.
    Popular {
        /// Number of results per source.
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Recommend nodes with all sources side by side.
    Compare(QueryArgs),
}

#[derive(Args)]
struct QueryArgs {
    /// Node type id to recommend for. Omit to get workflow start nodes.
    #[arg(long, conflicts_with = "workflow")]
    node: Option<String>,

    /// Workflow JSON file giving the node its neighbors.
    #[arg(long, requires = "instance")]
    workflow: Option<PathBuf>,

    /// Node instance inside `--workflow`.
    #[arg(long)]
    instance: Option<u32>,

    /// Recommend predecessors instead of successors.
    #[arg(long)]
    predecessors: bool,

    /// Number of results (per source, or rows for `compare`).
    #[arg(long, default_value = "10")]
    limit: usize,

    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

impl QueryArgs {
    fn direction(&self) -> Direction {
        if self.predecessors {
            Direction::Predecessors
        } else {
            Direction::Successors
        }
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            if cli.config.exists() && !force {
                miette::bail!(
                    "{} already exists (use --force to overwrite)",
                    cli.config.display()
                );
            }
            EngineConfig::example().save(&cli.config)?;
            println!("Wrote starter config to {}", cli.config.display());
        }

        Commands::Sources => {
            let config = EngineConfig::load(&cli.config)?;
            let engine = Engine::from_config(&config);
            if engine.sources().is_empty() {
                println!("No statistics sources configured.");
            }
            for (source, entry) in engine.sources().iter().zip(&config.sources) {
                let state = if source.is_enabled() { "enabled" } else { "disabled" };
                println!("  {} [{}] {}", source.name(), state, entry.path.display());
            }
        }

        Commands::Recommend(args) => {
            let engine = load_engine(&cli.config)?;
            let Some(results) = query(&engine, &args)? else {
                return Ok(());
            };
            if args.json {
                let json = serde_json::to_string_pretty(&results).into_diagnostic()?;
                println!("{json}");
            } else {
                print_per_source(&results, args.limit);
            }
        }

        Commands::Popular { limit, json } => {
            let engine = load_engine(&cli.config)?;
            let Lookup::Loaded(results) = engine.most_frequently_used() else {
                print_not_loaded();
                return Ok(());
            };
            if json {
                let json = serde_json::to_string_pretty(&results).into_diagnostic()?;
                println!("{json}");
            } else {
                print_per_source(&results, limit);
            }
        }

        Commands::Compare(args) => {
            let engine = load_engine(&cli.config)?;
            let Some(results) = query(&engine, &args)? else {
                return Ok(());
            };
            let mut rows = engine.join(&results);
            rows.truncate(args.limit);
            if args.json {
                let json = serde_json::to_string_pretty(&rows).into_diagnostic()?;
                println!("{json}");
            } else {
                print_rows(&results, &rows);
            }
        }
    }

    Ok(())
}

fn load_engine(path: &Path) -> Result<Engine> {
    let config = EngineConfig::load(path)?;
    let engine = Engine::from_config(&config);
    engine.reload()?;
    Ok(engine)
}

/// Run the recommendation query; `None` (after telling the user) if nothing is loaded.
fn query(engine: &Engine, args: &QueryArgs) -> Result<Option<Vec<SourceRecommendations>>> {
    let lookup = match &args.workflow {
        Some(path) => {
            let workflow = WorkflowGraph::load(path)?;
            let selected = args
                .instance
                .map(|instance| workflow.instance(instance))
                .transpose()?;
            engine.recommend_in(&workflow, selected.as_slice(), args.direction())?
        }
        None => {
            let selected: Vec<NodeId> = args
                .node
                .iter()
                .map(|id| NodeId::from(id.as_str()))
                .collect();
            engine.recommend(&selected, args.direction())?
        }
    };
    match lookup {
        Lookup::Loaded(results) => Ok(Some(results)),
        Lookup::NotLoaded => {
            print_not_loaded();
            Ok(None)
        }
    }
}

fn print_not_loaded() {
    println!(
        "No recommendations available: every statistics source is disabled or failed to load."
    );
}

fn print_per_source(results: &[SourceRecommendations], limit: usize) {
    for result in results {
        println!("{} ({} candidates):", result.source, result.entries.len());
        if result.entries.is_empty() {
            println!("  (none)");
        }
        for (i, entry) in result.entries.iter().take(limit).enumerate() {
            println!(
                "  {}. {} {} ({:.1}%)",
                i + 1,
                entry.target_id,
                entry.frequency(),
                entry.share() * 100.0
            );
        }
    }
}

fn print_rows(results: &[SourceRecommendations], rows: &[JoinedRow<RecommendationEntry>]) {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|slot| match slot {
                    Some(entry) => format!("{} ({:.1}%)", entry.target_id, entry.share() * 100.0),
                    None => "-".to_string(),
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = results
        .iter()
        .enumerate()
        .map(|(col, result)| {
            cells
                .iter()
                .map(|row| row[col].len())
                .chain(std::iter::once(result.source.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = results
        .iter()
        .zip(&widths)
        .map(|(result, &width)| format!("{:<width$}", result.source))
        .collect();
    println!("{}", header.join("  "));
    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        println!("{}", line.join("  "));
    }
}
