//! tracegraph CLI - graph store administration
//!
//! This binary applies the graph schema, checks store health and dumps stored
//! traces for inspection.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use tracegraph::storage_init::{create_graph_store_with_retry, initialize_schema};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use tracegraph_core::config::Config;
use tracegraph_storage::{schema_statements, GraphAdmin, SpanStore, TraceStore};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tracegraph")]
#[command(about = "Graph-backed storage for traces and spans")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply constraints and indexes to the graph database
    Schema {
        /// Print the statements instead of running them
        #[arg(long)]
        print: bool,
    },
    /// Check that the graph store answers queries
    Health,
    /// Print a stored trace and its spans as JSON
    Show {
        /// Trace id
        trace_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    match cli.command {
        Some(Commands::Schema { print: true }) => {
            for statement in schema_statements() {
                println!("{statement};");
            }
            Ok(())
        }
        Some(Commands::Schema { print: false }) => apply_schema(cli.config.as_deref()).await,
        Some(Commands::Health) => health(cli.config.as_deref()).await,
        Some(Commands::Show { trace_id }) => show_trace(cli.config.as_deref(), &trace_id).await,
        None => {
            println!("Run 'tracegraph schema' to prepare the database, or --help for more options");
            Ok(())
        }
    }
}

/// Initialize logging system
///
/// `RUST_LOG` takes precedence over the `--verbose` default.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tracegraph={level},tracegraph_storage={level},tracegraph_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    config.validate()?;
    debug!("Loaded configuration: {:?}", config.storage);
    Ok(config)
}

async fn apply_schema(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = create_graph_store_with_retry(&config.storage).await?;
    initialize_schema(store.as_ref()).await
}

async fn health(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = create_graph_store_with_retry(&config.storage).await?;
    let status = store.health_check().await;
    if !status.healthy {
        bail!("Graph store is unhealthy: {}", status.message);
    }
    info!("Graph store is healthy: {}", status.message);
    Ok(())
}

async fn show_trace(config_path: Option<&Path>, trace_id: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let store = create_graph_store_with_retry(&config.storage).await?;

    let Some(trace) = store.find_trace_by_id(trace_id).await? else {
        bail!("Trace {trace_id} not found");
    };
    let spans: Vec<_> = store
        .find_spans_by_trace(trace_id)
        .try_collect()
        .await
        .context("Failed to read spans")?;

    let output = serde_json::json!({
        "trace": trace,
        "spans": spans,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
