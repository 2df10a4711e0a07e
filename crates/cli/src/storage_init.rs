//! Storage initialization helpers for the CLI
//!
//! Connecting to Neo4j right after it starts often fails for a few seconds,
//! so connection attempts are retried before giving up.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracegraph_core::config::StorageConfig;
use tracegraph_storage::{GraphAdmin, GraphStore};
use tracing::{info, warn};

/// Maximum number of connection attempts
const MAX_RETRIES: u32 = 3;

/// Delay between attempts in seconds
const RETRY_DELAY_SECS: u64 = 2;

/// Create the configured graph store, retrying failed connections
pub async fn create_graph_store_with_retry(config: &StorageConfig) -> Result<Arc<dyn GraphStore>> {
    let mut attempt = 0;

    loop {
        attempt += 1;

        match tracegraph_storage::create_graph_store(config).await {
            Ok(store) => {
                info!("Connected to {} graph store", config.provider);
                return Ok(store);
            }
            Err(e) if attempt < MAX_RETRIES => {
                warn!(
                    "Failed to connect to graph store (attempt {}/{}): {}",
                    attempt, MAX_RETRIES, e
                );
                info!("Retrying in {} seconds...", RETRY_DELAY_SECS);
                sleep(Duration::from_secs(RETRY_DELAY_SECS)).await;
            }
            Err(e) => {
                return Err(e).context(format!(
                    "Failed to connect to graph store after {MAX_RETRIES} attempts"
                ))
            }
        }
    }
}

/// Apply every constraint and index, failing with context
pub async fn initialize_schema(store: &dyn GraphStore) -> Result<()> {
    store
        .apply_schema()
        .await
        .context("Failed to apply graph schema")?;
    info!("Graph schema is up to date");
    Ok(())
}
