use crate::{mock::MockGraphStore, neo4j::Neo4jGraphStore, GraphAdmin, GraphStore};
use std::sync::Arc;
use tracegraph_core::{Error, StorageConfig};
use tracing::info;

/// Creates a graph store based on configuration.
///
/// Returns a trait object so callers work against Neo4j or the in-memory
/// store interchangeably.
///
/// # Errors
/// Returns an error if the provider is unknown or Neo4j cannot be reached
///
/// # Example
/// ```ignore
/// let config = StorageConfig::default();
/// let store = create_graph_store(&config).await?;
/// ```
pub async fn create_graph_store(config: &StorageConfig) -> Result<Arc<dyn GraphStore>, Error> {
    match config.provider.as_str() {
        "neo4j" => {
            let store = Neo4jGraphStore::new(config).await?;
            Ok(Arc::new(store) as Arc<dyn GraphStore>)
        }
        "mock" => {
            info!("Using in-memory graph store");
            Ok(Arc::new(MockGraphStore::new(config)) as Arc<dyn GraphStore>)
        }
        other => Err(Error::config(format!("Unknown storage provider '{other}'"))),
    }
}

/// Creates a graph store and applies the schema.
///
/// Equivalent to calling [`create_graph_store`] followed by `apply_schema()`.
///
/// # Errors
/// Returns an error if the store cannot be created or the schema cannot be applied
pub async fn create_and_initialize_graph_store(
    config: &StorageConfig,
) -> Result<Arc<dyn GraphStore>, Error> {
    let store = create_graph_store(config).await?;
    store.apply_schema().await?;
    Ok(store)
}
