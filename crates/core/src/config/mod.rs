//! Configuration module for the tracegraph system
//!
//! This module provides configuration structures and loading mechanisms for the
//! graph-backed trace store. Configuration can be loaded from TOML files and/or
//! environment variables.

mod defaults;
mod loading;
mod storage;

#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use defaults::default_max_entities_per_db_operation;
pub use storage::parse_duration;

use defaults::*;

/// Storage providers understood by the factory
pub const STORAGE_PROVIDERS: &[&str] = &["neo4j", "mock"];

/// Returns the path to the global configuration file
///
/// The global config is stored at `~/.tracegraph/config.toml`.
pub fn global_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| Error::config("Unable to determine home directory".to_string()))?;
    Ok(home_dir.join(".tracegraph").join("config.toml"))
}

/// Main configuration structure for the tracegraph system
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Configuration for the graph store and its connection pool
#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store implementation: "neo4j" or "mock"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Bolt connection string
    #[serde(default = "default_neo4j_uri")]
    pub neo4j_uri: String,

    /// Neo4j username
    #[serde(default = "default_neo4j_user")]
    pub neo4j_user: String,

    /// Neo4j password
    #[serde(default = "default_neo4j_password")]
    pub neo4j_password: String,

    /// Target database name
    #[serde(default = "default_neo4j_database")]
    pub neo4j_database: String,

    /// Use TLS (upgrades the URI scheme to its `+s` variant)
    #[serde(default)]
    pub encrypted: bool,

    /// Upper bound on pooled connections
    #[serde(default = "default_max_connection_pool_size")]
    pub max_connection_pool_size: usize,

    /// Bound on opening a session, e.g. "60s"
    #[serde(default = "default_connection_acquisition_timeout")]
    pub connection_acquisition_timeout: String,

    /// Bound on each statement and each streamed row fetch, e.g. "30s"
    #[serde(default = "default_transaction_timeout")]
    pub transaction_timeout: String,

    /// Rows requested per driver round trip; also the stream buffer size
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,

    /// Largest batch accepted by the batch ingestion path
    #[serde(default = "default_max_entities_per_db_operation")]
    pub max_entities_per_db_operation: usize,

    /// Additional attempts for single-result reads after a connectivity failure
    #[serde(default = "default_read_retry_attempts")]
    pub read_retry_attempts: usize,

    /// Drop duplicate tags when appending to a stored tag list
    #[serde(default)]
    pub dedupe_merged_tags: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            neo4j_uri: default_neo4j_uri(),
            neo4j_user: default_neo4j_user(),
            neo4j_password: default_neo4j_password(),
            neo4j_database: default_neo4j_database(),
            encrypted: false,
            max_connection_pool_size: default_max_connection_pool_size(),
            connection_acquisition_timeout: default_connection_acquisition_timeout(),
            transaction_timeout: default_transaction_timeout(),
            fetch_size: default_fetch_size(),
            max_entities_per_db_operation: default_max_entities_per_db_operation(),
            read_retry_attempts: default_read_retry_attempts(),
            dedupe_merged_tags: false,
        }
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("provider", &self.provider)
            .field("neo4j_uri", &self.neo4j_uri)
            .field("neo4j_user", &self.neo4j_user)
            .field("neo4j_password", &"***REDACTED***")
            .field("neo4j_database", &self.neo4j_database)
            .field("encrypted", &self.encrypted)
            .field("max_connection_pool_size", &self.max_connection_pool_size)
            .field(
                "connection_acquisition_timeout",
                &self.connection_acquisition_timeout,
            )
            .field("transaction_timeout", &self.transaction_timeout)
            .field("fetch_size", &self.fetch_size)
            .field(
                "max_entities_per_db_operation",
                &self.max_entities_per_db_operation,
            )
            .field("read_retry_attempts", &self.read_retry_attempts)
            .field("dedupe_merged_tags", &self.dedupe_merged_tags)
            .finish()
    }
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        let storage = &self.storage;

        if !STORAGE_PROVIDERS.contains(&storage.provider.as_str()) {
            return Err(Error::config(format!(
                "Invalid storage provider '{}'. Must be one of: {}",
                storage.provider,
                STORAGE_PROVIDERS.join(", ")
            )));
        }

        if storage.neo4j_uri.trim().is_empty() {
            return Err(Error::config("neo4j_uri must not be empty"));
        }

        if storage.max_connection_pool_size == 0 {
            return Err(Error::config(
                "max_connection_pool_size must be greater than 0",
            ));
        }

        if storage.fetch_size == 0 {
            return Err(Error::config("fetch_size must be greater than 0"));
        }

        if storage.max_entities_per_db_operation == 0 {
            return Err(Error::config(
                "max_entities_per_db_operation must be greater than 0",
            ));
        }

        storage.acquisition_timeout()?;
        storage.statement_timeout()?;

        Ok(())
    }
}
