//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, ConfigBuilder as LibConfigBuilder, Environment, File};
use std::path::Path;

use super::defaults::*;
use super::{global_config_path, Config};

/// Conventional Neo4j environment variables and the keys they override
const NEO4J_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("NEO4J_URI", "storage.neo4j_uri"),
    ("NEO4J_USER", "storage.neo4j_user"),
    ("NEO4J_PASSWORD", "storage.neo4j_password"),
    ("NEO4J_DATABASE", "storage.neo4j_database"),
];

/// Helper to set a config default with consistent error mapping
fn set_config_default<T: Into<config::Value>>(
    builder: LibConfigBuilder<config::builder::DefaultState>,
    key: &str,
    value: T,
) -> Result<LibConfigBuilder<config::builder::DefaultState>> {
    builder
        .set_default(key, value)
        .map_err(|e| Error::config(format!("Failed to set {key} default: {e}")))
}

impl Config {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `TRACEGRAPH_` and use double underscores
    /// for nested values. For example:
    /// - `TRACEGRAPH_STORAGE__FETCH_SIZE=500`
    ///
    /// `NEO4J_URI`, `NEO4J_USER`, `NEO4J_PASSWORD` and `NEO4J_DATABASE` take precedence
    /// over everything else.
    pub fn from_file(path: &Path) -> Result<Self> {
        let builder = ConfigLib::builder();

        // The config crate does not apply serde defaults for missing sections
        let builder = set_config_default(builder, "storage.provider", default_provider())?;
        let builder = set_config_default(builder, "storage.neo4j_uri", default_neo4j_uri())?;
        let builder = set_config_default(
            builder,
            "storage.max_connection_pool_size",
            default_max_connection_pool_size() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "storage.fetch_size",
            default_fetch_size() as i64,
        )?;
        let mut builder = set_config_default(
            builder,
            "storage.max_entities_per_db_operation",
            default_max_entities_per_db_operation() as i64,
        )?;

        if path.exists() {
            builder = builder.add_source(File::from(path));
        } else {
            tracing::debug!(
                "Config file {} not found, using defaults and environment",
                path.display()
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("TRACEGRAPH")
                .separator("__")
                .try_parsing(true),
        );

        for (var, key) in NEO4J_ENV_OVERRIDES {
            if let Ok(value) = std::env::var(var) {
                builder = builder
                    .set_override(*key, value)
                    .map_err(|e| Error::config(format!("Failed to set {var}: {e}")))?;
            }
        }

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from a single file
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. Config file (~/.tracegraph/config.toml or custom --config path)
    /// 3. Environment variables (TRACEGRAPH_*, then NEO4J_*)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => global_config_path()?,
        };
        Self::from_file(&path)
    }
}
