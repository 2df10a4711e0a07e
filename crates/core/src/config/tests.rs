//! Tests for configuration module

use super::*;
use crate::error::{Error, Result};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn create_temp_config_file(content: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .map_err(|e| Error::config(format!("Failed to create temp file: {e}")))?;
    file.write_all(content.as_bytes())
        .map_err(|e| Error::config(format!("Failed to write temp file: {e}")))?;
    file.flush()
        .map_err(|e| Error::config(format!("Failed to flush temp file: {e}")))?;
    Ok(file)
}

#[test]
fn test_storage_defaults() {
    let config = StorageConfig::default();
    assert_eq!(config.provider, "neo4j");
    assert_eq!(config.neo4j_uri, "bolt://localhost:7687");
    assert_eq!(config.neo4j_user, "neo4j");
    assert_eq!(config.neo4j_database, "neo4j");
    assert_eq!(config.max_connection_pool_size, 50);
    assert_eq!(config.fetch_size, 200);
    assert_eq!(config.max_entities_per_db_operation, 1000);
    assert!(!config.encrypted);
    assert!(!config.dedupe_merged_tags);
}

#[test]
fn test_from_toml_str_valid() {
    let toml = r#"
        [storage]
        neo4j_uri = "bolt://graph.internal:7687"
        neo4j_password = "s3cret"
        max_connection_pool_size = 8
        dedupe_merged_tags = true
    "#;

    let config = Config::from_toml_str(toml).expect("Failed to parse valid TOML");
    assert_eq!(config.storage.neo4j_uri, "bolt://graph.internal:7687");
    assert_eq!(config.storage.neo4j_password, "s3cret");
    assert_eq!(config.storage.max_connection_pool_size, 8);
    assert!(config.storage.dedupe_merged_tags);
    // Unspecified keys keep their defaults
    assert_eq!(config.storage.transaction_timeout, "30s");
}

#[test]
fn test_from_toml_str_empty_uses_defaults() {
    let config = Config::from_toml_str("").expect("Failed to parse empty TOML");
    assert_eq!(config.storage.provider, "neo4j");
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_toml_str_invalid_syntax() {
    let result = Config::from_toml_str("[storage\nprovider = \"neo4j\"");
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Failed to parse TOML"));
}

#[test]
fn test_from_file_reads_values() -> Result<()> {
    let file = create_temp_config_file(
        r#"
        [storage]
        provider = "mock"
        fetch_size = 50
        "#,
    )?;

    let config = Config::from_file(file.path())?;
    assert_eq!(config.storage.provider, "mock");
    assert_eq!(config.storage.fetch_size, 50);
    assert_eq!(config.storage.neo4j_database, "neo4j");
    Ok(())
}

#[test]
fn test_from_file_missing_file_uses_defaults() -> Result<()> {
    let dir = tempfile::tempdir()
        .map_err(|e| Error::config(format!("Failed to create temp dir: {e}")))?;
    let config = Config::from_file(&dir.path().join("absent.toml"))?;
    assert_eq!(config.storage.max_connection_pool_size, 50);
    assert_eq!(config.storage.max_entities_per_db_operation, 1000);
    Ok(())
}

#[test]
fn test_validate_rejects_unknown_provider() {
    let mut config = Config::default();
    config.storage.provider = "cassandra".to_string();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Invalid storage provider"));
}

#[test]
fn test_validate_rejects_zero_bounds() {
    let mut config = Config::default();
    config.storage.max_connection_pool_size = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.storage.fetch_size = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.storage.max_entities_per_db_operation = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_bad_timeout() {
    let mut config = Config::default();
    config.storage.transaction_timeout = "soon".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_parse_duration_units() {
    assert_eq!(parse_duration("500ms").ok(), Some(Duration::from_millis(500)));
    assert_eq!(parse_duration("60s").ok(), Some(Duration::from_secs(60)));
    assert_eq!(parse_duration("1m").ok(), Some(Duration::from_secs(60)));
    assert_eq!(parse_duration("1h").ok(), Some(Duration::from_secs(3600)));
    assert_eq!(parse_duration(" 45 ").ok(), Some(Duration::from_secs(45)));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("-5s").is_err());
    assert!(parse_duration("10d").is_err());
}

#[test]
fn test_connection_uri_encryption() {
    let mut config = StorageConfig::default();
    assert_eq!(config.connection_uri(), "bolt://localhost:7687");

    config.encrypted = true;
    assert_eq!(config.connection_uri(), "bolt+s://localhost:7687");

    config.neo4j_uri = "neo4j://cluster:7687".to_string();
    assert_eq!(config.connection_uri(), "neo4j+s://cluster:7687");
}

#[test]
fn test_debug_redacts_password() {
    let mut config = StorageConfig::default();
    config.neo4j_password = "hunter2".to_string();
    let rendered = format!("{config:?}");
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("***REDACTED***"));
}
