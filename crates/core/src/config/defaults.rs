//! Serde default values for configuration fields

pub(crate) fn default_provider() -> String {
    "neo4j".to_string()
}

pub(crate) fn default_neo4j_uri() -> String {
    "bolt://localhost:7687".to_string()
}

pub(crate) fn default_neo4j_user() -> String {
    "neo4j".to_string()
}

pub(crate) fn default_neo4j_password() -> String {
    "password".to_string()
}

pub(crate) fn default_neo4j_database() -> String {
    "neo4j".to_string()
}

pub(crate) fn default_max_connection_pool_size() -> usize {
    50
}

pub(crate) fn default_connection_acquisition_timeout() -> String {
    "60s".to_string()
}

pub(crate) fn default_transaction_timeout() -> String {
    "30s".to_string()
}

pub(crate) fn default_fetch_size() -> usize {
    200
}

pub(crate) fn default_read_retry_attempts() -> usize {
    2
}

/// Upper bound on entities written by a single batch statement
pub fn default_max_entities_per_db_operation() -> usize {
    1000
}
