//! Neo4j implementation of the trace store

pub(crate) mod client;
pub(crate) mod gateway;
pub(crate) mod queries;

pub use client::Neo4jGraphStore;
pub use gateway::{ensure_read_only, AccessMode, CypherQuery, QueryGateway, RecordStream, Session};
