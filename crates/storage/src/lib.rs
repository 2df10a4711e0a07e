//! Graph-backed storage for workspaces, projects, traces and spans
//!
//! Entities become labelled Neo4j nodes linked by ownership edges
//! (`Workspace -CONTAINS-> Project -HAS_TRACE-> Trace -HAS_SPAN-> Span`) plus
//! optional `Span -PARENT_OF-> Span` edges. All statements go through a
//! [`QueryGateway`] that scopes each operation to one transaction.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod batch;
pub mod error;
mod factory;
pub mod health;
pub mod hierarchy;
pub mod mapper;
pub mod merge;
mod mock;
pub mod neo4j;
pub mod property;
pub mod schema;
mod traits;

// Export factory functions
pub use factory::{create_and_initialize_graph_store, create_graph_store};

pub use error::{Result, StorageError};
pub use health::HealthStatus;
pub use hierarchy::{NodeLabel, RelType};
pub use mock::MockGraphStore;
pub use neo4j::{AccessMode, CypherQuery, Neo4jGraphStore, QueryGateway, RecordStream, Session};
pub use property::{PropertyMap, PropertyValue};
pub use schema::schema_statements;
pub use traits::{GraphAdmin, ProjectStore, SpanStore, TraceStore};

// ==== Traits ====

/// Everything a trace store offers
pub trait GraphStore: ProjectStore + TraceStore + SpanStore + GraphAdmin {}

// Implement GraphStore for any type that implements all four store traits
impl<T: ProjectStore + TraceStore + SpanStore + GraphAdmin> GraphStore for T {}
