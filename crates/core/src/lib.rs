//! Core types for the tracegraph trace store
//!
//! This crate provides the foundational pieces shared by the storage layer and
//! the CLI:
//!
//! - **Entities**: workspaces, projects, traces and spans plus their update deltas
//! - **Configuration**: connection and pool settings for the graph store
//! - **Error handling**: unified error types
//!

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod config;
pub mod entities;
pub mod error;

// Re-export main types for convenience
pub use config::{Config, StorageConfig};
pub use entities::{
    ErrorInfo, Page, Project, ProjectBuilder, Span, SpanBuilder, SpanType, SpanUpdate,
    TagMergePolicy, Trace, TraceBuilder, TraceUpdate, VisibilityMode, Workspace,
    WorkspaceBuilder, DEFAULT_USER,
};
pub use error::{Error, Result};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::entities::{Span, Trace};
    pub use crate::error::Result;
}
