//! Test utilities for storage layer tests

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::time::Duration as StdDuration;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tracegraph_core::{
    Project, ProjectBuilder, Span, SpanBuilder, StorageConfig, Trace, TraceBuilder, Workspace,
    WorkspaceBuilder,
};
use tracegraph_storage::{MockGraphStore, ProjectStore};
use uuid::Uuid;

/// Fixed base time so ordering assertions are deterministic
#[allow(dead_code)]
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn at(offset_secs: i64) -> DateTime<Utc> {
    base_time() + Duration::seconds(offset_secs)
}

/// Id unique to one test run
#[allow(dead_code)]
pub fn unique_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

#[allow(dead_code)]
pub fn test_workspace(id: &str) -> Workspace {
    WorkspaceBuilder::default()
        .id(id)
        .name(format!("workspace {id}"))
        .build()
        .expect("Failed to build test workspace")
}

#[allow(dead_code)]
pub fn test_project(id: &str, workspace_id: &str) -> Project {
    ProjectBuilder::default()
        .id(id)
        .workspace_id(workspace_id)
        .name(format!("project {id}"))
        .build()
        .expect("Failed to build test project")
}

#[allow(dead_code)]
pub fn test_trace(id: &str, project_id: &str, workspace_id: &str, start: DateTime<Utc>) -> Trace {
    TraceBuilder::default()
        .id(id)
        .project_id(project_id)
        .workspace_id(workspace_id)
        .name(format!("trace {id}"))
        .start_time(start)
        .build()
        .expect("Failed to build test trace")
}

#[allow(dead_code)]
pub fn test_span(
    id: &str,
    trace: &Trace,
    parent_span_id: Option<&str>,
    start: DateTime<Utc>,
) -> Span {
    let mut builder = SpanBuilder::default();
    builder
        .id(id)
        .trace_id(trace.id.as_str())
        .project_id(trace.project_id.as_str())
        .workspace_id(trace.workspace_id.as_str())
        .name(format!("span {id}"))
        .start_time(start);
    if let Some(parent) = parent_span_id {
        builder.parent_span_id(parent);
    }
    builder.build().expect("Failed to build test span")
}

/// Mock config with a small batch bound
#[allow(dead_code)]
pub fn mock_config(max_batch: usize) -> StorageConfig {
    StorageConfig {
        provider: "mock".to_string(),
        max_entities_per_db_operation: max_batch,
        ..StorageConfig::default()
    }
}

/// In-memory store holding workspace `w1` and project `p1`
#[allow(dead_code)]
pub async fn seeded_mock_store() -> Result<MockGraphStore> {
    let store = MockGraphStore::new(&mock_config(100));
    store.create_workspace(&test_workspace("w1")).await?;
    store.save_project(&test_project("p1", "w1")).await?;
    Ok(store)
}

/// Neo4j container for integration tests
#[allow(dead_code)]
pub struct TestNeo4j {
    container: ContainerAsync<GenericImage>,
    bolt_port: u16,
}

#[allow(dead_code)]
impl TestNeo4j {
    /// Starts Neo4j Community Edition with authentication disabled
    pub async fn start() -> Result<Self> {
        // with_wait_for must come before with_env_var, which turns the image
        // into a ContainerRequest
        let container = GenericImage::new("neo4j", "5-community")
            .with_exposed_port(ContainerPort::Tcp(7687))
            .with_wait_for(WaitFor::message_on_stdout("Started."))
            .with_env_var("NEO4J_AUTH", "none")
            .with_startup_timeout(StdDuration::from_secs(90))
            .start()
            .await
            .context("Failed to start Neo4j container")?;

        let bolt_port = container
            .get_host_port_ipv4(7687)
            .await
            .context("Failed to get Neo4j Bolt port")?;

        Ok(Self {
            container,
            bolt_port,
        })
    }

    pub fn bolt_url(&self) -> String {
        format!("bolt://localhost:{}", self.bolt_port)
    }

    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            provider: "neo4j".to_string(),
            neo4j_uri: self.bolt_url(),
            neo4j_user: String::new(),
            neo4j_password: String::new(),
            ..StorageConfig::default()
        }
    }
}
