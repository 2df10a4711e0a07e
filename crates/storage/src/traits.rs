//! Store traits implemented by the Neo4j store and the in-memory store

use async_trait::async_trait;
use tracegraph_core::{
    Page, Project, Span, SpanUpdate, TagMergePolicy, Trace, TraceUpdate, Workspace,
};

use crate::error::Result;
use crate::health::HealthStatus;
use crate::neo4j::RecordStream;

/// Workspace and project persistence
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Creates the workspace if absent; an existing workspace keeps its creation time
    async fn create_workspace(&self, workspace: &Workspace) -> Result<Workspace>;

    async fn find_workspace_by_id(&self, id: &str) -> Result<Option<Workspace>>;

    /// Creates or updates a project under its workspace
    ///
    /// # Errors
    ///
    /// `MissingParent` when the workspace does not exist.
    async fn save_project(&self, project: &Project) -> Result<Project>;

    async fn find_project_by_id(&self, id: &str) -> Result<Option<Project>>;

    /// Projects of a workspace ordered by name
    fn find_projects_by_workspace(&self, workspace_id: &str) -> RecordStream<Project>;

    /// Removes the project node and its edges; traces are left in place
    async fn delete_project(&self, id: &str) -> Result<()>;

    async fn count_projects(&self, workspace_id: &str) -> Result<u64>;
}

/// Trace persistence
#[async_trait]
pub trait TraceStore: Send + Sync {
    /// Creates a trace under its project
    ///
    /// # Errors
    ///
    /// `IdentityConflict` when the id exists, `MissingParent` when the project
    /// does not.
    async fn insert_trace(&self, trace: &Trace) -> Result<String>;

    /// Creates the trace if absent, otherwise coalesces the supplied fields into it
    async fn upsert_trace(&self, project_id: &str, id: &str, update: &TraceUpdate) -> Result<()>;

    /// Coalesces the supplied fields into an existing trace
    ///
    /// # Returns
    ///
    /// Whether a trace with that id exists.
    async fn update_trace(&self, id: &str, update: &TraceUpdate) -> Result<bool>;

    /// Creates all traces in one transaction, or none of them
    async fn batch_insert_traces(&self, traces: &[Trace]) -> Result<u64>;

    /// Creates a trace and all of its spans in one transaction, or nothing
    ///
    /// Readers see either none of them or all of them.
    ///
    /// # Returns
    ///
    /// The number of spans written.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when a span names another trace, otherwise whatever
    /// [`insert_trace`](Self::insert_trace) or a span batch would report.
    async fn insert_trace_with_spans(&self, trace: &Trace, spans: &[Span]) -> Result<u64>;

    /// Applies one update to every listed trace
    async fn bulk_update_traces(
        &self,
        ids: &[String],
        update: &TraceUpdate,
        tags: TagMergePolicy,
    ) -> Result<()>;

    /// Deletes the listed traces of a project and their edges; spans are kept
    async fn delete_traces(&self, ids: &[String], project_id: &str) -> Result<u64>;

    async fn find_trace_by_id(&self, id: &str) -> Result<Option<Trace>>;

    /// Traces with the given ids, newest first
    fn find_traces_by_ids(&self, ids: Vec<String>) -> RecordStream<Trace>;

    /// One page of a project's traces, newest first
    async fn find_traces_by_project(&self, project_id: &str, page: u64, size: u64)
        -> Result<Page<Trace>>;

    /// Most recent traces of a project
    fn search_traces(&self, project_id: &str, limit: u64) -> RecordStream<Trace>;

    async fn count_traces(&self, project_ids: &[String]) -> Result<u64>;

    async fn trace_ids_by_thread_ids(
        &self,
        project_id: &str,
        thread_ids: &[String],
    ) -> Result<Vec<String>>;

    async fn project_id_of_trace(&self, id: &str) -> Result<Option<String>>;

    /// `(trace id, workspace id)` of every listed trace that exists, by trace id
    async fn workspace_ids_of_traces(&self, ids: &[String]) -> Result<Vec<(String, String)>>;
}

/// Span persistence
#[async_trait]
pub trait SpanStore: Send + Sync {
    /// Creates a span under its trace and links it to an existing parent span
    ///
    /// A parent span that does not exist yet is not an error; the span is stored
    /// without a `PARENT_OF` edge.
    async fn insert_span(&self, span: &Span) -> Result<String>;

    /// Creates the span if absent, otherwise coalesces the supplied fields into it
    ///
    /// The update must name its trace.
    async fn upsert_span(&self, project_id: &str, id: &str, update: &SpanUpdate) -> Result<()>;

    /// Coalesces the supplied fields into an existing span
    ///
    /// The trace and parent span of a stored span never change, so the
    /// `PARENT_OF` edge keeps agreeing with `parentSpanId`.
    async fn update_span(&self, id: &str, update: &SpanUpdate) -> Result<bool>;

    /// Creates all spans in one transaction, or none of them
    async fn batch_insert_spans(&self, spans: &[Span]) -> Result<u64>;

    /// Applies one update to every listed span
    async fn bulk_update_spans(
        &self,
        ids: &[String],
        update: &SpanUpdate,
        tags: TagMergePolicy,
    ) -> Result<()>;

    async fn delete_spans_by_trace_ids(&self, trace_ids: &[String], project_id: &str)
        -> Result<u64>;

    async fn find_span_by_id(&self, id: &str) -> Result<Option<Span>>;

    /// Like [`find_span_by_id`](Self::find_span_by_id), but only within one project
    async fn find_span_in_project(&self, id: &str, project_id: &str) -> Result<Option<Span>>;

    fn find_spans_by_ids(&self, ids: Vec<String>) -> RecordStream<Span>;

    /// Spans of one trace, earliest first
    fn find_spans_by_trace(&self, trace_id: &str) -> RecordStream<Span>;

    fn find_spans_by_trace_ids(&self, trace_ids: Vec<String>) -> RecordStream<Span>;

    /// Spans reachable over one `PARENT_OF` edge, earliest first
    fn find_child_spans(&self, parent_span_id: &str) -> RecordStream<Span>;

    async fn find_spans(
        &self,
        project_id: &str,
        trace_id: Option<&str>,
        page: u64,
        size: u64,
    ) -> Result<Page<Span>>;

    /// Most recent spans of a project
    fn search_spans(&self, project_id: &str, limit: u64) -> RecordStream<Span>;

    async fn span_ids_for_traces(&self, trace_ids: &[String]) -> Result<Vec<String>>;

    async fn project_id_of_span(&self, id: &str) -> Result<Option<String>>;

    /// `(span id, workspace id)` of every listed span that exists, by span id
    async fn workspace_ids_of_spans(&self, ids: &[String]) -> Result<Vec<(String, String)>>;
}

/// Schema bootstrap and liveness
#[async_trait]
pub trait GraphAdmin: Send + Sync {
    /// Applies every constraint and index; safe to repeat
    async fn apply_schema(&self) -> Result<()>;

    async fn health_check(&self) -> HealthStatus;
}
