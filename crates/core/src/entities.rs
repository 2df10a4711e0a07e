//! Domain entities persisted by the trace store
//!
//! Ownership is tree shaped: Workspace → Project → Trace → Span (→ Span ...).
//! Entities carry their owners' ids as plain fields; the storage layer keeps the
//! matching ownership edges in sync.

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};

/// Audit user recorded when a write does not name one
pub const DEFAULT_USER: &str = "admin";

/// Kind of work a span represents
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SpanType {
    #[default]
    General,
    Tool,
    Llm,
    Embedding,
    Guardrail,
}

/// Whether a trace is shown in default listings
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VisibilityMode {
    #[default]
    Default,
    Hidden,
}

/// How a bulk update combines supplied tags with stored ones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TagMergePolicy {
    /// Supplied tags replace the stored list; absent tags keep it
    #[default]
    Replace,
    /// Supplied tags are appended to the stored list
    Append,
}

/// Failure details attached to a trace or span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub exception_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub traceback: String,
}

/// Tenant root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[builder(default = "Utc::now()")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct Project {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    #[builder(setter(into, strip_option), default)]
    pub description: Option<String>,
    #[builder(default = "Utc::now()")]
    pub created_at: DateTime<Utc>,
    #[builder(default = "DEFAULT_USER.to_string()")]
    pub created_by: String,
    #[builder(default = "Utc::now()")]
    pub last_updated_at: DateTime<Utc>,
    #[builder(default = "DEFAULT_USER.to_string()")]
    pub last_updated_by: String,
}

/// One end-to-end execution, owned by a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct Trace {
    pub id: String,
    pub project_id: String,
    pub workspace_id: String,
    #[builder(default)]
    pub name: String,
    #[builder(default = "Utc::now()")]
    pub start_time: DateTime<Utc>,
    /// Absent while the trace is still open
    #[builder(setter(into, strip_option), default)]
    pub end_time: Option<DateTime<Utc>>,
    #[builder(setter(into, strip_option), default)]
    pub input: Option<Value>,
    #[builder(setter(into, strip_option), default)]
    pub output: Option<Value>,
    #[builder(setter(into, strip_option), default)]
    pub metadata: Option<Value>,
    #[builder(default)]
    pub tags: Vec<String>,
    #[builder(setter(into, strip_option), default)]
    pub thread_id: Option<String>,
    #[builder(setter(into, strip_option), default)]
    pub error_info: Option<ErrorInfo>,
    #[builder(default)]
    pub visibility_mode: VisibilityMode,
    #[builder(default = "Utc::now()")]
    pub created_at: DateTime<Utc>,
    #[builder(default = "DEFAULT_USER.to_string()")]
    pub created_by: String,
    #[builder(default = "Utc::now()")]
    pub last_updated_at: DateTime<Utc>,
    #[builder(default = "DEFAULT_USER.to_string()")]
    pub last_updated_by: String,
}

/// Partial trace write; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceUpdate {
    pub workspace_id: Option<String>,
    pub name: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub metadata: Option<Value>,
    pub tags: Option<Vec<String>>,
    pub thread_id: Option<String>,
    pub error_info: Option<ErrorInfo>,
    pub visibility_mode: Option<VisibilityMode>,
    pub created_by: Option<String>,
    pub last_updated_by: Option<String>,
}

/// One unit of work inside a trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct Span {
    pub id: String,
    pub trace_id: String,
    /// Enclosing span, if any
    #[builder(setter(into, strip_option), default)]
    pub parent_span_id: Option<String>,
    pub project_id: String,
    pub workspace_id: String,
    #[builder(default)]
    pub name: String,
    #[builder(default)]
    pub span_type: SpanType,
    #[builder(default = "Utc::now()")]
    pub start_time: DateTime<Utc>,
    #[builder(setter(into, strip_option), default)]
    pub end_time: Option<DateTime<Utc>>,
    #[builder(setter(into, strip_option), default)]
    pub input: Option<Value>,
    #[builder(setter(into, strip_option), default)]
    pub output: Option<Value>,
    #[builder(setter(into, strip_option), default)]
    pub metadata: Option<Value>,
    #[builder(setter(into, strip_option), default)]
    pub model: Option<String>,
    #[builder(setter(into, strip_option), default)]
    pub provider: Option<String>,
    #[builder(setter(into, strip_option), default)]
    pub total_estimated_cost: Option<f64>,
    #[builder(setter(into, strip_option), default)]
    pub usage: Option<Value>,
    #[builder(default)]
    pub tags: Vec<String>,
    #[builder(setter(into, strip_option), default)]
    pub error_info: Option<ErrorInfo>,
    #[builder(default = "Utc::now()")]
    pub created_at: DateTime<Utc>,
    #[builder(default = "DEFAULT_USER.to_string()")]
    pub created_by: String,
    #[builder(default = "Utc::now()")]
    pub last_updated_at: DateTime<Utc>,
    #[builder(default = "DEFAULT_USER.to_string()")]
    pub last_updated_by: String,
}

/// Partial span write; `None` leaves the stored value untouched
///
/// Upserts need `trace_id` to locate the owning trace. `trace_id` and
/// `parent_span_id` only take effect when the span is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanUpdate {
    pub trace_id: Option<String>,
    pub parent_span_id: Option<String>,
    pub workspace_id: Option<String>,
    pub name: Option<String>,
    pub span_type: Option<SpanType>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub metadata: Option<Value>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub total_estimated_cost: Option<f64>,
    pub usage: Option<Value>,
    pub tags: Option<Vec<String>>,
    pub error_info: Option<ErrorInfo>,
    pub created_by: Option<String>,
    pub last_updated_by: Option<String>,
}

/// One page of a listing; `page` is zero-based
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty(page: u64, size: u64) -> Self {
        Self {
            content: Vec::new(),
            page,
            size,
            total: 0,
        }
    }
}
