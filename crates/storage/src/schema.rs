//! Schema registry: identity constraints and lookup indexes
//!
//! Every statement uses `IF NOT EXISTS`, so applying the registry again is a
//! no-op.

use crate::hierarchy::NodeLabel;
use crate::mapper::props::*;

/// Unique constraint on one property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub name: &'static str,
    pub label: NodeLabel,
    pub property: &'static str,
}

/// Range index on one or more properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupIndex {
    pub name: &'static str,
    pub label: NodeLabel,
    pub properties: &'static [&'static str],
}

pub const CONSTRAINTS: &[UniqueConstraint] = &[
    UniqueConstraint {
        name: "workspace_id_unique",
        label: NodeLabel::Workspace,
        property: ID,
    },
    UniqueConstraint {
        name: "project_id_unique",
        label: NodeLabel::Project,
        property: ID,
    },
    UniqueConstraint {
        name: "trace_id_unique",
        label: NodeLabel::Trace,
        property: ID,
    },
    UniqueConstraint {
        name: "span_id_unique",
        label: NodeLabel::Span,
        property: ID,
    },
];

pub const INDEXES: &[LookupIndex] = &[
    LookupIndex {
        name: "project_workspace_id",
        label: NodeLabel::Project,
        properties: &[WORKSPACE_ID],
    },
    LookupIndex {
        name: "trace_project_id",
        label: NodeLabel::Trace,
        properties: &[PROJECT_ID],
    },
    LookupIndex {
        name: "trace_workspace_id",
        label: NodeLabel::Trace,
        properties: &[WORKSPACE_ID],
    },
    LookupIndex {
        name: "trace_start_time",
        label: NodeLabel::Trace,
        properties: &[START_TIME],
    },
    LookupIndex {
        name: "trace_thread_id",
        label: NodeLabel::Trace,
        properties: &[THREAD_ID],
    },
    LookupIndex {
        name: "span_trace_id",
        label: NodeLabel::Span,
        properties: &[TRACE_ID],
    },
    LookupIndex {
        name: "span_project_id",
        label: NodeLabel::Span,
        properties: &[PROJECT_ID],
    },
    LookupIndex {
        name: "span_parent_span_id",
        label: NodeLabel::Span,
        properties: &[PARENT_SPAN_ID],
    },
    LookupIndex {
        name: "span_start_time",
        label: NodeLabel::Span,
        properties: &[START_TIME],
    },
    LookupIndex {
        name: "trace_project_start_time",
        label: NodeLabel::Trace,
        properties: &[PROJECT_ID, START_TIME],
    },
    LookupIndex {
        name: "span_trace_start_time",
        label: NodeLabel::Span,
        properties: &[TRACE_ID, START_TIME],
    },
    LookupIndex {
        name: "span_project_start_time",
        label: NodeLabel::Span,
        properties: &[PROJECT_ID, START_TIME],
    },
];

impl UniqueConstraint {
    pub fn statement(&self) -> String {
        format!(
            "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
            self.name, self.label, self.property
        )
    }
}

impl LookupIndex {
    pub fn statement(&self) -> String {
        let properties = self
            .properties
            .iter()
            .map(|p| format!("n.{p}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE INDEX {} IF NOT EXISTS FOR (n:{}) ON ({properties})",
            self.name, self.label
        )
    }
}

/// Bootstrap statements in application order: constraints, then indexes
pub fn schema_statements() -> Vec<String> {
    CONSTRAINTS
        .iter()
        .map(UniqueConstraint::statement)
        .chain(INDEXES.iter().map(LookupIndex::statement))
        .collect()
}
