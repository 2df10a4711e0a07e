//! Cypher statements used by the Neo4j store
//!
//! Reads return whole nodes as `properties(x)` under the entity's column name
//! so the matching decoder can be chosen statically.

use crate::hierarchy::{
    Ownership, PROJECT_TRACE, SPAN_PARENT, TRACE_SPAN, WORKSPACE_PROJECT,
};
use crate::merge::{ParamScope, TagRule, WritePlan, PROJECT_PLAN, SPAN_PLAN, TRACE_PLAN, WORKSPACE_PLAN};

pub const WORKSPACE_COLUMN: &str = "workspace";
pub const PROJECT_COLUMN: &str = "project";
pub const TRACE_COLUMN: &str = "trace";
pub const SPAN_COLUMN: &str = "span";

pub const HEALTH_CHECK: &str = "RETURN 1 AS result";

fn owned_create(plan: &WritePlan, ownership: &Ownership) -> String {
    format!(
        "{} {} {}",
        ownership.match_owner(ParamScope::Top),
        plan.render_create(ParamScope::Top),
        ownership.create_edge()
    )
}

fn owned_upsert(plan: &WritePlan, ownership: &Ownership) -> String {
    format!(
        "{} {} {}",
        ownership.match_owner(ParamScope::Top),
        plan.render_upsert(ParamScope::Top, TagRule::Replace),
        ownership.merge_edge()
    )
}

fn update_existing(plan: &WritePlan, tags: TagRule) -> String {
    format!(
        "MATCH ({a}:{label} {{id: $id}}) SET {sets} RETURN {a}.id AS id",
        a = plan.alias,
        label = plan.label,
        sets = plan.match_assignments(ParamScope::Top, tags)
    )
}

fn bulk_update(plan: &WritePlan, tags: TagRule) -> String {
    format!(
        "MATCH ({a}:{label}) WHERE {a}.id IN $ids SET {sets}",
        a = plan.alias,
        label = plan.label,
        sets = plan.match_assignments(ParamScope::Top, tags)
    )
}

// ==== Workspaces and projects ====

pub fn upsert_workspace() -> String {
    format!(
        "{} RETURN properties(w) AS {WORKSPACE_COLUMN}",
        WORKSPACE_PLAN.render_upsert(ParamScope::Top, TagRule::Replace)
    )
}

pub fn find_workspace() -> String {
    format!("MATCH (w:Workspace {{id: $id}}) RETURN properties(w) AS {WORKSPACE_COLUMN}")
}

pub fn save_project() -> String {
    format!(
        "{} RETURN properties(p) AS {PROJECT_COLUMN}",
        owned_upsert(&PROJECT_PLAN, &WORKSPACE_PROJECT)
    )
}

pub fn find_project() -> String {
    format!("MATCH (p:Project {{id: $id}}) RETURN properties(p) AS {PROJECT_COLUMN}")
}

pub fn find_projects_by_workspace() -> String {
    format!(
        "MATCH (p:Project) WHERE p.workspaceId = $workspaceId \
         WITH p ORDER BY p.name, p.id RETURN properties(p) AS {PROJECT_COLUMN}"
    )
}

pub const DELETE_PROJECT: &str = "MATCH (p:Project {id: $id}) DETACH DELETE p";

pub const COUNT_PROJECTS: &str =
    "MATCH (p:Project) WHERE p.workspaceId = $workspaceId RETURN count(p) AS total";

// ==== Traces ====

pub fn insert_trace() -> String {
    format!("{} RETURN t.id AS id", owned_create(&TRACE_PLAN, &PROJECT_TRACE))
}

pub fn upsert_trace() -> String {
    format!("{} RETURN t.id AS id", owned_upsert(&TRACE_PLAN, &PROJECT_TRACE))
}

pub fn update_trace() -> String {
    update_existing(&TRACE_PLAN, TagRule::Replace)
}

pub fn bulk_update_traces(tags: TagRule) -> String {
    bulk_update(&TRACE_PLAN, tags)
}

pub const DELETE_TRACES: &str = "MATCH (t:Trace) WHERE t.id IN $ids AND t.projectId = $projectId \
     WITH collect(t) AS doomed FOREACH (n IN doomed | DETACH DELETE n) \
     RETURN size(doomed) AS deleted";

pub fn find_trace() -> String {
    format!("MATCH (t:Trace {{id: $id}}) RETURN properties(t) AS {TRACE_COLUMN}")
}

pub fn find_traces_by_ids() -> String {
    format!(
        "MATCH (t:Trace) WHERE t.id IN $ids \
         WITH t ORDER BY t.startTime DESC, t.id RETURN properties(t) AS {TRACE_COLUMN}"
    )
}

pub fn find_traces_page() -> String {
    format!(
        "MATCH (t:Trace) WHERE t.projectId = $projectId \
         WITH t ORDER BY t.startTime DESC, t.id SKIP $skip LIMIT $limit \
         RETURN properties(t) AS {TRACE_COLUMN}"
    )
}

pub const COUNT_PROJECT_TRACES: &str =
    "MATCH (t:Trace) WHERE t.projectId = $projectId RETURN count(t) AS total";

pub fn search_traces() -> String {
    format!(
        "MATCH (t:Trace) WHERE t.projectId = $projectId \
         WITH t ORDER BY t.startTime DESC, t.id LIMIT $limit \
         RETURN properties(t) AS {TRACE_COLUMN}"
    )
}

pub const COUNT_TRACES: &str =
    "MATCH (t:Trace) WHERE t.projectId IN $projectIds RETURN count(t) AS total";

pub const TRACE_IDS_BY_THREAD: &str = "MATCH (t:Trace) \
     WHERE t.projectId = $projectId AND t.threadId IN $threadIds \
     WITH t ORDER BY t.id RETURN collect(t.id) AS ids";

pub const PROJECT_OF_TRACE: &str = "MATCH (t:Trace {id: $id}) RETURN t.projectId AS projectId";

pub const WORKSPACES_OF_TRACES: &str = "MATCH (t:Trace) WHERE t.id IN $ids \
     WITH t ORDER BY t.id RETURN t.id AS id, t.workspaceId AS workspaceId";

pub const EXISTING_TRACE_IDS: &str =
    "MATCH (t:Trace) WHERE t.id IN $ids RETURN t.id AS id LIMIT 1";

// ==== Spans ====

pub fn insert_span() -> String {
    format!(
        "{} {} RETURN s.id AS id",
        owned_create(&SPAN_PLAN, &TRACE_SPAN),
        SPAN_PARENT.link(&[])
    )
}

pub fn upsert_span() -> String {
    format!(
        "{} {} RETURN s.id AS id",
        owned_upsert(&SPAN_PLAN, &TRACE_SPAN),
        SPAN_PARENT.link(&[])
    )
}

pub fn update_span() -> String {
    update_existing(&SPAN_PLAN, TagRule::Replace)
}

pub fn bulk_update_spans(tags: TagRule) -> String {
    bulk_update(&SPAN_PLAN, tags)
}

pub const DELETE_SPANS_BY_TRACES: &str =
    "MATCH (s:Span) WHERE s.traceId IN $traceIds AND s.projectId = $projectId \
     WITH collect(s) AS doomed FOREACH (n IN doomed | DETACH DELETE n) \
     RETURN size(doomed) AS deleted";

pub fn find_span() -> String {
    format!("MATCH (s:Span {{id: $id}}) RETURN properties(s) AS {SPAN_COLUMN}")
}

pub fn find_span_in_project() -> String {
    format!(
        "MATCH (s:Span {{id: $id}}) WHERE s.projectId = $projectId \
         RETURN properties(s) AS {SPAN_COLUMN}"
    )
}

pub fn find_spans_by_ids() -> String {
    format!(
        "MATCH (s:Span) WHERE s.id IN $ids \
         WITH s ORDER BY s.startTime, s.id RETURN properties(s) AS {SPAN_COLUMN}"
    )
}

pub fn find_spans_by_trace() -> String {
    format!(
        "MATCH (s:Span) WHERE s.traceId = $traceId \
         WITH s ORDER BY s.startTime, s.id RETURN properties(s) AS {SPAN_COLUMN}"
    )
}

pub fn find_spans_by_trace_ids() -> String {
    format!(
        "MATCH (s:Span) WHERE s.traceId IN $traceIds \
         WITH s ORDER BY s.startTime, s.id RETURN properties(s) AS {SPAN_COLUMN}"
    )
}

pub fn find_child_spans() -> String {
    format!(
        "MATCH (:Span {{id: $parentSpanId}})-[:PARENT_OF]->(s:Span) \
         WITH s ORDER BY s.startTime, s.id RETURN properties(s) AS {SPAN_COLUMN}"
    )
}

pub fn find_spans_page() -> String {
    format!(
        "MATCH (s:Span) WHERE s.projectId = $projectId \
         AND ($traceId IS NULL OR s.traceId = $traceId) \
         WITH s ORDER BY s.startTime DESC, s.id SKIP $skip LIMIT $limit \
         RETURN properties(s) AS {SPAN_COLUMN}"
    )
}

pub fn search_spans() -> String {
    format!(
        "MATCH (s:Span) WHERE s.projectId = $projectId \
         WITH s ORDER BY s.startTime DESC, s.id LIMIT $limit \
         RETURN properties(s) AS {SPAN_COLUMN}"
    )
}

pub const COUNT_PROJECT_SPANS: &str = "MATCH (s:Span) WHERE s.projectId = $projectId \
     AND ($traceId IS NULL OR s.traceId = $traceId) RETURN count(s) AS total";

pub const SPAN_IDS_FOR_TRACES: &str = "MATCH (s:Span) WHERE s.traceId IN $traceIds \
     WITH s ORDER BY s.id RETURN collect(s.id) AS ids";

pub const PROJECT_OF_SPAN: &str = "MATCH (s:Span {id: $id}) RETURN s.projectId AS projectId";

pub const WORKSPACES_OF_SPANS: &str = "MATCH (s:Span) WHERE s.id IN $ids \
     WITH s ORDER BY s.id RETURN s.id AS id, s.workspaceId AS workspaceId";

pub const EXISTING_SPAN_IDS: &str = "MATCH (s:Span) WHERE s.id IN $ids RETURN s.id AS id LIMIT 1";
