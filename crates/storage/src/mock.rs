//! In-memory graph store
//!
//! Holds nodes and typed edges in process and applies the same write plans,
//! ownership rules and codecs as the Neo4j store. Every write works on a copy of
//! the graph and swaps it in only on success, so a failed write changes nothing.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use tracegraph_core::{
    Page, Project, Span, SpanUpdate, StorageConfig, TagMergePolicy, Trace, TraceUpdate, Workspace,
};
use tracing::debug;

use crate::batch::{check_batch_size, check_spans_of_trace, prepare_batch};
use crate::error::{Result, StorageError};
use crate::health::HealthStatus;
use crate::hierarchy::{
    NodeLabel, Ownership, RelType, PROJECT_TRACE, TRACE_SPAN, WORKSPACE_PROJECT,
};
use crate::mapper::{
    decode_project, decode_span, decode_trace, decode_workspace, encode_project, encode_span,
    encode_span_update, encode_timestamp, encode_trace, encode_trace_update, encode_workspace,
    props,
};
use crate::merge::{TagRule, WritePlan, PROJECT_PLAN, SPAN_PLAN, TRACE_PLAN, WORKSPACE_PLAN};
use crate::neo4j::RecordStream;
use crate::property::{PropertyMap, PropertyValue};
use crate::traits::{GraphAdmin, ProjectStore, SpanStore, TraceStore};

type NodeKey = (NodeLabel, String);

#[derive(Debug, Clone, Default)]
struct Graph {
    nodes: BTreeMap<NodeKey, PropertyMap>,
    edges: BTreeSet<(RelType, NodeKey, NodeKey)>,
}

fn key(label: NodeLabel, id: &str) -> NodeKey {
    (label, id.to_string())
}

fn text<'a>(node: &'a PropertyMap, property: &str) -> Option<&'a str> {
    node.get(property).and_then(PropertyValue::as_str)
}

impl Graph {
    fn node(&self, label: NodeLabel, id: &str) -> Option<&PropertyMap> {
        self.nodes.get(&key(label, id))
    }

    fn nodes_of(&self, label: NodeLabel) -> impl Iterator<Item = &PropertyMap> + '_ {
        self.nodes
            .iter()
            .filter(move |((l, _), _)| *l == label)
            .map(|(_, node)| node)
    }

    fn detach_delete(&mut self, label: NodeLabel, id: &str) -> bool {
        let target = key(label, id);
        if self.nodes.remove(&target).is_none() {
            return false;
        }
        self.edges
            .retain(|(_, from, to)| *from != target && *to != target);
        true
    }

    fn owner_of(&self, ownership: &Ownership, params: &PropertyMap) -> Option<PropertyMap> {
        text(params, ownership.owner_key)
            .and_then(|owner_id| self.node(ownership.owner, owner_id))
            .cloned()
    }

    fn missing_owner(&self, ownership: &Ownership, params: &PropertyMap, entity_id: &str) -> StorageError {
        StorageError::missing_parent(
            ownership.child.as_str(),
            entity_id,
            ownership.owner.as_str(),
            text(params, ownership.owner_key).unwrap_or_default(),
        )
    }

    /// Creates a node under its owner; the id must be new
    fn create_owned(
        &mut self,
        plan: &WritePlan,
        ownership: &Ownership,
        params: &PropertyMap,
        now: &str,
    ) -> Result<String> {
        let id = text(params, props::ID).unwrap_or_default().to_string();
        let owner = self
            .owner_of(ownership, params)
            .ok_or_else(|| self.missing_owner(ownership, params, &id))?;
        if self.node(plan.label, &id).is_some() {
            return Err(StorageError::IdentityConflict {
                entity: plan.label.as_str(),
                id,
            });
        }
        let node = plan.apply_create(params, Some(&owner), now);
        self.nodes.insert(key(plan.label, &id), node);
        let owner_id = text(&owner, props::ID).unwrap_or_default();
        self.edges.insert((
            ownership.rel,
            key(ownership.owner, owner_id),
            key(ownership.child, &id),
        ));
        Ok(id)
    }

    /// Creates the node under its owner or coalesces `params` into the stored one
    ///
    /// The ownership edge is only merged when the stored owner id matches.
    fn upsert_owned(
        &mut self,
        plan: &WritePlan,
        ownership: &Ownership,
        params: &PropertyMap,
        now: &str,
    ) -> Result<PropertyMap> {
        let id = text(params, props::ID).unwrap_or_default().to_string();
        let owner = self
            .owner_of(ownership, params)
            .ok_or_else(|| self.missing_owner(ownership, params, &id))?;
        let owner_id = text(&owner, props::ID).unwrap_or_default().to_string();

        let node_key = key(plan.label, &id);
        let node = match self.nodes.get_mut(&node_key) {
            Some(node) => {
                plan.apply_match(node, params, now, TagRule::Replace);
                node.clone()
            }
            None => {
                let node = plan.apply_create(params, Some(&owner), now);
                self.nodes.insert(node_key, node.clone());
                node
            }
        };
        if text(&node, ownership.owner_key) == Some(owner_id.as_str()) {
            self.edges.insert((
                ownership.rel,
                key(ownership.owner, &owner_id),
                key(ownership.child, &id),
            ));
        }
        Ok(node)
    }

    /// Links a span to its stored parent when that parent exists
    fn link_parent(&mut self, span_id: &str) {
        let Some(parent_id) = self
            .node(NodeLabel::Span, span_id)
            .and_then(|span| text(span, props::PARENT_SPAN_ID))
            .map(str::to_string)
        else {
            return;
        };
        let child = key(NodeLabel::Span, span_id);
        let already_linked = self
            .edges
            .iter()
            .any(|(rel, _, to)| *rel == RelType::ParentOf && *to == child);
        if parent_id == span_id || already_linked {
            return;
        }
        if self.node(NodeLabel::Span, &parent_id).is_none() {
            debug!("Parent span {parent_id} of {span_id} not stored yet, leaving it unlinked");
            return;
        }
        self.edges
            .insert((RelType::ParentOf, key(NodeLabel::Span, &parent_id), child));
    }

    /// Creates every span row under its trace, then links parents
    ///
    /// Parents inside the same batch resolve regardless of row order.
    fn create_spans(&mut self, rows: &[PropertyMap], now: &str) -> Result<u64> {
        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            created.push(self.create_owned(&SPAN_PLAN, &TRACE_SPAN, row, now)?);
        }
        for id in &created {
            self.link_parent(id);
        }
        Ok(created.len() as u64)
    }

    /// `(id, workspace id)` of the listed nodes that exist, by id
    fn workspace_pairs(&self, label: NodeLabel, ids: &[String]) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = ids
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|id| {
                let node = self.node(label, id)?;
                Some((id.clone(), text(node, props::WORKSPACE_ID)?.to_string()))
            })
            .collect();
        pairs.sort();
        pairs
    }

    fn update_existing(
        &mut self,
        plan: &WritePlan,
        id: &str,
        params: &PropertyMap,
        now: &str,
        tags: TagRule,
    ) -> bool {
        match self.nodes.get_mut(&key(plan.label, id)) {
            Some(node) => {
                plan.apply_match(node, params, now, tags);
                true
            }
            None => false,
        }
    }
}

fn now() -> String {
    encode_timestamp(&Utc::now())
}

fn stream_of<T: Send + 'static>(items: Result<Vec<T>>) -> RecordStream<T> {
    match items {
        Ok(items) => futures::stream::iter(items.into_iter().map(Ok)).boxed(),
        Err(e) => futures::stream::once(async move { Err(e) }).boxed(),
    }
}

fn newest_first_traces(mut traces: Vec<Trace>) -> Vec<Trace> {
    traces.sort_by(|a, b| {
        (Reverse(a.start_time), &a.id).cmp(&(Reverse(b.start_time), &b.id))
    });
    traces
}

fn earliest_first_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by(|a, b| (a.start_time, &a.id).cmp(&(b.start_time, &b.id)));
    spans
}

fn newest_first_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by(|a, b| (Reverse(a.start_time), &a.id).cmp(&(Reverse(b.start_time), &b.id)));
    spans
}

fn slice_page<T>(items: Vec<T>, page: u64, size: u64) -> Result<Page<T>> {
    if size == 0 {
        return Err(StorageError::InvalidInput("page size must be greater than 0".to_string()));
    }
    let total = items.len() as u64;
    let skip = page.saturating_mul(size);
    let content = items
        .into_iter()
        .skip(usize::try_from(skip).unwrap_or(usize::MAX))
        .take(usize::try_from(size).unwrap_or(usize::MAX))
        .collect();
    Ok(Page {
        content,
        page,
        size,
        total,
    })
}

/// Graph store kept in process memory
#[derive(Clone)]
pub struct MockGraphStore {
    graph: Arc<Mutex<Graph>>,
    dedupe_merged_tags: bool,
    max_batch_size: usize,
}

impl Default for MockGraphStore {
    fn default() -> Self {
        Self::new(&StorageConfig::default())
    }
}

impl MockGraphStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            graph: Arc::new(Mutex::new(Graph::default())),
            dedupe_merged_tags: config.dedupe_merged_tags,
            max_batch_size: config.max_entities_per_db_operation,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Graph>> {
        self.graph
            .lock()
            .map_err(|_| StorageError::BackendError("in-memory graph lock poisoned".to_string()))
    }

    /// Runs `write` against a copy of the graph and keeps the copy only on success
    fn transact<T>(&self, write: impl FnOnce(&mut Graph) -> Result<T>) -> Result<T> {
        let mut guard = self.lock()?;
        let mut draft = guard.clone();
        let value = write(&mut draft)?;
        *guard = draft;
        Ok(value)
    }

    fn read<T>(&self, read: impl FnOnce(&Graph) -> Result<T>) -> Result<T> {
        let guard = self.lock()?;
        read(&guard)
    }

    fn tag_rule(&self, policy: TagMergePolicy) -> TagRule {
        TagRule::new(policy, self.dedupe_merged_tags)
    }

    /// Whether an edge of type `rel` runs between the two ids
    pub fn edge_exists(&self, rel: RelType, from_id: &str, to_id: &str) -> bool {
        self.lock()
            .map(|graph| {
                graph.edges.iter().any(|(r, from, to)| {
                    *r == rel && from.1 == from_id && to.1 == to_id
                })
            })
            .unwrap_or(false)
    }

    /// Number of stored nodes carrying `label`
    pub fn node_count(&self, label: NodeLabel) -> usize {
        self.lock()
            .map(|graph| graph.nodes_of(label).count())
            .unwrap_or(0)
    }

    /// Number of stored edges of type `rel`
    pub fn edge_count(&self, rel: RelType) -> usize {
        self.lock()
            .map(|graph| graph.edges.iter().filter(|(r, _, _)| *r == rel).count())
            .unwrap_or(0)
    }

    fn traces_where(&self, keep: impl Fn(&PropertyMap) -> bool) -> Result<Vec<Trace>> {
        self.read(|graph| {
            graph
                .nodes_of(NodeLabel::Trace)
                .filter(|&node| keep(node))
                .map(decode_trace)
                .collect::<Result<Vec<_>>>()
                .map(newest_first_traces)
        })
    }

    fn spans_where(&self, keep: impl Fn(&PropertyMap) -> bool) -> Result<Vec<Span>> {
        self.read(|graph| {
            graph
                .nodes_of(NodeLabel::Span)
                .filter(|&node| keep(node))
                .map(decode_span)
                .collect::<Result<Vec<_>>>()
                .map(earliest_first_spans)
        })
    }
}

#[async_trait]
impl ProjectStore for MockGraphStore {
    async fn create_workspace(&self, workspace: &Workspace) -> Result<Workspace> {
        let params = WORKSPACE_PLAN.complete_params(encode_workspace(workspace));
        let now = now();
        let node = self.transact(|graph| {
            let node_key = key(NodeLabel::Workspace, &workspace.id);
            let node = match graph.nodes.get_mut(&node_key) {
                Some(node) => {
                    WORKSPACE_PLAN.apply_match(node, &params, &now, TagRule::Replace);
                    node.clone()
                }
                None => {
                    let node = WORKSPACE_PLAN.apply_create(&params, None, &now);
                    graph.nodes.insert(node_key, node.clone());
                    node
                }
            };
            Ok(node)
        })?;
        decode_workspace(&node)
    }

    async fn find_workspace_by_id(&self, id: &str) -> Result<Option<Workspace>> {
        self.read(|graph| graph.node(NodeLabel::Workspace, id).map(decode_workspace).transpose())
    }

    async fn save_project(&self, project: &Project) -> Result<Project> {
        let params = PROJECT_PLAN.complete_params(encode_project(project));
        let now = now();
        let node =
            self.transact(|graph| graph.upsert_owned(&PROJECT_PLAN, &WORKSPACE_PROJECT, &params, &now))?;
        decode_project(&node)
    }

    async fn find_project_by_id(&self, id: &str) -> Result<Option<Project>> {
        self.read(|graph| graph.node(NodeLabel::Project, id).map(decode_project).transpose())
    }

    fn find_projects_by_workspace(&self, workspace_id: &str) -> RecordStream<Project> {
        stream_of(self.read(|graph| {
            let mut projects = graph
                .nodes_of(NodeLabel::Project)
                .filter(|node| text(node, props::WORKSPACE_ID) == Some(workspace_id))
                .map(decode_project)
                .collect::<Result<Vec<_>>>()?;
            projects.sort_by(|a, b| (&a.name, &a.id).cmp(&(&b.name, &b.id)));
            Ok(projects)
        }))
    }

    async fn delete_project(&self, id: &str) -> Result<()> {
        self.transact(|graph| {
            graph.detach_delete(NodeLabel::Project, id);
            Ok(())
        })
    }

    async fn count_projects(&self, workspace_id: &str) -> Result<u64> {
        self.read(|graph| {
            Ok(graph
                .nodes_of(NodeLabel::Project)
                .filter(|node| text(node, props::WORKSPACE_ID) == Some(workspace_id))
                .count() as u64)
        })
    }
}

#[async_trait]
impl TraceStore for MockGraphStore {
    async fn insert_trace(&self, trace: &Trace) -> Result<String> {
        let params = TRACE_PLAN.complete_params(encode_trace(trace)?);
        let now = now();
        self.transact(|graph| graph.create_owned(&TRACE_PLAN, &PROJECT_TRACE, &params, &now))
    }

    async fn upsert_trace(&self, project_id: &str, id: &str, update: &TraceUpdate) -> Result<()> {
        let params = TRACE_PLAN.complete_params(encode_trace_update(id, project_id, update)?);
        let now = now();
        self.transact(|graph| graph.upsert_owned(&TRACE_PLAN, &PROJECT_TRACE, &params, &now))?;
        Ok(())
    }

    async fn update_trace(&self, id: &str, update: &TraceUpdate) -> Result<bool> {
        let params = TRACE_PLAN.complete_params(encode_trace_update(id, "", update)?);
        let now = now();
        self.transact(|graph| Ok(graph.update_existing(&TRACE_PLAN, id, &params, &now, TagRule::Replace)))
    }

    async fn batch_insert_traces(&self, traces: &[Trace]) -> Result<u64> {
        if traces.is_empty() {
            return Ok(0);
        }
        check_batch_size(traces.len(), self.max_batch_size)?;
        let rows = traces.iter().map(encode_trace).collect::<Result<Vec<_>>>()?;
        let batch = prepare_batch(&TRACE_PLAN, &PROJECT_TRACE, None, rows)?;
        let now = now();
        self.transact(|graph| {
            for row in &batch.rows {
                graph.create_owned(&TRACE_PLAN, &PROJECT_TRACE, row, &now)?;
            }
            Ok(batch.rows.len() as u64)
        })
    }

    async fn insert_trace_with_spans(&self, trace: &Trace, spans: &[Span]) -> Result<u64> {
        check_spans_of_trace(trace, spans)?;
        check_batch_size(spans.len(), self.max_batch_size)?;
        let params = TRACE_PLAN.complete_params(encode_trace(trace)?);
        let rows = spans.iter().map(encode_span).collect::<Result<Vec<_>>>()?;
        let batch = prepare_batch(&SPAN_PLAN, &TRACE_SPAN, None, rows)?;
        let now = now();
        self.transact(|graph| {
            graph.create_owned(&TRACE_PLAN, &PROJECT_TRACE, &params, &now)?;
            graph.create_spans(&batch.rows, &now)
        })
    }

    async fn bulk_update_traces(
        &self,
        ids: &[String],
        update: &TraceUpdate,
        tags: TagMergePolicy,
    ) -> Result<()> {
        let params = TRACE_PLAN.complete_params(encode_trace_update("", "", update)?);
        let rule = self.tag_rule(tags);
        let now = now();
        self.transact(|graph| {
            for id in ids {
                graph.update_existing(&TRACE_PLAN, id, &params, &now, rule);
            }
            Ok(())
        })
    }

    async fn delete_traces(&self, ids: &[String], project_id: &str) -> Result<u64> {
        self.transact(|graph| {
            let doomed: Vec<String> = ids
                .iter()
                .filter(|id| {
                    graph
                        .node(NodeLabel::Trace, id)
                        .is_some_and(|node| text(node, props::PROJECT_ID) == Some(project_id))
                })
                .cloned()
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            for id in &doomed {
                graph.detach_delete(NodeLabel::Trace, id);
            }
            Ok(doomed.len() as u64)
        })
    }

    async fn find_trace_by_id(&self, id: &str) -> Result<Option<Trace>> {
        self.read(|graph| graph.node(NodeLabel::Trace, id).map(decode_trace).transpose())
    }

    fn find_traces_by_ids(&self, ids: Vec<String>) -> RecordStream<Trace> {
        stream_of(self.traces_where(|node| {
            text(node, props::ID).is_some_and(|id| ids.iter().any(|wanted| wanted == id))
        }))
    }

    async fn find_traces_by_project(
        &self,
        project_id: &str,
        page: u64,
        size: u64,
    ) -> Result<Page<Trace>> {
        let traces = self.traces_where(|node| text(node, props::PROJECT_ID) == Some(project_id))?;
        slice_page(traces, page, size)
    }

    fn search_traces(&self, project_id: &str, limit: u64) -> RecordStream<Trace> {
        stream_of(
            self.traces_where(|node| text(node, props::PROJECT_ID) == Some(project_id))
                .map(|traces| {
                    traces
                        .into_iter()
                        .take(usize::try_from(limit).unwrap_or(usize::MAX))
                        .collect()
                }),
        )
    }

    async fn count_traces(&self, project_ids: &[String]) -> Result<u64> {
        self.read(|graph| {
            Ok(graph
                .nodes_of(NodeLabel::Trace)
                .filter(|node| {
                    text(node, props::PROJECT_ID)
                        .is_some_and(|p| project_ids.iter().any(|wanted| wanted == p))
                })
                .count() as u64)
        })
    }

    async fn trace_ids_by_thread_ids(
        &self,
        project_id: &str,
        thread_ids: &[String],
    ) -> Result<Vec<String>> {
        self.read(|graph| {
            let mut ids: Vec<String> = graph
                .nodes_of(NodeLabel::Trace)
                .filter(|node| text(node, props::PROJECT_ID) == Some(project_id))
                .filter(|node| {
                    text(node, props::THREAD_ID)
                        .is_some_and(|t| thread_ids.iter().any(|wanted| wanted == t))
                })
                .filter_map(|node| text(node, props::ID).map(str::to_string))
                .collect();
            ids.sort();
            Ok(ids)
        })
    }

    async fn project_id_of_trace(&self, id: &str) -> Result<Option<String>> {
        self.read(|graph| {
            Ok(graph
                .node(NodeLabel::Trace, id)
                .and_then(|node| text(node, props::PROJECT_ID))
                .map(str::to_string))
        })
    }

    async fn workspace_ids_of_traces(&self, ids: &[String]) -> Result<Vec<(String, String)>> {
        self.read(|graph| Ok(graph.workspace_pairs(NodeLabel::Trace, ids)))
    }
}

#[async_trait]
impl SpanStore for MockGraphStore {
    async fn insert_span(&self, span: &Span) -> Result<String> {
        let params = SPAN_PLAN.complete_params(encode_span(span)?);
        let now = now();
        self.transact(|graph| {
            let id = graph.create_owned(&SPAN_PLAN, &TRACE_SPAN, &params, &now)?;
            graph.link_parent(&id);
            Ok(id)
        })
    }

    async fn upsert_span(&self, project_id: &str, id: &str, update: &SpanUpdate) -> Result<()> {
        if update.trace_id.is_none() {
            return Err(StorageError::InvalidInput(format!(
                "upsert of span {id} does not name its trace"
            )));
        }
        let params = SPAN_PLAN.complete_params(encode_span_update(id, project_id, update)?);
        let now = now();
        self.transact(|graph| {
            graph.upsert_owned(&SPAN_PLAN, &TRACE_SPAN, &params, &now)?;
            graph.link_parent(id);
            Ok(())
        })
    }

    async fn update_span(&self, id: &str, update: &SpanUpdate) -> Result<bool> {
        let params = SPAN_PLAN.complete_params(encode_span_update(id, "", update)?);
        let now = now();
        self.transact(|graph| Ok(graph.update_existing(&SPAN_PLAN, id, &params, &now, TagRule::Replace)))
    }

    async fn batch_insert_spans(&self, spans: &[Span]) -> Result<u64> {
        if spans.is_empty() {
            return Ok(0);
        }
        check_batch_size(spans.len(), self.max_batch_size)?;
        let rows = spans.iter().map(encode_span).collect::<Result<Vec<_>>>()?;
        let batch = prepare_batch(&SPAN_PLAN, &TRACE_SPAN, None, rows)?;
        let now = now();
        self.transact(|graph| graph.create_spans(&batch.rows, &now))
    }

    async fn bulk_update_spans(
        &self,
        ids: &[String],
        update: &SpanUpdate,
        tags: TagMergePolicy,
    ) -> Result<()> {
        let params = SPAN_PLAN.complete_params(encode_span_update("", "", update)?);
        let rule = self.tag_rule(tags);
        let now = now();
        self.transact(|graph| {
            for id in ids {
                graph.update_existing(&SPAN_PLAN, id, &params, &now, rule);
            }
            Ok(())
        })
    }

    async fn delete_spans_by_trace_ids(
        &self,
        trace_ids: &[String],
        project_id: &str,
    ) -> Result<u64> {
        self.transact(|graph| {
            let doomed: Vec<String> = graph
                .nodes_of(NodeLabel::Span)
                .filter(|node| text(node, props::PROJECT_ID) == Some(project_id))
                .filter(|node| {
                    text(node, props::TRACE_ID)
                        .is_some_and(|t| trace_ids.iter().any(|wanted| wanted == t))
                })
                .filter_map(|node| text(node, props::ID).map(str::to_string))
                .collect();
            for id in &doomed {
                graph.detach_delete(NodeLabel::Span, id);
            }
            Ok(doomed.len() as u64)
        })
    }

    async fn find_span_by_id(&self, id: &str) -> Result<Option<Span>> {
        self.read(|graph| graph.node(NodeLabel::Span, id).map(decode_span).transpose())
    }

    async fn find_span_in_project(&self, id: &str, project_id: &str) -> Result<Option<Span>> {
        self.read(|graph| {
            graph
                .node(NodeLabel::Span, id)
                .filter(|node| text(node, props::PROJECT_ID) == Some(project_id))
                .map(decode_span)
                .transpose()
        })
    }

    fn find_spans_by_ids(&self, ids: Vec<String>) -> RecordStream<Span> {
        stream_of(self.spans_where(|node| {
            text(node, props::ID).is_some_and(|id| ids.iter().any(|wanted| wanted == id))
        }))
    }

    fn find_spans_by_trace(&self, trace_id: &str) -> RecordStream<Span> {
        stream_of(self.spans_where(|node| text(node, props::TRACE_ID) == Some(trace_id)))
    }

    fn find_spans_by_trace_ids(&self, trace_ids: Vec<String>) -> RecordStream<Span> {
        stream_of(self.spans_where(|node| {
            text(node, props::TRACE_ID).is_some_and(|t| trace_ids.iter().any(|wanted| wanted == t))
        }))
    }

    fn find_child_spans(&self, parent_span_id: &str) -> RecordStream<Span> {
        let parent = key(NodeLabel::Span, parent_span_id);
        let children: HashSet<String> = match self.lock() {
            Ok(graph) => graph
                .edges
                .iter()
                .filter(|(rel, from, _)| *rel == RelType::ParentOf && *from == parent)
                .map(|(_, _, to)| to.1.clone())
                .collect(),
            Err(e) => return stream_of(Err(e)),
        };
        stream_of(self.spans_where(|node| {
            text(node, props::ID).is_some_and(|id| children.contains(id))
        }))
    }

    async fn find_spans(
        &self,
        project_id: &str,
        trace_id: Option<&str>,
        page: u64,
        size: u64,
    ) -> Result<Page<Span>> {
        let spans = self.spans_where(|node| {
            text(node, props::PROJECT_ID) == Some(project_id)
                && trace_id.map_or(true, |t| text(node, props::TRACE_ID) == Some(t))
        })?;
        slice_page(newest_first_spans(spans), page, size)
    }

    fn search_spans(&self, project_id: &str, limit: u64) -> RecordStream<Span> {
        stream_of(
            self.spans_where(|node| text(node, props::PROJECT_ID) == Some(project_id))
                .map(|spans| {
                    newest_first_spans(spans)
                        .into_iter()
                        .take(usize::try_from(limit).unwrap_or(usize::MAX))
                        .collect()
                }),
        )
    }

    async fn span_ids_for_traces(&self, trace_ids: &[String]) -> Result<Vec<String>> {
        self.read(|graph| {
            let mut ids: Vec<String> = graph
                .nodes_of(NodeLabel::Span)
                .filter(|node| {
                    text(node, props::TRACE_ID)
                        .is_some_and(|t| trace_ids.iter().any(|wanted| wanted == t))
                })
                .filter_map(|node| text(node, props::ID).map(str::to_string))
                .collect();
            ids.sort();
            Ok(ids)
        })
    }

    async fn project_id_of_span(&self, id: &str) -> Result<Option<String>> {
        self.read(|graph| {
            Ok(graph
                .node(NodeLabel::Span, id)
                .and_then(|node| text(node, props::PROJECT_ID))
                .map(str::to_string))
        })
    }

    async fn workspace_ids_of_spans(&self, ids: &[String]) -> Result<Vec<(String, String)>> {
        self.read(|graph| Ok(graph.workspace_pairs(NodeLabel::Span, ids)))
    }
}

#[async_trait]
impl GraphAdmin for MockGraphStore {
    async fn apply_schema(&self) -> Result<()> {
        debug!("In-memory store has no schema to apply");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.lock() {
            Ok(_) => HealthStatus::healthy("In-memory graph store"),
            Err(e) => HealthStatus::unhealthy(e.to_string()),
        }
    }
}
