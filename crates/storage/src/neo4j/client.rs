//! Neo4j-backed trace store

use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use neo4rs::{BoltType, Row};
use serde::de::DeserializeOwned;
use tracegraph_core::{
    Page, Project, Span, SpanUpdate, StorageConfig, TagMergePolicy, Trace, TraceUpdate, Workspace,
};
use tracing::{debug, info};

use super::gateway::{AccessMode, CypherQuery, QueryGateway, RecordStream, Session};
use super::queries::{self, PROJECT_COLUMN, SPAN_COLUMN, TRACE_COLUMN, WORKSPACE_COLUMN};
use crate::batch::{check_batch_size, check_spans_of_trace, prepare_batch, BatchWrite};
use crate::error::{Result, StorageError};
use crate::health::{evaluate_probe, HealthStatus};
use crate::hierarchy::{Ownership, PROJECT_TRACE, SPAN_PARENT, TRACE_SPAN};
use crate::mapper::{
    decode_project, decode_span, decode_trace, decode_workspace, encode_project, encode_span,
    encode_span_update, encode_timestamp, encode_trace, encode_trace_update, encode_workspace,
    props,
};
use crate::merge::{TagRule, NOW_PARAM, PROJECT_PLAN, SPAN_PLAN, TRACE_PLAN, WORKSPACE_PLAN};
use crate::property::{to_bolt_map, PropertyMap, PropertyValue};
use crate::schema::schema_statements;
use crate::traits::{GraphAdmin, ProjectStore, SpanStore, TraceStore};

fn node_column(row: &Row, column: &str, entity: &'static str) -> Result<PropertyMap> {
    row.get::<PropertyMap>(column)
        .map_err(|e| StorageError::decode(entity, "<unknown>", column, e.to_string()))
}

fn scalar<T: DeserializeOwned>(row: &Row, column: &str) -> Result<T> {
    row.get::<T>(column)
        .map_err(|e| StorageError::BackendError(format!("Unexpected '{column}' column: {e}")))
}

fn workspace_row(row: &Row) -> Result<Workspace> {
    decode_workspace(&node_column(row, WORKSPACE_COLUMN, "Workspace")?)
}

fn project_row(row: &Row) -> Result<Project> {
    decode_project(&node_column(row, PROJECT_COLUMN, "Project")?)
}

fn trace_row(row: &Row) -> Result<Trace> {
    decode_trace(&node_column(row, TRACE_COLUMN, "Trace")?)
}

fn span_row(row: &Row) -> Result<Span> {
    decode_span(&node_column(row, SPAN_COLUMN, "Span")?)
}

fn count_row(row: &Row) -> Result<u64> {
    let total: i64 = scalar(row, "total")?;
    Ok(total.max(0) as u64)
}

/// Statement carrying every entry of `params` plus the write timestamp
fn write_query(text: String, params: PropertyMap) -> CypherQuery {
    params
        .into_iter()
        .fold(CypherQuery::new(text), |query, (key, value)| {
            query.param(&key, value)
        })
        .param(NOW_PARAM, encode_timestamp(&Utc::now()))
}

/// `UNWIND` statement over encoded rows
fn batch_query(statement: String, rows: Vec<PropertyMap>) -> CypherQuery {
    let rows: Vec<BoltType> = rows.into_iter().map(to_bolt_map).collect();
    CypherQuery::new(statement)
        .param("rows", rows)
        .param(NOW_PARAM, encode_timestamp(&Utc::now()))
}

fn row_ids(rows: &[PropertyMap]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.get(props::ID).and_then(|v| v.as_str()).map(str::to_string))
        .collect()
}

fn workspace_pair(row: &Row) -> Result<(String, String)> {
    Ok((scalar(row, "id")?, scalar(row, "workspaceId")?))
}

fn page_bounds(page: u64, size: u64) -> Result<(i64, i64)> {
    if size == 0 {
        return Err(StorageError::InvalidInput("page size must be greater than 0".to_string()));
    }
    let skip = page
        .checked_mul(size)
        .and_then(|skip| i64::try_from(skip).ok())
        .ok_or_else(|| StorageError::InvalidInput(format!("page {page} is out of range")))?;
    let limit = i64::try_from(size)
        .map_err(|_| StorageError::InvalidInput(format!("page size {size} is out of range")))?;
    Ok((skip, limit))
}

fn optional_text(value: Option<&str>) -> BoltType {
    PropertyValue::from(value.map(str::to_string)).into()
}

/// Graph store backed by a Neo4j connection pool
#[derive(Clone)]
pub struct Neo4jGraphStore {
    gateway: QueryGateway,
    dedupe_merged_tags: bool,
    max_batch_size: usize,
}

impl Neo4jGraphStore {
    /// Connects to the database described by `config`
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let gateway = QueryGateway::connect(config).await?;
        Ok(Self::with_gateway(gateway, config))
    }

    pub fn with_gateway(gateway: QueryGateway, config: &StorageConfig) -> Self {
        Self {
            gateway,
            dedupe_merged_tags: config.dedupe_merged_tags,
            max_batch_size: config.max_entities_per_db_operation,
        }
    }

    pub fn gateway(&self) -> &QueryGateway {
        &self.gateway
    }

    fn tag_rule(&self, policy: TagMergePolicy) -> TagRule {
        TagRule::new(policy, self.dedupe_merged_tags)
    }

    /// Runs a prepared batch in one write transaction
    ///
    /// A short written count means some rows found no owner; the first missing
    /// owner is looked up inside the same transaction before rolling back.
    async fn run_batch(
        &self,
        batch: BatchWrite,
        ownership: &Ownership,
        existing_ids: &str,
    ) -> Result<u64> {
        let entity = ownership.child.as_str();
        let expected = batch.rows.len() as i64;
        let ids = row_ids(&batch.rows);
        let owners: Vec<(String, String)> = batch
            .rows
            .iter()
            .filter_map(|row| {
                let id = row.get(props::ID)?.as_str()?;
                let owner = row.get(ownership.owner_key)?.as_str()?;
                Some((owner.to_string(), id.to_string()))
            })
            .collect();

        let owner_ids = batch.owner_ids;
        let query = batch_query(batch.statement, batch.rows);

        let mut session = self.gateway.begin(AccessMode::Write).await?;
        let outcome: Result<u64> = match session
            .fetch_optional(&query, |row| scalar::<i64>(row, "written"))
            .await
        {
            Ok(written) if written.unwrap_or(0) == expected => Ok(expected as u64),
            Ok(written) => {
                let written = written.unwrap_or(0);
                match Self::find_missing_owner(&mut session, ownership, owner_ids, &owners).await {
                    Ok(Some(missing)) => Err(missing),
                    Ok(None) => Err(StorageError::BackendError(format!(
                        "Batch wrote {written} of {expected} {entity} nodes"
                    ))),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        match session.finish(outcome).await {
            Err(StorageError::ConstraintViolation(message)) => {
                Err(self.identify_conflict(entity, existing_ids, ids, message).await)
            }
            other => other,
        }
    }

    /// First owner of a failed batch that does not exist, as a `MissingParent` error
    async fn find_missing_owner(
        session: &mut Session,
        ownership: &Ownership,
        owner_ids: Vec<String>,
        owners: &[(String, String)],
    ) -> Result<Option<StorageError>> {
        let probe = CypherQuery::new(ownership.missing_owner_probe()).param("ownerIds", owner_ids);
        let missing = session
            .fetch_optional(&probe, |row| scalar::<String>(row, "ownerId"))
            .await?;
        Ok(missing.map(|parent_id| {
            let child = owners
                .iter()
                .find(|(owner, _)| *owner == parent_id)
                .map(|(_, id)| id.clone())
                .unwrap_or_default();
            StorageError::missing_parent(ownership.child.as_str(), child, ownership.owner.as_str(), parent_id)
        }))
    }

    /// Writes a trace, then its spans, inside one open session
    async fn write_trace_with_spans(
        session: &mut Session,
        trace: &Trace,
        trace_query: &CypherQuery,
        span_query: &CypherQuery,
        expected: u64,
    ) -> Result<u64> {
        session
            .fetch_optional(trace_query, |row| scalar::<String>(row, "id"))
            .await?
            .ok_or_else(|| {
                StorageError::missing_parent("Trace", &trace.id, "Project", &trace.project_id)
            })?;
        if expected == 0 {
            return Ok(0);
        }
        let written = session
            .fetch_optional(span_query, |row| scalar::<i64>(row, "written"))
            .await?
            .unwrap_or(0);
        if u64::try_from(written).ok() != Some(expected) {
            return Err(StorageError::BackendError(format!(
                "Wrote {written} of {expected} spans of trace {}",
                trace.id
            )));
        }
        Ok(expected)
    }

    /// Names the id behind a unique-constraint failure when it can be found
    async fn identify_conflict(
        &self,
        entity: &'static str,
        existing_ids: &str,
        ids: Vec<String>,
        message: String,
    ) -> StorageError {
        let probe = CypherQuery::new(existing_ids).param("ids", ids);
        match self
            .gateway
            .execute_read(probe, |row| scalar::<String>(row, "id"))
            .await
        {
            Ok(Some(id)) => StorageError::IdentityConflict { entity, id },
            _ => StorageError::ConstraintViolation(message),
        }
    }

    async fn read_count(&self, query: CypherQuery) -> Result<u64> {
        Ok(self.gateway.execute_read(query, count_row).await?.unwrap_or(0))
    }

    async fn read_workspace_pairs(
        &self,
        statement: &'static str,
        ids: &[String],
    ) -> Result<Vec<(String, String)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = CypherQuery::new(statement).param("ids", ids.to_vec());
        self.gateway
            .execute_read_stream(query, workspace_pair)
            .try_collect()
            .await
    }

    async fn read_ids(&self, query: CypherQuery) -> Result<Vec<String>> {
        Ok(self
            .gateway
            .execute_read(query, |row| scalar::<Vec<String>>(row, "ids"))
            .await?
            .unwrap_or_default())
    }
}

#[async_trait]
impl ProjectStore for Neo4jGraphStore {
    async fn create_workspace(&self, workspace: &Workspace) -> Result<Workspace> {
        let params = WORKSPACE_PLAN.complete_params(encode_workspace(workspace));
        debug!("Upserting workspace {}", workspace.id);
        self.gateway
            .execute_write(write_query(queries::upsert_workspace(), params), workspace_row)
            .await?
            .ok_or_else(|| StorageError::BackendError(format!("Workspace {} was not written", workspace.id)))
    }

    async fn find_workspace_by_id(&self, id: &str) -> Result<Option<Workspace>> {
        let query = CypherQuery::new(queries::find_workspace()).param("id", id);
        self.gateway.execute_read(query, workspace_row).await
    }

    async fn save_project(&self, project: &Project) -> Result<Project> {
        let params = PROJECT_PLAN.complete_params(encode_project(project));
        debug!("Saving project {} in workspace {}", project.id, project.workspace_id);
        self.gateway
            .execute_write(write_query(queries::save_project(), params), project_row)
            .await?
            .ok_or_else(|| {
                StorageError::missing_parent("Project", &project.id, "Workspace", &project.workspace_id)
            })
    }

    async fn find_project_by_id(&self, id: &str) -> Result<Option<Project>> {
        let query = CypherQuery::new(queries::find_project()).param("id", id);
        self.gateway.execute_read(query, project_row).await
    }

    fn find_projects_by_workspace(&self, workspace_id: &str) -> RecordStream<Project> {
        let query =
            CypherQuery::new(queries::find_projects_by_workspace()).param("workspaceId", workspace_id);
        self.gateway.execute_read_stream(query, project_row)
    }

    async fn delete_project(&self, id: &str) -> Result<()> {
        debug!("Deleting project {id}");
        let query = CypherQuery::new(queries::DELETE_PROJECT).param("id", id);
        self.gateway.execute_write_many(query).await
    }

    async fn count_projects(&self, workspace_id: &str) -> Result<u64> {
        self.read_count(CypherQuery::new(queries::COUNT_PROJECTS).param("workspaceId", workspace_id))
            .await
    }
}

#[async_trait]
impl TraceStore for Neo4jGraphStore {
    async fn insert_trace(&self, trace: &Trace) -> Result<String> {
        let params = TRACE_PLAN.complete_params(encode_trace(trace)?);
        debug!("Inserting trace {} into project {}", trace.id, trace.project_id);
        self.gateway
            .execute_write(write_query(queries::insert_trace(), params), |row| {
                scalar::<String>(row, "id")
            })
            .await
            .map_err(|e| e.for_identity("Trace", &trace.id))?
            .ok_or_else(|| {
                StorageError::missing_parent("Trace", &trace.id, "Project", &trace.project_id)
            })
    }

    async fn upsert_trace(&self, project_id: &str, id: &str, update: &TraceUpdate) -> Result<()> {
        let params = TRACE_PLAN.complete_params(encode_trace_update(id, project_id, update)?);
        debug!("Upserting trace {id} in project {project_id}");
        self.gateway
            .execute_write(write_query(queries::upsert_trace(), params), |row| {
                scalar::<String>(row, "id")
            })
            .await?
            .map(|_| ())
            .ok_or_else(|| StorageError::missing_parent("Trace", id, "Project", project_id))
    }

    async fn update_trace(&self, id: &str, update: &TraceUpdate) -> Result<bool> {
        let mut params = encode_trace_update(id, "", update)?;
        params.remove(props::PROJECT_ID);
        let params = TRACE_PLAN.complete_params(params);
        Ok(self
            .gateway
            .execute_write(write_query(queries::update_trace(), params), |row| {
                scalar::<String>(row, "id")
            })
            .await?
            .is_some())
    }

    async fn batch_insert_traces(&self, traces: &[Trace]) -> Result<u64> {
        if traces.is_empty() {
            return Ok(0);
        }
        check_batch_size(traces.len(), self.max_batch_size)?;
        let rows = traces.iter().map(encode_trace).collect::<Result<Vec<_>>>()?;
        let batch = prepare_batch(&TRACE_PLAN, &PROJECT_TRACE, None, rows)?;
        let written = self
            .run_batch(batch, &PROJECT_TRACE, queries::EXISTING_TRACE_IDS)
            .await?;
        info!("Batch inserted {written} traces");
        Ok(written)
    }

    async fn insert_trace_with_spans(&self, trace: &Trace, spans: &[Span]) -> Result<u64> {
        check_spans_of_trace(trace, spans)?;
        check_batch_size(spans.len(), self.max_batch_size)?;
        let trace_query = write_query(
            queries::insert_trace(),
            TRACE_PLAN.complete_params(encode_trace(trace)?),
        );
        let rows = spans.iter().map(encode_span).collect::<Result<Vec<_>>>()?;
        let batch = prepare_batch(&SPAN_PLAN, &TRACE_SPAN, Some(&SPAN_PARENT), rows)?;
        let span_ids = row_ids(&batch.rows);
        let expected = batch.rows.len() as u64;
        let span_query = batch_query(batch.statement, batch.rows);

        debug!("Inserting trace {} with {expected} spans", trace.id);
        let mut session = self.gateway.begin(AccessMode::Write).await?;
        let outcome =
            Self::write_trace_with_spans(&mut session, trace, &trace_query, &span_query, expected)
                .await;
        match session.finish(outcome).await {
            Ok(written) => {
                info!("Inserted trace {} with {written} spans", trace.id);
                Ok(written)
            }
            Err(StorageError::ConstraintViolation(message)) => {
                let trace_ids = vec![trace.id.clone()];
                match self
                    .identify_conflict("Trace", queries::EXISTING_TRACE_IDS, trace_ids, message)
                    .await
                {
                    StorageError::ConstraintViolation(message) => Err(self
                        .identify_conflict("Span", queries::EXISTING_SPAN_IDS, span_ids, message)
                        .await),
                    conflict => Err(conflict),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn bulk_update_traces(
        &self,
        ids: &[String],
        update: &TraceUpdate,
        tags: TagMergePolicy,
    ) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut params = encode_trace_update("", "", update)?;
        params.remove(props::ID);
        params.remove(props::PROJECT_ID);
        let params = TRACE_PLAN.complete_params(params);
        let query = write_query(queries::bulk_update_traces(self.tag_rule(tags)), params)
            .param("ids", ids.to_vec());
        debug!("Bulk updating {} traces", ids.len());
        self.gateway.execute_write_many(query).await
    }

    async fn delete_traces(&self, ids: &[String], project_id: &str) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let query = CypherQuery::new(queries::DELETE_TRACES)
            .param("ids", ids.to_vec())
            .param("projectId", project_id);
        let deleted = self
            .gateway
            .execute_write(query, |row| scalar::<i64>(row, "deleted"))
            .await?
            .unwrap_or(0);
        info!("Deleted {deleted} traces from project {project_id}");
        Ok(deleted.max(0) as u64)
    }

    async fn find_trace_by_id(&self, id: &str) -> Result<Option<Trace>> {
        let query = CypherQuery::new(queries::find_trace()).param("id", id);
        self.gateway.execute_read(query, trace_row).await
    }

    fn find_traces_by_ids(&self, ids: Vec<String>) -> RecordStream<Trace> {
        let query = CypherQuery::new(queries::find_traces_by_ids()).param("ids", ids);
        self.gateway.execute_read_stream(query, trace_row)
    }

    async fn find_traces_by_project(
        &self,
        project_id: &str,
        page: u64,
        size: u64,
    ) -> Result<Page<Trace>> {
        let (skip, limit) = page_bounds(page, size)?;
        let rows = CypherQuery::new(queries::find_traces_page())
            .param("projectId", project_id)
            .param("skip", skip)
            .param("limit", limit);
        let total = CypherQuery::new(queries::COUNT_PROJECT_TRACES).param("projectId", project_id);

        let (content, total) = tokio::try_join!(
            self.gateway
                .execute_read_stream(rows, trace_row)
                .try_collect::<Vec<_>>(),
            self.read_count(total)
        )?;
        Ok(Page {
            content,
            page,
            size,
            total,
        })
    }

    fn search_traces(&self, project_id: &str, limit: u64) -> RecordStream<Trace> {
        let query = CypherQuery::new(queries::search_traces())
            .param("projectId", project_id)
            .param("limit", i64::try_from(limit).unwrap_or(i64::MAX));
        self.gateway.execute_read_stream(query, trace_row)
    }

    async fn count_traces(&self, project_ids: &[String]) -> Result<u64> {
        self.read_count(CypherQuery::new(queries::COUNT_TRACES).param("projectIds", project_ids.to_vec()))
            .await
    }

    async fn trace_ids_by_thread_ids(
        &self,
        project_id: &str,
        thread_ids: &[String],
    ) -> Result<Vec<String>> {
        if thread_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.read_ids(
            CypherQuery::new(queries::TRACE_IDS_BY_THREAD)
                .param("projectId", project_id)
                .param("threadIds", thread_ids.to_vec()),
        )
        .await
    }

    async fn project_id_of_trace(&self, id: &str) -> Result<Option<String>> {
        let query = CypherQuery::new(queries::PROJECT_OF_TRACE).param("id", id);
        Ok(self
            .gateway
            .execute_read(query, |row| scalar::<Option<String>>(row, "projectId"))
            .await?
            .flatten())
    }

    async fn workspace_ids_of_traces(&self, ids: &[String]) -> Result<Vec<(String, String)>> {
        self.read_workspace_pairs(queries::WORKSPACES_OF_TRACES, ids).await
    }
}

#[async_trait]
impl SpanStore for Neo4jGraphStore {
    async fn insert_span(&self, span: &Span) -> Result<String> {
        let params = SPAN_PLAN.complete_params(encode_span(span)?);
        debug!(
            "Inserting span {} into trace {} (parent {:?})",
            span.id, span.trace_id, span.parent_span_id
        );
        self.gateway
            .execute_write(write_query(queries::insert_span(), params), |row| {
                scalar::<String>(row, "id")
            })
            .await
            .map_err(|e| e.for_identity("Span", &span.id))?
            .ok_or_else(|| StorageError::missing_parent("Span", &span.id, "Trace", &span.trace_id))
    }

    async fn upsert_span(&self, project_id: &str, id: &str, update: &SpanUpdate) -> Result<()> {
        let trace_id = update.trace_id.as_deref().ok_or_else(|| {
            StorageError::InvalidInput(format!("upsert of span {id} does not name its trace"))
        })?;
        let params = SPAN_PLAN.complete_params(encode_span_update(id, project_id, update)?);
        debug!("Upserting span {id} in trace {trace_id}");
        self.gateway
            .execute_write(write_query(queries::upsert_span(), params), |row| {
                scalar::<String>(row, "id")
            })
            .await?
            .map(|_| ())
            .ok_or_else(|| StorageError::missing_parent("Span", id, "Trace", trace_id))
    }

    async fn update_span(&self, id: &str, update: &SpanUpdate) -> Result<bool> {
        let mut params = encode_span_update(id, "", update)?;
        params.remove(props::PROJECT_ID);
        let params = SPAN_PLAN.complete_params(params);
        Ok(self
            .gateway
            .execute_write(write_query(queries::update_span(), params), |row| {
                scalar::<String>(row, "id")
            })
            .await?
            .is_some())
    }

    async fn batch_insert_spans(&self, spans: &[Span]) -> Result<u64> {
        if spans.is_empty() {
            return Ok(0);
        }
        check_batch_size(spans.len(), self.max_batch_size)?;
        let rows = spans.iter().map(encode_span).collect::<Result<Vec<_>>>()?;
        let batch = prepare_batch(&SPAN_PLAN, &TRACE_SPAN, Some(&SPAN_PARENT), rows)?;
        let written = self
            .run_batch(batch, &TRACE_SPAN, queries::EXISTING_SPAN_IDS)
            .await?;
        info!("Batch inserted {written} spans");
        Ok(written)
    }

    async fn bulk_update_spans(
        &self,
        ids: &[String],
        update: &SpanUpdate,
        tags: TagMergePolicy,
    ) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut params = encode_span_update("", "", update)?;
        params.remove(props::ID);
        params.remove(props::PROJECT_ID);
        let params = SPAN_PLAN.complete_params(params);
        let query = write_query(queries::bulk_update_spans(self.tag_rule(tags)), params)
            .param("ids", ids.to_vec());
        debug!("Bulk updating {} spans", ids.len());
        self.gateway.execute_write_many(query).await
    }

    async fn delete_spans_by_trace_ids(
        &self,
        trace_ids: &[String],
        project_id: &str,
    ) -> Result<u64> {
        if trace_ids.is_empty() {
            return Ok(0);
        }
        let query = CypherQuery::new(queries::DELETE_SPANS_BY_TRACES)
            .param("traceIds", trace_ids.to_vec())
            .param("projectId", project_id);
        let deleted = self
            .gateway
            .execute_write(query, |row| scalar::<i64>(row, "deleted"))
            .await?
            .unwrap_or(0);
        info!("Deleted {deleted} spans of {} traces", trace_ids.len());
        Ok(deleted.max(0) as u64)
    }

    async fn find_span_by_id(&self, id: &str) -> Result<Option<Span>> {
        let query = CypherQuery::new(queries::find_span()).param("id", id);
        self.gateway.execute_read(query, span_row).await
    }

    async fn find_span_in_project(&self, id: &str, project_id: &str) -> Result<Option<Span>> {
        let query = CypherQuery::new(queries::find_span_in_project())
            .param("id", id)
            .param("projectId", project_id);
        self.gateway.execute_read(query, span_row).await
    }

    fn find_spans_by_ids(&self, ids: Vec<String>) -> RecordStream<Span> {
        let query = CypherQuery::new(queries::find_spans_by_ids()).param("ids", ids);
        self.gateway.execute_read_stream(query, span_row)
    }

    fn find_spans_by_trace(&self, trace_id: &str) -> RecordStream<Span> {
        let query = CypherQuery::new(queries::find_spans_by_trace()).param("traceId", trace_id);
        self.gateway.execute_read_stream(query, span_row)
    }

    fn find_spans_by_trace_ids(&self, trace_ids: Vec<String>) -> RecordStream<Span> {
        let query =
            CypherQuery::new(queries::find_spans_by_trace_ids()).param("traceIds", trace_ids);
        self.gateway.execute_read_stream(query, span_row)
    }

    fn find_child_spans(&self, parent_span_id: &str) -> RecordStream<Span> {
        let query =
            CypherQuery::new(queries::find_child_spans()).param("parentSpanId", parent_span_id);
        self.gateway.execute_read_stream(query, span_row)
    }

    async fn find_spans(
        &self,
        project_id: &str,
        trace_id: Option<&str>,
        page: u64,
        size: u64,
    ) -> Result<Page<Span>> {
        let (skip, limit) = page_bounds(page, size)?;
        let rows = CypherQuery::new(queries::find_spans_page())
            .param("projectId", project_id)
            .param("traceId", optional_text(trace_id))
            .param("skip", skip)
            .param("limit", limit);
        let total = CypherQuery::new(queries::COUNT_PROJECT_SPANS)
            .param("projectId", project_id)
            .param("traceId", optional_text(trace_id));

        let (content, total) = tokio::try_join!(
            self.gateway
                .execute_read_stream(rows, span_row)
                .try_collect::<Vec<_>>(),
            self.read_count(total)
        )?;
        Ok(Page {
            content,
            page,
            size,
            total,
        })
    }

    fn search_spans(&self, project_id: &str, limit: u64) -> RecordStream<Span> {
        let query = CypherQuery::new(queries::search_spans())
            .param("projectId", project_id)
            .param("limit", i64::try_from(limit).unwrap_or(i64::MAX));
        self.gateway.execute_read_stream(query, span_row)
    }

    async fn span_ids_for_traces(&self, trace_ids: &[String]) -> Result<Vec<String>> {
        if trace_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.read_ids(
            CypherQuery::new(queries::SPAN_IDS_FOR_TRACES).param("traceIds", trace_ids.to_vec()),
        )
        .await
    }

    async fn project_id_of_span(&self, id: &str) -> Result<Option<String>> {
        let query = CypherQuery::new(queries::PROJECT_OF_SPAN).param("id", id);
        Ok(self
            .gateway
            .execute_read(query, |row| scalar::<Option<String>>(row, "projectId"))
            .await?
            .flatten())
    }

    async fn workspace_ids_of_spans(&self, ids: &[String]) -> Result<Vec<(String, String)>> {
        self.read_workspace_pairs(queries::WORKSPACES_OF_SPANS, ids).await
    }
}

#[async_trait]
impl GraphAdmin for Neo4jGraphStore {
    async fn apply_schema(&self) -> Result<()> {
        let statements = schema_statements();
        for statement in &statements {
            debug!("Applying schema statement: {statement}");
            self.gateway.execute_schema(statement).await?;
        }
        info!("Applied {} schema statements", statements.len());
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        let probe = CypherQuery::new(queries::HEALTH_CHECK);
        evaluate_probe(
            self.gateway
                .execute_read(probe, |row| scalar::<i64>(row, "result"))
                .await,
        )
    }
}
