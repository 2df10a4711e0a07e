//! Batch ingestion path
//!
//! A batch becomes one `UNWIND $rows AS row` statement that applies the same
//! create plan and ownership rules as a single insert to every row. The caller
//! runs it inside one write transaction and compares the written count with the
//! batch length, so a missing owner anywhere rolls back the whole batch.

use std::collections::HashSet;

use tracegraph_core::{Span, Trace};

use crate::error::{Result, StorageError};
use crate::hierarchy::{Ownership, ParentLink};
use crate::mapper::props::ID;
use crate::merge::{ParamScope, WritePlan};
use crate::property::{PropertyMap, PropertyValue};

const ROW: &str = "row";

/// Statement and payload for one batch write
#[derive(Debug)]
pub struct BatchWrite {
    pub statement: String,
    pub rows: Vec<PropertyMap>,
    /// Distinct owner ids referenced by the rows, in first-seen order
    pub owner_ids: Vec<String>,
}

/// Rejects batches the configured bound does not allow
pub fn check_batch_size(requested: usize, max: usize) -> Result<()> {
    if requested > max {
        return Err(StorageError::BatchSizeExceeded { requested, max });
    }
    Ok(())
}

/// Rejects spans that do not belong to `trace`
pub fn check_spans_of_trace(trace: &Trace, spans: &[Span]) -> Result<()> {
    match spans.iter().find(|span| span.trace_id != trace.id) {
        Some(stray) => Err(StorageError::InvalidInput(format!(
            "span {} belongs to trace {}, not {}",
            stray.id, stray.trace_id, trace.id
        ))),
        None => Ok(()),
    }
}

/// Renders the set-oriented create statement
pub fn batch_statement(plan: &WritePlan, ownership: &Ownership, link: Option<&ParentLink>) -> String {
    let scope = ParamScope::Row(ROW);
    let mut clauses = vec![
        format!("UNWIND $rows AS {ROW}"),
        ownership.match_owner(scope),
        plan.render_create(scope),
        ownership.create_edge(),
    ];
    if let Some(link) = link {
        clauses.push(link.link(&[ROW]));
    }
    clauses.push(format!("RETURN count({}) AS written", plan.alias));
    clauses.join(" ")
}

/// Prepares the rows of a batch
///
/// # Errors
///
/// `IdentityConflict` when the same id appears twice in the batch.
pub fn prepare_batch(
    plan: &WritePlan,
    ownership: &Ownership,
    link: Option<&ParentLink>,
    rows: Vec<PropertyMap>,
) -> Result<BatchWrite> {
    let mut seen = HashSet::new();
    let mut owners = HashSet::new();
    let mut owner_ids = Vec::new();

    for row in &rows {
        if let Some(PropertyValue::String(id)) = row.get(ID) {
            if !seen.insert(id.clone()) {
                return Err(StorageError::IdentityConflict {
                    entity: plan.label.as_str(),
                    id: id.clone(),
                });
            }
        }
        if let Some(PropertyValue::String(owner)) = row.get(ownership.owner_key) {
            if owners.insert(owner.clone()) {
                owner_ids.push(owner.clone());
            }
        }
    }

    Ok(BatchWrite {
        statement: batch_statement(plan, ownership, link),
        rows: rows.into_iter().map(|row| plan.complete_params(row)).collect(),
        owner_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{PROJECT_TRACE, SPAN_PARENT, TRACE_SPAN};
    use crate::merge::{SPAN_PLAN, TRACE_PLAN};

    fn row(id: &str, owner_key: &str, owner: &str) -> PropertyMap {
        let mut map = PropertyMap::new();
        map.insert("id".to_string(), id.into());
        map.insert(owner_key.to_string(), owner.into());
        map
    }

    #[test]
    fn test_trace_batch_statement() {
        let statement = batch_statement(&TRACE_PLAN, &PROJECT_TRACE, None);
        assert!(statement.starts_with(
            "UNWIND $rows AS row MATCH (p:Project {id: row.projectId}) CREATE (t:Trace {id: row.id}) SET "
        ));
        assert!(statement.ends_with("CREATE (p)-[:HAS_TRACE]->(t) RETURN count(t) AS written"));
    }

    #[test]
    fn test_span_batch_links_parents() {
        let statement = batch_statement(&SPAN_PLAN, &TRACE_SPAN, Some(&SPAN_PARENT));
        assert!(statement.contains("CREATE (tr)-[:HAS_SPAN]->(s) WITH s, row OPTIONAL MATCH"));
        assert!(statement.ends_with("RETURN count(s) AS written"));
    }

    #[test]
    fn test_prepare_collects_distinct_owners() {
        let batch = prepare_batch(
            &TRACE_PLAN,
            &PROJECT_TRACE,
            None,
            vec![
                row("t1", "projectId", "p1"),
                row("t2", "projectId", "p2"),
                row("t3", "projectId", "p1"),
            ],
        )
        .unwrap();
        assert_eq!(batch.owner_ids, vec!["p1".to_string(), "p2".to_string()]);
        assert_eq!(batch.rows.len(), 3);
        assert!(batch.rows[0].contains_key("endTime"));
    }

    #[test]
    fn test_prepare_rejects_duplicate_ids() {
        let err = prepare_batch(
            &TRACE_PLAN,
            &PROJECT_TRACE,
            None,
            vec![row("t1", "projectId", "p1"), row("t1", "projectId", "p1")],
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::IdentityConflict { ref id, .. } if id == "t1"));
    }

    #[test]
    fn test_spans_must_name_the_trace() {
        let trace = tracegraph_core::TraceBuilder::default()
            .id("t1")
            .project_id("p1")
            .workspace_id("w1")
            .build()
            .unwrap();
        let span = |id: &str, trace_id: &str| {
            tracegraph_core::SpanBuilder::default()
                .id(id)
                .trace_id(trace_id)
                .project_id("p1")
                .workspace_id("w1")
                .build()
                .unwrap()
        };

        assert!(check_spans_of_trace(&trace, &[]).is_ok());
        assert!(check_spans_of_trace(&trace, &[span("s1", "t1")]).is_ok());
        let err = check_spans_of_trace(&trace, &[span("s1", "t1"), span("s2", "t9")]).unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(ref msg) if msg.contains("s2")));
    }

    #[test]
    fn test_batch_size_bound() {
        assert!(check_batch_size(10, 10).is_ok());
        assert!(matches!(
            check_batch_size(11, 10),
            Err(StorageError::BatchSizeExceeded { requested: 11, max: 10 })
        ));
    }
}
