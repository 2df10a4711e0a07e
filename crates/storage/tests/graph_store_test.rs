//! Behavioural tests for the graph store contract, run against the in-memory store

mod common;

use anyhow::Result;
use common::*;
use futures::TryStreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use tracegraph_core::{SpanUpdate, TagMergePolicy, Trace, TraceUpdate};
use tracegraph_storage::{
    GraphAdmin, MockGraphStore, NodeLabel, ProjectStore, RelType, SpanStore, StorageError,
    TraceStore,
};

fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|item| id(item).to_string()).collect()
}

fn without_update_stamp(mut trace: Trace) -> Trace {
    trace.last_updated_at = base_time();
    trace
}

#[tokio::test]
async fn test_trace_round_trip() -> Result<()> {
    let store = seeded_mock_store().await?;
    let mut trace = test_trace("t1", "p1", "w1", at(0));
    trace.input = Some(json!({"prompt": "hi", "n": 2}));
    trace.tags = vec!["x".to_string(), "y".to_string()];
    trace.thread_id = Some("thread-1".to_string());

    let id = store.insert_trace(&trace).await?;
    assert_eq!(id, "t1");
    assert_eq!(store.find_trace_by_id("t1").await?, Some(trace));
    assert_eq!(store.find_trace_by_id("missing").await?, None);
    Ok(())
}

#[tokio::test]
async fn test_insert_existing_trace_is_identity_conflict() -> Result<()> {
    let store = seeded_mock_store().await?;
    store.insert_trace(&test_trace("t1", "p1", "w1", at(0))).await?;

    let err = store
        .insert_trace(&test_trace("t1", "p1", "w1", at(5)))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, StorageError::IdentityConflict { entity: "Trace", id } if id == "t1"),
        "{err}"
    );
    Ok(())
}

#[tokio::test]
async fn test_trace_without_project_is_missing_parent() -> Result<()> {
    let store = seeded_mock_store().await?;
    let err = store
        .insert_trace(&test_trace("t1", "nope", "w1", at(0)))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, StorageError::MissingParent { parent: "Project", parent_id, .. } if parent_id == "nope"),
        "{err}"
    );
    assert_eq!(store.node_count(NodeLabel::Trace), 0);
    Ok(())
}

#[tokio::test]
async fn test_upsert_is_idempotent() -> Result<()> {
    let store = seeded_mock_store().await?;
    let update = TraceUpdate {
        name: Some("A".to_string()),
        start_time: Some(at(0)),
        tags: Some(vec!["x".to_string()]),
        ..TraceUpdate::default()
    };

    store.upsert_trace("p1", "t1", &update).await?;
    let once = store.find_trace_by_id("t1").await?.unwrap();
    store.upsert_trace("p1", "t1", &update).await?;
    let twice = store.find_trace_by_id("t1").await?.unwrap();

    assert_eq!(without_update_stamp(once), without_update_stamp(twice));
    assert_eq!(store.node_count(NodeLabel::Trace), 1);
    assert_eq!(store.edge_count(RelType::HasTrace), 1);
    Ok(())
}

#[tokio::test]
async fn test_partial_upsert_keeps_unset_fields() -> Result<()> {
    let store = seeded_mock_store().await?;
    let mut trace = test_trace("t1", "p1", "w1", at(0));
    trace.name = "A".to_string();
    trace.tags = vec!["x".to_string()];
    store.insert_trace(&trace).await?;

    let update = TraceUpdate {
        output: Some(json!({"answer": 42})),
        ..TraceUpdate::default()
    };
    store.upsert_trace("p1", "t1", &update).await?;

    let stored = store.find_trace_by_id("t1").await?.unwrap();
    assert_eq!(stored.name, "A");
    assert_eq!(stored.tags, vec!["x".to_string()]);
    assert_eq!(stored.output, Some(json!({"answer": 42})));
    assert_eq!(stored.created_at, trace.created_at);
    assert_eq!(stored.start_time, trace.start_time);
    Ok(())
}

#[tokio::test]
async fn test_update_trace_reports_existence() -> Result<()> {
    let store = seeded_mock_store().await?;
    store.insert_trace(&test_trace("t1", "p1", "w1", at(0))).await?;
    let update = TraceUpdate {
        end_time: Some(at(30)),
        ..TraceUpdate::default()
    };

    assert!(store.update_trace("t1", &update).await?);
    assert!(!store.update_trace("t2", &update).await?);
    assert_eq!(store.node_count(NodeLabel::Trace), 1);
    assert_eq!(
        store.find_trace_by_id("t1").await?.unwrap().end_time,
        Some(at(30))
    );
    Ok(())
}

#[tokio::test]
async fn test_hierarchy_scenario() -> Result<()> {
    let store = seeded_mock_store().await?;
    let trace = test_trace("t1", "p1", "w1", at(0));
    store.insert_trace(&trace).await?;
    store.insert_span(&test_span("s1", &trace, None, at(1))).await?;
    store.insert_span(&test_span("s2", &trace, Some("s1"), at(2))).await?;

    let spans: Vec<_> = store.find_spans_by_trace("t1").try_collect().await?;
    assert_eq!(ids(&spans, |s| &s.id), vec!["s1", "s2"]);

    let children: Vec<_> = store.find_child_spans("s1").try_collect().await?;
    assert_eq!(ids(&children, |s| &s.id), vec!["s2"]);

    assert!(store.edge_exists(RelType::Contains, "w1", "p1"));
    assert!(store.edge_exists(RelType::HasTrace, "p1", "t1"));
    assert!(store.edge_exists(RelType::HasSpan, "t1", "s1"));
    assert!(store.edge_exists(RelType::HasSpan, "t1", "s2"));
    assert!(store.edge_exists(RelType::ParentOf, "s1", "s2"));
    assert_eq!(store.edge_count(RelType::ParentOf), 1);
    Ok(())
}

#[tokio::test]
async fn test_late_parent_is_not_backfilled() -> Result<()> {
    let store = seeded_mock_store().await?;
    let trace = test_trace("t1", "p1", "w1", at(0));
    store.insert_trace(&trace).await?;

    store.insert_span(&test_span("child", &trace, Some("parent"), at(2))).await?;
    assert_eq!(store.node_count(NodeLabel::Span), 1);
    assert_eq!(store.edge_count(RelType::ParentOf), 0);

    store.insert_span(&test_span("parent", &trace, None, at(1))).await?;
    assert!(!store.edge_exists(RelType::ParentOf, "parent", "child"));
    let children: Vec<_> = store.find_child_spans("parent").try_collect().await?;
    assert!(children.is_empty());

    // Stored parentSpanId is still reported
    let child = store.find_span_by_id("child").await?.unwrap();
    assert_eq!(child.parent_span_id.as_deref(), Some("parent"));
    Ok(())
}

#[tokio::test]
async fn test_span_updates_never_move_the_parent() -> Result<()> {
    let store = seeded_mock_store().await?;
    let trace = test_trace("t1", "p1", "w1", at(0));
    store.insert_trace(&trace).await?;
    store.insert_span(&test_span("s1", &trace, None, at(1))).await?;
    store.insert_span(&test_span("s3", &trace, None, at(2))).await?;
    store.insert_span(&test_span("s2", &trace, Some("s1"), at(3))).await?;

    let reparent = SpanUpdate {
        parent_span_id: Some("s3".to_string()),
        name: Some("renamed".to_string()),
        ..SpanUpdate::default()
    };
    assert!(store.update_span("s2", &reparent).await?);
    store
        .bulk_update_spans(&["s2".to_string()], &reparent, TagMergePolicy::Append)
        .await?;
    let upsert = SpanUpdate {
        trace_id: Some("t1".to_string()),
        ..reparent.clone()
    };
    store.upsert_span("p1", "s2", &upsert).await?;

    let stored = store.find_span_by_id("s2").await?.unwrap();
    assert_eq!(stored.name, "renamed");
    assert_eq!(stored.parent_span_id.as_deref(), Some("s1"));
    let under_s1: Vec<_> = store.find_child_spans("s1").try_collect().await?;
    assert_eq!(ids(&under_s1, |s| &s.id), vec!["s2"]);
    let under_s3: Vec<_> = store.find_child_spans("s3").try_collect().await?;
    assert!(under_s3.is_empty());
    assert!(!store.edge_exists(RelType::ParentOf, "s3", "s2"));
    assert_eq!(store.edge_count(RelType::ParentOf), 1);
    Ok(())
}

#[tokio::test]
async fn test_span_without_trace_is_missing_parent() -> Result<()> {
    let store = seeded_mock_store().await?;
    let ghost = test_trace("ghost", "p1", "w1", at(0));
    let err = store
        .insert_span(&test_span("s1", &ghost, None, at(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::MissingParent { parent: "Trace", .. }));
    assert_eq!(store.node_count(NodeLabel::Span), 0);
    Ok(())
}

#[tokio::test]
async fn test_batch_with_missing_owner_writes_nothing() -> Result<()> {
    let store = seeded_mock_store().await?;
    let trace = test_trace("t1", "p1", "w1", at(0));
    store.insert_trace(&trace).await?;
    let orphan_trace = test_trace("t-missing", "p1", "w1", at(0));

    let spans = vec![
        test_span("s1", &trace, None, at(1)),
        test_span("s2", &trace, Some("s1"), at(2)),
        test_span("s3", &orphan_trace, None, at(3)),
    ];
    let err = store.batch_insert_spans(&spans).await.unwrap_err();
    assert!(
        matches!(&err, StorageError::MissingParent { id, parent_id, .. } if id == "s3" && parent_id == "t-missing"),
        "{err}"
    );
    assert_eq!(store.node_count(NodeLabel::Span), 0);
    assert_eq!(store.edge_count(RelType::HasSpan), 0);
    assert_eq!(store.edge_count(RelType::ParentOf), 0);
    Ok(())
}

#[tokio::test]
async fn test_batch_links_parents_within_batch() -> Result<()> {
    let store = seeded_mock_store().await?;
    let trace = test_trace("t1", "p1", "w1", at(0));
    store.insert_trace(&trace).await?;

    // Child listed before its parent
    let spans = vec![
        test_span("s2", &trace, Some("s1"), at(2)),
        test_span("s1", &trace, None, at(1)),
    ];
    assert_eq!(store.batch_insert_spans(&spans).await?, 2);
    assert!(store.edge_exists(RelType::ParentOf, "s1", "s2"));
    assert_eq!(store.edge_count(RelType::HasSpan), 2);
    Ok(())
}

#[tokio::test]
async fn test_trace_with_spans_lands_together() -> Result<()> {
    let store = seeded_mock_store().await?;
    let trace = test_trace("t1", "p1", "w1", at(0));
    let spans = vec![
        test_span("s2", &trace, Some("s1"), at(2)),
        test_span("s1", &trace, None, at(1)),
    ];
    assert_eq!(store.insert_trace_with_spans(&trace, &spans).await?, 2);
    assert_eq!(store.find_trace_by_id("t1").await?, Some(trace.clone()));
    assert!(store.edge_exists(RelType::HasTrace, "p1", "t1"));
    assert!(store.edge_exists(RelType::ParentOf, "s1", "s2"));

    let empty = test_trace("t-empty", "p1", "w1", at(0));
    assert_eq!(store.insert_trace_with_spans(&empty, &[]).await?, 0);
    assert!(store.find_trace_by_id("t-empty").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_trace_with_spans_writes_nothing_on_failure() -> Result<()> {
    let store = seeded_mock_store().await?;
    let stored = test_trace("t0", "p1", "w1", at(0));
    store.insert_trace(&stored).await?;
    store.insert_span(&test_span("taken", &stored, None, at(0))).await?;

    // Span id already stored
    let trace = test_trace("t1", "p1", "w1", at(1));
    let err = store
        .insert_trace_with_spans(
            &trace,
            &[test_span("fresh", &trace, None, at(2)), test_span("taken", &trace, None, at(3))],
        )
        .await
        .unwrap_err();
    assert!(
        matches!(&err, StorageError::IdentityConflict { entity: "Span", id } if id == "taken"),
        "{err}"
    );

    // Project missing
    let orphan = test_trace("t2", "nope", "w1", at(1));
    let err = store
        .insert_trace_with_spans(&orphan, &[test_span("s9", &orphan, None, at(2))])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::MissingParent { parent: "Project", .. }));

    // Span of another trace
    let err = store
        .insert_trace_with_spans(&trace, &[test_span("s8", &stored, None, at(2))])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidInput(_)));

    assert_eq!(store.node_count(NodeLabel::Trace), 1);
    assert_eq!(store.node_count(NodeLabel::Span), 1);
    assert_eq!(store.edge_count(RelType::HasSpan), 1);
    Ok(())
}

#[tokio::test]
async fn test_batch_rejects_duplicates_and_oversize() -> Result<()> {
    let store = MockGraphStore::new(&mock_config(2));
    store.create_workspace(&test_workspace("w1")).await?;
    store.save_project(&test_project("p1", "w1")).await?;

    let dupes = vec![
        test_trace("t1", "p1", "w1", at(0)),
        test_trace("t1", "p1", "w1", at(1)),
    ];
    let err = store.batch_insert_traces(&dupes).await.unwrap_err();
    assert!(matches!(err, StorageError::IdentityConflict { .. }));

    let too_many: Vec<_> = (0..3)
        .map(|i| test_trace(&format!("t{i}"), "p1", "w1", at(i)))
        .collect();
    let err = store.batch_insert_traces(&too_many).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::BatchSizeExceeded { requested: 3, max: 2 }
    ));

    assert_eq!(store.batch_insert_traces(&[]).await?, 0);
    assert_eq!(store.node_count(NodeLabel::Trace), 0);
    Ok(())
}

#[tokio::test]
async fn test_batch_conflicting_with_stored_id_writes_nothing() -> Result<()> {
    let store = seeded_mock_store().await?;
    store.insert_trace(&test_trace("t1", "p1", "w1", at(0))).await?;

    let batch = vec![
        test_trace("t2", "p1", "w1", at(1)),
        test_trace("t1", "p1", "w1", at(2)),
    ];
    let err = store.batch_insert_traces(&batch).await.unwrap_err();
    assert!(matches!(&err, StorageError::IdentityConflict { id, .. } if id == "t1"));
    assert_eq!(store.find_trace_by_id("t2").await?, None);
    Ok(())
}

#[tokio::test]
async fn test_delete_traces_keeps_spans() -> Result<()> {
    let store = seeded_mock_store().await?;
    let trace = test_trace("t1", "p1", "w1", at(0));
    store.insert_trace(&trace).await?;
    store.insert_span(&test_span("s1", &trace, None, at(1))).await?;
    store.insert_span(&test_span("s2", &trace, Some("s1"), at(2))).await?;

    let deleted = store.delete_traces(&["t1".to_string()], "p1").await?;
    assert_eq!(deleted, 1);
    assert_eq!(store.find_trace_by_id("t1").await?, None);
    assert!(!store.edge_exists(RelType::HasTrace, "p1", "t1"));
    assert!(!store.edge_exists(RelType::HasSpan, "t1", "s1"));
    assert!(store.find_span_by_id("s1").await?.is_some());
    assert!(store.edge_exists(RelType::ParentOf, "s1", "s2"));

    let deleted = store
        .delete_spans_by_trace_ids(&["t1".to_string()], "p1")
        .await?;
    assert_eq!(deleted, 2);
    assert_eq!(store.node_count(NodeLabel::Span), 0);
    assert_eq!(store.edge_count(RelType::ParentOf), 0);
    Ok(())
}

#[tokio::test]
async fn test_delete_traces_is_scoped_to_project() -> Result<()> {
    let store = seeded_mock_store().await?;
    store.save_project(&test_project("p2", "w1")).await?;
    store.insert_trace(&test_trace("t1", "p1", "w1", at(0))).await?;
    store.insert_trace(&test_trace("t2", "p2", "w1", at(0))).await?;

    let deleted = store
        .delete_traces(&["t1".to_string(), "t2".to_string()], "p1")
        .await?;
    assert_eq!(deleted, 1);
    assert!(store.find_trace_by_id("t2").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_bulk_update_tag_policies() -> Result<()> {
    let store = seeded_mock_store().await?;
    let mut trace = test_trace("t1", "p1", "w1", at(0));
    trace.tags = vec!["a".to_string(), "b".to_string()];
    store.insert_trace(&trace).await?;

    let update = TraceUpdate {
        tags: Some(vec!["b".to_string(), "c".to_string()]),
        ..TraceUpdate::default()
    };
    let ids = vec!["t1".to_string(), "unknown".to_string()];

    store
        .bulk_update_traces(&ids, &update, TagMergePolicy::Append)
        .await?;
    assert_eq!(
        store.find_trace_by_id("t1").await?.unwrap().tags,
        vec!["a", "b", "b", "c"]
    );

    store
        .bulk_update_traces(&ids, &update, TagMergePolicy::Replace)
        .await?;
    assert_eq!(store.find_trace_by_id("t1").await?.unwrap().tags, vec!["b", "c"]);
    assert_eq!(store.node_count(NodeLabel::Trace), 1);
    Ok(())
}

#[tokio::test]
async fn test_bulk_update_dedupes_when_configured() -> Result<()> {
    let mut config = mock_config(100);
    config.dedupe_merged_tags = true;
    let store = MockGraphStore::new(&config);
    store.create_workspace(&test_workspace("w1")).await?;
    store.save_project(&test_project("p1", "w1")).await?;
    let trace = test_trace("t1", "p1", "w1", at(0));
    store.insert_trace(&trace).await?;
    let mut span = test_span("s1", &trace, None, at(1));
    span.tags = vec!["a".to_string(), "b".to_string()];
    store.insert_span(&span).await?;

    let update = SpanUpdate {
        tags: Some(vec!["b".to_string(), "c".to_string()]),
        model: Some("gpt".to_string()),
        ..SpanUpdate::default()
    };
    store
        .bulk_update_spans(&["s1".to_string()], &update, TagMergePolicy::Append)
        .await?;

    let stored = store.find_span_by_id("s1").await?.unwrap();
    assert_eq!(stored.tags, vec!["a", "b", "c"]);
    assert_eq!(stored.model.as_deref(), Some("gpt"));
    Ok(())
}

#[tokio::test]
async fn test_upsert_span_requires_trace() -> Result<()> {
    let store = seeded_mock_store().await?;
    let err = store
        .upsert_span("p1", "s1", &SpanUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidInput(_)));
    Ok(())
}

#[tokio::test]
async fn test_upsert_span_keeps_original_owner() -> Result<()> {
    let store = seeded_mock_store().await?;
    let t1 = test_trace("t1", "p1", "w1", at(0));
    let t2 = test_trace("t2", "p1", "w1", at(0));
    store.insert_trace(&t1).await?;
    store.insert_trace(&t2).await?;
    store.insert_span(&test_span("s1", &t1, None, at(1))).await?;

    let update = SpanUpdate {
        trace_id: Some("t2".to_string()),
        name: Some("renamed".to_string()),
        ..SpanUpdate::default()
    };
    store.upsert_span("p1", "s1", &update).await?;

    let stored = store.find_span_by_id("s1").await?.unwrap();
    assert_eq!(stored.trace_id, "t1");
    assert_eq!(stored.name, "renamed");
    assert!(!store.edge_exists(RelType::HasSpan, "t2", "s1"));
    assert_eq!(store.edge_count(RelType::HasSpan), 1);
    Ok(())
}

#[tokio::test]
async fn test_upsert_span_creates_and_links() -> Result<()> {
    let store = seeded_mock_store().await?;
    let trace = test_trace("t1", "p1", "w1", at(0));
    store.insert_trace(&trace).await?;
    store.insert_span(&test_span("root", &trace, None, at(1))).await?;

    let update = SpanUpdate {
        trace_id: Some("t1".to_string()),
        parent_span_id: Some("root".to_string()),
        ..SpanUpdate::default()
    };
    store.upsert_span("p1", "leaf", &update).await?;

    let leaf = store.find_span_by_id("leaf").await?.unwrap();
    assert_eq!(leaf.project_id, "p1");
    assert_eq!(leaf.workspace_id, "w1");
    assert!(leaf.tags.is_empty());
    assert!(store.edge_exists(RelType::ParentOf, "root", "leaf"));
    Ok(())
}

#[tokio::test]
async fn test_trace_pages_newest_first() -> Result<()> {
    let store = seeded_mock_store().await?;
    let traces: Vec<_> = (0..5)
        .map(|i| test_trace(&format!("t{i}"), "p1", "w1", at(i)))
        .collect();
    store.batch_insert_traces(&traces).await?;

    let page = store.find_traces_by_project("p1", 0, 2).await?;
    assert_eq!(page.total, 5);
    assert_eq!(ids(&page.content, |t| &t.id), vec!["t4", "t3"]);

    let last = store.find_traces_by_project("p1", 2, 2).await?;
    assert_eq!(ids(&last.content, |t| &t.id), vec!["t0"]);

    let beyond = store.find_traces_by_project("p1", 9, 2).await?;
    assert!(beyond.content.is_empty());
    assert_eq!(beyond.total, 5);

    assert!(matches!(
        store.find_traces_by_project("p1", 0, 0).await,
        Err(StorageError::InvalidInput(_))
    ));

    let recent: Vec<_> = store.search_traces("p1", 3).try_collect().await?;
    assert_eq!(ids(&recent, |t| &t.id), vec!["t4", "t3", "t2"]);
    Ok(())
}

#[tokio::test]
async fn test_span_pages_filter_by_trace() -> Result<()> {
    let store = seeded_mock_store().await?;
    let t1 = test_trace("t1", "p1", "w1", at(0));
    let t2 = test_trace("t2", "p1", "w1", at(0));
    store.batch_insert_traces(&[t1.clone(), t2.clone()]).await?;
    store
        .batch_insert_spans(&[
            test_span("a", &t1, None, at(1)),
            test_span("b", &t1, None, at(2)),
            test_span("c", &t2, None, at(3)),
        ])
        .await?;

    let all = store.find_spans("p1", None, 0, 10).await?;
    assert_eq!(all.total, 3);
    assert_eq!(ids(&all.content, |s| &s.id), vec!["c", "b", "a"]);

    let only_t1 = store.find_spans("p1", Some("t1"), 0, 10).await?;
    assert_eq!(only_t1.total, 2);

    let by_traces: Vec<_> = store
        .find_spans_by_trace_ids(vec!["t1".to_string(), "t2".to_string()])
        .try_collect()
        .await?;
    assert_eq!(ids(&by_traces, |s| &s.id), vec!["a", "b", "c"]);

    assert_eq!(
        store.span_ids_for_traces(&["t2".to_string()]).await?,
        vec!["c".to_string()]
    );
    assert_eq!(store.project_id_of_span("a").await?.as_deref(), Some("p1"));
    assert_eq!(store.project_id_of_span("zzz").await?, None);

    let recent: Vec<_> = store.search_spans("p1", 2).try_collect().await?;
    assert_eq!(ids(&recent, |s| &s.id), vec!["c", "b"]);
    assert!(store.find_span_in_project("a", "p1").await?.is_some());
    assert_eq!(store.find_span_in_project("a", "p2").await?, None);
    Ok(())
}

#[tokio::test]
async fn test_workspace_ids_of_resources() -> Result<()> {
    let store = seeded_mock_store().await?;
    store.create_workspace(&test_workspace("w2")).await?;
    store.save_project(&test_project("p2", "w2")).await?;
    let t1 = test_trace("t1", "p1", "w1", at(0));
    let t2 = test_trace("t2", "p2", "w2", at(0));
    store.insert_trace_with_spans(&t1, &[test_span("a", &t1, None, at(1))]).await?;
    store.insert_trace_with_spans(&t2, &[test_span("b", &t2, None, at(1))]).await?;

    let wanted: Vec<String> = ["t2", "t1", "ghost", "t1"].iter().map(|id| id.to_string()).collect();
    assert_eq!(
        store.workspace_ids_of_traces(&wanted).await?,
        vec![
            ("t1".to_string(), "w1".to_string()),
            ("t2".to_string(), "w2".to_string())
        ]
    );
    assert_eq!(
        store
            .workspace_ids_of_spans(&["b".to_string(), "ghost".to_string()])
            .await?,
        vec![("b".to_string(), "w2".to_string())]
    );
    assert!(store.workspace_ids_of_spans(&[]).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_trace_lookups() -> Result<()> {
    let store = seeded_mock_store().await?;
    let mut threaded = test_trace("t1", "p1", "w1", at(0));
    threaded.thread_id = Some("th-1".to_string());
    store.insert_trace(&threaded).await?;
    store.insert_trace(&test_trace("t2", "p1", "w1", at(1))).await?;

    assert_eq!(
        store
            .trace_ids_by_thread_ids("p1", &["th-1".to_string()])
            .await?,
        vec!["t1".to_string()]
    );
    assert!(store.trace_ids_by_thread_ids("p1", &[]).await?.is_empty());
    assert_eq!(store.count_traces(&["p1".to_string()]).await?, 2);
    assert_eq!(store.count_traces(&["p9".to_string()]).await?, 0);
    assert_eq!(store.project_id_of_trace("t2").await?.as_deref(), Some("p1"));

    let found: Vec<_> = store
        .find_traces_by_ids(vec!["t1".to_string(), "t2".to_string(), "t3".to_string()])
        .try_collect()
        .await?;
    assert_eq!(ids(&found, |t| &t.id), vec!["t2", "t1"]);
    Ok(())
}

#[tokio::test]
async fn test_workspace_and_projects() -> Result<()> {
    let store = MockGraphStore::default();
    let first = store.create_workspace(&test_workspace("w1")).await?;
    let mut again = test_workspace("w1");
    again.name = "renamed".to_string();
    let second = store.create_workspace(&again).await?;
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.name, "renamed");

    let err = store
        .save_project(&test_project("p1", "nowhere"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::MissingParent { parent: "Workspace", .. }));

    store.save_project(&test_project("pb", "w1")).await?;
    store.save_project(&test_project("pa", "w1")).await?;
    let projects: Vec<_> = store.find_projects_by_workspace("w1").try_collect().await?;
    assert_eq!(ids(&projects, |p| &p.id), vec!["pa", "pb"]);
    assert_eq!(store.count_projects("w1").await?, 2);

    store.delete_project("pa").await?;
    assert_eq!(store.find_project_by_id("pa").await?, None);
    assert!(!store.edge_exists(RelType::Contains, "w1", "pa"));
    assert_eq!(store.count_projects("w1").await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_admin_operations() -> Result<()> {
    let store = MockGraphStore::default();
    store.apply_schema().await?;
    assert!(store.health_check().await.healthy);
    Ok(())
}
