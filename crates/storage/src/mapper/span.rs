use tracegraph_core::{Span, SpanUpdate};

use super::codec::{NodeReader, NodeWriter};
use super::props::*;
use crate::error::Result;
use crate::property::PropertyMap;

const ENTITY: &str = "Span";

pub fn encode_span(span: &Span) -> Result<PropertyMap> {
    Ok(NodeWriter::new(ENTITY)
        .value(ID, span.id.as_str())
        .value(TRACE_ID, span.trace_id.as_str())
        .value(PARENT_SPAN_ID, span.parent_span_id.clone())
        .value(PROJECT_ID, span.project_id.as_str())
        .value(WORKSPACE_ID, span.workspace_id.as_str())
        .value(NAME, span.name.as_str())
        .enumeration(SPAN_TYPE, Some(&span.span_type))
        .timestamp(START_TIME, Some(&span.start_time))
        .timestamp(END_TIME, span.end_time.as_ref())
        .payload(INPUT, span.input.as_ref())?
        .payload(OUTPUT, span.output.as_ref())?
        .payload(METADATA, span.metadata.as_ref())?
        .value(MODEL, span.model.clone())
        .value(PROVIDER, span.provider.clone())
        .value(TOTAL_ESTIMATED_COST, span.total_estimated_cost)
        .payload(USAGE, span.usage.as_ref())?
        .value(TAGS, span.tags.clone())
        .payload(ERROR_INFO, span.error_info.as_ref())?
        .timestamp(CREATED_AT, Some(&span.created_at))
        .value(CREATED_BY, span.created_by.as_str())
        .timestamp(LAST_UPDATED_AT, Some(&span.last_updated_at))
        .value(LAST_UPDATED_BY, span.last_updated_by.as_str())
        .finish())
}

/// Encodes a partial write; unsupplied fields become null parameters
pub fn encode_span_update(id: &str, project_id: &str, update: &SpanUpdate) -> Result<PropertyMap> {
    Ok(NodeWriter::new(ENTITY)
        .value(ID, id)
        .value(PROJECT_ID, project_id)
        .value(TRACE_ID, update.trace_id.clone())
        .value(PARENT_SPAN_ID, update.parent_span_id.clone())
        .value(WORKSPACE_ID, update.workspace_id.clone())
        .value(NAME, update.name.clone())
        .enumeration(SPAN_TYPE, update.span_type.as_ref())
        .timestamp(START_TIME, update.start_time.as_ref())
        .timestamp(END_TIME, update.end_time.as_ref())
        .payload(INPUT, update.input.as_ref())?
        .payload(OUTPUT, update.output.as_ref())?
        .payload(METADATA, update.metadata.as_ref())?
        .value(MODEL, update.model.clone())
        .value(PROVIDER, update.provider.clone())
        .value(TOTAL_ESTIMATED_COST, update.total_estimated_cost)
        .payload(USAGE, update.usage.as_ref())?
        .value(TAGS, update.tags.clone())
        .payload(ERROR_INFO, update.error_info.as_ref())?
        .value(CREATED_BY, update.created_by.clone())
        .value(LAST_UPDATED_BY, update.last_updated_by.clone())
        .finish())
}

pub fn decode_span(props: &PropertyMap) -> Result<Span> {
    let node = NodeReader::new(ENTITY, props)?;
    Ok(Span {
        id: node.id().to_string(),
        trace_id: node.string(TRACE_ID)?,
        parent_span_id: node.opt_string(PARENT_SPAN_ID)?,
        project_id: node.string(PROJECT_ID)?,
        workspace_id: node.string(WORKSPACE_ID)?,
        name: node.opt_string(NAME)?.unwrap_or_default(),
        span_type: node.enumeration(SPAN_TYPE)?,
        start_time: node.timestamp(START_TIME)?,
        end_time: node.opt_timestamp(END_TIME)?,
        input: node.json(INPUT)?,
        output: node.json(OUTPUT)?,
        metadata: node.json(METADATA)?,
        model: node.opt_string(MODEL)?,
        provider: node.opt_string(PROVIDER)?,
        total_estimated_cost: node.opt_float(TOTAL_ESTIMATED_COST)?,
        usage: node.json(USAGE)?,
        tags: node.string_list(TAGS)?,
        error_info: node.payload(ERROR_INFO)?,
        created_at: node.timestamp(CREATED_AT)?,
        created_by: node.string(CREATED_BY)?,
        last_updated_at: node.timestamp(LAST_UPDATED_AT)?,
        last_updated_by: node.string(LAST_UPDATED_BY)?,
    })
}
