use tracegraph_core::{Trace, TraceUpdate};

use super::codec::{NodeReader, NodeWriter};
use super::props::*;
use crate::error::Result;
use crate::property::PropertyMap;

const ENTITY: &str = "Trace";

pub fn encode_trace(trace: &Trace) -> Result<PropertyMap> {
    Ok(NodeWriter::new(ENTITY)
        .value(ID, trace.id.as_str())
        .value(PROJECT_ID, trace.project_id.as_str())
        .value(WORKSPACE_ID, trace.workspace_id.as_str())
        .value(NAME, trace.name.as_str())
        .timestamp(START_TIME, Some(&trace.start_time))
        .timestamp(END_TIME, trace.end_time.as_ref())
        .payload(INPUT, trace.input.as_ref())?
        .payload(OUTPUT, trace.output.as_ref())?
        .payload(METADATA, trace.metadata.as_ref())?
        .value(TAGS, trace.tags.clone())
        .value(THREAD_ID, trace.thread_id.clone())
        .payload(ERROR_INFO, trace.error_info.as_ref())?
        .enumeration(VISIBILITY_MODE, Some(&trace.visibility_mode))
        .timestamp(CREATED_AT, Some(&trace.created_at))
        .value(CREATED_BY, trace.created_by.as_str())
        .timestamp(LAST_UPDATED_AT, Some(&trace.last_updated_at))
        .value(LAST_UPDATED_BY, trace.last_updated_by.as_str())
        .finish())
}

/// Encodes a partial write; unsupplied fields become null parameters
pub fn encode_trace_update(id: &str, project_id: &str, update: &TraceUpdate) -> Result<PropertyMap> {
    Ok(NodeWriter::new(ENTITY)
        .value(ID, id)
        .value(PROJECT_ID, project_id)
        .value(WORKSPACE_ID, update.workspace_id.clone())
        .value(NAME, update.name.clone())
        .timestamp(START_TIME, update.start_time.as_ref())
        .timestamp(END_TIME, update.end_time.as_ref())
        .payload(INPUT, update.input.as_ref())?
        .payload(OUTPUT, update.output.as_ref())?
        .payload(METADATA, update.metadata.as_ref())?
        .value(TAGS, update.tags.clone())
        .value(THREAD_ID, update.thread_id.clone())
        .payload(ERROR_INFO, update.error_info.as_ref())?
        .enumeration(VISIBILITY_MODE, update.visibility_mode.as_ref())
        .value(CREATED_BY, update.created_by.clone())
        .value(LAST_UPDATED_BY, update.last_updated_by.clone())
        .finish())
}

pub fn decode_trace(props: &PropertyMap) -> Result<Trace> {
    let node = NodeReader::new(ENTITY, props)?;
    Ok(Trace {
        id: node.id().to_string(),
        project_id: node.string(PROJECT_ID)?,
        workspace_id: node.string(WORKSPACE_ID)?,
        name: node.opt_string(NAME)?.unwrap_or_default(),
        start_time: node.timestamp(START_TIME)?,
        end_time: node.opt_timestamp(END_TIME)?,
        input: node.json(INPUT)?,
        output: node.json(OUTPUT)?,
        metadata: node.json(METADATA)?,
        tags: node.string_list(TAGS)?,
        thread_id: node.opt_string(THREAD_ID)?,
        error_info: node.payload(ERROR_INFO)?,
        visibility_mode: node.enumeration(VISIBILITY_MODE)?,
        created_at: node.timestamp(CREATED_AT)?,
        created_by: node.string(CREATED_BY)?,
        last_updated_at: node.timestamp(LAST_UPDATED_AT)?,
        last_updated_by: node.string(LAST_UPDATED_BY)?,
    })
}
