//! Entity mapper: typed entities to node property maps and back
//!
//! Each entity type has one `encode` and one `decode` function; callers pick the
//! decoder statically for the query they run. Raw encoded payload text never
//! leaves this module.

pub(crate) mod codec;
mod project;
mod span;
mod trace;

pub use codec::{encode_timestamp, ENCODING_VERSION, ENCODING_VERSION_KEY};
pub use project::{decode_project, decode_workspace, encode_project, encode_workspace};
pub use span::{decode_span, encode_span, encode_span_update};
pub use trace::{decode_trace, encode_trace, encode_trace_update};

/// Node property names
pub mod props {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const WORKSPACE_ID: &str = "workspaceId";
    pub const PROJECT_ID: &str = "projectId";
    pub const TRACE_ID: &str = "traceId";
    pub const PARENT_SPAN_ID: &str = "parentSpanId";
    pub const THREAD_ID: &str = "threadId";
    pub const SPAN_TYPE: &str = "type";
    pub const START_TIME: &str = "startTime";
    pub const END_TIME: &str = "endTime";
    pub const INPUT: &str = "input";
    pub const OUTPUT: &str = "output";
    pub const METADATA: &str = "metadata";
    pub const TAGS: &str = "tags";
    pub const ERROR_INFO: &str = "errorInfo";
    pub const VISIBILITY_MODE: &str = "visibilityMode";
    pub const MODEL: &str = "model";
    pub const PROVIDER: &str = "provider";
    pub const TOTAL_ESTIMATED_COST: &str = "totalEstimatedCost";
    pub const USAGE: &str = "usage";
    pub const CREATED_AT: &str = "createdAt";
    pub const CREATED_BY: &str = "createdBy";
    pub const LAST_UPDATED_AT: &str = "lastUpdatedAt";
    pub const LAST_UPDATED_BY: &str = "lastUpdatedBy";
}
