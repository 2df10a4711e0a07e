//! Ownership and parent-span relationships
//!
//! Workspace → Project → Trace → Span ownership edges are write preconditions:
//! the owner is matched first, so a missing owner produces no rows and the write
//! reports [`StorageError::MissingParent`](crate::StorageError::MissingParent).
//! The span → span `PARENT_OF` edge is optional and only created when the parent
//! already exists.

use std::fmt;

use crate::mapper::props;
use crate::merge::ParamScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeLabel {
    Workspace,
    Project,
    Trace,
    Span,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workspace => "Workspace",
            Self::Project => "Project",
            Self::Trace => "Trace",
            Self::Span => "Span",
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelType {
    Contains,
    HasTrace,
    HasSpan,
    ParentOf,
}

impl RelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "CONTAINS",
            Self::HasTrace => "HAS_TRACE",
            Self::HasSpan => "HAS_SPAN",
            Self::ParentOf => "PARENT_OF",
        }
    }
}

/// A required owner → child edge
#[derive(Debug, Clone, Copy)]
pub struct Ownership {
    pub owner: NodeLabel,
    pub owner_alias: &'static str,
    pub child: NodeLabel,
    pub child_alias: &'static str,
    pub rel: RelType,
    /// Child property (and parameter) naming the owner's id
    pub owner_key: &'static str,
}

pub const WORKSPACE_PROJECT: Ownership = Ownership {
    owner: NodeLabel::Workspace,
    owner_alias: "w",
    child: NodeLabel::Project,
    child_alias: "p",
    rel: RelType::Contains,
    owner_key: props::WORKSPACE_ID,
};

pub const PROJECT_TRACE: Ownership = Ownership {
    owner: NodeLabel::Project,
    owner_alias: "p",
    child: NodeLabel::Trace,
    child_alias: "t",
    rel: RelType::HasTrace,
    owner_key: props::PROJECT_ID,
};

pub const TRACE_SPAN: Ownership = Ownership {
    owner: NodeLabel::Trace,
    owner_alias: "tr",
    child: NodeLabel::Span,
    child_alias: "s",
    rel: RelType::HasSpan,
    owner_key: props::TRACE_ID,
};

impl Ownership {
    /// `MATCH` clause binding the owner; yields no rows when it is absent
    pub fn match_owner(&self, scope: ParamScope) -> String {
        format!(
            "MATCH ({}:{} {{id: {}}})",
            self.owner_alias,
            self.owner,
            scope.param(self.owner_key)
        )
    }

    /// Edge for a freshly created child
    pub fn create_edge(&self) -> String {
        format!(
            "CREATE ({})-[:{}]->({})",
            self.owner_alias,
            self.rel.as_str(),
            self.child_alias
        )
    }

    /// Edge for an upserted child, skipped when the stored owner id differs
    pub fn merge_edge(&self) -> String {
        format!(
            "FOREACH (_ IN CASE WHEN {child}.{key} = {owner}.id THEN [1] ELSE [] END | \
             MERGE ({owner})-[:{rel}]->({child}))",
            child = self.child_alias,
            key = self.owner_key,
            owner = self.owner_alias,
            rel = self.rel.as_str()
        )
    }

    /// Read that returns the first of `$ownerIds` with no matching owner node
    pub fn missing_owner_probe(&self) -> String {
        format!(
            "UNWIND $ownerIds AS ownerId \
             OPTIONAL MATCH (o:{} {{id: ownerId}}) \
             WITH ownerId, o WHERE o IS NULL \
             RETURN ownerId LIMIT 1",
            self.owner
        )
    }
}

/// Optional span → child span edge
#[derive(Debug, Clone, Copy)]
pub struct ParentLink {
    pub alias: &'static str,
    pub parent_alias: &'static str,
}

pub const SPAN_PARENT: ParentLink = ParentLink {
    alias: "s",
    parent_alias: "ps",
};

impl ParentLink {
    /// Links the written span to its stored `parentSpanId` if that span exists
    ///
    /// `carry` lists extra variables kept in scope (e.g. the UNWIND row). A span
    /// never gets a second incoming `PARENT_OF` and never parents itself.
    pub fn link(&self, carry: &[&str]) -> String {
        let mut scope = vec![self.alias];
        scope.extend_from_slice(carry);
        format!(
            "WITH {scope} \
             OPTIONAL MATCH ({ps}:{label} {{id: {s}.{key}}}) \
             WHERE {ps}.id <> {s}.id AND NOT (:{label})-[:{rel}]->({s}) \
             FOREACH (_ IN CASE WHEN {ps} IS NULL THEN [] ELSE [1] END | \
             MERGE ({ps})-[:{rel}]->({s}))",
            scope = scope.join(", "),
            ps = self.parent_alias,
            s = self.alias,
            label = NodeLabel::Span,
            key = props::PARENT_SPAN_ID,
            rel = RelType::ParentOf.as_str()
        )
    }
}
