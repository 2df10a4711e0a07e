//! Upsert/merge engine
//!
//! A [`WritePlan`] lists, per property, what a create sets and what an update of
//! an existing node does. The same table renders the Cypher `SET` clauses and
//! drives the in-memory store, so the create half of an upsert, a plain insert
//! and a batch insert all apply identical creation defaults.

use crate::hierarchy::{NodeLabel, Ownership};
use crate::mapper::props::*;
use crate::mapper::ENCODING_VERSION_KEY;
use crate::property::{PropertyMap, PropertyValue};
use tracegraph_core::{TagMergePolicy, DEFAULT_USER};

/// Parameter holding the write timestamp
pub const NOW_PARAM: &str = "now";

/// Where rendered expressions read their parameters from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamScope {
    /// Top-level query parameters (`$name`)
    Top,
    /// Fields of an UNWIND row (`row.name`)
    Row(&'static str),
}

impl ParamScope {
    pub fn param(&self, name: &str) -> String {
        match self {
            Self::Top => format!("${name}"),
            Self::Row(alias) => format!("{alias}.{name}"),
        }
    }
}

/// Value used on create when the parameter is null
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fallback {
    None,
    Now,
    Text(&'static str),
    EmptyList,
    /// Same-named property of the matched owner node
    Owner(&'static str),
}

/// What an update does to a stored property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMatch {
    Keep,
    /// Supplied value wins, otherwise the stored value stays
    Coalesce,
    /// Supplied value wins, otherwise the write timestamp
    Refresh,
    /// Supplied value always wins (null clears)
    Overwrite,
    /// Governed by the caller's [`TagRule`]
    Tags,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRule {
    pub property: &'static str,
    pub on_create: Fallback,
    pub on_match: OnMatch,
}

const fn rule(property: &'static str, on_create: Fallback, on_match: OnMatch) -> FieldRule {
    FieldRule {
        property,
        on_create,
        on_match,
    }
}

/// Tag handling for one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagRule {
    Replace,
    Append { dedupe: bool },
}

impl TagRule {
    pub fn new(policy: TagMergePolicy, dedupe: bool) -> Self {
        match policy {
            TagMergePolicy::Replace => Self::Replace,
            TagMergePolicy::Append => Self::Append { dedupe },
        }
    }
}

#[derive(Debug)]
pub struct WritePlan {
    pub label: NodeLabel,
    pub alias: &'static str,
    pub owner_alias: Option<&'static str>,
    pub fields: &'static [FieldRule],
}

pub const WORKSPACE_PLAN: WritePlan = WritePlan {
    label: NodeLabel::Workspace,
    alias: "w",
    owner_alias: None,
    fields: &[
        rule(NAME, Fallback::Text(""), OnMatch::Coalesce),
        rule(CREATED_AT, Fallback::Now, OnMatch::Keep),
        rule(ENCODING_VERSION_KEY, Fallback::None, OnMatch::Coalesce),
    ],
};

pub const PROJECT_PLAN: WritePlan = WritePlan {
    label: NodeLabel::Project,
    alias: "p",
    owner_alias: Some("w"),
    fields: &[
        rule(WORKSPACE_ID, Fallback::Owner(ID), OnMatch::Keep),
        rule(NAME, Fallback::Text(""), OnMatch::Overwrite),
        rule(DESCRIPTION, Fallback::None, OnMatch::Overwrite),
        rule(CREATED_AT, Fallback::Now, OnMatch::Keep),
        rule(CREATED_BY, Fallback::Text(DEFAULT_USER), OnMatch::Keep),
        rule(LAST_UPDATED_AT, Fallback::Now, OnMatch::Refresh),
        rule(LAST_UPDATED_BY, Fallback::Text(DEFAULT_USER), OnMatch::Coalesce),
        rule(ENCODING_VERSION_KEY, Fallback::None, OnMatch::Coalesce),
    ],
};

pub const TRACE_PLAN: WritePlan = WritePlan {
    label: NodeLabel::Trace,
    alias: "t",
    owner_alias: Some("p"),
    fields: &[
        rule(PROJECT_ID, Fallback::Owner(ID), OnMatch::Keep),
        rule(WORKSPACE_ID, Fallback::Owner(WORKSPACE_ID), OnMatch::Keep),
        rule(NAME, Fallback::Text(""), OnMatch::Coalesce),
        rule(START_TIME, Fallback::Now, OnMatch::Coalesce),
        rule(END_TIME, Fallback::None, OnMatch::Coalesce),
        rule(INPUT, Fallback::None, OnMatch::Coalesce),
        rule(OUTPUT, Fallback::None, OnMatch::Coalesce),
        rule(METADATA, Fallback::None, OnMatch::Coalesce),
        rule(TAGS, Fallback::EmptyList, OnMatch::Tags),
        rule(THREAD_ID, Fallback::None, OnMatch::Coalesce),
        rule(ERROR_INFO, Fallback::None, OnMatch::Coalesce),
        rule(VISIBILITY_MODE, Fallback::Text("default"), OnMatch::Coalesce),
        rule(CREATED_AT, Fallback::Now, OnMatch::Keep),
        rule(CREATED_BY, Fallback::Text(DEFAULT_USER), OnMatch::Keep),
        rule(LAST_UPDATED_AT, Fallback::Now, OnMatch::Refresh),
        rule(LAST_UPDATED_BY, Fallback::Text(DEFAULT_USER), OnMatch::Coalesce),
        rule(ENCODING_VERSION_KEY, Fallback::None, OnMatch::Coalesce),
    ],
};

pub const SPAN_PLAN: WritePlan = WritePlan {
    label: NodeLabel::Span,
    alias: "s",
    owner_alias: Some("tr"),
    fields: &[
        rule(TRACE_ID, Fallback::Owner(ID), OnMatch::Keep),
        rule(PARENT_SPAN_ID, Fallback::None, OnMatch::Keep),
        rule(PROJECT_ID, Fallback::Owner(PROJECT_ID), OnMatch::Keep),
        rule(WORKSPACE_ID, Fallback::Owner(WORKSPACE_ID), OnMatch::Keep),
        rule(NAME, Fallback::Text(""), OnMatch::Coalesce),
        rule(SPAN_TYPE, Fallback::Text("general"), OnMatch::Coalesce),
        rule(START_TIME, Fallback::Now, OnMatch::Coalesce),
        rule(END_TIME, Fallback::None, OnMatch::Coalesce),
        rule(INPUT, Fallback::None, OnMatch::Coalesce),
        rule(OUTPUT, Fallback::None, OnMatch::Coalesce),
        rule(METADATA, Fallback::None, OnMatch::Coalesce),
        rule(MODEL, Fallback::None, OnMatch::Coalesce),
        rule(PROVIDER, Fallback::None, OnMatch::Coalesce),
        rule(TOTAL_ESTIMATED_COST, Fallback::None, OnMatch::Coalesce),
        rule(USAGE, Fallback::None, OnMatch::Coalesce),
        rule(TAGS, Fallback::EmptyList, OnMatch::Tags),
        rule(ERROR_INFO, Fallback::None, OnMatch::Coalesce),
        rule(CREATED_AT, Fallback::Now, OnMatch::Keep),
        rule(CREATED_BY, Fallback::Text(DEFAULT_USER), OnMatch::Keep),
        rule(LAST_UPDATED_AT, Fallback::Now, OnMatch::Refresh),
        rule(LAST_UPDATED_BY, Fallback::Text(DEFAULT_USER), OnMatch::Coalesce),
        rule(ENCODING_VERSION_KEY, Fallback::None, OnMatch::Coalesce),
    ],
};

fn cypher_text(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl WritePlan {
    /// Fills every parameter the rendered clauses reference, using null for gaps
    pub fn complete_params(&self, mut params: PropertyMap) -> PropertyMap {
        params.entry(ID.to_string()).or_insert(PropertyValue::Null);
        for field in self.fields {
            params
                .entry(field.property.to_string())
                .or_insert(PropertyValue::Null);
        }
        params
    }

    fn fallback_expr(&self, fallback: Fallback) -> Option<String> {
        match fallback {
            Fallback::None => None,
            Fallback::Now => Some(format!("${NOW_PARAM}")),
            Fallback::Text(text) => Some(cypher_text(text)),
            Fallback::EmptyList => Some("[]".to_string()),
            Fallback::Owner(property) => self
                .owner_alias
                .map(|owner| format!("{owner}.{property}")),
        }
    }

    /// Comma-separated assignments applied when the node is created
    pub fn create_assignments(&self, scope: ParamScope) -> String {
        self.fields
            .iter()
            .map(|field| {
                let param = scope.param(field.property);
                let value = match self.fallback_expr(field.on_create) {
                    Some(fallback) => format!("coalesce({param}, {fallback})"),
                    None => param,
                };
                format!("{}.{} = {value}", self.alias, field.property)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Comma-separated assignments applied to an existing node
    pub fn match_assignments(&self, scope: ParamScope, tags: TagRule) -> String {
        let a = self.alias;
        self.fields
            .iter()
            .filter_map(|field| {
                let p = field.property;
                let param = scope.param(p);
                let value = match field.on_match {
                    OnMatch::Keep => return None,
                    OnMatch::Coalesce => format!("coalesce({param}, {a}.{p})"),
                    OnMatch::Refresh => format!("coalesce({param}, ${NOW_PARAM})"),
                    OnMatch::Overwrite => param,
                    OnMatch::Tags => match tags {
                        TagRule::Replace => format!("coalesce({param}, {a}.{p})"),
                        TagRule::Append { dedupe: false } => {
                            format!("coalesce({a}.{p}, []) + coalesce({param}, [])")
                        }
                        TagRule::Append { dedupe: true } => format!(
                            "reduce(acc = [], tag IN coalesce({a}.{p}, []) + coalesce({param}, []) | \
                             CASE WHEN tag IN acc THEN acc ELSE acc + tag END)"
                        ),
                    },
                };
                Some(format!("{a}.{p} = {value}"))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `CREATE` of a new node; a duplicate id violates the unique constraint
    pub fn render_create(&self, scope: ParamScope) -> String {
        format!(
            "CREATE ({a}:{label} {{id: {id}}}) SET {sets}",
            a = self.alias,
            label = self.label,
            id = scope.param(ID),
            sets = self.create_assignments(scope)
        )
    }

    /// `MERGE` that creates or coalesces in place
    pub fn render_upsert(&self, scope: ParamScope, tags: TagRule) -> String {
        format!(
            "MERGE ({a}:{label} {{id: {id}}}) ON CREATE SET {create} ON MATCH SET {update}",
            a = self.alias,
            label = self.label,
            id = scope.param(ID),
            create = self.create_assignments(scope),
            update = self.match_assignments(scope, tags)
        )
    }

    /// Properties of a node created from `params`, as the rendered `CREATE` stores them
    pub fn apply_create(
        &self,
        params: &PropertyMap,
        owner: Option<&PropertyMap>,
        now: &str,
    ) -> PropertyMap {
        let mut node = PropertyMap::new();
        if let Some(id) = params.get(ID) {
            node.insert(ID.to_string(), id.clone());
        }
        for field in self.fields {
            let supplied = params.get(field.property).filter(|v| !v.is_null()).cloned();
            let value = supplied.or_else(|| match field.on_create {
                Fallback::None => None,
                Fallback::Now => Some(PropertyValue::String(now.to_string())),
                Fallback::Text(text) => Some(PropertyValue::String(text.to_string())),
                Fallback::EmptyList => Some(PropertyValue::List(Vec::new())),
                Fallback::Owner(property) => owner
                    .and_then(|o| o.get(property))
                    .filter(|v| !v.is_null())
                    .cloned(),
            });
            if let Some(value) = value {
                node.insert(field.property.to_string(), value);
            }
        }
        node
    }

    /// Applies the update half to stored properties, as the rendered `ON MATCH` does
    pub fn apply_match(&self, node: &mut PropertyMap, params: &PropertyMap, now: &str, tags: TagRule) {
        for field in self.fields {
            let key = field.property;
            let supplied = params.get(key).filter(|v| !v.is_null()).cloned();
            let next = match field.on_match {
                OnMatch::Keep => continue,
                OnMatch::Coalesce => supplied.or_else(|| node.get(key).cloned()),
                OnMatch::Refresh => supplied.or_else(|| Some(PropertyValue::String(now.to_string()))),
                OnMatch::Overwrite => supplied,
                OnMatch::Tags => match tags {
                    TagRule::Replace => supplied.or_else(|| node.get(key).cloned()),
                    TagRule::Append { dedupe } => {
                        let mut merged = list_items(node.get(key));
                        merged.extend(list_items(supplied.as_ref()));
                        if dedupe {
                            let mut distinct: Vec<PropertyValue> = Vec::new();
                            for tag in merged {
                                if !distinct.contains(&tag) {
                                    distinct.push(tag);
                                }
                            }
                            merged = distinct;
                        }
                        Some(PropertyValue::List(merged))
                    }
                },
            };
            match next {
                Some(value) if !value.is_null() => {
                    node.insert(key.to_string(), value);
                }
                _ => {
                    node.remove(key);
                }
            }
        }
    }
}

fn list_items(value: Option<&PropertyValue>) -> Vec<PropertyValue> {
    match value {
        Some(PropertyValue::List(items)) => items.clone(),
        _ => Vec::new(),
    }
}
