//! Scalar property values as stored on graph nodes

use neo4rs::{BoltNull, BoltType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Property map of one node, keyed by property name
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A value Neo4j can hold as a node property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Kind name used in decode errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values.into_iter().map(Self::String).collect())
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<PropertyValue> for BoltType {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Null => BoltType::Null(BoltNull),
            PropertyValue::Bool(b) => b.into(),
            PropertyValue::Integer(i) => i.into(),
            PropertyValue::Float(f) => f.into(),
            PropertyValue::String(s) => s.into(),
            PropertyValue::List(items) => items
                .into_iter()
                .map(BoltType::from)
                .collect::<Vec<BoltType>>()
                .into(),
        }
    }
}

/// Converts a property map into a Bolt map parameter
pub fn to_bolt_map(props: PropertyMap) -> BoltType {
    props
        .into_iter()
        .map(|(key, value)| (key, BoltType::from(value)))
        .collect::<HashMap<String, BoltType>>()
        .into()
}
