//! Field-level encoding between typed values and node properties
//!
//! Structured payloads are stored as JSON text, timestamps as RFC 3339 UTC
//! strings with nanosecond precision, enumerations by canonical name. Every
//! node also carries [`ENCODING_VERSION`] so older readers can refuse data
//! written by a newer layout.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::{Result, StorageError};
use crate::property::{PropertyMap, PropertyValue};

/// Property holding the payload encoding version
pub const ENCODING_VERSION_KEY: &str = "encodingVersion";

/// Current payload encoding version
pub const ENCODING_VERSION: i64 = 1;

pub fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Builds the property map of one node
pub(crate) struct NodeWriter {
    entity: &'static str,
    props: PropertyMap,
}

impl NodeWriter {
    pub fn new(entity: &'static str) -> Self {
        let mut props = PropertyMap::new();
        props.insert(
            ENCODING_VERSION_KEY.to_string(),
            PropertyValue::Integer(ENCODING_VERSION),
        );
        Self { entity, props }
    }

    pub fn value(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    pub fn timestamp(self, key: &str, value: Option<&DateTime<Utc>>) -> Self {
        self.value(key, value.map(encode_timestamp))
    }

    pub fn enumeration<E: Display>(self, key: &str, value: Option<&E>) -> Self {
        self.value(key, value.map(ToString::to_string))
    }

    /// Stores a structured value as JSON text; `None` becomes a null property
    pub fn payload<T: Serialize>(self, key: &str, value: Option<&T>) -> Result<Self> {
        let encoded = match value {
            Some(v) => Some(serde_json::to_string(v).map_err(|e| {
                StorageError::SerializationError(format!(
                    "{} field '{key}' is not serializable: {e}",
                    self.entity
                ))
            })?),
            None => None,
        };
        Ok(self.value(key, encoded))
    }

    pub fn finish(self) -> PropertyMap {
        self.props
    }
}

/// Reads typed fields back out of a node's property map
///
/// Absent keys and null properties are treated the same.
pub(crate) struct NodeReader<'a> {
    entity: &'static str,
    id: String,
    props: &'a PropertyMap,
}

impl<'a> NodeReader<'a> {
    pub fn new(entity: &'static str, props: &'a PropertyMap) -> Result<Self> {
        let id = match props.get("id") {
            Some(PropertyValue::String(id)) => id.clone(),
            _ => {
                return Err(StorageError::decode(
                    entity,
                    "<unknown>",
                    "id",
                    "missing or not a string",
                ))
            }
        };
        let reader = Self { entity, id, props };
        reader.check_version()?;
        Ok(reader)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn error(&self, field: &str, reason: impl Into<String>) -> StorageError {
        StorageError::decode(self.entity, self.id.clone(), field, reason)
    }

    fn get(&self, key: &str) -> Option<&'a PropertyValue> {
        self.props.get(key).filter(|v| !v.is_null())
    }

    fn check_version(&self) -> Result<()> {
        match self.get(ENCODING_VERSION_KEY) {
            None => Ok(()),
            Some(PropertyValue::Integer(v)) if (1..=ENCODING_VERSION).contains(v) => Ok(()),
            Some(PropertyValue::Integer(v)) => Err(self.error(
                ENCODING_VERSION_KEY,
                format!("unsupported encoding version {v}"),
            )),
            Some(other) => Err(self.error(
                ENCODING_VERSION_KEY,
                format!("expected integer, found {}", other.kind()),
            )),
        }
    }

    pub fn opt_string(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(PropertyValue::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.error(key, format!("expected string, found {}", other.kind()))),
        }
    }

    pub fn string(&self, key: &str) -> Result<String> {
        self.opt_string(key)?
            .ok_or_else(|| self.error(key, "required property is missing"))
    }

    pub fn opt_float(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(PropertyValue::Float(f)) => Ok(Some(*f)),
            Some(PropertyValue::Integer(i)) => Ok(Some(*i as f64)),
            Some(other) => Err(self.error(key, format!("expected number, found {}", other.kind()))),
        }
    }

    /// Absent lists decode to an empty list
    pub fn string_list(&self, key: &str) -> Result<Vec<String>> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(PropertyValue::List(items)) => items
                .iter()
                .map(|item| match item {
                    PropertyValue::String(s) => Ok(s.clone()),
                    other => Err(self.error(
                        key,
                        format!("expected list of strings, found {}", other.kind()),
                    )),
                })
                .collect(),
            Some(other) => Err(self.error(key, format!("expected list, found {}", other.kind()))),
        }
    }

    pub fn opt_timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        self.opt_string(key)?
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|ts| ts.with_timezone(&Utc))
                    .map_err(|e| self.error(key, format!("invalid timestamp '{raw}': {e}")))
            })
            .transpose()
    }

    pub fn timestamp(&self, key: &str) -> Result<DateTime<Utc>> {
        self.opt_timestamp(key)?
            .ok_or_else(|| self.error(key, "required property is missing"))
    }

    /// Unknown names are decode errors, never a silent default
    pub fn opt_enumeration<E: FromStr>(&self, key: &str) -> Result<Option<E>> {
        self.opt_string(key)?
            .map(|raw| {
                E::from_str(&raw).map_err(|_| self.error(key, format!("unknown value '{raw}'")))
            })
            .transpose()
    }

    pub fn enumeration<E: FromStr + Default>(&self, key: &str) -> Result<E> {
        Ok(self.opt_enumeration(key)?.unwrap_or_default())
    }

    pub fn payload<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.opt_string(key)?
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| self.error(key, format!("invalid payload: {e}")))
            })
            .transpose()
    }

    pub fn json(&self, key: &str) -> Result<Option<Value>> {
        self.payload(key)
    }
}
