//! Storage-related configuration methods

use crate::error::{Error, Result};
use std::time::Duration;

use super::StorageConfig;

/// Parses a duration such as "500ms", "60s", "1m" or "1h"
///
/// A bare number is read as seconds.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();
    let invalid = || Error::config(format!("Invalid duration '{value}'"));

    let (digits, unit_millis) = if let Some(n) = value.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = value.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = value.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = value.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        (value, 1_000)
    };

    let amount: u64 = digits.trim().parse().map_err(|_| invalid())?;
    amount
        .checked_mul(unit_millis)
        .map(Duration::from_millis)
        .ok_or_else(invalid)
}

impl StorageConfig {
    /// Timeout applied while opening a session
    pub fn acquisition_timeout(&self) -> Result<Duration> {
        parse_duration(&self.connection_acquisition_timeout)
    }

    /// Timeout applied to each statement and streamed row fetch
    pub fn statement_timeout(&self) -> Result<Duration> {
        parse_duration(&self.transaction_timeout)
    }

    /// Connection URI with the TLS scheme applied when `encrypted` is set
    pub fn connection_uri(&self) -> String {
        if !self.encrypted {
            return self.neo4j_uri.clone();
        }
        for scheme in ["bolt", "neo4j"] {
            if let Some(rest) = self.neo4j_uri.strip_prefix(&format!("{scheme}://")) {
                return format!("{scheme}+s://{rest}");
            }
        }
        self.neo4j_uri.clone()
    }
}
