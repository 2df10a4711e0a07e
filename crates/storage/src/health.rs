//! Liveness probe

use crate::error::Result;

/// Outcome of the liveness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: String,
}

impl HealthStatus {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            message: message.into(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: message.into(),
        }
    }
}

/// Interprets the result of `RETURN 1 AS result`
pub fn evaluate_probe(result: Result<Option<i64>>) -> HealthStatus {
    match result {
        Ok(Some(1)) => HealthStatus::healthy("Graph database is reachable"),
        Ok(Some(other)) => HealthStatus::unhealthy(format!("Unexpected probe result {other}")),
        Ok(None) => HealthStatus::unhealthy("Probe returned no rows"),
        Err(e) => HealthStatus::unhealthy(format!("Graph database is unreachable: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    #[test]
    fn test_probe_outcomes() {
        assert!(evaluate_probe(Ok(Some(1))).healthy);
        assert!(!evaluate_probe(Ok(Some(0))).healthy);
        assert!(!evaluate_probe(Ok(None)).healthy);

        let down = evaluate_probe(Err(StorageError::Connectivity("refused".to_string())));
        assert!(!down.healthy);
        assert!(down.message.contains("refused"));
    }
}
