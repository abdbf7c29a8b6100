//! Error types used throughout the workspace

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for PoolStats
///
/// Payloads are plain strings so the error stays `Clone` and serializable;
/// a failed one-time registration is cached and handed back to every later
/// construction for the same descriptor set.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum PoolStatsError {
    /// A descriptor set reached the exposition sink twice.
    #[error("Duplicate registration: {0}")]
    DuplicateRegistration(String),

    /// Non-positive interval, missing identity, malformed metric names.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The snapshot source could not produce a reading.
    #[error("Snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    /// The exposition sink failed while registering or encoding.
    #[error("Exposition error: {0}")]
    Exposition(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PoolStatsError {
    /// Errors raised at construction time that must abort startup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DuplicateRegistration(_) | Self::InvalidConfiguration(_))
    }
}

/// Result type alias for PoolStats operations
pub type Result<T> = std::result::Result<T, PoolStatsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PoolStatsError::InvalidConfiguration("interval must be positive".into());
        assert_eq!(err.to_string(), "Invalid configuration: interval must be positive");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(PoolStatsError::DuplicateRegistration("x".into()).is_fatal());
        assert!(PoolStatsError::InvalidConfiguration("x".into()).is_fatal());
        assert!(!PoolStatsError::SnapshotUnavailable("x".into()).is_fatal());
        assert!(!PoolStatsError::Exposition("x".into()).is_fatal());
    }

    #[test]
    fn test_error_serialization_is_tagged() {
        let err = PoolStatsError::SnapshotUnavailable("pool closed".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"type":"SnapshotUnavailable","message":"pool closed"}"#);

        let back: PoolStatsError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
