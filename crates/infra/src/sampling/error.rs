//! Sampler error types

use poolstats_domain::PoolStatsError;
use thiserror::Error;

use crate::errors::InfraError;

/// Sampling loop errors
#[derive(Debug, Error)]
pub enum SamplerError {
    /// Rejected sampler settings (zero interval or timeout)
    #[error("Invalid sampler configuration: {0}")]
    InvalidConfiguration(String),

    /// `start` was called outside a tokio runtime
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    /// The snapshot source failed during a tick
    #[error("Snapshot failed: {0}")]
    Snapshot(#[from] PoolStatsError),

    /// A tick did not finish within the tick timeout
    #[error("Tick timed out after {millis}ms")]
    TickTimeout { millis: u64 },

    /// A tick was skipped because the previous snapshot read is still running
    #[error("Previous snapshot read still in flight")]
    ReadInFlight,

    /// The loop task did not finish within the join timeout
    #[error("Loop task did not stop within {millis}ms")]
    JoinTimeout { millis: u64 },

    /// Task join failed
    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<SamplerError> for InfraError {
    fn from(err: SamplerError) -> Self {
        let domain_err = match err {
            SamplerError::InvalidConfiguration(message) => {
                PoolStatsError::InvalidConfiguration(message)
            }
            SamplerError::NoRuntime(_) => PoolStatsError::InvalidConfiguration(err.to_string()),
            SamplerError::Snapshot(inner) => inner,
            SamplerError::TickTimeout { .. } | SamplerError::ReadInFlight => {
                PoolStatsError::SnapshotUnavailable(err.to_string())
            }
            _ => PoolStatsError::Internal(err.to_string()),
        };
        InfraError(domain_err)
    }
}

impl From<SamplerError> for PoolStatsError {
    fn from(err: SamplerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for sampler operations
pub type SamplerResult<T> = Result<T, SamplerError>;
