//! Port interfaces for pool statistics collection
//!
//! `SnapshotSource` isolates the collector from the concrete pool type;
//! `ExpositionSink` isolates it from the metrics transport; `BatchPublisher`
//! receives batches produced by a background sampling loop.

use std::sync::Arc;

use poolstats_domain::{PoolStatsSnapshot, Result, SampleBatch};

use crate::collector::registry::DescriptorGroup;

/// Capability to read the current pool statistics.
///
/// Called synchronously; the returned snapshot is owned by the caller. A
/// source that can no longer be read (pool closed, driver gone) returns
/// `PoolStatsError::SnapshotUnavailable`.
///
/// Closures implement the trait, which keeps ad-hoc adapters short:
///
/// ```rust
/// use poolstats_core::SnapshotSource;
/// use poolstats_domain::{PoolStatsSnapshot, Result};
///
/// let source = || -> Result<PoolStatsSnapshot> {
///     Ok(PoolStatsSnapshot { open_connections: 2, idle: 2, ..Default::default() })
/// };
/// assert_eq!(source.sample().unwrap().idle, 2);
/// ```
pub trait SnapshotSource: Send + Sync {
    /// Produce a fresh snapshot.
    fn sample(&self) -> Result<PoolStatsSnapshot>;
}

impl<F> SnapshotSource for F
where
    F: Fn() -> Result<PoolStatsSnapshot> + Send + Sync,
{
    fn sample(&self) -> Result<PoolStatsSnapshot> {
        self()
    }
}

/// Metrics transport accepting descriptor groups.
///
/// `register` is invoked at most once per descriptor set by
/// `CollectorRegistry`. A sink that sees the same set twice must reject it
/// with `PoolStatsError::DuplicateRegistration` rather than count it twice.
pub trait ExpositionSink: Send + Sync {
    /// Declare a group's descriptors and start serving its samples.
    fn register(&self, group: Arc<DescriptorGroup>) -> Result<()>;

    /// Stop serving a group. Unknown groups are ignored.
    fn unregister(&self, group: &DescriptorGroup) -> Result<()>;
}

/// Receiver of batches produced outside a scrape.
pub trait BatchPublisher: Send + Sync {
    /// Replace the latest batch for `batch.identity` as a unit.
    fn publish(&self, batch: SampleBatch);

    /// Forget the latest batch for an identity.
    fn withdraw(&self, _identity: &str) {}
}
