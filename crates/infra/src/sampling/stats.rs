//! Loop lifecycle state and tick counters

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use poolstats_domain::impl_domain_enum_conversions;
use serde::Serialize;

/// Lifecycle of a sampling loop: `created → running → stopping → stopped`.
///
/// `Stopped` is terminal; sampling again needs a new `SamplingLoop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    Created,
    Running,
    Stopping,
    Stopped,
}

impl_domain_enum_conversions!(LoopState {
    Created => "created",
    Running => "running",
    Stopping => "stopping",
    Stopped => "stopped",
});

/// Point-in-time copy of a loop's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopStatsSnapshot {
    /// Ticks started
    pub ticks: u64,
    /// Batches handed to the publisher
    pub published: u64,
    /// Ticks that failed or timed out
    pub failed_ticks: u64,
    pub last_error: Option<String>,
    /// Sampling time of the most recently published batch
    pub last_published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub(crate) struct LoopStats {
    ticks: AtomicU64,
    published: AtomicU64,
    failed_ticks: AtomicU64,
    last_error: Mutex<Option<String>>,
    last_published_at: Mutex<Option<DateTime<Utc>>>,
}

impl LoopStats {
    pub(crate) fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_published(&self, sampled_at: DateTime<Utc>) {
        self.published.fetch_add(1, Ordering::Relaxed);
        *self.last_published_at.lock() = Some(sampled_at);
    }

    pub(crate) fn record_failure(&self, error: String) {
        self.failed_ticks.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock() = Some(error);
    }

    pub(crate) fn snapshot(&self) -> LoopStatsSnapshot {
        LoopStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            failed_ticks: self.failed_ticks.load(Ordering::Relaxed),
            last_error: self.last_error.lock().clone(),
            last_published_at: *self.last_published_at.lock(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn state_string_forms() {
        assert_eq!(LoopState::Stopping.to_string(), "stopping");
        assert_eq!(LoopState::from_str("RUNNING").unwrap(), LoopState::Running);
        assert!(LoopState::from_str("paused").is_err());
    }

    #[test]
    fn failures_keep_latest_error() {
        let stats = LoopStats::default();
        stats.record_tick();
        stats.record_failure("first".into());
        stats.record_tick();
        stats.record_failure("second".into());
        stats.record_tick();
        let sampled_at = Utc::now();
        stats.record_published(sampled_at);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.ticks, 3);
        assert_eq!(snapshot.failed_ticks, 2);
        assert_eq!(snapshot.published, 1);
        assert_eq!(snapshot.last_error.as_deref(), Some("second"));
        assert_eq!(snapshot.last_published_at, Some(sampled_at));
    }
}
