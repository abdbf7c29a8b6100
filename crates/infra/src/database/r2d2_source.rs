//! Snapshot source over an `r2d2` connection pool
//!
//! `r2d2::Pool::state` only reports current connection counts. The
//! cumulative counters (waits, idle closes, lifetime closes) come from a
//! `PoolEventCounter` installed as the pool's event handler.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use poolstats_core::SnapshotSource;
use poolstats_domain::{PoolStatsSnapshot, Result};
use r2d2::event::{CheckoutEvent, ReleaseEvent, TimeoutEvent};
use r2d2::{HandleEvent, ManageConnection, Pool};
use tracing::trace;

/* -------------------------------------------------------------------------- */
/* Event counter */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Default)]
struct EventCounts {
    waits: AtomicU64,
    idle_closed: AtomicU64,
    lifetime_closed: AtomicU64,
}

/// Pool event handler accumulating the cumulative pool statistics.
///
/// Cloning shares the counters, so one clone goes to
/// `r2d2::Builder::event_handler` and the other to `R2d2PoolSource`.
///
/// - a checkout that took at least `wait_threshold`, or a checkout timeout,
///   counts as one wait
/// - a release of a connection at least `max_lifetime` old counts as a
///   lifetime close; every other release counts as an idle close
#[derive(Clone)]
pub struct PoolEventCounter {
    counts: Arc<EventCounts>,
    wait_threshold: Duration,
    max_lifetime: Option<Duration>,
}

impl PoolEventCounter {
    pub fn new(wait_threshold: Duration, max_lifetime: Option<Duration>) -> Self {
        Self { counts: Arc::new(EventCounts::default()), wait_threshold, max_lifetime }
    }

    pub fn wait_count(&self) -> u64 {
        self.counts.waits.load(Ordering::Relaxed)
    }

    pub fn idle_closed(&self) -> u64 {
        self.counts.idle_closed.load(Ordering::Relaxed)
    }

    pub fn lifetime_closed(&self) -> u64 {
        self.counts.lifetime_closed.load(Ordering::Relaxed)
    }

    fn record_checkout(&self, waited: Duration) {
        if waited >= self.wait_threshold {
            self.counts.waits.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_release(&self, age: Duration) {
        match self.max_lifetime {
            Some(max_lifetime) if age >= max_lifetime => {
                self.counts.lifetime_closed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.counts.idle_closed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl Default for PoolEventCounter {
    /// Counts checkouts slower than 1ms as waits, no lifetime limit.
    fn default() -> Self {
        Self::new(Duration::from_millis(1), None)
    }
}

impl fmt::Debug for PoolEventCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolEventCounter")
            .field("waits", &self.wait_count())
            .field("idle_closed", &self.idle_closed())
            .field("lifetime_closed", &self.lifetime_closed())
            .finish()
    }
}

impl HandleEvent for PoolEventCounter {
    fn handle_checkout(&self, event: CheckoutEvent) {
        self.record_checkout(event.duration());
    }

    fn handle_timeout(&self, event: TimeoutEvent) {
        trace!(timeout_ms = event.timeout().as_millis(), "connection checkout timed out");
        self.counts.waits.fetch_add(1, Ordering::Relaxed);
    }

    fn handle_release(&self, event: ReleaseEvent) {
        self.record_release(event.age());
    }
}

/* -------------------------------------------------------------------------- */
/* Snapshot source */
/* -------------------------------------------------------------------------- */

/// `SnapshotSource` reading an `r2d2::Pool`.
pub struct R2d2PoolSource<M: ManageConnection> {
    pool: Pool<M>,
    events: Option<PoolEventCounter>,
}

impl<M: ManageConnection> R2d2PoolSource<M> {
    /// Source reporting only the current connection counts.
    pub fn new(pool: Pool<M>) -> Self {
        Self { pool, events: None }
    }

    /// Source also reporting the cumulative counters of `events`.
    ///
    /// `events` must be the handler the pool was built with.
    pub fn with_events(pool: Pool<M>, events: PoolEventCounter) -> Self {
        Self { pool, events: Some(events) }
    }

    pub fn pool(&self) -> &Pool<M> {
        &self.pool
    }
}

impl<M: ManageConnection> SnapshotSource for R2d2PoolSource<M> {
    fn sample(&self) -> Result<PoolStatsSnapshot> {
        let state = self.pool.state();
        let open = u64::from(state.connections);
        let idle = u64::from(state.idle_connections);

        let mut snapshot = PoolStatsSnapshot {
            max_open_connections: u64::from(self.pool.max_size()),
            open_connections: open,
            in_use: open.saturating_sub(idle),
            idle,
            ..PoolStatsSnapshot::zeroed()
        };

        if let Some(events) = &self.events {
            snapshot.wait_count = events.wait_count();
            snapshot.max_idle_closed = events.idle_closed();
            snapshot.max_lifetime_closed = events.lifetime_closed();
        }

        Ok(snapshot)
    }
}

impl<M: ManageConnection> fmt::Debug for R2d2PoolSource<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("R2d2PoolSource")
            .field("state", &self.pool.state())
            .field("events", &self.events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use r2d2_sqlite::SqliteConnectionManager;

    use super::*;

    fn memory_pool(max_size: u32, events: Option<PoolEventCounter>) -> Pool<SqliteConnectionManager> {
        let mut builder = Pool::builder().max_size(max_size).min_idle(Some(0));
        if let Some(events) = events {
            builder = builder.event_handler(Box::new(events));
        }
        builder.build(SqliteConnectionManager::memory()).unwrap()
    }

    #[test]
    fn reports_checked_out_connections_as_in_use() {
        let source = R2d2PoolSource::new(memory_pool(4, None));

        let conn = source.pool().get().unwrap();
        let snapshot = source.sample().unwrap();
        assert_eq!(snapshot.max_open_connections, 4);
        assert!(snapshot.open_connections >= 1);
        assert_eq!(snapshot.in_use, 1);
        assert!(snapshot.is_consistent());

        drop(conn);
        let snapshot = source.sample().unwrap();
        assert_eq!(snapshot.in_use, 0);
        assert_eq!(snapshot.idle, snapshot.open_connections);
        assert_eq!(snapshot.wait_count, 0);
    }

    #[test]
    fn event_counter_tracks_checkouts_over_threshold() {
        let events = PoolEventCounter::new(Duration::ZERO, None);
        let source = R2d2PoolSource::with_events(memory_pool(2, Some(events.clone())), events);

        drop(source.pool().get().unwrap());
        drop(source.pool().get().unwrap());

        assert_eq!(source.sample().unwrap().wait_count, 2);
    }

    #[test]
    fn releases_split_by_lifetime() {
        let events = PoolEventCounter::new(Duration::from_secs(1), Some(Duration::from_secs(60)));

        events.record_release(Duration::from_secs(5));
        events.record_release(Duration::from_secs(60));
        events.record_release(Duration::from_secs(90));

        assert_eq!(events.idle_closed(), 1);
        assert_eq!(events.lifetime_closed(), 2);
    }

    #[test]
    fn fast_checkouts_are_not_waits() {
        let events = PoolEventCounter::new(Duration::from_secs(1), None);
        events.record_checkout(Duration::from_micros(10));
        events.record_checkout(Duration::from_secs(2));

        assert_eq!(events.wait_count(), 1);
    }
}
