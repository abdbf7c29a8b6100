//! In-memory test doubles for the collector ports
//!
//! Available in this crate's tests and, through the `test-utils` feature, to
//! downstream crates. Everything here records calls behind `Arc<Mutex<..>>`
//! so assertions can be made after the code under test has run.

#![allow(clippy::missing_errors_doc)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use poolstats_domain::{DescriptorSetKey, PoolStatsError, PoolStatsSnapshot, Result, SampleBatch};

use crate::collector::ports::{BatchPublisher, ExpositionSink, SnapshotSource};
use crate::collector::registry::DescriptorGroup;

/// A consistent snapshot with a distinct value in every field.
pub fn fixture_snapshot() -> PoolStatsSnapshot {
    PoolStatsSnapshot {
        max_open_connections: 10,
        open_connections: 3,
        in_use: 1,
        idle: 2,
        wait_count: 4,
        max_idle_closed: 5,
        max_lifetime_closed: 6,
    }
}

/* -------------------------------------------------------------------------- */
/* Sources */
/* -------------------------------------------------------------------------- */

/// Source returning the same snapshot every time.
#[derive(Debug, Clone)]
pub struct StaticSource {
    snapshot: Arc<Mutex<PoolStatsSnapshot>>,
    calls: Arc<AtomicUsize>,
}

impl StaticSource {
    pub fn new(snapshot: PoolStatsSnapshot) -> Self {
        Self { snapshot: Arc::new(Mutex::new(snapshot)), calls: Arc::new(AtomicUsize::new(0)) }
    }

    /// Replace the snapshot returned from now on.
    pub fn set(&self, snapshot: PoolStatsSnapshot) {
        *self.snapshot.lock() = snapshot;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SnapshotSource for StaticSource {
    fn sample(&self) -> Result<PoolStatsSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.snapshot.lock())
    }
}

/// Source replaying a script of results, then repeating a fallback.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    script: Arc<Mutex<VecDeque<Result<PoolStatsSnapshot>>>>,
    fallback: PoolStatsSnapshot,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<PoolStatsSnapshot>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            fallback: fixture_snapshot(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: PoolStatsSnapshot) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SnapshotSource for ScriptedSource {
    fn sample(&self) -> Result<PoolStatsSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script.lock().pop_front().unwrap_or(Ok(self.fallback))
    }
}

/* -------------------------------------------------------------------------- */
/* Sink */
/* -------------------------------------------------------------------------- */

/// Sink recording registrations and rejecting duplicates.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    registered: Arc<Mutex<HashSet<DescriptorSetKey>>>,
    groups: Arc<Mutex<Vec<Arc<DescriptorGroup>>>>,
    registrations: Arc<AtomicUsize>,
    unregistrations: Arc<AtomicUsize>,
    failure: Option<PoolStatsError>,
}

impl RecordingSink {
    /// Sink whose every registration fails with `error`.
    pub fn failing(error: PoolStatsError) -> Self {
        Self { failure: Some(error), ..Self::default() }
    }

    /// Number of `register` calls, successful or not.
    pub fn registration_count(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn unregistration_count(&self) -> usize {
        self.unregistrations.load(Ordering::SeqCst)
    }

    /// Groups currently registered.
    pub fn groups(&self) -> Vec<Arc<DescriptorGroup>> {
        self.groups.lock().clone()
    }
}

impl ExpositionSink for RecordingSink {
    fn register(&self, group: Arc<DescriptorGroup>) -> Result<()> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        if !self.registered.lock().insert(group.key().clone()) {
            return Err(PoolStatsError::DuplicateRegistration(group.key().to_string()));
        }
        self.groups.lock().push(group);
        Ok(())
    }

    fn unregister(&self, group: &DescriptorGroup) -> Result<()> {
        self.unregistrations.fetch_add(1, Ordering::SeqCst);
        self.registered.lock().remove(group.key());
        self.groups.lock().retain(|g| g.key() != group.key());
        Ok(())
    }
}

/* -------------------------------------------------------------------------- */
/* Publisher */
/* -------------------------------------------------------------------------- */

/// Publisher keeping every batch it receives, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingPublisher {
    batches: Arc<Mutex<Vec<SampleBatch>>>,
    withdrawn: Arc<Mutex<Vec<String>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<SampleBatch> {
        self.batches.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn withdrawn(&self) -> Vec<String> {
        self.withdrawn.lock().clone()
    }
}

impl BatchPublisher for RecordingPublisher {
    fn publish(&self, batch: SampleBatch) {
        self.batches.lock().push(batch);
    }

    fn withdraw(&self, identity: &str) {
        self.withdrawn.lock().push(identity.to_string());
    }
}
