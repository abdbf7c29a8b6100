//! Collector registry and descriptor groups
//!
//! One `DescriptorGroup` exists per descriptor set (namespace, subsystem,
//! label name). The group is registered with the exposition sink exactly
//! once through a `OnceLock`; every later collector for the same set
//! attaches to the existing group instead of registering again.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Mutex, RwLock};
use poolstats_domain::{
    CollectorConfig, DescriptorSet, DescriptorSetKey, PoolStatsError, Result, SampleBatch,
};
use tracing::{debug, info, warn};

use crate::collector::ports::{BatchPublisher, ExpositionSink, SnapshotSource};
use crate::collector::service::PoolStatsCollector;

static GLOBAL_REGISTRY: OnceLock<CollectorRegistry> = OnceLock::new();

/* -------------------------------------------------------------------------- */
/* Descriptor group */
/* -------------------------------------------------------------------------- */

/// Collectors sharing one descriptor set, served to the sink as a unit.
pub struct DescriptorGroup {
    descriptors: DescriptorSet,
    members: RwLock<Vec<Weak<PoolStatsCollector>>>,
    published: RwLock<HashMap<String, SampleBatch>>,
}

impl DescriptorGroup {
    pub fn new(descriptors: DescriptorSet) -> Self {
        Self {
            descriptors,
            members: RwLock::new(Vec::new()),
            published: RwLock::new(HashMap::new()),
        }
    }

    pub fn descriptors(&self) -> &DescriptorSet {
        &self.descriptors
    }

    pub fn key(&self) -> &DescriptorSetKey {
        self.descriptors.key()
    }

    /// Add a collector to the group. Dropped members are pruned here.
    pub fn attach(&self, collector: &Arc<PoolStatsCollector>) {
        let mut members = self.members.write();
        members.retain(|member| member.strong_count() > 0);
        members.push(Arc::downgrade(collector));
    }

    /// Number of live collectors in the group.
    pub fn member_count(&self) -> usize {
        self.members.read().iter().filter(|member| member.strong_count() > 0).count()
    }

    /// One batch per live identity, sorted by identity.
    ///
    /// A batch published by a sampling loop is served as-is; otherwise the
    /// collector is sampled live. When two live collectors share an
    /// identity the most recently attached one wins.
    pub fn scrape(&self) -> Vec<SampleBatch> {
        let live: Vec<Arc<PoolStatsCollector>> =
            self.members.read().iter().filter_map(Weak::upgrade).collect();

        let mut latest: HashMap<String, Arc<PoolStatsCollector>> = HashMap::new();
        for collector in live {
            latest.insert(collector.identity().to_string(), collector);
        }

        let mut batches: Vec<SampleBatch> = latest
            .into_iter()
            .map(|(identity, collector)| {
                let cached = self.published.read().get(&identity).cloned();
                cached.unwrap_or_else(|| collector.collect())
            })
            .collect();
        batches.sort_by(|a, b| a.identity.cmp(&b.identity));
        batches
    }
}

impl BatchPublisher for DescriptorGroup {
    fn publish(&self, batch: SampleBatch) {
        self.published.write().insert(batch.identity.clone(), batch);
    }

    fn withdraw(&self, identity: &str) {
        self.published.write().remove(identity);
    }
}

impl fmt::Debug for DescriptorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorGroup")
            .field("key", self.key())
            .field("members", &self.member_count())
            .finish_non_exhaustive()
    }
}

/* -------------------------------------------------------------------------- */
/* Registry */
/* -------------------------------------------------------------------------- */

struct GroupSlot {
    group: Arc<DescriptorGroup>,
    registration: OnceLock<Result<()>>,
}

/// Owns the one-time registration of every descriptor set with a sink.
///
/// Use one registry per sink. `install_global` / `global` provide the
/// process-wide instance.
pub struct CollectorRegistry {
    sink: Arc<dyn ExpositionSink>,
    groups: Mutex<HashMap<DescriptorSetKey, Arc<GroupSlot>>>,
}

impl CollectorRegistry {
    pub fn new(sink: Arc<dyn ExpositionSink>) -> Self {
        Self { sink, groups: Mutex::new(HashMap::new()) }
    }

    /// Install the process-wide registry.
    ///
    /// # Errors
    /// Returns `PoolStatsError::DuplicateRegistration` if a global registry
    /// was already installed.
    pub fn install_global(sink: Arc<dyn ExpositionSink>) -> Result<&'static Self> {
        GLOBAL_REGISTRY.set(Self::new(sink)).map_err(|_| {
            PoolStatsError::DuplicateRegistration(
                "global collector registry already installed".into(),
            )
        })?;
        Self::global().ok_or_else(|| {
            PoolStatsError::Internal("global collector registry missing after install".into())
        })
    }

    /// The process-wide registry, if installed.
    pub fn global() -> Option<&'static Self> {
        GLOBAL_REGISTRY.get()
    }

    /// The process-wide registry, installing one with `sink` on first use.
    pub fn global_or_init<F>(sink: F) -> &'static Self
    where
        F: FnOnce() -> Arc<dyn ExpositionSink>,
    {
        GLOBAL_REGISTRY.get_or_init(|| Self::new(sink()))
    }

    /// Build a collector and make sure its descriptor set is registered.
    ///
    /// The first construction for a descriptor set registers it with the
    /// sink; concurrent constructions for the same set wait on that single
    /// registration and then reuse it.
    ///
    /// # Errors
    /// - `InvalidConfiguration` for a blank identity or invalid names
    /// - the sink's registration error, returned to every construction for
    ///   that descriptor set
    pub fn register_collector(
        &self,
        config: &CollectorConfig,
        source: Arc<dyn SnapshotSource>,
    ) -> Result<Arc<PoolStatsCollector>> {
        config.validate()?;
        let key = config.descriptor_key();
        let slot = self.slot_for(key.clone())?;

        let mut registered_now = false;
        slot.registration
            .get_or_init(|| {
                registered_now = true;
                self.sink.register(Arc::clone(&slot.group))
            })
            .clone()?;

        if registered_now {
            info!(descriptor_set = %key, "registered descriptor set");
        } else {
            debug!(descriptor_set = %key, identity = %config.identity, "reusing registered descriptor set");
        }

        let collector = Arc::new(PoolStatsCollector::new(
            config.identity.clone(),
            source,
            Arc::clone(&slot.group),
        ));
        slot.group.attach(&collector);
        Ok(collector)
    }

    /// Group serving a descriptor set, if any collector created it.
    pub fn group(&self, key: &DescriptorSetKey) -> Option<Arc<DescriptorGroup>> {
        self.groups.lock().get(key).map(|slot| Arc::clone(&slot.group))
    }

    pub fn group_count(&self) -> usize {
        self.groups.lock().len()
    }

    /// Unregister every group from the sink and forget them.
    ///
    /// Collectors built before shutdown keep working but are no longer
    /// served; the next construction registers its set afresh.
    pub fn shutdown(&self) {
        let slots: Vec<Arc<GroupSlot>> =
            self.groups.lock().drain().map(|(_, slot)| slot).collect();

        for slot in slots {
            if !matches!(slot.registration.get(), Some(Ok(()))) {
                continue;
            }
            if let Err(error) = self.sink.unregister(&slot.group) {
                warn!(descriptor_set = %slot.group.key(), error = %error, "failed to unregister descriptor set");
            }
        }
        info!("collector registry shut down");
    }

    fn slot_for(&self, key: DescriptorSetKey) -> Result<Arc<GroupSlot>> {
        let mut groups = self.groups.lock();
        if let Some(slot) = groups.get(&key) {
            return Ok(Arc::clone(slot));
        }

        let slot = Arc::new(GroupSlot {
            group: Arc::new(DescriptorGroup::new(DescriptorSet::build(key.clone())?)),
            registration: OnceLock::new(),
        });
        groups.insert(key, Arc::clone(&slot));
        Ok(slot)
    }
}

impl fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorRegistry").field("groups", &self.group_count()).finish()
    }
}
