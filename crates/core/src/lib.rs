//! # PoolStats Core
//!
//! Pool statistics collection logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (snapshot source, exposition sink, batch publisher)
//! - The metric collector that maps one snapshot to one sample batch
//! - The collector registry that registers each descriptor set exactly once
//!
//! ## Architecture Principles
//! - Only depends on `poolstats-domain`
//! - No Prometheus, database or runtime code
//! - All external collaborators via traits
//! - Synchronous and safe to call from any number of threads

pub mod collector;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use collector::ports::{BatchPublisher, ExpositionSink, SnapshotSource};
pub use collector::registry::{CollectorRegistry, DescriptorGroup};
pub use collector::service::PoolStatsCollector;
