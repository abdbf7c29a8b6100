//! Snapshot sources over database connection pools

pub mod r2d2_source;

pub use r2d2_source::{PoolEventCounter, R2d2PoolSource};
