//! # PoolStats Domain
//!
//! Domain types for connection pool statistics exposition.
//!
//! This crate contains:
//! - The point-in-time pool statistics snapshot
//! - The metric schema table (one row per exported statistic)
//! - Metric descriptors, labeled samples and sample batches
//! - Domain error types and Result definitions
//! - Configuration structures and defaults
//!
//! ## Architecture
//! - No dependencies on other PoolStats crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::naming::{build_fq_name, validate_label_name, validate_metric_part};
