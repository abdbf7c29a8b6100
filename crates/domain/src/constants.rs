//! Domain constants
//!
//! Defaults shared by every descriptor set. Changing any of these renames
//! every exported metric, so they live in one place.

// Metric naming
pub const DEFAULT_NAMESPACE: &str = "database_sql_stats";
pub const DEFAULT_SUBSYSTEM: &str = "rust";
pub const DEFAULT_LABEL_NAME: &str = "db_name";

// Sampling loop
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_TICK_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 5_000;

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Number of statistics carried by every snapshot and every sample batch.
pub const STATISTIC_COUNT: usize = 7;
