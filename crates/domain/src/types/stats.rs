//! Pool statistics snapshot and the statistic schema table
//!
//! `Statistic` is the single source of truth for what gets exported: its
//! order is the emission order of every sample batch, and each row carries
//! the metric suffix, help text and value kind.

use serde::{Deserialize, Serialize};

use crate::types::metrics::ValueKind;

/* -------------------------------------------------------------------------- */
/* Snapshot */
/* -------------------------------------------------------------------------- */

/// Point-in-time read of a connection pool's counters.
///
/// Produced fresh on every sample and never mutated afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolStatsSnapshot {
    /// Configured ceiling on open connections, 0 = unlimited
    pub max_open_connections: u64,

    /// Established connections, both idle and in use
    pub open_connections: u64,

    /// Connections currently checked out
    pub in_use: u64,

    /// Connections currently idle
    pub idle: u64,

    /// Cumulative number of waits for a connection
    pub wait_count: u64,

    /// Cumulative closes triggered by the idle limit
    pub max_idle_closed: u64,

    /// Cumulative closes triggered by the lifetime limit
    pub max_lifetime_closed: u64,
}

impl PoolStatsSnapshot {
    /// The all-zero snapshot emitted when the source cannot be read.
    pub const fn zeroed() -> Self {
        Self {
            max_open_connections: 0,
            open_connections: 0,
            in_use: 0,
            idle: 0,
            wait_count: 0,
            max_idle_closed: 0,
            max_lifetime_closed: 0,
        }
    }

    /// Read the value of one statistic.
    pub const fn value_of(&self, statistic: Statistic) -> u64 {
        match statistic {
            Statistic::MaxOpen => self.max_open_connections,
            Statistic::OpenConnections => self.open_connections,
            Statistic::InUse => self.in_use,
            Statistic::Idle => self.idle,
            Statistic::WaitedFor => self.wait_count,
            Statistic::MaxIdle => self.max_idle_closed,
            Statistic::MaxLifetime => self.max_lifetime_closed,
        }
    }

    /// True when `open_connections == idle + in_use`.
    pub fn is_consistent(&self) -> bool {
        self.idle.checked_add(self.in_use) == Some(self.open_connections)
    }
}

/* -------------------------------------------------------------------------- */
/* Statistic schema */
/* -------------------------------------------------------------------------- */

/// One exported statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    MaxOpen,
    OpenConnections,
    InUse,
    Idle,
    WaitedFor,
    MaxIdle,
    MaxLifetime,
}

impl Statistic {
    /// All statistics in emission order.
    pub const ALL: [Self; 7] = [
        Self::MaxOpen,
        Self::OpenConnections,
        Self::InUse,
        Self::Idle,
        Self::WaitedFor,
        Self::MaxIdle,
        Self::MaxLifetime,
    ];

    /// Metric name suffix, appended to `{namespace}_{subsystem}_`.
    pub const fn metric_name(self) -> &'static str {
        match self {
            Self::MaxOpen => "max_open",
            Self::OpenConnections => "open_connections",
            Self::InUse => "in_use",
            Self::Idle => "idle",
            Self::WaitedFor => "waited_for",
            Self::MaxIdle => "max_idle",
            Self::MaxLifetime => "max_lifetime",
        }
    }

    pub const fn help(self) -> &'static str {
        match self {
            Self::MaxOpen => "Maximum number of open connections to the database.",
            Self::OpenConnections => "The number of established connections both in use and idle.",
            Self::InUse => "The number of connections currently in use.",
            Self::Idle => "The number of idle connections.",
            Self::WaitedFor => "The total number of connections waited for.",
            Self::MaxIdle => "The total number of connections closed due to the max idle limit.",
            Self::MaxLifetime => {
                "The total number of connections closed due to the max lifetime limit."
            }
        }
    }

    /// Gauges for point-in-time quantities, counters for cumulative totals.
    pub const fn kind(self) -> ValueKind {
        match self {
            Self::MaxOpen | Self::OpenConnections | Self::InUse | Self::Idle => ValueKind::Gauge,
            Self::WaitedFor | Self::MaxIdle | Self::MaxLifetime => ValueKind::Counter,
        }
    }
}
