//! Shared types used across tunegrid crates.
//!
//! `ConfigurationTuple` is the identity of a resource setting under test and is
//! used directly as a map key. `PerformanceRecord` is one observed invocation.
//! The on-disk / on-wire JSON shape lives in [`PersistedRecord`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Configuration ──────────────────────────────────────────────────

/// A (memory, concurrency, timeout) resource setting.
///
/// Two tuples are the same configuration iff all three fields match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationTuple {
    /// Configured memory in MB (the billed quantity).
    #[serde(rename = "memorySize")]
    pub memory_size_mb: u32,
    /// Maximum concurrent executions.
    pub concurrency: u32,
    /// Invocation timeout in seconds.
    #[serde(rename = "timeout")]
    pub timeout_secs: u32,
}

impl ConfigurationTuple {
    pub const fn new(memory_size_mb: u32, concurrency: u32, timeout_secs: u32) -> Self {
        Self {
            memory_size_mb,
            concurrency,
            timeout_secs,
        }
    }
}

impl fmt::Display for ConfigurationTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}MB/c{}/{}s",
            self.memory_size_mb, self.concurrency, self.timeout_secs
        )
    }
}

// ── Cost ───────────────────────────────────────────────────────────

/// Monetary cost of one invocation, or an explicit marker that no usable
/// figure exists.
///
/// Serialized as a JSON number, or `null` when invalid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Cost {
    Valid(f64),
    Invalid,
}

impl Cost {
    /// Wrap a raw figure. Negative and non-finite values become `Invalid`.
    pub fn from_value(value: f64) -> Self {
        if value.is_finite() && value >= 0.0 {
            Cost::Valid(value)
        } else {
            Cost::Invalid
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Cost::Valid(v) => Some(*v),
            Cost::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Cost::Valid(_))
    }
}

impl From<Option<f64>> for Cost {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cost::Invalid, Cost::from_value)
    }
}

impl From<Cost> for Option<f64> {
    fn from(cost: Cost) -> Self {
        cost.value()
    }
}

/// Where a recorded cost figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostSource {
    /// Taken from the executor's own cost snapshot.
    Reported,
    /// Computed by the GB-second formula.
    #[default]
    Estimated,
    /// No cost could be determined (failed invocation).
    Unavailable,
}

impl CostSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostSource::Reported => "reported",
            CostSource::Estimated => "estimated",
            CostSource::Unavailable => "unavailable",
        }
    }
}

/// Point-in-time cost estimate reported by an executor after an invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CostSnapshot {
    pub total: f64,
    /// Per-component costs (e.g. "functionCallDuration", "functionCallRequests").
    #[serde(default)]
    pub breakdown: BTreeMap<String, f64>,
}

// ── Performance records ────────────────────────────────────────────

/// One observed invocation under a given configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "PersistedRecord")]
pub struct PerformanceRecord {
    pub timestamp: DateTime<Utc>,
    pub config: ConfigurationTuple,
    pub execution_time_ms: f64,
    pub memory_used_mb: f64,
    pub cost: Cost,
    pub cost_source: CostSource,
    /// Result message, or an `error: ...` line for failed invocations.
    pub result_summary: String,
}

/// JSON shape of a record in a persisted snapshot or an API response.
///
/// `timeout` is optional on read because older snapshots predate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    pub timestamp: DateTime<Utc>,
    pub memory_size: u32,
    pub concurrency: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    pub execution_time_ms: f64,
    pub memory_used_mb: f64,
    pub cost: Cost,
    #[serde(default)]
    pub cost_source: CostSource,
    #[serde(default)]
    pub message: String,
}

impl PersistedRecord {
    /// Convert to a domain record, using `default_timeout_secs` when the
    /// snapshot entry carries no timeout.
    pub fn into_record(self, default_timeout_secs: u32) -> PerformanceRecord {
        PerformanceRecord {
            timestamp: self.timestamp,
            config: ConfigurationTuple {
                memory_size_mb: self.memory_size,
                concurrency: self.concurrency,
                timeout_secs: self.timeout.unwrap_or(default_timeout_secs),
            },
            execution_time_ms: self.execution_time_ms,
            memory_used_mb: self.memory_used_mb,
            cost: self.cost,
            cost_source: self.cost_source,
            result_summary: self.message,
        }
    }
}

impl From<PerformanceRecord> for PersistedRecord {
    fn from(record: PerformanceRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            memory_size: record.config.memory_size_mb,
            concurrency: record.config.concurrency,
            timeout: Some(record.config.timeout_secs),
            execution_time_ms: record.execution_time_ms,
            memory_used_mb: record.memory_used_mb,
            cost: record.cost,
            cost_source: record.cost_source,
            message: record.result_summary,
        }
    }
}
