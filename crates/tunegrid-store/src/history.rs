//! MetricsStore: bounded, append-only performance history.
//!
//! The backing `Vec` is allowed to grow to twice the cap before the evicted
//! prefix is drained, which keeps `append` amortized O(1) while every read
//! sees exactly the newest `capacity` records as one contiguous slice.

use tracing::{debug, info, warn};
use tunegrid_core::PerformanceRecord;

use crate::error::StoreResult;
use crate::snapshot::{SnapshotFile, WriteOutcome};

/// How a startup load went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No snapshot on disk; started empty.
    ColdStart,
    /// Snapshot loaded.
    Loaded {
        records: usize,
        /// Entries that had no `timeout` and took the default.
        defaulted_timeouts: usize,
    },
    /// Snapshot was unreadable; started empty.
    Recovered { error: String },
}

#[derive(Debug, Clone)]
pub struct MetricsStore {
    records: Vec<PerformanceRecord>,
    capacity: usize,
    persist_limit: usize,
}

impl MetricsStore {
    /// Create an empty store. A zero `capacity` is treated as 1.
    pub fn new(capacity: usize, persist_limit: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
            persist_limit: persist_limit.min(capacity),
        }
    }

    /// Load a prior snapshot, falling back to an empty store when there is
    /// none or it cannot be read.
    pub fn load(
        file: &SnapshotFile,
        capacity: usize,
        persist_limit: usize,
        default_timeout_secs: u32,
    ) -> (Self, LoadOutcome) {
        let mut store = Self::new(capacity, persist_limit);

        match file.read(default_timeout_secs) {
            Ok(None) => {
                info!(path = ?file.path(), "no performance history found, starting fresh");
                (store, LoadOutcome::ColdStart)
            }
            Ok(Some((records, defaulted_timeouts))) => {
                let total = records.len();
                for record in records {
                    store.append(record);
                }
                if defaulted_timeouts > 0 {
                    warn!(
                        count = defaulted_timeouts,
                        default_timeout_secs, "snapshot records without timeout took the default"
                    );
                }
                info!(
                    path = ?file.path(),
                    records = total,
                    retained = store.len(),
                    "loaded performance history"
                );
                (
                    store,
                    LoadOutcome::Loaded {
                        records: total,
                        defaulted_timeouts,
                    },
                )
            }
            Err(e) => {
                warn!(
                    path = ?file.path(),
                    error = %e,
                    "performance history unreadable, starting fresh"
                );
                (
                    store,
                    LoadOutcome::Recovered {
                        error: e.to_string(),
                    },
                )
            }
        }
    }

    /// Append a record, evicting the oldest once the cap is exceeded.
    pub fn append(&mut self, record: PerformanceRecord) {
        self.records.push(record);
        if self.records.len() >= self.capacity * 2 {
            let excess = self.records.len() - self.capacity;
            self.records.drain(..excess);
        }
    }

    /// All retained records, oldest first.
    pub fn records(&self) -> &[PerformanceRecord] {
        let start = self.records.len().saturating_sub(self.capacity);
        &self.records[start..]
    }

    /// The last `n` records (fewer if the history is shorter), oldest first.
    pub fn recent_window(&self, n: usize) -> &[PerformanceRecord] {
        let records = self.records();
        &records[records.len().saturating_sub(n)..]
    }

    /// Clone of the suffix a snapshot should contain.
    pub fn tail(&self) -> Vec<PerformanceRecord> {
        self.recent_window(self.persist_limit).to_vec()
    }

    /// Write the persisted suffix to `file`, tagged with `sequence`.
    pub fn persist(&self, file: &SnapshotFile, sequence: u64) -> StoreResult<WriteOutcome> {
        let outcome = file.write(self.recent_window(self.persist_limit), sequence)?;
        if let WriteOutcome::Written(n) = outcome {
            debug!(records = n, "performance history persisted");
        }
        Ok(outcome)
    }

    pub fn len(&self) -> usize {
        self.records.len().min(self.capacity)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn persist_limit(&self) -> usize {
        self.persist_limit
    }
}
