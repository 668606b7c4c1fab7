//! tunegrid-store: performance history for the tuner.
//!
//! Keeps a bounded, chronologically ordered history of
//! [`PerformanceRecord`](tunegrid_core::PerformanceRecord)s in memory and
//! persists its most recent suffix as a JSON array.
//!
//! # Architecture
//!
//! ```text
//! MetricsStore
//!   ├── append()         ← one record per control-loop iteration
//!   ├── recent_window()  → optimizer input
//!   ├── tail()           → cloned suffix, written outside the state lock
//!   └── persist() / load()
//!
//! SnapshotFile
//!   └── write-to-temp, then rename over the previous snapshot
//! ```

pub mod error;
pub mod history;
pub mod snapshot;

pub use error::{StoreError, StoreResult};
pub use history::{LoadOutcome, MetricsStore};
pub use snapshot::{SnapshotFile, WriteOutcome};
