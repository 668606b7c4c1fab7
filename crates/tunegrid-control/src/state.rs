//! OptimizerState: the single-writer state of the tuner.

use tunegrid_core::{ConfigurationTuple, PerformanceRecord};
use tunegrid_store::MetricsStore;

/// Current configuration, history and request counter.
///
/// Only reachable through [`ControlLoop`](crate::ControlLoop), which holds it
/// behind one mutex. `current_config` is only ever replaced as a whole.
#[derive(Debug)]
pub struct OptimizerState {
    current_config: ConfigurationTuple,
    history: MetricsStore,
    request_counter: u64,
}

impl OptimizerState {
    pub(crate) fn new(initial: ConfigurationTuple, history: MetricsStore) -> Self {
        Self {
            current_config: initial,
            history,
            request_counter: 0,
        }
    }

    pub fn current_config(&self) -> ConfigurationTuple {
        self.current_config
    }

    pub fn history(&self) -> &MetricsStore {
        &self.history
    }

    pub fn request_counter(&self) -> u64 {
        self.request_counter
    }

    /// Append the iteration's record and bump the counter. Returns the new
    /// counter value.
    pub(crate) fn record(&mut self, record: PerformanceRecord) -> u64 {
        self.history.append(record);
        self.request_counter += 1;
        self.request_counter
    }

    pub(crate) fn replace_config(&mut self, config: ConfigurationTuple) {
        self.current_config = config;
    }

    pub(crate) fn replace_history(&mut self, history: MetricsStore) {
        self.history = history;
    }

    pub(crate) fn records(&self) -> &[PerformanceRecord] {
        self.history.records()
    }
}
