//! ControlLoop: drives one tuning iteration per unit of work.
//!
//! The executor call, the memory samples and the snapshot write all happen
//! outside the state lock. Recording, the counter increment and any
//! scheduled optimize/explore step run together under it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tunegrid_core::{
    ConfigurationTuple, Cost, CostSnapshot, CostSource, PerformanceRecord, TunerConfig,
};
use tunegrid_executor::{ExecutorError, FunctionExecutor, MemoryProbe, ProcfsProbe};
use tunegrid_optimizer::{
    ConfigOptimizer, CostModel, Decision, Explorer, GroupStats, RandomSource, RngSource,
};
use tunegrid_store::{LoadOutcome, MetricsStore, SnapshotFile, WriteOutcome};

use crate::schedule::{PeriodicAction, Schedule};
use crate::state::OptimizerState;

/// Everything guarded by the state lock.
struct Guarded {
    state: OptimizerState,
    rng: Box<dyn RandomSource>,
}

/// Outcome of one iteration, as returned to the trigger endpoint.
#[derive(Debug, Clone)]
pub struct IterationReport {
    /// 1-based position of this iteration in the request counter.
    pub request_number: u64,
    /// Configuration the work ran under.
    pub config: ConfigurationTuple,
    pub message: String,
    pub execution_time_ms: f64,
    pub memory_used_mb: f64,
    pub cost: Cost,
    pub cost_source: CostSource,
    pub cost_details: Option<CostSnapshot>,
    pub error: Option<ExecutorError>,
    /// Periodic actions that ran as part of this iteration.
    pub actions: Vec<PeriodicAction>,
    /// Configuration in effect after this iteration.
    pub next_config: ConfigurationTuple,
    /// Whether this iteration's own optimize/explore step replaced the
    /// configuration.
    pub config_changed: bool,
    pub persist_error: Option<String>,
}

impl IterationReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Read-only view of the tuner for metrics and dashboards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TunerSnapshot {
    pub current_optimal_config: ConfigurationTuple,
    pub recent_performance: Vec<PerformanceRecord>,
    pub total_requests_processed: u64,
    pub history_length: usize,
    /// Configurations with enough samples in the optimizer window, cheapest first.
    pub ranked_configs: Vec<GroupStats>,
}

pub struct ControlLoop {
    guarded: Mutex<Guarded>,
    executor: Arc<dyn FunctionExecutor>,
    probe: Arc<dyn MemoryProbe>,
    cost_model: CostModel,
    optimizer: ConfigOptimizer,
    explorer: Explorer,
    schedule: Schedule<PeriodicAction>,
    snapshot_file: Option<Arc<SnapshotFile>>,
    default_timeout_secs: u32,
}

impl ControlLoop {
    /// Build a control loop with an empty history and no persistence.
    pub fn new(config: &TunerConfig, executor: Arc<dyn FunctionExecutor>) -> Self {
        let history = MetricsStore::new(config.history.capacity, config.history.persist_limit);
        let schedule = Schedule::new()
            .on_every(config.schedule.optimize_every, PeriodicAction::Optimize)
            .on_every(config.schedule.explore_every, PeriodicAction::Explore);

        Self {
            guarded: Mutex::new(Guarded {
                state: OptimizerState::new(config.initial, history),
                rng: Box::new(RngSource::from_entropy()),
            }),
            executor,
            probe: Arc::new(ProcfsProbe),
            cost_model: CostModel::from_settings(&config.pricing),
            optimizer: ConfigOptimizer::new(config.optimizer.clone()),
            explorer: Explorer::new(config.grid.clone()),
            schedule,
            snapshot_file: None,
            default_timeout_secs: config.initial.timeout_secs,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_random_source(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.guarded.get_mut().rng = rng;
        self
    }

    /// Persist history to `file` on every optimize/explore boundary.
    pub fn with_snapshot_file(mut self, file: SnapshotFile) -> Self {
        self.snapshot_file = Some(Arc::new(file));
        self
    }

    /// Seed the history from the snapshot file and re-derive the current
    /// configuration from it. A missing or unreadable snapshot leaves the
    /// history empty.
    pub fn restore(&mut self) -> LoadOutcome {
        let Some(file) = self.snapshot_file.clone() else {
            return LoadOutcome::ColdStart;
        };

        let guarded = self.guarded.get_mut();
        let (history, outcome) = MetricsStore::load(
            &file,
            guarded.state.history().capacity(),
            guarded.state.history().persist_limit(),
            self.default_timeout_secs,
        );
        guarded.state.replace_history(history);

        if !guarded.state.history().is_empty() {
            let optimization = self
                .optimizer
                .optimize(guarded.state.records(), guarded.state.current_config());
            guarded.state.replace_config(optimization.config);
            info!(
                config = %optimization.config,
                records = guarded.state.history().len(),
                "starting with optimal configuration from history"
            );
        }
        outcome
    }

    /// Run one iteration: invoke `operation` under the current configuration,
    /// record what happened, and run any periodic action that is due.
    pub async fn run_iteration(&self, operation: &str, payload: &Value) -> IterationReport {
        let config = self.guarded.lock().await.state.current_config();

        // ── Invoking / Measuring ───────────────────────────────────
        let memory_before = self.probe.resident_mb();
        let start = Instant::now();
        let (outcome, cost_details) = self.invoke(config, operation, payload).await;
        let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        let memory_used_mb = match (memory_before, self.probe.resident_mb()) {
            (Some(before), Some(after)) => (after - before).max(0.0),
            _ => 0.0,
        };

        // ── Costing ────────────────────────────────────────────────
        let (cost, cost_source) = match &outcome {
            Ok(_) => self.cost_model.resolve(
                cost_details.as_ref(),
                execution_time_ms,
                config.memory_size_mb,
            ),
            Err(_) => (Cost::Invalid, CostSource::Unavailable),
        };

        let (message, error) = match outcome {
            Ok(message) => (message, None),
            Err(e) => {
                warn!(operation, config = %config, error = %e, "invocation failed");
                (format!("error: {e}"), Some(e))
            }
        };

        let record = PerformanceRecord {
            timestamp: Utc::now(),
            config,
            execution_time_ms,
            memory_used_mb,
            cost,
            cost_source,
            result_summary: message.clone(),
        };

        // ── Recording / Optimizing / Exploring ─────────────────────
        let (request_number, actions, next_config, config_changed, pending) = {
            let mut guard = self.guarded.lock().await;
            let Guarded { state, rng } = &mut *guard;

            let n = state.record(record);
            let before = state.current_config();
            let mut actions = Vec::new();
            for action in self.schedule.due(n) {
                match action {
                    PeriodicAction::Optimize => {
                        let optimization =
                            self.optimizer.optimize(state.records(), state.current_config());
                        if let Decision::Switched { .. } = optimization.decision {
                            state.replace_config(optimization.config);
                        }
                    }
                    PeriodicAction::Explore => {
                        if let Some(next) =
                            self.explorer.explore(state.current_config(), rng.as_mut())
                        {
                            state.replace_config(next);
                        }
                    }
                }
                actions.push(action);
            }

            let pending = if actions.is_empty() || self.snapshot_file.is_none() {
                None
            } else {
                Some(state.history().tail())
            };
            let after = state.current_config();
            (n, actions, after, after != before, pending)
        };

        debug!(
            request = request_number,
            config = %config,
            execution_time_ms = format_args!("{execution_time_ms:.2}"),
            memory_used_mb = format_args!("{memory_used_mb:.2}"),
            cost = ?cost.value(),
            source = cost_source.as_str(),
            "request processed"
        );

        // ── Persisting ─────────────────────────────────────────────
        let persist_error = match pending {
            Some(records) => match self.write_snapshot(records, request_number).await {
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "failed to persist performance history");
                    Some(format!("{e:#}"))
                }
            },
            None => None,
        };

        IterationReport {
            request_number,
            config,
            message,
            execution_time_ms,
            memory_used_mb,
            cost,
            cost_source,
            cost_details,
            error,
            actions,
            next_config,
            config_changed,
            persist_error,
        }
    }

    /// Run the iteration on its own task. Dropping the returned handle does
    /// not cancel it, so an instance that was provisioned is always cleaned
    /// up and the iteration is always recorded.
    pub fn spawn_iteration(
        self: &Arc<Self>,
        operation: String,
        payload: Value,
    ) -> JoinHandle<IterationReport> {
        let control = Arc::clone(self);
        tokio::spawn(async move { control.run_iteration(&operation, &payload).await })
    }

    /// Provision, invoke and release an instance. The deadline covers
    /// provisioning and invocation; cleanup always runs once an instance
    /// exists.
    async fn invoke(
        &self,
        config: ConfigurationTuple,
        operation: &str,
        payload: &Value,
    ) -> (Result<String, ExecutorError>, Option<CostSnapshot>) {
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(config.timeout_secs as u64);

        let mut instance =
            match tokio::time::timeout_at(deadline, self.executor.provision(config)).await {
                Ok(Ok(instance)) => instance,
                Ok(Err(e)) => return (Err(e), None),
                Err(_) => return (Err(ExecutorError::Timeout(config.timeout_secs)), None),
            };

        let result = match tokio::time::timeout_at(deadline, instance.invoke(operation, payload))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ExecutorError::Timeout(config.timeout_secs)),
        };

        let snapshot = instance.cost_snapshot();
        instance.cleanup().await;
        (result, snapshot)
    }

    async fn write_snapshot(
        &self,
        records: Vec<PerformanceRecord>,
        sequence: u64,
    ) -> anyhow::Result<WriteOutcome> {
        let Some(file) = self.snapshot_file.clone() else {
            return Ok(WriteOutcome::Stale);
        };
        let outcome = tokio::task::spawn_blocking(move || file.write(&records, sequence))
            .await
            .context("snapshot writer panicked")??;
        if let WriteOutcome::Written(n) = outcome {
            info!(records = n, "saved performance records to disk");
        }
        Ok(outcome)
    }

    /// Persist the current history regardless of the schedule (shutdown).
    /// Returns `None` when no snapshot file is configured.
    pub async fn flush(&self) -> anyhow::Result<Option<WriteOutcome>> {
        if self.snapshot_file.is_none() {
            return Ok(None);
        }
        let (records, sequence) = {
            let guard = self.guarded.lock().await;
            (guard.state.history().tail(), guard.state.request_counter())
        };
        self.write_snapshot(records, sequence).await.map(Some)
    }

    /// Snapshot of the state with the last `recent` records.
    pub async fn snapshot(&self, recent: usize) -> TunerSnapshot {
        let guard = self.guarded.lock().await;
        let state = &guard.state;
        let window = state.history().recent_window(self.optimizer.settings().window);
        TunerSnapshot {
            current_optimal_config: state.current_config(),
            recent_performance: state.history().recent_window(recent).to_vec(),
            total_requests_processed: state.request_counter(),
            history_length: state.history().len(),
            ranked_configs: self.optimizer.rank_groups(window),
        }
    }

    pub async fn current_config(&self) -> ConfigurationTuple {
        self.guarded.lock().await.state.current_config()
    }

    pub async fn request_count(&self) -> u64 {
        self.guarded.lock().await.state.request_counter()
    }

    pub fn supports(&self, operation: &str) -> bool {
        self.executor.supports(operation)
    }
}
