//! LocalExecutor: in-process execution of registered workloads.
//!
//! Workloads run on tokio's blocking pool. Instances provisioned with the
//! same concurrency limit share one semaphore, so at most `concurrency`
//! invocations of that configuration run at once. Memory size is recorded
//! for billing only; it does not constrain the workload.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::debug;
use tunegrid_core::{ConfigurationTuple, CostSnapshot};

use crate::error::ExecutorError;
use crate::executor::{FunctionExecutor, FunctionInstance, InvokeFuture, ProvisionFuture};
use crate::workloads::{self, Workload};

/// AWS Lambda request charge ($0.20 per million).
const PRICE_PER_REQUEST: f64 = 0.000_000_2;

pub struct LocalExecutor {
    workloads: Arc<HashMap<String, Workload>>,
    /// Concurrency limit → shared permit pool.
    limits: Mutex<HashMap<u32, Arc<Semaphore>>>,
    /// When set, instances report cost snapshots at this GB-second price.
    reported_price: Option<f64>,
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::with_builtin_workloads()
    }
}

impl LocalExecutor {
    /// An executor with no workloads.
    pub fn empty() -> Self {
        Self {
            workloads: Arc::new(HashMap::new()),
            limits: Mutex::new(HashMap::new()),
            reported_price: None,
        }
    }

    /// An executor with `hello` and `process-data` registered.
    pub fn with_builtin_workloads() -> Self {
        Self::empty()
            .with_workload(workloads::HELLO, Arc::new(workloads::hello))
            .with_workload(workloads::PROCESS_DATA, Arc::new(workloads::process_data))
    }

    pub fn with_workload(mut self, name: &str, workload: Workload) -> Self {
        Arc::make_mut(&mut self.workloads).insert(name.to_string(), workload);
        self
    }

    /// Report per-instance cost snapshots priced at `price_per_gb_second`.
    pub fn reporting_costs(mut self, price_per_gb_second: f64) -> Self {
        self.reported_price = Some(price_per_gb_second);
        self
    }

    pub fn operations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.workloads.keys().cloned().collect();
        names.sort();
        names
    }

    fn semaphore_for(&self, concurrency: u32) -> Arc<Semaphore> {
        let mut limits = self.limits.lock().unwrap_or_else(|p| p.into_inner());
        limits
            .entry(concurrency)
            .or_insert_with(|| Arc::new(Semaphore::new(concurrency.max(1) as usize)))
            .clone()
    }
}

impl FunctionExecutor for LocalExecutor {
    fn provision(&self, config: ConfigurationTuple) -> ProvisionFuture<'_> {
        let permits = self.semaphore_for(config.concurrency);
        let instance = LocalInstance {
            config,
            workloads: Arc::clone(&self.workloads),
            permits,
            reported_price: self.reported_price,
            invocations: 0,
            billed_ms: 0.0,
        };
        Box::pin(async move { Ok(Box::new(instance) as Box<dyn FunctionInstance>) })
    }

    fn supports(&self, operation: &str) -> bool {
        self.workloads.contains_key(operation)
    }
}

struct LocalInstance {
    config: ConfigurationTuple,
    workloads: Arc<HashMap<String, Workload>>,
    permits: Arc<Semaphore>,
    reported_price: Option<f64>,
    invocations: u64,
    billed_ms: f64,
}

impl FunctionInstance for LocalInstance {
    fn invoke<'a>(&'a mut self, operation: &'a str, payload: &'a Value) -> InvokeFuture<'a> {
        Box::pin(async move {
            let workload = self
                .workloads
                .get(operation)
                .cloned()
                .ok_or_else(|| ExecutorError::UnknownOperation(operation.to_string()))?;

            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|e| ExecutorError::Provision(e.to_string()))?;

            let payload = payload.clone();
            let start = Instant::now();
            // The permit moves into the blocking task so the limit holds even
            // if the caller stops waiting.
            let result = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                workload(&payload)
            })
            .await
            .map_err(|e| ExecutorError::Invocation(e.to_string()))?;

            self.invocations += 1;
            self.billed_ms += start.elapsed().as_secs_f64() * 1000.0;
            debug!(
                operation,
                config = %self.config,
                ok = result.is_ok(),
                "local invocation finished"
            );
            result
        })
    }

    fn cost_snapshot(&self) -> Option<CostSnapshot> {
        let price = self.reported_price?;
        let gb_seconds =
            (self.config.memory_size_mb as f64 / 1024.0) * (self.billed_ms / 1000.0);
        let duration = gb_seconds * price;
        let requests = self.invocations as f64 * PRICE_PER_REQUEST;
        Some(CostSnapshot {
            total: duration + requests,
            breakdown: BTreeMap::from([
                ("functionCallDuration".to_string(), duration),
                ("functionCallRequests".to_string(), requests),
            ]),
        })
    }

    fn cleanup(self: Box<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        debug!(config = %self.config, invocations = self.invocations, "local instance released");
        Box::pin(async {})
    }
}
