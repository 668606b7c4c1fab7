//! `tunegridd bench`: drives the control loop with synthetic load.
//!
//! Requests are issued with at most `concurrency` in flight. After every
//! `batch` completions the current optimal configuration is printed.

use std::sync::Arc;
use std::time::Instant;

use anyhow::bail;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use tunegrid_control::{ControlLoop, IterationReport, PeriodicAction};

pub struct BenchPlan {
    pub requests: u64,
    pub concurrency: usize,
    pub operation: String,
    pub batch: u64,
}

/// Totals over a bench run.
#[derive(Debug, Default, PartialEq)]
pub struct BenchSummary {
    pub completed: u64,
    pub failed: u64,
    pub switches: u64,
    pub explorations: u64,
}

pub async fn run(control: Arc<ControlLoop>, plan: BenchPlan) -> anyhow::Result<()> {
    let started = Instant::now();
    let summary = drive(Arc::clone(&control), &plan).await?;
    let elapsed = started.elapsed();

    println!();
    println!("Load test complete");
    println!("  requests:      {}", summary.completed);
    println!("  failed:        {}", summary.failed);
    println!("  explorations:  {}", summary.explorations);
    println!("  config changes: {}", summary.switches);
    println!("  elapsed:       {:.2}s", elapsed.as_secs_f64());
    println!(
        "  throughput:    {:.1} req/s",
        summary.completed as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    println!("  final config:  {}", control.current_config().await);

    if let Err(e) = control.flush().await {
        warn!(error = %e, "final history flush failed");
    }
    Ok(())
}

async fn drive(control: Arc<ControlLoop>, plan: &BenchPlan) -> anyhow::Result<BenchSummary> {
    if !control.supports(&plan.operation) {
        bail!("unknown operation: {}", plan.operation);
    }
    if plan.concurrency == 0 {
        bail!("concurrency must be at least 1");
    }

    info!(
        requests = plan.requests,
        concurrency = plan.concurrency,
        operation = %plan.operation,
        "starting load test"
    );

    let permits = Arc::new(Semaphore::new(plan.concurrency));
    let mut tasks = JoinSet::new();
    let mut summary = BenchSummary::default();

    for i in 0..plan.requests {
        let permit = Arc::clone(&permits).acquire_owned().await?;
        let worker = Arc::clone(&control);
        let operation = plan.operation.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let payload = Value::String(format!("user-{i}"));
            worker.run_iteration(&operation, &payload).await
        });

        // Reap whatever has finished so progress is reported as we go.
        while let Some(joined) = tasks.try_join_next() {
            tally(&control, plan, &mut summary, joined?).await;
        }
    }
    while let Some(joined) = tasks.join_next().await {
        tally(&control, plan, &mut summary, joined?).await;
    }

    Ok(summary)
}

async fn tally(
    control: &ControlLoop,
    plan: &BenchPlan,
    summary: &mut BenchSummary,
    report: IterationReport,
) {
    summary.completed += 1;
    if !report.succeeded() {
        summary.failed += 1;
    }
    if report.actions.contains(&PeriodicAction::Explore) {
        summary.explorations += 1;
    }
    if report.config_changed {
        summary.switches += 1;
    }

    if plan.batch > 0 && summary.completed % plan.batch == 0 {
        println!(
            "Completed {} requests. Current optimal config: {}",
            summary.completed,
            control.current_config().await
        );
    }
}
