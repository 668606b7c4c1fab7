//! tunegridd: the tunegrid daemon.
//!
//! Assembles the tuner:
//! - Configuration (TOML + CLI overrides)
//! - Performance history (JSON snapshot)
//! - Local function executor
//! - Control loop
//! - HTTP API
//!
//! # Usage
//!
//! ```text
//! tunegridd serve --port 3000 --config tunegrid.toml
//! tunegridd bench --requests 1000 --concurrency 10
//! ```

mod bench;
mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tunegrid_control::ControlLoop;
use tunegrid_core::TunerConfig;
use tunegrid_executor::LocalExecutor;
use tunegrid_optimizer::RngSource;
use tunegrid_store::{LoadOutcome, SnapshotFile};

const DEFAULT_LOG_FILTER: &str = "info,tunegridd=debug,tunegrid=debug";

#[derive(Parser)]
#[command(name = "tunegridd", about = "Adaptive configuration tuner daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the trigger and metrics endpoints.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "3000")]
        port: u16,

        #[command(flatten)]
        tuner: TunerArgs,
    },
    /// Drive the control loop in-process with synthetic requests.
    Bench {
        /// Total number of requests.
        #[arg(long, default_value = "1000")]
        requests: u64,

        /// Requests in flight at once.
        #[arg(long, default_value = "10")]
        concurrency: usize,

        /// Operation to invoke.
        #[arg(long, default_value = "hello")]
        operation: String,

        /// Print progress every this many completed requests.
        #[arg(long, default_value = "100")]
        batch: u64,

        #[command(flatten)]
        tuner: TunerArgs,
    },
}

/// Options shared by every subcommand that builds a control loop.
#[derive(Args)]
struct TunerArgs {
    /// Tuner configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Performance history snapshot path (overrides the config file).
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Have the executor report per-invocation cost snapshots.
    #[arg(long)]
    report_costs: bool,

    /// Seed for exploration draws.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Serve { port, tuner } => {
            let control = build_control(&tuner)?;
            serve::run(port, Arc::new(control)).await
        }
        Command::Bench {
            requests,
            concurrency,
            operation,
            batch,
            tuner,
        } => {
            let control = build_control(&tuner)?;
            let plan = bench::BenchPlan {
                requests,
                concurrency,
                operation,
                batch,
            };
            bench::run(Arc::new(control), plan).await
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(args: &TunerArgs) -> anyhow::Result<TunerConfig> {
    let mut config = match &args.config {
        Some(path) => TunerConfig::from_file(path)?,
        None => TunerConfig::default(),
    };
    if let Some(snapshot) = &args.snapshot {
        config.history.snapshot_path = snapshot.clone();
    }
    Ok(config)
}

fn build_control(args: &TunerArgs) -> anyhow::Result<ControlLoop> {
    let config = load_config(args)?;

    let mut executor = LocalExecutor::with_builtin_workloads();
    if args.report_costs {
        executor = executor.reporting_costs(config.pricing.price_per_gb_second);
    }
    info!(operations = ?executor.operations(), "local executor initialized");

    let mut control = ControlLoop::new(&config, Arc::new(executor))
        .with_snapshot_file(SnapshotFile::new(&config.history.snapshot_path));
    if let Some(seed) = args.seed {
        control = control.with_random_source(Box::new(RngSource::seeded(seed)));
    }

    if let LoadOutcome::Loaded { records, .. } = control.restore() {
        info!(records, "performance history restored");
    }
    info!(
        path = ?config.history.snapshot_path,
        window = config.optimizer.window,
        optimize_every = config.schedule.optimize_every,
        explore_every = config.schedule.explore_every,
        "control loop initialized"
    );
    Ok(control)
}
