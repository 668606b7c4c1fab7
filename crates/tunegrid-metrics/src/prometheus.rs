//! Prometheus text exposition format.
//!
//! Renders a tuner snapshot into the Prometheus text exposition format
//! for scraping by a Prometheus server or compatible agent.

use std::fmt::Write;

use tunegrid_control::TunerSnapshot;
use tunegrid_core::ConfigurationTuple;

/// Render the tuner snapshot into Prometheus text format.
///
/// Per-configuration series carry a `config` label and only cover the
/// configurations ranked in the optimizer window.
pub fn render_prometheus(snapshot: &TunerSnapshot) -> String {
    let mut out = String::new();
    let current = snapshot.current_optimal_config;

    header(&mut out, "tunegrid_requests_total", "Requests processed since start.", "counter");
    let _ = writeln!(out, "tunegrid_requests_total {}", snapshot.total_requests_processed);

    header(
        &mut out,
        "tunegrid_history_records",
        "Records held in the performance history.",
        "gauge",
    );
    let _ = writeln!(out, "tunegrid_history_records {}", snapshot.history_length);

    header(&mut out, "tunegrid_current_config_info", "Configuration currently in effect.", "gauge");
    let _ = writeln!(out, "tunegrid_current_config_info{{{}}} 1", labels(current));

    header(
        &mut out,
        "tunegrid_current_memory_mb",
        "Memory size of the current configuration.",
        "gauge",
    );
    let _ = writeln!(out, "tunegrid_current_memory_mb {}", current.memory_size_mb);

    header(
        &mut out,
        "tunegrid_current_concurrency",
        "Concurrency limit of the current configuration.",
        "gauge",
    );
    let _ = writeln!(out, "tunegrid_current_concurrency {}", current.concurrency);

    header(
        &mut out,
        "tunegrid_current_timeout_seconds",
        "Timeout of the current configuration.",
        "gauge",
    );
    let _ = writeln!(out, "tunegrid_current_timeout_seconds {}", current.timeout_secs);

    header(
        &mut out,
        "tunegrid_config_avg_cost_dollars",
        "Average cost per request in the optimizer window.",
        "gauge",
    );
    for g in &snapshot.ranked_configs {
        let _ = writeln!(
            out,
            "tunegrid_config_avg_cost_dollars{{config=\"{}\"}} {:e}",
            g.config, g.avg_cost
        );
    }

    header(
        &mut out,
        "tunegrid_config_avg_execution_ms",
        "Average execution time in the optimizer window.",
        "gauge",
    );
    for g in &snapshot.ranked_configs {
        let _ = writeln!(
            out,
            "tunegrid_config_avg_execution_ms{{config=\"{}\"}} {:.2}",
            g.config, g.avg_time_ms
        );
    }

    header(
        &mut out,
        "tunegrid_config_samples",
        "Records per configuration in the optimizer window.",
        "gauge",
    );
    for g in &snapshot.ranked_configs {
        let _ = writeln!(
            out,
            "tunegrid_config_samples{{config=\"{}\"}} {}",
            g.config, g.samples
        );
    }

    let failed = snapshot
        .recent_performance
        .iter()
        .filter(|r| !r.cost.is_valid())
        .count();
    header(
        &mut out,
        "tunegrid_recent_failures",
        "Records without a valid cost among the recent ones.",
        "gauge",
    );
    let _ = writeln!(out, "tunegrid_recent_failures {failed}");

    out
}

fn header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} {kind}");
}

fn labels(config: ConfigurationTuple) -> String {
    format!(
        "memory_mb=\"{}\",concurrency=\"{}\",timeout_seconds=\"{}\"",
        config.memory_size_mb, config.concurrency, config.timeout_secs
    )
}
