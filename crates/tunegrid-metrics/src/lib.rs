//! tunegrid-metrics: observability for the tuner.
//!
//! Renders a [`TunerSnapshot`](tunegrid_control::TunerSnapshot) into the
//! Prometheus text exposition format for the `/metrics` endpoint.
//!
//! # Exposed series
//!
//! ```text
//! tunegrid_requests_total                     counter
//! tunegrid_history_records                    gauge
//! tunegrid_current_config_info{memory_mb,...} gauge (always 1)
//! tunegrid_current_memory_mb / _concurrency / _timeout_seconds
//! tunegrid_config_avg_cost_dollars{config=...}
//! tunegrid_config_avg_execution_ms{config=...}
//! tunegrid_config_samples{config=...}
//! ```

pub mod prometheus;

pub use prometheus::render_prometheus;
