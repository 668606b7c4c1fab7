//! HTTP handlers.
//!
//! Trigger handlers run one control-loop iteration each and answer with the
//! measured outcome. Read handlers only take a snapshot.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use tunegrid_control::{IterationReport, PeriodicAction};
use tunegrid_core::{ConfigurationTuple, Cost, CostSnapshot, CostSource, PerformanceRecord};
use tunegrid_executor::workloads::HELLO;

use crate::ApiState;

/// Number of records returned by `/api/metrics`.
pub const RECENT_PERFORMANCE: usize = 10;

/// Error body, same shape for every failing route.
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: msg.to_string(),
        }),
    )
}

/// Body of a trigger response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeResponse {
    pub message: String,
    pub execution_time_ms: f64,
    pub memory_used_mb: f64,
    pub estimated_cost: Cost,
    pub cost_source: CostSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_details: Option<CostSnapshot>,
    pub config: ConfigurationTuple,
    pub request_number: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<PeriodicAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<IterationReport> for InvokeResponse {
    fn from(report: IterationReport) -> Self {
        Self {
            message: report.message,
            execution_time_ms: report.execution_time_ms,
            memory_used_mb: report.memory_used_mb,
            estimated_cost: report.cost,
            cost_source: report.cost_source,
            cost_details: report.cost_details,
            config: report.config,
            request_number: report.request_number,
            actions: report.actions,
            error: report.error.map(|e| e.to_string()),
        }
    }
}

/// Body of `/api/metrics`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TunerMetrics {
    pub current_optimal_config: ConfigurationTuple,
    pub recent_performance: Vec<PerformanceRecord>,
    pub total_requests_processed: u64,
}

// ── Trigger ────────────────────────────────────────────────────

async fn run(state: &ApiState, operation: &str, payload: Value) -> axum::response::Response {
    if !state.control.supports(operation) {
        return error_response(
            &format!("unknown operation: {operation}"),
            StatusCode::NOT_FOUND,
        )
        .into_response();
    }

    // The iteration runs on its own task so a client disconnect cannot
    // cancel it mid-invoke.
    let report = match state
        .control
        .spawn_iteration(operation.to_string(), payload)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            error!(operation, error = %e, "iteration task failed");
            return error_response("iteration failed", StatusCode::INTERNAL_SERVER_ERROR)
                .into_response();
        }
    };
    debug!(
        operation,
        request = report.request_number,
        ok = report.succeeded(),
        "trigger handled"
    );

    let status = if report.succeeded() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(InvokeResponse::from(report))).into_response()
}

/// GET /api/invoke/{operation}/{name}
pub async fn invoke_with_name(
    State(state): State<ApiState>,
    Path((operation, name)): Path<(String, String)>,
) -> impl IntoResponse {
    run(&state, &operation, Value::String(name)).await
}

/// POST /api/invoke/{operation}
pub async fn invoke_with_payload(
    State(state): State<ApiState>,
    Path(operation): Path<String>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    run(&state, &operation, payload).await
}

/// GET /api/hello/{name}
pub async fn hello(State(state): State<ApiState>, Path(name): Path<String>) -> impl IntoResponse {
    run(&state, HELLO, Value::String(name)).await
}

// ── Read-only ──────────────────────────────────────────────────

/// GET /api/metrics
pub async fn tuner_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.control.snapshot(RECENT_PERFORMANCE).await;
    Json(TunerMetrics {
        current_optimal_config: snapshot.current_optimal_config,
        recent_performance: snapshot.recent_performance,
        total_requests_processed: snapshot.total_requests_processed,
    })
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.control.snapshot(RECENT_PERFORMANCE).await;
    let body = tunegrid_metrics::render_prometheus(&snapshot);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tunegrid_control::ControlLoop;
    use tunegrid_core::TunerConfig;
    use tunegrid_executor::{ExecutorError, ExecutorResult, FixedProbe, LocalExecutor};

    fn test_state() -> ApiState {
        let executor = LocalExecutor::with_builtin_workloads().with_workload(
            "fail",
            Arc::new(|_: &Value| -> ExecutorResult<String> {
                Err(ExecutorError::Invocation("boom".to_string()))
            }),
        );
        let control = ControlLoop::new(&TunerConfig::default(), Arc::new(executor))
            .with_probe(Arc::new(FixedProbe(None)));
        ApiState {
            control: Arc::new(control),
        }
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn hello_runs_an_iteration() {
        let state = test_state();
        let resp = hello(State(state.clone()), Path("Alice".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert!(body["message"].as_str().unwrap().starts_with("Hello, Alice!"));
        assert_eq!(body["costSource"], "estimated");
        assert!(body["estimatedCost"].as_f64().unwrap() > 0.0);
        assert_eq!(body["config"]["memorySize"], 256);
        assert_eq!(body["requestNumber"], 1);
        assert!(body.get("error").is_none());
        assert_eq!(state.control.request_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_operation_is_not_found() {
        let state = test_state();
        let resp = invoke_with_name(
            State(state.clone()),
            Path(("resize-image".to_string(), "x".to_string())),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(state.control.request_count().await, 0);
    }

    #[tokio::test]
    async fn executor_failure_is_bad_gateway_and_recorded() {
        let state = test_state();
        let resp = invoke_with_payload(
            State(state.clone()),
            Path("fail".to_string()),
            Json(Value::Null),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let body = body_json(resp).await;
        assert_eq!(body["estimatedCost"], Value::Null);
        assert_eq!(body["costSource"], "unavailable");
        assert!(body["error"].as_str().unwrap().contains("boom"));
        assert_eq!(state.control.request_count().await, 1);
    }

    #[tokio::test]
    async fn process_data_takes_json_payload() {
        let state = test_state();
        let resp = invoke_with_payload(
            State(state),
            Path("process-data".to_string()),
            Json(serde_json::json!({"items": [1, 2, 3]})),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        let message: Value = serde_json::from_str(body["message"].as_str().unwrap()).unwrap();
        assert_eq!(message["processed"], true);
    }

    #[tokio::test]
    async fn metrics_reports_recent_ten() {
        let state = test_state();
        for i in 0..12 {
            hello(State(state.clone()), Path(format!("user-{i}"))).await;
        }

        let resp = tuner_metrics(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["totalRequestsProcessed"], 12);
        assert_eq!(body["recentPerformance"].as_array().unwrap().len(), 10);
        assert_eq!(body["currentOptimalConfig"]["concurrency"], 20);
        assert_eq!(body["currentOptimalConfig"]["timeout"], 30);
    }

    #[tokio::test]
    async fn prometheus_endpoint_returns_text() {
        let state = test_state();
        let resp = prometheus_metrics(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.contains("text/plain"));
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let resp = healthz().await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn disconnected_client_still_records_iteration() {
        let executor = LocalExecutor::empty().with_workload(
            "slow",
            Arc::new(|_: &Value| -> ExecutorResult<String> {
                std::thread::sleep(Duration::from_millis(300));
                Ok("done".to_string())
            }),
        );
        let control = ControlLoop::new(&TunerConfig::default(), Arc::new(executor))
            .with_probe(Arc::new(FixedProbe(None)));
        let state = ApiState {
            control: Arc::new(control),
        };

        // The caller goes away while the workload is still running.
        let call = invoke_with_name(
            State(state.clone()),
            Path(("slow".to_string(), "x".to_string())),
        );
        assert!(tokio::time::timeout(Duration::from_millis(50), call).await.is_err());
        assert_eq!(state.control.request_count().await, 0);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while state.control.request_count().await == 0 {
            assert!(tokio::time::Instant::now() < deadline, "iteration was lost");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let snapshot = state.control.snapshot(1).await;
        assert_eq!(snapshot.recent_performance[0].result_summary, "done");
    }
}
