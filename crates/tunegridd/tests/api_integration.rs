//! Router-level tests.
//!
//! Drives the full router against an in-process control loop: triggers,
//! tuner metrics, Prometheus exposition and persistence across restarts.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use tunegrid_api::build_router;
use tunegrid_control::ControlLoop;
use tunegrid_core::TunerConfig;
use tunegrid_core::config::ScheduleSettings;
use tunegrid_executor::{FixedProbe, LocalExecutor};
use tunegrid_store::{LoadOutcome, SnapshotFile};

fn test_control(config: &TunerConfig) -> ControlLoop {
    ControlLoop::new(config, Arc::new(LocalExecutor::with_builtin_workloads()))
        .with_probe(Arc::new(FixedProbe(Some(64.0))))
}

async fn get(router: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn hello_route_returns_measurement() {
    let router = build_router(Arc::new(test_control(&TunerConfig::default())));

    let (status, body) = get(&router, "/api/hello/Alice").await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["message"].as_str().unwrap().starts_with("Hello, Alice!"));
    assert!(body["executionTimeMs"].as_f64().unwrap() >= 0.0);
    assert_eq!(body["memoryUsedMb"], 0.0);
    assert_eq!(body["costSource"], "estimated");
    assert!(body.get("costDetails").is_none());
}

#[tokio::test]
async fn invoke_route_with_name() {
    let router = build_router(Arc::new(test_control(&TunerConfig::default())));

    let (status, body) = get(&router, "/api/invoke/hello/Bob").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["message"].as_str().unwrap().starts_with("Hello, Bob!"));
}

#[tokio::test]
async fn invoke_route_with_json_payload() {
    let router = build_router(Arc::new(test_control(&TunerConfig::default())));

    let req = Request::builder()
        .method("POST")
        .uri("/api/invoke/process-data")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"records":[1,2,3]}"#))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_hello_payload_is_bad_gateway() {
    let control = Arc::new(test_control(&TunerConfig::default()));
    let router = build_router(Arc::clone(&control));

    let req = Request::builder()
        .method("POST")
        .uri("/api/invoke/hello")
        .header("content-type", "application/json")
        .body(Body::from("[1, 2]"))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let snapshot = control.snapshot(1).await;
    assert_eq!(snapshot.total_requests_processed, 1);
    assert!(!snapshot.recent_performance[0].cost.is_valid());
}

#[tokio::test]
async fn unknown_operation_is_not_found() {
    let router = build_router(Arc::new(test_control(&TunerConfig::default())));
    let (status, _) = get(&router, "/api/invoke/resize-image/x").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_route_tracks_requests() {
    let router = build_router(Arc::new(test_control(&TunerConfig::default())));

    for i in 0..3 {
        let (status, _) = get(&router, &format!("/api/hello/user-{i}")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = get(&router, "/api/metrics").await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["totalRequestsProcessed"], 3);
    assert_eq!(body["currentOptimalConfig"]["memorySize"], 256);
    let recent = body["recentPerformance"].as_array().unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[2]["costSource"], "estimated");
    assert!(recent[2]["timestamp"].is_string());
}

#[tokio::test]
async fn prometheus_and_health_routes() {
    let router = build_router(Arc::new(test_control(&TunerConfig::default())));
    get(&router, "/api/hello/Alice").await;

    let (status, body) = get(&router, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("tunegrid_requests_total 1\n"));

    let (status, body) = get(&router, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn history_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("performance_history.json");
    let config = TunerConfig {
        schedule: ScheduleSettings {
            optimize_every: 5,
            explore_every: 0,
        },
        ..TunerConfig::default()
    };

    let control = Arc::new(test_control(&config).with_snapshot_file(SnapshotFile::new(&path)));
    let router = build_router(Arc::clone(&control));
    for i in 0..7 {
        get(&router, &format!("/api/hello/user-{i}")).await;
    }
    control.flush().await.unwrap();

    let mut restarted = test_control(&config).with_snapshot_file(SnapshotFile::new(&path));
    assert_eq!(
        restarted.restore(),
        LoadOutcome::Loaded {
            records: 7,
            defaulted_timeouts: 0
        }
    );
    let router = build_router(Arc::new(restarted));

    let (_, body) = get(&router, "/api/metrics").await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["totalRequestsProcessed"], 0);
    assert_eq!(body["recentPerformance"].as_array().unwrap().len(), 7);
}
