//! tunegrid-api: HTTP surface of the tuner.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/invoke/{operation}/{name}` | Run one iteration with a name payload |
//! | POST | `/api/invoke/{operation}` | Run one iteration with a JSON payload |
//! | GET | `/api/hello/{name}` | Alias for `/api/invoke/hello/{name}` |
//! | GET | `/api/metrics` | Current configuration and recent performance |
//! | GET | `/metrics` | Prometheus exposition |
//! | GET | `/healthz` | Liveness |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tunegrid_control::ControlLoop;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub control: Arc<ControlLoop>,
}

/// Build the complete router.
pub fn build_router(control: Arc<ControlLoop>) -> Router {
    let state = ApiState { control };

    let api_routes = Router::new()
        .route("/invoke/{operation}", post(handlers::invoke_with_payload))
        .route("/invoke/{operation}/{name}", get(handlers::invoke_with_name))
        .route("/hello/{name}", get(handlers::hello))
        .route("/metrics", get(handlers::tuner_metrics));

    Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
