//! `tunegridd serve`: HTTP server with a final history flush on shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tunegrid_control::ControlLoop;

pub async fn run(port: u16, control: Arc<ControlLoop>) -> anyhow::Result<()> {
    info!(config = %control.current_config().await, "tuner starting");

    let router = tunegrid_api::build_router(Arc::clone(&control));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
        })
        .await?;

    match control.flush().await {
        Ok(Some(outcome)) => info!(?outcome, "performance history flushed"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "final history flush failed"),
    }

    info!("tunegrid daemon stopped");
    Ok(())
}
