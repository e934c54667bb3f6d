//! Lightweight admin HTTP listener
//!
//! Exposes `/healthz` and `/metrics` on a separate address so scrapers never
//! share the public listener.

use axum::http::StatusCode;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::metrics;

async fn healthz() -> &'static str {
    "OK"
}

async fn metrics_handler() -> (StatusCode, String) {
    metrics::encode_metrics()
}

pub fn admin_router() -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
}

/// Spawn the admin server on the current runtime. Bind or serve failures are
/// logged; they never take the public listener down.
pub fn spawn_admin_server(addr: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!(%addr, error = %e, event = "admin_bind_failed", "cannot bind admin listener");
                return;
            }
        };
        info!(%addr, event = "admin_listening", "admin server listening");
        if let Err(e) = axum::serve(listener, admin_router()).await {
            error!(%addr, error = %e, event = "admin_serve_failed", "admin server stopped");
        }
    })
}
