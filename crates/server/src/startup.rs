use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::info;

use common::admin_http::spawn_admin_server;
use service::content::{ContentStore, GitHubContentStore};

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    let raw = format!("{}:{}", cfg.server.host, cfg.server.port);
    raw.parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bind address {raw}: {e}")))
}

/// Build the app on top of `store`.
pub fn build_app(cfg: Arc<AppConfig>, store: Arc<dyn ContentStore>) -> Router {
    routes::build_router(AppState::new(cfg, store), build_cors())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl_c");
        return;
    }
    info!(event = "shutdown_signal", "received Ctrl+C, draining connections");
}

/// Public entry: build the app against the GitHub-backed store and serve until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let cfg = Arc::new(cfg);
    let store: Arc<dyn ContentStore> =
        Arc::new(GitHubContentStore::from_config(&cfg.github, &cfg.http_client).map_err(StartupError::from)?);

    if let Some(admin_addr) = cfg.server.admin_addr.clone() {
        spawn_admin_server(admin_addr);
    }

    let app = build_app(Arc::clone(&cfg), store);
    let addr = bind_addr(&cfg)?;
    info!(
        %addr,
        owner = %cfg.github.owner,
        repo = %cfg.github.repo,
        branch = %cfg.github.branch,
        registry = %cfg.storage.users_file_path,
        "starting notes backend"
    );
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(StartupError::from)?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}
