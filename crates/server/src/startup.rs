use axum::Router;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::errors::StartupError;
use crate::routes::{self, AppState, FacadeSettings};
use service::storage::DocumentStore;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Open the document store and assemble the router for `cfg`.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    let store = DocumentStore::open(&cfg.storage.data_dir).await?;
    let frontend = common::env::frontend_dir(&cfg.server.frontend_dir).await;

    if cfg.auth.api_key.is_none() {
        warn!("no storage api key configured; any caller can read and overwrite collections");
    }

    let state = AppState::new(store, FacadeSettings::from_config(cfg));
    Ok(routes::build_router(state, build_cors(), frontend.as_deref()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // 无法监听信号时保持运行，而不是立即退出
        error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!(event = "shutdown_signal", "received Ctrl+C, shutting down");
}

/// Public entry: build the app and run the HTTP server until Ctrl+C
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    if let Some(bind) = &cfg.admin.bind {
        let (admin_addr, _) =
            common::admin_http::spawn_admin_server(bind, service::metrics::encode_metrics).await?;
        info!(event = "admin_listening", %admin_addr, "admin endpoint up");
    }

    let app = build_app(&cfg).await?;

    let addr = cfg.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, data_dir = %cfg.storage.data_dir, "storage server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
