//! Lightweight admin HTTP listener
//!
//! Exposes `/healthz` and `/metrics` endpoints, with metrics provided by caller.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub type MetricsFn = fn() -> (StatusCode, String);

async fn healthz() -> &'static str { "OK" }

pub fn admin_router(metrics_fn: MetricsFn) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(move || async move { metrics_fn() }))
}

/// Bind the admin listener and serve it on a background task.
/// Binding happens before returning so a bad address fails startup; the
/// returned address is the one actually bound (useful with port 0).
pub async fn spawn_admin_server(
    addr: &str,
    metrics_fn: MetricsFn,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("cannot bind admin listener on {addr}: {e}"))?;
    let local = listener.local_addr()?;
    info!(addr = %local, "admin server listening");
    let router = admin_router(metrics_fn);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "admin server stopped");
        }
    });
    Ok((local, handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_metrics() -> (StatusCode, String) {
        (StatusCode::OK, "fake_metric 1\n".to_string())
    }

    #[tokio::test]
    async fn serves_healthz_and_metrics() -> anyhow::Result<()> {
        let (addr, handle) = spawn_admin_server("127.0.0.1:0", fake_metrics).await?;
        assert_ne!(addr.port(), 0);

        let health = reqwest::get(format!("http://{addr}/healthz")).await?;
        assert_eq!(health.status(), reqwest::StatusCode::OK);
        assert_eq!(health.text().await?, "OK");

        let metrics = reqwest::get(format!("http://{addr}/metrics")).await?.text().await?;
        assert!(metrics.contains("fake_metric 1"));

        let missing = reqwest::get(format!("http://{addr}/nope")).await?;
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        handle.abort();
        Ok(())
    }

    #[tokio::test]
    async fn bad_bind_address_is_an_error() {
        assert!(spawn_admin_server("not-an-address", fake_metrics).await.is_err());
    }
}
