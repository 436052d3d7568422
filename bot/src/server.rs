//! Minimal HTTP surface for the hosting platform and the keep-warm job.

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

async fn root() -> &'static str {
    "OK"
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

/// Serve on `0.0.0.0:port` until `cancel` fires.
pub async fn serve(port: u16, cancel: CancellationToken) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, "HTTP server listening");

    axum::serve(listener, router())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
