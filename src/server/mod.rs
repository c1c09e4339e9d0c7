// Server module
// HTTP front end: chat page, chat endpoint and document upload


pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::service::RagService;

/// Build the application router around a shared service
#[inline]
pub fn router(service: Arc<RagService>) -> Router {
    let max_upload_bytes = service.config().server.max_upload_bytes;

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/chat", post(routes::chat))
        .route(
            "/upload",
            post(routes::upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

/// Serve until Ctrl-C
#[inline]
pub async fn serve(service: Arc<RagService>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        "Serving on http://{}",
        listener.local_addr().context("Listener has no address")?
    );

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
            }
        })
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}
