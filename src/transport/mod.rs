//! Network transports for the MCP server
//!
//! One axum router serves the HTTP JSON-RPC bridge (`/mcp`), the SSE
//! transport (`/sse`, `/messages/`) and a liveness probe (`/health`).
//! The stdio transport is separate and shares only the dispatcher.

pub mod http;
pub mod sessions;
pub mod sse;
pub mod stdio;

pub use sessions::{SessionManager, SessionSender, SessionSummary};

use crate::mcp::dispatch::Dispatcher;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

/// Build the HTTP router for the bridge and SSE transports
pub fn build_router(dispatcher: Dispatcher) -> Router {
    Router::new()
        // JSON-RPC bridge
        .route(
            "/mcp",
            get(http::mcp_info_handler).post(http::mcp_post_handler),
        )
        .route("/health", get(http::health_handler))
        // SSE transport
        .route("/sse", get(sse::sse_handler))
        .route("/messages", post(sse::messages_handler))
        .route("/messages/", post(sse::messages_handler))
        .with_state(dispatcher)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve HTTP and SSE on `addr` until `shutdown` resolves.
///
/// The session reaper runs for the lifetime of the server.
pub async fn serve<F>(dispatcher: Dispatcher, addr: &str, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
    let reaper = dispatcher
        .context()
        .sessions
        .spawn_reaper(shutdown_tx.subscribe());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("MCP server listening on http://{}", listener.local_addr()?);
    info!("HTTP bridge: POST /mcp, SSE: GET /sse");

    let router = build_router(dispatcher);
    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await;

    debug!("Stopping background tasks");
    let _ = shutdown_tx.send(());
    if let Err(e) = reaper.await {
        warn!("Session reaper ended abnormally: {}", e);
    }

    result?;
    info!("MCP server stopped");
    Ok(())
}

/// Resolves on Ctrl-C
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl-C, shutting down");
}
