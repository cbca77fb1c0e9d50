//! Application builder: wires router + middleware + state into an Axum app
//! and serves it.

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tracing::info;

use stealth_core::error::{AppError, ErrorKind};

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state).layer(CompressionLayer::new())
}

/// Serves the app on `listener` until `shutdown` resolves, then stops the
/// realtime engine so open sockets close.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let engine = state.realtime.clone();
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Listener has no address", e))?;
    let app = build_app(state);

    info!(%addr, "Stealth Chat server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            if let Err(e) = engine.shutdown().await {
                tracing::error!(error = %e, "Realtime engine shutdown failed");
            }
        })
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Server error", e))
}
