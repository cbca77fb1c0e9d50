//! Health check handler.

use axum::Json;
use axum::extract::State;
use tracing::warn;

use crate::dto::response::HealthResponse;
use crate::state::AppState;

/// GET /api/health
///
/// Always answers 200; `status` is `degraded` when the message store or
/// the media backend fails its check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = &state.realtime;

    let database_ok = engine.pipeline.store_healthy().await;
    let storage_ok = match state.media.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            warn!(error = %e, "Media health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if database_ok && storage_ok { "ok" } else { "degraded" }.to_string(),
        database: if database_ok { "connected" } else { "unavailable" }.to_string(),
        storage: if storage_ok { "available" } else { "unavailable" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        ws_connections: engine.connections.connection_count(),
        online_users: engine.presence.online_count(),
        metrics: engine.metrics.snapshot(),
    })
}
