//! Per-request deadline for REST routes.

use std::time::Duration;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::ApiErrorResponse;
use crate::state::AppState;

/// Fails the request with 408 once `server.request_timeout_seconds` passes.
pub async fn request_timeout(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let limit = Duration::from_secs(state.config.server.request_timeout_seconds);
    let path = request.uri().path().to_string();

    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(path = %path, timeout_secs = limit.as_secs(), "Request timed out");
            let body = ApiErrorResponse {
                error: "REQUEST_TIMEOUT".to_string(),
                message: format!("Request exceeded {}s", limit.as_secs()),
            };
            (StatusCode::REQUEST_TIMEOUT, Json(body)).into_response()
        }
    }
}
