//! Route definitions for the Stealth Chat HTTP API.
//!
//! REST routes are mounted under `/api`, the gateway at `/ws`, and
//! locally stored media under `/media`.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Multipart framing allowance on top of the configured upload size.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_upload = usize::try_from(state.config.media.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let api_routes = Router::new()
        .merge(message_routes())
        .merge(user_routes())
        .merge(media_routes(max_upload))
        .merge(health_routes())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::timeout::request_timeout,
        ));

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));

    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);
    let media_dir = ServeDir::new(&state.config.media.root);

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .nest_service("/media", media_dir)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// History and HTTP send.
fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(handlers::message::send))
        .route("/messages/{other_user_id}", get(handlers::message::history))
}

/// User directory and presence lookups.
fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            post(handlers::user::register).get(handlers::user::search),
        )
        .route("/users/by-username/{username}", get(handlers::user::by_username))
        .route("/users/{user_id}", delete(handlers::user::deactivate))
        .route("/users/{user_id}/status", get(handlers::user::status))
}

/// Attachment upload.
fn media_routes(max_upload: usize) -> Router<AppState> {
    Router::new()
        .route("/media", post(handlers::media::upload))
        .layer(DefaultBodyLimit::max(max_upload))
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
