//! User directory and presence handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;

use stealth_core::error::AppError;
use stealth_entity::user::User;
use stealth_realtime::presence::format_last_seen;

use crate::dto::request::CreateUserRequest;
use crate::dto::response::{
    RegisteredUserResponse, UserListResponse, UserStatusResponse, UserView,
};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::extractors::path::parse_user_id;
use crate::state::AppState;

/// `?q=&limit=` for user search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserSearchParams {
    /// Substring of the username or display name.
    #[serde(default)]
    pub q: String,
    /// Page size (default 20, clamped to 1..=100).
    pub limit: Option<u32>,
}

/// POST /api/users
///
/// Open registration, enabled by `auth.allow_registration`. Returns the
/// new user with a token.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<RegisteredUserResponse>), ApiError> {
    if !state.config.auth.allow_registration {
        return Err(AppError::authorization("Registration is disabled").into());
    }
    request.check()?;

    let user = state.realtime.directory.register(request.into()).await?;
    let token = state.issuer.issue(user.id)?;
    let view = with_presence(&state, user);

    Ok((StatusCode::CREATED, Json(RegisteredUserResponse { user: view, token })))
}

/// GET /api/users?q=&limit=
pub async fn search(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<UserSearchParams>,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = state
        .realtime
        .directory
        .search(&params.q, params.limit)
        .await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(|u| with_presence(&state, u)).collect(),
    }))
}

/// GET /api/users/by-username/{username}
pub async fn by_username(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(username): Path<String>,
) -> Result<Json<UserView>, ApiError> {
    let user = state.realtime.directory.find_by_username(&username).await?;
    Ok(Json(with_presence(&state, user)))
}

/// DELETE /api/users/{user_id}
///
/// Soft-deletes the caller's own account and closes their connections.
pub async fn deactivate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_id = parse_user_id(&user_id, "userId")?;
    state
        .realtime
        .directory
        .deactivate(auth.user_id(), user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn with_presence(state: &AppState, user: User) -> UserView {
    let presence = state.realtime.presence.query_status(user.id);
    UserView::new(user, &presence)
}

/// GET /api/users/{user_id}/status
///
/// Live presence when this process has seen the user, otherwise the
/// durable mirror.
pub async fn status(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<UserStatusResponse>, ApiError> {
    let user_id = parse_user_id(&user_id, "userId")?;
    let engine = &state.realtime;

    let record = engine.pipeline.find_user(user_id).await?;
    let live = engine.presence.get(user_id);
    if record.is_none() && live.is_none() {
        return Err(AppError::not_found("User not found").into());
    }

    let snapshot = engine.connections.resolve_status(user_id).await;
    let last_seen_text = if snapshot.is_online {
        "Online".to_string()
    } else {
        format_last_seen(Utc::now(), snapshot.last_seen)
    };

    Ok(Json(UserStatusResponse {
        user_id,
        is_online: snapshot.is_online,
        last_seen: snapshot.last_seen,
        last_seen_text,
        display_name: record.map(|u| u.label().to_string()),
    }))
}
