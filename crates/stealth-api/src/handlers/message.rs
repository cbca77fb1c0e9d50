//! Message history and HTTP send handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use stealth_realtime::message::view::MessageView;

use crate::dto::request::SendMessageRequest;
use crate::dto::response::HistoryResponse;
use crate::error::ApiError;
use crate::extractors::path::parse_user_id;
use crate::extractors::{AuthUser, HistoryParams};
use crate::state::AppState;

/// GET /api/messages/{other_user_id}?limit&offset
///
/// Fetching marks the caller's unread messages in the conversation as
/// read; the other participant is notified over the gateway.
pub async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(other_user_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let other = parse_user_id(&other_user_id, "otherUserId")?;
    let page = state
        .realtime
        .pipeline
        .fetch_history(auth.user_id(), other, params.into_page())
        .await?;

    Ok(Json(HistoryResponse {
        messages: page.messages.into_iter().map(MessageView::from).collect(),
        has_more: page.has_more,
    }))
}

/// POST /api/messages
pub async fn send(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageView>), ApiError> {
    request.check()?;
    let saved = state
        .realtime
        .pipeline
        .send(&request.into_payload(auth.user_id()))
        .await?;

    Ok((StatusCode::CREATED, Json(MessageView::from(saved))))
}
