//! Media upload handler.

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use bytes::Bytes;
use tracing::info;

use stealth_core::error::AppError;
use stealth_media::{MediaUpload, StoredMedia};

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/media: multipart upload, `file` field.
///
/// Returns the URL to reference in a media `send-message`.
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredMedia>), ApiError> {
    let mut upload: Option<MediaUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(String::from);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data: Bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Read error: {e}")))?;
        upload = Some(MediaUpload {
            file_name,
            content_type,
            data,
        });
    }

    let upload = upload.ok_or_else(|| AppError::validation("file is required"))?;
    let stored = state.media.store(upload).await?;

    info!(
        user_id = %auth.user_id(),
        media_kind = %stored.media_kind,
        size = stored.size,
        "Media uploaded"
    );

    Ok((StatusCode::CREATED, Json(stored)))
}
