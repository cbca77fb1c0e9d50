//! `AuthUser` extractor: pulls the Bearer token from the Authorization
//! header and resolves it to a user id.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use stealth_core::error::AppError;
use stealth_core::types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller of an HTTP endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

impl AuthUser {
    /// The caller's id.
    pub fn user_id(&self) -> UserId {
        self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::authentication("Invalid Authorization header format"))?;

        let user_id = state.verifier.verify(token).await?;
        Ok(AuthUser(user_id))
    }
}
