//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use stealth_core::error::AppError;
use stealth_core::types::UserId;
use stealth_entity::user::NewUser;
use stealth_realtime::message::types::SendMessagePayload;

/// `POST /api/messages` body. The sender is the bearer identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Addressee.
    #[validate(length(min = 1, message = "recipientId is required"))]
    pub recipient_id: String,
    /// Text body or caption.
    #[serde(default)]
    pub message: Option<String>,
    /// Declared type. Defaults to `text`.
    #[serde(default)]
    pub message_type: Option<String>,
    /// Attachment URL from a prior upload.
    #[serde(default)]
    #[validate(length(max = 2048, message = "fileUrl is too long"))]
    pub file_url: Option<String>,
    /// Attachment file name.
    #[serde(default)]
    #[validate(length(max = 255, message = "fileName is too long"))]
    pub file_name: Option<String>,
    /// Declared attachment kind.
    #[serde(default)]
    pub media_kind: Option<String>,
}

impl SendMessageRequest {
    /// Check field constraints.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()
            .map_err(|e| AppError::validation(format!("Invalid request: {e}")))
    }

    /// The pipeline payload for a send by `sender`.
    pub fn into_payload(self, sender: UserId) -> SendMessagePayload {
        SendMessagePayload {
            sender_id: sender.to_string(),
            recipient_id: self.recipient_id,
            message: self.message,
            message_type: self.message_type,
            file_url: self.file_url,
            file_name: self.file_name,
            media_kind: self.media_kind,
        }
    }
}

/// `POST /api/users` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    /// Unique login name.
    #[validate(length(min = 3, max = 32, message = "username must be 3 to 32 characters"))]
    pub username: String,
    /// Name shown to other users.
    #[serde(default)]
    #[validate(length(max = 64, message = "displayName is too long"))]
    pub display_name: Option<String>,
    /// Avatar reference.
    #[serde(default)]
    #[validate(length(max = 2048, message = "avatarUrl is too long"))]
    pub avatar_url: Option<String>,
}

impl CreateUserRequest {
    /// Check field constraints.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()
            .map_err(|e| AppError::validation(format!("Invalid request: {e}")))
    }
}

impl From<CreateUserRequest> for NewUser {
    fn from(request: CreateUserRequest) -> Self {
        Self {
            id: None,
            username: request.username,
            display_name: request.display_name,
            avatar_url: request.avatar_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_recipient_fails_validation() {
        let request = SendMessageRequest {
            message: Some("hi".to_string()),
            ..Default::default()
        };
        assert!(request.check().is_err());
    }

    #[test]
    fn test_payload_uses_caller_as_sender() {
        let sender = UserId::new();
        let request = SendMessageRequest {
            recipient_id: UserId::new().to_string(),
            message: Some("hi".to_string()),
            ..Default::default()
        };
        assert!(request.check().is_ok());
        assert_eq!(request.into_payload(sender).sender_id, sender.to_string());
    }

    #[test]
    fn test_create_user_request_limits() {
        let request = CreateUserRequest {
            username: "al".to_string(),
            ..Default::default()
        };
        assert!(request.check().is_err());

        let request = CreateUserRequest {
            username: "alice".to_string(),
            display_name: Some("A".repeat(65)),
            ..Default::default()
        };
        assert!(request.check().is_err());

        let request = CreateUserRequest {
            username: "alice".to_string(),
            display_name: Some("Alice".to_string()),
            avatar_url: None,
        };
        assert!(request.check().is_ok());
        assert_eq!(NewUser::from(request).display_name.as_deref(), Some("Alice"));
    }
}
