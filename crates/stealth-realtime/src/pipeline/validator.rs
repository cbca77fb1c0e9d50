//! Send validation.
//!
//! Turns a raw `send-message` payload into a typed message or a
//! validation error. Nothing is written until this succeeds.

use stealth_core::error::AppError;
use stealth_core::result::AppResult;
use stealth_core::types::{MessageId, UserId};
use stealth_entity::message::{Attachment, MediaKind, MessageContent, MessageType};

use crate::message::types::SendMessagePayload;

/// A send request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSend {
    /// Author.
    pub sender_id: UserId,
    /// Addressee.
    pub recipient_id: UserId,
    /// Typed content.
    pub content: MessageContent,
}

/// Validate a raw send payload.
pub fn validate_send(payload: &SendMessagePayload) -> AppResult<ValidatedSend> {
    let sender_id = UserId::parse_field(&payload.sender_id, "senderId")?;
    let recipient_id = UserId::parse_field(&payload.recipient_id, "recipientId")?;
    if sender_id == recipient_id {
        return Err(AppError::validation("senderId and recipientId must differ"));
    }

    let message_type = match non_empty(&payload.message_type) {
        Some(raw) => raw.parse::<MessageType>()?,
        None => MessageType::Text,
    };
    let body = non_empty(&payload.message).map(str::to_string);
    let file_url = non_empty(&payload.file_url);

    let content = match message_type.media_kind() {
        None => {
            if file_url.is_some() {
                return Err(AppError::validation(
                    "fileUrl requires a media messageType",
                ));
            }
            let body = body.ok_or_else(|| {
                AppError::validation("message or attachment is required")
            })?;
            MessageContent::Text { body }
        }
        Some(expected_kind) => {
            let url = file_url.ok_or_else(|| {
                AppError::validation(format!("fileUrl is required for {message_type} messages"))
            })?;
            if !is_retrievable(url) {
                return Err(AppError::validation(
                    "fileUrl must be an http(s) URL or an absolute path",
                ));
            }
            if let Some(declared) = non_empty(&payload.media_kind) {
                let declared: MediaKind = declared.parse()?;
                if declared != expected_kind {
                    return Err(AppError::validation(format!(
                        "mediaKind '{declared}' does not match messageType '{message_type}'"
                    )));
                }
            }
            MessageContent::Media {
                message_type,
                attachment: Attachment {
                    url: url.to_string(),
                    file_name: non_empty(&payload.file_name).map(str::to_string),
                    media_kind: expected_kind,
                },
                caption: body,
            }
        }
    };

    Ok(ValidatedSend {
        sender_id,
        recipient_id,
        content,
    })
}

/// Parse a client-supplied message id.
pub fn parse_message_id(raw: &str) -> AppResult<MessageId> {
    if raw.trim().is_empty() {
        return Err(AppError::validation("messageId is required"));
    }
    raw.parse()
        .map_err(|_| AppError::validation("messageId is not a valid message id"))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn is_retrievable(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use stealth_core::error::ErrorKind;

    fn payload() -> SendMessagePayload {
        SendMessagePayload {
            sender_id: UserId::new().to_string(),
            recipient_id: UserId::new().to_string(),
            message: Some("hi".to_string()),
            message_type: Some("text".to_string()),
            ..Default::default()
        }
    }

    fn err(payload: SendMessagePayload) -> AppError {
        let e = validate_send(&payload).unwrap_err();
        assert_eq!(e.kind, ErrorKind::Validation);
        e
    }

    #[test]
    fn test_valid_text() {
        let validated = validate_send(&payload()).unwrap();
        assert_eq!(
            validated.content,
            MessageContent::Text {
                body: "hi".to_string()
            }
        );
    }

    #[test]
    fn test_type_defaults_to_text() {
        let mut p = payload();
        p.message_type = None;
        assert!(validate_send(&p).is_ok());
    }

    #[test]
    fn test_ids_required_and_distinct() {
        let mut p = payload();
        p.sender_id = String::new();
        assert!(err(p).message.contains("senderId is required"));

        let mut p = payload();
        p.recipient_id = "nope".to_string();
        assert!(err(p).message.contains("recipientId"));

        let mut p = payload();
        p.recipient_id = p.sender_id.clone();
        assert!(err(p).message.contains("must differ"));
    }

    #[test]
    fn test_body_or_attachment_required() {
        let mut p = payload();
        p.message = Some("   ".to_string());
        assert!(err(p).message.contains("message or attachment"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut p = payload();
        p.message_type = Some("sticker".to_string());
        err(p);
    }

    #[test]
    fn test_media_requires_retrievable_url() {
        let mut p = payload();
        p.message_type = Some("image".to_string());
        p.message = None;
        assert!(err(p.clone()).message.contains("fileUrl is required"));

        p.file_url = Some("ftp://host/file.png".to_string());
        err(p.clone());

        p.file_url = Some("https://cdn.example.com/p.png".to_string());
        p.file_name = Some("p.png".to_string());
        let validated = validate_send(&p).unwrap();
        let attachment = validated.content.attachment().unwrap();
        assert_eq!(attachment.media_kind, MediaKind::Image);
        assert_eq!(attachment.file_name.as_deref(), Some("p.png"));
    }

    #[test]
    fn test_voice_is_audio_and_kind_must_agree() {
        let mut p = payload();
        p.message_type = Some("voice".to_string());
        p.file_url = Some("/media/n.webm".to_string());
        p.media_kind = Some("audio".to_string());
        assert!(validate_send(&p).is_ok());

        p.media_kind = Some("video".to_string());
        assert!(err(p).message.contains("does not match"));
    }

    #[test]
    fn test_text_with_attachment_rejected() {
        let mut p = payload();
        p.file_url = Some("/media/x.png".to_string());
        err(p);
    }

    #[test]
    fn test_parse_message_id() {
        assert!(parse_message_id("").is_err());
        assert!(parse_message_id("xyz").is_err());
        let id = MessageId::new();
        assert_eq!(parse_message_id(&id.to_string()).unwrap(), id);
    }
}
