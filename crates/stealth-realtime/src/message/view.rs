//! Client-facing shape of a persisted message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stealth_core::types::{MessageId, UserId};
use stealth_entity::message::{MediaKind, Message, MessageType};

/// A saved message as pushed over the gateway and returned by history.
///
/// Flattens the tagged content into the optional file fields clients
/// expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    /// Message ID.
    pub id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Addressee.
    pub recipient_id: UserId,
    /// Conversation channel.
    pub channel_id: String,
    /// Text body, or the caption of a media message.
    pub message: String,
    /// Declared type.
    pub message_type: MessageType,
    /// Attachment URL.
    pub file_url: Option<String>,
    /// Attachment file name.
    pub file_name: Option<String>,
    /// Attachment media kind.
    pub media_kind: Option<MediaKind>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Delivery receipt.
    pub delivered: bool,
    /// Read receipt.
    pub read: bool,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        let attachment = message.content.attachment();
        Self {
            id: message.id,
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            channel_id: message.channel_id.clone(),
            message: message.content.body().unwrap_or_default().to_string(),
            message_type: message.content.message_type(),
            file_url: attachment.map(|a| a.url.clone()),
            file_name: attachment.and_then(|a| a.file_name.clone()),
            media_kind: attachment.map(|a| a.media_kind),
            created_at: message.created_at,
            delivered: message.delivered,
            read: message.read,
        }
    }
}

impl From<Message> for MessageView {
    fn from(message: Message) -> Self {
        Self::from(&message)
    }
}
