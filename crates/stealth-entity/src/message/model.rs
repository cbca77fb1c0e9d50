//! Message entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stealth_core::types::{MessageId, UserId};

use super::kind::{MediaKind, MessageType};

/// A retrievable media reference attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Durable URL the media can be fetched from.
    pub url: String,
    /// Original file name shown to the recipient.
    pub file_name: Option<String>,
    /// Declared media kind.
    pub media_kind: MediaKind,
}

/// Message payload. Text and media messages share the envelope in
/// [`Message`] but carry different content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessageContent {
    /// A plain text message.
    Text {
        /// Message text.
        body: String,
    },
    /// A message carrying an attachment, optionally captioned.
    Media {
        /// Declared message type (never `text`).
        message_type: MessageType,
        /// The attachment reference.
        attachment: Attachment,
        /// Optional caption.
        caption: Option<String>,
    },
}

impl MessageContent {
    /// The declared message type.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Text { .. } => MessageType::Text,
            Self::Media { message_type, .. } => *message_type,
        }
    }

    /// Text shown for the message: the body, or the caption of a media message.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Text { body } => Some(body),
            Self::Media { caption, .. } => caption.as_deref(),
        }
    }

    /// The attachment, if this is a media message.
    pub fn attachment(&self) -> Option<&Attachment> {
        match self {
            Self::Text { .. } => None,
            Self::Media { attachment, .. } => Some(attachment),
        }
    }
}

/// A persisted chat message.
///
/// Immutable except for the `delivered` and `read` flags, and
/// `read == true` always implies `delivered == true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier assigned by the store.
    pub id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Addressee.
    pub recipient_id: UserId,
    /// Conversation channel derived from the two participants.
    pub channel_id: String,
    /// Payload.
    pub content: MessageContent,
    /// When the store accepted the message.
    pub created_at: DateTime<Utc>,
    /// Recipient's client has received the message.
    pub delivered: bool,
    /// Recipient has viewed the message.
    pub read: bool,
}

/// A validated message ready to be written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    /// Author.
    pub sender_id: UserId,
    /// Addressee.
    pub recipient_id: UserId,
    /// Conversation channel.
    pub channel_id: String,
    /// Payload.
    pub content: MessageContent,
}

impl NewMessage {
    /// Materialize the stored form with fresh receipt flags.
    pub fn into_message(self, id: MessageId, created_at: DateTime<Utc>) -> Message {
        Message {
            id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            channel_id: self.channel_id,
            content: self.content,
            created_at,
            delivered: false,
            read: false,
        }
    }
}
