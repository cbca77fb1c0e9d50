//! Inbound and outbound gateway event definitions.
//!
//! Frames are JSON text of the form `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};

use stealth_core::types::{MessageId, UserId};
use stealth_entity::presence::PresenceSnapshot;

use super::view::MessageView;

/// A user reference as sent by clients: either a bare id string or
/// `{"userId": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    /// Bare id.
    Id(String),
    /// Wrapped id.
    Object {
        /// The id.
        #[serde(rename = "userId")]
        user_id: String,
    },
}

impl UserRef {
    /// The raw id string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Object { user_id } => user_id,
        }
    }
}

/// Payload of `send-message`, also accepted by the HTTP send endpoint.
///
/// Fields are kept raw so the pipeline can report precise validation
/// errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    /// Author identity.
    #[serde(default)]
    pub sender_id: String,
    /// Addressee identity.
    #[serde(default)]
    pub recipient_id: String,
    /// Text body or caption.
    #[serde(default)]
    pub message: Option<String>,
    /// Declared type. Defaults to `text`.
    #[serde(default)]
    pub message_type: Option<String>,
    /// Attachment URL.
    #[serde(default)]
    pub file_url: Option<String>,
    /// Attachment file name.
    #[serde(default)]
    pub file_name: Option<String>,
    /// Declared attachment kind. Must agree with `message_type` when given.
    #[serde(default)]
    pub media_kind: Option<String>,
}

/// Payload of `typing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    /// Whom the typing indicator is for.
    pub recipient_id: String,
    /// Started or stopped typing.
    pub is_typing: bool,
}

/// Payload of `message-delivered` and `message-read` acknowledgements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckPayload {
    /// Acknowledged message.
    pub message_id: String,
    /// Acknowledging user. Must be the connection's identity.
    pub user_id: String,
}

/// Payload of `join-conversation` and `leave-conversation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPayload {
    /// The other participant.
    pub other_user_id: String,
}

/// Events sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum InboundEvent {
    /// Announce the connection's identity.
    JoinRoom(UserRef),
    /// Send a chat message.
    SendMessage(SendMessagePayload),
    /// Typing indicator.
    Typing(TypingPayload),
    /// Delivery acknowledgement.
    MessageDelivered(AckPayload),
    /// Read acknowledgement.
    MessageRead(AckPayload),
    /// Ask for a user's presence.
    CheckUserStatus(UserRef),
    /// Ask for everyone currently online.
    GetOnlineUsers,
    /// Join a pairwise conversation channel.
    JoinConversation(ConversationPayload),
    /// Leave a pairwise conversation channel.
    LeaveConversation(ConversationPayload),
}

impl InboundEvent {
    /// Wire name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => "join-room",
            Self::SendMessage(_) => "send-message",
            Self::Typing(_) => "typing",
            Self::MessageDelivered(_) => "message-delivered",
            Self::MessageRead(_) => "message-read",
            Self::CheckUserStatus(_) => "check-user-status",
            Self::GetOnlineUsers => "get-online-users",
            Self::JoinConversation(_) => "join-conversation",
            Self::LeaveConversation(_) => "leave-conversation",
        }
    }
}

/// Failure of a `send-message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageErrorPayload {
    /// Human-readable reason.
    pub error: String,
    /// Machine-readable code.
    pub code: String,
}

/// Failure of any other event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable reason.
    pub message: String,
}

/// Payload of `user-typing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTypingPayload {
    /// Who is typing.
    pub user_id: UserId,
    /// Started or stopped.
    pub is_typing: bool,
}

/// Payload of receipt notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptPayload {
    /// Message whose receipt changed.
    pub message_id: MessageId,
}

/// Payload of conversation membership confirmations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPayload {
    /// Channel joined or left.
    pub channel_id: String,
}

/// Events sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum OutboundEvent {
    /// A message addressed to this user.
    NewMessage(MessageView),
    /// Echo of a message this user sent.
    MessageSent(MessageView),
    /// A send failed.
    MessageError(MessageErrorPayload),
    /// The other participant's typing state.
    UserTyping(UserTypingPayload),
    /// A user came online.
    UserOnline(PresenceSnapshot),
    /// A user went offline.
    UserOffline(PresenceSnapshot),
    /// A sent message reached its recipient.
    MessageDelivered(ReceiptPayload),
    /// A sent message was read.
    MessageRead(ReceiptPayload),
    /// Answer to `check-user-status`.
    UserStatusResponse(PresenceSnapshot),
    /// Answer to `get-online-users`.
    OnlineUsers(Vec<PresenceSnapshot>),
    /// Conversation channel joined.
    ConversationJoined(ChannelPayload),
    /// Conversation channel left.
    ConversationLeft(ChannelPayload),
    /// Any other per-event failure.
    Error(ErrorPayload),
}

impl OutboundEvent {
    /// Build an `error` event.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            code: code.into(),
            message: message.into(),
        })
    }

    /// Build a `message-error` event.
    pub fn message_error(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self::MessageError(MessageErrorPayload {
            error: error.into(),
            code: code.into(),
        })
    }
}
