//! The persistence store contract.
//!
//! The realtime core only talks to storage through these two traits, so
//! the PostgreSQL adapter and the in-memory adapter are interchangeable.

use chrono::{DateTime, Utc};
use async_trait::async_trait;

use stealth_core::result::AppResult;
use stealth_core::types::{MessageId, UserId};
use stealth_entity::message::{Message, NewMessage, ReceiptPatch};
use stealth_entity::user::{NewUser, User};

/// Sort direction over a channel's creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

impl SortOrder {
    /// SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filter over the message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageQuery {
    /// Conversation channel to read.
    pub channel_id: String,
    /// Direction over `(created_at, insertion order)`.
    pub sort: SortOrder,
    /// Maximum rows to return.
    pub limit: u32,
    /// Rows to skip from the start of the sorted sequence.
    pub skip: u32,
}

impl MessageQuery {
    /// Newest-first window over a channel.
    pub fn newest_first(channel_id: impl Into<String>, limit: u32, skip: u32) -> Self {
        Self {
            channel_id: channel_id.into(),
            sort: SortOrder::Desc,
            limit,
            skip,
        }
    }
}

/// Outcome of a receipt update on an existing message.
#[derive(Debug, Clone)]
pub struct ReceiptUpdate {
    /// The message after the update.
    pub message: Message,
    /// Whether any flag actually moved.
    pub changed: bool,
}

/// Durable, append-only message log.
#[async_trait]
pub trait MessageStore: Send + Sync + std::fmt::Debug + 'static {
    /// Append a message. The store assigns the id and creation time.
    async fn insert_message(&self, message: NewMessage) -> AppResult<Message>;

    /// Look up one message.
    async fn find_message(&self, id: MessageId) -> AppResult<Option<Message>>;

    /// Apply a monotonic receipt patch. Returns `None` if the message does
    /// not exist.
    async fn update_receipts(
        &self,
        id: MessageId,
        patch: ReceiptPatch,
    ) -> AppResult<Option<ReceiptUpdate>>;

    /// Read a window of a channel's messages.
    async fn query_messages(&self, query: &MessageQuery) -> AppResult<Vec<Message>>;

    /// Mark every unread message in `channel_id` addressed to `recipient`
    /// as read (and delivered). Returns the ids that changed.
    async fn mark_conversation_read(
        &self,
        channel_id: &str,
        recipient: UserId,
    ) -> AppResult<Vec<MessageId>>;

    /// Whether the store currently accepts queries.
    async fn health_check(&self) -> AppResult<bool>;
}

/// User records and the durable presence mirror.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Find an active user. Soft-deleted users are reported as absent.
    async fn find_user(&self, id: UserId) -> AppResult<Option<User>>;

    /// Find an active user by exact username.
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Active users whose username or display name contains `query`,
    /// ignoring case, ordered by username. An empty query lists everyone.
    async fn search_users(&self, query: &str, limit: u32) -> AppResult<Vec<User>>;

    /// Create a user record. Usernames are unique.
    async fn create_user(&self, user: NewUser) -> AppResult<User>;

    /// Soft-delete a user. Returns whether an active user was deactivated.
    async fn deactivate_user(&self, id: UserId) -> AppResult<bool>;

    /// Write the best-effort presence mirror for a user. A no-op for
    /// users that do not exist.
    async fn upsert_presence_mirror(
        &self,
        id: UserId,
        is_online: bool,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()>;
}
