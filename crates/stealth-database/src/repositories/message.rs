//! Message repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use stealth_core::error::{AppError, ErrorKind};
use stealth_core::result::AppResult;
use stealth_core::types::{MessageId, UserId};
use stealth_entity::message::{
    Attachment, MediaKind, Message, MessageContent, MessageType, NewMessage, ReceiptPatch,
};

use crate::store::{MessageQuery, MessageStore, ReceiptUpdate};

/// Flat row shape of the `messages` table.
#[derive(Debug, Clone, FromRow)]
struct MessageRow {
    id: MessageId,
    sender_id: UserId,
    recipient_id: UserId,
    channel_id: String,
    message_type: String,
    body: Option<String>,
    file_url: Option<String>,
    file_name: Option<String>,
    media_kind: Option<String>,
    created_at: DateTime<Utc>,
    delivered: bool,
    read: bool,
}

impl TryFrom<MessageRow> for Message {
    type Error = AppError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let message_type: MessageType = row.message_type.parse().map_err(|e: AppError| {
            AppError::internal(format!("Corrupt message row {}: {}", row.id, e.message))
        })?;

        let content = match (message_type, row.file_url) {
            (MessageType::Text, _) => MessageContent::Text {
                body: row.body.unwrap_or_default(),
            },
            (message_type, Some(url)) => {
                let media_kind = match row.media_kind.as_deref() {
                    Some(kind) => kind.parse::<MediaKind>()?,
                    None => message_type.media_kind().ok_or_else(|| {
                        AppError::internal(format!("Message {} lacks a media kind", row.id))
                    })?,
                };
                MessageContent::Media {
                    message_type,
                    attachment: Attachment {
                        url,
                        file_name: row.file_name,
                        media_kind,
                    },
                    caption: row.body,
                }
            }
            (_, None) => {
                return Err(AppError::internal(format!(
                    "Media message {} has no file url",
                    row.id
                )));
            }
        };

        Ok(Message {
            id: row.id,
            sender_id: row.sender_id,
            recipient_id: row.recipient_id,
            channel_id: row.channel_id,
            content,
            created_at: row.created_at,
            delivered: row.delivered,
            read: row.read,
        })
    }
}

/// Repository for the message log.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::StoreUnavailable, message, e)
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn insert_message(&self, message: NewMessage) -> AppResult<Message> {
        let id = MessageId::new();
        let message_type = message.content.message_type();
        let attachment = message.content.attachment();

        let row = sqlx::query_as::<_, MessageRow>(
            r#"INSERT INTO messages
                   (id, sender_id, recipient_id, channel_id, message_type,
                    body, file_url, file_name, media_kind, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING id, sender_id, recipient_id, channel_id, message_type,
                         body, file_url, file_name, media_kind, created_at, delivered, read"#,
        )
        .bind(id)
        .bind(message.sender_id)
        .bind(message.recipient_id)
        .bind(&message.channel_id)
        .bind(message_type.as_str())
        .bind(message.content.body())
        .bind(attachment.map(|a| a.url.as_str()))
        .bind(attachment.and_then(|a| a.file_name.as_deref()))
        .bind(attachment.map(|a| a.media_kind.as_str()))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Failed to insert message"))?;

        row.try_into()
    }

    async fn find_message(&self, id: MessageId) -> AppResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"SELECT id, sender_id, recipient_id, channel_id, message_type,
                      body, file_url, file_name, media_kind, created_at, delivered, read
               FROM messages WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("Failed to find message"))?;

        row.map(Message::try_from).transpose()
    }

    async fn update_receipts(
        &self,
        id: MessageId,
        patch: ReceiptPatch,
    ) -> AppResult<Option<ReceiptUpdate>> {
        // Only rows where a flag actually moves are touched, so a returned
        // row doubles as the "changed" signal.
        let updated = sqlx::query_as::<_, MessageRow>(
            r#"UPDATE messages
               SET delivered = delivered OR $2 OR $3,
                   read = read OR $3
               WHERE id = $1
                 AND ((NOT delivered AND ($2 OR $3)) OR (NOT read AND $3))
               RETURNING id, sender_id, recipient_id, channel_id, message_type,
                         body, file_url, file_name, media_kind, created_at, delivered, read"#,
        )
        .bind(id)
        .bind(patch.delivered)
        .bind(patch.read)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("Failed to update message receipts"))?;

        if let Some(row) = updated {
            return Ok(Some(ReceiptUpdate {
                message: row.try_into()?,
                changed: true,
            }));
        }

        Ok(self.find_message(id).await?.map(|message| ReceiptUpdate {
            message,
            changed: false,
        }))
    }

    async fn query_messages(&self, query: &MessageQuery) -> AppResult<Vec<Message>> {
        let order = query.sort.as_sql();
        let sql = format!(
            r#"SELECT id, sender_id, recipient_id, channel_id, message_type,
                      body, file_url, file_name, media_kind, created_at, delivered, read
               FROM messages
               WHERE channel_id = $1
               ORDER BY created_at {order}, seq {order}
               LIMIT $2 OFFSET $3"#
        );

        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(&query.channel_id)
            .bind(i64::from(query.limit))
            .bind(i64::from(query.skip))
            .fetch_all(&self.pool)
            .await
            .map_err(store_error("Failed to query messages"))?;

        rows.into_iter().map(Message::try_from).collect()
    }

    async fn mark_conversation_read(
        &self,
        channel_id: &str,
        recipient: UserId,
    ) -> AppResult<Vec<MessageId>> {
        sqlx::query_scalar::<_, MessageId>(
            r#"UPDATE messages
               SET read = TRUE, delivered = TRUE
               WHERE channel_id = $1 AND recipient_id = $2 AND read = FALSE
               RETURNING id"#,
        )
        .bind(channel_id)
        .bind(recipient)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Failed to mark conversation read"))
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(store_error("Health check failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(message_type: &str) -> MessageRow {
        MessageRow {
            id: MessageId::new(),
            sender_id: UserId::new(),
            recipient_id: UserId::new(),
            channel_id: "a_b".to_string(),
            message_type: message_type.to_string(),
            body: Some("hello".to_string()),
            file_url: None,
            file_name: None,
            media_kind: None,
            created_at: Utc::now(),
            delivered: false,
            read: false,
        }
    }

    #[test]
    fn test_text_row_converts() {
        let message = Message::try_from(row("text")).unwrap();
        assert_eq!(message.content.body(), Some("hello"));
    }

    #[test]
    fn test_voice_row_defaults_to_audio_kind() {
        let mut voice = row("voice");
        voice.body = None;
        voice.file_url = Some("/media/x.webm".to_string());
        let message = Message::try_from(voice).unwrap();
        let attachment = message.content.attachment().unwrap();
        assert_eq!(attachment.media_kind, MediaKind::Audio);
    }

    #[test]
    fn test_media_row_without_url_is_rejected() {
        assert!(Message::try_from(row("image")).is_err());
        assert!(Message::try_from(row("sticker")).is_err());
    }
}
