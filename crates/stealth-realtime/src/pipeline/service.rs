//! Message pipeline service.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use stealth_core::error::AppError;
use stealth_core::result::AppResult;
use stealth_core::types::{HistoryPage, MessageId, UserId};
use stealth_database::store::{MessageQuery, MessageStore, UserDirectory};
use stealth_entity::message::{Message, NewMessage, ReceiptPatch};

use crate::channel::router::RoomRouter;
use crate::channel::types::ChannelId;
use crate::message::types::{OutboundEvent, ReceiptPayload, SendMessagePayload};
use crate::message::view::MessageView;
use crate::metrics::EngineMetrics;

use super::validator::validate_send;

/// One page of conversation history, oldest first.
#[derive(Debug, Clone)]
pub struct HistoryResult {
    /// Messages in creation order, with read flags as they are after the
    /// fetch.
    pub messages: Vec<Message>,
    /// Whether older messages exist beyond this page.
    pub has_more: bool,
}

/// Validates, persists, and delivers messages; advances receipts.
///
/// Reads channel membership only through the [`RoomRouter`].
#[derive(Debug, Clone)]
pub struct MessagePipeline {
    messages: Arc<dyn MessageStore>,
    users: Arc<dyn UserDirectory>,
    router: Arc<RoomRouter>,
    metrics: Arc<EngineMetrics>,
}

impl MessagePipeline {
    /// Create a pipeline.
    pub fn new(
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserDirectory>,
        router: Arc<RoomRouter>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            messages,
            users,
            router,
            metrics,
        }
    }

    /// Validate and persist a message, then deliver it as `new-message` to
    /// the recipient and `message-sent` to every connection of the sender.
    ///
    /// Validation and store failures are returned to the caller and nothing
    /// is broadcast. An absent recipient connection is not a failure.
    pub async fn send(&self, payload: &SendMessagePayload) -> AppResult<Message> {
        let validated = validate_send(payload)?;

        if self.users.find_user(validated.recipient_id).await?.is_none() {
            return Err(AppError::not_found("Recipient not found"));
        }

        let channel = ChannelId::conversation(validated.sender_id, validated.recipient_id);
        let saved = self
            .messages
            .insert_message(NewMessage {
                sender_id: validated.sender_id,
                recipient_id: validated.recipient_id,
                channel_id: channel.into_string(),
                content: validated.content,
            })
            .await?;
        self.metrics.message_persisted();

        let view = MessageView::from(&saved);
        let reached = self.router.broadcast(
            &ChannelId::identity(saved.recipient_id),
            &OutboundEvent::NewMessage(view.clone()),
            None,
        );
        self.router.broadcast(
            &ChannelId::identity(saved.sender_id),
            &OutboundEvent::MessageSent(view),
            None,
        );

        info!(
            message_id = %saved.id,
            sender_id = %saved.sender_id,
            recipient_id = %saved.recipient_id,
            message_type = %saved.content.message_type(),
            recipient_connections = reached,
            "Message sent"
        );
        Ok(saved)
    }

    /// The recipient's client received a message.
    pub async fn mark_delivered(&self, message_id: MessageId, acking_user: UserId) -> AppResult<Message> {
        self.acknowledge(message_id, acking_user, ReceiptPatch::delivered())
            .await
    }

    /// The recipient viewed a message. Also sets delivered.
    pub async fn mark_read(&self, message_id: MessageId, acking_user: UserId) -> AppResult<Message> {
        self.acknowledge(message_id, acking_user, ReceiptPatch::read())
            .await
    }

    async fn acknowledge(
        &self,
        message_id: MessageId,
        acking_user: UserId,
        patch: ReceiptPatch,
    ) -> AppResult<Message> {
        let message = self
            .messages
            .find_message(message_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Message {message_id} not found")))?;

        if message.recipient_id != acking_user {
            return Err(AppError::authorization(
                "Only the recipient can acknowledge a message",
            ));
        }

        let update = self
            .messages
            .update_receipts(message_id, patch)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Message {message_id} not found")))?;

        if update.changed {
            let receipt = ReceiptPayload { message_id };
            let event = if patch.read {
                OutboundEvent::MessageRead(receipt)
            } else {
                OutboundEvent::MessageDelivered(receipt)
            };
            self.router
                .broadcast(&ChannelId::identity(update.message.sender_id), &event, None);
            debug!(message_id = %message_id, read = patch.read, "Receipt advanced");
        }

        Ok(update.message)
    }

    /// Fetch a page of the conversation between `requester` and `other`.
    ///
    /// Every fetch counts as having seen the conversation: all unread
    /// messages addressed to `requester` are marked read and `other` is
    /// notified with `message-read` for each.
    pub async fn fetch_history(
        &self,
        requester: UserId,
        other: UserId,
        page: HistoryPage,
    ) -> AppResult<HistoryResult> {
        if requester == other {
            return Err(AppError::validation("Cannot fetch a conversation with yourself"));
        }

        let channel = ChannelId::conversation(requester, other);
        let mut messages = self
            .messages
            .query_messages(&MessageQuery::newest_first(
                channel.as_str(),
                page.limit.saturating_add(1),
                page.offset,
            ))
            .await?;

        let has_more = messages.len() > page.limit as usize;
        messages.truncate(page.limit as usize);
        messages.reverse();

        let newly_read = self
            .messages
            .mark_conversation_read(channel.as_str(), requester)
            .await?;

        if !newly_read.is_empty() {
            let newly_read_set: HashSet<MessageId> = newly_read.iter().copied().collect();
            for message in messages
                .iter_mut()
                .filter(|m| newly_read_set.contains(&m.id))
            {
                message.read = true;
                message.delivered = true;
            }

            let sender_channel = ChannelId::identity(other);
            for message_id in &newly_read {
                self.router.broadcast(
                    &sender_channel,
                    &OutboundEvent::MessageRead(ReceiptPayload {
                        message_id: *message_id,
                    }),
                    None,
                );
            }
        }

        debug!(
            requester = %requester,
            other = %other,
            returned = messages.len(),
            marked_read = newly_read.len(),
            "History fetched"
        );

        Ok(HistoryResult { messages, has_more })
    }

    /// Write the durable presence mirror. Failures are logged, never
    /// surfaced: the mirror is best-effort.
    pub async fn mirror_presence(
        &self,
        user: UserId,
        is_online: bool,
        last_seen: chrono::DateTime<chrono::Utc>,
    ) {
        if let Err(e) = self
            .users
            .upsert_presence_mirror(user, is_online, last_seen)
            .await
        {
            warn!(user_id = %user, error = %e, "Presence mirror write failed");
        }
    }

    /// Whether the message store answers queries.
    pub async fn store_healthy(&self) -> bool {
        match self.messages.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(error = %e, "Message store health check failed");
                false
            }
        }
    }

    /// Durable record of a user, for status fallback.
    pub async fn find_user(&self, user: UserId) -> AppResult<Option<stealth_entity::user::User>> {
        self.users.find_user(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::handle::{ConnectionHandle, ConnectionId};
    use crate::connection::pool::ConnectionPool;
    use stealth_core::error::ErrorKind;
    use stealth_database::MemoryStore;
    use stealth_entity::user::NewUser;
    use tokio::sync::mpsc;

    struct Fixture {
        pipeline: MessagePipeline,
        router: Arc<RoomRouter>,
        pool: Arc<ConnectionPool>,
        store: MemoryStore,
    }

    impl Fixture {
        fn new() -> Self {
            let store = MemoryStore::new();
            let pool = Arc::new(ConnectionPool::new());
            let metrics = Arc::new(EngineMetrics::new());
            let router = Arc::new(RoomRouter::new(pool.clone(), metrics.clone(), 10));
            let pipeline = MessagePipeline::new(
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                router.clone(),
                metrics,
            );
            Self {
                pipeline,
                router,
                pool,
                store,
            }
        }

        async fn user(&self, name: &str) -> UserId {
            self.store.create_user(NewUser::named(name)).await.unwrap().id
        }

        fn connect(&self, user: UserId) -> (ConnectionId, mpsc::Receiver<String>) {
            let (tx, rx) = mpsc::channel(32);
            let handle = Arc::new(ConnectionHandle::new(None, tx));
            let id = handle.id;
            self.pool.add(handle);
            self.router.join_identity(id, user);
            (id, rx)
        }
    }

    fn text(from: UserId, to: UserId, body: &str) -> SendMessagePayload {
        SendMessagePayload {
            sender_id: from.to_string(),
            recipient_id: to.to_string(),
            message: Some(body.to_string()),
            message_type: Some("text".to_string()),
            ..Default::default()
        }
    }

    fn events(rx: &mut mpsc::Receiver<String>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(serde_json::from_str(&frame).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_send_fans_out_to_both_identities() {
        let fx = Fixture::new();
        let (a, b) = (fx.user("a").await, fx.user("b").await);
        let (_ca, mut rx_a) = fx.connect(a);
        let (_cb, mut rx_b) = fx.connect(b);

        let saved = fx.pipeline.send(&text(a, b, "hi")).await.unwrap();
        assert!(!saved.delivered && !saved.read);

        let to_b = events(&mut rx_b);
        assert_eq!(to_b.len(), 1);
        assert_eq!(to_b[0]["event"], "new-message");
        assert_eq!(to_b[0]["data"]["id"], saved.id.to_string());

        let to_a = events(&mut rx_a);
        assert_eq!(to_a[0]["event"], "message-sent");
        assert_eq!(to_a[0]["data"]["id"], saved.id.to_string());
    }

    #[tokio::test]
    async fn test_send_to_unknown_recipient_writes_nothing() {
        let fx = Fixture::new();
        let a = fx.user("a").await;
        let (_ca, mut rx_a) = fx.connect(a);

        let err = fx
            .pipeline
            .send(&text(a, UserId::new(), "hello?"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(fx.store.message_count().await, 0);
        assert!(events(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_send_writes_nothing() {
        let fx = Fixture::new();
        let (a, b) = (fx.user("a").await, fx.user("b").await);
        let err = fx.pipeline.send(&text(a, b, "  ")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(fx.store.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_delivered_is_idempotent_and_notifies_once() {
        let fx = Fixture::new();
        let (a, b) = (fx.user("a").await, fx.user("b").await);
        let saved = fx.pipeline.send(&text(a, b, "hi")).await.unwrap();
        let (_ca, mut rx_a) = fx.connect(a);

        let first = fx.pipeline.mark_delivered(saved.id, b).await.unwrap();
        assert!(first.delivered && !first.read);
        let second = fx.pipeline.mark_delivered(saved.id, b).await.unwrap();
        assert!(second.delivered);

        let to_a = events(&mut rx_a);
        assert_eq!(to_a.len(), 1);
        assert_eq!(to_a[0]["event"], "message-delivered");
        assert_eq!(to_a[0]["data"]["messageId"], saved.id.to_string());
    }

    #[tokio::test]
    async fn test_read_sets_delivered_and_never_reverts() {
        let fx = Fixture::new();
        let (a, b) = (fx.user("a").await, fx.user("b").await);
        let saved = fx.pipeline.send(&text(a, b, "hi")).await.unwrap();

        let read = fx.pipeline.mark_read(saved.id, b).await.unwrap();
        assert!(read.read && read.delivered);

        let after = fx.pipeline.mark_delivered(saved.id, b).await.unwrap();
        assert!(after.read && after.delivered);
    }

    #[tokio::test]
    async fn test_only_recipient_may_acknowledge() {
        let fx = Fixture::new();
        let (a, b) = (fx.user("a").await, fx.user("b").await);
        let saved = fx.pipeline.send(&text(a, b, "hi")).await.unwrap();

        let err = fx.pipeline.mark_read(saved.id, a).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        let err = fx
            .pipeline
            .mark_delivered(MessageId::new(), b)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_history_round_trip_marks_read() {
        let fx = Fixture::new();
        let (a, b) = (fx.user("a").await, fx.user("b").await);
        let mut sent = Vec::new();
        for i in 0..5 {
            sent.push(fx.pipeline.send(&text(a, b, &format!("m{i}"))).await.unwrap().id);
        }
        let (_ca, mut rx_a) = fx.connect(a);

        let page = fx
            .pipeline
            .fetch_history(b, a, HistoryPage::new(Some(10), None))
            .await
            .unwrap();
        let ids: Vec<_> = page.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, sent);
        assert!(!page.has_more);
        assert!(page.messages.iter().all(|m| m.read && m.delivered));

        let receipts = events(&mut rx_a);
        assert_eq!(receipts.len(), 5);
        assert!(receipts.iter().all(|e| e["event"] == "message-read"));

        // A second fetch finds nothing new to mark.
        fx.pipeline
            .fetch_history(b, a, HistoryPage::default())
            .await
            .unwrap();
        assert!(events(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn test_history_by_sender_does_not_mark_read() {
        let fx = Fixture::new();
        let (a, b) = (fx.user("a").await, fx.user("b").await);
        fx.pipeline.send(&text(a, b, "hi")).await.unwrap();

        let page = fx
            .pipeline
            .fetch_history(a, b, HistoryPage::default())
            .await
            .unwrap();
        assert!(!page.messages[0].read);
    }

    #[tokio::test]
    async fn test_history_paging() {
        let fx = Fixture::new();
        let (a, b) = (fx.user("a").await, fx.user("b").await);
        for i in 0..5 {
            fx.pipeline.send(&text(a, b, &format!("m{i}"))).await.unwrap();
        }

        let page = fx
            .pipeline
            .fetch_history(a, b, HistoryPage::new(Some(2), Some(1)))
            .await
            .unwrap();
        let bodies: Vec<_> = page
            .messages
            .iter()
            .filter_map(|m| m.content.body())
            .collect();
        assert_eq!(bodies, vec!["m2", "m3"]);
        assert!(page.has_more);
    }
}
