//! In-memory store adapter.
//!
//! Same semantics as the PostgreSQL repositories, kept in process memory.
//! Everything is lost on restart. Used for tests and local runs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::debug;

use stealth_core::error::AppError;
use stealth_core::result::AppResult;
use stealth_core::types::{MessageId, UserId};
use stealth_entity::message::{Message, NewMessage, ReceiptPatch};
use stealth_entity::user::{NewUser, User};

use crate::store::{MessageQuery, MessageStore, ReceiptUpdate, SortOrder, UserDirectory};

/// Process-local message log and user directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Messages in insertion order.
    messages: Arc<RwLock<Vec<Message>>>,
    /// Users by identity.
    users: Arc<DashMap<UserId, User>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages.
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert_message(&self, message: NewMessage) -> AppResult<Message> {
        let mut messages = self.messages.write().await;
        let stored = message.into_message(MessageId::new(), Utc::now());
        messages.push(stored.clone());
        debug!(message_id = %stored.id, total = messages.len(), "Stored message in memory");
        Ok(stored)
    }

    async fn find_message(&self, id: MessageId) -> AppResult<Option<Message>> {
        let messages = self.messages.read().await;
        Ok(messages.iter().find(|m| m.id == id).cloned())
    }

    async fn update_receipts(
        &self,
        id: MessageId,
        patch: ReceiptPatch,
    ) -> AppResult<Option<ReceiptUpdate>> {
        let mut messages = self.messages.write().await;
        let Some(message) = messages.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };

        let (delivered, read, changed) = patch.apply(message.delivered, message.read);
        message.delivered = delivered;
        message.read = read;

        Ok(Some(ReceiptUpdate {
            message: message.clone(),
            changed,
        }))
    }

    async fn query_messages(&self, query: &MessageQuery) -> AppResult<Vec<Message>> {
        let messages = self.messages.read().await;

        // Insertion order breaks creation-time ties.
        let mut matching: Vec<(usize, &Message)> = messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.channel_id == query.channel_id)
            .collect();
        matching.sort_by_key(|(seq, m)| (m.created_at, *seq));
        if query.sort == SortOrder::Desc {
            matching.reverse();
        }

        Ok(matching
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .map(|(_, m)| m.clone())
            .collect())
    }

    async fn mark_conversation_read(
        &self,
        channel_id: &str,
        recipient: UserId,
    ) -> AppResult<Vec<MessageId>> {
        let mut messages = self.messages.write().await;
        let mut changed = Vec::new();
        for message in messages
            .iter_mut()
            .filter(|m| m.channel_id == channel_id && m.recipient_id == recipient && !m.read)
        {
            message.read = true;
            message.delivered = true;
            changed.push(message.id);
        }
        Ok(changed)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self
            .users
            .get(&id)
            .filter(|u| u.is_active)
            .map(|u| u.value().clone()))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.is_active && u.username == username)
            .map(|u| u.value().clone()))
    }

    async fn search_users(&self, query: &str, limit: u32) -> AppResult<Vec<User>> {
        let needle = query.trim().to_lowercase();
        let mut found: Vec<User> = self
            .users
            .iter()
            .filter(|u| u.is_active)
            .filter(|u| {
                u.username.to_lowercase().contains(&needle)
                    || u
                        .display_name
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .map(|u| u.value().clone())
            .collect();
        found.sort_by(|a, b| a.username.cmp(&b.username));
        found.truncate(limit as usize);
        Ok(found)
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        if self.users.iter().any(|u| u.username == user.username) {
            return Err(AppError::conflict(format!(
                "Username '{}' is already taken",
                user.username
            )));
        }

        let record = User {
            id: user.id.unwrap_or_default(),
            username: user.username,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            is_active: true,
            is_online: false,
            last_seen: None,
            created_at: Utc::now(),
        };
        self.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn deactivate_user(&self, id: UserId) -> AppResult<bool> {
        Ok(match self.users.get_mut(&id) {
            Some(mut user) if user.is_active => {
                user.is_active = false;
                user.is_online = false;
                true
            }
            _ => false,
        })
    }

    async fn upsert_presence_mirror(
        &self,
        id: UserId,
        is_online: bool,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()> {
        if let Some(mut user) = self.users.get_mut(&id) {
            user.is_online = is_online;
            user.last_seen = Some(last_seen);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stealth_entity::message::MessageContent;

    fn text(sender: UserId, recipient: UserId, channel: &str, body: &str) -> NewMessage {
        NewMessage {
            sender_id: sender,
            recipient_id: recipient,
            channel_id: channel.to_string(),
            content: MessageContent::Text {
                body: body.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_fresh_flags() {
        let store = MemoryStore::new();
        let (a, b) = (UserId::new(), UserId::new());
        let saved = store.insert_message(text(a, b, "c", "hi")).await.unwrap();
        assert!(!saved.delivered && !saved.read);
        let found = store.find_message(saved.id).await.unwrap().unwrap();
        assert_eq!(found, saved);
    }

    #[tokio::test]
    async fn test_query_orders_and_windows() {
        let store = MemoryStore::new();
        let (a, b) = (UserId::new(), UserId::new());
        for i in 0..5 {
            store
                .insert_message(text(a, b, "ab", &format!("m{i}")))
                .await
                .unwrap();
        }
        store.insert_message(text(a, b, "other", "x")).await.unwrap();

        let newest = store
            .query_messages(&MessageQuery::newest_first("ab", 2, 1))
            .await
            .unwrap();
        let bodies: Vec<_> = newest.iter().filter_map(|m| m.content.body()).collect();
        assert_eq!(bodies, vec!["m3", "m2"]);
    }

    #[tokio::test]
    async fn test_receipts_are_monotonic() {
        let store = MemoryStore::new();
        let saved = store
            .insert_message(text(UserId::new(), UserId::new(), "c", "x"))
            .await
            .unwrap();

        let first = store
            .update_receipts(saved.id, ReceiptPatch::read())
            .await
            .unwrap()
            .unwrap();
        assert!(first.changed);
        assert!(first.message.read && first.message.delivered);

        let again = store
            .update_receipts(saved.id, ReceiptPatch::delivered())
            .await
            .unwrap()
            .unwrap();
        assert!(!again.changed);
        assert!(again.message.read);

        assert!(store
            .update_receipts(MessageId::new(), ReceiptPatch::read())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_mark_conversation_read_only_touches_recipient() {
        let store = MemoryStore::new();
        let (a, b) = (UserId::new(), UserId::new());
        let to_b = store.insert_message(text(a, b, "ab", "1")).await.unwrap();
        store.insert_message(text(b, a, "ab", "2")).await.unwrap();

        let ids = store.mark_conversation_read("ab", b).await.unwrap();
        assert_eq!(ids, vec![to_b.id]);
        assert!(store.mark_conversation_read("ab", b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_users_are_hidden() {
        let store = MemoryStore::new();
        let user = store.create_user(NewUser::named("alice")).await.unwrap();
        assert!(store.find_user(user.id).await.unwrap().is_some());
        assert!(store.deactivate_user(user.id).await.unwrap());
        assert!(!store.deactivate_user(user.id).await.unwrap());
        assert!(store.find_user(user.id).await.unwrap().is_none());
        assert!(store.find_by_username("alice").await.unwrap().is_none());
        assert!(store.search_users("ali", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_matches_username_and_display_name() {
        let store = MemoryStore::new();
        store.create_user(NewUser::named("zoe")).await.unwrap();
        store.create_user(NewUser::named("adam")).await.unwrap();
        store
            .create_user(NewUser {
                display_name: Some("Zed Shaw".to_string()),
                ..NewUser::named("shaw")
            })
            .await
            .unwrap();

        let names = |users: Vec<User>| users.into_iter().map(|u| u.username).collect::<Vec<_>>();
        assert_eq!(names(store.search_users("Z", 10).await.unwrap()), vec!["shaw", "zoe"]);
        assert_eq!(names(store.search_users("", 2).await.unwrap()), vec!["adam", "shaw"]);
        assert_eq!(
            store.find_by_username("adam").await.unwrap().unwrap().username,
            "adam"
        );
        assert!(store.find_by_username("Adam").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.create_user(NewUser::named("bob")).await.unwrap();
        let err = store.create_user(NewUser::named("bob")).await.unwrap_err();
        assert_eq!(err.kind, stealth_core::error::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_presence_mirror() {
        let store = MemoryStore::new();
        let user = store.create_user(NewUser::named("carol")).await.unwrap();
        let now = Utc::now();
        store.upsert_presence_mirror(user.id, true, now).await.unwrap();
        let found = store.find_user(user.id).await.unwrap().unwrap();
        assert!(found.is_online);
        assert_eq!(found.last_seen, Some(now));
    }
}
