//! Channel registry: members of every live channel.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::connection::handle::ConnectionId;

use super::subscription::SubscriptionTracker;
use super::types::{ChannelId, ChannelType};

/// Membership table for all channels with at least one member.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    /// Channel → member connections.
    channels: DashMap<ChannelId, HashSet<ConnectionId>>,
    /// Reverse index.
    subscriptions: SubscriptionTracker,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a channel. Idempotent; returns whether the
    /// membership is new.
    pub fn subscribe(&self, channel: ChannelId, conn_id: ConnectionId) -> bool {
        self.channels
            .entry(channel.clone())
            .or_default()
            .insert(conn_id);
        self.subscriptions.add(conn_id, channel)
    }

    /// Removes a connection from a channel. Idempotent; returns whether a
    /// membership was removed.
    pub fn unsubscribe(&self, channel: &ChannelId, conn_id: ConnectionId) -> bool {
        self.drop_member(channel, conn_id);
        self.subscriptions.remove(conn_id, channel)
    }

    /// Removes a connection from every channel it joined.
    pub fn unsubscribe_all(&self, conn_id: ConnectionId) -> HashSet<ChannelId> {
        let channels = self.subscriptions.remove_all(conn_id);
        for channel in &channels {
            self.drop_member(channel, conn_id);
        }
        channels
    }

    fn drop_member(&self, channel: &ChannelId, conn_id: ConnectionId) {
        if let Some(mut members) = self.channels.get_mut(channel) {
            members.remove(&conn_id);
            if members.is_empty() {
                drop(members);
                self.channels.remove_if(channel, |_, m| m.is_empty());
            }
        }
    }

    /// Current members of a channel.
    pub fn subscribers(&self, channel: &ChannelId) -> Vec<ConnectionId> {
        self.channels
            .get(channel)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether a connection is a member of a channel.
    pub fn is_subscribed(&self, channel: &ChannelId, conn_id: ConnectionId) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|members| members.contains(&conn_id))
    }

    /// Number of conversation channels a connection has joined.
    pub fn conversation_count(&self, conn_id: ConnectionId) -> usize {
        self.subscriptions
            .count_where(conn_id, |c| matches!(c.kind(), Some(ChannelType::Conversation(..))))
    }
}
