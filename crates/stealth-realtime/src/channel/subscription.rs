//! Subscription tracking: which channels each connection has joined.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::connection::handle::ConnectionId;

use super::types::ChannelId;

/// Connection-to-channel reverse index.
#[derive(Debug, Default)]
pub struct SubscriptionTracker {
    conn_to_channels: DashMap<ConnectionId, HashSet<ChannelId>>,
}

impl SubscriptionTracker {
    /// Creates a new subscription tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a subscription. Returns `false` if it already existed.
    pub fn add(&self, conn_id: ConnectionId, channel: ChannelId) -> bool {
        self.conn_to_channels
            .entry(conn_id)
            .or_default()
            .insert(channel)
    }

    /// Removes a subscription. Returns `false` if it did not exist.
    pub fn remove(&self, conn_id: ConnectionId, channel: &ChannelId) -> bool {
        self.conn_to_channels
            .get_mut(&conn_id)
            .map(|mut channels| channels.remove(channel))
            .unwrap_or(false)
    }

    /// Number of channels matching `filter` that a connection has joined.
    pub fn count_where(&self, conn_id: ConnectionId, filter: impl Fn(&ChannelId) -> bool) -> usize {
        self.conn_to_channels
            .get(&conn_id)
            .map(|entry| entry.value().iter().filter(|c| filter(c)).count())
            .unwrap_or(0)
    }

    /// Removes all subscriptions for a connection.
    pub fn remove_all(&self, conn_id: ConnectionId) -> HashSet<ChannelId> {
        self.conn_to_channels
            .remove(&conn_id)
            .map(|(_, channels)| channels)
            .unwrap_or_default()
    }
}
