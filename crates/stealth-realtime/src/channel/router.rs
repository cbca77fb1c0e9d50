//! Room router: channel derivation, membership, and fan-out.

use std::sync::Arc;

use tracing::{debug, error};

use stealth_core::error::AppError;
use stealth_core::result::AppResult;
use stealth_core::types::UserId;

use crate::connection::handle::ConnectionId;
use crate::connection::pool::ConnectionPool;
use crate::message::codec;
use crate::message::types::OutboundEvent;
use crate::metrics::EngineMetrics;

use super::registry::ChannelRegistry;
use super::types::ChannelId;

/// Routes events to channel members.
///
/// The only writer of channel membership; other components reach
/// connections exclusively through [`RoomRouter::broadcast`] and friends.
#[derive(Debug)]
pub struct RoomRouter {
    registry: ChannelRegistry,
    pool: Arc<ConnectionPool>,
    metrics: Arc<EngineMetrics>,
    max_conversations: usize,
}

impl RoomRouter {
    /// Create a router over the given connection pool.
    pub fn new(
        pool: Arc<ConnectionPool>,
        metrics: Arc<EngineMetrics>,
        max_conversations: usize,
    ) -> Self {
        Self {
            registry: ChannelRegistry::new(),
            pool,
            metrics,
            max_conversations,
        }
    }

    /// The conversation channel of two participants.
    pub fn channel_id(a: UserId, b: UserId) -> ChannelId {
        ChannelId::conversation(a, b)
    }

    /// Join a conversation channel. Idempotent; returns whether the
    /// membership is new.
    pub fn join(&self, conn_id: ConnectionId, channel: &ChannelId) -> AppResult<bool> {
        if self.registry.is_subscribed(channel, conn_id) {
            return Ok(false);
        }
        if self.registry.conversation_count(conn_id) >= self.max_conversations {
            return Err(AppError::conflict(format!(
                "Maximum conversations ({}) reached",
                self.max_conversations
            )));
        }
        let added = self.registry.subscribe(channel.clone(), conn_id);
        if added {
            self.metrics.subscribed();
            debug!(conn_id = %conn_id, channel = %channel, "Joined channel");
        }
        Ok(added)
    }

    /// Leave a channel. Idempotent; returns whether a membership was removed.
    pub fn leave(&self, conn_id: ConnectionId, channel: &ChannelId) -> bool {
        let removed = self.registry.unsubscribe(channel, conn_id);
        if removed {
            debug!(conn_id = %conn_id, channel = %channel, "Left channel");
        }
        removed
    }

    /// Join the connection to its own identity-scoped channel.
    pub fn join_identity(&self, conn_id: ConnectionId, user: UserId) -> bool {
        self.registry.subscribe(ChannelId::identity(user), conn_id)
    }

    /// Drop every membership of a connection.
    pub fn leave_all(&self, conn_id: ConnectionId) -> usize {
        self.registry.unsubscribe_all(conn_id).len()
    }

    /// Connections currently in a user's identity channel.
    pub fn identity_members(&self, user: UserId) -> Vec<ConnectionId> {
        self.registry.subscribers(&ChannelId::identity(user))
    }

    /// Deliver `event` to every member of `channel` except `exclude`.
    ///
    /// Returns how many connections accepted the event. Nobody listening
    /// is not an error.
    pub fn broadcast(
        &self,
        channel: &ChannelId,
        event: &OutboundEvent,
        exclude: Option<ConnectionId>,
    ) -> usize {
        let members = self.registry.subscribers(channel);
        if members.is_empty() {
            return 0;
        }
        let Some(frame) = self.encode(event) else {
            return 0;
        };
        members
            .into_iter()
            .filter(|id| Some(*id) != exclude)
            .filter(|id| self.deliver(id, &frame))
            .count()
    }

    /// Deliver `event` to every connection except `exclude`.
    pub fn broadcast_all(&self, event: &OutboundEvent, exclude: Option<ConnectionId>) -> usize {
        let Some(frame) = self.encode(event) else {
            return 0;
        };
        self.pool
            .all_connections()
            .into_iter()
            .filter(|handle| Some(handle.id) != exclude)
            .filter(|handle| {
                let ok = handle.send(frame.clone());
                self.metrics.event_queued(ok);
                ok
            })
            .count()
    }

    /// Deliver `event` to one connection.
    pub fn send_to(&self, conn_id: ConnectionId, event: &OutboundEvent) -> bool {
        self.encode(event)
            .is_some_and(|frame| self.deliver(&conn_id, &frame))
    }

    fn deliver(&self, conn_id: &ConnectionId, frame: &str) -> bool {
        let ok = self
            .pool
            .get(conn_id)
            .is_some_and(|handle| handle.send(frame.to_string()));
        self.metrics.event_queued(ok);
        ok
    }

    fn encode(&self, event: &OutboundEvent) -> Option<String> {
        match codec::encode(event) {
            Ok(frame) => Some(frame),
            Err(e) => {
                error!(error = %e, "Dropping unencodable event");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::handle::ConnectionHandle;
    use tokio::sync::mpsc;

    fn connect(pool: &ConnectionPool) -> (ConnectionId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(8);
        let handle = Arc::new(ConnectionHandle::new(None, tx));
        let id = handle.id;
        pool.add(handle);
        (id, rx)
    }

    fn router(max: usize) -> (RoomRouter, Arc<ConnectionPool>) {
        let pool = Arc::new(ConnectionPool::new());
        let router = RoomRouter::new(pool.clone(), Arc::new(EngineMetrics::new()), max);
        (router, pool)
    }

    fn typing(user: UserId) -> OutboundEvent {
        OutboundEvent::UserTyping(crate::message::types::UserTypingPayload {
            user_id: user,
            is_typing: true,
        })
    }

    #[test]
    fn test_broadcast_excludes_origin() {
        let (router, pool) = router(10);
        let (a, mut rx_a) = connect(&pool);
        let (b, mut rx_b) = connect(&pool);
        let channel = RoomRouter::channel_id(UserId::new(), UserId::new());
        router.join(a, &channel).unwrap();
        router.join(b, &channel).unwrap();

        let delivered = router.broadcast(&channel, &typing(UserId::new()), Some(a));
        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().unwrap().contains("user-typing"));
    }

    #[test]
    fn test_join_is_idempotent_and_limited() {
        let (router, pool) = router(1);
        let (conn, _rx) = connect(&pool);
        let first = RoomRouter::channel_id(UserId::new(), UserId::new());
        let second = RoomRouter::channel_id(UserId::new(), UserId::new());

        assert!(router.join(conn, &first).unwrap());
        assert!(!router.join(conn, &first).unwrap());
        assert!(router.join(conn, &second).is_err());

        // Identity channels never count against the limit.
        assert!(router.join_identity(conn, UserId::new()));
    }

    #[test]
    fn test_leave_and_leave_all() {
        let (router, pool) = router(10);
        let (conn, _rx) = connect(&pool);
        let user = UserId::new();
        let channel = RoomRouter::channel_id(user, UserId::new());
        router.join_identity(conn, user);
        router.join(conn, &channel).unwrap();

        assert!(router.leave(conn, &channel));
        assert!(!router.leave(conn, &channel));
        assert_eq!(router.identity_members(user), vec![conn]);
        assert_eq!(router.leave_all(conn), 1);
        assert!(router.identity_members(user).is_empty());
    }

    #[test]
    fn test_broadcast_to_empty_channel_is_not_an_error() {
        let (router, _pool) = router(10);
        let channel = ChannelId::identity(UserId::new());
        assert_eq!(router.broadcast(&channel, &typing(UserId::new()), None), 0);
    }

    #[test]
    fn test_broadcast_all() {
        let (router, pool) = router(10);
        let (a, mut rx_a) = connect(&pool);
        let (_b, mut rx_b) = connect(&pool);
        assert_eq!(router.broadcast_all(&typing(UserId::new()), Some(a)), 1);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }
}
