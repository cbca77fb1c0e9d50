//! Connection manager: the per-connection gateway dispatcher.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use stealth_core::config::RealtimeConfig;
use stealth_core::error::AppError;
use stealth_core::result::AppResult;
use stealth_core::types::UserId;
use stealth_entity::presence::PresenceSnapshot;

use crate::channel::router::RoomRouter;
use crate::channel::types::ChannelId;
use crate::message::codec;
use crate::message::types::{
    AckPayload, ChannelPayload, ConversationPayload, InboundEvent, OutboundEvent,
    SendMessagePayload, TypingPayload, UserRef, UserTypingPayload,
};
use crate::metrics::EngineMetrics;
use crate::pipeline::service::MessagePipeline;
use crate::pipeline::validator::parse_message_id;
use crate::presence::tracker::{PresenceTracker, Release};

use super::handle::{ConnectionHandle, ConnectionId};
use super::heartbeat::HeartbeatConfig;
use super::pool::ConnectionPool;

/// Error code for events that need `join-room` first.
pub const NOT_IDENTIFIED: &str = "NOT_IDENTIFIED";

/// Manages all active WebSocket connections and dispatches their events.
///
/// Every per-event failure is answered on the originating connection only.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Channel membership and fan-out.
    router: Arc<RoomRouter>,
    /// Presence tracker.
    presence: Arc<PresenceTracker>,
    /// Message pipeline.
    pipeline: Arc<MessagePipeline>,
    /// Metrics.
    metrics: Arc<EngineMetrics>,
    /// Configuration.
    config: RealtimeConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: RealtimeConfig,
        pool: Arc<ConnectionPool>,
        router: Arc<RoomRouter>,
        presence: Arc<PresenceTracker>,
        pipeline: Arc<MessagePipeline>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            pool,
            router,
            presence,
            pipeline,
            metrics,
            config,
        }
    }

    /// Registers a new connection.
    ///
    /// Returns the connection handle and a receiver for outbound frames.
    /// The connection has no channel membership until `join-room`.
    pub fn register(
        &self,
        authenticated_as: Option<UserId>,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let handle = Arc::new(ConnectionHandle::new(authenticated_as, tx));

        self.pool.add(handle.clone());
        self.metrics.connection_opened();

        info!(
            conn_id = %handle.id,
            authenticated_as = ?authenticated_as,
            "WebSocket connection registered"
        );

        (handle, rx)
    }

    /// Unregisters a connection: drops its memberships and releases its
    /// hold on presence.
    ///
    /// If the user still has another live connection, presence passes to
    /// it silently. Otherwise `user-offline` goes out to everyone right
    /// away. A disconnect from a connection that is no longer the active
    /// one changes nothing.
    pub async fn unregister(&self, conn_id: ConnectionId) {
        let Some(handle) = self.detach(conn_id) else {
            return;
        };
        match handle.identity() {
            Some(user) => self.release_presence(conn_id, user).await,
            None => info!(conn_id = %conn_id, "Anonymous WebSocket connection unregistered"),
        }
    }

    /// Takes a connection out of the pool and every channel, marking it
    /// dead. Must happen before its presence is released.
    fn detach(&self, conn_id: ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let handle = self.pool.remove(&conn_id)?;
        handle.mark_dead();
        self.router.leave_all(conn_id);
        self.metrics.connection_closed();
        Some(handle)
    }

    async fn release_presence(&self, conn_id: ConnectionId, user: UserId) {
        let release = self.presence.release(user, conn_id, || self.live_successor(user));
        match release {
            Release::Offline(snapshot) => {
                let last_seen = snapshot.last_seen.unwrap_or_else(Utc::now);
                let notified = self
                    .router
                    .broadcast_all(&OutboundEvent::UserOffline(snapshot), None);
                self.pipeline.mirror_presence(user, false, last_seen).await;
                info!(
                    conn_id = %conn_id,
                    user_id = %user,
                    notified,
                    "User went offline"
                );
            }
            Release::HandedOver(next) => {
                debug!(
                    conn_id = %conn_id,
                    user_id = %user,
                    successor = %next,
                    "Presence handed over to another connection"
                );
            }
            Release::Stale => {
                debug!(conn_id = %conn_id, user_id = %user, "Stale disconnect ignored");
            }
        }
    }

    /// Another connection of `user` that is still open. Runs under the
    /// presence record lock, so the liveness check and the hand-over are
    /// one step.
    fn live_successor(&self, user: UserId) -> Option<ConnectionId> {
        self.router
            .identity_members(user)
            .into_iter()
            .find(|id| self.pool.get(id).is_some_and(|h| h.is_alive()))
    }

    /// Processes an inbound text frame from a client.
    pub async fn handle_inbound(&self, conn_id: ConnectionId, raw: &str) {
        let Some(handle) = self.pool.get(&conn_id) else {
            warn!(conn_id = %conn_id, "Frame from unknown connection");
            return;
        };
        self.metrics.frame_received();

        if raw.len() > self.config.max_frame_bytes {
            self.reply_error(
                &handle,
                &AppError::validation(format!(
                    "Frame exceeds {} bytes",
                    self.config.max_frame_bytes
                )),
            );
            return;
        }

        let event = match codec::decode(raw) {
            Ok(event) => event,
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "Undecodable frame");
                self.reply_error(&handle, &e);
                return;
            }
        };

        debug!(conn_id = %conn_id, event = event.name(), "Inbound event");

        match event {
            InboundEvent::JoinRoom(user) => self.handle_join_room(&handle, &user).await,
            InboundEvent::SendMessage(payload) => self.handle_send(&handle, &payload).await,
            InboundEvent::Typing(payload) => self.handle_typing(&handle, &payload),
            InboundEvent::MessageDelivered(ack) => self.handle_ack(&handle, &ack, false).await,
            InboundEvent::MessageRead(ack) => self.handle_ack(&handle, &ack, true).await,
            InboundEvent::CheckUserStatus(user) => self.handle_check_status(&handle, &user).await,
            InboundEvent::GetOnlineUsers => {
                self.router.send_to(
                    handle.id,
                    &OutboundEvent::OnlineUsers(self.presence.list_online()),
                );
            }
            InboundEvent::JoinConversation(payload) => {
                self.handle_conversation(&handle, &payload, true)
            }
            InboundEvent::LeaveConversation(payload) => {
                self.handle_conversation(&handle, &payload, false)
            }
        }
    }

    /// Identity announcement: bind, join the identity channel, go online.
    async fn handle_join_room(&self, handle: &ConnectionHandle, user: &UserRef) {
        let user = match UserId::parse_field(user.as_str(), "userId") {
            Ok(user) => user,
            Err(e) => return self.reply_error(handle, &e),
        };

        if handle.authenticated_as.is_some_and(|proven| proven != user) {
            return self.reply_error(
                handle,
                &AppError::authorization("Token belongs to a different user"),
            );
        }
        if handle.identify(user) != user {
            return self.reply_error(
                handle,
                &AppError::authorization("Connection already joined as a different user"),
            );
        }

        self.router.join_identity(handle.id, user);
        let snapshot = self.presence.mark_online(user, handle.id);
        let last_seen = snapshot.last_seen.unwrap_or_else(Utc::now);
        let notified = self
            .router
            .broadcast_all(&OutboundEvent::UserOnline(snapshot), Some(handle.id));
        self.pipeline.mirror_presence(user, true, last_seen).await;

        info!(
            conn_id = %handle.id,
            user_id = %user,
            notified,
            "User joined"
        );
    }

    async fn handle_send(&self, handle: &ConnectionHandle, payload: &SendMessagePayload) {
        let Some(identity) = handle.identity() else {
            self.router.send_to(
                handle.id,
                &OutboundEvent::message_error(NOT_IDENTIFIED, "join-room is required first"),
            );
            return;
        };

        let result = match UserId::parse_field(&payload.sender_id, "senderId") {
            Ok(sender) if sender != identity => Err(AppError::authorization(
                "senderId does not match this connection",
            )),
            _ => self.pipeline.send(payload).await.map(|_| ()),
        };

        if let Err(e) = result {
            debug!(conn_id = %handle.id, error = %e, "Send rejected");
            self.router.send_to(
                handle.id,
                &OutboundEvent::message_error(e.kind.code(), e.message),
            );
        }
    }

    fn handle_typing(&self, handle: &ConnectionHandle, payload: &TypingPayload) {
        let Some(identity) = self.require_identity(handle) else {
            return;
        };
        let recipient = match UserId::parse_field(&payload.recipient_id, "recipientId") {
            Ok(recipient) => recipient,
            Err(e) => return self.reply_error(handle, &e),
        };

        self.router.broadcast(
            &ChannelId::identity(recipient),
            &OutboundEvent::UserTyping(UserTypingPayload {
                user_id: identity,
                is_typing: payload.is_typing,
            }),
            None,
        );
    }

    async fn handle_ack(&self, handle: &ConnectionHandle, ack: &AckPayload, read: bool) {
        let Some(identity) = self.require_identity(handle) else {
            return;
        };

        let result = self.acknowledge(identity, ack, read).await;
        if let Err(e) = result {
            debug!(conn_id = %handle.id, error = %e, read, "Acknowledgement rejected");
            self.reply_error(handle, &e);
        }
    }

    async fn acknowledge(&self, identity: UserId, ack: &AckPayload, read: bool) -> AppResult<()> {
        let message_id = parse_message_id(&ack.message_id)?;
        let acking_user = UserId::parse_field(&ack.user_id, "userId")?;
        if acking_user != identity {
            return Err(AppError::authorization(
                "userId does not match this connection",
            ));
        }

        if read {
            self.pipeline.mark_read(message_id, acking_user).await?;
        } else {
            self.pipeline.mark_delivered(message_id, acking_user).await?;
        }
        Ok(())
    }

    async fn handle_check_status(&self, handle: &ConnectionHandle, user: &UserRef) {
        match UserId::parse_field(user.as_str(), "userId") {
            Ok(user) => {
                let status = self.resolve_status(user).await;
                self.router
                    .send_to(handle.id, &OutboundEvent::UserStatusResponse(status));
            }
            Err(e) => self.reply_error(handle, &e),
        }
    }

    fn handle_conversation(
        &self,
        handle: &ConnectionHandle,
        payload: &ConversationPayload,
        join: bool,
    ) {
        let Some(identity) = self.require_identity(handle) else {
            return;
        };
        let other = match UserId::parse_field(&payload.other_user_id, "otherUserId") {
            Ok(other) if other == identity => {
                return self.reply_error(
                    handle,
                    &AppError::validation("otherUserId must differ from your own id"),
                );
            }
            Ok(other) => other,
            Err(e) => return self.reply_error(handle, &e),
        };

        let channel = RoomRouter::channel_id(identity, other);
        let reply = if join {
            match self.router.join(handle.id, &channel) {
                Ok(_) => OutboundEvent::ConversationJoined(ChannelPayload {
                    channel_id: channel.into_string(),
                }),
                Err(e) => return self.reply_error(handle, &e),
            }
        } else {
            self.router.leave(handle.id, &channel);
            OutboundEvent::ConversationLeft(ChannelPayload {
                channel_id: channel.into_string(),
            })
        };
        self.router.send_to(handle.id, &reply);
    }

    /// Presence of `user`: live state if this process has it, otherwise
    /// the durable mirror's last-seen time with `is_online = false`.
    pub async fn resolve_status(&self, user: UserId) -> PresenceSnapshot {
        if let Some(live) = self.presence.get(user) {
            return live;
        }
        match self.pipeline.find_user(user).await {
            Ok(Some(record)) => PresenceSnapshot {
                user_id: user,
                is_online: false,
                last_seen: record.last_seen,
            },
            Ok(None) => PresenceSnapshot::unknown(user),
            Err(e) => {
                warn!(user_id = %user, error = %e, "Presence mirror lookup failed");
                PresenceSnapshot::unknown(user)
            }
        }
    }

    /// Closes every connection of `user`, releasing presence as each one
    /// goes. Returns how many were closed.
    pub async fn disconnect_user(&self, user: UserId) -> usize {
        let members = self.router.identity_members(user);
        let mut closed = 0;
        for conn_id in members {
            if self.pool.get(&conn_id).is_some() {
                self.unregister(conn_id).await;
                closed += 1;
            }
        }
        closed
    }

    /// Marks every connection dead so their socket loops wind down.
    pub fn close_all(&self) -> usize {
        let connections = self.pool.all_connections();
        for handle in &connections {
            handle.mark_dead();
        }
        info!(count = connections.len(), "Closing all WebSocket connections");
        connections.len()
    }

    /// Liveness settings for socket loops.
    pub fn heartbeat(&self) -> HeartbeatConfig {
        HeartbeatConfig::from_config(&self.config)
    }

    /// Largest inbound frame accepted.
    pub fn max_frame_bytes(&self) -> usize {
        self.config.max_frame_bytes
    }

    /// Live connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    fn require_identity(&self, handle: &ConnectionHandle) -> Option<UserId> {
        let identity = handle.identity();
        if identity.is_none() {
            self.router.send_to(
                handle.id,
                &OutboundEvent::error(NOT_IDENTIFIED, "join-room is required first"),
            );
        }
        identity
    }

    fn reply_error(&self, handle: &ConnectionHandle, error: &AppError) {
        self.router.send_to(
            handle.id,
            &OutboundEvent::error(error.kind.code(), error.message.clone()),
        );
    }
}
