//! Individual WebSocket connection handle.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use stealth_core::types::UserId;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// A handle to a single WebSocket connection.
///
/// Holds the sender for pushing serialized frames to the client plus the
/// identity the connection is bound to, if any.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Identity proven by a token on upgrade
    pub authenticated_as: Option<UserId>,
    /// Identity announced by `join-room`. Set at most once.
    identity: OnceLock<UserId>,
    /// Sender for outbound frames
    sender: mpsc::Sender<String>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Last pong received
    last_pong: RwLock<DateTime<Utc>>,
    /// Whether the connection is still alive
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(authenticated_as: Option<UserId>, sender: mpsc::Sender<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            authenticated_as,
            identity: OnceLock::new(),
            sender,
            connected_at: now,
            last_pong: RwLock::new(now),
            alive: AtomicBool::new(true),
        }
    }

    /// The identity announced by `join-room`, if any.
    pub fn identity(&self) -> Option<UserId> {
        self.identity.get().copied()
    }

    /// Bind the connection to `user`. Returns the identity in effect
    /// afterwards, which differs from `user` if one was already bound.
    pub fn identify(&self, user: UserId) -> UserId {
        *self.identity.get_or_init(|| user)
    }

    /// Queue a frame for this connection.
    ///
    /// Never blocks: a full buffer drops the frame for this connection only.
    pub fn send(&self, frame: String) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Record a pong response
    pub async fn record_pong(&self) {
        *self.last_pong.write().await = Utc::now();
    }

    /// When the last pong arrived
    pub async fn last_pong(&self) -> DateTime<Utc> {
        *self.last_pong.read().await
    }
}
