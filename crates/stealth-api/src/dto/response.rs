//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stealth_core::types::UserId;
use stealth_entity::presence::PresenceSnapshot;
use stealth_entity::user::User;
use stealth_realtime::message::view::MessageView;
use stealth_realtime::metrics::MetricsSnapshot;

/// `GET /api/messages/{otherUserId}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    /// Oldest first.
    pub messages: Vec<MessageView>,
    /// Whether older messages exist beyond this page.
    pub has_more: bool,
}

/// `GET /api/users/{userId}/status` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusResponse {
    /// User ID.
    pub user_id: UserId,
    /// Whether the user has a live connection.
    pub is_online: bool,
    /// When the user was last reachable.
    pub last_seen: Option<DateTime<Utc>>,
    /// Human-readable presence line.
    pub last_seen_text: String,
    /// Display name, when the directory knows the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A directory entry with its current presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    /// User ID.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Name shown to other users, falling back to the username.
    pub display_name: String,
    /// Avatar reference.
    pub avatar_url: Option<String>,
    /// Whether the user has a live connection.
    pub is_online: bool,
    /// When the user was last reachable.
    pub last_seen: Option<DateTime<Utc>>,
}

impl UserView {
    /// Combine a directory record with its presence.
    pub fn new(user: User, presence: &PresenceSnapshot) -> Self {
        Self {
            id: user.id,
            display_name: user.label().to_string(),
            username: user.username,
            avatar_url: user.avatar_url,
            is_online: presence.is_online,
            last_seen: presence.last_seen.or(user.last_seen),
        }
    }
}

/// `POST /api/users` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUserResponse {
    /// The new user.
    pub user: UserView,
    /// Identity token for HTTP and the gateway.
    pub token: String,
}

/// `GET /api/users?q=` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    /// Matching users, ordered by username.
    pub users: Vec<UserView>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok`, or `degraded` when a backend check fails.
    pub status: String,
    /// `connected` or `unavailable`.
    pub database: String,
    /// `available` or `unavailable`.
    pub storage: String,
    /// Server version.
    pub version: String,
    /// Seconds since start.
    pub uptime_seconds: u64,
    /// Open WebSocket connections.
    pub ws_connections: usize,
    /// Users currently online.
    pub online_users: usize,
    /// Engine counters.
    pub metrics: MetricsSnapshot,
}
