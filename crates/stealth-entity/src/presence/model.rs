//! Presence state as seen by clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stealth_core::types::UserId;

/// Point-in-time reachability of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshot {
    /// User ID.
    pub user_id: UserId,
    /// Whether the user has a live connection.
    pub is_online: bool,
    /// When the user was last reachable. `None` if never seen.
    pub last_seen: Option<DateTime<Utc>>,
}

impl PresenceSnapshot {
    /// Snapshot for an identity nobody has seen.
    pub fn unknown(user_id: UserId) -> Self {
        Self {
            user_id,
            is_online: false,
            last_seen: None,
        }
    }
}
