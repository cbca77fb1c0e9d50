//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stealth_core::types::UserId;

/// A registered chat participant.
///
/// `is_online` and `last_seen` are a best-effort mirror of the live
/// presence tracker, used only when the tracker has no entry for the user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Canonical user identity.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Human-readable display name.
    pub display_name: Option<String>,
    /// Avatar reference (URL).
    pub avatar_url: Option<String>,
    /// Soft-delete flag. Inactive users cannot receive messages.
    pub is_active: bool,
    /// Mirrored online flag.
    pub is_online: bool,
    /// Mirrored last-seen time.
    pub last_seen: Option<DateTime<Utc>>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Name to show in clients, falling back to the username.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// Data required to create a user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    /// Identity to assign. Generated when absent.
    pub id: Option<UserId>,
    /// Unique login name.
    pub username: String,
    /// Display name (optional).
    pub display_name: Option<String>,
    /// Avatar reference (optional).
    pub avatar_url: Option<String>,
}

impl NewUser {
    /// Shorthand used by fixtures and seeding.
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            display_name: None,
            avatar_url: None,
        }
    }
}
