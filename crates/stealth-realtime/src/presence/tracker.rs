//! Presence tracker: live reachability of every identity seen by this
//! process.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use stealth_core::types::UserId;
use stealth_entity::presence::PresenceSnapshot;

use crate::connection::handle::ConnectionId;

/// In-memory presence state of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceRecord {
    /// The connection currently representing the user.
    pub connection_id: Option<ConnectionId>,
    /// When the user was last reachable.
    pub last_seen: DateTime<Utc>,
    /// Whether the user is reachable right now.
    pub is_online: bool,
}

/// Outcome of releasing a connection's hold on a user's presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// The connection was not the active one. Nothing changed.
    Stale,
    /// Another live connection of the same user took over.
    HandedOver(ConnectionId),
    /// The user is now offline.
    Offline(PresenceSnapshot),
}

/// Tracks presence for all users.
///
/// Authoritative while the process runs; a restart loses everything and
/// clients re-announce on reconnect.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    records: DashMap<UserId, PresenceRecord>,
}

impl PresenceTracker {
    /// Create a new presence tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `conn_id` as the user's active connection. Last writer wins.
    pub fn mark_online(&self, user_id: UserId, conn_id: ConnectionId) -> PresenceSnapshot {
        let now = Utc::now();
        self.records.insert(
            user_id,
            PresenceRecord {
                connection_id: Some(conn_id),
                last_seen: now,
                is_online: true,
            },
        );
        PresenceSnapshot {
            user_id,
            is_online: true,
            last_seen: Some(now),
        }
    }

    /// Mark the user offline, but only if `conn_id` is the active
    /// connection. `None` means the disconnect was stale.
    pub fn mark_offline(&self, user_id: UserId, conn_id: ConnectionId) -> Option<PresenceSnapshot> {
        match self.release(user_id, conn_id, || None) {
            Release::Offline(snapshot) => Some(snapshot),
            Release::Stale | Release::HandedOver(_) => None,
        }
    }

    /// Release `conn_id`'s hold on the user's presence.
    ///
    /// If `conn_id` is the active connection, `successor` is asked for
    /// another live connection of the same user while the user's record is
    /// locked. When it names one, that connection becomes active and the
    /// user stays online. Otherwise the user goes offline.
    ///
    /// A connection must be marked dead before its own release, so two
    /// devices closing together never hand presence to each other.
    /// `successor` must not call back into the tracker.
    pub fn release<F>(&self, user_id: UserId, conn_id: ConnectionId, successor: F) -> Release
    where
        F: FnOnce() -> Option<ConnectionId>,
    {
        let Some(mut record) = self.records.get_mut(&user_id) else {
            return Release::Stale;
        };
        if !record.is_online || record.connection_id != Some(conn_id) {
            return Release::Stale;
        }

        let now = Utc::now();
        record.last_seen = now;
        match successor().filter(|next| *next != conn_id) {
            Some(next) => {
                record.connection_id = Some(next);
                Release::HandedOver(next)
            }
            None => {
                record.connection_id = None;
                record.is_online = false;
                Release::Offline(PresenceSnapshot {
                    user_id,
                    is_online: false,
                    last_seen: Some(now),
                })
            }
        }
    }

    /// Current state, if this process has ever seen the user.
    pub fn get(&self, user_id: UserId) -> Option<PresenceSnapshot> {
        self.records.get(&user_id).map(|r| PresenceSnapshot {
            user_id,
            is_online: r.is_online,
            last_seen: Some(r.last_seen),
        })
    }

    /// Current state; unknown users are offline with no last-seen time.
    pub fn query_status(&self, user_id: UserId) -> PresenceSnapshot {
        self.get(user_id)
            .unwrap_or_else(|| PresenceSnapshot::unknown(user_id))
    }

    /// The connection currently representing a user.
    pub fn active_connection(&self, user_id: UserId) -> Option<ConnectionId> {
        self.records.get(&user_id).and_then(|r| r.connection_id)
    }

    /// Everyone currently online.
    pub fn list_online(&self) -> Vec<PresenceSnapshot> {
        self.records
            .iter()
            .filter(|r| r.is_online)
            .map(|r| PresenceSnapshot {
                user_id: *r.key(),
                is_online: true,
                last_seen: Some(r.last_seen),
            })
            .collect()
    }

    /// Number of online users.
    pub fn online_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_online).count()
    }

    /// Forget offline users whose last-seen time is older than `grace`.
    /// Returns how many entries were dropped.
    pub fn reap(&self, grace: Duration, now: DateTime<Utc>) -> usize {
        let Ok(grace) = chrono::Duration::from_std(grace) else {
            return 0;
        };
        let cutoff = now - grace;
        let before = self.records.len();
        self.records
            .retain(|_, r| r.is_online || r.last_seen > cutoff);
        before.saturating_sub(self.records.len())
    }
}
