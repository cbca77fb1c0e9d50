//! Ping/pong liveness for WebSocket connections.

use std::time::Duration;

use chrono::{DateTime, Utc};

use stealth_core::config::RealtimeConfig;

use super::handle::ConnectionHandle;

/// Heartbeat configuration
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Extra time allowed for a pong to arrive
    pub ping_timeout: Duration,
}

impl HeartbeatConfig {
    /// Derive from the realtime section.
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.ping_interval_seconds),
            ping_timeout: Duration::from_secs(config.ping_timeout_seconds),
        }
    }

    /// Whether a connection whose last pong was at `last_pong` should be
    /// reaped at `now`.
    pub fn is_expired(&self, last_pong: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match (now - last_pong).to_std() {
            Ok(elapsed) => elapsed > self.ping_interval + self.ping_timeout,
            Err(_) => false,
        }
    }

    /// Check a live connection, marking it dead if it stopped answering.
    pub async fn check(&self, handle: &ConnectionHandle) -> bool {
        let last_pong = handle.last_pong().await;
        if self.is_expired(last_pong, Utc::now()) {
            tracing::warn!(
                conn_id = %handle.id,
                last_pong = %last_pong,
                "Heartbeat timeout"
            );
            handle.mark_dead();
            return false;
        }
        handle.is_alive()
    }
}
