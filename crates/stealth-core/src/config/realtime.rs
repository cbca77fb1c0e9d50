//! Real-time gateway configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound event buffer per connection. Events beyond this are dropped
    /// for that connection only.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// WebSocket ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Extra time after a missed ping before the connection is reaped.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_seconds: u64,
    /// Maximum conversation channels a single connection may join.
    #[serde(default = "default_max_subscriptions")]
    pub max_subscriptions_per_connection: usize,
    /// How long an offline presence entry is kept before being forgotten.
    #[serde(default = "default_presence_grace")]
    pub presence_grace_seconds: u64,
    /// Maximum inbound frame size in bytes.
    #[serde(default = "default_max_frame")]
    pub max_frame_bytes: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            ping_interval_seconds: default_ping_interval(),
            ping_timeout_seconds: default_ping_timeout(),
            max_subscriptions_per_connection: default_max_subscriptions(),
            presence_grace_seconds: default_presence_grace(),
            max_frame_bytes: default_max_frame(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    25
}

fn default_ping_timeout() -> u64 {
    20
}

fn default_max_subscriptions() -> usize {
    50
}

fn default_presence_grace() -> u64 {
    30
}

fn default_max_frame() -> usize {
    65_536
}
