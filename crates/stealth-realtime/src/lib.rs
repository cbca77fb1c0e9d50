//! # stealth-realtime
//!
//! The real-time messaging core of Stealth Chat:
//!
//! - Presence tracking with stale-disconnect protection
//! - Room routing over identity-scoped and pairwise conversation channels
//! - The message pipeline (validate, persist, fan out, receipts, history)
//! - The WebSocket gateway dispatcher and per-connection state
//! - The user directory (registration, search, soft-delete)

pub mod channel;
pub mod connection;
pub mod directory;
pub mod message;
pub mod metrics;
pub mod pipeline;
pub mod presence;
pub mod server;

pub use channel::router::RoomRouter;
pub use channel::types::ChannelId;
pub use connection::manager::ConnectionManager;
pub use directory::UserService;
pub use pipeline::service::MessagePipeline;
pub use presence::tracker::PresenceTracker;
pub use server::RealtimeEngine;
