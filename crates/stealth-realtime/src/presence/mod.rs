//! Presence tracking and last-seen formatting.

pub mod last_seen;
pub mod reaper;
pub mod tracker;

pub use last_seen::format_last_seen;
pub use reaper::PresenceReaper;
pub use tracker::{PresenceTracker, Release};
