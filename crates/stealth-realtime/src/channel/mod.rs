//! Channel system: identity-scoped and pairwise conversation channels.

pub mod registry;
pub mod router;
pub mod subscription;
pub mod types;

pub use registry::ChannelRegistry;
pub use router::RoomRouter;
pub use types::{ChannelId, ChannelType};
