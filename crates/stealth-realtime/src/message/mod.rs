//! Gateway wire events.

pub mod codec;
pub mod types;
pub mod view;

pub use types::{InboundEvent, OutboundEvent};
pub use view::MessageView;
