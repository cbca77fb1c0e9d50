//! Message domain entities.

pub mod kind;
pub mod model;
pub mod receipt;

pub use kind::{MediaKind, MessageType};
pub use model::{Attachment, Message, MessageContent, NewMessage};
pub use receipt::ReceiptPatch;
