//! Shared domain value types.

pub mod id;
pub mod pagination;

pub use id::{MessageId, UserId};
pub use pagination::HistoryPage;
