//! The message pipeline: validate, persist, fan out, and advance receipts.

pub mod service;
pub mod validator;

pub use service::{HistoryResult, MessagePipeline};
pub use validator::{ValidatedSend, validate_send};
