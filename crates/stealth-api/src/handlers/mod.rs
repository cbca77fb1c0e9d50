//! Request handlers.

pub mod health;
pub mod media;
pub mod message;
pub mod user;
pub mod ws;
