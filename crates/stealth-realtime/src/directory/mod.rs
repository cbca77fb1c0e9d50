//! User directory operations exposed to the HTTP layer.

pub mod service;

pub use service::UserService;
