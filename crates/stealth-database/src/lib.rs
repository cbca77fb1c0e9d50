//! # stealth-database
//!
//! The persistence store contract consumed by the realtime core, with a
//! PostgreSQL adapter (sqlx) and an in-memory adapter sharing the same
//! semantics.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use repositories::{MessageRepository, UserRepository};
pub use store::{MessageQuery, MessageStore, ReceiptUpdate, SortOrder, UserDirectory};
