//! # stealth-media
//!
//! Media/attachment collaborator: accepts raw upload bytes, classifies
//! them into a [`MediaKind`](stealth_entity::message::MediaKind), and
//! returns a durable URL the chat core can reference.

pub mod local;
pub mod mime;
pub mod store;

pub use local::LocalMediaStore;
pub use mime::classify_mime;
pub use store::{MediaStore, MediaUpload, StoredMedia};
