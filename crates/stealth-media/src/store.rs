//! Media store trait.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use stealth_core::result::AppResult;
use stealth_entity::message::MediaKind;

/// One uploaded file as received from a client.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    /// Client-supplied file name, if any.
    pub file_name: Option<String>,
    /// Declared MIME type.
    pub content_type: String,
    /// File contents.
    pub data: Bytes,
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMedia {
    /// Retrievable URL.
    pub url: String,
    /// Original file name (or the stored name when none was given).
    pub file_name: String,
    /// Classified media kind.
    pub media_kind: MediaKind,
    /// Size in bytes.
    pub size: u64,
}

/// Pluggable media backend.
#[async_trait]
pub trait MediaStore: Send + Sync + std::fmt::Debug + 'static {
    /// Validate and persist an upload.
    async fn store(&self, upload: MediaUpload) -> AppResult<StoredMedia>;

    /// Check that the backend can accept writes.
    async fn health_check(&self) -> AppResult<bool>;
}
