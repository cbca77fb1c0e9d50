//! Local filesystem media store.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use stealth_core::config::MediaConfig;
use stealth_core::error::{AppError, ErrorKind};
use stealth_core::result::AppResult;

use crate::mime::{classify_mime, stored_extension};
use crate::store::{MediaStore, MediaUpload, StoredMedia};

/// Stores uploads as flat files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    public_base_url: String,
    max_upload_bytes: u64,
}

impl LocalMediaStore {
    /// Create the store, creating the root directory if needed.
    pub async fn new(config: &MediaConfig) -> AppResult<Self> {
        let root = PathBuf::from(&config.root);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create media root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn store(&self, upload: MediaUpload) -> AppResult<StoredMedia> {
        let size = upload.data.len() as u64;
        if size == 0 {
            return Err(AppError::validation("Uploaded file is empty"));
        }
        if size > self.max_upload_bytes {
            return Err(AppError::validation(format!(
                "File too large: {size} bytes (max {})",
                self.max_upload_bytes
            )));
        }

        let media_kind = classify_mime(&upload.content_type).ok_or_else(|| {
            AppError::validation(format!("Unsupported file type: {}", upload.content_type))
        })?;

        let extension = stored_extension(&upload.content_type, upload.file_name.as_deref());
        let stored_name = match extension {
            Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        };

        let path = self.root.join(&stored_name);
        fs::write(&path, &upload.data).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write media file: {stored_name}"),
                e,
            )
        })?;

        debug!(file = %stored_name, bytes = size, kind = %media_kind, "Stored media");

        Ok(StoredMedia {
            url: format!("{}/{stored_name}", self.public_base_url),
            file_name: upload.file_name.unwrap_or_else(|| stored_name.clone()),
            media_kind,
            size,
        })
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.root.is_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use stealth_entity::message::MediaKind;

    async fn store_in(dir: &tempfile::TempDir, max: u64) -> LocalMediaStore {
        LocalMediaStore::new(&MediaConfig {
            root: dir.path().to_string_lossy().to_string(),
            public_base_url: "/media/".to_string(),
            max_upload_bytes: max,
        })
        .await
        .unwrap()
    }

    fn upload(name: Option<&str>, mime: &str, data: &'static [u8]) -> MediaUpload {
        MediaUpload {
            file_name: name.map(str::to_string),
            content_type: mime.to_string(),
            data: Bytes::from_static(data),
        }
    }

    #[tokio::test]
    async fn test_store_writes_file_and_builds_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 1024).await;
        let stored = store
            .store(upload(Some("cat.PNG"), "image/png", b"\x89PNG"))
            .await
            .unwrap();

        assert_eq!(stored.media_kind, MediaKind::Image);
        assert_eq!(stored.file_name, "cat.PNG");
        assert!(stored.url.starts_with("/media/"));
        assert!(stored.url.ends_with(".png"));

        let name = stored.url.trim_start_matches("/media/");
        let written = tokio::fs::read(dir.path().join(name)).await.unwrap();
        assert_eq!(written, b"\x89PNG");
    }

    #[tokio::test]
    async fn test_extension_falls_back_to_mime() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 1024).await;
        let stored = store
            .store(upload(None, "audio/webm;codecs=opus", b"OggS"))
            .await
            .unwrap();
        assert_eq!(stored.media_kind, MediaKind::Audio);
        assert!(stored.url.ends_with(".webm"));
    }

    #[tokio::test]
    async fn test_extension_cannot_contradict_mime() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 1024).await;
        let stored = store
            .store(upload(Some("pic.html"), "image/png", b"<script>alert(1)</script>"))
            .await
            .unwrap();

        assert_eq!(stored.media_kind, MediaKind::Image);
        assert_eq!(stored.file_name, "pic.html");
        assert!(stored.url.ends_with(".png"));
        assert!(!stored.url.contains(".html"));

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            assert_eq!(entry.path().extension().unwrap(), "png");
        }
    }

    #[tokio::test]
    async fn test_rejects_oversize_and_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 4).await;

        let err = store
            .store(upload(Some("a.txt"), "text/plain", b"too long"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = store
            .store(upload(Some("a.exe"), "application/x-msdownload", b"MZ"))
            .await
            .unwrap_err();
        assert!(err.message.contains("Unsupported"));

        let err = store
            .store(upload(Some("a.txt"), "text/plain", b""))
            .await
            .unwrap_err();
        assert!(err.message.contains("empty"));
    }
}
