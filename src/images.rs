//! Disk-backed image store for event images.
//!
//! Uploaded files land under the configured root directory and are served
//! back by `ServeDir` mounted at `/uploads`, so the returned URL is durable
//! for the lifetime of the file.

use std::path::{Path, PathBuf};

use nanoid::nanoid;

use crate::error::AppError;

/// Formats accepted for event images.
const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "png", "webp"];

pub const URL_PREFIX: &str = "/uploads";

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores an uploaded image and returns its public URL.
    ///
    /// Fails with a validation error for unsupported file extensions and
    /// with an upstream error when the file cannot be written.
    pub async fn store(&self, filename: &str, data: &[u8]) -> Result<String, AppError> {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| {
                AppError::Validation(format!("unsupported image format: {filename}"))
            })?;

        tokio::fs::create_dir_all(&self.root).await?;
        let name = format!("{}.{}", nanoid!(10), ext);
        tokio::fs::write(self.root.join(&name), data).await?;
        Ok(format!("{URL_PREFIX}/{name}"))
    }

    /// Removes the file backing a previously returned URL.
    ///
    /// Callers treat failure as non-fatal; stale files may accumulate.
    pub async fn remove(&self, url: &str) -> std::io::Result<()> {
        let name = url.rsplit('/').next().unwrap_or(url);
        tokio::fs::remove_file(self.root.join(name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> ImageStore {
        ImageStore::new(std::env::temp_dir().join(format!("eventhub-test-{}", nanoid!(8))))
    }

    #[tokio::test]
    async fn store_writes_file_and_returns_url() {
        let store = temp_store();
        let url = store.store("party.png", b"fake png bytes").await.unwrap();

        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".png"));

        let name = url.rsplit('/').next().unwrap();
        let on_disk = tokio::fs::read(store.root().join(name)).await.unwrap();
        assert_eq!(on_disk, b"fake png bytes");
    }

    #[tokio::test]
    async fn extension_is_lowercased() {
        let store = temp_store();
        let url = store.store("photo.JPG", b"bytes").await.unwrap();
        assert!(url.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn unsupported_format_is_rejected() {
        let store = temp_store();
        let err = store.store("script.exe", b"bytes").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Only jpg/png/webp pass; the long-form jpeg spelling does not.
        let err = store.store("pic.jpeg", b"bytes").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = store.store("no-extension", b"bytes").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn remove_deletes_the_backing_file() {
        let store = temp_store();
        let url = store.store("gone.webp", b"bytes").await.unwrap();

        store.remove(&url).await.unwrap();

        let name = url.rsplit('/').next().unwrap();
        assert!(!store.root().join(name).exists());
    }

    #[tokio::test]
    async fn remove_missing_file_is_an_error_left_to_the_caller() {
        let store = temp_store();
        assert!(store.remove("/uploads/never-stored.png").await.is_err());
    }
}
