use std::path::PathBuf;

use crate::api::error;

/// Persists raw bytes and returns a stable reference URL.
#[async_trait::async_trait]
pub trait AttachmentStore {
    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<String, error::SystemError>;
}

#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    upload_dir: PathBuf,
    base_url: String,
}

impl LocalDiskStore {
    pub fn new(upload_dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self { upload_dir: upload_dir.into(), base_url: base_url.into() }
    }
}

#[async_trait::async_trait]
impl AttachmentStore for LocalDiskStore {
    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<String, error::SystemError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(self.upload_dir.join(filename), bytes).await?;
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), filename))
    }
}
