pub mod s3;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWrite;

pub use s3::S3Store;

/// The object-store operations the backup workflow relies on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_file(&self, bucket: &str, key: &str, file_path: &Path) -> Result<()>;

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// All keys under `prefix`, in whatever order the backend returns them.
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Writes the object to `sink` one chunk at a time. Returns the byte count.
    async fn stream_to(
        &self,
        bucket: &str,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64>;
}
