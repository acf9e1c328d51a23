use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use crate::{error::Result, types::FileMetadata};

/// Body of a download, yielded chunk by chunk
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Read-only view of a remote file hierarchy
///
/// Implementors wrap an authorized session against a backend (Google Drive
/// in production, in-memory trees in tests).
#[async_trait]
pub trait RemoteFilesystem: Send + Sync {
    /// List the entries whose parent is `folder_id`
    ///
    /// An empty folder is `Ok(vec![])`. A failed call must be an error so
    /// callers can tell the two apart.
    async fn list_children(&self, folder_id: &str) -> Result<Vec<FileMetadata>>;

    /// Open the raw content of a file as a byte stream
    async fn download(&self, file_id: &str) -> Result<ByteStream>;

    /// Get a human-readable identifier for this backend (for logging/debugging)
    fn identifier(&self) -> String;
}
