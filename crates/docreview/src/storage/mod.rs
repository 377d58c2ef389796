//! Read access to uploaded document blobs.

pub mod filesystem;
pub mod memory;

use async_trait::async_trait;

use crate::error::StorageError;

pub use filesystem::FileBlobStore;
pub use memory::MemoryBlobStore;

/// Blob store as seen by the review pipeline. The pipeline never writes;
/// uploads and deletions belong to the surrounding layer.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, reference: &str) -> bool;

    /// Returns `StorageError::NotFound` when nothing is stored under `reference`.
    async fn read(&self, reference: &str) -> Result<Vec<u8>, StorageError>;
}
