use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage::BlobStore;

/// In-process blob store for tests and embedding.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, reference: impl Into<String>, content: impl Into<Vec<u8>>) {
        let mut blobs = match self.blobs.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Blob store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        blobs.insert(reference.into(), content.into());
    }

    pub fn remove(&self, reference: &str) -> bool {
        match self.blobs.write() {
            Ok(mut blobs) => blobs.remove(reference).is_some(),
            Err(poisoned) => poisoned.into_inner().remove(reference).is_some(),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn exists(&self, reference: &str) -> bool {
        match self.blobs.read() {
            Ok(blobs) => blobs.contains_key(reference),
            Err(poisoned) => poisoned.into_inner().contains_key(reference),
        }
    }

    async fn read(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        let blobs = match self.blobs.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        blobs
            .get(reference)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(reference.to_string()))
    }
}
