use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage::BlobStore;

/// Blobs stored as files below an upload root, addressed by relative refs
/// such as `uploads/jobs/{job_id}/agency_invoice/invoice.pdf`.
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a ref to a path under the root, rejecting absolute refs and any
    /// `..` component.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let invalid = |reason: &str| StorageError::InvalidRef {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        if reference.trim().is_empty() {
            return Err(invalid("reference is empty"));
        }

        let relative = Path::new(reference);
        let mut clean = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => clean.push(part),
                Component::CurDir => {}
                Component::ParentDir => return Err(invalid("parent traversal is not allowed")),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("absolute paths are not allowed"))
                }
            }
        }

        if clean.as_os_str().is_empty() {
            return Err(invalid("reference has no file component"));
        }

        Ok(self.root.join(clean))
    }

    /// Writes a blob, creating parent directories as needed.
    pub async fn save(&self, reference: &str, content: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(reference)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::WriteFile {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| StorageError::WriteFile { path, source: e })
    }

    /// Deletes a blob. Returns `false` when there was nothing to delete.
    pub async fn delete(&self, reference: &str) -> Result<bool, StorageError> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::WriteFile { path, source: e }),
        }
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn exists(&self, reference: &str) -> bool {
        match self.resolve(reference) {
            Ok(path) => tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn read(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(reference)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(reference.to_string()))
            }
            Err(e) => Err(StorageError::ReadFile { path, source: e }),
        }
    }
}
