//! Filesystem-backed media storage.

use async_trait::async_trait;
use fabula_error::{FabulaResult, StorageError, StorageErrorKind};
use fabula_interface::MediaStorage;
use std::path::{Component, Path, PathBuf};

/// [`MediaStorage`] rooted in a local directory.
///
/// Keys are slash-separated relative paths (`stories/3/cover.jpg`).
/// Served URLs are the key appended to a configured public base.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root: PathBuf,
    public_base_url: String,
}

impl FilesystemStorage {
    /// Create storage rooted at `root`, serving from `public_base_url`.
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Resolve a key inside the root, rejecting traversal.
    fn resolve(&self, key: &str) -> FabulaResult<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if escapes || key.is_empty() {
            return Err(StorageError::new(StorageErrorKind::InvalidKey(key.to_string())).into());
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStorage for FilesystemStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> FabulaResult<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::Write {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            })?;
        }
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            StorageError::new(StorageErrorKind::Write {
                key: key.to_string(),
                message: e.to_string(),
            })
        })?;
        tracing::debug!(key, "stored media object");
        Ok(())
    }

    async fn url(&self, key: &str) -> FabulaResult<String> {
        self.resolve(key)?;
        Ok(format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            key
        ))
    }

    async fn delete_prefix(&self, prefix: &str) -> FabulaResult<()> {
        let path = self.resolve(prefix)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => {
                tokio::fs::remove_dir_all(&path).await.map_err(|e| {
                    StorageError::new(StorageErrorKind::Delete {
                        prefix: prefix.to_string(),
                        message: e.to_string(),
                    })
                })?;
            }
            Ok(_) => {
                tokio::fs::remove_file(&path).await.map_err(|e| {
                    StorageError::new(StorageErrorKind::Delete {
                        prefix: prefix.to_string(),
                        message: e.to_string(),
                    })
                })?;
            }
            // Deleting something already gone is not an error.
            Err(_) => {}
        }
        Ok(())
    }
}
