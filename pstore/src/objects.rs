//! Filesystem-backed object storage for generated images and uploads.

use std::path::{Component, Path, PathBuf};

use pchat::{ChatError, ObjectStorage, StoredObject};
use pcommon::BoxFuture;

use crate::StoreError;

#[derive(Debug, Clone)]
pub struct FilesystemObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl FilesystemObjectStorage {
    /// Objects under `root` are served from `public_base_url`.
    pub fn new(root: impl AsRef<Path>, public_base_url: impl Into<String>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|error| {
            StoreError::storage(format!("failed to create object storage root: {error}"))
        })?;
        Ok(Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url)
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(StoreError::invalid_request(format!(
                "invalid object key: '{key}'"
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStorage for FilesystemObjectStorage {
    fn put<'a>(
        &'a self,
        key: &'a str,
        bytes: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<StoredObject, ChatError>> {
        Box::pin(async move {
            let path = self.object_path(key)?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|error| {
                    StoreError::storage(format!("failed to create object directory: {error}"))
                })?;
            }

            let tmp = path.with_extension("part");
            tokio::fs::write(&tmp, &bytes).await.map_err(|error| {
                StoreError::storage(format!("failed to write object: {error}"))
            })?;
            tokio::fs::rename(&tmp, &path).await.map_err(|error| {
                StoreError::storage(format!("failed to finalize object: {error}"))
            })?;

            tracing::debug!(key, content_type, size = bytes.len(), "stored object");
            Ok(StoredObject {
                url: self.public_url(key),
                key: key.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn temp_root() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        std::env::temp_dir().join(format!("pstore-objects-{nanos}"))
    }

    #[tokio::test]
    async fn put_writes_bytes_and_returns_public_url() {
        let root = temp_root();
        let storage =
            FilesystemObjectStorage::new(&root, "http://localhost:3000/files/").expect("storage");

        let stored = storage
            .put("uploads/cat.png", vec![1, 2, 3], "image/png")
            .await
            .expect("put");

        assert_eq!(stored.url, "http://localhost:3000/files/uploads/cat.png");
        assert_eq!(stored.key, "uploads/cat.png");
        let bytes = std::fs::read(root.join("uploads/cat.png")).expect("read back");
        assert_eq!(bytes, vec![1, 2, 3]);
        assert!(!root.join("uploads/cat.part").exists());

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_root() {
        let root = temp_root();
        let storage = FilesystemObjectStorage::new(&root, "http://files").expect("storage");

        for key in ["../evil.png", "/etc/passwd", "uploads/../../x", ""] {
            let error = storage
                .put(key, vec![0], "image/png")
                .await
                .expect_err("escaping key");
            assert_eq!(error.kind, pchat::ChatErrorKind::InvalidRequest, "{key}");
        }

        let _ = std::fs::remove_dir_all(root);
    }
}
