// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem blob store for downloaded media.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chatdesk_core::{BlobStore, ChatdeskError};
use tracing::debug;

/// Writes blobs as files under one directory. The reference returned is the
/// bare file name.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String, ChatdeskError> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ChatdeskError::Internal(format!("invalid blob name `{filename}`")))?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ChatdeskError::Storage {
                source: Box::new(e),
            })?;
        let path = self.root.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ChatdeskError::Storage {
                source: Box::new(e),
            })?;

        debug!(path = %path.display(), size = bytes.len(), "blob saved");
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_under_root_and_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("media"));

        let reference = store.save("../../etc/photo.jpg", b"jpeg").await.unwrap();
        assert_eq!(reference, "photo.jpg");
        let written = std::fs::read(dir.path().join("media/photo.jpg")).unwrap();
        assert_eq!(written, b"jpeg");
    }

    #[tokio::test]
    async fn rejects_empty_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        assert!(store.save("..", b"x").await.is_err());
    }
}
