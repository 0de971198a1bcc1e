// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A migrated SQLite store in a throwaway directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chatdesk_config::model::{AccountConfig, StorageConfig};
use chatdesk_core::{ChatdeskError, StorageAdapter};
use chatdesk_storage::SqliteStore;
use tempfile::TempDir;

/// Keeps the temp directory alive as long as the store is in use.
pub struct TestStore {
    pub store: Arc<SqliteStore>,
    pub media_dir: PathBuf,
    _dir: TempDir,
}

impl TestStore {
    /// Opens a fresh store and syncs the given accounts into it.
    pub async fn new(accounts: &[AccountConfig]) -> Result<Self, ChatdeskError> {
        Self::with_reopen_window(accounts, Duration::from_secs(2 * 3600)).await
    }

    pub async fn with_reopen_window(
        accounts: &[AccountConfig],
        window: Duration,
    ) -> Result<Self, ChatdeskError> {
        let dir = TempDir::new().map_err(|e| ChatdeskError::Storage { source: e.into() })?;
        let media_dir = dir.path().join("media");
        let config = StorageConfig {
            database_path: dir.path().join("test.db").to_string_lossy().to_string(),
            media_dir: media_dir.to_string_lossy().to_string(),
            wal_mode: true,
        };
        let store = SqliteStore::new(config).with_reopen_window(window);
        store.initialize().await?;
        store.sync_accounts(accounts).await?;
        Ok(Self {
            store: Arc::new(store),
            media_dir,
            _dir: dir,
        })
    }

    /// The store as a trait object.
    pub fn adapter(&self) -> Arc<dyn StorageAdapter> {
        self.store.clone()
    }
}
