// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`StorageAdapter`].

use std::time::Duration;

use async_trait::async_trait;
use chatdesk_config::model::{AccountConfig, StorageConfig};
use chatdesk_core::{
    Account, AccountId, AccountStatusUpdate, AckLevel, AdapterType, ChatdeskError, Contact,
    ContactId, HealthStatus, Message, MessageView, NewContact, NewMessage, PluginAdapter, Queue,
    StorageAdapter, Ticket, TicketId, TicketUpdate,
};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::database::{Database, map_tr_err};
use crate::queries;
use crate::queries::tickets::TicketLookup;

/// SQLite-backed store.
///
/// The database is opened on [`StorageAdapter::initialize`]; every other call
/// fails with a storage error until then.
pub struct SqliteStore {
    config: StorageConfig,
    reopen_window: Duration,
    db: OnceCell<Database>,
}

impl SqliteStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            reopen_window: Duration::from_secs(2 * 3600),
            db: OnceCell::new(),
        }
    }

    /// Sets how long a non-group contact's last ticket stays reusable.
    pub fn with_reopen_window(mut self, window: Duration) -> Self {
        self.reopen_window = window;
        self
    }

    fn db(&self) -> Result<&Database, ChatdeskError> {
        self.db.get().ok_or_else(|| ChatdeskError::Storage {
            source: "storage not initialized, call initialize() first".into(),
        })
    }

    /// Upserts configured accounts and their queues.
    pub async fn sync_accounts(&self, accounts: &[AccountConfig]) -> Result<(), ChatdeskError> {
        queries::accounts::sync_accounts(self.db()?, accounts).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatdeskError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChatdeskError> {
        self.close().await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStore {
    async fn initialize(&self) -> Result<(), ChatdeskError> {
        let path = self.config.database_path.clone();
        let wal = self.config.wal_mode;
        self.db
            .get_or_try_init(|| async move { Database::open(&path, wal).await })
            .await?;
        debug!(path = %self.config.database_path, "sqlite store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ChatdeskError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
        }
        Ok(())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, ChatdeskError> {
        queries::accounts::get_account(self.db()?, id).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, ChatdeskError> {
        queries::accounts::list_accounts(self.db()?).await
    }

    async fn update_account_status(
        &self,
        id: AccountId,
        update: &AccountStatusUpdate,
    ) -> Result<(), ChatdeskError> {
        queries::accounts::update_account_status(self.db()?, id, update).await
    }

    async fn queues_for_account(&self, id: AccountId) -> Result<Vec<Queue>, ChatdeskError> {
        queries::accounts::queues_for_account(self.db()?, id).await
    }

    async fn upsert_contact(&self, contact: &NewContact) -> Result<Contact, ChatdeskError> {
        queries::contacts::upsert_contact(self.db()?, contact).await
    }

    async fn create_contact(&self, contact: &NewContact) -> Result<Option<Contact>, ChatdeskError> {
        queries::contacts::create_contact(self.db()?, contact).await
    }

    async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>, ChatdeskError> {
        queries::contacts::get_contact(self.db()?, id).await
    }

    async fn find_or_create_ticket(
        &self,
        contact: &Contact,
        account_id: AccountId,
        unread_messages: u32,
        group_contact: Option<&Contact>,
    ) -> Result<Ticket, ChatdeskError> {
        queries::tickets::find_or_create(
            self.db()?,
            TicketLookup {
                account_id,
                contact_id: contact.id,
                unread_messages,
                group_contact_id: group_contact.map(|g| g.id),
                reopen_window: self.reopen_window,
            },
        )
        .await
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>, ChatdeskError> {
        queries::tickets::get_ticket(self.db()?, id).await
    }

    async fn update_ticket(
        &self,
        id: TicketId,
        update: &TicketUpdate,
    ) -> Result<Ticket, ChatdeskError> {
        queries::tickets::update_ticket(self.db()?, id, update).await
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<bool, ChatdeskError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, ChatdeskError> {
        queries::messages::get_message(self.db()?, id).await
    }

    async fn recent_messages(
        &self,
        ticket_id: TicketId,
        limit: usize,
    ) -> Result<Vec<Message>, ChatdeskError> {
        queries::messages::recent_messages(self.db()?, ticket_id, limit).await
    }

    async fn update_message_ack(
        &self,
        id: &str,
        ack: AckLevel,
    ) -> Result<Option<MessageView>, ChatdeskError> {
        queries::messages::update_ack(self.db()?, id, ack).await
    }
}
