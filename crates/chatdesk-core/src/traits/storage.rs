// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store capability: the record operations the session and ingestion layers
//! rely on.

use async_trait::async_trait;

use crate::error::ChatdeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Account, AccountId, AccountStatusUpdate, AckLevel, Contact, ContactId, Message, MessageView,
    NewContact, NewMessage, Queue, Ticket, TicketId, TicketUpdate,
};

/// Persistence backend for accounts, queues, contacts, tickets, and messages.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the backend (connection, migrations).
    async fn initialize(&self) -> Result<(), ChatdeskError>;

    /// Closes the backend, flushing pending writes.
    async fn close(&self) -> Result<(), ChatdeskError>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, ChatdeskError>;

    async fn list_accounts(&self) -> Result<Vec<Account>, ChatdeskError>;

    /// Persists connectivity fields written by session observers.
    async fn update_account_status(
        &self,
        id: AccountId,
        update: &AccountStatusUpdate,
    ) -> Result<(), ChatdeskError>;

    /// Queues attached to the account, in menu order.
    async fn queues_for_account(&self, id: AccountId) -> Result<Vec<Queue>, ChatdeskError>;

    /// Creates the contact or refreshes name and picture of an existing one
    /// with the same number.
    async fn upsert_contact(&self, contact: &NewContact) -> Result<Contact, ChatdeskError>;

    /// Inserts the contact only if its number is unknown; `None` otherwise.
    async fn create_contact(&self, contact: &NewContact)
    -> Result<Option<Contact>, ChatdeskError>;

    async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>, ChatdeskError>;

    /// Returns the open or pending ticket for (account, contact), reusing a
    /// recent one or creating a new one. Never creates a second open/pending
    /// ticket for the same pair.
    async fn find_or_create_ticket(
        &self,
        contact: &Contact,
        account_id: AccountId,
        unread_messages: u32,
        group_contact: Option<&Contact>,
    ) -> Result<Ticket, ChatdeskError>;

    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>, ChatdeskError>;

    /// Applies a partial update and returns the updated ticket.
    async fn update_ticket(
        &self,
        id: TicketId,
        update: &TicketUpdate,
    ) -> Result<Ticket, ChatdeskError>;

    /// Inserts a message keyed by its transport id. Returns `false` when a
    /// message with that id already exists (nothing is written).
    async fn insert_message(&self, message: &NewMessage) -> Result<bool, ChatdeskError>;

    async fn get_message(&self, id: &str) -> Result<Option<Message>, ChatdeskError>;

    /// The latest `limit` messages of a ticket, oldest first.
    async fn recent_messages(
        &self,
        ticket_id: TicketId,
        limit: usize,
    ) -> Result<Vec<Message>, ChatdeskError>;

    /// Updates the ack level of a message and returns it with its contact and
    /// quoted message, or `None` if no such message exists.
    async fn update_message_ack(
        &self,
        id: &str,
        ack: AckLevel,
    ) -> Result<Option<MessageView>, ChatdeskError>;
}
