// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport capability: one connected messaging client per account.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ChatdeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Account, AccountId, ChatInfo, ContactProfile, MediaPayload, SendOptions, TransportEvent,
    TransportSignal,
};

/// A connected messaging client.
///
/// Lifecycle and content notifications arrive on the signal channel returned
/// by [`TransportFactory::connect`]; this trait covers the request side.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends a text and returns the event describing the sent message.
    async fn send(
        &self,
        to: &str,
        text: &str,
        options: SendOptions,
    ) -> Result<TransportEvent, ChatdeskError>;

    /// Looks up profile information for a wire id.
    async fn contact(&self, id: &str) -> Result<ContactProfile, ChatdeskError>;

    /// Downloads the media attached to an event. `Ok(None)` means the
    /// transport had nothing to give.
    async fn download_media(
        &self,
        event: &TransportEvent,
    ) -> Result<Option<MediaPayload>, ChatdeskError>;

    async fn get_chats(&self) -> Result<Vec<ChatInfo>, ChatdeskError>;

    /// The latest `limit` messages of a chat.
    async fn fetch_unread(
        &self,
        chat_id: &str,
        limit: u32,
    ) -> Result<Vec<TransportEvent>, ChatdeskError>;

    async fn mark_seen(&self, chat_id: &str) -> Result<(), ChatdeskError>;

    /// Terminates the client. Further calls fail.
    async fn destroy(&self) -> Result<(), ChatdeskError>;
}

/// A freshly constructed transport and its signal stream.
pub struct TransportConnection {
    pub transport: Arc<dyn Transport>,
    pub signals: mpsc::Receiver<TransportSignal>,
}

/// Builds brand-new transports; every (re)connect goes through here.
#[async_trait]
pub trait TransportFactory: PluginAdapter {
    async fn connect(&self, account: &Account) -> Result<TransportConnection, ChatdeskError>;
}

/// A live session as handed to event consumers and callers of `get`.
#[derive(Clone)]
pub struct SessionHandle {
    pub account_id: AccountId,
    pub transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}
