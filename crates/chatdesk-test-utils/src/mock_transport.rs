// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport and factory.
//!
//! Each `connect` builds a fresh [`MockTransport`] and hands the test a
//! [`MockLink`] holding the sending side of its signal channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use chatdesk_core::{
    Account, AccountId, AdapterType, ChatInfo, ChatdeskError, ContactProfile, HealthStatus,
    MediaPayload, PluginAdapter, SendOptions, Transport, TransportConnection, TransportEvent,
    TransportFactory, TransportSignal,
};
use tokio::sync::{Mutex, Notify, mpsc};

/// One captured outbound send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub text: String,
    pub options: SendOptions,
}

/// A transport that records sends and serves canned lookups.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<SentMessage>>,
    contacts: Mutex<HashMap<String, ContactProfile>>,
    media: Mutex<HashMap<String, MediaPayload>>,
    chats: Mutex<Vec<ChatInfo>>,
    unread: Mutex<HashMap<String, Vec<TransportEvent>>>,
    seen: Mutex<Vec<String>>,
    counter: AtomicU64,
    downloads: AtomicU32,
    destroyed: AtomicBool,
    fail_sends: AtomicBool,
    fail_media: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile returned by `contact` for this wire id.
    pub async fn set_contact(&self, profile: ContactProfile) {
        self.contacts.lock().await.insert(profile.id.clone(), profile);
    }

    /// Media returned by `download_media` for this event id.
    pub async fn set_media(&self, event_id: &str, payload: MediaPayload) {
        self.media.lock().await.insert(event_id.to_string(), payload);
    }

    /// A chat reported by `get_chats`, with the events `fetch_unread` serves.
    pub async fn add_unread_chat(&self, chat: ChatInfo, events: Vec<TransportEvent>) {
        self.unread.lock().await.insert(chat.id.clone(), events);
        self.chats.lock().await.push(chat);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_media(&self, fail: bool) {
        self.fail_media.store(fail, Ordering::SeqCst);
    }

    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// How many times `download_media` was called.
    pub fn download_count(&self) -> u32 {
        self.downloads.load(Ordering::SeqCst)
    }

    pub async fn seen_chats(&self) -> Vec<String> {
        self.seen.lock().await.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn check_alive(&self) -> Result<(), ChatdeskError> {
        if self.is_destroyed() {
            return Err(ChatdeskError::transport("transport destroyed"));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        to: &str,
        text: &str,
        options: SendOptions,
    ) -> Result<TransportEvent, ChatdeskError> {
        self.check_alive()?;
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ChatdeskError::transport("send rejected"));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent.lock().await.push(SentMessage {
            to: to.to_string(),
            text: text.to_string(),
            options: options.clone(),
        });
        Ok(TransportEvent {
            id: format!("mock-sent-{n}"),
            from: "me@c.us".to_string(),
            to: to.to_string(),
            from_me: true,
            kind: "chat".to_string(),
            body: text.to_string(),
            has_media: false,
            chat: ChatInfo {
                id: to.to_string(),
                is_group: to.ends_with("@g.us"),
                unread_count: 0,
            },
            author: None,
            location: None,
            quoted_id: options.quoted_id,
            automated: options.automated,
        })
    }

    async fn contact(&self, id: &str) -> Result<ContactProfile, ChatdeskError> {
        self.check_alive()?;
        if let Some(profile) = self.contacts.lock().await.get(id) {
            return Ok(profile.clone());
        }
        let number = id.split('@').next().unwrap_or(id).to_string();
        Ok(ContactProfile {
            id: id.to_string(),
            number,
            is_group: id.ends_with("@g.us"),
            ..ContactProfile::default()
        })
    }

    async fn download_media(
        &self,
        event: &TransportEvent,
    ) -> Result<Option<MediaPayload>, ChatdeskError> {
        self.check_alive()?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.fail_media.load(Ordering::SeqCst) {
            return Err(ChatdeskError::transport("media fetch failed"));
        }
        Ok(self.media.lock().await.get(&event.id).cloned())
    }

    async fn get_chats(&self) -> Result<Vec<ChatInfo>, ChatdeskError> {
        self.check_alive()?;
        Ok(self.chats.lock().await.clone())
    }

    async fn fetch_unread(
        &self,
        chat_id: &str,
        limit: u32,
    ) -> Result<Vec<TransportEvent>, ChatdeskError> {
        self.check_alive()?;
        let unread = self.unread.lock().await;
        let events = unread.get(chat_id).cloned().unwrap_or_default();
        let skip = events.len().saturating_sub(limit as usize);
        Ok(events.into_iter().skip(skip).collect())
    }

    async fn mark_seen(&self, chat_id: &str) -> Result<(), ChatdeskError> {
        self.check_alive()?;
        self.seen.lock().await.push(chat_id.to_string());
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ChatdeskError> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Err(ChatdeskError::transport("transport already destroyed"));
        }
        Ok(())
    }
}

/// The test's side of one connection.
#[derive(Clone)]
pub struct MockLink {
    pub account_id: AccountId,
    pub transport: Arc<MockTransport>,
    pub signals: mpsc::Sender<TransportSignal>,
}

impl MockLink {
    /// Emits a signal. Silently dropped if the session stopped listening.
    pub async fn emit(&self, signal: TransportSignal) {
        let _ = self.signals.send(signal).await;
    }

    pub async fn ready(&self) {
        self.emit(TransportSignal::Ready).await;
    }

    pub async fn message(&self, event: TransportEvent) {
        self.emit(TransportSignal::Message(event)).await;
    }
}

/// Factory that records every connection it builds.
#[derive(Default)]
pub struct MockTransportFactory {
    links: Mutex<Vec<MockLink>>,
    connected: Notify,
    failures_left: AtomicU32,
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` connect calls fail.
    pub fn fail_next_connects(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub async fn connect_count(&self) -> usize {
        self.links.lock().await.len()
    }

    pub async fn link(&self, index: usize) -> Option<MockLink> {
        self.links.lock().await.get(index).cloned()
    }

    /// Waits until the `index`-th connection (zero-based) exists.
    pub async fn wait_for_link(&self, index: usize) -> MockLink {
        loop {
            let notified = self.connected.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(link) = self.link(index).await {
                return link;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl PluginAdapter for MockTransportFactory {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatdeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChatdeskError> {
        Ok(())
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn connect(&self, account: &Account) -> Result<TransportConnection, ChatdeskError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ChatdeskError::transport("mock connect failure"));
        }

        let (tx, rx) = mpsc::channel(64);
        let transport = Arc::new(MockTransport::new());
        self.links.lock().await.push(MockLink {
            account_id: account.id,
            transport: Arc::clone(&transport),
            signals: tx,
        });
        self.connected.notify_waiters();
        Ok(TransportConnection {
            transport,
            signals: rx,
        })
    }
}
