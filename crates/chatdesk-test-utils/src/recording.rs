// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capturing implementations of the side-effect traits.

use std::collections::HashMap;
use std::sync::{Mutex as StdMutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chatdesk_core::{
    AccountId, AckLevel, BlobStore, ChatdeskError, ErrorReporter, EventSink, PushChannel,
    PushEvent, PushPublisher, SessionHandle, TransportEvent,
};
use tokio::sync::{Mutex, Notify};

/// Records every published push event.
#[derive(Default)]
pub struct RecordingPush {
    events: StdMutex<Vec<(PushChannel, PushEvent)>>,
}

impl RecordingPush {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(PushChannel, PushEvent)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn on_channel(&self, channel: &PushChannel) -> Vec<PushEvent> {
        self.events()
            .into_iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, e)| e)
            .collect()
    }
}

impl PushPublisher for RecordingPush {
    fn publish(&self, channel: PushChannel, event: PushEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((channel, event));
    }
}

/// Records reported errors as `(component, message)`.
#[derive(Default)]
pub struct RecordingReporter {
    reports: StdMutex<Vec<(&'static str, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(&'static str, String)> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, component: &'static str, error: &ChatdeskError) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((component, error.to_string()));
    }
}

/// Keeps saved media in memory, keyed by the returned name.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub async fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.blobs.lock().await.get(name).cloned()
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.blobs.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String, ChatdeskError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChatdeskError::Storage {
                source: "disk full".into(),
            });
        }
        self.blobs
            .lock()
            .await
            .insert(filename.to_string(), bytes.to_vec());
        Ok(filename.to_string())
    }
}

/// Event sink that only records what the session layer delivers.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(AccountId, TransportEvent)>>,
    acks: Mutex<Vec<(AccountId, String, AckLevel)>>,
    delivered: Notify,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<(AccountId, TransportEvent)> {
        self.messages.lock().await.clone()
    }

    pub async fn acks(&self) -> Vec<(AccountId, String, AckLevel)> {
        self.acks.lock().await.clone()
    }

    /// Waits until at least `n` messages arrived, or the timeout passes.
    /// Returns whether the count was reached.
    pub async fn wait_for_messages(&self, n: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.delivered.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.messages.lock().await.len() >= n {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn on_message(&self, session: &SessionHandle, event: TransportEvent) {
        self.messages.lock().await.push((session.account_id, event));
        self.delivered.notify_waiters();
    }

    async fn on_ack(&self, session: &SessionHandle, event_id: String, level: AckLevel) {
        self.acks
            .lock()
            .await
            .push((session.account_id, event_id, level));
        self.delivered.notify_waiters();
    }
}
