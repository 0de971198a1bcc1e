// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Observers notified on every accepted lifecycle transition.

use std::sync::Arc;

use async_trait::async_trait;
use chatdesk_core::{
    AccountStatusUpdate, ErrorReporter, PushChannel, PushEvent, PushPublisher, StorageAdapter,
};
use tracing::{debug, warn};

use crate::state::{SessionSnapshot, Transition};

/// Reacts to a session changing state. Observers must not fail the
/// transition; they log and move on.
#[async_trait]
pub trait SessionObserver: Send + Sync + 'static {
    async fn on_transition(&self, snapshot: &SessionSnapshot, transition: &Transition);
}

/// Persists status, QR payload, and retry counter on the account record.
pub struct StoreStatusObserver {
    store: Arc<dyn StorageAdapter>,
    reporter: Option<Arc<dyn ErrorReporter>>,
}

impl StoreStatusObserver {
    pub fn new(store: Arc<dyn StorageAdapter>) -> Self {
        Self {
            store,
            reporter: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }
}

#[async_trait]
impl SessionObserver for StoreStatusObserver {
    async fn on_transition(&self, snapshot: &SessionSnapshot, _transition: &Transition) {
        let update = AccountStatusUpdate {
            status: snapshot.state.account_status(),
            qrcode: snapshot.qrcode.clone(),
            retries: snapshot.retries,
        };
        if let Err(e) = self
            .store
            .update_account_status(snapshot.account_id, &update)
            .await
        {
            warn!(account_id = snapshot.account_id, error = %e, "failed to persist session status");
            if let Some(reporter) = &self.reporter {
                reporter.report("session", &e);
            }
        }
    }
}

/// Pushes a `session_updated` event to connected clients.
pub struct PushObserver {
    push: Arc<dyn PushPublisher>,
}

impl PushObserver {
    pub fn new(push: Arc<dyn PushPublisher>) -> Self {
        Self { push }
    }
}

#[async_trait]
impl SessionObserver for PushObserver {
    async fn on_transition(&self, snapshot: &SessionSnapshot, _transition: &Transition) {
        self.push.publish(
            PushChannel::Sessions,
            PushEvent::SessionUpdated {
                account_id: snapshot.account_id,
                status: snapshot.state.account_status(),
                qrcode: snapshot.qrcode.clone(),
                retries: snapshot.retries,
            },
        );
    }
}

/// Logs every transition at debug level.
pub struct LogObserver;

#[async_trait]
impl SessionObserver for LogObserver {
    async fn on_transition(&self, snapshot: &SessionSnapshot, transition: &Transition) {
        debug!(
            account_id = snapshot.account_id,
            from = %transition.from,
            to = %transition.to,
            retries = snapshot.retries,
            "session state changed"
        );
    }
}
