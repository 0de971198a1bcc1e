// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery/read acknowledgement tracking.

use std::sync::Arc;
use std::time::Duration;

use chatdesk_core::{
    AckLevel, ErrorReporter, MessageView, PushChannel, PushEvent, PushPublisher, StorageAdapter,
};
use tracing::debug;

/// Applies ack updates to stored messages and pushes the change.
pub struct AckTracker {
    store: Arc<dyn StorageAdapter>,
    push: Arc<dyn PushPublisher>,
    reporter: Arc<dyn ErrorReporter>,
    delay: Duration,
}

impl AckTracker {
    /// `delay` is waited before the lookup so an ack racing the original
    /// write still finds the message.
    pub fn new(
        store: Arc<dyn StorageAdapter>,
        push: Arc<dyn PushPublisher>,
        reporter: Arc<dyn ErrorReporter>,
        delay: Duration,
    ) -> Self {
        Self {
            store,
            push,
            reporter,
            delay,
        }
    }

    /// Returns the updated message, or `None` if it is unknown or the
    /// update failed.
    pub async fn handle(&self, event_id: &str, level: AckLevel) -> Option<MessageView> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.store.update_message_ack(event_id, level).await {
            Ok(Some(view)) => {
                debug!(event_id, ?level, ticket_id = view.message.ticket_id, "ack applied");
                self.push.publish(
                    PushChannel::Ticket(view.message.ticket_id),
                    PushEvent::MessageUpdated { view: view.clone() },
                );
                Some(view)
            }
            Ok(None) => {
                debug!(event_id, "ack for unknown message ignored");
                None
            }
            Err(e) => {
                self.reporter.report("ack", &e);
                None
            }
        }
    }
}
