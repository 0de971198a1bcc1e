// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process real-time push hub.

use chatdesk_core::{PushChannel, PushEvent, PushPublisher};
use tokio::sync::broadcast;
use tracing::trace;

/// A push notification with its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub channel: PushChannel,
    pub event: PushEvent,
}

/// Fans push events out to every subscriber. Slow subscribers lag and lose
/// the oldest events; publishing never blocks.
#[derive(Clone)]
pub struct PushHub {
    tx: broadcast::Sender<PushMessage>,
}

impl PushHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PushMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PushHub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl PushPublisher for PushHub {
    fn publish(&self, channel: PushChannel, event: PushEvent) {
        trace!(%channel, "push");
        let _ = self.tx.send(PushMessage { channel, event });
    }
}
