// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Small capabilities the core pipeline hands its side effects to.

use async_trait::async_trait;

use crate::error::ChatdeskError;
use crate::traits::transport::SessionHandle;
use crate::types::{AckLevel, PushChannel, PushEvent, TransportEvent};

/// Consumer of content events from a ready session.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    async fn on_message(&self, session: &SessionHandle, event: TransportEvent);

    async fn on_ack(&self, session: &SessionHandle, event_id: String, level: AckLevel);
}

/// Real-time push to connected UIs. Fire and forget.
pub trait PushPublisher: Send + Sync + 'static {
    fn publish(&self, channel: PushChannel, event: PushEvent);
}

/// Stores bytes and returns a reference to them.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String, ChatdeskError>;
}

/// External error tracking.
pub trait ErrorReporter: Send + Sync + 'static {
    fn report(&self, component: &'static str, error: &ChatdeskError);
}
