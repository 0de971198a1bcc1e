// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock responder with pre-configured replies.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chatdesk_core::{
    AdapterType, ChatdeskError, HealthStatus, HistoryEntry, PhaseContext, PluginAdapter,
    ResponderAction, ResponderAdapter, ResponderReply,
};
use tokio::sync::Mutex;

/// One captured `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponderCall {
    pub prompt: String,
    pub history: Vec<HistoryEntry>,
    pub context: PhaseContext,
}

/// Replies are popped from a FIFO queue. When the queue is empty a plain
/// "mock reply" text with no action is returned.
pub struct MockResponder {
    replies: Mutex<VecDeque<Result<ResponderReply, String>>>,
    calls: Mutex<Vec<ResponderCall>>,
    configured: bool,
    delay: Option<Duration>,
}

impl MockResponder {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            configured: true,
            delay: None,
        }
    }

    /// A responder reporting itself as not configured.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// Sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn push_reply(&self, text: Option<&str>, action: ResponderAction) {
        self.replies.lock().await.push_back(Ok(ResponderReply {
            text: text.map(str::to_string),
            action,
        }));
    }

    pub async fn push_error(&self, message: &str) {
        self.replies.lock().await.push_back(Err(message.to_string()));
    }

    pub async fn calls(&self) -> Vec<ResponderCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockResponder {
    fn name(&self) -> &str {
        "mock-responder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Responder
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatdeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChatdeskError> {
        Ok(())
    }
}

#[async_trait]
impl ResponderAdapter for MockResponder {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(
        &self,
        prompt: &str,
        history: &[HistoryEntry],
        context: PhaseContext,
    ) -> Result<ResponderReply, ChatdeskError> {
        self.calls.lock().await.push(ResponderCall {
            prompt: prompt.to_string(),
            history: history.to_vec(),
            context,
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.replies.lock().await.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ChatdeskError::ResponderUnavailable {
                message,
                source: None,
            }),
            None => Ok(ResponderReply {
                text: Some("mock reply".to_string()),
                action: ResponderAction::None,
            }),
        }
    }
}
