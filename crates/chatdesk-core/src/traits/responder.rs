// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Responder capability: generates automated replies.

use async_trait::async_trait;

use crate::error::ChatdeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{HistoryEntry, PhaseContext, ResponderReply};

/// Produces a reply (or nothing) plus an optional control action for one
/// customer message.
#[async_trait]
pub trait ResponderAdapter: PluginAdapter {
    /// Whether the responder has what it needs (credentials, model) to run.
    fn is_configured(&self) -> bool;

    /// Generates a reply to `prompt` given the prior conversation.
    async fn generate(
        &self,
        prompt: &str,
        history: &[HistoryEntry],
        context: PhaseContext,
    ) -> Result<ResponderReply, ChatdeskError>;
}
