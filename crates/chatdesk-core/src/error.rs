// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every chatdesk crate.

use thiserror::Error;

/// The error type returned by session, ingestion, and adapter operations.
#[derive(Debug, Error)]
pub enum ChatdeskError {
    /// Configuration errors (invalid TOML, missing fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No live session is registered for the account. Recoverable by
    /// starting one.
    #[error("no live session for account {account_id}")]
    NotInitialized { account_id: i64 },

    /// The transport rejected the credentials for this start attempt.
    #[error("session authentication failed for account {account_id}: {reason}")]
    SessionAuthFailure { account_id: i64, reason: String },

    /// The session went away before the requested operation completed.
    #[error("session closed for account {account_id}: {reason}")]
    SessionClosed { account_id: i64, reason: String },

    /// A media payload was announced but could not be downloaded.
    #[error("media download failed for event {event_id}")]
    MediaDownloadFailed {
        event_id: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The automated responder could not produce an answer.
    #[error("responder unavailable: {message}")]
    ResponderUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transport errors (socket failure, protocol violation, send rejected).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatdeskError {
    /// Shorthand for a [`ChatdeskError::Transport`] without an underlying cause.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Whether retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Timeout { .. }
                | Self::NotInitialized { .. }
                | Self::SessionClosed { .. }
        )
    }

    /// Whether the error concerns the session as a whole rather than a
    /// single event.
    pub fn is_session_scoped(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized { .. }
                | Self::SessionAuthFailure { .. }
                | Self::SessionClosed { .. }
        )
    }
}
