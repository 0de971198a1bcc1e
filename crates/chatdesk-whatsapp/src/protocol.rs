// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON frames exchanged with the messaging-client sidecar.
//!
//! Requests carry a `request_id` the sidecar echoes on its response.
//! Everything else the sidecar sends is an unsolicited event.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chatdesk_core::{AckLevel, ChatdeskError, MediaPayload, TransportEvent, TransportSignal};
use serde::{Deserialize, Serialize};

/// A call into the sidecar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum Call {
    /// Boots the messaging client for an account on this socket.
    Start { account_id: i64, name: String },
    Send {
        to: String,
        text: String,
        /// Echoed back on the resulting message event.
        automated: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        quoted_id: Option<String>,
    },
    Contact { id: String },
    DownloadMedia { message_id: String },
    GetChats,
    FetchUnread { chat_id: String, limit: u32 },
    MarkSeen { chat_id: String },
    Destroy,
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Send { .. } => "send",
            Self::Contact { .. } => "contact",
            Self::DownloadMedia { .. } => "download_media",
            Self::GetChats => "get_chats",
            Self::FetchUnread { .. } => "fetch_unread",
            Self::MarkSeen { .. } => "mark_seen",
            Self::Destroy => "destroy",
        }
    }
}

/// Outbound request frame.
#[derive(Debug, Clone, Serialize)]
pub struct RequestFrame<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub request_id: &'a str,
    #[serde(flatten)]
    pub call: &'a Call,
}

impl<'a> RequestFrame<'a> {
    pub fn new(request_id: &'a str, call: &'a Call) -> Self {
        Self {
            kind: "request",
            request_id,
            call,
        }
    }
}

/// Anything the sidecar sends.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    Response {
        request_id: String,
        #[serde(default)]
        result: serde_json::Value,
        #[serde(default)]
        error: Option<String>,
    },
    Event(SidecarEvent),
}

/// Lifecycle and content events pushed by the sidecar.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SidecarEvent {
    Qr(String),
    Authenticated,
    AuthFailure { reason: String },
    Ready,
    Disconnected { reason: String },
    Message(TransportEvent),
    Ack { event_id: String, level: AckLevel },
}

impl From<SidecarEvent> for TransportSignal {
    fn from(event: SidecarEvent) -> Self {
        match event {
            SidecarEvent::Qr(qr) => Self::Qr(qr),
            SidecarEvent::Authenticated => Self::Authenticated,
            SidecarEvent::AuthFailure { reason } => Self::AuthFailure(reason),
            SidecarEvent::Ready => Self::Ready,
            SidecarEvent::Disconnected { reason } => Self::Disconnected(reason),
            SidecarEvent::Message(event) => Self::Message(event),
            SidecarEvent::Ack { event_id, level } => Self::Ack { event_id, level },
        }
    }
}

/// Media as the sidecar returns it: base64 payload plus metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct WireMedia {
    pub data: String,
    pub mimetype: String,
    #[serde(default)]
    pub filename: Option<String>,
}

impl WireMedia {
    pub fn decode(self) -> Result<MediaPayload, ChatdeskError> {
        let data = STANDARD.decode(self.data.as_bytes()).map_err(|e| {
            ChatdeskError::Transport {
                message: format!("invalid media encoding: {e}"),
                source: Some(Box::new(e)),
            }
        })?;
        Ok(MediaPayload {
            data,
            mimetype: self.mimetype,
            filename: self.filename.filter(|f| !f.is_empty()),
        })
    }
}
