// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! First-pass filtering of raw transport events.

use chatdesk_core::{ContentKind, TransportEvent};

/// Sender id of the status/broadcast channel.
pub const STATUS_BROADCAST: &str = "status@broadcast";

/// Why an event was dropped before any lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    StatusBroadcast,
    UnknownKind(String),
    /// Echo of a reply the service sent itself.
    AutomatedEcho,
    /// Self-sent content the pipeline does not log (media acks and the like).
    IgnoredEcho(ContentKind),
}

impl Rejection {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Rejection::StatusBroadcast => "status_broadcast",
            Rejection::UnknownKind(_) => "unknown_kind",
            Rejection::AutomatedEcho => "automated_echo",
            Rejection::IgnoredEcho(_) => "ignored_echo",
        }
    }
}

/// Accepts or rejects an event, returning its content kind when accepted.
pub fn classify(event: &TransportEvent) -> Result<ContentKind, Rejection> {
    if event.from == STATUS_BROADCAST {
        return Err(Rejection::StatusBroadcast);
    }
    let kind = ContentKind::from_wire(&event.kind)
        .ok_or_else(|| Rejection::UnknownKind(event.kind.clone()))?;

    if event.from_me {
        if event.automated {
            return Err(Rejection::AutomatedEcho);
        }
        if !kind.is_echo_worthy() {
            return Err(Rejection::IgnoredEcho(kind));
        }
    }
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use chatdesk_test_utils::fixtures::{inbound_media, inbound_text, outbound_text};

    use super::*;

    #[test]
    fn broadcast_is_rejected() {
        let mut event = inbound_text("1", "5511", "story");
        event.from = STATUS_BROADCAST.to_string();
        assert_eq!(classify(&event), Err(Rejection::StatusBroadcast));
    }

    #[test]
    fn unknown_kinds_are_rejected() {
        let mut event = inbound_text("1", "5511", "");
        event.kind = "call_log".into();
        assert_eq!(
            classify(&event),
            Err(Rejection::UnknownKind("call_log".into()))
        );
    }

    #[test]
    fn inbound_kinds_pass() {
        assert_eq!(
            classify(&inbound_text("1", "5511", "hi")),
            Ok(ContentKind::Text)
        );
        assert_eq!(
            classify(&inbound_media("2", "5511", "ptt", "")),
            Ok(ContentKind::Voice)
        );
    }

    #[test]
    fn automated_echo_is_dropped_but_agent_reply_kept() {
        let echo = outbound_text("1", "5511", "auto", true);
        assert_eq!(classify(&echo), Err(Rejection::AutomatedEcho));

        let typed = outbound_text("2", "5511", "from the agent", false);
        assert_eq!(classify(&typed), Ok(ContentKind::Text));
    }

    #[test]
    fn self_sent_media_is_left_to_the_ack_path() {
        let mut event = outbound_text("1", "5511", "", false);
        event.kind = "image".into();
        event.has_media = true;
        assert_eq!(
            classify(&event),
            Err(Rejection::IgnoredEcho(ContentKind::Image))
        );
    }
}
