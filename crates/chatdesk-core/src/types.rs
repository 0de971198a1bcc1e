// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain records and transport event types shared across chatdesk crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a messaging account (one external session each).
pub type AccountId = i64;
/// Identifier of a ticket row.
pub type TicketId = i64;
/// Identifier of a contact row.
pub type ContactId = i64;
/// Identifier of a queue row.
pub type QueueId = i64;
/// Identifier of a human agent.
pub type UserId = i64;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a capability trait.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Storage,
    Responder,
    BlobStore,
}

// --- Ticket state ---

/// Lifecycle status of a ticket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Pending,
    Closed,
}

/// Where a conversation stands in the sales flow the responder follows.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketPhase {
    #[default]
    Sales,
    PaymentReceived,
    Ritual,
    Completed,
}

/// Something that moves a ticket between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// The responder returned a control action.
    Action(ResponderAction),
    /// An agent handed the conversation back for ritual instructions.
    RitualActivated,
    /// A closed ticket came back to life.
    Reopened,
}

impl TicketPhase {
    /// Applies `event` and returns the resulting phase.
    pub fn advance(self, event: PhaseEvent) -> Self {
        match (self, event) {
            (_, PhaseEvent::Reopened) => Self::Sales,
            (_, PhaseEvent::RitualActivated) => Self::Ritual,
            (Self::Sales, PhaseEvent::Action(ResponderAction::PaymentDetected)) => {
                Self::PaymentReceived
            }
            (Self::Ritual, PhaseEvent::Action(ResponderAction::PhaseComplete)) => Self::Completed,
            (phase, PhaseEvent::Action(_)) => phase,
        }
    }

    /// The context flags handed to the responder for this phase.
    pub fn context(self) -> PhaseContext {
        PhaseContext {
            phase: self,
            has_paid: !matches!(self, Self::Sales),
            ritual_instructions_given: matches!(self, Self::Completed),
        }
    }
}

/// Phase information passed alongside a responder prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseContext {
    pub phase: TicketPhase,
    pub has_paid: bool,
    pub ritual_instructions_given: bool,
}

/// Control action a responder may attach to its reply.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ResponderAction {
    #[default]
    None,
    EscalateToAgent,
    PaymentDetected,
    PhaseComplete,
}

impl ResponderAction {
    /// Every action except `None` hands the ticket to a human agent.
    pub fn hands_off(self) -> bool {
        !matches!(self, Self::None)
    }
}

// --- Acknowledgements ---

/// Delivery/read level of a sent message, as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i8", into = "i8")]
pub enum AckLevel {
    Error,
    Pending,
    Server,
    Device,
    Read,
    Played,
}

impl From<i8> for AckLevel {
    fn from(value: i8) -> Self {
        match value {
            i8::MIN..=-1 => Self::Error,
            0 => Self::Pending,
            1 => Self::Server,
            2 => Self::Device,
            3 => Self::Read,
            _ => Self::Played,
        }
    }
}

impl From<AckLevel> for i8 {
    fn from(level: AckLevel) -> Self {
        match level {
            AckLevel::Error => -1,
            AckLevel::Pending => 0,
            AckLevel::Server => 1,
            AckLevel::Device => 2,
            AckLevel::Read => 3,
            AckLevel::Played => 4,
        }
    }
}

// --- Transport events ---

/// Content kinds the ingestion pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Text,
    Audio,
    Voice,
    Video,
    Image,
    Document,
    ContactCard,
    Sticker,
    Location,
}

impl ContentKind {
    /// Maps the transport's wire name to a kind; `None` for anything unknown.
    pub fn from_wire(kind: &str) -> Option<Self> {
        Some(match kind {
            "chat" => Self::Text,
            "audio" => Self::Audio,
            "ptt" => Self::Voice,
            "video" => Self::Video,
            "image" => Self::Image,
            "document" => Self::Document,
            "vcard" => Self::ContactCard,
            "sticker" => Self::Sticker,
            "location" => Self::Location,
            _ => return None,
        })
    }

    /// Kinds an account may echo back that still belong in ticket history.
    pub fn is_echo_worthy(self) -> bool {
        matches!(self, Self::Text | Self::Location | Self::ContactCard)
    }
}

/// Chat metadata attached to every transport event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInfo {
    pub id: String,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub unread_count: u32,
}

/// Coordinates carried by a location event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub description: Option<String>,
}

/// A raw message event as delivered by the transport, either received or an
/// echo of something the account sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportEvent {
    /// The transport's own message id; the dedupe key for persistence.
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub from_me: bool,
    /// Wire name of the content kind (see [`ContentKind::from_wire`]).
    pub kind: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub has_media: bool,
    pub chat: ChatInfo,
    /// Sender inside a group chat.
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub quoted_id: Option<String>,
    /// Set by the transport when the message was produced by an automated
    /// send rather than typed by an agent.
    #[serde(default)]
    pub automated: bool,
}

/// Profile information for an external identity (person or group).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactProfile {
    /// Full wire id, e.g. `5511999999999@c.us`.
    pub id: String,
    /// The user part of the id.
    pub number: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub push_name: Option<String>,
    #[serde(default)]
    pub profile_pic_url: Option<String>,
    #[serde(default)]
    pub is_group: bool,
}

impl ContactProfile {
    /// Saved name, then the self-chosen push name, then the bare number.
    pub fn display_name(&self) -> String {
        [self.name.as_deref(), self.push_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|n| !n.is_empty())
            .unwrap_or(&self.number)
            .to_string()
    }

    /// Converts the profile into a contact row to upsert.
    pub fn to_new_contact(&self) -> NewContact {
        NewContact {
            name: self.display_name(),
            number: self.number.clone(),
            profile_pic_url: self.profile_pic_url.clone(),
            is_group: self.is_group,
        }
    }
}

/// Downloaded media bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub data: Vec<u8>,
    pub mimetype: String,
    pub filename: Option<String>,
}

/// Per-send options carried out-of-band with the outbound text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOptions {
    /// Marks the send as automated so its echo can be told apart from
    /// messages typed by an agent on the same account.
    #[serde(default)]
    pub automated: bool,
    #[serde(default)]
    pub quoted_id: Option<String>,
}

impl SendOptions {
    pub fn automated() -> Self {
        Self {
            automated: true,
            quoted_id: None,
        }
    }
}

/// Lifecycle and content signals emitted by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportSignal {
    Qr(String),
    Authenticated,
    AuthFailure(String),
    Ready,
    Disconnected(String),
    Message(TransportEvent),
    Ack { event_id: String, level: AckLevel },
}

// --- Store records ---

/// Connection status persisted on the account record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Opening,
    Qrcode,
    Connected,
    Disconnected,
}

/// A messaging account row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub status: AccountStatus,
    pub qrcode: Option<String>,
    pub retries: u32,
    pub greeting_message: String,
    pub farewell_message: String,
}

/// Status fields written by session observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountStatusUpdate {
    pub status: AccountStatus,
    pub qrcode: Option<String>,
    pub retries: u32,
}

/// A routing bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queue {
    pub id: QueueId,
    pub name: String,
    pub greeting_message: String,
    pub position: u32,
}

/// An external party (person or group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub number: String,
    pub profile_pic_url: Option<String>,
    pub is_group: bool,
}

impl Contact {
    /// Wire id used to address this contact through the transport.
    pub fn chat_id(&self) -> String {
        let suffix = if self.is_group { "g.us" } else { "c.us" };
        format!("{}@{suffix}", self.number)
    }
}

/// A contact to create or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub number: String,
    pub profile_pic_url: Option<String>,
    pub is_group: bool,
}

/// A conversation thread between an account and a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub account_id: AccountId,
    pub contact_id: ContactId,
    pub status: TicketStatus,
    pub user_id: Option<UserId>,
    pub queue_id: Option<QueueId>,
    pub phase: TicketPhase,
    pub unread_messages: u32,
    pub is_group: bool,
    pub last_message: String,
    pub updated_at: String,
}

/// Partial ticket update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketUpdate {
    pub status: Option<TicketStatus>,
    /// `Some(None)` clears the assigned agent.
    pub user_id: Option<Option<UserId>>,
    pub queue_id: Option<QueueId>,
    pub phase: Option<TicketPhase>,
    pub last_message: Option<String>,
    pub unread_messages: Option<u32>,
}

impl TicketUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the update to an in-memory copy of the ticket.
    pub fn apply_to(&self, ticket: &mut Ticket) {
        if let Some(status) = self.status {
            ticket.status = status;
        }
        if let Some(user_id) = self.user_id {
            ticket.user_id = user_id;
        }
        if let Some(queue_id) = self.queue_id {
            ticket.queue_id = Some(queue_id);
        }
        if let Some(phase) = self.phase {
            ticket.phase = phase;
        }
        if let Some(last) = &self.last_message {
            ticket.last_message.clone_from(last);
        }
        if let Some(unread) = self.unread_messages {
            ticket.unread_messages = unread;
        }
    }
}

/// A persisted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The transport event id.
    pub id: String,
    pub ticket_id: TicketId,
    /// Absent for messages the account sent.
    pub contact_id: Option<ContactId>,
    pub body: String,
    pub from_me: bool,
    pub read: bool,
    pub ack: AckLevel,
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub quoted_msg_id: Option<String>,
    pub created_at: String,
}

/// A message to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub id: String,
    pub ticket_id: TicketId,
    pub contact_id: Option<ContactId>,
    pub body: String,
    pub from_me: bool,
    pub read: bool,
    pub ack: AckLevel,
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub quoted_msg_id: Option<String>,
}

/// A message with its contact and quoted message loaded, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub message: Message,
    pub contact: Option<Contact>,
    pub quoted: Option<Message>,
}

// --- Responder ---

/// Who wrote a history line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Origin {
    #[strum(serialize = "Asistente")]
    Assistant,
    #[strum(serialize = "Cliente")]
    Customer,
}

/// One line of conversation history passed to the responder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub origin: Origin,
    pub body: String,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.body)
    }
}

/// What the responder produced for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponderReply {
    pub text: Option<String>,
    pub action: ResponderAction,
}

// --- Push ---

/// Destination of a real-time push notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PushChannel {
    /// Account connectivity updates.
    Sessions,
    /// Everything that happens on one ticket.
    Ticket(TicketId),
}

impl fmt::Display for PushChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sessions => write!(f, "sessions"),
            Self::Ticket(id) => write!(f, "ticket:{id}"),
        }
    }
}

/// Payload of a real-time push notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PushEvent {
    SessionUpdated {
        account_id: AccountId,
        status: AccountStatus,
        qrcode: Option<String>,
        retries: u32,
    },
    MessageCreated {
        ticket: Ticket,
        message: Message,
    },
    MessageUpdated {
        view: MessageView,
    },
    TicketUpdated {
        ticket: Ticket,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ticket_status_round_trips_lowercase() {
        assert_eq!(TicketStatus::Pending.to_string(), "pending");
        assert_eq!(TicketStatus::from_str("closed").unwrap(), TicketStatus::Closed);
        let json = serde_json::to_string(&TicketStatus::Open).unwrap();
        assert_eq!(json, "\"open\"");
    }

    #[test]
    fn phase_transitions() {
        use PhaseEvent::*;
        use ResponderAction::*;

        let phase = TicketPhase::Sales;
        assert_eq!(phase.advance(Action(EscalateToAgent)), TicketPhase::Sales);
        assert_eq!(
            phase.advance(Action(PaymentDetected)),
            TicketPhase::PaymentReceived
        );
        assert_eq!(
            TicketPhase::PaymentReceived.advance(RitualActivated),
            TicketPhase::Ritual
        );
        assert_eq!(
            TicketPhase::Ritual.advance(Action(PhaseComplete)),
            TicketPhase::Completed
        );
        assert_eq!(
            TicketPhase::Sales.advance(Action(PhaseComplete)),
            TicketPhase::Sales
        );
        assert_eq!(TicketPhase::Completed.advance(Reopened), TicketPhase::Sales);
    }

    #[test]
    fn phase_context_flags() {
        let ctx = TicketPhase::Sales.context();
        assert!(!ctx.has_paid);
        assert!(!ctx.ritual_instructions_given);

        let ctx = TicketPhase::Completed.context();
        assert!(ctx.has_paid);
        assert!(ctx.ritual_instructions_given);
    }

    #[test]
    fn responder_action_names() {
        assert_eq!(
            ResponderAction::from_str("escalate-to-agent").unwrap(),
            ResponderAction::EscalateToAgent
        );
        assert!(!ResponderAction::None.hands_off());
        assert!(ResponderAction::PhaseComplete.hands_off());
    }

    #[test]
    fn ack_level_clamps_out_of_range_values() {
        assert_eq!(AckLevel::from(-5), AckLevel::Error);
        assert_eq!(AckLevel::from(3), AckLevel::Read);
        assert_eq!(AckLevel::from(9), AckLevel::Played);
        assert_eq!(i8::from(AckLevel::Device), 2);
        assert_eq!(serde_json::to_string(&AckLevel::Server).unwrap(), "1");
    }

    #[test]
    fn content_kinds_from_wire() {
        assert_eq!(ContentKind::from_wire("ptt"), Some(ContentKind::Voice));
        assert_eq!(ContentKind::from_wire("vcard"), Some(ContentKind::ContactCard));
        assert_eq!(ContentKind::from_wire("e2e_notification"), None);
        assert!(ContentKind::Location.is_echo_worthy());
        assert!(!ContentKind::Image.is_echo_worthy());
    }

    #[test]
    fn display_name_fallbacks() {
        let mut profile = ContactProfile {
            id: "5511@c.us".into(),
            number: "5511".into(),
            ..Default::default()
        };
        assert_eq!(profile.display_name(), "5511");
        profile.push_name = Some("Ana".into());
        assert_eq!(profile.display_name(), "Ana");
        profile.name = Some("Ana Souza".into());
        assert_eq!(profile.display_name(), "Ana Souza");
    }

    #[test]
    fn contact_chat_id_suffix() {
        let mut contact = Contact {
            id: 1,
            name: "x".into(),
            number: "123".into(),
            profile_pic_url: None,
            is_group: false,
        };
        assert_eq!(contact.chat_id(), "123@c.us");
        contact.is_group = true;
        assert_eq!(contact.chat_id(), "123@g.us");
    }

    #[test]
    fn ticket_update_applies_only_set_fields() {
        let mut ticket = Ticket {
            id: 1,
            account_id: 1,
            contact_id: 1,
            status: TicketStatus::Pending,
            user_id: Some(4),
            queue_id: None,
            phase: TicketPhase::Sales,
            unread_messages: 2,
            is_group: false,
            last_message: "hi".into(),
            updated_at: String::new(),
        };
        let update = TicketUpdate {
            user_id: Some(None),
            queue_id: Some(9),
            ..Default::default()
        };
        update.apply_to(&mut ticket);
        assert_eq!(ticket.user_id, None);
        assert_eq!(ticket.queue_id, Some(9));
        assert_eq!(ticket.status, TicketStatus::Pending);
        assert!(TicketUpdate::default().is_empty());
    }

    #[test]
    fn history_entry_display_tags_origin() {
        let entry = HistoryEntry {
            origin: Origin::Customer,
            body: "hola".into(),
        };
        assert_eq!(entry.to_string(), "Cliente: hola");
    }

    #[test]
    fn push_event_is_tagged() {
        let event = PushEvent::SessionUpdated {
            account_id: 2,
            status: AccountStatus::Qrcode,
            qrcode: Some("qr".into()),
            retries: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "session_updated");
        assert_eq!(json["status"], "QRCODE");
        assert_eq!(PushChannel::Ticket(5).to_string(), "ticket:5");
    }

    fn phase_event() -> impl proptest::strategy::Strategy<Value = PhaseEvent> {
        use proptest::prelude::*;
        prop_oneof![
            Just(PhaseEvent::Reopened),
            Just(PhaseEvent::RitualActivated),
            Just(PhaseEvent::Action(ResponderAction::None)),
            Just(PhaseEvent::Action(ResponderAction::EscalateToAgent)),
            Just(PhaseEvent::Action(ResponderAction::PaymentDetected)),
            Just(PhaseEvent::Action(ResponderAction::PhaseComplete)),
        ]
    }

    proptest::proptest! {
        #[test]
        fn phases_only_move_along_allowed_edges(
            events in proptest::collection::vec(phase_event(), 0..32)
        ) {
            let mut phase = TicketPhase::Sales;
            for event in events {
                let next = phase.advance(event);
                if event == PhaseEvent::Reopened {
                    proptest::prop_assert_eq!(next, TicketPhase::Sales);
                }
                if next != phase && next == TicketPhase::PaymentReceived {
                    proptest::prop_assert_eq!(phase, TicketPhase::Sales);
                }
                if next != phase && next == TicketPhase::Completed {
                    proptest::prop_assert_eq!(phase, TicketPhase::Ritual);
                }
                proptest::prop_assert_eq!(next.context().has_paid, next != TicketPhase::Sales);
                phase = next;
            }
        }
    }
}
