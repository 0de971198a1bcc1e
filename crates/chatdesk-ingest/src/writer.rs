// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The persistence path shared by inbound events and automated sends.

use std::sync::Arc;

use chatdesk_core::{
    AckLevel, ChatdeskError, Contact, Message, NewMessage, PushChannel, PushEvent,
    PushPublisher, SendOptions, SessionHandle, StorageAdapter, Ticket, TicketUpdate,
};
use tracing::debug;

/// Writes messages and the ticket preview, then pushes the result.
pub struct MessageWriter {
    store: Arc<dyn StorageAdapter>,
    push: Arc<dyn PushPublisher>,
}

/// What [`MessageWriter::record`] did.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub ticket: Ticket,
    /// `None` when the event id was already stored.
    pub message: Option<Message>,
}

impl MessageWriter {
    pub fn new(store: Arc<dyn StorageAdapter>, push: Arc<dyn PushPublisher>) -> Self {
        Self { store, push }
    }

    /// Stores the message, then moves the ticket preview forward. Storing
    /// an id that already exists changes nothing and yields `message: None`.
    pub async fn record(
        &self,
        ticket: &Ticket,
        message: &NewMessage,
        preview: &str,
    ) -> Result<Recorded, ChatdeskError> {
        if !self.store.insert_message(message).await? {
            debug!(ticket_id = ticket.id, event_id = %message.id, "message already stored");
            return Ok(Recorded {
                ticket: ticket.clone(),
                message: None,
            });
        }

        let ticket = self
            .store
            .update_ticket(
                ticket.id,
                &TicketUpdate {
                    last_message: Some(preview.to_string()),
                    ..TicketUpdate::default()
                },
            )
            .await?;

        let stored = self.store.get_message(&message.id).await?;
        if let Some(stored) = &stored {
            self.push.publish(
                PushChannel::Ticket(ticket.id),
                PushEvent::MessageCreated {
                    ticket: ticket.clone(),
                    message: stored.clone(),
                },
            );
        }
        self.publish_ticket(&ticket);
        Ok(Recorded {
            ticket,
            message: stored,
        })
    }

    /// Pushes the current ticket state.
    pub fn publish_ticket(&self, ticket: &Ticket) {
        self.push.publish(
            PushChannel::Ticket(ticket.id),
            PushEvent::TicketUpdated {
                ticket: ticket.clone(),
            },
        );
    }

    pub fn store(&self) -> &Arc<dyn StorageAdapter> {
        &self.store
    }
}

/// Sends automated text to a contact and records it in the ticket.
pub struct Outbox {
    writer: Arc<MessageWriter>,
}

impl Outbox {
    pub fn new(writer: Arc<MessageWriter>) -> Self {
        Self { writer }
    }

    /// Sends `text` flagged as automated, then records the sent message.
    pub async fn send(
        &self,
        session: &SessionHandle,
        ticket: &Ticket,
        contact: &Contact,
        text: &str,
    ) -> Result<Recorded, ChatdeskError> {
        let sent = session
            .transport
            .send(&contact.chat_id(), text, SendOptions::automated())
            .await?;
        let message = NewMessage {
            id: sent.id,
            ticket_id: ticket.id,
            contact_id: None,
            body: text.to_string(),
            from_me: true,
            read: true,
            ack: AckLevel::Pending,
            media_type: Some(sent.kind),
            media_url: None,
            quoted_msg_id: None,
        };
        self.writer.record(ticket, &message, text).await
    }

    pub fn writer(&self) -> &Arc<MessageWriter> {
        &self.writer
    }
}
