// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ingestion pipeline: every transport event a session delivers goes
//! through [`IngestPipeline::handle`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatdesk_config::model::ChatdeskConfig;
use chatdesk_core::{
    AckLevel, Account, BlobStore, ChatdeskError, Contact, ContentKind, ErrorReporter, EventSink,
    KeyedLocks, NewMessage, PhaseEvent, PushPublisher, ResponderAdapter, SessionHandle,
    StorageAdapter, Ticket, TicketId, TicketStatus, TicketUpdate, TransportEvent,
};
use tracing::{debug, info, warn};

use crate::ConversationKey;
use crate::ack::AckTracker;
use crate::autoreply::{AutoReplyHook, AutoReplyOutcome, AutoReplySettings};
use crate::classify::{Rejection, classify};
use crate::commands::{AgentCommand, HandledCommands, RITUAL_CONFIRMATION, ticket_info};
use crate::location::{location_body, location_preview};
use crate::media::{media_type, unique_filename};
use crate::metrics::record_ingest;
use crate::report::TracingReporter;
use crate::router::{QueueRouter, RouteOutcome};
use crate::template::render;
use crate::vcard::parse_vcard;
use crate::writer::{MessageWriter, Outbox};

/// Command ids remembered for redelivery checks.
const HANDLED_COMMANDS: usize = 256;

/// Pipeline tunables.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// `hl` parameter of location map links.
    pub map_language: String,
    pub ack_delay: Duration,
    /// Debounce window for queue menus.
    pub menu_delay: Duration,
    pub autoreply: AutoReplySettings,
}

impl From<&ChatdeskConfig> for IngestSettings {
    fn from(config: &ChatdeskConfig) -> Self {
        Self {
            map_language: config.ingest.map_language.clone(),
            ack_delay: Duration::from_millis(config.ingest.ack_delay_ms),
            menu_delay: Duration::from_millis(config.routing.menu_debounce_ms),
            autoreply: AutoReplySettings::from(&config.autoreply),
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self::from(&ChatdeskConfig::default())
    }
}

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Rejected(Rejection),
    /// Group chat: the group and its sender were recorded, nothing else.
    GroupIdentified,
    /// Echo of the account's farewell with nothing unread.
    FarewellSkipped,
    Command(AgentCommand),
    /// The event id was already stored.
    Duplicate,
    Stored {
        ticket_id: TicketId,
        route: Option<RouteOutcome>,
        autoreply: Option<AutoReplyOutcome>,
    },
}

impl IngestOutcome {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rejected(rejection) => rejection.label(),
            Self::GroupIdentified => "group",
            Self::FarewellSkipped => "farewell_skipped",
            Self::Command(_) => "command",
            Self::Duplicate => "duplicate",
            Self::Stored { .. } => "stored",
        }
    }
}

/// Builder for [`IngestPipeline`].
pub struct IngestPipelineBuilder {
    store: Arc<dyn StorageAdapter>,
    blobs: Arc<dyn BlobStore>,
    push: Arc<dyn PushPublisher>,
    responder: Option<Arc<dyn ResponderAdapter>>,
    reporter: Arc<dyn ErrorReporter>,
    settings: IngestSettings,
}

impl IngestPipelineBuilder {
    pub fn responder(mut self, responder: Arc<dyn ResponderAdapter>) -> Self {
        self.responder = Some(responder);
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn settings(mut self, settings: IngestSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> IngestPipeline {
        let writer = Arc::new(MessageWriter::new(
            Arc::clone(&self.store),
            Arc::clone(&self.push),
        ));
        let outbox = Arc::new(Outbox::new(Arc::clone(&writer)));
        let locks = KeyedLocks::new();
        let router = QueueRouter::new(
            Arc::clone(&self.store),
            Arc::clone(&outbox),
            Arc::clone(&self.reporter),
            locks.clone(),
            self.settings.menu_delay,
        );
        let autoreply = AutoReplyHook::new(
            Arc::clone(&self.store),
            self.responder,
            Arc::clone(&outbox),
            Arc::clone(&self.reporter),
            self.settings.autoreply.clone(),
        );
        let acks = AckTracker::new(
            Arc::clone(&self.store),
            self.push,
            Arc::clone(&self.reporter),
            self.settings.ack_delay,
        );
        IngestPipeline {
            store: self.store,
            blobs: self.blobs,
            reporter: self.reporter,
            writer,
            outbox,
            router,
            autoreply,
            acks,
            locks,
            handled_commands: HandledCommands::new(HANDLED_COMMANDS),
            map_language: self.settings.map_language,
        }
    }
}

/// Turns transport events into contacts, tickets and messages, then runs
/// queue routing and the auto-response hook.
pub struct IngestPipeline {
    store: Arc<dyn StorageAdapter>,
    blobs: Arc<dyn BlobStore>,
    reporter: Arc<dyn ErrorReporter>,
    writer: Arc<MessageWriter>,
    outbox: Arc<Outbox>,
    router: QueueRouter,
    autoreply: AutoReplyHook,
    acks: AckTracker,
    locks: KeyedLocks<ConversationKey>,
    handled_commands: HandledCommands,
    map_language: String,
}

/// Normalized content ready to persist.
struct Content {
    body: String,
    preview: String,
    media_type: Option<String>,
    media_url: Option<String>,
}

impl IngestPipeline {
    pub fn builder(
        store: Arc<dyn StorageAdapter>,
        blobs: Arc<dyn BlobStore>,
        push: Arc<dyn PushPublisher>,
    ) -> IngestPipelineBuilder {
        IngestPipelineBuilder {
            store,
            blobs,
            push,
            responder: None,
            reporter: Arc::new(TracingReporter),
            settings: IngestSettings::default(),
        }
    }

    /// Number of tickets waiting on a debounced queue menu.
    pub fn pending_menus(&self) -> usize {
        self.router.pending_menus()
    }

    /// Handles one event. Errors abort this event only; the caller decides
    /// how to report them.
    pub async fn handle(
        &self,
        session: &SessionHandle,
        event: TransportEvent,
    ) -> Result<IngestOutcome, ChatdeskError> {
        let kind = match classify(&event) {
            Ok(kind) => kind,
            Err(rejection) => {
                debug!(event_id = %event.id, reason = rejection.label(), "event dropped");
                return Ok(IngestOutcome::Rejected(rejection));
            }
        };

        if event.chat.is_group {
            return self.identify_group(session, &event).await;
        }

        let counterparty = if event.from_me { &event.to } else { &event.from };
        let profile = session.transport.contact(counterparty).await?;
        let contact = self.store.upsert_contact(&profile.to_new_contact()).await?;
        let unread = if event.from_me {
            0
        } else {
            event.chat.unread_count
        };

        let account = self
            .store
            .get_account(session.account_id)
            .await?
            .ok_or_else(|| {
                ChatdeskError::Internal(format!("account {} not found", session.account_id))
            })?;
        if is_farewell_echo(&account, &contact, &event, unread) {
            debug!(event_id = %event.id, "farewell echo skipped");
            return Ok(IngestOutcome::FarewellSkipped);
        }

        let _guard = self.locks.lock((account.id, contact.id)).await;

        // A stored id means this is a redelivery: leave ticket, preview and
        // blobs exactly as they are.
        if self.store.get_message(&event.id).await?.is_some() {
            debug!(event_id = %event.id, "event already stored");
            return Ok(IngestOutcome::Duplicate);
        }
        // Commands are never stored, so their ids are remembered separately.
        let command = if event.from_me && kind == ContentKind::Text {
            AgentCommand::parse(&event.body)
        } else {
            None
        };
        if command.is_some() && self.handled_commands.contains(&event.id) {
            debug!(event_id = %event.id, "command already handled");
            return Ok(IngestOutcome::Duplicate);
        }

        let ticket = self
            .store
            .find_or_create_ticket(&contact, account.id, unread, None)
            .await?;

        if let Some(command) = command {
            self.run_command(session, command, &ticket, &contact).await?;
            self.handled_commands.insert(&event.id);
            return Ok(IngestOutcome::Command(command));
        }

        let content = self.normalize(session, &event, kind).await?;
        let quoted_msg_id = match &event.quoted_id {
            Some(quoted) => self.store.get_message(quoted).await?.map(|m| m.id),
            None => None,
        };
        let message = NewMessage {
            id: event.id.clone(),
            ticket_id: ticket.id,
            contact_id: (!event.from_me).then_some(contact.id),
            body: content.body,
            from_me: event.from_me,
            read: event.from_me,
            ack: AckLevel::Pending,
            media_type: content.media_type,
            media_url: content.media_url,
            quoted_msg_id,
        };

        let recorded = self.writer.record(&ticket, &message, &content.preview).await?;
        if recorded.message.is_none() {
            return Ok(IngestOutcome::Duplicate);
        }
        let mut ticket = recorded.ticket;

        let mut route = None;
        if !event.from_me && ticket.queue_id.is_none() && ticket.user_id.is_none() {
            let (outcome, routed) = self
                .router
                .route(session, &account, &ticket, &contact, &event.body)
                .await?;
            route = Some(outcome);
            ticket = routed;
        }

        // Routing that already answered the customer suppresses the responder.
        let routing_replied = matches!(
            route,
            Some(RouteOutcome::Selected(_) | RouteOutcome::MenuScheduled)
        );
        let mut autoreply = None;
        if !event.from_me
            && kind == ContentKind::Text
            && ticket.queue_id.is_some()
            && !routing_replied
        {
            autoreply = Some(
                self.autoreply
                    .run(session, ticket.clone(), &contact, &event.body)
                    .await,
            );
        }

        if kind == ContentKind::ContactCard {
            self.save_card_contacts(&event).await;
        }

        Ok(IngestOutcome::Stored {
            ticket_id: ticket.id,
            route,
            autoreply,
        })
    }

    async fn identify_group(
        &self,
        session: &SessionHandle,
        event: &TransportEvent,
    ) -> Result<IngestOutcome, ChatdeskError> {
        let group = session.transport.contact(&event.chat.id).await?;
        let group = self.store.upsert_contact(&group.to_new_contact()).await?;
        if let Some(author) = event.author.as_deref().filter(|_| !event.from_me) {
            let sender = session.transport.contact(author).await?;
            self.store.upsert_contact(&sender.to_new_contact()).await?;
        }
        debug!(event_id = %event.id, group_id = group.id, "group event identified");
        Ok(IngestOutcome::GroupIdentified)
    }

    async fn run_command(
        &self,
        session: &SessionHandle,
        command: AgentCommand,
        ticket: &Ticket,
        contact: &Contact,
    ) -> Result<(), ChatdeskError> {
        info!(ticket_id = ticket.id, command = command.name(), "agent command");
        match command {
            AgentCommand::ActivateRitual => {
                let update = TicketUpdate {
                    status: Some(TicketStatus::Pending),
                    user_id: Some(None),
                    phase: Some(ticket.phase.advance(PhaseEvent::RitualActivated)),
                    ..TicketUpdate::default()
                };
                let ticket = self.store.update_ticket(ticket.id, &update).await?;
                self.writer.publish_ticket(&ticket);
                self.outbox
                    .send(session, &ticket, contact, RITUAL_CONFIRMATION)
                    .await?;
            }
            AgentCommand::Info => {
                self.outbox
                    .send(session, ticket, contact, &ticket_info(ticket))
                    .await?;
            }
        }
        Ok(())
    }

    async fn normalize(
        &self,
        session: &SessionHandle,
        event: &TransportEvent,
        kind: ContentKind,
    ) -> Result<Content, ChatdeskError> {
        if let (ContentKind::Location, Some(location)) = (kind, &event.location) {
            // The transport delivers the map thumbnail as the body.
            return Ok(Content {
                body: location_body(&event.body, location, &self.map_language),
                preview: location_preview(location),
                media_type: Some(event.kind.clone()),
                media_url: None,
            });
        }
        if event.has_media {
            return self.store_media(session, event).await;
        }
        Ok(Content {
            body: event.body.clone(),
            preview: event.body.clone(),
            media_type: Some(event.kind.clone()),
            media_url: None,
        })
    }

    async fn store_media(
        &self,
        session: &SessionHandle,
        event: &TransportEvent,
    ) -> Result<Content, ChatdeskError> {
        let payload = match session.transport.download_media(event).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                return Err(ChatdeskError::MediaDownloadFailed {
                    event_id: event.id.clone(),
                    source: None,
                });
            }
            Err(e) => {
                return Err(ChatdeskError::MediaDownloadFailed {
                    event_id: event.id.clone(),
                    source: Some(Box::new(e)),
                });
            }
        };

        let filename = unique_filename(
            payload.filename.as_deref(),
            &payload.mimetype,
            chrono::Utc::now().timestamp_millis(),
            &mut rand::thread_rng(),
        );
        if let Err(e) = self.blobs.save(&filename, &payload.data).await {
            warn!(
                event_id = %event.id,
                filename = %filename,
                error = %e,
                "failed to store media"
            );
            self.reporter.report("media", &e);
        }

        let body = if event.body.is_empty() {
            filename.clone()
        } else {
            event.body.clone()
        };
        Ok(Content {
            preview: body.clone(),
            body,
            media_type: Some(media_type(&payload.mimetype)),
            media_url: Some(filename),
        })
    }

    async fn save_card_contacts(&self, event: &TransportEvent) {
        for card in parse_vcard(&event.body) {
            match self.store.create_contact(&card).await {
                Ok(Some(created)) => {
                    debug!(
                        event_id = %event.id,
                        contact_id = created.id,
                        "contact created from card"
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        event_id = %event.id,
                        number = %card.number,
                        error = %e,
                        "failed to save card contact"
                    );
                }
            }
        }
    }
}

fn is_farewell_echo(
    account: &Account,
    contact: &Contact,
    event: &TransportEvent,
    unread: u32,
) -> bool {
    unread == 0
        && !account.farewell_message.is_empty()
        && render(&account.farewell_message, contact) == event.body
}

#[async_trait]
impl EventSink for IngestPipeline {
    async fn on_message(&self, session: &SessionHandle, event: TransportEvent) {
        let event_id = event.id.clone();
        match self.handle(session, event).await {
            Ok(outcome) => record_ingest(outcome.label()),
            Err(e) => {
                warn!(
                    account_id = session.account_id,
                    event_id,
                    error = %e,
                    "event ingestion failed"
                );
                self.reporter.report("ingest", &e);
                record_ingest("failed");
            }
        }
    }

    async fn on_ack(&self, _session: &SessionHandle, event_id: String, level: AckLevel) {
        self.acks.handle(&event_id, level).await;
    }
}
