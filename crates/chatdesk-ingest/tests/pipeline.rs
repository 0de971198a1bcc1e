// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end ingestion scenarios against a real SQLite store and a mock
//! transport.

use std::sync::Arc;
use std::time::Duration;

use chatdesk_config::model::AccountConfig;
use chatdesk_core::{
    AckLevel, ChatInfo, Contact, EventSink, MediaPayload, Message, NewContact, PushChannel,
    PushEvent, Queue, ResponderAction, SessionHandle, StorageAdapter, Ticket, TicketId,
    TicketPhase, TicketStatus, TicketUpdate, TransportEvent,
};
use chatdesk_ingest::autoreply::AutoReplyHook;
use chatdesk_ingest::commands::RITUAL_CONFIRMATION;
use chatdesk_ingest::location::location_preview;
use chatdesk_ingest::{
    AgentCommand, AutoReplyOutcome, AutoReplySettings, IngestOutcome, IngestPipeline,
    IngestSettings, MessageWriter, Outbox, Rejection, RouteOutcome,
};
use chatdesk_test_utils::fixtures::{
    account, group_text, inbound_location, inbound_media, inbound_text, outbound_text, with_queue,
};
use chatdesk_test_utils::{
    MemoryBlobStore, MockResponder, MockTransport, RecordingPush, RecordingReporter, TestStore,
};

const NUMBER: &str = "5511999990000";
const MENU_DELAY: Duration = Duration::from_millis(100);

struct Harness {
    _db: TestStore,
    store: Arc<dyn StorageAdapter>,
    transport: Arc<MockTransport>,
    session: SessionHandle,
    push: Arc<RecordingPush>,
    blobs: Arc<MemoryBlobStore>,
    responder: Arc<MockResponder>,
    reporter: Arc<RecordingReporter>,
    pipeline: IngestPipeline,
}

impl Harness {
    async fn new(account: AccountConfig) -> Self {
        Self::with(account, MockResponder::new(), AutoReplySettings::default()).await
    }

    async fn with(
        account: AccountConfig,
        responder: MockResponder,
        autoreply: AutoReplySettings,
    ) -> Self {
        let account_id = account.id;
        let db = TestStore::new(&[account]).await.unwrap();
        let store = db.adapter();
        let transport = Arc::new(MockTransport::new());
        let push = Arc::new(RecordingPush::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let responder = Arc::new(responder);
        let reporter = Arc::new(RecordingReporter::new());

        let settings = IngestSettings {
            map_language: "pt-BR".into(),
            ack_delay: Duration::ZERO,
            menu_delay: MENU_DELAY,
            autoreply: AutoReplySettings {
                timeout: Duration::from_secs(2),
                ..autoreply
            },
        };
        let pipeline = IngestPipeline::builder(store.clone(), blobs.clone(), push.clone())
            .responder(responder.clone())
            .reporter(reporter.clone())
            .settings(settings)
            .build();

        Self {
            _db: db,
            store,
            session: SessionHandle {
                account_id,
                transport: transport.clone(),
            },
            transport,
            push,
            blobs,
            responder,
            reporter,
            pipeline,
        }
    }

    async fn handle(&self, event: TransportEvent) -> IngestOutcome {
        self.pipeline.handle(&self.session, event).await.unwrap()
    }

    /// Handles an event that must be stored, returning its ticket.
    async fn stored(&self, event: TransportEvent) -> (Ticket, IngestOutcome) {
        let outcome = self.handle(event).await;
        let IngestOutcome::Stored { ticket_id, .. } = outcome else {
            panic!("expected a stored message, got {outcome:?}");
        };
        (self.ticket(ticket_id).await, outcome)
    }

    async fn ticket(&self, id: TicketId) -> Ticket {
        self.store.get_ticket(id).await.unwrap().unwrap()
    }

    async fn messages(&self, ticket: &Ticket) -> Vec<Message> {
        self.store.recent_messages(ticket.id, 100).await.unwrap()
    }

    async fn outbound(&self, ticket: &Ticket) -> Vec<Message> {
        self.messages(ticket)
            .await
            .into_iter()
            .filter(|m| m.from_me)
            .collect()
    }

    async fn queues(&self) -> Vec<Queue> {
        self.store
            .queues_for_account(self.session.account_id)
            .await
            .unwrap()
    }

    async fn update(&self, ticket: &Ticket, update: TicketUpdate) -> Ticket {
        self.store.update_ticket(ticket.id, &update).await.unwrap()
    }
}

fn two_queues() -> AccountConfig {
    let acc = with_queue(account(1, "main"), "Ventas", "Bienvenido a ventas, {{name}}");
    with_queue(acc, "Soporte", "Soporte aqui, {{name}}")
}

fn one_queue() -> AccountConfig {
    with_queue(account(1, "main"), "Ventas", "")
}

async fn settle() {
    tokio::time::sleep(MENU_DELAY * 3).await;
}

// --- Replay safety ---

#[tokio::test]
async fn redelivered_event_is_stored_once() {
    let h = Harness::new(account(1, "main")).await;

    let (ticket, first) = h.stored(inbound_text("ev-1", NUMBER, "hola")).await;
    assert!(matches!(
        first,
        IngestOutcome::Stored {
            route: Some(RouteOutcome::NoQueues),
            autoreply: None,
            ..
        }
    ));
    let second = h.handle(inbound_text("ev-1", NUMBER, "hola")).await;
    assert_eq!(second, IngestOutcome::Duplicate);

    let messages = h.messages(&ticket).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "ev-1");
    assert_eq!(messages[0].contact_id, Some(ticket.contact_id));
    assert_eq!(ticket.last_message, "hola");
    assert_eq!(ticket.status, TicketStatus::Pending);
}

#[tokio::test]
async fn redelivery_does_not_rerun_routing_or_responder() {
    let h = Harness::new(one_queue()).await;
    h.handle(inbound_text("ev-1", NUMBER, "hola")).await;
    assert_eq!(h.responder.call_count().await, 1);

    assert_eq!(
        h.handle(inbound_text("ev-1", NUMBER, "hola")).await,
        IngestOutcome::Duplicate
    );
    assert_eq!(h.responder.call_count().await, 1);
    assert_eq!(h.transport.sent_count().await, 1);
}

#[tokio::test]
async fn redelivery_leaves_closed_ticket_closed() {
    let h = Harness::new(account(1, "main")).await;
    let (ticket, _) = h.stored(inbound_text("ev-1", NUMBER, "hola")).await;
    h.handle(inbound_text("ev-2", NUMBER, "adios")).await;
    let closed = h
        .update(
            &ticket,
            TicketUpdate {
                status: Some(TicketStatus::Closed),
                user_id: Some(Some(7)),
                ..TicketUpdate::default()
            },
        )
        .await;
    assert_eq!(closed.last_message, "adios");

    assert_eq!(
        h.handle(inbound_text("ev-1", NUMBER, "hola")).await,
        IngestOutcome::Duplicate
    );

    let after = h.ticket(ticket.id).await;
    assert_eq!(after.status, TicketStatus::Closed);
    assert_eq!(after.last_message, "adios");
    assert_eq!(after.user_id, Some(7));
    assert_eq!(after.phase, closed.phase);
    assert_eq!(after.unread_messages, closed.unread_messages);

    // No fresh ticket was opened for the replay either.
    let (next, _) = h.stored(inbound_text("ev-3", NUMBER, "otra vez")).await;
    assert_eq!(next.id, ticket.id);
    assert_eq!(next.status, TicketStatus::Pending);
}

#[tokio::test]
async fn redelivered_media_is_not_downloaded_again() {
    let h = Harness::new(account(1, "main")).await;
    h.transport
        .set_media(
            "m-1",
            MediaPayload {
                data: b"jpeg bytes".to_vec(),
                mimetype: "image/jpeg".into(),
                filename: Some("foto.jpg".into()),
            },
        )
        .await;
    let (ticket, _) = h.stored(inbound_media("m-1", NUMBER, "image", "")).await;
    h.handle(inbound_text("ev-2", NUMBER, "gracias")).await;
    assert_eq!(h.transport.download_count(), 1);

    assert_eq!(
        h.handle(inbound_media("m-1", NUMBER, "image", "")).await,
        IngestOutcome::Duplicate
    );
    assert_eq!(h.transport.download_count(), 1);
    assert_eq!(h.blobs.names().await.len(), 1);
    assert_eq!(h.messages(&ticket).await.len(), 2);
    assert_eq!(h.ticket(ticket.id).await.last_message, "gracias");
}

#[tokio::test]
async fn redelivered_command_runs_once() {
    let h = Harness::new(account(1, "main")).await;
    let ticket = agent_owned_ticket(&h).await;

    let first = h.handle(outbound_text("cmd-1", NUMBER, "/info", false)).await;
    assert_eq!(first, IngestOutcome::Command(AgentCommand::Info));
    let replay = h.handle(outbound_text("cmd-1", NUMBER, "/info", false)).await;
    assert_eq!(replay, IngestOutcome::Duplicate);
    assert_eq!(h.transport.sent_count().await, 1);

    // A new command id is a new request.
    h.handle(outbound_text("cmd-2", NUMBER, "/info", false)).await;
    assert_eq!(h.transport.sent_count().await, 2);
    assert_eq!(h.ticket(ticket.id).await.user_id, Some(7));
}

#[tokio::test]
async fn concurrent_events_share_one_ticket() {
    let h = Harness::new(account(1, "main")).await;
    let (a, b, c) = tokio::join!(
        h.pipeline.handle(&h.session, inbound_text("c-1", NUMBER, "uno")),
        h.pipeline.handle(&h.session, inbound_text("c-2", NUMBER, "dos")),
        h.pipeline.handle(&h.session, inbound_text("c-3", NUMBER, "tres")),
    );
    let ids: Vec<TicketId> = [a, b, c]
        .into_iter()
        .map(|outcome| match outcome.unwrap() {
            IngestOutcome::Stored { ticket_id, .. } => ticket_id,
            other => panic!("unexpected outcome {other:?}"),
        })
        .collect();
    assert!(ids.iter().all(|id| *id == ids[0]));
    let ticket = h.ticket(ids[0]).await;
    assert_eq!(h.messages(&ticket).await.len(), 3);
}

// --- Queue routing ---

#[tokio::test]
async fn second_option_assigns_second_queue_and_greets_once() {
    let h = Harness::new(two_queues()).await;
    let queues = h.queues().await;

    let (ticket, outcome) = h.stored(inbound_text("ev-1", NUMBER, "2")).await;
    assert_eq!(
        outcome,
        IngestOutcome::Stored {
            ticket_id: ticket.id,
            route: Some(RouteOutcome::Selected(queues[1].id)),
            autoreply: None,
        }
    );
    assert_eq!(ticket.queue_id, Some(queues[1].id));

    settle().await;
    let sent = h.transport.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, format!("{NUMBER}@c.us"));
    assert_eq!(sent[0].text, format!("Soporte aqui, {NUMBER}"));
    assert!(sent[0].options.automated);

    let outbound = h.outbound(&ticket).await;
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].body, format!("Soporte aqui, {NUMBER}"));
    assert_eq!(outbound[0].contact_id, None);
    assert_eq!(h.responder.call_count().await, 0);
}

#[tokio::test]
async fn invalid_reply_sends_menu_after_debounce() {
    let h = Harness::new(two_queues()).await;

    let (ticket, outcome) = h.stored(inbound_text("ev-1", NUMBER, "3")).await;
    assert!(matches!(
        outcome,
        IngestOutcome::Stored {
            route: Some(RouteOutcome::MenuScheduled),
            ..
        }
    ));
    assert_eq!(h.transport.sent_count().await, 0);
    assert_eq!(h.pipeline.pending_menus(), 1);

    settle().await;
    let sent = h.transport.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].text,
        format!("Hola {NUMBER}! Elige una opcion:\n*1* - Ventas\n*2* - Soporte\n")
    );
    assert_eq!(h.outbound(&ticket).await.len(), 1);
    assert_eq!(h.ticket(ticket.id).await.queue_id, None);
    assert_eq!(h.pipeline.pending_menus(), 0);
}

#[tokio::test]
async fn burst_before_selection_sends_one_menu() {
    let h = Harness::new(two_queues()).await;
    for (i, body) in ["hola", "buenas", "hay alguien?", "holaaa"].iter().enumerate() {
        h.handle(inbound_text(&format!("b-{i}"), NUMBER, body)).await;
    }
    settle().await;
    assert_eq!(h.transport.sent_count().await, 1);
}

#[tokio::test]
async fn selection_cancels_pending_menu() {
    let h = Harness::new(two_queues()).await;
    let queues = h.queues().await;

    h.handle(inbound_text("ev-1", NUMBER, "hola")).await;
    let (ticket, _) = h.stored(inbound_text("ev-2", NUMBER, "1")).await;
    assert_eq!(ticket.queue_id, Some(queues[0].id));

    settle().await;
    let sent = h.transport.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, format!("Bienvenido a ventas, {NUMBER}"));
}

#[tokio::test]
async fn single_queue_is_assigned_without_menu() {
    let h = Harness::new(one_queue()).await;
    let queues = h.queues().await;

    let (ticket, outcome) = h.stored(inbound_text("ev-1", NUMBER, "hola")).await;
    assert!(matches!(
        outcome,
        IngestOutcome::Stored {
            route: Some(RouteOutcome::AutoAssigned(_)),
            autoreply: Some(AutoReplyOutcome::Replied {
                action: ResponderAction::None
            }),
            ..
        }
    ));
    assert_eq!(ticket.queue_id, Some(queues[0].id));
    let sent = h.transport.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "mock reply");
}

#[tokio::test]
async fn empty_queue_greeting_is_not_sent() {
    let acc = with_queue(with_queue(account(1, "main"), "Ventas", ""), "Soporte", "  ");
    let h = Harness::new(acc).await;
    let (ticket, _) = h.stored(inbound_text("ev-1", NUMBER, "1")).await;
    assert!(ticket.queue_id.is_some());
    settle().await;
    assert_eq!(h.transport.sent_count().await, 0);
}

// --- Auto-response ---

#[tokio::test]
async fn responder_stays_quiet_when_agent_assigned() {
    let h = Harness::new(one_queue()).await;
    let (ticket, _) = h.stored(inbound_text("ev-1", NUMBER, "hola")).await;
    assert_eq!(h.responder.call_count().await, 1);

    h.update(
        &ticket,
        TicketUpdate {
            user_id: Some(Some(7)),
            status: Some(TicketStatus::Open),
            ..TicketUpdate::default()
        },
    )
    .await;

    for (i, body) in ["necesito ayuda", "urgente", "/info"].iter().enumerate() {
        let outcome = h.handle(inbound_text(&format!("q-{i}"), NUMBER, body)).await;
        assert!(matches!(
            outcome,
            IngestOutcome::Stored {
                route: None,
                autoreply: Some(AutoReplyOutcome::AgentAssigned),
                ..
            }
        ));
    }
    assert_eq!(h.responder.call_count().await, 1);
    assert_eq!(h.transport.sent_count().await, 1);
}

#[tokio::test]
async fn escalation_hands_ticket_to_fallback_agent() {
    let h = Harness::new(one_queue()).await;
    h.responder
        .push_reply(Some("Te comunico con un asesor"), ResponderAction::EscalateToAgent)
        .await;

    let (ticket, outcome) = h.stored(inbound_text("ev-1", NUMBER, "quiero un humano")).await;
    assert!(matches!(
        outcome,
        IngestOutcome::Stored {
            autoreply: Some(AutoReplyOutcome::Replied {
                action: ResponderAction::EscalateToAgent
            }),
            ..
        }
    ));
    assert_eq!(ticket.user_id, Some(1));
    assert_eq!(ticket.status, TicketStatus::Open);

    let outbound = h.outbound(&ticket).await;
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].body, "Te comunico con un asesor");
    assert_eq!(h.transport.sent_count().await, 1);
}

#[tokio::test]
async fn payment_detected_advances_phase() {
    let h = Harness::new(one_queue()).await;
    h.responder
        .push_reply(Some("Gracias, recibimos tu pago"), ResponderAction::PaymentDetected)
        .await;
    let (ticket, _) = h.stored(inbound_text("ev-1", NUMBER, "ya pague")).await;
    assert_eq!(ticket.phase, TicketPhase::PaymentReceived);
    assert_eq!(ticket.user_id, Some(1));
}

#[tokio::test]
async fn responder_receives_history_and_phase() {
    let h = Harness::new(one_queue()).await;
    h.stored(inbound_text("ev-1", NUMBER, "hola")).await;
    h.stored(inbound_text("ev-2", NUMBER, "cuanto cuesta?")).await;

    let calls = h.responder.calls().await;
    assert_eq!(calls.len(), 2);
    let last = &calls[1];
    assert_eq!(last.prompt, "cuanto cuesta?");
    let bodies: Vec<&str> = last.history.iter().map(|e| e.body.as_str()).collect();
    assert_eq!(bodies, ["hola", "mock reply", "cuanto cuesta?"]);
    assert_eq!(last.context, TicketPhase::Sales.context());
}

#[tokio::test]
async fn hook_reopens_closed_ticket_passed_directly() {
    let h = Harness::new(one_queue()).await;
    let (ticket, _) = h.stored(inbound_text("ev-1", NUMBER, "hola")).await;
    let contact = h.store.get_contact(ticket.contact_id).await.unwrap().unwrap();
    let closed = h
        .update(
            &ticket,
            TicketUpdate {
                status: Some(TicketStatus::Closed),
                phase: Some(TicketPhase::Completed),
                ..TicketUpdate::default()
            },
        )
        .await;

    let writer = Arc::new(MessageWriter::new(h.store.clone(), h.push.clone()));
    let hook = AutoReplyHook::new(
        h.store.clone(),
        Some(h.responder.clone()),
        Arc::new(Outbox::new(writer)),
        h.reporter.clone(),
        AutoReplySettings::default(),
    );
    let outcome = hook.run(&h.session, closed, &contact, "sigo aqui").await;
    assert!(matches!(outcome, AutoReplyOutcome::Replied { .. }));

    let reopened = h.ticket(ticket.id).await;
    assert_eq!(reopened.status, TicketStatus::Pending);
    assert_eq!(reopened.phase, TicketPhase::Sales);
    assert_eq!(h.responder.call_count().await, 2);
    assert_eq!(
        h.responder.calls().await[1].context,
        TicketPhase::Sales.context()
    );
}

#[tokio::test]
async fn closed_ticket_with_new_message_comes_back_pending() {
    let h = Harness::new(one_queue()).await;
    let (ticket, _) = h.stored(inbound_text("ev-1", NUMBER, "hola")).await;
    h.update(
        &ticket,
        TicketUpdate {
            status: Some(TicketStatus::Closed),
            ..TicketUpdate::default()
        },
    )
    .await;

    let (again, outcome) = h.stored(inbound_text("ev-2", NUMBER, "otra consulta")).await;
    assert_eq!(again.id, ticket.id);
    assert_eq!(again.status, TicketStatus::Pending);
    assert!(matches!(
        outcome,
        IngestOutcome::Stored {
            autoreply: Some(AutoReplyOutcome::Replied { .. }),
            ..
        }
    ));
}

#[tokio::test]
async fn responder_failure_sends_nothing_and_is_reported() {
    let h = Harness::new(one_queue()).await;
    h.responder.push_error("quota exceeded").await;

    let (ticket, outcome) = h.stored(inbound_text("ev-1", NUMBER, "hola")).await;
    assert!(matches!(
        outcome,
        IngestOutcome::Stored {
            autoreply: Some(AutoReplyOutcome::Unavailable),
            ..
        }
    ));
    assert_eq!(h.transport.sent_count().await, 0);
    assert_eq!(h.messages(&ticket).await.len(), 1);
    assert!(h.reporter.reports().iter().any(|(c, _)| *c == "responder"));
}

#[tokio::test]
async fn slow_responder_times_out() {
    let responder = MockResponder::new().with_delay(Duration::from_secs(5));
    let settings = AutoReplySettings::default();
    let h = Harness::with(one_queue(), responder, settings).await;

    let outcome = h.handle(inbound_text("ev-1", NUMBER, "hola")).await;
    assert!(matches!(
        outcome,
        IngestOutcome::Stored {
            autoreply: Some(AutoReplyOutcome::Unavailable),
            ..
        }
    ));
    assert_eq!(h.transport.sent_count().await, 0);
}

#[tokio::test]
async fn empty_reply_is_a_no_op() {
    let h = Harness::new(one_queue()).await;
    h.responder
        .push_reply(None, ResponderAction::EscalateToAgent)
        .await;

    let (ticket, outcome) = h.stored(inbound_text("ev-1", NUMBER, "hola")).await;
    assert!(matches!(
        outcome,
        IngestOutcome::Stored {
            autoreply: Some(AutoReplyOutcome::NoText),
            ..
        }
    ));
    assert_eq!(ticket.user_id, None);
    assert_eq!(h.transport.sent_count().await, 0);
}

#[tokio::test]
async fn unconfigured_responder_is_skipped() {
    let h = Harness::with(one_queue(), MockResponder::unconfigured(), AutoReplySettings::default())
        .await;
    let outcome = h.handle(inbound_text("ev-1", NUMBER, "hola")).await;
    assert!(matches!(
        outcome,
        IngestOutcome::Stored {
            autoreply: Some(AutoReplyOutcome::NotConfigured),
            ..
        }
    ));
    assert_eq!(h.responder.call_count().await, 0);
}

#[tokio::test]
async fn only_test_numbers_get_replies_when_configured() {
    let settings = AutoReplySettings {
        test_numbers: vec!["5511888880000".into()],
        ..AutoReplySettings::default()
    };
    let h = Harness::with(one_queue(), MockResponder::new(), settings).await;

    let outcome = h.handle(inbound_text("ev-1", NUMBER, "hola")).await;
    assert!(matches!(
        outcome,
        IngestOutcome::Stored {
            autoreply: Some(AutoReplyOutcome::NotTestNumber),
            ..
        }
    ));
    let outcome = h.handle(inbound_text("ev-2", "5511888880000", "hola")).await;
    assert!(matches!(
        outcome,
        IngestOutcome::Stored {
            autoreply: Some(AutoReplyOutcome::Replied { .. }),
            ..
        }
    ));
    assert_eq!(h.responder.call_count().await, 1);
}

#[tokio::test]
async fn non_text_messages_skip_responder() {
    let h = Harness::new(one_queue()).await;
    let outcome = h
        .handle(inbound_location("loc-1", NUMBER, Some("Casa")))
        .await;
    assert!(matches!(
        outcome,
        IngestOutcome::Stored {
            autoreply: None,
            ..
        }
    ));
    assert_eq!(h.responder.call_count().await, 0);
}

// --- Self-sent events ---

#[tokio::test]
async fn automated_echo_is_dropped() {
    let h = Harness::new(account(1, "main")).await;
    let outcome = h
        .handle(outbound_text("out-1", NUMBER, "respuesta automatica", true))
        .await;
    assert_eq!(outcome, IngestOutcome::Rejected(Rejection::AutomatedEcho));
}

#[tokio::test]
async fn agent_reply_is_logged_without_routing() {
    let h = Harness::new(two_queues()).await;
    let (ticket, outcome) = h
        .stored(outbound_text("out-1", NUMBER, "te ayudo enseguida", false))
        .await;
    assert!(matches!(
        outcome,
        IngestOutcome::Stored {
            route: None,
            autoreply: None,
            ..
        }
    ));
    let messages = h.messages(&ticket).await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].from_me);
    assert!(messages[0].read);
    assert_eq!(messages[0].contact_id, None);
    assert_eq!(ticket.status, TicketStatus::Open);
    settle().await;
    assert_eq!(h.transport.sent_count().await, 0);
}

#[tokio::test]
async fn farewell_echo_is_skipped() {
    let h = Harness::new(account(1, "main")).await;
    let outcome = h
        .handle(outbound_text("out-1", NUMBER, "Gracias por escribirnos", false))
        .await;
    assert_eq!(outcome, IngestOutcome::FarewellSkipped);
}

#[tokio::test]
async fn self_sent_media_is_ignored() {
    let h = Harness::new(account(1, "main")).await;
    let mut event = inbound_media("m-1", NUMBER, "image", "");
    event.from_me = true;
    assert_eq!(
        h.handle(event).await,
        IngestOutcome::Rejected(Rejection::IgnoredEcho(chatdesk_core::ContentKind::Image))
    );
}

#[tokio::test]
async fn status_broadcast_and_unknown_kinds_are_dropped() {
    let h = Harness::new(account(1, "main")).await;
    let mut status = inbound_text("s-1", NUMBER, "story");
    status.from = "status@broadcast".into();
    assert_eq!(
        h.handle(status).await,
        IngestOutcome::Rejected(Rejection::StatusBroadcast)
    );

    let mut poll = inbound_text("p-1", NUMBER, "");
    poll.kind = "poll_creation".into();
    assert_eq!(
        h.handle(poll).await,
        IngestOutcome::Rejected(Rejection::UnknownKind("poll_creation".into()))
    );
}

// --- Agent commands ---

async fn agent_owned_ticket(h: &Harness) -> Ticket {
    let (ticket, _) = h.stored(inbound_text("ev-1", NUMBER, "hola")).await;
    h.update(
        &ticket,
        TicketUpdate {
            user_id: Some(Some(7)),
            status: Some(TicketStatus::Open),
            ..TicketUpdate::default()
        },
    )
    .await
}

#[tokio::test]
async fn ritual_command_returns_ticket_to_bot() {
    let h = Harness::new(account(1, "main")).await;
    let ticket = agent_owned_ticket(&h).await;

    let outcome = h
        .handle(outbound_text("cmd-1", NUMBER, "/Activar-Ritual", false))
        .await;
    assert_eq!(outcome, IngestOutcome::Command(AgentCommand::ActivateRitual));

    let ticket = h.ticket(ticket.id).await;
    assert_eq!(ticket.user_id, None);
    assert_eq!(ticket.status, TicketStatus::Pending);
    assert_eq!(ticket.phase, TicketPhase::Ritual);

    let sent = h.transport.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, RITUAL_CONFIRMATION);
    let bodies: Vec<String> = h.messages(&ticket).await.into_iter().map(|m| m.body).collect();
    assert!(!bodies.iter().any(|b| b.starts_with('/')));
}

#[tokio::test]
async fn info_command_replies_with_summary() {
    let h = Harness::new(account(1, "main")).await;
    let ticket = agent_owned_ticket(&h).await;

    let outcome = h.handle(outbound_text("cmd-1", NUMBER, "/info", false)).await;
    assert_eq!(outcome, IngestOutcome::Command(AgentCommand::Info));
    let sent = h.transport.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.starts_with(&format!("Info del ticket #{}", ticket.id)));
    assert!(sent[0].text.contains("Usuario asignado: 7"));
}

#[tokio::test]
async fn unknown_slash_text_is_an_ordinary_message() {
    let h = Harness::new(account(1, "main")).await;
    let (ticket, _) = h
        .stored(outbound_text("out-1", NUMBER, "/precio", false))
        .await;
    assert_eq!(h.messages(&ticket).await[0].body, "/precio");
}

// --- Content normalization ---

#[tokio::test]
async fn media_is_downloaded_and_stored() {
    let h = Harness::new(account(1, "main")).await;
    h.transport
        .set_media(
            "m-1",
            MediaPayload {
                data: b"jpeg bytes".to_vec(),
                mimetype: "image/jpeg".into(),
                filename: Some("foto.jpg".into()),
            },
        )
        .await;

    let (ticket, _) = h.stored(inbound_media("m-1", NUMBER, "image", "")).await;
    let message = &h.messages(&ticket).await[0];
    let name = message.media_url.clone().unwrap();
    assert!(name.starts_with("foto.") && name.ends_with(".jpg"), "{name}");
    assert_eq!(message.media_type.as_deref(), Some("image"));
    assert_eq!(message.body, name);
    assert_eq!(ticket.last_message, name);
    assert_eq!(h.blobs.get(&name).await.unwrap(), b"jpeg bytes");
}

#[tokio::test]
async fn media_caption_is_kept_as_body() {
    let h = Harness::new(account(1, "main")).await;
    h.transport
        .set_media(
            "m-1",
            MediaPayload {
                data: vec![1, 2, 3],
                mimetype: "application/pdf".into(),
                filename: None,
            },
        )
        .await;
    let (ticket, _) = h
        .stored(inbound_media("m-1", NUMBER, "document", "factura"))
        .await;
    let message = &h.messages(&ticket).await[0];
    assert_eq!(message.body, "factura");
    assert!(message.media_url.as_deref().unwrap().ends_with(".pdf"));
    assert_eq!(message.media_type.as_deref(), Some("application"));
}

#[tokio::test]
async fn failed_download_aborts_only_that_event() {
    let h = Harness::new(account(1, "main")).await;
    let err = h
        .pipeline
        .handle(&h.session, inbound_media("m-1", NUMBER, "image", ""))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        chatdesk_core::ChatdeskError::MediaDownloadFailed { ref event_id, .. } if event_id == "m-1"
    ));

    h.pipeline
        .on_message(&h.session, inbound_media("m-2", NUMBER, "image", ""))
        .await;
    assert!(h.reporter.reports().iter().any(|(c, _)| *c == "ingest"));

    let (ticket, _) = h.stored(inbound_text("ev-3", NUMBER, "hola")).await;
    let ids: Vec<String> = h.messages(&ticket).await.into_iter().map(|m| m.id).collect();
    assert_eq!(ids, ["ev-3"]);
}

#[tokio::test]
async fn failed_blob_write_keeps_the_message() {
    let h = Harness::new(account(1, "main")).await;
    h.blobs.fail_saves(true);
    h.transport
        .set_media(
            "m-1",
            MediaPayload {
                data: vec![0; 4],
                mimetype: "audio/ogg; codecs=opus".into(),
                filename: None,
            },
        )
        .await;
    let (ticket, _) = h.stored(inbound_media("m-1", NUMBER, "ptt", "")).await;
    assert_eq!(h.messages(&ticket).await.len(), 1);
    assert!(h.reporter.reports().iter().any(|(c, _)| *c == "media"));
}

#[tokio::test]
async fn location_is_rewritten_with_map_link() {
    let h = Harness::new(account(1, "main")).await;
    let mut event = inbound_location("loc-1", NUMBER, Some("Av. Paulista\\nSao Paulo"));
    event.body = "THUMB".into();
    let location = event.location.clone().unwrap();

    let (ticket, _) = h.stored(event).await;
    let body = &h.messages(&ticket).await[0].body;
    let parts: Vec<&str> = body.split('|').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "data:image/png;base64,THUMB");
    assert!(parts[1].starts_with("https://maps.google.com/maps?q=-23.55%2C-46.63"));
    assert!(parts[1].ends_with("&hl=pt-BR"));
    assert_eq!(parts[2], "Av. Paulista\\nSao Paulo");
    assert_eq!(ticket.last_message, location_preview(&location));
    assert_eq!(ticket.last_message, "Localization - Av. Paulista");
}

#[tokio::test]
async fn quoted_message_is_linked_when_known() {
    let h = Harness::new(account(1, "main")).await;
    h.stored(inbound_text("q-1", NUMBER, "original")).await;

    let mut reply = inbound_text("q-2", NUMBER, "respuesta");
    reply.quoted_id = Some("q-1".into());
    let mut orphan = inbound_text("q-3", NUMBER, "huérfano");
    orphan.quoted_id = Some("never-seen".into());
    h.stored(reply).await;
    let (ticket, _) = h.stored(orphan).await;

    let messages = h.messages(&ticket).await;
    assert_eq!(messages[1].quoted_msg_id.as_deref(), Some("q-1"));
    assert_eq!(messages[2].quoted_msg_id, None);
}

#[tokio::test]
async fn contact_card_creates_contacts() {
    let h = Harness::new(account(1, "main")).await;
    let mut card = inbound_text(
        "v-1",
        NUMBER,
        "BEGIN:VCARD\nVERSION:3.0\nFN:Maria Lopez\n\
         TEL;type=CELL;waid=5511988887777:+55 11 98888-7777\nEND:VCARD",
    );
    card.kind = "vcard".into();
    h.stored(card).await;

    let again = h
        .store
        .create_contact(&NewContact {
            name: "dup".into(),
            number: "5511988887777".into(),
            profile_pic_url: None,
            is_group: false,
        })
        .await
        .unwrap();
    assert!(again.is_none(), "card contact should already exist");
}

// --- Groups ---

#[tokio::test]
async fn group_events_only_record_identities() {
    let h = Harness::new(two_queues()).await;
    let outcome = h
        .handle(group_text("g-1", "120363000", NUMBER, "hola grupo"))
        .await;
    assert_eq!(outcome, IngestOutcome::GroupIdentified);

    let group = h
        .store
        .create_contact(&NewContact {
            name: "x".into(),
            number: "120363000".into(),
            profile_pic_url: None,
            is_group: true,
        })
        .await
        .unwrap();
    assert!(group.is_none(), "group contact should be recorded");

    settle().await;
    assert_eq!(h.transport.sent_count().await, 0);
    assert!(
        h.push
            .events()
            .iter()
            .all(|(_, e)| !matches!(e, PushEvent::MessageCreated { .. }))
    );
}

// --- Acknowledgements and push ---

#[tokio::test]
async fn ack_updates_message_and_pushes() {
    let h = Harness::new(account(1, "main")).await;
    let (ticket, _) = h.stored(inbound_text("ev-1", NUMBER, "hola")).await;

    h.pipeline
        .on_ack(&h.session, "ev-1".into(), AckLevel::Read)
        .await;
    let updates: Vec<PushEvent> = h
        .push
        .on_channel(&PushChannel::Ticket(ticket.id))
        .into_iter()
        .filter(|e| matches!(e, PushEvent::MessageUpdated { .. }))
        .collect();
    assert_eq!(updates.len(), 1);
    let PushEvent::MessageUpdated { view } = &updates[0] else {
        unreachable!()
    };
    assert_eq!(view.message.ack, AckLevel::Read);

    h.pipeline
        .on_ack(&h.session, "unknown".into(), AckLevel::Read)
        .await;
    let count = h
        .push
        .events()
        .iter()
        .filter(|(_, e)| matches!(e, PushEvent::MessageUpdated { .. }))
        .count();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn stored_messages_are_pushed_on_their_ticket() {
    let h = Harness::new(account(1, "main")).await;
    let (ticket, _) = h.stored(inbound_text("ev-1", NUMBER, "hola")).await;
    let events = h.push.on_channel(&PushChannel::Ticket(ticket.id));
    assert!(events.iter().any(|e| matches!(
        e,
        PushEvent::MessageCreated { message, .. } if message.id == "ev-1"
    )));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, PushEvent::TicketUpdated { .. }))
    );
}

#[tokio::test]
async fn unread_count_comes_from_the_chat() {
    let h = Harness::new(account(1, "main")).await;
    let mut event = inbound_text("ev-1", NUMBER, "hola");
    event.chat = ChatInfo {
        id: format!("{NUMBER}@c.us"),
        is_group: false,
        unread_count: 4,
    };
    let (ticket, _) = h.stored(event).await;
    assert_eq!(ticket.unread_messages, 4);
    let contact: Contact = h.store.get_contact(ticket.contact_id).await.unwrap().unwrap();
    assert_eq!(contact.number, NUMBER);
}
