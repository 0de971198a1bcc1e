// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue routing for tickets that have no queue yet.

use std::sync::Arc;
use std::time::Duration;

use chatdesk_core::{
    Account, ChatdeskError, Contact, ErrorReporter, KeyedLocks, Queue, QueueId, SessionHandle,
    StorageAdapter, Ticket, TicketId, TicketUpdate,
};
use tracing::{debug, info};

use crate::ConversationKey;
use crate::debounce::Debouncer;
use crate::template::render;
use crate::writer::Outbox;

/// What the router did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The account has no queues; nothing to route.
    NoQueues,
    /// The only queue was assigned without asking.
    AutoAssigned(QueueId),
    /// The customer picked a queue from the menu.
    Selected(QueueId),
    /// The reply was not a valid option; a menu send is pending.
    MenuScheduled,
}

pub struct QueueRouter {
    store: Arc<dyn StorageAdapter>,
    outbox: Arc<Outbox>,
    reporter: Arc<dyn ErrorReporter>,
    locks: KeyedLocks<ConversationKey>,
    menus: Debouncer<TicketId>,
    menu_delay: Duration,
}

impl QueueRouter {
    pub fn new(
        store: Arc<dyn StorageAdapter>,
        outbox: Arc<Outbox>,
        reporter: Arc<dyn ErrorReporter>,
        locks: KeyedLocks<ConversationKey>,
        menu_delay: Duration,
    ) -> Self {
        Self {
            store,
            outbox,
            reporter,
            locks,
            menus: Debouncer::new(),
            menu_delay,
        }
    }

    /// Routes a ticket without a queue. Returns the outcome and the ticket
    /// as it stands afterwards.
    ///
    /// Must be called with the conversation lock held.
    pub async fn route(
        &self,
        session: &SessionHandle,
        account: &Account,
        ticket: &Ticket,
        contact: &Contact,
        body: &str,
    ) -> Result<(RouteOutcome, Ticket), ChatdeskError> {
        let queues = self.store.queues_for_account(account.id).await?;

        if let [only] = queues.as_slice() {
            let ticket = self.assign(ticket, only.id).await?;
            debug!(ticket_id = ticket.id, queue_id = only.id, "single queue assigned");
            return Ok((RouteOutcome::AutoAssigned(only.id), ticket));
        }
        if queues.is_empty() {
            return Ok((RouteOutcome::NoQueues, ticket.clone()));
        }

        if let Some(queue) = selected_queue(&queues, body) {
            self.menus.cancel(&ticket.id);
            let ticket = self.assign(ticket, queue.id).await?;
            info!(ticket_id = ticket.id, queue = %queue.name, "queue selected");
            let greeting = render(&queue.greeting_message, contact);
            let ticket = if greeting.trim().is_empty() {
                ticket
            } else {
                self.outbox
                    .send(session, &ticket, contact, &greeting)
                    .await?
                    .ticket
            };
            return Ok((RouteOutcome::Selected(queue.id), ticket));
        }

        let menu = render_menu(&account.greeting_message, &queues, contact);
        self.schedule_menu(session.clone(), ticket, contact.clone(), menu);
        Ok((RouteOutcome::MenuScheduled, ticket.clone()))
    }

    /// Number of tickets with a menu send still waiting.
    pub fn pending_menus(&self) -> usize {
        self.menus.pending()
    }

    async fn assign(&self, ticket: &Ticket, queue_id: QueueId) -> Result<Ticket, ChatdeskError> {
        let ticket = self
            .store
            .update_ticket(
                ticket.id,
                &TicketUpdate {
                    queue_id: Some(queue_id),
                    ..TicketUpdate::default()
                },
            )
            .await?;
        self.outbox.writer().publish_ticket(&ticket);
        Ok(ticket)
    }

    fn schedule_menu(
        &self,
        session: SessionHandle,
        ticket: &Ticket,
        contact: Contact,
        menu: String,
    ) {
        let store = Arc::clone(&self.store);
        let outbox = Arc::clone(&self.outbox);
        let reporter = Arc::clone(&self.reporter);
        let locks = self.locks.clone();
        let key = (ticket.account_id, ticket.contact_id);
        let ticket_id = ticket.id;

        self.menus.schedule(ticket_id, self.menu_delay, async move {
            let _guard = locks.lock(key).await;
            let result = async {
                let Some(current) = store.get_ticket(ticket_id).await? else {
                    return Ok(());
                };
                if current.queue_id.is_some() {
                    debug!(ticket_id, "queue chosen meanwhile, menu dropped");
                    return Ok(());
                }
                outbox.send(&session, &current, &contact, &menu).await?;
                debug!(ticket_id, "queue menu sent");
                Ok::<_, ChatdeskError>(())
            }
            .await;
            if let Err(e) = result {
                reporter.report("router", &e);
            }
        });
    }
}

/// Reads the body as a 1-based option number.
pub fn selected_queue<'a>(queues: &'a [Queue], body: &str) -> Option<&'a Queue> {
    let choice: usize = body.trim().parse().ok()?;
    choice.checked_sub(1).and_then(|index| queues.get(index))
}

/// Greeting line followed by one `*n* - name` line per queue.
pub fn render_menu(greeting: &str, queues: &[Queue], contact: &Contact) -> String {
    let options: String = queues
        .iter()
        .enumerate()
        .map(|(i, q)| format!("*{}* - {}\n", i + 1, q.name))
        .collect();
    render(&format!("{greeting}\n{options}"), contact)
}
