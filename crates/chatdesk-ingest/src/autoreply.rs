// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auto-response hook: decides whether the automated responder answers a
//! message and applies what it returns.

use std::sync::Arc;
use std::time::Duration;

use chatdesk_config::model::AutoReplyConfig;
use chatdesk_core::{
    ChatdeskError, Contact, ErrorReporter, HistoryEntry, Origin, PhaseEvent, ResponderAction,
    ResponderAdapter, SessionHandle, StorageAdapter, Ticket, TicketStatus, TicketUpdate, UserId,
};
use tracing::{debug, info, warn};

use crate::writer::Outbox;

/// Gate and handoff settings.
#[derive(Debug, Clone)]
pub struct AutoReplySettings {
    pub enabled: bool,
    pub fallback_agent_id: UserId,
    pub history_limit: usize,
    pub timeout: Duration,
    /// Digits-only numbers; empty means everyone.
    pub test_numbers: Vec<String>,
}

impl From<&AutoReplyConfig> for AutoReplySettings {
    fn from(config: &AutoReplyConfig) -> Self {
        Self {
            enabled: config.enabled,
            fallback_agent_id: config.fallback_agent_id,
            history_limit: config.history_limit,
            timeout: Duration::from_secs(config.responder_timeout_secs),
            test_numbers: config
                .test_numbers
                .iter()
                .map(|n| digits(n))
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }
}

impl Default for AutoReplySettings {
    fn default() -> Self {
        Self::from(&AutoReplyConfig::default())
    }
}

/// Result of one hook run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoReplyOutcome {
    Disabled,
    /// Test numbers are configured and this contact is not one of them.
    NotTestNumber,
    AgentAssigned,
    NotConfigured,
    /// The responder failed or timed out; nothing was sent.
    Unavailable,
    /// The responder had nothing to say.
    NoText,
    Replied { action: ResponderAction },
    /// Something after the responder call failed.
    Failed,
}

impl AutoReplyOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::NotTestNumber => "not_test_number",
            Self::AgentAssigned => "agent_assigned",
            Self::NotConfigured => "not_configured",
            Self::Unavailable => "unavailable",
            Self::NoText => "no_text",
            Self::Replied { .. } => "replied",
            Self::Failed => "failed",
        }
    }
}

pub struct AutoReplyHook {
    store: Arc<dyn StorageAdapter>,
    responder: Option<Arc<dyn ResponderAdapter>>,
    outbox: Arc<Outbox>,
    reporter: Arc<dyn ErrorReporter>,
    settings: AutoReplySettings,
}

impl AutoReplyHook {
    pub fn new(
        store: Arc<dyn StorageAdapter>,
        responder: Option<Arc<dyn ResponderAdapter>>,
        outbox: Arc<Outbox>,
        reporter: Arc<dyn ErrorReporter>,
        settings: AutoReplySettings,
    ) -> Self {
        Self {
            store,
            responder,
            outbox,
            reporter,
            settings,
        }
    }

    /// Runs the hook for an inbound text. Never fails: errors are reported
    /// and turned into an outcome.
    ///
    /// Must be called with the conversation lock held.
    pub async fn run(
        &self,
        session: &SessionHandle,
        ticket: Ticket,
        contact: &Contact,
        body: &str,
    ) -> AutoReplyOutcome {
        let ticket_id = ticket.id;
        let outcome = match self.respond(session, ticket, contact, body).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(ticket_id, error = %e, "auto-reply failed");
                self.reporter.report("autoreply", &e);
                AutoReplyOutcome::Failed
            }
        };
        let label = match outcome {
            AutoReplyOutcome::Replied { action } => action.to_string(),
            other => other.label().to_string(),
        };
        crate::metrics::record_autoreply(&label);
        outcome
    }

    async fn respond(
        &self,
        session: &SessionHandle,
        mut ticket: Ticket,
        contact: &Contact,
        body: &str,
    ) -> Result<AutoReplyOutcome, ChatdeskError> {
        if !self.settings.enabled {
            return Ok(AutoReplyOutcome::Disabled);
        }
        if !self.settings.test_numbers.is_empty()
            && !self.settings.test_numbers.contains(&digits(&contact.number))
        {
            debug!(ticket_id = ticket.id, "contact is not a test number");
            return Ok(AutoReplyOutcome::NotTestNumber);
        }

        // Find-or-create already reopens tickets on the ingest path; this
        // covers callers that hand the hook a closed ticket directly.
        if ticket.status == TicketStatus::Closed {
            ticket = self
                .update(
                    &ticket,
                    TicketUpdate {
                        status: Some(TicketStatus::Pending),
                        phase: Some(ticket.phase.advance(PhaseEvent::Reopened)),
                        ..TicketUpdate::default()
                    },
                )
                .await?;
            info!(ticket_id = ticket.id, "closed ticket reopened");
        }

        if let Some(agent) = ticket.user_id {
            debug!(ticket_id = ticket.id, agent, "agent assigned, responder stays quiet");
            return Ok(AutoReplyOutcome::AgentAssigned);
        }

        let Some(responder) = self.responder.as_ref().filter(|r| r.is_configured()) else {
            debug!(ticket_id = ticket.id, "no configured responder");
            return Ok(AutoReplyOutcome::NotConfigured);
        };

        let history: Vec<HistoryEntry> = self
            .store
            .recent_messages(ticket.id, self.settings.history_limit)
            .await?
            .into_iter()
            .map(|m| HistoryEntry {
                origin: if m.from_me {
                    Origin::Assistant
                } else {
                    Origin::Customer
                },
                body: m.body,
            })
            .collect();
        let context = ticket.phase.context();

        let generated = tokio::time::timeout(
            self.settings.timeout,
            responder.generate(body, &history, context),
        )
        .await
        .unwrap_or(Err(ChatdeskError::Timeout {
            duration: self.settings.timeout,
        }));
        let reply = match generated {
            Ok(reply) => reply,
            Err(e) => {
                warn!(ticket_id = ticket.id, error = %e, "responder unavailable");
                self.reporter.report("responder", &e);
                return Ok(AutoReplyOutcome::Unavailable);
            }
        };

        let Some(text) = reply.text.filter(|t| !t.trim().is_empty()) else {
            debug!(ticket_id = ticket.id, "responder returned no text");
            return Ok(AutoReplyOutcome::NoText);
        };

        if reply.action.hands_off() {
            ticket = self
                .update(
                    &ticket,
                    TicketUpdate {
                        status: Some(TicketStatus::Open),
                        user_id: Some(Some(self.settings.fallback_agent_id)),
                        phase: Some(ticket.phase.advance(PhaseEvent::Action(reply.action))),
                        ..TicketUpdate::default()
                    },
                )
                .await?;
            info!(
                ticket_id = ticket.id,
                action = %reply.action,
                agent = self.settings.fallback_agent_id,
                phase = %ticket.phase,
                "ticket handed to agent"
            );
        }

        self.outbox.send(session, &ticket, contact, &text).await?;
        Ok(AutoReplyOutcome::Replied {
            action: reply.action,
        })
    }

    async fn update(&self, ticket: &Ticket, update: TicketUpdate) -> Result<Ticket, ChatdeskError> {
        let ticket = self.store.update_ticket(ticket.id, &update).await?;
        self.outbox.writer().publish_ticket(&ticket);
        Ok(ticket)
    }
}

fn digits(number: &str) -> String {
    number.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_normalize_test_numbers() {
        let config = AutoReplyConfig {
            test_numbers: vec!["+51 986 848 215".into(), "---".into()],
            ..AutoReplyConfig::default()
        };
        let settings = AutoReplySettings::from(&config);
        assert_eq!(settings.test_numbers, vec!["51986848215".to_string()]);
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(AutoReplyOutcome::AgentAssigned.label(), "agent_assigned");
        assert_eq!(
            AutoReplyOutcome::Replied {
                action: ResponderAction::None
            }
            .label(),
            "replied"
        );
    }
}
