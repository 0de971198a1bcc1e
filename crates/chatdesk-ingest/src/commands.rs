// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slash commands an agent can type into a conversation from the phone.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chatdesk_core::Ticket;

/// Sent back when an agent activates the ritual phase.
pub const RITUAL_CONFIRMATION: &str =
    "Fase de ritual activada. El bot comenzara a dar instrucciones.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentCommand {
    /// Hand the ticket back to the bot in the ritual phase.
    ActivateRitual,
    /// Reply with a summary of the ticket.
    Info,
}

impl AgentCommand {
    /// Recognizes a command body, case-insensitively. Anything else that
    /// starts with `/` is an ordinary message.
    pub fn parse(body: &str) -> Option<Self> {
        match body.trim().to_lowercase().as_str() {
            "/activar-ritual" => Some(Self::ActivateRitual),
            "/info" => Some(Self::Info),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ActivateRitual => "activar-ritual",
            Self::Info => "info",
        }
    }
}

/// Ids of the most recently handled commands, oldest evicted first.
#[derive(Debug)]
pub struct HandledCommands {
    ids: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl HandledCommands {
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        let ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        ids.iter().any(|seen| seen == id)
    }

    pub fn insert(&self, id: &str) {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if ids.iter().any(|seen| seen == id) {
            return;
        }
        if ids.len() == self.capacity {
            ids.pop_front();
        }
        ids.push_back(id.to_string());
    }
}

/// Summary text for `/info`.
pub fn ticket_info(ticket: &Ticket) -> String {
    let agent = ticket
        .user_id
        .map_or_else(|| "Ninguno (bot activo)".to_string(), |id| id.to_string());
    let queue = ticket
        .queue_id
        .map_or_else(|| "Sin cola".to_string(), |id| id.to_string());
    format!(
        "Info del ticket #{}\nUsuario asignado: {agent}\nEstado: {}\nFase: {}\nCola: {queue}",
        ticket.id, ticket.status, ticket.phase
    )
}
