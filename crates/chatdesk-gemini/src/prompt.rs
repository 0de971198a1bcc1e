// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phase prompts and the `[[action:...]]` reply convention.

use std::str::FromStr;
use std::sync::LazyLock;

use chatdesk_core::{HistoryEntry, PhaseContext, ResponderAction, TicketPhase};
use regex::Regex;

static ACTION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[\s*action\s*:\s*([A-Za-z_\-]+)\s*\]\]").unwrap());

const SALES: &str = "Eres el asistente de ventas de la tienda. Entiende lo que busca el cliente, \
recomienda productos adecuados y responde sobre precios y disponibilidad. \
Se cordial y claro, sin presionar.";

const PAYMENT_RECEIVED: &str = "El cliente ya realizo su pago. Confirma que lo recibimos, \
agradece la compra y explica los siguientes pasos.";

const RITUAL: &str = "El cliente esta en la fase de ritual. Dale las instrucciones paso a paso, \
de una en una, y confirma que entendio cada paso antes de continuar.";

const COMPLETED: &str = "El cliente ya recibio todas las instrucciones. Responde dudas puntuales \
con amabilidad y brevedad.";

const ACTIONS: &str = "Si el cliente pide hablar con una persona, agrega al final \
[[action:escalate-to-agent]]. Si el cliente confirma o envia comprobante de pago, agrega al final \
[[action:payment-detected]]. Si terminaste de dar todas las instrucciones del ritual, agrega al \
final [[action:phase-complete]]. \
En cualquier otro caso no agregues ninguna etiqueta.";

/// System instruction for a phase.
pub fn system_instruction(context: PhaseContext) -> String {
    let phase = match context.phase {
        TicketPhase::Sales => SALES,
        TicketPhase::PaymentReceived => PAYMENT_RECEIVED,
        TicketPhase::Ritual => RITUAL,
        TicketPhase::Completed => COMPLETED,
    };
    let mut out = format!("{phase}\n\n");
    if context.has_paid {
        out.push_str("El cliente ya pago.\n");
    }
    if context.ritual_instructions_given {
        out.push_str("Las instrucciones del ritual ya fueron entregadas.\n");
    }
    out.push_str(ACTIONS);
    out
}

/// The user turn: prior conversation, then the message to answer.
pub fn user_prompt(prompt: &str, history: &[HistoryEntry]) -> String {
    if history.is_empty() {
        return format!("Nuevo mensaje: {prompt}\n\nResponde de forma amigable y profesional.");
    }
    let lines: Vec<String> = history.iter().map(ToString::to_string).collect();
    format!(
        "Historial de conversacion:\n{}\n\nNuevo mensaje: {prompt}\n\n\
         Responde de forma amigable y profesional.",
        lines.join("\n")
    )
}

/// Strips action tags from a model reply. The last recognized tag wins;
/// unrecognized tags are removed and ignored.
pub fn split_action(reply: &str) -> (String, ResponderAction) {
    let action = ACTION_TAG
        .captures_iter(reply)
        .filter_map(|caps| parse_action(&caps[1]))
        .last()
        .unwrap_or_default();
    let text = ACTION_TAG.replace_all(reply, "").trim().to_string();
    (text, action)
}

fn parse_action(raw: &str) -> Option<ResponderAction> {
    let normalized = raw.trim().to_lowercase().replace('_', "-");
    match normalized.as_str() {
        "assign-to-agent" => Some(ResponderAction::EscalateToAgent),
        "ritual-instructions-complete" => Some(ResponderAction::PhaseComplete),
        other => ResponderAction::from_str(other).ok(),
    }
}

#[cfg(test)]
mod tests {
    use chatdesk_core::Origin;

    use super::*;

    #[test]
    fn trailing_tag_becomes_action() {
        let (text, action) =
            split_action("Te comunico con un asesor. [[action:escalate-to-agent]]");
        assert_eq!(text, "Te comunico con un asesor.");
        assert_eq!(action, ResponderAction::EscalateToAgent);
    }

    #[test]
    fn legacy_upper_snake_names_are_understood() {
        assert_eq!(
            split_action("ok [[action: PAYMENT_DETECTED ]]").1,
            ResponderAction::PaymentDetected
        );
        assert_eq!(
            split_action("listo [[action:RITUAL_INSTRUCTIONS_COMPLETE]]").1,
            ResponderAction::PhaseComplete
        );
        assert_eq!(
            split_action("[[action:ASSIGN_TO_AGENT]]").1,
            ResponderAction::EscalateToAgent
        );
    }

    #[test]
    fn untagged_and_unknown_tags_mean_none() {
        assert_eq!(split_action("hola").1, ResponderAction::None);
        let (text, action) = split_action("hola [[action:dance]]");
        assert_eq!(text, "hola");
        assert_eq!(action, ResponderAction::None);
    }

    #[test]
    fn tag_only_reply_leaves_empty_text() {
        let (text, action) = split_action("  [[action:phase-complete]] ");
        assert!(text.is_empty());
        assert_eq!(action, ResponderAction::PhaseComplete);
    }

    #[test]
    fn user_prompt_lists_history_by_origin() {
        let history = vec![
            HistoryEntry {
                origin: Origin::Customer,
                body: "hola".into(),
            },
            HistoryEntry {
                origin: Origin::Assistant,
                body: "Buenas!".into(),
            },
        ];
        let prompt = user_prompt("precio?", &history);
        assert!(
            prompt.starts_with("Historial de conversacion:\nCliente: hola\nAsistente: Buenas!\n\n")
        );
        assert!(prompt.contains("Nuevo mensaje: precio?"));
        assert!(!user_prompt("precio?", &[]).contains("Historial"));
    }

    #[test]
    fn system_instruction_follows_phase() {
        let sales = system_instruction(TicketPhase::Sales.context());
        assert!(sales.contains("ventas"));
        assert!(!sales.contains("ya pago"));
        let done = system_instruction(TicketPhase::Completed.context());
        assert!(done.contains("ya pago"));
        assert!(done.contains("ya fueron entregadas"));
        assert!(done.contains("[[action:phase-complete]]"));
    }
}
