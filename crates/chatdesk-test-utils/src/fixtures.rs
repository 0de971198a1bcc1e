// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for common test inputs.

use chatdesk_config::model::{AccountConfig, QueueConfig};
use chatdesk_core::{ChatInfo, Location, TransportEvent};

/// An account with a greeting and no queues.
pub fn account(id: i64, name: &str) -> AccountConfig {
    AccountConfig {
        id,
        name: name.to_string(),
        greeting_message: "Hola {{name}}! Elige una opcion:".to_string(),
        farewell_message: "Gracias por escribirnos".to_string(),
        auto_start: true,
        queues: Vec::new(),
    }
}

/// Adds a queue to an account config.
pub fn with_queue(mut account: AccountConfig, name: &str, greeting: &str) -> AccountConfig {
    account.queues.push(QueueConfig {
        name: name.to_string(),
        greeting_message: greeting.to_string(),
    });
    account
}

/// An incoming text from a one-to-one chat with `number`.
pub fn inbound_text(id: &str, number: &str, body: &str) -> TransportEvent {
    let chat_id = format!("{number}@c.us");
    TransportEvent {
        id: id.to_string(),
        from: chat_id.clone(),
        to: "me@c.us".to_string(),
        from_me: false,
        kind: "chat".to_string(),
        body: body.to_string(),
        has_media: false,
        chat: ChatInfo {
            id: chat_id,
            is_group: false,
            unread_count: 1,
        },
        author: None,
        location: None,
        quoted_id: None,
        automated: false,
    }
}

/// A text the account itself sent to `number` (typed by an agent unless
/// `automated`).
pub fn outbound_text(id: &str, number: &str, body: &str, automated: bool) -> TransportEvent {
    let chat_id = format!("{number}@c.us");
    TransportEvent {
        id: id.to_string(),
        from: "me@c.us".to_string(),
        to: chat_id.clone(),
        from_me: true,
        kind: "chat".to_string(),
        body: body.to_string(),
        has_media: false,
        chat: ChatInfo {
            id: chat_id,
            is_group: false,
            unread_count: 0,
        },
        author: None,
        location: None,
        quoted_id: None,
        automated,
    }
}

/// An incoming message in a group chat, written by `author`.
pub fn group_text(id: &str, group: &str, author: &str, body: &str) -> TransportEvent {
    let chat_id = format!("{group}@g.us");
    TransportEvent {
        author: Some(format!("{author}@c.us")),
        chat: ChatInfo {
            id: chat_id.clone(),
            is_group: true,
            unread_count: 1,
        },
        from: chat_id,
        ..inbound_text(id, author, body)
    }
}

/// An incoming media message of the given wire kind.
pub fn inbound_media(id: &str, number: &str, kind: &str, caption: &str) -> TransportEvent {
    TransportEvent {
        kind: kind.to_string(),
        has_media: true,
        ..inbound_text(id, number, caption)
    }
}

/// An incoming location pin.
pub fn inbound_location(id: &str, number: &str, description: Option<&str>) -> TransportEvent {
    TransportEvent {
        kind: "location".to_string(),
        location: Some(Location {
            latitude: -23.55,
            longitude: -46.63,
            description: description.map(str::to_string),
        }),
        ..inbound_text(id, number, "")
    }
}
