// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations. The primary key is the transport event id.

use chatdesk_core::{AckLevel, ChatdeskError, Message, MessageView, NewMessage, TicketId};
use rusqlite::{OptionalExtension, params};

use super::contacts::{CONTACT_COLUMNS, contact_from_row};
use crate::database::{Database, map_tr_err, now_ts};

const MESSAGE_COLUMNS: &str = "id, ticket_id, contact_id, body, from_me, read, ack, \
                               media_type, media_url, quoted_msg_id, created_at";

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        contact_id: row.get(2)?,
        body: row.get(3)?,
        from_me: row.get(4)?,
        read: row.get(5)?,
        ack: AckLevel::from(row.get::<_, i8>(6)?),
        media_type: row.get(7)?,
        media_url: row.get(8)?,
        quoted_msg_id: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn select_message(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<Message>> {
    conn.query_row(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
        params![id],
        message_from_row,
    )
    .optional()
}

/// Inserts a message. Returns `false` if the id was already stored, in which
/// case the existing row is left untouched.
pub async fn insert_message(db: &Database, message: &NewMessage) -> Result<bool, ChatdeskError> {
    let m = message.clone();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO messages (id, ticket_id, contact_id, body, from_me, read, ack,
                    media_type, media_url, quoted_msg_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    m.id,
                    m.ticket_id,
                    m.contact_id,
                    m.body,
                    m.from_me,
                    m.read,
                    i8::from(m.ack),
                    m.media_type,
                    m.media_url,
                    m.quoted_msg_id,
                    now_ts(),
                ],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, ChatdeskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| select_message(conn, &id))
        .await
        .map_err(map_tr_err)
}

/// The latest `limit` messages of a ticket, oldest first.
pub async fn recent_messages(
    db: &Database,
    ticket_id: TicketId,
    limit: usize,
) -> Result<Vec<Message>, ChatdeskError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE ticket_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
            ))?;
            let mut messages = stmt
                .query_map(params![ticket_id, limit], message_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Sets the ack level and loads the message for display: its contact and the
/// message it quotes.
pub async fn update_ack(
    db: &Database,
    id: &str,
    ack: AckLevel,
) -> Result<Option<MessageView>, ChatdeskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE messages SET ack = ?1 WHERE id = ?2",
                params![i8::from(ack), id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let Some(message) = select_message(conn, &id)? else {
                return Ok(None);
            };
            let contact = match message.contact_id {
                Some(contact_id) => conn
                    .query_row(
                        &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
                        params![contact_id],
                        contact_from_row,
                    )
                    .optional()?,
                None => None,
            };
            let quoted = match &message.quoted_msg_id {
                Some(quoted_id) => select_message(conn, quoted_id)?,
                None => None,
            };
            Ok(Some(MessageView {
                message,
                contact,
                quoted,
            }))
        })
        .await
        .map_err(map_tr_err)
}
