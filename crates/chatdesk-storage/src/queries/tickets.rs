// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket operations, including find-or-create.

use std::time::Duration;

use chatdesk_core::{
    AccountId, ChatdeskError, ContactId, Ticket, TicketId, TicketStatus, TicketUpdate,
};
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, params, params_from_iter};
use tracing::debug;

use super::parse_col;
use crate::database::{Database, TS_FORMAT, map_tr_err, now_ts};

const TICKET_COLUMNS: &str = "id, account_id, contact_id, status, user_id, queue_id, phase, \
                              unread_messages, is_group, last_message, updated_at";

fn ticket_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        account_id: row.get(1)?,
        contact_id: row.get(2)?,
        status: parse_col(row, 3)?,
        user_id: row.get(4)?,
        queue_id: row.get(5)?,
        phase: parse_col(row, 6)?,
        unread_messages: row.get(7)?,
        is_group: row.get(8)?,
        last_message: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn select_by_id(conn: &rusqlite::Connection, id: TicketId) -> rusqlite::Result<Ticket> {
    conn.query_row(
        &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"),
        params![id],
        ticket_from_row,
    )
}

/// Inputs of a find-or-create.
#[derive(Debug, Clone)]
pub struct TicketLookup {
    pub account_id: AccountId,
    pub contact_id: ContactId,
    pub unread_messages: u32,
    /// Set when the conversation is a group; the group is the ticket owner.
    pub group_contact_id: Option<ContactId>,
    /// A non-group contact's ticket touched within this window is reused.
    pub reopen_window: Duration,
}

/// Returns the active ticket for the lookup, reusing or creating one.
///
/// 1. An open/pending ticket exists: refresh its unread count.
/// 2. Group conversation: reuse the group's latest ticket as pending.
/// 3. Latest ticket touched within the reopen window: reuse it as pending.
/// 4. Otherwise create one, pending when unread messages are waiting.
///
/// Reuse clears the assigned agent and resets the phase to sales. Runs in one
/// transaction, and the partial unique index on active tickets backs rule 1.
pub async fn find_or_create(db: &Database, lookup: TicketLookup) -> Result<Ticket, ChatdeskError> {
    let cutoff = (chrono::Utc::now()
        - chrono::Duration::from_std(lookup.reopen_window).unwrap_or(chrono::Duration::zero()))
    .format(TS_FORMAT)
    .to_string();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let now = now_ts();
            let owner = lookup.group_contact_id.unwrap_or(lookup.contact_id);
            let is_group = lookup.group_contact_id.is_some();

            let active: Option<TicketId> = tx
                .query_row(
                    "SELECT id FROM tickets
                     WHERE account_id = ?1 AND contact_id = ?2 AND status IN ('open', 'pending')
                     ORDER BY updated_at DESC LIMIT 1",
                    params![lookup.account_id, owner],
                    |row| row.get(0),
                )
                .optional()?;

            let id = if let Some(id) = active {
                tx.execute(
                    "UPDATE tickets SET unread_messages = ?1, updated_at = ?2 WHERE id = ?3",
                    params![lookup.unread_messages, now, id],
                )?;
                id
            } else {
                let latest: Option<(TicketId, String)> = tx
                    .query_row(
                        "SELECT id, updated_at FROM tickets
                         WHERE account_id = ?1 AND contact_id = ?2
                         ORDER BY updated_at DESC LIMIT 1",
                        params![lookup.account_id, owner],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;

                match latest {
                    Some((id, updated_at)) if is_group || updated_at >= cutoff => {
                        tx.execute(
                            "UPDATE tickets SET status = 'pending', user_id = NULL, phase = 'sales',
                                unread_messages = ?1, updated_at = ?2
                             WHERE id = ?3",
                            params![lookup.unread_messages, now, id],
                        )?;
                        id
                    }
                    _ => {
                        let status = if lookup.unread_messages > 0 {
                            TicketStatus::Pending
                        } else {
                            TicketStatus::Open
                        };
                        tx.execute(
                            "INSERT INTO tickets (account_id, contact_id, status, unread_messages,
                                is_group, created_at, updated_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                            params![
                                lookup.account_id,
                                owner,
                                status.to_string(),
                                lookup.unread_messages,
                                is_group,
                                now
                            ],
                        )?;
                        tx.last_insert_rowid()
                    }
                }
            };

            let ticket = select_by_id(&tx, id)?;
            tx.commit()?;
            Ok(ticket)
        })
        .await
        .map_err(map_tr_err)
        .inspect(|ticket| debug!(ticket_id = ticket.id, status = %ticket.status, "ticket resolved"))
}

pub async fn get_ticket(db: &Database, id: TicketId) -> Result<Option<Ticket>, ChatdeskError> {
    db.connection()
        .call(move |conn| select_by_id(conn, id).optional())
        .await
        .map_err(map_tr_err)
}

/// Applies a partial update and returns the ticket as stored afterwards.
pub async fn update_ticket(
    db: &Database,
    id: TicketId,
    update: &TicketUpdate,
) -> Result<Ticket, ChatdeskError> {
    let mut sets = vec!["updated_at = ?1".to_string()];
    let mut values = vec![Value::Text(now_ts())];
    let mut push = |column: &str, value: Value| {
        values.push(value);
        sets.push(format!("{column} = ?{}", values.len()));
    };

    if let Some(status) = update.status {
        push("status", Value::Text(status.to_string()));
    }
    if let Some(user_id) = update.user_id {
        push("user_id", user_id.map_or(Value::Null, Value::Integer));
    }
    if let Some(queue_id) = update.queue_id {
        push("queue_id", Value::Integer(queue_id));
    }
    if let Some(phase) = update.phase {
        push("phase", Value::Text(phase.to_string()));
    }
    if let Some(last) = &update.last_message {
        push("last_message", Value::Text(last.clone()));
    }
    if let Some(unread) = update.unread_messages {
        push("unread_messages", Value::Integer(i64::from(unread)));
    }

    values.push(Value::Integer(id));
    let sql = format!(
        "UPDATE tickets SET {} WHERE id = ?{}",
        sets.join(", "),
        values.len()
    );

    db.connection()
        .call(move |conn| {
            conn.execute(&sql, params_from_iter(values))?;
            select_by_id(conn, id)
        })
        .await
        .map_err(map_tr_err)
}
