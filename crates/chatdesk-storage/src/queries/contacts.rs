// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact operations. Contacts are keyed by number.

use chatdesk_core::{ChatdeskError, Contact, ContactId, NewContact};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err, now_ts};

pub(crate) const CONTACT_COLUMNS: &str = "id, name, number, profile_pic_url, is_group";

pub(crate) fn contact_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        name: row.get(1)?,
        number: row.get(2)?,
        profile_pic_url: row.get(3)?,
        is_group: row.get(4)?,
    })
}

/// Inserts the contact or refreshes name and picture of the one with the
/// same number. A missing picture never erases a known one.
pub async fn upsert_contact(db: &Database, contact: &NewContact) -> Result<Contact, ChatdeskError> {
    let contact = contact.clone();
    db.connection()
        .call(move |conn| {
            let now = now_ts();
            conn.query_row(
                &format!(
                    "INSERT INTO contacts
                        (name, number, profile_pic_url, is_group, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                     ON CONFLICT(number) DO UPDATE SET
                        name = excluded.name,
                        profile_pic_url =
                            COALESCE(excluded.profile_pic_url, contacts.profile_pic_url),
                        updated_at = excluded.updated_at
                     RETURNING {CONTACT_COLUMNS}"
                ),
                params![
                    contact.name,
                    contact.number,
                    contact.profile_pic_url,
                    contact.is_group,
                    now
                ],
                contact_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Inserts the contact unless one with the same number exists, in which
/// case nothing changes and `None` is returned.
pub async fn create_contact(
    db: &Database,
    contact: &NewContact,
) -> Result<Option<Contact>, ChatdeskError> {
    let contact = contact.clone();
    db.connection()
        .call(move |conn| {
            let now = now_ts();
            conn.query_row(
                &format!(
                    "INSERT INTO contacts
                        (name, number, profile_pic_url, is_group, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                     ON CONFLICT(number) DO NOTHING
                     RETURNING {CONTACT_COLUMNS}"
                ),
                params![
                    contact.name,
                    contact.number,
                    contact.profile_pic_url,
                    contact.is_group,
                    now
                ],
                contact_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_contact(db: &Database, id: ContactId) -> Result<Option<Contact>, ChatdeskError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
                params![id],
                contact_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
