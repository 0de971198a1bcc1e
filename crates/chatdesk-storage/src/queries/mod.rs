// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions, one module per table.
//!
//! Every function takes a [`Database`](crate::database::Database) and runs
//! its statements inside a single `call`, so each one is atomic with respect
//! to the others.

pub mod accounts;
pub mod contacts;
pub mod messages;
pub mod tickets;

use std::str::FromStr;

/// Reads a text column and parses it with `FromStr` (strum enums).
pub(crate) fn parse_col<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
