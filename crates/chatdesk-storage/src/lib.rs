// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for chatdesk.
//!
//! A single tokio-rusqlite connection serializes all access; refinery applies
//! the embedded schema on open. [`SqliteStore`] implements the core
//! [`StorageAdapter`](chatdesk_core::StorageAdapter) and [`FsBlobStore`] keeps
//! downloaded media on disk.

pub mod adapter;
pub mod blob;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use blob::FsBlobStore;
pub use database::Database;
