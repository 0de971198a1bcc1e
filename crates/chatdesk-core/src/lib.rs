// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for chatdesk.
//!
//! Holds the domain records (accounts, contacts, tickets, messages, queues),
//! the capability traits the session manager and ingestion pipeline consume,
//! and the shared error type.

pub mod error;
pub mod sync;
pub mod traits;
pub mod types;

pub use error::ChatdeskError;
pub use sync::{KeyedGuard, KeyedLocks};
pub use types::*;

pub use traits::{
    BlobStore, ErrorReporter, EventSink, PluginAdapter, PushPublisher, ResponderAdapter,
    SessionHandle, StorageAdapter, Transport, TransportConnection, TransportFactory,
};
