// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits consumed by the session manager and ingestion pipeline.
//!
//! Long-lived backends extend [`PluginAdapter`] and use `#[async_trait]` for
//! dynamic dispatch.

pub mod adapter;
pub mod responder;
pub mod sink;
pub mod storage;
pub mod transport;

pub use adapter::PluginAdapter;
pub use responder::ResponderAdapter;
pub use sink::{BlobStore, ErrorReporter, EventSink, PushPublisher};
pub use storage::StorageAdapter;
pub use transport::{SessionHandle, Transport, TransportConnection, TransportFactory};
