// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for chatdesk integration tests.
//!
//! Mock adapters for every capability trait plus a temp-dir SQLite store,
//! so session and pipeline tests run without a phone or a network.
//!
//! # Components
//!
//! - [`MockTransport`] / [`MockTransportFactory`] - scripted transports whose
//!   signals tests emit by hand
//! - [`MockResponder`] - queued responder replies with call capture
//! - [`RecordingPush`], [`RecordingReporter`], [`RecordingSink`] - capture
//!   side effects for assertions
//! - [`MemoryBlobStore`] - in-memory media storage
//! - [`TestStore`] - a migrated SQLite store in a temp directory

pub mod fixtures;
pub mod mock_responder;
pub mod mock_transport;
pub mod recording;
pub mod store;

pub use mock_responder::{MockResponder, ResponderCall};
pub use mock_transport::{MockLink, MockTransport, MockTransportFactory, SentMessage};
pub use recording::{MemoryBlobStore, RecordingPush, RecordingReporter, RecordingSink};
pub use store::TestStore;
