// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event handling for chatdesk.
//!
//! [`IngestPipeline`] is the [`EventSink`](chatdesk_core::EventSink) sessions
//! deliver to. It classifies each event, resolves the contact and ticket,
//! persists the message and then hands off to the [`QueueRouter`] and the
//! [`AutoReplyHook`]. Work on one conversation is serialized by a keyed lock;
//! unrelated conversations run in parallel.

pub mod ack;
pub mod autoreply;
pub mod classify;
pub mod commands;
pub mod debounce;
pub mod location;
pub mod media;
pub mod metrics;
pub mod pipeline;
pub mod push;
pub mod report;
pub mod router;
pub mod template;
pub mod vcard;
pub mod writer;

use chatdesk_core::{AccountId, ContactId};

/// Key of the per-conversation lock.
pub type ConversationKey = (AccountId, ContactId);

pub use ack::AckTracker;
pub use autoreply::{AutoReplyHook, AutoReplyOutcome, AutoReplySettings};
pub use classify::{Rejection, classify};
pub use commands::AgentCommand;
pub use debounce::Debouncer;
pub use metrics::register_metrics;
pub use pipeline::{IngestOutcome, IngestPipeline, IngestPipelineBuilder, IngestSettings};
pub use push::{PushHub, PushMessage};
pub use report::TracingReporter;
pub use router::{QueueRouter, RouteOutcome};
pub use writer::{MessageWriter, Outbox, Recorded};
