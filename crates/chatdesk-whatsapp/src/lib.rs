// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp transport for chatdesk.
//!
//! The messaging client itself runs in a sidecar process; this crate speaks
//! its JSON-over-WebSocket protocol and exposes it as a
//! [`chatdesk_core::Transport`].

pub mod factory;
pub mod protocol;
pub mod transport;

pub use factory::SidecarFactory;
pub use transport::{SidecarSettings, SidecarTransport};
