// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-account session lifecycle for chatdesk.
//!
//! [`SessionManager`] keeps at most one live transport per account, drives
//! it through the [`SessionState`] machine, notifies [`SessionObserver`]s on
//! every transition, and reconnects dropped sessions after a fixed delay.

pub mod manager;
pub mod observer;
pub mod registry;
pub mod shutdown;
pub mod state;

pub use manager::{SessionManager, SessionManagerBuilder, SessionSettings};
pub use observer::{LogObserver, PushObserver, SessionObserver, StoreStatusObserver};
pub use registry::SessionRegistry;
pub use shutdown::{drain_sessions, install_signal_handler};
pub use state::{LifecycleInput, SessionMachine, SessionSnapshot, SessionState, Transition};
