// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle state machine for one messaging account's session.
//!
//! `Init -> QrPending -> Authenticated -> Ready`; any live state may drop to
//! `Disconnected`, and `Disconnected -> Init` is the reconnect attempt. All
//! changes go through [`SessionMachine::transition`].

use chatdesk_core::{AccountId, AccountStatus};

/// States of the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport constructed, waiting for the first handshake event.
    Init,
    /// A QR code is waiting to be scanned.
    QrPending,
    /// Credentials accepted, client still syncing.
    Authenticated,
    /// Fully connected; events flow to the pipeline.
    Ready,
    /// Connection lost or credentials rejected.
    Disconnected,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Init => write!(f, "init"),
            SessionState::QrPending => write!(f, "qr_pending"),
            SessionState::Authenticated => write!(f, "authenticated"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Disconnected => write!(f, "disconnected"),
        }
    }
}

impl SessionState {
    /// The status persisted on the account record for this state.
    pub fn account_status(self) -> AccountStatus {
        match self {
            SessionState::Init | SessionState::Authenticated => AccountStatus::Opening,
            SessionState::QrPending => AccountStatus::Qrcode,
            SessionState::Ready => AccountStatus::Connected,
            SessionState::Disconnected => AccountStatus::Disconnected,
        }
    }
}

/// Inputs that drive the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleInput {
    Qr(String),
    Authenticated,
    AuthFailure(String),
    Ready,
    Disconnected(String),
    /// The fixed reconnect delay elapsed and a new transport is being built.
    Reconnect,
}

/// Result of an accepted input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
    pub input: LifecycleInput,
}

/// Point-in-time view of a session, handed to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub account_id: AccountId,
    pub state: SessionState,
    pub qrcode: Option<String>,
    pub retries: u32,
}

/// Session record: account, lifecycle state, pending QR payload, and the
/// number of reconnect attempts since the last QR or ready.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    account_id: AccountId,
    state: SessionState,
    qrcode: Option<String>,
    retries: u32,
}

impl SessionMachine {
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            state: SessionState::Init,
            qrcode: None,
            retries: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            account_id: self.account_id,
            state: self.state,
            qrcode: self.qrcode.clone(),
            retries: self.retries,
        }
    }

    /// Applies an input. Returns `None`, leaving the machine untouched, when
    /// the input makes no sense in the current state.
    pub fn transition(&mut self, input: LifecycleInput) -> Option<Transition> {
        use SessionState::*;

        let from = self.state;
        let to = match (&input, from) {
            (LifecycleInput::Qr(qr), Init | QrPending) => {
                self.qrcode = Some(qr.clone());
                self.retries = 0;
                QrPending
            }
            (LifecycleInput::Authenticated, Init | QrPending) => Authenticated,
            (LifecycleInput::Ready, Init | QrPending | Authenticated) => {
                self.qrcode = None;
                self.retries = 0;
                Ready
            }
            (
                LifecycleInput::AuthFailure(_) | LifecycleInput::Disconnected(_),
                Init | QrPending | Authenticated | Ready,
            ) => {
                self.qrcode = None;
                self.retries = 0;
                Disconnected
            }
            (LifecycleInput::Reconnect, Disconnected) => {
                self.retries += 1;
                Init
            }
            _ => return None,
        };

        self.state = to;
        Some(Transition { from, to, input })
    }
}
