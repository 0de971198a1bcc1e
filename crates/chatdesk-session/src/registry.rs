// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of live (ready) sessions, keyed by account.

use chatdesk_core::{AccountId, ChatdeskError, SessionHandle};
use dashmap::DashMap;

/// Holds at most one ready session per account.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<AccountId, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a ready session, replacing any stale entry for the account.
    pub fn register(&self, handle: SessionHandle) {
        self.sessions.insert(handle.account_id, handle);
        self.record_gauge();
    }

    pub fn deregister(&self, account_id: AccountId) -> Option<SessionHandle> {
        let removed = self.sessions.remove(&account_id).map(|(_, h)| h);
        self.record_gauge();
        removed
    }

    /// The live session for an account, or [`ChatdeskError::NotInitialized`].
    pub fn get(&self, account_id: AccountId) -> Result<SessionHandle, ChatdeskError> {
        self.sessions
            .get(&account_id)
            .map(|entry| entry.value().clone())
            .ok_or(ChatdeskError::NotInitialized { account_id })
    }

    pub fn contains(&self, account_id: AccountId) -> bool {
        self.sessions.contains_key(&account_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn account_ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<_> = self.sessions.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    fn record_gauge(&self) {
        metrics::gauge!("chatdesk_sessions_ready").set(self.sessions.len() as f64);
    }
}
