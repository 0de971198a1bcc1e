// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed trailing-edge debounce.
//!
//! Scheduling a task for a key replaces any task still waiting for that key,
//! so a burst collapses into the last scheduled action, run once the window
//! passes without another schedule.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;

pub struct Debouncer<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pending: Arc<DashMap<K, (u64, JoinHandle<()>)>>,
    generation: AtomicU64,
}

impl<K> Default for Debouncer<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` after `delay` unless another task is scheduled for the
    /// same key first.
    pub fn schedule<F>(&self, key: K, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);

        // The entry guard is held across the spawn so the task cannot fire
        // and unregister before it is registered.
        let slot = self.pending.entry(key.clone());
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Once fired the task is no longer replaceable.
            pending.remove_if(&key, |_, (g, _)| *g == generation);
            task.await;
        });
        match slot {
            Entry::Occupied(mut occupied) => {
                let (_, previous) = occupied.insert((generation, handle));
                previous.abort();
            }
            Entry::Vacant(vacant) => {
                vacant.insert((generation, handle));
            }
        }
    }

    /// Drops the waiting task for `key`, if any. Returns whether one was
    /// waiting.
    pub fn cancel(&self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some((_, (_, handle))) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Number of keys with a task still waiting.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl<K> Drop for Debouncer<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        for entry in self.pending.iter() {
            entry.value().1.abort();
        }
    }
}
