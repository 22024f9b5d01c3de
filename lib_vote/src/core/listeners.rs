//! # Listener Fan-out
//!
//! Registration and synchronous delivery of store snapshots to observers.
//! Delivery takes a copy of the listener list and calls each one after the
//! list lock is released, so a listener may subscribe, unsubscribe or read
//! the store from inside its callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::StoreSnapshot;

/// Identifies a registered listener for `VotingStore::unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&StoreSnapshot) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: AtomicU64,
    delivered: AtomicU64,
    entries: Mutex<Vec<(ListenerId, Listener)>>,
}

impl Listeners {
    pub fn add(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, listener));
        tracing::debug!(listener = id.0, "Listener registered");
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        before != entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn notify(&self, seq: u64, snapshot: &StoreSnapshot) {
        let newest = self.delivered.fetch_max(seq, Ordering::SeqCst);
        if newest >= seq {
            tracing::debug!(seq, newest, "Dropping superseded snapshot");
            return;
        }
        let current: Vec<Listener> = self.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in current {
            listener(snapshot);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}
