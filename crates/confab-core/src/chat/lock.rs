//! Per-conversation turn serialization.
//!
//! `KeyedLocks` hands out one async mutex per `ConversationKey`. A turn holds
//! the guard from the initial fetch until its last append, so two turns on
//! the same thread never read the same snapshot. Different keys never
//! contend. Entries are pruned once nobody holds or waits on them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use confab_types::conversation::ConversationKey;

#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<ConversationKey, Arc<Mutex<()>>>,
}

/// Held for the duration of one turn. Dropping it releases the key.
pub struct TurnGuard<'a> {
    owner: &'a KeyedLocks,
    key: ConversationKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other turn holds `key`, then take it.
    pub async fn acquire(&self, key: &ConversationKey) -> TurnGuard<'_> {
        // Clone the Arc out so the DashMap shard guard is not held across the await.
        let mutex = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        TurnGuard {
            owner: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        // Release first so the strong count reflects only the map and waiters.
        self.guard.take();
        self.owner
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
