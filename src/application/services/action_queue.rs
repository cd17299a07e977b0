//! Generic deferred-action queue backed by a persistent store

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::errors::{BotError, ScheduleError, StorageError};
use crate::domain::entities::DeferredAction;
use crate::domain::traits::ActionStore;

/// In-memory index of pending deferred actions, mirrored into a persistent
/// store under a single lock per queue.
///
/// The lock is held across the paired in-memory and persisted mutation so
/// the two views never diverge; there is no await point between them. Slow
/// work (entity resolution, delivery) happens outside the lock, against the
/// snapshot returned by [`due`](Self::due).
pub struct ActionQueue<A: DeferredAction> {
    entries: Mutex<HashMap<A::Key, A>>,
    store: Arc<dyn ActionStore<A>>,
}

impl<A: DeferredAction> ActionQueue<A> {
    pub fn new(store: Arc<dyn ActionStore<A>>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// Loads every persisted row into memory. Called once at setup, before
    /// the sweeper starts.
    pub async fn restore(&self) -> Result<usize, StorageError> {
        let rows = self.store.load_all()?;
        let mut entries = self.entries.lock().await;
        let count = rows.len();
        for action in rows {
            entries.insert(action.key(), action);
        }
        Ok(count)
    }

    /// Upserts the entry in memory and in the store. An existing entry under
    /// the same key is replaced (last-write-wins).
    pub async fn schedule(&self, action: A) -> Result<(), StorageError> {
        let key = action.key();
        let mut entries = self.entries.lock().await;
        let prior = entries.insert(key.clone(), action.clone());
        if let Err(e) = self.store.upsert(&action) {
            // Keep memory and store in agreement on failure.
            match prior {
                Some(p) => entries.insert(key, p),
                None => entries.remove(&key),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Removes the entry under `key` from memory and store.
    pub async fn cancel(&self, key: &A::Key) -> Result<A, BotError> {
        let mut entries = self.entries.lock().await;
        let removed = entries
            .remove(key)
            .ok_or(ScheduleError::NotScheduled)?;
        if let Err(e) = self.store.remove(key) {
            entries.insert(key.clone(), removed);
            return Err(e.into());
        }
        Ok(removed)
    }

    /// Snapshot of every entry due at `now`. Entries with no due time
    /// (indefinite) are never returned.
    pub async fn due(&self, now: DateTime<Utc>) -> Vec<A> {
        let entries = self.entries.lock().await;
        entries
            .values()
            .filter(|a| matches!(a.due_at(), Some(at) if at <= now))
            .cloned()
            .collect()
    }

    /// Removes a swept entry, but only if it is unchanged since the snapshot
    /// was taken - a concurrent overwrite or cancel wins. Returns whether
    /// the entry was removed.
    pub async fn finish(&self, action: &A) -> Result<bool, StorageError> {
        let key = action.key();
        let mut entries = self.entries.lock().await;
        match entries.get(&key) {
            Some(current) if current == action => {}
            _ => {
                debug!("Entry {:?} changed since the sweep snapshot, leaving it", key);
                return Ok(false);
            }
        }
        entries.remove(&key);
        if let Err(e) = self.store.remove(&key) {
            entries.insert(key, action.clone());
            return Err(e);
        }
        Ok(true)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn contains(&self, key: &A::Key) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    pub async fn get(&self, key: &A::Key) -> Option<A> {
        self.entries.lock().await.get(key).cloned()
    }
}
