use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::frame::Frame;

/// The Store is responsible for managing key-value pairs, with optional time-to-live settings for
/// each key. Expiration is lazy: an entry whose deadline has passed is removed by the first
/// operation that looks it up, and until then it is simply never returned.
///
/// The store is thread-safe and can be shared and cloned cheaply using reference counting.
/// Lookups run concurrently under a shared lock; writes, including evictions, take the lock
/// exclusively so every key is replaced or removed as a whole.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<State>>,
}

#[derive(Default)]
struct State {
    entries: HashMap<Key, Entry>,
}

type Key = String;

#[derive(Debug, Clone)]
struct Entry {
    value: Frame,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(expires_at) if now >= expires_at)
    }
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    pub fn set(&self, key: String, value: Frame) {
        let entry = Entry {
            value,
            expires_at: None,
        };
        self.write().entries.insert(key, entry);
    }

    pub fn set_with_ttl(&self, key: String, value: Frame, ttl: Duration) {
        // A deadline too far away to represent never arrives.
        let entry = Entry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.write().entries.insert(key, entry);
    }

    pub fn get(&self, key: &str) -> Option<Frame> {
        self.lookup(key, |entry| entry.value.clone())
    }

    pub fn exists(&self, key: &str) -> bool {
        self.lookup(key, |_| ()).is_some()
    }

    /// Removes `key`, returning its value if it was still live.
    pub fn remove(&self, key: &str) -> Option<Frame> {
        let now = Instant::now();
        self.write()
            .entries
            .remove(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value)
    }

    /// Number of stored entries, including expired ones no operation has looked at yet.
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup<T>(&self, key: &str, f: impl FnOnce(&Entry) -> T) -> Option<T> {
        let now = Instant::now();

        {
            let state = self.read();
            match state.entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(f(entry)),
                Some(_) => {}
            }
        }

        self.evict_expired(key, now);
        None
    }

    fn evict_expired(&self, key: &str, now: Instant) {
        let mut state = self.write();

        // Another writer may have replaced the entry between releasing the read lock and
        // acquiring the write lock. Only the entry that was observed as expired is removed.
        let expired = state
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(now));

        if expired {
            state.entries.remove(key);
            debug!(key, "evicted expired key");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
