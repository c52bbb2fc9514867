//! Per-key operation locks.
//!
//! A mutating operation on a logical resource (a like toggle, a comment
//! delete) must never overlap another mutation on the same resource. The
//! lock set hands out RAII guards: `try_acquire` either takes the key or
//! reports that an operation is already in flight. A second caller is
//! rejected outright, never queued, so double-submission collapses to a
//! no-op instead of a pile-up of stale requests.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// Set of per-key operation locks.
///
/// Cloning the set is cheap and shares the underlying state.
#[derive(Debug, Clone)]
pub struct OpLockSet<K: Eq + Hash + Clone> {
    held: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash + Clone> Default for OpLockSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> OpLockSet<K> {
    /// Creates an empty lock set.
    pub fn new() -> Self {
        Self {
            held: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Attempts to acquire the lock for `key`.
    ///
    /// Returns `None` when an operation already holds the key. The returned
    /// guard releases the key when dropped, including on the error path of
    /// the guarded operation.
    pub fn try_acquire(&self, key: K) -> Option<OpGuard<K>> {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        if !held.insert(key.clone()) {
            return None;
        }
        Some(OpGuard {
            key,
            held: Arc::clone(&self.held),
        })
    }

    /// Returns true if an operation currently holds `key`.
    pub fn is_held(&self, key: &K) -> bool {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }

    /// Number of keys currently held.
    pub fn held_count(&self) -> usize {
        self.held.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// RAII guard for one held key. Releases the key on drop.
#[derive(Debug)]
pub struct OpGuard<K: Eq + Hash + Clone> {
    key: K,
    held: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash + Clone> OpGuard<K> {
    /// The key this guard holds.
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Eq + Hash + Clone> Drop for OpGuard<K> {
    fn drop(&mut self) {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        held.remove(&self.key);
    }
}
