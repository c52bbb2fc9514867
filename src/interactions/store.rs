//! Optimistic toggle engine for binary interactions.
//!
//! The store tracks one [`InteractionRecord`] per (kind, content) key and
//! flips it optimistically: the UI sees the new value immediately, a single
//! remote call confirms it in the background, and a failed call restores the
//! exact pre-toggle values. A per-key lock rejects a second toggle while one
//! is in flight, so double-clicks and racing handlers collapse to no-ops
//! with zero extra remote calls.
//!
//! On success the store trusts its own delta: it does not re-fetch or adopt
//! a server-echoed count, which keeps rapid sequences of toggles from
//! flickering through stale numbers.

use crate::error::{FeedError, Result};
use crate::gateway::RemoteGateway;
use crate::interactions::lock::OpLockSet;
use crate::interactions::speculation::Speculation;
use crate::types::{ContentKind, ContentRef, Post, PostId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Which binary interaction a key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    /// Like / unlike.
    Like,
    /// Save / unsave (posts only).
    Save,
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionKind::Like => write!(f, "like"),
            InteractionKind::Save => write!(f, "save"),
        }
    }
}

/// Map key for one binary interaction on one piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InteractionKey {
    /// Which interaction.
    pub kind: InteractionKind,
    /// Which content.
    pub target: ContentRef,
}

impl InteractionKey {
    /// Like key for any content.
    pub fn like(target: ContentRef) -> Self {
        Self {
            kind: InteractionKind::Like,
            target,
        }
    }

    /// Save key for a post.
    pub fn save(post_id: &PostId) -> Self {
        Self {
            kind: InteractionKind::Save,
            target: ContentRef::post(post_id.as_str()),
        }
    }
}

impl fmt::Display for InteractionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.target)
    }
}

/// Local interaction state for one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionRecord {
    /// Whether the viewer currently has the interaction active.
    pub active: bool,
    /// Interaction count shown to the viewer. Never goes below zero.
    pub count: u64,
}

/// Outcome of a toggle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The toggle was applied and confirmed; `active` is the new state.
    Applied {
        /// New interaction state after the toggle.
        active: bool,
    },
    /// An operation was already pending for this key; nothing happened and
    /// no remote call was made.
    Rejected,
}

/// Optimistic toggle engine for likes and saves.
///
/// Records are created lazily and live for the store's lifetime. All state
/// is behind interior mutability so overlapping async operations on
/// different keys proceed independently; the per-key lock is the only
/// ordering constraint.
pub struct InteractionStore {
    gateway: Arc<dyn RemoteGateway>,
    records: Mutex<HashMap<InteractionKey, InteractionRecord>>,
    locks: OpLockSet<InteractionKey>,
}

impl InteractionStore {
    /// Creates a store over the given gateway.
    pub fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        Self {
            gateway,
            records: Mutex::new(HashMap::new()),
            locks: OpLockSet::new(),
        }
    }

    /// Toggles the interaction for `key`.
    ///
    /// The record is created at `(false, 0)` if absent, flipped
    /// optimistically, and confirmed by exactly one remote call. While the
    /// call is pending the key is locked: a concurrent toggle returns
    /// [`ToggleOutcome::Rejected`] without touching state or the network.
    /// On remote failure the exact pre-toggle `(active, count)` values are
    /// restored and the error is propagated.
    pub async fn toggle(&self, key: InteractionKey) -> Result<ToggleOutcome> {
        let Some(_guard) = self.locks.try_acquire(key.clone()) else {
            debug!(%key, "toggle rejected: operation already pending");
            return Ok(ToggleOutcome::Rejected);
        };

        // Optimistic flip, capturing the exact prior values
        let speculation = {
            let mut records = self.lock_records();
            let record = records.entry(key.clone()).or_default();
            let speculation = Speculation::capture(record);
            record.active = !record.active;
            record.count = if record.active {
                record.count + 1
            } else {
                record.count.saturating_sub(1)
            };
            speculation
        };
        let now_active = !speculation.prior().active;

        match self.dispatch(&key, now_active).await {
            Ok(()) => {
                // Trust the local delta; no re-fetch
                speculation.commit();
                Ok(ToggleOutcome::Applied { active: now_active })
            }
            Err(e) => {
                let prior = speculation.revert();
                self.lock_records().insert(key.clone(), prior);
                warn!(%key, error = %e, "toggle failed, rolled back");
                Err(e)
            }
        }
    }

    /// Issues the remote call matching the new interaction state.
    async fn dispatch(&self, key: &InteractionKey, active: bool) -> Result<()> {
        match key.kind {
            InteractionKind::Like => {
                if active {
                    self.gateway.like_content(&key.target).await
                } else {
                    self.gateway.unlike_content(&key.target).await
                }
            }
            InteractionKind::Save => {
                if key.target.kind != ContentKind::Post {
                    return Err(FeedError::invalid_input("save applies to posts only"));
                }
                let post_id = PostId::new(key.target.id.clone());
                if active {
                    self.gateway.save_post(&post_id).await
                } else {
                    self.gateway.unsave_post(&post_id).await
                }
            }
        }
    }

    /// Fetches like status and count for `target` if not already cached.
    ///
    /// Idempotent: a key that already has a record (from a previous fetch,
    /// a seed, or a toggle) is left untouched and no remote call is made.
    pub async fn initialize_like_data(&self, target: &ContentRef) -> Result<()> {
        let key = InteractionKey::like(target.clone());
        if self.lock_records().contains_key(&key) {
            return Ok(());
        }

        let status = self.gateway.get_like_status(target).await?;
        let count = self.gateway.get_like_count(target).await?;

        // A toggle may have created the record while we were fetching;
        // its optimistic state wins over the fetched snapshot.
        self.lock_records().entry(key).or_insert(InteractionRecord {
            active: status.liked,
            count: count.count,
        });
        Ok(())
    }

    /// Initializes like data for many targets.
    ///
    /// Items are independent: a failed fetch defaults that item to
    /// `(false, 0)` and the rest proceed normally. Never returns an error.
    pub async fn initialize_batch(&self, targets: &[ContentRef]) {
        let fetches = targets.iter().map(|target| self.initialize_like_data(target));
        let results = futures::future::join_all(fetches).await;

        for (target, result) in targets.iter().zip(results) {
            if let Err(e) = result {
                debug!(%target, error = %e, "like init failed, defaulting to (false, 0)");
                self.lock_records()
                    .entry(InteractionKey::like(target.clone()))
                    .or_default();
            }
        }
    }

    /// Seeds a record from data the server already sent (for example the
    /// `is_liked`/`like_count` fields of a fetched post), skipping the
    /// remote round-trip. An existing record is never overwritten.
    pub fn seed(&self, key: InteractionKey, active: bool, count: u64) {
        self.lock_records()
            .entry(key)
            .or_insert(InteractionRecord { active, count });
    }

    /// Seeds like and save records from a fetched post.
    pub fn seed_from_post(&self, post: &Post) {
        let target = ContentRef::post(post.id.as_str());
        self.seed(InteractionKey::like(target), post.is_liked, post.like_count);
        // Saved items carry no public count
        self.seed(InteractionKey::save(&post.id), post.is_saved, 0);
    }

    /// Returns the record for `key`, if one exists.
    pub fn record(&self, key: &InteractionKey) -> Option<InteractionRecord> {
        self.lock_records().get(key).copied()
    }

    /// Whether the viewer has liked the content. Defaults to false.
    pub fn is_liked(&self, target: &ContentRef) -> bool {
        self.record(&InteractionKey::like(target.clone()))
            .map(|r| r.active)
            .unwrap_or(false)
    }

    /// Like count for the content. Defaults to 0.
    pub fn like_count(&self, target: &ContentRef) -> u64 {
        self.record(&InteractionKey::like(target.clone()))
            .map(|r| r.count)
            .unwrap_or(0)
    }

    /// Whether the viewer has saved the post. Defaults to false.
    pub fn is_saved(&self, post_id: &PostId) -> bool {
        self.record(&InteractionKey::save(post_id))
            .map(|r| r.active)
            .unwrap_or(false)
    }

    /// Whether an operation is currently in flight for `key`.
    pub fn is_pending(&self, key: &InteractionKey) -> bool {
        self.locks.is_held(key)
    }

    /// Number of cached records.
    pub fn record_count(&self) -> usize {
        self.lock_records().len()
    }

    fn lock_records(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<InteractionKey, InteractionRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}
