//! Client session wiring the interaction store, feed paginator and
//! per-post comment threads behind one gateway.
//!
//! A session is created once per signed-in user and shared across the
//! UI. It owns:
//!
//! - the [`InteractionStore`] (likes and saves, shared across every
//!   surface showing the same content),
//! - the [`FeedPaginator`] for the main feed,
//! - a lazily-created [`CommentThread`] per post.
//!
//! Threads are handed out as `Arc` so a detail screen can keep one alive
//! while the session map drops it.

use crate::comments::CommentThread;
use crate::feed::FeedPaginator;
use crate::gateway::RemoteGateway;
use crate::interactions::InteractionStore;
use crate::types::{Post, PostId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Root handle for one signed-in user's client state.
pub struct ClientSession {
    gateway: Arc<dyn RemoteGateway>,
    viewer: UserId,
    interactions: InteractionStore,
    feed: FeedPaginator,
    threads: Mutex<HashMap<PostId, Arc<CommentThread>>>,
}

impl ClientSession {
    /// Creates a session for `viewer` against the given gateway.
    pub fn new(gateway: Arc<dyn RemoteGateway>, viewer: UserId) -> Self {
        Self {
            interactions: InteractionStore::new(gateway.clone()),
            feed: FeedPaginator::new(gateway.clone()),
            threads: Mutex::new(HashMap::new()),
            gateway,
            viewer,
        }
    }

    /// The signed-in user.
    pub fn viewer(&self) -> &UserId {
        &self.viewer
    }

    /// Shared like/save state.
    pub fn interactions(&self) -> &InteractionStore {
        &self.interactions
    }

    /// The main feed.
    pub fn feed(&self) -> &FeedPaginator {
        &self.feed
    }

    /// Returns the comment thread for a post, creating it on first use.
    pub fn thread(&self, post_id: &PostId) -> Arc<CommentThread> {
        let mut threads = self.lock_threads();
        threads
            .entry(post_id.clone())
            .or_insert_with(|| {
                debug!(post_id = %post_id, "creating comment thread");
                Arc::new(CommentThread::new(
                    self.gateway.clone(),
                    post_id.clone(),
                    self.viewer.clone(),
                ))
            })
            .clone()
    }

    /// Invalidates and drops the cached thread for a post.
    ///
    /// Holders of the `Arc` keep a working handle, but its state is
    /// cleared and any in-flight load resolves to a discarded no-op.
    pub fn drop_thread(&self, post_id: &PostId) {
        if let Some(thread) = self.lock_threads().remove(post_id) {
            thread.invalidate();
        }
    }

    /// Seeds interaction state from posts already fetched with the feed,
    /// avoiding per-post status round-trips.
    pub fn seed_from_feed(&self, posts: &[Post]) {
        for post in posts {
            self.interactions.seed_from_post(post);
        }
    }

    fn lock_threads(&self) -> MutexGuard<'_, HashMap<PostId, Arc<CommentThread>>> {
        self.threads.lock().unwrap_or_else(|e| e.into_inner())
    }
}
