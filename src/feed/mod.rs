//! Incremental feed paginator driving infinite scroll.
//!
//! The paginator loads one page at a time and trusts the server-reported
//! pagination block over its own request: `page` is set from the response
//! and `has_more` derives from `page < total_pages`. `load_more` is
//! self-guarding, so a scroll-proximity signal can call it on every "near
//! end" event and redundant calls collapse to no-ops.
//!
//! ## State machine
//!
//! ```text
//! Idle ──► LoadingInitial ──► Ready ⇄ LoadingMore
//!                               │           │
//!                               └──► Exhausted (has_more = false)
//! ```
//!
//! `Exhausted` is terminal until the filter changes; a filter change
//! resets to `Idle`, bumps the filter-session epoch and clears the items
//! synchronously, before the new page-1 fetch resolves. A response tagged
//! with a stale epoch is discarded instead of mutating the fresh session.

use crate::error::Result;
use crate::gateway::{FeedQuery, RemoteGateway, DEFAULT_PAGE_SIZE};
use crate::types::{FeedFilter, Post};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Loading phase of the paginator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    /// No load has happened in this filter session.
    Idle,
    /// Page 1 is being fetched.
    LoadingInitial,
    /// At least one page is loaded and more are available.
    Ready,
    /// A follow-up page is being fetched.
    LoadingMore,
    /// The server reported no further pages. Terminal until the filter
    /// changes.
    Exhausted,
}

impl fmt::Display for FeedPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedPhase::Idle => write!(f, "idle"),
            FeedPhase::LoadingInitial => write!(f, "loading-initial"),
            FeedPhase::Ready => write!(f, "ready"),
            FeedPhase::LoadingMore => write!(f, "loading-more"),
            FeedPhase::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Internal paginator state, one filter session at a time.
#[derive(Debug)]
struct FeedState {
    items: Vec<Post>,
    page: u32,
    has_more: bool,
    phase: FeedPhase,
    filter: FeedFilter,
    epoch: u64,
}

impl FeedState {
    fn fresh(filter: FeedFilter, epoch: u64) -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            has_more: true,
            phase: FeedPhase::Idle,
            filter,
            epoch,
        }
    }
}

/// Page-based incremental loader for the post feed.
pub struct FeedPaginator {
    gateway: Arc<dyn RemoteGateway>,
    page_size: usize,
    state: Mutex<FeedState>,
}

impl FeedPaginator {
    /// Creates a paginator with the default filter and page size.
    pub fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        Self::with_page_size(gateway, DEFAULT_PAGE_SIZE)
    }

    /// Creates a paginator with a custom page size.
    pub fn with_page_size(gateway: Arc<dyn RemoteGateway>, page_size: usize) -> Self {
        Self {
            gateway,
            page_size,
            state: Mutex::new(FeedState::fresh(FeedFilter::default(), 0)),
        }
    }

    /// Loads page 1 of the current filter session.
    ///
    /// Only runs from `Idle`; in any other phase this is a no-op returning
    /// 0. Returns the number of posts loaded.
    pub async fn load_initial(&self) -> Result<usize> {
        let (epoch, filter) = {
            let mut state = self.lock_state();
            if state.phase != FeedPhase::Idle {
                debug!(phase = %state.phase, "load_initial skipped");
                return Ok(0);
            }
            state.phase = FeedPhase::LoadingInitial;
            (state.epoch, state.filter.clone())
        };
        self.fetch(1, false, epoch, filter, FeedPhase::Idle).await
    }

    /// Requests the next page, appending to the loaded items.
    ///
    /// Self-guarding: returns `Ok(false)` without a network call while a
    /// load is already in flight, when the feed is exhausted, or before
    /// the initial load. Returns `Ok(true)` once the page was fetched and
    /// applied.
    pub async fn load_more(&self) -> Result<bool> {
        let (epoch, filter, next_page) = {
            let mut state = self.lock_state();
            match state.phase {
                FeedPhase::LoadingInitial | FeedPhase::LoadingMore => {
                    debug!("load_more skipped: load already in flight");
                    return Ok(false);
                }
                FeedPhase::Exhausted | FeedPhase::Idle => return Ok(false),
                FeedPhase::Ready => {}
            }
            state.phase = FeedPhase::LoadingMore;
            (state.epoch, state.filter.clone(), state.page + 1)
        };
        self.fetch(next_page, true, epoch, filter, FeedPhase::Ready)
            .await?;
        Ok(true)
    }

    /// Starts a new filter session synchronously: bumps the epoch, clears
    /// the items and resets `{page: 1, has_more: true, phase: Idle}`. Any
    /// in-flight fetch of the previous session resolves to a discarded
    /// no-op.
    pub fn reset_filter(&self, filter: FeedFilter) {
        let mut state = self.lock_state();
        let epoch = state.epoch + 1;
        *state = FeedState::fresh(filter, epoch);
    }

    /// Switches the filter and reloads page 1.
    pub async fn set_filter(&self, filter: FeedFilter) -> Result<usize> {
        self.reset_filter(filter);
        self.load_initial().await
    }

    /// Reloads the current filter from page 1.
    pub async fn refresh(&self) -> Result<usize> {
        let filter = self.lock_state().filter.clone();
        self.set_filter(filter).await
    }

    /// Fetches one page and applies it, unless the session moved on.
    async fn fetch(
        &self,
        page: u32,
        append: bool,
        epoch: u64,
        filter: FeedFilter,
        prior_phase: FeedPhase,
    ) -> Result<usize> {
        let query = FeedQuery {
            page,
            limit: self.page_size,
            filter,
        };
        let result = self.gateway.list_posts(query).await;

        let mut state = self.lock_state();
        if state.epoch != epoch {
            debug!(epoch, "discarding feed response from a stale filter session");
            return Ok(0);
        }

        match result {
            Ok(response) => {
                // Server truth over the requested numbers
                state.page = response.pagination.page;
                state.has_more = response.pagination.page < response.pagination.total_pages;
                let added = response.items.len();
                if append {
                    state.items.extend(response.items);
                } else {
                    state.items = response.items;
                }
                state.phase = if state.has_more {
                    FeedPhase::Ready
                } else {
                    FeedPhase::Exhausted
                };
                debug!(
                    page = state.page,
                    items = state.items.len(),
                    has_more = state.has_more,
                    "feed page applied"
                );
                Ok(added)
            }
            Err(e) => {
                state.phase = prior_phase;
                Err(e)
            }
        }
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    /// Snapshot of the loaded posts.
    pub fn items(&self) -> Vec<Post> {
        self.lock_state().items.clone()
    }

    /// Number of loaded posts.
    pub fn len(&self) -> usize {
        self.lock_state().items.len()
    }

    /// True when no posts are loaded.
    pub fn is_empty(&self) -> bool {
        self.lock_state().items.is_empty()
    }

    /// Last server-confirmed page of the current filter session.
    pub fn page(&self) -> u32 {
        self.lock_state().page
    }

    /// Whether further pages are available.
    pub fn has_more(&self) -> bool {
        self.lock_state().has_more
    }

    /// Current loading phase.
    pub fn phase(&self) -> FeedPhase {
        self.lock_state().phase
    }

    /// Active filter.
    pub fn filter(&self) -> FeedFilter {
        self.lock_state().filter.clone()
    }

    /// True while page 1 is being fetched.
    pub fn is_loading_initial(&self) -> bool {
        self.phase() == FeedPhase::LoadingInitial
    }

    /// True while a follow-up page is being fetched.
    pub fn is_loading_more(&self) -> bool {
        self.phase() == FeedPhase::LoadingMore
    }

    fn lock_state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
