//! Shared test support: a scriptable in-memory gateway.
//!
//! The mock records every call, can be told to fail specific operations
//! (globally or per target), and can hold an operation at its suspension
//! point until the test releases it, which is how in-flight races are
//! exercised deterministically.

use crate::error::{FeedError, Result};
use crate::gateway::{
    CommentPatch, CreateCommentRequest, FeedPageResponse, FeedQuery, LikeCount, LikeStatus,
    Pagination, RemoteGateway,
};
use crate::types::{
    current_timestamp_millis, Comment, CommentId, ContentRef, Post, PostId, UserId,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Scriptable gateway for tests.
pub struct MockGateway {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    blocked: Mutex<HashMap<String, Arc<Semaphore>>>,
    like_states: Mutex<HashMap<String, (bool, u64)>>,
    comments: Mutex<Vec<Comment>>,
    next_comment_id: AtomicU64,
    total_pages: AtomicU32,
    page_size: AtomicU32,
    server_page_override: Mutex<Option<u32>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            blocked: Mutex::new(HashMap::new()),
            like_states: Mutex::new(HashMap::new()),
            comments: Mutex::new(Vec::new()),
            next_comment_id: AtomicU64::new(1),
            total_pages: AtomicU32::new(3),
            page_size: AtomicU32::new(2),
            server_page_override: Mutex::new(None),
        }
    }

    /// Marks an operation (or `op:target`) as failing.
    pub fn fail(&self, op: &str) {
        self.failing.lock().unwrap().insert(op.to_string());
    }

    /// Clears a previously configured failure.
    pub fn succeed(&self, op: &str) {
        self.failing.lock().unwrap().remove(op);
    }

    /// Makes an operation park until [`MockGateway::release`] is called.
    pub fn block(&self, op: &str) {
        self.blocked
            .lock()
            .unwrap()
            .insert(op.to_string(), Arc::new(Semaphore::new(0)));
    }

    /// Releases one parked call of a blocked operation.
    pub fn release(&self, op: &str) {
        if let Some(sem) = self.blocked.lock().unwrap().get(op) {
            sem.add_permits(1);
        }
    }

    /// Number of recorded calls whose name starts with `op`.
    pub fn call_count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(op))
            .count()
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Waits (polling) until `op` has been called at least `n` times.
    pub async fn wait_for_calls(&self, op: &str, n: usize) {
        while self.call_count(op) < n {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    }

    /// Sets the like state served for a `ContentRef` (display form, e.g.
    /// `"post:p1"`).
    pub fn set_like_state(&self, target: &str, liked: bool, count: u64) {
        self.like_states
            .lock()
            .unwrap()
            .insert(target.to_string(), (liked, count));
    }

    /// Sets the flat comment collection served by `list_comments_for_post`.
    pub fn set_comments(&self, comments: Vec<Comment>) {
        *self.comments.lock().unwrap() = comments;
    }

    /// Configures the feed shape: total pages and items per page.
    pub fn set_feed_shape(&self, total_pages: u32, page_size: u32) {
        self.total_pages.store(total_pages, Ordering::Relaxed);
        self.page_size.store(page_size, Ordering::Relaxed);
    }

    /// Makes `list_posts` report this page number regardless of the one
    /// requested.
    pub fn override_server_page(&self, page: u32) {
        *self.server_page_override.lock().unwrap() = Some(page);
    }

    /// Records the call, parks if blocked, then fails if scripted to.
    async fn observe(&self, op: &str, target: &str) -> Result<()> {
        self.calls.lock().unwrap().push(if target.is_empty() {
            op.to_string()
        } else {
            format!("{}:{}", op, target)
        });

        let sem = self.blocked.lock().unwrap().get(op).cloned();
        if let Some(sem) = sem {
            let permit = sem.acquire().await.expect("mock semaphore closed");
            permit.forget();
        }

        let failing = self.failing.lock().unwrap();
        if failing.contains(op) || failing.contains(&format!("{}:{}", op, target)) {
            return Err(FeedError::network(format!("mock failure for {}", op)));
        }
        Ok(())
    }

    fn make_post(id: String) -> Post {
        Post {
            id: PostId::new(id),
            author_id: UserId::new("u1"),
            community_id: None,
            title: "title".to_string(),
            content: "body".to_string(),
            media: Vec::new(),
            like_count: 0,
            comment_count: 0,
            is_liked: false,
            is_saved: false,
            created_at: current_timestamp_millis(),
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteGateway for MockGateway {
    async fn like_content(&self, target: &ContentRef) -> Result<()> {
        self.observe("like_content", &target.to_string()).await
    }

    async fn unlike_content(&self, target: &ContentRef) -> Result<()> {
        self.observe("unlike_content", &target.to_string()).await
    }

    async fn get_like_status(&self, target: &ContentRef) -> Result<LikeStatus> {
        self.observe("get_like_status", &target.to_string()).await?;
        let liked = self
            .like_states
            .lock()
            .unwrap()
            .get(&target.to_string())
            .map(|s| s.0)
            .unwrap_or(false);
        Ok(LikeStatus { liked })
    }

    async fn get_like_count(&self, target: &ContentRef) -> Result<LikeCount> {
        self.observe("get_like_count", &target.to_string()).await?;
        let count = self
            .like_states
            .lock()
            .unwrap()
            .get(&target.to_string())
            .map(|s| s.1)
            .unwrap_or(0);
        Ok(LikeCount { count })
    }

    async fn create_comment(&self, request: CreateCommentRequest) -> Result<Comment> {
        self.observe("create_comment", request.post_id.as_str())
            .await?;
        let n = self.next_comment_id.fetch_add(1, Ordering::Relaxed);
        Ok(Comment {
            id: CommentId::new(format!("srv-{}", n)),
            parent_id: request.parent_id,
            post_id: request.post_id,
            author_id: UserId::new("u1"),
            content: request.content,
            media: request.media,
            created_at: current_timestamp_millis(),
            is_edited: false,
            is_pending: false,
            is_deleting: false,
        })
    }

    async fn edit_comment(&self, id: &CommentId, patch: CommentPatch) -> Result<Comment> {
        self.observe("edit_comment", id.as_str()).await?;
        Ok(Comment {
            id: id.clone(),
            parent_id: None,
            post_id: PostId::new("p1"),
            author_id: UserId::new("u1"),
            content: patch.content.unwrap_or_default(),
            media: patch.media.unwrap_or_default(),
            created_at: current_timestamp_millis(),
            is_edited: true,
            is_pending: false,
            is_deleting: false,
        })
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<()> {
        self.observe("delete_comment", id.as_str()).await
    }

    async fn list_comments_for_post(&self, post_id: &PostId, _limit: usize) -> Result<Vec<Comment>> {
        self.observe("list_comments_for_post", post_id.as_str())
            .await?;
        Ok(self.comments.lock().unwrap().clone())
    }

    async fn list_posts(&self, query: FeedQuery) -> Result<FeedPageResponse> {
        self.observe("list_posts", &format!("page={}", query.page))
            .await?;

        let total_pages = self.total_pages.load(Ordering::Relaxed);
        let page_size = self.page_size.load(Ordering::Relaxed);
        let page = self
            .server_page_override
            .lock()
            .unwrap()
            .unwrap_or(query.page);

        let items = if page > total_pages {
            Vec::new()
        } else {
            (0..page_size)
                .map(|i| Self::make_post(format!("p{}-{}", page, i)))
                .collect()
        };

        Ok(FeedPageResponse {
            items,
            pagination: Pagination {
                page,
                total_pages,
                total: u64::from(total_pages) * u64::from(page_size),
            },
        })
    }

    async fn save_post(&self, post_id: &PostId) -> Result<()> {
        self.observe("save_post", post_id.as_str()).await
    }

    async fn unsave_post(&self, post_id: &PostId) -> Result<()> {
        self.observe("unsave_post", post_id.as_str()).await
    }
}
