//! Remote gateway contract consumed by the engine components.
//!
//! This module defines the request/response shapes the engine exchanges with
//! the REST backend, and the [`RemoteGateway`] trait all three components
//! call through. Transport details live behind the trait: the engine only
//! sees typed results.
//!
//! ## Contract
//!
//! - Like/unlike + status/count lookups, keyed by a [`ContentRef`]
//! - Comment create/edit/delete plus a flat listing per post
//! - Paged post listing with a server-reported pagination block
//! - Save/unsave for posts
//!
//! The production implementation is [`http::HttpGateway`]; tests substitute
//! their own mock implementing the same trait.

pub mod http;

pub use http::HttpGateway;

use crate::error::Result;
use crate::types::{Comment, CommentId, ContentRef, FeedFilter, MediaItem, Post, PostId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default number of comments fetched per thread load.
pub const DEFAULT_COMMENT_LIMIT: usize = 100;

/// Default number of posts per feed page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Like status for a piece of content, as reported by the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LikeStatus {
    /// Whether the requesting user has liked the content.
    pub liked: bool,
}

/// Like count for a piece of content, as reported by the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LikeCount {
    /// Total number of likes.
    pub count: u64,
}

/// Request body for creating a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    /// Post the comment belongs to.
    pub post_id: PostId,
    /// Comment body.
    pub content: String,
    /// Ordered media attachments.
    #[serde(default)]
    pub media: Vec<MediaItem>,
    /// Parent comment when replying; `None` for a top-level comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
}

/// Partial update for a comment. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentPatch {
    /// New comment body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Replacement media list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<MediaItem>>,
}

impl CommentPatch {
    /// Patch that replaces only the comment body.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            media: None,
        }
    }

    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.media.is_none()
    }
}

/// Query for one feed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedQuery {
    /// 1-based page number to fetch.
    pub page: u32,
    /// Page size.
    pub limit: usize,
    /// Active filter session.
    pub filter: FeedFilter,
}

impl FeedQuery {
    /// Query for the given page under the given filter, with the default
    /// page size.
    pub fn page(page: u32, filter: FeedFilter) -> Self {
        Self {
            page,
            limit: DEFAULT_PAGE_SIZE,
            filter,
        }
    }
}

/// Server-reported pagination block.
///
/// The paginator trusts `page` and `total_pages` from here rather than the
/// numbers it requested, so local state stays consistent with server truth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// The page the server actually returned (1-based).
    pub page: u32,
    /// Total number of pages under the current filter.
    pub total_pages: u32,
    /// Total number of items under the current filter.
    pub total: u64,
}

/// One page of feed posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPageResponse {
    /// Posts in server order.
    pub items: Vec<Post>,
    /// Pagination block for this response.
    pub pagination: Pagination,
}

/// The HTTP contract consumed by the engine components.
///
/// Every method is a single remote call; the engine layers its own
/// optimistic state, rollback and pagination on top. Implementations must
/// not retry internally: the engine's failure semantics assume at most one
/// attempt per call.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Records a like on the given content.
    async fn like_content(&self, target: &ContentRef) -> Result<()>;

    /// Removes a like from the given content.
    async fn unlike_content(&self, target: &ContentRef) -> Result<()>;

    /// Fetches whether the requesting user has liked the content.
    async fn get_like_status(&self, target: &ContentRef) -> Result<LikeStatus>;

    /// Fetches the like count for the content.
    async fn get_like_count(&self, target: &ContentRef) -> Result<LikeCount>;

    /// Creates a comment and returns the server-confirmed entity.
    async fn create_comment(&self, request: CreateCommentRequest) -> Result<Comment>;

    /// Applies a partial update and returns the server-confirmed entity.
    async fn edit_comment(&self, id: &CommentId, patch: CommentPatch) -> Result<Comment>;

    /// Deletes a comment (the server cascades to descendants).
    async fn delete_comment(&self, id: &CommentId) -> Result<()>;

    /// Lists comments for a post as a flat collection.
    ///
    /// Ordering is not guaranteed; callers derive the hierarchy locally.
    async fn list_comments_for_post(&self, post_id: &PostId, limit: usize) -> Result<Vec<Comment>>;

    /// Lists one page of posts under the query's filter.
    async fn list_posts(&self, query: FeedQuery) -> Result<FeedPageResponse>;

    /// Saves a post for the requesting user.
    async fn save_post(&self, post_id: &PostId) -> Result<()>;

    /// Removes a post from the requesting user's saved items.
    async fn unsave_post(&self, post_id: &PostId) -> Result<()>;
}
