//! Shared types for the feed client core.
//!
//! This module contains the types shared by all three engine components:
//! - Opaque id newtypes (`PostId`, `CommentId`, `UserId`)
//! - `ContentRef`: the (kind, id) reference used to key interactions
//! - `Comment` and `Post`: the entities the engine keeps locally consistent
//!
//! Ids are opaque strings assigned by the server; the client never parses
//! them. Temporary comment ids carry a `tmp-` prefix so an optimistic entry
//! can be told apart from a server-confirmed one.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix used for client-assigned temporary comment ids.
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Returns the current Unix timestamp in milliseconds.
pub fn current_timestamp_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Opaque server-assigned post identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostId(pub String);

impl PostId {
    /// Creates a post id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque comment identifier.
///
/// Either server-assigned, or a client-generated temporary id (prefixed with
/// [`TEMP_ID_PREFIX`]) for an optimistic entry awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommentId(pub String);

impl CommentId {
    /// Creates a comment id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh temporary id for an optimistic insert.
    pub fn temporary() -> Self {
        Self(format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4()))
    }

    /// Returns true if this id was generated client-side and is awaiting
    /// server confirmation.
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque server-assigned user identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Creates a user id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind discriminator for likeable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// A feed post.
    Post,
    /// A comment on a post.
    Comment,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Post => write!(f, "post"),
            ContentKind::Comment => write!(f, "comment"),
        }
    }
}

/// Reference to a piece of likeable content: kind plus opaque id.
///
/// Used as (part of) the interaction map key and in gateway calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRef {
    /// Whether this references a post or a comment.
    pub kind: ContentKind,
    /// The opaque content id.
    pub id: String,
}

impl ContentRef {
    /// Creates a reference to a post.
    pub fn post(id: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Post,
            id: id.into(),
        }
    }

    /// Creates a reference to a comment.
    pub fn comment(id: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Comment,
            id: id.into(),
        }
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A media attachment on a post or comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// URL of the media asset.
    pub url: String,
    /// MIME type reported by the server (e.g. "image/png").
    pub mime_type: String,
}

impl MediaItem {
    /// Creates a media item.
    pub fn new(url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// A single comment in the flat collection.
///
/// The flat collection is authoritative; the rendered hierarchy is derived
/// from `parent_id` links on demand (see `comments::tree`). The
/// `is_pending`/`is_deleting` flags exist purely for the presentation layer:
/// a pending comment is awaiting server confirmation, a deleting comment has
/// an outstanding delete request and may yet be reverted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment id (temporary until confirmed).
    pub id: CommentId,
    /// Parent comment id; `None` for a top-level comment.
    pub parent_id: Option<CommentId>,
    /// The post this comment belongs to.
    pub post_id: PostId,
    /// Author of the comment.
    pub author_id: UserId,
    /// Comment body.
    pub content: String,
    /// Ordered media attachments.
    #[serde(default)]
    pub media: Vec<MediaItem>,
    /// Creation timestamp (milliseconds).
    pub created_at: u64,
    /// True once the comment has been edited.
    #[serde(default)]
    pub is_edited: bool,
    /// True while the comment is an optimistic insert awaiting confirmation.
    #[serde(default, skip_serializing)]
    pub is_pending: bool,
    /// True while a delete request for this comment is outstanding.
    #[serde(default, skip_serializing)]
    pub is_deleting: bool,
}

impl Comment {
    /// Creates an optimistic comment with a fresh temporary id.
    ///
    /// The entry is marked `is_pending` and stamped with the local clock;
    /// both are replaced by server-confirmed values on reconciliation.
    pub fn optimistic(
        post_id: PostId,
        parent_id: Option<CommentId>,
        author_id: UserId,
        content: impl Into<String>,
        media: Vec<MediaItem>,
    ) -> Self {
        Self {
            id: CommentId::temporary(),
            parent_id,
            post_id,
            author_id,
            content: content.into(),
            media,
            created_at: current_timestamp_millis(),
            is_edited: false,
            is_pending: true,
            is_deleting: false,
        }
    }
}

/// A feed post as returned by the gateway.
///
/// Carries the interaction state the server already knows (`is_liked`,
/// `is_saved`, counts) so the interaction store can be seeded without extra
/// round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post id.
    pub id: PostId,
    /// Author of the post.
    pub author_id: UserId,
    /// Community the post was published in, if any.
    pub community_id: Option<String>,
    /// Post title.
    pub title: String,
    /// Post body.
    pub content: String,
    /// Ordered media attachments.
    #[serde(default)]
    pub media: Vec<MediaItem>,
    /// Number of likes the server reported.
    #[serde(default)]
    pub like_count: u64,
    /// Number of comments the server reported.
    #[serde(default)]
    pub comment_count: u64,
    /// Whether the requesting user has liked this post.
    #[serde(default)]
    pub is_liked: bool,
    /// Whether the requesting user has saved this post.
    #[serde(default)]
    pub is_saved: bool,
    /// Creation timestamp (milliseconds).
    pub created_at: u64,
}

/// Sort order for the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSort {
    /// Newest first.
    #[default]
    Latest,
    /// Highest like count first.
    Top,
    /// Server-side trending ranking.
    Trending,
}

impl fmt::Display for FeedSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSort::Latest => write!(f, "latest"),
            FeedSort::Top => write!(f, "top"),
            FeedSort::Trending => write!(f, "trending"),
        }
    }
}

/// Active feed filter: one value per filter session.
///
/// Changing any field starts a new filter session in the paginator (page
/// numbering restarts, `has_more` resets).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedFilter {
    /// Sort order tab.
    pub sort: FeedSort,
    /// Restrict the feed to a single community.
    pub community_id: Option<String>,
    /// Restrict the feed to the user's saved posts.
    #[serde(default)]
    pub saved_only: bool,
}

impl FeedFilter {
    /// Filter for a single community with the given sort.
    pub fn community(community_id: impl Into<String>, sort: FeedSort) -> Self {
        Self {
            sort,
            community_id: Some(community_id.into()),
            saved_only: false,
        }
    }
}
