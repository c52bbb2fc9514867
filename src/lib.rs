//! # feedcore
//!
//! Client-side engine for a social feed: optimistic likes and saves,
//! comment threads with optimistic insert/edit/delete, and incremental
//! feed pagination, all speaking to a remote backend through one
//! gateway trait.
//!
//! ## Design
//!
//! - **Optimistic first.** Mutations apply locally before the network
//!   round-trip and roll back to the captured prior value on failure.
//! - **One mutation per target.** A per-key lock rejects (never queues)
//!   a second concurrent mutation of the same like target or comment.
//! - **Flat collection is authoritative.** Comment trees are derived on
//!   demand from the flat collection; cascades are computed over the
//!   flat data, never a cached tree.
//! - **Stale responses are discarded.** Filter changes and thread
//!   invalidation bump an epoch; responses tagged with an old epoch are
//!   dropped instead of clobbering fresh state.
//!
//! ## Modules
//!
//! - [`types`] - identifiers, posts, comments, feed filters
//! - [`error`] - the crate-wide [`FeedError`] type
//! - [`gateway`] - the [`RemoteGateway`] trait and its HTTP implementation
//! - [`interactions`] - optimistic like/save store
//! - [`comments`] - comment threads and pure tree derivation
//! - [`feed`] - the feed paginator state machine
//! - [`session`] - per-user wiring of the above

pub mod comments;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod interactions;
pub mod session;
pub mod types;

#[cfg(test)]
mod testutil;

pub use comments::{CommentThread, MAX_REPLY_DEPTH};
pub use error::{FeedError, Result};
pub use feed::{FeedPaginator, FeedPhase};
pub use gateway::{HttpGateway, RemoteGateway};
pub use interactions::{InteractionKey, InteractionStore, ToggleOutcome};
pub use session::ClientSession;
pub use types::{Comment, CommentId, ContentRef, FeedFilter, FeedSort, Post, PostId, UserId};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
