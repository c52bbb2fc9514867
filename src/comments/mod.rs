//! Comment collection and hierarchy management.
//!
//! Comments are held flat (an array with `parent_id` references) and the
//! rendered hierarchy is derived on demand:
//!
//! ```text
//! flat collection (authoritative)
//!     └── tree::build ──► Vec<CommentNode> (derived, never cached)
//! ```
//!
//! [`tree`] holds the pure conversion functions; [`thread`] holds the
//! stateful [`CommentThread`] manager with its optimistic mutations.

pub mod thread;
pub mod tree;

pub use thread::CommentThread;
pub use tree::{build, can_reply_at, cascade_set, flatten, CommentNode, MAX_REPLY_DEPTH};
