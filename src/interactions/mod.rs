//! Optimistic binary interactions (likes and saves).
//!
//! Three pieces compose here:
//! - [`lock`]: per-key operation locks that reject overlapping mutations
//! - [`speculation`]: reversible speculative state changes
//! - [`store`]: the [`InteractionStore`] toggle engine built on both
//!
//! The store is independent of the comment and feed components; the three
//! are composed by the presentation layer (or [`crate::session::ClientSession`]).

pub mod lock;
pub mod speculation;
pub mod store;

pub use lock::{OpGuard, OpLockSet};
pub use speculation::Speculation;
pub use store::{InteractionKey, InteractionKind, InteractionRecord, InteractionStore, ToggleOutcome};
