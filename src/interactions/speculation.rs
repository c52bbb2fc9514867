//! Reversible speculative state changes.
//!
//! An optimistic update applies a transition locally before the server has
//! confirmed it. [`Speculation`] makes every such transition reversible by
//! construction: the exact prior value is captured before the change, then
//! either discarded on confirmation (`commit`) or handed back for
//! restoration on failure (`revert`). Rollback restores the captured value
//! itself, never a recomputed one, so it is a true inverse of the
//! optimistic step even if related state moved in the meantime.

/// The captured inverse of a speculative state change.
#[derive(Debug)]
#[must_use = "a speculation must be committed or reverted"]
pub struct Speculation<T> {
    prior: T,
}

impl<T: Clone> Speculation<T> {
    /// Captures the current value before it is speculatively changed.
    pub fn capture(current: &T) -> Self {
        Self {
            prior: current.clone(),
        }
    }
}

impl<T> Speculation<T> {
    /// Wraps an already-owned prior value.
    pub fn from_prior(prior: T) -> Self {
        Self { prior }
    }

    /// The captured prior value.
    pub fn prior(&self) -> &T {
        &self.prior
    }

    /// Confirms the speculative change, discarding the inverse.
    pub fn commit(self) {}

    /// Abandons the speculative change, yielding the exact prior value for
    /// the caller to restore.
    pub fn revert(self) -> T {
        self.prior
    }
}
