//! Optimistic comment thread manager.
//!
//! One [`CommentThread`] manages the flat comment collection of a single
//! post. The flat collection is authoritative; the rendered hierarchy is
//! derived from it on demand via [`crate::comments::tree`]. Mutations are
//! optimistic:
//!
//! - A new comment is prepended immediately with a temporary id and
//!   `is_pending` set, then replaced in place (same position) by the
//!   server-confirmed entity, or removed entirely if the call fails.
//! - A delete first flags the target and all transitive descendants as
//!   `is_deleting`; the nodes are removed, atomically, only once the
//!   server confirms. On failure the flags revert and the comments stay.
//! - An edit is confirmed first and merged in place afterwards; children
//!   are untouched and no rebuild happens.
//!
//! Loads are tagged with an epoch so a response that arrives after the
//! thread was invalidated is discarded instead of resurrecting stale state.

use crate::comments::tree::{self, CommentNode};
use crate::error::{FeedError, Result};
use crate::gateway::{CommentPatch, CreateCommentRequest, RemoteGateway, DEFAULT_COMMENT_LIMIT};
use crate::interactions::lock::OpLockSet;
use crate::interactions::speculation::Speculation;
use crate::types::{Comment, CommentId, MediaItem, PostId, UserId};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Internal thread state: the flat collection plus the load epoch.
#[derive(Debug, Default)]
struct ThreadState {
    comments: Vec<Comment>,
    epoch: u64,
}

/// Manager for one post's comment collection.
pub struct CommentThread {
    gateway: Arc<dyn RemoteGateway>,
    post_id: PostId,
    viewer: UserId,
    state: Mutex<ThreadState>,
    locks: OpLockSet<CommentId>,
}

impl CommentThread {
    /// Creates a thread manager for `post_id`, with `viewer` as the author
    /// of optimistic inserts.
    pub fn new(gateway: Arc<dyn RemoteGateway>, post_id: PostId, viewer: UserId) -> Self {
        Self {
            gateway,
            post_id,
            viewer,
            state: Mutex::new(ThreadState::default()),
            locks: OpLockSet::new(),
        }
    }

    /// The post this thread belongs to.
    pub fn post_id(&self) -> &PostId {
        &self.post_id
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Fetches the flat comment collection from the gateway, replacing the
    /// local one. Returns the number of comments loaded.
    ///
    /// The fetch is tagged with the current epoch; if [`invalidate`] ran
    /// while the request was in flight the response is discarded and 0 is
    /// returned.
    ///
    /// [`invalidate`]: CommentThread::invalidate
    pub async fn load(&self, limit: usize) -> Result<usize> {
        let epoch = self.lock_state().epoch;
        let comments = self
            .gateway
            .list_comments_for_post(&self.post_id, limit)
            .await?;

        let mut state = self.lock_state();
        if state.epoch != epoch {
            debug!(post_id = %self.post_id, "discarding stale comment load");
            return Ok(0);
        }
        let loaded = comments.len();
        state.comments = comments;
        Ok(loaded)
    }

    /// Fetches with the default comment limit.
    pub async fn load_default(&self) -> Result<usize> {
        self.load(DEFAULT_COMMENT_LIMIT).await
    }

    /// Ends the current loading session: clears the collection and bumps
    /// the epoch so any in-flight load resolves to a no-op.
    pub fn invalidate(&self) {
        let mut state = self.lock_state();
        state.epoch += 1;
        state.comments.clear();
    }

    // =========================================================================
    // Optimistic mutations
    // =========================================================================

    /// Validates, optimistically inserts and submits a top-level comment.
    ///
    /// Returns the server-confirmed comment. On failure the optimistic
    /// entry is removed and the error propagated.
    pub async fn add_comment(
        &self,
        content: impl Into<String>,
        media: Vec<MediaItem>,
    ) -> Result<Comment> {
        self.submit(None, content.into(), media).await
    }

    /// Validates, optimistically inserts and submits a reply to
    /// `parent_id`.
    pub async fn reply(
        &self,
        parent_id: CommentId,
        content: impl Into<String>,
        media: Vec<MediaItem>,
    ) -> Result<Comment> {
        self.submit(Some(parent_id), content.into(), media).await
    }

    async fn submit(
        &self,
        parent_id: Option<CommentId>,
        content: String,
        media: Vec<MediaItem>,
    ) -> Result<Comment> {
        if content.trim().is_empty() {
            return Err(FeedError::validation("comment content must not be empty"));
        }

        let optimistic = Comment::optimistic(
            self.post_id.clone(),
            parent_id.clone(),
            self.viewer.clone(),
            content.clone(),
            media.clone(),
        );
        let temp_id = self.insert_optimistic(optimistic);

        let request = CreateCommentRequest {
            post_id: self.post_id.clone(),
            content,
            media,
            parent_id,
        };
        match self.gateway.create_comment(request).await {
            Ok(confirmed) => {
                self.reconcile(&temp_id, confirmed.clone());
                Ok(confirmed)
            }
            Err(e) => {
                self.reconcile_failure(&temp_id);
                warn!(post_id = %self.post_id, error = %e, "comment create failed, removed optimistic entry");
                Err(e)
            }
        }
    }

    /// Prepends an optimistic entry and returns its (temporary) id.
    ///
    /// Normally called through [`add_comment`]/[`reply`]; exposed for
    /// presentation layers that drive the gateway themselves.
    ///
    /// [`add_comment`]: CommentThread::add_comment
    /// [`reply`]: CommentThread::reply
    pub fn insert_optimistic(&self, comment: Comment) -> CommentId {
        let id = comment.id.clone();
        self.lock_state().comments.insert(0, comment);
        id
    }

    /// Replaces the temporary entry with the server-confirmed comment, in
    /// place: the entry keeps its position in the collection.
    ///
    /// Returns false (and changes nothing) if the temporary id is no
    /// longer present, e.g. after an invalidation.
    pub fn reconcile(&self, temp_id: &CommentId, confirmed: Comment) -> bool {
        let mut state = self.lock_state();
        match state.comments.iter().position(|c| c.id == *temp_id) {
            Some(index) => {
                state.comments[index] = confirmed;
                true
            }
            None => {
                debug!(%temp_id, "reconcile target no longer present");
                false
            }
        }
    }

    /// Removes the temporary entry entirely after a failed create.
    pub fn reconcile_failure(&self, temp_id: &CommentId) -> bool {
        let mut state = self.lock_state();
        let before = state.comments.len();
        state.comments.retain(|c| c.id != *temp_id);
        state.comments.len() != before
    }

    /// Validates and submits an edit, then merges the confirmed fields in
    /// place. Children are untouched and no rebuild happens.
    ///
    /// Rejected before dispatch when the patch is empty, when the new
    /// content is blank, when the comment is still awaiting confirmation,
    /// or when another edit for the same comment is in flight.
    pub async fn edit(&self, id: &CommentId, patch: CommentPatch) -> Result<Comment> {
        if patch.is_empty() {
            return Err(FeedError::validation("edit changes nothing"));
        }
        if let Some(content) = &patch.content {
            if content.trim().is_empty() {
                return Err(FeedError::validation("comment content must not be empty"));
            }
        }
        if id.is_temporary() {
            return Err(FeedError::validation(
                "comment is not yet confirmed by the server",
            ));
        }
        let Some(_guard) = self.locks.try_acquire(id.clone()) else {
            return Err(FeedError::validation(
                "an operation for this comment is already in flight",
            ));
        };

        let confirmed = self.gateway.edit_comment(id, patch).await?;
        self.edit_in_place(&confirmed);
        Ok(confirmed)
    }

    /// Shallow-merges server-confirmed fields into the stored entry.
    ///
    /// Only content, media and the edited flag move; position, parent and
    /// timestamps stay as they are.
    pub fn edit_in_place(&self, confirmed: &Comment) -> bool {
        let mut state = self.lock_state();
        match state.comments.iter_mut().find(|c| c.id == confirmed.id) {
            Some(existing) => {
                existing.content = confirmed.content.clone();
                existing.media = confirmed.media.clone();
                existing.is_edited = true;
                true
            }
            None => false,
        }
    }

    /// Deletes a comment and its descendants, reversibly.
    ///
    /// The cascade set is flagged `is_deleting` while the request is
    /// outstanding; removal happens only on server confirmation, as one
    /// atomic state update. On failure the flags revert to their captured
    /// prior values and the error propagates. Returns `Ok(false)` without
    /// a remote call when a delete for this comment is already in flight.
    ///
    /// A still-unconfirmed (temporary) comment never reached the server
    /// and is simply removed locally.
    pub async fn delete(&self, id: &CommentId) -> Result<bool> {
        if id.is_temporary() {
            return Ok(self.cascade_delete(id) > 0);
        }
        let Some(_guard) = self.locks.try_acquire(id.clone()) else {
            debug!(%id, "delete rejected: already in flight");
            return Ok(false);
        };

        // Flag the cascade, capturing the entries' prior state
        let speculation = {
            let mut state = self.lock_state();
            let set = tree::cascade_set(&state.comments, id);
            let affected: Vec<Comment> = state
                .comments
                .iter()
                .filter(|c| set.contains(&c.id))
                .cloned()
                .collect();
            if affected.is_empty() {
                return Err(FeedError::invalid_input(format!("unknown comment {}", id)));
            }
            for comment in state.comments.iter_mut() {
                if set.contains(&comment.id) {
                    comment.is_deleting = true;
                }
            }
            Speculation::from_prior(affected)
        };

        match self.gateway.delete_comment(id).await {
            Ok(()) => {
                speculation.commit();
                self.cascade_delete(id);
                Ok(true)
            }
            Err(e) => {
                let mut state = self.lock_state();
                for prior in speculation.revert() {
                    if let Some(existing) =
                        state.comments.iter_mut().find(|c| c.id == prior.id)
                    {
                        *existing = prior;
                    }
                }
                warn!(%id, error = %e, "delete failed, restored cascade");
                Err(e)
            }
        }
    }

    /// Removes `id` and all transitive descendants as one atomic state
    /// update; no partial removal is ever observable. The descendant set
    /// is computed over the current flat collection, never a cached tree.
    /// Returns the number of comments removed.
    pub fn cascade_delete(&self, id: &CommentId) -> usize {
        let mut state = self.lock_state();
        let set = tree::cascade_set(&state.comments, id);
        let before = state.comments.len();
        state.comments.retain(|c| !set.contains(&c.id));
        before - state.comments.len()
    }

    /// Sets the `is_deleting` flag on `id` and all transitive descendants
    /// without removing anything. Returns the number of comments flagged.
    pub fn mark_deleting(&self, id: &CommentId, deleting: bool) -> usize {
        let mut state = self.lock_state();
        let set = tree::cascade_set(&state.comments, id);
        let mut flagged = 0;
        for comment in state.comments.iter_mut() {
            if set.contains(&comment.id) {
                comment.is_deleting = deleting;
                flagged += 1;
            }
        }
        flagged
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    /// Snapshot of the flat collection.
    pub fn comments(&self) -> Vec<Comment> {
        self.lock_state().comments.clone()
    }

    /// The rendered hierarchy, derived from the current flat collection.
    pub fn tree(&self) -> Vec<CommentNode> {
        tree::build(&self.lock_state().comments)
    }

    /// Looks up one comment by id.
    pub fn get(&self, id: &CommentId) -> Option<Comment> {
        self.lock_state()
            .comments
            .iter()
            .find(|c| c.id == *id)
            .cloned()
    }

    /// Number of comments in the flat collection.
    pub fn len(&self) -> usize {
        self.lock_state().comments.len()
    }

    /// True when the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.lock_state().comments.is_empty()
    }

    /// Whether a mutation for this comment is currently in flight.
    pub fn is_busy(&self, id: &CommentId) -> bool {
        self.locks.is_held(id)
    }

    fn lock_state(&self) -> MutexGuard<'_, ThreadState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockGateway;
    use crate::types::current_timestamp_millis;

    fn create_test_thread() -> (CommentThread, Arc<MockGateway>) {
        let gateway = Arc::new(MockGateway::new());
        let thread = CommentThread::new(gateway.clone(), PostId::new("p1"), UserId::new("viewer"));
        (thread, gateway)
    }

    fn server_comment(id: &str, parent: Option<&str>) -> Comment {
        Comment {
            id: CommentId::new(id),
            parent_id: parent.map(CommentId::new),
            post_id: PostId::new("p1"),
            author_id: UserId::new("u1"),
            content: format!("comment {}", id),
            media: Vec::new(),
            created_at: current_timestamp_millis(),
            is_edited: false,
            is_pending: false,
            is_deleting: false,
        }
    }

    #[tokio::test]
    async fn test_add_comment_reconciles_in_place() {
        let (thread, _gateway) = create_test_thread();
        thread.insert_optimistic(server_comment("existing", None));

        let confirmed = thread.add_comment("hello", Vec::new()).await.unwrap();
        assert!(!confirmed.id.is_temporary());

        // The confirmed entry sits where the optimistic one was: index 0
        let comments = thread.comments();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, confirmed.id);
        assert!(!comments[0].is_pending);
        assert_eq!(comments[1].id.as_str(), "existing");
    }

    #[tokio::test]
    async fn test_insert_optimistic_prepends_pending_entry() {
        let (thread, _gateway) = create_test_thread();
        thread.insert_optimistic(server_comment("old", None));

        let optimistic = Comment::optimistic(
            PostId::new("p1"),
            None,
            UserId::new("viewer"),
            "draft",
            Vec::new(),
        );
        let temp_id = thread.insert_optimistic(optimistic);

        let comments = thread.comments();
        assert_eq!(comments[0].id, temp_id);
        assert!(comments[0].is_pending);
        assert!(temp_id.is_temporary());
    }

    #[tokio::test]
    async fn test_failed_create_removes_optimistic_entry() {
        let (thread, gateway) = create_test_thread();
        gateway.fail("create_comment");

        let err = thread.add_comment("doomed", Vec::new()).await.unwrap_err();
        assert!(err.is_network());
        assert!(thread.is_empty());
    }

    #[tokio::test]
    async fn test_empty_content_rejected_before_dispatch() {
        let (thread, gateway) = create_test_thread();

        let err = thread.add_comment("   ", Vec::new()).await.unwrap_err();
        assert!(matches!(err, FeedError::Validation(_)));
        assert_eq!(gateway.call_count("create_comment"), 0);
        assert!(thread.is_empty());
    }

    #[tokio::test]
    async fn test_reply_carries_parent_id() {
        let (thread, _gateway) = create_test_thread();
        thread.insert_optimistic(server_comment("root", None));

        let confirmed = thread
            .reply(CommentId::new("root"), "a reply", Vec::new())
            .await
            .unwrap();
        assert_eq!(confirmed.parent_id, Some(CommentId::new("root")));

        let rendered = thread.tree();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].replies.len(), 1);
        assert_eq!(rendered[0].replies[0].comment.id, confirmed.id);
    }

    #[tokio::test]
    async fn test_cascade_delete_removes_exact_set() {
        let (thread, _gateway) = create_test_thread();
        // Scenario: 1 <- 2 <- 3 plus an unrelated root
        for c in [
            server_comment("1", None),
            server_comment("2", Some("1")),
            server_comment("3", Some("2")),
            server_comment("x", None),
        ] {
            thread.insert_optimistic(c);
        }

        let removed = thread.cascade_delete(&CommentId::new("1"));
        assert_eq!(removed, 3);
        let remaining = thread.comments();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id.as_str(), "x");
    }

    #[tokio::test]
    async fn test_cascade_delete_full_chain_empties_collection() {
        let (thread, _gateway) = create_test_thread();
        for c in [
            server_comment("1", None),
            server_comment("2", Some("1")),
            server_comment("3", Some("2")),
        ] {
            thread.insert_optimistic(c);
        }

        thread.cascade_delete(&CommentId::new("1"));
        assert!(thread.is_empty());
    }

    #[tokio::test]
    async fn test_delete_marks_then_removes_on_confirmation() {
        let (thread, gateway) = create_test_thread();
        for c in [server_comment("1", None), server_comment("2", Some("1"))] {
            thread.insert_optimistic(c);
        }

        assert!(thread.delete(&CommentId::new("1")).await.unwrap());
        assert!(thread.is_empty());
        assert_eq!(gateway.call_count("delete_comment"), 1);
    }

    #[tokio::test]
    async fn test_delete_failure_reverts_flags() {
        let (thread, gateway) = create_test_thread();
        for c in [server_comment("1", None), server_comment("2", Some("1"))] {
            thread.insert_optimistic(c);
        }
        gateway.fail("delete_comment");

        let err = thread.delete(&CommentId::new("1")).await.unwrap_err();
        assert!(err.is_network());

        // Nothing removed, nothing left flagged
        let comments = thread.comments();
        assert_eq!(comments.len(), 2);
        assert!(comments.iter().all(|c| !c.is_deleting));
        assert!(!thread.is_busy(&CommentId::new("1")));
    }

    #[tokio::test]
    async fn test_delete_of_temporary_comment_is_local_only() {
        let (thread, gateway) = create_test_thread();
        let optimistic = Comment::optimistic(
            PostId::new("p1"),
            None,
            UserId::new("viewer"),
            "draft",
            Vec::new(),
        );
        let temp_id = thread.insert_optimistic(optimistic);

        assert!(thread.delete(&temp_id).await.unwrap());
        assert!(thread.is_empty());
        assert_eq!(gateway.call_count("delete_comment"), 0);
    }

    #[tokio::test]
    async fn test_second_delete_rejected_while_in_flight() {
        let (thread, gateway) = create_test_thread();
        let thread = Arc::new(thread);
        thread.insert_optimistic(server_comment("1", None));
        gateway.block("delete_comment");

        let first = {
            let thread = thread.clone();
            tokio::spawn(async move { thread.delete(&CommentId::new("1")).await })
        };
        gateway.wait_for_calls("delete_comment", 1).await;

        assert!(!thread.delete(&CommentId::new("1")).await.unwrap());
        assert_eq!(gateway.call_count("delete_comment"), 1);

        gateway.release("delete_comment");
        assert!(first.await.unwrap().unwrap());
        assert!(thread.is_empty());
    }

    #[tokio::test]
    async fn test_edit_merges_in_place_without_touching_children() {
        let (thread, _gateway) = create_test_thread();
        for c in [server_comment("1", None), server_comment("2", Some("1"))] {
            thread.insert_optimistic(c);
        }

        let confirmed = thread
            .edit(&CommentId::new("1"), CommentPatch::content("edited"))
            .await
            .unwrap();
        assert_eq!(confirmed.content, "edited");

        let stored = thread.get(&CommentId::new("1")).unwrap();
        assert_eq!(stored.content, "edited");
        assert!(stored.is_edited);

        // Child untouched and still attached
        let rendered = thread.tree();
        assert_eq!(rendered[0].replies.len(), 1);
        assert_eq!(rendered[0].replies[0].comment.content, "comment 2");
    }

    #[tokio::test]
    async fn test_edit_validation() {
        let (thread, gateway) = create_test_thread();
        thread.insert_optimistic(server_comment("1", None));

        let err = thread
            .edit(&CommentId::new("1"), CommentPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Validation(_)));

        let err = thread
            .edit(&CommentId::new("1"), CommentPatch::content("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Validation(_)));
        assert_eq!(gateway.call_count("edit_comment"), 0);
    }

    #[tokio::test]
    async fn test_load_replaces_collection() {
        let (thread, gateway) = create_test_thread();
        gateway.set_comments(vec![
            server_comment("a", None),
            server_comment("b", Some("a")),
        ]);

        let loaded = thread.load_default().await.unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(thread.len(), 2);
    }

    #[tokio::test]
    async fn test_stale_load_is_discarded_after_invalidate() {
        let (thread, gateway) = create_test_thread();
        let thread = Arc::new(thread);
        gateway.set_comments(vec![server_comment("a", None)]);
        gateway.block("list_comments_for_post");

        let load = {
            let thread = thread.clone();
            tokio::spawn(async move { thread.load_default().await })
        };
        gateway.wait_for_calls("list_comments_for_post", 1).await;

        // The view went away while the load was in flight
        thread.invalidate();
        gateway.release("list_comments_for_post");

        assert_eq!(load.await.unwrap().unwrap(), 0);
        assert!(thread.is_empty());
    }

    #[tokio::test]
    async fn test_mark_deleting_cascades_without_removing() {
        let (thread, _gateway) = create_test_thread();
        for c in [
            server_comment("1", None),
            server_comment("2", Some("1")),
            server_comment("x", None),
        ] {
            thread.insert_optimistic(c);
        }

        assert_eq!(thread.mark_deleting(&CommentId::new("1"), true), 2);
        let comments = thread.comments();
        assert_eq!(comments.len(), 3);
        assert!(thread.get(&CommentId::new("1")).unwrap().is_deleting);
        assert!(thread.get(&CommentId::new("2")).unwrap().is_deleting);
        assert!(!thread.get(&CommentId::new("x")).unwrap().is_deleting);
    }
}
