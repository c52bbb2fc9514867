//! Flat-to-tree conversion for comment rendering.
//!
//! The flat collection is the source of truth; the hierarchy is derived
//! from it on demand and never cached. Conversion is a pure two-pass
//! function:
//!
//! 1. Register every well-formed comment (entries with an empty id are
//!    skipped, not errored)
//! 2. Attach each comment to its parent by `parent_id`; a comment whose
//!    parent is absent from the current collection is promoted to a root
//!
//! Promoting orphans keeps replies visible when their ancestor was deleted
//! or has not been loaded yet. Sibling order follows flat-collection order
//! at every level.

use crate::types::{Comment, CommentId};
use std::collections::{HashMap, HashSet};

/// Maximum nesting depth at which starting a new reply is still offered.
///
/// Presentation policy only: the data model supports unbounded depth, and
/// deeper trees still render.
pub const MAX_REPLY_DEPTH: usize = 4;

/// Returns true if the reply control should be enabled at `depth`
/// (0 = top-level comment).
pub fn can_reply_at(depth: usize) -> bool {
    depth < MAX_REPLY_DEPTH
}

/// One node of the rendered comment hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNode {
    /// The comment itself.
    pub comment: Comment,
    /// Nesting depth (0 for roots).
    pub depth: usize,
    /// Replies, in flat-collection order.
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    /// Total number of comments in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self.replies.iter().map(CommentNode::subtree_len).sum::<usize>()
    }
}

/// Builds the rendered hierarchy from a flat collection.
///
/// Pure function of its input: same flat collection, same tree.
pub fn build(flat: &[Comment]) -> Vec<CommentNode> {
    // Pass 1: register well-formed entries
    let ids: HashSet<&CommentId> = flat
        .iter()
        .filter(|c| !c.id.as_str().is_empty())
        .map(|c| &c.id)
        .collect();

    // Pass 2: group children under resolvable parents, in flat order
    let mut roots: Vec<&Comment> = Vec::new();
    let mut children: HashMap<&CommentId, Vec<&Comment>> = HashMap::new();
    for comment in flat.iter().filter(|c| !c.id.as_str().is_empty()) {
        match &comment.parent_id {
            Some(parent) if ids.contains(parent) && *parent != comment.id => {
                children.entry(parent).or_default().push(comment);
            }
            // Orphan or top-level: promote to root
            _ => roots.push(comment),
        }
    }

    roots
        .into_iter()
        .map(|c| attach(c, 0, &children))
        .collect()
}

fn attach(
    comment: &Comment,
    depth: usize,
    children: &HashMap<&CommentId, Vec<&Comment>>,
) -> CommentNode {
    let replies = children
        .get(&comment.id)
        .map(|kids| {
            kids.iter()
                .map(|kid| attach(kid, depth + 1, children))
                .collect()
        })
        .unwrap_or_default();

    CommentNode {
        comment: comment.clone(),
        depth,
        replies,
    }
}

/// Flattens a hierarchy back into a flat collection, pre-order.
///
/// `build(&flatten(&build(flat)))` yields the same parent/child relations
/// as `build(flat)`.
pub fn flatten(nodes: &[CommentNode]) -> Vec<Comment> {
    let mut flat = Vec::new();
    for node in nodes {
        flatten_into(node, &mut flat);
    }
    flat
}

fn flatten_into(node: &CommentNode, out: &mut Vec<Comment>) {
    out.push(node.comment.clone());
    for reply in &node.replies {
        flatten_into(reply, out);
    }
}

/// Finds a node by comment id anywhere in the hierarchy.
pub fn find<'a>(nodes: &'a [CommentNode], id: &CommentId) -> Option<&'a CommentNode> {
    for node in nodes {
        if node.comment.id == *id {
            return Some(node);
        }
        if let Some(found) = find(&node.replies, id) {
            return Some(found);
        }
    }
    None
}

/// Computes `{id} ∪ descendants(id)` by walking `parent_id` links over the
/// flat collection.
///
/// Always walks the current collection, never a cached tree, so the set
/// reflects edits that happened since the last render.
pub fn cascade_set(flat: &[Comment], id: &CommentId) -> HashSet<CommentId> {
    let mut children: HashMap<&CommentId, Vec<&CommentId>> = HashMap::new();
    for comment in flat {
        if let Some(parent) = &comment.parent_id {
            children.entry(parent).or_default().push(&comment.id);
        }
    }

    let mut set = HashSet::new();
    let mut queue = vec![id.clone()];
    while let Some(current) = queue.pop() {
        if !set.insert(current.clone()) {
            continue;
        }
        if let Some(kids) = children.get(&current) {
            queue.extend(kids.iter().map(|k| (*k).clone()));
        }
    }
    set
}
