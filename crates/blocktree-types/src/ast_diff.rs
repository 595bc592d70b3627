//! Tree diff infrastructure for blocktree.
//!
//! Compares two versions of a program tree and produces a structured list
//! of per-node changes, keyed by [`NodeId`]. Used for:
//! - letting the presentation layer re-render only what changed after a commit
//! - checking that a commit touched only the nodes the edit was meant to touch
//!
//! Subtrees shared between the two versions (pointer-equal) are skipped
//! without inspection.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::ast::*;
use serde::{Deserialize, Serialize};

// ══════════════════════════════════════════════════════════════════════════════
// Types
// ══════════════════════════════════════════════════════════════════════════════

/// A single change between two trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeChange {
    pub id: NodeId,
    pub kind: ChangeKind,
}

/// What kind of change occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// The id is present only in the new tree.
    Added,
    /// The id is present only in the old tree.
    Removed,
    /// The id is present in both, but the node's own content or its
    /// direct child ids differ.
    Modified,
}

/// A structured diff between two trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDiff {
    pub changes: Vec<NodeChange>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Core diff
// ══════════════════════════════════════════════════════════════════════════════

impl TreeDiff {
    /// Compute the diff between two trees. Changes are ordered by id.
    pub fn diff(old: &NodeRef, new: &NodeRef) -> Self {
        let mut changes = Vec::new();
        if !Rc::ptr_eq(old, new) {
            let old_nodes = index(old);
            let new_nodes = index(new);

            for (id, o) in &old_nodes {
                match new_nodes.get(id) {
                    None => push(&mut changes, id, ChangeKind::Removed),
                    Some(n) if !Rc::ptr_eq(o, n) && !shallow_eq(o, n) => {
                        push(&mut changes, id, ChangeKind::Modified)
                    }
                    Some(_) => {}
                }
            }
            for id in new_nodes.keys() {
                if !old_nodes.contains_key(id) {
                    push(&mut changes, id, ChangeKind::Added);
                }
            }
            changes.sort_by(|a, b| a.id.cmp(&b.id));
        }
        TreeDiff { changes }
    }

    /// True if the two trees are identical (no changes).
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Ids of every changed node.
    pub fn changed_ids(&self) -> Vec<&NodeId> {
        self.changes.iter().map(|c| &c.id).collect()
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Diff walkers
// ══════════════════════════════════════════════════════════════════════════════

fn push(changes: &mut Vec<NodeChange>, id: &NodeId, kind: ChangeKind) {
    changes.push(NodeChange {
        id: id.clone(),
        kind,
    });
}

fn index(tree: &NodeRef) -> BTreeMap<NodeId, &NodeRef> {
    let mut nodes = BTreeMap::new();
    tree.walk(&mut |n| {
        nodes.insert(n.id.clone(), n);
    });
    nodes
}

fn child_ids(node: &Node) -> Vec<&NodeId> {
    node.children().into_iter().map(|c| &c.id).collect()
}

/// Compare two nodes without looking below their direct children.
fn shallow_eq(old: &Node, new: &Node) -> bool {
    match (&old.kind, &new.kind) {
        (NodeKind::Hole, NodeKind::Hole) => true,
        (NodeKind::Literal { value: a }, NodeKind::Literal { value: b }) => a == b,
        (NodeKind::VarRef { target: a }, NodeKind::VarRef { target: b }) => a == b,
        (NodeKind::Bind { name: a }, NodeKind::Bind { name: b }) => a == b,
        (
            NodeKind::FnApp { func: fa, args: aa },
            NodeKind::FnApp { func: fb, args: ab },
        ) => fa == fb && aa.keys().eq(ab.keys()) && child_ids(old) == child_ids(new),
        (NodeKind::Eq { .. }, NodeKind::Eq { .. })
        | (NodeKind::When { .. }, NodeKind::When { .. })
        | (NodeKind::EmitUnit { .. }, NodeKind::EmitUnit { .. })
        | (NodeKind::EmitValue { .. }, NodeKind::EmitValue { .. })
        | (NodeKind::Program { .. }, NodeKind::Program { .. }) => {
            child_ids(old) == child_ids(new)
        }
        _ => false,
    }
}
