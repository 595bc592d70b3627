//! Per-drag state.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use blocktree_types::transform::{collect_ids, detach, parent_of, randomize_ids};
use blocktree_types::{NodeId, NodeRef};
use serde::{Deserialize, Serialize};

use crate::error::{EditError, EditResult};
use crate::zone::{DropTarget, Zone, ZoneKind};

/// Opaque drag-session id chosen by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DragId(pub String);

impl fmt::Display for DragId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DragId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DragId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Where a dragged block came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragOrigin {
    /// A read-only template. The payload is instantiated with fresh ids.
    Palette,
    /// A node already in the tree. It is detached from the drag's base.
    Tree,
}

/// The candidate edit for one drag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotentialDrop {
    pub node: NodeRef,
    pub target: DropTarget,
    /// True iff the speculative tree analyzes without errors.
    pub valid: bool,
    /// Committed revision the candidate was computed against.
    pub revision: u64,
}

/// One active drag.
#[derive(Debug, Clone)]
pub(crate) struct DragSession {
    pub(crate) payload: NodeRef,
    pub(crate) origin: DragOrigin,
    /// The tree the payload lands in: the committed tree, minus the payload
    /// for tree-origin drags.
    pub(crate) base: NodeRef,
    /// Revision `base` was derived from.
    pub(crate) revision: u64,
    pub(crate) candidate: Option<PotentialDrop>,
    /// List position the payload was lifted from, in the committed tree.
    pub(crate) lifted_from: Option<(NodeId, usize)>,
    /// Set once a commit removed a tree-origin payload from the tree.
    pub(crate) lost: bool,
}

impl DragSession {
    pub(crate) fn begin(
        tree: &NodeRef,
        revision: u64,
        payload: NodeRef,
        origin: DragOrigin,
    ) -> EditResult<Self> {
        let payload = match origin {
            DragOrigin::Palette => randomize_ids(&payload, |_| true),
            DragOrigin::Tree => tree
                .find(&payload.id)
                .cloned()
                .ok_or_else(|| EditError::UnknownNode(payload.id.clone()))?,
        };
        let base = base_for(tree, &payload, origin)?;

        let taken: HashSet<NodeId> = collect_ids(&base).into_iter().collect();
        if let Some(clash) = collect_ids(&payload).into_iter().find(|id| taken.contains(id)) {
            return Err(EditError::PayloadIdCollision(clash));
        }

        let lifted_from = lifted_from(tree, &payload, origin);
        Ok(Self {
            payload,
            origin,
            base,
            revision,
            candidate: None,
            lifted_from,
            lost: false,
        })
    }

    /// Re-derive `base` from a newer committed tree.
    ///
    /// A tree-origin payload that is no longer in `tree` marks the session
    /// lost: it stays open but never yields a candidate again.
    pub(crate) fn rebase(&mut self, tree: &NodeRef, revision: u64) -> EditResult<()> {
        self.revision = revision;
        self.candidate = None;
        if self.origin == DragOrigin::Tree && tree.find(&self.payload.id).is_none() {
            self.lost = true;
            self.lifted_from = None;
            self.base = tree.clone();
            return Ok(());
        }
        self.base = base_for(tree, &self.payload, self.origin)?;
        self.lifted_from = lifted_from(tree, &self.payload, self.origin);
        Ok(())
    }

    /// Map zones laid out against the committed tree onto `base`.
    ///
    /// Lifting a list member shifts every later slot of that list up by one.
    /// The slots on either side of the lifted item both put it back where it
    /// was.
    pub(crate) fn zones_in_base<'z>(&self, zones: &'z [Zone]) -> Cow<'z, [Zone]> {
        let Some((owner, at)) = &self.lifted_from else {
            return Cow::Borrowed(zones);
        };
        let shifted = |z: &Zone| {
            matches!(&z.kind, ZoneKind::ListSlot { parent, index, .. } if parent == owner && index > at)
        };
        if !zones.iter().any(|z| shifted(z)) {
            return Cow::Borrowed(zones);
        }
        Cow::Owned(
            zones
                .iter()
                .map(|z| {
                    let mut z = z.clone();
                    if shifted(&z) {
                        if let ZoneKind::ListSlot { index, .. } = &mut z.kind {
                            *index -= 1;
                        }
                    }
                    z
                })
                .collect(),
        )
    }
}

/// Parent id and index of a tree-origin payload that sits in an ordered list.
fn lifted_from(tree: &NodeRef, payload: &NodeRef, origin: DragOrigin) -> Option<(NodeId, usize)> {
    if origin != DragOrigin::Tree {
        return None;
    }
    let parent = parent_of(tree, &payload.id)?;
    let index = parent.list()?.iter().position(|n| n.id == payload.id)?;
    Some((parent.id.clone(), index))
}

/// The tree a payload from `origin` lands in.
pub(crate) fn base_for(tree: &NodeRef, payload: &NodeRef, origin: DragOrigin) -> EditResult<NodeRef> {
    match origin {
        DragOrigin::Palette => Ok(tree.clone()),
        DragOrigin::Tree => Ok(detach(tree, &payload.id)?),
    }
}
