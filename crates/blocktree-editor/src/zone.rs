//! Drop zones and nearest-zone resolution.
//!
//! The presentation layer describes every place a block could land as a
//! [`Zone`]. [`resolve_nearest`] picks one for the current pointer position.
//!
//! Scan order is fixed: every list slot in the order given, then every node
//! zone in the order given. The nearest admissible zone wins; on equal
//! distance the zone scanned first wins.

use blocktree_types::transform::{insert_into_list, parent_of, replace_by_id};
use blocktree_types::{Category, NodeId, NodeRef, TransformResult};
use serde::{Deserialize, Serialize};

use crate::config::ResolverConfig;
use crate::geometry::{Point, Rect};

// ══════════════════════════════════════════════════════════════════════════════
// Zones
// ══════════════════════════════════════════════════════════════════════════════

/// One place the dragged block could land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub kind: ZoneKind,
    /// Category this zone admits. `None` admits nothing.
    #[serde(default)]
    pub accepts: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZoneKind {
    /// Boundary before item `index` of `parent`'s ordered list, drawn as a
    /// horizontal line at `line_y`.
    ListSlot {
        parent: NodeId,
        index: usize,
        line_y: f64,
        /// The slot after the last item. Always within reach.
        #[serde(default)]
        trailing: bool,
    },
    /// An existing node that the payload would replace.
    Node { target: NodeId, rect: Rect },
}

impl Zone {
    pub fn list_slot(parent: impl Into<NodeId>, index: usize, line_y: f64, accepts: Category) -> Self {
        Self {
            kind: ZoneKind::ListSlot {
                parent: parent.into(),
                index,
                line_y,
                trailing: false,
            },
            accepts: Some(accepts),
        }
    }

    pub fn trailing_slot(
        parent: impl Into<NodeId>,
        index: usize,
        line_y: f64,
        accepts: Category,
    ) -> Self {
        Self {
            kind: ZoneKind::ListSlot {
                parent: parent.into(),
                index,
                line_y,
                trailing: true,
            },
            accepts: Some(accepts),
        }
    }

    pub fn node(target: impl Into<NodeId>, rect: Rect, accepts: Option<Category>) -> Self {
        Self {
            kind: ZoneKind::Node {
                target: target.into(),
                rect,
            },
            accepts,
        }
    }

    pub fn is_list_slot(&self) -> bool {
        matches!(self.kind, ZoneKind::ListSlot { .. })
    }

    /// List slots measure vertical offset to their line; node zones measure
    /// straight-line distance to the rectangle's centre.
    pub fn distance(&self, pointer: Point) -> f64 {
        match &self.kind {
            ZoneKind::ListSlot { line_y, .. } => (pointer.y - line_y).abs(),
            ZoneKind::Node { rect, .. } => pointer.distance_to(rect.center()),
        }
    }

    fn exempt_from_cutoff(&self) -> bool {
        matches!(self.kind, ZoneKind::ListSlot { trailing: true, .. })
    }

    /// The edit this zone stands for.
    pub fn target(&self) -> DropTarget {
        match &self.kind {
            ZoneKind::ListSlot { parent, index, .. } => DropTarget::Insert {
                parent: parent.clone(),
                index: *index,
            },
            ZoneKind::Node { target, .. } => DropTarget::Replace {
                target: target.clone(),
            },
        }
    }

    /// Whether `payload` may land here in `base`.
    ///
    /// Zones referring to nodes that are not in `base` are stale geometry
    /// and never admissible.
    fn admits(&self, payload: &NodeRef, base: &NodeRef) -> bool {
        let Some(accepts) = self.accepts else {
            return false;
        };
        if !payload.is(accepts) {
            return false;
        }
        match &self.kind {
            ZoneKind::ListSlot { parent, index, .. } => base.find(parent).is_some_and(|owner| {
                owner.list_category() == Some(accepts)
                    && owner.list().is_some_and(|list| *index <= list.len())
            }),
            ZoneKind::Node { target, .. } => {
                if &base.id == target || base.find(target).is_none() {
                    return false;
                }
                // List members move through slots, not by replacement.
                let in_list = parent_of(base, target)
                    .and_then(|p| p.list())
                    .is_some_and(|list| list.iter().any(|item| &item.id == target));
                !in_list
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Targets
// ══════════════════════════════════════════════════════════════════════════════

/// Where a candidate edit lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DropTarget {
    /// Splice into `parent`'s ordered list at `index`.
    Insert { parent: NodeId, index: usize },
    /// Replace the node `target`.
    Replace { target: NodeId },
}

impl DropTarget {
    /// Apply this edit to `base`, returning the new tree.
    pub fn apply(&self, base: &NodeRef, payload: &NodeRef) -> TransformResult<NodeRef> {
        match self {
            DropTarget::Insert { parent, index } => {
                insert_into_list(base, parent, *index, payload.clone())
            }
            DropTarget::Replace { target } => replace_by_id(base, target, payload.clone()),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Resolution
// ══════════════════════════════════════════════════════════════════════════════

/// The zone chosen for a pointer position.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Index into the zone list passed to [`resolve_nearest`].
    pub zone: usize,
    pub target: DropTarget,
    pub distance: f64,
}

/// Find the nearest zone admitting `payload` within `config.max_distance`.
pub fn resolve_nearest(
    zones: &[Zone],
    payload: &NodeRef,
    base: &NodeRef,
    pointer: Point,
    config: &ResolverConfig,
) -> Option<Resolved> {
    let slots = zones.iter().enumerate().filter(|(_, z)| z.is_list_slot());
    let nodes = zones.iter().enumerate().filter(|(_, z)| !z.is_list_slot());

    let mut best: Option<Resolved> = None;
    for (index, zone) in slots.chain(nodes) {
        if !zone.admits(payload, base) {
            continue;
        }
        let distance = zone.distance(pointer);
        if distance > config.max_distance && !zone.exempt_from_cutoff() {
            continue;
        }
        if best.as_ref().is_some_and(|b| b.distance <= distance) {
            continue;
        }
        best = Some(Resolved {
            zone: index,
            target: zone.target(),
            distance,
        });
    }
    best
}
