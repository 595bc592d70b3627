//! The editing session: committed tree plus the drag state machine.
//!
//! ```text
//! begin_drag ─▶ no candidate ◀──▶ candidate (valid | invalid)
//!                    │                    │
//!                    └── drop / cancel ───┴──▶ session cleared
//! ```
//!
//! Every pointer move re-resolves the nearest zone, applies the edit to a
//! scratch tree and re-analyzes it. Only `drop` touches the committed tree,
//! and only when the candidate analyzed clean.

use std::collections::HashMap;

use blocktree_checker::{analyze, Analysis, OuterStaticEnv};
use blocktree_types::ast_diff::TreeDiff;
use blocktree_types::transform::replace_by_identity;
use blocktree_types::{Literal, Node, NodeId, NodeKind, NodeRef};
use serde::{Deserialize, Serialize};

use crate::config::ResolverConfig;
use crate::error::{EditError, EditResult};
use crate::geometry::Point;
use crate::session::{base_for, DragId, DragOrigin, DragSession, PotentialDrop};
use crate::zone::{resolve_nearest, DropTarget, Zone};

// ══════════════════════════════════════════════════════════════════════════════
// Events & outcomes
// ══════════════════════════════════════════════════════════════════════════════

/// One pointer-move event for an active drag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerMove {
    pub drag_id: DragId,
    pub position: Point,
    /// Whether the pointer is over the editable region.
    pub inside: bool,
    /// Zones currently laid out by the presentation layer, indexed against
    /// the committed tree.
    #[serde(default)]
    pub zones: Vec<Zone>,
}

/// Result of ending a drag with a drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DropOutcome {
    Committed { revision: u64, target: DropTarget },
    Rejected { reason: RejectReason },
}

impl DropOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, DropOutcome::Committed { .. })
    }
}

/// Why a drop left the tree unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// No admissible zone near the pointer.
    NoCandidate,
    /// The edit would introduce program errors.
    Invalid,
    /// The tree changed since the candidate was computed.
    Stale,
}

// ══════════════════════════════════════════════════════════════════════════════
// Editor
// ══════════════════════════════════════════════════════════════════════════════

/// An editing session over one program tree.
pub struct Editor {
    tree: NodeRef,
    env: OuterStaticEnv,
    analysis: Analysis,
    /// Number of commits so far.
    revision: u64,
    config: ResolverConfig,
    sessions: HashMap<DragId, DragSession>,
    /// Changes made by the latest commit.
    last_diff: TreeDiff,
}

impl Editor {
    pub fn new(tree: NodeRef, env: OuterStaticEnv) -> Self {
        Self::with_config(tree, env, ResolverConfig::default())
    }

    pub fn with_config(tree: NodeRef, env: OuterStaticEnv, config: ResolverConfig) -> Self {
        let analysis = analyze(&tree, &env);
        Self {
            tree,
            env,
            analysis,
            revision: 0,
            config,
            sessions: HashMap::new(),
            last_diff: TreeDiff { changes: vec![] },
        }
    }

    /// An empty program with the given root id.
    pub fn empty(root: impl Into<NodeId>, env: OuterStaticEnv) -> Self {
        Self::new(Node::program(root, vec![]), env)
    }

    pub fn tree(&self) -> &NodeRef {
        &self.tree
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn env(&self) -> &OuterStaticEnv {
        &self.env
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Nodes added, removed or modified by the latest commit.
    pub fn last_diff(&self) -> &TreeDiff {
        &self.last_diff
    }

    pub fn is_dragging(&self, drag_id: &DragId) -> bool {
        self.sessions.contains_key(drag_id)
    }

    /// The current candidate for `drag_id`, if any.
    pub fn potential_drop(&self, drag_id: &DragId) -> Option<&PotentialDrop> {
        self.sessions.get(drag_id)?.candidate.as_ref()
    }

    // ══════════════════════════════════════════════════════════════════════
    // Drag lifecycle
    // ══════════════════════════════════════════════════════════════════════

    /// Start a drag carrying `payload`.
    ///
    /// For [`DragOrigin::Tree`] only `payload.id` matters; the node is looked
    /// up in the committed tree.
    pub fn begin_drag(
        &mut self,
        drag_id: DragId,
        payload: NodeRef,
        origin: DragOrigin,
    ) -> EditResult<()> {
        if self.sessions.contains_key(&drag_id) {
            return Err(EditError::DragAlreadyActive(drag_id));
        }
        let session = DragSession::begin(&self.tree, self.revision, payload, origin)?;
        tracing::debug!(
            drag = %drag_id,
            payload = %session.payload.id,
            ?origin,
            "drag started"
        );
        self.sessions.insert(drag_id, session);
        Ok(())
    }

    /// Re-resolve the candidate for one drag.
    pub fn pointer_move(&mut self, event: &PointerMove) -> EditResult<Option<&PotentialDrop>> {
        let revision = self.revision;
        let session = self
            .sessions
            .get_mut(&event.drag_id)
            .ok_or_else(|| EditError::UnknownDrag(event.drag_id.clone()))?;

        if session.revision != revision {
            session.rebase(&self.tree, revision)?;
            if session.lost {
                tracing::debug!(drag = %event.drag_id, "dragged node left the tree");
            }
        }

        if session.lost {
            session.candidate = None;
            return Ok(None);
        }

        let resolved = if event.inside {
            resolve_nearest(
                &session.zones_in_base(&event.zones),
                &session.payload,
                &session.base,
                event.position,
                &self.config,
            )
        } else {
            None
        };

        let Some(resolved) = resolved else {
            if session.candidate.take().is_some() {
                tracing::debug!(drag = %event.drag_id, "candidate cleared");
            }
            return Ok(None);
        };

        let unchanged = session
            .candidate
            .as_ref()
            .is_some_and(|c| c.target == resolved.target && c.revision == revision);
        if !unchanged {
            let speculative = resolved.target.apply(&session.base, &session.payload)?;
            let analysis = analyze(&speculative, &self.env);
            let valid = analysis.is_clean();
            tracing::debug!(
                drag = %event.drag_id,
                target = ?resolved.target,
                distance = resolved.distance,
                valid,
                errors = analysis.error_count(),
                "candidate changed"
            );
            session.candidate = Some(PotentialDrop {
                node: session.payload.clone(),
                target: resolved.target,
                valid,
                revision,
            });
        }
        Ok(session.candidate.as_ref())
    }

    /// End a drag by dropping. The session is cleared whatever the outcome.
    pub fn drop(&mut self, drag_id: &DragId) -> EditResult<DropOutcome> {
        let session = self
            .sessions
            .remove(drag_id)
            .ok_or_else(|| EditError::UnknownDrag(drag_id.clone()))?;

        let Some(candidate) = session.candidate else {
            return Ok(self.reject(drag_id, RejectReason::NoCandidate));
        };
        if !candidate.valid {
            return Ok(self.reject(drag_id, RejectReason::Invalid));
        }
        if candidate.revision != self.revision {
            return Ok(self.reject(drag_id, RejectReason::Stale));
        }

        // Replay against the committed tree, not the scratch copy.
        let base = base_for(&self.tree, &session.payload, session.origin)?;
        let tree = candidate.target.apply(&base, &session.payload)?;
        let analysis = analyze(&tree, &self.env);
        if !analysis.is_clean() {
            return Ok(self.reject(drag_id, RejectReason::Invalid));
        }

        self.commit(tree, analysis);
        tracing::info!(
            drag = %drag_id,
            revision = self.revision,
            target = ?candidate.target,
            "drop committed"
        );
        Ok(DropOutcome::Committed {
            revision: self.revision,
            target: candidate.target,
        })
    }

    /// End a drag without dropping. Never touches the tree.
    pub fn cancel(&mut self, drag_id: &DragId) -> EditResult<()> {
        self.sessions
            .remove(drag_id)
            .ok_or_else(|| EditError::UnknownDrag(drag_id.clone()))?;
        tracing::debug!(drag = %drag_id, "drag canceled");
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // In-place edits
    // ══════════════════════════════════════════════════════════════════════

    /// Change the payload of the literal `id`.
    ///
    /// Gated like a drop: the edit commits only if the program stays clean.
    pub fn set_literal(&mut self, id: &NodeId, value: Literal) -> EditResult<DropOutcome> {
        let old = self
            .tree
            .find(id)
            .cloned()
            .ok_or_else(|| EditError::UnknownNode(id.clone()))?;
        if !matches!(old.kind, NodeKind::Literal { .. }) {
            return Err(EditError::NotALiteral(id.clone()));
        }

        let new = Node::literal(id.clone(), value);
        let tree = replace_by_identity(&self.tree, &old, new)?;
        let analysis = analyze(&tree, &self.env);
        if !analysis.is_clean() {
            tracing::info!(node = %id, errors = analysis.error_count(), "literal edit rejected");
            return Ok(DropOutcome::Rejected {
                reason: RejectReason::Invalid,
            });
        }

        self.commit(tree, analysis);
        tracing::info!(node = %id, revision = self.revision, "literal edited");
        Ok(DropOutcome::Committed {
            revision: self.revision,
            target: DropTarget::Replace { target: id.clone() },
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Helpers
    // ══════════════════════════════════════════════════════════════════════

    fn commit(&mut self, tree: NodeRef, analysis: Analysis) {
        self.last_diff = TreeDiff::diff(&self.tree, &tree);
        tracing::trace!(changed = self.last_diff.len(), "tree diff");
        self.tree = tree;
        self.analysis = analysis;
        self.revision += 1;
    }

    fn reject(&self, drag_id: &DragId, reason: RejectReason) -> DropOutcome {
        tracing::info!(drag = %drag_id, ?reason, "drop rejected");
        DropOutcome::Rejected { reason }
    }
}
