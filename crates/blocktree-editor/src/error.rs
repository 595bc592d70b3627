//! Error types for the editing session.

use blocktree_types::{NodeId, TransformError};
use thiserror::Error;

use crate::session::DragId;

/// Invariant violations raised by [`Editor`](crate::Editor).
///
/// None of these are program errors: a drop that would make the program
/// ill-typed is a normal [`DropOutcome::Rejected`](crate::DropOutcome), not
/// an `EditError`. When an operation returns one of these the editor's
/// committed state is untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("no active drag with id '{0}'")]
    UnknownDrag(DragId),

    #[error("drag '{0}' is already active")]
    DragAlreadyActive(DragId),

    #[error("node '{0}' is not in the tree")]
    UnknownNode(NodeId),

    #[error("node '{0}' is not a literal")]
    NotALiteral(NodeId),

    #[error("payload id '{0}' already exists in the tree")]
    PayloadIdCollision(NodeId),

    #[error("invalid resolver config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Result alias for editor operations.
pub type EditResult<T> = Result<T, EditError>;
