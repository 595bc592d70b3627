//! blocktree drop resolver and edit state machine.
//!
//! An [`Editor`] owns one committed program tree. Drags are independent
//! sessions keyed by [`DragId`]; each pointer move picks the nearest
//! admissible [`Zone`], speculatively applies the edit and re-analyzes the
//! result. A drop commits only a candidate that analyzed clean.

pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod session;
pub mod zone;

pub use config::{ResolverConfig, DEFAULT_MAX_DISTANCE};
pub use editor::{DropOutcome, Editor, PointerMove, RejectReason};
pub use error::{EditError, EditResult};
pub use geometry::{Point, Rect};
pub use session::{DragId, DragOrigin, PotentialDrop};
pub use zone::{resolve_nearest, DropTarget, Resolved, Zone, ZoneKind};
