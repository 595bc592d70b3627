//! Shared types for blocktree.
//!
//! This crate defines the program node model, the pure tree transform
//! engine, tree diffs, and the diagnostic types used across the editor.

mod error;
pub mod ast;
pub mod ast_diff;
pub mod transform;

pub use ast::{Category, Literal, Node, NodeId, NodeKind, NodeRef};
pub use error::{Diagnostic, ErrorCategory, ErrorCode, TransformError};
pub use transform::TransformResult;
