use crate::ast::{Category, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Type,
    Scope,
    Structure,
}

/// Numeric error code (E200–E699).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Type errors (E200–E299) ──
    pub const TYPE_MISMATCH: Self = Self(201);
    pub const UNKNOWN_FUNCTION: Self = Self(203);
    pub const NOT_A_FUNCTION: Self = Self(204);
    pub const MISSING_ARGUMENT: Self = Self(205);
    pub const UNKNOWN_ARGUMENT: Self = Self(206);

    // ── Scope errors (E500–E599) ──
    pub const UNRESOLVED_REFERENCE: Self = Self(500);
    pub const NOT_ASSIGNABLE: Self = Self(501);
    pub const NAMED_RETURN_CONFLICT: Self = Self(502);
    pub const CYCLIC_BINDING: Self = Self(503);

    // ── Structure errors (E600–E699) ──
    pub const MISPLACED_NODE: Self = Self(600);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            500..=599 => ErrorCategory::Scope,
            600..=699 => ErrorCategory::Structure,
            _ => ErrorCategory::Type,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type => write!(f, "type"),
            Self::Scope => write!(f, "scope"),
            Self::Structure => write!(f, "structure"),
        }
    }
}

/// A program error attached to one node.
///
/// Program errors are ordinary analysis output. The presentation layer
/// styles them; the editor refuses commits that would introduce them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            category: code.category(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.code, self.category, self.message)
    }
}

/// Invariant violations raised by the tree transform engine.
///
/// These mean the caller or the tree is malformed. They are never part of
/// normal editing and must not be papered over.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("no node matched {0}")]
    NoMatch(String),

    #[error("{count} nodes matched {what}, expected exactly one")]
    MultipleMatches { what: String, count: usize },

    #[error("node '{0}' does not own an ordered child list")]
    NotAList(NodeId),

    #[error("index {index} out of bounds for list of '{parent}' (length {len})")]
    IndexOutOfBounds {
        parent: NodeId,
        index: usize,
        len: usize,
    },

    #[error("cannot place {found} node '{node}' in a list of {expected}s")]
    CategoryMismatch {
        node: NodeId,
        expected: Category,
        found: &'static str,
    },
}

/// Check that exactly one site matched.
pub(crate) fn expect_one(what: impl FnOnce() -> String, count: usize) -> Result<(), TransformError> {
    match count {
        1 => Ok(()),
        0 => Err(TransformError::NoMatch(what())),
        count => Err(TransformError::MultipleMatches {
            what: what(),
            count,
        }),
    }
}
