//! blocktree static analyzer.
//!
//! ```text
//! (tree, OuterStaticEnv) → binding resolution → expression typing → Analysis
//! ```
//!
//! The analyzer is a pure function. It is re-run wholesale after every
//! committed edit and for every speculative drop check.

pub mod analysis;
pub mod checker;
pub mod env;
pub mod ty;

pub use analysis::Analysis;
pub use checker::analyze;
pub use env::OuterStaticEnv;
pub use ty::{FnInterface, FnParam, Type};
