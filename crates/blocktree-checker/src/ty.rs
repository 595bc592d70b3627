//! Semantic types for the blocktree analyzer.
//!
//! [`Type`] is a small closed lattice. Subtyping is one-directional per
//! variant; there is no inference of type variables.

use std::fmt;

use blocktree_types::Literal;
use serde::{Deserialize, Serialize};

// ══════════════════════════════════════════════════════════════════════════════
// Type
// ══════════════════════════════════════════════════════════════════════════════

/// A semantic type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Type {
    /// Type could not be determined: a hole, or a node with an error.
    Unknown,
    /// Accepts every value type.
    Any,

    // ── Primitives ──
    Num,
    Text,
    Bool,
    Vec2,
    /// An event without payload.
    UnitEvent,

    /// An opaque host value keyed by `tag`.
    External { tag: String },

    /// A function symbol.
    Fn(FnInterface),
}

/// The interface of a function symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnInterface {
    /// Display template, e.g. `"{a} + {b}"`. Opaque to the analyzer.
    pub template: String,
    pub params: Vec<FnParam>,
    pub ret: Box<Type>,
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnParam {
    pub id: String,
    pub ty: Type,
}

impl FnInterface {
    pub fn new(template: impl Into<String>, params: Vec<(&str, Type)>, ret: Type) -> Self {
        Self {
            template: template.into(),
            params: params
                .into_iter()
                .map(|(id, ty)| FnParam {
                    id: id.to_string(),
                    ty,
                })
                .collect(),
            ret: Box::new(ret),
        }
    }

    pub fn param(&self, id: &str) -> Option<&FnParam> {
        self.params.iter().find(|p| p.id == id)
    }
}

impl Type {
    pub fn external(tag: impl Into<String>) -> Self {
        Type::External { tag: tag.into() }
    }

    /// The type of a literal payload.
    pub fn of_literal(lit: &Literal) -> Self {
        match lit {
            Literal::Num(_) => Type::Num,
            Literal::Text(_) => Type::Text,
            Literal::Bool(_) => Type::Bool,
            Literal::External { tag, .. } => Type::external(tag.clone()),
        }
    }

    /// Check if this type is a subtype of `sup`.
    ///
    /// Rules:
    /// - `Unknown` and `Fn` are subtypes of nothing, themselves included
    /// - every other type is a subtype of `Any` and of itself
    /// - `External(a) <: External(b)` iff the tags match
    pub fn is_subtype_of(&self, sup: &Type) -> bool {
        match (self, sup) {
            (Type::Unknown, _) | (Type::Fn(_), _) => false,
            (_, Type::Unknown) | (_, Type::Fn(_)) => false,
            (_, Type::Any) => true,
            (Type::External { tag: a }, Type::External { tag: b }) => a == b,
            (Type::Num, Type::Num)
            | (Type::Text, Type::Text)
            | (Type::Bool, Type::Bool)
            | (Type::Vec2, Type::Vec2)
            | (Type::UnitEvent, Type::UnitEvent) => true,
            _ => false,
        }
    }

    /// The function interface, if this is a function type.
    pub fn as_fn(&self) -> Option<&FnInterface> {
        match self {
            Type::Fn(iface) => Some(iface),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Display
// ══════════════════════════════════════════════════════════════════════════════

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Unknown => write!(f, "unknown"),
            Type::Any => write!(f, "any"),
            Type::Num => write!(f, "num"),
            Type::Text => write!(f, "text"),
            Type::Bool => write!(f, "bool"),
            Type::Vec2 => write!(f, "vec2"),
            Type::UnitEvent => write!(f, "event"),
            Type::External { tag } => write!(f, "EV<{}>", tag),
            Type::Fn(iface) => {
                write!(f, "fn(")?;
                for (i, p) in iface.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", p.id, p.ty)?;
                }
                write!(f, ") -> {}", iface.ret)
            }
        }
    }
}
