//! Node types for blocktree programs.
//!
//! Nodes are immutable and shared through [`NodeRef`]. A tree edit never
//! mutates a node; it rebuilds the path from the edited node up to the root
//! and shares every untouched subtree with the previous version.
//! Argument maps use [`BTreeMap`] so that argument order is the parameter-id
//! order and stays deterministic.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Shared handle to an immutable node.
pub type NodeRef = Rc<Node>;

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ══════════════════════════════════════════════════════════════════════════════

/// Opaque identifier, unique per node within one tree.
///
/// The same id space names built-in symbols of the outer environment, so a
/// [`NodeKind::VarRef`] can point either at a built-in or at a [`NodeKind::Bind`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A new globally unique id.
    pub fn fresh() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Categories
// ══════════════════════════════════════════════════════════════════════════════

/// Structural category a node may belong to.
///
/// Categories are derived from the variant, never stored. A node can belong
/// to several (a `Hole` is both a value and a bind target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Decl,
    Stmt,
    Value,
    Bind,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decl => write!(f, "declaration"),
            Self::Stmt => write!(f, "statement"),
            Self::Value => write!(f, "value expression"),
            Self::Bind => write!(f, "bind target"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Nodes
// ══════════════════════════════════════════════════════════════════════════════

/// One element of the program tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

/// Literal payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Num(f64),
    Text(String),
    Bool(bool),
    /// A value owned by the host, typed by `tag`. `handle` is opaque here and
    /// only used by the presentation layer to render a preview.
    External { tag: String, handle: String },
}

/// The variant of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// A deliberate gap.
    Hole,
    Literal { value: Literal },
    /// Reference to a built-in symbol or a `Bind` node.
    VarRef { target: NodeId },
    /// A fresh variable; the node's own id is the variable's id.
    Bind { name: String },
    /// `func(param: arg, ...)`
    FnApp {
        func: NodeId,
        args: BTreeMap<String, NodeRef>,
    },
    /// `lhs = rhs`
    Eq { lhs: NodeRef, rhs: NodeRef },
    /// `when event { body... }`
    When { event: NodeRef, body: Vec<NodeRef> },
    /// `emit target`
    EmitUnit { target: NodeRef },
    /// `emit target(value)`
    EmitValue { target: NodeRef, value: NodeRef },
    /// The root: a list of declarations.
    Program { decls: Vec<NodeRef> },
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> NodeRef {
        Rc::new(Self {
            id: id.into(),
            kind,
        })
    }

    // ── Constructors ──

    pub fn hole(id: impl Into<NodeId>) -> NodeRef {
        Self::new(id, NodeKind::Hole)
    }

    pub fn num(id: impl Into<NodeId>, value: f64) -> NodeRef {
        Self::literal(id, Literal::Num(value))
    }

    pub fn text(id: impl Into<NodeId>, value: impl Into<String>) -> NodeRef {
        Self::literal(id, Literal::Text(value.into()))
    }

    pub fn boolean(id: impl Into<NodeId>, value: bool) -> NodeRef {
        Self::literal(id, Literal::Bool(value))
    }

    pub fn external(
        id: impl Into<NodeId>,
        tag: impl Into<String>,
        handle: impl Into<String>,
    ) -> NodeRef {
        Self::literal(
            id,
            Literal::External {
                tag: tag.into(),
                handle: handle.into(),
            },
        )
    }

    pub fn literal(id: impl Into<NodeId>, value: Literal) -> NodeRef {
        Self::new(id, NodeKind::Literal { value })
    }

    pub fn var_ref(id: impl Into<NodeId>, target: impl Into<NodeId>) -> NodeRef {
        Self::new(
            id,
            NodeKind::VarRef {
                target: target.into(),
            },
        )
    }

    pub fn bind(id: impl Into<NodeId>, name: impl Into<String>) -> NodeRef {
        Self::new(id, NodeKind::Bind { name: name.into() })
    }

    pub fn fn_app<K: Into<String>>(
        id: impl Into<NodeId>,
        func: impl Into<NodeId>,
        args: impl IntoIterator<Item = (K, NodeRef)>,
    ) -> NodeRef {
        Self::new(
            id,
            NodeKind::FnApp {
                func: func.into(),
                args: args.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            },
        )
    }

    pub fn eq(id: impl Into<NodeId>, lhs: NodeRef, rhs: NodeRef) -> NodeRef {
        Self::new(id, NodeKind::Eq { lhs, rhs })
    }

    pub fn when(id: impl Into<NodeId>, event: NodeRef, body: Vec<NodeRef>) -> NodeRef {
        Self::new(id, NodeKind::When { event, body })
    }

    pub fn emit_unit(id: impl Into<NodeId>, target: NodeRef) -> NodeRef {
        Self::new(id, NodeKind::EmitUnit { target })
    }

    pub fn emit_value(id: impl Into<NodeId>, target: NodeRef, value: NodeRef) -> NodeRef {
        Self::new(id, NodeKind::EmitValue { target, value })
    }

    pub fn program(id: impl Into<NodeId>, decls: Vec<NodeRef>) -> NodeRef {
        Self::new(id, NodeKind::Program { decls })
    }

    // ── Accessors ──

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Short variant name for messages.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Hole => "hole",
            NodeKind::Literal { .. } => "literal",
            NodeKind::VarRef { .. } => "var_ref",
            NodeKind::Bind { .. } => "bind",
            NodeKind::FnApp { .. } => "fn_app",
            NodeKind::Eq { .. } => "eq",
            NodeKind::When { .. } => "when",
            NodeKind::EmitUnit { .. } => "emit_unit",
            NodeKind::EmitValue { .. } => "emit_value",
            NodeKind::Program { .. } => "program",
        }
    }

    // ── Category predicates ──

    pub fn is_decl(&self) -> bool {
        match &self.kind {
            NodeKind::Eq { .. } | NodeKind::When { .. } => true,
            NodeKind::Hole
            | NodeKind::Literal { .. }
            | NodeKind::VarRef { .. }
            | NodeKind::Bind { .. }
            | NodeKind::FnApp { .. }
            | NodeKind::EmitUnit { .. }
            | NodeKind::EmitValue { .. }
            | NodeKind::Program { .. } => false,
        }
    }

    pub fn is_stmt(&self) -> bool {
        match &self.kind {
            NodeKind::EmitUnit { .. } | NodeKind::EmitValue { .. } => true,
            NodeKind::Hole
            | NodeKind::Literal { .. }
            | NodeKind::VarRef { .. }
            | NodeKind::Bind { .. }
            | NodeKind::FnApp { .. }
            | NodeKind::Eq { .. }
            | NodeKind::When { .. }
            | NodeKind::Program { .. } => false,
        }
    }

    pub fn is_value_expr(&self) -> bool {
        match &self.kind {
            NodeKind::Hole
            | NodeKind::Literal { .. }
            | NodeKind::VarRef { .. }
            | NodeKind::FnApp { .. } => true,
            NodeKind::Bind { .. }
            | NodeKind::Eq { .. }
            | NodeKind::When { .. }
            | NodeKind::EmitUnit { .. }
            | NodeKind::EmitValue { .. }
            | NodeKind::Program { .. } => false,
        }
    }

    pub fn is_bind_expr(&self) -> bool {
        match &self.kind {
            NodeKind::Hole | NodeKind::VarRef { .. } | NodeKind::Bind { .. } => true,
            NodeKind::Literal { .. }
            | NodeKind::FnApp { .. }
            | NodeKind::Eq { .. }
            | NodeKind::When { .. }
            | NodeKind::EmitUnit { .. }
            | NodeKind::EmitValue { .. }
            | NodeKind::Program { .. } => false,
        }
    }

    /// True if the node belongs to `category`.
    pub fn is(&self, category: Category) -> bool {
        match category {
            Category::Decl => self.is_decl(),
            Category::Stmt => self.is_stmt(),
            Category::Value => self.is_value_expr(),
            Category::Bind => self.is_bind_expr(),
        }
    }

    /// Every category the node belongs to.
    pub fn categories(&self) -> Vec<Category> {
        [
            Category::Decl,
            Category::Stmt,
            Category::Value,
            Category::Bind,
        ]
        .into_iter()
        .filter(|c| self.is(*c))
        .collect()
    }

    // ── Traversal ──

    /// Direct children in display order.
    pub fn children(&self) -> Vec<&NodeRef> {
        match &self.kind {
            NodeKind::Hole
            | NodeKind::Literal { .. }
            | NodeKind::VarRef { .. }
            | NodeKind::Bind { .. } => vec![],
            NodeKind::FnApp { args, .. } => args.values().collect(),
            NodeKind::Eq { lhs, rhs } => vec![lhs, rhs],
            NodeKind::When { event, body } => std::iter::once(event).chain(body).collect(),
            NodeKind::EmitUnit { target } => vec![target],
            NodeKind::EmitValue { target, value } => vec![target, value],
            NodeKind::Program { decls } => decls.iter().collect(),
        }
    }

    /// The ordered child list this node owns, if any.
    pub fn list(&self) -> Option<&[NodeRef]> {
        match &self.kind {
            NodeKind::Program { decls } => Some(decls),
            NodeKind::When { body, .. } => Some(body),
            NodeKind::Hole
            | NodeKind::Literal { .. }
            | NodeKind::VarRef { .. }
            | NodeKind::Bind { .. }
            | NodeKind::FnApp { .. }
            | NodeKind::Eq { .. }
            | NodeKind::EmitUnit { .. }
            | NodeKind::EmitValue { .. } => None,
        }
    }

    /// Category required of members of this node's list.
    pub fn list_category(&self) -> Option<Category> {
        match &self.kind {
            NodeKind::Program { .. } => Some(Category::Decl),
            NodeKind::When { .. } => Some(Category::Stmt),
            NodeKind::Hole
            | NodeKind::Literal { .. }
            | NodeKind::VarRef { .. }
            | NodeKind::Bind { .. }
            | NodeKind::FnApp { .. }
            | NodeKind::Eq { .. }
            | NodeKind::EmitUnit { .. }
            | NodeKind::EmitValue { .. } => None,
        }
    }

    /// Pre-order visit of this node and all descendants.
    pub fn walk<'a>(self: &'a NodeRef, visit: &mut impl FnMut(&'a NodeRef)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// First node with the given id, in pre-order.
    pub fn find<'a>(self: &'a NodeRef, id: &NodeId) -> Option<&'a NodeRef> {
        if &self.id == id {
            return Some(self);
        }
        self.children().into_iter().find_map(|c| c.find(id))
    }

    /// Number of nodes in this subtree.
    pub fn size(self: &NodeRef) -> usize {
        let mut n = 0;
        self.walk(&mut |_| n += 1);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NodeRef {
        Node::program(
            "p",
            vec![
                Node::eq("d1", Node::var_ref("l1", "speed"), Node::num("r1", 5.0)),
                Node::when(
                    "w",
                    Node::var_ref("ev", "tick"),
                    vec![Node::emit_unit("s1", Node::var_ref("t1", "jump"))],
                ),
            ],
        )
    }

    #[test]
    fn categories_follow_variant() {
        assert!(Node::hole("h").is_value_expr());
        assert!(Node::hole("h").is_bind_expr());
        assert!(!Node::hole("h").is_decl());
        assert!(Node::bind("b", "x").is_bind_expr());
        assert!(!Node::bind("b", "x").is_value_expr());
        assert!(!Node::num("n", 1.0).is_bind_expr());
        assert!(Node::emit_unit("e", Node::hole("h")).is_stmt());
        assert!(Node::when("w", Node::hole("h"), vec![]).is_decl());
        assert!(Node::program("p", vec![]).categories().is_empty());
    }

    #[test]
    fn is_matches_predicates() {
        let n = Node::var_ref("v", "x");
        assert_eq!(n.categories(), vec![Category::Value, Category::Bind]);
        assert!(n.is(Category::Value));
        assert!(!n.is(Category::Stmt));
    }

    #[test]
    fn walk_is_pre_order() {
        let tree = sample();
        let mut ids = Vec::new();
        tree.walk(&mut |n| ids.push(n.id.as_str().to_string()));
        assert_eq!(ids, vec!["p", "d1", "l1", "r1", "w", "ev", "s1", "t1"]);
        assert_eq!(tree.size(), 8);
    }

    #[test]
    fn find_locates_nested_node() {
        let tree = sample();
        let found = tree.find(&NodeId::from("t1")).expect("t1 present");
        assert_eq!(found.kind_name(), "var_ref");
        assert!(tree.find(&NodeId::from("missing")).is_none());
    }

    #[test]
    fn lists_and_list_categories() {
        let tree = sample();
        assert_eq!(tree.list().map(<[_]>::len), Some(2));
        assert_eq!(tree.list_category(), Some(Category::Decl));
        let when = tree.find(&NodeId::from("w")).unwrap();
        assert_eq!(when.list_category(), Some(Category::Stmt));
        assert!(Node::hole("h").list().is_none());
    }

    #[test]
    fn fn_app_args_ordered_by_param_id() {
        let app = Node::fn_app(
            "f",
            "add",
            [("b", Node::num("nb", 2.0)), ("a", Node::num("na", 1.0))],
        );
        let ids: Vec<_> = app.children().iter().map(|c| c.id.to_string()).collect();
        assert_eq!(ids, vec!["na", "nb"]);
    }

    #[test]
    fn fresh_ids_are_distinct() {
        assert_ne!(NodeId::fresh(), NodeId::fresh());
    }

    #[test]
    fn json_round_trip() {
        let tree = sample();
        let json = serde_json::to_string(&tree).unwrap();
        assert!(json.contains("\"type\":\"eq\""));
        let back: NodeRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}
