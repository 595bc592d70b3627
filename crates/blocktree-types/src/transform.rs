//! Tree transform engine.
//!
//! Every operation is pure: it takes a tree and returns a new one, sharing
//! every subtree it did not touch. All of them are built on
//! [`map_children`], which returns the *same* [`NodeRef`] when no child
//! changed, so callers can skip unchanged subtrees with [`Rc::ptr_eq`].
//!
//! Operations that locate a node require exactly one match. Anything else
//! is a [`TransformError`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::convert::Infallible;
use std::rc::Rc;

use crate::ast::{Node, NodeId, NodeKind, NodeRef};
use crate::error::{expect_one, TransformError};

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

// ══════════════════════════════════════════════════════════════════════════════
// Combinators
// ══════════════════════════════════════════════════════════════════════════════

/// Rebuild `node` with every direct child replaced by `f(child)`.
///
/// Returns `node` itself when every child came back pointer-equal.
pub fn map_children<E>(
    node: &NodeRef,
    mut f: impl FnMut(&NodeRef) -> Result<NodeRef, E>,
) -> Result<NodeRef, E> {
    let mut changed = false;
    let mut visit = |child: &NodeRef| -> Result<NodeRef, E> {
        let mapped = f(child)?;
        if !Rc::ptr_eq(&mapped, child) {
            changed = true;
        }
        Ok(mapped)
    };

    let kind = match &node.kind {
        NodeKind::Hole
        | NodeKind::Literal { .. }
        | NodeKind::VarRef { .. }
        | NodeKind::Bind { .. } => return Ok(node.clone()),
        NodeKind::FnApp { func, args } => NodeKind::FnApp {
            func: func.clone(),
            args: args
                .iter()
                .map(|(param, arg)| Ok((param.clone(), visit(arg)?)))
                .collect::<Result<BTreeMap<_, _>, E>>()?,
        },
        NodeKind::Eq { lhs, rhs } => NodeKind::Eq {
            lhs: visit(lhs)?,
            rhs: visit(rhs)?,
        },
        NodeKind::When { event, body } => NodeKind::When {
            event: visit(event)?,
            body: body.iter().map(&mut visit).collect::<Result<_, E>>()?,
        },
        NodeKind::EmitUnit { target } => NodeKind::EmitUnit {
            target: visit(target)?,
        },
        NodeKind::EmitValue { target, value } => NodeKind::EmitValue {
            target: visit(target)?,
            value: visit(value)?,
        },
        NodeKind::Program { decls } => NodeKind::Program {
            decls: decls.iter().map(&mut visit).collect::<Result<_, E>>()?,
        },
    };

    if changed {
        Ok(Rc::new(Node {
            id: node.id.clone(),
            kind,
        }))
    } else {
        Ok(node.clone())
    }
}

/// Top-down rewrite. Where `f` returns `Some`, that node replaces the
/// visited one and its subtree is not descended into.
pub fn rewrite(
    node: &NodeRef,
    f: &mut impl FnMut(&NodeRef) -> TransformResult<Option<NodeRef>>,
) -> TransformResult<NodeRef> {
    if let Some(replacement) = f(node)? {
        return Ok(replacement);
    }
    map_children(node, |child| rewrite(child, &mut *f))
}

/// Replace the ordered child list of a list-owning node.
fn with_list(node: &NodeRef, list: Vec<NodeRef>) -> TransformResult<NodeRef> {
    let kind = match &node.kind {
        NodeKind::Program { .. } => NodeKind::Program { decls: list },
        NodeKind::When { event, .. } => NodeKind::When {
            event: event.clone(),
            body: list,
        },
        NodeKind::Hole
        | NodeKind::Literal { .. }
        | NodeKind::VarRef { .. }
        | NodeKind::Bind { .. }
        | NodeKind::FnApp { .. }
        | NodeKind::Eq { .. }
        | NodeKind::EmitUnit { .. }
        | NodeKind::EmitValue { .. } => return Err(TransformError::NotAList(node.id.clone())),
    };
    Ok(Rc::new(Node {
        id: node.id.clone(),
        kind,
    }))
}

fn count_where(tree: &NodeRef, mut pred: impl FnMut(&NodeRef) -> bool) -> usize {
    let mut count = 0;
    tree.walk(&mut |n| {
        if pred(n) {
            count += 1;
        }
    });
    count
}

// ══════════════════════════════════════════════════════════════════════════════
// Operations
// ══════════════════════════════════════════════════════════════════════════════

/// Substitute `new` for the node that is pointer-identical to `old`.
pub fn replace_by_identity(
    tree: &NodeRef,
    old: &NodeRef,
    new: NodeRef,
) -> TransformResult<NodeRef> {
    let count = count_where(tree, |n| Rc::ptr_eq(n, old));
    expect_one(|| format!("identity of node '{}'", old.id), count)?;
    rewrite(tree, &mut |n| {
        Ok(Rc::ptr_eq(n, old).then(|| new.clone()))
    })
}

/// Substitute `new` for the node whose id is `target`.
pub fn replace_by_id(tree: &NodeRef, target: &NodeId, new: NodeRef) -> TransformResult<NodeRef> {
    let count = count_where(tree, |n| &n.id == target);
    expect_one(|| format!("id '{target}'"), count)?;
    rewrite(tree, &mut |n| Ok((&n.id == target).then(|| new.clone())))
}

/// Splice `new` into the ordered list owned by `parent` at `index`.
///
/// `index == len` appends. The node must belong to the list's category:
/// declarations for `Program`, statements for `When`.
pub fn insert_into_list(
    tree: &NodeRef,
    parent: &NodeId,
    index: usize,
    new: NodeRef,
) -> TransformResult<NodeRef> {
    let count = count_where(tree, |n| &n.id == parent);
    expect_one(|| format!("list owner '{parent}'"), count)?;
    rewrite(tree, &mut |n| {
        if &n.id != parent {
            return Ok(None);
        }
        let (Some(list), Some(category)) = (n.list(), n.list_category()) else {
            return Err(TransformError::NotAList(n.id.clone()));
        };
        if !new.is(category) {
            return Err(TransformError::CategoryMismatch {
                node: new.id.clone(),
                expected: category,
                found: new.kind_name(),
            });
        }
        if index > list.len() {
            return Err(TransformError::IndexOutOfBounds {
                parent: n.id.clone(),
                index,
                len: list.len(),
            });
        }
        let mut items = list.to_vec();
        items.insert(index, new.clone());
        with_list(n, items).map(Some)
    })
}

/// Remove the direct list member whose id is `node`.
pub fn remove_from_list(tree: &NodeRef, node: &NodeId) -> TransformResult<NodeRef> {
    let mut removed = 0;
    let out = rewrite(tree, &mut |n| {
        let Some(list) = n.list() else {
            return Ok(None);
        };
        if !list.iter().any(|item| &item.id == node) {
            return Ok(None);
        }
        let kept: Vec<NodeRef> = list.iter().filter(|item| &item.id != node).cloned().collect();
        removed += list.len() - kept.len();
        with_list(n, kept).map(Some)
    })?;
    expect_one(|| format!("list member '{node}'"), removed)?;
    Ok(out)
}

/// Give every node matching `should_randomize` a fresh id.
///
/// References to a renamed `Bind` inside the same tree follow the rename, so
/// an instantiated template keeps its internal wiring.
pub fn randomize_ids(tree: &NodeRef, should_randomize: impl Fn(&Node) -> bool) -> NodeRef {
    let mut renames = HashMap::new();
    tree.walk(&mut |n| {
        if should_randomize(&**n) {
            renames.insert(n.id.clone(), NodeId::fresh());
        }
    });
    match rename(tree, &renames) {
        Ok(node) => node,
        Err(never) => match never {},
    }
}

fn rename(node: &NodeRef, renames: &HashMap<NodeId, NodeId>) -> Result<NodeRef, Infallible> {
    let mapped = map_children(node, |child| rename(child, renames))?;
    let new_id = renames.get(&mapped.id);
    let new_target = match &mapped.kind {
        NodeKind::VarRef { target } => renames.get(target),
        _ => None,
    };
    if new_id.is_none() && new_target.is_none() {
        return Ok(mapped);
    }
    let kind = match new_target {
        Some(target) => NodeKind::VarRef {
            target: target.clone(),
        },
        None => mapped.kind.clone(),
    };
    Ok(Rc::new(Node {
        id: new_id.cloned().unwrap_or_else(|| mapped.id.clone()),
        kind,
    }))
}

/// Take the node `id` out of the tree.
///
/// A list member is removed from its list; any other node is replaced by a
/// fresh `Hole` so that its parent stays well-formed.
pub fn detach(tree: &NodeRef, id: &NodeId) -> TransformResult<NodeRef> {
    if &tree.id == id {
        return Err(TransformError::NoMatch(format!("detachable node '{id}'")));
    }
    let in_list = parent_of(tree, id)
        .and_then(|p| p.list())
        .is_some_and(|list| list.iter().any(|item| &item.id == id));
    if in_list {
        remove_from_list(tree, id)
    } else {
        replace_by_id(tree, id, Node::hole(NodeId::fresh()))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Queries
// ══════════════════════════════════════════════════════════════════════════════

/// The direct parent of `id`, if any.
pub fn parent_of<'a>(tree: &'a NodeRef, id: &NodeId) -> Option<&'a NodeRef> {
    if tree.children().iter().any(|c| &c.id == id) {
        return Some(tree);
    }
    tree.children().into_iter().find_map(|c| parent_of(c, id))
}

/// All ids in pre-order.
pub fn collect_ids(tree: &NodeRef) -> Vec<NodeId> {
    let mut ids = Vec::new();
    tree.walk(&mut |n| ids.push(n.id.clone()));
    ids
}

/// Ids that occur more than once. Empty for a well-formed tree.
pub fn duplicate_ids(tree: &NodeRef) -> BTreeSet<NodeId> {
    let mut seen = BTreeSet::new();
    let mut dups = BTreeSet::new();
    tree.walk(&mut |n| {
        if !seen.insert(n.id.clone()) {
            dups.insert(n.id.clone());
        }
    });
    dups
}
