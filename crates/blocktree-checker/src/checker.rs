//! blocktree static analyzer: walks a program tree and classifies every node.
//!
//! Entry point: [`analyze`].
//!
//! Two passes over the top-level declarations:
//! 1. binding resolution: named-return assignments are counted (a second
//!    assignment to the same named return is a conflict), fresh binds are
//!    registered and their types resolved on demand
//! 2. expression typing: every value expression is typed bottom-up against
//!    the type its parent expects
//!
//! Error codes emitted:
//! - E201: type mismatch
//! - E203: unknown function
//! - E204: application of a non-function
//! - E205: missing argument
//! - E206: argument for an undeclared parameter
//! - E500: unresolved reference
//! - E501: assignment/emit target is not a named return
//! - E502: named return assigned more than once
//! - E503: bind depends on itself
//! - E600: node of the wrong category in a child slot

use std::collections::{BTreeMap, HashMap, HashSet};

use blocktree_types::{Diagnostic, ErrorCode, Node, NodeId, NodeKind, NodeRef};

use crate::analysis::Analysis;
use crate::env::OuterStaticEnv;
use crate::ty::Type;

/// Analyze `tree` against `env`. Pure: the result depends on nothing else.
pub fn analyze(tree: &NodeRef, env: &OuterStaticEnv) -> Analysis {
    let mut checker = Checker::new(env);
    checker.check(tree);
    let analysis = checker.finish();
    tracing::trace!(
        root = %tree.id,
        errors = analysis.error_count(),
        inactive = analysis.inactive.len(),
        "analysis complete"
    );
    analysis
}

// ══════════════════════════════════════════════════════════════════════════════
// Checker
// ══════════════════════════════════════════════════════════════════════════════

/// Resolution state of a fresh bind.
#[derive(Debug, Clone)]
enum BindState {
    InProgress,
    Resolved(Type),
}

struct Checker<'a> {
    env: &'a OuterStaticEnv,
    analysis: Analysis,
    /// Named returns assigned at least once.
    bound: HashSet<NodeId>,
    /// Named returns assigned more than once.
    conflicted: HashSet<NodeId>,
    /// Fresh binds → their declaration's right-hand side.
    binds: HashMap<NodeId, &'a NodeRef>,
    bind_state: HashMap<NodeId, BindState>,
    /// Binds currently being resolved, innermost last.
    resolving: Vec<NodeId>,
    cyclic: HashSet<NodeId>,
}

impl<'a> Checker<'a> {
    fn new(env: &'a OuterStaticEnv) -> Self {
        Self {
            env,
            analysis: Analysis {
                node_type: env.types.clone(),
                var_name: env.names.clone(),
                ..Analysis::default()
            },
            bound: HashSet::new(),
            conflicted: HashSet::new(),
            binds: HashMap::new(),
            bind_state: HashMap::new(),
            resolving: Vec::new(),
            cyclic: HashSet::new(),
        }
    }

    fn finish(self) -> Analysis {
        self.analysis
    }

    fn check(&mut self, root: &'a NodeRef) {
        let NodeKind::Program { decls } = &root.kind else {
            self.error(
                &root.id,
                ErrorCode::MISPLACED_NODE,
                format!("tree root must be a program, found {}", root.kind_name()),
            );
            return;
        };

        let decls: Vec<&'a NodeRef> = decls
            .iter()
            .filter(|decl| {
                if decl.is_decl() {
                    return true;
                }
                self.misplaced(decl, "declaration");
                false
            })
            .collect();

        // Pass 1
        for &decl in &decls {
            if let NodeKind::Eq { lhs, rhs } = &decl.kind {
                self.register_binding(lhs, rhs);
            }
        }
        for &decl in &decls {
            if let NodeKind::Eq { lhs, .. } = &decl.kind {
                if matches!(lhs.kind, NodeKind::Bind { .. }) {
                    self.bind_type(&lhs.id);
                }
            }
        }

        // Pass 2
        for decl in decls {
            self.check_decl(decl);
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Pass 1: binding resolution
    // ══════════════════════════════════════════════════════════════════════

    fn register_binding(&mut self, lhs: &'a NodeRef, rhs: &'a NodeRef) {
        match &lhs.kind {
            NodeKind::VarRef { target } if self.env.is_named_return(target) => {
                if !self.bound.insert(target.clone()) {
                    self.conflicted.insert(target.clone());
                }
            }
            NodeKind::VarRef { target } => {
                let name = self.display_name(target);
                self.error(
                    &lhs.id,
                    ErrorCode::NOT_ASSIGNABLE,
                    format!("cannot assign to '{name}': not a named return"),
                );
            }
            NodeKind::Bind { name } => {
                self.analysis.var_name.insert(lhs.id.clone(), name.clone());
                self.binds.insert(lhs.id.clone(), rhs);
            }
            NodeKind::Hole => {}
            NodeKind::Literal { .. }
            | NodeKind::FnApp { .. }
            | NodeKind::Eq { .. }
            | NodeKind::When { .. }
            | NodeKind::EmitUnit { .. }
            | NodeKind::EmitValue { .. }
            | NodeKind::Program { .. } => self.misplaced(lhs, "bind target"),
        }
    }

    /// Type of a fresh bind, resolving its right-hand side on first use.
    fn bind_type(&mut self, id: &NodeId) -> Type {
        match self.bind_state.get(id) {
            Some(BindState::Resolved(ty)) => return ty.clone(),
            Some(BindState::InProgress) => {
                if let Some(start) = self.resolving.iter().position(|r| r == id) {
                    self.cyclic.extend(self.resolving[start..].iter().cloned());
                }
                return Type::Unknown;
            }
            None => {}
        }
        let Some(rhs) = self.binds.get(id).copied() else {
            return Type::Unknown;
        };

        self.bind_state.insert(id.clone(), BindState::InProgress);
        self.resolving.push(id.clone());
        let inferred = self.infer(rhs);
        self.resolving.pop();

        let ty = if self.cyclic.contains(id) {
            Type::Unknown
        } else {
            inferred
        };
        self.bind_state
            .insert(id.clone(), BindState::Resolved(ty.clone()));
        self.analysis.node_type.insert(id.clone(), ty.clone());
        ty
    }

    /// The type a value expression will have, without reporting anything.
    fn infer(&mut self, node: &Node) -> Type {
        match &node.kind {
            NodeKind::Literal { value } => Type::of_literal(value),
            NodeKind::VarRef { target } => self.lookup(target).unwrap_or(Type::Unknown),
            NodeKind::FnApp { func, .. } => match self.lookup(func) {
                Some(Type::Fn(iface)) => *iface.ret,
                _ => Type::Unknown,
            },
            NodeKind::Hole
            | NodeKind::Bind { .. }
            | NodeKind::Eq { .. }
            | NodeKind::When { .. }
            | NodeKind::EmitUnit { .. }
            | NodeKind::EmitValue { .. }
            | NodeKind::Program { .. } => Type::Unknown,
        }
    }

    /// Type of a symbol: a built-in or a fresh bind.
    fn lookup(&mut self, id: &NodeId) -> Option<Type> {
        if let Some(ty) = self.env.type_of(id) {
            return Some(ty.clone());
        }
        if self.binds.contains_key(id) {
            return Some(self.bind_type(id));
        }
        None
    }

    // ══════════════════════════════════════════════════════════════════════
    // Pass 2: declarations & statements
    // ══════════════════════════════════════════════════════════════════════

    fn check_decl(&mut self, decl: &'a NodeRef) {
        match &decl.kind {
            NodeKind::Eq { lhs, rhs } => {
                let expected = match &lhs.kind {
                    NodeKind::VarRef { target } if self.env.is_named_return(target) => {
                        let declared = self.env.type_of(target).cloned().unwrap_or(Type::Any);
                        self.analysis
                            .node_type
                            .insert(lhs.id.clone(), declared.clone());
                        if self.conflicted.contains(target) {
                            let name = self.display_name(target);
                            self.error(
                                &lhs.id,
                                ErrorCode::NAMED_RETURN_CONFLICT,
                                format!("named return '{name}' has conflicts: assigned more than once"),
                            );
                        }
                        Some(declared)
                    }
                    NodeKind::VarRef { .. } => None,
                    NodeKind::Bind { name } => {
                        if self.cyclic.contains(&lhs.id) {
                            self.error(
                                &lhs.id,
                                ErrorCode::CYCLIC_BINDING,
                                format!("'{name}' depends on itself"),
                            );
                        }
                        Some(Type::Any)
                    }
                    NodeKind::Hole => {
                        self.analysis
                            .node_type
                            .insert(lhs.id.clone(), Type::Unknown);
                        self.mark_inactive(decl);
                        Some(Type::Any)
                    }
                    NodeKind::Literal { .. }
                    | NodeKind::FnApp { .. }
                    | NodeKind::Eq { .. }
                    | NodeKind::When { .. }
                    | NodeKind::EmitUnit { .. }
                    | NodeKind::EmitValue { .. }
                    | NodeKind::Program { .. } => None,
                };
                self.check_value(rhs, expected);
            }
            NodeKind::When { event, body } => {
                self.check_value(event, Some(Type::UnitEvent));
                for stmt in body {
                    if stmt.is_stmt() {
                        self.check_stmt(stmt);
                    } else {
                        self.misplaced(stmt, "statement");
                    }
                }
                if matches!(event.kind, NodeKind::Hole) {
                    for stmt in body {
                        self.mark_inactive(stmt);
                    }
                }
            }
            NodeKind::Hole
            | NodeKind::Literal { .. }
            | NodeKind::VarRef { .. }
            | NodeKind::Bind { .. }
            | NodeKind::FnApp { .. }
            | NodeKind::EmitUnit { .. }
            | NodeKind::EmitValue { .. }
            | NodeKind::Program { .. } => self.misplaced(decl, "declaration"),
        }
    }

    fn check_stmt(&mut self, stmt: &'a NodeRef) {
        match &stmt.kind {
            NodeKind::EmitUnit { target } => {
                if let Some(ty) = self.check_emit_target(target) {
                    if !ty.is_subtype_of(&Type::UnitEvent) {
                        self.error(
                            &target.id,
                            ErrorCode::TYPE_MISMATCH,
                            format!("emit requires an event output, found {ty}"),
                        );
                    }
                }
            }
            NodeKind::EmitValue { target, value } => {
                let expected = self.check_emit_target(target);
                self.check_value(value, expected);
            }
            NodeKind::Hole
            | NodeKind::Literal { .. }
            | NodeKind::VarRef { .. }
            | NodeKind::Bind { .. }
            | NodeKind::FnApp { .. }
            | NodeKind::Eq { .. }
            | NodeKind::When { .. }
            | NodeKind::Program { .. } => self.misplaced(stmt, "statement"),
        }
    }

    /// Returns the declared type of the output being emitted into.
    fn check_emit_target(&mut self, target: &NodeRef) -> Option<Type> {
        match &target.kind {
            NodeKind::Hole => None,
            NodeKind::VarRef { target: id } if self.env.is_named_return(id) => {
                let declared = self.env.type_of(id).cloned().unwrap_or(Type::Any);
                self.analysis
                    .node_type
                    .insert(target.id.clone(), declared.clone());
                Some(declared)
            }
            NodeKind::VarRef { target: id } => {
                let name = self.display_name(id);
                self.error(
                    &target.id,
                    ErrorCode::NOT_ASSIGNABLE,
                    format!("cannot emit into '{name}': not a named return"),
                );
                None
            }
            NodeKind::Bind { name } => {
                self.error(
                    &target.id,
                    ErrorCode::NOT_ASSIGNABLE,
                    format!("cannot emit into fresh variable '{name}'"),
                );
                None
            }
            NodeKind::Literal { .. }
            | NodeKind::FnApp { .. }
            | NodeKind::Eq { .. }
            | NodeKind::When { .. }
            | NodeKind::EmitUnit { .. }
            | NodeKind::EmitValue { .. }
            | NodeKind::Program { .. } => {
                self.misplaced(target, "bind target");
                None
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Value expressions
    // ══════════════════════════════════════════════════════════════════════

    fn check_value(&mut self, node: &NodeRef, expected: Option<Type>) -> Type {
        if let Some(exp) = &expected {
            self.analysis
                .expected_type
                .insert(node.id.clone(), exp.clone());
        }

        let ty = match &node.kind {
            NodeKind::Hole => Type::Unknown,
            NodeKind::Literal { value } => Type::of_literal(value),
            NodeKind::VarRef { target } => match self.lookup(target) {
                Some(ty) => ty,
                None => {
                    self.error(
                        &node.id,
                        ErrorCode::UNRESOLVED_REFERENCE,
                        format!("unresolved reference '{target}'"),
                    );
                    Type::Unknown
                }
            },
            NodeKind::FnApp { func, args } => self.check_fn_app(node, func, args),
            NodeKind::Bind { .. }
            | NodeKind::Eq { .. }
            | NodeKind::When { .. }
            | NodeKind::EmitUnit { .. }
            | NodeKind::EmitValue { .. }
            | NodeKind::Program { .. } => {
                self.misplaced(node, "value expression");
                Type::Unknown
            }
        };

        self.analysis.node_type.insert(node.id.clone(), ty.clone());

        // Unknown comes from a hole or from an error reported elsewhere.
        if let Some(exp) = &expected {
            let has_errors = !self.analysis.errors_for(&node.id).is_empty();
            if !has_errors && !ty.is_unknown() && !ty.is_subtype_of(exp) {
                self.error(
                    &node.id,
                    ErrorCode::TYPE_MISMATCH,
                    format!("type mismatch: expected {exp}, found {ty}"),
                );
            }
        }
        ty
    }

    fn check_fn_app(
        &mut self,
        node: &NodeRef,
        func: &NodeId,
        args: &BTreeMap<String, NodeRef>,
    ) -> Type {
        let iface = match self.lookup(func) {
            Some(Type::Fn(iface)) => iface,
            Some(other) => {
                let name = self.display_name(func);
                self.error(
                    &node.id,
                    ErrorCode::NOT_A_FUNCTION,
                    format!("'{name}' has type {other}, which cannot be applied"),
                );
                self.check_loose_args(args);
                return Type::Unknown;
            }
            None => {
                self.error(
                    &node.id,
                    ErrorCode::UNKNOWN_FUNCTION,
                    format!("unknown function '{func}'"),
                );
                self.check_loose_args(args);
                return Type::Unknown;
            }
        };

        for param in &iface.params {
            match args.get(&param.id) {
                Some(arg) => {
                    self.check_value(arg, Some(param.ty.clone()));
                }
                None => self.error(
                    &node.id,
                    ErrorCode::MISSING_ARGUMENT,
                    format!("missing argument '{}'", param.id),
                ),
            }
        }
        for (param, arg) in args {
            if iface.param(param).is_none() {
                self.error(
                    &arg.id,
                    ErrorCode::UNKNOWN_ARGUMENT,
                    format!("'{}' has no parameter '{param}'", self.display_name(func)),
                );
                self.check_value(arg, None);
            }
        }
        *iface.ret
    }

    /// Arguments of an application whose interface is unavailable.
    fn check_loose_args(&mut self, args: &BTreeMap<String, NodeRef>) {
        for arg in args.values() {
            self.check_value(arg, None);
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Helpers
    // ══════════════════════════════════════════════════════════════════════

    fn mark_inactive(&mut self, node: &NodeRef) {
        let inactive = &mut self.analysis.inactive;
        node.walk(&mut |n| {
            inactive.insert(n.id.clone());
        });
    }

    fn misplaced(&mut self, node: &NodeRef, expected: &str) {
        self.error(
            &node.id,
            ErrorCode::MISPLACED_NODE,
            format!("expected a {expected}, found {}", node.kind_name()),
        );
    }

    fn display_name(&self, id: &NodeId) -> String {
        self.analysis
            .name_of(id)
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string())
    }

    fn error(&mut self, id: &NodeId, code: ErrorCode, message: String) {
        self.analysis.push_error(id, Diagnostic::new(code, message));
    }
}
