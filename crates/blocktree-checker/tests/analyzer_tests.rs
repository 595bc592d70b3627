//! Analyzer integration tests.
//!
//! Each test builds a program tree by hand, analyzes it against a small
//! environment, and asserts on types, expected types, and error codes.

use blocktree_checker::{analyze, Analysis, FnInterface, OuterStaticEnv, Type};
use blocktree_types::{ErrorCode, Node, NodeId, NodeRef};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

fn env() -> OuterStaticEnv {
    OuterStaticEnv::new()
        .with_named_return("moveSpeed", "move speed", Type::Num)
        .with_named_return("greeting", "greeting", Type::Text)
        .with_named_return("jump", "jump", Type::UnitEvent)
        .with_named_return("costume", "costume", Type::external("sprite"))
        .with_symbol("tick", "every frame", Type::UnitEvent)
        .with_symbol("mouseX", "mouse x", Type::Num)
        .with_function(
            "add",
            "add",
            FnInterface::new(
                "{a} + {b}",
                vec![("a", Type::Num), ("b", Type::Num)],
                Type::Num,
            ),
        )
        .with_function(
            "keyPressed",
            "key pressed",
            FnInterface::new("when {key} pressed", vec![("key", Type::Text)], Type::UnitEvent),
        )
}

fn program(decls: Vec<NodeRef>) -> NodeRef {
    Node::program("root", decls)
}

fn check(tree: &NodeRef) -> Analysis {
    analyze(tree, &env())
}

fn describe(analysis: &Analysis) -> String {
    analysis
        .all_errors()
        .map(|(id, d)| format!("  {id}: {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn assert_ok(tree: &NodeRef) -> Analysis {
    let analysis = check(tree);
    assert!(
        analysis.is_clean(),
        "expected no errors, got {}:\n{}",
        analysis.error_count(),
        describe(&analysis)
    );
    analysis
}

fn assert_error(tree: &NodeRef, node: &str, code: ErrorCode) -> Analysis {
    let analysis = check(tree);
    assert!(
        analysis.has_error(&id(node), code),
        "expected {code} on '{node}', got:\n{}",
        describe(&analysis)
    );
    analysis
}

// ══════════════════════════════════════════════════════════════════════════════
// Declarations
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn empty_program_is_clean() {
    assert_ok(&program(vec![]));
}

#[test]
fn named_return_assignment_checks() {
    let tree = program(vec![Node::eq(
        "d1",
        Node::var_ref("lhs", "moveSpeed"),
        Node::num("rhs", 5.0),
    )]);
    let analysis = assert_ok(&tree);
    assert_eq!(analysis.type_of(&id("rhs")), Some(&Type::Num));
    assert_eq!(analysis.expected_type_of(&id("rhs")), Some(&Type::Num));
    assert_eq!(analysis.type_of(&id("lhs")), Some(&Type::Num));
}

#[test]
fn named_return_mismatch_reported_on_rhs() {
    let tree = program(vec![Node::eq(
        "d1",
        Node::var_ref("lhs", "moveSpeed"),
        Node::text("rhs", "x"),
    )]);
    let analysis = assert_error(&tree, "rhs", ErrorCode::TYPE_MISMATCH);
    assert_eq!(analysis.error_count(), 1);
    assert_eq!(analysis.type_of(&id("rhs")), Some(&Type::Text));
    assert_eq!(analysis.expected_type_of(&id("rhs")), Some(&Type::Num));
}

#[test]
fn conflicting_named_returns_flag_every_lhs() {
    let tree = program(vec![
        Node::eq("d1", Node::var_ref("l1", "moveSpeed"), Node::num("r1", 1.0)),
        Node::eq("d2", Node::var_ref("l2", "moveSpeed"), Node::num("r2", 2.0)),
    ]);
    let analysis = check(&tree);
    assert_eq!(
        analysis.codes_for(&id("l1")),
        vec![ErrorCode::NAMED_RETURN_CONFLICT]
    );
    assert_eq!(
        analysis.codes_for(&id("l2")),
        vec![ErrorCode::NAMED_RETURN_CONFLICT]
    );
    assert!(analysis.errors_for(&id("r1")).is_empty());
    assert!(analysis.errors_for(&id("r2")).is_empty());
}

#[test]
fn distinct_named_returns_do_not_conflict() {
    assert_ok(&program(vec![
        Node::eq("d1", Node::var_ref("l1", "moveSpeed"), Node::num("r1", 1.0)),
        Node::eq("d2", Node::var_ref("l2", "greeting"), Node::text("r2", "hi")),
    ]));
}

#[test]
fn assigning_to_builtin_is_not_assignable() {
    let tree = program(vec![Node::eq(
        "d1",
        Node::var_ref("lhs", "mouseX"),
        Node::num("rhs", 1.0),
    )]);
    let analysis = assert_error(&tree, "lhs", ErrorCode::NOT_ASSIGNABLE);
    assert!(analysis.errors_for(&id("rhs")).is_empty());
    assert!(analysis.expected_type_of(&id("rhs")).is_none());
}

#[test]
fn hole_lhs_expects_any_and_is_inactive() {
    let tree = program(vec![Node::eq("d1", Node::hole("lhs"), Node::text("rhs", "x"))]);
    let analysis = assert_ok(&tree);
    assert_eq!(analysis.expected_type_of(&id("rhs")), Some(&Type::Any));
    for n in ["d1", "lhs", "rhs"] {
        assert!(analysis.is_inactive(&id(n)), "{n} should be inactive");
    }
}

#[test]
fn holes_are_never_errors() {
    let tree = program(vec![
        Node::eq("d1", Node::var_ref("l1", "moveSpeed"), Node::hole("h1")),
        Node::eq(
            "d2",
            Node::var_ref("l2", "greeting"),
            Node::fn_app("app", "keyPressed", [("key", Node::hole("h2"))]),
        ),
    ]);
    let analysis = check(&tree);
    assert!(analysis.errors_for(&id("h1")).is_empty());
    assert!(analysis.errors_for(&id("h2")).is_empty());
    assert_eq!(analysis.type_of(&id("h1")), Some(&Type::Unknown));
    // keyPressed returns an event, greeting is text.
    assert!(analysis.has_error(&id("app"), ErrorCode::TYPE_MISMATCH));
}

// ══════════════════════════════════════════════════════════════════════════════
// Binds
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn bind_type_flows_to_references() {
    let tree = program(vec![
        Node::eq("d1", Node::var_ref("l1", "moveSpeed"), Node::var_ref("r1", "b")),
        Node::eq("d2", Node::bind("b", "speed"), Node::num("n", 3.0)),
    ]);
    let analysis = assert_ok(&tree);
    assert_eq!(analysis.type_of(&id("b")), Some(&Type::Num));
    assert_eq!(analysis.type_of(&id("r1")), Some(&Type::Num));
    assert_eq!(analysis.name_of(&id("b")), Some("speed"));
}

#[test]
fn bind_of_wrong_type_mismatches_at_use() {
    let tree = program(vec![
        Node::eq("d1", Node::bind("b", "label"), Node::text("t", "hi")),
        Node::eq("d2", Node::var_ref("l2", "moveSpeed"), Node::var_ref("r2", "b")),
    ]);
    let analysis = assert_error(&tree, "r2", ErrorCode::TYPE_MISMATCH);
    assert_eq!(analysis.error_count(), 1);
}

#[test]
fn cyclic_binds_are_reported() {
    let tree = program(vec![
        Node::eq("d1", Node::bind("a", "a"), Node::var_ref("ra", "b")),
        Node::eq("d2", Node::bind("b", "b"), Node::var_ref("rb", "a")),
    ]);
    let analysis = check(&tree);
    assert!(analysis.has_error(&id("a"), ErrorCode::CYCLIC_BINDING));
    assert!(analysis.has_error(&id("b"), ErrorCode::CYCLIC_BINDING));
    assert_eq!(analysis.type_of(&id("a")), Some(&Type::Unknown));
}

#[test]
fn unresolved_reference() {
    let tree = program(vec![Node::eq(
        "d1",
        Node::var_ref("l1", "moveSpeed"),
        Node::var_ref("r1", "nowhere"),
    )]);
    let analysis = assert_error(&tree, "r1", ErrorCode::UNRESOLVED_REFERENCE);
    assert_eq!(analysis.codes_for(&id("r1")).len(), 1);
    assert_eq!(analysis.type_of(&id("r1")), Some(&Type::Unknown));
}

// ══════════════════════════════════════════════════════════════════════════════
// Function applications
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn fn_app_propagates_expected_types_to_args() {
    let tree = program(vec![Node::eq(
        "d1",
        Node::var_ref("l1", "moveSpeed"),
        Node::fn_app(
            "app",
            "add",
            [("a", Node::var_ref("x", "mouseX")), ("b", Node::text("y", "2"))],
        ),
    )]);
    let analysis = assert_error(&tree, "y", ErrorCode::TYPE_MISMATCH);
    assert_eq!(analysis.expected_type_of(&id("x")), Some(&Type::Num));
    assert_eq!(analysis.expected_type_of(&id("y")), Some(&Type::Num));
    assert_eq!(analysis.type_of(&id("app")), Some(&Type::Num));
    assert!(analysis.errors_for(&id("app")).is_empty());
}

#[test]
fn unknown_function_leaves_args_unconstrained() {
    let tree = program(vec![Node::eq(
        "d1",
        Node::var_ref("l1", "moveSpeed"),
        Node::fn_app("app", "frobnicate", [("a", Node::text("arg", "x"))]),
    )]);
    let analysis = check(&tree);
    assert_eq!(analysis.codes_for(&id("app")), vec![ErrorCode::UNKNOWN_FUNCTION]);
    assert_eq!(analysis.type_of(&id("app")), Some(&Type::Unknown));
    assert!(analysis.expected_type_of(&id("arg")).is_none());
    assert!(analysis.errors_for(&id("arg")).is_empty());
    assert_eq!(analysis.error_count(), 1);
}

#[test]
fn applying_a_value_is_not_a_function() {
    let tree = program(vec![Node::eq(
        "d1",
        Node::hole("l1"),
        Node::fn_app("app", "mouseX", Vec::<(&str, NodeRef)>::new()),
    )]);
    assert_error(&tree, "app", ErrorCode::NOT_A_FUNCTION);
}

#[test]
fn missing_and_unknown_arguments() {
    let tree = program(vec![Node::eq(
        "d1",
        Node::var_ref("l1", "moveSpeed"),
        Node::fn_app(
            "app",
            "add",
            [("a", Node::num("x", 1.0)), ("c", Node::num("z", 3.0))],
        ),
    )]);
    let analysis = assert_error(&tree, "app", ErrorCode::MISSING_ARGUMENT);
    assert!(analysis.has_error(&id("z"), ErrorCode::UNKNOWN_ARGUMENT));
}

#[test]
fn function_reference_is_not_a_value() {
    let tree = program(vec![Node::eq("d1", Node::bind("f", "f"), Node::var_ref("r", "add"))]);
    assert_error(&tree, "r", ErrorCode::TYPE_MISMATCH);
}

// ══════════════════════════════════════════════════════════════════════════════
// When blocks & statements
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn when_block_with_emits() {
    let tree = program(vec![Node::when(
        "w",
        Node::fn_app("ev", "keyPressed", [("key", Node::text("k", "space"))]),
        vec![
            Node::emit_unit("s1", Node::var_ref("t1", "jump")),
            Node::emit_value("s2", Node::var_ref("t2", "greeting"), Node::text("v2", "hi")),
        ],
    )]);
    let analysis = assert_ok(&tree);
    assert_eq!(analysis.expected_type_of(&id("ev")), Some(&Type::UnitEvent));
    assert_eq!(analysis.expected_type_of(&id("v2")), Some(&Type::Text));
    assert!(analysis.inactive.is_empty());
}

#[test]
fn when_event_must_be_an_event() {
    let tree = program(vec![Node::when("w", Node::var_ref("ev", "mouseX"), vec![])]);
    assert_error(&tree, "ev", ErrorCode::TYPE_MISMATCH);
}

#[test]
fn emit_unit_into_non_event_output() {
    let tree = program(vec![Node::when(
        "w",
        Node::var_ref("ev", "tick"),
        vec![Node::emit_unit("s1", Node::var_ref("t1", "moveSpeed"))],
    )]);
    assert_error(&tree, "t1", ErrorCode::TYPE_MISMATCH);
}

#[test]
fn emit_into_builtin_is_not_assignable() {
    let tree = program(vec![Node::when(
        "w",
        Node::var_ref("ev", "tick"),
        vec![Node::emit_value("s1", Node::var_ref("t1", "mouseX"), Node::num("v", 1.0))],
    )]);
    let analysis = assert_error(&tree, "t1", ErrorCode::NOT_ASSIGNABLE);
    assert!(analysis.expected_type_of(&id("v")).is_none());
}

#[test]
fn external_values_match_by_tag() {
    let ok = program(vec![Node::eq(
        "d1",
        Node::var_ref("l1", "costume"),
        Node::external("v", "sprite", "asset://cat"),
    )]);
    assert_ok(&ok);
    let bad = program(vec![Node::eq(
        "d1",
        Node::var_ref("l1", "costume"),
        Node::external("v", "sound", "asset://meow"),
    )]);
    assert_error(&bad, "v", ErrorCode::TYPE_MISMATCH);
}

#[test]
fn hole_event_makes_body_inactive() {
    let tree = program(vec![Node::when(
        "w",
        Node::hole("ev"),
        vec![Node::emit_unit("s1", Node::var_ref("t1", "jump"))],
    )]);
    let analysis = assert_ok(&tree);
    assert!(analysis.is_inactive(&id("s1")));
    assert!(analysis.is_inactive(&id("t1")));
    assert!(!analysis.is_inactive(&id("w")));
}

// ══════════════════════════════════════════════════════════════════════════════
// Structure
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn misplaced_nodes_are_reported() {
    let tree = program(vec![
        Node::num("stray", 1.0),
        Node::when("w", Node::var_ref("ev", "tick"), vec![Node::num("bad", 2.0)]),
        Node::eq("d1", Node::num("lhs", 1.0), Node::hole("h")),
    ]);
    let analysis = check(&tree);
    assert!(analysis.has_error(&id("stray"), ErrorCode::MISPLACED_NODE));
    assert!(analysis.has_error(&id("bad"), ErrorCode::MISPLACED_NODE));
    assert!(analysis.has_error(&id("lhs"), ErrorCode::MISPLACED_NODE));
}

#[test]
fn root_must_be_a_program() {
    let analysis = analyze(&Node::num("n", 1.0), &env());
    assert!(analysis.has_error(&id("n"), ErrorCode::MISPLACED_NODE));
}

#[test]
fn environment_is_cumulative() {
    let analysis = assert_ok(&program(vec![]));
    assert_eq!(analysis.type_of(&id("mouseX")), Some(&Type::Num));
    assert_eq!(analysis.name_of(&id("moveSpeed")), Some("move speed"));
}
