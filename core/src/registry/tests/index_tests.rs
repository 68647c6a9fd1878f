use crate::error::ReifyError;
use crate::registry::{resolve, AstRegistry};
use crate::syntax::ast::{Expr, Stmt};
use crate::syntax::{parse_function, NodeRef};

#[test]
fn test_indices_are_preorder_from_base() {
    let registry = AstRegistry::handle();
    // 0 Function, 1 Return, 2 Binary, 3 a, 4 b
    let func = parse_function("function f(a, b) { return a + b; }").unwrap();
    let tree = registry.borrow_mut().assign(&func, "ns", false);

    assert_eq!(tree.base(), 0);
    assert_eq!(tree.len(), 5);
    assert!(matches!(tree.node(1), Some(NodeRef::Stmt(Stmt::Return { .. }))));
    assert!(matches!(tree.node(2), Some(NodeRef::Expr(Expr::Binary { .. }))));
    let Some(NodeRef::Expr(Expr::Ident { name })) = tree.node(4) else {
        unreachable!()
    };
    assert_eq!(name, "b");
    assert!(tree.node(5).is_none());
}

#[test]
fn test_namespaces_count_independently() {
    let registry = AstRegistry::handle();
    let func = parse_function("function f() { g(); }").unwrap();

    let first = registry.borrow_mut().assign(&func, "a", false);
    let second = registry.borrow_mut().assign(&func, "a", false);
    let other = registry.borrow_mut().assign(&func, "b", false);

    assert_eq!(first.base(), 0);
    assert_eq!(second.base(), first.len());
    assert_eq!(other.base(), 0);
    assert_eq!(registry.borrow().next_index("a"), first.len() * 2);
    assert_eq!(registry.borrow().next_index("missing"), 0);
}

#[test]
fn test_lookup_finds_owning_tree() {
    let registry = AstRegistry::handle();
    let f = parse_function("function f() { return 1; }").unwrap();
    let g = parse_function("function g() { return 2; }").unwrap();
    registry.borrow_mut().assign(&f, "ns", false);
    let second = registry.borrow_mut().assign(&g, "ns", false);

    let handle = resolve(&registry, "ns", second.base()).unwrap();
    assert_eq!(handle.function().and_then(|f| f.name.clone()).as_deref(), Some("g"));

    let literal = resolve(&registry, "ns", second.base() + 2).unwrap();
    assert!(matches!(literal.node(), Some(NodeRef::Expr(Expr::LitNum { .. }))));
}

#[test]
fn test_unknown_index_is_lookup_error() {
    let registry = AstRegistry::handle();
    let f = parse_function("function f() {}").unwrap();
    registry.borrow_mut().assign(&f, "ns", false);

    let err = registry.borrow().tree("ns", 7).unwrap_err();
    assert!(matches!(err, ReifyError::Lookup { index: 7, .. }));
    let err = registry.borrow().tree("other", 0).unwrap_err();
    assert!(matches!(err, ReifyError::Lookup { .. }));
}

#[test]
fn test_assign_leaves_input_untouched() {
    let registry = AstRegistry::handle();
    let func = parse_function("function f(x) { if (x) { return 1; } return 2; }").unwrap();
    let before = func.clone();
    let tree = registry.borrow_mut().assign(&func, "ns", false);
    assert_eq!(func, before);
    assert_eq!(tree.root(), &before);
}

#[test]
fn test_end_and_contains() {
    let registry = AstRegistry::handle();
    // 0 Function, 1 If, 2 x, 3 Block, 4 Return, 5 1, 6 Return, 7 2
    let func = parse_function("function f(x) { if (x) { return 1; } return 2; }").unwrap();
    let tree = registry.borrow_mut().assign(&func, "ns", false);

    assert_eq!(tree.end(1), 6);
    assert!(tree.contains(1, 5));
    assert!(!tree.contains(1, 6));
    assert_eq!(tree.end(0), 8);
    assert!(!tree.is_program());
}

#[test]
fn test_child_indices_run_past_parent_when_exhausted() {
    let registry = AstRegistry::handle();
    let func = parse_function("function f(x) { if (x) { return 1; } return 2; }").unwrap();
    let tree = registry.borrow_mut().assign(&func, "ns", false);
    let Some(node) = tree.node(1) else {
        unreachable!()
    };

    let mut ix = tree.child_indices(node, 1);
    assert_eq!(ix.take(), 2);
    assert_eq!(ix.take(), 3);
    // no `else` branch
    assert_eq!(ix.take(), tree.end(1));
}

#[test]
fn test_nested_function_nodes_resolve_as_functions() {
    let registry = AstRegistry::handle();
    // 0 Function, 1 FunctionDecl inner, 2 Return, 3 1, 4 Var, 5 Declarator, 6 FunctionExpr
    let func = parse_function(
        "function outer() { function inner() { return 1; } var g = function () {}; }",
    )
    .unwrap();
    let tree = registry.borrow_mut().assign(&func, "ns", false);

    assert_eq!(tree.function(1).and_then(|f| f.name.clone()).as_deref(), Some("inner"));
    assert!(tree.function(6).is_some());
    assert!(tree.function(5).is_none());
}
