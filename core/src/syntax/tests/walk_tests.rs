use crate::syntax::ast::{Expr, Stmt};
use crate::syntax::parse_program;
use crate::syntax::walk::{subtree_size, subtree_sizes, NodeRef};

#[test]
fn test_children_follow_evaluation_order() {
    let program = parse_program("for (var i = 0; i < n; i++) f(i);").unwrap();
    let children = NodeRef::Stmt(&program.body[0]).children();
    let kinds: Vec<&str> = children.iter().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "Declarator",
            "BinaryExpression",
            "UpdateExpression",
            "ExpressionStatement"
        ]
    );
}

#[test]
fn test_function_children_are_body_statements() {
    let func = crate::syntax::parse_function("function f(a) { var b; return a; }").unwrap();
    let children = NodeRef::Function(&func).children();
    assert_eq!(children.len(), 2);
    assert!(matches!(children[0], NodeRef::Stmt(Stmt::Var { .. })));
    assert!(matches!(children[1], NodeRef::Stmt(Stmt::Return { .. })));
}

#[test]
fn test_subtree_sizes_are_preorder() {
    // function -> ExpressionStatement -> Binary(a, b)
    let func = crate::syntax::parse_function("function f() { a + b; }").unwrap();
    let root = NodeRef::Function(&func);
    assert_eq!(subtree_size(root), 5);
    assert_eq!(subtree_sizes(root), vec![5, 4, 3, 1, 1]);
}

#[test]
fn test_try_children_flatten_blocks() {
    let program = parse_program("try { a; b; } catch (e) { c; } finally { d; }").unwrap();
    let children = NodeRef::Stmt(&program.body[0]).children();
    let kinds: Vec<&str> = children.iter().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "ExpressionStatement",
            "ExpressionStatement",
            "CatchClause",
            "ExpressionStatement"
        ]
    );
}

#[test]
fn test_member_children_include_computed_key() {
    let program = parse_program("a[b];").unwrap();
    let Stmt::Expr { expr } = &program.body[0] else {
        unreachable!()
    };
    let children = NodeRef::Expr(expr).children();
    assert_eq!(children.len(), 2);
    assert!(matches!(children[1], NodeRef::Expr(Expr::Ident { .. })));
}
