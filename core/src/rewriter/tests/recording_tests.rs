use crate::rewriter::{IExpr, IStmt};
use crate::syntax::NodeRef;

use super::helpers::{expected_records, rewrite_source, NS};

#[test]
fn test_recorded_indices_match_policy() {
    let sources = [
        "function f(a) { var b = g(a), c; b = h(b)(c); b++; return new K(b); }",
        "function f(o) { for (var k in o) { switch (k) { case 'a': x(); } } }",
        "function f() { try { a(); } catch (e) { debugger; } var g = function () { return q(); }; }",
        "function f(n) { while (n--) { if (n > 2) { m(n); } } do { n = n + 1; } while (n < 3); }",
    ];
    for source in sources {
        let (registry, rewritten) = rewrite_source(source);
        let tree = registry.borrow().tree(NS, rewritten.index).unwrap();
        let mut recorded = rewritten.recorded_indices();
        recorded.sort_unstable();
        assert_eq!(recorded, expected_records(&tree, rewritten.index), "{}", source);
    }
}

#[test]
fn test_argument_records_increase_left_to_right() {
    // 0 Function, 1 ExprStmt, 2 Call f, 3 f, 4 Call a, 5 a, 6 Call b, 7 b
    let (_, rewritten) = rewrite_source("function t() { f(a(), b()); }");
    assert_eq!(rewritten.recorded_indices(), vec![4, 6, 2]);
}

#[test]
fn test_sequential_statements_record_in_increasing_order() {
    // each statement: ExprStmt, Call, callee
    let (_, rewritten) = rewrite_source("function t() { a(); b(); c(); }");
    assert_eq!(rewritten.recorded_indices(), vec![2, 5, 8]);
}

#[test]
fn test_member_chain_reads_are_not_recorded() {
    // 0 Function, 1 Var, 2 Declarator, 3 Member .c, 4 Member .b, 5 a
    let (_, rewritten) = rewrite_source("function t() { var v = a.b.c; }");
    assert_eq!(rewritten.recorded_indices(), vec![2]);

    // 0 Function, 1 ExprStmt, 2 Call, 3 Member .c, 4 Member .b, 5 a
    let (_, rewritten) = rewrite_source("function t() { a.b.c(); }");
    assert_eq!(rewritten.recorded_indices(), vec![2]);

    // computed keys in a chain do not record either
    let (_, rewritten) = rewrite_source("function t() { a[b].c[d]; }");
    assert!(rewritten.recorded_indices().is_empty());
}

#[test]
fn test_call_node_carries_its_own_index() {
    let (registry, rewritten) = rewrite_source("function t() { return g(1); }");
    let IStmt::Return(Some(IExpr::Call { index, .. })) = &rewritten.body[0] else {
        unreachable!()
    };
    let node = registry.borrow().resolve(NS, *index).unwrap();
    assert_eq!(node.node().map(NodeRef::kind), Some("CallExpression"));
}

#[test]
fn test_function_declarations_lower_to_empty_statements() {
    let (_, rewritten) = rewrite_source("function t() { function g() {} return g; }");
    assert!(matches!(rewritten.body[0], IStmt::Empty));
    assert_eq!(rewritten.hoisted.len(), 1);
    assert_eq!(rewritten.recorded_indices(), vec![1]);
}

#[test]
fn test_do_while_records_body_then_test() {
    // 0 Function, 1 DoWhile, 2 Block, 3 ExprStmt, 4 Call a, 5 a, 6 Call b, 7 b
    let (_, rewritten) = rewrite_source("function t() { do { a(); } while (b()); }");
    assert_eq!(rewritten.recorded_indices(), vec![4, 6]);
}
