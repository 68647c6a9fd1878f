use std::rc::Rc;

use crate::registry::AstRegistry;
use crate::rewriter::{print_instrumented, rewrite, rewrite_program, IFunction, RewriteError};
use crate::syntax::ast::{Expr, Function, Stmt};
use crate::syntax::{parse_function, parse_program, NodeRef};

use super::helpers::{rewrite_source, NS};

const SAMPLE: &str = r#"
    function sample(list) {
        var total = 0;
        function add(v) { total += v; }
        for (var i = 0; i < list.length; i++) {
            if (list[i] > 2) { add(list[i]); } else { continue; }
        }
        for (var k in { a: 1 }) { total = total + k.length; }
        try { throw new Error("boom"); } catch (e) { total++; } finally { total *= 2; }
        switch (total) { case 1: break; default: total = -total; }
        with ({ w: 1 }) { total += w; }
        var f = function inner(n) { return n ? inner(n - 1) : total; };
        debugger;
        return f(3);
    }
"#;

#[test]
fn test_rewrite_does_not_mutate_input() {
    let func = parse_function(SAMPLE).unwrap();
    let before = func.clone();
    let registry = AstRegistry::handle();
    rewrite(&func, &registry, NS, &[]).unwrap();
    assert_eq!(func, before);
}

#[test]
fn test_rewrite_is_repeatable_with_fresh_registry() {
    let func = parse_function(SAMPLE).unwrap();
    let first = rewrite(&func, &AstRegistry::handle(), NS, &[]).unwrap();
    let second = rewrite(&func, &AstRegistry::handle(), NS, &[]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_rewrite_into_shared_registry_shifts_indices() {
    let func = parse_function(SAMPLE).unwrap();
    let registry = AstRegistry::handle();
    let first = rewrite(&func, &registry, NS, &[]).unwrap();
    let len = registry.borrow().next_index(NS);
    let second = rewrite(&func, &registry, NS, &[]).unwrap();

    assert_eq!(second.index, first.index + len);
    let shifted: Vec<usize> = first.recorded_indices().iter().map(|i| i + len).collect();
    assert_eq!(second.recorded_indices(), shifted);
}

fn all_closures(func: &Rc<IFunction>, out: &mut Vec<Rc<IFunction>>) {
    for closure in func.closures() {
        out.push(closure.clone());
        all_closures(&closure, out);
    }
}

#[test]
fn test_closures_resolve_to_their_source_functions() {
    let (registry, rewritten) = rewrite_source(SAMPLE);
    let mut closures = Vec::new();
    all_closures(&rewritten, &mut closures);
    assert_eq!(closures.len(), 2);

    for closure in closures {
        let handle = registry.borrow().resolve(NS, closure.index).unwrap();
        let func = handle.function().unwrap();
        assert_eq!(func.name, closure.name);
        assert_eq!(func.params, closure.params);
    }
}

#[test]
fn test_function_expression_binds_its_own_name() {
    let (_, rewritten) = rewrite_source(SAMPLE);
    let inner = rewritten
        .closures()
        .into_iter()
        .find(|c| c.name.as_deref() == Some("inner"))
        .unwrap();
    assert_eq!(inner.self_name.as_deref(), Some("inner"));

    let add = rewritten.hoisted.iter().find(|(name, _)| name == "add");
    assert!(add.is_some());
    assert_eq!(rewritten.declared, vec!["total", "i", "k", "f"]);
}

#[test]
fn test_labels_are_rejected_without_registering() {
    let func = parse_function("function f() { outer: while (true) { break outer; } }").unwrap();
    let registry = AstRegistry::handle();
    let err = rewrite(&func, &registry, NS, &[]).unwrap_err();
    assert_eq!(
        err,
        RewriteError::Unsupported {
            construct: "labeled statement",
            index: 1
        }
    );
    assert_eq!(registry.borrow().next_index(NS), 0);
}

#[test]
fn test_labeled_jump_inside_plain_loop_is_rejected() {
    let func = parse_function("function f() { while (true) { continue again; } }").unwrap();
    let err = rewrite(&func, &AstRegistry::handle(), NS, &[]).unwrap_err();
    assert!(matches!(
        err,
        RewriteError::Unsupported {
            construct: "labeled continue",
            ..
        }
    ));
}

#[test]
fn test_invalid_assignment_target() {
    // the parser refuses `f() = 1`, so build the tree directly
    let func = Function {
        name: Some("f".to_string()),
        params: vec![],
        body: vec![Stmt::Expr {
            expr: Expr::Assign {
                op: None,
                target: Box::new(Expr::Call {
                    callee: Box::new(Expr::Ident {
                        name: "f".to_string(),
                    }),
                    args: vec![],
                }),
                value: Box::new(Expr::LitNum { v: 1.0 }),
            },
        }],
    };
    let err = rewrite(&func, &AstRegistry::handle(), NS, &[]).unwrap_err();
    assert_eq!(err, RewriteError::InvalidTarget { index: 3 });
}

#[test]
fn test_rewrite_program_registers_program_tree() {
    let program = parse_program("var x = 1; x + 1;").unwrap();
    let registry = AstRegistry::handle();
    let rewritten = rewrite_program(&program, &registry, NS).unwrap();
    assert!(rewritten.is_program);

    let tree = registry.borrow().tree(NS, rewritten.index).unwrap();
    assert!(tree.is_program());
    assert!(matches!(tree.node(rewritten.index), Some(NodeRef::Function(_))));
}

#[test]
fn test_printed_form_shows_bookkeeping() {
    let (_, rewritten) = rewrite_source("function f(a) { var b = g(a); return b; }");
    let printed = print_instrumented(&rewritten);
    assert!(printed.contains("lastNode"));
    assert!(printed.contains("__storeFrameInfo"));
    assert!(printed.starts_with("function f(a) {"));
}
