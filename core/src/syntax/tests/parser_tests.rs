use crate::syntax::ast::*;
use crate::syntax::{parse_expression, parse_function, parse_program, ParseError};

#[test]
fn test_parse_var_and_function_decl() {
    let program = parse_program("var x = 1, y; function f(a, b) { return a + b; }").unwrap();
    assert_eq!(program.body.len(), 2);

    let Stmt::Var { decls } = &program.body[0] else {
        unreachable!()
    };
    assert_eq!(decls.len(), 2);
    assert_eq!(decls[0].name, "x");
    assert_eq!(decls[0].init, Some(Expr::LitNum { v: 1.0 }));
    assert_eq!(decls[1].init, None);

    let Stmt::FunctionDecl { func } = &program.body[1] else {
        unreachable!()
    };
    assert_eq!(func.name.as_deref(), Some("f"));
    assert_eq!(func.params, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_parse_operator_precedence() {
    let expr = parse_expression("1 + 2 * 3").unwrap();
    let Expr::Binary { op, right, .. } = expr else {
        unreachable!()
    };
    assert_eq!(op, BinaryOp::Add);
    assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn test_parse_logical_and_conditional() {
    let expr = parse_expression("a || b && c ? 1 : 2").unwrap();
    let Expr::Conditional { test, .. } = expr else {
        unreachable!()
    };
    let Expr::Logical { op, right, .. } = *test else {
        unreachable!()
    };
    assert_eq!(op, LogicalOp::Or);
    assert!(matches!(*right, Expr::Logical { op: LogicalOp::And, .. }));
}

#[test]
fn test_parse_member_call_chain() {
    let expr = parse_expression("a.b[c](1).d").unwrap();
    let Expr::Member { object, property } = expr else {
        unreachable!()
    };
    assert_eq!(property, "d");
    let Expr::Call { callee, args } = *object else {
        unreachable!()
    };
    assert_eq!(args.len(), 1);
    assert!(matches!(*callee, Expr::Index { .. }));
}

#[test]
fn test_parse_compound_assignment_and_update() {
    let expr = parse_expression("x += i++").unwrap();
    let Expr::Assign { op, value, .. } = expr else {
        unreachable!()
    };
    assert_eq!(op, Some(BinaryOp::Add));
    assert!(matches!(
        *value,
        Expr::Update {
            op: UpdateOp::Inc,
            prefix: false,
            ..
        }
    ));
}

#[test]
fn test_parse_control_flow_statements() {
    let source = r#"
        for (var i = 0; i < 3; i++) { continue; }
        for (var k in obj) {}
        while (false) break;
        do { x--; } while (x > 0);
        switch (v) { case 1: a(); break; default: b(); }
        try { f(); } catch (e) { g(e); } finally { h(); }
        with (o) { p; }
        debugger;
    "#;
    let program = parse_program(source).unwrap();
    let kinds: Vec<&str> = program
        .body
        .iter()
        .map(|s| crate::syntax::NodeRef::Stmt(s).kind())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "ForStatement",
            "ForInStatement",
            "WhileStatement",
            "DoWhileStatement",
            "SwitchStatement",
            "TryStatement",
            "WithStatement",
            "DebuggerStatement",
        ]
    );
}

#[test]
fn test_parse_object_literal_with_accessors() {
    let expr = parse_expression("({ a: 1, 'b': 2, get c() { return 3; }, set c(v) {} })").unwrap();
    let Expr::Object { props } = expr else {
        unreachable!()
    };
    let kinds: Vec<(String, PropKind)> = props.iter().map(|p| (p.key.clone(), p.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ("a".to_string(), PropKind::Init),
            ("b".to_string(), PropKind::Init),
            ("c".to_string(), PropKind::Get),
            ("c".to_string(), PropKind::Set),
        ]
    );
}

#[test]
fn test_parse_labeled_statement() {
    let program = parse_program("outer: for (;;) { break outer; }").unwrap();
    let Stmt::Labeled { label, .. } = &program.body[0] else {
        unreachable!()
    };
    assert_eq!(label, "outer");
}

#[test]
fn test_parse_function_expects_single_definition() {
    let func = parse_function("(function named(x) { return x; })").unwrap();
    assert_eq!(func.name.as_deref(), Some("named"));

    let err = parse_function("var a = 1;").unwrap_err();
    assert!(matches!(err, ParseError::BuildError(_)));
}

#[test]
fn test_parse_error_is_reported() {
    let err = parse_program("var = ;").unwrap_err();
    assert!(matches!(err, ParseError::PestError(_)));
}

#[test]
fn test_reserved_words_are_not_identifiers() {
    assert!(parse_program("var return = 1;").is_err());
    assert!(parse_program("var returned = 1;").is_ok());
}
