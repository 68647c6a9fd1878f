use crate::registry::{AstRegistry, Declarations};
use crate::syntax::parse_function;

fn declarations_of(source: &str) -> Declarations {
    let registry = AstRegistry::handle();
    let func = parse_function(source).unwrap();
    let tree = registry.borrow_mut().assign(&func, "ns", false);
    tree.declarations(tree.base()).unwrap()
}

#[test]
fn test_vars_are_collected_from_nested_blocks() {
    let decls = declarations_of(
        r#"function f() {
            var a = 1;
            if (a) { var b; } else { for (var i = 0; i < 1; i++) { var c; } }
            for (var k in {}) {}
            try { var d; } catch (e) { var e2; } finally { var f2; }
            switch (a) { case 1: var s; }
            var a;
        }"#,
    );
    assert_eq!(decls.vars, vec!["a", "b", "i", "c", "k", "d", "e2", "f2", "s"]);
}

#[test]
fn test_nested_function_bodies_are_not_scanned() {
    let decls = declarations_of(
        "function f() { function g() { var hidden; } var h = function () { var hidden2; }; }",
    );
    assert_eq!(decls.vars, vec!["h"]);
    assert_eq!(decls.functions.len(), 1);
    assert_eq!(decls.functions[0].0, "g");
}

#[test]
fn test_later_function_declaration_wins() {
    let decls = declarations_of(
        "function f() { function g() { return 1; } function g() { return 2; } }",
    );
    assert_eq!(decls.functions.len(), 1);
    let registry = AstRegistry::handle();
    let func = parse_function(
        "function f() { function g() { return 1; } function g() { return 2; } }",
    )
    .unwrap();
    let tree = registry.borrow_mut().assign(&func, "ns", false);
    // second declaration starts after the first one's subtree
    assert_eq!(decls.functions[0].1, tree.end(1));
}

#[test]
fn test_names_dedupe_params() {
    let decls = declarations_of("function f(a, b) { var a, c; function b() {} }");
    let params = vec!["a".to_string(), "b".to_string()];
    assert_eq!(decls.names(&params), vec!["a", "b", "c"]);
}

#[test]
fn test_arguments_var_is_not_rebound() {
    let decls = declarations_of("function f() { var arguments; var x; }");
    assert_eq!(decls.vars, vec!["x"]);
}
