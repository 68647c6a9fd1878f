use crate::config::Config;
use crate::registry::AstRegistry;
use crate::runtime::{Runtime, Value};
use crate::stack::Outcome;
use crate::syntax::parse_program;

use super::helpers::{run_both, run_instrumented};

#[test]
fn test_debugger_pauses_instrumented_code() {
    assert_eq!(run_instrumented("var a = 1; debugger; return a;"), "paused");
}

#[test]
fn test_debugger_is_ignored_when_debugging_disabled() {
    let config = Config {
        debugging_enabled: false,
        ..Config::default()
    };
    let program = parse_program("var a = 1; debugger; return a;").unwrap();
    let mut rt = Runtime::new(config);
    let outcome = rt.run_program(&program, &AstRegistry::handle()).unwrap();
    assert_eq!(outcome.value(), Some(&Value::Num(1.0)));
    assert!(!rt.is_debugging());
}

#[test]
fn test_escaped_function_runs_uninstrumented() {
    let source = r#"
        function _NO_REWRITE_helper(x) { debugger; return x + 1; }
        return _NO_REWRITE_helper(1);
    "#;
    assert_eq!(run_instrumented(source), "2");
}

#[test]
fn test_escaped_function_leaves_no_frame() {
    let source = r#"
        function _NO_REWRITE_boom() { throw new Error('inside'); }
        function outer() { return _NO_REWRITE_boom(); }
        outer();
    "#;
    let program = parse_program(source).unwrap();
    let mut rt = Runtime::default();
    let outcome = rt.run_program(&program, &AstRegistry::handle()).unwrap();
    let Outcome::Failed(failure) = outcome else {
        unreachable!()
    };
    let names: Vec<String> = failure
        .continuation
        .frames()
        .iter()
        .map(|f| f.describe())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names[0].starts_with("outer ["));
    assert!(names[1].starts_with("<program> ["));
}

#[test]
fn test_escaped_function_sees_only_globals() {
    let source = r#"
        var local = 'program';
        function _NO_REWRITE_peek() { return typeof local; }
        return _NO_REWRITE_peek();
    "#;
    assert_eq!(run_both(source), "\"undefined\"");
}

#[test]
fn test_run_with_bindings() {
    let func = crate::syntax::parse_function("function add(a) { return a + base; }").unwrap();
    let mut rt = Runtime::default();
    let bindings = rt.new_object();
    bindings.borrow_mut().set_own("base", Value::Num(40.0));
    let outcome = rt
        .run(&func, &AstRegistry::handle(), vec![Value::Num(2.0)], Some(&bindings))
        .unwrap();
    assert_eq!(outcome.value(), Some(&Value::Num(42.0)));
}
