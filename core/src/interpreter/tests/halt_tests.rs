use crate::interpreter::{Breakpoints, HaltHook, Mode, StepOnce};
use crate::runtime::Value;
use crate::stack::Outcome;
use crate::syntax::ast::Stmt;

use super::helpers::{interpret_with, NS};

// Position indices: 0 program, 1 `var a`, 2 declarator, 3 literal,
// 4 `var b`, 5 declarator, 6 literal, 7 return
const SOURCE: &str = "var a = 1; var b = 2; return a + b;";

#[test]
fn test_breakpoints_set() {
    let mut points = Breakpoints::new();
    assert!(points.is_empty());
    points.add(NS, 4);
    assert!(points.contains(NS, 4));
    assert!(!points.contains("other", 4));
    assert!(points.should_halt(NS, 4, &Stmt::Empty));
    assert!(points.remove(NS, 4));
    assert!(!points.remove(NS, 4));
    assert!(points.is_empty());
}

#[test]
fn test_step_once_fires_once() {
    let mut step = StepOnce::new();
    assert!(step.is_armed());
    assert!(step.should_halt(NS, 1, &Stmt::Empty));
    assert!(!step.is_armed());
    assert!(!step.should_halt(NS, 2, &Stmt::Empty));
}

#[test]
fn test_breakpoint_pauses_before_statement() {
    let mut points = Breakpoints::new();
    points.add(NS, 4);
    let (mut rt, outcome) = interpret_with(Some(Box::new(points)), SOURCE, Mode::Recording);

    let Outcome::Paused(continuation) = outcome else {
        unreachable!()
    };
    let frame = continuation.current_frame().unwrap();
    assert_eq!(frame.pc, Some(4));
    assert_eq!(frame.lookup("a"), Some(Value::Num(1.0)));
    assert_eq!(frame.lookup("b"), Some(Value::Undefined));
    assert!(frame.describe().starts_with("<program> [VariableDeclaration@4]"));

    let resumed = continuation.resume(&mut rt).unwrap();
    assert_eq!(resumed.value(), Some(&Value::Num(3.0)));
}

#[test]
fn test_step_once_halts_at_first_statement() {
    let (mut rt, outcome) =
        interpret_with(Some(Box::new(StepOnce::new())), SOURCE, Mode::Recording);
    let Outcome::Paused(continuation) = outcome else {
        unreachable!()
    };
    assert_eq!(continuation.current_frame().unwrap().pc, Some(1));

    let resumed = continuation.resume(&mut rt).unwrap();
    assert_eq!(resumed.value(), Some(&Value::Num(3.0)));
}

#[test]
fn test_breakpoint_inside_called_function() {
    // 0 program, 1 FunctionDeclaration, 2 `var d`, 3 declarator, 4 binary,
    // 5 ident, 6 literal, 7 return
    let source = r#"
        function twice(n) { var d = n * 2; return d; }
        return twice(4) + 1;
    "#;
    let mut points = Breakpoints::new();
    points.add(NS, 7);
    let (mut rt, outcome) = interpret_with(Some(Box::new(points)), source, Mode::Recording);
    let Outcome::Paused(continuation) = outcome else {
        unreachable!()
    };
    let frames = continuation.frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].lookup("d"), Some(Value::Num(8.0)));
    assert!(frames[1].describe().starts_with("<program>"));

    let resumed = continuation.resume(&mut rt).unwrap();
    assert_eq!(resumed.value(), Some(&Value::Num(9.0)));
}

#[test]
fn test_plain_mode_ignores_halts_and_debugger() {
    let (_, outcome) = interpret_with(
        Some(Box::new(StepOnce::new())),
        "var a = 1; debugger; return a;",
        Mode::Plain,
    );
    assert_eq!(outcome.value(), Some(&Value::Num(1.0)));
}

#[test]
fn test_recording_mode_pauses_at_debugger() {
    let (mut rt, outcome) = interpret_with(None, "var a = 1; debugger; a += 1; return a;", Mode::Recording);
    let Outcome::Paused(continuation) = outcome else {
        unreachable!()
    };
    let frame = continuation.current_frame().unwrap();
    assert_eq!(frame.pc_node().map(|n| n.kind()), Some("DebuggerStatement"));

    let resumed = continuation.resume(&mut rt).unwrap();
    assert_eq!(resumed.value(), Some(&Value::Num(2.0)));
}

#[test]
fn test_hook_stays_installed_after_run() {
    let (mut rt, _) = interpret_with(Some(Box::new(StepOnce::new())), SOURCE, Mode::Plain);
    let previous = rt.set_halt_hook(None);
    assert!(previous.is_some());
}
