use std::collections::HashMap;

use maplit::hashmap;

use crate::error::ReifyError;
use crate::registry::AstRegistry;
use crate::runtime::{ops, Runtime, Value};
use crate::stack::{Continuation, Outcome, Unwind};
use crate::syntax::parse_program;

use super::helpers::run_until_pause;

const LOOP: &str = r#"
    var x = 0;
    for (var i = 0; i < 5; i++) {
        if (i == 3) debugger;
        x += i;
    }
    return x;
"#;

#[test]
fn test_pause_inside_loop_and_resume() {
    let (mut rt, continuation) = run_until_pause(LOOP);
    assert!(!continuation.is_error());
    let frame = continuation.current_frame().unwrap();
    assert_eq!(frame.lookup("x"), Some(Value::Num(3.0)));
    assert_eq!(frame.lookup("i"), Some(Value::Num(3.0)));
    assert_eq!(frame.pc_node().map(|n| n.kind()), Some("DebuggerStatement"));
    assert_eq!(continuation.frames().len(), 1);

    let outcome = continuation.resume(&mut rt).unwrap();
    assert_eq!(outcome.value(), Some(&Value::Num(10.0)));
}

#[test]
fn test_pause_in_callee_resumes_caller() {
    let source = r#"
        function inner(n) {
            var doubled = n * 2;
            debugger;
            return doubled + 1;
        }
        var r = inner(4);
        return r * 10;
    "#;
    let (mut rt, continuation) = run_until_pause(source);
    let frames = continuation.frames();
    assert_eq!(frames.len(), 2);
    assert!(frames[0].describe().starts_with("inner [DebuggerStatement@"));
    assert_eq!(frames[0].arguments, vec![Value::Num(4.0)]);
    let vars: HashMap<String, Value> = frames[0].variables().into_iter().collect();
    assert_eq!(
        vars,
        hashmap! {
            "n".to_string() => Value::Num(4.0),
            "doubled".to_string() => Value::Num(8.0),
        }
    );
    assert!(frames[1].describe().starts_with("<program> [CallExpression@"));
    assert_eq!(frames[1].lookup("r"), Some(Value::Undefined));

    let outcome = continuation.resume(&mut rt).unwrap();
    assert_eq!(outcome.value(), Some(&Value::Num(90.0)));
}

#[test]
fn test_for_in_resumes_remaining_keys() {
    let source = r#"
        var seen = [];
        var o = { a: 1, b: 2, c: 3 };
        for (var k in o) {
            seen.push(k);
            if (k == 'a') debugger;
        }
        return seen.join(',');
    "#;
    let (mut rt, continuation) = run_until_pause(source);
    let frame = continuation.current_frame().unwrap();
    assert_eq!(frame.lookup("seen").map(|v| ops::inspect(&v)), Some("[\"a\"]".to_string()));

    let outcome = continuation.resume(&mut rt).unwrap();
    assert_eq!(outcome.value(), Some(&Value::str("a,b,c")));
}

#[test]
fn test_pause_inside_for_each_callback() {
    let source = r#"
        var total = 0;
        [1, 2, 3].forEach(function (v) {
            total += v;
            if (v == 2) debugger;
        });
        return total;
    "#;
    let (mut rt, continuation) = run_until_pause(source);
    // callback, forEach itself, program
    let frames = continuation.frames();
    assert_eq!(frames.len(), 3);
    assert!(frames[1].describe().starts_with("forEach ["));
    assert_eq!(frames[2].lookup("total"), Some(Value::Num(3.0)));

    let outcome = continuation.resume(&mut rt).unwrap();
    assert_eq!(outcome.value(), Some(&Value::Num(6.0)));
}

#[test]
fn test_second_pause_after_resume() {
    let source = r#"
        var steps = [];
        for (var i = 0; i < 3; i++) {
            steps.push(i);
            debugger;
        }
        return steps.length;
    "#;
    let (mut rt, continuation) = run_until_pause(source);
    let mut outcome = continuation.resume(&mut rt).unwrap();
    let mut pauses = 1;
    while let Outcome::Paused(next) = outcome {
        pauses += 1;
        outcome = next.resume(&mut rt).unwrap();
    }
    assert_eq!(pauses, 3);
    assert_eq!(outcome.value(), Some(&Value::Num(3.0)));
}

#[test]
fn test_copy_can_be_resumed_independently() {
    let (mut rt, continuation) = run_until_pause(LOOP);
    let copy = continuation.copy();

    let first = copy.resume(&mut rt).unwrap();
    assert_eq!(first.value(), Some(&Value::Num(10.0)));

    // the original still sees the state at the pause
    assert_eq!(
        continuation.current_frame().unwrap().lookup("x"),
        Some(Value::Num(3.0))
    );
    let second = continuation.resume(&mut rt).unwrap();
    assert_eq!(second.value(), Some(&Value::Num(10.0)));
}

#[test]
fn test_copy_keeps_for_in_queue_separate() {
    let source = r#"
        var seen = '';
        for (var k in { a: 1, b: 2, c: 3 }) {
            if (k == 'b') debugger;
            seen += k;
        }
        return seen;
    "#;
    let (mut rt, continuation) = run_until_pause(source);
    let copy = continuation.copy();
    assert_eq!(copy.resume(&mut rt).unwrap().value(), Some(&Value::str("abc")));
    assert_eq!(continuation.resume(&mut rt).unwrap().value(), Some(&Value::str("abc")));
}

#[test]
fn test_uncaught_error_reports_frames() {
    let source = r#"
        function boom(reason) { throw new Error(reason); }
        function outer() { return boom('bad input'); }
        outer();
    "#;
    let program = parse_program(source).unwrap();
    let mut rt = Runtime::default();
    let outcome = rt.run_program(&program, &AstRegistry::handle()).unwrap();
    let Outcome::Failed(failure) = outcome else {
        unreachable!()
    };
    assert_eq!(ops::to_string(&failure.error), "Error: bad input");
    assert!(failure.continuation.is_error());
    assert_eq!(failure.continuation.error(), Some(&failure.error));

    let names: Vec<String> = failure
        .continuation
        .frames()
        .iter()
        .map(|f| f.describe())
        .collect();
    assert_eq!(names.len(), 3);
    assert!(names[0].starts_with("boom ["));
    assert!(names[1].starts_with("outer ["));
    assert!(names[2].starts_with("<program> ["));
}

#[test]
fn test_caught_error_leaves_no_trace() {
    let source = r#"
        function boom() { throw 'x'; }
        var caught;
        try { boom(); } catch (e) { caught = e; }
        debugger;
        return caught;
    "#;
    let (mut rt, continuation) = run_until_pause(source);
    assert_eq!(continuation.frames().len(), 1);
    let outcome = continuation.resume(&mut rt).unwrap();
    assert_eq!(outcome.value(), Some(&Value::str("x")));
}

#[test]
fn test_pause_inside_catch_and_with() {
    let source = r#"
        var o = { w: 'with' };
        var result;
        try {
            throw 'err';
        } catch (e) {
            with (o) {
                debugger;
                result = e + ':' + w;
            }
        }
        return result;
    "#;
    let (mut rt, continuation) = run_until_pause(source);
    let frame = continuation.current_frame().unwrap();
    assert_eq!(frame.pending.len(), 2);
    assert_eq!(frame.lookup("e"), Some(Value::str("err")));
    assert_eq!(frame.lookup("w"), Some(Value::str("with")));

    let outcome = continuation.resume(&mut rt).unwrap();
    assert_eq!(outcome.value(), Some(&Value::str("err:with")));
}

#[test]
fn test_resume_without_frames_is_rejected() {
    let mut rt = Runtime::default();
    let continuation = Continuation::from_unwind(*Unwind::error(Value::Undefined));
    assert!(continuation.current_frame().is_none());
    let result = continuation.resume(&mut rt);
    assert!(matches!(result, Err(ReifyError::Precondition(_))));
}

#[test]
fn test_pause_in_callee_on_later_iteration() {
    let source = r#"
        function g(n) {
            if (n == 1) debugger;
            return n;
        }
        var s = 0;
        for (var i = 0; i < 3; i++) {
            s += g(i);
        }
        return s;
    "#;
    let (mut rt, continuation) = run_until_pause(source);
    let frames = continuation.frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].lookup("s"), Some(Value::Num(0.0)));
    assert_eq!(frames[1].pc_node().map(|n| n.kind()), Some("CallExpression"));

    let outcome = continuation.resume(&mut rt).unwrap();
    assert_eq!(outcome.value(), Some(&Value::Num(3.0)));
}

#[test]
fn test_pause_in_callee_on_every_iteration() {
    let source = r#"
        function g(n) {
            debugger;
            return n;
        }
        var s = 0;
        for (var i = 0; i < 3; i++) {
            s += g(i);
        }
        return s;
    "#;
    let (mut rt, continuation) = run_until_pause(source);
    let mut outcome = continuation.resume(&mut rt).unwrap();
    let mut pauses = 1;
    while let Outcome::Paused(next) = outcome {
        pauses += 1;
        outcome = next.resume(&mut rt).unwrap();
    }
    assert_eq!(pauses, 3);
    assert_eq!(outcome.value(), Some(&Value::Num(3.0)));
}

#[test]
fn test_pause_in_callee_inside_for_in() {
    let source = r#"
        function g(k) {
            if (k == 'b') debugger;
            return k;
        }
        var out = '';
        for (var k in { a: 1, b: 2, c: 3 }) {
            out += g(k);
        }
        return out;
    "#;
    let (mut rt, continuation) = run_until_pause(source);
    assert_eq!(continuation.frames()[1].lookup("out"), Some(Value::str("a")));

    let outcome = continuation.resume(&mut rt).unwrap();
    assert_eq!(outcome.value(), Some(&Value::str("abc")));
}

#[test]
fn test_pause_inside_map_callback() {
    let source = r#"
        var doubled = [1, 2, 3].map(function (v) {
            if (v == 2) debugger;
            return v * 2;
        });
        return doubled;
    "#;
    let (mut rt, continuation) = run_until_pause(source);
    assert!(continuation.frames()[1].describe().starts_with("map ["));

    let outcome = continuation.resume(&mut rt).unwrap();
    let value = outcome.value().cloned().unwrap();
    assert_eq!(ops::inspect(&value), "[2, 4, 6]");
}

#[test]
fn test_pause_in_finally_keeps_pending_return() {
    let source = r#"
        function f() {
            try {
                return 1;
            } finally {
                debugger;
            }
        }
        return f() + 1;
    "#;
    let (mut rt, continuation) = run_until_pause(source);
    let outcome = continuation.resume(&mut rt).unwrap();
    assert_eq!(outcome.value(), Some(&Value::Num(2.0)));
}

#[test]
fn test_pause_in_finally_rethrows_pending_error() {
    let source = r#"
        try {
            throw 'x';
        } finally {
            debugger;
        }
    "#;
    let (mut rt, continuation) = run_until_pause(source);
    let outcome = continuation.resume(&mut rt).unwrap();
    let Outcome::Failed(failure) = outcome else {
        unreachable!()
    };
    assert_eq!(failure.error, Value::str("x"));
}

#[test]
fn test_pause_in_finally_keeps_pending_break() {
    let source = r#"
        var n = 0;
        while (true) {
            n++;
            try {
                break;
            } finally {
                debugger;
            }
        }
        return n;
    "#;
    let (mut rt, continuation) = run_until_pause(source);
    let outcome = continuation.resume(&mut rt).unwrap();
    assert_eq!(outcome.value(), Some(&Value::Num(1.0)));
}
