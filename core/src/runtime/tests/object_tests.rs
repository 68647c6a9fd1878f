use crate::config::Config;
use crate::runtime::{ops, ErrorKind, Runtime, Value};
use crate::stack::Outcome;

use super::helpers::{eval, run_with, thrown};

#[test]
fn test_property_get_put_delete() {
    assert_eq!(
        eval("var o = { a: 1 }; o.b = 2; o['c'] = 3; delete o.a; return o;"),
        "{ b: 2, c: 3 }"
    );
}

#[test]
fn test_array_elements_and_length() {
    assert_eq!(eval("var a = [1]; a[3] = 4; return [a.length, a[1]];"), "[4, undefined]");
    assert_eq!(eval("var a = [1, 2, 3]; a.length = 1; return a;"), "[1]");
}

#[test]
fn test_string_indexing() {
    assert_eq!(eval("var s = 'héllo'; return [s.length, s[1], s.charAt(4)];"), "[5, \"é\", \"o\"]");
}

#[test]
fn test_accessors() {
    let source = r#"
        var o = {
            _v: 1,
            get v() { return this._v * 10; },
            set v(x) { this._v = x; }
        };
        o.v = 5;
        return o.v;
    "#;
    assert_eq!(eval(source), "50");
}

#[test]
fn test_constructors_and_prototypes() {
    let source = r#"
        function Point(x, y) { this.x = x; this.y = y; }
        Point.prototype.sum = function () { return this.x + this.y; };
        var p = new Point(2, 3);
        return [p.sum(), p instanceof Point, p instanceof Array, p.hasOwnProperty('sum')];
    "#;
    assert_eq!(eval(source), "[5, true, false, false]");
}

#[test]
fn test_constructor_returning_object_wins() {
    assert_eq!(eval("function F() { this.a = 1; return { b: 2 }; } return new F();"), "{ b: 2 }");
}

#[test]
fn test_for_in_visits_own_then_inherited_keys() {
    let source = r#"
        function Base() { this.own = 1; }
        Base.prototype.shared = 2;
        var keys = [];
        for (var k in new Base()) keys.push(k);
        for (var i in ['x', 'y']) keys.push(i);
        for (var j in 'ab') keys.push(j);
        return keys;
    "#;
    assert_eq!(eval(source), "[\"own\", \"shared\", \"0\", \"1\", \"0\", \"1\"]");
}

#[test]
fn test_reading_property_of_undefined_throws() {
    assert_eq!(
        thrown("var o; return o.x;"),
        "TypeError: Cannot read property 'x' of undefined"
    );
    assert_eq!(
        thrown("null.y = 1;"),
        "TypeError: Cannot set property 'y' of null"
    );
}

#[test]
fn test_undeclared_read_is_reference_error() {
    assert_eq!(thrown("return nope + 1;"), "ReferenceError: nope is not defined");
}

#[test]
fn test_undeclared_write_creates_global() {
    let (rt, outcome) = run_with(Config::default(), "leaked = 7;");
    assert!(outcome.is_completed());
    assert_eq!(rt.global_value("leaked"), Some(Value::Num(7.0)));
}

#[test]
fn test_calling_non_function_is_type_error() {
    assert_eq!(thrown("var o = {}; o.missing();"), "TypeError: o.missing is not a function");
    assert_eq!(thrown("var x = 1; new x();"), "TypeError: x is not a constructor");
}

#[test]
fn test_call_depth_limit() {
    let config = Config {
        max_call_depth: 20,
        ..Config::default()
    };
    let (_, outcome) = run_with(config, "function f(n) { return f(n + 1); } return f(0);");
    let Outcome::Failed(failure) = outcome else {
        unreachable!()
    };
    assert_eq!(
        ops::to_string(&failure.error),
        "RangeError: Maximum call stack size exceeded"
    );
}

#[test]
fn test_json_conversion() {
    let rt = Runtime::default();
    let json = serde_json::json!({ "a": [1.5, "x", null, true], "b": { "c": 2.0 } });
    let value = rt.from_json(&json);
    assert_eq!(ops::inspect(&value), "{ a: [1.5, \"x\", null, true], b: { c: 2 } }");
    assert_eq!(rt.to_json(&value), json);
}

#[test]
fn test_error_objects() {
    let rt = Runtime::default();
    let error = rt.new_error(ErrorKind::Type, "bad");
    assert_eq!(ops::to_string(&error), "TypeError: bad");
    assert_eq!(
        eval("var e = new RangeError('r'); return [e instanceof RangeError, e instanceof Error, e.name, e.message];"),
        "[true, true, \"RangeError\", \"r\"]"
    );
}

#[test]
fn test_enumerate_skips_intrinsic_prototypes() {
    let rt = Runtime::default();
    let array = rt.new_array(vec![Value::Num(1.0)]);
    assert_eq!(rt.enumerate(&array), vec!["0".to_string()]);
    assert!(rt.enumerate(&Value::Num(1.0)).is_empty());
}
