use crate::runtime::ops::{loose_equals, number_to_string, strict_equals, to_int32, to_number, to_string};
use crate::runtime::{Runtime, Value};

#[test]
fn test_number_formatting() {
    assert_eq!(number_to_string(3.0), "3");
    assert_eq!(number_to_string(-0.0), "0");
    assert_eq!(number_to_string(0.5), "0.5");
    assert_eq!(number_to_string(f64::NAN), "NaN");
    assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
}

#[test]
fn test_string_to_number() {
    assert_eq!(to_number(&Value::str(" 42 ")), 42.0);
    assert_eq!(to_number(&Value::str("")), 0.0);
    assert_eq!(to_number(&Value::str("0x1f")), 31.0);
    assert_eq!(to_number(&Value::str("1e3")), 1000.0);
    assert!(to_number(&Value::str("inf")).is_nan());
    assert!(to_number(&Value::str("12px")).is_nan());
    assert!(to_number(&Value::Undefined).is_nan());
    assert_eq!(to_number(&Value::Null), 0.0);
}

#[test]
fn test_to_string_of_objects() {
    let rt = Runtime::default();
    let nested = rt.new_array(vec![Value::Num(2.0), Value::Null]);
    let array = rt.new_array(vec![Value::Num(1.0), nested]);
    assert_eq!(to_string(&array), "1,2,");
    assert_eq!(to_string(&Value::Object(rt.new_object())), "[object Object]");
}

#[test]
fn test_equality() {
    assert!(loose_equals(&Value::Null, &Value::Undefined));
    assert!(loose_equals(&Value::Num(1.0), &Value::str("1")));
    assert!(loose_equals(&Value::Bool(true), &Value::Num(1.0)));
    assert!(!strict_equals(&Value::Num(1.0), &Value::str("1")));
    assert!(!strict_equals(&Value::Num(f64::NAN), &Value::Num(f64::NAN)));

    let rt = Runtime::default();
    let a = Value::Object(rt.new_object());
    let b = Value::Object(rt.new_object());
    assert!(strict_equals(&a, &a.clone()));
    assert!(!strict_equals(&a, &b));
}

#[test]
fn test_int32_wraps() {
    assert_eq!(to_int32(&Value::Num(4_294_967_295.0)), -1);
    assert_eq!(to_int32(&Value::Num(-1.5)), -1);
    assert_eq!(to_int32(&Value::Num(f64::NAN)), 0);
}

#[test]
fn test_operators_in_programs() {
    use super::helpers::eval;
    assert_eq!(eval("return 1 + '2';"), "\"12\"");
    assert_eq!(eval("return '3' * '4';"), "12");
    assert_eq!(eval("return 7 % 3 + (1 << 4) + (-16 >> 2) + (-1 >>> 28);"), "28");
    assert_eq!(eval("return [typeof 1, typeof 'a', typeof null, typeof undefined, typeof {}, typeof function () {}];"),
        "[\"number\", \"string\", \"object\", \"undefined\", \"object\", \"function\"]");
    assert_eq!(eval("return typeof notDeclaredAnywhere;"), "\"undefined\"");
    assert_eq!(eval("return 'b' in { b: 1 } && !('c' in { b: 1 });"), "true");
    assert_eq!(eval("return null || 0 || 'x';"), "\"x\"");
    assert_eq!(eval("return 1 && 0;"), "0");
    assert_eq!(eval("return 'a' < 'b' && 2 < 10 && '2' > '10';"), "true");
}
