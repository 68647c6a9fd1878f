//! Conversions and operators that never call back into scripts

use std::rc::Rc;

use crate::syntax::ast::BinaryOp;

use super::value::{find_slot, ObjectKind, ObjectRef, Slot, Value};

/* ===================== Conversions ===================== */

/// Number formatting: integral values print without a fraction
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Num(n) => *n,
        Value::Str(s) => string_to_number(s),
        Value::Object(_) => string_to_number(&to_string(value)),
    }
}

fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    match s {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf"/"nan" spellings scripts must not
        _ if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => s.parse::<f64>().unwrap_or(f64::NAN),
    }
}

/// String conversion without invoking script-defined `toString`
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Num(n) => number_to_string(*n),
        Value::Str(s) => s.clone(),
        Value::Object(obj) => object_to_string(obj, &mut Vec::new()),
    }
}

fn object_to_string(obj: &ObjectRef, seen: &mut Vec<ObjectRef>) -> String {
    if seen.iter().any(|o| Rc::ptr_eq(o, obj)) {
        return String::new();
    }
    let o = obj.borrow();
    match &o.kind {
        ObjectKind::Array(items) => {
            seen.push(obj.clone());
            let parts: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    Value::Object(inner) => object_to_string(inner, seen),
                    other => to_string(other),
                })
                .collect();
            seen.pop();
            parts.join(",")
        }
        ObjectKind::Function(callable) => {
            format!("function {}() {{ [code] }}", callable.name())
        }
        ObjectKind::Error => {
            let name = match find_slot(obj, "name") {
                Some(Slot::Data(v)) => to_string(&v),
                _ => "Error".to_string(),
            };
            let message = match find_slot(obj, "message") {
                Some(Slot::Data(v)) => to_string(&v),
                _ => String::new(),
            };
            if message.is_empty() {
                name
            } else {
                format!("{}: {}", name, message)
            }
        }
        ObjectKind::Plain => "[object Object]".to_string(),
    }
}

pub fn to_int32(value: &Value) -> i32 {
    to_uint32(value) as i32
}

pub fn to_uint32(value: &Value) -> u32 {
    let n = to_number(value);
    if !n.is_finite() {
        return 0;
    }
    let n = n.trunc().rem_euclid(4_294_967_296.0);
    n as u32
}

/// Display form used by the CLI and frame inspection: strings are quoted,
/// arrays and plain objects are expanded one level deep.
pub fn inspect(value: &Value) -> String {
    inspect_depth(value, 2)
}

fn inspect_depth(value: &Value, depth: usize) -> String {
    match value {
        Value::Str(s) => crate::syntax::printer::quote(s),
        Value::Object(obj) => {
            let o = obj.borrow();
            match &o.kind {
                ObjectKind::Array(items) if depth > 0 => {
                    let parts: Vec<String> =
                        items.iter().map(|v| inspect_depth(v, depth - 1)).collect();
                    format!("[{}]", parts.join(", "))
                }
                ObjectKind::Plain if depth > 0 => {
                    let parts: Vec<String> = o
                        .entries()
                        .iter()
                        .map(|(k, v)| format!("{}: {}", k, inspect_depth(v, depth - 1)))
                        .collect();
                    if parts.is_empty() {
                        "{}".to_string()
                    } else {
                        format!("{{ {} }}", parts.join(", "))
                    }
                }
                ObjectKind::Array(_) => "[Array]".to_string(),
                ObjectKind::Plain => "[Object]".to_string(),
                _ => to_string(value),
            }
        }
        other => to_string(other),
    }
}

/* ===================== Equality ===================== */

pub fn strict_equals(a: &Value, b: &Value) -> bool {
    a == b
}

/// Abstract equality (`==`)
pub fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Num(_), Value::Str(_)) | (Value::Str(_), Value::Num(_)) => {
            to_number(a) == to_number(b)
        }
        (Value::Bool(_), _) => loose_equals(&Value::Num(to_number(a)), b),
        (_, Value::Bool(_)) => loose_equals(a, &Value::Num(to_number(b))),
        (Value::Object(_), Value::Object(_)) => a == b,
        (Value::Object(_), _) => loose_equals(&to_primitive(a), b),
        (_, Value::Object(_)) => loose_equals(a, &to_primitive(b)),
        _ => a == b,
    }
}

fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Object(_) => Value::Str(to_string(value)),
        other => other.clone(),
    }
}

/* ===================== Operators ===================== */

/// Evaluate a binary operator that needs no object model.
///
/// Returns `None` for `in` and `instanceof`, which the runtime handles.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    let num = |f: fn(f64, f64) -> f64| Value::Num(f(to_number(left), to_number(right)));
    let value = match op {
        BinaryOp::Add => {
            let (l, r) = (to_primitive(left), to_primitive(right));
            match (&l, &r) {
                (Value::Str(_), _) | (_, Value::Str(_)) => {
                    Value::Str(format!("{}{}", to_string(&l), to_string(&r)))
                }
                _ => Value::Num(to_number(&l) + to_number(&r)),
            }
        }
        BinaryOp::Sub => num(|a, b| a - b),
        BinaryOp::Mul => num(|a, b| a * b),
        BinaryOp::Div => num(|a, b| a / b),
        BinaryOp::Mod => num(|a, b| a % b),
        BinaryOp::Eq => Value::Bool(loose_equals(left, right)),
        BinaryOp::NotEq => Value::Bool(!loose_equals(left, right)),
        BinaryOp::StrictEq => Value::Bool(strict_equals(left, right)),
        BinaryOp::StrictNotEq => Value::Bool(!strict_equals(left, right)),
        BinaryOp::Lt => compare(left, right, |o| o == std::cmp::Ordering::Less),
        BinaryOp::LtE => compare(left, right, |o| o != std::cmp::Ordering::Greater),
        BinaryOp::Gt => compare(left, right, |o| o == std::cmp::Ordering::Greater),
        BinaryOp::GtE => compare(left, right, |o| o != std::cmp::Ordering::Less),
        BinaryOp::BitAnd => Value::Num((to_int32(left) & to_int32(right)) as f64),
        BinaryOp::BitOr => Value::Num((to_int32(left) | to_int32(right)) as f64),
        BinaryOp::BitXor => Value::Num((to_int32(left) ^ to_int32(right)) as f64),
        BinaryOp::Shl => Value::Num(to_int32(left).wrapping_shl(to_uint32(right) & 31) as f64),
        BinaryOp::Shr => Value::Num((to_int32(left) >> (to_uint32(right) & 31)) as f64),
        BinaryOp::UShr => Value::Num((to_uint32(left) >> (to_uint32(right) & 31)) as f64),
        BinaryOp::In | BinaryOp::InstanceOf => return None,
    };
    Some(value)
}

fn compare(left: &Value, right: &Value, accept: fn(std::cmp::Ordering) -> bool) -> Value {
    let (l, r) = (to_primitive(left), to_primitive(right));
    if let (Value::Str(a), Value::Str(b)) = (&l, &r) {
        return Value::Bool(accept(a.cmp(b)));
    }
    match to_number(&l).partial_cmp(&to_number(&r)) {
        Some(ordering) => Value::Bool(accept(ordering)),
        None => Value::Bool(false),
    }
}
