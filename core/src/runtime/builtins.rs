//! Native globals and prototype methods

use crate::stack::Completion;

use super::ops::{self, to_number, to_string};
use super::value::{array_index, ObjectRef};
use super::{ErrorKind, NativeFn, Runtime, Value};

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

fn define(rt: &Runtime, target: &ObjectRef, methods: &[(&'static str, NativeFn)]) {
    for (name, func) in methods {
        let value = rt.native(*name, *func);
        target.borrow_mut().set_own(name, value);
    }
}

/// Install globals and intrinsic prototype methods
pub fn install(rt: &mut Runtime) {
    let intrinsics = &rt.intrinsics;
    let (object, function, array, string) = (
        intrinsics.object.clone(),
        intrinsics.function.clone(),
        intrinsics.array.clone(),
        intrinsics.string.clone(),
    );

    define(
        rt,
        &object,
        &[
            ("hasOwnProperty", object_has_own_property),
            ("toString", object_to_string),
        ],
    );
    define(
        rt,
        &function,
        &[
            ("call", function_call),
            ("apply", function_apply),
            ("toString", object_to_string),
        ],
    );
    define(
        rt,
        &array,
        &[
            ("push", array_push),
            ("pop", array_pop),
            ("shift", array_shift),
            ("unshift", array_unshift),
            ("slice", array_slice),
            ("concat", array_concat),
            ("join", array_join),
            ("indexOf", array_index_of),
            ("forEach", array_for_each),
            ("map", array_map),
            ("filter", array_filter),
            ("reduce", array_reduce),
        ],
    );
    define(
        rt,
        &string,
        &[
            ("charAt", string_char_at),
            ("indexOf", string_index_of),
            ("slice", string_slice),
            ("toUpperCase", string_to_upper_case),
            ("toLowerCase", string_to_lower_case),
            ("split", string_split),
        ],
    );

    rt.set_global("undefined", Value::Undefined);
    rt.set_global("NaN", Value::Num(f64::NAN));
    rt.set_global("Infinity", Value::Num(f64::INFINITY));

    let object_ctor = rt.native("Object", object_constructor);
    install_statics(rt, &object_ctor, &[("keys", object_keys)]);
    rt.set_global("Object", object_ctor);

    let array_ctor = rt.native("Array", array_constructor);
    install_statics(rt, &array_ctor, &[("isArray", array_is_array)]);
    rt.set_global("Array", array_ctor);

    let string_ctor = rt.native("String", string_constructor);
    rt.set_global("String", string_ctor);
    let number_ctor = rt.native("Number", number_constructor);
    rt.set_global("Number", number_ctor);

    let errors: [(ErrorKind, NativeFn); 5] = [
        (ErrorKind::Error, error_constructor),
        (ErrorKind::Type, type_error_constructor),
        (ErrorKind::Reference, reference_error_constructor),
        (ErrorKind::Range, range_error_constructor),
        (ErrorKind::Syntax, syntax_error_constructor),
    ];
    for (kind, ctor) in errors {
        let value = rt.native(kind.name(), ctor);
        if let (Some(proto), Value::Object(obj)) = (rt.intrinsics.errors.get(&kind).cloned(), &value) {
            proto.borrow_mut().set_own("name", Value::str(kind.name()));
            proto.borrow_mut().set_own("message", Value::str(""));
            obj.borrow_mut().set_own("prototype", Value::Object(proto));
        }
        rt.set_global(kind.name(), value);
    }

    let math = rt.new_object();
    math.borrow_mut().set_own("PI", Value::Num(std::f64::consts::PI));
    define(
        rt,
        &math,
        &[
            ("floor", math_floor),
            ("ceil", math_ceil),
            ("abs", math_abs),
            ("round", math_round),
            ("max", math_max),
            ("min", math_min),
            ("sqrt", math_sqrt),
            ("pow", math_pow),
        ],
    );
    rt.set_global("Math", Value::Object(math));

    let console = rt.new_object();
    define(rt, &console, &[("log", console_log)]);
    rt.set_global("console", Value::Object(console));
}

fn install_statics(rt: &Runtime, target: &Value, methods: &[(&'static str, NativeFn)]) {
    if let Value::Object(obj) = target {
        define(rt, obj, methods);
    }
}

/* ===================== Object & Function ===================== */

fn object_constructor(rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    match arg(&args, 0) {
        value @ Value::Object(_) => Ok(value),
        _ => Ok(Value::Object(rt.new_object())),
    }
}

fn object_keys(rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    match arg(&args, 0) {
        Value::Object(obj) => {
            let keys = obj.borrow().keys().into_iter().map(Value::Str).collect();
            Ok(rt.new_array(keys))
        }
        other => Err(rt.type_error(format!(
            "Object.keys called on non-object {}",
            ops::inspect(&other)
        ))),
    }
}

fn object_has_own_property(_rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let key = to_string(&arg(&args, 0));
    Ok(Value::Bool(match &this {
        Value::Object(obj) => obj.borrow().has_own(&key),
        Value::Str(s) => key == "length" || array_index(&key).is_some_and(|i| i < s.chars().count()),
        _ => false,
    }))
}

fn object_to_string(_rt: &mut Runtime, this: Value, _args: Vec<Value>) -> Completion<Value> {
    Ok(Value::Str(to_string(&this)))
}

fn function_call(rt: &mut Runtime, this: Value, mut args: Vec<Value>) -> Completion<Value> {
    let receiver = if args.is_empty() {
        Value::Undefined
    } else {
        args.remove(0)
    };
    rt.call(&this, receiver, args)
}

fn function_apply(rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let receiver = arg(&args, 0);
    let list = match arg(&args, 1) {
        Value::Undefined | Value::Null => Vec::new(),
        Value::Object(obj) => snapshot(&obj),
        _ => return Err(rt.type_error("CreateListFromArrayLike called on non-object")),
    };
    rt.call(&this, receiver, list)
}

/* ===================== Array ===================== */

fn array_constructor(rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    if let [Value::Num(n)] = args.as_slice() {
        if *n < 0.0 || n.fract() != 0.0 {
            return Err(rt.error(ErrorKind::Range, "Invalid array length"));
        }
        return Ok(rt.new_array(vec![Value::Undefined; *n as usize]));
    }
    Ok(rt.new_array(args))
}

fn array_is_array(_rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    Ok(Value::Bool(match arg(&args, 0) {
        Value::Object(obj) => obj.borrow().is_array(),
        _ => false,
    }))
}

/// The array a method was called on
fn this_array(rt: &Runtime, this: &Value, method: &str) -> Completion<ObjectRef> {
    match this {
        Value::Object(obj) if obj.borrow().is_array() => Ok(obj.clone()),
        _ => Err(rt.type_error(format!(
            "Array.prototype.{} called on non-array",
            method
        ))),
    }
}

fn snapshot(obj: &ObjectRef) -> Vec<Value> {
    obj.borrow().elements().cloned().unwrap_or_default()
}

fn element(obj: &ObjectRef, i: usize) -> Option<Value> {
    obj.borrow().elements().and_then(|items| items.get(i).cloned())
}

fn length(obj: &ObjectRef) -> usize {
    obj.borrow().elements().map(Vec::len).unwrap_or(0)
}

/// Resolve a relative (possibly negative) position against `len`
fn relative(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = to_number(value);
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

fn array_push(rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let obj = this_array(rt, &this, "push")?;
    let mut o = obj.borrow_mut();
    let items = o.elements_mut().map(|items| {
        items.extend(args);
        items.len()
    });
    Ok(Value::Num(items.unwrap_or(0) as f64))
}

fn array_pop(rt: &mut Runtime, this: Value, _args: Vec<Value>) -> Completion<Value> {
    let obj = this_array(rt, &this, "pop")?;
    let popped = obj.borrow_mut().elements_mut().and_then(Vec::pop);
    Ok(popped.unwrap_or(Value::Undefined))
}

fn array_shift(rt: &mut Runtime, this: Value, _args: Vec<Value>) -> Completion<Value> {
    let obj = this_array(rt, &this, "shift")?;
    let mut o = obj.borrow_mut();
    let shifted = o
        .elements_mut()
        .and_then(|items| (!items.is_empty()).then(|| items.remove(0)));
    Ok(shifted.unwrap_or(Value::Undefined))
}

fn array_unshift(rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let obj = this_array(rt, &this, "unshift")?;
    let mut o = obj.borrow_mut();
    let len = o.elements_mut().map(|items| {
        items.splice(0..0, args);
        items.len()
    });
    Ok(Value::Num(len.unwrap_or(0) as f64))
}

fn array_slice(rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let obj = this_array(rt, &this, "slice")?;
    let items = snapshot(&obj);
    let start = relative(&arg(&args, 0), items.len(), 0);
    let end = relative(&arg(&args, 1), items.len(), items.len());
    let sliced = if start < end {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };
    Ok(rt.new_array(sliced))
}

fn array_concat(rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let obj = this_array(rt, &this, "concat")?;
    let mut items = snapshot(&obj);
    for value in args {
        match &value {
            Value::Object(other) if other.borrow().is_array() => items.extend(snapshot(other)),
            _ => items.push(value),
        }
    }
    Ok(rt.new_array(items))
}

fn array_join(rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let obj = this_array(rt, &this, "join")?;
    let separator = match arg(&args, 0) {
        Value::Undefined => ",".to_string(),
        other => to_string(&other),
    };
    let parts: Vec<String> = snapshot(&obj)
        .iter()
        .map(|v| match v {
            Value::Undefined | Value::Null => String::new(),
            other => to_string(other),
        })
        .collect();
    Ok(Value::Str(parts.join(&separator)))
}

fn array_index_of(rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let obj = this_array(rt, &this, "indexOf")?;
    let needle = arg(&args, 0);
    let position = snapshot(&obj).iter().position(|v| ops::strict_equals(v, &needle));
    Ok(Value::Num(position.map(|p| p as f64).unwrap_or(-1.0)))
}

fn callback(rt: &Runtime, args: &[Value], method: &str) -> Completion<Value> {
    let f = arg(args, 0);
    if !f.is_callable() {
        return Err(rt.type_error(format!(
            "{} is not a function (in Array.prototype.{})",
            ops::inspect(&f),
            method
        )));
    }
    Ok(f)
}

fn array_for_each(rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let obj = this_array(rt, &this, "forEach")?;
    let f = callback(rt, &args, "forEach")?;
    let this_arg = arg(&args, 1);
    let mut i = 0;
    while i < length(&obj) {
        if let Some(item) = element(&obj, i) {
            rt.call(&f, this_arg.clone(), vec![item, Value::Num(i as f64), this.clone()])?;
        }
        i += 1;
    }
    Ok(Value::Undefined)
}

fn array_map(rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let obj = this_array(rt, &this, "map")?;
    let f = callback(rt, &args, "map")?;
    let this_arg = arg(&args, 1);
    let mut out = Vec::new();
    let mut i = 0;
    while i < length(&obj) {
        let item = element(&obj, i).unwrap_or(Value::Undefined);
        out.push(rt.call(&f, this_arg.clone(), vec![item, Value::Num(i as f64), this.clone()])?);
        i += 1;
    }
    Ok(rt.new_array(out))
}

fn array_filter(rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let obj = this_array(rt, &this, "filter")?;
    let f = callback(rt, &args, "filter")?;
    let this_arg = arg(&args, 1);
    let mut out = Vec::new();
    let mut i = 0;
    while i < length(&obj) {
        let item = element(&obj, i).unwrap_or(Value::Undefined);
        let keep = rt.call(&f, this_arg.clone(), vec![item.clone(), Value::Num(i as f64), this.clone()])?;
        if keep.truthy() {
            out.push(item);
        }
        i += 1;
    }
    Ok(rt.new_array(out))
}

fn array_reduce(rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let obj = this_array(rt, &this, "reduce")?;
    let f = callback(rt, &args, "reduce")?;
    let mut i = 0;
    let mut acc = if args.len() > 1 {
        arg(&args, 1)
    } else {
        match element(&obj, 0) {
            Some(first) => {
                i = 1;
                first
            }
            None => return Err(rt.type_error("Reduce of empty array with no initial value")),
        }
    };
    while i < length(&obj) {
        let item = element(&obj, i).unwrap_or(Value::Undefined);
        acc = rt.call(&f, Value::Undefined, vec![acc, item, Value::Num(i as f64), this.clone()])?;
        i += 1;
    }
    Ok(acc)
}

/* ===================== String ===================== */

fn this_string(this: &Value) -> String {
    to_string(this)
}

fn string_constructor(_rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    Ok(Value::Str(match args.first() {
        Some(value) => to_string(value),
        None => String::new(),
    }))
}

fn string_char_at(_rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let s = this_string(&this);
    let i = to_number(&arg(&args, 0));
    let i = if i.is_nan() { 0.0 } else { i.trunc() };
    let c = if i < 0.0 {
        None
    } else {
        s.chars().nth(i as usize)
    };
    Ok(Value::Str(c.map(String::from).unwrap_or_default()))
}

fn string_index_of(_rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let s = this_string(&this);
    let needle = to_string(&arg(&args, 0));
    let position = s
        .find(&needle)
        .map(|byte| s[..byte].chars().count() as f64)
        .unwrap_or(-1.0);
    Ok(Value::Num(position))
}

fn string_slice(_rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let chars: Vec<char> = this_string(&this).chars().collect();
    let start = relative(&arg(&args, 0), chars.len(), 0);
    let end = relative(&arg(&args, 1), chars.len(), chars.len());
    let sliced = if start < end {
        chars[start..end].iter().collect()
    } else {
        String::new()
    };
    Ok(Value::Str(sliced))
}

fn string_to_upper_case(_rt: &mut Runtime, this: Value, _args: Vec<Value>) -> Completion<Value> {
    Ok(Value::Str(this_string(&this).to_uppercase()))
}

fn string_to_lower_case(_rt: &mut Runtime, this: Value, _args: Vec<Value>) -> Completion<Value> {
    Ok(Value::Str(this_string(&this).to_lowercase()))
}

fn string_split(rt: &mut Runtime, this: Value, args: Vec<Value>) -> Completion<Value> {
    let s = this_string(&this);
    let parts: Vec<Value> = match arg(&args, 0) {
        Value::Undefined => vec![Value::Str(s)],
        separator => {
            let separator = to_string(&separator);
            if separator.is_empty() {
                s.chars().map(|c| Value::Str(c.to_string())).collect()
            } else {
                s.split(separator.as_str()).map(Value::str).collect()
            }
        }
    };
    Ok(rt.new_array(parts))
}

/* ===================== Number ===================== */

fn number_constructor(_rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    Ok(Value::Num(match args.first() {
        Some(value) => to_number(value),
        None => 0.0,
    }))
}

/* ===================== Errors ===================== */

fn make_error(rt: &mut Runtime, kind: ErrorKind, args: &[Value]) -> Completion<Value> {
    let message = match arg(args, 0) {
        Value::Undefined => String::new(),
        other => to_string(&other),
    };
    Ok(rt.new_error(kind, message))
}

fn error_constructor(rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    make_error(rt, ErrorKind::Error, &args)
}

fn type_error_constructor(rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    make_error(rt, ErrorKind::Type, &args)
}

fn reference_error_constructor(rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    make_error(rt, ErrorKind::Reference, &args)
}

fn range_error_constructor(rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    make_error(rt, ErrorKind::Range, &args)
}

fn syntax_error_constructor(rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    make_error(rt, ErrorKind::Syntax, &args)
}

/* ===================== Math ===================== */

fn unary_math(args: &[Value], f: fn(f64) -> f64) -> Completion<Value> {
    Ok(Value::Num(f(to_number(&arg(args, 0)))))
}

fn math_floor(_rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    unary_math(&args, f64::floor)
}

fn math_ceil(_rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    unary_math(&args, f64::ceil)
}

fn math_abs(_rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    unary_math(&args, f64::abs)
}

fn math_round(_rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    // Halves round towards +Infinity
    unary_math(&args, |n| (n + 0.5).floor())
}

fn math_sqrt(_rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    unary_math(&args, f64::sqrt)
}

fn math_pow(_rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    let base = to_number(&arg(&args, 0));
    let exponent = to_number(&arg(&args, 1));
    Ok(Value::Num(base.powf(exponent)))
}

fn fold_numbers(args: &[Value], init: f64, pick: fn(f64, f64) -> f64) -> Value {
    let mut acc = init;
    for value in args {
        let n = to_number(value);
        if n.is_nan() {
            return Value::Num(f64::NAN);
        }
        acc = pick(acc, n);
    }
    Value::Num(acc)
}

fn math_max(_rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    Ok(fold_numbers(&args, f64::NEG_INFINITY, f64::max))
}

fn math_min(_rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    Ok(fold_numbers(&args, f64::INFINITY, f64::min))
}

/* ===================== Console ===================== */

fn console_log(rt: &mut Runtime, _this: Value, args: Vec<Value>) -> Completion<Value> {
    let line = args
        .iter()
        .map(|v| match v {
            Value::Str(s) => s.clone(),
            other => ops::inspect(other),
        })
        .collect::<Vec<_>>()
        .join(" ");
    rt.log_line(line);
    Ok(Value::Undefined)
}
