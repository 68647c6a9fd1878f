//! Runtime values and objects

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::host::HostClosure;
use crate::interpreter::InterpretedClosure;
use crate::stack::Completion;

use super::Runtime;

pub type ObjectRef = Rc<RefCell<Object>>;

/// Native function: `(runtime, this, args) -> result`
pub type NativeFn = fn(&mut Runtime, Value, Vec<Value>) -> Completion<Value>;

/* ===================== Value ===================== */

/// Runtime value type
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Object(ObjectRef),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        match self {
            Value::Object(obj) => matches!(obj.borrow().kind, ObjectKind::Function(_)),
            _ => false,
        }
    }

    /// Check if value is truthy (for conditionals)
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// Result of the `typeof` operator
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Object(obj) => match obj.borrow().kind {
                ObjectKind::Function(_) => "function",
                _ => "object",
            },
        }
    }
}

/// Strict equality (`===`): objects compare by identity, NaN is unequal to itself
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Num(n) => write!(f, "{}", super::ops::number_to_string(*n)),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Object(obj) => match obj.try_borrow() {
                Ok(obj) => write!(f, "{:?}", obj),
                Err(_) => write!(f, "[object <busy>]"),
            },
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/* ===================== Objects ===================== */

/// What a function object does when called
#[derive(Clone)]
pub enum Callable {
    Native { name: &'static str, func: NativeFn },
    /// Instrumented closure executed by the host engine
    Host(Rc<HostClosure>),
    /// Closure executed by the stepping interpreter
    Interpreted(Rc<InterpretedClosure>),
}

impl Callable {
    pub fn name(&self) -> String {
        match self {
            Callable::Native { name, .. } => name.to_string(),
            Callable::Host(closure) => closure.func.name.clone().unwrap_or_default(),
            Callable::Interpreted(closure) => closure.name().unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub enum ObjectKind {
    Plain,
    Array(Vec<Value>),
    Function(Callable),
    Error,
}

/// Property slot
#[derive(Debug, Clone)]
pub enum Slot {
    Data(Value),
    Accessor {
        get: Option<Value>,
        set: Option<Value>,
    },
}

pub struct Object {
    pub kind: ObjectKind,
    pub proto: Option<ObjectRef>,
    props: Vec<(String, Slot)>,
}

/// Canonical array index of a property key
pub fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    key.parse::<usize>().ok()
}

impl Object {
    pub fn new(kind: ObjectKind, proto: Option<ObjectRef>) -> Self {
        Object {
            kind,
            proto,
            props: Vec::new(),
        }
    }

    pub fn into_ref(self) -> ObjectRef {
        Rc::new(RefCell::new(self))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array(_))
    }

    pub fn elements(&self) -> Option<&Vec<Value>> {
        match &self.kind {
            ObjectKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn elements_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.kind {
            ObjectKind::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Own slot for `key`, with array elements and `length` exposed as data
    pub fn own(&self, key: &str) -> Option<Slot> {
        if let ObjectKind::Array(items) = &self.kind {
            if key == "length" {
                return Some(Slot::Data(Value::Num(items.len() as f64)));
            }
            if let Some(i) = array_index(key) {
                return items.get(i).cloned().map(Slot::Data);
            }
        }
        self.props
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, slot)| slot.clone())
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.own(key).is_some()
    }

    /// Own data value, ignoring accessors
    pub fn get_own(&self, key: &str) -> Option<Value> {
        match self.own(key) {
            Some(Slot::Data(value)) => Some(value),
            _ => None,
        }
    }

    /// Create or overwrite an own data property
    pub fn set_own(&mut self, key: &str, value: Value) {
        if let ObjectKind::Array(items) = &mut self.kind {
            if key == "length" {
                let len = super::ops::to_number(&value);
                if len >= 0.0 && len.fract() == 0.0 {
                    items.resize(len as usize, Value::Undefined);
                }
                return;
            }
            if let Some(i) = array_index(key) {
                if i >= items.len() {
                    items.resize(i + 1, Value::Undefined);
                }
                items[i] = value;
                return;
            }
        }
        match self.props.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = Slot::Data(value),
            None => self.props.push((key.to_string(), Slot::Data(value))),
        }
    }

    pub fn define_accessor(&mut self, key: &str, get: Option<Value>, set: Option<Value>) {
        let merged = match self.props.iter().find(|(k, _)| k == key) {
            Some((_, Slot::Accessor { get: old_get, set: old_set })) => Slot::Accessor {
                get: get.or_else(|| old_get.clone()),
                set: set.or_else(|| old_set.clone()),
            },
            _ => Slot::Accessor { get, set },
        };
        match self.props.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = merged,
            None => self.props.push((key.to_string(), merged)),
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        if let ObjectKind::Array(items) = &mut self.kind {
            if let Some(i) = array_index(key) {
                if i < items.len() {
                    items[i] = Value::Undefined;
                }
                return true;
            }
        }
        let before = self.props.len();
        self.props.retain(|(k, _)| k != key);
        before != self.props.len()
    }

    /// Own enumerable keys: array indices first, then properties in insertion order
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if let ObjectKind::Array(items) = &self.kind {
            keys.extend((0..items.len()).map(|i| i.to_string()));
        }
        keys.extend(self.props.iter().map(|(k, _)| k.clone()));
        keys
    }

    /// Own data properties, in key order
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.keys()
            .into_iter()
            .filter_map(|k| self.get_own(&k).map(|v| (k, v)))
            .collect()
    }

    pub fn callable(&self) -> Option<&Callable> {
        match &self.kind {
            ObjectKind::Function(callable) => Some(callable),
            _ => None,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ObjectKind::Plain => write!(f, "[object Object {:?}]", self.keys()),
            ObjectKind::Array(items) => write!(f, "[object Array({})]", items.len()),
            ObjectKind::Function(callable) => write!(f, "[function {}]", callable.name()),
            ObjectKind::Error => write!(f, "[object Error {:?}]", self.get_own("message")),
        }
    }
}

/// Walk `obj` and its prototypes looking for `key`
pub fn find_slot(obj: &ObjectRef, key: &str) -> Option<Slot> {
    let mut current = Some(obj.clone());
    while let Some(o) = current {
        let o = o.borrow();
        if let Some(slot) = o.own(key) {
            return Some(slot);
        }
        current = o.proto.clone();
    }
    None
}

/// `key in obj` semantics
pub fn has_property(obj: &ObjectRef, key: &str) -> bool {
    find_slot(obj, key).is_some()
}
