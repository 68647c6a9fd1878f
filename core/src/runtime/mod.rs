//! Script runtime
//!
//! Owns the global environment and the intrinsic prototypes, implements the
//! object model operations both evaluators share (property access, calls,
//! construction, operators), and provides the top-level drivers that turn
//! an unwind into an `Outcome`.

pub mod builtins;
pub mod ops;
mod prelude;
pub mod scope;
pub mod value;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::ReifyError;
use crate::host::{self, HostClosure};
use crate::interpreter::{self, HaltHook, Mode};
use crate::registry::{AstRegistry, RegistryHandle};
use crate::rewriter::{self, IFunction};
use crate::stack::{Completion, Outcome, Unwind};
use crate::syntax::ast::{BinaryOp, Function, Program, Stmt, UnaryOp};

pub use value::{Callable, NativeFn, Object, ObjectKind, ObjectRef, Slot, Value};

use scope::{new_cache, Link};
use value::{find_slot, has_property};

/// Namespace the debug-aware built-ins are instrumented in
pub const BUILTINS_NAMESPACE: &str = "[builtins]";

/// Array methods replaced by instrumented versions while debug support is on
pub const DEBUG_METHODS: [&str; 4] = ["forEach", "map", "filter", "reduce"];

/* ===================== Errors ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Error,
    Type,
    Reference,
    Range,
    Syntax,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::Type => "TypeError",
            ErrorKind::Reference => "ReferenceError",
            ErrorKind::Range => "RangeError",
            ErrorKind::Syntax => "SyntaxError",
        }
    }

    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Error,
        ErrorKind::Type,
        ErrorKind::Reference,
        ErrorKind::Range,
        ErrorKind::Syntax,
    ];
}

/* ===================== Intrinsics ===================== */

/// Prototypes every runtime object ultimately inherits from
#[derive(Debug)]
pub(crate) struct Intrinsics {
    pub object: ObjectRef,
    pub function: ObjectRef,
    pub array: ObjectRef,
    pub string: ObjectRef,
    pub number: ObjectRef,
    pub errors: HashMap<ErrorKind, ObjectRef>,
}

impl Intrinsics {
    fn new() -> Self {
        let object = Object::new(ObjectKind::Plain, None).into_ref();
        let child = || Object::new(ObjectKind::Plain, Some(object.clone())).into_ref();
        let function = child();
        let array = child();
        let string = child();
        let number = child();
        let base_error = child();
        let mut errors = HashMap::new();
        for kind in ErrorKind::ALL {
            let proto = match kind {
                ErrorKind::Error => base_error.clone(),
                _ => Object::new(ObjectKind::Plain, Some(base_error.clone())).into_ref(),
            };
            errors.insert(kind, proto);
        }
        Intrinsics {
            object,
            function,
            array,
            string,
            number,
            errors,
        }
    }

    fn contains(&self, obj: &ObjectRef) -> bool {
        [&self.object, &self.function, &self.array, &self.string, &self.number]
            .into_iter()
            .chain(self.errors.values())
            .any(|p| Rc::ptr_eq(p, obj))
    }
}

/* ===================== Runtime ===================== */

pub struct Runtime {
    global: ObjectRef,
    pub(crate) intrinsics: Intrinsics,
    config: Config,
    debugging: bool,
    debug_builtins: bool,
    debug_methods: Option<HashMap<&'static str, Value>>,
    builtins_registry: RegistryHandle,
    registry: RegistryHandle,
    depth: usize,
    output: Vec<String>,
    halt_hook: Option<Box<dyn HaltHook>>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Runtime {
    pub fn new(config: Config) -> Self {
        let intrinsics = Intrinsics::new();
        let global = Object::new(ObjectKind::Plain, Some(intrinsics.object.clone())).into_ref();
        let mut rt = Runtime {
            global,
            intrinsics,
            config,
            debugging: false,
            debug_builtins: false,
            debug_methods: None,
            builtins_registry: AstRegistry::handle(),
            registry: AstRegistry::handle(),
            depth: 0,
            output: Vec::new(),
            halt_hook: None,
        };
        builtins::install(&mut rt);
        rt
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn global(&self) -> &ObjectRef {
        &self.global
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.global.borrow_mut().set_own(name, value);
    }

    pub fn global_value(&self, name: &str) -> Option<Value> {
        match find_slot(&self.global, name)? {
            Slot::Data(value) => Some(value),
            Slot::Accessor { .. } => None,
        }
    }

    pub fn has_global(&self, name: &str) -> bool {
        has_property(&self.global, name)
    }

    /// Read a global, throwing a ReferenceError when it does not exist
    pub fn read_global(&mut self, name: &str) -> Completion<Value> {
        if !self.has_global(name) {
            return Err(self.error(ErrorKind::Reference, format!("{} is not defined", name)));
        }
        let global = Value::Object(self.global.clone());
        self.get(&global, name)
    }

    pub fn write_global(&mut self, name: &str, value: Value) -> Completion<()> {
        let global = Value::Object(self.global.clone());
        self.put(&global, name, value)
    }

    /// Whether `debugger` statements and halt hooks may pause execution
    pub fn is_debugging(&self) -> bool {
        self.debugging
    }

    pub fn set_debugging(&mut self, enabled: bool) {
        self.debugging = enabled;
    }

    /// Captured `console.log` lines
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    pub(crate) fn log_line(&mut self, line: String) {
        info!(target: "reify::console", "{}", line);
        self.output.push(line);
    }

    /// Install a halt hook, returning the previous one
    pub fn set_halt_hook(&mut self, hook: Option<Box<dyn HaltHook>>) -> Option<Box<dyn HaltHook>> {
        std::mem::replace(&mut self.halt_hook, hook)
    }

    pub(crate) fn should_halt(&mut self, namespace: &str, index: usize, stmt: &Stmt) -> bool {
        if !self.debugging {
            return false;
        }
        match self.halt_hook.as_mut() {
            Some(hook) => hook.should_halt(namespace, index, stmt),
            None => false,
        }
    }

    /* ===================== Registry & Debug Support ===================== */

    /// The active registry
    pub fn registry(&self) -> RegistryHandle {
        self.registry.clone()
    }

    /// Run `f` with `registry` active, restoring the previous one afterwards
    pub fn with_registry<T>(
        &mut self,
        registry: &RegistryHandle,
        f: impl FnOnce(&mut Runtime) -> T,
    ) -> T {
        let previous = std::mem::replace(&mut self.registry, registry.clone());
        let mut scope = Restore {
            rt: self,
            registry: Some(previous),
            debug: None,
        };
        f(&mut *scope)
    }

    /// Run `f` with debugging and the configured debug-aware built-ins
    /// enabled, restoring the previous state afterwards
    pub fn with_debug_support<T>(
        &mut self,
        f: impl FnOnce(&mut Runtime) -> Result<T, ReifyError>,
    ) -> Result<T, ReifyError> {
        if self.config.debug_builtins && self.debug_methods.is_none() {
            self.debug_methods = Some(self.compile_debug_methods()?);
        }
        let previous = (self.debugging, self.debug_builtins);
        self.debugging = self.config.debugging_enabled;
        self.debug_builtins = self.config.debug_builtins;
        debug!(
            debugging = self.debugging,
            debug_builtins = self.debug_builtins,
            "debug support enabled"
        );
        let mut scope = Restore {
            rt: self,
            registry: None,
            debug: Some(previous),
        };
        f(&mut *scope)
    }

    fn compile_debug_methods(&mut self) -> Result<HashMap<&'static str, Value>, ReifyError> {
        let program = crate::syntax::parse_program(prelude::SOURCE)?;
        let registry = self.builtins_registry.clone();
        let mut methods = HashMap::new();
        for stmt in &program.body {
            let Stmt::FunctionDecl { func } = stmt else {
                continue;
            };
            let Some(name) = DEBUG_METHODS
                .iter()
                .find(|m| func.name.as_deref() == Some(**m))
            else {
                continue;
            };
            let compiled = rewriter::rewrite(func, &registry, BUILTINS_NAMESPACE, &[])?;
            let closure = HostClosure {
                func: compiled,
                chain: None,
                registry: registry.clone(),
            };
            methods.insert(*name, self.new_function(Callable::Host(Rc::new(closure))));
        }
        debug!(count = methods.len(), "compiled debug built-ins");
        Ok(methods)
    }

    fn debug_method(&self, key: &str) -> Option<Value> {
        if !self.debug_builtins {
            return None;
        }
        self.debug_methods.as_ref()?.get(key).cloned()
    }

    /* ===================== Drivers ===================== */

    /// Instrument `func` against `registry` in the configured namespace
    pub fn compile(
        &mut self,
        func: &Function,
        registry: &RegistryHandle,
        inherited: &[String],
    ) -> Result<Rc<IFunction>, ReifyError> {
        let namespace = self.config.namespace.clone();
        self.with_registry(registry, |rt| {
            Ok(rewriter::rewrite(func, &rt.registry(), &namespace, inherited)?)
        })
    }

    pub fn compile_program(
        &mut self,
        program: &Program,
        registry: &RegistryHandle,
    ) -> Result<Rc<IFunction>, ReifyError> {
        let namespace = self.config.namespace.clone();
        self.with_registry(registry, |rt| {
            Ok(rewriter::rewrite_program(program, &rt.registry(), &namespace)?)
        })
    }

    /// Instrument and run `func`.
    ///
    /// `bindings` becomes the function's lexical parent record, so its
    /// properties are visible as variables.
    pub fn run(
        &mut self,
        func: &Function,
        registry: &RegistryHandle,
        args: Vec<Value>,
        bindings: Option<&ObjectRef>,
    ) -> Result<Outcome, ReifyError> {
        let inherited = bindings.map(|b| b.borrow().keys()).unwrap_or_default();
        let compiled = self.compile(func, registry, &inherited)?;
        let chain = bindings.map(|b| Link::function(b.clone(), new_cache(), None));
        let closure = self.host_closure(compiled, chain, registry);
        self.run_closure(&closure, Value::Undefined, args)
    }

    /// Instrument and run a whole program
    pub fn run_program(
        &mut self,
        program: &Program,
        registry: &RegistryHandle,
    ) -> Result<Outcome, ReifyError> {
        let compiled = self.compile_program(program, registry)?;
        let closure = self.host_closure(compiled, None, registry);
        self.run_closure(&closure, Value::Undefined, vec![])
    }

    /// Wrap an instrumented function as a callable value
    pub fn host_closure(
        &self,
        func: Rc<IFunction>,
        chain: Option<scope::Chain>,
        registry: &RegistryHandle,
    ) -> Value {
        self.new_function(Callable::Host(Rc::new(HostClosure {
            func,
            chain,
            registry: registry.clone(),
        })))
    }

    /// Call an already created closure with debug support enabled
    pub fn run_closure(
        &mut self,
        callee: &Value,
        this: Value,
        args: Vec<Value>,
    ) -> Result<Outcome, ReifyError> {
        self.with_debug_support(|rt| {
            Ok(match rt.call(callee, this, args) {
                Ok(value) => Outcome::Completed(value),
                Err(unwind) => Outcome::from_unwind(*unwind),
            })
        })
    }

    /// Run a program through the stepping interpreter
    pub fn interpret(
        &mut self,
        program: &Program,
        registry: &RegistryHandle,
        mode: Mode,
    ) -> Result<Outcome, ReifyError> {
        let namespace = self.config.namespace.clone();
        self.with_debug_support(|rt| {
            Ok(
                match interpreter::run_program(rt, program, registry, &namespace, mode) {
                    Ok(value) => Outcome::Completed(value),
                    Err(unwind) => Outcome::from_unwind(*unwind),
                },
            )
        })
    }

    /* ===================== Object Creation ===================== */

    pub fn new_object(&self) -> ObjectRef {
        Object::new(ObjectKind::Plain, Some(self.intrinsics.object.clone())).into_ref()
    }

    pub fn new_array(&self, items: Vec<Value>) -> Value {
        Value::Object(
            Object::new(ObjectKind::Array(items), Some(self.intrinsics.array.clone())).into_ref(),
        )
    }

    pub fn new_function(&self, callable: Callable) -> Value {
        Value::Object(
            Object::new(
                ObjectKind::Function(callable),
                Some(self.intrinsics.function.clone()),
            )
            .into_ref(),
        )
    }

    pub fn native(&self, name: &'static str, func: NativeFn) -> Value {
        self.new_function(Callable::Native { name, func })
    }

    pub fn new_error(&self, kind: ErrorKind, message: impl Into<String>) -> Value {
        let proto = self.intrinsics.errors.get(&kind).cloned();
        let mut obj = Object::new(ObjectKind::Error, proto);
        obj.set_own("message", Value::Str(message.into()));
        Value::Object(obj.into_ref())
    }

    /// An unwind carrying a fresh error object
    pub fn error(&self, kind: ErrorKind, message: impl Into<String>) -> Box<Unwind> {
        Unwind::error(self.new_error(kind, message))
    }

    pub fn type_error(&self, message: impl Into<String>) -> Box<Unwind> {
        self.error(ErrorKind::Type, message)
    }

    /* ===================== Property Access ===================== */

    pub fn get(&mut self, target: &Value, key: &str) -> Completion<Value> {
        let obj = match target {
            Value::Undefined | Value::Null => {
                return Err(self.type_error(format!(
                    "Cannot read property '{}' of {}",
                    key,
                    ops::to_string(target)
                )))
            }
            Value::Str(s) => {
                if key == "length" {
                    return Ok(Value::Num(s.chars().count() as f64));
                }
                if let Some(i) = value::array_index(key) {
                    return Ok(s
                        .chars()
                        .nth(i)
                        .map(|c| Value::Str(c.to_string()))
                        .unwrap_or(Value::Undefined));
                }
                self.intrinsics.string.clone()
            }
            Value::Num(_) => self.intrinsics.number.clone(),
            Value::Bool(_) => self.intrinsics.object.clone(),
            Value::Object(obj) => {
                if DEBUG_METHODS.contains(&key) && obj.borrow().is_array() {
                    if let Some(method) = self.debug_method(key) {
                        return Ok(method);
                    }
                }
                if key == "prototype" {
                    return Ok(self.prototype_of(obj));
                }
                obj.clone()
            }
        };
        match find_slot(&obj, key) {
            Some(Slot::Data(value)) => Ok(value),
            Some(Slot::Accessor { get: Some(getter), .. }) => self.call(&getter, target.clone(), vec![]),
            Some(Slot::Accessor { get: None, .. }) | None => Ok(Value::Undefined),
        }
    }

    /// `prototype` of a function, created on first use
    fn prototype_of(&self, obj: &ObjectRef) -> Value {
        if let Some(slot) = find_slot(obj, "prototype") {
            if let Slot::Data(value) = slot {
                return value;
            }
            return Value::Undefined;
        }
        if obj.borrow().callable().is_none() {
            return Value::Undefined;
        }
        let proto = Value::Object(self.new_object());
        obj.borrow_mut().set_own("prototype", proto.clone());
        proto
    }

    pub fn put(&mut self, target: &Value, key: &str, value: Value) -> Completion<()> {
        let obj = match target {
            Value::Object(obj) => obj.clone(),
            Value::Undefined | Value::Null => {
                return Err(self.type_error(format!(
                    "Cannot set property '{}' of {}",
                    key,
                    ops::to_string(target)
                )))
            }
            // Writes to primitives are dropped
            _ => return Ok(()),
        };
        match find_slot(&obj, key) {
            Some(Slot::Accessor { set: Some(setter), .. }) => {
                self.call(&setter, target.clone(), vec![value])?;
            }
            Some(Slot::Accessor { set: None, .. }) => {}
            _ => obj.borrow_mut().set_own(key, value),
        }
        Ok(())
    }

    pub fn delete(&mut self, target: &Value, key: &str) -> Completion<bool> {
        match target {
            Value::Object(obj) => {
                obj.borrow_mut().remove(key);
                Ok(true)
            }
            Value::Undefined | Value::Null => Err(self.type_error(format!(
                "Cannot delete property '{}' of {}",
                key,
                ops::to_string(target)
            ))),
            _ => Ok(true),
        }
    }

    /// Keys a `for-in` loop visits: own keys, then inherited ones from
    /// script-created prototypes
    pub fn enumerate(&self, target: &Value) -> Vec<String> {
        match target {
            Value::Str(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
            Value::Object(obj) => {
                let mut keys: Vec<String> = Vec::new();
                let mut current = Some(obj.clone());
                while let Some(o) = current {
                    if self.intrinsics.contains(&o) {
                        break;
                    }
                    let o = o.borrow();
                    for key in o.keys() {
                        if !keys.contains(&key) {
                            keys.push(key);
                        }
                    }
                    current = o.proto.clone();
                }
                keys
            }
            _ => Vec::new(),
        }
    }

    /* ===================== Operators ===================== */

    pub fn unary(&self, op: UnaryOp, value: &Value) -> Value {
        match op {
            UnaryOp::Neg => Value::Num(-ops::to_number(value)),
            UnaryOp::Plus => Value::Num(ops::to_number(value)),
            UnaryOp::Not => Value::Bool(!value.truthy()),
            UnaryOp::BitNot => Value::Num(!ops::to_int32(value) as f64),
            UnaryOp::Typeof => Value::str(value.type_of()),
            UnaryOp::Void => Value::Undefined,
            UnaryOp::Delete => Value::Bool(true),
        }
    }

    pub fn binary(&mut self, op: BinaryOp, left: &Value, right: &Value) -> Completion<Value> {
        if let Some(value) = ops::binary(op, left, right) {
            return Ok(value);
        }
        match op {
            BinaryOp::In => match right {
                Value::Object(obj) => Ok(Value::Bool(has_property(obj, &ops::to_string(left)))),
                _ => Err(self.type_error(format!(
                    "Cannot use 'in' operator to search for '{}' in {}",
                    ops::to_string(left),
                    ops::to_string(right)
                ))),
            },
            _ => Ok(Value::Bool(self.instance_of(left, right)?)),
        }
    }

    pub fn instance_of(&mut self, value: &Value, ctor: &Value) -> Completion<bool> {
        if !ctor.is_callable() {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        }
        let Value::Object(obj) = value else {
            return Ok(false);
        };
        let Value::Object(proto) = self.get(ctor, "prototype")? else {
            return Ok(false);
        };
        let mut current = obj.borrow().proto.clone();
        while let Some(p) = current {
            if Rc::ptr_eq(&p, &proto) {
                return Ok(true);
            }
            current = p.borrow().proto.clone();
        }
        Ok(false)
    }

    /* ===================== Calls ===================== */

    pub fn call(&mut self, func: &Value, this: Value, args: Vec<Value>) -> Completion<Value> {
        let callable = func.as_object().and_then(|o| o.borrow().callable().cloned());
        let Some(callable) = callable else {
            return Err(self.type_error(format!("{} is not a function", ops::inspect(func))));
        };
        self.enter()?;
        let result = match callable {
            Callable::Native { func: native, .. } => native(self, this, args),
            Callable::Host(closure) => host::call_closure(self, &closure, func, this, args),
            Callable::Interpreted(closure) => {
                interpreter::call_closure(self, &closure, func, this, args)
            }
        };
        self.leave();
        result
    }

    pub fn construct(&mut self, func: &Value, args: Vec<Value>) -> Completion<Value> {
        let native = match func.as_object().and_then(|o| o.borrow().callable().cloned()) {
            Some(callable) => matches!(callable, Callable::Native { .. }),
            None => {
                return Err(self.type_error(format!(
                    "{} is not a constructor",
                    ops::inspect(func)
                )))
            }
        };
        if native {
            return self.call(func, Value::Undefined, args);
        }
        let proto = match self.get(func, "prototype")? {
            Value::Object(proto) => proto,
            _ => self.intrinsics.object.clone(),
        };
        let instance = Value::Object(Object::new(ObjectKind::Plain, Some(proto)).into_ref());
        match self.call(func, instance.clone(), args)? {
            result @ Value::Object(_) => Ok(result),
            _ => Ok(instance),
        }
    }

    pub(crate) fn enter(&mut self) -> Completion<()> {
        if self.depth >= self.config.max_call_depth {
            return Err(self.error(ErrorKind::Range, "Maximum call stack size exceeded"));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /* ===================== JSON ===================== */

    pub fn from_json(&self, json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Num(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                self.new_array(items.iter().map(|v| self.from_json(v)).collect())
            }
            serde_json::Value::Object(map) => {
                let obj = self.new_object();
                for (key, value) in map {
                    let value = self.from_json(value);
                    obj.borrow_mut().set_own(key, value);
                }
                Value::Object(obj)
            }
        }
    }

    pub fn to_json(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Num(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Object(obj) => {
                let o = obj.borrow();
                match &o.kind {
                    ObjectKind::Array(items) => {
                        serde_json::Value::Array(items.iter().map(|v| self.to_json(v)).collect())
                    }
                    ObjectKind::Function(_) => serde_json::Value::Null,
                    _ => serde_json::Value::Object(
                        o.entries()
                            .iter()
                            .map(|(k, v)| (k.clone(), self.to_json(v)))
                            .collect(),
                    ),
                }
            }
        }
    }
}

/* ===================== Scoped State ===================== */

/// Puts saved runtime state back when dropped, unwinding included
struct Restore<'a> {
    rt: &'a mut Runtime,
    registry: Option<RegistryHandle>,
    /// `(debugging, debug_builtins)`
    debug: Option<(bool, bool)>,
}

impl Deref for Restore<'_> {
    type Target = Runtime;

    fn deref(&self) -> &Runtime {
        self.rt
    }
}

impl DerefMut for Restore<'_> {
    fn deref_mut(&mut self) -> &mut Runtime {
        self.rt
    }
}

impl Drop for Restore<'_> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.take() {
            self.rt.registry = registry;
        }
        if let Some((debugging, debug_builtins)) = self.debug.take() {
            self.rt.debugging = debugging;
            self.rt.debug_builtins = debug_builtins;
        }
    }
}

/* ===================== Key Queues ===================== */

/// Current key of a for-in key queue
pub(crate) fn queue_front(queue: &Value) -> Option<Value> {
    let obj = queue.as_object()?;
    let o = obj.borrow();
    o.elements()?.first().cloned()
}

/// Drop the current key of a for-in key queue
pub(crate) fn queue_shift(queue: &Value) {
    if let Some(obj) = queue.as_object() {
        if let Some(items) = obj.borrow_mut().elements_mut() {
            if !items.is_empty() {
                items.remove(0);
            }
        }
    }
}

/* ===================== Pending Completions ===================== */

/// How a `try` block (or its handler) finished, held while `finally` runs
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Pending {
    Normal,
    Return(Value),
    Break,
    Continue,
    Throw(Value),
}

impl Pending {
    /// Encode as a two-element array so it can sit in a frame cache
    pub(crate) fn to_value(&self, rt: &Runtime) -> Value {
        let (tag, value) = match self {
            Pending::Normal => ("normal", Value::Undefined),
            Pending::Return(value) => ("return", value.clone()),
            Pending::Break => ("break", Value::Undefined),
            Pending::Continue => ("continue", Value::Undefined),
            Pending::Throw(value) => ("throw", value.clone()),
        };
        rt.new_array(vec![Value::Str(tag.to_string()), value])
    }

    pub(crate) fn from_value(encoded: &Value) -> Option<Pending> {
        let obj = encoded.as_object()?;
        let o = obj.borrow();
        let [Value::Str(tag), value] = o.elements()?.as_slice() else {
            return None;
        };
        match tag.as_str() {
            "normal" => Some(Pending::Normal),
            "return" => Some(Pending::Return(value.clone())),
            "break" => Some(Pending::Break),
            "continue" => Some(Pending::Continue),
            "throw" => Some(Pending::Throw(value.clone())),
            _ => None,
        }
    }
}
