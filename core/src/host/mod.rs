//! Host engine: executes instrumented trees
//!
//! The rewriter has already resolved every variable reference and baked a
//! position index into every recorded operation, so evaluation here is a
//! plain recursive walk that keeps the bookkeeping as it goes: results land
//! in the function's cache, `last` tracks the most recently marked index and
//! the boundary of every call appends frame info to an unwind passing through.

mod expressions;
mod statements;

#[cfg(test)]
mod tests;

use std::rc::Rc;

use tracing::trace;

use crate::registry::RegistryHandle;
use crate::rewriter::{IFunction, IRef};
use crate::runtime::scope::{new_cache, new_record, Cache, Chain, Link};
use crate::runtime::{Pending, Runtime, Value};
use crate::stack::{Completion, FrameInfo};

/// Instrumented function paired with the chain it closes over
#[derive(Debug)]
pub struct HostClosure {
    pub func: Rc<IFunction>,
    /// Lexical parent; `None` for top-level code
    pub chain: Option<Chain>,
    pub registry: RegistryHandle,
}

/// How a statement finished
#[derive(Debug, Clone)]
pub(crate) enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

impl From<&Completion<Flow>> for Pending {
    fn from(result: &Completion<Flow>) -> Self {
        match result {
            Ok(Flow::Normal) => Pending::Normal,
            Ok(Flow::Return(value)) => Pending::Return(value.clone()),
            Ok(Flow::Break) => Pending::Break,
            Ok(Flow::Continue) => Pending::Continue,
            Err(unwind) => Pending::Throw(unwind.thrown().cloned().unwrap_or(Value::Undefined)),
        }
    }
}

/// Call an instrumented closure.
///
/// `callee` is the function value itself, bound to the self name of named
/// function expressions.
pub fn call_closure(
    rt: &mut Runtime,
    closure: &Rc<HostClosure>,
    callee: &Value,
    this: Value,
    args: Vec<Value>,
) -> Completion<Value> {
    let func = closure.func.clone();
    let cache = new_cache();
    let record = new_record();
    {
        let mut r = record.borrow_mut();
        for (i, param) in func.params.iter().enumerate() {
            r.set_own(param, args.get(i).cloned().unwrap_or(Value::Undefined));
        }
        for name in &func.declared {
            if !r.has_own(name) {
                r.set_own(name, Value::Undefined);
            }
        }
        if let Some(name) = &func.self_name {
            if !r.has_own(name) {
                r.set_own(name, callee.clone());
            }
        }
    }

    let mut act = Activation {
        func: func.clone(),
        chain: Link::function(record, cache.clone(), closure.chain.clone()),
        cache,
        last: func.index,
        this,
        args,
        arguments: None,
        registry: closure.registry.clone(),
    };

    match act.run(rt) {
        Ok(value) => Ok(value),
        Err(mut unwind) => {
            trace!(
                namespace = %func.namespace,
                index = func.index,
                last = act.last,
                "storing frame info"
            );
            unwind.store_frame_info(FrameInfo {
                this: act.this,
                args: act.args,
                chain: act.chain,
                last: act.last,
                namespace: func.namespace.clone(),
                index: func.index,
                registry: act.registry,
            });
            Err(unwind)
        }
    }
}

/* ===================== Activation ===================== */

/// State of one running instrumented function
pub(crate) struct Activation {
    func: Rc<IFunction>,
    /// Innermost link; catch and with blocks push onto it
    chain: Chain,
    cache: Cache,
    last: usize,
    this: Value,
    args: Vec<Value>,
    /// `arguments` object, created on first use
    arguments: Option<Value>,
    registry: RegistryHandle,
}

impl Activation {
    fn run(&mut self, rt: &mut Runtime) -> Completion<Value> {
        let func = self.func.clone();
        for (name, value) in &func.hoisted {
            let value = self.eval(rt, value)?;
            self.chain.record.borrow_mut().set_own(name, value);
        }
        match self.exec_block(rt, &func.body)? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Undefined),
        }
    }

    fn record(&mut self, index: usize, value: &Value) {
        self.cache.borrow_mut().insert(index, value.clone());
    }

    fn mark(&mut self, index: usize) {
        self.last = index;
    }

    /// Mark an operation that records after it runs, dropping the result of
    /// any earlier pass so an unwind from inside it is not taken as finished
    fn mark_pending(&mut self, index: usize) {
        self.cache.borrow_mut().remove(&index);
        self.last = index;
    }

    fn arguments_object(&mut self, rt: &Runtime) -> Value {
        if let Some(value) = &self.arguments {
            return value.clone();
        }
        let value = rt.new_array(self.args.clone());
        self.arguments = Some(value.clone());
        value
    }

    /* ===================== References ===================== */

    fn read(&mut self, rt: &mut Runtime, r: &IRef) -> Completion<Value> {
        match r {
            IRef::Slot { hops, name } => match self.chain.ancestor(*hops) {
                Some(link) => rt.get(&Value::Object(link.record.clone()), name),
                None => rt.read_global(name),
            },
            IRef::Global(name) => rt.read_global(name),
            IRef::Dynamic {
                withs,
                name,
                fallback,
            } => match self.with_override(withs, name) {
                Some(link) => rt.get(&Value::Object(link.record.clone()), name),
                None => self.read(rt, fallback),
            },
            IRef::Free(name) => match self.chain.find(name) {
                Some(link) => rt.get(&Value::Object(link.record.clone()), name),
                None => rt.read_global(name),
            },
        }
    }

    fn write(&mut self, rt: &mut Runtime, r: &IRef, value: Value) -> Completion<()> {
        match r {
            IRef::Slot { hops, name } => match self.chain.ancestor(*hops) {
                Some(link) => rt.put(&Value::Object(link.record.clone()), name, value),
                None => rt.write_global(name, value),
            },
            IRef::Global(name) => rt.write_global(name, value),
            IRef::Dynamic {
                withs,
                name,
                fallback,
            } => match self.with_override(withs, name) {
                Some(link) => rt.put(&Value::Object(link.record.clone()), name, value),
                None => self.write(rt, fallback, value),
            },
            IRef::Free(name) => match self.chain.find(name) {
                Some(link) => rt.put(&Value::Object(link.record.clone()), name, value),
                None => rt.write_global(name, value),
            },
        }
    }

    /// Whether a reference resolves to anything, for `typeof`
    fn resolvable(&self, rt: &Runtime, r: &IRef) -> bool {
        match r {
            IRef::Slot { .. } => true,
            IRef::Global(name) => rt.has_global(name),
            IRef::Dynamic {
                withs,
                name,
                fallback,
            } => self.with_override(withs, name).is_some() || self.resolvable(rt, fallback),
            IRef::Free(name) => self.chain.find(name).is_some() || rt.has_global(name),
        }
    }

    /// Innermost `with` record among `withs` that has `name`
    fn with_override(&self, withs: &[usize], name: &str) -> Option<Chain> {
        withs
            .iter()
            .filter_map(|hops| self.chain.ancestor(*hops))
            .find(|link| link.binds(name))
    }
}
