//! Stepping interpreter
//!
//! Walks source trees directly, using the same frame and scope model as the
//! host engine. In `Recording` mode it keeps identical bookkeeping (results
//! cache, last position, frame info at every boundary), which is what lets a
//! reconstructed frame be resumed here: the walker replays the path from the
//! function entry down to the saved position, taking finished results from
//! the cache and re-entering pending `catch`/`with` links, then carries on
//! executing normally.
//!
//! `Plain` mode runs code uninstrumented. It backs escape-hatch functions and
//! serves as the reference semantics the host engine is checked against.

mod expressions;
mod statements;

#[cfg(test)]
mod tests;

use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::registry::{IndexedTree, RegistryHandle};
use crate::runtime::scope::{new_cache, new_record, Cache, Chain, Link};
use crate::runtime::{Callable, ErrorKind, Pending, Runtime, Value};
use crate::stack::{Completion, Frame, FrameInfo, Unwind};
use crate::syntax::ast::{Expr, Function, Program, Stmt};
use crate::syntax::walk::NodeRef;

/* ===================== Closures ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Keep the results cache and frame info, like instrumented code
    Recording,
    /// No bookkeeping; `debugger` is a no-op
    Plain,
}

/// A function value whose body the interpreter walks
#[derive(Debug)]
pub struct InterpretedClosure {
    pub tree: Rc<IndexedTree>,
    /// Index of the function node
    pub index: usize,
    pub chain: Option<Chain>,
    pub mode: Mode,
    pub registry: RegistryHandle,
}

impl InterpretedClosure {
    pub fn name(&self) -> Option<String> {
        self.tree.function(self.index).and_then(|f| f.name.clone())
    }
}

/* ===================== Halt Hooks ===================== */

/// Consulted before each statement while debugging is enabled
pub trait HaltHook {
    /// Return true to pause before the statement at `index` runs
    fn should_halt(&mut self, namespace: &str, index: usize, stmt: &Stmt) -> bool;
}

/// Halt at fixed (namespace, index) positions
#[derive(Debug, Clone, Default)]
pub struct Breakpoints {
    points: HashSet<(String, usize)>,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, namespace: &str, index: usize) {
        self.points.insert((namespace.to_string(), index));
    }

    pub fn remove(&mut self, namespace: &str, index: usize) -> bool {
        self.points.remove(&(namespace.to_string(), index))
    }

    pub fn contains(&self, namespace: &str, index: usize) -> bool {
        self.points.contains(&(namespace.to_string(), index))
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl HaltHook for Breakpoints {
    fn should_halt(&mut self, namespace: &str, index: usize, _stmt: &Stmt) -> bool {
        self.contains(namespace, index)
    }
}

/// Halt before the next statement, once
#[derive(Debug, Clone)]
pub struct StepOnce {
    armed: bool,
}

impl StepOnce {
    pub fn new() -> Self {
        StepOnce { armed: true }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl Default for StepOnce {
    fn default() -> Self {
        Self::new()
    }
}

impl HaltHook for StepOnce {
    fn should_halt(&mut self, _namespace: &str, _index: usize, _stmt: &Stmt) -> bool {
        std::mem::replace(&mut self.armed, false)
    }
}

/* ===================== Entry Points ===================== */

/// Call an interpreted closure
pub fn call_closure(
    rt: &mut Runtime,
    closure: &Rc<InterpretedClosure>,
    callee: &Value,
    this: Value,
    args: Vec<Value>,
) -> Completion<Value> {
    let tree = closure.tree.clone();
    let index = closure.index;
    let Some(func) = tree.function(index) else {
        return Err(rt.error(
            ErrorKind::Reference,
            format!("no function at index {} in '{}'", index, tree.namespace()),
        ));
    };
    let decls = tree.declarations(index).unwrap_or_default();

    let record = new_record();
    {
        let mut r = record.borrow_mut();
        for (i, param) in func.params.iter().enumerate() {
            r.set_own(param, args.get(i).cloned().unwrap_or(Value::Undefined));
        }
        for name in &decls.vars {
            if !r.has_own(name) {
                r.set_own(name, Value::Undefined);
            }
        }
        if let (Some(NodeRef::Expr(Expr::Function { .. })), Some(name)) = (tree.node(index), &func.name) {
            if !r.has_own(name) && !decls.functions.iter().any(|(n, _)| n == name) {
                r.set_own(name, callee.clone());
            }
        }
    }

    let cache = new_cache();
    let mut walker = Walker {
        tree: tree.clone(),
        func_index: index,
        mode: closure.mode,
        chain: Link::function(record.clone(), cache.clone(), closure.chain.clone()),
        pending: VecDeque::new(),
        cache,
        last: index,
        this,
        args,
        arguments: None,
        pc: None,
        registry: closure.registry.clone(),
    };

    for (name, at) in &decls.functions {
        let Some(decl) = tree.function(*at) else {
            continue;
        };
        let value = walker.make_closure(rt, decl, *at);
        walker.record(*at, &value);
        record.borrow_mut().set_own(name, value);
    }

    let result = walker.exec_list(rt, &func.body, index + 1);
    walker.finish(result)
}

/// Resume a reconstructed frame from its saved position.
///
/// The caller seeds the frame's cache at `pc` with the value the frame was
/// waiting on.
pub fn run_from_pc(rt: &mut Runtime, frame: Frame) -> Completion<Value> {
    let Some(origin) = frame.origin.clone() else {
        return Err(rt.error(ErrorKind::Error, "frame has no AST"));
    };
    let tree = origin.tree.clone();
    let Some(func) = tree.function(origin.index) else {
        return Err(rt.error(ErrorKind::Error, "frame origin is not a function"));
    };
    let registry = frame.registry.clone().unwrap_or_else(|| rt.registry());
    debug!(
        namespace = tree.namespace(),
        index = origin.index,
        pc = ?frame.pc,
        pending = frame.pending.len(),
        "resuming frame"
    );

    let mut walker = Walker {
        tree: tree.clone(),
        func_index: origin.index,
        mode: Mode::Recording,
        chain: frame.scope.clone(),
        pending: frame.pending.into_iter().collect(),
        cache: frame.cache.clone(),
        last: frame.pc.unwrap_or(origin.index),
        this: frame.this,
        args: frame.arguments,
        arguments: None,
        pc: frame.pc,
        registry,
    };

    rt.enter()?;
    let result = walker.exec_list(rt, &func.body, origin.index + 1);
    rt.leave();
    walker.finish(result)
}

/// Register `program` and run it as a parameterless function
pub fn run_program(
    rt: &mut Runtime,
    program: &Program,
    registry: &RegistryHandle,
    namespace: &str,
    mode: Mode,
) -> Completion<Value> {
    let root = Function {
        name: None,
        params: vec![],
        body: program.body.clone(),
    };
    let tree = registry.borrow_mut().assign(&root, namespace, true);
    let closure = InterpretedClosure {
        index: tree.base(),
        tree,
        chain: None,
        mode,
        registry: registry.clone(),
    };
    let callee = rt.new_function(Callable::Interpreted(Rc::new(closure)));
    rt.call(&callee, Value::Undefined, vec![])
}

/* ===================== Walker ===================== */

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

impl From<Pending> for Completion<Flow> {
    fn from(pending: Pending) -> Self {
        match pending {
            Pending::Normal => Ok(Flow::Normal),
            Pending::Return(value) => Ok(Flow::Return(value)),
            Pending::Break => Ok(Flow::Break),
            Pending::Continue => Ok(Flow::Continue),
            Pending::Throw(value) => Err(Unwind::error(value)),
        }
    }
}

/// Where a node sits relative to the position being resumed to
enum Resume {
    /// Not resuming; evaluate normally
    Fresh,
    /// The resume position itself, with its seeded result if any
    AtPc(Option<Value>),
    /// Finished before the pause, with its recorded result if any
    Before(Option<Value>),
    /// The resume position lies inside this node
    Enter(usize),
}

/// State of one running (or resuming) function activation
pub(crate) struct Walker {
    tree: Rc<IndexedTree>,
    func_index: usize,
    mode: Mode,
    chain: Chain,
    /// `catch`/`with` links still to be re-entered, outermost first
    pending: VecDeque<Chain>,
    cache: Cache,
    last: usize,
    this: Value,
    args: Vec<Value>,
    arguments: Option<Value>,
    /// Position still to be reached while replaying
    pc: Option<usize>,
    registry: RegistryHandle,
}

impl Walker {
    fn recording(&self) -> bool {
        self.mode == Mode::Recording
    }

    fn cached(&self, index: usize) -> Option<Value> {
        self.cache.borrow().get(&index).cloned()
    }

    fn record(&mut self, index: usize, value: &Value) {
        if self.recording() {
            self.cache.borrow_mut().insert(index, value.clone());
        }
    }

    fn mark(&mut self, index: usize) {
        if self.recording() {
            self.last = index;
        }
    }

    /// Mark an operation that records after it runs, dropping the result of
    /// any earlier pass so an unwind from inside it is not taken as finished
    fn mark_pending(&mut self, index: usize) {
        if self.recording() {
            self.cache.borrow_mut().remove(&index);
            self.last = index;
        }
    }

    fn resume_state(&mut self, index: usize) -> Resume {
        let Some(pc) = self.pc else {
            return Resume::Fresh;
        };
        if index == pc {
            self.pc = None;
            return Resume::AtPc(self.cached(index));
        }
        if self.tree.contains(index, pc) {
            return Resume::Enter(pc);
        }
        if index > pc {
            self.pc = None;
            return Resume::Fresh;
        }
        Resume::Before(self.cached(index))
    }

    /// Whether `index`'s subtree holds the resume position
    fn entering(&self, entry: Option<usize>, index: usize) -> bool {
        entry.is_some_and(|pc| self.tree.contains(index, pc))
    }

    fn arguments_object(&mut self, rt: &Runtime) -> Value {
        if let Some(value) = &self.arguments {
            return value.clone();
        }
        let value = rt.new_array(self.args.clone());
        self.arguments = Some(value.clone());
        value
    }

    fn make_closure(&self, rt: &Runtime, func: &Function, index: usize) -> Value {
        let escaped = func.name.as_deref().is_some_and(crate::rewriter::is_escaped);
        let (mode, chain) = if escaped {
            (Mode::Plain, None)
        } else {
            (self.mode, Some(self.chain.clone()))
        };
        rt.new_function(Callable::Interpreted(Rc::new(InterpretedClosure {
            tree: self.tree.clone(),
            index,
            chain,
            mode,
            registry: self.registry.clone(),
        })))
    }

    fn halt_check(&mut self, rt: &mut Runtime, stmt: &Stmt, index: usize) -> Completion<()> {
        if !self.recording()
            || matches!(stmt, Stmt::Block { .. } | Stmt::Empty | Stmt::FunctionDecl { .. })
        {
            return Ok(());
        }
        if rt.should_halt(self.tree.namespace(), index, stmt) {
            trace!(namespace = self.tree.namespace(), index, "halting");
            self.mark_pending(index);
            return Err(Unwind::pause(index));
        }
        Ok(())
    }

    /// Turn a body's flow into the call's result, storing frame info on the way out
    fn finish(self, result: Completion<Flow>) -> Completion<Value> {
        match result {
            Ok(Flow::Return(value)) => Ok(value),
            Ok(_) => Ok(Value::Undefined),
            Err(mut unwind) => {
                if self.mode == Mode::Recording {
                    trace!(
                        namespace = self.tree.namespace(),
                        index = self.func_index,
                        last = self.last,
                        "storing frame info"
                    );
                    unwind.store_frame_info(FrameInfo {
                        this: self.this,
                        args: self.args,
                        chain: self.chain,
                        last: self.last,
                        namespace: self.tree.namespace().to_string(),
                        index: self.func_index,
                        registry: self.registry,
                    });
                }
                Err(unwind)
            }
        }
    }

    /* ===================== Names ===================== */

    fn lookup(&mut self, rt: &mut Runtime, name: &str) -> Completion<Value> {
        if let Some(link) = self.chain.find(name) {
            return rt.get(&Value::Object(link.record.clone()), name);
        }
        if name == "arguments" {
            return Ok(self.arguments_object(rt));
        }
        rt.read_global(name)
    }

    fn resolvable(&self, rt: &Runtime, name: &str) -> bool {
        self.chain.find(name).is_some() || name == "arguments" || rt.has_global(name)
    }

    fn assign_name(&mut self, rt: &mut Runtime, name: &str, value: Value) -> Completion<()> {
        match self.chain.find(name) {
            Some(link) => rt.put(&Value::Object(link.record.clone()), name, value),
            None => rt.write_global(name, value),
        }
    }
}
