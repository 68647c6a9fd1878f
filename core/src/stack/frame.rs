//! Reconstructed activation records

use std::rc::Rc;

use crate::registry::{IndexedTree, RegistryHandle};
use crate::runtime::ops;
use crate::runtime::scope::{Cache, Chain, Link, LinkKind};
use crate::runtime::value::{find_slot, Slot};
use crate::runtime::Value;
use crate::syntax::ast::Function;
use crate::syntax::walk::NodeRef;

/// Index of a frame in its owner's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub usize);

/// Registry coordinates of the function a frame instantiates
#[derive(Debug, Clone)]
pub struct FunctionRef {
    pub tree: Rc<IndexedTree>,
    pub index: usize,
}

impl FunctionRef {
    pub fn function(&self) -> Option<&Function> {
        self.tree.function(self.index)
    }

    pub fn namespace(&self) -> &str {
        self.tree.namespace()
    }
}

/// One activation record of a paused or failed computation
#[derive(Debug, Clone)]
pub struct Frame {
    /// The function-level link: own record, cache and lexical parent
    pub scope: Chain,
    /// `catch`/`with` links active at the pause point, outermost first
    pub pending: Vec<Chain>,
    pub cache: Cache,
    /// Position index execution resumes at
    pub pc: Option<usize>,
    pub this: Value,
    pub arguments: Vec<Value>,
    /// Dynamic caller, the next frame outwards
    pub parent: Option<FrameId>,
    pub origin: Option<FunctionRef>,
    pub registry: Option<RegistryHandle>,
}

impl Frame {
    pub fn function(&self) -> Option<&Function> {
        self.origin.as_ref().and_then(FunctionRef::function)
    }

    /// Node the frame is paused at
    pub fn pc_node(&self) -> Option<NodeRef<'_>> {
        let origin = self.origin.as_ref()?;
        origin.tree.node(self.pc?)
    }

    pub fn is_resumable(&self) -> bool {
        self.function().is_some() && self.pc.is_some()
    }

    /// Innermost scope link, pending links included
    pub fn innermost(&self) -> Chain {
        self.pending.last().cloned().unwrap_or_else(|| self.scope.clone())
    }

    /// Look a name up the way code paused in this frame would see it
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let link = self.innermost().find(name)?;
        match find_slot(&link.record, name)? {
            Slot::Data(value) => Some(value),
            Slot::Accessor { .. } => None,
        }
    }

    /// Own variables of the frame's function record, in binding order
    pub fn variables(&self) -> Vec<(String, Value)> {
        self.scope.record.borrow().entries()
    }

    /// Single-line summary: function name, node kind at pc, variables
    pub fn describe(&self) -> String {
        let name = match &self.origin {
            Some(origin) if origin.tree.is_program() && origin.index == origin.tree.base() => {
                "<program>".to_string()
            }
            Some(origin) => origin
                .function()
                .and_then(|f| f.name.clone())
                .unwrap_or_else(|| "<anonymous>".to_string()),
            None => "<unknown>".to_string(),
        };
        let at = match (self.pc, self.pc_node()) {
            (Some(pc), Some(node)) => format!("{}@{}", node.kind(), pc),
            (Some(pc), None) => format!("@{}", pc),
            (None, _) => "no pc".to_string(),
        };
        let vars = self
            .variables()
            .iter()
            .map(|(k, v)| format!("{}={}", k, ops::inspect(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} [{}] {{{}}}", name, at, vars)
    }

    /// Independent copy: caches and binding records are duplicated so that
    /// resuming the copy leaves this frame untouched.
    pub fn deep_copy(&self) -> Frame {
        // Arrays are duplicated so for-in key queues advance independently
        let entries = self
            .cache
            .borrow()
            .iter()
            .map(|(index, value)| (*index, copy_if_array(value)))
            .collect();
        let cache = Rc::new(std::cell::RefCell::new(entries));
        let record = copy_record(&self.scope.record);
        let scope = Link::function(record, cache.clone(), self.scope.parent.clone());
        let mut parent = scope.clone();
        let pending = self
            .pending
            .iter()
            .map(|link| {
                let record = match link.kind {
                    // `with` records are user objects: shared, not copied
                    LinkKind::With => link.record.clone(),
                    _ => copy_record(&link.record),
                };
                let copied = parent.push(link.kind, record);
                parent = copied.clone();
                copied
            })
            .collect();
        Frame {
            scope,
            pending,
            cache,
            pc: self.pc,
            this: self.this.clone(),
            arguments: self.arguments.clone(),
            parent: self.parent,
            origin: self.origin.clone(),
            registry: self.registry.clone(),
        }
    }
}

fn copy_if_array(value: &Value) -> Value {
    let Value::Object(obj) = value else {
        return value.clone();
    };
    let o = obj.borrow();
    match o.elements() {
        Some(items) => Value::Object(
            crate::runtime::value::Object::new(
                crate::runtime::value::ObjectKind::Array(items.clone()),
                o.proto.clone(),
            )
            .into_ref(),
        ),
        None => value.clone(),
    }
}

fn copy_record(record: &crate::runtime::value::ObjectRef) -> crate::runtime::value::ObjectRef {
    let copy = crate::runtime::scope::new_record();
    for (key, value) in record.borrow().entries() {
        copy.borrow_mut().set_own(&key, value);
    }
    copy
}
