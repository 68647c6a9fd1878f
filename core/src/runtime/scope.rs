//! Frame chain: the linked scope records instrumented code threads through
//!
//! Each link pairs a binding record with the results cache of the frame it
//! belongs to. A function entry pushes a `Function` link with a fresh cache;
//! `catch` and `with` push links that share the enclosing function's cache.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::value::{has_property, Object, ObjectKind, ObjectRef, Value};

/// Partial results of one frame, keyed by position index
pub type Cache = Rc<RefCell<HashMap<usize, Value>>>;

pub type Chain = Rc<Link>;

pub fn new_cache() -> Cache {
    Rc::new(RefCell::new(HashMap::new()))
}

/// Fresh binding record (no prototype, so lookups never leak into Object.prototype)
pub fn new_record() -> ObjectRef {
    Object::new(ObjectKind::Plain, None).into_ref()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Function,
    Catch,
    With,
}

pub struct Link {
    pub kind: LinkKind,
    pub record: ObjectRef,
    pub cache: Cache,
    pub parent: Option<Chain>,
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("kind", &self.kind)
            .field("depth", &self.depth())
            .finish()
    }
}

impl Link {
    /// Function-level link with its own cache
    pub fn function(record: ObjectRef, cache: Cache, parent: Option<Chain>) -> Chain {
        Rc::new(Link {
            kind: LinkKind::Function,
            record,
            cache,
            parent,
        })
    }

    /// Push a `catch`/`with` link sharing this link's cache
    pub fn push(self: &Rc<Self>, kind: LinkKind, record: ObjectRef) -> Chain {
        Rc::new(Link {
            kind,
            record,
            cache: self.cache.clone(),
            parent: Some(self.clone()),
        })
    }

    /// Number of links from here to the outermost one
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.parent.as_ref();
        while let Some(link) = current {
            depth += 1;
            current = link.parent.as_ref();
        }
        depth
    }

    /// The link `hops` steps outwards (0 is this link)
    pub fn ancestor(self: &Rc<Self>, hops: usize) -> Option<Chain> {
        let mut current = self.clone();
        for _ in 0..hops {
            current = current.parent.clone()?;
        }
        Some(current)
    }

    /// Whether this link binds `name`
    pub fn binds(&self, name: &str) -> bool {
        match self.kind {
            LinkKind::Function | LinkKind::Catch => self.record.borrow().has_own(name),
            LinkKind::With => has_property(&self.record, name),
        }
    }

    /// Innermost link binding `name`, if any
    pub fn find(self: &Rc<Self>, name: &str) -> Option<Chain> {
        let mut current = Some(self.clone());
        while let Some(link) = current {
            if link.binds(name) {
                return Some(link);
            }
            current = link.parent.clone();
        }
        None
    }

    /// Split into the frame's function-level link and the `catch`/`with`
    /// links stacked above it, outermost first.
    pub fn split(self: &Rc<Self>) -> (Chain, Vec<Chain>) {
        let mut pending = Vec::new();
        let mut current = self.clone();
        while current.kind != LinkKind::Function {
            match current.parent.clone() {
                Some(parent) => {
                    pending.push(current);
                    current = parent;
                }
                None => break,
            }
        }
        pending.reverse();
        (current, pending)
    }
}
