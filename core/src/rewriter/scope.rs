//! Static mirror of the runtime frame chain
//!
//! The rewriter pushes one entry for every link the host engine will push at
//! run time, so a hop count computed here is exactly the number of `parent`
//! steps the engine takes.

use super::ir::{IExpr, IRef};

/// Names prefixed with this are left uninstrumented
pub const ESCAPE_PREFIX: &str = "_NO_REWRITE_";

pub fn is_escaped(name: &str) -> bool {
    name.starts_with(ESCAPE_PREFIX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Function,
    Catch,
    With,
}

#[derive(Debug)]
struct Entry {
    kind: Kind,
    names: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct Scopes {
    stack: Vec<Entry>,
}

impl Scopes {
    /// Start with an outermost record binding `inherited`, if any
    pub fn new(inherited: &[String]) -> Self {
        let mut scopes = Scopes::default();
        if !inherited.is_empty() {
            scopes.push_function(inherited.iter().cloned());
        }
        scopes
    }

    pub fn push_function(&mut self, names: impl IntoIterator<Item = String>) {
        self.stack.push(Entry {
            kind: Kind::Function,
            names: names.into_iter().collect(),
        });
    }

    pub fn push_catch(&mut self, param: &str) {
        self.stack.push(Entry {
            kind: Kind::Catch,
            names: vec![param.to_string()],
        });
    }

    pub fn push_with(&mut self) {
        self.stack.push(Entry {
            kind: Kind::With,
            names: Vec::new(),
        });
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    /// Resolve an identifier read or write
    pub fn resolve(&self, name: &str) -> IRef {
        if is_escaped(name) {
            return IRef::Free(name.to_string());
        }
        let mut withs = Vec::new();
        for (hops, entry) in self.stack.iter().rev().enumerate() {
            match entry.kind {
                Kind::With => withs.push(hops),
                _ if entry.names.iter().any(|n| n == name) => {
                    return wrap(
                        withs,
                        name,
                        IRef::Slot {
                            hops,
                            name: name.to_string(),
                        },
                    );
                }
                _ => {}
            }
        }
        wrap(withs, name, IRef::Global(name.to_string()))
    }

    /// Identifier in expression position; `arguments` falls back to the
    /// enclosing function's argument list when nothing closer binds it
    pub fn expr(&self, name: &str) -> IExpr {
        if name == "arguments" && !self.binds_locally(name) {
            return IExpr::Arguments;
        }
        IExpr::Ref(self.resolve(name))
    }

    /// Whether a link up to and including the innermost function binds `name`
    fn binds_locally(&self, name: &str) -> bool {
        for entry in self.stack.iter().rev() {
            if entry.names.iter().any(|n| n == name) {
                return true;
            }
            if entry.kind == Kind::Function {
                return false;
            }
        }
        false
    }
}

fn wrap(withs: Vec<usize>, name: &str, fallback: IRef) -> IRef {
    if withs.is_empty() {
        return fallback;
    }
    IRef::Dynamic {
        withs,
        name: name.to_string(),
        fallback: Box::new(fallback),
    }
}
