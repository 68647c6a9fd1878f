//! AST registry and position indexer
//!
//! Every rewrite pass registers the tree it instruments here. Nodes receive
//! pre-order position indices, unique and monotonically increasing per
//! (registry, namespace). Later, frames reconstructed from an unwind resolve
//! their closure's node by (namespace, index).
//!
//! The registry owns an indexed copy of each tree. Index arithmetic is done on
//! that copy through a subtree-size table, so a child's index is always
//! `parent + 1` for the first child and `previous sibling + size` after that.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::error::ReifyError;
use crate::syntax::ast::{Function, Stmt};
use crate::syntax::walk::{self, NodeRef};

#[cfg(test)]
mod tests;

/// Shared handle threaded through rewriting, closures and frames
pub type RegistryHandle = Rc<RefCell<AstRegistry>>;

/* ===================== Indexed Tree ===================== */

/// One registered function tree with its index layout
#[derive(Debug)]
pub struct IndexedTree {
    namespace: String,
    base: usize,
    root: Function,
    program: bool,
    sizes: Vec<usize>,
}

impl IndexedTree {
    fn new(namespace: &str, base: usize, root: Function, program: bool) -> Self {
        let sizes = walk::subtree_sizes(NodeRef::Function(&root));
        IndexedTree {
            namespace: namespace.to_string(),
            base,
            root,
            program,
            sizes,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Index of the root function node
    pub fn base(&self) -> usize {
        self.base
    }

    pub fn root(&self) -> &Function {
        &self.root
    }

    /// Whether the root is a whole program rather than a function
    pub fn is_program(&self) -> bool {
        self.program
    }

    /// Number of indices this tree occupies
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Whether `index` belongs to this tree
    pub fn owns(&self, index: usize) -> bool {
        index >= self.base && index < self.base + self.sizes.len()
    }

    /// Subtree size of the node at `index` (1 for leaves, 0 outside the tree)
    pub fn size(&self, index: usize) -> usize {
        index
            .checked_sub(self.base)
            .and_then(|offset| self.sizes.get(offset))
            .copied()
            .unwrap_or(0)
    }

    /// First index after the subtree rooted at `index`
    pub fn end(&self, index: usize) -> usize {
        index + self.size(index).max(1)
    }

    /// Whether `target` lies in the subtree rooted at `index`
    pub fn contains(&self, index: usize, target: usize) -> bool {
        target >= index && target < self.end(index)
    }

    /// Children of `node` (located at `index`) paired with their indices
    pub fn children<'a>(&self, node: NodeRef<'a>, index: usize) -> Vec<(usize, NodeRef<'a>)> {
        let mut next = index + 1;
        node.children()
            .into_iter()
            .map(|child| {
                let at = next;
                next = self.end(at);
                (at, child)
            })
            .collect()
    }

    /// Indices of `node`'s children, handed out in traversal order
    pub fn child_indices(&self, node: NodeRef<'_>, index: usize) -> ChildIndices {
        let indices: Vec<usize> = self.children(node, index).into_iter().map(|(at, _)| at).collect();
        ChildIndices {
            indices: indices.into_iter(),
            end: self.end(index),
        }
    }

    /// Resolve an index to its node
    pub fn node(&self, index: usize) -> Option<NodeRef<'_>> {
        if !self.owns(index) {
            return None;
        }
        let mut current = NodeRef::Function(&self.root);
        let mut at = self.base;
        while at != index {
            let (child_at, child) = self
                .children(current, at)
                .into_iter()
                .find(|(child_at, _)| self.contains(*child_at, index))?;
            current = child;
            at = child_at;
        }
        Some(current)
    }

    /// Resolve an index that must denote a function node
    pub fn function(&self, index: usize) -> Option<&Function> {
        self.node(index).and_then(NodeRef::function)
    }

    /// Hoisted declarations of the function at `index`
    pub fn declarations(&self, index: usize) -> Option<Declarations> {
        let func = self.function(index)?;
        let mut decls = Declarations::default();
        let mut at = index + 1;
        for stmt in &func.body {
            collect_declarations(self, stmt, at, &mut decls);
            at = self.end(at);
        }
        Some(decls)
    }
}

/// Child indices of one node, consumed in the order `NodeRef::children` yields them
#[derive(Debug)]
pub struct ChildIndices {
    indices: std::vec::IntoIter<usize>,
    end: usize,
}

impl ChildIndices {
    /// Index of the next child; past the parent's subtree once exhausted
    pub fn take(&mut self) -> usize {
        self.indices.next().unwrap_or(self.end)
    }
}

/* ===================== Declarations ===================== */

/// Names a function body binds before its first statement runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declarations {
    /// `var` names in declaration order, without duplicates
    pub vars: Vec<String>,
    /// Function declarations as (name, node index); later ones win
    pub functions: Vec<(String, usize)>,
}

impl Declarations {
    fn add_var(&mut self, name: &str) {
        if !self.vars.iter().any(|v| v == name) {
            self.vars.push(name.to_string());
        }
    }

    fn add_function(&mut self, name: &str, index: usize) {
        self.functions.retain(|(n, _)| n != name);
        self.functions.push((name.to_string(), index));
    }

    /// Every name bound in the function's own record
    pub fn names<'a>(&'a self, params: &'a [String]) -> Vec<&'a str> {
        let mut names: Vec<&str> = params.iter().map(String::as_str).collect();
        for name in self
            .vars
            .iter()
            .map(String::as_str)
            .chain(self.functions.iter().map(|(n, _)| n.as_str()))
        {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

fn collect_declarations(tree: &IndexedTree, stmt: &Stmt, index: usize, decls: &mut Declarations) {
    match stmt {
        Stmt::Var { decls: list } => {
            for d in list {
                if d.name != "arguments" {
                    decls.add_var(&d.name);
                }
            }
        }
        Stmt::FunctionDecl { func } => {
            if let Some(name) = &func.name {
                decls.add_function(name, index);
            }
        }
        Stmt::For { init, .. } => {
            if let Some(crate::syntax::ast::ForInit::Var { decls: list }) = init {
                for d in list {
                    decls.add_var(&d.name);
                }
            }
            descend(tree, stmt, index, decls);
        }
        Stmt::ForIn { left, .. } => {
            if let crate::syntax::ast::ForInTarget::Var { name } = left {
                decls.add_var(name);
            }
            descend(tree, stmt, index, decls);
        }
        _ => descend(tree, stmt, index, decls),
    }
}

fn descend(tree: &IndexedTree, stmt: &Stmt, index: usize, decls: &mut Declarations) {
    for (at, child) in tree.children(NodeRef::Stmt(stmt), index) {
        match child {
            NodeRef::Stmt(inner) => collect_declarations(tree, inner, at, decls),
            NodeRef::Catch(clause) => {
                let mut body_at = at + 1;
                for inner in &clause.body {
                    collect_declarations(tree, inner, body_at, decls);
                    body_at = tree.end(body_at);
                }
            }
            NodeRef::Case(_) => {
                for (inner_at, inner) in tree.children(child, at) {
                    if let NodeRef::Stmt(inner) = inner {
                        collect_declarations(tree, inner, inner_at, decls);
                    }
                }
            }
            _ => {}
        }
    }
}

/* ===================== Registry ===================== */

#[derive(Debug, Default)]
struct Namespace {
    next: usize,
    trees: Vec<Rc<IndexedTree>>,
}

/// Mapping from (namespace, position index) back to original nodes
#[derive(Debug, Default)]
pub struct AstRegistry {
    namespaces: HashMap<String, Namespace>,
}

impl AstRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh shared registry
    pub fn handle() -> RegistryHandle {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Register a function tree, returning its indexed copy.
    ///
    /// The root receives the next free index of `namespace`; the input is
    /// cloned, never modified.
    pub fn assign(&mut self, root: &Function, namespace: &str, program: bool) -> Rc<IndexedTree> {
        let ns = self.namespaces.entry(namespace.to_string()).or_default();
        let tree = Rc::new(IndexedTree::new(namespace, ns.next, root.clone(), program));
        ns.next += tree.len();
        ns.trees.push(tree.clone());
        debug!(
            namespace,
            base = tree.base(),
            nodes = tree.len(),
            "registered tree"
        );
        tree
    }

    /// The tree owning `index` in `namespace`
    pub fn tree(&self, namespace: &str, index: usize) -> Result<Rc<IndexedTree>, ReifyError> {
        let lookup = || ReifyError::Lookup {
            namespace: namespace.to_string(),
            index,
        };
        let ns = self.namespaces.get(namespace).ok_or_else(lookup)?;
        // Trees are stored in increasing base order
        let pos = ns.trees.partition_point(|tree| tree.base() <= index);
        pos.checked_sub(1)
            .and_then(|p| ns.trees.get(p))
            .filter(|tree| tree.owns(index))
            .cloned()
            .ok_or_else(lookup)
    }

    /// Resolve (namespace, index) to a node handle
    pub fn resolve(&self, namespace: &str, index: usize) -> Result<NodeHandle, ReifyError> {
        let tree = self.tree(namespace, index)?;
        if tree.node(index).is_none() {
            return Err(ReifyError::Lookup {
                namespace: namespace.to_string(),
                index,
            });
        }
        Ok(NodeHandle { tree, index })
    }

    /// Next index `namespace` would hand out
    pub fn next_index(&self, namespace: &str) -> usize {
        self.namespaces.get(namespace).map(|ns| ns.next).unwrap_or(0)
    }
}

/// Resolve (namespace, index) against a shared registry
pub fn resolve(
    registry: &RegistryHandle,
    namespace: &str,
    index: usize,
) -> Result<NodeHandle, ReifyError> {
    registry.borrow().resolve(namespace, index)
}

/// A resolved registry entry: the owning tree plus the node's index
#[derive(Debug, Clone)]
pub struct NodeHandle {
    pub tree: Rc<IndexedTree>,
    pub index: usize,
}

impl NodeHandle {
    pub fn node(&self) -> Option<NodeRef<'_>> {
        self.tree.node(self.index)
    }

    pub fn function(&self) -> Option<&Function> {
        self.tree.function(self.index)
    }
}
