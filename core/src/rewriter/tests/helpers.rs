//! Test helpers for rewriter tests

use std::rc::Rc;

use crate::registry::{AstRegistry, IndexedTree, RegistryHandle};
use crate::rewriter::policy::{self, Recording};
use crate::rewriter::{rewrite, IFunction};
use crate::syntax::ast::Stmt;
use crate::syntax::{parse_function, NodeRef};

pub const NS: &str = "test";

/// Parse a single function and rewrite it against a fresh registry
pub fn rewrite_source(source: &str) -> (RegistryHandle, Rc<IFunction>) {
    let func = parse_function(source).expect("Parse function failed");
    let registry = AstRegistry::handle();
    let rewritten = rewrite(&func, &registry, NS, &[]).expect("Rewrite failed");
    (registry, rewritten)
}

/// Indices a function at `index` should record, derived from the source tree
pub fn expected_records(tree: &IndexedTree, index: usize) -> Vec<usize> {
    let mut out = Vec::new();
    if let Some(node) = tree.node(index) {
        for (at, child) in tree.children(node, index) {
            collect(tree, child, at, &mut out);
        }
    }
    out.sort_unstable();
    out
}

fn collect(tree: &IndexedTree, node: NodeRef<'_>, index: usize, out: &mut Vec<usize>) {
    if policy::recording(node) != Recording::None {
        out.push(index);
    }
    match node {
        // Closure bodies record into their own frames
        NodeRef::Expr(crate::syntax::ast::Expr::Function { .. })
        | NodeRef::Stmt(Stmt::FunctionDecl { .. }) => return,
        NodeRef::Stmt(Stmt::Debugger) | NodeRef::Catch(_) => out.push(index),
        NodeRef::Stmt(Stmt::Switch { .. }) => out.push(index + 1),
        NodeRef::Stmt(Stmt::ForIn { .. }) => {
            // the right-hand side is the second to last child
            let children = tree.children(node, index);
            out.push(children[children.len() - 2].0);
        }
        _ => {}
    }
    for (at, child) in tree.children(node, index) {
        collect(tree, child, at, out);
    }
}
