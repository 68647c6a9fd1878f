//! Which nodes record their results, and when
//!
//! Shared by the rewriter (which bakes indices into the instrumented tree) and
//! the stepping interpreter (which records while walking source trees), so
//! both leave identical caches behind.

use crate::syntax::ast::{Expr, Stmt};
use crate::syntax::walk::NodeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recording {
    /// Not recorded; re-evaluated when replayed
    None,
    /// Marker set after operands are evaluated and before the operation
    /// runs; the result is stored once it returns
    Prefix,
    /// Result stored, then the marker advanced
    Postfix,
    /// Result stored; the marker stays where it is
    Store,
}

/// Recording mode of an expression-level node.
///
/// Statement-level records (switch discriminants, for-in key queues, catch
/// entry and `debugger`) are written by the statement that owns them.
pub fn recording(node: NodeRef<'_>) -> Recording {
    match node {
        NodeRef::Expr(Expr::Call { .. } | Expr::New { .. } | Expr::Update { .. }) => {
            Recording::Prefix
        }
        NodeRef::Expr(Expr::Assign { .. }) => Recording::Postfix,
        NodeRef::Declarator(decl) if decl.init.is_some() => Recording::Postfix,
        NodeRef::Expr(Expr::Function { .. }) | NodeRef::Stmt(Stmt::FunctionDecl { .. }) => {
            Recording::Store
        }
        _ => Recording::None,
    }
}
