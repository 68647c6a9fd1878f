//! Rewriter: source function trees to instrumented trees
//!
//! A pass registers the input tree with the registry, then lowers it node by
//! node. Position indices come from the registered copy, so each recorded
//! operation in the output points straight back at its source node. The input
//! is only borrowed.

pub mod ir;
pub mod policy;
pub mod print;
pub mod scope;

#[cfg(test)]
mod tests;

use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::registry::{ChildIndices, IndexedTree, RegistryHandle};
use crate::syntax::ast::{Declarator, Expr, ForInTarget, ForInit, Function, Program, Stmt, UnaryOp};
use crate::syntax::walk::NodeRef;

pub use ir::{
    ICase, ICatch, IDecl, IExpr, IForInit, IFunction, IKey, IProperty, IRef, IStmt, ITarget,
};
pub use print::print_instrumented;
pub use scope::{is_escaped, ESCAPE_PREFIX};

use scope::Scopes;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RewriteError {
    #[error("unsupported syntax: {construct} at index {index}")]
    Unsupported {
        construct: &'static str,
        index: usize,
    },

    #[error("invalid assignment target at index {index}")]
    InvalidTarget { index: usize },
}

/// Instrument `func` against `registry` in `namespace`.
///
/// `inherited` names the bindings of an override record the caller will
/// install as the function's lexical parent.
pub fn rewrite(
    func: &Function,
    registry: &RegistryHandle,
    namespace: &str,
    inherited: &[String],
) -> Result<Rc<IFunction>, RewriteError> {
    rewrite_tree(func, registry, namespace, inherited, false)
}

/// Instrument a whole program; it runs as a parameterless function
pub fn rewrite_program(
    program: &Program,
    registry: &RegistryHandle,
    namespace: &str,
) -> Result<Rc<IFunction>, RewriteError> {
    let func = Function {
        name: None,
        params: vec![],
        body: program.body.clone(),
    };
    rewrite_tree(&func, registry, namespace, &[], true)
}

fn rewrite_tree(
    func: &Function,
    registry: &RegistryHandle,
    namespace: &str,
    inherited: &[String],
    program: bool,
) -> Result<Rc<IFunction>, RewriteError> {
    // Reject before registering so a failed pass leaves no entries behind
    let base = registry.borrow().next_index(namespace);
    check_supported(NodeRef::Function(func), &mut base.clone())?;

    let tree = registry.borrow_mut().assign(func, namespace, program);
    debug!(namespace, base = tree.base(), "rewrite pass started");

    let mut rewriter = Rewriter {
        tree: tree.clone(),
        scopes: Scopes::new(inherited),
    };
    let result = rewriter.function(tree.root(), tree.base(), None)?;
    debug!(
        namespace,
        nodes = tree.len(),
        recorded = result.recorded_indices().len(),
        "rewrite pass finished"
    );
    Ok(result)
}

fn check_supported(node: NodeRef<'_>, next: &mut usize) -> Result<(), RewriteError> {
    let index = *next;
    *next += 1;
    let construct = match node {
        NodeRef::Stmt(Stmt::Labeled { .. }) => Some("labeled statement"),
        NodeRef::Stmt(Stmt::Break { label: Some(_) }) => Some("labeled break"),
        NodeRef::Stmt(Stmt::Continue { label: Some(_) }) => Some("labeled continue"),
        _ => None,
    };
    if let Some(construct) = construct {
        return Err(RewriteError::Unsupported { construct, index });
    }
    for child in node.children() {
        check_supported(child, next)?;
    }
    Ok(())
}

/* ===================== Lowering ===================== */

struct Rewriter {
    tree: Rc<IndexedTree>,
    scopes: Scopes,
}

type Lowered<T> = Result<T, RewriteError>;

impl Rewriter {
    fn namespace(&self) -> String {
        self.tree.namespace().to_string()
    }

    fn function(
        &mut self,
        func: &Function,
        index: usize,
        self_name: Option<&str>,
    ) -> Lowered<Rc<IFunction>> {
        let decls = self.tree.declarations(index).unwrap_or_default();
        let mut names: Vec<String> = decls
            .names(&func.params)
            .into_iter()
            .map(str::to_string)
            .collect();
        let self_name = self_name
            .filter(|n| !names.iter().any(|m| m == n))
            .map(str::to_string);
        if let Some(name) = &self_name {
            names.push(name.clone());
        }
        trace!(index, ?names, "lowering function");

        self.scopes.push_function(names);
        let lowered = self.function_body(func, index, &decls.functions);
        self.scopes.pop();
        let (hoisted, body) = lowered?;

        Ok(Rc::new(IFunction {
            name: func.name.clone(),
            namespace: self.namespace(),
            index,
            params: func.params.clone(),
            declared: decls.vars.clone(),
            self_name,
            hoisted,
            body,
            is_program: self.tree.is_program() && index == self.tree.base(),
        }))
    }

    fn function_body(
        &mut self,
        func: &Function,
        index: usize,
        functions: &[(String, usize)],
    ) -> Lowered<(Vec<(String, IExpr)>, Vec<IStmt>)> {
        let tree = self.tree.clone();
        let mut hoisted = Vec::new();
        for (name, at) in functions {
            let Some(decl) = tree.function(*at) else {
                continue;
            };
            hoisted.push((name.clone(), self.closure(decl, *at, None)?));
        }
        let body = self.block(NodeRef::Function(func), index, &func.body)?;
        Ok((hoisted, body))
    }

    fn closure(&mut self, func: &Function, index: usize, self_name: Option<&str>) -> Lowered<IExpr> {
        if func.name.as_deref().is_some_and(is_escaped) {
            return Ok(IExpr::Plain {
                namespace: self.namespace(),
                index,
            });
        }
        Ok(IExpr::Closure(self.function(func, index, self_name)?))
    }

    /// Lower statements that are consecutive children of `parent`, starting
    /// with its first child
    fn block(&mut self, parent: NodeRef<'_>, index: usize, body: &[Stmt]) -> Lowered<Vec<IStmt>> {
        let mut ix = self.tree.child_indices(parent, index);
        body.iter().map(|s| self.stmt(s, ix.take())).collect()
    }

    fn stmts_from(&mut self, mut at: usize, body: &[Stmt]) -> Lowered<Vec<IStmt>> {
        let mut out = Vec::with_capacity(body.len());
        for stmt in body {
            out.push(self.stmt(stmt, at)?);
            at = self.tree.end(at);
        }
        Ok(out)
    }

    fn stmt(&mut self, stmt: &Stmt, index: usize) -> Lowered<IStmt> {
        let node = NodeRef::Stmt(stmt);
        let mut ix = self.tree.child_indices(node, index);
        let lowered = match stmt {
            Stmt::Var { decls } => IStmt::Var(self.declarators(decls, &mut ix)?),
            // Instantiated on function entry
            Stmt::FunctionDecl { .. } | Stmt::Empty => IStmt::Empty,
            Stmt::Expr { expr } => IStmt::Expr(self.expr(expr, ix.take())?),
            Stmt::Block { body } => IStmt::Block(self.block(node, index, body)?),
            Stmt::If { test, cons, alt } => IStmt::If {
                test: self.expr(test, ix.take())?,
                cons: Box::new(self.stmt(cons, ix.take())?),
                alt: match alt {
                    Some(alt) => Some(Box::new(self.stmt(alt, ix.take())?)),
                    None => None,
                },
            },
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let init = match init {
                    Some(ForInit::Var { decls }) => {
                        Some(IForInit::Var(self.declarators(decls, &mut ix)?))
                    }
                    Some(ForInit::Expr { expr }) => Some(IForInit::Expr(self.expr(expr, ix.take())?)),
                    None => None,
                };
                let test = self.opt_expr(test.as_ref(), &mut ix)?;
                let update = self.opt_expr(update.as_ref(), &mut ix)?;
                IStmt::For {
                    init,
                    test,
                    update,
                    body: Box::new(self.stmt(body, ix.take())?),
                }
            }
            Stmt::ForIn { left, right, body } => {
                let target = match left {
                    ForInTarget::Var { name } => ITarget::Ref(self.scopes.resolve(name)),
                    ForInTarget::Expr { expr } => self.target(expr, ix.take())?,
                };
                let at = ix.take();
                IStmt::ForIn {
                    index: at,
                    target,
                    right: self.expr(right, at)?,
                    body: Box::new(self.stmt(body, ix.take())?),
                }
            }
            Stmt::While { test, body } => IStmt::While {
                test: self.expr(test, ix.take())?,
                body: Box::new(self.stmt(body, ix.take())?),
            },
            Stmt::DoWhile { body, test } => IStmt::DoWhile {
                body: Box::new(self.stmt(body, ix.take())?),
                test: self.expr(test, ix.take())?,
            },
            Stmt::Return { value } => IStmt::Return(self.opt_expr(value.as_ref(), &mut ix)?),
            Stmt::Break { label: None } => IStmt::Break,
            Stmt::Continue { label: None } => IStmt::Continue,
            Stmt::Throw { value } => IStmt::Throw(self.expr(value, ix.take())?),
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                let block = self.stmts_from(index + 1, block)?;
                let mut at = block_end(&self.tree, index + 1, block.len());
                let handler = match handler {
                    Some(clause) => {
                        self.scopes.push_catch(&clause.param);
                        let body = self.stmts_from(at + 1, &clause.body);
                        self.scopes.pop();
                        let lowered = ICatch {
                            index: at,
                            param: clause.param.clone(),
                            body: body?,
                        };
                        at = self.tree.end(at);
                        Some(lowered)
                    }
                    None => None,
                };
                let finalizer = match finalizer {
                    Some(stmts) => Some(self.stmts_from(at, stmts)?),
                    None => None,
                };
                IStmt::Try {
                    index,
                    block,
                    handler,
                    finalizer,
                }
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                let at = ix.take();
                let discriminant = self.expr(discriminant, at)?;
                let mut lowered = Vec::with_capacity(cases.len());
                for case in cases {
                    let case_at = ix.take();
                    let mut cx = self.tree.child_indices(NodeRef::Case(case), case_at);
                    let test = self.opt_expr(case.test.as_ref(), &mut cx)?;
                    let body_at = if case.test.is_some() {
                        self.tree.end(case_at + 1)
                    } else {
                        case_at + 1
                    };
                    lowered.push(ICase {
                        test,
                        body: self.stmts_from(body_at, &case.body)?,
                    });
                }
                IStmt::Switch {
                    index: at,
                    discriminant,
                    cases: lowered,
                }
            }
            Stmt::With { object, body } => {
                let object = self.expr(object, ix.take())?;
                self.scopes.push_with();
                let body = self.stmt(body, ix.take());
                self.scopes.pop();
                IStmt::With {
                    object,
                    body: Box::new(body?),
                }
            }
            Stmt::Debugger => IStmt::Debugger { index },
            Stmt::Labeled { .. } => {
                return Err(RewriteError::Unsupported {
                    construct: "labeled statement",
                    index,
                })
            }
            Stmt::Break { .. } | Stmt::Continue { .. } => {
                return Err(RewriteError::Unsupported {
                    construct: "labeled jump",
                    index,
                })
            }
        };
        Ok(lowered)
    }

    fn declarators(
        &mut self,
        decls: &[Declarator],
        ix: &mut ChildIndices,
    ) -> Lowered<Vec<IDecl>> {
        let mut out = Vec::with_capacity(decls.len());
        for decl in decls {
            let at = ix.take();
            let init = match &decl.init {
                Some(init) => Some(self.expr(init, at + 1)?),
                None => None,
            };
            out.push(IDecl {
                index: at,
                target: self.scopes.resolve(&decl.name),
                init,
            });
        }
        Ok(out)
    }

    fn opt_expr(
        &mut self,
        expr: Option<&Expr>,
        ix: &mut ChildIndices,
    ) -> Lowered<Option<IExpr>> {
        match expr {
            Some(expr) => Ok(Some(self.expr(expr, ix.take())?)),
            None => Ok(None),
        }
    }

    fn exprs(&mut self, exprs: &[Expr], ix: &mut ChildIndices) -> Lowered<Vec<IExpr>> {
        exprs.iter().map(|e| self.expr(e, ix.take())).collect()
    }

    fn boxed(&mut self, expr: &Expr, index: usize) -> Lowered<Box<IExpr>> {
        Ok(Box::new(self.expr(expr, index)?))
    }

    fn expr(&mut self, expr: &Expr, index: usize) -> Lowered<IExpr> {
        let mut ix = self.tree.child_indices(NodeRef::Expr(expr), index);
        let lowered = match expr {
            Expr::LitNum { v } => IExpr::Num(*v),
            Expr::LitStr { v } => IExpr::Str(v.clone()),
            Expr::LitBool { v } => IExpr::Bool(*v),
            Expr::LitNull => IExpr::Null,
            Expr::Ident { name } => self.scopes.expr(name),
            Expr::This => IExpr::This,
            Expr::Array { elements } => IExpr::Array(self.exprs(elements, &mut ix)?),
            Expr::Object { props } => {
                let mut out = Vec::with_capacity(props.len());
                for prop in props {
                    let at = ix.take();
                    out.push(IProperty {
                        key: prop.key.clone(),
                        kind: prop.kind,
                        value: self.expr(&prop.value, at + 1)?,
                    });
                }
                IExpr::Object(out)
            }
            Expr::Function { func } => self.closure(func, index, func.name.as_deref())?,
            Expr::Unary {
                op: UnaryOp::Delete,
                arg,
            } if matches!(**arg, Expr::Member { .. } | Expr::Index { .. }) => {
                IExpr::Delete(Box::new(self.target(arg, ix.take())?))
            }
            Expr::Unary { op, arg } => IExpr::Unary {
                op: *op,
                arg: self.boxed(arg, ix.take())?,
            },
            Expr::Update { op, prefix, arg } => IExpr::Update {
                index,
                op: *op,
                prefix: *prefix,
                target: Box::new(self.target(arg, ix.take())?),
            },
            Expr::Binary { op, left, right } => IExpr::Binary {
                op: *op,
                left: self.boxed(left, ix.take())?,
                right: self.boxed(right, ix.take())?,
            },
            Expr::Logical { op, left, right } => IExpr::Logical {
                op: *op,
                left: self.boxed(left, ix.take())?,
                right: self.boxed(right, ix.take())?,
            },
            Expr::Assign { op, target, value } => IExpr::Assign {
                index,
                op: *op,
                target: Box::new(self.target(target, ix.take())?),
                value: self.boxed(value, ix.take())?,
            },
            Expr::Conditional { test, cons, alt } => IExpr::Conditional {
                test: self.boxed(test, ix.take())?,
                cons: self.boxed(cons, ix.take())?,
                alt: self.boxed(alt, ix.take())?,
            },
            Expr::Call { callee, args } => IExpr::Call {
                index,
                callee: self.boxed(callee, ix.take())?,
                args: self.exprs(args, &mut ix)?,
            },
            Expr::New { callee, args } => IExpr::New {
                index,
                callee: self.boxed(callee, ix.take())?,
                args: self.exprs(args, &mut ix)?,
            },
            Expr::Member { object, property } => IExpr::Member {
                object: self.boxed(object, ix.take())?,
                key: IKey::Static(property.clone()),
            },
            Expr::Index { object, index: key } => IExpr::Member {
                object: self.boxed(object, ix.take())?,
                key: IKey::Computed(self.boxed(key, ix.take())?),
            },
            Expr::Sequence { exprs } => IExpr::Sequence(self.exprs(exprs, &mut ix)?),
        };
        Ok(lowered)
    }

    fn target(&mut self, expr: &Expr, index: usize) -> Lowered<ITarget> {
        let mut ix = self.tree.child_indices(NodeRef::Expr(expr), index);
        match expr {
            Expr::Ident { name } => Ok(ITarget::Ref(self.scopes.resolve(name))),
            Expr::Member { object, property } => Ok(ITarget::Member {
                object: self.expr(object, ix.take())?,
                key: IKey::Static(property.clone()),
            }),
            Expr::Index { object, index: key } => Ok(ITarget::Member {
                object: self.expr(object, ix.take())?,
                key: IKey::Computed(self.boxed(key, ix.take())?),
            }),
            _ => Err(RewriteError::InvalidTarget { index }),
        }
    }
}

/// Index right after `count` consecutive statements starting at `start`
fn block_end(tree: &IndexedTree, start: usize, count: usize) -> usize {
    (0..count).fold(start, |at, _| tree.end(at))
}
