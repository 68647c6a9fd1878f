//! Instrumented tree produced by the rewriter and executed by the host engine
//!
//! Variable references are already resolved to scope-chain coordinates and
//! every recorded operation carries the position index it records under.

use std::rc::Rc;

use crate::syntax::ast::{BinaryOp, LogicalOp, PropKind, UnaryOp, UpdateOp};

/* ===================== Functions ===================== */

#[derive(Debug, Clone, PartialEq)]
pub struct IFunction {
    pub name: Option<String>,
    pub namespace: String,
    /// Position index of the function node
    pub index: usize,
    pub params: Vec<String>,
    /// `var` names pre-bound to undefined on entry
    pub declared: Vec<String>,
    /// Name a function expression binds to itself
    pub self_name: Option<String>,
    /// Function declarations, instantiated on entry in this order
    pub hoisted: Vec<(String, IExpr)>,
    pub body: Vec<IStmt>,
    pub is_program: bool,
}

impl IFunction {
    /// Every recorded position index, in evaluation order of the source
    pub fn recorded_indices(&self) -> Vec<usize> {
        let mut out = Vec::new();
        for (_, value) in &self.hoisted {
            expr_indices(value, &mut out);
        }
        for stmt in &self.body {
            stmt_indices(stmt, &mut out);
        }
        out
    }

    /// Closures created directly in this function, hoisted ones first
    pub fn closures(&self) -> Vec<Rc<IFunction>> {
        let mut out = Vec::new();
        for (_, value) in &self.hoisted {
            expr_closures(value, &mut out);
        }
        for stmt in &self.body {
            walk_stmt(stmt, &mut |e| {
                if let IExpr::Closure(f) = e {
                    out.push(f.clone());
                }
            });
        }
        out
    }
}

/* ===================== References ===================== */

/// A resolved variable reference
#[derive(Debug, Clone, PartialEq)]
pub enum IRef {
    /// Field of the record `hops` links out from the innermost one
    Slot { hops: usize, name: String },
    Global(String),
    /// Inside `with` regions: test each override record (by hops, innermost
    /// first) before falling back
    Dynamic {
        withs: Vec<usize>,
        name: String,
        fallback: Box<IRef>,
    },
    /// Escape hatch: looked up along the chain at run time, then globally
    Free(String),
}

impl IRef {
    pub fn name(&self) -> &str {
        match self {
            IRef::Slot { name, .. }
            | IRef::Global(name)
            | IRef::Dynamic { name, .. }
            | IRef::Free(name) => name,
        }
    }
}

/// Property key of a member access
#[derive(Debug, Clone, PartialEq)]
pub enum IKey {
    Static(String),
    Computed(Box<IExpr>),
}

/// Left-hand side of assignments, updates and for-in heads
#[derive(Debug, Clone, PartialEq)]
pub enum ITarget {
    Ref(IRef),
    Member { object: IExpr, key: IKey },
}

/* ===================== Statements ===================== */

#[derive(Debug, Clone, PartialEq)]
pub struct IDecl {
    /// Index of the declarator node
    pub index: usize,
    pub target: IRef,
    pub init: Option<IExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IForInit {
    Var(Vec<IDecl>),
    Expr(IExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ICatch {
    /// Index of the catch clause node
    pub index: usize,
    pub param: String,
    pub body: Vec<IStmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ICase {
    pub test: Option<IExpr>,
    pub body: Vec<IStmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IStmt {
    Var(Vec<IDecl>),
    Expr(IExpr),
    Block(Vec<IStmt>),
    If {
        test: IExpr,
        cons: Box<IStmt>,
        alt: Option<Box<IStmt>>,
    },
    For {
        init: Option<IForInit>,
        test: Option<IExpr>,
        update: Option<IExpr>,
        body: Box<IStmt>,
    },
    /// `index` is the enumerated expression's index, where the key queue is cached
    ForIn {
        index: usize,
        target: ITarget,
        right: IExpr,
        body: Box<IStmt>,
    },
    While {
        test: IExpr,
        body: Box<IStmt>,
    },
    DoWhile {
        body: Box<IStmt>,
        test: IExpr,
    },
    Return(Option<IExpr>),
    Break,
    Continue,
    Throw(IExpr),
    /// `index` is the statement's own index, where the completion pending
    /// across the `finally` block is cached
    Try {
        index: usize,
        block: Vec<IStmt>,
        handler: Option<ICatch>,
        finalizer: Option<Vec<IStmt>>,
    },
    /// `index` is the discriminant's index
    Switch {
        index: usize,
        discriminant: IExpr,
        cases: Vec<ICase>,
    },
    With {
        object: IExpr,
        body: Box<IStmt>,
    },
    Debugger {
        index: usize,
    },
    Empty,
}

/* ===================== Expressions ===================== */

#[derive(Debug, Clone, PartialEq)]
pub struct IProperty {
    pub key: String,
    pub kind: PropKind,
    pub value: IExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IExpr {
    Num(f64),
    Str(String),
    Bool(bool),
    Null,
    Ref(IRef),
    This,
    /// The enclosing function's argument list
    Arguments,
    Array(Vec<IExpr>),
    Object(Vec<IProperty>),
    /// Closure construction; the result is stored at the function's index
    Closure(Rc<IFunction>),
    /// Escape-hatch function, executed uninstrumented
    Plain {
        namespace: String,
        index: usize,
    },
    Unary {
        op: UnaryOp,
        arg: Box<IExpr>,
    },
    Delete(Box<ITarget>),
    Update {
        index: usize,
        op: UpdateOp,
        prefix: bool,
        target: Box<ITarget>,
    },
    Binary {
        op: BinaryOp,
        left: Box<IExpr>,
        right: Box<IExpr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<IExpr>,
        right: Box<IExpr>,
    },
    Assign {
        index: usize,
        op: Option<BinaryOp>,
        target: Box<ITarget>,
        value: Box<IExpr>,
    },
    Conditional {
        test: Box<IExpr>,
        cons: Box<IExpr>,
        alt: Box<IExpr>,
    },
    Call {
        index: usize,
        callee: Box<IExpr>,
        args: Vec<IExpr>,
    },
    New {
        index: usize,
        callee: Box<IExpr>,
        args: Vec<IExpr>,
    },
    Member {
        object: Box<IExpr>,
        key: IKey,
    },
    Sequence(Vec<IExpr>),
}

/* ===================== Traversal ===================== */

fn walk_stmt(stmt: &IStmt, f: &mut dyn FnMut(&IExpr)) {
    let mut exprs: Vec<&IExpr> = Vec::new();
    let mut stmts: Vec<&IStmt> = Vec::new();
    match stmt {
        IStmt::Var(decls) => exprs.extend(decls.iter().filter_map(|d| d.init.as_ref())),
        IStmt::Expr(e) | IStmt::Throw(e) => exprs.push(e),
        IStmt::Block(body) => stmts.extend(body),
        IStmt::If { test, cons, alt } => {
            exprs.push(test);
            stmts.push(cons);
            stmts.extend(alt.as_deref());
        }
        IStmt::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(IForInit::Var(decls)) => {
                    exprs.extend(decls.iter().filter_map(|d| d.init.as_ref()))
                }
                Some(IForInit::Expr(e)) => exprs.push(e),
                None => {}
            }
            exprs.extend(test.as_ref());
            exprs.extend(update.as_ref());
            stmts.push(body);
        }
        IStmt::ForIn {
            target, right, body, ..
        } => {
            if let ITarget::Member { object, .. } = target {
                exprs.push(object);
            }
            exprs.push(right);
            stmts.push(body);
        }
        IStmt::While { test, body } => {
            exprs.push(test);
            stmts.push(body);
        }
        IStmt::DoWhile { body, test } => {
            stmts.push(body);
            exprs.push(test);
        }
        IStmt::Return(value) => exprs.extend(value.as_ref()),
        IStmt::Try {
            block,
            handler,
            finalizer,
            ..
        } => {
            stmts.extend(block);
            if let Some(handler) = handler {
                stmts.extend(&handler.body);
            }
            if let Some(finalizer) = finalizer {
                stmts.extend(finalizer);
            }
        }
        IStmt::Switch {
            discriminant,
            cases,
            ..
        } => {
            exprs.push(discriminant);
            for case in cases {
                exprs.extend(case.test.as_ref());
                stmts.extend(&case.body);
            }
        }
        IStmt::With { object, body } => {
            exprs.push(object);
            stmts.push(body);
        }
        IStmt::Break | IStmt::Continue | IStmt::Debugger { .. } | IStmt::Empty => {}
    }
    for e in exprs {
        walk_expr(e, f);
    }
    for s in stmts {
        walk_stmt(s, f);
    }
}

/// Visit `expr` and its sub-expressions, not descending into closures
fn walk_expr(expr: &IExpr, f: &mut dyn FnMut(&IExpr)) {
    f(expr);
    match expr {
        IExpr::Array(items) | IExpr::Sequence(items) => items.iter().for_each(|e| walk_expr(e, f)),
        IExpr::Object(props) => props.iter().for_each(|p| walk_expr(&p.value, f)),
        IExpr::Unary { arg, .. } => walk_expr(arg, f),
        IExpr::Delete(target) | IExpr::Update { target, .. } => walk_target(target, f),
        IExpr::Binary { left, right, .. } | IExpr::Logical { left, right, .. } => {
            walk_expr(left, f);
            walk_expr(right, f);
        }
        IExpr::Assign { target, value, .. } => {
            walk_target(target, f);
            walk_expr(value, f);
        }
        IExpr::Conditional { test, cons, alt } => {
            walk_expr(test, f);
            walk_expr(cons, f);
            walk_expr(alt, f);
        }
        IExpr::Call { callee, args, .. } | IExpr::New { callee, args, .. } => {
            walk_expr(callee, f);
            args.iter().for_each(|e| walk_expr(e, f));
        }
        IExpr::Member { object, key } => {
            walk_expr(object, f);
            if let IKey::Computed(key) = key {
                walk_expr(key, f);
            }
        }
        _ => {}
    }
}

fn walk_target(target: &ITarget, f: &mut dyn FnMut(&IExpr)) {
    if let ITarget::Member { object, key } = target {
        walk_expr(object, f);
        if let IKey::Computed(key) = key {
            walk_expr(key, f);
        }
    }
}

fn expr_closures(expr: &IExpr, out: &mut Vec<Rc<IFunction>>) {
    walk_expr(expr, &mut |e| {
        if let IExpr::Closure(f) = e {
            out.push(f.clone());
        }
    });
}

fn stmt_indices(stmt: &IStmt, out: &mut Vec<usize>) {
    match stmt {
        IStmt::Var(decls) => decls.iter().for_each(|d| decl_indices(d, out)),
        IStmt::For {
            init: Some(IForInit::Var(decls)),
            test,
            update,
            body,
        } => {
            decls.iter().for_each(|d| decl_indices(d, out));
            if let Some(test) = test {
                expr_indices(test, out);
            }
            if let Some(update) = update {
                expr_indices(update, out);
            }
            stmt_indices(body, out);
        }
        IStmt::ForIn {
            index,
            target,
            right,
            body,
        } => {
            if let ITarget::Member { object, key } = target {
                expr_indices(object, out);
                if let IKey::Computed(key) = key {
                    expr_indices(key, out);
                }
            }
            expr_indices(right, out);
            out.push(*index);
            stmt_indices(body, out);
        }
        IStmt::Switch {
            index,
            discriminant,
            cases,
        } => {
            expr_indices(discriminant, out);
            out.push(*index);
            for case in cases {
                if let Some(test) = &case.test {
                    expr_indices(test, out);
                }
                case.body.iter().for_each(|s| stmt_indices(s, out));
            }
        }
        IStmt::Try {
            block,
            handler,
            finalizer,
            ..
        } => {
            block.iter().for_each(|s| stmt_indices(s, out));
            if let Some(handler) = handler {
                out.push(handler.index);
                handler.body.iter().for_each(|s| stmt_indices(s, out));
            }
            if let Some(finalizer) = finalizer {
                finalizer.iter().for_each(|s| stmt_indices(s, out));
            }
        }
        IStmt::DoWhile { body, test } => {
            stmt_indices(body, out);
            expr_indices(test, out);
        }
        IStmt::Debugger { index } => out.push(*index),
        other => {
            let mut exprs = Vec::new();
            let mut stmts = Vec::new();
            shallow(other, &mut exprs, &mut stmts);
            for e in exprs {
                expr_indices(e, out);
            }
            for s in stmts {
                stmt_indices(s, out);
            }
        }
    }
}

/// Direct expression and statement children, in source order
fn shallow<'a>(stmt: &'a IStmt, exprs: &mut Vec<&'a IExpr>, stmts: &mut Vec<&'a IStmt>) {
    match stmt {
        IStmt::Expr(e) | IStmt::Throw(e) => exprs.push(e),
        IStmt::Return(value) => exprs.extend(value.as_ref()),
        IStmt::Block(body) => stmts.extend(body),
        IStmt::If { test, cons, alt } => {
            exprs.push(test);
            stmts.push(cons);
            stmts.extend(alt.as_deref());
        }
        IStmt::For {
            init,
            test,
            update,
            body,
        } => {
            if let Some(IForInit::Expr(e)) = init {
                exprs.push(e);
            }
            exprs.extend(test.as_ref());
            exprs.extend(update.as_ref());
            stmts.push(body);
        }
        IStmt::While { test, body } => {
            exprs.push(test);
            stmts.push(body);
        }
        IStmt::With { object, body } => {
            exprs.push(object);
            stmts.push(body);
        }
        _ => {}
    }
}

fn decl_indices(decl: &IDecl, out: &mut Vec<usize>) {
    if let Some(init) = &decl.init {
        expr_indices(init, out);
        out.push(decl.index);
    }
}

/// Recorded indices of `expr` in the order the records are written
fn expr_indices(expr: &IExpr, out: &mut Vec<usize>) {
    match expr {
        IExpr::Closure(f) => out.push(f.index),
        IExpr::Plain { index, .. } => out.push(*index),
        IExpr::Array(items) | IExpr::Sequence(items) => items.iter().for_each(|e| expr_indices(e, out)),
        IExpr::Object(props) => props.iter().for_each(|p| expr_indices(&p.value, out)),
        IExpr::Unary { arg, .. } => expr_indices(arg, out),
        IExpr::Delete(target) => target_indices(target, out),
        IExpr::Update { index, target, .. } => {
            target_indices(target, out);
            out.push(*index);
        }
        IExpr::Binary { left, right, .. } | IExpr::Logical { left, right, .. } => {
            expr_indices(left, out);
            expr_indices(right, out);
        }
        IExpr::Assign {
            index,
            target,
            value,
            ..
        } => {
            target_indices(target, out);
            expr_indices(value, out);
            out.push(*index);
        }
        IExpr::Conditional { test, cons, alt } => {
            expr_indices(test, out);
            expr_indices(cons, out);
            expr_indices(alt, out);
        }
        IExpr::Call {
            index,
            callee,
            args,
        }
        | IExpr::New {
            index,
            callee,
            args,
        } => {
            expr_indices(callee, out);
            args.iter().for_each(|e| expr_indices(e, out));
            out.push(*index);
        }
        IExpr::Member { object, key } => {
            expr_indices(object, out);
            if let IKey::Computed(key) = key {
                expr_indices(key, out);
            }
        }
        _ => {}
    }
}

fn target_indices(target: &ITarget, out: &mut Vec<usize>) {
    if let ITarget::Member { object, key } = target {
        expr_indices(object, out);
        if let IKey::Computed(key) = key {
            expr_indices(key, out);
        }
    }
}
