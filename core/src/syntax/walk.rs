//! Uniform view over syntax nodes
//!
//! `NodeRef::children` defines the one traversal order every consumer agrees
//! on. Position indices are assigned in pre-order over this order, so the
//! registry, the rewriter and the stepping interpreter can all derive a child's
//! index from its parent's without talking to each other.

use super::ast::{CatchClause, Declarator, Expr, ForInTarget, ForInit, Function, Property, Stmt, SwitchCase};

/// A borrowed syntax node of any kind
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Function(&'a Function),
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Declarator(&'a Declarator),
    Property(&'a Property),
    Case(&'a SwitchCase),
    Catch(&'a CatchClause),
}

impl<'a> NodeRef<'a> {
    /// Child nodes in evaluation order
    pub fn children(self) -> Vec<NodeRef<'a>> {
        let mut out = Vec::new();
        match self {
            NodeRef::Function(func) => stmts(&mut out, &func.body),
            NodeRef::Stmt(stmt) => stmt_children(&mut out, stmt),
            NodeRef::Expr(expr) => expr_children(&mut out, expr),
            NodeRef::Declarator(decl) => {
                if let Some(init) = &decl.init {
                    out.push(NodeRef::Expr(init));
                }
            }
            NodeRef::Property(prop) => out.push(NodeRef::Expr(&prop.value)),
            NodeRef::Case(case) => {
                if let Some(test) = &case.test {
                    out.push(NodeRef::Expr(test));
                }
                stmts(&mut out, &case.body);
            }
            NodeRef::Catch(clause) => stmts(&mut out, &clause.body),
        }
        out
    }

    /// The function literal this node introduces, if any
    pub fn function(self) -> Option<&'a Function> {
        match self {
            NodeRef::Function(func) => Some(func),
            NodeRef::Stmt(Stmt::FunctionDecl { func }) => Some(func),
            NodeRef::Expr(Expr::Function { func }) => Some(func),
            _ => None,
        }
    }

    /// Short node-kind name used in diagnostics
    pub fn kind(self) -> &'static str {
        match self {
            NodeRef::Function(_) => "Function",
            NodeRef::Declarator(_) => "Declarator",
            NodeRef::Property(_) => "Property",
            NodeRef::Case(_) => "SwitchCase",
            NodeRef::Catch(_) => "CatchClause",
            NodeRef::Stmt(stmt) => match stmt {
                Stmt::Var { .. } => "VariableDeclaration",
                Stmt::FunctionDecl { .. } => "FunctionDeclaration",
                Stmt::Expr { .. } => "ExpressionStatement",
                Stmt::Block { .. } => "BlockStatement",
                Stmt::If { .. } => "IfStatement",
                Stmt::For { .. } => "ForStatement",
                Stmt::ForIn { .. } => "ForInStatement",
                Stmt::While { .. } => "WhileStatement",
                Stmt::DoWhile { .. } => "DoWhileStatement",
                Stmt::Return { .. } => "ReturnStatement",
                Stmt::Break { .. } => "BreakStatement",
                Stmt::Continue { .. } => "ContinueStatement",
                Stmt::Throw { .. } => "ThrowStatement",
                Stmt::Try { .. } => "TryStatement",
                Stmt::Switch { .. } => "SwitchStatement",
                Stmt::With { .. } => "WithStatement",
                Stmt::Labeled { .. } => "LabeledStatement",
                Stmt::Debugger => "DebuggerStatement",
                Stmt::Empty => "EmptyStatement",
            },
            NodeRef::Expr(expr) => match expr {
                Expr::LitNum { .. }
                | Expr::LitStr { .. }
                | Expr::LitBool { .. }
                | Expr::LitNull => "Literal",
                Expr::Ident { .. } => "Identifier",
                Expr::This => "ThisExpression",
                Expr::Array { .. } => "ArrayExpression",
                Expr::Object { .. } => "ObjectExpression",
                Expr::Function { .. } => "FunctionExpression",
                Expr::Unary { .. } => "UnaryExpression",
                Expr::Update { .. } => "UpdateExpression",
                Expr::Binary { .. } => "BinaryExpression",
                Expr::Logical { .. } => "LogicalExpression",
                Expr::Assign { .. } => "AssignmentExpression",
                Expr::Conditional { .. } => "ConditionalExpression",
                Expr::Call { .. } => "CallExpression",
                Expr::New { .. } => "NewExpression",
                Expr::Member { .. } | Expr::Index { .. } => "MemberExpression",
                Expr::Sequence { .. } => "SequenceExpression",
            },
        }
    }
}

fn stmts<'a>(out: &mut Vec<NodeRef<'a>>, body: &'a [Stmt]) {
    out.extend(body.iter().map(NodeRef::Stmt));
}

fn stmt_children<'a>(out: &mut Vec<NodeRef<'a>>, stmt: &'a Stmt) {
    match stmt {
        Stmt::Var { decls } => out.extend(decls.iter().map(NodeRef::Declarator)),
        Stmt::FunctionDecl { func } => stmts(out, &func.body),
        Stmt::Expr { expr } => out.push(NodeRef::Expr(expr)),
        Stmt::Block { body } => stmts(out, body),
        Stmt::If { test, cons, alt } => {
            out.push(NodeRef::Expr(test));
            out.push(NodeRef::Stmt(cons));
            if let Some(alt) = alt {
                out.push(NodeRef::Stmt(alt));
            }
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::Var { decls }) => out.extend(decls.iter().map(NodeRef::Declarator)),
                Some(ForInit::Expr { expr }) => out.push(NodeRef::Expr(expr)),
                None => {}
            }
            if let Some(test) = test {
                out.push(NodeRef::Expr(test));
            }
            if let Some(update) = update {
                out.push(NodeRef::Expr(update));
            }
            out.push(NodeRef::Stmt(body));
        }
        Stmt::ForIn { left, right, body } => {
            if let ForInTarget::Expr { expr } = left {
                out.push(NodeRef::Expr(expr));
            }
            out.push(NodeRef::Expr(right));
            out.push(NodeRef::Stmt(body));
        }
        Stmt::While { test, body } => {
            out.push(NodeRef::Expr(test));
            out.push(NodeRef::Stmt(body));
        }
        Stmt::DoWhile { body, test } => {
            out.push(NodeRef::Stmt(body));
            out.push(NodeRef::Expr(test));
        }
        Stmt::Return { value } => {
            if let Some(value) = value {
                out.push(NodeRef::Expr(value));
            }
        }
        Stmt::Throw { value } => out.push(NodeRef::Expr(value)),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            stmts(out, block);
            if let Some(handler) = handler {
                out.push(NodeRef::Catch(handler));
            }
            if let Some(finalizer) = finalizer {
                stmts(out, finalizer);
            }
        }
        Stmt::Switch {
            discriminant,
            cases,
        } => {
            out.push(NodeRef::Expr(discriminant));
            out.extend(cases.iter().map(NodeRef::Case));
        }
        Stmt::With { object, body } => {
            out.push(NodeRef::Expr(object));
            out.push(NodeRef::Stmt(body));
        }
        Stmt::Labeled { body, .. } => out.push(NodeRef::Stmt(body)),
        Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Debugger | Stmt::Empty => {}
    }
}

fn expr_children<'a>(out: &mut Vec<NodeRef<'a>>, expr: &'a Expr) {
    match expr {
        Expr::LitNum { .. }
        | Expr::LitStr { .. }
        | Expr::LitBool { .. }
        | Expr::LitNull
        | Expr::Ident { .. }
        | Expr::This => {}
        Expr::Array { elements } => out.extend(elements.iter().map(NodeRef::Expr)),
        Expr::Object { props } => out.extend(props.iter().map(NodeRef::Property)),
        Expr::Function { func } => stmts(out, &func.body),
        Expr::Unary { arg, .. } | Expr::Update { arg, .. } => out.push(NodeRef::Expr(arg)),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            out.push(NodeRef::Expr(left));
            out.push(NodeRef::Expr(right));
        }
        Expr::Assign { target, value, .. } => {
            out.push(NodeRef::Expr(target));
            out.push(NodeRef::Expr(value));
        }
        Expr::Conditional { test, cons, alt } => {
            out.push(NodeRef::Expr(test));
            out.push(NodeRef::Expr(cons));
            out.push(NodeRef::Expr(alt));
        }
        Expr::Call { callee, args } | Expr::New { callee, args } => {
            out.push(NodeRef::Expr(callee));
            out.extend(args.iter().map(NodeRef::Expr));
        }
        Expr::Member { object, .. } => out.push(NodeRef::Expr(object)),
        Expr::Index { object, index } => {
            out.push(NodeRef::Expr(object));
            out.push(NodeRef::Expr(index));
        }
        Expr::Sequence { exprs } => out.extend(exprs.iter().map(NodeRef::Expr)),
    }
}

/// Count of nodes in the subtree rooted at `node`, the root included
pub fn subtree_size(node: NodeRef<'_>) -> usize {
    1 + node.children().into_iter().map(subtree_size).sum::<usize>()
}

/// Pre-order subtree sizes, one entry per node
pub fn subtree_sizes(root: NodeRef<'_>) -> Vec<usize> {
    let mut sizes = Vec::new();
    fill_sizes(root, &mut sizes);
    sizes
}

fn fill_sizes(node: NodeRef<'_>, sizes: &mut Vec<usize>) -> usize {
    let slot = sizes.len();
    sizes.push(1);
    let mut size = 1;
    for child in node.children() {
        size += fill_sizes(child, sizes);
    }
    sizes[slot] = size;
    size
}
