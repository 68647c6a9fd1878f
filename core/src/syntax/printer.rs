//! Source printer
//!
//! Renders source trees back to text. Output re-parses to an equal tree.

use super::ast::{Expr, ForInTarget, ForInit, Function, PropKind, Stmt, UnaryOp};

/// Print a program, one top-level statement per line
pub fn print_program(body: &[Stmt]) -> String {
    let mut printer = Printer::default();
    for stmt in body {
        printer.stmt(stmt);
    }
    printer.out
}

/// Print a single expression
pub fn print_expression(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr, 0);
    out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn block(&mut self, head: &str, body: &[Stmt], tail: &str) {
        self.line(&format!("{}{{", head));
        self.indent += 1;
        for stmt in body {
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.line(&format!("}}{}", tail));
    }

    fn nested(&mut self, head: &str, body: &Stmt) {
        match body {
            Stmt::Block { body } => self.block(head, body, ""),
            other => {
                self.line(head.trim_end());
                self.indent += 1;
                self.stmt(other);
                self.indent -= 1;
            }
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var { decls } => {
                let text = decls
                    .iter()
                    .map(|d| match &d.init {
                        Some(init) => format!("{} = {}", d.name, expr_at(init, 2)),
                        None => d.name.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                self.line(&format!("var {};", text));
            }
            Stmt::FunctionDecl { func } => {
                self.block(&format!("{} ", function_head(func)), &func.body, "");
            }
            Stmt::Expr { expr } => {
                let text = print_expression(expr);
                // A leading `{` or `function` would re-parse as a statement
                if text.starts_with('{') || text.starts_with("function") {
                    self.line(&format!("({});", text));
                } else {
                    self.line(&format!("{};", text));
                }
            }
            Stmt::Block { body } => self.block("", body, ""),
            Stmt::If { test, cons, alt } => {
                let head = format!("if ({}) ", print_expression(test));
                if alt.is_some() && ends_in_open_if(cons) {
                    // the else would attach to the inner if
                    self.block(&head, std::slice::from_ref(cons.as_ref()), "");
                } else {
                    self.nested(&head, cons);
                }
                if let Some(alt) = alt {
                    self.nested("else ", alt);
                }
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let init = match init {
                    Some(ForInit::Var { decls }) => format!(
                        "var {}",
                        decls
                            .iter()
                            .map(|d| match &d.init {
                                Some(init) => format!("{} = {}", d.name, expr_at(init, 2)),
                                None => d.name.clone(),
                            })
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    Some(ForInit::Expr { expr }) => print_expression(expr),
                    None => String::new(),
                };
                let test = test.as_ref().map(print_expression).unwrap_or_default();
                let update = update.as_ref().map(print_expression).unwrap_or_default();
                self.nested(&format!("for ({}; {}; {}) ", init, test, update), body);
            }
            Stmt::ForIn { left, right, body } => {
                let left = match left {
                    ForInTarget::Var { name } => format!("var {}", name),
                    ForInTarget::Expr { expr } => expr_at(expr, 17),
                };
                self.nested(&format!("for ({} in {}) ", left, print_expression(right)), body);
            }
            Stmt::While { test, body } => {
                self.nested(&format!("while ({}) ", print_expression(test)), body)
            }
            Stmt::DoWhile { body, test } => match body.as_ref() {
                Stmt::Block { body } => {
                    self.block("do ", body, &format!(" while ({});", print_expression(test)))
                }
                other => {
                    self.nested("do ", other);
                    self.line(&format!("while ({});", print_expression(test)));
                }
            },
            Stmt::Return { value } => match value {
                Some(value) => self.line(&format!("return {};", print_expression(value))),
                None => self.line("return;"),
            },
            Stmt::Break { label } => match label {
                Some(label) => self.line(&format!("break {};", label)),
                None => self.line("break;"),
            },
            Stmt::Continue { label } => match label {
                Some(label) => self.line(&format!("continue {};", label)),
                None => self.line("continue;"),
            },
            Stmt::Throw { value } => self.line(&format!("throw {};", print_expression(value))),
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                self.block("try ", block, "");
                if let Some(handler) = handler {
                    self.block(&format!("catch ({}) ", handler.param), &handler.body, "");
                }
                if let Some(finalizer) = finalizer {
                    self.block("finally ", finalizer, "");
                }
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                self.line(&format!("switch ({}) {{", print_expression(discriminant)));
                self.indent += 1;
                for case in cases {
                    match &case.test {
                        Some(test) => self.line(&format!("case {}:", print_expression(test))),
                        None => self.line("default:"),
                    }
                    self.indent += 1;
                    for stmt in &case.body {
                        self.stmt(stmt);
                    }
                    self.indent -= 1;
                }
                self.indent -= 1;
                self.line("}");
            }
            Stmt::With { object, body } => {
                self.nested(&format!("with ({}) ", print_expression(object)), body)
            }
            Stmt::Labeled { label, body } => {
                self.line(&format!("{}:", label));
                self.stmt(body);
            }
            Stmt::Debugger => self.line("debugger;"),
            Stmt::Empty => self.line(";"),
        }
    }
}

/// Whether `stmt` ends in an `if` with no `else`, reached through unbraced bodies
fn ends_in_open_if(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::If { alt: None, .. } => true,
        Stmt::If { alt: Some(alt), .. } => ends_in_open_if(alt),
        Stmt::For { body, .. }
        | Stmt::ForIn { body, .. }
        | Stmt::While { body, .. }
        | Stmt::With { body, .. }
        | Stmt::Labeled { body, .. } => ends_in_open_if(body),
        _ => false,
    }
}

fn function_head(func: &Function) -> String {
    format!(
        "function {}({})",
        func.name.as_deref().unwrap_or(""),
        func.params.join(", ")
    )
    .replace("function (", "function(")
}

fn function_inline(func: &Function) -> String {
    let mut printer = Printer {
        out: String::new(),
        indent: 0,
    };
    printer.block(&format!("{} ", function_head(func)), &func.body, "");
    printer.out.trim_end().replace('\n', " ")
}

/* ===================== Expressions ===================== */

/// Binding power of an expression; higher binds tighter
pub(crate) fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Sequence { .. } => 1,
        Expr::Assign { .. } => 2,
        Expr::Conditional { .. } => 3,
        Expr::Logical { op, .. } => match op {
            super::ast::LogicalOp::Or => 4,
            super::ast::LogicalOp::And => 5,
        },
        Expr::Binary { op, .. } => binary_precedence(*op),
        Expr::Unary { .. } => 15,
        Expr::Update { prefix: true, .. } => 15,
        Expr::Update { prefix: false, .. } => 16,
        Expr::Function { .. } => 17,
        _ => 18,
    }
}

pub(crate) fn binary_precedence(op: super::ast::BinaryOp) -> u8 {
    use super::ast::BinaryOp::*;
    match op {
        BitOr => 6,
        BitXor => 7,
        BitAnd => 8,
        Eq | NotEq | StrictEq | StrictNotEq => 9,
        Lt | LtE | Gt | GtE | In | InstanceOf => 10,
        Shl | Shr | UShr => 11,
        Add | Sub => 12,
        Mul | Div | Mod => 13,
    }
}

fn expr_at(expr: &Expr, min: u8) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr, min);
    out
}

fn write_expr(out: &mut String, expr: &Expr, min: u8) {
    let prec = precedence(expr);
    let wrap = prec < min;
    if wrap {
        out.push('(');
    }
    match expr {
        Expr::LitNum { v } => out.push_str(&crate::runtime::ops::number_to_string(*v)),
        Expr::LitStr { v } => out.push_str(&quote(v)),
        Expr::LitBool { v } => out.push_str(if *v { "true" } else { "false" }),
        Expr::LitNull => out.push_str("null"),
        Expr::Ident { name } => out.push_str(name),
        Expr::This => out.push_str("this"),
        Expr::Array { elements } => {
            out.push('[');
            let items: Vec<String> = elements.iter().map(|e| expr_at(e, 2)).collect();
            out.push_str(&items.join(", "));
            out.push(']');
        }
        Expr::Object { props } => {
            if props.is_empty() {
                out.push_str("{}");
            } else {
                let items: Vec<String> = props
                    .iter()
                    .map(|p| match (&p.kind, &p.value) {
                        (PropKind::Init, value) => format!("{}: {}", property_key(&p.key), expr_at(value, 2)),
                        (kind, Expr::Function { func }) => {
                            let word = if *kind == PropKind::Get { "get" } else { "set" };
                            let body = function_inline(func);
                            let body = body.trim_start_matches("function");
                            format!("{} {}{}", word, property_key(&p.key), body)
                        }
                        (_, value) => format!("{}: {}", property_key(&p.key), expr_at(value, 2)),
                    })
                    .collect();
                out.push_str(&format!("{{ {} }}", items.join(", ")));
            }
        }
        Expr::Function { func } => out.push_str(&function_inline(func)),
        Expr::Unary { op, arg } => {
            out.push_str(op.as_str());
            if matches!(op, UnaryOp::Typeof | UnaryOp::Void | UnaryOp::Delete)
                || matches!(arg.as_ref(), Expr::Unary { .. } | Expr::Update { prefix: true, .. })
            {
                out.push(' ');
            }
            write_expr(out, arg, 15);
        }
        Expr::Update { op, prefix, arg } => {
            if *prefix {
                out.push_str(op.as_str());
                write_expr(out, arg, 16);
            } else {
                write_expr(out, arg, 17);
                out.push_str(op.as_str());
            }
        }
        Expr::Binary { op, left, right } => {
            write_expr(out, left, prec);
            out.push_str(&format!(" {} ", op.as_str()));
            write_expr(out, right, prec + 1);
        }
        Expr::Logical { op, left, right } => {
            write_expr(out, left, prec);
            out.push_str(&format!(" {} ", op.as_str()));
            write_expr(out, right, prec + 1);
        }
        Expr::Assign { op, target, value } => {
            write_expr(out, target, 17);
            match op {
                Some(op) => out.push_str(&format!(" {}= ", op.as_str())),
                None => out.push_str(" = "),
            }
            write_expr(out, value, 2);
        }
        Expr::Conditional { test, cons, alt } => {
            write_expr(out, test, 4);
            out.push_str(" ? ");
            write_expr(out, cons, 2);
            out.push_str(" : ");
            write_expr(out, alt, 2);
        }
        Expr::Call { callee, args } => {
            write_expr(out, callee, 17);
            write_args(out, args);
        }
        Expr::New { callee, args } => {
            out.push_str("new ");
            // A call inside the callee would capture the argument list
            if matches!(callee.as_ref(), Expr::Call { .. }) {
                out.push('(');
                write_expr(out, callee, 0);
                out.push(')');
            } else {
                write_expr(out, callee, 18);
            }
            write_args(out, args);
        }
        Expr::Member { object, property } => {
            write_member_object(out, object);
            out.push('.');
            out.push_str(property);
        }
        Expr::Index { object, index } => {
            write_member_object(out, object);
            out.push('[');
            write_expr(out, index, 0);
            out.push(']');
        }
        Expr::Sequence { exprs } => {
            let items: Vec<String> = exprs.iter().map(|e| expr_at(e, 2)).collect();
            out.push_str(&items.join(", "));
        }
    }
    if wrap {
        out.push(')');
    }
}

fn write_member_object(out: &mut String, object: &Expr) {
    if matches!(object, Expr::LitNum { .. } | Expr::Function { .. } | Expr::Object { .. }) {
        out.push('(');
        write_expr(out, object, 0);
        out.push(')');
    } else {
        write_expr(out, object, 17);
    }
}

fn write_args(out: &mut String, args: &[Expr]) {
    out.push('(');
    let items: Vec<String> = args.iter().map(|e| expr_at(e, 2)).collect();
    out.push_str(&items.join(", "));
    out.push(')');
}

fn property_key(key: &str) -> String {
    let plain = key
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        .unwrap_or(false)
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if plain {
        key.to_string()
    } else {
        quote(key)
    }
}

/// Double-quoted string literal with escapes
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
