//! Readable rendering of instrumented trees
//!
//! The output is JavaScript-like and shows the bookkeeping the host engine
//! performs: `_` is the frame's results cache, `lastNode` its marker and `_N`
//! the scope record N links out from the innermost one.

use crate::runtime::ops::number_to_string;
use crate::syntax::ast::PropKind;
use crate::syntax::printer::quote;

use super::ir::{IDecl, IExpr, IForInit, IFunction, IKey, IRef, IStmt, ITarget};

/// Render an instrumented function
pub fn print_instrumented(func: &IFunction) -> String {
    let mut printer = Printer::default();
    printer.function(func);
    printer.out
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

    fn open(&mut self, head: &str) {
        self.line(&format!("{}{{", head));
        self.indent += 1;
    }

    fn close(&mut self, tail: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(&format!("}}{}", tail));
    }

    fn function(&mut self, func: &IFunction) {
        let name = func.name.clone().unwrap_or_default();
        let head = if func.is_program {
            format!("(function __program{}() ", name)
        } else {
            format!("function {}({}) ", name, func.params.join(", "))
        };
        self.open(&head);
        let mut bound: Vec<String> = func.params.clone();
        bound.extend(func.declared.iter().cloned());
        bound.extend(func.self_name.iter().cloned());
        self.line(&format!(
            "var _ = {{}}, lastNode = {}, _0 = __record(arguments, {});",
            func.index,
            bound.iter().map(|n| quote(n)).collect::<Vec<_>>().join(", ")
        ));
        for (name, value) in &func.hoisted {
            self.line(&format!("_0.{} = {};", name, self.expr(value)));
        }
        self.open("try ");
        for stmt in &func.body {
            self.stmt(stmt);
        }
        self.close("");
        self.open("catch (__e) ");
        self.line(&format!(
            "throw __storeFrameInfo(__e, this, arguments, __chain, lastNode, {}, {});",
            quote(&func.namespace),
            func.index
        ));
        self.close("");
        self.close(if func.is_program { ")" } else { "" });
    }

    fn body(&mut self, stmt: &IStmt) {
        match stmt {
            IStmt::Block(body) => {
                for s in body {
                    self.stmt(s);
                }
            }
            other => self.stmt(other),
        }
    }

    fn stmt(&mut self, stmt: &IStmt) {
        match stmt {
            IStmt::Var(decls) => {
                let text = decls.iter().filter_map(|d| self.decl(d)).collect::<Vec<_>>();
                if !text.is_empty() {
                    self.line(&format!("{};", text.join(", ")));
                }
            }
            IStmt::Expr(e) => {
                let text = self.expr(e);
                self.line(&format!("{};", text));
            }
            IStmt::Block(body) => {
                self.open("");
                for s in body {
                    self.stmt(s);
                }
                self.close("");
            }
            IStmt::If { test, cons, alt } => {
                let test = self.expr(test);
                self.open(&format!("if ({}) ", test));
                self.body(cons);
                match alt {
                    Some(alt) => {
                        self.close("");
                        self.open("else ");
                        self.body(alt);
                        self.close("");
                    }
                    None => self.close(""),
                }
            }
            IStmt::For {
                init,
                test,
                update,
                body,
            } => {
                let init = match init {
                    Some(IForInit::Var(decls)) => decls
                        .iter()
                        .filter_map(|d| self.decl(d))
                        .collect::<Vec<_>>()
                        .join(", "),
                    Some(IForInit::Expr(e)) => self.expr(e),
                    None => String::new(),
                };
                let test = test.as_ref().map(|e| self.expr(e)).unwrap_or_default();
                let update = update.as_ref().map(|e| self.expr(e)).unwrap_or_default();
                self.open(&format!("for ({}; {}; {}) ", init, test, update));
                self.body(body);
                self.close("");
            }
            IStmt::ForIn {
                index,
                target,
                right,
                body,
            } => {
                let right = self.expr(right);
                let target = self.target(target);
                self.open(&format!(
                    "for (_[lastNode = {i}] = __keys({r}); _[{i}].length > 0; _[{i}].shift()) ",
                    i = index,
                    r = right
                ));
                self.line(&format!("{} = _[{}][0];", target, index));
                self.body(body);
                self.close("");
                self.line(&format!("delete _[{}];", index));
            }
            IStmt::While { test, body } => {
                let test = self.expr(test);
                self.open(&format!("while ({}) ", test));
                self.body(body);
                self.close("");
            }
            IStmt::DoWhile { body, test } => {
                self.open("do ");
                self.body(body);
                let test = self.expr(test);
                self.close(&format!(" while ({});", test));
            }
            IStmt::Return(value) => match value {
                Some(value) => {
                    let text = self.expr(value);
                    self.line(&format!("return {};", text));
                }
                None => self.line("return;"),
            },
            IStmt::Break => self.line("break;"),
            IStmt::Continue => self.line("continue;"),
            IStmt::Throw(value) => {
                let text = self.expr(value);
                self.line(&format!("throw {};", text));
            }
            IStmt::Try {
                index,
                block,
                handler,
                finalizer,
            } => {
                self.line("var __saved = __chain;");
                self.open("try ");
                for s in block {
                    self.stmt(s);
                }
                self.close("");
                if let Some(handler) = handler {
                    self.open("catch (__e) ");
                    self.line("if (__isPause(__e)) throw __e;");
                    self.line(&format!("lastNode = {};", handler.index));
                    self.line(&format!(
                        "__chain = __pushCatch(__saved, {}, __unwrap(__e));",
                        quote(&handler.param)
                    ));
                    for s in &handler.body {
                        self.stmt(s);
                    }
                    self.line("__chain = __saved;");
                    self.close("");
                }
                if let Some(finalizer) = finalizer {
                    self.open("finally ");
                    self.open("if (!__pausing()) ");
                    self.line(&format!("_[{}] = __completion();", index));
                    for s in finalizer {
                        self.stmt(s);
                    }
                    self.line(&format!("delete _[{}];", index));
                    self.close("");
                    self.close("");
                }
            }
            IStmt::Switch {
                index,
                discriminant,
                cases,
            } => {
                let disc = self.expr(discriminant);
                self.open(&format!("switch (_[lastNode = {}] = {}) ", index, disc));
                for case in cases {
                    match &case.test {
                        Some(test) => {
                            let test = self.expr(test);
                            self.line(&format!("case {}:", test));
                        }
                        None => self.line("default:"),
                    }
                    self.indent += 1;
                    for s in &case.body {
                        self.stmt(s);
                    }
                    self.indent -= 1;
                }
                self.close("");
            }
            IStmt::With { object, body } => {
                let object = self.expr(object);
                self.line(&format!("__chain = __pushWith(__chain, {});", object));
                self.open("");
                self.body(body);
                self.close("");
                self.line("__chain = __chain.parent;");
            }
            IStmt::Debugger { index } => {
                self.line(&format!(
                    "if ((_[lastNode = {i}] = undefined, __debugging)) throw __pause({i});",
                    i = index
                ));
            }
            IStmt::Empty => {}
        }
    }

    fn decl(&self, decl: &IDecl) -> Option<String> {
        let init = decl.init.as_ref()?;
        Some(format!(
            "(_[{i}] = {t} = {v}, lastNode = {i})",
            i = decl.index,
            t = reference(&decl.target),
            v = self.expr(init)
        ))
    }

    fn target(&self, target: &ITarget) -> String {
        match target {
            ITarget::Ref(r) => reference(r),
            ITarget::Member { object, key } => self.member(object, key),
        }
    }

    fn member(&self, object: &IExpr, key: &IKey) -> String {
        let object = self.operand(object);
        match key {
            IKey::Static(name) => format!("{}.{}", object, name),
            IKey::Computed(key) => format!("{}[{}]", object, self.expr(key)),
        }
    }

    /// Expression wrapped in parentheses unless it is atomic
    fn operand(&self, expr: &IExpr) -> String {
        let text = self.expr(expr);
        match expr {
            IExpr::Num(_)
            | IExpr::Str(_)
            | IExpr::Bool(_)
            | IExpr::Null
            | IExpr::Ref(IRef::Slot { .. } | IRef::Global(_) | IRef::Free(_))
            | IExpr::This
            | IExpr::Arguments
            | IExpr::Array(_)
            | IExpr::Member { .. }
            | IExpr::Call { .. } => text,
            _ => format!("({})", text),
        }
    }

    fn list(&self, exprs: &[IExpr]) -> String {
        exprs.iter().map(|e| self.expr(e)).collect::<Vec<_>>().join(", ")
    }

    fn expr(&self, expr: &IExpr) -> String {
        match expr {
            IExpr::Num(n) => number_to_string(*n),
            IExpr::Str(s) => quote(s),
            IExpr::Bool(b) => b.to_string(),
            IExpr::Null => "null".to_string(),
            IExpr::Ref(r) => reference(r),
            IExpr::This => "this".to_string(),
            IExpr::Arguments => "arguments".to_string(),
            IExpr::Array(items) => format!("[{}]", self.list(items)),
            IExpr::Object(props) => {
                let props = props
                    .iter()
                    .map(|p| {
                        let prefix = match p.kind {
                            PropKind::Init => "",
                            PropKind::Get => "get ",
                            PropKind::Set => "set ",
                        };
                        format!("{}{}: {}", prefix, quote(&p.key), self.expr(&p.value))
                    })
                    .collect::<Vec<_>>();
                format!("{{{}}}", props.join(", "))
            }
            IExpr::Closure(func) => {
                let mut inner = Printer {
                    out: String::new(),
                    indent: self.indent + 1,
                };
                inner.function(func);
                format!(
                    "(_[{i}] = __createClosure({ns}, {i}, __chain, {body}))",
                    i = func.index,
                    ns = quote(&func.namespace),
                    body = inner.out.trim()
                )
            }
            IExpr::Plain { namespace, index } => {
                format!("(_[{i}] = __plain({}, {i}))", quote(namespace), i = index)
            }
            IExpr::Unary { op, arg } => {
                let sep = if op.as_str().chars().all(char::is_alphabetic) {
                    " "
                } else {
                    ""
                };
                format!("{}{}{}", op.as_str(), sep, self.operand(arg))
            }
            IExpr::Delete(target) => format!("delete {}", self.target(target)),
            IExpr::Update {
                index,
                op,
                prefix,
                target,
            } => {
                let target = self.target(target);
                let inner = if *prefix {
                    format!("{}{}", op.as_str(), target)
                } else {
                    format!("{}{}", target, op.as_str())
                };
                format!("(_[lastNode = {}] = {})", index, inner)
            }
            IExpr::Binary { op, left, right } => format!(
                "{} {} {}",
                self.operand(left),
                op.as_str(),
                self.operand(right)
            ),
            IExpr::Logical { op, left, right } => format!(
                "{} {} {}",
                self.operand(left),
                op.as_str(),
                self.operand(right)
            ),
            IExpr::Assign {
                index,
                op,
                target,
                value,
            } => format!(
                "(_[{i}] = {t} {o}= {v}, lastNode = {i}, _[{i}])",
                i = index,
                t = self.target(target),
                o = op.map(|o| o.as_str()).unwrap_or(""),
                v = self.expr(value)
            ),
            IExpr::Conditional { test, cons, alt } => format!(
                "{} ? {} : {}",
                self.operand(test),
                self.operand(cons),
                self.operand(alt)
            ),
            IExpr::Call {
                index,
                callee,
                args,
            } => format!(
                "(_[lastNode = {}] = {}({}))",
                index,
                self.operand(callee),
                self.list(args)
            ),
            IExpr::New {
                index,
                callee,
                args,
            } => format!(
                "(_[lastNode = {}] = new {}({}))",
                index,
                self.operand(callee),
                self.list(args)
            ),
            IExpr::Member { object, key } => self.member(object, key),
            IExpr::Sequence(items) => self.list(items),
        }
    }
}

fn reference(r: &IRef) -> String {
    match r {
        IRef::Slot { hops, name } => format!("_{}.{}", hops, name),
        IRef::Global(name) | IRef::Free(name) => name.clone(),
        IRef::Dynamic {
            withs,
            name,
            fallback,
        } => {
            let base = match fallback.as_ref() {
                IRef::Slot { hops, .. } => format!("_{}", hops),
                _ => "__global".to_string(),
            };
            let select = withs.iter().rev().fold(base, |rest, hops| {
                format!("{} in _{h} ? _{h} : {}", quote(name), rest, h = hops)
            });
            format!("({}).{}", select, name)
        }
    }
}
