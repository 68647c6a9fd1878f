//! PEST-based parser for the scripting language
//!
//! Produces the source AST consumed by the registry, the rewriter and the
//! stepping interpreter.

use std::sync::OnceLock;

use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;

use super::ast::{
    BinaryOp, CatchClause, Declarator, Expr, ForInTarget, ForInit, Function, LogicalOp, Program,
    PropKind, Property, Stmt, SwitchCase, UnaryOp, UpdateOp,
};

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct ScriptParser;

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("syntax error: {0}")]
    PestError(String),
    #[error("invalid program: {0}")]
    BuildError(String),
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ParseError::PestError(err.to_string())
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Public API ===================== */

/// Parse a complete source file
pub fn parse_program(source: &str) -> ParseResult<Program> {
    let mut pairs = ScriptParser::parse(Rule::program, source)?;
    let program = next(&mut pairs, "program")?;

    let body = program
        .into_inner()
        .filter(|pair| pair.as_rule() != Rule::EOI)
        .map(build_statement)
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(Program { body })
}

/// Parse a source file that consists of exactly one function declaration or
/// a parenthesized function expression, returning that function.
pub fn parse_function(source: &str) -> ParseResult<Function> {
    let program = parse_program(source)?;
    match <[Stmt; 1]>::try_from(program.body) {
        Ok([Stmt::FunctionDecl { func }]) => Ok(func),
        Ok([Stmt::Expr {
            expr: Expr::Function { func },
        }]) => Ok(func),
        _ => Err(ParseError::BuildError(
            "expected a single function definition".to_string(),
        )),
    }
}

/// Parse a single expression (testing and REPL helper)
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let program = parse_program(source)?;
    match <[Stmt; 1]>::try_from(program.body) {
        Ok([Stmt::Expr { expr }]) => Ok(expr),
        _ => Err(ParseError::BuildError(
            "expected a single expression".to_string(),
        )),
    }
}

/* ===================== Helpers ===================== */

fn next<'i>(pairs: &mut Pairs<'i, Rule>, what: &str) -> ParseResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| ParseError::BuildError(format!("expected {}", what)))
}

fn unexpected<T>(pair: &Pair<Rule>, context: &str) -> ParseResult<T> {
    let (line, col) = pair.line_col();
    Err(ParseError::BuildError(format!(
        "unexpected {:?} in {} at {}:{}",
        pair.as_rule(),
        context,
        line,
        col
    )))
}

fn build_block_body(pair: Pair<Rule>) -> ParseResult<Vec<Stmt>> {
    // block = { "{" ~ statement* ~ "}" }
    pair.into_inner().map(build_statement).collect()
}

/* ===================== Statements ===================== */

fn build_statement(pair: Pair<Rule>) -> ParseResult<Stmt> {
    match pair.as_rule() {
        Rule::block => Ok(Stmt::Block {
            body: build_block_body(pair)?,
        }),
        Rule::var_stmt => {
            let mut inner = pair.into_inner();
            let decls = build_var_decls(next(&mut inner, "declarations")?)?;
            Ok(Stmt::Var { decls })
        }
        Rule::function_decl => Ok(Stmt::FunctionDecl {
            func: build_function(pair)?,
        }),
        Rule::if_stmt => {
            let mut inner = pair.into_inner();
            let test = build_expression(next(&mut inner, "if condition")?)?;
            let cons = Box::new(build_statement(next(&mut inner, "if body")?)?);
            let alt = inner.next().map(build_statement).transpose()?.map(Box::new);
            Ok(Stmt::If { test, cons, alt })
        }
        Rule::for_in_stmt => {
            // for_in_stmt = { "for" ~ "(" ~ (for_in_var | lhs_expr) ~ "in" ~ expression ~ ")" ~ statement }
            let mut inner = pair.into_inner();
            let left_pair = next(&mut inner, "for-in target")?;
            let left = match left_pair.as_rule() {
                Rule::for_in_var => ForInTarget::Var {
                    name: next(&mut left_pair.into_inner(), "identifier")?
                        .as_str()
                        .to_string(),
                },
                _ => ForInTarget::Expr {
                    expr: build_expression(left_pair)?,
                },
            };
            let right = build_expression(next(&mut inner, "for-in object")?)?;
            let body = Box::new(build_statement(next(&mut inner, "for-in body")?)?);
            Ok(Stmt::ForIn { left, right, body })
        }
        Rule::for_stmt => {
            let mut init = None;
            let mut test = None;
            let mut update = None;
            let mut body = None;
            for part in pair.into_inner() {
                match part.as_rule() {
                    Rule::for_init => {
                        let inner = next(&mut part.into_inner(), "for initializer")?;
                        init = Some(match inner.as_rule() {
                            Rule::var_decls => ForInit::Var {
                                decls: build_var_decls(inner)?,
                            },
                            _ => ForInit::Expr {
                                expr: build_expression(inner)?,
                            },
                        });
                    }
                    Rule::for_test => {
                        test = Some(build_expression(next(&mut part.into_inner(), "for test")?)?)
                    }
                    Rule::for_update => {
                        update = Some(build_expression(next(&mut part.into_inner(), "for update")?)?)
                    }
                    _ => body = Some(build_statement(part)?),
                }
            }
            let body = body.ok_or_else(|| ParseError::BuildError("for loop without body".to_string()))?;
            Ok(Stmt::For {
                init,
                test,
                update,
                body: Box::new(body),
            })
        }
        Rule::while_stmt => {
            let mut inner = pair.into_inner();
            let test = build_expression(next(&mut inner, "while condition")?)?;
            let body = Box::new(build_statement(next(&mut inner, "while body")?)?);
            Ok(Stmt::While { test, body })
        }
        Rule::do_while_stmt => {
            let mut inner = pair.into_inner();
            let body = Box::new(build_statement(next(&mut inner, "do body")?)?);
            let test = build_expression(next(&mut inner, "do-while condition")?)?;
            Ok(Stmt::DoWhile { body, test })
        }
        Rule::return_stmt => {
            let value = pair.into_inner().next().map(build_expression).transpose()?;
            Ok(Stmt::Return { value })
        }
        Rule::break_stmt => Ok(Stmt::Break {
            label: pair.into_inner().next().map(|p| p.as_str().to_string()),
        }),
        Rule::continue_stmt => Ok(Stmt::Continue {
            label: pair.into_inner().next().map(|p| p.as_str().to_string()),
        }),
        Rule::throw_stmt => Ok(Stmt::Throw {
            value: build_expression(next(&mut pair.into_inner(), "thrown value")?)?,
        }),
        Rule::try_stmt => build_try(pair),
        Rule::switch_stmt => {
            let mut inner = pair.into_inner();
            let discriminant = build_expression(next(&mut inner, "switch discriminant")?)?;
            let cases = inner.map(build_switch_case).collect::<ParseResult<Vec<_>>>()?;
            Ok(Stmt::Switch {
                discriminant,
                cases,
            })
        }
        Rule::with_stmt => {
            let mut inner = pair.into_inner();
            let object = build_expression(next(&mut inner, "with object")?)?;
            let body = Box::new(build_statement(next(&mut inner, "with body")?)?);
            Ok(Stmt::With { object, body })
        }
        Rule::labeled_stmt => {
            let mut inner = pair.into_inner();
            let label = next(&mut inner, "label")?.as_str().to_string();
            let body = Box::new(build_statement(next(&mut inner, "labeled body")?)?);
            Ok(Stmt::Labeled { label, body })
        }
        Rule::debugger_stmt => Ok(Stmt::Debugger),
        Rule::empty_stmt => Ok(Stmt::Empty),
        Rule::expr_stmt => Ok(Stmt::Expr {
            expr: build_expression(next(&mut pair.into_inner(), "expression")?)?,
        }),
        _ => unexpected(&pair, "statement position"),
    }
}

fn build_var_decls(pair: Pair<Rule>) -> ParseResult<Vec<Declarator>> {
    // var_decls = { "var" ~ declarator ~ ("," ~ declarator)* }
    pair.into_inner()
        .map(|decl| {
            // declarator = { identifier ~ (assign_eq ~ assignment)? }
            let mut inner = decl.into_inner();
            let name = next(&mut inner, "variable name")?.as_str().to_string();
            let init = inner
                .find(|p| p.as_rule() != Rule::assign_eq)
                .map(build_expression)
                .transpose()?;
            Ok(Declarator { name, init })
        })
        .collect()
}

fn build_function(pair: Pair<Rule>) -> ParseResult<Function> {
    // function_decl / function_expr = { "function" ~ identifier? ~ params ~ function_body }
    let mut name = None;
    let mut params = Vec::new();
    let mut body = Vec::new();
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::identifier => name = Some(part.as_str().to_string()),
            Rule::params => {
                params = part.into_inner().map(|p| p.as_str().to_string()).collect();
            }
            Rule::function_body => body = build_block_body(part)?,
            _ => return unexpected(&part, "function"),
        }
    }
    Ok(Function { name, params, body })
}

fn build_try(pair: Pair<Rule>) -> ParseResult<Stmt> {
    let mut inner = pair.into_inner();
    let block = build_block_body(next(&mut inner, "try block")?)?;
    let mut handler = None;
    let mut finalizer = None;
    for part in inner {
        match part.as_rule() {
            Rule::catch_clause => {
                let mut parts = part.into_inner();
                let param = next(&mut parts, "catch parameter")?.as_str().to_string();
                let body = build_block_body(next(&mut parts, "catch block")?)?;
                handler = Some(CatchClause { param, body });
            }
            Rule::finally_clause => {
                finalizer = Some(build_block_body(next(&mut part.into_inner(), "finally block")?)?);
            }
            _ => return unexpected(&part, "try statement"),
        }
    }
    if handler.is_none() && finalizer.is_none() {
        return Err(ParseError::BuildError(
            "try statement needs a catch or finally clause".to_string(),
        ));
    }
    Ok(Stmt::Try {
        block,
        handler,
        finalizer,
    })
}

fn build_switch_case(pair: Pair<Rule>) -> ParseResult<SwitchCase> {
    // switch_case = { (case_test | default_label) ~ statement* }
    let mut inner = pair.into_inner();
    let label = next(&mut inner, "case label")?;
    let test = match label.as_rule() {
        Rule::case_test => Some(build_expression(next(&mut label.into_inner(), "case test")?)?),
        _ => None,
    };
    let body = inner.map(build_statement).collect::<ParseResult<Vec<_>>>()?;
    Ok(SwitchCase { test, body })
}

/* ===================== Expressions ===================== */

fn pratt() -> &'static PrattParser<Rule> {
    static PRATT: OnceLock<PrattParser<Rule>> = OnceLock::new();
    PRATT.get_or_init(|| {
        PrattParser::new()
            .op(Op::infix(Rule::op_or, Assoc::Left))
            .op(Op::infix(Rule::op_and, Assoc::Left))
            .op(Op::infix(Rule::op_bitor, Assoc::Left))
            .op(Op::infix(Rule::op_bitxor, Assoc::Left))
            .op(Op::infix(Rule::op_bitand, Assoc::Left))
            .op(Op::infix(Rule::op_eq, Assoc::Left)
                | Op::infix(Rule::op_ne, Assoc::Left)
                | Op::infix(Rule::op_strict_eq, Assoc::Left)
                | Op::infix(Rule::op_strict_ne, Assoc::Left))
            .op(Op::infix(Rule::op_lt, Assoc::Left)
                | Op::infix(Rule::op_le, Assoc::Left)
                | Op::infix(Rule::op_gt, Assoc::Left)
                | Op::infix(Rule::op_ge, Assoc::Left)
                | Op::infix(Rule::op_in, Assoc::Left)
                | Op::infix(Rule::op_instanceof, Assoc::Left))
            .op(Op::infix(Rule::op_shl, Assoc::Left)
                | Op::infix(Rule::op_shr, Assoc::Left)
                | Op::infix(Rule::op_ushr, Assoc::Left))
            .op(Op::infix(Rule::op_add, Assoc::Left) | Op::infix(Rule::op_sub, Assoc::Left))
            .op(Op::infix(Rule::op_mul, Assoc::Left)
                | Op::infix(Rule::op_div, Assoc::Left)
                | Op::infix(Rule::op_mod, Assoc::Left))
    })
}

fn build_expression(pair: Pair<Rule>) -> ParseResult<Expr> {
    match pair.as_rule() {
        Rule::expression => {
            // expression = { assignment ~ ("," ~ assignment)* }
            let mut exprs = pair
                .into_inner()
                .map(build_expression)
                .collect::<ParseResult<Vec<_>>>()?;
            if exprs.len() == 1 {
                if let Some(single) = exprs.pop() {
                    return Ok(single);
                }
            }
            Ok(Expr::Sequence { exprs })
        }
        Rule::assignment => {
            // assignment = { conditional ~ (assign_op ~ assignment)? }
            let mut inner = pair.into_inner();
            let target = build_expression(next(&mut inner, "expression")?)?;
            let Some(op_pair) = inner.next() else {
                return Ok(target);
            };
            let op = match op_pair.as_str() {
                "=" => None,
                compound => {
                    let symbol = &compound[..compound.len() - 1];
                    Some(BinaryOp::from_symbol(symbol).ok_or_else(|| {
                        ParseError::BuildError(format!("unknown assignment operator {}", compound))
                    })?)
                }
            };
            if !matches!(
                target,
                Expr::Ident { .. } | Expr::Member { .. } | Expr::Index { .. }
            ) {
                return Err(ParseError::BuildError(format!(
                    "invalid assignment target near '{}'",
                    op_pair.as_str()
                )));
            }
            let value = build_expression(next(&mut inner, "assigned value")?)?;
            Ok(Expr::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            })
        }
        Rule::conditional => {
            let mut inner = pair.into_inner();
            let test = build_expression(next(&mut inner, "expression")?)?;
            let Some(cons) = inner.next() else {
                return Ok(test);
            };
            let cons = build_expression(cons)?;
            let alt = build_expression(next(&mut inner, "conditional alternative")?)?;
            Ok(Expr::Conditional {
                test: Box::new(test),
                cons: Box::new(cons),
                alt: Box::new(alt),
            })
        }
        Rule::binary => pratt()
            .map_primary(build_expression)
            .map_infix(|lhs, op, rhs| {
                let left = Box::new(lhs?);
                let right = Box::new(rhs?);
                let expr = match op.as_rule() {
                    Rule::op_or => Expr::Logical {
                        op: LogicalOp::Or,
                        left,
                        right,
                    },
                    Rule::op_and => Expr::Logical {
                        op: LogicalOp::And,
                        left,
                        right,
                    },
                    _ => {
                        let op = BinaryOp::from_symbol(op.as_str()).ok_or_else(|| {
                            ParseError::BuildError(format!("unknown operator {}", op.as_str()))
                        })?;
                        Expr::Binary { op, left, right }
                    }
                };
                Ok(expr)
            })
            .parse(pair.into_inner()),
        Rule::unary => {
            // unary = { prefix_op* ~ postfix }
            let parts: Vec<Pair<Rule>> = pair.into_inner().collect();
            let Some((operand, prefixes)) = parts.split_last() else {
                return Err(ParseError::BuildError("empty unary expression".to_string()));
            };
            let mut expr = build_expression(operand.clone())?;
            for prefix in prefixes.iter().rev() {
                expr = apply_prefix(prefix, expr)?;
            }
            Ok(expr)
        }
        Rule::postfix => {
            let mut inner = pair.into_inner();
            let expr = build_expression(next(&mut inner, "expression")?)?;
            match inner.next() {
                Some(update) => {
                    let op = if update.as_str() == "++" {
                        UpdateOp::Inc
                    } else {
                        UpdateOp::Dec
                    };
                    update_target(&expr)?;
                    Ok(Expr::Update {
                        op,
                        prefix: false,
                        arg: Box::new(expr),
                    })
                }
                None => Ok(expr),
            }
        }
        Rule::call_expr | Rule::new_callee | Rule::lhs_expr => {
            let mut inner = pair.into_inner();
            let mut expr = build_expression(next(&mut inner, "expression")?)?;
            for suffix in inner {
                expr = apply_suffix(expr, suffix)?;
            }
            Ok(expr)
        }
        Rule::new_expr => {
            let mut inner = pair.into_inner();
            let callee = build_expression(next(&mut inner, "constructor")?)?;
            let args = match inner.next() {
                Some(args) => build_arguments(args)?,
                None => vec![],
            };
            Ok(Expr::New {
                callee: Box::new(callee),
                args,
            })
        }
        Rule::paren_expr => build_expression(next(&mut pair.into_inner(), "expression")?),
        Rule::function_expr => Ok(Expr::Function {
            func: build_function(pair)?,
        }),
        Rule::this_lit => Ok(Expr::This),
        Rule::null_lit => Ok(Expr::LitNull),
        Rule::bool_lit => Ok(Expr::LitBool {
            v: pair.as_str() == "true",
        }),
        Rule::number => Ok(Expr::LitNum {
            v: parse_number(pair.as_str())?,
        }),
        Rule::string => Ok(Expr::LitStr {
            v: parse_string(pair)?,
        }),
        Rule::identifier => Ok(Expr::Ident {
            name: pair.as_str().to_string(),
        }),
        Rule::array_lit => {
            let elements = pair
                .into_inner()
                .map(build_expression)
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Expr::Array { elements })
        }
        Rule::object_lit => {
            let props = pair
                .into_inner()
                .map(build_property)
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Expr::Object { props })
        }
        _ => unexpected(&pair, "expression position"),
    }
}

fn apply_prefix(op: &Pair<Rule>, arg: Expr) -> ParseResult<Expr> {
    let unary = match op.as_rule() {
        Rule::op_inc | Rule::op_dec => {
            update_target(&arg)?;
            let op = if op.as_rule() == Rule::op_inc {
                UpdateOp::Inc
            } else {
                UpdateOp::Dec
            };
            return Ok(Expr::Update {
                op,
                prefix: true,
                arg: Box::new(arg),
            });
        }
        Rule::op_not => UnaryOp::Not,
        Rule::op_neg => UnaryOp::Neg,
        Rule::op_plus => UnaryOp::Plus,
        Rule::op_bitnot => UnaryOp::BitNot,
        Rule::op_typeof => UnaryOp::Typeof,
        Rule::op_void => UnaryOp::Void,
        Rule::op_delete => UnaryOp::Delete,
        _ => return unexpected(op, "unary operator"),
    };
    Ok(Expr::Unary {
        op: unary,
        arg: Box::new(arg),
    })
}

fn update_target(expr: &Expr) -> ParseResult<()> {
    match expr {
        Expr::Ident { .. } | Expr::Member { .. } | Expr::Index { .. } => Ok(()),
        _ => Err(ParseError::BuildError(
            "invalid increment/decrement operand".to_string(),
        )),
    }
}

fn apply_suffix(object: Expr, suffix: Pair<Rule>) -> ParseResult<Expr> {
    match suffix.as_rule() {
        Rule::arguments => Ok(Expr::Call {
            callee: Box::new(object),
            args: build_arguments(suffix)?,
        }),
        Rule::member_suffix => Ok(Expr::Member {
            object: Box::new(object),
            property: next(&mut suffix.into_inner(), "property name")?
                .as_str()
                .to_string(),
        }),
        Rule::index_suffix => Ok(Expr::Index {
            object: Box::new(object),
            index: Box::new(build_expression(next(&mut suffix.into_inner(), "index")?)?),
        }),
        _ => unexpected(&suffix, "member access"),
    }
}

fn build_arguments(pair: Pair<Rule>) -> ParseResult<Vec<Expr>> {
    pair.into_inner().map(build_expression).collect()
}

fn build_property(pair: Pair<Rule>) -> ParseResult<Property> {
    let rule = pair.as_rule();
    let mut inner = pair.into_inner();
    let key = build_prop_key(next(&mut inner, "property key")?)?;
    match rule {
        Rule::init_prop => Ok(Property {
            key,
            kind: PropKind::Init,
            value: build_expression(next(&mut inner, "property value")?)?,
        }),
        Rule::getter | Rule::setter => {
            let mut params = Vec::new();
            let mut body = Vec::new();
            for part in inner {
                match part.as_rule() {
                    Rule::identifier => params.push(part.as_str().to_string()),
                    _ => body = build_block_body(part)?,
                }
            }
            let kind = if rule == Rule::getter {
                PropKind::Get
            } else {
                PropKind::Set
            };
            Ok(Property {
                key,
                kind,
                value: Expr::Function {
                    func: Function {
                        name: None,
                        params,
                        body,
                    },
                },
            })
        }
        _ => Err(ParseError::BuildError(format!(
            "unexpected {:?} in object literal",
            rule
        ))),
    }
}

fn build_prop_key(pair: Pair<Rule>) -> ParseResult<String> {
    // prop_key = { property_name | string | number }
    let key = next(&mut pair.into_inner(), "property key")?;
    match key.as_rule() {
        Rule::string => parse_string(key),
        Rule::number => Ok(crate::runtime::ops::number_to_string(parse_number(key.as_str())?)),
        _ => Ok(key.as_str().to_string()),
    }
}

/* ===================== Literals ===================== */

fn parse_number(text: &str) -> ParseResult<f64> {
    let invalid = || ParseError::BuildError(format!("invalid number literal {}", text));
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .map_err(|_| invalid());
    }
    text.parse::<f64>().map_err(|_| invalid())
}

fn parse_string(pair: Pair<Rule>) -> ParseResult<String> {
    // string = ${ quote ~ inner ~ quote }
    let raw = next(&mut pair.into_inner(), "string body")?.as_str();
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| ParseError::BuildError(format!("invalid escape \\u{}", hex)))?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Ok(out)
}
