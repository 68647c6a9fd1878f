use crate::registry::ChildIndices;
use crate::rewriter::policy::{self, Recording};
use crate::runtime::ops::{self, to_number};
use crate::runtime::{ErrorKind, Runtime, Value};
use crate::stack::Completion;
use crate::syntax::ast::{Expr, LogicalOp, PropKind, UnaryOp, UpdateOp};
use crate::syntax::walk::NodeRef;

use super::{Resume, Walker};

/// Evaluated left-hand side
pub(super) enum Place {
    Name(String),
    Member(Value, String),
}

impl Walker {
    /// Evaluate the expression located at `index`, recording its result
    pub(super) fn eval(&mut self, rt: &mut Runtime, expr: &Expr, index: usize) -> Completion<Value> {
        let entry = match self.resume_state(index) {
            Resume::AtPc(Some(value)) | Resume::Before(Some(value)) => return Ok(value),
            Resume::Enter(pc) => Some(pc),
            Resume::AtPc(None) | Resume::Before(None) | Resume::Fresh => None,
        };
        let value = self.eval_node(rt, expr, index, entry)?;
        match policy::recording(NodeRef::Expr(expr)) {
            Recording::Prefix | Recording::Store => self.record(index, &value),
            Recording::Postfix => {
                self.record(index, &value);
                self.mark(index);
            }
            Recording::None => {}
        }
        Ok(value)
    }

    fn eval_node(
        &mut self,
        rt: &mut Runtime,
        expr: &Expr,
        index: usize,
        entry: Option<usize>,
    ) -> Completion<Value> {
        let mut ix = self.tree.child_indices(NodeRef::Expr(expr), index);
        match expr {
            Expr::LitNum { v } => Ok(Value::Num(*v)),
            Expr::LitStr { v } => Ok(Value::Str(v.clone())),
            Expr::LitBool { v } => Ok(Value::Bool(*v)),
            Expr::LitNull => Ok(Value::Null),
            Expr::Ident { name } => self.lookup(rt, name),
            Expr::This => Ok(self.this.clone()),
            Expr::Array { elements } => {
                let items = self.eval_each(rt, elements, &mut ix)?;
                Ok(rt.new_array(items))
            }
            Expr::Object { props } => {
                let obj = rt.new_object();
                for prop in props {
                    let at = ix.take();
                    let value = self.eval(rt, &prop.value, at + 1)?;
                    let mut o = obj.borrow_mut();
                    match prop.kind {
                        PropKind::Init => o.set_own(&prop.key, value),
                        PropKind::Get => o.define_accessor(&prop.key, Some(value), None),
                        PropKind::Set => o.define_accessor(&prop.key, None, Some(value)),
                    }
                }
                Ok(Value::Object(obj))
            }
            Expr::Function { func } => Ok(self.make_closure(rt, func, index)),
            Expr::Unary {
                op: UnaryOp::Typeof,
                arg,
            } => {
                if let Expr::Ident { name } = arg.as_ref() {
                    if !self.resolvable(rt, name) {
                        return Ok(Value::str("undefined"));
                    }
                }
                let value = self.eval(rt, arg, ix.take())?;
                Ok(rt.unary(UnaryOp::Typeof, &value))
            }
            Expr::Unary {
                op: UnaryOp::Delete,
                arg,
            } if matches!(**arg, Expr::Member { .. } | Expr::Index { .. }) => {
                match self.place(rt, arg, ix.take())? {
                    Place::Member(object, key) => Ok(Value::Bool(rt.delete(&object, &key)?)),
                    Place::Name(_) => Ok(Value::Bool(false)),
                }
            }
            Expr::Unary { op, arg } => {
                let value = self.eval(rt, arg, ix.take())?;
                Ok(rt.unary(*op, &value))
            }
            Expr::Update { op, prefix, arg } => {
                let place = self.place(rt, arg, ix.take())?;
                let old = to_number(&self.get_place(rt, &place)?);
                self.mark_pending(index);
                let new = match op {
                    UpdateOp::Inc => old + 1.0,
                    UpdateOp::Dec => old - 1.0,
                };
                self.set_place(rt, &place, Value::Num(new))?;
                Ok(Value::Num(if *prefix { new } else { old }))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(rt, left, ix.take())?;
                let right = self.eval(rt, right, ix.take())?;
                rt.binary(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let (left_at, right_at) = (ix.take(), ix.take());
                if self.entering(entry, right_at) {
                    return self.eval(rt, right, right_at);
                }
                let left = self.eval(rt, left, left_at)?;
                match (op, left.truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(rt, right, right_at),
                }
            }
            Expr::Assign { op, target, value } => {
                let place = self.place(rt, target, ix.take())?;
                let value_at = ix.take();
                match op {
                    None => {
                        let value = self.eval(rt, value, value_at)?;
                        self.set_place(rt, &place, value.clone())?;
                        Ok(value)
                    }
                    Some(op) => {
                        let current = self.get_place(rt, &place)?;
                        let rhs = self.eval(rt, value, value_at)?;
                        let value = rt.binary(*op, &current, &rhs)?;
                        self.set_place(rt, &place, value.clone())?;
                        Ok(value)
                    }
                }
            }
            Expr::Conditional { test, cons, alt } => {
                let (test_at, cons_at, alt_at) = (ix.take(), ix.take(), ix.take());
                if self.entering(entry, cons_at) {
                    return self.eval(rt, cons, cons_at);
                }
                if self.entering(entry, alt_at) {
                    return self.eval(rt, alt, alt_at);
                }
                if self.eval(rt, test, test_at)?.truthy() {
                    self.eval(rt, cons, cons_at)
                } else {
                    self.eval(rt, alt, alt_at)
                }
            }
            Expr::Call { callee, args } => {
                let callee_at = ix.take();
                let (func, this) = match callee.as_ref() {
                    Expr::Member { .. } | Expr::Index { .. } => {
                        let Place::Member(object, key) = self.place(rt, callee, callee_at)? else {
                            return Err(rt.type_error("invalid callee"));
                        };
                        (rt.get(&object, &key)?, object)
                    }
                    other => (self.eval(rt, other, callee_at)?, Value::Undefined),
                };
                let args = self.eval_each(rt, args, &mut ix)?;
                self.mark_pending(index);
                if !func.is_callable() {
                    return Err(rt.type_error(format!("{} is not a function", describe(callee))));
                }
                rt.call(&func, this, args)
            }
            Expr::New { callee, args } => {
                let func = self.eval(rt, callee, ix.take())?;
                let args = self.eval_each(rt, args, &mut ix)?;
                self.mark_pending(index);
                if !func.is_callable() {
                    return Err(rt.type_error(format!("{} is not a constructor", describe(callee))));
                }
                rt.construct(&func, args)
            }
            Expr::Member { .. } | Expr::Index { .. } => {
                let Place::Member(object, key) = self.place(rt, expr, index)? else {
                    return Ok(Value::Undefined);
                };
                rt.get(&object, &key)
            }
            Expr::Sequence { exprs } => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.eval(rt, expr, ix.take())?;
                }
                Ok(last)
            }
        }
    }

    fn eval_each(
        &mut self,
        rt: &mut Runtime,
        exprs: &[Expr],
        ix: &mut ChildIndices,
    ) -> Completion<Vec<Value>> {
        let mut out = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let at = ix.take();
            out.push(self.eval(rt, expr, at)?);
        }
        Ok(out)
    }

    /* ===================== Assignment Targets ===================== */

    /// Evaluate the parts of a reference expression located at `index`
    pub(super) fn place(&mut self, rt: &mut Runtime, target: &Expr, index: usize) -> Completion<Place> {
        match target {
            Expr::Ident { name } => Ok(Place::Name(name.clone())),
            Expr::Member { object, property } => {
                let object = self.eval(rt, object, index + 1)?;
                Ok(Place::Member(object, property.clone()))
            }
            Expr::Index { object, index: key } => {
                let object_at = index + 1;
                let object = self.eval(rt, object, object_at)?;
                let key = self.eval(rt, key, self.tree.end(object_at))?;
                Ok(Place::Member(object, ops::to_string(&key)))
            }
            _ => Err(rt.error(ErrorKind::Reference, "Invalid left-hand side in assignment")),
        }
    }

    fn get_place(&mut self, rt: &mut Runtime, place: &Place) -> Completion<Value> {
        match place {
            Place::Name(name) => self.lookup(rt, name),
            Place::Member(object, key) => rt.get(object, key),
        }
    }

    pub(super) fn set_place(&mut self, rt: &mut Runtime, place: &Place, value: Value) -> Completion<()> {
        match place {
            Place::Name(name) => self.assign_name(rt, name, value),
            Place::Member(object, key) => rt.put(object, key, value),
        }
    }
}

/// Callee text for error messages
fn describe(callee: &Expr) -> String {
    match callee {
        Expr::Ident { name } => name.clone(),
        Expr::Member { object, property } => format!("{}.{}", describe(object), property),
        Expr::Index { object, .. } => format!("{}[...]", describe(object)),
        Expr::This => "this".to_string(),
        _ => "expression".to_string(),
    }
}
