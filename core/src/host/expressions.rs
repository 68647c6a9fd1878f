use std::rc::Rc;

use crate::interpreter::{InterpretedClosure, Mode};
use crate::rewriter::{IExpr, IKey, IProperty, IRef, ITarget};
use crate::runtime::ops::{self, to_number};
use crate::runtime::{Callable, ErrorKind, Runtime, Value};
use crate::stack::Completion;
use crate::syntax::ast::{LogicalOp, PropKind, UnaryOp, UpdateOp};

use super::{Activation, HostClosure};

/// Evaluated left-hand side
enum Place<'t> {
    Ref(&'t IRef),
    Member(Value, String),
}

impl Activation {
    pub(super) fn eval(&mut self, rt: &mut Runtime, expr: &IExpr) -> Completion<Value> {
        match expr {
            IExpr::Num(n) => Ok(Value::Num(*n)),
            IExpr::Str(s) => Ok(Value::Str(s.clone())),
            IExpr::Bool(b) => Ok(Value::Bool(*b)),
            IExpr::Null => Ok(Value::Null),
            IExpr::Ref(r) => self.read(rt, r),
            IExpr::This => Ok(self.this.clone()),
            IExpr::Arguments => Ok(self.arguments_object(rt)),
            IExpr::Array(items) => {
                let items = self.eval_list(rt, items)?;
                Ok(rt.new_array(items))
            }
            IExpr::Object(props) => self.eval_object(rt, props),
            IExpr::Closure(func) => {
                let value = rt.new_function(Callable::Host(Rc::new(HostClosure {
                    func: func.clone(),
                    chain: Some(self.chain.clone()),
                    registry: self.registry.clone(),
                })));
                self.record(func.index, &value);
                Ok(value)
            }
            IExpr::Plain { namespace, index } => {
                let tree = self.registry.borrow().tree(namespace, *index);
                let tree = tree.map_err(|err| rt.error(ErrorKind::Reference, err.to_string()))?;
                let value = rt.new_function(Callable::Interpreted(Rc::new(InterpretedClosure {
                    tree,
                    index: *index,
                    chain: None,
                    mode: Mode::Plain,
                    registry: self.registry.clone(),
                })));
                self.record(*index, &value);
                Ok(value)
            }
            IExpr::Unary {
                op: UnaryOp::Typeof,
                arg,
            } => {
                if let IExpr::Ref(r) = arg.as_ref() {
                    if !self.resolvable(rt, r) {
                        return Ok(Value::str("undefined"));
                    }
                }
                let value = self.eval(rt, arg)?;
                Ok(rt.unary(UnaryOp::Typeof, &value))
            }
            IExpr::Unary { op, arg } => {
                let value = self.eval(rt, arg)?;
                Ok(rt.unary(*op, &value))
            }
            IExpr::Delete(target) => match self.place(rt, target)? {
                Place::Member(object, key) => Ok(Value::Bool(rt.delete(&object, &key)?)),
                Place::Ref(_) => Ok(Value::Bool(false)),
            },
            IExpr::Update {
                index,
                op,
                prefix,
                target,
            } => {
                let place = self.place(rt, target)?;
                let old = to_number(&self.get_place(rt, &place)?);
                self.mark_pending(*index);
                let new = match op {
                    UpdateOp::Inc => old + 1.0,
                    UpdateOp::Dec => old - 1.0,
                };
                self.set_place(rt, &place, Value::Num(new))?;
                let result = Value::Num(if *prefix { new } else { old });
                self.record(*index, &result);
                Ok(result)
            }
            IExpr::Binary { op, left, right } => {
                let left = self.eval(rt, left)?;
                let right = self.eval(rt, right)?;
                rt.binary(*op, &left, &right)
            }
            IExpr::Logical { op, left, right } => {
                let left = self.eval(rt, left)?;
                match (op, left.truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(rt, right),
                }
            }
            IExpr::Assign {
                index,
                op,
                target,
                value,
            } => {
                let place = self.place(rt, target)?;
                let value = match op {
                    None => self.eval(rt, value)?,
                    Some(op) => {
                        let current = self.get_place(rt, &place)?;
                        let rhs = self.eval(rt, value)?;
                        rt.binary(*op, &current, &rhs)?
                    }
                };
                self.set_place(rt, &place, value.clone())?;
                self.record(*index, &value);
                self.mark(*index);
                Ok(value)
            }
            IExpr::Conditional { test, cons, alt } => {
                if self.eval(rt, test)?.truthy() {
                    self.eval(rt, cons)
                } else {
                    self.eval(rt, alt)
                }
            }
            IExpr::Call {
                index,
                callee,
                args,
            } => {
                let (func, this) = match callee.as_ref() {
                    IExpr::Member { object, key } => {
                        let object = self.eval(rt, object)?;
                        let key = self.key(rt, key)?;
                        (rt.get(&object, &key)?, object)
                    }
                    other => (self.eval(rt, other)?, Value::Undefined),
                };
                let args = self.eval_list(rt, args)?;
                self.mark_pending(*index);
                if !func.is_callable() {
                    return Err(rt.type_error(format!("{} is not a function", describe(callee))));
                }
                let value = rt.call(&func, this, args)?;
                self.record(*index, &value);
                Ok(value)
            }
            IExpr::New {
                index,
                callee,
                args,
            } => {
                let func = self.eval(rt, callee)?;
                let args = self.eval_list(rt, args)?;
                self.mark_pending(*index);
                if !func.is_callable() {
                    return Err(rt.type_error(format!("{} is not a constructor", describe(callee))));
                }
                let value = rt.construct(&func, args)?;
                self.record(*index, &value);
                Ok(value)
            }
            IExpr::Member { object, key } => {
                let object = self.eval(rt, object)?;
                let key = self.key(rt, key)?;
                rt.get(&object, &key)
            }
            IExpr::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.eval(rt, expr)?;
                }
                Ok(last)
            }
        }
    }

    fn eval_list(&mut self, rt: &mut Runtime, exprs: &[IExpr]) -> Completion<Vec<Value>> {
        exprs.iter().map(|e| self.eval(rt, e)).collect()
    }

    fn eval_object(&mut self, rt: &mut Runtime, props: &[IProperty]) -> Completion<Value> {
        let obj = rt.new_object();
        for prop in props {
            let value = self.eval(rt, &prop.value)?;
            let mut o = obj.borrow_mut();
            match prop.kind {
                PropKind::Init => o.set_own(&prop.key, value),
                PropKind::Get => o.define_accessor(&prop.key, Some(value), None),
                PropKind::Set => o.define_accessor(&prop.key, None, Some(value)),
            }
        }
        Ok(Value::Object(obj))
    }

    fn key(&mut self, rt: &mut Runtime, key: &IKey) -> Completion<String> {
        match key {
            IKey::Static(name) => Ok(name.clone()),
            IKey::Computed(expr) => Ok(ops::to_string(&self.eval(rt, expr)?)),
        }
    }

    /* ===================== Assignment Targets ===================== */

    fn place<'t>(&mut self, rt: &mut Runtime, target: &'t ITarget) -> Completion<Place<'t>> {
        match target {
            ITarget::Ref(r) => Ok(Place::Ref(r)),
            ITarget::Member { object, key } => {
                let object = self.eval(rt, object)?;
                let key = self.key(rt, key)?;
                Ok(Place::Member(object, key))
            }
        }
    }

    fn get_place(&mut self, rt: &mut Runtime, place: &Place<'_>) -> Completion<Value> {
        match place {
            Place::Ref(r) => self.read(rt, r),
            Place::Member(object, key) => rt.get(object, key),
        }
    }

    fn set_place(&mut self, rt: &mut Runtime, place: &Place<'_>, value: Value) -> Completion<()> {
        match place {
            Place::Ref(r) => self.write(rt, r, value),
            Place::Member(object, key) => rt.put(object, key, value),
        }
    }

    /// Assign a for-in key to its loop target
    pub(super) fn assign(&mut self, rt: &mut Runtime, target: &ITarget, value: Value) -> Completion<()> {
        let place = self.place(rt, target)?;
        self.set_place(rt, &place, value)
    }
}

/// Callee text for error messages
fn describe(callee: &IExpr) -> String {
    match callee {
        IExpr::Ref(r) => r.name().to_string(),
        IExpr::Member {
            object,
            key: IKey::Static(name),
        } => format!("{}.{}", describe(object), name),
        IExpr::Member { object, .. } => format!("{}[...]", describe(object)),
        IExpr::This => "this".to_string(),
        _ => "expression".to_string(),
    }
}
