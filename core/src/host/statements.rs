use crate::rewriter::{ICase, ICatch, IDecl, IForInit, IStmt, ITarget};
use crate::runtime::scope::{new_record, Chain, LinkKind};
use crate::runtime::{queue_front, queue_shift, Pending, Runtime, Value};
use crate::stack::{Completion, Unwind};

use super::{Activation, Flow};

impl Activation {
    pub(super) fn exec_block(&mut self, rt: &mut Runtime, body: &[IStmt]) -> Completion<Flow> {
        for stmt in body {
            match self.exec(rt, stmt)? {
                Flow::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, rt: &mut Runtime, stmt: &IStmt) -> Completion<Flow> {
        match stmt {
            IStmt::Var(decls) => {
                self.declare(rt, decls)?;
                Ok(Flow::Normal)
            }
            IStmt::Expr(expr) => {
                self.eval(rt, expr)?;
                Ok(Flow::Normal)
            }
            IStmt::Block(body) => self.exec_block(rt, body),
            IStmt::If { test, cons, alt } => {
                if self.eval(rt, test)?.truthy() {
                    self.exec(rt, cons)
                } else if let Some(alt) = alt {
                    self.exec(rt, alt)
                } else {
                    Ok(Flow::Normal)
                }
            }
            IStmt::For {
                init,
                test,
                update,
                body,
            } => {
                match init {
                    Some(IForInit::Var(decls)) => self.declare(rt, decls)?,
                    Some(IForInit::Expr(expr)) => {
                        self.eval(rt, expr)?;
                    }
                    None => {}
                }
                loop {
                    if let Some(test) = test {
                        if !self.eval(rt, test)?.truthy() {
                            break;
                        }
                    }
                    match self.exec(rt, body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if let Some(update) = update {
                        self.eval(rt, update)?;
                    }
                }
                Ok(Flow::Normal)
            }
            IStmt::ForIn {
                index,
                target,
                right,
                body,
            } => self.exec_for_in(rt, *index, target, right, body),
            IStmt::While { test, body } => {
                while self.eval(rt, test)?.truthy() {
                    match self.exec(rt, body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            IStmt::DoWhile { body, test } => {
                loop {
                    match self.exec(rt, body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if !self.eval(rt, test)?.truthy() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            IStmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(rt, expr)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            IStmt::Break => Ok(Flow::Break),
            IStmt::Continue => Ok(Flow::Continue),
            IStmt::Throw(expr) => {
                let value = self.eval(rt, expr)?;
                Err(Unwind::error(value))
            }
            IStmt::Try {
                index,
                block,
                handler,
                finalizer,
            } => self.exec_try(rt, *index, block, handler.as_ref(), finalizer.as_deref()),
            IStmt::Switch {
                index,
                discriminant,
                cases,
            } => {
                let value = self.eval(rt, discriminant)?;
                self.mark(*index);
                self.record(*index, &value);
                self.exec_switch(rt, &value, cases)
            }
            IStmt::With { object, body } => {
                let object = self.eval(rt, object)?;
                let record = match object {
                    Value::Object(obj) => obj,
                    Value::Undefined | Value::Null => {
                        return Err(rt.type_error("Cannot convert undefined or null to object"))
                    }
                    _ => new_record(),
                };
                let saved = self.chain.clone();
                self.chain = saved.push(LinkKind::With, record);
                let flow = self.exec(rt, body)?;
                self.chain = saved;
                Ok(flow)
            }
            IStmt::Debugger { index } => {
                self.record(*index, &Value::Undefined);
                self.mark(*index);
                if rt.is_debugging() {
                    return Err(Unwind::pause(*index));
                }
                Ok(Flow::Normal)
            }
            IStmt::Empty => Ok(Flow::Normal),
        }
    }

    fn declare(&mut self, rt: &mut Runtime, decls: &[IDecl]) -> Completion<()> {
        for decl in decls {
            if let Some(init) = &decl.init {
                let value = self.eval(rt, init)?;
                self.write(rt, &decl.target, value.clone())?;
                self.record(decl.index, &value);
                self.mark(decl.index);
            }
        }
        Ok(())
    }

    fn exec_for_in(
        &mut self,
        rt: &mut Runtime,
        index: usize,
        target: &ITarget,
        right: &crate::rewriter::IExpr,
        body: &IStmt,
    ) -> Completion<Flow> {
        let object = self.eval(rt, right)?;
        self.mark(index);
        let keys = rt.new_array(rt.enumerate(&object).into_iter().map(Value::Str).collect());
        self.record(index, &keys);
        while let Some(key) = queue_front(&keys) {
            self.assign(rt, target, key)?;
            match self.exec(rt, body)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
            queue_shift(&keys);
        }
        self.cache.borrow_mut().remove(&index);
        Ok(Flow::Normal)
    }

    fn exec_try(
        &mut self,
        rt: &mut Runtime,
        index: usize,
        block: &[IStmt],
        handler: Option<&ICatch>,
        finalizer: Option<&[IStmt]>,
    ) -> Completion<Flow> {
        let saved = self.chain.clone();
        let result = match (self.exec_block(rt, block), handler) {
            (Err(unwind), Some(handler)) if !unwind.is_pause() => {
                let thrown = unwind.thrown().cloned().unwrap_or(Value::Undefined);
                self.exec_catch(rt, handler, thrown, &saved)
            }
            (result, _) => result,
        };
        let Some(finalizer) = finalizer else {
            return result;
        };
        if matches!(&result, Err(unwind) if unwind.is_pause()) {
            return result;
        }
        self.chain = saved;
        let pending = Pending::from(&result).to_value(rt);
        self.record(index, &pending);
        let flow = self.exec_block(rt, finalizer)?;
        self.cache.borrow_mut().remove(&index);
        match flow {
            Flow::Normal => result,
            abrupt => Ok(abrupt),
        }
    }

    fn exec_catch(
        &mut self,
        rt: &mut Runtime,
        handler: &ICatch,
        thrown: Value,
        saved: &Chain,
    ) -> Completion<Flow> {
        self.mark(handler.index);
        let record = new_record();
        record.borrow_mut().set_own(&handler.param, thrown);
        self.chain = saved.push(LinkKind::Catch, record);
        let flow = self.exec_block(rt, &handler.body)?;
        self.chain = saved.clone();
        Ok(flow)
    }

    fn exec_switch(&mut self, rt: &mut Runtime, value: &Value, cases: &[ICase]) -> Completion<Flow> {
        let mut start = None;
        for (i, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                if self.eval(rt, test)? == *value {
                    start = Some(i);
                    break;
                }
            }
        }
        let Some(start) = start.or_else(|| cases.iter().position(|c| c.test.is_none())) else {
            return Ok(Flow::Normal);
        };
        for case in &cases[start..] {
            match self.exec_block(rt, &case.body)? {
                Flow::Normal => {}
                Flow::Break => return Ok(Flow::Normal),
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Flow::Normal)
    }
}
