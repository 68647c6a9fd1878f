use crate::runtime::scope::{new_record, Chain, LinkKind};
use crate::runtime::{queue_front, queue_shift, ErrorKind, Pending, Runtime, Value};
use crate::stack::{Completion, Unwind};
use crate::syntax::ast::{CatchClause, Declarator, Expr, ForInTarget, ForInit, Stmt, SwitchCase};
use crate::syntax::walk::NodeRef;

use super::{Flow, Resume, Walker};

/// Part of a `for` statement execution starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Init,
    Test,
    Body,
    Update,
}

impl Walker {
    /// Run consecutive statements, the first located at `first`
    pub(super) fn exec_list(&mut self, rt: &mut Runtime, body: &[Stmt], first: usize) -> Completion<Flow> {
        let mut at = first;
        for stmt in body {
            match self.exec(rt, stmt, at)? {
                Flow::Normal => {}
                abrupt => return Ok(abrupt),
            }
            at = self.tree.end(at);
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, rt: &mut Runtime, stmt: &Stmt, index: usize) -> Completion<Flow> {
        let entry = match self.resume_state(index) {
            Resume::Before(_) => return Ok(Flow::Normal),
            // Already paused here once
            Resume::AtPc(Some(_)) if matches!(stmt, Stmt::Debugger) => return Ok(Flow::Normal),
            Resume::AtPc(_) => None,
            Resume::Enter(pc) => Some(pc),
            Resume::Fresh => {
                self.halt_check(rt, stmt, index)?;
                None
            }
        };
        self.exec_stmt(rt, stmt, index, entry)
    }

    fn exec_stmt(
        &mut self,
        rt: &mut Runtime,
        stmt: &Stmt,
        index: usize,
        entry: Option<usize>,
    ) -> Completion<Flow> {
        let node = NodeRef::Stmt(stmt);
        let mut ix = self.tree.child_indices(node, index);
        match stmt {
            Stmt::Var { decls } => {
                for decl in decls {
                    let at = ix.take();
                    self.declarator(rt, decl, at)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::FunctionDecl { .. } | Stmt::Empty => Ok(Flow::Normal),
            Stmt::Expr { expr } => {
                self.eval(rt, expr, ix.take())?;
                Ok(Flow::Normal)
            }
            Stmt::Block { body } => self.exec_list(rt, body, index + 1),
            Stmt::If { test, cons, alt } => {
                let (test_at, cons_at, alt_at) = (ix.take(), ix.take(), ix.take());
                if self.entering(entry, cons_at) {
                    return self.exec(rt, cons, cons_at);
                }
                if let Some(alt) = alt {
                    if self.entering(entry, alt_at) {
                        return self.exec(rt, alt, alt_at);
                    }
                }
                if self.eval(rt, test, test_at)?.truthy() {
                    self.exec(rt, cons, cons_at)
                } else if let Some(alt) = alt {
                    self.exec(rt, alt, alt_at)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let init_count = match init {
                    Some(ForInit::Var { decls }) => decls.len(),
                    Some(ForInit::Expr { .. }) => 1,
                    None => 0,
                };
                let init_at: Vec<usize> = (0..init_count).map(|_| ix.take()).collect();
                let test_at = test.as_ref().map(|_| ix.take());
                let update_at = update.as_ref().map(|_| ix.take());
                let body_at = ix.take();

                let mut phase = if self.entering(entry, body_at) {
                    Phase::Body
                } else if update_at.is_some_and(|at| self.entering(entry, at)) {
                    Phase::Update
                } else if test_at.is_some_and(|at| self.entering(entry, at)) {
                    Phase::Test
                } else {
                    Phase::Init
                };

                if phase == Phase::Init {
                    match init {
                        Some(ForInit::Var { decls }) => {
                            for (decl, at) in decls.iter().zip(&init_at) {
                                self.declarator(rt, decl, *at)?;
                            }
                        }
                        Some(ForInit::Expr { expr }) => {
                            if let Some(at) = init_at.first() {
                                self.eval(rt, expr, *at)?;
                            }
                        }
                        None => {}
                    }
                }
                loop {
                    if phase <= Phase::Test {
                        if let (Some(test), Some(at)) = (test, test_at) {
                            if !self.eval(rt, test, at)?.truthy() {
                                break;
                            }
                        }
                    }
                    if phase <= Phase::Body {
                        match self.exec(rt, body, body_at)? {
                            Flow::Break => break,
                            Flow::Return(value) => return Ok(Flow::Return(value)),
                            Flow::Normal | Flow::Continue => {}
                        }
                    }
                    if let (Some(update), Some(at)) = (update, update_at) {
                        self.eval(rt, update, at)?;
                    }
                    phase = Phase::Test;
                    self.pc = None;
                }
                Ok(Flow::Normal)
            }
            Stmt::ForIn { left, right, body } => {
                let left_at = match left {
                    ForInTarget::Expr { .. } => Some(ix.take()),
                    ForInTarget::Var { .. } => None,
                };
                let right_at = ix.take();
                let body_at = ix.take();
                self.exec_for_in(rt, entry, left, left_at, right, right_at, body, body_at)
            }
            Stmt::While { test, body } => {
                let (test_at, body_at) = (ix.take(), ix.take());
                let mut skip_test = self.entering(entry, body_at);
                loop {
                    if !skip_test && !self.eval(rt, test, test_at)?.truthy() {
                        break;
                    }
                    skip_test = false;
                    match self.exec(rt, body, body_at)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    self.pc = None;
                }
                Ok(Flow::Normal)
            }
            Stmt::DoWhile { body, test } => {
                let (body_at, test_at) = (ix.take(), ix.take());
                let mut skip_body = self.entering(entry, test_at);
                loop {
                    if !skip_body {
                        match self.exec(rt, body, body_at)? {
                            Flow::Break => break,
                            Flow::Return(value) => return Ok(Flow::Return(value)),
                            Flow::Normal | Flow::Continue => {}
                        }
                    }
                    skip_body = false;
                    if !self.eval(rt, test, test_at)?.truthy() {
                        break;
                    }
                    self.pc = None;
                }
                Ok(Flow::Normal)
            }
            Stmt::Return { value } => {
                let value = match value {
                    Some(expr) => self.eval(rt, expr, ix.take())?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Break { label: None } => Ok(Flow::Break),
            Stmt::Continue { label: None } => Ok(Flow::Continue),
            Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Labeled { .. } => {
                Err(rt.error(ErrorKind::Syntax, "labels are not supported"))
            }
            Stmt::Throw { value } => {
                let value = self.eval(rt, value, ix.take())?;
                Err(Unwind::error(value))
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => self.exec_try(rt, entry, index, block, handler.as_ref(), finalizer.as_deref()),
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                let discriminant_at = ix.take();
                let case_at: Vec<usize> = cases.iter().map(|_| ix.take()).collect();
                self.exec_switch(rt, entry, discriminant, discriminant_at, cases, &case_at)
            }
            Stmt::With { object, body } => {
                let (object_at, body_at) = (ix.take(), ix.take());
                let pending = if self.entering(entry, body_at) {
                    self.pending.pop_front()
                } else {
                    None
                };
                let saved = self.chain.clone();
                let link = match pending {
                    Some(link) => link,
                    None => {
                        let record = match self.eval(rt, object, object_at)? {
                            Value::Object(obj) => obj,
                            Value::Undefined | Value::Null => {
                                return Err(rt.type_error("Cannot convert undefined or null to object"))
                            }
                            _ => new_record(),
                        };
                        saved.push(LinkKind::With, record)
                    }
                };
                self.chain = link;
                let flow = self.exec(rt, body, body_at)?;
                self.chain = saved;
                Ok(flow)
            }
            Stmt::Debugger => {
                if self.recording() {
                    self.record(index, &Value::Undefined);
                    self.mark(index);
                    if rt.is_debugging() {
                        return Err(Unwind::pause(index));
                    }
                }
                Ok(Flow::Normal)
            }
        }
    }

    fn declarator(&mut self, rt: &mut Runtime, decl: &Declarator, index: usize) -> Completion<()> {
        let Some(init) = &decl.init else {
            return Ok(());
        };
        match self.resume_state(index) {
            Resume::Before(_) | Resume::AtPc(Some(_)) => return Ok(()),
            _ => {}
        }
        let value = self.eval(rt, init, index + 1)?;
        self.assign_name(rt, &decl.name, value.clone())?;
        self.record(index, &value);
        self.mark(index);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn exec_for_in(
        &mut self,
        rt: &mut Runtime,
        entry: Option<usize>,
        left: &ForInTarget,
        left_at: Option<usize>,
        right: &Expr,
        right_at: usize,
        body: &Stmt,
        body_at: usize,
    ) -> Completion<Flow> {
        let cached = if self.entering(entry, body_at) {
            self.cached(right_at)
        } else {
            None
        };
        let (keys, mut resuming) = match cached {
            Some(keys) => (keys, true),
            None => {
                let object = self.eval(rt, right, right_at)?;
                self.mark(right_at);
                let keys = rt.new_array(rt.enumerate(&object).into_iter().map(Value::Str).collect());
                self.record(right_at, &keys);
                (keys, false)
            }
        };
        loop {
            if !resuming {
                let Some(key) = queue_front(&keys) else {
                    break;
                };
                match left {
                    ForInTarget::Var { name } => self.assign_name(rt, name, key)?,
                    ForInTarget::Expr { expr } => {
                        let place = self.place(rt, expr, left_at.unwrap_or(right_at))?;
                        self.set_place(rt, &place, key)?;
                    }
                }
            }
            resuming = false;
            match self.exec(rt, body, body_at)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
            queue_shift(&keys);
            self.pc = None;
        }
        if self.recording() {
            self.cache.borrow_mut().remove(&right_at);
        }
        Ok(Flow::Normal)
    }

    fn exec_try(
        &mut self,
        rt: &mut Runtime,
        entry: Option<usize>,
        index: usize,
        block: &[Stmt],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Stmt]>,
    ) -> Completion<Flow> {
        let block_at = index + 1;
        let catch_at = (0..block.len()).fold(block_at, |at, _| self.tree.end(at));
        let finalizer_at = match handler {
            Some(_) => self.tree.end(catch_at),
            None => catch_at,
        };

        if let (Some(finalizer), Some(pc)) = (finalizer, entry) {
            if pc >= finalizer_at {
                let pending = self.cached(index).as_ref().and_then(Pending::from_value);
                let flow = self.exec_list(rt, finalizer, finalizer_at)?;
                self.cache.borrow_mut().remove(&index);
                return match (flow, pending) {
                    (Flow::Normal, Some(pending)) => pending.into(),
                    (flow, _) => Ok(flow),
                };
            }
        }

        let saved = self.chain.clone();
        let result = match handler {
            Some(handler) if self.entering(entry, catch_at) => {
                let link = match self.pending.pop_front() {
                    Some(link) => link,
                    None => saved.push(LinkKind::Catch, new_record()),
                };
                self.chain = link;
                let result = self.exec_list(rt, &handler.body, catch_at + 1);
                if result.is_ok() {
                    self.chain = saved.clone();
                }
                result
            }
            _ => match (self.exec_list(rt, block, block_at), handler) {
                (Err(unwind), Some(handler)) if !unwind.is_pause() => {
                    let thrown = unwind.thrown().cloned().unwrap_or(Value::Undefined);
                    self.exec_catch(rt, handler, catch_at, thrown, &saved)
                }
                (result, _) => result,
            },
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
        let flow = self.exec_list(rt, finalizer, finalizer_at)?;
        self.cache.borrow_mut().remove(&index);
        match flow {
            Flow::Normal => result,
            abrupt => Ok(abrupt),
        }
    }

    fn exec_catch(
        &mut self,
        rt: &mut Runtime,
        handler: &CatchClause,
        index: usize,
        thrown: Value,
        saved: &Chain,
    ) -> Completion<Flow> {
        self.mark(index);
        let record = new_record();
        record.borrow_mut().set_own(&handler.param, thrown);
        self.chain = saved.push(LinkKind::Catch, record);
        let flow = self.exec_list(rt, &handler.body, index + 1)?;
        self.chain = saved.clone();
        Ok(flow)
    }

    fn exec_switch(
        &mut self,
        rt: &mut Runtime,
        entry: Option<usize>,
        discriminant: &Expr,
        discriminant_at: usize,
        cases: &[SwitchCase],
        case_at: &[usize],
    ) -> Completion<Flow> {
        let resume_case = entry.and_then(|pc| case_at.iter().position(|at| self.tree.contains(*at, pc)));
        let value = match resume_case {
            Some(_) => self.cached(discriminant_at).unwrap_or(Value::Undefined),
            None => {
                let value = self.eval(rt, discriminant, discriminant_at)?;
                self.mark(discriminant_at);
                self.record(discriminant_at, &value);
                value
            }
        };

        // Case to start executing bodies from
        let start = match resume_case {
            Some(k) if cases[k].test.is_none() || !self.entering(entry, case_at[k] + 1) => Some(k),
            _ => {
                let mut matched = None;
                for (k, case) in cases.iter().enumerate().skip(resume_case.unwrap_or(0)) {
                    if let Some(test) = &case.test {
                        if self.eval(rt, test, case_at[k] + 1)? == value {
                            matched = Some(k);
                            break;
                        }
                    }
                }
                matched.or_else(|| cases.iter().position(|c| c.test.is_none()))
            }
        };
        let Some(start) = start else {
            return Ok(Flow::Normal);
        };
        for (case, at) in cases.iter().zip(case_at).skip(start) {
            let body_at = match case.test {
                Some(_) => self.tree.end(at + 1),
                None => at + 1,
            };
            match self.exec_list(rt, &case.body, body_at)? {
                Flow::Normal => {}
                Flow::Break => return Ok(Flow::Normal),
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Flow::Normal)
    }
}
