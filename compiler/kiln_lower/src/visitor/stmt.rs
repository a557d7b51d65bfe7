//! Statement lowering.

use kiln_ir::{ExprId, ExprKind, StmtId, StmtKind, TextLocation};
use kiln_target::eval::names;
use kiln_target::{is_terminating, BlockId, Instr, InstrKind, ValType};

use super::{AsyncDispatch, GenerationVisitor};
use crate::condition::{for_condition, negate};
use crate::LowerError;

type Result<T> = std::result::Result<T, LowerError>;

impl GenerationVisitor<'_> {
    pub(super) fn lower_stmt_inner(&mut self, id: StmtId, out: &mut Vec<Instr>) -> Result<()> {
        let arena = self.arena;
        let stmt = arena.stmt(id);
        let location = stmt.location.as_ref();

        match &stmt.kind {
            StmtKind::Assignment { left, right } => {
                self.lower_assignment(*left, *right, location, out)?;
            }
            StmtKind::Sequence(body) => self.lower_stmts(body, out)?,
            StmtKind::Conditional {
                condition,
                consequent,
                alternative,
            } => {
                let condition = for_condition(self.lower_expr(*condition)?);
                let mut then_body = Vec::new();
                self.lower_stmts(consequent, &mut then_body)?;
                let mut else_body = Vec::new();
                self.lower_stmts(alternative, &mut else_body)?;
                out.push(
                    Instr::new(InstrKind::Conditional {
                        condition: Box::new(condition),
                        ty: None,
                        then_body,
                        else_body,
                    })
                    .at(location),
                );
            }
            StmtKind::Switch {
                value,
                clauses,
                default,
            } => self.lower_switch(id, *value, clauses, default, location, out)?,
            StmtKind::While { condition, body } => {
                self.lower_while(id, *condition, body, location, out)?;
            }
            StmtKind::Block { body, labeled } => {
                if !*labeled {
                    return self.lower_stmts(body, out);
                }
                let block = self.new_block();
                self.break_targets.insert(id, block);
                let mut inner = Vec::new();
                self.lower_stmts(body, &mut inner)?;
                self.break_targets.remove(&id);
                if self.used_blocks.contains(&block) {
                    out.push(Instr::block(block, None, inner).at(location));
                } else {
                    out.extend(inner);
                }
            }
            StmtKind::Break { target } => {
                let block = self.jump_target(*target, true)?;
                out.push(Instr::break_to(block).at(location));
            }
            StmtKind::Continue { target } => {
                let block = self.jump_target(*target, false)?;
                out.push(Instr::break_to(block).at(location));
            }
            StmtKind::Return(value) => {
                let value = value.map(|v| self.lower_expr(v)).transpose()?;
                out.push(Instr::new(InstrKind::Return(value.map(Box::new))).at(location));
            }
            StmtKind::Throw(exception) => {
                let exception = self.lower_expr(*exception)?;
                let site = self.register_call_site(location);
                self.emit_enter(site, location, out);
                out.push(self.backend.throw(exception, location).at(location));
                self.emit_throw_from(site, location, out);
            }
            StmtKind::InitClass { class } => {
                if self.backend.needs_class_init(class) {
                    let site = self.register_call_site(location);
                    self.emit_enter(site, location, out);
                    out.push(self.backend.init_class(class, location).at(location));
                    self.emit_check_handler(site, location, out);
                }
            }
            StmtKind::TryCatch { .. } => self.lower_try_catch(id, location, out)?,
            StmtKind::MonitorEnter { object } => self.lower_monitor(*object, true, location, out)?,
            StmtKind::MonitorExit { object } => self.lower_monitor(*object, false, location, out)?,
            StmtKind::GotoPart { part } => {
                if let Some(dispatch) = &self.async_dispatch {
                    let part = i32::try_from(*part)
                        .map_err(|_| LowerError::internal(format!("part {part} out of range")))?;
                    out.push(Instr::set_local(dispatch.part, Instr::i32_const(part)).at(location));
                    out.push(Instr::break_to(dispatch.dispatch).at(location));
                }
            }
        }
        Ok(())
    }

    /// Resolve a `break` (or `continue`) target, defaulting to the innermost
    /// enclosing construct.
    fn jump_target(&mut self, target: Option<StmtId>, is_break: bool) -> Result<BlockId> {
        let (kind, current, targets) = if is_break {
            ("break", self.current_break, &self.break_targets)
        } else {
            ("continue", self.current_continue, &self.continue_targets)
        };
        let target = target
            .or(current)
            .ok_or_else(|| LowerError::internal(format!("{kind} outside of any target")))?;
        let block = *targets.get(&target).ok_or_else(|| {
            LowerError::internal(format!("{kind} target {target:?} does not enclose it"))
        })?;
        self.used_blocks.insert(block);
        Ok(block)
    }

    fn lower_assignment(
        &mut self,
        left: Option<ExprId>,
        right: ExprId,
        location: Option<&TextLocation>,
        out: &mut Vec<Instr>,
    ) -> Result<()> {
        let arena = self.arena;
        let Some(left) = left else {
            let value = match &arena.expr(right).kind {
                ExprKind::Invocation {
                    kind,
                    method,
                    arguments,
                } => {
                    let call_location = arena.expr(right).location.as_ref();
                    self.lower_invocation(*kind, method, arguments, true, call_location)?
                }
                _ => {
                    let value = self.lower_expr(right)?;
                    if self.result_type(&value).is_some() {
                        Instr::discard(value)
                    } else {
                        value
                    }
                }
            };
            self.push_stmt(out, value.at(location));
            return Ok(());
        };

        let instr = match &arena.expr(left).kind {
            ExprKind::Variable { index } => {
                let local = self.local(*index)?;
                Instr::set_local(local, self.lower_expr(right)?)
            }
            ExprKind::Qualification {
                qualified, field, ..
            } => {
                let object = qualified.map(|q| self.lower_expr(q)).transpose()?;
                let value = self.lower_expr(right)?;
                self.backend.set_field(field, object, value)
            }
            ExprKind::Subscript { array, index, ty } => {
                let array = self.lower_expr(*array)?;
                let index = self.lower_expr(*index)?;
                let value = self.lower_expr(right)?;
                self.backend.array_set(*ty, array, index, value)
            }
            _ => return Err(LowerError::unsupported("assignment to a non-assignable expression")),
        };
        out.push(instr.at(location));
        Ok(())
    }

    fn lower_while(
        &mut self,
        id: StmtId,
        condition: Option<ExprId>,
        body: &[StmtId],
        location: Option<&TextLocation>,
        out: &mut Vec<Instr>,
    ) -> Result<()> {
        let wrapper = self.new_block();
        let looped = self.new_block();
        self.break_targets.insert(id, wrapper);
        self.continue_targets.insert(id, looped);
        let saved_break = self.current_break.replace(id);
        let saved_continue = self.current_continue.replace(id);

        let mut inner = Vec::new();
        if let Some(condition) = condition {
            let condition = for_condition(self.lower_expr(condition)?);
            let exit = negate(condition, self.canonical_booleans());
            inner.push(Instr::branch(wrapper, exit, None).at(location));
            self.used_blocks.insert(wrapper);
        }
        self.lower_stmts(body, &mut inner)?;
        if !is_terminating(&inner) {
            inner.push(Instr::break_to(looped));
        }

        self.current_break = saved_break;
        self.current_continue = saved_continue;
        self.break_targets.remove(&id);
        self.continue_targets.remove(&id);

        let lowered = Instr::new(InstrKind::Block {
            id: looped,
            is_loop: true,
            ty: None,
            body: inner,
        })
        .at(location);
        if self.used_blocks.contains(&wrapper) {
            out.push(Instr::block(wrapper, None, vec![lowered]).at(location));
        } else {
            out.push(lowered);
        }
        Ok(())
    }

    fn lower_monitor(
        &mut self,
        object: ExprId,
        enter: bool,
        location: Option<&TextLocation>,
        out: &mut Vec<Instr>,
    ) -> Result<()> {
        let object = self.lower_expr(object)?;
        let helper = match (enter, self.is_async) {
            (true, true) => names::MONITOR_ENTER,
            (true, false) => names::MONITOR_ENTER_SYNC,
            (false, true) => names::MONITOR_EXIT,
            (false, false) => names::MONITOR_EXIT_SYNC,
        };
        let site = self.register_call_site(location);
        self.emit_enter(site, location, out);
        out.push(Instr::call(helper, vec![object], None).at(location));
        self.emit_check_handler(site, location, out);
        Ok(())
    }

    /// Lower an asynchronous body: a dispatch loop switching on the current
    /// part, each part reachable by breaking out of its block.
    pub(super) fn lower_parts(&mut self, parts: &[StmtId], out: &mut Vec<Instr>) -> Result<()> {
        tracing::debug!(parts = parts.len(), "lowering asynchronous body");
        self.with_temp(ValType::I32, |this, part| {
            let exit = this.new_block();
            let dispatch = this.new_block();
            let targets: Vec<BlockId> = parts.iter().map(|_| this.new_block()).collect();
            this.async_dispatch = Some(AsyncDispatch { part, dispatch });

            let mut inner = vec![Instr::new(InstrKind::Switch {
                selector: Box::new(Instr::get_local(part)),
                targets: targets.clone(),
                default: exit,
            })];
            for (target, part_stmt) in targets.into_iter().zip(parts) {
                let mut body = vec![Instr::block(target, None, inner)];
                this.lower_stmt(*part_stmt, &mut body)?;
                if !is_terminating(&body) {
                    body.push(Instr::break_to(exit));
                }
                inner = body;
            }
            this.async_dispatch = None;

            let looped = Instr::new(InstrKind::Block {
                id: dispatch,
                is_loop: true,
                ty: None,
                body: inner,
            });
            out.push(Instr::block(exit, None, vec![looped]));
            Ok(())
        })
    }
}
