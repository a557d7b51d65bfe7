//! Try/catch lowering.
//!
//! Directly nested try statements (a protected body made of a single try) are
//! flattened into one chain sharing a single target `try`. The caught
//! exception is tested against the handlers innermost first; each test that
//! matches breaks out to the block whose tail runs that handler.

use std::sync::Arc;

use kiln_ir::{StmtId, StmtKind, TextLocation, ValueType, THROWABLE_CLASS};
use kiln_target::{is_terminating, BlockId, Instr, InstrKind};

use super::GenerationVisitor;
use crate::LowerError;

type Result<T> = std::result::Result<T, LowerError>;

struct Handler<'a> {
    body: &'a [StmtId],
    exception_type: Option<&'a Arc<str>>,
    variable: Option<u32>,
}

impl Handler<'_> {
    fn catches_all(&self) -> bool {
        match self.exception_type {
            Some(class) => &**class == THROWABLE_CLASS,
            None => true,
        }
    }
}

impl GenerationVisitor<'_> {
    pub(super) fn lower_try_catch(
        &mut self,
        id: StmtId,
        location: Option<&TextLocation>,
        out: &mut Vec<Instr>,
    ) -> Result<()> {
        let arena = self.arena;
        // chain[0] is the outermost try.
        let mut chain = Vec::new();
        let mut current = id;
        let protected = loop {
            let StmtKind::TryCatch {
                protected,
                handler,
                exception_type,
                exception_variable,
            } = &arena.stmt(current).kind
            else {
                return Err(LowerError::internal(format!("{current:?} is not a try")));
            };
            chain.push(Handler {
                body: handler,
                exception_type: exception_type.as_ref(),
                variable: *exception_variable,
            });
            match protected.as_slice() {
                [only] if matches!(arena.stmt(*only).kind, StmtKind::TryCatch { .. }) => {
                    current = *only;
                }
                _ => break protected,
            }
        };
        if chain.len() > 1 {
            tracing::trace!(handlers = chain.len(), "flattened nested try statements");
        }

        let inner = self.new_block();
        let catch_blocks: Vec<BlockId> = chain.iter().map(|_| self.new_block()).collect();
        let Some(&outer) = catch_blocks.first() else {
            return Err(LowerError::internal("try without handlers"));
        };

        let depth = self.handlers.len();
        self.handlers
            .extend(chain.iter().map(|h| h.exception_type.cloned()));
        let mut protected_body = Vec::new();
        let lowered = self.lower_stmts(protected, &mut protected_body);
        self.handlers.truncate(depth);
        lowered?;
        if !is_terminating(&protected_body) {
            protected_body.push(Instr::break_to(outer));
            self.used_blocks.insert(outer);
        }

        let mut dispatch = vec![Instr::new(InstrKind::Try {
            body: protected_body,
            catch_body: Vec::new(),
        })
        .at(location)];
        let exception = self.backend.peek_exception();
        self.with_cached(exception, |this, mut cached| {
            cached.emit_init(&mut dispatch);
            let mut target = inner;
            for (handler, block) in chain.iter().zip(&catch_blocks).rev() {
                match handler.exception_type {
                    Some(class) if !handler.catches_all() => {
                        let ty = ValueType::Object(Arc::clone(class));
                        let matches = this.backend.instance_of(cached.get(), &ty);
                        dispatch.push(Instr::branch(target, matches, None));
                    }
                    _ => {
                        dispatch.push(Instr::break_to(target));
                        return Ok(());
                    }
                }
                target = *block;
            }
            dispatch.push(this.backend.throw(cached.get(), location));
            Ok(())
        })?;

        let mut nested = Instr::block(inner, None, dispatch);
        for (index, (handler, block)) in chain.iter().zip(&catch_blocks).enumerate().rev() {
            let mut body = vec![nested];
            let caught = self.backend.catch_exception();
            match handler.variable {
                Some(variable) => body.push(Instr::set_local(self.local(variable)?, caught)),
                None => body.push(Instr::discard(caught)),
            }
            self.lower_stmts(handler.body, &mut body)?;
            if index > 0 && !is_terminating(&body) {
                body.push(Instr::break_to(outer));
            }
            nested = Instr::block(*block, None, body);
        }
        out.push(nested.at(location));
        Ok(())
    }
}
