//! The lowering visitor.
//!
//! Every expression lowers to exactly one [`Instr`]; statements append to a
//! caller-provided buffer. Control constructs become nested blocks: a block id
//! is allocated per construct, and `break`/`continue` resolve their target
//! statement to that id.

mod calls;
mod expr;
mod stmt;
mod switch;
mod try_catch;

use std::sync::Arc;

use kiln_ir::{AstArena, ExprId, MethodBody, MethodNode, StmtId, TextLocation};
use kiln_target::{infer, is_terminating, BlockId, Function, Instr, InstrKind, LocalId, ValType};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{value_type, Backend, CallSiteId, CallSiteTracker, LowerError, TempPool};

/// Default label span at which switches use a binary search instead of a jump
/// table.
pub const SWITCH_TABLE_THRESHOLD: u32 = 256;

/// Tuning knobs for lowering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LowerOptions {
    /// A switch whose `max - min` label span reaches this value is lowered to
    /// a binary search.
    pub switch_table_threshold: u32,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            switch_table_threshold: SWITCH_TABLE_THRESHOLD,
        }
    }
}

/// Lower one method. Native methods have no body and yield `None`.
#[tracing::instrument(level = "debug", skip_all, fields(method = %method.reference))]
pub fn lower_method(
    method: &MethodNode,
    backend: &mut dyn Backend,
    call_sites: &mut dyn CallSiteTracker,
    options: &LowerOptions,
) -> Result<Option<Function>, LowerError> {
    let arena = match method.body.arena() {
        Some(arena) => arena,
        None => return Ok(None),
    };
    let first_variable = u32::from(method.is_static());
    let param_count =
        method.reference.descriptor.parameter_count() + usize::from(!method.is_static());

    let mut variables: Vec<_> = method
        .body
        .variables()
        .iter()
        .filter(|v| v.index >= first_variable)
        .collect();
    variables.sort_by_key(|v| v.index);
    let mut declared = Vec::with_capacity(variables.len());
    for (position, variable) in variables.iter().enumerate() {
        if variable.index as usize != position + first_variable as usize {
            return Err(LowerError::internal(format!(
                "variable {} is out of sequence",
                variable.index
            )));
        }
        let ty = value_type(&variable.ty).ok_or_else(|| {
            LowerError::internal(format!("variable {} has type void", variable.index))
        })?;
        declared.push(ty);
    }
    if declared.len() < param_count {
        return Err(LowerError::internal(format!(
            "{} parameters but only {} variables",
            param_count,
            declared.len()
        )));
    }

    let name = backend.method_function(&method.reference);
    let result = value_type(method.reference.result());
    let mut visitor = GenerationVisitor::new(
        arena,
        backend,
        call_sites,
        declared,
        first_variable,
        method.is_async(),
        options,
    );
    let mut body = Vec::new();
    match &method.body {
        MethodBody::Regular { statement, .. } => visitor.lower_stmt(*statement, &mut body)?,
        MethodBody::Async { parts, .. } => visitor.lower_parts(parts, &mut body)?,
        MethodBody::Native => {}
    }
    if result.is_some() && !is_terminating(&body) {
        body.push(Instr::new(InstrKind::Unreachable));
    }
    debug_assert_eq!(visitor.temps.live_count(), 0);

    Ok(Some(Function {
        name,
        param_count,
        result,
        locals: visitor.into_locals(),
        body,
    }))
}

/// A value evaluated once and read any number of times.
///
/// Trivially repeatable values are used directly; anything else is stored in a
/// temporary by `init`, which must be emitted before the first read.
pub(crate) struct Cached {
    init: Option<Instr>,
    value: Instr,
}

impl Cached {
    pub(crate) fn get(&self) -> Instr {
        self.value.clone()
    }

    pub(crate) fn emit_init(&mut self, body: &mut Vec<Instr>) {
        body.extend(self.init.take());
    }
}

struct AsyncDispatch {
    part: LocalId,
    dispatch: BlockId,
}

/// Per-method lowering state.
pub struct GenerationVisitor<'a> {
    arena: &'a AstArena,
    backend: &'a mut dyn Backend,
    call_sites: &'a mut dyn CallSiteTracker,
    temps: TempPool,
    first_variable: u32,
    is_async: bool,
    switch_table_threshold: u32,
    next_block: u32,
    break_targets: FxHashMap<StmtId, BlockId>,
    continue_targets: FxHashMap<StmtId, BlockId>,
    current_break: Option<StmtId>,
    current_continue: Option<StmtId>,
    /// Blocks targeted by at least one branch.
    used_blocks: FxHashSet<BlockId>,
    /// Untyped grouping blocks that no branch targets; statement context
    /// splices their bodies.
    transparent_blocks: FxHashSet<BlockId>,
    /// Exception classes of enclosing try blocks, outermost first.
    handlers: Vec<Option<Arc<str>>>,
    async_dispatch: Option<AsyncDispatch>,
}

impl<'a> GenerationVisitor<'a> {
    /// `declared` lists the target types of variables `first_variable..`.
    pub fn new(
        arena: &'a AstArena,
        backend: &'a mut dyn Backend,
        call_sites: &'a mut dyn CallSiteTracker,
        declared: Vec<ValType>,
        first_variable: u32,
        is_async: bool,
        options: &LowerOptions,
    ) -> Self {
        Self {
            arena,
            backend,
            call_sites,
            temps: TempPool::new(declared),
            first_variable,
            is_async,
            switch_table_threshold: options.switch_table_threshold,
            next_block: 0,
            break_targets: FxHashMap::default(),
            continue_targets: FxHashMap::default(),
            current_break: None,
            current_continue: None,
            used_blocks: FxHashSet::default(),
            transparent_blocks: FxHashSet::default(),
            handlers: Vec::new(),
            async_dispatch: None,
        }
    }

    /// Every local of the function, temporaries included.
    pub fn into_locals(self) -> Vec<ValType> {
        self.temps.into_locals()
    }

    /// Lower an expression to a single instruction.
    pub fn lower_expr(&mut self, id: ExprId) -> Result<Instr, LowerError> {
        kiln_stack::ensure_sufficient_stack(|| self.lower_expr_inner(id))
    }

    /// Lower a statement, appending to `out`.
    pub fn lower_stmt(&mut self, id: StmtId, out: &mut Vec<Instr>) -> Result<(), LowerError> {
        kiln_stack::ensure_sufficient_stack(|| self.lower_stmt_inner(id, out))
    }

    fn lower_stmts(&mut self, ids: &[StmtId], out: &mut Vec<Instr>) -> Result<(), LowerError> {
        for id in ids {
            self.lower_stmt(*id, out)?;
        }
        Ok(())
    }

    // ── Blocks ─────────────────────────────────────────────────────

    fn new_block(&mut self) -> BlockId {
        let id = BlockId::new(self.next_block);
        self.next_block += 1;
        id
    }

    /// Group `body` as one instruction of type `ty`. A lone instruction is
    /// returned as is.
    fn sequence(
        &mut self,
        ty: Option<ValType>,
        mut body: Vec<Instr>,
        location: Option<&TextLocation>,
    ) -> Instr {
        if body.len() == 1 && self.result_type(&body[0]) == ty {
            if let Some(only) = body.pop() {
                return only;
            }
        }
        let id = self.new_block();
        if ty.is_none() {
            self.transparent_blocks.insert(id);
        }
        Instr::block(id, ty, body).at(location)
    }

    /// Append a statement-level instruction, splicing transparent blocks.
    fn push_stmt(&self, out: &mut Vec<Instr>, instr: Instr) {
        match instr.kind {
            InstrKind::Block {
                id,
                is_loop: false,
                ty: None,
                body,
            } if self.transparent_blocks.contains(&id) => out.extend(body),
            kind => out.push(Instr {
                kind,
                location: instr.location,
            }),
        }
    }

    // ── Locals and temporaries ─────────────────────────────────────

    fn local(&self, variable: u32) -> Result<LocalId, LowerError> {
        let index = variable
            .checked_sub(self.first_variable)
            .ok_or_else(|| LowerError::internal(format!("variable {variable} is not a local")))?;
        if index as usize >= self.temps.locals().len() {
            return Err(LowerError::internal(format!(
                "variable {variable} is not declared"
            )));
        }
        Ok(LocalId::new(index))
    }

    fn result_type(&self, instr: &Instr) -> Option<ValType> {
        infer::result_type(instr, self.temps.locals())
    }

    fn value_type_of(&self, instr: &Instr) -> Result<ValType, LowerError> {
        self.result_type(instr).ok_or_else(|| {
            LowerError::internal(format!("expected a value, found {:?}", instr.kind))
        })
    }

    /// Run `f` with a temporary of type `ty`, released afterwards.
    fn with_temp<R>(
        &mut self,
        ty: ValType,
        f: impl FnOnce(&mut Self, LocalId) -> Result<R, LowerError>,
    ) -> Result<R, LowerError> {
        let local = self.temps.acquire(ty);
        let result = f(self, local);
        self.temps.release(local);
        result
    }

    /// Run `f` with `value` evaluated once.
    fn with_cached<R>(
        &mut self,
        value: Instr,
        f: impl FnOnce(&mut Self, Cached) -> Result<R, LowerError>,
    ) -> Result<R, LowerError> {
        if value.is_trivially_repeatable() {
            return f(
                self,
                Cached {
                    init: None,
                    value,
                },
            );
        }
        let ty = self.value_type_of(&value)?;
        let location = value.location.clone();
        self.with_temp(ty, |this, local| {
            let cached = Cached {
                init: Some(Instr::set_local(local, value).at(location.as_ref())),
                value: Instr::get_local(local),
            };
            f(this, cached)
        })
    }

    // ── Call sites ─────────────────────────────────────────────────

    fn register_call_site(&mut self, location: Option<&TextLocation>) -> Option<CallSiteId> {
        self.call_sites.register(location, &self.handlers)
    }

    fn emit_enter(
        &self,
        site: Option<CallSiteId>,
        location: Option<&TextLocation>,
        body: &mut Vec<Instr>,
    ) {
        if let Some(site) = site {
            body.push(self.call_sites.enter(site).at(location));
        }
    }

    fn emit_check_handler(
        &self,
        site: Option<CallSiteId>,
        location: Option<&TextLocation>,
        body: &mut Vec<Instr>,
    ) {
        if let Some(site) = site {
            body.push(self.call_sites.check_handler(site).at(location));
        }
    }

    fn emit_throw_from(
        &self,
        site: Option<CallSiteId>,
        location: Option<&TextLocation>,
        body: &mut Vec<Instr>,
    ) {
        if let Some(site) = site {
            body.push(self.call_sites.throw_from(site).at(location));
        }
    }

    fn canonical_booleans(&self) -> bool {
        self.backend.canonical_booleans()
    }
}
