//! Per-method storage for statements and expressions.

use rustc_hash::FxHashMap;

use crate::{Expr, ExprId, ExprKind, Stmt, StmtId, StmtKind, SwitchClause};

/// Arena owning every statement and expression of one method body.
///
/// Expressions may be shared: two parents holding the same [`ExprId`] form a
/// diamond. Lowering treats a shared expression as evaluated at each use.
#[derive(Clone, Debug, Default)]
pub struct AstArena {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "arena sizes never exceed u32"
    )]
    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::new(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "arena sizes never exceed u32"
    )]
    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId::new(self.stmts.len() as u32);
        self.stmts.push(stmt);
        id
    }

    /// Shorthand for allocating a location-less expression.
    pub fn expr_of(&mut self, kind: ExprKind) -> ExprId {
        self.alloc_expr(Expr::new(kind))
    }

    /// Shorthand for allocating a location-less statement.
    pub fn stmt_of(&mut self, kind: StmtKind) -> StmtId {
        self.alloc_stmt(Stmt::new(kind))
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    #[inline]
    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.index()]
    }

    #[inline]
    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Stmt {
        &mut self.stmts[id.index()]
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }

    /// Deep-copy the expression rooted at `root` inside this arena.
    ///
    /// An expression reachable along several paths is copied once and the copy
    /// is shared the same way. Cyclic expressions are not supported.
    pub fn deep_clone_expr(&mut self, root: ExprId) -> ExprId {
        DeepCloner::new(self).expr(root)
    }

    /// Deep-copy the statement rooted at `root` inside this arena.
    ///
    /// Break/continue targets inside the copied subtree are redirected to the
    /// copies; targets outside it are kept.
    pub fn deep_clone_stmt(&mut self, root: StmtId) -> StmtId {
        DeepCloner::new(self).stmt(root)
    }
}

/// Identity-keyed copier. Slots are reserved before children are visited so
/// that nested breaks can already see the copy of their target.
struct DeepCloner<'a> {
    arena: &'a mut AstArena,
    exprs: FxHashMap<ExprId, ExprId>,
    stmts: FxHashMap<StmtId, StmtId>,
}

impl<'a> DeepCloner<'a> {
    fn new(arena: &'a mut AstArena) -> Self {
        Self {
            arena,
            exprs: FxHashMap::default(),
            stmts: FxHashMap::default(),
        }
    }

    fn expr(&mut self, id: ExprId) -> ExprId {
        if let Some(&copy) = self.exprs.get(&id) {
            return copy;
        }
        kiln_stack::ensure_sufficient_stack(|| {
            let source = self.arena.expr(id).clone();
            let copy = self.arena.alloc_expr(source.clone());
            self.exprs.insert(id, copy);
            let kind = source.kind.map_children(&mut |child| self.expr(child));
            self.arena.expr_mut(copy).kind = kind;
            copy
        })
    }

    fn stmts(&mut self, ids: Vec<StmtId>) -> Vec<StmtId> {
        ids.into_iter().map(|id| self.stmt(id)).collect()
    }

    fn target(&self, target: Option<StmtId>) -> Option<StmtId> {
        target.map(|t| self.stmts.get(&t).copied().unwrap_or(t))
    }

    fn stmt(&mut self, id: StmtId) -> StmtId {
        if let Some(&copy) = self.stmts.get(&id) {
            return copy;
        }
        kiln_stack::ensure_sufficient_stack(|| {
            let source = self.arena.stmt(id).clone();
            let copy = self.arena.alloc_stmt(source.clone());
            self.stmts.insert(id, copy);
            let kind = match source.kind {
                StmtKind::Assignment { left, right } => StmtKind::Assignment {
                    left: left.map(|e| self.expr(e)),
                    right: self.expr(right),
                },
                StmtKind::Sequence(body) => StmtKind::Sequence(self.stmts(body)),
                StmtKind::Conditional {
                    condition,
                    consequent,
                    alternative,
                } => StmtKind::Conditional {
                    condition: self.expr(condition),
                    consequent: self.stmts(consequent),
                    alternative: self.stmts(alternative),
                },
                StmtKind::Switch {
                    value,
                    clauses,
                    default,
                } => StmtKind::Switch {
                    value: self.expr(value),
                    clauses: clauses
                        .into_iter()
                        .map(|clause| SwitchClause {
                            labels: clause.labels,
                            body: self.stmts(clause.body),
                        })
                        .collect(),
                    default: self.stmts(default),
                },
                StmtKind::While { condition, body } => StmtKind::While {
                    condition: condition.map(|e| self.expr(e)),
                    body: self.stmts(body),
                },
                StmtKind::Block { body, labeled } => StmtKind::Block {
                    body: self.stmts(body),
                    labeled,
                },
                StmtKind::Break { target } => StmtKind::Break {
                    target: self.target(target),
                },
                StmtKind::Continue { target } => StmtKind::Continue {
                    target: self.target(target),
                },
                StmtKind::Return(value) => StmtKind::Return(value.map(|e| self.expr(e))),
                StmtKind::Throw(value) => StmtKind::Throw(self.expr(value)),
                StmtKind::TryCatch {
                    protected,
                    handler,
                    exception_type,
                    exception_variable,
                } => StmtKind::TryCatch {
                    protected: self.stmts(protected),
                    handler: self.stmts(handler),
                    exception_type,
                    exception_variable,
                },
                StmtKind::MonitorEnter { object } => StmtKind::MonitorEnter {
                    object: self.expr(object),
                },
                StmtKind::MonitorExit { object } => StmtKind::MonitorExit {
                    object: self.expr(object),
                },
                leaf @ (StmtKind::InitClass { .. } | StmtKind::GotoPart { .. }) => leaf,
            };
            self.arena.stmt_mut(copy).kind = kind;
            copy
        })
    }
}
