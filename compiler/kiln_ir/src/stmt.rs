//! Statement nodes of the statement/expression tree.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::{ExprId, StmtId, TextLocation};

/// One `case` group of a switch: every label routes to the same body.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchClause {
    pub labels: SmallVec<[i32; 4]>,
    pub body: Vec<StmtId>,
}

impl SwitchClause {
    pub fn new(labels: impl IntoIterator<Item = i32>, body: Vec<StmtId>) -> Self {
        Self {
            labels: labels.into_iter().collect(),
            body,
        }
    }
}

/// Statement node.
#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: Option<TextLocation>,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    #[must_use]
    pub fn at(mut self, location: TextLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// Statement variants.
///
/// `Block`, `While` and `Switch` are break targets; `While` is also a
/// continue target. Targets are referenced by their [`StmtId`].
#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// `left` is `None` for an expression statement.
    Assignment {
        left: Option<ExprId>,
        right: ExprId,
    },
    Sequence(Vec<StmtId>),
    Conditional {
        condition: ExprId,
        consequent: Vec<StmtId>,
        alternative: Vec<StmtId>,
    },
    Switch {
        value: ExprId,
        clauses: Vec<SwitchClause>,
        default: Vec<StmtId>,
    },
    /// `condition` of `None` loops until broken out of.
    While {
        condition: Option<ExprId>,
        body: Vec<StmtId>,
    },
    Block {
        body: Vec<StmtId>,
        /// Whether some `break` names this block.
        labeled: bool,
    },
    /// `target` of `None` means the innermost loop or switch.
    Break {
        target: Option<StmtId>,
    },
    /// `target` of `None` means the innermost loop.
    Continue {
        target: Option<StmtId>,
    },
    Return(Option<ExprId>),
    Throw(ExprId),
    InitClass {
        class: Arc<str>,
    },
    TryCatch {
        protected: Vec<StmtId>,
        handler: Vec<StmtId>,
        /// `None` catches every exception.
        exception_type: Option<Arc<str>>,
        exception_variable: Option<u32>,
    },
    MonitorEnter {
        object: ExprId,
    },
    MonitorExit {
        object: ExprId,
    },
    GotoPart {
        part: u32,
    },
}

impl StmtKind {
    /// Whether `break` without a target may resolve to this statement.
    pub fn is_implicit_break_target(&self) -> bool {
        matches!(self, StmtKind::While { .. } | StmtKind::Switch { .. })
    }
}
