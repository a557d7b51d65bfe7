//! Graph IR - the expression DAG packed by the binary codec.
//!
//! Every node produces one value. Nodes with side effects or structure
//! (stores, calls, throws, scopes) carry a `previous` edge to the node they
//! must follow; each effect chain begins at a [`IrExprKind::Start`] or at the
//! header of an enclosing scope (`LoopHeader`, `TryCatchStart`).
//!
//! Scope references (`ExitBlock`, `LoopExit`, `CaughtValue`, ...) name their
//! enclosing scope node. They are not inputs: the scope is not evaluated by
//! the reference.

mod decl;
mod equality;
mod ops;

use std::sync::Arc;

use smallvec::SmallVec;

pub use decl::{
    IrClass, IrField, IrFunction, IrGlobal, IrMethod, IrReferenceType, IrType, PrimitiveArrayKind,
};
pub use equality::structurally_equal;
pub use ops::IrOperation;

crate::ids::define_id!(
    /// Handle of a node in an [`IrGraph`].
    NodeId,
);

/// Kind of scope a scope reference resolves against.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Block,
    Loop,
    TryCatch,
}

/// Graph node variants.
#[derive(Clone, Debug, PartialEq)]
pub enum IrExprKind {
    /// Head of an effect chain.
    Start,
    Operation {
        op: IrOperation,
        operands: SmallVec<[NodeId; 2]>,
    },
    Conditional {
        condition: NodeId,
        then_value: NodeId,
        else_value: NodeId,
    },
    Block {
        body: NodeId,
    },
    ExitBlock {
        block: NodeId,
        value: NodeId,
    },
    Loop {
        body: NodeId,
    },
    /// Head of the effect chain of one loop iteration.
    LoopHeader {
        looped: NodeId,
    },
    LoopExit {
        looped: NodeId,
        value: NodeId,
    },
    LoopContinue {
        looped: NodeId,
    },
    TryCatch {
        body: NodeId,
        handler: NodeId,
        exception_types: Vec<IrClass>,
        caught_values: u32,
    },
    /// Head of the effect chain of a protected body.
    TryCatchStart {
        try_catch: NodeId,
    },
    CaughtValue {
        try_catch: NodeId,
        index: u32,
    },
    SetCaughtValue {
        try_catch: NodeId,
        index: u32,
        value: NodeId,
    },
    CaughtException {
        try_catch: NodeId,
    },
    Throw {
        value: NodeId,
    },
    Tuple(Vec<NodeId>),
    TupleComponent {
        tuple: NodeId,
        component: u32,
    },
    IntConst(i32),
    LongConst(i64),
    /// Raw `f32` bits.
    FloatConst(u32),
    /// Raw `f64` bits.
    DoubleConst(u64),
    StringConst(Arc<str>),
    CallFunction {
        function: IrFunction,
        arguments: Vec<NodeId>,
    },
    CallMethod {
        method: IrMethod,
        arguments: Vec<NodeId>,
    },
    GetVar(u32),
    SetVar {
        index: u32,
        value: NodeId,
    },
    GetGlobal(IrGlobal),
    SetGlobal {
        global: IrGlobal,
        value: NodeId,
    },
    GetField {
        field: IrField,
        object: NodeId,
    },
    SetField {
        field: IrField,
        object: NodeId,
        value: NodeId,
    },
    Cast {
        value: NodeId,
        target: IrReferenceType,
    },
    InstanceOf {
        value: NodeId,
        checked: IrReferenceType,
    },
    Parameter(u32),
    New(IrClass),
}

impl IrExprKind {
    /// Whether the node has a `previous` edge.
    pub fn needs_ordering(&self) -> bool {
        match self {
            IrExprKind::Operation { op, .. } => op.is_ordered(),
            IrExprKind::Conditional { .. }
            | IrExprKind::Block { .. }
            | IrExprKind::ExitBlock { .. }
            | IrExprKind::Loop { .. }
            | IrExprKind::LoopExit { .. }
            | IrExprKind::LoopContinue { .. }
            | IrExprKind::TryCatch { .. }
            | IrExprKind::SetCaughtValue { .. }
            | IrExprKind::Throw { .. }
            | IrExprKind::CallFunction { .. }
            | IrExprKind::CallMethod { .. }
            | IrExprKind::SetVar { .. }
            | IrExprKind::SetGlobal { .. }
            | IrExprKind::SetField { .. }
            | IrExprKind::New(_) => true,
            IrExprKind::Start
            | IrExprKind::LoopHeader { .. }
            | IrExprKind::TryCatchStart { .. }
            | IrExprKind::CaughtValue { .. }
            | IrExprKind::CaughtException { .. }
            | IrExprKind::Tuple(_)
            | IrExprKind::TupleComponent { .. }
            | IrExprKind::IntConst(_)
            | IrExprKind::LongConst(_)
            | IrExprKind::FloatConst(_)
            | IrExprKind::DoubleConst(_)
            | IrExprKind::StringConst(_)
            | IrExprKind::GetVar(_)
            | IrExprKind::GetGlobal(_)
            | IrExprKind::GetField { .. }
            | IrExprKind::Cast { .. }
            | IrExprKind::InstanceOf { .. }
            | IrExprKind::Parameter(_) => false,
        }
    }

    /// Value inputs, in the order they are pushed.
    pub fn inputs(&self) -> SmallVec<[NodeId; 4]> {
        let mut out = SmallVec::new();
        match self {
            IrExprKind::Operation { operands, .. } => out.extend(operands.iter().copied()),
            IrExprKind::Conditional {
                condition,
                then_value,
                else_value,
            } => out.extend([*condition, *then_value, *else_value]),
            IrExprKind::Block { body } | IrExprKind::Loop { body } => out.push(*body),
            IrExprKind::ExitBlock { value, .. }
            | IrExprKind::LoopExit { value, .. }
            | IrExprKind::SetCaughtValue { value, .. }
            | IrExprKind::Throw { value }
            | IrExprKind::SetVar { value, .. }
            | IrExprKind::SetGlobal { value, .. }
            | IrExprKind::Cast { value, .. }
            | IrExprKind::InstanceOf { value, .. } => out.push(*value),
            IrExprKind::TryCatch { body, handler, .. } => out.extend([*body, *handler]),
            IrExprKind::Tuple(items) => out.extend(items.iter().copied()),
            IrExprKind::TupleComponent { tuple, .. } => out.push(*tuple),
            IrExprKind::CallFunction { arguments, .. } | IrExprKind::CallMethod { arguments, .. } => {
                out.extend(arguments.iter().copied());
            }
            IrExprKind::GetField { object, .. } => out.push(*object),
            IrExprKind::SetField { object, value, .. } => out.extend([*object, *value]),
            IrExprKind::Start
            | IrExprKind::LoopHeader { .. }
            | IrExprKind::LoopContinue { .. }
            | IrExprKind::TryCatchStart { .. }
            | IrExprKind::CaughtValue { .. }
            | IrExprKind::CaughtException { .. }
            | IrExprKind::IntConst(_)
            | IrExprKind::LongConst(_)
            | IrExprKind::FloatConst(_)
            | IrExprKind::DoubleConst(_)
            | IrExprKind::StringConst(_)
            | IrExprKind::GetVar(_)
            | IrExprKind::GetGlobal(_)
            | IrExprKind::Parameter(_)
            | IrExprKind::New(_) => {}
        }
        out
    }

    /// The enclosing scope this node refers to, if it is a scope reference.
    pub fn scope(&self) -> Option<(ScopeKind, NodeId)> {
        match self {
            IrExprKind::ExitBlock { block, .. } => Some((ScopeKind::Block, *block)),
            IrExprKind::LoopHeader { looped }
            | IrExprKind::LoopExit { looped, .. }
            | IrExprKind::LoopContinue { looped } => Some((ScopeKind::Loop, *looped)),
            IrExprKind::TryCatchStart { try_catch }
            | IrExprKind::CaughtValue { try_catch, .. }
            | IrExprKind::SetCaughtValue { try_catch, .. }
            | IrExprKind::CaughtException { try_catch } => Some((ScopeKind::TryCatch, *try_catch)),
            _ => None,
        }
    }

    /// The scope kind this node opens, if it is a scope.
    pub fn opens_scope(&self) -> Option<ScopeKind> {
        match self {
            IrExprKind::Block { .. } => Some(ScopeKind::Block),
            IrExprKind::Loop { .. } => Some(ScopeKind::Loop),
            IrExprKind::TryCatch { .. } => Some(ScopeKind::TryCatch),
            _ => None,
        }
    }

    /// Rebuild the node with every node handle (inputs and scope references)
    /// passed through `f`.
    #[must_use]
    pub fn map_nodes(self, f: &mut impl FnMut(NodeId) -> NodeId) -> IrExprKind {
        match self {
            IrExprKind::Operation { op, operands } => IrExprKind::Operation {
                op,
                operands: operands.into_iter().map(&mut *f).collect(),
            },
            IrExprKind::Conditional {
                condition,
                then_value,
                else_value,
            } => IrExprKind::Conditional {
                condition: f(condition),
                then_value: f(then_value),
                else_value: f(else_value),
            },
            IrExprKind::Block { body } => IrExprKind::Block { body: f(body) },
            IrExprKind::ExitBlock { block, value } => IrExprKind::ExitBlock {
                block: f(block),
                value: f(value),
            },
            IrExprKind::Loop { body } => IrExprKind::Loop { body: f(body) },
            IrExprKind::LoopHeader { looped } => IrExprKind::LoopHeader { looped: f(looped) },
            IrExprKind::LoopExit { looped, value } => IrExprKind::LoopExit {
                looped: f(looped),
                value: f(value),
            },
            IrExprKind::LoopContinue { looped } => IrExprKind::LoopContinue { looped: f(looped) },
            IrExprKind::TryCatch {
                body,
                handler,
                exception_types,
                caught_values,
            } => IrExprKind::TryCatch {
                body: f(body),
                handler: f(handler),
                exception_types,
                caught_values,
            },
            IrExprKind::TryCatchStart { try_catch } => IrExprKind::TryCatchStart {
                try_catch: f(try_catch),
            },
            IrExprKind::CaughtValue { try_catch, index } => IrExprKind::CaughtValue {
                try_catch: f(try_catch),
                index,
            },
            IrExprKind::SetCaughtValue {
                try_catch,
                index,
                value,
            } => IrExprKind::SetCaughtValue {
                try_catch: f(try_catch),
                index,
                value: f(value),
            },
            IrExprKind::CaughtException { try_catch } => IrExprKind::CaughtException {
                try_catch: f(try_catch),
            },
            IrExprKind::Throw { value } => IrExprKind::Throw { value: f(value) },
            IrExprKind::Tuple(items) => IrExprKind::Tuple(items.into_iter().map(&mut *f).collect()),
            IrExprKind::TupleComponent { tuple, component } => IrExprKind::TupleComponent {
                tuple: f(tuple),
                component,
            },
            IrExprKind::CallFunction {
                function,
                arguments,
            } => IrExprKind::CallFunction {
                function,
                arguments: arguments.into_iter().map(&mut *f).collect(),
            },
            IrExprKind::CallMethod { method, arguments } => IrExprKind::CallMethod {
                method,
                arguments: arguments.into_iter().map(&mut *f).collect(),
            },
            IrExprKind::SetVar { index, value } => IrExprKind::SetVar {
                index,
                value: f(value),
            },
            IrExprKind::SetGlobal { global, value } => IrExprKind::SetGlobal {
                global,
                value: f(value),
            },
            IrExprKind::GetField { field, object } => IrExprKind::GetField {
                field,
                object: f(object),
            },
            IrExprKind::SetField {
                field,
                object,
                value,
            } => IrExprKind::SetField {
                field,
                object: f(object),
                value: f(value),
            },
            IrExprKind::Cast { value, target } => IrExprKind::Cast {
                value: f(value),
                target,
            },
            IrExprKind::InstanceOf { value, checked } => IrExprKind::InstanceOf {
                value: f(value),
                checked,
            },
            leaf @ (IrExprKind::Start
            | IrExprKind::IntConst(_)
            | IrExprKind::LongConst(_)
            | IrExprKind::FloatConst(_)
            | IrExprKind::DoubleConst(_)
            | IrExprKind::StringConst(_)
            | IrExprKind::GetVar(_)
            | IrExprKind::GetGlobal(_)
            | IrExprKind::Parameter(_)
            | IrExprKind::New(_)) => leaf,
        }
    }
}

/// A node: its kind plus the effect it follows.
#[derive(Clone, Debug, PartialEq)]
pub struct IrNode {
    pub kind: IrExprKind,
    pub previous: Option<NodeId>,
}

/// Node storage for one graph.
#[derive(Clone, Debug, Default)]
pub struct IrGraph {
    nodes: Vec<IrNode>,
}

impl IrGraph {
    pub fn new() -> Self {
        Self::default()
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "graph sizes never exceed u32"
    )]
    fn push(&mut self, node: IrNode) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Add a node without an effect edge.
    pub fn add(&mut self, kind: IrExprKind) -> NodeId {
        debug_assert!(!kind.needs_ordering(), "{kind:?} needs a previous node");
        self.push(IrNode {
            kind,
            previous: None,
        })
    }

    /// Add an effectful node ordered after `previous`.
    pub fn add_after(&mut self, previous: NodeId, kind: IrExprKind) -> NodeId {
        debug_assert!(kind.needs_ordering(), "{kind:?} takes no previous node");
        self.push(IrNode {
            kind,
            previous: Some(previous),
        })
    }

    /// Allocate a node whose content is supplied later with [`define`](Self::define).
    /// Used for scopes that are referenced before they are built.
    pub fn reserve(&mut self) -> NodeId {
        self.push(IrNode {
            kind: IrExprKind::Start,
            previous: None,
        })
    }

    /// Fill in a node allocated by [`reserve`](Self::reserve).
    pub fn define(&mut self, id: NodeId, kind: IrExprKind, previous: Option<NodeId>) {
        self.nodes[id.index()] = IrNode { kind, previous };
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &IrNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> &IrExprKind {
        &self.nodes[id.index()].kind
    }

    #[inline]
    pub fn previous(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].previous
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ── Convenience constructors ──

    pub fn start(&mut self) -> NodeId {
        self.add(IrExprKind::Start)
    }

    pub fn int_const(&mut self, value: i32) -> NodeId {
        self.add(IrExprKind::IntConst(value))
    }

    pub fn operation(&mut self, op: IrOperation, operands: &[NodeId]) -> NodeId {
        debug_assert_eq!(op.arity(), operands.len());
        let kind = IrExprKind::Operation {
            op,
            operands: operands.iter().copied().collect(),
        };
        self.add(kind)
    }
}
