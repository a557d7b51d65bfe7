use std::fmt;
use std::sync::Arc;

use kiln_ir::{ArrayType, TextLocation};

/// Value type of a local, parameter or instruction result.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValType {
    I32,
    I64,
    F32,
    F64,
    /// Nullable reference to a heap object.
    Ref,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntType {
    I32,
    I64,
}

impl IntType {
    pub const fn val_type(self) -> ValType {
        match self {
            IntType::I32 => ValType::I32,
            IntType::I64 => ValType::I64,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FloatType {
    F32,
    F64,
}

impl FloatType {
    pub const fn val_type(self) -> ValType {
        match self {
            FloatType::F32 => ValType::F32,
            FloatType::F64 => ValType::F64,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntBinaryOp {
    Add,
    Sub,
    Mul,
    DivS,
    DivU,
    RemS,
    RemU,
    And,
    Or,
    Xor,
    Shl,
    ShrS,
    ShrU,
    Eq,
    Ne,
    LtS,
    LtU,
    LeS,
    LeU,
    GtS,
    GtU,
    GeS,
    GeU,
}

impl IntBinaryOp {
    /// Whether the operation yields an `i32` boolean.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            IntBinaryOp::Eq
                | IntBinaryOp::Ne
                | IntBinaryOp::LtS
                | IntBinaryOp::LtU
                | IntBinaryOp::LeS
                | IntBinaryOp::LeU
                | IntBinaryOp::GtS
                | IntBinaryOp::GtU
                | IntBinaryOp::GeS
                | IntBinaryOp::GeU
        )
    }

    /// Logical complement of a comparison.
    pub const fn negated(self) -> Option<IntBinaryOp> {
        Some(match self {
            IntBinaryOp::Eq => IntBinaryOp::Ne,
            IntBinaryOp::Ne => IntBinaryOp::Eq,
            IntBinaryOp::LtS => IntBinaryOp::GeS,
            IntBinaryOp::LtU => IntBinaryOp::GeU,
            IntBinaryOp::LeS => IntBinaryOp::GtS,
            IntBinaryOp::LeU => IntBinaryOp::GtU,
            IntBinaryOp::GtS => IntBinaryOp::LeS,
            IntBinaryOp::GtU => IntBinaryOp::LeU,
            IntBinaryOp::GeS => IntBinaryOp::LtS,
            IntBinaryOp::GeU => IntBinaryOp::LtU,
            _ => return None,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntUnaryOp {
    Eqz,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FloatBinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl FloatBinaryOp {
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            FloatBinaryOp::Eq
                | FloatBinaryOp::Ne
                | FloatBinaryOp::Lt
                | FloatBinaryOp::Le
                | FloatBinaryOp::Gt
                | FloatBinaryOp::Ge
        )
    }

    /// Complement of a comparison. `Lt` becomes `Ge`, which differs from
    /// `!Lt` only for NaN operands.
    pub const fn negated(self) -> Option<FloatBinaryOp> {
        Some(match self {
            FloatBinaryOp::Eq => FloatBinaryOp::Ne,
            FloatBinaryOp::Ne => FloatBinaryOp::Eq,
            FloatBinaryOp::Lt => FloatBinaryOp::Ge,
            FloatBinaryOp::Le => FloatBinaryOp::Gt,
            FloatBinaryOp::Gt => FloatBinaryOp::Le,
            FloatBinaryOp::Ge => FloatBinaryOp::Lt,
            _ => return None,
        })
    }
}

/// Label of a block or loop within one function.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$b{}", self.0)
    }
}

/// Index of a local (parameters first) within one function.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct LocalId(u32);

impl LocalId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$l{}", self.0)
    }
}

/// One target instruction.
#[derive(Clone, Debug, PartialEq)]
pub struct Instr {
    pub kind: InstrKind,
    pub location: Option<TextLocation>,
}

/// Instruction variants.
///
/// Sequences (`body` vectors) yield the value of their last instruction.
/// `Branch` is `br_if`: when the condition is zero it yields its `result`.
#[derive(Clone, Debug, PartialEq)]
pub enum InstrKind {
    Nop,
    Block {
        id: BlockId,
        is_loop: bool,
        ty: Option<ValType>,
        body: Vec<Instr>,
    },
    Branch {
        target: BlockId,
        condition: Box<Instr>,
        result: Option<Box<Instr>>,
    },
    Break {
        target: BlockId,
        result: Option<Box<Instr>>,
    },
    /// `br_table`: out-of-range selectors go to `default`.
    Switch {
        selector: Box<Instr>,
        targets: Vec<BlockId>,
        default: BlockId,
    },
    Conditional {
        condition: Box<Instr>,
        ty: Option<ValType>,
        then_body: Vec<Instr>,
        else_body: Vec<Instr>,
    },
    Return(Option<Box<Instr>>),
    Drop(Box<Instr>),
    Unreachable,

    I32Const(i32),
    I64Const(i64),
    /// Raw `f32` bits.
    F32Const(u32),
    /// Raw `f64` bits.
    F64Const(u64),
    RefNull,
    StringConst(Arc<str>),

    IntBinary {
        ty: IntType,
        op: IntBinaryOp,
        first: Box<Instr>,
        second: Box<Instr>,
    },
    IntUnary {
        ty: IntType,
        op: IntUnaryOp,
        operand: Box<Instr>,
    },
    FloatBinary {
        ty: FloatType,
        op: FloatBinaryOp,
        first: Box<Instr>,
        second: Box<Instr>,
    },
    Conversion {
        from: ValType,
        to: ValType,
        signed: bool,
        operand: Box<Instr>,
    },

    GetLocal(LocalId),
    SetLocal {
        local: LocalId,
        value: Box<Instr>,
    },
    GetGlobal {
        name: Arc<str>,
        ty: ValType,
    },
    SetGlobal {
        name: Arc<str>,
        value: Box<Instr>,
    },

    Call {
        function: Arc<str>,
        arguments: Vec<Instr>,
        result: Option<ValType>,
    },
    /// Dispatch on the runtime class of argument 0.
    CallVirtual {
        descriptor: Arc<str>,
        arguments: Vec<Instr>,
        result: Option<ValType>,
    },

    /// Runs `body`; if it throws, records the exception and runs `catch_body`.
    Try {
        body: Vec<Instr>,
        catch_body: Vec<Instr>,
    },
    /// The exception most recently caught by a `Try`.
    CaughtException,
    Throw(Box<Instr>),

    StructNew {
        class: Arc<str>,
    },
    StructGet {
        field: Arc<str>,
        object: Box<Instr>,
        ty: ValType,
    },
    StructSet {
        field: Arc<str>,
        object: Box<Instr>,
        value: Box<Instr>,
    },
    ArrayNew {
        element: ArrayType,
        length: Box<Instr>,
    },
    ArrayGet {
        element: ArrayType,
        array: Box<Instr>,
        index: Box<Instr>,
    },
    ArraySet {
        element: ArrayType,
        array: Box<Instr>,
        index: Box<Instr>,
        value: Box<Instr>,
    },
    ArrayLength(Box<Instr>),
    RefIsNull(Box<Instr>),
    RefEq(Box<Instr>, Box<Instr>),
    /// Non-null subtype test against a class or array descriptor.
    RefTest {
        class: Arc<str>,
        value: Box<Instr>,
    },
}

impl Instr {
    pub fn new(kind: InstrKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    /// Attach `location` unless it is `None`.
    #[must_use]
    pub fn at(mut self, location: Option<&TextLocation>) -> Self {
        if let Some(location) = location {
            self.location = Some(location.clone());
        }
        self
    }

    pub fn i32_const(value: i32) -> Self {
        Self::new(InstrKind::I32Const(value))
    }

    pub fn get_local(local: LocalId) -> Self {
        Self::new(InstrKind::GetLocal(local))
    }

    pub fn set_local(local: LocalId, value: Instr) -> Self {
        Self::new(InstrKind::SetLocal {
            local,
            value: Box::new(value),
        })
    }

    pub fn int_binary(ty: IntType, op: IntBinaryOp, first: Instr, second: Instr) -> Self {
        Self::new(InstrKind::IntBinary {
            ty,
            op,
            first: Box::new(first),
            second: Box::new(second),
        })
    }

    pub fn discard(value: Instr) -> Self {
        Self::new(InstrKind::Drop(Box::new(value)))
    }

    pub fn branch(target: BlockId, condition: Instr, result: Option<Instr>) -> Self {
        Self::new(InstrKind::Branch {
            target,
            condition: Box::new(condition),
            result: result.map(Box::new),
        })
    }

    pub fn break_to(target: BlockId) -> Self {
        Self::new(InstrKind::Break {
            target,
            result: None,
        })
    }

    pub fn block(id: BlockId, ty: Option<ValType>, body: Vec<Instr>) -> Self {
        Self::new(InstrKind::Block {
            id,
            is_loop: false,
            ty,
            body,
        })
    }

    pub fn call(function: impl Into<Arc<str>>, arguments: Vec<Instr>, result: Option<ValType>) -> Self {
        Self::new(InstrKind::Call {
            function: function.into(),
            arguments,
            result,
        })
    }

    /// Whether re-evaluating this instruction is free and side-effect free.
    pub fn is_trivially_repeatable(&self) -> bool {
        matches!(
            self.kind,
            InstrKind::GetLocal(_)
                | InstrKind::I32Const(_)
                | InstrKind::I64Const(_)
                | InstrKind::F32Const(_)
                | InstrKind::F64Const(_)
                | InstrKind::RefNull
        )
    }

    /// Whether control never falls through this instruction.
    pub fn is_terminating(&self) -> bool {
        match &self.kind {
            InstrKind::Break { .. }
            | InstrKind::Switch { .. }
            | InstrKind::Return(_)
            | InstrKind::Throw(_)
            | InstrKind::Unreachable => true,
            InstrKind::Conditional {
                then_body,
                else_body,
                ..
            } => is_terminating(then_body) && is_terminating(else_body),
            _ => false,
        }
    }

    /// Nested instructions in evaluation order, `then` before `else` and
    /// `body` before `catch_body`.
    pub fn children(&self) -> Vec<&Instr> {
        let mut out: Vec<&Instr> = Vec::new();
        match &self.kind {
            InstrKind::Block { body, .. } => out.extend(body),
            InstrKind::Branch {
                condition, result, ..
            } => {
                out.extend(result.as_deref());
                out.push(condition);
            }
            InstrKind::Break { result, .. } | InstrKind::Return(result) => {
                out.extend(result.as_deref());
            }
            InstrKind::Switch { selector, .. } => out.push(selector),
            InstrKind::Conditional {
                condition,
                then_body,
                else_body,
                ..
            } => {
                out.push(condition);
                out.extend(then_body);
                out.extend(else_body);
            }
            InstrKind::Drop(value)
            | InstrKind::Throw(value)
            | InstrKind::ArrayLength(value)
            | InstrKind::RefIsNull(value)
            | InstrKind::RefTest { value, .. }
            | InstrKind::SetGlobal { value, .. }
            | InstrKind::SetLocal { value, .. } => out.push(value),
            InstrKind::IntBinary { first, second, .. }
            | InstrKind::FloatBinary { first, second, .. }
            | InstrKind::RefEq(first, second) => {
                out.push(first);
                out.push(second);
            }
            InstrKind::IntUnary { operand, .. } | InstrKind::Conversion { operand, .. } => {
                out.push(operand);
            }
            InstrKind::Call { arguments, .. } | InstrKind::CallVirtual { arguments, .. } => {
                out.extend(arguments);
            }
            InstrKind::Try { body, catch_body } => {
                out.extend(body);
                out.extend(catch_body);
            }
            InstrKind::StructGet { object, .. } => out.push(object),
            InstrKind::StructSet { object, value, .. } => {
                out.push(object);
                out.push(value);
            }
            InstrKind::ArrayNew { length, .. } => out.push(length),
            InstrKind::ArrayGet { array, index, .. } => {
                out.push(array);
                out.push(index);
            }
            InstrKind::ArraySet {
                array,
                index,
                value,
                ..
            } => {
                out.push(array);
                out.push(index);
                out.push(value);
            }
            InstrKind::Nop
            | InstrKind::Unreachable
            | InstrKind::I32Const(_)
            | InstrKind::I64Const(_)
            | InstrKind::F32Const(_)
            | InstrKind::F64Const(_)
            | InstrKind::RefNull
            | InstrKind::StringConst(_)
            | InstrKind::GetLocal(_)
            | InstrKind::GetGlobal { .. }
            | InstrKind::CaughtException
            | InstrKind::StructNew { .. } => {}
        }
        out
    }
}

/// Whether control never falls off the end of `body`.
pub fn is_terminating(body: &[Instr]) -> bool {
    body.last().is_some_and(Instr::is_terminating)
}

#[cfg(test)]
mod tests;
