//! Expression nodes of the statement/expression tree.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::{ArrayType, ExprId, FieldReference, MethodReference, OperationType, TextLocation, ValueType};

/// Binary operators.
///
/// `And`/`Or` are short-circuit logical operators over booleans. `Compare` is
/// the three-way comparison yielding `-1`, `0` or `1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equals,
    NotEquals,
    Less,
    LessOrEquals,
    Greater,
    GreaterOrEquals,
    Compare,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    And,
    Or,
}

/// Unary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOperation {
    Not,
    Negate,
    Length,
    IntToByte,
    IntToShort,
    IntToChar,
    NullCheck,
}

/// Dispatch kind of an invocation.
///
/// For `Special` and `Virtual` the receiver is argument 0. `Constructor`
/// arguments exclude the receiver: the instance is allocated by the call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InvocationKind {
    Static,
    Special,
    Virtual,
    Constructor,
}

/// A literal value. Floating values are stored as raw bits so that constants
/// compare and hash exactly.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstantValue {
    Null,
    Int(i32),
    Long(i64),
    Float(u32),
    Double(u64),
    String(Arc<str>),
    Class(ValueType),
}

impl ConstantValue {
    pub fn float(value: f32) -> Self {
        ConstantValue::Float(value.to_bits())
    }

    pub fn double(value: f64) -> Self {
        ConstantValue::Double(value.to_bits())
    }
}

/// Expression node.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Option<TextLocation>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
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

/// Expression variants.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// `ty` is `None` for reference equality and for `And`/`Or`.
    Binary {
        op: BinaryOperation,
        ty: Option<OperationType>,
        first: ExprId,
        second: ExprId,
    },
    /// `ty` is meaningful for `Negate` only.
    Unary {
        op: UnaryOperation,
        ty: Option<OperationType>,
        operand: ExprId,
    },
    Conditional {
        condition: ExprId,
        consequent: ExprId,
        alternative: ExprId,
    },
    Constant(ConstantValue),
    Variable {
        index: u32,
    },
    Subscript {
        array: ExprId,
        index: ExprId,
        ty: ArrayType,
    },
    UnwrapArray {
        array: ExprId,
        ty: ArrayType,
    },
    Invocation {
        kind: InvocationKind,
        method: MethodReference,
        arguments: Vec<ExprId>,
    },
    /// Field read; `qualified` is `None` for static fields.
    Qualification {
        qualified: Option<ExprId>,
        field: FieldReference,
        ty: ValueType,
    },
    New {
        class: Arc<str>,
    },
    NewArray {
        element: ValueType,
        length: ExprId,
    },
    /// `element` is the innermost element type; one array level per dimension.
    NewMultiArray {
        element: ValueType,
        dimensions: Vec<ExprId>,
    },
    ArrayFromData {
        element: ValueType,
        data: Vec<ExprId>,
    },
    InstanceOf {
        value: ExprId,
        ty: ValueType,
    },
    Cast {
        value: ExprId,
        target: ValueType,
    },
    PrimitiveCast {
        value: ExprId,
        source: OperationType,
        target: OperationType,
    },
    /// Checks `index` against zero (`lower`) and/or against the length of
    /// `array`, yielding the index.
    BoundCheck {
        index: ExprId,
        array: Option<ExprId>,
        lower: bool,
    },
}

impl ExprKind {
    /// Child expressions in evaluation order.
    pub fn children(&self) -> SmallVec<[ExprId; 4]> {
        let mut out = SmallVec::new();
        match self {
            ExprKind::Binary { first, second, .. } => {
                out.push(*first);
                out.push(*second);
            }
            ExprKind::Unary { operand, .. } => out.push(*operand),
            ExprKind::Conditional {
                condition,
                consequent,
                alternative,
            } => out.extend([*condition, *consequent, *alternative]),
            ExprKind::Constant(_) | ExprKind::Variable { .. } | ExprKind::New { .. } => {}
            ExprKind::Subscript { array, index, .. } => out.extend([*array, *index]),
            ExprKind::UnwrapArray { array, .. } => out.push(*array),
            ExprKind::Invocation { arguments, .. } => out.extend(arguments.iter().copied()),
            ExprKind::Qualification { qualified, .. } => out.extend(*qualified),
            ExprKind::NewArray { length, .. } => out.push(*length),
            ExprKind::NewMultiArray { dimensions, .. } => out.extend(dimensions.iter().copied()),
            ExprKind::ArrayFromData { data, .. } => out.extend(data.iter().copied()),
            ExprKind::InstanceOf { value, .. }
            | ExprKind::Cast { value, .. }
            | ExprKind::PrimitiveCast { value, .. } => out.push(*value),
            ExprKind::BoundCheck { index, array, .. } => {
                out.push(*index);
                out.extend(*array);
            }
        }
        out
    }

    /// Rebuild this node with every child handle passed through `f`, in the
    /// same order as [`children`](Self::children).
    #[must_use]
    pub fn map_children(self, f: &mut impl FnMut(ExprId) -> ExprId) -> ExprKind {
        match self {
            ExprKind::Binary {
                op,
                ty,
                first,
                second,
            } => {
                let first = f(first);
                ExprKind::Binary {
                    op,
                    ty,
                    first,
                    second: f(second),
                }
            }
            ExprKind::Unary { op, ty, operand } => ExprKind::Unary {
                op,
                ty,
                operand: f(operand),
            },
            ExprKind::Conditional {
                condition,
                consequent,
                alternative,
            } => {
                let condition = f(condition);
                let consequent = f(consequent);
                ExprKind::Conditional {
                    condition,
                    consequent,
                    alternative: f(alternative),
                }
            }
            leaf @ (ExprKind::Constant(_) | ExprKind::Variable { .. } | ExprKind::New { .. }) => {
                leaf
            }
            ExprKind::Subscript { array, index, ty } => {
                let array = f(array);
                ExprKind::Subscript {
                    array,
                    index: f(index),
                    ty,
                }
            }
            ExprKind::UnwrapArray { array, ty } => ExprKind::UnwrapArray {
                array: f(array),
                ty,
            },
            ExprKind::Invocation {
                kind,
                method,
                arguments,
            } => ExprKind::Invocation {
                kind,
                method,
                arguments: arguments.into_iter().map(&mut *f).collect(),
            },
            ExprKind::Qualification {
                qualified,
                field,
                ty,
            } => ExprKind::Qualification {
                qualified: qualified.map(&mut *f),
                field,
                ty,
            },
            ExprKind::NewArray { element, length } => ExprKind::NewArray {
                element,
                length: f(length),
            },
            ExprKind::NewMultiArray {
                element,
                dimensions,
            } => ExprKind::NewMultiArray {
                element,
                dimensions: dimensions.into_iter().map(&mut *f).collect(),
            },
            ExprKind::ArrayFromData { element, data } => ExprKind::ArrayFromData {
                element,
                data: data.into_iter().map(&mut *f).collect(),
            },
            ExprKind::InstanceOf { value, ty } => ExprKind::InstanceOf { value: f(value), ty },
            ExprKind::Cast { value, target } => ExprKind::Cast {
                value: f(value),
                target,
            },
            ExprKind::PrimitiveCast {
                value,
                source,
                target,
            } => ExprKind::PrimitiveCast {
                value: f(value),
                source,
                target,
            },
            ExprKind::BoundCheck {
                index,
                array,
                lower,
            } => {
                let index = f(index);
                ExprKind::BoundCheck {
                    index,
                    array: array.map(&mut *f),
                    lower,
                }
            }
        }
    }
}
