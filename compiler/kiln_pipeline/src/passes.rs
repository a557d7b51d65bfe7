//! Built-in passes.
//!
//! Both passes sweep the whole arena once per call and leave iteration to the
//! pipeline: folding a leaf makes its parent foldable in the next round.

use kiln_ir::{
    AstArena, BinaryOperation, ConstantValue, ExprId, ExprKind, MethodBody, OperationType,
    StmtId, StmtKind, UnaryOperation,
};

use crate::pipeline::{Pass, PassContext};

/// Evaluates integer arithmetic, bitwise and comparison expressions whose
/// operands are constants.
///
/// Division and remainder by zero are kept so the runtime still throws.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConstantFolding;

/// Replaces conditionals on constant conditions with the taken branch and
/// drops loops whose condition is constant false.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeadBranchElimination;

impl Pass for ConstantFolding {
    fn name(&self) -> &'static str {
        "constant-folding"
    }

    fn run(&self, body: &mut MethodBody, _context: &PassContext<'_>) -> bool {
        let Some(arena) = body.arena_mut() else {
            return false;
        };
        let mut changed = false;
        for id in expr_ids(arena) {
            if let Some(folded) = fold(arena, &arena.expr(id).kind) {
                arena.expr_mut(id).kind = ExprKind::Constant(folded);
                changed = true;
            }
        }
        changed
    }
}

impl Pass for DeadBranchElimination {
    fn name(&self) -> &'static str {
        "dead-branch-elimination"
    }

    fn run(&self, body: &mut MethodBody, _context: &PassContext<'_>) -> bool {
        let Some(arena) = body.arena_mut() else {
            return false;
        };
        let mut changed = false;
        for id in stmt_ids(arena) {
            let replacement = match &arena.stmt(id).kind {
                StmtKind::Conditional {
                    condition,
                    consequent,
                    alternative,
                } => int_constant(arena, *condition).map(|value| {
                    if value == 0 {
                        alternative.clone()
                    } else {
                        consequent.clone()
                    }
                }),
                StmtKind::While {
                    condition: Some(condition),
                    ..
                } if int_constant(arena, *condition) == Some(0) => Some(Vec::new()),
                _ => None,
            };
            if let Some(statements) = replacement {
                arena.stmt_mut(id).kind = StmtKind::Sequence(statements);
                changed = true;
            }
        }
        changed
    }
}

fn expr_ids(arena: &AstArena) -> impl Iterator<Item = ExprId> {
    (0..u32::try_from(arena.expr_count()).unwrap_or(u32::MAX)).map(ExprId::new)
}

fn stmt_ids(arena: &AstArena) -> impl Iterator<Item = StmtId> {
    (0..u32::try_from(arena.stmt_count()).unwrap_or(u32::MAX)).map(StmtId::new)
}

fn constant(arena: &AstArena, id: ExprId) -> Option<&ConstantValue> {
    match &arena.expr(id).kind {
        ExprKind::Constant(value) => Some(value),
        _ => None,
    }
}

fn int_constant(arena: &AstArena, id: ExprId) -> Option<i32> {
    match constant(arena, id)? {
        ConstantValue::Int(value) => Some(*value),
        _ => None,
    }
}

fn fold(arena: &AstArena, kind: &ExprKind) -> Option<ConstantValue> {
    match kind {
        ExprKind::Binary {
            op,
            ty: Some(OperationType::Int),
            first,
            second,
        } => match (constant(arena, *first)?, constant(arena, *second)?) {
            (ConstantValue::Int(a), ConstantValue::Int(b)) => fold_int(*op, *a, *b),
            _ => None,
        },
        ExprKind::Binary {
            op,
            ty: Some(OperationType::Long),
            first,
            second,
        } => match (constant(arena, *first)?, constant(arena, *second)?) {
            (ConstantValue::Long(a), ConstantValue::Long(b)) => fold_long(*op, *a, *b),
            // Shift distances are ints even for long shifts.
            (ConstantValue::Long(a), ConstantValue::Int(b)) => fold_long_shift(*op, *a, *b),
            _ => None,
        },
        ExprKind::Unary {
            op,
            operand,
            ..
        } => match (op, constant(arena, *operand)?) {
            (UnaryOperation::Negate, ConstantValue::Int(a)) => Some(ConstantValue::Int(a.wrapping_neg())),
            (UnaryOperation::Negate, ConstantValue::Long(a)) => {
                Some(ConstantValue::Long(a.wrapping_neg()))
            }
            (UnaryOperation::Not, ConstantValue::Int(a)) => Some(bool_constant(*a == 0)),
            _ => None,
        },
        _ => None,
    }
}

fn bool_constant(value: bool) -> ConstantValue {
    ConstantValue::Int(i32::from(value))
}

fn compare<T: Ord>(a: T, b: T) -> i32 {
    match a.cmp(&b) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    reason = "unsigned shift reinterprets the bits"
)]
fn fold_int(op: BinaryOperation, a: i32, b: i32) -> Option<ConstantValue> {
    let shift = (b & 31) as u32;
    let value = match op {
        BinaryOperation::Add => a.wrapping_add(b),
        BinaryOperation::Subtract => a.wrapping_sub(b),
        BinaryOperation::Multiply => a.wrapping_mul(b),
        BinaryOperation::Divide if b != 0 => a.wrapping_div(b),
        BinaryOperation::Modulo if b != 0 => a.wrapping_rem(b),
        BinaryOperation::BitwiseAnd => a & b,
        BinaryOperation::BitwiseOr => a | b,
        BinaryOperation::BitwiseXor => a ^ b,
        BinaryOperation::LeftShift => a.wrapping_shl(shift),
        BinaryOperation::RightShift => a.wrapping_shr(shift),
        BinaryOperation::UnsignedRightShift => ((a as u32) >> shift) as i32,
        BinaryOperation::Compare => compare(a, b),
        BinaryOperation::Equals => i32::from(a == b),
        BinaryOperation::NotEquals => i32::from(a != b),
        BinaryOperation::Less => i32::from(a < b),
        BinaryOperation::LessOrEquals => i32::from(a <= b),
        BinaryOperation::Greater => i32::from(a > b),
        BinaryOperation::GreaterOrEquals => i32::from(a >= b),
        BinaryOperation::And => i32::from(a != 0 && b != 0),
        BinaryOperation::Or => i32::from(a != 0 || b != 0),
        BinaryOperation::Divide | BinaryOperation::Modulo => return None,
    };
    Some(ConstantValue::Int(value))
}

fn fold_long(op: BinaryOperation, a: i64, b: i64) -> Option<ConstantValue> {
    let value = match op {
        BinaryOperation::Add => a.wrapping_add(b),
        BinaryOperation::Subtract => a.wrapping_sub(b),
        BinaryOperation::Multiply => a.wrapping_mul(b),
        BinaryOperation::Divide if b != 0 => a.wrapping_div(b),
        BinaryOperation::Modulo if b != 0 => a.wrapping_rem(b),
        BinaryOperation::BitwiseAnd => a & b,
        BinaryOperation::BitwiseOr => a | b,
        BinaryOperation::BitwiseXor => a ^ b,
        BinaryOperation::Compare => return Some(ConstantValue::Int(compare(a, b))),
        BinaryOperation::Equals => return Some(bool_constant(a == b)),
        BinaryOperation::NotEquals => return Some(bool_constant(a != b)),
        BinaryOperation::Less => return Some(bool_constant(a < b)),
        BinaryOperation::LessOrEquals => return Some(bool_constant(a <= b)),
        BinaryOperation::Greater => return Some(bool_constant(a > b)),
        BinaryOperation::GreaterOrEquals => return Some(bool_constant(a >= b)),
        _ => return None,
    };
    Some(ConstantValue::Long(value))
}

#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    reason = "unsigned shift reinterprets the bits"
)]
fn fold_long_shift(op: BinaryOperation, a: i64, b: i32) -> Option<ConstantValue> {
    let shift = (b & 63) as u32;
    let value = match op {
        BinaryOperation::LeftShift => a.wrapping_shl(shift),
        BinaryOperation::RightShift => a.wrapping_shr(shift),
        BinaryOperation::UnsignedRightShift => ((a as u64) >> shift) as i64,
        _ => return None,
    };
    Some(ConstantValue::Long(value))
}
