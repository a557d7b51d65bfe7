//! Negation and normalization of `i32` boolean conditions.

use kiln_target::{Instr, InstrKind, IntBinaryOp, IntType};

/// Whether `instr` is a comparison, i.e. always yields `0` or `1`.
pub fn is_boolean(instr: &Instr) -> bool {
    match &instr.kind {
        InstrKind::IntBinary { op, .. } => op.is_comparison(),
        InstrKind::FloatBinary { op, .. } => op.is_comparison(),
        _ => false,
    }
}

fn is_i32_const(instr: &Instr, value: i32) -> bool {
    matches!(instr.kind, InstrKind::I32Const(v) if v == value)
}

fn eq_zero(operand: Instr) -> Instr {
    let location = operand.location.clone();
    Instr {
        location,
        ..Instr::int_binary(IntType::I32, IntBinaryOp::Eq, operand, Instr::i32_const(0))
    }
}

/// Logical negation of the condition `instr`.
///
/// Comparisons flip their operator. With `canonical_booleans`, `x ^ 1` negates
/// to `x`. Anything else becomes `x == 0`.
pub fn negate(instr: Instr, canonical_booleans: bool) -> Instr {
    let location = instr.location;
    match instr.kind {
        InstrKind::IntBinary {
            ty: IntType::I32,
            op: IntBinaryOp::Xor,
            first,
            second,
        } if canonical_booleans && is_i32_const(&second, 1) => *first,
        InstrKind::IntBinary {
            ty: IntType::I32,
            op: IntBinaryOp::Xor,
            first,
            second,
        } if canonical_booleans && is_i32_const(&first, 1) => *second,
        InstrKind::IntBinary {
            ty,
            op,
            first,
            second,
        } => match op.negated() {
            Some(op) => Instr {
                kind: InstrKind::IntBinary {
                    ty,
                    op,
                    first,
                    second,
                },
                location,
            },
            None => eq_zero(Instr {
                kind: InstrKind::IntBinary {
                    ty,
                    op,
                    first,
                    second,
                },
                location,
            }),
        },
        InstrKind::FloatBinary {
            ty,
            op,
            first,
            second,
        } => match op.negated() {
            Some(op) => Instr {
                kind: InstrKind::FloatBinary {
                    ty,
                    op,
                    first,
                    second,
                },
                location,
            },
            None => eq_zero(Instr {
                kind: InstrKind::FloatBinary {
                    ty,
                    op,
                    first,
                    second,
                },
                location,
            }),
        },
        kind => eq_zero(Instr { kind, location }),
    }
}

/// Normalize a condition: `(cmp == 0)` becomes the negated comparison and
/// `(cmp != 0)` becomes `cmp`, where `cmp` is a comparison. The result is a
/// fixed point of `for_condition`.
pub fn for_condition(instr: Instr) -> Instr {
    let (op, first, second) = match instr.kind {
        InstrKind::IntBinary {
            ty: IntType::I32,
            op: op @ (IntBinaryOp::Eq | IntBinaryOp::Ne),
            first,
            second,
        } => (op, first, second),
        kind => {
            return Instr {
                kind,
                location: instr.location,
            }
        }
    };
    let comparison = if is_i32_const(&second, 0) && is_boolean(&first) {
        *first
    } else if is_i32_const(&first, 0) && is_boolean(&second) {
        *second
    } else {
        return Instr {
            kind: InstrKind::IntBinary {
                ty: IntType::I32,
                op,
                first,
                second,
            },
            location: instr.location,
        };
    };
    if op == IntBinaryOp::Eq {
        for_condition(negate(comparison, false))
    } else {
        for_condition(comparison)
    }
}
