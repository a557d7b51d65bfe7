//! Result type inference for target instructions.

use kiln_ir::ArrayType;

use crate::{Instr, InstrKind, ValType};

/// Value type an instruction leaves behind, or `None` for statements.
///
/// `locals` resolves the type of `GetLocal`.
pub fn result_type(instr: &Instr, locals: &[ValType]) -> Option<ValType> {
    match &instr.kind {
        InstrKind::Nop
        | InstrKind::Break { .. }
        | InstrKind::Switch { .. }
        | InstrKind::Return(_)
        | InstrKind::Drop(_)
        | InstrKind::Unreachable
        | InstrKind::SetLocal { .. }
        | InstrKind::SetGlobal { .. }
        | InstrKind::Try { .. }
        | InstrKind::Throw(_)
        | InstrKind::StructSet { .. }
        | InstrKind::ArraySet { .. } => None,
        InstrKind::Branch { result, .. } => result.as_deref().and_then(|r| result_type(r, locals)),
        InstrKind::Block { ty, .. } | InstrKind::Conditional { ty, .. } => *ty,
        InstrKind::I32Const(_) => Some(ValType::I32),
        InstrKind::I64Const(_) => Some(ValType::I64),
        InstrKind::F32Const(_) => Some(ValType::F32),
        InstrKind::F64Const(_) => Some(ValType::F64),
        InstrKind::RefNull
        | InstrKind::StringConst(_)
        | InstrKind::CaughtException
        | InstrKind::StructNew { .. }
        | InstrKind::ArrayNew { .. } => Some(ValType::Ref),
        InstrKind::IntBinary { ty, op, .. } => Some(if op.is_comparison() {
            ValType::I32
        } else {
            ty.val_type()
        }),
        InstrKind::FloatBinary { ty, op, .. } => Some(if op.is_comparison() {
            ValType::I32
        } else {
            ty.val_type()
        }),
        InstrKind::IntUnary { .. }
        | InstrKind::ArrayLength(_)
        | InstrKind::RefIsNull(_)
        | InstrKind::RefEq(..)
        | InstrKind::RefTest { .. } => Some(ValType::I32),
        InstrKind::Conversion { to, .. } => Some(*to),
        InstrKind::GetLocal(local) => locals.get(local.index()).copied(),
        InstrKind::GetGlobal { ty, .. } | InstrKind::StructGet { ty, .. } => Some(*ty),
        InstrKind::Call { result, .. } | InstrKind::CallVirtual { result, .. } => *result,
        InstrKind::ArrayGet { element, .. } => Some(element_type(*element)),
    }
}

/// Value type of an array element as read onto the stack.
pub const fn element_type(element: ArrayType) -> ValType {
    match element {
        ArrayType::Byte | ArrayType::Short | ArrayType::Char | ArrayType::Int => ValType::I32,
        ArrayType::Long => ValType::I64,
        ArrayType::Float => ValType::F32,
        ArrayType::Double => ValType::F64,
        ArrayType::Object => ValType::Ref,
    }
}

#[cfg(test)]
mod tests;
