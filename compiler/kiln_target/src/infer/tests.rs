use pretty_assertions::assert_eq;

use super::*;
use crate::{BlockId, FloatBinaryOp, FloatType, IntBinaryOp, IntType, LocalId};

#[test]
fn comparisons_yield_i32() {
    let cmp = Instr::int_binary(
        IntType::I64,
        IntBinaryOp::LtS,
        Instr::new(InstrKind::I64Const(1)),
        Instr::new(InstrKind::I64Const(2)),
    );
    assert_eq!(result_type(&cmp, &[]), Some(ValType::I32));

    let add = Instr::new(InstrKind::FloatBinary {
        ty: FloatType::F64,
        op: FloatBinaryOp::Add,
        first: Box::new(Instr::new(InstrKind::F64Const(0))),
        second: Box::new(Instr::new(InstrKind::F64Const(0))),
    });
    assert_eq!(result_type(&add, &[]), Some(ValType::F64));
}

#[test]
fn locals_resolve_through_table() {
    let locals = [ValType::I32, ValType::Ref];
    assert_eq!(
        result_type(&Instr::get_local(LocalId::new(1)), &locals),
        Some(ValType::Ref)
    );
}

#[test]
fn branch_with_result_yields_result_type() {
    let branch = Instr::branch(
        BlockId::new(0),
        Instr::i32_const(1),
        Some(Instr::new(InstrKind::I64Const(3))),
    );
    assert_eq!(result_type(&branch, &[]), Some(ValType::I64));
    let plain = Instr::branch(BlockId::new(0), Instr::i32_const(1), None);
    assert_eq!(result_type(&plain, &[]), None);
}

#[test]
fn byte_arrays_read_as_i32() {
    assert_eq!(element_type(ArrayType::Byte), ValType::I32);
    assert_eq!(element_type(ArrayType::Object), ValType::Ref);
}
