//! Target instruction tree for the Kiln back-end.
//!
//! The target is a WebAssembly-style structured instruction set with GC
//! references: blocks and loops are the only branch targets, every
//! instruction is a tree node that yields at most one value, and heap
//! objects are typed structs and arrays.
//!
//! - [`Instr`] / [`InstrKind`] - the instruction tree
//! - [`Function`] / [`Module`] - lowered output
//! - [`infer`] - result type of an instruction
//! - [`eval`] - reference evaluator, used to check lowered code by behaviour

pub mod eval;
pub mod infer;
mod instr;
mod module;

pub use instr::{
    is_terminating, BlockId, FloatBinaryOp, FloatType, Instr, InstrKind, IntBinaryOp, IntType,
    IntUnaryOp, LocalId, ValType,
};
pub use module::{method_function_name, Function, Module};
