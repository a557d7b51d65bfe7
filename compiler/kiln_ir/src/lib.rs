//! Kiln IR - the data model shared by every back-end phase.
//!
//! Two representations live here:
//!
//! - the **statement/expression tree** ([`AstArena`], [`Expr`], [`Stmt`]) that the
//!   lowering visitor consumes, one arena per method body;
//! - the **graph IR** ([`graph::IrGraph`]) that the binary codec packs, an
//!   expression DAG whose side effects are ordered through explicit `previous`
//!   edges.
//!
//! # Design
//!
//! - **Arena handles, not pointers**: nodes are addressed by `ExprId`/`StmtId`/
//!   `NodeId` (`u32` newtypes). Identity comparisons are handle comparisons.
//! - **Closed sums**: every node kind is an enum variant; consumers `match`.
//! - **Shared strings**: class, method and field names are `Arc<str>`.

/// Compile-time assertion that a type has a specific size.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod arena;
mod decl;
mod expr;
pub mod graph;
mod ids;
mod location;
mod refs;
mod stmt;
mod types;
pub mod varint;

pub use arena::AstArena;
pub use decl::{
    AccessLevel, ClassNode, ElementModifiers, FieldNode, MethodBody, MethodNode, VariableNode,
};
pub use expr::{
    BinaryOperation, ConstantValue, Expr, ExprKind, InvocationKind, UnaryOperation,
};
pub use ids::{ExprId, StmtId};
pub use location::TextLocation;
pub use refs::{FieldReference, MethodDescriptor, MethodReference};
pub use stmt::{Stmt, StmtKind, SwitchClause};
pub use types::{ArrayType, OperationType, PrimitiveType, ValueType, ROOT_CLASS, THROWABLE_CLASS};

#[cfg(test)]
mod tests;
