//! Binary codec for the graph IR.
//!
//! [`encode`] packs the DAG reachable from a root into a stack-machine byte
//! stream plus side tables ([`PackedTree`]); [`decode`] rebuilds an equivalent
//! graph in one forward pass.
//!
//! # Wire model
//!
//! - Each opcode pushes one value. Ordered nodes (effects and scopes) consume
//!   their `previous` operand, emitted before their inputs.
//! - A node reachable along several paths is emitted once; later uses are
//!   back-references counted in emitted instructions.
//! - A scope's body sits between an enter marker, which pushes nothing, and
//!   the scope's own opcode. Scope references name their scope by a zig-zag
//!   level distance: the current nesting depth of that scope kind minus the
//!   level the scope was entered at. A reference from inside a body names a
//!   scope the decoder has not built yet; the decoder reserves a placeholder
//!   at that level and fills it when the scope closes.
//! - Re-encoding a decoded tree reproduces the original bytes.

mod decode;
mod encode;
pub mod opcodes;
mod packed;

use kiln_ir::graph::{NodeId, ScopeKind};
use kiln_ir::varint::VarintError;
use thiserror::Error;

pub use decode::decode;
pub use encode::encode;
pub use packed::PackedTree;

/// The graph cannot be expressed in the wire format.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("node {0:?} is reachable from itself")]
    Cycle(NodeId),
    #[error("node {0:?} has an effect edge that does not match its kind")]
    EffectEdge(NodeId),
    #[error("node {node:?} refers to a scope that is never emitted")]
    DetachedScope { node: NodeId },
    #[error("node {node:?} refers to a scope that is not visible at its nesting level")]
    ScopeOutOfReach { node: NodeId },
    #[error("node {node:?} passes {found} operands where {expected} are declared")]
    Arity {
        node: NodeId,
        expected: usize,
        found: usize,
    },
}

/// The byte stream is malformed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Varint(#[from] VarintError),
    #[error("unknown opcode {opcode:#04x} at byte {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
    #[error("operand stack underflow at byte {offset}")]
    StackUnderflow { offset: usize },
    #[error("{table} index {index} out of range (table has {len} entries)")]
    IndexOutOfRange {
        table: &'static str,
        index: u64,
        len: usize,
    },
    #[error("back-reference distance {distance} at byte {offset} points before the stream")]
    BackRefOutOfRange { distance: u64, offset: usize },
    #[error("scope distance {distance} at byte {offset} names a level no scope was entered at")]
    ScopeOutOfRange { distance: i64, offset: usize },
    #[error("scope closes at byte {offset} without being entered")]
    UnopenedScope { offset: usize },
    #[error("a {0:?} scope is entered but never closed")]
    UnresolvedScope(ScopeKind),
    #[error("payload at byte {offset} does not fit its field")]
    ValueTooLarge { offset: usize },
    #[error("invalid reference type tag {tag} at byte {offset}")]
    ReferenceTag { tag: u64, offset: usize },
    #[error("stream leaves {0} values on the stack instead of one")]
    UnbalancedStack(usize),
}

/// Dense index of a scope kind, for per-kind counters.
pub(crate) const fn scope_slot(kind: ScopeKind) -> usize {
    match kind {
        ScopeKind::Block => 0,
        ScopeKind::Loop => 1,
        ScopeKind::TryCatch => 2,
    }
}

#[cfg(test)]
mod tests;
