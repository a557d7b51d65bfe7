use kiln_ir::graph::{
    IrClass, IrExprKind, IrGraph, IrReferenceType, NodeId, PrimitiveArrayKind, ScopeKind,
};
use kiln_ir::varint;
use smallvec::SmallVec;

use crate::opcodes::{Opcode, ScopeRef, OPCODES, REFERENCE_TAG_OBJECT};
use crate::packed::PackedTree;
use crate::{scope_slot, DecodeError};

/// Deepest array nesting a reference type may declare.
const MAX_ARRAY_DEGREE: u32 = 255;

/// Rebuild the graph packed by [`encode`](crate::encode). Returns the graph
/// and its root.
#[tracing::instrument(level = "debug", skip_all, fields(bytes = packed.data.len()))]
pub fn decode(packed: &PackedTree) -> Result<(IrGraph, NodeId), DecodeError> {
    let mut decoder = Decoder::new(packed);
    while decoder.pos < packed.data.len() {
        decoder.step()?;
    }
    let (graph, root) = decoder.finish()?;
    tracing::debug!(nodes = graph.len(), "graph decoded");
    Ok((graph, root))
}

// ── Scope levels ───────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug)]
enum Slot {
    /// Entered and not referenced yet.
    Open,
    /// Referenced before its closing opcode; reserved in the graph.
    Pending(NodeId),
    Closed(NodeId),
}

/// Scopes of one kind, indexed by nesting level. A closed scope keeps its
/// slot until another scope is entered at the same level.
#[derive(Debug, Default)]
struct ScopeLevels {
    slots: Vec<Slot>,
    depth: usize,
}

impl ScopeLevels {
    fn enter(&mut self) {
        if self.depth < self.slots.len() {
            self.slots[self.depth] = Slot::Open;
        } else {
            self.slots.push(Slot::Open);
        }
        self.depth += 1;
    }

    fn resolve(
        &mut self,
        graph: &mut IrGraph,
        distance: i64,
        offset: usize,
    ) -> Result<NodeId, DecodeError> {
        let index = i64::try_from(self.depth)
            .ok()
            .and_then(|depth| depth.checked_sub(distance))
            .and_then(|level| usize::try_from(level).ok())
            .and_then(|level| level.checked_sub(1))
            .filter(|&index| index < self.slots.len())
            .ok_or(DecodeError::ScopeOutOfRange { distance, offset })?;
        match self.slots[index] {
            Slot::Pending(id) | Slot::Closed(id) => Ok(id),
            Slot::Open => {
                let id = graph.reserve();
                self.slots[index] = Slot::Pending(id);
                Ok(id)
            }
        }
    }

    fn close(
        &mut self,
        graph: &mut IrGraph,
        kind: IrExprKind,
        previous: NodeId,
        offset: usize,
    ) -> Result<NodeId, DecodeError> {
        let index = self
            .depth
            .checked_sub(1)
            .ok_or(DecodeError::UnopenedScope { offset })?;
        self.depth = index;
        let id = match self.slots[index] {
            Slot::Pending(id) => {
                graph.define(id, kind, Some(previous));
                id
            }
            Slot::Open | Slot::Closed(_) => graph.add_after(previous, kind),
        };
        self.slots[index] = Slot::Closed(id);
        Ok(id)
    }
}

// ── Decoder ────────────────────────────────────────────────────────────

struct Decoder<'p> {
    packed: &'p PackedTree,
    pos: usize,
    /// Start of the opcode being decoded.
    offset: usize,
    graph: IrGraph,
    stack: Vec<NodeId>,
    /// Result of every decoded instruction, for back-references.
    values: Vec<NodeId>,
    scopes: [ScopeLevels; 3],
}

impl<'p> Decoder<'p> {
    fn new(packed: &'p PackedTree) -> Self {
        Self {
            packed,
            pos: 0,
            offset: 0,
            graph: IrGraph::new(),
            stack: Vec::new(),
            values: Vec::new(),
            scopes: Default::default(),
        }
    }

    fn finish(self) -> Result<(IrGraph, NodeId), DecodeError> {
        for kind in [ScopeKind::Block, ScopeKind::Loop, ScopeKind::TryCatch] {
            if self.scopes[scope_slot(kind)].depth > 0 {
                return Err(DecodeError::UnresolvedScope(kind));
            }
        }
        match self.stack.as_slice() {
            &[root] => Ok((self.graph, root)),
            rest => Err(DecodeError::UnbalancedStack(rest.len())),
        }
    }

    fn step(&mut self) -> Result<(), DecodeError> {
        self.offset = self.pos;
        let byte = self.packed.data[self.pos];
        self.pos += 1;
        let Some(opcode) = OPCODES[usize::from(byte)] else {
            return Err(DecodeError::UnknownOpcode {
                opcode: byte,
                offset: self.offset,
            });
        };
        let packed = self.packed;

        match opcode {
            Opcode::Start => self.push(IrExprKind::Start),
            Opcode::IntConst(Some(value)) => self.push(IrExprKind::IntConst(value)),
            Opcode::IntConst(None) => {
                let value = self.signed()?;
                let value = i32::try_from(value).map_err(|_| self.too_large())?;
                self.push(IrExprKind::IntConst(value))
            }
            Opcode::LongConst(Some(value)) => self.push(IrExprKind::LongConst(value)),
            Opcode::LongConst(None) => {
                let value = self.signed()?;
                self.push(IrExprKind::LongConst(value))
            }
            Opcode::FloatConst { zero: true } => self.push(IrExprKind::FloatConst(0)),
            Opcode::FloatConst { zero: false } => {
                let bits = self.u32()?;
                self.push(IrExprKind::FloatConst(bits.reverse_bits()))
            }
            Opcode::DoubleConst { zero: true } => self.push(IrExprKind::DoubleConst(0)),
            Opcode::DoubleConst { zero: false } => {
                let bits = self.unsigned()?;
                self.push(IrExprKind::DoubleConst(bits.reverse_bits()))
            }
            Opcode::StringConst => {
                let value = self.entry(&packed.strings, "string")?.clone();
                self.push(IrExprKind::StringConst(value))
            }
            Opcode::Operation(op) => {
                let operands = self.pop_many(op.arity())?;
                self.push(IrExprKind::Operation {
                    op,
                    operands: SmallVec::from_vec(operands),
                })
            }
            Opcode::BackRef(distance) => {
                let distance = match distance {
                    Some(distance) => u64::from(distance),
                    None => self.unsigned()?,
                };
                self.back_ref(distance)
            }
            Opcode::Parameter(index) => {
                let index = self.short_or_read(index)?;
                self.push(IrExprKind::Parameter(index))
            }
            Opcode::Tuple(count) => {
                let count = self.short_or_read(count)?;
                let items = self.pop_many(self.count(count)?)?;
                self.push(IrExprKind::Tuple(items))
            }
            Opcode::TupleComponent(component) => {
                let component = self.short_or_read(component)?;
                let tuple = self.pop()?;
                self.push(IrExprKind::TupleComponent { tuple, component })
            }
            Opcode::Conditional => {
                let else_value = self.pop()?;
                let then_value = self.pop()?;
                let condition = self.pop()?;
                self.push(IrExprKind::Conditional {
                    condition,
                    then_value,
                    else_value,
                })
            }
            Opcode::Enter(kind) => {
                self.scopes[scope_slot(kind)].enter();
                Ok(())
            }
            Opcode::Scope(kind) => self.close_scope(kind),
            Opcode::ScopeRef { reference, near } => self.scope_ref(reference, near),
            Opcode::Throw => {
                let value = self.pop()?;
                self.push(IrExprKind::Throw { value })
            }
            Opcode::CallFunction => {
                let function = self.entry(&packed.functions, "function")?.clone();
                let arguments = self.pop_many(function.parameters.len())?;
                self.push(IrExprKind::CallFunction {
                    function,
                    arguments,
                })
            }
            Opcode::CallMethod => {
                let method = self.entry(&packed.methods, "method")?.clone();
                let arguments = self.pop_many(method.arity())?;
                self.push(IrExprKind::CallMethod { method, arguments })
            }
            Opcode::GetVar => {
                let index = self.u32()?;
                self.push(IrExprKind::GetVar(index))
            }
            Opcode::SetVar => {
                let index = self.u32()?;
                let value = self.pop()?;
                self.push(IrExprKind::SetVar { index, value })
            }
            Opcode::GetGlobal => {
                let global = self.entry(&packed.globals, "global")?.clone();
                self.push(IrExprKind::GetGlobal(global))
            }
            Opcode::SetGlobal => {
                let global = self.entry(&packed.globals, "global")?.clone();
                let value = self.pop()?;
                self.push(IrExprKind::SetGlobal { global, value })
            }
            Opcode::GetField => {
                let field = self.entry(&packed.fields, "field")?.clone();
                let object = self.pop()?;
                self.push(IrExprKind::GetField { field, object })
            }
            Opcode::SetField => {
                let field = self.entry(&packed.fields, "field")?.clone();
                let value = self.pop()?;
                let object = self.pop()?;
                self.push(IrExprKind::SetField {
                    field,
                    object,
                    value,
                })
            }
            Opcode::Cast => {
                let target = self.reference_type()?;
                let value = self.pop()?;
                self.push(IrExprKind::Cast { value, target })
            }
            Opcode::InstanceOf => {
                let checked = self.reference_type()?;
                let value = self.pop()?;
                self.push(IrExprKind::InstanceOf { value, checked })
            }
            Opcode::New => {
                let class = self.class()?;
                self.push(IrExprKind::New(class))
            }
        }
    }

    // ── Node construction ──

    /// Add a node, popping its `previous` operand if it is ordered.
    fn push(&mut self, kind: IrExprKind) -> Result<(), DecodeError> {
        let id = if kind.needs_ordering() {
            let previous = self.pop()?;
            self.graph.add_after(previous, kind)
        } else {
            self.graph.add(kind)
        };
        self.stack.push(id);
        self.values.push(id);
        Ok(())
    }

    fn back_ref(&mut self, distance: u64) -> Result<(), DecodeError> {
        let index = usize::try_from(distance)
            .ok()
            .filter(|&distance| distance > 0)
            .and_then(|distance| self.values.len().checked_sub(distance))
            .ok_or(DecodeError::BackRefOutOfRange {
                distance,
                offset: self.offset,
            })?;
        let id = self.values[index];
        self.stack.push(id);
        self.values.push(id);
        Ok(())
    }

    fn close_scope(&mut self, kind: ScopeKind) -> Result<(), DecodeError> {
        let node = match kind {
            ScopeKind::Block => IrExprKind::Block { body: self.pop()? },
            ScopeKind::Loop => IrExprKind::Loop { body: self.pop()? },
            ScopeKind::TryCatch => {
                let count = self.unsigned()?;
                let mut exception_types = Vec::new();
                for _ in 0..count {
                    exception_types.push(self.class()?);
                }
                let caught_values = self.u32()?;
                let handler = self.pop()?;
                let body = self.pop()?;
                IrExprKind::TryCatch {
                    body,
                    handler,
                    exception_types,
                    caught_values,
                }
            }
        };
        let previous = self.pop()?;
        let id = self.scopes[scope_slot(kind)].close(
            &mut self.graph,
            node,
            previous,
            self.offset,
        )?;
        self.stack.push(id);
        self.values.push(id);
        Ok(())
    }

    fn scope_ref(&mut self, reference: ScopeRef, near: bool) -> Result<(), DecodeError> {
        let distance = if near { 0 } else { self.signed()? };
        let target = self.scopes[scope_slot(reference.kind())].resolve(
            &mut self.graph,
            distance,
            self.offset,
        )?;
        let kind = match reference {
            ScopeRef::ExitBlock => IrExprKind::ExitBlock {
                block: target,
                value: self.pop()?,
            },
            ScopeRef::LoopHeader => IrExprKind::LoopHeader { looped: target },
            ScopeRef::LoopExit => IrExprKind::LoopExit {
                looped: target,
                value: self.pop()?,
            },
            ScopeRef::LoopContinue => IrExprKind::LoopContinue { looped: target },
            ScopeRef::TryCatchStart => IrExprKind::TryCatchStart { try_catch: target },
            ScopeRef::CaughtValue => IrExprKind::CaughtValue {
                try_catch: target,
                index: self.u32()?,
            },
            ScopeRef::SetCaughtValue => {
                let index = self.u32()?;
                IrExprKind::SetCaughtValue {
                    try_catch: target,
                    index,
                    value: self.pop()?,
                }
            }
            ScopeRef::CaughtException => IrExprKind::CaughtException { try_catch: target },
        };
        self.push(kind)
    }

    fn reference_type(&mut self) -> Result<IrReferenceType, DecodeError> {
        let word = self.unsigned()?;
        let tag = word & 0xF;
        let degree = u32::try_from(word >> 4)
            .ok()
            .filter(|&degree| degree <= MAX_ARRAY_DEGREE)
            .ok_or_else(|| self.too_large())?;
        let inner = if tag == u64::from(REFERENCE_TAG_OBJECT) {
            IrReferenceType::Object(self.class()?)
        } else {
            let kind = usize::try_from(tag)
                .ok()
                .and_then(|tag| PrimitiveArrayKind::ALL.get(tag))
                .ok_or(DecodeError::ReferenceTag {
                    tag,
                    offset: self.offset,
                })?;
            IrReferenceType::PrimitiveArray(*kind)
        };
        Ok(inner.with_degree(degree))
    }

    // ── Operand stack ──

    fn pop(&mut self) -> Result<NodeId, DecodeError> {
        self.stack.pop().ok_or(DecodeError::StackUnderflow {
            offset: self.offset,
        })
    }

    /// Pop `count` operands, returned in push order.
    fn pop_many(&mut self, count: usize) -> Result<Vec<NodeId>, DecodeError> {
        let at = self
            .stack
            .len()
            .checked_sub(count)
            .ok_or(DecodeError::StackUnderflow {
                offset: self.offset,
            })?;
        Ok(self.stack.split_off(at))
    }

    // ── Payloads ──

    fn unsigned(&mut self) -> Result<u64, DecodeError> {
        Ok(varint::read_unsigned(&self.packed.data, &mut self.pos)?)
    }

    fn signed(&mut self) -> Result<i64, DecodeError> {
        Ok(varint::read_signed(&self.packed.data, &mut self.pos)?)
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let value = self.unsigned()?;
        u32::try_from(value).map_err(|_| self.too_large())
    }

    fn short_or_read(&mut self, short: Option<u32>) -> Result<u32, DecodeError> {
        match short {
            Some(value) => Ok(value),
            None => self.u32(),
        }
    }

    fn count(&self, value: u32) -> Result<usize, DecodeError> {
        usize::try_from(value).map_err(|_| self.too_large())
    }

    fn entry<'t, T>(&mut self, table: &'t [T], name: &'static str) -> Result<&'t T, DecodeError> {
        let index = self.unsigned()?;
        usize::try_from(index)
            .ok()
            .and_then(|i| table.get(i))
            .ok_or(DecodeError::IndexOutOfRange {
                table: name,
                index,
                len: table.len(),
            })
    }

    fn class(&mut self) -> Result<IrClass, DecodeError> {
        let packed = self.packed;
        Ok(self.entry(&packed.classes, "class")?.clone())
    }

    fn too_large(&self) -> DecodeError {
        DecodeError::ValueTooLarge {
            offset: self.offset,
        }
    }
}
