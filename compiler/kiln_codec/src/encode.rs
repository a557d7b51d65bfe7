use std::sync::Arc;

use kiln_ir::graph::{
    IrClass, IrExprKind, IrField, IrFunction, IrGlobal, IrGraph, IrMethod, IrReferenceType,
    NodeId, ScopeKind,
};
use kiln_ir::varint;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::opcodes::{self, ScopeRef};
use crate::packed::{Interner, PackedTree};
use crate::{scope_slot, EncodeError};

/// Pack the graph reachable from `root`.
///
/// Runs in two phases: [`schedule`] fixes the instruction order and the
/// nesting level of every scope, then [`Writer`] emits bytes.
#[tracing::instrument(level = "debug", skip_all, fields(nodes = graph.len()))]
pub fn encode(graph: &IrGraph, root: NodeId) -> Result<PackedTree, EncodeError> {
    let schedule = schedule(graph, root)?;
    let mut writer = Writer::new(graph, &schedule.levels);
    for &step in &schedule.steps {
        writer.step(step)?;
    }
    let packed = writer.finish();
    tracing::debug!(
        bytes = packed.data.len(),
        steps = schedule.steps.len(),
        "graph encoded"
    );
    Ok(packed)
}

// ── Scheduling ─────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Step {
    /// Marker between a scope's `previous` and its body.
    Enter(NodeId, ScopeKind),
    Emit(NodeId),
    BackRef(NodeId),
}

enum Visit {
    Enter(NodeId),
    Open(NodeId, ScopeKind),
    Exit(NodeId),
}

struct Schedule {
    steps: Vec<Step>,
    /// Nesting level of each scope among scopes of its kind, from 1.
    levels: FxHashMap<NodeId, u32>,
}

/// Post-order walk: `previous` first, then inputs in push order, then the
/// node. A scope is open from after its `previous` until it is emitted.
/// Iterative, so long effect chains do not grow the native stack.
fn schedule(graph: &IrGraph, root: NodeId) -> Result<Schedule, EncodeError> {
    let mut steps = Vec::new();
    let mut levels = FxHashMap::default();
    let mut done: FxHashSet<NodeId> = FxHashSet::default();
    let mut open: FxHashSet<NodeId> = FxHashSet::default();
    let mut depth = [0u32; 3];
    let mut work = vec![Visit::Enter(root)];

    while let Some(visit) = work.pop() {
        match visit {
            Visit::Enter(id) => {
                if done.contains(&id) {
                    steps.push(Step::BackRef(id));
                    continue;
                }
                if !open.insert(id) {
                    return Err(EncodeError::Cycle(id));
                }
                let node = graph.node(id);
                if node.kind.needs_ordering() != node.previous.is_some() {
                    return Err(EncodeError::EffectEdge(id));
                }
                check_arity(id, &node.kind)?;
                work.push(Visit::Exit(id));
                work.extend(node.kind.inputs().iter().rev().map(|&input| Visit::Enter(input)));
                if let Some(kind) = node.kind.opens_scope() {
                    work.push(Visit::Open(id, kind));
                }
                if let Some(previous) = node.previous {
                    work.push(Visit::Enter(previous));
                }
            }
            Visit::Open(id, kind) => {
                let level = &mut depth[scope_slot(kind)];
                *level += 1;
                levels.insert(id, *level);
                steps.push(Step::Enter(id, kind));
            }
            Visit::Exit(id) => {
                open.remove(&id);
                done.insert(id);
                if let Some(kind) = graph.kind(id).opens_scope() {
                    depth[scope_slot(kind)] -= 1;
                }
                steps.push(Step::Emit(id));
            }
        }
    }
    Ok(Schedule { steps, levels })
}

/// The decoder pops exactly the declared operand count.
fn check_arity(node: NodeId, kind: &IrExprKind) -> Result<(), EncodeError> {
    let (expected, found) = match kind {
        IrExprKind::Operation { op, operands } => (op.arity(), operands.len()),
        IrExprKind::CallFunction {
            function,
            arguments,
        } => (function.parameters.len(), arguments.len()),
        IrExprKind::CallMethod { method, arguments } => (method.arity(), arguments.len()),
        _ => return Ok(()),
    };
    if expected == found {
        Ok(())
    } else {
        Err(EncodeError::Arity {
            node,
            expected,
            found,
        })
    }
}

// ── Writing ────────────────────────────────────────────────────────────

struct Writer<'a> {
    graph: &'a IrGraph,
    levels: &'a FxHashMap<NodeId, u32>,
    out: Vec<u8>,
    /// Instruction index at which each node was emitted.
    positions: FxHashMap<NodeId, usize>,
    instructions: usize,
    depth: [u32; 3],
    /// Last scope entered at each level, per kind. Entries outlive their
    /// scope until another one is entered at the same level.
    occupants: [Vec<NodeId>; 3],
    strings: Interner<Arc<str>>,
    functions: Interner<IrFunction>,
    methods: Interner<IrMethod>,
    fields: Interner<IrField>,
    classes: Interner<IrClass>,
    globals: Interner<IrGlobal>,
}

impl<'a> Writer<'a> {
    fn new(graph: &'a IrGraph, levels: &'a FxHashMap<NodeId, u32>) -> Self {
        Self {
            graph,
            levels,
            out: Vec::new(),
            positions: FxHashMap::default(),
            instructions: 0,
            depth: [0; 3],
            occupants: Default::default(),
            strings: Interner::default(),
            functions: Interner::default(),
            methods: Interner::default(),
            fields: Interner::default(),
            classes: Interner::default(),
            globals: Interner::default(),
        }
    }

    fn finish(self) -> PackedTree {
        PackedTree {
            data: self.out,
            strings: self.strings.into_items(),
            functions: self.functions.into_items(),
            methods: self.methods.into_items(),
            fields: self.fields.into_items(),
            classes: self.classes.into_items(),
            globals: self.globals.into_items(),
        }
    }

    fn step(&mut self, step: Step) -> Result<(), EncodeError> {
        match step {
            // Markers push no value, so they are not instructions.
            Step::Enter(id, kind) => {
                self.enter(id, kind);
                return Ok(());
            }
            Step::BackRef(id) => {
                let distance = self.instructions - self.positions[&id];
                match distance {
                    1 => self.byte(opcodes::BACK_REF_1),
                    2 => self.byte(opcodes::BACK_REF_2),
                    3 => self.byte(opcodes::BACK_REF_3),
                    _ => {
                        self.byte(opcodes::BACK_REF);
                        self.unsigned(distance as u64);
                    }
                }
            }
            Step::Emit(id) => {
                self.node(id)?;
                if let Some(kind) = self.graph.kind(id).opens_scope() {
                    self.depth[scope_slot(kind)] -= 1;
                }
                self.positions.insert(id, self.instructions);
            }
        }
        self.instructions += 1;
        Ok(())
    }

    fn node(&mut self, id: NodeId) -> Result<(), EncodeError> {
        let graph = self.graph;
        match graph.kind(id) {
            IrExprKind::Start => self.byte(opcodes::START),
            IrExprKind::Operation { op, .. } => self.byte(opcodes::operation_opcode(*op)),
            IrExprKind::Conditional { .. } => self.byte(opcodes::CONDITIONAL),
            IrExprKind::Block { .. } => self.byte(opcodes::BLOCK),
            IrExprKind::Loop { .. } => self.byte(opcodes::LOOP),
            IrExprKind::TryCatch {
                exception_types,
                caught_values,
                ..
            } => {
                self.byte(opcodes::TRY_CATCH);
                self.unsigned(exception_types.len() as u64);
                for class in exception_types {
                    let index = self.classes.intern(class);
                    self.unsigned(u64::from(index));
                }
                self.unsigned(u64::from(*caught_values));
            }
            IrExprKind::ExitBlock { block, .. } => self.scope_ref(id, ScopeRef::ExitBlock, *block)?,
            IrExprKind::LoopHeader { looped } => self.scope_ref(id, ScopeRef::LoopHeader, *looped)?,
            IrExprKind::LoopExit { looped, .. } => self.scope_ref(id, ScopeRef::LoopExit, *looped)?,
            IrExprKind::LoopContinue { looped } => {
                self.scope_ref(id, ScopeRef::LoopContinue, *looped)?;
            }
            IrExprKind::TryCatchStart { try_catch } => {
                self.scope_ref(id, ScopeRef::TryCatchStart, *try_catch)?;
            }
            IrExprKind::CaughtValue { try_catch, index } => {
                self.scope_ref(id, ScopeRef::CaughtValue, *try_catch)?;
                self.unsigned(u64::from(*index));
            }
            IrExprKind::SetCaughtValue {
                try_catch, index, ..
            } => {
                self.scope_ref(id, ScopeRef::SetCaughtValue, *try_catch)?;
                self.unsigned(u64::from(*index));
            }
            IrExprKind::CaughtException { try_catch } => {
                self.scope_ref(id, ScopeRef::CaughtException, *try_catch)?;
            }
            IrExprKind::Throw { .. } => self.byte(opcodes::THROW),
            IrExprKind::Tuple(items) => {
                let count = items.len() as u64;
                match count
                    .checked_sub(2)
                    .and_then(|k| short_form(opcodes::TUPLE_2, k, opcodes::TUPLE_SHORT_MAX - 1))
                {
                    Some(code) => self.byte(code),
                    None => {
                        self.byte(opcodes::TUPLE);
                        self.unsigned(count);
                    }
                }
            }
            IrExprKind::TupleComponent { component, .. } => self.with_short_form(
                opcodes::TUPLE_COMPONENT,
                opcodes::TUPLE_COMPONENT_0,
                opcodes::TUPLE_COMPONENT_SHORT_COUNT,
                *component,
            ),
            IrExprKind::Parameter(index) => self.with_short_form(
                opcodes::PARAMETER,
                opcodes::PARAMETER_0,
                opcodes::PARAMETER_SHORT_COUNT,
                *index,
            ),
            IrExprKind::IntConst(value) => match value {
                -1 => self.byte(opcodes::INT_CONST_M1),
                0 => self.byte(opcodes::INT_CONST_0),
                1 => self.byte(opcodes::INT_CONST_1),
                2 => self.byte(opcodes::INT_CONST_2),
                _ => {
                    self.byte(opcodes::INT_CONST);
                    varint::write_signed(&mut self.out, i64::from(*value));
                }
            },
            IrExprKind::LongConst(value) => match value {
                -1 => self.byte(opcodes::LONG_CONST_M1),
                0 => self.byte(opcodes::LONG_CONST_0),
                1 => self.byte(opcodes::LONG_CONST_1),
                2 => self.byte(opcodes::LONG_CONST_2),
                _ => {
                    self.byte(opcodes::LONG_CONST);
                    varint::write_signed(&mut self.out, *value);
                }
            },
            IrExprKind::FloatConst(0) => self.byte(opcodes::FLOAT_CONST_0),
            IrExprKind::FloatConst(bits) => {
                self.byte(opcodes::FLOAT_CONST);
                self.unsigned(u64::from(bits.reverse_bits()));
            }
            IrExprKind::DoubleConst(0) => self.byte(opcodes::DOUBLE_CONST_0),
            IrExprKind::DoubleConst(bits) => {
                self.byte(opcodes::DOUBLE_CONST);
                self.unsigned(bits.reverse_bits());
            }
            IrExprKind::StringConst(value) => {
                let index = self.strings.intern(value);
                self.indexed(opcodes::STRING_CONST, index);
            }
            IrExprKind::CallFunction { function, .. } => {
                let index = self.functions.intern(function);
                self.indexed(opcodes::CALL_FUNCTION, index);
            }
            IrExprKind::CallMethod { method, .. } => {
                let index = self.methods.intern(method);
                self.indexed(opcodes::CALL_METHOD, index);
            }
            IrExprKind::GetVar(index) => self.indexed(opcodes::GET_VAR, *index),
            IrExprKind::SetVar { index, .. } => self.indexed(opcodes::SET_VAR, *index),
            IrExprKind::GetGlobal(global) => {
                let index = self.globals.intern(global);
                self.indexed(opcodes::GET_GLOBAL, index);
            }
            IrExprKind::SetGlobal { global, .. } => {
                let index = self.globals.intern(global);
                self.indexed(opcodes::SET_GLOBAL, index);
            }
            IrExprKind::GetField { field, .. } => {
                let index = self.fields.intern(field);
                self.indexed(opcodes::GET_FIELD, index);
            }
            IrExprKind::SetField { field, .. } => {
                let index = self.fields.intern(field);
                self.indexed(opcodes::SET_FIELD, index);
            }
            IrExprKind::Cast { target, .. } => {
                self.byte(opcodes::CAST);
                self.reference_type(target);
            }
            IrExprKind::InstanceOf { checked, .. } => {
                self.byte(opcodes::INSTANCEOF);
                self.reference_type(checked);
            }
            IrExprKind::New(class) => {
                let index = self.classes.intern(class);
                self.indexed(opcodes::NEW, index);
            }
        }
        Ok(())
    }

    fn enter(&mut self, id: NodeId, kind: ScopeKind) {
        self.byte(opcodes::enter_opcode(kind));
        let slot = scope_slot(kind);
        let index = self.depth[slot] as usize;
        self.depth[slot] += 1;
        let occupants = &mut self.occupants[slot];
        if index < occupants.len() {
            occupants[index] = id;
        } else {
            occupants.push(id);
        }
    }

    fn scope_ref(
        &mut self,
        node: NodeId,
        reference: ScopeRef,
        target: NodeId,
    ) -> Result<(), EncodeError> {
        let kind = reference.kind();
        let slot = scope_slot(kind);
        let level = match self.levels.get(&target) {
            Some(&level) if self.graph.kind(target).opens_scope() == Some(kind) => level,
            _ => return Err(EncodeError::DetachedScope { node }),
        };
        // Not entered yet, or another scope has since taken its level.
        if self.occupants[slot].get(level as usize - 1) != Some(&target) {
            return Err(EncodeError::ScopeOutOfReach { node });
        }
        let distance = i64::from(self.depth[slot]) - i64::from(level);
        let (far, near) = reference.opcodes();
        if distance == 0 {
            self.byte(near);
        } else {
            self.byte(far);
            varint::write_signed(&mut self.out, distance);
        }
        Ok(())
    }

    fn reference_type(&mut self, ty: &IrReferenceType) {
        let (inner, degree) = ty.split_degree();
        let degree = u64::from(degree) << 4;
        match inner {
            IrReferenceType::PrimitiveArray(kind) => self.unsigned(u64::from(kind.tag()) | degree),
            IrReferenceType::Object(class) => {
                self.unsigned(u64::from(opcodes::REFERENCE_TAG_OBJECT) | degree);
                let index = self.classes.intern(class);
                self.unsigned(u64::from(index));
            }
            IrReferenceType::Array(_) => unreachable!("split_degree strips every array level"),
        }
    }

    fn with_short_form(&mut self, long: u8, first: u8, count: u32, value: u32) {
        match short_form(first, u64::from(value), count) {
            Some(code) => self.byte(code),
            None => self.indexed(long, value),
        }
    }

    fn indexed(&mut self, opcode: u8, index: u32) {
        self.byte(opcode);
        self.unsigned(u64::from(index));
    }

    #[inline]
    fn byte(&mut self, byte: u8) {
        self.out.push(byte);
    }

    #[inline]
    fn unsigned(&mut self, value: u64) {
        varint::write_unsigned(&mut self.out, value);
    }
}

/// `first + value` when `value < count`.
fn short_form(first: u8, value: u64, count: u32) -> Option<u8> {
    u8::try_from(value)
        .ok()
        .filter(|&v| u32::from(v) < count)
        .map(|v| first + v)
}

#[cfg(test)]
mod tests;
