//! Wire opcodes and the static decode table.
//!
//! Every opcode pushes exactly one value. Operands are popped from the
//! operand stack; ordered nodes pop their `previous` operand last (it was
//! pushed first). Payloads (indices, constants, distances) follow the opcode
//! byte as LEB128.

use kiln_ir::graph::{IrOperation, ScopeKind};

// ── Constants ──────────────────────────────────────────────────────────

pub const START: u8 = 0x00;
/// Followed by a zig-zag LEB value.
pub const INT_CONST: u8 = 0x01;
pub const INT_CONST_M1: u8 = 0x02;
pub const INT_CONST_0: u8 = 0x03;
pub const INT_CONST_1: u8 = 0x04;
pub const INT_CONST_2: u8 = 0x05;
/// Followed by a zig-zag LEB value.
pub const LONG_CONST: u8 = 0x06;
pub const LONG_CONST_M1: u8 = 0x07;
pub const LONG_CONST_0: u8 = 0x08;
pub const LONG_CONST_1: u8 = 0x09;
pub const LONG_CONST_2: u8 = 0x0A;
/// Followed by the bit-reversed raw bits as LEB.
pub const FLOAT_CONST: u8 = 0x0B;
pub const FLOAT_CONST_0: u8 = 0x0C;
/// Followed by the bit-reversed raw bits as LEB.
pub const DOUBLE_CONST: u8 = 0x0D;
pub const DOUBLE_CONST_0: u8 = 0x0E;
/// Followed by a string table index.
pub const STRING_CONST: u8 = 0x0F;

// ── Operations ─────────────────────────────────────────────────────────

/// First operation opcode; operation `op` is `OPERATION_BASE + op.ordinal()`.
pub const OPERATION_BASE: u8 = 0x10;

// ── Stack shape ────────────────────────────────────────────────────────

/// Followed by the distance in instructions.
pub const BACK_REF: u8 = 0x68;
pub const BACK_REF_1: u8 = 0x69;
pub const BACK_REF_2: u8 = 0x6A;
pub const BACK_REF_3: u8 = 0x6B;
pub const PARAMETER: u8 = 0x6C;
pub const PARAMETER_0: u8 = 0x6D;
pub const PARAMETER_SHORT_COUNT: u32 = 4;
/// Followed by the component count.
pub const TUPLE: u8 = 0x71;
/// `TUPLE_2 + (n - 2)` for `n` in `2..=7`.
pub const TUPLE_2: u8 = 0x72;
pub const TUPLE_SHORT_MAX: u32 = 7;
pub const TUPLE_COMPONENT: u8 = 0x78;
pub const TUPLE_COMPONENT_0: u8 = 0x79;
pub const TUPLE_COMPONENT_SHORT_COUNT: u32 = 8;
pub const CONDITIONAL: u8 = 0x81;

// ── Scopes ─────────────────────────────────────────────────────────────
//
// A scope body is bracketed by an `ENTER_*` marker, which pushes nothing,
// and the closing opcode. A scope reference carries the zig-zag distance
// from the current nesting depth of its kind to the level its target was
// entered at. The `_0` variant stands for distance zero and has no payload.

pub const BLOCK: u8 = 0x82;
pub const EXIT_BLOCK: u8 = 0x83;
pub const EXIT_BLOCK_0: u8 = 0x84;
pub const LOOP: u8 = 0x85;
pub const LOOP_HEADER: u8 = 0x86;
pub const LOOP_HEADER_0: u8 = 0x87;
pub const LOOP_EXIT: u8 = 0x88;
pub const LOOP_EXIT_0: u8 = 0x89;
pub const LOOP_CONTINUE: u8 = 0x8A;
pub const LOOP_CONTINUE_0: u8 = 0x8B;
/// Followed by the exception class count, the class indices and the
/// caught value count.
pub const TRY_CATCH: u8 = 0x8C;
pub const TRY_CATCH_START: u8 = 0x8D;
pub const TRY_CATCH_START_0: u8 = 0x8E;
/// Distance, then the caught value index.
pub const CAUGHT_VALUE: u8 = 0x8F;
pub const CAUGHT_VALUE_0: u8 = 0x90;
pub const SET_CAUGHT_VALUE: u8 = 0x91;
pub const SET_CAUGHT_VALUE_0: u8 = 0x92;
pub const CAUGHT_EXCEPTION: u8 = 0x93;
pub const CAUGHT_EXCEPTION_0: u8 = 0x94;

// ── Effects and members ────────────────────────────────────────────────

pub const THROW: u8 = 0x95;
pub const CALL_FUNCTION: u8 = 0x96;
pub const CALL_METHOD: u8 = 0x97;
pub const GET_VAR: u8 = 0x98;
pub const SET_VAR: u8 = 0x99;
pub const GET_GLOBAL: u8 = 0x9A;
pub const SET_GLOBAL: u8 = 0x9B;
pub const GET_FIELD: u8 = 0x9C;
pub const SET_FIELD: u8 = 0x9D;
/// Followed by a reference type: `tag | degree << 4`, then a class index
/// for object tags.
pub const CAST: u8 = 0x9E;
pub const INSTANCEOF: u8 = 0x9F;
/// Followed by a class index.
pub const NEW: u8 = 0xA0;

// Scope body markers, allocated after the member range.
pub const ENTER_BLOCK: u8 = 0xA1;
pub const ENTER_LOOP: u8 = 0xA2;
pub const ENTER_TRY_CATCH: u8 = 0xA3;

/// Reference type tag for class types; tags below are primitive arrays.
pub const REFERENCE_TAG_OBJECT: u8 = 8;

const _: () = assert!(
    OPERATION_BASE as usize + IrOperation::ALL.len() <= BACK_REF as usize,
    "operation opcodes overlap the stack-shape range"
);

#[expect(
    clippy::cast_possible_truncation,
    reason = "operation ordinals stay below the BACK_REF range"
)]
pub const fn operation_opcode(op: IrOperation) -> u8 {
    OPERATION_BASE + op.ordinal() as u8
}

/// Marker that precedes the body of a scope of `kind`.
pub const fn enter_opcode(kind: ScopeKind) -> u8 {
    match kind {
        ScopeKind::Block => ENTER_BLOCK,
        ScopeKind::Loop => ENTER_LOOP,
        ScopeKind::TryCatch => ENTER_TRY_CATCH,
    }
}

/// Scope references, by the node kind they decode to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ScopeRef {
    ExitBlock,
    LoopHeader,
    LoopExit,
    LoopContinue,
    TryCatchStart,
    CaughtValue,
    SetCaughtValue,
    CaughtException,
}

impl ScopeRef {
    pub(crate) const fn kind(self) -> ScopeKind {
        match self {
            ScopeRef::ExitBlock => ScopeKind::Block,
            ScopeRef::LoopHeader | ScopeRef::LoopExit | ScopeRef::LoopContinue => ScopeKind::Loop,
            ScopeRef::TryCatchStart
            | ScopeRef::CaughtValue
            | ScopeRef::SetCaughtValue
            | ScopeRef::CaughtException => ScopeKind::TryCatch,
        }
    }

    /// `(opcode with payload, opcode for distance zero)`.
    pub(crate) const fn opcodes(self) -> (u8, u8) {
        match self {
            ScopeRef::ExitBlock => (EXIT_BLOCK, EXIT_BLOCK_0),
            ScopeRef::LoopHeader => (LOOP_HEADER, LOOP_HEADER_0),
            ScopeRef::LoopExit => (LOOP_EXIT, LOOP_EXIT_0),
            ScopeRef::LoopContinue => (LOOP_CONTINUE, LOOP_CONTINUE_0),
            ScopeRef::TryCatchStart => (TRY_CATCH_START, TRY_CATCH_START_0),
            ScopeRef::CaughtValue => (CAUGHT_VALUE, CAUGHT_VALUE_0),
            ScopeRef::SetCaughtValue => (SET_CAUGHT_VALUE, SET_CAUGHT_VALUE_0),
            ScopeRef::CaughtException => (CAUGHT_EXCEPTION, CAUGHT_EXCEPTION_0),
        }
    }

    const ALL: [ScopeRef; 8] = [
        ScopeRef::ExitBlock,
        ScopeRef::LoopHeader,
        ScopeRef::LoopExit,
        ScopeRef::LoopContinue,
        ScopeRef::TryCatchStart,
        ScopeRef::CaughtValue,
        ScopeRef::SetCaughtValue,
        ScopeRef::CaughtException,
    ];
}

/// Meaning of one opcode byte. `None` payloads are read from the stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Opcode {
    Start,
    IntConst(Option<i32>),
    LongConst(Option<i64>),
    FloatConst { zero: bool },
    DoubleConst { zero: bool },
    StringConst,
    Operation(IrOperation),
    BackRef(Option<u32>),
    Parameter(Option<u32>),
    Tuple(Option<u32>),
    TupleComponent(Option<u32>),
    Conditional,
    Enter(ScopeKind),
    Scope(ScopeKind),
    ScopeRef { reference: ScopeRef, near: bool },
    Throw,
    CallFunction,
    CallMethod,
    GetVar,
    SetVar,
    GetGlobal,
    SetGlobal,
    GetField,
    SetField,
    Cast,
    InstanceOf,
    New,
}

/// Const builder for [`OPCODES`]. Registering a byte twice aborts constant
/// evaluation.
#[derive(Copy, Clone)]
struct OpcodeTable([Option<Opcode>; 256]);

impl OpcodeTable {
    const fn new() -> Self {
        Self([None; 256])
    }

    #[must_use]
    const fn with(mut self, code: u8, opcode: Opcode) -> Self {
        assert!(self.0[code as usize].is_none(), "opcode registered twice");
        self.0[code as usize] = Some(opcode);
        self
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "short-form counts are below 256"
    )]
    const fn with_run(mut self, first: u8, count: u32, make: RunKind) -> Self {
        let mut i = 0;
        while i < count {
            let opcode = match make {
                RunKind::BackRef => Opcode::BackRef(Some(i + 1)),
                RunKind::Parameter => Opcode::Parameter(Some(i)),
                RunKind::Tuple => Opcode::Tuple(Some(i + 2)),
                RunKind::TupleComponent => Opcode::TupleComponent(Some(i)),
            };
            self = self.with(first + i as u8, opcode);
            i += 1;
        }
        self
    }
}

#[derive(Copy, Clone)]
enum RunKind {
    BackRef,
    Parameter,
    Tuple,
    TupleComponent,
}

const fn build() -> OpcodeTable {
    let mut table = OpcodeTable::new()
        .with(START, Opcode::Start)
        .with(INT_CONST, Opcode::IntConst(None))
        .with(INT_CONST_M1, Opcode::IntConst(Some(-1)))
        .with(INT_CONST_0, Opcode::IntConst(Some(0)))
        .with(INT_CONST_1, Opcode::IntConst(Some(1)))
        .with(INT_CONST_2, Opcode::IntConst(Some(2)))
        .with(LONG_CONST, Opcode::LongConst(None))
        .with(LONG_CONST_M1, Opcode::LongConst(Some(-1)))
        .with(LONG_CONST_0, Opcode::LongConst(Some(0)))
        .with(LONG_CONST_1, Opcode::LongConst(Some(1)))
        .with(LONG_CONST_2, Opcode::LongConst(Some(2)))
        .with(FLOAT_CONST, Opcode::FloatConst { zero: false })
        .with(FLOAT_CONST_0, Opcode::FloatConst { zero: true })
        .with(DOUBLE_CONST, Opcode::DoubleConst { zero: false })
        .with(DOUBLE_CONST_0, Opcode::DoubleConst { zero: true })
        .with(STRING_CONST, Opcode::StringConst)
        .with(BACK_REF, Opcode::BackRef(None))
        .with_run(BACK_REF_1, 3, RunKind::BackRef)
        .with(PARAMETER, Opcode::Parameter(None))
        .with_run(PARAMETER_0, PARAMETER_SHORT_COUNT, RunKind::Parameter)
        .with(TUPLE, Opcode::Tuple(None))
        .with_run(TUPLE_2, TUPLE_SHORT_MAX - 1, RunKind::Tuple)
        .with(TUPLE_COMPONENT, Opcode::TupleComponent(None))
        .with_run(
            TUPLE_COMPONENT_0,
            TUPLE_COMPONENT_SHORT_COUNT,
            RunKind::TupleComponent,
        )
        .with(CONDITIONAL, Opcode::Conditional)
        .with(ENTER_BLOCK, Opcode::Enter(ScopeKind::Block))
        .with(ENTER_LOOP, Opcode::Enter(ScopeKind::Loop))
        .with(ENTER_TRY_CATCH, Opcode::Enter(ScopeKind::TryCatch))
        .with(BLOCK, Opcode::Scope(ScopeKind::Block))
        .with(LOOP, Opcode::Scope(ScopeKind::Loop))
        .with(TRY_CATCH, Opcode::Scope(ScopeKind::TryCatch))
        .with(THROW, Opcode::Throw)
        .with(CALL_FUNCTION, Opcode::CallFunction)
        .with(CALL_METHOD, Opcode::CallMethod)
        .with(GET_VAR, Opcode::GetVar)
        .with(SET_VAR, Opcode::SetVar)
        .with(GET_GLOBAL, Opcode::GetGlobal)
        .with(SET_GLOBAL, Opcode::SetGlobal)
        .with(GET_FIELD, Opcode::GetField)
        .with(SET_FIELD, Opcode::SetField)
        .with(CAST, Opcode::Cast)
        .with(INSTANCEOF, Opcode::InstanceOf)
        .with(NEW, Opcode::New);

    let mut i = 0;
    while i < IrOperation::ALL.len() {
        let op = IrOperation::ALL[i];
        table = table.with(operation_opcode(op), Opcode::Operation(op));
        i += 1;
    }

    let mut i = 0;
    while i < ScopeRef::ALL.len() {
        let reference = ScopeRef::ALL[i];
        let (far, near) = reference.opcodes();
        table = table
            .with(
                far,
                Opcode::ScopeRef {
                    reference,
                    near: false,
                },
            )
            .with(
                near,
                Opcode::ScopeRef {
                    reference,
                    near: true,
                },
            );
        i += 1;
    }
    table
}

/// Decode dispatch, indexed by opcode byte.
pub(crate) static OPCODES: [Option<Opcode>; 256] = build().0;

#[cfg(test)]
mod tests;
