#![allow(clippy::unwrap_used, reason = "Tests can panic")]

//! Round trips through the wire format.

use kiln_ir::graph::{
    structurally_equal, IrClass, IrExprKind, IrField, IrFunction, IrGlobal, IrGraph, IrMethod,
    IrOperation, IrReferenceType, IrType, NodeId, PrimitiveArrayKind,
};
use pretty_assertions::assert_eq;

use super::*;

fn assert_round_trip(graph: &IrGraph, root: NodeId) -> PackedTree {
    let packed = encode(graph, root).unwrap();
    let (decoded, decoded_root) = decode(&packed).unwrap();
    assert!(
        structurally_equal(graph, root, &decoded, decoded_root),
        "decoded graph differs"
    );
    assert_eq!(encode(&decoded, decoded_root).unwrap(), packed);
    packed
}

// === Fixtures ===

/// `while (true) { if (x) break x; else continue; }` with the loop's value
/// stored in a global.
fn loop_with_exit(graph: &mut IrGraph) -> NodeId {
    let start = graph.start();
    let looped = graph.reserve();
    let header = graph.add(IrExprKind::LoopHeader { looped });
    let x = graph.add(IrExprKind::Parameter(0));
    let exit = graph.add_after(header, IrExprKind::LoopExit { looped, value: x });
    let again = graph.add_after(header, IrExprKind::LoopContinue { looped });
    let branch = graph.add_after(
        header,
        IrExprKind::Conditional {
            condition: x,
            then_value: exit,
            else_value: again,
        },
    );
    graph.define(looped, IrExprKind::Loop { body: branch }, Some(start));
    graph.add_after(
        looped,
        IrExprKind::SetGlobal {
            global: IrGlobal::new("last", IrType::Int),
            value: looped,
        },
    )
}

/// A protected call whose handler reads the caught exception and value.
fn guarded_call(graph: &mut IrGraph) -> NodeId {
    let start = graph.start();
    let try_catch = graph.reserve();
    let body_start = graph.add(IrExprKind::TryCatchStart { try_catch });
    let seed = graph.int_const(7);
    let stored = graph.add_after(
        body_start,
        IrExprKind::SetCaughtValue {
            try_catch,
            index: 0,
            value: seed,
        },
    );
    let receiver = graph.add_after(stored, IrExprKind::New(IrClass::new("Point")));
    let method = IrMethod::new(IrClass::new("Point"), "move", vec![IrType::Int], IrType::Void);
    let call = graph.add_after(
        receiver,
        IrExprKind::CallMethod {
            method,
            arguments: vec![receiver, seed],
        },
    );
    let exception = graph.add(IrExprKind::CaughtException { try_catch });
    let value = graph.add(IrExprKind::CaughtValue { try_catch, index: 0 });
    let handler = graph.add(IrExprKind::Tuple(vec![exception, value]));
    graph.define(
        try_catch,
        IrExprKind::TryCatch {
            body: call,
            handler,
            exception_types: vec![IrClass::new("IOException"), IrClass::new("Error")],
            caught_values: 1,
        },
        Some(start),
    );
    try_catch
}

// === Round trips ===

#[test]
fn loop_round_trips() {
    let mut graph = IrGraph::new();
    let root = loop_with_exit(&mut graph);
    let packed = assert_round_trip(&graph, root);
    assert_eq!(packed.globals, vec![IrGlobal::new("last", IrType::Int)]);
}

#[test]
fn try_catch_round_trips() {
    let mut graph = IrGraph::new();
    let root = guarded_call(&mut graph);
    let packed = assert_round_trip(&graph, root);
    assert_eq!(
        packed.classes,
        vec![
            IrClass::new("Point"),
            IrClass::new("IOException"),
            IrClass::new("Error"),
        ]
    );
    assert_eq!(packed.methods.len(), 1);
}

#[test]
fn nested_scopes_round_trip() {
    // block outer { exit outer x; block inner { loop { if x break inner else continue } } }
    let mut graph = IrGraph::new();
    let start = graph.start();
    let outer = graph.reserve();
    let inner = graph.reserve();
    let looped = graph.reserve();
    let x = graph.add(IrExprKind::Parameter(0));
    let leave = graph.add_after(start, IrExprKind::ExitBlock { block: outer, value: x });
    let header = graph.add(IrExprKind::LoopHeader { looped });
    let exit = graph.add_after(header, IrExprKind::ExitBlock { block: inner, value: x });
    let again = graph.add_after(header, IrExprKind::LoopContinue { looped });
    let branch = graph.add_after(
        header,
        IrExprKind::Conditional {
            condition: x,
            then_value: exit,
            else_value: again,
        },
    );
    graph.define(looped, IrExprKind::Loop { body: branch }, Some(leave));
    graph.define(inner, IrExprKind::Block { body: looped }, Some(leave));
    graph.define(outer, IrExprKind::Block { body: inner }, Some(start));

    let packed = assert_round_trip(&graph, outer);
    let near_exits = packed
        .data
        .iter()
        .filter(|&&b| b == crate::opcodes::EXIT_BLOCK_0)
        .count();
    assert_eq!(near_exits, 2);
}

#[test]
fn fields_casts_and_constants_round_trip() {
    let mut graph = IrGraph::new();
    let start = graph.start();
    let object = graph.add(IrExprKind::Parameter(5));
    let field = IrField::new(IrClass::new("Point"), "x", IrType::Double);
    let read = graph.add(IrExprKind::GetField {
        field: field.clone(),
        object,
    });
    let written = graph.add_after(
        start,
        IrExprKind::SetField {
            field,
            object,
            value: read,
        },
    );
    let cast = graph.add(IrExprKind::Cast {
        value: object,
        target: IrReferenceType::PrimitiveArray(PrimitiveArrayKind::Char).with_degree(3),
    });
    let items = vec![
        written,
        cast,
        graph.add(IrExprKind::DoubleConst((-0.5f64).to_bits())),
        graph.add(IrExprKind::FloatConst((-0.0f32).to_bits())),
        graph.add(IrExprKind::LongConst(i64::MIN)),
        graph.int_const(i32::MAX),
        graph.add(IrExprKind::TupleComponent {
            tuple: object,
            component: 12,
        }),
        graph.add(IrExprKind::GetVar(130)),
        graph.add(IrExprKind::StringConst("hello".into())),
    ];
    let root = graph.add(IrExprKind::Tuple(items));
    assert_round_trip(&graph, root);
}

#[test]
fn diamond_sharing_survives() {
    let mut graph = IrGraph::new();
    let x = graph.add(IrExprKind::Parameter(0));
    let left = graph.operation(IrOperation::IntNegate, &[x]);
    let right = graph.operation(IrOperation::IntInvert, &[x]);
    let root = graph.operation(IrOperation::IntMul, &[left, right]);

    assert_round_trip(&graph, root);
}

#[test]
fn node_used_at_increasing_depths_is_emitted_once() {
    use crate::opcodes::{BACK_REF, BACK_REF_1, BACK_REF_2, BACK_REF_3, PARAMETER_0};

    // x - (x * (x + -x))
    let mut graph = IrGraph::new();
    let x = graph.add(IrExprKind::Parameter(0));
    let negated = graph.operation(IrOperation::IntNegate, &[x]);
    let sum = graph.operation(IrOperation::IntAdd, &[x, negated]);
    let product = graph.operation(IrOperation::IntMul, &[x, sum]);
    let root = graph.operation(IrOperation::IntSub, &[x, product]);

    let packed = assert_round_trip(&graph, root);
    let emitted = packed.data.iter().filter(|&&b| b == PARAMETER_0).count();
    let references = packed
        .data
        .iter()
        .filter(|&&b| matches!(b, BACK_REF | BACK_REF_1 | BACK_REF_2 | BACK_REF_3))
        .count();
    assert_eq!((emitted, references), (1, 3));
}

#[test]
fn long_effect_chain_round_trips() {
    let mut graph = IrGraph::new();
    let mut effect = graph.start();
    let one = graph.int_const(1);
    for index in 0..20_000 {
        effect = graph.add_after(effect, IrExprKind::SetVar { index, value: one });
    }
    assert_round_trip(&graph, effect);
}

// === Property tests ===

mod proptest_round_trip {
    use super::*;
    use proptest::prelude::*;

    /// One construction step; indices pick earlier values modulo their count.
    #[derive(Clone, Debug)]
    enum Build {
        Int(i32),
        Long(i64),
        Double(u64),
        Str(u8),
        Param(u8),
        Binary(bool, usize, usize),
        Check(usize),
        Tuple(Vec<usize>),
        Component(usize, u8),
        Store(u8, usize),
        Call(usize, usize),
        Field(usize),
        Cast(usize, u8),
        Block(usize),
        Loop(usize, usize),
        Try(usize),
        Raise,
    }

    fn build_step() -> impl Strategy<Value = Build> {
        prop_oneof![
            any::<i32>().prop_map(Build::Int),
            any::<i64>().prop_map(Build::Long),
            any::<u64>().prop_map(Build::Double),
            any::<u8>().prop_map(Build::Str),
            any::<u8>().prop_map(Build::Param),
            (any::<bool>(), any::<usize>(), any::<usize>())
                .prop_map(|(long, a, b)| Build::Binary(long, a, b)),
            any::<usize>().prop_map(Build::Check),
            proptest::collection::vec(any::<usize>(), 0..10).prop_map(Build::Tuple),
            (any::<usize>(), any::<u8>()).prop_map(|(t, c)| Build::Component(t, c)),
            (any::<u8>(), any::<usize>()).prop_map(|(i, v)| Build::Store(i, v)),
            (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Build::Call(a, b)),
            any::<usize>().prop_map(Build::Field),
            (any::<usize>(), any::<u8>()).prop_map(|(v, d)| Build::Cast(v, d)),
            any::<usize>().prop_map(Build::Block),
            (any::<usize>(), any::<usize>()).prop_map(|(c, v)| Build::Loop(c, v)),
            any::<usize>().prop_map(Build::Try),
            Just(Build::Raise),
        ]
    }

    fn pick(values: &[NodeId], i: usize) -> NodeId {
        values[i % values.len()]
    }

    fn build(steps: &[Build]) -> (IrGraph, NodeId) {
        let mut graph = IrGraph::new();
        let mut effect = graph.start();
        let mut values = vec![graph.int_const(0)];

        for step in steps {
            let value = match step {
                Build::Int(v) => graph.int_const(*v),
                Build::Long(v) => graph.add(IrExprKind::LongConst(*v)),
                Build::Double(bits) => graph.add(IrExprKind::DoubleConst(*bits)),
                Build::Str(k) => graph.add(IrExprKind::StringConst(format!("s{}", k % 4).into())),
                Build::Param(i) => graph.add(IrExprKind::Parameter(u32::from(*i))),
                Build::Binary(long, a, b) => {
                    let op = if *long {
                        IrOperation::LongMul
                    } else {
                        IrOperation::IntAdd
                    };
                    graph.operation(op, &[pick(&values, *a), pick(&values, *b)])
                }
                Build::Check(v) => graph.operation(IrOperation::NullCheck, &[pick(&values, *v)]),
                Build::Tuple(items) => {
                    let items = items.iter().map(|&i| pick(&values, i)).collect();
                    graph.add(IrExprKind::Tuple(items))
                }
                Build::Component(t, c) => graph.add(IrExprKind::TupleComponent {
                    tuple: pick(&values, *t),
                    component: u32::from(*c),
                }),
                Build::Store(index, v) => {
                    effect = graph.add_after(
                        effect,
                        IrExprKind::SetVar {
                            index: u32::from(*index),
                            value: pick(&values, *v),
                        },
                    );
                    effect
                }
                Build::Call(a, b) => {
                    let function = IrFunction::new("f", vec![IrType::Int, IrType::Long], IrType::Int);
                    effect = graph.add_after(
                        effect,
                        IrExprKind::CallFunction {
                            function,
                            arguments: vec![pick(&values, *a), pick(&values, *b)],
                        },
                    );
                    effect
                }
                Build::Field(v) => graph.add(IrExprKind::GetField {
                    field: IrField::new(IrClass::new("A"), "f", IrType::Object),
                    object: pick(&values, *v),
                }),
                Build::Cast(v, degree) => graph.add(IrExprKind::InstanceOf {
                    value: pick(&values, *v),
                    checked: IrReferenceType::Object(IrClass::new("A"))
                        .with_degree(u32::from(degree % 3)),
                }),
                Build::Block(v) => {
                    let block = graph.reserve();
                    let exit = graph.add_after(
                        effect,
                        IrExprKind::ExitBlock {
                            block,
                            value: pick(&values, *v),
                        },
                    );
                    graph.define(block, IrExprKind::Block { body: exit }, Some(effect));
                    effect = block;
                    block
                }
                Build::Loop(c, v) => {
                    let looped = graph.reserve();
                    let header = graph.add(IrExprKind::LoopHeader { looped });
                    let exit = graph.add_after(
                        header,
                        IrExprKind::LoopExit {
                            looped,
                            value: pick(&values, *v),
                        },
                    );
                    let again = graph.add_after(header, IrExprKind::LoopContinue { looped });
                    let branch = graph.add_after(
                        header,
                        IrExprKind::Conditional {
                            condition: pick(&values, *c),
                            then_value: exit,
                            else_value: again,
                        },
                    );
                    graph.define(looped, IrExprKind::Loop { body: branch }, Some(effect));
                    effect = looped;
                    looped
                }
                Build::Try(v) => {
                    let try_catch = graph.reserve();
                    let body_start = graph.add(IrExprKind::TryCatchStart { try_catch });
                    let stored = graph.add_after(
                        body_start,
                        IrExprKind::SetCaughtValue {
                            try_catch,
                            index: 0,
                            value: pick(&values, *v),
                        },
                    );
                    let thrown = graph.add_after(
                        stored,
                        IrExprKind::Throw {
                            value: pick(&values, *v),
                        },
                    );
                    let exception = graph.add(IrExprKind::CaughtException { try_catch });
                    let caught = graph.add(IrExprKind::CaughtValue { try_catch, index: 0 });
                    let handler = graph.add(IrExprKind::Tuple(vec![exception, caught]));
                    graph.define(
                        try_catch,
                        IrExprKind::TryCatch {
                            body: thrown,
                            handler,
                            exception_types: vec![IrClass::new("E")],
                            caught_values: 1,
                        },
                        Some(effect),
                    );
                    effect = try_catch;
                    try_catch
                }
                Build::Raise => {
                    effect = graph.add_after(
                        effect,
                        IrExprKind::Operation {
                            op: IrOperation::ThrowNpe,
                            operands: Default::default(),
                        },
                    );
                    effect
                }
            };
            values.push(value);
        }

        values.push(effect);
        let root = graph.add(IrExprKind::Tuple(values));
        (graph, root)
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(steps in proptest::collection::vec(build_step(), 0..40)) {
            let (graph, root) = build(&steps);
            let packed = encode(&graph, root).unwrap();
            let (decoded, decoded_root) = decode(&packed).unwrap();
            prop_assert!(structurally_equal(&graph, root, &decoded, decoded_root));
            prop_assert_eq!(encode(&decoded, decoded_root).unwrap(), packed);
        }

        #[test]
        fn arbitrary_bytes_never_panic(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = decode(&PackedTree { data, ..PackedTree::default() });
        }
    }
}
