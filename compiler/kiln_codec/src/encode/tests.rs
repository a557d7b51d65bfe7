#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use kiln_ir::graph::{IrOperation, IrType, PrimitiveArrayKind};
use pretty_assertions::assert_eq;

use super::*;
use crate::opcodes::*;

fn bytes(graph: &IrGraph, root: NodeId) -> Vec<u8> {
    encode(graph, root).unwrap().data
}

#[test]
fn shared_operand_is_a_back_reference() {
    let mut graph = IrGraph::new();
    let x = graph.add(IrExprKind::Parameter(0));
    let sum = graph.operation(IrOperation::IntAdd, &[x, x]);

    assert_eq!(
        bytes(&graph, sum),
        vec![
            PARAMETER_0,
            BACK_REF_1,
            operation_opcode(IrOperation::IntAdd)
        ]
    );
}

#[test]
fn back_reference_distance_counts_instructions() {
    let mut graph = IrGraph::new();
    let x = graph.add(IrExprKind::Parameter(0));
    let y = graph.add(IrExprKind::Parameter(1));
    let tuple = graph.add(IrExprKind::Tuple(vec![x, y, x]));

    assert_eq!(
        bytes(&graph, tuple),
        vec![PARAMETER_0, PARAMETER_0 + 1, BACK_REF_2, TUPLE_2 + 1]
    );
}

#[test]
fn far_back_reference_carries_its_distance() {
    let mut graph = IrGraph::new();
    let params: Vec<NodeId> = (0..5).map(|i| graph.add(IrExprKind::Parameter(i))).collect();
    let mut items = params.clone();
    items.push(params[0]);
    let tuple = graph.add(IrExprKind::Tuple(items));

    assert_eq!(
        bytes(&graph, tuple),
        vec![
            PARAMETER_0,
            PARAMETER_0 + 1,
            PARAMETER_0 + 2,
            PARAMETER_0 + 3,
            PARAMETER,
            4,
            BACK_REF,
            5,
            TUPLE_2 + 4,
        ]
    );
}

#[test]
fn small_constants_have_no_payload() {
    let mut graph = IrGraph::new();
    let items = vec![
        graph.int_const(-1),
        graph.int_const(2),
        graph.add(IrExprKind::LongConst(0)),
        graph.add(IrExprKind::FloatConst(0)),
        graph.add(IrExprKind::DoubleConst(0)),
    ];
    let tuple = graph.add(IrExprKind::Tuple(items));

    assert_eq!(
        bytes(&graph, tuple),
        vec![
            INT_CONST_M1,
            INT_CONST_2,
            LONG_CONST_0,
            FLOAT_CONST_0,
            DOUBLE_CONST_0,
            TUPLE_2 + 3,
        ]
    );
}

#[test]
fn wide_constants_are_leb_encoded() {
    let mut graph = IrGraph::new();
    let int = graph.int_const(300);
    let float = graph.add(IrExprKind::FloatConst(1.0f32.to_bits()));
    let tuple = graph.add(IrExprKind::Tuple(vec![int, float]));

    // 300 zig-zags to 600; 1.0f32 is 0x3F80_0000, reversed 0x1FC.
    assert_eq!(
        bytes(&graph, tuple),
        vec![INT_CONST, 0xD8, 0x04, FLOAT_CONST, 0xFC, 0x03, TUPLE_2]
    );
}

#[test]
fn exit_from_enclosing_block_uses_the_near_form() {
    let mut graph = IrGraph::new();
    let start = graph.start();
    let block = graph.reserve();
    let value = graph.int_const(3);
    let exit = graph.add_after(start, IrExprKind::ExitBlock { block, value });
    graph.define(block, IrExprKind::Block { body: exit }, Some(start));

    assert_eq!(
        bytes(&graph, block),
        vec![START, ENTER_BLOCK, BACK_REF_1, INT_CONST, 6, EXIT_BLOCK_0, BLOCK]
    );
}

#[test]
fn exit_before_a_nested_block_stays_near() {
    // block outer { exit outer 0; block inner { 1 } }
    let mut graph = IrGraph::new();
    let start = graph.start();
    let outer = graph.reserve();
    let value = graph.int_const(0);
    let exit = graph.add_after(start, IrExprKind::ExitBlock { block: outer, value });
    let one = graph.int_const(1);
    let inner = graph.add_after(exit, IrExprKind::Block { body: one });
    graph.define(outer, IrExprKind::Block { body: inner }, Some(start));

    assert_eq!(
        bytes(&graph, outer),
        vec![
            START,
            ENTER_BLOCK,
            BACK_REF_1,
            INT_CONST_0,
            EXIT_BLOCK_0,
            ENTER_BLOCK,
            INT_CONST_1,
            BLOCK,
            BLOCK,
        ]
    );
}

#[test]
fn exit_from_outer_block_skips_the_inner_one() {
    let mut graph = IrGraph::new();
    let start = graph.start();
    let outer = graph.reserve();
    let inner = graph.reserve();
    let value = graph.int_const(0);
    let exit = graph.add_after(start, IrExprKind::ExitBlock { block: outer, value });
    graph.define(inner, IrExprKind::Block { body: exit }, Some(start));
    graph.define(outer, IrExprKind::Block { body: inner }, Some(start));

    // One level out: zig-zag 2.
    assert_eq!(
        bytes(&graph, outer),
        vec![
            START,
            ENTER_BLOCK,
            BACK_REF_1,
            ENTER_BLOCK,
            BACK_REF_2,
            INT_CONST_0,
            EXIT_BLOCK,
            2,
            BLOCK,
            BLOCK,
        ]
    );
}

#[test]
fn scope_kinds_nest_independently() {
    // block { loop { exit block } }: the loop does not deepen the block level.
    let mut graph = IrGraph::new();
    let start = graph.start();
    let block = graph.reserve();
    let looped = graph.reserve();
    let header = graph.add(IrExprKind::LoopHeader { looped });
    let value = graph.int_const(2);
    let exit = graph.add_after(header, IrExprKind::ExitBlock { block, value });
    graph.define(looped, IrExprKind::Loop { body: exit }, Some(start));
    graph.define(block, IrExprKind::Block { body: looped }, Some(start));

    assert_eq!(
        bytes(&graph, block),
        vec![
            START,
            ENTER_BLOCK,
            BACK_REF_1,
            ENTER_LOOP,
            LOOP_HEADER_0,
            INT_CONST_2,
            EXIT_BLOCK_0,
            LOOP,
            BLOCK,
        ]
    );
}

#[test]
fn reference_after_its_scope_has_a_negative_distance() {
    let mut graph = IrGraph::new();
    let start = graph.start();
    let try_catch = graph.reserve();
    let body = graph.add(IrExprKind::TryCatchStart { try_catch });
    let handler = graph.int_const(0);
    graph.define(
        try_catch,
        IrExprKind::TryCatch {
            body,
            handler,
            exception_types: vec![IrClass::new("E")],
            caught_values: 0,
        },
        Some(start),
    );
    let caught = graph.add(IrExprKind::CaughtException { try_catch });
    let tuple = graph.add(IrExprKind::Tuple(vec![try_catch, caught]));

    let packed = encode(&graph, tuple).unwrap();
    assert_eq!(
        packed.data,
        vec![
            START,
            ENTER_TRY_CATCH,
            TRY_CATCH_START_0,
            INT_CONST_0,
            TRY_CATCH,
            1,
            0,
            0,
            CAUGHT_EXCEPTION,
            1,
            TUPLE_2,
        ]
    );
    assert_eq!(packed.classes, vec![IrClass::new("E")]);
}

#[test]
fn reference_before_its_scope_is_out_of_reach() {
    let mut graph = IrGraph::new();
    let start = graph.start();
    let try_catch = graph.reserve();
    let caught = graph.add(IrExprKind::CaughtException { try_catch });
    let body = graph.add(IrExprKind::TryCatchStart { try_catch });
    let handler = graph.int_const(0);
    graph.define(
        try_catch,
        IrExprKind::TryCatch {
            body,
            handler,
            exception_types: vec![],
            caught_values: 0,
        },
        Some(start),
    );
    let tuple = graph.add(IrExprKind::Tuple(vec![caught, try_catch]));

    assert_eq!(
        encode(&graph, tuple),
        Err(EncodeError::ScopeOutOfReach { node: caught })
    );
}

#[test]
fn reference_to_a_replaced_level_is_out_of_reach() {
    let mut graph = IrGraph::new();
    let start = graph.start();
    let zero = graph.int_const(0);
    let first = graph.add_after(start, IrExprKind::Block { body: zero });
    let one = graph.int_const(1);
    let second = graph.add_after(first, IrExprKind::Block { body: one });
    let value = graph.int_const(2);
    let exit = graph.add_after(second, IrExprKind::ExitBlock { block: first, value });

    assert_eq!(
        encode(&graph, exit),
        Err(EncodeError::ScopeOutOfReach { node: exit })
    );
}

#[test]
fn side_tables_are_interned_in_first_use_order() {
    let mut graph = IrGraph::new();
    let a = graph.add(IrExprKind::StringConst("a".into()));
    let b = graph.add(IrExprKind::StringConst("b".into()));
    let a_again = graph.add(IrExprKind::StringConst("a".into()));
    let tuple = graph.add(IrExprKind::Tuple(vec![b, a, a_again]));

    let packed = encode(&graph, tuple).unwrap();
    assert_eq!(
        packed.data,
        vec![STRING_CONST, 0, STRING_CONST, 1, STRING_CONST, 1, TUPLE_2 + 1]
    );
    assert_eq!(packed.strings, vec![Arc::from("b"), Arc::from("a")]);
}

#[test]
fn reference_types_pack_tag_and_degree() {
    let mut graph = IrGraph::new();
    let value = graph.add(IrExprKind::Parameter(0));
    let ints = IrReferenceType::PrimitiveArray(PrimitiveArrayKind::Int).with_degree(1);
    let cast = graph.add(IrExprKind::Cast { value, target: ints });
    let objects = IrReferenceType::Object(IrClass::new("A")).with_degree(2);
    let test = graph.add(IrExprKind::InstanceOf {
        value: cast,
        checked: objects,
    });

    assert_eq!(
        bytes(&graph, test),
        vec![PARAMETER_0, CAST, 4 | 1 << 4, INSTANCEOF, 8 | 2 << 4, 0]
    );
}

#[test]
fn cycles_are_rejected() {
    let mut graph = IrGraph::new();
    let node = graph.reserve();
    graph.define(
        node,
        IrExprKind::Operation {
            op: IrOperation::IntNegate,
            operands: [node].into_iter().collect(),
        },
        None,
    );
    assert_eq!(encode(&graph, node), Err(EncodeError::Cycle(node)));
}

#[test]
fn call_arity_must_match_the_signature() {
    let mut graph = IrGraph::new();
    let start = graph.start();
    let function = IrFunction::new("f", vec![IrType::Int], IrType::Void);
    let call = graph.add_after(
        start,
        IrExprKind::CallFunction {
            function,
            arguments: vec![],
        },
    );
    assert_eq!(
        encode(&graph, call),
        Err(EncodeError::Arity {
            node: call,
            expected: 1,
            found: 0,
        })
    );
}

#[test]
fn scope_outside_the_tree_is_detached() {
    let mut graph = IrGraph::new();
    let block = graph.reserve();
    let header = graph.add(IrExprKind::LoopHeader { looped: block });
    let start = graph.start();
    graph.define(block, IrExprKind::Block { body: start }, Some(start));

    assert_eq!(
        encode(&graph, header),
        Err(EncodeError::DetachedScope { node: header })
    );
}
