#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use std::sync::Arc;

use kiln_ir::ArrayType;
use pretty_assertions::assert_eq;

use super::*;
use crate::{Function, LocalId};

fn function(name: &str, params: &[ValType], locals: &[ValType], body: Vec<Instr>) -> Function {
    let mut all = params.to_vec();
    all.extend_from_slice(locals);
    Function {
        name: Arc::from(name),
        param_count: params.len(),
        result: Some(ValType::I32),
        locals: all,
        body,
    }
}

fn local(index: u32) -> Instr {
    Instr::get_local(LocalId::new(index))
}

fn add(a: Instr, b: Instr) -> Instr {
    Instr::int_binary(IntType::I32, IntBinaryOp::Add, a, b)
}

fn run(module: &Module, name: &str, args: Vec<Value>) -> Outcome {
    let mut machine = Machine::new(module, StandardRuntime::new());
    machine.invoke(name, args).unwrap()
}

#[test]
fn loop_sums_until_break() {
    // sum = 0; i = 0; while (i < n) { sum += i; i++ } return sum
    let exit = BlockId::new(0);
    let head = BlockId::new(1);
    let body = vec![
        Instr::block(
            exit,
            None,
            vec![Instr::new(InstrKind::Block {
                id: head,
                is_loop: true,
                ty: None,
                body: vec![
                    Instr::branch(
                        exit,
                        Instr::int_binary(IntType::I32, IntBinaryOp::GeS, local(2), local(0)),
                        None,
                    ),
                    Instr::set_local(LocalId::new(1), add(local(1), local(2))),
                    Instr::set_local(LocalId::new(2), add(local(2), Instr::i32_const(1))),
                    Instr::break_to(head),
                ],
            })],
        ),
        Instr::new(InstrKind::Return(Some(Box::new(local(1))))),
    ];
    let mut module = Module::new();
    module.add_function(function(
        "sum",
        &[ValType::I32],
        &[ValType::I32, ValType::I32],
        body,
    ));

    assert_eq!(
        run(&module, "sum", vec![Value::I32(5)]),
        Outcome::Returned(Some(Value::I32(10)))
    );
    assert_eq!(
        run(&module, "sum", vec![Value::I32(0)]),
        Outcome::Returned(Some(Value::I32(0)))
    );
}

#[test]
fn table_switch_routes_out_of_range_to_default() {
    let default = BlockId::new(0);
    let one = BlockId::new(1);
    let zero = BlockId::new(2);
    let body = vec![
        Instr::block(
            default,
            None,
            vec![
                Instr::block(
                    one,
                    None,
                    vec![
                        Instr::block(
                            zero,
                            None,
                            vec![Instr::new(InstrKind::Switch {
                                selector: Box::new(local(0)),
                                targets: vec![zero, one],
                                default,
                            })],
                        ),
                        Instr::new(InstrKind::Return(Some(Box::new(Instr::i32_const(100))))),
                    ],
                ),
                Instr::new(InstrKind::Return(Some(Box::new(Instr::i32_const(200))))),
            ],
        ),
        Instr::new(InstrKind::Return(Some(Box::new(Instr::i32_const(-1))))),
    ];
    let mut module = Module::new();
    module.add_function(function("pick", &[ValType::I32], &[], body));

    for (input, expected) in [(0, 100), (1, 200), (2, -1), (-3, -1)] {
        assert_eq!(
            run(&module, "pick", vec![Value::I32(input)]),
            Outcome::Returned(Some(Value::I32(expected))),
            "selector {input}"
        );
    }
}

#[test]
fn branch_yields_result_when_not_taken() {
    let b = BlockId::new(0);
    let body = vec![Instr::block(
        b,
        Some(ValType::I32),
        vec![
            Instr::discard(Instr::branch(b, local(0), Some(Instr::i32_const(7)))),
            Instr::i32_const(9),
        ],
    )];
    let mut module = Module::new();
    module.add_function(function("f", &[ValType::I32], &[], body));

    assert_eq!(
        run(&module, "f", vec![Value::I32(1)]),
        Outcome::Returned(Some(Value::I32(7)))
    );
    assert_eq!(
        run(&module, "f", vec![Value::I32(0)]),
        Outcome::Returned(Some(Value::I32(9)))
    );
}

#[test]
fn try_catches_thrown_struct() {
    let thrower = Function {
        name: Arc::from("thrower"),
        param_count: 0,
        result: None,
        locals: vec![],
        body: vec![Instr::new(InstrKind::Throw(Box::new(Instr::new(
            InstrKind::StructNew {
                class: Arc::from("app.Failure"),
            },
        ))))],
    };
    let catcher = function(
        "catcher",
        &[],
        &[],
        vec![
            Instr::new(InstrKind::Try {
                body: vec![
                    Instr::call("thrower", vec![], None),
                    Instr::new(InstrKind::Return(Some(Box::new(Instr::i32_const(0))))),
                ],
                catch_body: vec![Instr::new(InstrKind::Return(Some(Box::new(
                    Instr::new(InstrKind::RefTest {
                        class: Arc::from("app.Failure"),
                        value: Box::new(Instr::new(InstrKind::CaughtException)),
                    }),
                ))))],
            }),
        ],
    );
    let mut module = Module::new();
    module.add_function(thrower);
    module.add_function(catcher);

    assert_eq!(
        run(&module, "catcher", vec![]),
        Outcome::Returned(Some(Value::I32(1)))
    );
    assert!(matches!(run(&module, "thrower", vec![]), Outcome::Threw(_)));
}

#[test]
fn virtual_call_walks_superclasses() {
    let mut module = Module::new();
    module.classes.declare("app.Base", None, []);
    module
        .classes
        .declare("app.Derived", Some(Arc::from("app.Base")), []);
    module.classes.declare("app.Leaf", Some(Arc::from("app.Derived")), []);
    module.add_function(function(
        "app.Base.size()I",
        &[ValType::Ref],
        &[],
        vec![Instr::i32_const(1)],
    ));
    module.add_function(function(
        "app.Derived.size()I",
        &[ValType::Ref],
        &[],
        vec![Instr::i32_const(2)],
    ));
    module.add_function(function(
        "call",
        &[],
        &[],
        vec![Instr::new(InstrKind::CallVirtual {
            descriptor: Arc::from("size()I"),
            arguments: vec![Instr::new(InstrKind::StructNew {
                class: Arc::from("app.Leaf"),
            })],
            result: Some(ValType::I32),
        })],
    ));

    assert_eq!(
        run(&module, "call", vec![]),
        Outcome::Returned(Some(Value::I32(2)))
    );
}

#[test]
fn arrays_narrow_and_check_bounds() {
    let mut module = Module::new();
    let array = || {
        Instr::new(InstrKind::ArrayNew {
            element: ArrayType::Byte,
            length: Box::new(Instr::i32_const(2)),
        })
    };
    module.add_function(function(
        "store",
        &[ValType::I32],
        &[ValType::Ref],
        vec![
            Instr::set_local(LocalId::new(1), array()),
            Instr::new(InstrKind::ArraySet {
                element: ArrayType::Byte,
                array: Box::new(local(1)),
                index: Box::new(local(0)),
                value: Box::new(Instr::i32_const(200)),
            }),
            Instr::new(InstrKind::ArrayGet {
                element: ArrayType::Byte,
                array: Box::new(local(1)),
                index: Box::new(local(0)),
            }),
        ],
    ));

    assert_eq!(
        run(&module, "store", vec![Value::I32(1)]),
        Outcome::Returned(Some(Value::I32(-56)))
    );
    let mut machine = Machine::new(&module, StandardRuntime::new());
    assert_eq!(
        machine.invoke("store", vec![Value::I32(2)]),
        Err(EvalError::IndexOutOfBounds {
            index: 2,
            length: 2
        })
    );
}

#[test]
fn integer_arithmetic_wraps_and_traps_on_zero_divisor() {
    assert_eq!(
        int_binary(
            IntType::I32,
            IntBinaryOp::Add,
            Value::I32(i32::MAX),
            Value::I32(1)
        ),
        Ok(Value::I32(i32::MIN))
    );
    assert_eq!(
        int_binary(
            IntType::I32,
            IntBinaryOp::ShrU,
            Value::I32(-1),
            Value::I32(36)
        ),
        Ok(Value::I32(0x0FFF_FFFF))
    );
    assert_eq!(
        int_binary(IntType::I64, IntBinaryOp::RemS, Value::I64(7), Value::I64(0)),
        Err(EvalError::DivisionByZero)
    );
    assert_eq!(
        int_binary(
            IntType::I64,
            IntBinaryOp::LtU,
            Value::I64(-1),
            Value::I64(1)
        ),
        Ok(Value::I32(0))
    );
}

#[test]
fn conversions_saturate() {
    assert_eq!(
        convert(ValType::F64, ValType::I32, true, Value::F64(1e20)),
        Ok(Value::I32(i32::MAX))
    );
    assert_eq!(
        convert(ValType::F32, ValType::I64, true, Value::F32(f32::NAN)),
        Ok(Value::I64(0))
    );
    assert_eq!(
        convert(ValType::I32, ValType::I64, false, Value::I32(-1)),
        Ok(Value::I64(0xFFFF_FFFF))
    );
}

#[test]
fn runtime_helpers_record_calls() {
    let mut module = Module::new();
    module.add_function(function(
        "helpers",
        &[],
        &[],
        vec![
            Instr::new(InstrKind::SetGlobal {
                name: Arc::from(names::CALL_SITE_GLOBAL),
                value: Box::new(Instr::i32_const(4)),
            }),
            Instr::call(names::CHECK_HANDLER, vec![Instr::i32_const(4)], None),
            Instr::call(
                "rt.compare.f64",
                vec![
                    Instr::new(InstrKind::F64Const(f64::NAN.to_bits())),
                    Instr::new(InstrKind::F64Const(1.0_f64.to_bits())),
                ],
                Some(ValType::I32),
            ),
        ],
    ));
    let mut machine = Machine::new(&module, StandardRuntime::new());

    assert_eq!(
        machine.invoke("helpers", vec![]),
        Ok(Outcome::Returned(Some(Value::I32(1))))
    );
    assert_eq!(machine.global(names::CALL_SITE_GLOBAL), Some(Value::I32(4)));
    assert_eq!(machine.host().call_count(names::CHECK_HANDLER), 1);
    assert_eq!(
        machine.invoke("rt.missing", vec![]),
        Err(EvalError::UnknownFunction("rt.missing".to_owned()))
    );
}

#[test]
fn multi_array_builds_nested_arrays() {
    let module = Module::new();
    let mut machine = Machine::new(&module, StandardRuntime::new());
    let name = format!("{}.{}", names::NEW_MULTI_ARRAY, multi_array_suffix(ArrayType::Int));
    let Ok(Outcome::Returned(Some(Value::Ref(Some(outer))))) =
        machine.invoke(&name, vec![Value::I32(2), Value::I32(3)])
    else {
        panic!("expected an array");
    };
    let HeapObject::Array { items, .. } = machine.heap().get(outer) else {
        panic!("expected an array");
    };
    assert_eq!(items.len(), 2);
    let Value::Ref(Some(inner)) = items[0] else {
        panic!("expected a nested array");
    };
    assert_eq!(machine.heap().class_of(inner).as_ref(), "[I");
}
