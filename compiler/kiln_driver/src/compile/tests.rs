use kiln_ir::{
    AstArena, ElementModifiers, MethodBody, MethodDescriptor, MethodReference, StmtKind,
    ValueType, VariableNode,
};
use kiln_target::{Instr, InstrKind};
use pretty_assertions::assert_eq;

use super::*;

fn reference(name: &str) -> MethodReference {
    MethodReference::new("app.Main", MethodDescriptor::new(name, vec![], ValueType::Void))
}

fn method(name: &str, kind: StmtKind, variables: Vec<VariableNode>) -> MethodNode {
    let mut arena = AstArena::new();
    let statement = arena.stmt_of(kind);
    MethodNode::new(
        reference(name),
        ElementModifiers::STATIC,
        MethodBody::Regular {
            arena,
            statement,
            variables,
        },
    )
}

fn class(methods: Vec<MethodNode>) -> ClassNode {
    let mut class = ClassNode::new("app.Main");
    class.methods = methods;
    class
}

fn calls(body: &[Instr]) -> Vec<Arc<str>> {
    let mut out = Vec::new();
    let mut pending: Vec<&Instr> = body.iter().collect();
    while let Some(instr) = pending.pop() {
        if let InstrKind::Call { function, .. } = &instr.kind {
            out.push(Arc::clone(function));
        }
        pending.extend(instr.children());
    }
    out
}

#[test]
fn empty_unit() {
    let unit = Compiler::new(CompileOptions::development())
        .compile(Vec::new())
        .unwrap_or_else(|error| panic!("{error}"));
    assert!(unit.module.functions.is_empty());
    assert_eq!(unit.exports, "");
    assert!(unit.debug_sections.is_empty());
    assert!(matches!(unit.debug_file(), Ok(None)));
}

#[test]
fn native_methods_are_not_lowered() {
    let native = MethodNode::new(reference("halt"), ElementModifiers::STATIC, MethodBody::Native);
    let unit = Compiler::new(CompileOptions::default())
        .compile(vec![class(vec![native])])
        .unwrap_or_else(|error| panic!("{error}"));
    assert!(unit.module.functions.is_empty());
    assert_eq!(unit.exports, "");
}

#[test]
fn classes_with_an_initializer_are_initialized() {
    let init = method(CLASS_INIT, StmtKind::Sequence(vec![]), vec![]);
    let touch = method(
        "touch",
        StmtKind::InitClass {
            class: Arc::from("app.Main"),
        },
        vec![],
    );
    let unit = Compiler::new(CompileOptions::default())
        .compile(vec![class(vec![init, touch])])
        .unwrap_or_else(|error| panic!("{error}"));

    let Some(touch) = unit.module.function("app.Main.touch()V") else {
        panic!("touch was not lowered");
    };
    assert_eq!(
        calls(&touch.body),
        vec![Arc::<str>::from("app.Main.<clinit>()V")]
    );
}

#[test]
fn classes_without_an_initializer_skip_it() {
    let touch = method(
        "touch",
        StmtKind::InitClass {
            class: Arc::from("app.Main"),
        },
        vec![],
    );
    let unit = Compiler::new(CompileOptions::default())
        .compile(vec![class(vec![touch])])
        .unwrap_or_else(|error| panic!("{error}"));
    let Some(touch) = unit.module.function("app.Main.touch()V") else {
        panic!("touch was not lowered");
    };
    assert!(calls(&touch.body).is_empty());
}

#[test]
fn lowering_failure_names_the_method() {
    // Variable 2 without a variable 1.
    let broken = method(
        "broken",
        StmtKind::Return(None),
        vec![VariableNode::new(2, ValueType::INT)],
    );
    let error = match Compiler::new(CompileOptions::default()).compile(vec![class(vec![broken])]) {
        Ok(_) => panic!("lowering should fail"),
        Err(error) => error,
    };
    match error {
        DriverError::Lower { method, source } => {
            assert_eq!(method, "app.Main.broken()V");
            assert!(matches!(source, LowerError::Internal { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}
