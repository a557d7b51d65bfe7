#![allow(clippy::unwrap_used, reason = "Tests can panic")]

//! End-to-end compilation: classes go through the driver and the lowered
//! module is run on the reference evaluator.

use std::sync::Arc;

use kiln_debuginfo::lines::{LineEntry, LineTableReader};
use kiln_debuginfo::{read_debug_file, CLASS_LAYOUT_SECTION, LINES_SECTION};
use kiln_driver::{CompileOptions, CompiledUnit, Compiler, DebugLevel};
use kiln_ir::{
    AstArena, BinaryOperation, ClassNode, ConstantValue, ElementModifiers, ExprId, ExprKind,
    InvocationKind, MethodBody, MethodDescriptor, MethodNode, MethodReference, OperationType,
    Stmt, StmtId, StmtKind, SwitchClause, TextLocation, ValueType, VariableNode,
};
use kiln_target::eval::{Machine, Outcome, StandardRuntime, Value};
use kiln_target::{Instr, InstrKind};
use pretty_assertions::assert_eq;

const CLASS: &str = "app.Main";
const FILE: &str = "app/Main.kiln";

// ── Fixtures ──

/// One static method of [`CLASS`] taking int parameters.
struct Method {
    arena: AstArena,
    params: usize,
}

impl Method {
    fn new(params: usize) -> Self {
        Self {
            arena: AstArena::new(),
            params,
        }
    }

    fn int(&mut self, value: i32) -> ExprId {
        self.arena.expr_of(ExprKind::Constant(ConstantValue::Int(value)))
    }

    fn var(&mut self, index: u32) -> ExprId {
        self.arena.expr_of(ExprKind::Variable { index })
    }

    fn op(&mut self, op: BinaryOperation, first: ExprId, second: ExprId) -> ExprId {
        self.arena.expr_of(ExprKind::Binary {
            op,
            ty: Some(OperationType::Int),
            first,
            second,
        })
    }

    fn call(&mut self, name: &str) -> ExprId {
        self.arena.expr_of(ExprKind::Invocation {
            kind: InvocationKind::Static,
            method: reference(name, 0),
            arguments: Vec::new(),
        })
    }

    fn stmt(&mut self, kind: StmtKind) -> StmtId {
        self.arena.stmt_of(kind)
    }

    fn ret(&mut self, value: ExprId) -> StmtId {
        self.stmt(StmtKind::Return(Some(value)))
    }

    fn ret_at(&mut self, value: ExprId, line: u32) -> StmtId {
        self.arena
            .alloc_stmt(Stmt::new(StmtKind::Return(Some(value))).at(TextLocation::new(FILE, line)))
    }

    fn build(mut self, name: &str, body: Vec<StmtId>) -> MethodNode {
        let statement = self.stmt(StmtKind::Sequence(body));
        let variables = (1..=self.params)
            .map(|index| {
                VariableNode::new(u32::try_from(index).unwrap(), ValueType::INT)
                    .named(format!("p{index}"))
            })
            .collect();
        MethodNode::new(
            reference(name, self.params),
            ElementModifiers::STATIC,
            MethodBody::Regular {
                arena: self.arena,
                statement,
                variables,
            },
        )
    }
}

fn reference(name: &str, params: usize) -> MethodReference {
    MethodReference::new(
        CLASS,
        MethodDescriptor::new(name, vec![ValueType::INT; params], ValueType::INT),
    )
}

fn class(methods: Vec<MethodNode>) -> ClassNode {
    let mut class = ClassNode::new(CLASS);
    class.methods = methods;
    class
}

fn compile(options: CompileOptions, methods: Vec<MethodNode>) -> CompiledUnit {
    kiln_driver::init_tracing();
    Compiler::new(options).compile(vec![class(methods)]).unwrap()
}

fn run(unit: &CompiledUnit, name: &str, args: &[i32]) -> Outcome {
    let mut machine = Machine::new(&unit.module, StandardRuntime::new());
    let args = args.iter().map(|&arg| Value::I32(arg)).collect();
    machine.invoke(name, args).unwrap()
}

fn returned(value: i32) -> Outcome {
    Outcome::Returned(Some(Value::I32(value)))
}

fn has(body: &[Instr], predicate: impl Fn(&InstrKind) -> bool) -> bool {
    let mut pending: Vec<&Instr> = body.iter().collect();
    while let Some(instr) = pending.pop() {
        if predicate(&instr.kind) {
            return true;
        }
        pending.extend(instr.children());
    }
    false
}

/// `switch (p1) { case -5: 10; case 0: 20; case 7: 30; case 1000: 40 }`, else 0.
fn pick() -> MethodNode {
    let mut m = Method::new(1);
    let clauses = [(-5, 10), (0, 20), (7, 30), (1000, 40)]
        .into_iter()
        .map(|(label, result)| {
            let value = m.int(result);
            SwitchClause::new([label], vec![m.ret(value)])
        })
        .collect();
    let value = m.var(1);
    let switch = m.stmt(StmtKind::Switch {
        value,
        clauses,
        default: Vec::new(),
    });
    let zero = m.int(0);
    let fallback = m.ret(zero);
    m.build("pick", vec![switch, fallback])
}

// ── Switch strategies ──

#[test]
fn switch_agrees_under_both_strategies() {
    let searched = compile(CompileOptions::default(), vec![pick()]);
    let tabled = compile(
        CompileOptions::default().with_switch_table_threshold(2000),
        vec![pick()],
    );
    let name = "app.Main.pick(I)I";

    let searched_body = &searched.module.function(name).unwrap().body;
    let tabled_body = &tabled.module.function(name).unwrap().body;
    assert!(!has(searched_body, |kind| matches!(kind, InstrKind::Switch { .. })));
    assert!(has(tabled_body, |kind| matches!(kind, InstrKind::Switch { .. })));

    for (input, expected) in [(-5, 10), (0, 20), (7, 30), (1000, 40), (3, 0), (-6, 0), (1001, 0)] {
        assert_eq!(run(&searched, name, &[input]), returned(expected), "input {input}");
        assert_eq!(run(&tabled, name, &[input]), returned(expected), "input {input}");
    }
}

// ── Optimization ──

/// `if (2 + 3 == 5) return 1; else return 2;`
fn folded() -> MethodNode {
    let mut m = Method::new(0);
    let two = m.int(2);
    let three = m.int(3);
    let sum = m.op(BinaryOperation::Add, two, three);
    let five = m.int(5);
    let test = m.op(BinaryOperation::Equals, sum, five);
    let one = m.int(1);
    let then = m.ret(one);
    let two = m.int(2);
    let otherwise = m.ret(two);
    let conditional = m.stmt(StmtKind::Conditional {
        condition: test,
        consequent: vec![then],
        alternative: vec![otherwise],
    });
    m.build("folded", vec![conditional])
}

#[test]
fn constant_branches_are_removed_before_lowering() {
    let name = "app.Main.folded()I";
    let optimized = compile(CompileOptions::default(), vec![folded()]);
    let body = &optimized.module.function(name).unwrap().body;
    assert!(!has(body, |kind| matches!(
        kind,
        InstrKind::IntBinary { .. } | InstrKind::Conditional { .. }
    )));
    assert_eq!(run(&optimized, name, &[]), returned(1));

    let plain = compile(CompileOptions::default().with_optimize(false), vec![folded()]);
    assert!(has(&plain.module.function(name).unwrap().body, |kind| {
        matches!(kind, InstrKind::IntBinary { .. })
    }));
    assert_eq!(run(&plain, name, &[]), returned(1));
}

// ── Parallel lowering ──

fn squares() -> Vec<MethodNode> {
    (0..24)
        .map(|i| {
            let mut m = Method::new(1);
            let x = m.var(1);
            let k = m.int(i);
            let product = m.op(BinaryOperation::Multiply, x, k);
            let done = m.ret(product);
            m.build(&format!("times{i}"), vec![done])
        })
        .collect()
}

#[test]
fn parallel_output_matches_sequential() {
    let sequential = compile(CompileOptions::default(), squares());
    let parallel = compile(CompileOptions::default().with_parallel(true), squares());

    assert_eq!(sequential.exports, parallel.exports);
    assert_eq!(sequential.module.functions.len(), 24);
    for (name, function) in &sequential.module.functions {
        assert_eq!(parallel.module.function(name), Some(function));
    }
    assert_eq!(run(&parallel, "app.Main.times7(I)I", &[6]), returned(42));
}

// ── Managed targets ──

#[test]
fn managed_calls_record_call_sites() {
    let mut callee = Method::new(0);
    let answer = callee.int(42);
    let done = callee.ret(answer);
    let callee = callee.build("answer", vec![done]);

    let mut caller = Method::new(0);
    let call = caller.call("answer");
    let done = caller.ret(call);
    let caller = caller.build("caller", vec![done]);

    let unit = compile(CompileOptions::default().with_managed(true), vec![callee, caller]);
    let sites = unit.call_sites.get("app.Main.caller()I").unwrap();
    assert_eq!(sites.len(), 1);
    assert!(!unit.call_sites.contains_key("app.Main.answer()I"));
    assert_eq!(run(&unit, "app.Main.caller()I", &[]), returned(42));

    let unmanaged = compile(CompileOptions::default(), vec![pick()]);
    assert!(unmanaged.call_sites.is_empty());
}

// ── Naming ──

#[test]
fn exports_follow_the_naming_mode() {
    let readable = compile(CompileOptions::default(), vec![pick()]);
    assert_eq!(readable.exports, "export a_Main_pick = \"app.Main.pick(I)I\";\n");

    let minified = compile(CompileOptions::default().with_minified(true), vec![pick()]);
    assert_eq!(minified.exports, "export a=\"app.Main.pick(I)I\";");
}

// ── Debug information ──

fn located() -> MethodNode {
    let mut m = Method::new(1);
    let x = m.var(1);
    let one = m.int(1);
    let sum = m.op(BinaryOperation::Add, x, one);
    let done = m.ret_at(sum, 7);
    m.build("next", vec![done])
}

#[test]
fn debug_file_round_trips() {
    let unit = compile(CompileOptions::development(), vec![located()]);
    let file = unit.debug_file().unwrap().unwrap();
    let sections = read_debug_file(&file).unwrap();
    assert_eq!(sections, unit.debug_sections);

    let names: Vec<&str> = sections.iter().map(|section| section.name.as_str()).collect();
    assert!(names.contains(&LINES_SECTION));
    assert!(names.contains(&CLASS_LAYOUT_SECTION));

    let lines = sections
        .iter()
        .find(|section| section.name == LINES_SECTION)
        .unwrap();
    let rows: Vec<LineEntry> = LineTableReader::new(&lines.data)
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(matches!(
        rows.as_slice(),
        [LineEntry::Location { ptr: 0, line: 7, .. }]
    ));
}

#[test]
fn lines_only_drops_layouts() {
    let unit = compile(
        CompileOptions::default().with_debug_level(DebugLevel::LinesOnly),
        vec![located()],
    );
    let names: Vec<&str> = unit
        .debug_sections
        .iter()
        .map(|section| section.name.as_str())
        .collect();
    assert!(names.contains(&LINES_SECTION));
    assert!(!names.contains(&CLASS_LAYOUT_SECTION));
}

#[test]
fn no_debug_level_produces_no_file() {
    let unit = compile(CompileOptions::default(), vec![located()]);
    assert!(unit.debug_sections.is_empty());
    assert_eq!(unit.debug_file().unwrap(), None);
}

#[test]
fn class_hierarchy_reaches_the_module() {
    let mut child = ClassNode::new("app.Child");
    child.parent = Some(Arc::from(CLASS));
    let unit = Compiler::new(CompileOptions::default())
        .compile(vec![class(vec![pick()]), child])
        .unwrap();
    assert!(unit.module.classes.is_subtype("app.Child", CLASS));
    assert!(!unit.module.classes.is_subtype(CLASS, "app.Child"));
}
