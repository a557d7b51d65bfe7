use kiln_debuginfo::lines::{LineEntry, LineTableReader};
use kiln_debuginfo::{CLASS_LAYOUT_SECTION, LINES_SECTION, VARIABLES_SECTION};
use kiln_ir::{
    ElementModifiers, MethodBody, MethodDescriptor, MethodReference, TextLocation, VariableNode,
};
use kiln_target::{InstrKind, LocalId, ValType};
use pretty_assertions::assert_eq;

use super::*;

fn at(line: u32) -> TextLocation {
    TextLocation::new("Main.kiln", line)
}

fn method(variables: Vec<VariableNode>) -> MethodNode {
    MethodNode::new(
        MethodReference::new("app.Main", MethodDescriptor::new("run", vec![], ValueType::INT)),
        ElementModifiers::STATIC,
        MethodBody::Regular {
            arena: kiln_ir::AstArena::new(),
            statement: kiln_ir::StmtId::new(0),
            variables,
        },
    )
}

/// `n = 1; return n` with the statements on lines `first` and `first + 1`.
fn function(first: u32) -> Function {
    let local = LocalId::new(1);
    Function {
        name: Arc::from("app.Main.run()I"),
        param_count: 0,
        result: Some(ValType::I32),
        locals: vec![ValType::I32, ValType::I32],
        body: vec![
            Instr::set_local(local, Instr::i32_const(1)).at(Some(&at(first))),
            Instr::new(InstrKind::Return(Some(Box::new(Instr::get_local(local)))))
                .at(Some(&at(first + 1))),
        ],
    }
}

fn section(sections: &[DebugSection], name: &str) -> Option<Vec<u8>> {
    sections
        .iter()
        .find(|section| section.name == name)
        .map(|section| section.data.clone())
}

fn rows(sections: &[DebugSection]) -> Vec<LineEntry> {
    let data = section(sections, LINES_SECTION).unwrap_or_default();
    LineTableReader::new(&data)
        .collect::<Result<_, _>>()
        .unwrap_or_else(|error| panic!("bad line table: {error}"))
}

// === Lines ===

#[test]
fn located_instructions_are_numbered_in_pre_order() {
    let mut recorder = DebugRecorder::new(DebugLevel::LinesOnly);
    recorder.record_function(&method(vec![]), &function(3));
    assert_eq!(
        rows(&recorder.finish()),
        vec![
            LineEntry::Location {
                ptr: 0,
                file: 1,
                line: 3
            },
            LineEntry::Location {
                ptr: 2,
                file: 1,
                line: 4
            },
        ]
    );
}

#[test]
fn functions_continue_the_pointer() {
    let mut recorder = DebugRecorder::new(DebugLevel::LinesOnly);
    recorder.record_function(&method(vec![]), &function(3));
    recorder.record_function(&method(vec![]), &function(20));
    let pointers: Vec<(u32, u32)> = rows(&recorder.finish())
        .into_iter()
        .filter_map(|row| match row {
            LineEntry::Location { ptr, line, .. } => Some((ptr, line)),
            _ => None,
        })
        .collect();
    assert_eq!(pointers, vec![(0, 3), (2, 4), (4, 20), (6, 21)]);
}

// === Variables ===

#[test]
fn named_variables_span_their_function() {
    let variables = vec![
        VariableNode::new(1, ValueType::INT).named("n"),
        VariableNode::new(2, ValueType::INT),
    ];
    let mut recorder = DebugRecorder::new(DebugLevel::Full);
    recorder.record_function(&method(variables), &function(3));

    // Strings: app, Main, run, Main.kiln, n.
    assert_eq!(
        section(&recorder.finish(), VARIABLES_SECTION),
        Some(vec![0, 1, 4, 0, 1, 0, 4, 1])
    );
}

#[test]
fn lines_only_skips_variables() {
    let variables = vec![VariableNode::new(1, ValueType::INT).named("n")];
    let mut recorder = DebugRecorder::new(DebugLevel::LinesOnly);
    recorder.record_function(&method(variables), &function(3));
    assert_eq!(section(&recorder.finish(), VARIABLES_SECTION), None);
}

// === Class layout ===

fn field(name: &str, ty: ValueType, modifiers: ElementModifiers) -> FieldNode {
    FieldNode::new(name, ty, modifiers)
}

#[test]
fn parents_are_laid_out_first() {
    let mut base = ClassNode::new("Base");
    base.fields = vec![
        field("COUNT", ValueType::LONG, ElementModifiers::STATIC),
        field("id", ValueType::INT, ElementModifiers::empty()),
    ];
    let mut derived = ClassNode::new("Derived");
    derived.parent = Some(Arc::from("Base"));
    derived.fields = vec![
        field("flag", ValueType::BOOLEAN, ElementModifiers::empty()),
        field("next", ValueType::object("Derived"), ElementModifiers::empty()),
    ];

    let mut recorder = DebugRecorder::new(DebugLevel::Full);
    recorder.record_layouts(&[derived, base]);

    assert_eq!(
        section(&recorder.finish(), CLASS_LAYOUT_SECTION),
        Some(vec![
            0, 0, 0, 0, 12, // Base: no parent, address 0, size 12
            5, 1, 0x80, 0x80, 0x08, // static COUNT at 0x10000
            kiln_debuginfo::END_STATIC,
            4, 2, 16, // id at 8, after the header
            kiln_debuginfo::END_FIELDS,
            0, 1, 1, 0x80, 0x01, 20, // Derived: parent record 0, address 64
            kiln_debuginfo::END_STATIC,
            0, 4, 24, // flag at 12
            8, 5, 8, // next aligned to 16
            kiln_debuginfo::END_FIELDS,
        ])
    );
}

#[test]
fn cyclic_hierarchy_terminates() {
    let mut a = ClassNode::new("A");
    a.parent = Some(Arc::from("B"));
    let mut b = ClassNode::new("B");
    b.parent = Some(Arc::from("A"));

    let mut recorder = DebugRecorder::new(DebugLevel::Full);
    recorder.record_layouts(&[a, b]);
    assert!(section(&recorder.finish(), CLASS_LAYOUT_SECTION).is_some());
}

#[test]
fn layouts_need_full_level() {
    let mut recorder = DebugRecorder::new(DebugLevel::LinesOnly);
    recorder.record_layouts(&[ClassNode::new("Base")]);
    assert!(recorder.finish().is_empty());
}

#[test]
fn alignment() {
    assert_eq!(align(13, 4), 16);
    assert_eq!(align(16, 8), 16);
    assert_eq!(align(5, 0), 5);
}
