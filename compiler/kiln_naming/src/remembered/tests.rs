use kiln_ir::ValueType;
use pretty_assertions::assert_eq;

use super::*;
use crate::strategy::NamingStrategy;
use crate::writer::OutputSourceWriter;

fn replay(source: &RememberedSource, mut naming: NamingStrategy, minified: bool) -> String {
    let mut out = OutputSourceWriter::new(&mut naming, minified);
    source.replay(&mut out);
    out.finish()
}

fn sample() -> RememberedSource {
    let mut source = RememberedSource::new();
    source.append("var ");
    source.append_class("app.Point");
    source.ws();
    source.append("=");
    source.ws();
    source.append_function("alloc");
    source.append("();");
    source.newline();
    source.append_field(&FieldReference::new("app.Point", "x"));
    source.append(".");
    source.append_method(&MethodDescriptor::new("norm", vec![], ValueType::DOUBLE));
    source.append("()");
    source
}

#[test]
fn commands_interleave_runs_and_references() {
    let mut source = sample();
    source.flush();
    assert_eq!(
        source.commands(),
        &[
            TEXT_RUN | 3,
            CLASS,
            WS,
            TEXT_RUN,
            WS,
            FUNCTION,
            TEXT_RUN | 2,
            NEWLINE,
            FIELD,
            TEXT_RUN,
            METHOD,
            TEXT_RUN | 1,
        ]
    );
    assert_eq!(source.chars(), "var =();.()");
}

#[test]
fn long_text_is_split_into_runs() {
    let mut source = RememberedSource::new();
    source.append(&"x".repeat(300));
    source.flush();
    assert_eq!(source.commands(), &[0xFF, 0xFF, TEXT_RUN | 43]);
}

#[test]
fn runs_count_characters() {
    let mut source = RememberedSource::new();
    source.append("ü→");
    source.append_class("A");
    source.append("é");
    let rendered = replay(&source, NamingStrategy::readable(), false);
    assert_eq!(rendered, "ü→Aé");
    assert_eq!(source.commands(), &[TEXT_RUN | 1, CLASS]);
}

#[test]
fn replay_resolves_names_late() {
    let source = sample();
    assert_eq!(
        replay(&source, NamingStrategy::readable(), false),
        "var a_Point = alloc();\nf_x.norm()"
    );
    assert_eq!(
        replay(&source, NamingStrategy::minifying(), true),
        "var a=b();\na.b()"
    );
}

#[test]
fn replay_into_another_recording_is_identical() {
    let source = sample();
    let mut copy = RememberedSource::new();
    source.replay(&mut copy);

    let mut original = sample();
    original.flush();
    copy.flush();
    assert_eq!(copy.commands(), original.commands());
    assert_eq!(copy.chars(), original.chars());
}

#[test]
#[should_panic(expected = "unknown remembered source command 0x7f")]
fn unknown_commands_are_rejected() {
    let source = RememberedSource {
        commands: vec![WS, 0x7F],
        ..RememberedSource::default()
    };
    replay(&source, NamingStrategy::readable(), false);
}

#[test]
#[should_panic(expected = "has no recorded symbol")]
fn references_need_a_recorded_symbol() {
    let source = RememberedSource {
        commands: vec![CLASS],
        ..RememberedSource::default()
    };
    replay(&source, NamingStrategy::readable(), false);
}
