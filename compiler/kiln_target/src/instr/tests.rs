use pretty_assertions::assert_eq;

use super::*;

fn constants(instrs: &[&Instr]) -> Vec<i32> {
    instrs
        .iter()
        .filter_map(|instr| match instr.kind {
            InstrKind::I32Const(value) => Some(value),
            _ => None,
        })
        .collect()
}

#[test]
fn conditional_children_follow_evaluation_order() {
    let conditional = Instr::new(InstrKind::Conditional {
        condition: Box::new(Instr::i32_const(0)),
        ty: None,
        then_body: vec![Instr::i32_const(1), Instr::i32_const(2)],
        else_body: vec![Instr::i32_const(3)],
    });
    assert_eq!(constants(&conditional.children()), vec![0, 1, 2, 3]);
}

#[test]
fn branch_result_precedes_condition() {
    let branch = Instr::branch(BlockId::new(0), Instr::i32_const(1), Some(Instr::i32_const(2)));
    assert_eq!(constants(&branch.children()), vec![2, 1]);
}

#[test]
fn leaves_have_no_children() {
    assert!(Instr::get_local(LocalId::new(0)).children().is_empty());
    assert!(Instr::new(InstrKind::Unreachable).children().is_empty());
}

#[test]
fn terminating_conditional_needs_both_arms() {
    let returning = || Instr::new(InstrKind::Return(None));
    let both = Instr::new(InstrKind::Conditional {
        condition: Box::new(Instr::i32_const(1)),
        ty: None,
        then_body: vec![returning()],
        else_body: vec![returning()],
    });
    assert!(both.is_terminating());

    let one = Instr::new(InstrKind::Conditional {
        condition: Box::new(Instr::i32_const(1)),
        ty: None,
        then_body: vec![returning()],
        else_body: vec![],
    });
    assert!(!one.is_terminating());
}
