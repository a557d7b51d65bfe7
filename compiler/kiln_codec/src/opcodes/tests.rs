use super::*;

#[test]
fn every_operation_decodes_to_itself() {
    for &op in IrOperation::ALL {
        assert_eq!(
            OPCODES[usize::from(operation_opcode(op))],
            Some(Opcode::Operation(op)),
            "{op:?}"
        );
    }
}

#[test]
fn short_forms_carry_their_payload() {
    assert_eq!(OPCODES[usize::from(BACK_REF_3)], Some(Opcode::BackRef(Some(3))));
    assert_eq!(OPCODES[usize::from(PARAMETER_0 + 3)], Some(Opcode::Parameter(Some(3))));
    assert_eq!(OPCODES[usize::from(TUPLE_2 + 5)], Some(Opcode::Tuple(Some(7))));
    assert_eq!(
        OPCODES[usize::from(TUPLE_COMPONENT_0 + 7)],
        Some(Opcode::TupleComponent(Some(7)))
    );
    assert_eq!(OPCODES[usize::from(TUPLE_COMPONENT)], Some(Opcode::TupleComponent(None)));
}

#[test]
fn scope_references_match_their_scope_kind() {
    assert_eq!(
        OPCODES[usize::from(LOOP_CONTINUE_0)],
        Some(Opcode::ScopeRef {
            reference: ScopeRef::LoopContinue,
            near: true,
        })
    );
    assert_eq!(
        OPCODES[usize::from(enter_opcode(ScopeKind::Loop))],
        Some(Opcode::Enter(ScopeKind::Loop))
    );
    assert_eq!(ScopeRef::CaughtException.kind(), ScopeKind::TryCatch);
    assert_eq!(ScopeRef::LoopHeader.kind(), ScopeKind::Loop);
}

#[test]
fn unassigned_bytes_stay_empty() {
    assert_eq!(OPCODES[usize::from(ENTER_TRY_CATCH) + 1], None);
    assert_eq!(OPCODES[0xFF], None);
    let assigned = OPCODES.iter().filter(|entry| entry.is_some()).count();
    // Constants, operations, then stack-shape, scope and member opcodes.
    assert_eq!(assigned, 16 + IrOperation::ALL.len() + 60);
}
