use pretty_assertions::assert_eq;

use super::*;

fn location() -> TextLocation {
    TextLocation::new("demo/Main.java", 7)
}

// === Types and references ===

#[test]
fn value_type_descriptors() {
    assert_eq!(ValueType::INT.to_string(), "I");
    assert_eq!(ValueType::array_of(ValueType::LONG).to_string(), "[J");
    assert_eq!(
        ValueType::object("java.lang.String").to_string(),
        "Ljava.lang.String;"
    );
}

#[test]
fn method_reference_display() {
    let method = MethodReference::new(
        "demo.Main",
        MethodDescriptor::new("max", vec![ValueType::INT, ValueType::INT], ValueType::INT),
    );
    assert_eq!(method.to_string(), "demo.Main.max(II)I");
}

#[test]
fn array_type_of_boolean_is_byte() {
    assert_eq!(ValueType::BOOLEAN.array_type(), ArrayType::Byte);
    assert_eq!(ValueType::object("X").array_type(), ArrayType::Object);
}

// === Deep clone ===

#[test]
fn deep_clone_preserves_diamond_sharing() {
    let mut arena = AstArena::new();
    let shared = arena.expr_of(ExprKind::Variable { index: 1 });
    let sum = arena.alloc_expr(
        Expr::new(ExprKind::Binary {
            op: BinaryOperation::Add,
            ty: Some(OperationType::Int),
            first: shared,
            second: shared,
        })
        .at(location()),
    );

    let copy = arena.deep_clone_expr(sum);
    assert_ne!(copy, sum);
    let ExprKind::Binary { first, second, .. } = arena.expr(copy).kind.clone() else {
        panic!("expected binary");
    };
    assert_eq!(first, second);
    assert_ne!(first, shared);
    assert_eq!(arena.expr(copy).location, Some(location()));
}

#[test]
fn deep_clone_redirects_inner_break() {
    let mut arena = AstArena::new();
    let body = arena.stmt_of(StmtKind::Sequence(Vec::new()));
    let block = arena.stmt_of(StmtKind::Block {
        body: vec![body],
        labeled: true,
    });
    let brk = arena.stmt_of(StmtKind::Break {
        target: Some(block),
    });
    if let StmtKind::Block { body, .. } = &mut arena.stmt_mut(block).kind {
        body.push(brk);
    }

    let copy = arena.deep_clone_stmt(block);
    let StmtKind::Block { body, .. } = arena.stmt(copy).kind.clone() else {
        panic!("expected block");
    };
    assert_eq!(
        arena.stmt(body[1]).kind,
        StmtKind::Break { target: Some(copy) }
    );
}

#[test]
fn deep_clone_keeps_outer_break() {
    let mut arena = AstArena::new();
    let outer = arena.stmt_of(StmtKind::Block {
        body: Vec::new(),
        labeled: true,
    });
    let brk = arena.stmt_of(StmtKind::Break {
        target: Some(outer),
    });
    let copy = arena.deep_clone_stmt(brk);
    assert_eq!(
        arena.stmt(copy).kind,
        StmtKind::Break {
            target: Some(outer)
        }
    );
}

#[test]
fn expr_children_in_evaluation_order() {
    let mut arena = AstArena::new();
    let index = arena.expr_of(ExprKind::Variable { index: 1 });
    let array = arena.expr_of(ExprKind::Variable { index: 2 });
    let check = ExprKind::BoundCheck {
        index,
        array: Some(array),
        lower: true,
    };
    assert_eq!(check.children().as_slice(), &[index, array]);
}

// === Declarations ===

#[test]
fn static_methods_report_modifiers() {
    let method = MethodNode::new(
        MethodReference::new("A", MethodDescriptor::new("f", Vec::new(), ValueType::Void)),
        ElementModifiers::STATIC | ElementModifiers::FINAL,
        MethodBody::Native,
    );
    assert!(method.is_static());
    assert!(!method.is_async());
    assert_eq!(method.variable_count(), 0);
}
