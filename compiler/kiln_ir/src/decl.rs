//! Class, field and method declarations.

use std::sync::Arc;

use bitflags::bitflags;

use crate::{AstArena, ConstantValue, MethodReference, StmtId, ValueType};

bitflags! {
    /// Declaration modifiers.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ElementModifiers: u32 {
        const ABSTRACT = 1 << 0;
        const INTERFACE = 1 << 1;
        const FINAL = 1 << 2;
        const ENUM = 1 << 3;
        const ANNOTATION = 1 << 4;
        const SYNTHETIC = 1 << 5;
        const BRIDGE = 1 << 6;
        const DEPRECATED = 1 << 7;
        const NATIVE = 1 << 8;
        const STATIC = 1 << 9;
        const STRICT = 1 << 10;
        const SUPER = 1 << 11;
        const SYNCHRONIZED = 1 << 12;
        const TRANSIENT = 1 << 13;
        const VARARGS = 1 << 14;
        const VOLATILE = 1 << 15;
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum AccessLevel {
    Private,
    #[default]
    Package,
    Protected,
    Public,
}

/// A local variable slot of a method body.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableNode {
    pub index: u32,
    pub ty: ValueType,
    /// Debug name; `None` for synthetic temporaries.
    pub name: Option<Arc<str>>,
}

impl VariableNode {
    pub fn new(index: u32, ty: ValueType) -> Self {
        Self {
            index,
            ty,
            name: None,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Body of a method.
///
/// Variable `0` is the receiver slot. Static methods leave it unused, and
/// parameters always occupy slots `1..=n`.
#[derive(Clone, Debug)]
pub enum MethodBody {
    Regular {
        arena: AstArena,
        statement: StmtId,
        variables: Vec<VariableNode>,
    },
    /// A resumable body split into parts; `GotoPart` moves between them.
    Async {
        arena: AstArena,
        parts: Vec<StmtId>,
        variables: Vec<VariableNode>,
    },
    Native,
}

impl MethodBody {
    pub fn variables(&self) -> &[VariableNode] {
        match self {
            MethodBody::Regular { variables, .. } | MethodBody::Async { variables, .. } => {
                variables
            }
            MethodBody::Native => &[],
        }
    }

    pub fn arena(&self) -> Option<&AstArena> {
        match self {
            MethodBody::Regular { arena, .. } | MethodBody::Async { arena, .. } => Some(arena),
            MethodBody::Native => None,
        }
    }

    pub fn arena_mut(&mut self) -> Option<&mut AstArena> {
        match self {
            MethodBody::Regular { arena, .. } | MethodBody::Async { arena, .. } => Some(arena),
            MethodBody::Native => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MethodNode {
    pub reference: MethodReference,
    pub modifiers: ElementModifiers,
    pub access: AccessLevel,
    pub body: MethodBody,
}

impl MethodNode {
    pub fn new(reference: MethodReference, modifiers: ElementModifiers, body: MethodBody) -> Self {
        Self {
            reference,
            modifiers,
            access: AccessLevel::Public,
            body,
        }
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(ElementModifiers::STATIC)
    }

    pub fn is_async(&self) -> bool {
        matches!(self.body, MethodBody::Async { .. })
    }

    pub fn variable_count(&self) -> usize {
        self.body.variables().len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldNode {
    pub name: Arc<str>,
    pub ty: ValueType,
    pub modifiers: ElementModifiers,
    pub access: AccessLevel,
    pub initial_value: Option<ConstantValue>,
}

impl FieldNode {
    pub fn new(name: impl Into<Arc<str>>, ty: ValueType, modifiers: ElementModifiers) -> Self {
        Self {
            name: name.into(),
            ty,
            modifiers,
            access: AccessLevel::Private,
            initial_value: None,
        }
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(ElementModifiers::STATIC)
    }
}

#[derive(Clone, Debug)]
pub struct ClassNode {
    pub name: Arc<str>,
    pub parent: Option<Arc<str>>,
    pub interfaces: Vec<Arc<str>>,
    pub modifiers: ElementModifiers,
    pub access: AccessLevel,
    pub fields: Vec<FieldNode>,
    pub methods: Vec<MethodNode>,
}

impl ClassNode {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            parent: Some(Arc::from(crate::ROOT_CLASS)),
            interfaces: Vec::new(),
            modifiers: ElementModifiers::empty(),
            access: AccessLevel::Public,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn is_interface(&self) -> bool {
        self.modifiers.contains(ElementModifiers::INTERFACE)
    }
}
