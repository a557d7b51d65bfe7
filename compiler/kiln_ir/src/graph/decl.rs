//! Declarations referenced from graph nodes. The codec interns these into
//! side tables and addresses them by index.

use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IrClass {
    pub name: Arc<str>,
}

impl IrClass {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }
}

/// Scalar type of a graph value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IrType {
    Void,
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Object,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IrFunction {
    pub name: Arc<str>,
    pub parameters: Vec<IrType>,
    pub result: IrType,
}

impl IrFunction {
    pub fn new(name: impl Into<Arc<str>>, parameters: Vec<IrType>, result: IrType) -> Self {
        Self {
            name: name.into(),
            parameters,
            result,
        }
    }
}

/// An instance method. Calls pass the receiver before the parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IrMethod {
    pub class: IrClass,
    pub name: Arc<str>,
    pub parameters: Vec<IrType>,
    pub result: IrType,
}

impl IrMethod {
    pub fn new(
        class: IrClass,
        name: impl Into<Arc<str>>,
        parameters: Vec<IrType>,
        result: IrType,
    ) -> Self {
        Self {
            class,
            name: name.into(),
            parameters,
            result,
        }
    }

    /// Operand count of a call, receiver included.
    pub fn arity(&self) -> usize {
        self.parameters.len() + 1
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IrField {
    pub class: IrClass,
    pub name: Arc<str>,
    pub ty: IrType,
}

impl IrField {
    pub fn new(class: IrClass, name: impl Into<Arc<str>>, ty: IrType) -> Self {
        Self {
            class,
            name: name.into(),
            ty,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IrGlobal {
    pub name: Arc<str>,
    pub ty: IrType,
}

impl IrGlobal {
    pub fn new(name: impl Into<Arc<str>>, ty: IrType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Arrays of primitives, in wire tag order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveArrayKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveArrayKind {
    pub const ALL: [PrimitiveArrayKind; 8] = [
        PrimitiveArrayKind::Boolean,
        PrimitiveArrayKind::Byte,
        PrimitiveArrayKind::Short,
        PrimitiveArrayKind::Char,
        PrimitiveArrayKind::Int,
        PrimitiveArrayKind::Long,
        PrimitiveArrayKind::Float,
        PrimitiveArrayKind::Double,
    ];

    pub const fn tag(self) -> u8 {
        self as u8
    }
}

/// Target of a cast or an instanceof test.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IrReferenceType {
    PrimitiveArray(PrimitiveArrayKind),
    Object(IrClass),
    Array(Box<IrReferenceType>),
}

impl IrReferenceType {
    /// Strip array levels: `(innermost, degree)`.
    pub fn split_degree(&self) -> (&IrReferenceType, u32) {
        let mut current = self;
        let mut degree = 0;
        while let IrReferenceType::Array(element) = current {
            current = element;
            degree += 1;
        }
        (current, degree)
    }

    /// Wrap `self` in `degree` array levels.
    #[must_use]
    pub fn with_degree(self, degree: u32) -> IrReferenceType {
        (0..degree).fold(self, |ty, _| IrReferenceType::Array(Box::new(ty)))
    }
}
