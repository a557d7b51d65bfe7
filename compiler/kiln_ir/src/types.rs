//! Value types of the statement/expression tree.

use std::fmt;
use std::sync::Arc;

/// Root of the class hierarchy.
pub const ROOT_CLASS: &str = "java.lang.Object";

/// Root of the exception hierarchy. A handler for this class catches everything.
pub const THROWABLE_CLASS: &str = "java.lang.Throwable";

/// Primitive value kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    /// Single-letter descriptor character.
    pub const fn descriptor(self) -> char {
        match self {
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Byte => 'B',
            PrimitiveType::Short => 'S',
            PrimitiveType::Char => 'C',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
        }
    }
}

/// Type of a value, a field or a method parameter.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Void,
    Primitive(PrimitiveType),
    Object(Arc<str>),
    Array(Arc<ValueType>),
}

impl ValueType {
    pub const INT: ValueType = ValueType::Primitive(PrimitiveType::Int);
    pub const LONG: ValueType = ValueType::Primitive(PrimitiveType::Long);
    pub const FLOAT: ValueType = ValueType::Primitive(PrimitiveType::Float);
    pub const DOUBLE: ValueType = ValueType::Primitive(PrimitiveType::Double);
    pub const BOOLEAN: ValueType = ValueType::Primitive(PrimitiveType::Boolean);

    pub fn object(class: impl Into<Arc<str>>) -> Self {
        ValueType::Object(class.into())
    }

    pub fn array_of(element: ValueType) -> Self {
        ValueType::Array(Arc::new(element))
    }

    /// `true` for objects and arrays.
    pub fn is_reference(&self) -> bool {
        matches!(self, ValueType::Object(_) | ValueType::Array(_))
    }

    /// Array element kind used by subscripts over arrays of this element type.
    pub fn array_type(&self) -> ArrayType {
        match self {
            ValueType::Primitive(PrimitiveType::Boolean | PrimitiveType::Byte) => ArrayType::Byte,
            ValueType::Primitive(PrimitiveType::Short) => ArrayType::Short,
            ValueType::Primitive(PrimitiveType::Char) => ArrayType::Char,
            ValueType::Primitive(PrimitiveType::Int) => ArrayType::Int,
            ValueType::Primitive(PrimitiveType::Long) => ArrayType::Long,
            ValueType::Primitive(PrimitiveType::Float) => ArrayType::Float,
            ValueType::Primitive(PrimitiveType::Double) => ArrayType::Double,
            ValueType::Void | ValueType::Object(_) | ValueType::Array(_) => ArrayType::Object,
        }
    }
}

/// Descriptor syntax: `I`, `[J`, `Ljava.lang.String;`, `V`.
impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Void => write!(f, "V"),
            ValueType::Primitive(kind) => write!(f, "{}", kind.descriptor()),
            ValueType::Object(class) => write!(f, "L{class};"),
            ValueType::Array(element) => write!(f, "[{element}"),
        }
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Numeric kind of an arithmetic or comparison operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OperationType {
    Int,
    Long,
    Float,
    Double,
}

impl OperationType {
    /// Short suffix used in runtime helper names (`i32`, `i64`, `f32`, `f64`).
    pub const fn suffix(self) -> &'static str {
        match self {
            OperationType::Int => "i32",
            OperationType::Long => "i64",
            OperationType::Float => "f32",
            OperationType::Double => "f64",
        }
    }
}

/// Storage kind of an array element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArrayType {
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Object,
}
