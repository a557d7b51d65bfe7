//! Symbolic references to methods and fields.

use std::fmt;
use std::sync::Arc;

use crate::ValueType;

/// Name plus signature of a method, independent of its owner.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub name: Arc<str>,
    pub parameters: Vec<ValueType>,
    pub result: ValueType,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<Arc<str>>, parameters: Vec<ValueType>, result: ValueType) -> Self {
        Self {
            name: name.into(),
            parameters,
            result,
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }
}

/// `name(params)result`, e.g. `get(I)Ljava.lang.Object;`.
impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for parameter in &self.parameters {
            write!(f, "{parameter}")?;
        }
        write!(f, "){}", self.result)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A method identified by owner class and descriptor.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MethodReference {
    pub class: Arc<str>,
    pub descriptor: MethodDescriptor,
}

impl MethodReference {
    pub fn new(class: impl Into<Arc<str>>, descriptor: MethodDescriptor) -> Self {
        Self {
            class: class.into(),
            descriptor,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn result(&self) -> &ValueType {
        &self.descriptor.result
    }

    pub fn parameter_type(&self, index: usize) -> Option<&ValueType> {
        self.descriptor.parameters.get(index)
    }
}

impl fmt::Display for MethodReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.descriptor)
    }
}

impl fmt::Debug for MethodReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A field identified by owner class and name.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FieldReference {
    pub class: Arc<str>,
    pub name: Arc<str>,
}

impl FieldReference {
    pub fn new(class: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.name)
    }
}

impl fmt::Debug for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
