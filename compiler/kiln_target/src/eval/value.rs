use std::fmt;
use std::sync::Arc;

use kiln_ir::ArrayType;
use rustc_hash::FxHashMap;

use crate::ValType;

/// Handle of a heap object.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef(u32);

impl ObjectRef {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A runtime value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Ref(Option<ObjectRef>),
}

impl Value {
    pub const NULL: Value = Value::Ref(None);

    /// Zero value of `ty`, used for fresh locals, fields and array slots.
    pub const fn zero(ty: ValType) -> Value {
        match ty {
            ValType::I32 => Value::I32(0),
            ValType::I64 => Value::I64(0),
            ValType::F32 => Value::F32(0.0),
            ValType::F64 => Value::F64(0.0),
            ValType::Ref => Value::Ref(None),
        }
    }

    pub const fn as_i32(self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_ref(self) -> Option<Option<ObjectRef>> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }
}

/// Heap object payloads.
#[derive(Clone, Debug, PartialEq)]
pub enum HeapObject {
    Struct {
        class: Arc<str>,
        fields: FxHashMap<Arc<str>, Value>,
    },
    Array {
        element: ArrayType,
        items: Vec<Value>,
    },
    String(Arc<str>),
}

/// Object storage. Objects are never collected.
#[derive(Clone, Debug, Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
}

impl Heap {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "heap sizes never exceed u32"
    )]
    pub fn alloc(&mut self, object: HeapObject) -> ObjectRef {
        let id = ObjectRef(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    pub fn new_struct(&mut self, class: Arc<str>) -> ObjectRef {
        self.alloc(HeapObject::Struct {
            class,
            fields: FxHashMap::default(),
        })
    }

    pub fn new_array(&mut self, element: ArrayType, length: usize) -> ObjectRef {
        let zero = Value::zero(crate::infer::element_type(element));
        self.alloc(HeapObject::Array {
            element,
            items: vec![zero; length],
        })
    }

    pub fn new_string(&mut self, value: Arc<str>) -> ObjectRef {
        self.alloc(HeapObject::String(value))
    }

    #[inline]
    pub fn get(&self, object: ObjectRef) -> &HeapObject {
        &self.objects[object.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, object: ObjectRef) -> &mut HeapObject {
        &mut self.objects[object.index()]
    }

    /// Class name of an object; arrays report their descriptor.
    pub fn class_of(&self, object: ObjectRef) -> Arc<str> {
        match self.get(object) {
            HeapObject::Struct { class, .. } => Arc::clone(class),
            HeapObject::Array { element, .. } => Arc::from(array_descriptor(*element)),
            HeapObject::String(_) => Arc::from("java.lang.String"),
        }
    }

    /// Text of a string object, if `object` is one.
    pub fn string(&self, object: ObjectRef) -> Option<&str> {
        match self.get(object) {
            HeapObject::String(text) => Some(text),
            _ => None,
        }
    }
}

/// Descriptor used as the class name of arrays: `[I`, `[Ljava.lang.Object;`.
pub const fn array_descriptor(element: ArrayType) -> &'static str {
    match element {
        ArrayType::Byte => "[B",
        ArrayType::Short => "[S",
        ArrayType::Char => "[C",
        ArrayType::Int => "[I",
        ArrayType::Long => "[J",
        ArrayType::Float => "[F",
        ArrayType::Double => "[D",
        ArrayType::Object => "[Ljava.lang.Object;",
    }
}

/// Narrow `value` the way a store into an array of `element` does.
pub(crate) fn narrow(element: ArrayType, value: Value) -> Value {
    match (element, value) {
        (ArrayType::Byte, Value::I32(v)) => Value::I32(i32::from(v as i8)),
        (ArrayType::Short, Value::I32(v)) => Value::I32(i32::from(v as i16)),
        (ArrayType::Char, Value::I32(v)) => Value::I32(i32::from(v as u16)),
        _ => value,
    }
}
