use std::sync::Arc;

use kiln_ir::{ArrayType, FieldReference, MethodReference, TextLocation, ValueType};
use kiln_pipeline::MemoCache;
use kiln_target::eval::{array_descriptor, multi_array_suffix, names};
use kiln_target::{method_function_name, Instr, InstrKind, LocalId, ValType};
use rustc_hash::FxHashSet;

use crate::{value_type, Backend};

const NULL_POINTER_EXCEPTION: &str = "java.lang.NullPointerException";
const CLASS_CAST_EXCEPTION: &str = "java.lang.ClassCastException";
const ARRAY_INDEX_EXCEPTION: &str = "java.lang.ArrayIndexOutOfBoundsException";

/// Reference backend over GC structs and arrays.
///
/// Objects are structs named by class, instance fields are struct fields and
/// static fields are globals named `Class.field`. Arrays are GC arrays, so
/// unwrapping is the identity.
///
/// Clones share one function name cache, so methods lowered on different
/// threads agree on a single name per callee.
#[derive(Clone, Debug, Default)]
pub struct GcBackend {
    managed: bool,
    initializers: FxHashSet<Arc<str>>,
    functions: Arc<MemoCache<MethodReference, Arc<str>>>,
}

impl GcBackend {
    pub fn new(managed: bool) -> Self {
        Self {
            managed,
            ..Self::default()
        }
    }

    /// Mark `class` as having a static initializer that must run before use.
    #[must_use]
    pub fn with_initializer(mut self, class: impl Into<Arc<str>>) -> Self {
        self.initializers.insert(class.into());
        self
    }

    fn throw_new(class: &str, location: Option<&TextLocation>) -> Instr {
        let exception = Instr::new(InstrKind::StructNew {
            class: Arc::from(class),
        });
        Instr::new(InstrKind::Throw(Box::new(exception))).at(location)
    }
}

/// Class name used for subtype tests against `ty`.
fn type_test_name(ty: &ValueType) -> Arc<str> {
    match ty {
        ValueType::Object(class) => Arc::clone(class),
        ValueType::Array(element) => Arc::from(array_descriptor(element.array_type())),
        ValueType::Void | ValueType::Primitive(_) => Arc::from(ty.to_string()),
    }
}

impl Backend for GcBackend {
    fn is_managed(&self) -> bool {
        self.managed
    }

    fn method_function(&self, method: &MethodReference) -> Arc<str> {
        let name = self.functions.get_or_compute(method, method_function_name);
        Arc::clone(&*name)
    }

    fn allocate_object(&mut self, class: &Arc<str>, location: Option<&TextLocation>) -> Instr {
        Instr::new(InstrKind::StructNew {
            class: Arc::clone(class),
        })
        .at(location)
    }

    fn allocate_array(
        &mut self,
        element: &ValueType,
        length: Instr,
        location: Option<&TextLocation>,
    ) -> Instr {
        Instr::new(InstrKind::ArrayNew {
            element: element.array_type(),
            length: Box::new(length),
        })
        .at(location)
    }

    fn allocate_multi_array(
        &mut self,
        element: &ValueType,
        dimensions: Vec<Instr>,
        location: Option<&TextLocation>,
    ) -> Instr {
        let function = format!(
            "{}.{}",
            names::NEW_MULTI_ARRAY,
            multi_array_suffix(element.array_type())
        );
        Instr::call(function, dimensions, Some(ValType::Ref)).at(location)
    }

    fn virtual_call(
        &mut self,
        _instance: LocalId,
        method: &MethodReference,
        arguments: Vec<Instr>,
    ) -> Instr {
        Instr::new(InstrKind::CallVirtual {
            descriptor: Arc::from(method.descriptor.to_string()),
            arguments,
            result: value_type(method.result()),
        })
    }

    fn get_field(
        &mut self,
        field: &FieldReference,
        ty: &ValueType,
        object: Option<Instr>,
    ) -> Instr {
        let ty = value_type(ty).unwrap_or(ValType::I32);
        match object {
            Some(object) => Instr::new(InstrKind::StructGet {
                field: Arc::clone(&field.name),
                object: Box::new(object),
                ty,
            }),
            None => Instr::new(InstrKind::GetGlobal {
                name: Arc::from(field.to_string()),
                ty,
            }),
        }
    }

    fn set_field(&mut self, field: &FieldReference, object: Option<Instr>, value: Instr) -> Instr {
        match object {
            Some(object) => Instr::new(InstrKind::StructSet {
                field: Arc::clone(&field.name),
                object: Box::new(object),
                value: Box::new(value),
            }),
            None => Instr::new(InstrKind::SetGlobal {
                name: Arc::from(field.to_string()),
                value: Box::new(value),
            }),
        }
    }

    fn array_get(&mut self, ty: ArrayType, array: Instr, index: Instr) -> Instr {
        Instr::new(InstrKind::ArrayGet {
            element: ty,
            array: Box::new(array),
            index: Box::new(index),
        })
    }

    fn array_set(&mut self, ty: ArrayType, array: Instr, index: Instr, value: Instr) -> Instr {
        Instr::new(InstrKind::ArraySet {
            element: ty,
            array: Box::new(array),
            index: Box::new(index),
            value: Box::new(value),
        })
    }

    fn array_length(&mut self, array: Instr) -> Instr {
        Instr::new(InstrKind::ArrayLength(Box::new(array)))
    }

    fn unwrap_array(&mut self, _ty: ArrayType, array: Instr) -> Instr {
        array
    }

    fn instance_of(&mut self, value: Instr, ty: &ValueType) -> Instr {
        Instr::new(InstrKind::RefTest {
            class: type_test_name(ty),
            value: Box::new(value),
        })
    }

    fn throw_null_pointer(&mut self, location: Option<&TextLocation>) -> Instr {
        Self::throw_new(NULL_POINTER_EXCEPTION, location)
    }

    fn throw_class_cast(&mut self, location: Option<&TextLocation>) -> Instr {
        Self::throw_new(CLASS_CAST_EXCEPTION, location)
    }

    fn throw_array_index(&mut self, location: Option<&TextLocation>) -> Instr {
        Self::throw_new(ARRAY_INDEX_EXCEPTION, location)
    }

    fn throw(&mut self, exception: Instr, location: Option<&TextLocation>) -> Instr {
        Instr::new(InstrKind::Throw(Box::new(exception))).at(location)
    }

    fn needs_class_init(&self, class: &str) -> bool {
        self.initializers.contains(class)
    }

    fn init_class(&mut self, class: &Arc<str>, location: Option<&TextLocation>) -> Instr {
        Instr::call(format!("{class}.<clinit>()V"), Vec::new(), None).at(location)
    }

    fn peek_exception(&mut self) -> Instr {
        Instr::new(InstrKind::CaughtException)
    }

    fn catch_exception(&mut self) -> Instr {
        Instr::new(InstrKind::CaughtException)
    }

    fn string_constant(&mut self, value: &Arc<str>) -> Instr {
        Instr::new(InstrKind::StringConst(Arc::clone(value)))
    }

    fn class_constant(&mut self, ty: &ValueType) -> Instr {
        let descriptor = Instr::new(InstrKind::StringConst(Arc::from(ty.to_string())));
        Instr::call(names::CLASS_OF, vec![descriptor], Some(ValType::Ref))
    }
}
