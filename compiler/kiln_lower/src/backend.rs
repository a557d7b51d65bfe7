use std::sync::Arc;

use kiln_ir::{ArrayType, FieldReference, MethodReference, PrimitiveType, TextLocation, ValueType};
use kiln_target::{method_function_name, Instr, LocalId, ValType};

/// Target value type of a source type; `None` for `void`.
pub fn value_type(ty: &ValueType) -> Option<ValType> {
    match ty {
        ValueType::Void => None,
        ValueType::Primitive(PrimitiveType::Long) => Some(ValType::I64),
        ValueType::Primitive(PrimitiveType::Float) => Some(ValType::F32),
        ValueType::Primitive(PrimitiveType::Double) => Some(ValType::F64),
        ValueType::Primitive(_) => Some(ValType::I32),
        ValueType::Object(_) | ValueType::Array(_) => Some(ValType::Ref),
    }
}

/// Object model of a concrete target.
///
/// The visitor owns control flow, temporaries and call-site protocol; every
/// operation that depends on object layout or runtime conventions is delegated
/// here. Returned instructions are plain expressions; the visitor attaches
/// source locations.
pub trait Backend {
    /// Whether the target tracks call sites and raises runtime exceptions
    /// (null, bounds and cast checks are only emitted for managed targets).
    fn is_managed(&self) -> bool;

    /// Whether calls to `method` go through the call-site protocol.
    fn is_managed_call(&self, method: &MethodReference) -> bool {
        let _ = method;
        self.is_managed()
    }

    /// Whether booleans are always `0` or `1`, making `x ^ 1` a valid negation
    /// of `x`.
    fn canonical_booleans(&self) -> bool {
        true
    }

    /// Name of the function implementing `method`.
    fn method_function(&self, method: &MethodReference) -> Arc<str> {
        method_function_name(method)
    }

    fn allocate_object(&mut self, class: &Arc<str>, location: Option<&TextLocation>) -> Instr;

    fn allocate_array(
        &mut self,
        element: &ValueType,
        length: Instr,
        location: Option<&TextLocation>,
    ) -> Instr;

    fn allocate_multi_array(
        &mut self,
        element: &ValueType,
        dimensions: Vec<Instr>,
        location: Option<&TextLocation>,
    ) -> Instr;

    /// Dispatch `method` on the object held in `instance`. `arguments[0]`
    /// reads `instance`.
    fn virtual_call(
        &mut self,
        instance: LocalId,
        method: &MethodReference,
        arguments: Vec<Instr>,
    ) -> Instr;

    /// Read a field; `object` is `None` for static fields.
    fn get_field(&mut self, field: &FieldReference, ty: &ValueType, object: Option<Instr>)
        -> Instr;

    fn set_field(&mut self, field: &FieldReference, object: Option<Instr>, value: Instr) -> Instr;

    fn array_get(&mut self, ty: ArrayType, array: Instr, index: Instr) -> Instr;

    fn array_set(&mut self, ty: ArrayType, array: Instr, index: Instr, value: Instr) -> Instr;

    fn array_length(&mut self, array: Instr) -> Instr;

    /// Storage view of an array object, as consumed by `array_get`/`array_set`.
    fn unwrap_array(&mut self, ty: ArrayType, array: Instr) -> Instr;

    /// Non-null subtype test yielding an `i32` boolean.
    fn instance_of(&mut self, value: Instr, ty: &ValueType) -> Instr;

    fn throw_null_pointer(&mut self, location: Option<&TextLocation>) -> Instr;

    fn throw_class_cast(&mut self, location: Option<&TextLocation>) -> Instr;

    fn throw_array_index(&mut self, location: Option<&TextLocation>) -> Instr;

    fn throw(&mut self, exception: Instr, location: Option<&TextLocation>) -> Instr;

    fn needs_class_init(&self, class: &str) -> bool;

    fn init_class(&mut self, class: &Arc<str>, location: Option<&TextLocation>) -> Instr;

    /// The exception being handled, without consuming it.
    fn peek_exception(&mut self) -> Instr;

    /// The exception being handled, marking it as consumed.
    fn catch_exception(&mut self) -> Instr;

    fn string_constant(&mut self, value: &Arc<str>) -> Instr;

    fn class_constant(&mut self, ty: &ValueType) -> Instr;
}
