//! Debug information for a compilation unit.
//!
//! The instruction pointer is the pre-order index of an instruction across
//! the whole unit: functions are numbered one after another, and within a
//! function every instruction precedes its operands. Only located
//! instructions produce line table entries.
//!
//! Class layouts use synthetic addresses. Each class or interface record
//! takes one [`CLASS_RECORD_SIZE`] slot of a metadata region, and static
//! fields are packed into a statics region starting at [`STATICS_BASE`].

use std::sync::Arc;

use kiln_debuginfo::{
    ClassLayout, DebugInfoBuilder, DebugLevel, DebugSection, FieldLayout, FieldType,
    VariableType,
};
use kiln_ir::{ClassNode, FieldNode, MethodNode, PrimitiveType, ValueType};
use kiln_stack::ensure_sufficient_stack;
use kiln_target::{Function, Instr};
use rustc_hash::FxHashMap;

pub(crate) const OBJECT_HEADER_SIZE: u32 = 8;
pub(crate) const CLASS_RECORD_SIZE: u32 = 64;
pub(crate) const STATICS_BASE: u32 = 0x1_0000;

/// Size of a reference on the target.
const REFERENCE_SIZE: u32 = 4;

#[derive(Clone, Copy)]
struct LaidOut {
    record: u32,
    size: u32,
}

/// Feeds a [`DebugInfoBuilder`] from lowered functions and class declarations.
pub(crate) struct DebugRecorder {
    builder: DebugInfoBuilder,
    level: DebugLevel,
    next_ptr: u32,
    next_class_address: u32,
    next_static: u32,
}

impl DebugRecorder {
    pub(crate) fn new(level: DebugLevel) -> Self {
        Self {
            builder: DebugInfoBuilder::new(),
            level,
            next_ptr: 0,
            next_class_address: 0,
            next_static: STATICS_BASE,
        }
    }

    /// Record the lines of `function`, and its named variables at
    /// [`DebugLevel::Full`].
    pub(crate) fn record_function(&mut self, method: &MethodNode, function: &Function) {
        self.builder.method_ptr(&method.reference);
        let start = self.next_ptr;
        for instr in &function.body {
            self.walk(instr);
        }
        if self.level.includes_variables() {
            self.record_variables(method, start, self.next_ptr);
        }
    }

    fn walk(&mut self, instr: &Instr) {
        ensure_sufficient_stack(|| {
            let ptr = self.next_ptr;
            self.next_ptr += 1;
            if let Some(location) = &instr.location {
                self.builder.advance(ptr);
                self.builder.location(location);
            }
            for child in instr.children() {
                self.walk(child);
            }
        });
    }

    fn record_variables(&mut self, method: &MethodNode, start: u32, end: u32) {
        let named: Vec<_> = method
            .body
            .variables()
            .iter()
            .filter_map(|variable| Some((variable, variable.name.as_deref()?)))
            .collect();
        if named.is_empty() {
            return;
        }

        let pointers: Vec<u32> = named
            .iter()
            .map(|(_, name)| self.builder.string_ptr(name))
            .collect();
        let variables = self.builder.variables();
        variables.start_sequence(start);
        for ((variable, _), name) in named.iter().zip(pointers) {
            variables.set_type(name, variable_type(&variable.ty));
            variables.range(name, start, end, variable.index);
        }
        variables.end_sequence();
    }

    /// Record the layout of every class, parents before their subclasses.
    #[tracing::instrument(level = "debug", skip_all, fields(classes = classes.len()))]
    pub(crate) fn record_layouts(&mut self, classes: &[ClassNode]) {
        if !self.level.includes_variables() {
            return;
        }
        let by_name: FxHashMap<&str, &ClassNode> = classes
            .iter()
            .map(|class| (&*class.name, class))
            .collect();
        let mut laid_out: FxHashMap<Arc<str>, Option<LaidOut>> = FxHashMap::default();
        for class in classes {
            self.layout(class, &by_name, &mut laid_out);
        }
    }

    /// `None` in `laid_out` marks a class whose layout is in progress, so a
    /// cyclic hierarchy stops instead of recursing forever.
    fn layout(
        &mut self,
        class: &ClassNode,
        by_name: &FxHashMap<&str, &ClassNode>,
        laid_out: &mut FxHashMap<Arc<str>, Option<LaidOut>>,
    ) -> Option<LaidOut> {
        if let Some(done) = laid_out.get(&class.name) {
            return *done;
        }
        laid_out.insert(Arc::clone(&class.name), None);

        let parent = class
            .parent
            .as_deref()
            .and_then(|parent| by_name.get(parent).copied())
            .and_then(|parent| ensure_sufficient_stack(|| self.layout(parent, by_name, laid_out)));

        let class_ptr = self.builder.class_ptr(&class.name);
        let address = self.next_class_address;
        self.next_class_address += CLASS_RECORD_SIZE;

        let result = if class.is_interface() {
            let record = self.builder.class_layout().write_interface(class_ptr, address);
            LaidOut { record, size: 0 }
        } else {
            let (statics, instance): (Vec<&FieldNode>, Vec<&FieldNode>) =
                class.fields.iter().partition(|field| field.is_static());

            let mut static_fields = Vec::with_capacity(statics.len());
            for field in statics {
                let size = field_size(&field.ty);
                let offset = align(self.next_static, size);
                self.next_static = offset + size;
                static_fields.push(self.field_layout(field, offset));
            }

            let mut cursor = parent.map_or(OBJECT_HEADER_SIZE, |parent| parent.size);
            let mut instance_fields = Vec::with_capacity(instance.len());
            for field in instance {
                let size = field_size(&field.ty);
                let offset = align(cursor, size);
                cursor = offset + size;
                instance_fields.push(self.field_layout(field, offset));
            }

            let record = self.builder.class_layout().write_class(&ClassLayout {
                class: class_ptr,
                parent: parent.map(|parent| parent.record),
                address,
                size: cursor,
                static_fields,
                instance_fields,
            });
            LaidOut {
                record,
                size: cursor,
            }
        };
        laid_out.insert(Arc::clone(&class.name), Some(result));
        Some(result)
    }

    fn field_layout(&mut self, field: &FieldNode, offset: u32) -> FieldLayout {
        FieldLayout {
            name: self.builder.string_ptr(&field.name),
            offset,
            ty: field_type(&field.ty),
        }
    }

    pub(crate) fn finish(self) -> Vec<DebugSection> {
        self.builder.build()
    }
}

fn align(offset: u32, size: u32) -> u32 {
    offset.next_multiple_of(size.max(1))
}

fn field_size(ty: &ValueType) -> u32 {
    match ty {
        ValueType::Primitive(PrimitiveType::Boolean | PrimitiveType::Byte) => 1,
        ValueType::Primitive(PrimitiveType::Short | PrimitiveType::Char) => 2,
        ValueType::Primitive(PrimitiveType::Int | PrimitiveType::Float) => 4,
        ValueType::Primitive(PrimitiveType::Long | PrimitiveType::Double) => 8,
        ValueType::Object(_) | ValueType::Array(_) => REFERENCE_SIZE,
        ValueType::Void => 0,
    }
}

fn field_type(ty: &ValueType) -> FieldType {
    match ty {
        ValueType::Primitive(primitive) => FieldType::from(*primitive),
        ValueType::Object(_) | ValueType::Array(_) => FieldType::Object,
        ValueType::Void => FieldType::Undefined,
    }
}

fn variable_type(ty: &ValueType) -> VariableType {
    match ty {
        ValueType::Primitive(PrimitiveType::Long) => VariableType::Long,
        ValueType::Primitive(PrimitiveType::Float) => VariableType::Float,
        ValueType::Primitive(PrimitiveType::Double) => VariableType::Double,
        ValueType::Primitive(_) => VariableType::Int,
        ValueType::Object(_) | ValueType::Array(_) => VariableType::Object,
        ValueType::Void => VariableType::Unknown,
    }
}

#[cfg(test)]
mod tests;
