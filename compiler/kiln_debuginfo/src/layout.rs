//! Class layout table.
//!
//! Every record gets the next dense index so later records can refer back to
//! it (a class to its parent, an array to its item type). Record addresses are
//! signed deltas from the previous record's address.
//!
//! ```text
//! CLASS      class ptr, parent index + 1 (0 = none), address, size,
//!            static fields, END_STATIC, instance fields, END_FIELDS
//! PRIMITIVE  primitive tag, address
//! ARRAY      item record index, address
//! INTERFACE  class ptr, address
//! UNKNOWN    address
//! ```
//!
//! A field is its type tag, name string ptr and offset delta from the previous
//! field in the same group.

use kiln_ir::varint::write_signed;
use kiln_ir::PrimitiveType;

use crate::{dense_index, write_unsigned};

const CLASS: u8 = 0;
const PRIMITIVE: u8 = 1;
const ARRAY: u8 = 2;
const INTERFACE: u8 = 3;
const UNKNOWN: u8 = 4;

pub const END_STATIC: u8 = 0xFE;
pub const END_FIELDS: u8 = 0xFF;

/// Storage type of a laid-out field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Object,
    Address,
    Undefined,
}

impl FieldType {
    pub fn tag(self) -> u8 {
        match self {
            FieldType::Boolean => 0,
            FieldType::Byte => 1,
            FieldType::Short => 2,
            FieldType::Char => 3,
            FieldType::Int => 4,
            FieldType::Long => 5,
            FieldType::Float => 6,
            FieldType::Double => 7,
            FieldType::Object => 8,
            FieldType::Address => 9,
            FieldType::Undefined => 10,
        }
    }
}

impl From<PrimitiveType> for FieldType {
    fn from(primitive: PrimitiveType) -> Self {
        match primitive {
            PrimitiveType::Boolean => FieldType::Boolean,
            PrimitiveType::Byte => FieldType::Byte,
            PrimitiveType::Short => FieldType::Short,
            PrimitiveType::Char => FieldType::Char,
            PrimitiveType::Int => FieldType::Int,
            PrimitiveType::Long => FieldType::Long,
            PrimitiveType::Float => FieldType::Float,
            PrimitiveType::Double => FieldType::Double,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: u32,
    pub offset: u32,
    pub ty: FieldType,
}

/// One class to record. `parent` is the record index of the superclass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassLayout {
    pub class: u32,
    pub parent: Option<u32>,
    pub address: u32,
    pub size: u32,
    pub static_fields: Vec<FieldLayout>,
    pub instance_fields: Vec<FieldLayout>,
}

#[derive(Debug, Default)]
pub struct DebugClassLayout {
    section: Vec<u8>,
    records: u32,
    last_address: u32,
}

impl DebugClassLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_class(&mut self, class: &ClassLayout) -> u32 {
        let index = self.record(CLASS);
        write_unsigned(&mut self.section, class.class);
        write_unsigned(&mut self.section, class.parent.map_or(0, |parent| parent + 1));
        self.address(class.address);
        write_unsigned(&mut self.section, class.size);
        self.fields(&class.static_fields);
        self.section.push(END_STATIC);
        self.fields(&class.instance_fields);
        self.section.push(END_FIELDS);
        index
    }

    pub fn write_primitive(&mut self, primitive: PrimitiveType, address: u32) -> u32 {
        let index = self.record(PRIMITIVE);
        self.section.push(FieldType::from(primitive).tag());
        self.address(address);
        index
    }

    pub fn write_array(&mut self, item: u32, address: u32) -> u32 {
        let index = self.record(ARRAY);
        write_unsigned(&mut self.section, item);
        self.address(address);
        index
    }

    pub fn write_interface(&mut self, class: u32, address: u32) -> u32 {
        let index = self.record(INTERFACE);
        write_unsigned(&mut self.section, class);
        self.address(address);
        index
    }

    pub fn write_unknown(&mut self, address: u32) -> u32 {
        let index = self.record(UNKNOWN);
        self.address(address);
        index
    }

    pub fn len(&self) -> usize {
        self.records as usize
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    pub fn section(&self) -> &[u8] {
        &self.section
    }

    pub(crate) fn into_section(self) -> Vec<u8> {
        self.section
    }

    fn record(&mut self, kind: u8) -> u32 {
        self.section.push(kind);
        let index = self.records;
        self.records = dense_index(self.records as usize + 1);
        index
    }

    fn address(&mut self, address: u32) {
        write_signed(
            &mut self.section,
            i64::from(address) - i64::from(self.last_address),
        );
        self.last_address = address;
    }

    fn fields(&mut self, fields: &[FieldLayout]) {
        let mut previous = 0i64;
        for field in fields {
            self.section.push(field.ty.tag());
            write_unsigned(&mut self.section, field.name);
            write_signed(&mut self.section, i64::from(field.offset) - previous);
            previous = i64::from(field.offset);
        }
    }
}
