//! Debug information sections for Kiln output.
//!
//! Code generation calls into a [`DebugInfoBuilder`] while it emits
//! instructions. Every table is append-only: entries are interned on first
//! use and later uses return the same dense index, so the builder can be fed
//! incrementally without a second pass.
//!
//! # Sections
//!
//! ```text
//! kiln_str         length-prefixed UTF-8 strings
//! kiln_files       (parent, segment) file path tree, split on '/'
//! kiln_pkg         (parent, segment) package tree, split on '.'
//! kiln_classes     (package, simple name)
//! kiln_methods     (class, name)
//! kiln_line        delta-coded pointer/file/line stream with inline regions
//! kiln_var         variable sequences with typed live ranges
//! kiln_cls_layout  class field layouts and type lattice records
//! ```
//!
//! Empty sections are omitted from [`DebugInfoBuilder::build`]. The sections
//! can be shipped inside the output or packed into an external debug file with
//! [`write_debug_file`].
//!
//! # Debug Levels
//!
//! - `None`: no sections
//! - `LinesOnly`: strings, files, classes, methods and the line table
//! - `Full`: adds variable ranges and class layouts

mod builder;
mod file;
mod layout;
pub mod lines;
mod paths;
mod strings;
mod symbols;
mod variables;

use std::fmt;

use kiln_ir::varint::VarintError;

pub use builder::DebugInfoBuilder;
pub use file::{read_debug_file, write_debug_file, DEBUG_FILE_MAGIC, DEBUG_FILE_VERSION};
pub use layout::{ClassLayout, DebugClassLayout, FieldLayout, FieldType, END_FIELDS, END_STATIC};
pub use lines::DebugLines;
pub use paths::PathTable;
pub use strings::DebugStrings;
pub use symbols::{DebugClasses, DebugMethods};
pub use variables::{DebugVariables, VariableType};

// ── Section names ──

pub const STRINGS_SECTION: &str = "kiln_str";
pub const FILES_SECTION: &str = "kiln_files";
pub const PACKAGES_SECTION: &str = "kiln_pkg";
pub const CLASSES_SECTION: &str = "kiln_classes";
pub const METHODS_SECTION: &str = "kiln_methods";
pub const LINES_SECTION: &str = "kiln_line";
pub const VARIABLES_SECTION: &str = "kiln_var";
pub const CLASS_LAYOUT_SECTION: &str = "kiln_cls_layout";

/// How much debug information to produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DebugLevel {
    #[default]
    None,
    /// Line tables and the symbol tables they reference.
    LinesOnly,
    /// Line tables plus variables and class layouts.
    Full,
}

impl DebugLevel {
    pub fn is_enabled(self) -> bool {
        self != DebugLevel::None
    }

    pub fn includes_variables(self) -> bool {
        self == DebugLevel::Full
    }
}

impl fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebugLevel::None => write!(f, "none"),
            DebugLevel::LinesOnly => write!(f, "lines-only"),
            DebugLevel::Full => write!(f, "full"),
        }
    }
}

/// A finished, named section blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugSection {
    pub name: String,
    pub data: Vec<u8>,
}

impl DebugSection {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Errors reading back debug data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DebugFileError {
    #[error(transparent)]
    Varint(#[from] VarintError),

    #[error("bad debug file magic {0:#010x}")]
    BadMagic(u32),

    #[error("unsupported debug file version {0}")]
    UnsupportedVersion(u32),

    #[error("debug data truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("section name `{0}` is not short ASCII")]
    InvalidName(String),

    #[error("unknown line table opcode {opcode} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("line table value out of range at offset {offset}")]
    OutOfRange { offset: usize },
}

// ── Shared writers ──

/// Table indices are `u32`; a table that outgrows that is a caller bug.
fn dense_index(len: usize) -> u32 {
    match u32::try_from(len) {
        Ok(index) => index,
        Err(_) => panic!("debug table exceeded u32::MAX entries"),
    }
}

fn write_unsigned(out: &mut Vec<u8>, value: u32) {
    kiln_ir::varint::write_unsigned(out, u64::from(value));
}

fn write_str(out: &mut Vec<u8>, value: &str) {
    kiln_ir::varint::write_unsigned(out, value.len() as u64);
    out.extend_from_slice(value.as_bytes());
}
