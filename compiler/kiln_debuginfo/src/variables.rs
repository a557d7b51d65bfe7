//! Variable table.
//!
//! Variables are grouped into sequences, one per contiguous instruction range
//! that shares a live variable set. A sequence is written when it ends:
//!
//! ```text
//! start delta (from the previous sequence start), variable count,
//! per variable: name ptr, type tag, range count,
//!   per range: start - sequence start, end - start, location
//! ```

use rustc_hash::FxHashMap;

use crate::{dense_index, write_unsigned};

/// Inferred storage type of a variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariableType {
    Int,
    Long,
    Float,
    Double,
    Object,
    Address,
    Unknown,
}

impl VariableType {
    pub fn tag(self) -> u8 {
        match self {
            VariableType::Int => 0,
            VariableType::Long => 1,
            VariableType::Float => 2,
            VariableType::Double => 3,
            VariableType::Object => 4,
            VariableType::Address => 5,
            VariableType::Unknown => 6,
        }
    }
}

#[derive(Debug)]
struct Variable {
    name: u32,
    ty: VariableType,
    ranges: Vec<(u32, u32, u32)>,
}

#[derive(Debug)]
struct Sequence {
    start: u32,
    variables: Vec<Variable>,
    by_name: FxHashMap<u32, usize>,
}

impl Sequence {
    fn variable(&mut self, name: u32) -> &mut Variable {
        let index = *self.by_name.entry(name).or_insert_with(|| {
            self.variables.push(Variable {
                name,
                ty: VariableType::Unknown,
                ranges: Vec::new(),
            });
            self.variables.len() - 1
        });
        &mut self.variables[index]
    }
}

#[derive(Debug, Default)]
pub struct DebugVariables {
    section: Vec<u8>,
    last_start: u32,
    sequence: Option<Sequence>,
}

impl DebugVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a sequence at instruction pointer `start`.
    ///
    /// # Panics
    ///
    /// Panics if a sequence is already open or `start` precedes the previous
    /// sequence.
    pub fn start_sequence(&mut self, start: u32) {
        assert!(self.sequence.is_none(), "variable sequence already open");
        assert!(
            start >= self.last_start,
            "variable sequence moved backward from {} to {start}",
            self.last_start
        );
        self.sequence = Some(Sequence {
            start,
            variables: Vec::new(),
            by_name: FxHashMap::default(),
        });
    }

    /// Set the type of variable `name` in the open sequence.
    pub fn set_type(&mut self, name: u32, ty: VariableType) {
        self.open().variable(name).ty = ty;
    }

    /// Record that `name` lives in `start..end`, stored at `location`.
    ///
    /// # Panics
    ///
    /// Panics if `end` precedes `start` or `start` precedes the sequence.
    pub fn range(&mut self, name: u32, start: u32, end: u32, location: u32) {
        let sequence = self.open();
        assert!(
            sequence.start <= start && start <= end,
            "variable range {start}..{end} outside sequence at {}",
            sequence.start
        );
        let base = sequence.start;
        sequence
            .variable(name)
            .ranges
            .push((start - base, end - start, location));
    }

    /// Close and write the open sequence.
    pub fn end_sequence(&mut self) {
        let Some(sequence) = self.sequence.take() else {
            panic!("no variable sequence open");
        };
        write_unsigned(&mut self.section, sequence.start - self.last_start);
        self.last_start = sequence.start;
        write_unsigned(&mut self.section, dense_index(sequence.variables.len()));
        for variable in sequence.variables {
            write_unsigned(&mut self.section, variable.name);
            self.section.push(variable.ty.tag());
            write_unsigned(&mut self.section, dense_index(variable.ranges.len()));
            for (offset, length, location) in variable.ranges {
                write_unsigned(&mut self.section, offset);
                write_unsigned(&mut self.section, length);
                write_unsigned(&mut self.section, location);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.section.is_empty()
    }

    pub fn section(&self) -> &[u8] {
        &self.section
    }

    pub(crate) fn into_section(self) -> Vec<u8> {
        self.section
    }

    fn open(&mut self) -> &mut Sequence {
        match self.sequence.as_mut() {
            Some(sequence) => sequence,
            None => panic!("no variable sequence open"),
        }
    }
}
