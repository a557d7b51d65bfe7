//! Recorded source text that is rendered later.
//!
//! A [`RememberedSource`] is itself a [`SourceWriter`]. It keeps three
//! parallel buffers:
//!
//! - `commands`: one byte per action. Bytes below `0x80` are the opcodes
//!   below; `0x80 | (n - 1)` is a run of `n` (1 to 128) characters.
//! - `chars`: the literal text, consumed by runs in order.
//! - `operands`: one symbol table index per reference opcode.
//!
//! [`RememberedSource::replay`] feeds the same calls to another writer.

use std::hash::Hash;
use std::sync::Arc;

use kiln_ir::{FieldReference, MethodDescriptor, MethodReference};
use rustc_hash::FxHashMap;

use crate::writer::SourceWriter;

pub const CLASS: u8 = 0;
pub const METHOD: u8 = 1;
pub const STATIC_METHOD: u8 = 2;
pub const FIELD: u8 = 3;
pub const STATIC_FIELD: u8 = 4;
pub const FUNCTION: u8 = 5;
pub const CLASS_INIT: u8 = 6;
pub const NEWLINE: u8 = 7;
pub const SOFT_NEWLINE: u8 = 8;
pub const WS: u8 = 9;
pub const INDENT: u8 = 10;
pub const OUTDENT: u8 = 11;

pub const TEXT_RUN: u8 = 0x80;
pub const MAX_RUN: usize = 128;

#[derive(Debug)]
struct Table<T> {
    index: FxHashMap<T, u32>,
    items: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            index: FxHashMap::default(),
            items: Vec::new(),
        }
    }
}

impl<T: Clone + Hash + Eq> Table<T> {
    fn intern(&mut self, item: &T) -> u32 {
        if let Some(&index) = self.index.get(item) {
            return index;
        }
        let index = match u32::try_from(self.items.len()) {
            Ok(index) => index,
            Err(_) => panic!("remembered source symbol table overflow"),
        };
        self.items.push(item.clone());
        self.index.insert(item.clone(), index);
        index
    }

    /// The symbol a reference command points at.
    ///
    /// # Panics
    ///
    /// Panics if the operand is missing or out of range. Only the recorder
    /// writes the buffers, so either means they were corrupted.
    fn resolve(&self, index: Option<u32>) -> &T {
        match index.and_then(|index| self.items.get(index as usize)) {
            Some(item) => item,
            None => panic!("remembered source reference {index:?} has no recorded symbol"),
        }
    }
}

#[derive(Debug, Default)]
pub struct RememberedSource {
    commands: Vec<u8>,
    chars: String,
    operands: Vec<u32>,
    pending: usize,
    names: Table<Arc<str>>,
    methods: Table<MethodDescriptor>,
    static_methods: Table<MethodReference>,
    fields: Table<FieldReference>,
}

impl RememberedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[u8] {
        &self.commands
    }

    pub fn chars(&self) -> &str {
        &self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.pending == 0
    }

    /// Close the trailing text run.
    pub fn flush(&mut self) {
        while self.pending > 0 {
            let run = self.pending.min(MAX_RUN);
            self.commands.push(run_opcode(run));
            self.pending -= run;
        }
    }

    /// Issue every recorded call, in order, against `out`.
    ///
    /// # Panics
    ///
    /// Panics on a command byte or operand the recorder never writes.
    pub fn replay<W: SourceWriter + ?Sized>(&self, out: &mut W) {
        let mut operands = self.operands.iter().copied();
        let mut cursor = 0;
        for &command in &self.commands {
            if command & TEXT_RUN != 0 {
                let count = usize::from(command & !TEXT_RUN) + 1;
                let end = self.chars[cursor..]
                    .char_indices()
                    .nth(count)
                    .map_or(self.chars.len(), |(offset, _)| cursor + offset);
                out.append(&self.chars[cursor..end]);
                cursor = end;
                continue;
            }
            match command {
                CLASS => out.append_class(self.names.resolve(operands.next())),
                FUNCTION => out.append_function(self.names.resolve(operands.next())),
                CLASS_INIT => out.append_class_init(self.names.resolve(operands.next())),
                METHOD => out.append_method(self.methods.resolve(operands.next())),
                STATIC_METHOD => {
                    out.append_static_method(self.static_methods.resolve(operands.next()));
                }
                FIELD => out.append_field(self.fields.resolve(operands.next())),
                STATIC_FIELD => out.append_static_field(self.fields.resolve(operands.next())),
                NEWLINE => out.newline(),
                SOFT_NEWLINE => out.soft_newline(),
                WS => out.ws(),
                INDENT => out.indent(),
                OUTDENT => out.outdent(),
                _ => panic!("unknown remembered source command {command:#04x}"),
            }
        }
        if cursor < self.chars.len() {
            out.append(&self.chars[cursor..]);
        }
    }

    fn command(&mut self, opcode: u8) {
        self.flush();
        self.commands.push(opcode);
    }

    fn reference(&mut self, opcode: u8, index: u32) {
        self.command(opcode);
        self.operands.push(index);
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "run lengths are 1..=128, so n - 1 fits in seven bits"
)]
fn run_opcode(run: usize) -> u8 {
    TEXT_RUN | (run - 1) as u8
}

impl SourceWriter for RememberedSource {
    fn append(&mut self, text: &str) {
        self.chars.push_str(text);
        self.pending += text.chars().count();
    }

    fn append_class(&mut self, class: &str) {
        let index = self.names.intern(&Arc::from(class));
        self.reference(CLASS, index);
    }

    fn append_method(&mut self, method: &MethodDescriptor) {
        let index = self.methods.intern(method);
        self.reference(METHOD, index);
    }

    fn append_static_method(&mut self, method: &MethodReference) {
        let index = self.static_methods.intern(method);
        self.reference(STATIC_METHOD, index);
    }

    fn append_field(&mut self, field: &FieldReference) {
        let index = self.fields.intern(field);
        self.reference(FIELD, index);
    }

    fn append_static_field(&mut self, field: &FieldReference) {
        let index = self.fields.intern(field);
        self.reference(STATIC_FIELD, index);
    }

    fn append_function(&mut self, name: &str) {
        let index = self.names.intern(&Arc::from(name));
        self.reference(FUNCTION, index);
    }

    fn append_class_init(&mut self, class: &str) {
        let index = self.names.intern(&Arc::from(class));
        self.reference(CLASS_INIT, index);
    }

    fn newline(&mut self) {
        self.command(NEWLINE);
    }

    fn soft_newline(&mut self) {
        self.command(SOFT_NEWLINE);
    }

    fn ws(&mut self) {
        self.command(WS);
    }

    fn indent(&mut self) {
        self.command(INDENT);
    }

    fn outdent(&mut self) {
        self.command(OUTDENT);
    }
}

#[cfg(test)]
mod tests;
