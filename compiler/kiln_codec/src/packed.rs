use std::hash::Hash;
use std::sync::Arc;

use kiln_ir::graph::{IrClass, IrField, IrFunction, IrGlobal, IrMethod};
use rustc_hash::FxHashMap;

/// An encoded graph: the opcode stream plus the tables its indices address.
///
/// Every index in `data` is below the length of the table it names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackedTree {
    pub data: Vec<u8>,
    pub strings: Vec<Arc<str>>,
    pub functions: Vec<IrFunction>,
    pub methods: Vec<IrMethod>,
    pub fields: Vec<IrField>,
    pub classes: Vec<IrClass>,
    pub globals: Vec<IrGlobal>,
}

/// Assigns bump indices to values on first sight.
#[derive(Debug)]
pub(crate) struct Interner<T> {
    index: FxHashMap<T, u32>,
    items: Vec<T>,
}

impl<T> Default for Interner<T> {
    fn default() -> Self {
        Self {
            index: FxHashMap::default(),
            items: Vec::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> Interner<T> {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "table sizes never exceed u32"
    )]
    pub(crate) fn intern(&mut self, value: &T) -> u32 {
        if let Some(&index) = self.index.get(value) {
            return index;
        }
        let index = self.items.len() as u32;
        self.items.push(value.clone());
        self.index.insert(value.clone(), index);
        index
    }

    pub(crate) fn into_items(self) -> Vec<T> {
        self.items
    }
}
