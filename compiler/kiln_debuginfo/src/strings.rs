use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{dense_index, write_str};

/// Content-addressed string table.
///
/// Each distinct string is written once, as a LEB128 byte length followed by
/// its UTF-8 bytes, and is addressed by its dense insertion index.
#[derive(Debug, Default)]
pub struct DebugStrings {
    index: FxHashMap<Arc<str>, u32>,
    section: Vec<u8>,
}

impl DebugStrings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string_ptr(&mut self, value: &str) -> u32 {
        if let Some(&ptr) = self.index.get(value) {
            return ptr;
        }
        let ptr = dense_index(self.index.len());
        write_str(&mut self.section, value);
        self.index.insert(Arc::from(value), ptr);
        ptr
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn section(&self) -> &[u8] {
        &self.section
    }

    pub(crate) fn into_section(self) -> Vec<u8> {
        self.section
    }
}
