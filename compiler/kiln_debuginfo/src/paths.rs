use rustc_hash::FxHashMap;

use crate::strings::DebugStrings;
use crate::{dense_index, write_unsigned};

/// Hierarchical path table shared by files and packages.
///
/// A path is interned one segment at a time against the running parent
/// pointer, keyed by `(parent, segment string)`. Pointers are 1-based so that
/// `0` can stand for "no parent"; the empty path maps to `0`.
#[derive(Debug)]
pub struct PathTable {
    separator: char,
    index: FxHashMap<(u32, u32), u32>,
    section: Vec<u8>,
}

impl PathTable {
    /// Table of `/`-separated file paths.
    pub fn files() -> Self {
        Self::new('/')
    }

    /// Table of `.`-separated package names.
    pub fn packages() -> Self {
        Self::new('.')
    }

    fn new(separator: char) -> Self {
        Self {
            separator,
            index: FxHashMap::default(),
            section: Vec::new(),
        }
    }

    pub fn path_ptr(&mut self, strings: &mut DebugStrings, path: &str) -> u32 {
        path.split(self.separator)
            .filter(|segment| !segment.is_empty())
            .fold(0, |parent, segment| {
                let name = strings.string_ptr(segment);
                self.segment_ptr(parent, name)
            })
    }

    fn segment_ptr(&mut self, parent: u32, name: u32) -> u32 {
        if let Some(&ptr) = self.index.get(&(parent, name)) {
            return ptr;
        }
        let ptr = dense_index(self.index.len() + 1);
        write_unsigned(&mut self.section, parent);
        write_unsigned(&mut self.section, name);
        self.index.insert((parent, name), ptr);
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
