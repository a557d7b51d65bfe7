//! Class and method tables.
//!
//! Both are de-duplicated by value. A class entry is `(package ptr, simple
//! name string)`; a method entry is `(class ptr, method name string)`. Overloads
//! share a name but keep distinct entries because their references differ.

use std::sync::Arc;

use kiln_ir::MethodReference;
use rustc_hash::FxHashMap;

use crate::paths::PathTable;
use crate::strings::DebugStrings;
use crate::{dense_index, write_unsigned};

#[derive(Debug, Default)]
pub struct DebugClasses {
    index: FxHashMap<Arc<str>, u32>,
    section: Vec<u8>,
}

impl DebugClasses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer for a fully qualified class name such as `java.util.List`.
    pub fn class_ptr(
        &mut self,
        strings: &mut DebugStrings,
        packages: &mut PathTable,
        class: &str,
    ) -> u32 {
        if let Some(&ptr) = self.index.get(class) {
            return ptr;
        }
        let (package, simple) = match class.rfind('.') {
            Some(dot) => (&class[..dot], &class[dot + 1..]),
            None => ("", class),
        };
        let package = packages.path_ptr(strings, package);
        let name = strings.string_ptr(simple);

        let ptr = dense_index(self.index.len());
        write_unsigned(&mut self.section, package);
        write_unsigned(&mut self.section, name);
        self.index.insert(Arc::from(class), ptr);
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

#[derive(Debug, Default)]
pub struct DebugMethods {
    index: FxHashMap<MethodReference, u32>,
    section: Vec<u8>,
}

impl DebugMethods {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method_ptr(
        &mut self,
        strings: &mut DebugStrings,
        packages: &mut PathTable,
        classes: &mut DebugClasses,
        method: &MethodReference,
    ) -> u32 {
        if let Some(&ptr) = self.index.get(method) {
            return ptr;
        }
        let class = classes.class_ptr(strings, packages, &method.class);
        let name = strings.string_ptr(method.name());

        let ptr = dense_index(self.index.len());
        write_unsigned(&mut self.section, class);
        write_unsigned(&mut self.section, name);
        self.index.insert(method.clone(), ptr);
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
