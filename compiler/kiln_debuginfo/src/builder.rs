use kiln_ir::{MethodReference, TextLocation};

use crate::layout::DebugClassLayout;
use crate::lines::DebugLines;
use crate::paths::PathTable;
use crate::strings::DebugStrings;
use crate::symbols::{DebugClasses, DebugMethods};
use crate::variables::DebugVariables;
use crate::{
    DebugSection, CLASSES_SECTION, CLASS_LAYOUT_SECTION, FILES_SECTION, LINES_SECTION,
    METHODS_SECTION, PACKAGES_SECTION, STRINGS_SECTION, VARIABLES_SECTION,
};

/// Owns every debug table for one compilation unit.
///
/// The symbol tables reference each other (a method names its class, a class
/// its package, everything its strings), so they are interned through this
/// aggregate. The stream tables are reachable directly for pointer-level
/// control.
#[derive(Debug)]
pub struct DebugInfoBuilder {
    strings: DebugStrings,
    files: PathTable,
    packages: PathTable,
    classes: DebugClasses,
    methods: DebugMethods,
    lines: DebugLines,
    variables: DebugVariables,
    layout: DebugClassLayout,
}

impl Default for DebugInfoBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugInfoBuilder {
    pub fn new() -> Self {
        Self {
            strings: DebugStrings::new(),
            files: PathTable::files(),
            packages: PathTable::packages(),
            classes: DebugClasses::new(),
            methods: DebugMethods::new(),
            lines: DebugLines::new(),
            variables: DebugVariables::new(),
            layout: DebugClassLayout::new(),
        }
    }

    // ── Symbols ──

    pub fn string_ptr(&mut self, value: &str) -> u32 {
        self.strings.string_ptr(value)
    }

    pub fn file_ptr(&mut self, path: &str) -> u32 {
        self.files.path_ptr(&mut self.strings, path)
    }

    pub fn package_ptr(&mut self, package: &str) -> u32 {
        self.packages.path_ptr(&mut self.strings, package)
    }

    pub fn class_ptr(&mut self, class: &str) -> u32 {
        self.classes
            .class_ptr(&mut self.strings, &mut self.packages, class)
    }

    pub fn method_ptr(&mut self, method: &MethodReference) -> u32 {
        self.methods.method_ptr(
            &mut self.strings,
            &mut self.packages,
            &mut self.classes,
            method,
        )
    }

    // ── Streams ──

    /// Move the line table pointer forward.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is behind the current pointer.
    pub fn advance(&mut self, ptr: u32) {
        self.lines.advance(ptr);
    }

    pub fn location(&mut self, location: &TextLocation) {
        let file = self.file_ptr(&location.file);
        self.lines.location(file, location.line);
    }

    pub fn start_inlined(&mut self, method: &MethodReference) {
        let method = self.method_ptr(method);
        self.lines.start(method);
    }

    pub fn end_inlined(&mut self) {
        self.lines.end();
    }

    pub fn lines(&mut self) -> &mut DebugLines {
        &mut self.lines
    }

    pub fn variables(&mut self) -> &mut DebugVariables {
        &mut self.variables
    }

    pub fn class_layout(&mut self) -> &mut DebugClassLayout {
        &mut self.layout
    }

    /// Finish every table, dropping the empty ones.
    #[tracing::instrument(level = "debug", skip_all, fields(strings = self.strings.len()))]
    pub fn build(self) -> Vec<DebugSection> {
        let sections: Vec<DebugSection> = [
            (STRINGS_SECTION, self.strings.into_section()),
            (FILES_SECTION, self.files.into_section()),
            (PACKAGES_SECTION, self.packages.into_section()),
            (CLASSES_SECTION, self.classes.into_section()),
            (CLASS_LAYOUT_SECTION, self.layout.into_section()),
            (METHODS_SECTION, self.methods.into_section()),
            (LINES_SECTION, self.lines.into_section()),
            (VARIABLES_SECTION, self.variables.into_section()),
        ]
        .into_iter()
        .filter(|(_, data)| !data.is_empty())
        .map(|(name, data)| DebugSection::new(name, data))
        .collect();

        tracing::debug!(sections = sections.len(), "debug info built");
        sections
    }
}
