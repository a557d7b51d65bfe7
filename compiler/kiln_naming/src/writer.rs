use kiln_ir::{FieldReference, MethodDescriptor, MethodReference};

use crate::strategy::NamingStrategy;

/// Sink for generated source text with symbolic references.
///
/// Symbols are written by reference and resolved to aliases by the sink.
/// `ws` and `soft_newline` are layout hints a minifying sink drops.
pub trait SourceWriter {
    fn append(&mut self, text: &str);

    fn append_class(&mut self, class: &str);

    fn append_method(&mut self, method: &MethodDescriptor);

    fn append_static_method(&mut self, method: &MethodReference);

    fn append_field(&mut self, field: &FieldReference);

    fn append_static_field(&mut self, field: &FieldReference);

    fn append_function(&mut self, name: &str);

    fn append_class_init(&mut self, class: &str);

    fn newline(&mut self);

    fn soft_newline(&mut self);

    fn ws(&mut self);

    fn indent(&mut self);

    fn outdent(&mut self);
}

/// Renders into a string, resolving symbols through a [`NamingStrategy`].
pub struct OutputSourceWriter<'a> {
    naming: &'a mut NamingStrategy,
    out: String,
    minified: bool,
    indent: usize,
    line_start: bool,
}

impl<'a> OutputSourceWriter<'a> {
    pub fn new(naming: &'a mut NamingStrategy, minified: bool) -> Self {
        Self {
            naming,
            out: String::new(),
            minified,
            indent: 0,
            line_start: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.line_start {
            if !self.minified {
                for _ in 0..self.indent {
                    self.out.push_str("    ");
                }
            }
            self.line_start = false;
        }
        self.out.push_str(text);
    }
}

impl SourceWriter for OutputSourceWriter<'_> {
    fn append(&mut self, text: &str) {
        self.text(text);
    }

    fn append_class(&mut self, class: &str) {
        let alias = self.naming.name_for_class(class);
        self.text(&alias);
    }

    fn append_method(&mut self, method: &MethodDescriptor) {
        let alias = self.naming.name_for_method(method);
        self.text(&alias);
    }

    fn append_static_method(&mut self, method: &MethodReference) {
        let alias = self.naming.full_name_for(method);
        self.text(&alias);
    }

    fn append_field(&mut self, field: &FieldReference) {
        let alias = self.naming.name_for_field(field);
        self.text(&alias);
    }

    fn append_static_field(&mut self, field: &FieldReference) {
        let alias = self.naming.name_for_static_field(field);
        self.text(&alias);
    }

    fn append_function(&mut self, name: &str) {
        let alias = self.naming.name_for_function(name);
        self.text(&alias);
    }

    fn append_class_init(&mut self, class: &str) {
        let alias = self.naming.name_for_class_init(class);
        self.text(&alias);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        self.line_start = true;
    }

    fn soft_newline(&mut self) {
        if !self.minified {
            self.newline();
        }
    }

    fn ws(&mut self) {
        if !self.minified {
            self.text(" ");
        }
    }

    fn indent(&mut self) {
        self.indent += 1;
    }

    fn outdent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests;
