use kiln_ir::{FieldReference, MethodDescriptor, MethodReference};

use crate::alias::{sanitize, AliasProvider, Namespace};

/// Readable aliases derived from the symbol names.
///
/// A class `java.util.ArrayList` becomes `ju_ArrayList`: the initials of its
/// package, then the simple name. Static members and class initializers are
/// prefixed with that class name. Clashes get a `$N` suffix.
#[derive(Debug, Default)]
pub struct DefaultAliasProvider {
    top_level: Namespace,
    members: Namespace,
}

impl DefaultAliasProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

fn class_base(class: &str) -> String {
    let Some((package, simple)) = class.rsplit_once('.') else {
        return sanitize(class);
    };
    let mut base: String = package
        .split('.')
        .filter_map(|segment| segment.chars().next())
        .collect();
    base.push('_');
    base.push_str(&sanitize(simple));
    sanitize(&base)
}

impl AliasProvider for DefaultAliasProvider {
    fn class_alias(&mut self, class: &str) -> String {
        self.top_level.claim(class_base(class))
    }

    fn method_alias(&mut self, method: &MethodDescriptor) -> String {
        self.members.claim(sanitize(&method.name))
    }

    fn static_method_alias(&mut self, method: &MethodReference) -> String {
        let base = format!("{}_{}", class_base(&method.class), sanitize(method.name()));
        self.top_level.claim(base)
    }

    fn field_alias(&mut self, field: &FieldReference) -> String {
        self.members.claim(format!("f_{}", sanitize(&field.name)))
    }

    fn static_field_alias(&mut self, field: &FieldReference) -> String {
        let base = format!("{}_{}", class_base(&field.class), sanitize(&field.name));
        self.top_level.claim(base)
    }

    fn function_alias(&mut self, name: &str) -> String {
        self.top_level.claim(sanitize(name))
    }

    fn class_init_alias(&mut self, class: &str) -> String {
        self.top_level.claim(format!("{}_clinit", class_base(class)))
    }
}

#[cfg(test)]
mod tests;
