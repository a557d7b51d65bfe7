use kiln_ir::{FieldReference, MethodDescriptor, MethodReference};
use rustc_hash::FxHashSet;

/// Produces fresh aliases. Each call returns a name not handed out before in
/// the same namespace; caching per symbol is the caller's job.
pub trait AliasProvider {
    fn class_alias(&mut self, class: &str) -> String;

    /// Alias shared by every override of a virtual method.
    fn method_alias(&mut self, method: &MethodDescriptor) -> String;

    fn static_method_alias(&mut self, method: &MethodReference) -> String;

    fn field_alias(&mut self, field: &FieldReference) -> String;

    fn static_field_alias(&mut self, field: &FieldReference) -> String;

    /// Alias for a runtime helper function.
    fn function_alias(&mut self, name: &str) -> String;

    fn class_init_alias(&mut self, class: &str) -> String;
}

/// Words that cannot be used as identifiers in emitted source. Sorted.
pub const RESERVED_WORDS: &[&str] = &[
    "Infinity",
    "NaN",
    "arguments",
    "await",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "eval",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "implements",
    "import",
    "in",
    "instanceof",
    "interface",
    "let",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "static",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "undefined",
    "var",
    "void",
    "while",
    "with",
    "yield",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.binary_search(&name).is_ok()
}

/// Set of names already handed out in one namespace.
#[derive(Debug, Default)]
pub(crate) struct Namespace {
    used: FxHashSet<String>,
}

impl Namespace {
    /// Claim `base`, or `base$N` for the smallest free `N`.
    pub(crate) fn claim(&mut self, base: String) -> String {
        let base = if is_reserved(&base) {
            base + "_"
        } else {
            base
        };
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut suffix = 1u32;
        loop {
            let candidate = format!("{base}${suffix}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

/// Replace everything outside `[A-Za-z0-9_]` with `_` and keep the result
/// from starting with a digit.
pub(crate) fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        out.push('_');
    }
    out.extend(
        name.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }),
    );
    out
}
