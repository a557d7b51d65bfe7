use kiln_ir::{FieldReference, MethodDescriptor, MethodReference};

use crate::alias::{is_reserved, AliasProvider};

const FIRST: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const REST: &[u8; 64] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_$";

/// Shortest-first aliases: `a`..`Z`, then `aa`, `ba`, ...
///
/// Top-level names and member names draw from separate counters. Reserved
/// words are skipped.
#[derive(Debug, Default)]
pub struct MinifyingAliasProvider {
    top_level: u32,
    members: u32,
}

impl MinifyingAliasProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The `index`-th short name. Injective: the first character encodes
/// `index % 52`, the rest spell the quotient in bijective base 64.
pub(crate) fn short_name(index: u32) -> String {
    let mut name = String::new();
    name.push(char::from(FIRST[index as usize % FIRST.len()]));
    let mut rest = index as usize / FIRST.len();
    while rest > 0 {
        rest -= 1;
        name.push(char::from(REST[rest % REST.len()]));
        rest /= REST.len();
    }
    name
}

fn next(counter: &mut u32) -> String {
    loop {
        let name = short_name(*counter);
        *counter += 1;
        if !is_reserved(&name) {
            return name;
        }
    }
}

impl AliasProvider for MinifyingAliasProvider {
    fn class_alias(&mut self, _class: &str) -> String {
        next(&mut self.top_level)
    }

    fn method_alias(&mut self, _method: &MethodDescriptor) -> String {
        next(&mut self.members)
    }

    fn static_method_alias(&mut self, _method: &MethodReference) -> String {
        next(&mut self.top_level)
    }

    fn field_alias(&mut self, _field: &FieldReference) -> String {
        next(&mut self.members)
    }

    fn static_field_alias(&mut self, _field: &FieldReference) -> String {
        next(&mut self.top_level)
    }

    fn function_alias(&mut self, _name: &str) -> String {
        next(&mut self.top_level)
    }

    fn class_init_alias(&mut self, _class: &str) -> String {
        next(&mut self.top_level)
    }
}
