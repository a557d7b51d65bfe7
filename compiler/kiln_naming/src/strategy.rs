use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;

use kiln_ir::{FieldReference, MethodDescriptor, MethodReference};
use rustc_hash::FxHashMap;

use crate::alias::AliasProvider;
use crate::minify::MinifyingAliasProvider;
use crate::readable::DefaultAliasProvider;

/// Caches one alias per symbol on top of an [`AliasProvider`].
///
/// Virtual methods are keyed by descriptor alone, so every override of a
/// method shares its alias and dispatch by name works.
pub struct NamingStrategy {
    provider: Box<dyn AliasProvider + Send>,
    classes: FxHashMap<Arc<str>, Arc<str>>,
    methods: FxHashMap<MethodDescriptor, Arc<str>>,
    static_methods: FxHashMap<MethodReference, Arc<str>>,
    fields: FxHashMap<FieldReference, Arc<str>>,
    static_fields: FxHashMap<FieldReference, Arc<str>>,
    functions: FxHashMap<Arc<str>, Arc<str>>,
    class_inits: FxHashMap<Arc<str>, Arc<str>>,
}

impl NamingStrategy {
    pub fn new(provider: Box<dyn AliasProvider + Send>) -> Self {
        Self {
            provider,
            classes: FxHashMap::default(),
            methods: FxHashMap::default(),
            static_methods: FxHashMap::default(),
            fields: FxHashMap::default(),
            static_fields: FxHashMap::default(),
            functions: FxHashMap::default(),
            class_inits: FxHashMap::default(),
        }
    }

    pub fn readable() -> Self {
        Self::new(Box::new(DefaultAliasProvider::new()))
    }

    pub fn minifying() -> Self {
        Self::new(Box::new(MinifyingAliasProvider::new()))
    }

    pub fn name_for_class(&mut self, class: &str) -> Arc<str> {
        cached(&mut self.classes, class, |key: &str| Arc::from(key), || {
            self.provider.class_alias(class)
        })
    }

    pub fn name_for_method(&mut self, method: &MethodDescriptor) -> Arc<str> {
        cached(&mut self.methods, method, Clone::clone, || {
            self.provider.method_alias(method)
        })
    }

    /// Alias for a method called without dispatch.
    pub fn full_name_for(&mut self, method: &MethodReference) -> Arc<str> {
        cached(&mut self.static_methods, method, Clone::clone, || {
            self.provider.static_method_alias(method)
        })
    }

    pub fn name_for_field(&mut self, field: &FieldReference) -> Arc<str> {
        cached(&mut self.fields, field, Clone::clone, || {
            self.provider.field_alias(field)
        })
    }

    pub fn name_for_static_field(&mut self, field: &FieldReference) -> Arc<str> {
        cached(&mut self.static_fields, field, Clone::clone, || {
            self.provider.static_field_alias(field)
        })
    }

    pub fn name_for_function(&mut self, name: &str) -> Arc<str> {
        cached(&mut self.functions, name, |key: &str| Arc::from(key), || {
            self.provider.function_alias(name)
        })
    }

    pub fn name_for_class_init(&mut self, class: &str) -> Arc<str> {
        cached(&mut self.class_inits, class, |key: &str| Arc::from(key), || {
            self.provider.class_init_alias(class)
        })
    }
}

impl std::fmt::Debug for NamingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamingStrategy")
            .field("classes", &self.classes.len())
            .field("methods", &self.methods.len())
            .field("static_methods", &self.static_methods.len())
            .field("fields", &self.fields.len())
            .field("static_fields", &self.static_fields.len())
            .field("functions", &self.functions.len())
            .field("class_inits", &self.class_inits.len())
            .finish_non_exhaustive()
    }
}

fn cached<K, Q>(
    map: &mut FxHashMap<K, Arc<str>>,
    key: &Q,
    owned: impl FnOnce(&Q) -> K,
    make: impl FnOnce() -> String,
) -> Arc<str>
where
    K: Borrow<Q> + Hash + Eq,
    Q: ?Sized + Hash + Eq,
{
    if let Some(alias) = map.get(key) {
        return Arc::clone(alias);
    }
    let alias: Arc<str> = Arc::from(make());
    tracing::trace!(alias = &*alias, "alias assigned");
    map.insert(owned(key), Arc::clone(&alias));
    alias
}

#[cfg(test)]
mod tests;
