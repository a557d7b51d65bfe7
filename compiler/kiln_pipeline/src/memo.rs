use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

/// Concurrent memoizing map.
///
/// Computation runs outside any lock. When two threads miss on the same key
/// both may compute, but only the first insert is published and every caller
/// gets that value back.
#[derive(Debug)]
pub struct MemoCache<K: Eq + Hash, V> {
    entries: DashMap<K, Arc<V>>,
}

impl<K: Eq + Hash, V> Default for MemoCache<K, V> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> MemoCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn get_or_compute(&self, key: &K, compute: impl FnOnce(&K) -> V) -> Arc<V> {
        if let Some(value) = self.get(key) {
            return value;
        }
        let computed = Arc::new(compute(key));
        let published = self.entries.entry(key.clone()).or_insert(computed);
        Arc::clone(published.value())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
