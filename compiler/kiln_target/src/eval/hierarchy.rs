use std::sync::Arc;

use kiln_ir::ROOT_CLASS;
use rustc_hash::FxHashMap;

/// Direct supertypes per class, for subtype tests and dispatch.
#[derive(Clone, Debug, Default)]
pub struct ClassHierarchy {
    supertypes: FxHashMap<Arc<str>, Vec<Arc<str>>>,
    parents: FxHashMap<Arc<str>, Arc<str>>,
}

impl ClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `class` with its superclass and implemented interfaces.
    pub fn declare(
        &mut self,
        class: impl Into<Arc<str>>,
        parent: Option<Arc<str>>,
        interfaces: impl IntoIterator<Item = Arc<str>>,
    ) {
        let class = class.into();
        let mut supers: Vec<Arc<str>> = Vec::new();
        if let Some(parent) = parent {
            self.parents.insert(Arc::clone(&class), Arc::clone(&parent));
            supers.push(parent);
        }
        supers.extend(interfaces);
        self.supertypes.insert(class, supers);
    }

    /// Whether values of class `sub` are assignable to `sup`.
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == ROOT_CLASS {
            return true;
        }
        let mut pending: Vec<&str> = vec![sub];
        let mut seen: Vec<&str> = Vec::new();
        while let Some(current) = pending.pop() {
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            if let Some(supers) = self.supertypes.get(current) {
                for s in supers {
                    if &**s == sup {
                        return true;
                    }
                    pending.push(s);
                }
            }
        }
        false
    }

    /// `class`, then its superclass chain up to the root.
    pub fn superclass_chain(&self, class: &str) -> Vec<Arc<str>> {
        let mut chain = vec![Arc::from(class)];
        let mut current: &str = class;
        while let Some(parent) = self.parents.get(current) {
            if chain.iter().any(|c| c == parent) {
                break;
            }
            chain.push(Arc::clone(parent));
            current = parent;
        }
        chain
    }
}
