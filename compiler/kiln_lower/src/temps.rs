use rustc_hash::FxHashMap;

use kiln_target::{LocalId, ValType};

/// Local slots of one function: declared variables followed by temporaries.
///
/// Released temporaries are reused for later requests of the same type.
/// Temporaries must be released in reverse acquisition order.
#[derive(Clone, Debug)]
pub struct TempPool {
    locals: Vec<ValType>,
    free: FxHashMap<ValType, Vec<LocalId>>,
    live: Vec<LocalId>,
}

impl TempPool {
    /// Pool over `declared` locals; temporaries are appended after them.
    pub fn new(declared: Vec<ValType>) -> Self {
        Self {
            locals: declared,
            free: FxHashMap::default(),
            live: Vec::new(),
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "local counts never exceed u32"
    )]
    pub fn acquire(&mut self, ty: ValType) -> LocalId {
        let local = match self.free.get_mut(&ty).and_then(Vec::pop) {
            Some(local) => local,
            None => {
                let local = LocalId::new(self.locals.len() as u32);
                self.locals.push(ty);
                local
            }
        };
        self.live.push(local);
        local
    }

    /// Return `local` to the pool.
    ///
    /// # Panics
    ///
    /// Panics if `local` is not the most recently acquired live temporary.
    pub fn release(&mut self, local: LocalId) {
        let top = self.live.pop();
        assert_eq!(
            top,
            Some(local),
            "temporaries must be released in LIFO order"
        );
        let ty = self.locals[local.index()];
        self.free.entry(ty).or_default().push(local);
    }

    /// Number of temporaries currently acquired.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Every local, declared and temporary.
    pub fn locals(&self) -> &[ValType] {
        &self.locals
    }

    pub fn into_locals(self) -> Vec<ValType> {
        self.locals
    }
}
