use rayon::prelude::*;

/// Runs independent per-item work, in order or on the rayon pool.
///
/// Results always come back in input order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Executor {
    #[default]
    Sequential,
    Parallel,
}

impl Executor {
    pub fn new(parallel: bool) -> Self {
        if parallel {
            Executor::Parallel
        } else {
            Executor::Sequential
        }
    }

    pub fn map<T, R, F>(self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        match self {
            Executor::Sequential => items.iter().map(f).collect(),
            Executor::Parallel => items.par_iter().map(f).collect(),
        }
    }

    pub fn for_each_mut<T, F>(self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(&mut T) + Sync + Send,
    {
        match self {
            Executor::Sequential => items.iter_mut().for_each(f),
            Executor::Parallel => items.par_iter_mut().for_each(f),
        }
    }
}
