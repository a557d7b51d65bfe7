//! Lowering of method bodies to the structured target.
//!
//! [`lower_method`] walks one method's statement/expression tree and produces a
//! [`Function`](kiln_target::Function) of structured target instructions.
//!
//! # Architecture
//!
//! - [`GenerationVisitor`] - owns per-method state (block ids, break targets,
//!   temporary pool) and dispatches on statement and expression kinds.
//! - [`Backend`] - target-specific object model: allocation, fields, arrays,
//!   virtual calls, type tests and exceptions. [`GcBackend`] is the reference
//!   implementation over GC structs and arrays.
//! - [`CallSiteTracker`] - call-site bookkeeping for managed targets, threaded
//!   through lowering explicitly. [`NoCallSites`] emits nothing;
//!   [`ManagedCallSites`] records every site with its enclosing handlers.
//! - [`condition`] - negation and normalization of boolean conditions.
//!
//! Temporaries are scoped by closures (`with_temp`, `with_cached`), so they are
//! released in LIFO order by construction.

mod backend;
mod callsite;
pub mod condition;
mod gc;
mod temps;
mod visitor;

use thiserror::Error;

pub use backend::{value_type, Backend};
pub use callsite::{CallSite, CallSiteId, CallSiteTracker, ManagedCallSites, NoCallSites};
pub use gc::GcBackend;
pub use temps::TempPool;
pub use visitor::{lower_method, GenerationVisitor, LowerOptions, SWITCH_TABLE_THRESHOLD};

/// Failure while lowering a method. Either variant aborts the whole method.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LowerError {
    /// The tree contains a shape this lowering does not handle.
    #[error("unsupported construct: {construct}")]
    Unsupported { construct: String },
    /// The tree violates a structural invariant (dangling break target,
    /// mismatched branch types, out-of-range variable).
    #[error("internal lowering error: {message}")]
    Internal { message: String },
}

impl LowerError {
    pub(crate) fn unsupported(construct: impl Into<String>) -> Self {
        LowerError::Unsupported {
            construct: construct.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        LowerError::Internal {
            message: message.into(),
        }
    }
}
