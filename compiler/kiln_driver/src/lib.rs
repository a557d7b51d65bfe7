//! Compilation driver for Kiln.
//!
//! [`Compiler::compile`] takes a set of finalized classes through every
//! back-end phase:
//!
//! 1. the optimization pipeline, run to a fixed point per method
//! 2. lowering of each method body to target instructions
//! 3. the export table, recorded once and rendered through the naming
//!    strategy
//! 4. debug information: line tables, and at [`DebugLevel::Full`] variable
//!    ranges and class layouts
//!
//! Methods are independent in phases 1 and 2, so both run on the rayon pool
//! when [`CompileOptions::parallel`] is set. Phases 3 and 4 walk the methods in
//! declaration order, which keeps the output identical either way.

mod compile;
mod debug;
mod exports;
mod options;

use std::sync::Once;

use kiln_debuginfo::DebugFileError;
use kiln_lower::LowerError;
use thiserror::Error;

pub use compile::{CompiledUnit, Compiler};
pub use kiln_debuginfo::DebugLevel;
pub use options::CompileOptions;

/// Failure of a compilation unit.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("cannot lower `{method}`: {source}")]
    Lower {
        method: String,
        #[source]
        source: LowerError,
    },
    #[error("cannot package debug information: {0}")]
    DebugFile(#[from] DebugFileError),
}

static TRACING_INIT: Once = Once::new();

/// Install a tracing subscriber filtered by `RUST_LOG`.
///
/// Embedders call this once before compiling. Does nothing when `RUST_LOG` is
/// unset, and only the first call has any effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
