//! Name assignment for Kiln output.
//!
//! Every class, method, field and runtime function that appears in emitted
//! code gets an alias that is a valid identifier, avoids reserved words and
//! never collides with another alias in the same namespace. Two namespaces
//! exist: top-level names (classes, static members, functions, class
//! initializers) and member names (virtual methods, instance fields).
//!
//! - [`DefaultAliasProvider`] derives readable names from the symbol.
//! - [`MinifyingAliasProvider`] hands out the shortest unused names.
//! - [`NamingStrategy`] caches aliases so a symbol is named once.
//!
//! Source text is written through a [`SourceWriter`]. A [`RememberedSource`]
//! records text and symbolic references so code can be generated before names
//! are final and replayed later.

mod alias;
mod minify;
mod readable;
pub mod remembered;
mod strategy;
mod writer;

pub use alias::{is_reserved, AliasProvider, RESERVED_WORDS};
pub use minify::MinifyingAliasProvider;
pub use readable::DefaultAliasProvider;
pub use remembered::RememberedSource;
pub use strategy::NamingStrategy;
pub use writer::{OutputSourceWriter, SourceWriter};
