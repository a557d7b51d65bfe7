//! Method-level optimization pipeline.
//!
//! A [`Pass`] rewrites one method body in place and reports whether anything
//! changed. A [`PassPipeline`] runs its passes in order, repeating the whole
//! sequence until a round changes nothing or the iteration cap is reached.
//!
//! Methods are independent, so an [`Executor`] may run pipelines for many
//! methods at once. Results computed on demand across threads go through a
//! [`MemoCache`], which publishes exactly one value per key.

mod executor;
mod memo;
pub mod passes;
mod pipeline;

pub use executor::Executor;
pub use memo::MemoCache;
pub use pipeline::{Pass, PassContext, PassPipeline, PipelineRun, DEFAULT_ITERATION_LIMIT};
