use kiln_ir::{MethodBody, MethodNode, MethodReference};

/// Rounds a pipeline runs before giving up on reaching a fixed point.
pub const DEFAULT_ITERATION_LIMIT: usize = 16;

/// What a pass may know about the method it rewrites.
#[derive(Clone, Copy, Debug)]
pub struct PassContext<'a> {
    pub method: &'a MethodReference,
    /// Zero-based round of the enclosing pipeline.
    pub iteration: usize,
}

/// A rewrite over one method body.
///
/// `run` returns `true` if and only if it modified `body`. A pass that
/// reports `false` must leave the body untouched, otherwise the pipeline can
/// stop before the body is stable.
pub trait Pass: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, body: &mut MethodBody, context: &PassContext<'_>) -> bool;
}

/// Outcome of running a pipeline on one method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineRun {
    /// Rounds executed, including the final unchanged one.
    pub iterations: usize,
    /// Whether any pass changed the body.
    pub changed: bool,
    /// Whether the last round changed nothing.
    pub converged: bool,
}

pub struct PassPipeline {
    passes: Vec<Box<dyn Pass>>,
    iteration_limit: usize,
}

impl Default for PassPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl PassPipeline {
    /// Empty pipeline with the default iteration cap.
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            iteration_limit: DEFAULT_ITERATION_LIMIT,
        }
    }

    /// Constant folding followed by dead branch elimination.
    pub fn standard() -> Self {
        Self::new()
            .with_pass(crate::passes::ConstantFolding)
            .with_pass(crate::passes::DeadBranchElimination)
    }

    #[must_use]
    pub fn with_pass(mut self, pass: impl Pass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Cap on rounds; at least one round always runs.
    #[must_use]
    pub fn with_iteration_limit(mut self, limit: usize) -> Self {
        self.iteration_limit = limit.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Run every pass until a round changes nothing.
    ///
    /// Hitting the iteration cap is not an error: the body is valid after
    /// every pass, only possibly not fully optimized.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(method = %method.reference, passes = self.passes.len())
    )]
    pub fn run(&self, method: &mut MethodNode) -> PipelineRun {
        let mut outcome = PipelineRun::default();
        if self.passes.is_empty() || matches!(method.body, MethodBody::Native) {
            outcome.converged = true;
            return outcome;
        }

        while outcome.iterations < self.iteration_limit {
            let context = PassContext {
                method: &method.reference,
                iteration: outcome.iterations,
            };
            outcome.iterations += 1;

            let mut round_changed = false;
            for pass in &self.passes {
                if pass.run(&mut method.body, &context) {
                    tracing::debug!(pass = pass.name(), iteration = context.iteration, "pass changed");
                    round_changed = true;
                }
            }

            if !round_changed {
                outcome.converged = true;
                return outcome;
            }
            outcome.changed = true;
        }

        tracing::warn!(
            method = %method.reference,
            limit = self.iteration_limit,
            "pass pipeline stopped before reaching a fixed point"
        );
        outcome
    }
}

impl std::fmt::Debug for PassPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.passes.iter().map(|pass| pass.name()).collect();
        f.debug_struct("PassPipeline")
            .field("passes", &names)
            .field("iteration_limit", &self.iteration_limit)
            .finish()
    }
}
