use kiln_debuginfo::DebugLevel;
use kiln_lower::{LowerOptions, SWITCH_TABLE_THRESHOLD};
use kiln_pipeline::DEFAULT_ITERATION_LIMIT;

/// Settings for one compilation unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Emit call-site protocol and runtime checks.
    pub managed: bool,
    pub debug_level: DebugLevel,
    /// Short aliases and no formatting in the export table.
    pub minified: bool,
    /// Optimize and lower methods on the rayon pool.
    pub parallel: bool,
    /// Run the optimization pipeline before lowering.
    pub optimize: bool,
    /// Cap on pipeline rounds per method.
    pub pass_iteration_limit: usize,
    /// Label span from which switches use a binary search.
    pub switch_table_threshold: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            managed: false,
            debug_level: DebugLevel::None,
            minified: false,
            parallel: false,
            optimize: true,
            pass_iteration_limit: DEFAULT_ITERATION_LIMIT,
            switch_table_threshold: SWITCH_TABLE_THRESHOLD,
        }
    }
}

impl CompileOptions {
    /// Managed target with full debug information.
    #[must_use]
    pub fn development() -> Self {
        Self {
            managed: true,
            debug_level: DebugLevel::Full,
            ..Self::default()
        }
    }

    /// Minified, parallel build keeping only line tables.
    #[must_use]
    pub fn release() -> Self {
        Self {
            debug_level: DebugLevel::LinesOnly,
            minified: true,
            parallel: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_managed(mut self, managed: bool) -> Self {
        self.managed = managed;
        self
    }

    #[must_use]
    pub fn with_debug_level(mut self, level: DebugLevel) -> Self {
        self.debug_level = level;
        self
    }

    #[must_use]
    pub fn with_minified(mut self, minified: bool) -> Self {
        self.minified = minified;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    #[must_use]
    pub fn with_pass_iteration_limit(mut self, limit: usize) -> Self {
        self.pass_iteration_limit = limit;
        self
    }

    #[must_use]
    pub fn with_switch_table_threshold(mut self, threshold: u32) -> Self {
        self.switch_table_threshold = threshold;
        self
    }

    pub(crate) fn lower_options(&self) -> LowerOptions {
        LowerOptions {
            switch_table_threshold: self.switch_table_threshold,
        }
    }
}

#[cfg(test)]
mod tests;
