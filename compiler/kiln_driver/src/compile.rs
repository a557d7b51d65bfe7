use std::sync::Arc;

use kiln_debuginfo::{write_debug_file, DebugSection};
use kiln_ir::{ClassNode, MethodNode};
use kiln_lower::{
    lower_method, Backend, CallSite, GcBackend, LowerError, LowerOptions, ManagedCallSites,
    NoCallSites,
};
use kiln_pipeline::{Executor, PassPipeline};
use kiln_target::{Function, Module};
use rustc_hash::FxHashMap;

use crate::debug::DebugRecorder;
use crate::exports::{record_exports, render_exports, CLASS_INIT};
use crate::{CompileOptions, DriverError};

/// Output of one compilation unit.
#[derive(Debug)]
pub struct CompiledUnit {
    /// Lowered functions plus the class hierarchy.
    pub module: Module,
    /// Recorded call sites per function; empty for unmanaged targets.
    pub call_sites: FxHashMap<Arc<str>, Vec<CallSite>>,
    /// Export table binding aliases to function names.
    pub exports: String,
    pub debug_sections: Vec<DebugSection>,
}

impl CompiledUnit {
    /// Pack the debug sections into an external debug file, or `None` when
    /// there are none.
    pub fn debug_file(&self) -> Result<Option<Vec<u8>>, DriverError> {
        if self.debug_sections.is_empty() {
            return Ok(None);
        }
        Ok(Some(write_debug_file(&self.debug_sections)?))
    }
}

struct Lowered {
    function: Function,
    call_sites: Vec<CallSite>,
}

/// Compiles classes with fixed [`CompileOptions`].
#[derive(Debug)]
pub struct Compiler {
    options: CompileOptions,
    pipeline: PassPipeline,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        let pipeline =
            PassPipeline::standard().with_iteration_limit(options.pass_iteration_limit);
        Self { options, pipeline }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile `classes` into one unit.
    ///
    /// The first method that fails to lower aborts the whole unit.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(classes = classes.len(), parallel = self.options.parallel)
    )]
    pub fn compile(&self, mut classes: Vec<ClassNode>) -> Result<CompiledUnit, DriverError> {
        let executor = Executor::new(self.options.parallel);

        // ── Optimization ──

        if self.options.optimize {
            let mut methods: Vec<&mut MethodNode> = classes
                .iter_mut()
                .flat_map(|class| class.methods.iter_mut())
                .collect();
            executor.for_each_mut(&mut methods, |method| {
                self.pipeline.run(method);
            });
        }

        // ── Lowering ──

        let mut module = Module::new();
        for class in &classes {
            module.classes.declare(
                Arc::clone(&class.name),
                class.parent.clone(),
                class.interfaces.iter().cloned(),
            );
        }

        let backend = self.backend(&classes);
        let lower_options = self.options.lower_options();
        let methods: Vec<&MethodNode> = classes.iter().flat_map(|class| &class.methods).collect();
        let results = executor.map(&methods, |method| {
            lower(method, &backend, &lower_options)
        });

        let mut lowered = Vec::with_capacity(methods.len());
        for (method, result) in methods.iter().zip(results) {
            if let Some(output) = result? {
                lowered.push((*method, output));
            }
        }
        tracing::debug!(functions = lowered.len(), "methods lowered");

        // ── Exports and debug info ──

        let exported: Vec<&MethodNode> = lowered.iter().map(|(method, _)| *method).collect();
        let exports = render_exports(&record_exports(&exported), self.options.minified);

        let debug_sections = if self.options.debug_level.is_enabled() {
            let mut recorder = DebugRecorder::new(self.options.debug_level);
            recorder.record_layouts(&classes);
            for (method, output) in &lowered {
                recorder.record_function(method, &output.function);
            }
            recorder.finish()
        } else {
            Vec::new()
        };

        let mut call_sites = FxHashMap::default();
        for (_, output) in lowered {
            if !output.call_sites.is_empty() {
                call_sites.insert(Arc::clone(&output.function.name), output.call_sites);
            }
            module.add_function(output.function);
        }

        Ok(CompiledUnit {
            module,
            call_sites,
            exports,
            debug_sections,
        })
    }

    /// Backend shared by every method, knowing which classes need their
    /// initializer run before use.
    fn backend(&self, classes: &[ClassNode]) -> GcBackend {
        classes
            .iter()
            .filter(|class| {
                class
                    .methods
                    .iter()
                    .any(|method| method.is_static() && method.reference.name() == CLASS_INIT)
            })
            .fold(GcBackend::new(self.options.managed), |backend, class| {
                backend.with_initializer(Arc::clone(&class.name))
            })
    }
}

fn lower(
    method: &MethodNode,
    backend: &GcBackend,
    options: &LowerOptions,
) -> Result<Option<Lowered>, DriverError> {
    let mut backend = backend.clone();
    let failed = |source: LowerError| DriverError::Lower {
        method: method.reference.to_string(),
        source,
    };
    if backend.is_managed() {
        let mut sites = ManagedCallSites::new();
        let function = lower_method(method, &mut backend, &mut sites, options).map_err(failed)?;
        Ok(function.map(|function| Lowered {
            function,
            call_sites: sites.into_sites(),
        }))
    } else {
        let function =
            lower_method(method, &mut backend, &mut NoCallSites, options).map_err(failed)?;
        Ok(function.map(|function| Lowered {
            function,
            call_sites: Vec::new(),
        }))
    }
}

#[cfg(test)]
mod tests;
