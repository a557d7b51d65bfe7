use std::sync::Arc;

use kiln_ir::MethodReference;
use rustc_hash::FxHashMap;

use crate::eval::ClassHierarchy;
use crate::{Instr, ValType};

/// A lowered function.
///
/// `locals` lists every local, parameters first; temporaries allocated during
/// lowering are appended after the declared variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: Arc<str>,
    pub param_count: usize,
    pub result: Option<ValType>,
    pub locals: Vec<ValType>,
    pub body: Vec<Instr>,
}

impl Function {
    pub fn params(&self) -> &[ValType] {
        &self.locals[..self.param_count]
    }
}

/// A set of lowered functions plus the class hierarchy used for subtype tests
/// and virtual dispatch.
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub functions: FxHashMap<Arc<str>, Function>,
    pub classes: ClassHierarchy,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.insert(Arc::clone(&function.name), function);
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }
}

/// Canonical function name of a method: `Class.name(params)result`.
///
/// Virtual dispatch composes the runtime class with a descriptor to find the
/// implementation, so lowered code and the evaluator must agree on this form.
pub fn method_function_name(method: &MethodReference) -> Arc<str> {
    Arc::from(method.to_string())
}
