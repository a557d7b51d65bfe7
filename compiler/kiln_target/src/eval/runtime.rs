use std::cmp::Ordering;
use std::sync::Arc;

use kiln_ir::ArrayType;

use super::{EvalError, Heap, Value};

/// Functions the evaluated module imports from its host.
pub trait HostEnv {
    /// Call host function `name`. Unknown names report
    /// [`EvalError::UnknownFunction`].
    fn call(&mut self, name: &str, args: &[Value], heap: &mut Heap)
        -> Result<Option<Value>, EvalError>;
}

/// Runtime helper names referenced by lowered code.
pub mod names {
    pub const CALL_SITE_GLOBAL: &str = "rt.callSite";
    pub const CHECK_HANDLER: &str = "rt.checkHandler";
    pub const CALL_SITE_THROW: &str = "rt.callSiteThrow";
    pub const MONITOR_ENTER: &str = "rt.monitorEnter";
    pub const MONITOR_ENTER_SYNC: &str = "rt.monitorEnterSync";
    pub const MONITOR_EXIT: &str = "rt.monitorExit";
    pub const MONITOR_EXIT_SYNC: &str = "rt.monitorExitSync";
    pub const CLASS_OF: &str = "rt.classOf";
    pub const NEW_MULTI_ARRAY: &str = "rt.newMultiArray";
    pub const REMAINDER: &str = "rt.remainder";
    pub const COMPARE: &str = "rt.compare";
}

/// Host implementing the standard runtime helpers, recording every call.
#[derive(Debug, Default)]
pub struct StandardRuntime {
    /// Names of host functions called, in order.
    pub calls: Vec<String>,
    /// Current monitor nesting.
    pub monitor_depth: i32,
}

impl StandardRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.iter().filter(|c| *c == name).count()
    }
}

fn three_way<T: PartialOrd>(a: T, b: T) -> i32 {
    match a.partial_cmp(&b) {
        Some(Ordering::Less) => -1,
        Some(Ordering::Equal) => 0,
        Some(Ordering::Greater) | None => 1,
    }
}

fn bad_args(name: &str) -> EvalError {
    EvalError::TypeMismatch(format!("bad arguments to {name}"))
}

impl HostEnv for StandardRuntime {
    fn call(
        &mut self,
        name: &str,
        args: &[Value],
        heap: &mut Heap,
    ) -> Result<Option<Value>, EvalError> {
        self.calls.push(name.to_owned());
        let result = match (name, args) {
            ("rt.remainder.f32", &[Value::F32(a), Value::F32(b)]) => Some(Value::F32(a % b)),
            ("rt.remainder.f64", &[Value::F64(a), Value::F64(b)]) => Some(Value::F64(a % b)),
            ("rt.compare.i32", &[Value::I32(a), Value::I32(b)]) => Some(Value::I32(three_way(a, b))),
            ("rt.compare.i64", &[Value::I64(a), Value::I64(b)]) => Some(Value::I32(three_way(a, b))),
            ("rt.compare.f32", &[Value::F32(a), Value::F32(b)]) => Some(Value::I32(three_way(a, b))),
            ("rt.compare.f64", &[Value::F64(a), Value::F64(b)]) => Some(Value::I32(three_way(a, b))),
            (names::MONITOR_ENTER | names::MONITOR_ENTER_SYNC, [_]) => {
                self.monitor_depth += 1;
                None
            }
            (names::MONITOR_EXIT | names::MONITOR_EXIT_SYNC, [_]) => {
                self.monitor_depth -= 1;
                None
            }
            (names::CHECK_HANDLER | names::CALL_SITE_THROW, [Value::I32(_)]) => None,
            (names::CLASS_OF, &[Value::Ref(Some(descriptor))]) => {
                let text = heap
                    .string(descriptor)
                    .map(Arc::from)
                    .ok_or_else(|| bad_args(name))?;
                Some(Value::Ref(Some(heap.new_string(text))))
            }
            (_, dimensions) if name.starts_with(names::NEW_MULTI_ARRAY) => {
                let element = multi_array_element(name).ok_or_else(|| bad_args(name))?;
                let lengths = dimensions
                    .iter()
                    .map(|d| match d {
                        Value::I32(n) if *n >= 0 => usize::try_from(*n).map_err(|_| bad_args(name)),
                        Value::I32(_) => Err(EvalError::NegativeArraySize),
                        _ => Err(bad_args(name)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Some(Value::Ref(Some(new_multi_array(heap, element, &lengths))))
            }
            _ => return Err(EvalError::UnknownFunction(name.to_owned())),
        };
        Ok(result)
    }
}

fn multi_array_element(name: &str) -> Option<ArrayType> {
    let suffix = name.strip_prefix(names::NEW_MULTI_ARRAY)?.strip_prefix('.')?;
    Some(match suffix {
        "byte" => ArrayType::Byte,
        "short" => ArrayType::Short,
        "char" => ArrayType::Char,
        "int" => ArrayType::Int,
        "long" => ArrayType::Long,
        "float" => ArrayType::Float,
        "double" => ArrayType::Double,
        "object" => ArrayType::Object,
        _ => return None,
    })
}

/// Suffix of the multi-array helper for `element`.
pub const fn multi_array_suffix(element: ArrayType) -> &'static str {
    match element {
        ArrayType::Byte => "byte",
        ArrayType::Short => "short",
        ArrayType::Char => "char",
        ArrayType::Int => "int",
        ArrayType::Long => "long",
        ArrayType::Float => "float",
        ArrayType::Double => "double",
        ArrayType::Object => "object",
    }
}

fn new_multi_array(heap: &mut Heap, element: ArrayType, lengths: &[usize]) -> super::ObjectRef {
    match lengths {
        [] | [_] => heap.new_array(element, lengths.first().copied().unwrap_or(0)),
        [outer, rest @ ..] => {
            let items = (0..*outer)
                .map(|_| Value::Ref(Some(new_multi_array(heap, element, rest))))
                .collect();
            heap.alloc(super::HeapObject::Array {
                element: ArrayType::Object,
                items,
            })
        }
    }
}
