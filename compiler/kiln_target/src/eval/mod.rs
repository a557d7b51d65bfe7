//! Reference evaluator for target code.
//!
//! Executes lowered functions directly on the instruction tree. It exists to
//! verify lowering by behaviour: a lowered method is run on concrete inputs and
//! its result compared with the expected semantics, independent of the exact
//! instruction shapes the lowering chose.

mod hierarchy;
mod runtime;
mod value;

use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::{
    BlockId, FloatBinaryOp, FloatType, Instr, InstrKind, IntBinaryOp, IntType, IntUnaryOp, Module,
    ValType,
};

pub use hierarchy::ClassHierarchy;
pub use runtime::{multi_array_suffix, names, HostEnv, StandardRuntime};
pub use value::{array_descriptor, Heap, HeapObject, ObjectRef, Value};

/// Maximum nesting of function calls.
const MAX_CALL_DEPTH: usize = 2048;

/// Traps and contract violations raised while evaluating.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("branch to unknown block {0:?}")]
    UnknownBlock(BlockId),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("null dereference")]
    NullDereference,
    #[error("index {index} out of bounds for length {length}")]
    IndexOutOfBounds { index: i32, length: usize },
    #[error("negative array size")]
    NegativeArraySize,
    #[error("integer division by zero")]
    DivisionByZero,
    #[error("unreachable executed")]
    Unreachable,
    #[error("call depth limit of {MAX_CALL_DEPTH} exceeded")]
    CallDepthExceeded,
}

/// How a function call ended.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Returned(Option<Value>),
    Threw(Value),
}

/// Control flow out of one instruction.
enum Flow {
    Next(Option<Value>),
    Break(BlockId, Option<Value>),
    Return(Option<Value>),
    Throw(Value),
}

/// Evaluate an operand, propagating any non-local control flow.
macro_rules! operand {
    ($machine:expr, $instr:expr, $frame:expr) => {
        match $machine.eval($instr, $frame)? {
            Flow::Next(Some(value)) => value,
            Flow::Next(None) => {
                return Err(EvalError::TypeMismatch(format!(
                    "{:?} yields no value",
                    $instr.kind
                )))
            }
            other => return Ok(other),
        }
    };
}

fn expect_i32(value: Value) -> Result<i32, EvalError> {
    value
        .as_i32()
        .ok_or_else(|| EvalError::TypeMismatch(format!("expected i32, found {value:?}")))
}

fn expect_object(value: Value) -> Result<ObjectRef, EvalError> {
    match value {
        Value::Ref(Some(object)) => Ok(object),
        Value::Ref(None) => Err(EvalError::NullDereference),
        other => Err(EvalError::TypeMismatch(format!(
            "expected reference, found {other:?}"
        ))),
    }
}

/// Evaluator state: module, host, heap and globals.
pub struct Machine<'m, H> {
    module: &'m Module,
    host: H,
    heap: Heap,
    globals: FxHashMap<Arc<str>, Value>,
    caught: Option<Value>,
    depth: usize,
}

impl<'m, H: HostEnv> Machine<'m, H> {
    pub fn new(module: &'m Module, host: H) -> Self {
        Self {
            module,
            host,
            heap: Heap::default(),
            globals: FxHashMap::default(),
            caught: None,
            depth: 0,
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).copied()
    }

    /// Call `name` (a module function or a host function) with `args`.
    #[tracing::instrument(level = "trace", skip(self, args))]
    pub fn invoke(&mut self, name: &str, args: Vec<Value>) -> Result<Outcome, EvalError> {
        let Some(function) = self.module.function(name) else {
            let result = self.host.call(name, &args, &mut self.heap)?;
            return Ok(Outcome::Returned(result));
        };
        if args.len() != function.param_count {
            return Err(EvalError::TypeMismatch(format!(
                "{name} takes {} arguments, got {}",
                function.param_count,
                args.len()
            )));
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(EvalError::CallDepthExceeded);
        }
        let mut frame = args;
        frame.extend(
            function.locals[function.param_count..]
                .iter()
                .map(|ty| Value::zero(*ty)),
        );

        self.depth += 1;
        let flow = self.eval_body(&function.body, &mut frame);
        self.depth -= 1;

        match flow? {
            Flow::Next(value) | Flow::Return(value) => Ok(Outcome::Returned(value)),
            Flow::Throw(exception) => Ok(Outcome::Threw(exception)),
            Flow::Break(target, _) => Err(EvalError::UnknownBlock(target)),
        }
    }

    fn eval_body(&mut self, body: &[Instr], frame: &mut Vec<Value>) -> Result<Flow, EvalError> {
        let mut last = None;
        for instr in body {
            match self.eval(instr, frame)? {
                Flow::Next(value) => last = value,
                other => return Ok(other),
            }
        }
        Ok(Flow::Next(last))
    }

    fn eval_arguments(
        &mut self,
        arguments: &[Instr],
        frame: &mut Vec<Value>,
    ) -> Result<Result<Vec<Value>, Flow>, EvalError> {
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            match self.eval(argument, frame)? {
                Flow::Next(Some(value)) => values.push(value),
                Flow::Next(None) => {
                    return Err(EvalError::TypeMismatch("argument yields no value".into()))
                }
                other => return Ok(Err(other)),
            }
        }
        Ok(Ok(values))
    }

    fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Flow, EvalError> {
        Ok(match self.invoke(name, args)? {
            Outcome::Returned(value) => Flow::Next(value),
            Outcome::Threw(exception) => Flow::Throw(exception),
        })
    }

    fn eval(&mut self, instr: &Instr, frame: &mut Vec<Value>) -> Result<Flow, EvalError> {
        kiln_stack::ensure_sufficient_stack(|| self.eval_inner(instr, frame))
    }

    fn eval_inner(&mut self, instr: &Instr, frame: &mut Vec<Value>) -> Result<Flow, EvalError> {
        let value = match &instr.kind {
            InstrKind::Nop => None,
            InstrKind::Block {
                id,
                is_loop: false,
                body,
                ..
            } => match self.eval_body(body, frame)? {
                Flow::Break(target, value) if target == *id => value,
                Flow::Next(value) => value,
                other => return Ok(other),
            },
            InstrKind::Block {
                id,
                is_loop: true,
                body,
                ..
            } => loop {
                match self.eval_body(body, frame)? {
                    Flow::Break(target, _) if target == *id => {}
                    Flow::Next(value) => break value,
                    other => return Ok(other),
                }
            },
            InstrKind::Branch {
                target,
                condition,
                result,
            } => {
                let result = match result {
                    Some(result) => Some(operand!(self, result, frame)),
                    None => None,
                };
                let condition = expect_i32(operand!(self, condition, frame))?;
                if condition != 0 {
                    return Ok(Flow::Break(*target, result));
                }
                result
            }
            InstrKind::Break { target, result } => {
                let result = match result {
                    Some(result) => Some(operand!(self, result, frame)),
                    None => None,
                };
                return Ok(Flow::Break(*target, result));
            }
            InstrKind::Switch {
                selector,
                targets,
                default,
            } => {
                let selector = expect_i32(operand!(self, selector, frame))?;
                let target = usize::try_from(selector)
                    .ok()
                    .and_then(|i| targets.get(i))
                    .unwrap_or(default);
                return Ok(Flow::Break(*target, None));
            }
            InstrKind::Conditional {
                condition,
                then_body,
                else_body,
                ..
            } => {
                let condition = expect_i32(operand!(self, condition, frame))?;
                let body = if condition != 0 { then_body } else { else_body };
                return self.eval_body(body, frame);
            }
            InstrKind::Return(result) => {
                let result = match result {
                    Some(result) => Some(operand!(self, result, frame)),
                    None => None,
                };
                return Ok(Flow::Return(result));
            }
            InstrKind::Drop(operand) => match self.eval(operand, frame)? {
                Flow::Next(_) => None,
                other => return Ok(other),
            },
            InstrKind::Unreachable => return Err(EvalError::Unreachable),

            InstrKind::I32Const(v) => Some(Value::I32(*v)),
            InstrKind::I64Const(v) => Some(Value::I64(*v)),
            InstrKind::F32Const(bits) => Some(Value::F32(f32::from_bits(*bits))),
            InstrKind::F64Const(bits) => Some(Value::F64(f64::from_bits(*bits))),
            InstrKind::RefNull => Some(Value::NULL),
            InstrKind::StringConst(text) => {
                Some(Value::Ref(Some(self.heap.new_string(Arc::clone(text)))))
            }

            InstrKind::IntBinary {
                ty,
                op,
                first,
                second,
            } => {
                let a = operand!(self, first, frame);
                let b = operand!(self, second, frame);
                Some(int_binary(*ty, *op, a, b)?)
            }
            InstrKind::IntUnary {
                op: IntUnaryOp::Eqz,
                operand,
                ..
            } => match operand!(self, operand, frame) {
                Value::I32(v) => Some(Value::I32(i32::from(v == 0))),
                Value::I64(v) => Some(Value::I32(i32::from(v == 0))),
                other => return Err(EvalError::TypeMismatch(format!("eqz of {other:?}"))),
            },
            InstrKind::FloatBinary {
                ty,
                op,
                first,
                second,
            } => {
                let a = operand!(self, first, frame);
                let b = operand!(self, second, frame);
                Some(float_binary(*ty, *op, a, b)?)
            }
            InstrKind::Conversion {
                from,
                to,
                signed,
                operand,
            } => {
                let v = operand!(self, operand, frame);
                Some(convert(*from, *to, *signed, v)?)
            }

            InstrKind::GetLocal(local) => Some(
                *frame
                    .get(local.index())
                    .ok_or_else(|| EvalError::TypeMismatch(format!("no local {local:?}")))?,
            ),
            InstrKind::SetLocal { local, value } => {
                let v = operand!(self, value, frame);
                let slot = frame
                    .get_mut(local.index())
                    .ok_or_else(|| EvalError::TypeMismatch(format!("no local {local:?}")))?;
                *slot = v;
                None
            }
            InstrKind::GetGlobal { name, ty } => {
                Some(self.globals.get(name).copied().unwrap_or(Value::zero(*ty)))
            }
            InstrKind::SetGlobal { name, value } => {
                let v = operand!(self, value, frame);
                self.globals.insert(Arc::clone(name), v);
                None
            }

            InstrKind::Call {
                function,
                arguments,
                ..
            } => {
                let args = match self.eval_arguments(arguments, frame)? {
                    Ok(args) => args,
                    Err(flow) => return Ok(flow),
                };
                return self.call(function, args);
            }
            InstrKind::CallVirtual {
                descriptor,
                arguments,
                ..
            } => {
                let args = match self.eval_arguments(arguments, frame)? {
                    Ok(args) => args,
                    Err(flow) => return Ok(flow),
                };
                let receiver = expect_object(args.first().copied().unwrap_or(Value::NULL))?;
                let class = self.heap.class_of(receiver);
                let target = self
                    .module
                    .classes
                    .superclass_chain(&class)
                    .into_iter()
                    .map(|c| format!("{c}.{descriptor}"))
                    .find(|name| self.module.function(name).is_some())
                    .ok_or_else(|| EvalError::UnknownFunction(format!("{class}.{descriptor}")))?;
                return self.call(&target, args);
            }

            InstrKind::Try { body, catch_body } => match self.eval_body(body, frame)? {
                Flow::Throw(exception) => {
                    self.caught = Some(exception);
                    return self.eval_body(catch_body, frame);
                }
                other => return Ok(other),
            },
            InstrKind::CaughtException => Some(self.caught.unwrap_or(Value::NULL)),
            InstrKind::Throw(exception) => {
                let exception = operand!(self, exception, frame);
                expect_object(exception)?;
                return Ok(Flow::Throw(exception));
            }

            InstrKind::StructNew { class } => {
                Some(Value::Ref(Some(self.heap.new_struct(Arc::clone(class)))))
            }
            InstrKind::StructGet { field, object, ty } => {
                let object = expect_object(operand!(self, object, frame))?;
                match self.heap.get(object) {
                    HeapObject::Struct { fields, .. } => {
                        Some(fields.get(field).copied().unwrap_or(Value::zero(*ty)))
                    }
                    other => {
                        return Err(EvalError::TypeMismatch(format!(
                            "field {field} of {other:?}"
                        )))
                    }
                }
            }
            InstrKind::StructSet {
                field,
                object,
                value,
            } => {
                let object = expect_object(operand!(self, object, frame))?;
                let v = operand!(self, value, frame);
                match self.heap.get_mut(object) {
                    HeapObject::Struct { fields, .. } => {
                        fields.insert(Arc::clone(field), v);
                    }
                    other => {
                        return Err(EvalError::TypeMismatch(format!(
                            "field {field} of {other:?}"
                        )))
                    }
                }
                None
            }
            InstrKind::ArrayNew { element, length } => {
                let length = expect_i32(operand!(self, length, frame))?;
                let length = usize::try_from(length).map_err(|_| EvalError::NegativeArraySize)?;
                Some(Value::Ref(Some(self.heap.new_array(*element, length))))
            }
            InstrKind::ArrayGet { array, index, .. } => {
                let array = expect_object(operand!(self, array, frame))?;
                let index = expect_i32(operand!(self, index, frame))?;
                let items = self.array_items(array)?;
                Some(*element_at(items, index)?)
            }
            InstrKind::ArraySet {
                element,
                array,
                index,
                value,
            } => {
                let array = expect_object(operand!(self, array, frame))?;
                let index = expect_i32(operand!(self, index, frame))?;
                let v = value::narrow(*element, operand!(self, value, frame));
                let items = self.array_items_mut(array)?;
                let length = items.len();
                let slot = usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get_mut(i))
                    .ok_or(EvalError::IndexOutOfBounds { index, length })?;
                *slot = v;
                None
            }
            InstrKind::ArrayLength(array) => {
                let array = expect_object(operand!(self, array, frame))?;
                let length = self.array_items(array)?.len();
                let length = i32::try_from(length)
                    .map_err(|_| EvalError::TypeMismatch(format!("array length {length}")))?;
                Some(Value::I32(length))
            }
            InstrKind::RefIsNull(value) => {
                let v = operand!(self, value, frame);
                Some(Value::I32(i32::from(v == Value::NULL)))
            }
            InstrKind::RefEq(first, second) => {
                let a = operand!(self, first, frame);
                let b = operand!(self, second, frame);
                Some(Value::I32(i32::from(a == b)))
            }
            InstrKind::RefTest { class, value } => match operand!(self, value, frame) {
                Value::Ref(None) => Some(Value::I32(0)),
                Value::Ref(Some(object)) => {
                    let actual = self.heap.class_of(object);
                    let is = self.module.classes.is_subtype(&actual, class);
                    Some(Value::I32(i32::from(is)))
                }
                other => return Err(EvalError::TypeMismatch(format!("ref.test of {other:?}"))),
            },
        };
        Ok(Flow::Next(value))
    }

    fn array_items(&self, array: ObjectRef) -> Result<&[Value], EvalError> {
        match self.heap.get(array) {
            HeapObject::Array { items, .. } => Ok(items),
            other => Err(EvalError::TypeMismatch(format!("not an array: {other:?}"))),
        }
    }

    fn array_items_mut(&mut self, array: ObjectRef) -> Result<&mut Vec<Value>, EvalError> {
        match self.heap.get_mut(array) {
            HeapObject::Array { items, .. } => Ok(items),
            other => Err(EvalError::TypeMismatch(format!("not an array: {other:?}"))),
        }
    }
}

fn element_at(items: &[Value], index: i32) -> Result<&Value, EvalError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .ok_or(EvalError::IndexOutOfBounds {
            index,
            length: items.len(),
        })
}

#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    reason = "target semantics reinterpret integer bits"
)]
fn int_binary(ty: IntType, op: IntBinaryOp, a: Value, b: Value) -> Result<Value, EvalError> {
    use IntBinaryOp as Op;
    match (ty, a, b) {
        (IntType::I32, Value::I32(a), Value::I32(b)) => Ok(match op {
            Op::Add => Value::I32(a.wrapping_add(b)),
            Op::Sub => Value::I32(a.wrapping_sub(b)),
            Op::Mul => Value::I32(a.wrapping_mul(b)),
            Op::DivS | Op::RemS | Op::DivU | Op::RemU if b == 0 => {
                return Err(EvalError::DivisionByZero)
            }
            Op::DivS => Value::I32(a.wrapping_div(b)),
            Op::RemS => Value::I32(a.wrapping_rem(b)),
            Op::DivU => Value::I32(((a as u32) / (b as u32)) as i32),
            Op::RemU => Value::I32(((a as u32) % (b as u32)) as i32),
            Op::And => Value::I32(a & b),
            Op::Or => Value::I32(a | b),
            Op::Xor => Value::I32(a ^ b),
            Op::Shl => Value::I32(a.wrapping_shl(b as u32)),
            Op::ShrS => Value::I32(a.wrapping_shr(b as u32)),
            Op::ShrU => Value::I32((a as u32).wrapping_shr(b as u32) as i32),
            Op::Eq => Value::I32(i32::from(a == b)),
            Op::Ne => Value::I32(i32::from(a != b)),
            Op::LtS => Value::I32(i32::from(a < b)),
            Op::LeS => Value::I32(i32::from(a <= b)),
            Op::GtS => Value::I32(i32::from(a > b)),
            Op::GeS => Value::I32(i32::from(a >= b)),
            Op::LtU => Value::I32(i32::from((a as u32) < (b as u32))),
            Op::LeU => Value::I32(i32::from((a as u32) <= (b as u32))),
            Op::GtU => Value::I32(i32::from((a as u32) > (b as u32))),
            Op::GeU => Value::I32(i32::from((a as u32) >= (b as u32))),
        }),
        (IntType::I64, Value::I64(a), Value::I64(b)) => Ok(match op {
            Op::Add => Value::I64(a.wrapping_add(b)),
            Op::Sub => Value::I64(a.wrapping_sub(b)),
            Op::Mul => Value::I64(a.wrapping_mul(b)),
            Op::DivS | Op::RemS | Op::DivU | Op::RemU if b == 0 => {
                return Err(EvalError::DivisionByZero)
            }
            Op::DivS => Value::I64(a.wrapping_div(b)),
            Op::RemS => Value::I64(a.wrapping_rem(b)),
            Op::DivU => Value::I64(((a as u64) / (b as u64)) as i64),
            Op::RemU => Value::I64(((a as u64) % (b as u64)) as i64),
            Op::And => Value::I64(a & b),
            Op::Or => Value::I64(a | b),
            Op::Xor => Value::I64(a ^ b),
            Op::Shl => Value::I64(a.wrapping_shl(b as u32)),
            Op::ShrS => Value::I64(a.wrapping_shr(b as u32)),
            Op::ShrU => Value::I64((a as u64).wrapping_shr(b as u32) as i64),
            Op::Eq => Value::I32(i32::from(a == b)),
            Op::Ne => Value::I32(i32::from(a != b)),
            Op::LtS => Value::I32(i32::from(a < b)),
            Op::LeS => Value::I32(i32::from(a <= b)),
            Op::GtS => Value::I32(i32::from(a > b)),
            Op::GeS => Value::I32(i32::from(a >= b)),
            Op::LtU => Value::I32(i32::from((a as u64) < (b as u64))),
            Op::LeU => Value::I32(i32::from((a as u64) <= (b as u64))),
            Op::GtU => Value::I32(i32::from((a as u64) > (b as u64))),
            Op::GeU => Value::I32(i32::from((a as u64) >= (b as u64))),
        }),
        (ty, a, b) => Err(EvalError::TypeMismatch(format!(
            "{ty:?}.{op:?} of {a:?}, {b:?}"
        ))),
    }
}

fn float_binary(ty: FloatType, op: FloatBinaryOp, a: Value, b: Value) -> Result<Value, EvalError> {
    use FloatBinaryOp as Op;
    macro_rules! apply {
        ($a:expr, $b:expr, $wrap:path) => {
            match op {
                Op::Add => $wrap($a + $b),
                Op::Sub => $wrap($a - $b),
                Op::Mul => $wrap($a * $b),
                Op::Div => $wrap($a / $b),
                Op::Eq => Value::I32(i32::from($a == $b)),
                Op::Ne => Value::I32(i32::from($a != $b)),
                Op::Lt => Value::I32(i32::from($a < $b)),
                Op::Le => Value::I32(i32::from($a <= $b)),
                Op::Gt => Value::I32(i32::from($a > $b)),
                Op::Ge => Value::I32(i32::from($a >= $b)),
            }
        };
    }
    match (ty, a, b) {
        (FloatType::F32, Value::F32(a), Value::F32(b)) => Ok(apply!(a, b, Value::F32)),
        (FloatType::F64, Value::F64(a), Value::F64(b)) => Ok(apply!(a, b, Value::F64)),
        (ty, a, b) => Err(EvalError::TypeMismatch(format!(
            "{ty:?}.{op:?} of {a:?}, {b:?}"
        ))),
    }
}

#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "conversions follow target semantics"
)]
fn convert(from: ValType, to: ValType, signed: bool, value: Value) -> Result<Value, EvalError> {
    Ok(match (from, to, value) {
        (f, t, v) if f == t => v,
        (ValType::I32, ValType::I64, Value::I32(v)) => {
            Value::I64(if signed { i64::from(v) } else { i64::from(v as u32) })
        }
        (ValType::I64, ValType::I32, Value::I64(v)) => Value::I32(v as i32),
        (ValType::I32, ValType::F32, Value::I32(v)) => {
            Value::F32(if signed { v as f32 } else { (v as u32) as f32 })
        }
        (ValType::I32, ValType::F64, Value::I32(v)) => {
            Value::F64(if signed { f64::from(v) } else { f64::from(v as u32) })
        }
        (ValType::I64, ValType::F32, Value::I64(v)) => {
            Value::F32(if signed { v as f32 } else { (v as u64) as f32 })
        }
        (ValType::I64, ValType::F64, Value::I64(v)) => {
            Value::F64(if signed { v as f64 } else { (v as u64) as f64 })
        }
        (ValType::F32, ValType::I32, Value::F32(v)) => {
            Value::I32(if signed { v as i32 } else { (v as u32) as i32 })
        }
        (ValType::F32, ValType::I64, Value::F32(v)) => {
            Value::I64(if signed { v as i64 } else { (v as u64) as i64 })
        }
        (ValType::F64, ValType::I32, Value::F64(v)) => {
            Value::I32(if signed { v as i32 } else { (v as u32) as i32 })
        }
        (ValType::F64, ValType::I64, Value::F64(v)) => {
            Value::I64(if signed { v as i64 } else { (v as u64) as i64 })
        }
        (ValType::F32, ValType::F64, Value::F32(v)) => Value::F64(f64::from(v)),
        (ValType::F64, ValType::F32, Value::F64(v)) => Value::F32(v as f32),
        (from, to, v) => {
            return Err(EvalError::TypeMismatch(format!(
                "conversion {from:?} -> {to:?} of {v:?}"
            )))
        }
    })
}

#[cfg(test)]
mod tests;
