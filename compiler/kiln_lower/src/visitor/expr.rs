//! Expression lowering.

use kiln_ir::{
    ArrayType, BinaryOperation, ConstantValue, ExprId, ExprKind, OperationType, TextLocation,
    UnaryOperation, ValueType, ROOT_CLASS,
};
use kiln_target::eval::names;
use kiln_target::{
    FloatBinaryOp, FloatType, Instr, InstrKind, IntBinaryOp, IntType, ValType,
};

use super::GenerationVisitor;
use crate::condition::{for_condition, negate};
use crate::LowerError;

type Result<T> = std::result::Result<T, LowerError>;

const fn operation_type(ty: OperationType) -> ValType {
    match ty {
        OperationType::Int => ValType::I32,
        OperationType::Long => ValType::I64,
        OperationType::Float => ValType::F32,
        OperationType::Double => ValType::F64,
    }
}

fn float_binary(ty: FloatType, op: FloatBinaryOp, first: Instr, second: Instr) -> Instr {
    Instr::new(InstrKind::FloatBinary {
        ty,
        op,
        first: Box::new(first),
        second: Box::new(second),
    })
}

fn ref_is_null(value: Instr) -> Instr {
    Instr::new(InstrKind::RefIsNull(Box::new(value)))
}

/// `(value << bits) >> bits`, sign- or zero-extending the low bits.
fn narrow(value: Instr, bits: i32, signed: bool) -> Instr {
    let shifted = Instr::int_binary(IntType::I32, IntBinaryOp::Shl, value, Instr::i32_const(bits));
    let op = if signed {
        IntBinaryOp::ShrS
    } else {
        IntBinaryOp::ShrU
    };
    Instr::int_binary(IntType::I32, op, shifted, Instr::i32_const(bits))
}

impl GenerationVisitor<'_> {
    pub(super) fn lower_expr_inner(&mut self, id: ExprId) -> Result<Instr> {
        let arena = self.arena;
        let expr = arena.expr(id);
        let location = expr.location.as_ref();

        let instr = match &expr.kind {
            ExprKind::Binary {
                op,
                ty,
                first,
                second,
            } => self.lower_binary(*op, *ty, *first, *second)?,
            ExprKind::Unary { op, ty, operand } => self.lower_unary(*op, *ty, *operand, location)?,
            ExprKind::Conditional {
                condition,
                consequent,
                alternative,
            } => {
                let condition = for_condition(self.lower_expr(*condition)?);
                let consequent = self.lower_expr(*consequent)?;
                let alternative = self.lower_expr(*alternative)?;
                let ty = self.result_type(&consequent);
                let other = self.result_type(&alternative);
                if ty != other {
                    return Err(LowerError::internal(format!(
                        "conditional branches yield {ty:?} and {other:?}"
                    )));
                }
                Instr::new(InstrKind::Conditional {
                    condition: Box::new(condition),
                    ty,
                    then_body: vec![consequent],
                    else_body: vec![alternative],
                })
            }
            ExprKind::Constant(value) => self.lower_constant(value),
            ExprKind::Variable { index } => Instr::get_local(self.local(*index)?),
            ExprKind::Subscript { array, index, ty } => {
                let array = self.lower_expr(*array)?;
                let index = self.lower_expr(*index)?;
                self.backend.array_get(*ty, array, index)
            }
            ExprKind::UnwrapArray { array, ty } => {
                let array = self.lower_expr(*array)?;
                self.backend.unwrap_array(*ty, array)
            }
            ExprKind::Invocation {
                kind,
                method,
                arguments,
            } => self.lower_invocation(*kind, method, arguments, false, location)?,
            ExprKind::Qualification {
                qualified,
                field,
                ty,
            } => {
                let object = qualified.map(|q| self.lower_expr(q)).transpose()?;
                self.backend.get_field(field, ty, object)
            }
            ExprKind::New { class } => {
                let site = self.register_call_site(location);
                let mut body = Vec::new();
                self.emit_enter(site, location, &mut body);
                body.push(self.backend.allocate_object(class, location));
                self.sequence(Some(ValType::Ref), body, location)
            }
            ExprKind::NewArray { element, length } => {
                let length = self.lower_expr(*length)?;
                let site = self.register_call_site(location);
                let mut body = Vec::new();
                self.emit_enter(site, location, &mut body);
                body.push(self.backend.allocate_array(element, length, location));
                self.sequence(Some(ValType::Ref), body, location)
            }
            ExprKind::NewMultiArray {
                element,
                dimensions,
            } => {
                let dimensions = dimensions
                    .iter()
                    .map(|d| self.lower_expr(*d))
                    .collect::<Result<Vec<_>>>()?;
                let site = self.register_call_site(location);
                let mut body = Vec::new();
                self.emit_enter(site, location, &mut body);
                body.push(
                    self.backend
                        .allocate_multi_array(element, dimensions, location),
                );
                self.sequence(Some(ValType::Ref), body, location)
            }
            ExprKind::ArrayFromData { element, data } => {
                self.lower_array_from_data(element, data, location)?
            }
            ExprKind::InstanceOf { value, ty } => {
                let value = self.lower_expr(*value)?;
                self.lower_instance_of(value, ty)?
            }
            ExprKind::Cast { value, target } => {
                let value = self.lower_expr(*value)?;
                self.lower_cast(value, target, location)?
            }
            ExprKind::PrimitiveCast {
                value,
                source,
                target,
            } => {
                let value = self.lower_expr(*value)?;
                if source == target {
                    value
                } else {
                    Instr::new(InstrKind::Conversion {
                        from: operation_type(*source),
                        to: operation_type(*target),
                        signed: true,
                        operand: Box::new(value),
                    })
                }
            }
            ExprKind::BoundCheck {
                index,
                array,
                lower,
            } => self.lower_bound_check(*index, *array, *lower, location)?,
        };
        Ok(instr.at(location))
    }

    // ── Operators ──────────────────────────────────────────────────

    fn lower_binary(
        &mut self,
        op: BinaryOperation,
        ty: Option<OperationType>,
        first: ExprId,
        second: ExprId,
    ) -> Result<Instr> {
        if matches!(op, BinaryOperation::And | BinaryOperation::Or) {
            return self.lower_logical(op == BinaryOperation::And, first, second);
        }
        let a = self.lower_expr(first)?;
        let b = self.lower_expr(second)?;

        let Some(ty) = ty else {
            let same = Instr::new(InstrKind::RefEq(Box::new(a), Box::new(b)));
            return match op {
                BinaryOperation::Equals => Ok(same),
                BinaryOperation::NotEquals => Ok(negate(same, self.canonical_booleans())),
                _ => Err(LowerError::unsupported(format!(
                    "{op:?} on references"
                ))),
            };
        };

        if op == BinaryOperation::Compare {
            let helper = format!("{}.{}", names::COMPARE, ty.suffix());
            return Ok(Instr::call(helper, vec![a, b], Some(ValType::I32)));
        }

        match ty {
            OperationType::Int | OperationType::Long => {
                let int = if ty == OperationType::Int {
                    IntType::I32
                } else {
                    IntType::I64
                };
                let int_op = match op {
                    BinaryOperation::Add => IntBinaryOp::Add,
                    BinaryOperation::Subtract => IntBinaryOp::Sub,
                    BinaryOperation::Multiply => IntBinaryOp::Mul,
                    BinaryOperation::Divide => IntBinaryOp::DivS,
                    BinaryOperation::Modulo => IntBinaryOp::RemS,
                    BinaryOperation::Equals => IntBinaryOp::Eq,
                    BinaryOperation::NotEquals => IntBinaryOp::Ne,
                    BinaryOperation::Less => IntBinaryOp::LtS,
                    BinaryOperation::LessOrEquals => IntBinaryOp::LeS,
                    BinaryOperation::Greater => IntBinaryOp::GtS,
                    BinaryOperation::GreaterOrEquals => IntBinaryOp::GeS,
                    BinaryOperation::BitwiseAnd => IntBinaryOp::And,
                    BinaryOperation::BitwiseOr => IntBinaryOp::Or,
                    BinaryOperation::BitwiseXor => IntBinaryOp::Xor,
                    BinaryOperation::LeftShift => IntBinaryOp::Shl,
                    BinaryOperation::RightShift => IntBinaryOp::ShrS,
                    BinaryOperation::UnsignedRightShift => IntBinaryOp::ShrU,
                    BinaryOperation::Compare | BinaryOperation::And | BinaryOperation::Or => {
                        return Err(LowerError::internal(format!("{op:?} reached integer path")))
                    }
                };
                let is_shift = matches!(
                    int_op,
                    IntBinaryOp::Shl | IntBinaryOp::ShrS | IntBinaryOp::ShrU
                );
                let b = if is_shift && int == IntType::I64 {
                    Instr::new(InstrKind::Conversion {
                        from: ValType::I32,
                        to: ValType::I64,
                        signed: true,
                        operand: Box::new(b),
                    })
                } else {
                    b
                };
                Ok(Instr::int_binary(int, int_op, a, b))
            }
            OperationType::Float | OperationType::Double => {
                let float = if ty == OperationType::Float {
                    FloatType::F32
                } else {
                    FloatType::F64
                };
                let float_op = match op {
                    BinaryOperation::Add => FloatBinaryOp::Add,
                    BinaryOperation::Subtract => FloatBinaryOp::Sub,
                    BinaryOperation::Multiply => FloatBinaryOp::Mul,
                    BinaryOperation::Divide => FloatBinaryOp::Div,
                    BinaryOperation::Equals => FloatBinaryOp::Eq,
                    BinaryOperation::NotEquals => FloatBinaryOp::Ne,
                    BinaryOperation::Less => FloatBinaryOp::Lt,
                    BinaryOperation::LessOrEquals => FloatBinaryOp::Le,
                    BinaryOperation::Greater => FloatBinaryOp::Gt,
                    BinaryOperation::GreaterOrEquals => FloatBinaryOp::Ge,
                    BinaryOperation::Modulo => {
                        let helper = format!("{}.{}", names::REMAINDER, ty.suffix());
                        return Ok(Instr::call(helper, vec![a, b], Some(float.val_type())));
                    }
                    _ => {
                        return Err(LowerError::unsupported(format!(
                            "{op:?} on {ty:?}"
                        )))
                    }
                };
                Ok(float_binary(float, float_op, a, b))
            }
        }
    }

    /// Short-circuit `&&`/`||`: a result block that exits early with the
    /// deciding constant.
    fn lower_logical(&mut self, is_and: bool, first: ExprId, second: ExprId) -> Result<Instr> {
        let first = for_condition(self.lower_expr(first)?);
        let second = self.lower_expr(second)?;
        let block = self.new_block();
        let (test, decided) = if is_and {
            (negate(first, self.canonical_booleans()), 0)
        } else {
            (first, 1)
        };
        let exit = Instr::branch(block, test, Some(Instr::i32_const(decided)));
        Ok(Instr::block(
            block,
            Some(ValType::I32),
            vec![Instr::discard(exit), second],
        ))
    }

    fn lower_unary(
        &mut self,
        op: UnaryOperation,
        ty: Option<OperationType>,
        operand: ExprId,
        location: Option<&TextLocation>,
    ) -> Result<Instr> {
        let value = self.lower_expr(operand)?;
        Ok(match op {
            UnaryOperation::Not => negate(value, self.canonical_booleans()),
            UnaryOperation::Negate => match ty {
                Some(OperationType::Int) => {
                    Instr::int_binary(IntType::I32, IntBinaryOp::Sub, Instr::i32_const(0), value)
                }
                Some(OperationType::Long) => Instr::int_binary(
                    IntType::I64,
                    IntBinaryOp::Sub,
                    Instr::new(InstrKind::I64Const(0)),
                    value,
                ),
                Some(OperationType::Float) => float_binary(
                    FloatType::F32,
                    FloatBinaryOp::Sub,
                    Instr::new(InstrKind::F32Const(0.0_f32.to_bits())),
                    value,
                ),
                Some(OperationType::Double) => float_binary(
                    FloatType::F64,
                    FloatBinaryOp::Sub,
                    Instr::new(InstrKind::F64Const(0.0_f64.to_bits())),
                    value,
                ),
                None => return Err(LowerError::unsupported("negation without operand type")),
            },
            UnaryOperation::Length => self.backend.array_length(value),
            UnaryOperation::IntToByte => narrow(value, 24, true),
            UnaryOperation::IntToShort => narrow(value, 16, true),
            UnaryOperation::IntToChar => narrow(value, 16, false),
            UnaryOperation::NullCheck => self.lower_null_check(value, location)?,
        })
    }

    fn lower_constant(&mut self, value: &ConstantValue) -> Instr {
        match value {
            ConstantValue::Null => Instr::new(InstrKind::RefNull),
            ConstantValue::Int(v) => Instr::i32_const(*v),
            ConstantValue::Long(v) => Instr::new(InstrKind::I64Const(*v)),
            ConstantValue::Float(bits) => Instr::new(InstrKind::F32Const(*bits)),
            ConstantValue::Double(bits) => Instr::new(InstrKind::F64Const(*bits)),
            ConstantValue::String(text) => self.backend.string_constant(text),
            ConstantValue::Class(ty) => self.backend.class_constant(ty),
        }
    }

    // ── Runtime checks ─────────────────────────────────────────────

    /// Raise through a fresh call site: register, backend throw, site throw.
    fn emit_raise(
        &mut self,
        location: Option<&TextLocation>,
        body: &mut Vec<Instr>,
        raise: impl FnOnce(&mut Self) -> Instr,
    ) {
        let site = self.register_call_site(location);
        self.emit_enter(site, location, body);
        body.push(raise(self));
        self.emit_throw_from(site, location, body);
    }

    fn lower_null_check(&mut self, value: Instr, location: Option<&TextLocation>) -> Result<Instr> {
        if !self.backend.is_managed() {
            return Ok(value);
        }
        let ty = self.value_type_of(&value)?;
        self.with_cached(value, |this, mut cached| {
            let block = this.new_block();
            let mut body = Vec::new();
            cached.emit_init(&mut body);
            let not_null = negate(ref_is_null(cached.get()), this.canonical_booleans());
            body.push(Instr::discard(Instr::branch(
                block,
                not_null,
                Some(cached.get()),
            )));
            this.emit_raise(location, &mut body, |this| {
                this.backend.throw_null_pointer(location)
            });
            Ok(Instr::block(block, Some(ty), body))
        })
    }

    fn lower_instance_of(&mut self, value: Instr, ty: &ValueType) -> Result<Instr> {
        self.with_cached(value, |this, mut cached| {
            let block = this.new_block();
            let mut body = Vec::new();
            cached.emit_init(&mut body);
            body.push(Instr::discard(Instr::branch(
                block,
                ref_is_null(cached.get()),
                Some(Instr::i32_const(0)),
            )));
            body.push(this.backend.instance_of(cached.get(), ty));
            Ok(Instr::block(block, Some(ValType::I32), body))
        })
    }

    fn lower_cast(
        &mut self,
        value: Instr,
        target: &ValueType,
        location: Option<&TextLocation>,
    ) -> Result<Instr> {
        if matches!(target, ValueType::Object(class) if &**class == ROOT_CLASS) {
            return Ok(value);
        }
        self.with_cached(value, |this, mut cached| {
            let block = this.new_block();
            let mut body = Vec::new();
            cached.emit_init(&mut body);
            body.push(Instr::discard(Instr::branch(
                block,
                ref_is_null(cached.get()),
                Some(cached.get()),
            )));
            let passes = this.backend.instance_of(cached.get(), target);
            body.push(Instr::discard(Instr::branch(
                block,
                passes,
                Some(cached.get()),
            )));
            this.emit_raise(location, &mut body, |this| {
                this.backend.throw_class_cast(location)
            });
            Ok(Instr::block(block, Some(ValType::Ref), body))
        })
    }

    fn lower_bound_check(
        &mut self,
        index: ExprId,
        array: Option<ExprId>,
        lower: bool,
        location: Option<&TextLocation>,
    ) -> Result<Instr> {
        let index = self.lower_expr(index)?;
        let array = array.map(|a| self.lower_expr(a)).transpose()?;
        if !self.backend.is_managed() || (array.is_none() && !lower) {
            return Ok(index);
        }
        self.with_cached(index, |this, mut cached| {
            let block = this.new_block();
            let mut body = Vec::new();
            cached.emit_init(&mut body);

            let below = |index: Instr, bound: Instr| {
                Instr::int_binary(IntType::I32, IntBinaryOp::LtS, index, bound)
            };
            match array {
                Some(array) => {
                    let length = this.backend.array_length(array);
                    let upper = Instr::discard(Instr::branch(
                        block,
                        below(cached.get(), length),
                        Some(cached.get()),
                    ));
                    if lower {
                        let negative = this.new_block();
                        body.push(Instr::block(
                            negative,
                            None,
                            vec![
                                Instr::branch(
                                    negative,
                                    below(cached.get(), Instr::i32_const(0)),
                                    None,
                                ),
                                upper,
                            ],
                        ));
                    } else {
                        body.push(upper);
                    }
                }
                None => {
                    let non_negative = Instr::int_binary(
                        IntType::I32,
                        IntBinaryOp::GeS,
                        cached.get(),
                        Instr::i32_const(0),
                    );
                    body.push(Instr::discard(Instr::branch(
                        block,
                        non_negative,
                        Some(cached.get()),
                    )));
                }
            }
            this.emit_raise(location, &mut body, |this| {
                this.backend.throw_array_index(location)
            });
            Ok(Instr::block(block, Some(ValType::I32), body))
        })
    }

    // ── Allocation ─────────────────────────────────────────────────

    fn lower_array_from_data(
        &mut self,
        element: &ValueType,
        data: &[ExprId],
        location: Option<&TextLocation>,
    ) -> Result<Instr> {
        let values = data
            .iter()
            .map(|d| self.lower_expr(*d))
            .collect::<Result<Vec<_>>>()?;
        let length = i32::try_from(values.len())
            .map_err(|_| LowerError::unsupported("array literal longer than i32::MAX"))?;
        let ty: ArrayType = element.array_type();
        let site = self.register_call_site(location);

        self.with_temp(ValType::Ref, |this, array| {
            let mut body = Vec::new();
            this.emit_enter(site, location, &mut body);
            let allocation =
                this.backend
                    .allocate_array(element, Instr::i32_const(length), location);
            body.push(Instr::set_local(array, allocation));
            for (index, value) in (0..length).zip(values) {
                let storage = this.backend.unwrap_array(ty, Instr::get_local(array));
                body.push(
                    this.backend
                        .array_set(ty, storage, Instr::i32_const(index), value),
                );
            }
            body.push(Instr::get_local(array));
            let block = this.new_block();
            Ok(Instr::block(block, Some(ValType::Ref), body))
        })
    }
}

