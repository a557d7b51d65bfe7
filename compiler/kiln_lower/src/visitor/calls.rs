//! Method invocation.

use kiln_ir::{ExprId, InvocationKind, MethodReference, TextLocation};
use kiln_target::{Instr, ValType};

use super::GenerationVisitor;
use crate::{value_type, CallSiteId, LowerError};

type Result<T> = std::result::Result<T, LowerError>;

impl GenerationVisitor<'_> {
    /// Lower a call. With `will_drop` a produced value is discarded.
    ///
    /// Managed calls are bracketed by the call-site protocol: the site is
    /// entered just before the call (after every argument is evaluated) and
    /// the handler is checked right after it returns.
    pub(super) fn lower_invocation(
        &mut self,
        kind: InvocationKind,
        method: &MethodReference,
        arguments: &[ExprId],
        will_drop: bool,
        location: Option<&TextLocation>,
    ) -> Result<Instr> {
        let managed = self.backend.is_managed() && self.backend.is_managed_call(method);
        if !managed {
            let (call, _) = self.call_shape(kind, method, arguments, None, location)?;
            if will_drop && self.result_type(&call).is_some() {
                return Ok(Instr::discard(call));
            }
            return Ok(call);
        }

        let site = self.register_call_site(location);
        let (call, entered) = self.call_shape(kind, method, arguments, site, location)?;
        let mut body = Vec::new();
        if !entered {
            self.emit_enter(site, location, &mut body);
        }
        match self.result_type(&call) {
            Some(ty) if !will_drop => self.with_temp(ty, |this, result| {
                body.push(Instr::set_local(result, call));
                this.emit_check_handler(site, location, &mut body);
                body.push(Instr::get_local(result));
                Ok(this.sequence(Some(ty), body, location))
            }),
            Some(_) => {
                body.push(Instr::discard(call));
                self.emit_check_handler(site, location, &mut body);
                Ok(self.sequence(None, body, location))
            }
            None => {
                body.push(call);
                self.emit_check_handler(site, location, &mut body);
                Ok(self.sequence(None, body, location))
            }
        }
    }

    /// The bare call. The flag reports whether the site entry was folded into
    /// the last argument.
    fn call_shape(
        &mut self,
        kind: InvocationKind,
        method: &MethodReference,
        arguments: &[ExprId],
        site: Option<CallSiteId>,
        location: Option<&TextLocation>,
    ) -> Result<(Instr, bool)> {
        let result = value_type(method.result());
        match kind {
            InvocationKind::Static | InvocationKind::Special => {
                let mut args = self.lower_arguments(arguments)?;
                let entered = self.enter_in_last_argument(&mut args, site, location)?;
                let function = self.backend.method_function(method);
                Ok((Instr::call(function, args, result), entered))
            }
            InvocationKind::Constructor => self.with_temp(ValType::Ref, |this, instance| {
                let allocation = this.backend.allocate_object(&method.class, location);
                let mut args = vec![Instr::get_local(instance)];
                args.extend(this.lower_arguments(arguments)?);
                let entered = this.enter_in_last_argument(&mut args, site, location)?;
                let function = this.backend.method_function(method);
                let body = vec![
                    Instr::set_local(instance, allocation),
                    Instr::call(function, args, None),
                    Instr::get_local(instance),
                ];
                let block = this.new_block();
                Ok((Instr::block(block, Some(ValType::Ref), body), entered))
            }),
            InvocationKind::Virtual => {
                let (receiver, rest) = arguments.split_first().ok_or_else(|| {
                    LowerError::internal(format!("virtual call to {method} has no receiver"))
                })?;
                let receiver = self.lower_expr(*receiver)?;
                self.with_temp(ValType::Ref, |this, instance| {
                    let mut args = vec![Instr::get_local(instance)];
                    args.extend(this.lower_arguments(rest)?);
                    let entered = this.enter_in_last_argument(&mut args, site, location)?;
                    let call = this.backend.virtual_call(instance, method, args);
                    let body = vec![Instr::set_local(instance, receiver), call];
                    let block = this.new_block();
                    Ok((Instr::block(block, result, body), entered))
                })
            }
        }
    }

    fn lower_arguments(&mut self, arguments: &[ExprId]) -> Result<Vec<Instr>> {
        arguments.iter().map(|a| self.lower_expr(*a)).collect()
    }

    /// Evaluate the site entry after the last argument, so that nothing the
    /// arguments call can overwrite it.
    fn enter_in_last_argument(
        &mut self,
        args: &mut Vec<Instr>,
        site: Option<CallSiteId>,
        location: Option<&TextLocation>,
    ) -> Result<bool> {
        let Some(site) = site else {
            return Ok(false);
        };
        let Some(last) = args.pop() else {
            return Ok(false);
        };
        let ty = self.value_type_of(&last)?;
        let wrapped = if last.is_trivially_repeatable() {
            let mut body = Vec::new();
            self.emit_enter(Some(site), location, &mut body);
            body.push(last);
            let block = self.new_block();
            Instr::block(block, Some(ty), body)
        } else {
            self.with_temp(ty, |this, value| {
                let mut body = vec![Instr::set_local(value, last)];
                this.emit_enter(Some(site), location, &mut body);
                body.push(Instr::get_local(value));
                let block = this.new_block();
                Ok(Instr::block(block, Some(ty), body))
            })?
        };
        args.push(wrapped);
        Ok(true)
    }
}
