//! Switch lowering: a jump table for dense labels, a binary search over the
//! sorted labels otherwise.
//!
//! Clause bodies are laid out as nested blocks. The dispatch sits in the
//! innermost block; breaking out of block `i` falls into clause `i`, and
//! clauses fall through into each other in source order:
//!
//! ```text
//! block $break
//!   block $c_{n-1}
//!     ...
//!       block $c_0
//!         block $w0
//!           <dispatch>
//!         end          ;; clause 0
//!       end            ;; clause 1
//!     ...
//!   end                ;; default
//! end
//! ```

use std::iter;

use kiln_ir::{ExprId, StmtId, SwitchClause, TextLocation};
use kiln_target::{BlockId, Instr, InstrKind, IntBinaryOp, IntType};

use super::{Cached, GenerationVisitor};
use crate::LowerError;

type Result<T> = std::result::Result<T, LowerError>;

impl GenerationVisitor<'_> {
    pub(super) fn lower_switch(
        &mut self,
        id: StmtId,
        value: ExprId,
        clauses: &[SwitchClause],
        default: &[StmtId],
        location: Option<&TextLocation>,
        out: &mut Vec<Instr>,
    ) -> Result<()> {
        let value = self.lower_expr(value)?;
        let break_block = self.new_block();
        let initial = self.new_block();
        let clause_blocks: Vec<BlockId> = clauses.iter().map(|_| self.new_block()).collect();
        // Leaving `targets[i]` starts clause `i`; leaving the last clause block
        // starts the default body.
        let targets: Vec<BlockId> = iter::once(initial)
            .chain(clause_blocks.iter().copied())
            .take(clauses.len())
            .collect();
        let default_target = clause_blocks.last().copied().unwrap_or(initial);

        self.break_targets.insert(id, break_block);
        let saved_break = self.current_break.replace(id);
        let mut bodies = Vec::with_capacity(clauses.len());
        for clause in clauses {
            let mut body = Vec::new();
            self.lower_stmts(&clause.body, &mut body)?;
            bodies.push(body);
        }
        let mut default_body = Vec::new();
        self.lower_stmts(default, &mut default_body)?;
        self.current_break = saved_break;
        self.break_targets.remove(&id);

        let entries: Vec<(i32, BlockId)> = clauses
            .iter()
            .zip(&targets)
            .flat_map(|(clause, target)| clause.labels.iter().map(move |label| (*label, *target)))
            .collect();
        let dispatch = self.switch_dispatch(value, entries, default_target)?;

        let mut nested = Instr::block(initial, None, dispatch);
        for (block, body) in clause_blocks.into_iter().zip(bodies) {
            let mut contents = Vec::with_capacity(body.len() + 1);
            contents.push(nested);
            contents.extend(body);
            nested = Instr::block(block, None, contents);
        }
        let mut contents = Vec::with_capacity(default_body.len() + 1);
        contents.push(nested);
        contents.extend(default_body);
        out.push(Instr::block(break_block, None, contents).at(location));
        Ok(())
    }

    fn switch_dispatch(
        &mut self,
        value: Instr,
        mut entries: Vec<(i32, BlockId)>,
        default_target: BlockId,
    ) -> Result<Vec<Instr>> {
        // A label repeated across clauses routes to its first clause.
        entries.sort_by_key(|(label, _)| *label);
        entries.dedup_by_key(|(label, _)| *label);

        let (Some(&(min, _)), Some(&(max, _))) = (entries.first(), entries.last()) else {
            return Ok(vec![Instr::discard(value), Instr::break_to(default_target)]);
        };
        let span = i64::from(max) - i64::from(min);

        if span >= i64::from(self.switch_table_threshold) {
            tracing::debug!(span, labels = entries.len(), "switch lowered to binary search");
            return self.with_cached(value, |_, mut cached| {
                let mut body = Vec::new();
                cached.emit_init(&mut body);
                body.push(binary_search(&entries, &cached, default_target));
                Ok(body)
            });
        }

        tracing::debug!(span, labels = entries.len(), "switch lowered to jump table");
        let size = usize::try_from(span + 1)
            .map_err(|_| LowerError::internal(format!("switch span {span} out of range")))?;
        let mut table = vec![default_target; size];
        for (label, target) in entries {
            let slot = usize::try_from(i64::from(label) - i64::from(min))
                .map_err(|_| LowerError::internal(format!("label {label} below {min}")))?;
            table[slot] = target;
        }
        let selector = if min == 0 {
            value
        } else {
            Instr::int_binary(IntType::I32, IntBinaryOp::Sub, value, Instr::i32_const(min))
        };
        Ok(vec![Instr::new(InstrKind::Switch {
            selector: Box::new(selector),
            targets: table,
            default: default_target,
        })])
    }
}

/// Compare against the middle label and recurse into the half that can still
/// match. `entries` is sorted by label.
fn binary_search(entries: &[(i32, BlockId)], value: &Cached, default_target: BlockId) -> Instr {
    let (condition, then_body, else_body) = match entries {
        [] => return Instr::break_to(default_target),
        [(label, target)] => (
            Instr::int_binary(
                IntType::I32,
                IntBinaryOp::Eq,
                value.get(),
                Instr::i32_const(*label),
            ),
            Instr::break_to(*target),
            Instr::break_to(default_target),
        ),
        _ => {
            let mid = (entries.len() - 1) / 2;
            (
                Instr::int_binary(
                    IntType::I32,
                    IntBinaryOp::GtS,
                    value.get(),
                    Instr::i32_const(entries[mid].0),
                ),
                binary_search(&entries[mid + 1..], value, default_target),
                binary_search(&entries[..=mid], value, default_target),
            )
        }
    };
    Instr::new(InstrKind::Conditional {
        condition: Box::new(condition),
        ty: None,
        then_body: vec![then_body],
        else_body: vec![else_body],
    })
}
