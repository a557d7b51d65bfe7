//! Call-site bookkeeping for managed targets.
//!
//! A call site is any instruction that may raise: calls, allocations, class
//! initialization, explicit throws and runtime checks. Managed targets record
//! the site id in a global before the instruction, consult the handler table
//! afterwards, and raise through the site when a check fails.

use std::sync::Arc;

use kiln_ir::TextLocation;
use kiln_target::eval::names;
use kiln_target::{Instr, InstrKind};

/// Index of a recorded call site.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallSiteId(u32);

impl CallSiteId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// A recorded call site.
#[derive(Clone, Debug, PartialEq)]
pub struct CallSite {
    pub id: CallSiteId,
    pub location: Option<TextLocation>,
    /// Exception classes of the enclosing handlers, innermost first.
    /// `None` catches everything.
    pub handlers: Vec<Option<Arc<str>>>,
}

/// Protocol instructions emitted around raising instructions.
pub trait CallSiteTracker {
    /// Record a site at `location`. `handlers` lists the exception classes of
    /// the enclosing try blocks, outermost first. Returns `None` when the target
    /// does not track sites; nothing is emitted then.
    fn register(
        &mut self,
        location: Option<&TextLocation>,
        handlers: &[Option<Arc<str>>],
    ) -> Option<CallSiteId>;

    /// Marks `site` as the current site.
    fn enter(&self, site: CallSiteId) -> Instr;

    /// Transfers to a handler if the preceding instruction raised.
    fn check_handler(&self, site: CallSiteId) -> Instr;

    /// Raises the pending exception from `site`.
    fn throw_from(&self, site: CallSiteId) -> Instr;
}

/// Tracker for unmanaged targets.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoCallSites;

impl CallSiteTracker for NoCallSites {
    fn register(&mut self, _: Option<&TextLocation>, _: &[Option<Arc<str>>]) -> Option<CallSiteId> {
        None
    }

    fn enter(&self, _: CallSiteId) -> Instr {
        Instr::new(InstrKind::Nop)
    }

    fn check_handler(&self, _: CallSiteId) -> Instr {
        Instr::new(InstrKind::Nop)
    }

    fn throw_from(&self, _: CallSiteId) -> Instr {
        Instr::new(InstrKind::Nop)
    }
}

/// Tracker recording every site, using the runtime's call-site global and
/// handler helpers.
#[derive(Clone, Debug, Default)]
pub struct ManagedCallSites {
    sites: Vec<CallSite>,
}

impl ManagedCallSites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sites(&self) -> &[CallSite] {
        &self.sites
    }

    pub fn into_sites(self) -> Vec<CallSite> {
        self.sites
    }
}

#[expect(
    clippy::cast_possible_wrap,
    reason = "call-site ids stay far below i32::MAX"
)]
fn id_const(site: CallSiteId) -> Instr {
    Instr::i32_const(site.raw() as i32)
}

impl CallSiteTracker for ManagedCallSites {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "call-site counts never exceed u32"
    )]
    fn register(
        &mut self,
        location: Option<&TextLocation>,
        handlers: &[Option<Arc<str>>],
    ) -> Option<CallSiteId> {
        let id = CallSiteId::new(self.sites.len() as u32);
        self.sites.push(CallSite {
            id,
            location: location.cloned(),
            handlers: handlers.iter().rev().cloned().collect(),
        });
        Some(id)
    }

    fn enter(&self, site: CallSiteId) -> Instr {
        Instr::new(InstrKind::SetGlobal {
            name: Arc::from(names::CALL_SITE_GLOBAL),
            value: Box::new(id_const(site)),
        })
    }

    fn check_handler(&self, site: CallSiteId) -> Instr {
        Instr::call(names::CHECK_HANDLER, vec![id_const(site)], None)
    }

    fn throw_from(&self, site: CallSiteId) -> Instr {
        Instr::call(names::CALL_SITE_THROW, vec![id_const(site)], None)
    }
}

#[cfg(test)]
mod tests;
