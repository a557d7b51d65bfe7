use pretty_assertions::assert_eq;

use super::*;

#[test]
fn managed_sites_record_location_and_handlers() {
    let mut tracker = ManagedCallSites::new();
    let here = TextLocation::new("Main.java", 12);
    let handlers = [Some(Arc::from("java.lang.Exception")), None];

    let first = tracker.register(Some(&here), &handlers);
    let second = tracker.register(None, &[]);

    assert_eq!(first, Some(CallSiteId::new(0)));
    assert_eq!(second, Some(CallSiteId::new(1)));
    assert_eq!(tracker.sites()[0].location, Some(here));
    assert_eq!(
        tracker.sites()[0].handlers,
        vec![None, Some(Arc::from("java.lang.Exception"))]
    );
    assert!(tracker.sites()[1].handlers.is_empty());
}

#[test]
fn managed_protocol_uses_runtime_helpers() {
    let tracker = ManagedCallSites::new();
    let site = CallSiteId::new(3);

    assert_eq!(
        tracker.enter(site).kind,
        InstrKind::SetGlobal {
            name: Arc::from(names::CALL_SITE_GLOBAL),
            value: Box::new(Instr::i32_const(3)),
        }
    );
    assert_eq!(
        tracker.check_handler(site),
        Instr::call(names::CHECK_HANDLER, vec![Instr::i32_const(3)], None)
    );
    assert_eq!(
        tracker.throw_from(site),
        Instr::call(names::CALL_SITE_THROW, vec![Instr::i32_const(3)], None)
    );
}

#[test]
fn unmanaged_tracker_never_registers() {
    let mut tracker = NoCallSites;
    assert_eq!(tracker.register(None, &[None]), None);
}
