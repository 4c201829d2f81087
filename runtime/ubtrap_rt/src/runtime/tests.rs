use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use ubtrap_ir::{
    Check, OverflowData, OverflowOp, StaticTypeDescriptor, UnreachableData, REPORTED_BIT,
};

use super::*;
use crate::halt::ExecutionContext;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<String>>>);

impl Capture {
    fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl DiagnosticSink for Capture {
    fn emit(&self, report: &Report<'_>) {
        self.0.lock().unwrap().push(report.to_string());
    }
}

/// Payload unwound out of [`Unwind`] so tests can observe a halt.
#[derive(Debug)]
struct Halted;

struct Unwind;

impl HaltPrimitive for Unwind {
    fn context(&self) -> ExecutionContext {
        ExecutionContext::Hosted
    }

    fn halt(&self) {
        panic::panic_any(Halted);
    }
}

fn runtime_with(panic_on_violation: bool) -> (TrapRuntime, Capture) {
    let capture = Capture::default();
    let config = TrapConfig::default().with_panic_on_violation(panic_on_violation);
    (TrapRuntime::new(&config, capture.clone(), Unwind), capture)
}

fn halts<R>(f: impl FnOnce() -> R) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(_) => false,
        Err(payload) => payload.is::<Halted>(),
    }
}

const ADD: Event = Event::recoverable(Check::Overflow(OverflowOp::Add));

static INT: StaticTypeDescriptor<6> = StaticTypeDescriptor::integer(5, true, *b"'int'\0");

#[test]
fn repeated_reports_emit_once() {
    let (rt, capture) = runtime_with(false);
    let loc = SourceLocation::new(c"a.c", 10, 5);

    assert_eq!(rt.report(&loc, ADD, false), Outcome::Reported);
    assert_eq!(rt.report(&loc, ADD, false), Outcome::Suppressed);
    assert_eq!(rt.report(&loc, ADD, false), Outcome::Suppressed);

    assert_eq!(capture.lines(), ["Undefined behavior add_overflow at a.c:10 col 5"]);
    assert_eq!(loc.column(), 5);
    assert_eq!(loc.raw_column(), 5 | REPORTED_BIT);
}

#[test]
fn distinct_locations_report_independently() {
    let (rt, capture) = runtime_with(false);
    let first = SourceLocation::new(c"a.c", 1, 1);
    let second = SourceLocation::new(c"a.c", 2, 1);

    rt.report(&first, ADD, false);
    rt.report(&second, ADD, false);

    assert_eq!(capture.lines().len(), 2);
}

#[test]
fn policy_enabled_halts_non_fatal() {
    let (rt, capture) = runtime_with(true);
    let loc = SourceLocation::new(c"p.c", 3, 4);

    assert!(halts(|| rt.report(&loc, ADD, false)));
    assert_eq!(capture.lines().len(), 1);
}

#[test]
fn already_reported_location_does_not_halt() {
    let (rt, capture) = runtime_with(true);
    let loc = SourceLocation::new(c"p.c", 3, 4);

    assert!(halts(|| rt.report(&loc, ADD, false)));
    assert!(!halts(|| rt.report(&loc, ADD, false)));
    assert_eq!(capture.lines().len(), 1);
}

#[test]
fn fatal_halts_regardless_of_policy() {
    let (rt, _capture) = runtime_with(false);
    let loc = SourceLocation::new(c"f.c", 1, 1);
    assert!(halts(|| rt.report(&loc, ADD, true)));
}

#[test]
fn toggled_policy_takes_effect() {
    let (rt, _capture) = runtime_with(true);
    assert!(rt.policy().set_panic_on_violation(false));

    let loc = SourceLocation::new(c"t.c", 1, 1);
    assert!(!halts(|| rt.report(&loc, ADD, false)));
}

#[test]
fn check_uses_descriptor_location() {
    let (rt, capture) = runtime_with(false);
    let data = OverflowData::new(SourceLocation::new(c"d.c", 8, 2), INT.as_ptr());

    assert_eq!(rt.check(&data, ADD), Outcome::Reported);
    assert_eq!(rt.check(&data, ADD), Outcome::Suppressed);
    assert_eq!(capture.lines(), ["Undefined behavior add_overflow at d.c:8 col 2"]);
}

#[test]
fn check_with_abort_event_halts() {
    let (rt, capture) = runtime_with(false);
    let data = OverflowData::new(SourceLocation::new(c"d.c", 9, 2), INT.as_ptr());
    let event = Event::abort(Check::Overflow(OverflowOp::Sub));

    assert!(halts(|| rt.check(&data, event)));
    assert_eq!(capture.lines(), ["Undefined behavior sub_overflow_abort at d.c:9 col 2"]);
}

#[test]
fn check_fatal_halts_even_when_suppressed() {
    let (rt, capture) = runtime_with(false);
    let data = UnreachableData::new(SourceLocation::new(c"u.c", 4, 4));
    let event = Event::recoverable(Check::BuiltinUnreachable);

    assert!(halts(|| rt.check_fatal(Some(&data), event)));
    assert!(halts(|| rt.check_fatal(Some(&data), event)));
    assert!(halts(|| rt.check_fatal::<UnreachableData>(None, event)));
    assert_eq!(capture.lines(), ["Undefined behavior builtin_unreachable at u.c:4 col 4"]);
}

#[test]
fn concurrent_reports_emit_once() {
    const THREADS: usize = 32;

    let (rt, capture) = runtime_with(false);
    let loc = SourceLocation::new(c"race.c", 42, 7);
    let barrier = Barrier::new(THREADS);

    let reported = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    rt.report(&loc, ADD, false)
                })
            })
            .collect();
        handles
            .into_iter()
            .filter_map(|h| h.join().ok())
            .filter(|outcome| *outcome == Outcome::Reported)
            .count()
    });

    assert_eq!(reported, 1);
    assert_eq!(capture.lines(), ["Undefined behavior add_overflow at race.c:42 col 7"]);
}

#[test]
fn install_rejects_second_runtime() {
    // The first install may lose to another test touching the global;
    // either way the second must fail.
    let _ = install(TrapRuntime::hosted(&TrapConfig::continue_on_violation()));
    let second = install(TrapRuntime::hosted(&TrapConfig::default()));
    assert_eq!(second.unwrap_err(), InstallError::AlreadyInstalled);
    assert!(format!("{:?}", runtime()).contains("TrapRuntime"));
}

proptest! {
    #[test]
    fn idempotent_for_any_call_count(column in 0u32..REPORTED_BIT, calls in 2usize..32) {
        let (rt, capture) = runtime_with(false);
        let loc = SourceLocation::new(c"prop.c", 1, column);

        let reported = (0..calls)
            .filter(|_| rt.report(&loc, ADD, false) == Outcome::Reported)
            .count();

        prop_assert_eq!(reported, 1);
        prop_assert_eq!(capture.lines().len(), 1);
        prop_assert_eq!(loc.column(), column);
    }
}
