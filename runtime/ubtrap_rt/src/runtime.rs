//! The trap dispatcher: dedup, report, and halt.
//!
//! A [`TrapRuntime`] owns the three things a report needs: the [`Policy`],
//! a [`DiagnosticSink`], and a [`HaltPrimitive`]. One runtime is installed
//! process-wide for the `__ubsan_handle_*` entry points; Rust code can also
//! build private runtimes and report through them directly.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use ubtrap_ir::{Descriptor, Detail, Event, SourceLocation};

use crate::config::TrapConfig;
use crate::halt::{self, HaltPrimitive, ProcessAbort};
use crate::policy::Policy;
use crate::report::{Outcome, Report};
use crate::sink::{hosted_sink, DiagnosticSink};

/// Error installing the process-wide runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InstallError {
    #[error("a trap runtime is already installed")]
    AlreadyInstalled,
}

/// Dedup/report core plus the capabilities it reports through.
pub struct TrapRuntime {
    policy: Policy,
    sink: Box<dyn DiagnosticSink>,
    halt: Box<dyn HaltPrimitive>,
}

impl fmt::Debug for TrapRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrapRuntime")
            .field("policy", &self.policy)
            .field("context", &self.halt.context())
            .finish_non_exhaustive()
    }
}

impl TrapRuntime {
    pub fn new(
        config: &TrapConfig,
        sink: impl DiagnosticSink + 'static,
        halt: impl HaltPrimitive + 'static,
    ) -> Self {
        Self::from_parts(config, Box::new(sink), Box::new(halt))
    }

    pub fn from_parts(
        config: &TrapConfig,
        sink: Box<dyn DiagnosticSink>,
        halt: Box<dyn HaltPrimitive>,
    ) -> Self {
        TrapRuntime {
            policy: Policy::new(config.panic_on_violation),
            sink,
            halt,
        }
    }

    /// Runtime for an ordinary process: configured sink, `abort()` to halt.
    pub fn hosted(config: &TrapConfig) -> Self {
        Self::from_parts(config, hosted_sink(config.sink), Box::new(ProcessAbort))
    }

    /// Hosted runtime configured from the environment.
    ///
    /// Invalid configuration is logged and replaced by defaults: a
    /// violation has already happened by the time this runs, and it must
    /// still be reported.
    pub fn hosted_from_env() -> Self {
        let config = TrapConfig::from_env().unwrap_or_else(|err| {
            tracing::warn!(%err, "invalid ubtrap configuration, using defaults");
            TrapConfig::default()
        });
        Self::hosted(&config)
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Report a violation at `loc`.
    ///
    /// The first call for a location emits one line and then halts if
    /// `fatal` is set or the policy asks for it. Every later call for the
    /// same location returns [`Outcome::Suppressed`] without side effects.
    pub fn report(&self, loc: &SourceLocation, event: Event, fatal: bool) -> Outcome {
        self.report_with(loc, event, fatal, None)
    }

    /// Report a descriptor through its location prefix.
    ///
    /// Fatal events (control flow, `_abort` entry points) never return
    /// when this call claims the location.
    pub fn check<D: Descriptor>(&self, data: &D, event: Event) -> Outcome {
        self.report_with(data.location(), event, event.is_fatal(), Some(&Detail(data)))
    }

    /// Report a descriptor, then halt unconditionally.
    ///
    /// Halts even when the location was already reported or `data` is
    /// missing: the caller must not resume.
    pub fn check_fatal<D: Descriptor>(&self, data: Option<&D>, event: Event) -> ! {
        match data {
            Some(data) => {
                self.report_with(data.location(), event, true, Some(&Detail(data)));
            }
            None => tracing::warn!(event = event.name(), "null violation descriptor"),
        }
        self.halt()
    }

    /// Halt through the injected primitive, never returning.
    pub fn halt(&self) -> ! {
        halt::halt(self.halt.as_ref())
    }

    fn report_with(
        &self,
        loc: &SourceLocation,
        event: Event,
        fatal: bool,
        detail: Option<&dyn fmt::Display>,
    ) -> Outcome {
        if !loc.mark_reported() {
            tracing::trace!(
                event = event.name(),
                line = loc.line(),
                column = loc.column(),
                "violation already reported"
            );
            return Outcome::Suppressed;
        }

        self.sink.emit(&Report::new(event, loc));
        if let Some(detail) = detail {
            tracing::debug!(event = event.name(), kind = %event.kind(), %detail, "violation detail");
        }

        if self.policy.should_halt(fatal) {
            self.halt();
        }
        Outcome::Reported
    }
}

static RUNTIME: OnceLock<TrapRuntime> = OnceLock::new();

/// Policy requested before any runtime existed: 0 = none, else `1 + bool`.
static EARLY_POLICY: AtomicU8 = AtomicU8::new(NO_EARLY_POLICY);
const NO_EARLY_POLICY: u8 = 0;

fn encode_policy(panic_on_violation: bool) -> u8 {
    1 + u8::from(panic_on_violation)
}

fn decode_policy(raw: u8) -> Option<bool> {
    (raw != NO_EARLY_POLICY).then_some(raw == 2)
}

/// Hand a pending early policy over to `runtime`, if one is waiting.
fn apply_early_policy(runtime: &TrapRuntime) {
    if EARLY_POLICY.load(Ordering::Relaxed) == NO_EARLY_POLICY {
        return;
    }
    if let Some(panic_on_violation) =
        decode_policy(EARLY_POLICY.swap(NO_EARLY_POLICY, Ordering::Relaxed))
    {
        runtime.policy.set_panic_on_violation(panic_on_violation);
    }
}

/// Install the process-wide runtime used by the entry points.
///
/// Must run before the first violation; afterwards the hosted default is
/// already in place and installation fails. A policy set earlier through
/// [`set_panic_on_violation`] overrides the one in `runtime`.
pub fn install(runtime: TrapRuntime) -> Result<&'static TrapRuntime, InstallError> {
    let mut installed = false;
    let current = RUNTIME.get_or_init(|| {
        installed = true;
        runtime
    });
    if !installed {
        return Err(InstallError::AlreadyInstalled);
    }
    apply_early_policy(current);
    tracing::info!(
        context = %current.halt.context(),
        panic_on_violation = current.policy.panic_on_violation(),
        "trap runtime installed"
    );
    Ok(current)
}

/// The process-wide runtime, built from the environment on first use if
/// nothing was installed.
pub fn runtime() -> &'static TrapRuntime {
    let current = RUNTIME.get_or_init(TrapRuntime::hosted_from_env);
    apply_early_policy(current);
    current
}

/// Toggle the process-wide policy, returning the previous value.
///
/// Never builds a runtime: before installation the value is held and
/// applied by [`install`] (or by the hosted default on first violation).
pub fn set_panic_on_violation(panic_on_violation: bool) -> bool {
    if let Some(current) = RUNTIME.get() {
        return current.policy.set_panic_on_violation(panic_on_violation);
    }
    let previous = EARLY_POLICY.swap(encode_policy(panic_on_violation), Ordering::Relaxed);
    tracing::debug!(panic_on_violation, "violation policy held until install");
    // An install may have completed since the check above.
    if let Some(current) = RUNTIME.get() {
        apply_early_policy(current);
    }
    decode_policy(previous).unwrap_or(TrapConfig::default().panic_on_violation)
}

/// The process-wide policy, without building a runtime.
pub fn panic_on_violation() -> bool {
    match RUNTIME.get() {
        Some(current) => current.policy.panic_on_violation(),
        None => decode_policy(EARLY_POLICY.load(Ordering::Relaxed))
            .unwrap_or(TrapConfig::default().panic_on_violation),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
