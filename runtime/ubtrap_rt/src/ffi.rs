//! C-ABI embedding surface.
//!
//! Kernels, loaders, and application runtimes call one `ubtrap_install_*`
//! function during start-up to inject their halt primitive (and optionally
//! a line writer), before any instrumented code can trap. The policy toggle
//! is the privileged debug/test hook.

use crate::config::TrapConfig;
use crate::halt::{
    AbortFn, ApplicationAbort, HaltPrimitive, KernelPanic, KernelPanicFn, LoaderAbort,
};
use crate::runtime::{self, install, TrapRuntime};
use crate::sink::{DiagnosticSink, EmitFn, FfiSink, StderrSink};

/// Installed successfully.
pub const UBTRAP_OK: i32 = 0;
/// A runtime was already installed (or a violation already fired).
pub const UBTRAP_ERR_ALREADY_INSTALLED: i32 = -1;
/// The required halt primitive was null.
pub const UBTRAP_ERR_NULL_PRIMITIVE: i32 = -2;

fn install_with(emit: Option<EmitFn>, halt: Option<Box<dyn HaltPrimitive>>) -> i32 {
    let Some(halt) = halt else {
        return UBTRAP_ERR_NULL_PRIMITIVE;
    };
    let sink: Box<dyn DiagnosticSink> = match emit {
        Some(emit) => Box::new(FfiSink::new(emit)),
        None => Box::new(StderrSink),
    };
    match install(TrapRuntime::from_parts(&TrapConfig::default(), sink, halt)) {
        Ok(_) => UBTRAP_OK,
        Err(err) => {
            tracing::warn!(%err, "ubtrap install rejected");
            UBTRAP_ERR_ALREADY_INSTALLED
        }
    }
}

/// Install a runtime that halts through the kernel's fatal-error primitive.
#[no_mangle]
pub extern "C" fn ubtrap_install_kernel(
    emit: Option<EmitFn>,
    panic_fn: Option<KernelPanicFn>,
) -> i32 {
    install_with(
        emit,
        panic_fn.map(|f| Box::new(KernelPanic::new(f)) as Box<dyn HaltPrimitive>),
    )
}

/// Install a runtime that halts through a loader's abort primitive.
#[no_mangle]
pub extern "C" fn ubtrap_install_loader(emit: Option<EmitFn>, abort_fn: Option<AbortFn>) -> i32 {
    install_with(
        emit,
        abort_fn.map(|f| Box::new(LoaderAbort::new(f)) as Box<dyn HaltPrimitive>),
    )
}

/// Install a runtime that halts through an application runtime's abort
/// primitive.
#[no_mangle]
pub extern "C" fn ubtrap_install_application(
    emit: Option<EmitFn>,
    abort_fn: Option<AbortFn>,
) -> i32 {
    install_with(
        emit,
        abort_fn.map(|f| Box::new(ApplicationAbort::new(f)) as Box<dyn HaltPrimitive>),
    )
}

/// Toggle whether non-fatal violations halt. Returns the previous value.
///
/// May be called before `ubtrap_install_*`; the value carries over.
#[no_mangle]
pub extern "C" fn ubtrap_set_panic_on_violation(panic_on_violation: bool) -> bool {
    runtime::set_panic_on_violation(panic_on_violation)
}

#[no_mangle]
pub extern "C" fn ubtrap_panic_on_violation() -> bool {
    runtime::panic_on_violation()
}
