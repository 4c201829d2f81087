//! Halt primitives, one per execution context.
//!
//! The runtime is linked into very different images: a privileged kernel,
//! a loader stage, or an unprivileged application runtime. Each exposes its
//! own fail-stop primitive, and none of those is declared non-returning.
//! [`halt`] wraps whichever primitive was injected and guarantees that
//! control never comes back.

use std::fmt;

/// Kernel fatal-error primitive.
pub type KernelPanicFn = extern "C" fn();

/// Loader or application abort primitive taking an error code.
pub type AbortFn = extern "C" fn(u32);

/// Generic error code passed to a loader's abort primitive.
pub const LOADER_GENERIC_ERROR: u32 = 2;

/// Generic error status passed to an application runtime's abort primitive.
pub const TEE_ERROR_GENERIC: u32 = 0xFFFF_0000;

/// Execution context a halt primitive belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ExecutionContext {
    Kernel,
    Loader,
    Application,
    /// Ordinary hosted process.
    Hosted,
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionContext::Kernel => "kernel",
            ExecutionContext::Loader => "loader",
            ExecutionContext::Application => "application",
            ExecutionContext::Hosted => "hosted",
        })
    }
}

/// A context-specific fail-stop operation.
///
/// Implementations are *expected* not to return but are not required to;
/// call through [`halt`] to get the guarantee.
pub trait HaltPrimitive: Send + Sync {
    fn context(&self) -> ExecutionContext;

    fn halt(&self);
}

/// Invokes the kernel's fatal-error primitive.
#[derive(Clone, Copy, Debug)]
pub struct KernelPanic {
    panic_fn: KernelPanicFn,
}

impl KernelPanic {
    pub fn new(panic_fn: KernelPanicFn) -> Self {
        KernelPanic { panic_fn }
    }
}

impl HaltPrimitive for KernelPanic {
    fn context(&self) -> ExecutionContext {
        ExecutionContext::Kernel
    }

    fn halt(&self) {
        (self.panic_fn)();
    }
}

/// Invokes a loader's abort primitive with [`LOADER_GENERIC_ERROR`].
#[derive(Clone, Copy, Debug)]
pub struct LoaderAbort {
    abort_fn: AbortFn,
}

impl LoaderAbort {
    pub fn new(abort_fn: AbortFn) -> Self {
        LoaderAbort { abort_fn }
    }
}

impl HaltPrimitive for LoaderAbort {
    fn context(&self) -> ExecutionContext {
        ExecutionContext::Loader
    }

    fn halt(&self) {
        (self.abort_fn)(LOADER_GENERIC_ERROR);
    }
}

/// Invokes an application runtime's abort primitive with
/// [`TEE_ERROR_GENERIC`].
#[derive(Clone, Copy, Debug)]
pub struct ApplicationAbort {
    abort_fn: AbortFn,
}

impl ApplicationAbort {
    pub fn new(abort_fn: AbortFn) -> Self {
        ApplicationAbort { abort_fn }
    }
}

impl HaltPrimitive for ApplicationAbort {
    fn context(&self) -> ExecutionContext {
        ExecutionContext::Application
    }

    fn halt(&self) {
        (self.abort_fn)(TEE_ERROR_GENERIC);
    }
}

/// `std::process::abort` for hosted processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessAbort;

impl HaltPrimitive for ProcessAbort {
    fn context(&self) -> ExecutionContext {
        ExecutionContext::Hosted
    }

    fn halt(&self) {
        std::process::abort();
    }
}

/// Halt through `primitive`, never returning.
///
/// If the primitive returns anyway, the calling thread idles forever.
#[cold]
pub fn halt(primitive: &dyn HaltPrimitive) -> ! {
    tracing::debug!(context = %primitive.context(), "invoking halt primitive");
    primitive.halt();
    tracing::error!(
        context = %primitive.context(),
        "halt primitive returned, idling"
    );
    loop {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
