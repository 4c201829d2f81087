//! ubtrap Runtime Library (`libubtrap_rt`)
//!
//! Receives control when `-fsanitize=undefined` instrumentation detects
//! undefined behavior, reports each offending call site once, and halts
//! when the violation (or the configured policy) demands it.
//!
//! # Build Modes
//!
//! - **rlib**: For Rust embedders and tests
//! - **staticlib**: For linking into instrumented C images (`libubtrap_rt.a`)
//!
//! # Flow
//!
//! ```text
//! instrumented code
//!   -> __ubsan_handle_<kind>(descriptor, operands...)
//!   -> TrapRuntime::check            (dedup on the location's reported bit)
//!   -> DiagnosticSink::emit          (one line per call site)
//!   -> halt(&dyn HaltPrimitive) -> ! (fatal kinds, or policy enabled)
//! ```
//!
//! # Embedding
//!
//! Hosted processes need no setup: the first violation builds a runtime from
//! `UBTRAP_PANIC_ON_VIOLATION` / `UBTRAP_SINK` that aborts the process. Other
//! execution contexts inject their halt primitive first, via [`install`] from
//! Rust or `ubtrap_install_{kernel,loader,application}` from C.
//!
//! # Safety
//!
//! Entry points use `#[no_mangle]` and `extern "C"`. They are called only by
//! compiler-generated code, which passes pointers to its own static
//! descriptors. They're not marked `unsafe` because they're FFI entry
//! points, not Rust API functions.

#![warn(clippy::allow_attributes_without_reason)]
#![allow(
    unsafe_code,
    reason = "C-ABI entry points receive raw descriptor pointers"
)]
#![allow(
    clippy::not_unsafe_ptr_arg_deref,
    reason = "FFI entry points receive pointers from compiler-generated code"
)]

pub mod config;
pub mod ffi;
pub mod halt;
pub mod handlers;
pub mod policy;
pub mod report;
pub mod runtime;
pub mod sink;

use std::sync::Once;

pub use config::{ConfigError, SinkKind, TrapConfig};
pub use halt::{
    halt, ApplicationAbort, ExecutionContext, HaltPrimitive, KernelPanic, LoaderAbort,
    ProcessAbort,
};
pub use policy::Policy;
pub use report::{Outcome, Report};
pub use runtime::{
    install, panic_on_violation, runtime, set_panic_on_violation, InstallError, TrapRuntime,
};
pub use sink::{DiagnosticSink, FfiSink, StderrSink, TracingSink};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for the runtime's own operational events.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=ubtrap_rt=debug` or `RUST_LOG=ubtrap_rt=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set. The host may already own the
        // global subscriber; keep it.
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}
