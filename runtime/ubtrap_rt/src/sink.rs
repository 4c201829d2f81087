//! Diagnostic sinks: where report lines go.
//!
//! A sink receives each line exactly once, in order, and must not block.
//! Its return value is never consulted: a sink that fails to write has no
//! one to tell.

use std::fmt::{self, Write as _};
use std::io;

use crate::config::SinkKind;
use crate::report::Report;

/// Writes one report line to a diagnostic channel.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, report: &Report<'_>);
}

/// Writes report lines to standard error.
#[derive(Clone, Copy, Debug, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn emit(&self, report: &Report<'_>) {
        write_line(io::stderr().lock(), report);
    }
}

/// Write one line to `out`, ignoring failures (a closed stderr included).
pub(crate) fn write_line(mut out: impl io::Write, report: &Report<'_>) {
    let _ = writeln!(out, "{report}");
}

/// Forwards report lines as `tracing::error!` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, report: &Report<'_>) {
        let location = report.location();
        tracing::error!(
            target: "ubtrap",
            event = report.event().name(),
            kind = %report.event().kind(),
            file = %location.file(),
            line = location.line(),
            column = location.column(),
            "{report}"
        );
    }
}

/// Line writer supplied by a C embedder: `(bytes, len)`, no trailing newline.
pub type EmitFn = extern "C" fn(*const u8, usize);

/// Sink backed by an embedder's `emit` primitive.
///
/// Lines are rendered into a fixed stack buffer and truncated at
/// [`LINE_CAPACITY`] bytes.
#[derive(Clone, Copy, Debug)]
pub struct FfiSink {
    emit: EmitFn,
}

/// Longest line handed to an [`FfiSink`] primitive.
pub const LINE_CAPACITY: usize = 256;

impl FfiSink {
    pub fn new(emit: EmitFn) -> Self {
        FfiSink { emit }
    }
}

impl DiagnosticSink for FfiSink {
    fn emit(&self, report: &Report<'_>) {
        let mut line = LineBuffer::<LINE_CAPACITY>::new();
        // LineBuffer never reports an error; overflow truncates.
        let _ = write!(line, "{report}");
        let bytes = line.as_bytes();
        (self.emit)(bytes.as_ptr(), bytes.len());
    }
}

/// Build the sink a hosted runtime uses for `kind`.
///
/// Asking for [`SinkKind::Tracing`] installs the `RUST_LOG` subscriber
/// through [`init_tracing`](crate::init_tracing). Without any global
/// subscriber the lines would be dropped, so stderr is used instead.
pub fn hosted_sink(kind: SinkKind) -> Box<dyn DiagnosticSink> {
    if kind == SinkKind::Tracing {
        crate::init_tracing();
    }
    match effective_sink(kind, tracing::dispatcher::has_been_set()) {
        SinkKind::Stderr => Box::new(StderrSink),
        SinkKind::Tracing => Box::new(TracingSink),
    }
}

/// The sink actually used for `kind`, given whether a global subscriber
/// exists.
pub(crate) fn effective_sink(kind: SinkKind, has_subscriber: bool) -> SinkKind {
    match kind {
        SinkKind::Tracing if !has_subscriber => SinkKind::Stderr,
        kind => kind,
    }
}

/// Fixed-capacity UTF-8 buffer that truncates on a char boundary.
pub(crate) struct LineBuffer<const N: usize> {
    bytes: [u8; N],
    len: usize,
    truncated: bool,
}

impl<const N: usize> LineBuffer<N> {
    pub(crate) fn new() -> Self {
        LineBuffer {
            bytes: [0; N],
            len: 0,
            truncated: false,
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    #[cfg(test)]
    pub(crate) fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl<const N: usize> fmt::Write for LineBuffer<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.truncated {
            return Ok(());
        }
        let room = N - self.len;
        let take = if s.len() <= room {
            s.len()
        } else {
            self.truncated = true;
            // Back off to the last char boundary that fits.
            (0..=room).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
        };
        self.bytes[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
