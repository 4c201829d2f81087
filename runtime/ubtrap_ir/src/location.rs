//! Instrumented call-site locations.
//!
//! One `SourceLocation` exists per call site, emitted statically by the
//! compiler. The runtime borrows its top column bit as a one-shot flag so a
//! call site inside a loop is reported once rather than on every iteration.

use std::ffi::{c_char, CStr};
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicU32, Ordering};

/// Reserved column bit marking a location as already reported.
///
/// Never part of the semantic column value.
pub const REPORTED_BIT: u32 = 1 << 31;

/// File/line/column triple for one instrumented call site.
///
/// Layout: 16 bytes on 64-bit targets
/// - file: `*const c_char` - NUL-terminated, interned by the compiler
/// - line: u32
/// - column: u32 (top bit = [`REPORTED_BIT`])
///
/// `column` is an `AtomicU32` so concurrent reporters can claim the location
/// with a single read-modify-write. It has the same layout as `u32`.
#[repr(C)]
pub struct SourceLocation {
    file: *const c_char,
    line: u32,
    column: AtomicU32,
}

// SAFETY: `file` points at an immutable, never-freed C string and the only
// mutable field is atomic.
unsafe impl Sync for SourceLocation {}

#[cfg(target_pointer_width = "64")]
crate::static_assert_size!(SourceLocation, 16);

impl SourceLocation {
    /// Create a location for a statically known file name.
    pub const fn new(file: &'static CStr, line: u32, column: u32) -> Self {
        Self::from_raw(file.as_ptr(), line, column)
    }

    /// Create a location from a raw file pointer, which may be null.
    ///
    /// A non-null `file` must point at a NUL-terminated string that outlives
    /// the location.
    pub const fn from_raw(file: *const c_char, line: u32, column: u32) -> Self {
        SourceLocation {
            file,
            line,
            column: AtomicU32::new(column),
        }
    }

    /// The file name, or a placeholder when instrumentation left it null.
    pub fn file(&self) -> FileName<'_> {
        if self.file.is_null() {
            return FileName(None);
        }
        // SAFETY: non-null file pointers are compiler-interned C strings
        FileName(Some(unsafe { CStr::from_ptr(self.file) }))
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Semantic column, with the reported flag masked off.
    #[inline]
    pub fn column(&self) -> u32 {
        self.raw_column() & !REPORTED_BIT
    }

    /// Raw column word, reported flag included.
    #[inline]
    pub fn raw_column(&self) -> u32 {
        self.column.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_reported(&self) -> bool {
        self.raw_column() & REPORTED_BIT != 0
    }

    /// Claim this location for reporting.
    ///
    /// Returns `true` for exactly one caller over the lifetime of the
    /// location, no matter how many threads race here. Every other call
    /// returns `false`.
    #[inline]
    pub fn mark_reported(&self) -> bool {
        // Repeat hits from a hot loop skip the write entirely.
        if self.column.load(Ordering::Relaxed) & REPORTED_BIT != 0 {
            return false;
        }
        let previous = self.column.fetch_or(REPORTED_BIT, Ordering::AcqRel);
        previous & REPORTED_BIT == 0
    }
}

impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceLocation")
            .field("file", &format_args!("{}", self.file()))
            .field("line", &self.line)
            .field("column", &self.column())
            .field("reported", &self.is_reported())
            .finish()
    }
}

/// Display adapter for a location's file name.
///
/// Writes invalid UTF-8 as U+FFFD without allocating.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileName<'a>(Option<&'a CStr>);

impl FileName<'_> {
    /// Placeholder written when the file pointer is null.
    pub const UNKNOWN: &'static str = "<unknown>";
}

impl fmt::Display for FileName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(name) = self.0 else {
            return f.write_str(Self::UNKNOWN);
        };
        for chunk in name.to_bytes().utf8_chunks() {
            f.write_str(chunk.valid())?;
            if !chunk.invalid().is_empty() {
                f.write_char(char::REPLACEMENT_CHARACTER)?;
            }
        }
        Ok(())
    }
}
