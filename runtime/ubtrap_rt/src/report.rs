//! The single diagnostic line emitted per reported call site.

use std::fmt;

use ubtrap_ir::{Event, SourceLocation};

/// A formatted-on-demand report line.
///
/// Rendered lazily through `Display` so the report path never allocates:
///
/// ```text
/// Undefined behavior add_overflow at a.c:10 col 5
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Report<'a> {
    event: Event,
    location: &'a SourceLocation,
}

impl<'a> Report<'a> {
    pub fn new(event: Event, location: &'a SourceLocation) -> Self {
        Report { event, location }
    }

    pub fn event(&self) -> Event {
        self.event
    }

    pub fn location(&self) -> &'a SourceLocation {
        self.location
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Undefined behavior {} at {}:{} col {}",
            self.event.name(),
            self.location.file(),
            self.location.line(),
            self.location.column()
        )
    }
}

/// Result of a report that did not halt.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Outcome {
    /// This call claimed the location and emitted its line.
    Reported,
    /// The location was already reported; nothing was emitted.
    Suppressed,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use ubtrap_ir::{Check, OverflowOp, REPORTED_BIT};

    use super::*;

    #[test]
    fn line_matches_diagnostic_format() {
        let loc = SourceLocation::new(c"a.c", 10, 5);
        let report = Report::new(Event::recoverable(Check::Overflow(OverflowOp::Add)), &loc);
        assert_eq!(report.to_string(), "Undefined behavior add_overflow at a.c:10 col 5");
    }

    #[test]
    fn line_masks_reported_bit() {
        let loc = SourceLocation::new(c"core/kernel/panic.c", 77, 3);
        assert!(loc.mark_reported());
        assert_eq!(loc.raw_column(), 3 | REPORTED_BIT);
        let report = Report::new(Event::abort(Check::OutOfBounds), &loc);
        assert_eq!(
            report.to_string(),
            "Undefined behavior out_of_bounds_abort at core/kernel/panic.c:77 col 3"
        );
    }

    #[test]
    fn null_file_is_unknown() {
        let loc = SourceLocation::from_raw(std::ptr::null(), 1, 2);
        let report = Report::new(Event::recoverable(Check::MissingReturn), &loc);
        assert_eq!(report.to_string(), "Undefined behavior missing_return at <unknown>:1 col 2");
    }
}
