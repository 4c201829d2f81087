//! Violation kinds and the events that report them.
//!
//! A [`ViolationKind`] is the category of undefined behavior. A [`Check`] is
//! the specific instrumentation entry point that fired (several checks share
//! a kind, e.g. every overflow operation). An [`Event`] adds whether the
//! call site was compiled recoverable or with `-fno-sanitize-recover`.

use std::fmt;

/// Category of detected undefined behavior.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ViolationKind {
    TypeMismatch,
    ArithmeticOverflow,
    ShiftOutOfBounds,
    IndexOutOfBounds,
    /// Unreachable code executed, or a function fell off its end.
    ControlFlowUnreachable,
    /// Non-positive VLA bound, or a loaded value outside its type's range.
    InvalidRangeValue,
    NonnullViolation,
    InvalidBuiltinUse,
}

impl ViolationKind {
    /// Whether this kind halts regardless of policy.
    #[inline]
    pub const fn is_fatal(self) -> bool {
        matches!(self, ViolationKind::ControlFlowUnreachable)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ViolationKind::TypeMismatch => "type mismatch",
            ViolationKind::ArithmeticOverflow => "arithmetic overflow",
            ViolationKind::ShiftOutOfBounds => "shift out of bounds",
            ViolationKind::IndexOutOfBounds => "index out of bounds",
            ViolationKind::ControlFlowUnreachable => "unreachable control flow",
            ViolationKind::InvalidRangeValue => "invalid value",
            ViolationKind::NonnullViolation => "nonnull violation",
            ViolationKind::InvalidBuiltinUse => "invalid builtin use",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arithmetic operation that overflowed.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum OverflowOp {
    Add,
    Sub,
    Mul,
    Negate,
    DivRem,
    /// Pointer arithmetic wrapped or produced null.
    Pointer,
}

/// Instrumentation entry point that detected a violation.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Check {
    /// Legacy ABI shape (`unsigned long` pointer, wide alignment field).
    TypeMismatch,
    TypeMismatchV1,
    Overflow(OverflowOp),
    ShiftOutOfBounds,
    OutOfBounds,
    BuiltinUnreachable,
    MissingReturn,
    VlaBoundNotPositive,
    LoadInvalidValue,
    NonnullArg,
    InvalidBuiltin,
}

impl Check {
    /// Entry-point names without the `__ubsan_handle_` prefix, as
    /// `(recoverable, abort)`.
    const fn names(self) -> (&'static str, &'static str) {
        match self {
            Check::TypeMismatch => ("type_mismatch", "type_mismatch_abort"),
            Check::TypeMismatchV1 => ("type_mismatch_v1", "type_mismatch_v1_abort"),
            Check::Overflow(OverflowOp::Add) => ("add_overflow", "add_overflow_abort"),
            Check::Overflow(OverflowOp::Sub) => ("sub_overflow", "sub_overflow_abort"),
            Check::Overflow(OverflowOp::Mul) => ("mul_overflow", "mul_overflow_abort"),
            Check::Overflow(OverflowOp::Negate) => ("negate_overflow", "negate_overflow_abort"),
            Check::Overflow(OverflowOp::DivRem) => ("divrem_overflow", "divrem_overflow_abort"),
            Check::Overflow(OverflowOp::Pointer) => {
                ("pointer_overflow", "pointer_overflow_abort")
            }
            Check::ShiftOutOfBounds => ("shift_out_of_bounds", "shift_out_of_bounds_abort"),
            Check::OutOfBounds => ("out_of_bounds", "out_of_bounds_abort"),
            Check::BuiltinUnreachable => ("builtin_unreachable", "builtin_unreachable"),
            Check::MissingReturn => ("missing_return", "missing_return"),
            Check::VlaBoundNotPositive => {
                ("vla_bound_not_positive", "vla_bound_not_positive_abort")
            }
            Check::LoadInvalidValue => ("load_invalid_value", "load_invalid_value_abort"),
            Check::NonnullArg => ("nonnull_arg", "nonnull_arg_abort"),
            Check::InvalidBuiltin => ("invalid_builtin", "invalid_builtin_abort"),
        }
    }

    /// Short event name used in the report line.
    pub const fn name(self) -> &'static str {
        self.names().0
    }

    pub const fn kind(self) -> ViolationKind {
        match self {
            Check::TypeMismatch | Check::TypeMismatchV1 => ViolationKind::TypeMismatch,
            Check::Overflow(_) => ViolationKind::ArithmeticOverflow,
            Check::ShiftOutOfBounds => ViolationKind::ShiftOutOfBounds,
            Check::OutOfBounds => ViolationKind::IndexOutOfBounds,
            Check::BuiltinUnreachable | Check::MissingReturn => {
                ViolationKind::ControlFlowUnreachable
            }
            Check::VlaBoundNotPositive | Check::LoadInvalidValue => {
                ViolationKind::InvalidRangeValue
            }
            Check::NonnullArg => ViolationKind::NonnullViolation,
            Check::InvalidBuiltin => ViolationKind::InvalidBuiltinUse,
        }
    }
}

/// How the call site was instrumented.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Recover {
    /// Default: execution may continue after the report.
    Recoverable,
    /// `-fno-sanitize-recover`: the `_abort` entry point, always fatal.
    Abort,
}

/// One reportable occurrence: which check fired and how it was compiled.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Event {
    pub check: Check,
    pub recover: Recover,
}

impl Event {
    pub const fn recoverable(check: Check) -> Self {
        Event {
            check,
            recover: Recover::Recoverable,
        }
    }

    pub const fn abort(check: Check) -> Self {
        Event {
            check,
            recover: Recover::Abort,
        }
    }

    pub const fn name(self) -> &'static str {
        match self.recover {
            Recover::Recoverable => self.check.names().0,
            Recover::Abort => self.check.names().1,
        }
    }

    pub const fn kind(self) -> ViolationKind {
        self.check.kind()
    }

    /// Whether this event halts regardless of policy.
    pub const fn is_fatal(self) -> bool {
        matches!(self.recover, Recover::Abort) || self.check.kind().is_fatal()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a type-mismatch check was guarding, from `type_check_kind`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeCheckKind {
    Load,
    Store,
    ReferenceBinding,
    MemberAccess,
    MemberCall,
    ConstructorCall,
    DowncastPointer,
    DowncastReference,
    Upcast,
    UpcastToVirtualBase,
    NonnullAssign,
    DynamicOperation,
}

impl TypeCheckKind {
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => TypeCheckKind::Load,
            1 => TypeCheckKind::Store,
            2 => TypeCheckKind::ReferenceBinding,
            3 => TypeCheckKind::MemberAccess,
            4 => TypeCheckKind::MemberCall,
            5 => TypeCheckKind::ConstructorCall,
            6 => TypeCheckKind::DowncastPointer,
            7 => TypeCheckKind::DowncastReference,
            8 => TypeCheckKind::Upcast,
            9 => TypeCheckKind::UpcastToVirtualBase,
            10 => TypeCheckKind::NonnullAssign,
            11 => TypeCheckKind::DynamicOperation,
            _ => return None,
        })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TypeCheckKind::Load => "load of",
            TypeCheckKind::Store => "store to",
            TypeCheckKind::ReferenceBinding => "reference binding to",
            TypeCheckKind::MemberAccess => "member access within",
            TypeCheckKind::MemberCall => "member call on",
            TypeCheckKind::ConstructorCall => "constructor call on",
            TypeCheckKind::DowncastPointer | TypeCheckKind::DowncastReference => "downcast of",
            TypeCheckKind::Upcast => "upcast of",
            TypeCheckKind::UpcastToVirtualBase => "cast to virtual base of",
            TypeCheckKind::NonnullAssign => "_Nonnull binding to",
            TypeCheckKind::DynamicOperation => "dynamic operation on",
        }
    }
}

/// Built-in whose argument was invalid, from `InvalidBuiltinData::kind`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BuiltinCheckKind {
    Ctz,
    Clz,
}

impl BuiltinCheckKind {
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(BuiltinCheckKind::Ctz),
            1 => Some(BuiltinCheckKind::Clz),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BuiltinCheckKind::Ctz => "ctz",
            BuiltinCheckKind::Clz => "clz",
        }
    }
}
