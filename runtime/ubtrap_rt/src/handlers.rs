//! `__ubsan_handle_*` entry points.
//!
//! These are the symbols `-fsanitize=undefined` instrumentation calls. Names,
//! argument counts and argument widths are fixed by the compiler. Each one
//! pulls the [`SourceLocation`](ubtrap_ir::SourceLocation) out of its
//! descriptor and reports through the process-wide runtime.
//!
//! Operand arguments (`lhs`, `rhs`, the loaded value, the index, ...) are
//! never dereferenced: the instrumented operation that produced them is the
//! undefined behavior being reported.
//!
//! Every recoverable entry point has an `_abort` twin, called instead when
//! the call site was built with `-fno-sanitize-recover`. Twins report under
//! their own event name and always halt.

use std::ffi::{c_ulong, c_void};

use ubtrap_ir::{
    Check, Descriptor, Event, InvalidBuiltinData, InvalidValueData, NonnullArgData,
    OutOfBoundsData, OverflowData, OverflowOp, ShiftOutOfBoundsData, TypeMismatchData,
    TypeMismatchDataV1, UnreachableData, VlaBoundData,
};

use crate::runtime::runtime;

/// Opaque runtime value passed by instrumentation. Never dereferenced.
pub type ValueHandle = *mut c_void;

/// Shared body of every recoverable entry point.
#[inline]
fn recover<D: Descriptor>(data: *const D, check: Check) {
    // SAFETY: instrumentation passes its static descriptor or null
    let Some(data) = (unsafe { data.as_ref() }) else {
        tracing::warn!(event = check.name(), "null violation descriptor");
        return;
    };
    runtime().check(data, Event::recoverable(check));
}

/// Shared body of every entry point that must not return.
#[inline]
fn fatal<D: Descriptor>(data: *const D, event: Event) -> ! {
    // SAFETY: instrumentation passes its static descriptor or null
    let data = unsafe { data.as_ref() };
    runtime().check_fatal(data, event)
}

/// Defines a recoverable entry point and its `_abort` twin.
macro_rules! entry_points {
    ($(
        $(#[$meta:meta])*
        $name:ident, $abort:ident ($data:ty $(, $arg:ident: $arg_ty:ty)*) => $check:expr;
    )*) => {$(
        $(#[$meta])*
        #[no_mangle]
        pub extern "C" fn $name(data: *const $data $(, $arg: $arg_ty)*) {
            recover(data, $check);
        }

        $(#[$meta])*
        ///
        /// `-fno-sanitize-recover` variant: always halts.
        #[no_mangle]
        pub extern "C" fn $abort(data: *const $data $(, $arg: $arg_ty)*) -> ! {
            fatal(data, Event::abort($check))
        }
    )*};
}

entry_points! {
    /// Misaligned or null pointer use, or a dynamic type mismatch (legacy ABI).
    __ubsan_handle_type_mismatch, __ubsan_handle_type_mismatch_abort
        (TypeMismatchData, _pointer: c_ulong) => Check::TypeMismatch;

    /// Misaligned or null pointer use, or a dynamic type mismatch.
    __ubsan_handle_type_mismatch_v1, __ubsan_handle_type_mismatch_v1_abort
        (TypeMismatchDataV1, _pointer: ValueHandle) => Check::TypeMismatchV1;

    /// Signed addition overflowed.
    __ubsan_handle_add_overflow, __ubsan_handle_add_overflow_abort
        (OverflowData, _lhs: ValueHandle, _rhs: ValueHandle) => Check::Overflow(OverflowOp::Add);

    /// Signed subtraction overflowed.
    __ubsan_handle_sub_overflow, __ubsan_handle_sub_overflow_abort
        (OverflowData, _lhs: ValueHandle, _rhs: ValueHandle) => Check::Overflow(OverflowOp::Sub);

    /// Signed multiplication overflowed.
    __ubsan_handle_mul_overflow, __ubsan_handle_mul_overflow_abort
        (OverflowData, _lhs: ValueHandle, _rhs: ValueHandle) => Check::Overflow(OverflowOp::Mul);

    /// Negating the minimum signed value.
    __ubsan_handle_negate_overflow, __ubsan_handle_negate_overflow_abort
        (OverflowData, _old: ValueHandle) => Check::Overflow(OverflowOp::Negate);

    /// Division by zero, or `MIN / -1`.
    __ubsan_handle_divrem_overflow, __ubsan_handle_divrem_overflow_abort
        (OverflowData, _lhs: ValueHandle, _rhs: ValueHandle) => Check::Overflow(OverflowOp::DivRem);

    /// Pointer arithmetic wrapped around or produced null.
    __ubsan_handle_pointer_overflow, __ubsan_handle_pointer_overflow_abort
        (OverflowData, _base: ValueHandle, _result: ValueHandle) => Check::Overflow(OverflowOp::Pointer);

    /// Negative shift amount, or shift past the operand's width.
    __ubsan_handle_shift_out_of_bounds, __ubsan_handle_shift_out_of_bounds_abort
        (ShiftOutOfBoundsData, _lhs: ValueHandle, _rhs: ValueHandle) => Check::ShiftOutOfBounds;

    /// Array index outside the array's bounds.
    __ubsan_handle_out_of_bounds, __ubsan_handle_out_of_bounds_abort
        (OutOfBoundsData, _index: ValueHandle) => Check::OutOfBounds;

    /// Variable-length array bound evaluated to a non-positive value.
    __ubsan_handle_vla_bound_not_positive, __ubsan_handle_vla_bound_not_positive_abort
        (VlaBoundData, _bound: ValueHandle) => Check::VlaBoundNotPositive;

    /// Loaded a value outside its type's valid range (e.g. a `bool` of 2).
    __ubsan_handle_load_invalid_value, __ubsan_handle_load_invalid_value_abort
        (InvalidValueData, _value: ValueHandle) => Check::LoadInvalidValue;

    /// Zero passed to `__builtin_ctz` or `__builtin_clz`.
    __ubsan_handle_invalid_builtin, __ubsan_handle_invalid_builtin_abort
        (InvalidBuiltinData) => Check::InvalidBuiltin;
}

#[cfg(not(feature = "legacy-nonnull-abi"))]
entry_points! {
    /// Null passed for a parameter declared `nonnull`.
    __ubsan_handle_nonnull_arg, __ubsan_handle_nonnull_arg_abort
        (NonnullArgData) => Check::NonnullArg;
}

#[cfg(feature = "legacy-nonnull-abi")]
entry_points! {
    /// Null passed for a parameter declared `nonnull` (GCC < 6 ABI).
    __ubsan_handle_nonnull_arg, __ubsan_handle_nonnull_arg_abort
        (NonnullArgData, _arg_no: usize) => Check::NonnullArg;
}

/// `__builtin_unreachable()` was reached.
#[no_mangle]
pub extern "C" fn __ubsan_handle_builtin_unreachable(data: *const UnreachableData) -> ! {
    fatal(data, Event::recoverable(Check::BuiltinUnreachable))
}

/// Control reached the end of a value-returning function.
#[no_mangle]
pub extern "C" fn __ubsan_handle_missing_return(data: *const UnreachableData) -> ! {
    fatal(data, Event::recoverable(Check::MissingReturn))
}
