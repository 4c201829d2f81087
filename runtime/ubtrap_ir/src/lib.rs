//! ubtrap IR - Violation Descriptor Model
//!
//! This crate contains the data that `-fsanitize=undefined` instrumentation
//! hands to the runtime when it detects undefined behavior:
//! - [`SourceLocation`]: file/line/column of the instrumented call site,
//!   with the top column bit reserved as the "already reported" flag
//! - [`TypeDescriptor`]: compiler-emitted type metadata
//! - Per-kind descriptors (`OverflowData`, `OutOfBoundsData`, ...) that all
//!   start with a `SourceLocation`
//! - [`Check`] and [`Event`]: which entry point fired, and its event name
//!
//! # Layout
//!
//! Every descriptor is `#[repr(C)]` and matches what the compiler emits.
//! The location is always the first field so any descriptor can be viewed
//! through the [`Descriptor`] trait without knowing the concrete kind.
//!
//! # Ownership
//!
//! Descriptors are static data owned by instrumented code. Nothing here
//! allocates or frees them; the only mutation is the atomic reported bit.

#![allow(
    unsafe_code,
    reason = "descriptors hold raw C string and type pointers emitted by the compiler"
)]

/// Compile-time assertion that a type has a specific size.
///
/// Used to pin descriptor layouts to the instrumentation ABI.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod descriptor;
mod kind;
mod location;
mod type_descriptor;

pub use descriptor::{
    Descriptor, Detail, InvalidBuiltinData, InvalidValueData, NonnullArgData, OutOfBoundsData,
    OverflowData, ShiftOutOfBoundsData, TypeMismatchData, TypeMismatchDataV1, UnreachableData,
    VlaBoundData,
};
pub use kind::{BuiltinCheckKind, Check, Event, OverflowOp, Recover, TypeCheckKind, ViolationKind};
pub use location::{FileName, SourceLocation, REPORTED_BIT};
pub use type_descriptor::{StaticTypeDescriptor, TypeDescriptor, TypeKind};
