//! Per-kind violation descriptors.
//!
//! Every descriptor begins with a [`SourceLocation`] at offset zero. The
//! [`Descriptor`] trait exposes that shared prefix, so the reporter can
//! dedup and report any kind without looking at the payload. Payload fields
//! are only ever used for debug detail.

use std::ffi::c_ulong;
use std::fmt;

use crate::kind::{BuiltinCheckKind, TypeCheckKind, ViolationKind};
use crate::location::SourceLocation;
use crate::type_descriptor::{TypeDescriptor, TypeKind};

/// A compiler-emitted violation descriptor.
pub trait Descriptor: Sync {
    /// The category every instance of this descriptor reports.
    const KIND: ViolationKind;

    /// The shared location prefix.
    fn location(&self) -> &SourceLocation;

    /// Write kind-specific payload for debug logging. Empty by default.
    fn fmt_detail(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let _ = f;
        Ok(())
    }
}

/// Display adapter over [`Descriptor::fmt_detail`].
pub struct Detail<'a, D: ?Sized>(pub &'a D);

impl<D: Descriptor + ?Sized> fmt::Display for Detail<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_detail(f)
    }
}

/// Display adapter for a possibly-null type descriptor pointer.
///
/// Integer and float types get a width suffix: `'int' (i32)`.
struct TypeName(*const TypeDescriptor);

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // SAFETY: type pointers in descriptors are compiler-emitted static data
        let Some(ty) = (unsafe { self.0.as_ref() }) else {
            return f.write_str("<unknown type>");
        };
        // SAFETY: as above, and the name is NUL-terminated
        if let Some(name) = unsafe { TypeDescriptor::name(self.0) } {
            write!(f, "{}", name.to_string_lossy())?;
        }
        match (ty.kind(), ty.bit_width()) {
            (TypeKind::Integer, Some(bits)) => {
                let sign = if ty.is_signed_integer() { 'i' } else { 'u' };
                write!(f, " ({sign}{bits})")
            }
            (TypeKind::Float, Some(bits)) => write!(f, " (f{bits})"),
            _ => Ok(()),
        }
    }
}

/// Implements `Sync` and `Descriptor::location` for a `#[repr(C)]`
/// descriptor whose first field is `loc`.
macro_rules! descriptor {
    ($ty:ident, $kind:expr, |$this:ident, $f:ident| $detail:block) => {
        // SAFETY: all pointer fields reference immutable compiler-emitted
        // statics; the location's column is atomic.
        unsafe impl Sync for $ty {}

        impl Descriptor for $ty {
            const KIND: ViolationKind = $kind;

            #[inline]
            fn location(&self) -> &SourceLocation {
                &self.loc
            }

            fn fmt_detail(&self, $f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let $this = self;
                $detail
            }
        }
    };
    ($ty:ident, $kind:expr) => {
        // SAFETY: the location's column is atomic and its file is immutable.
        unsafe impl Sync for $ty {}

        impl Descriptor for $ty {
            const KIND: ViolationKind = $kind;

            #[inline]
            fn location(&self) -> &SourceLocation {
                &self.loc
            }
        }
    };
}

/// Legacy `type_mismatch` payload.
#[repr(C)]
pub struct TypeMismatchData {
    loc: SourceLocation,
    ty: *const TypeDescriptor,
    alignment: c_ulong,
    type_check_kind: u8,
}

impl TypeMismatchData {
    pub const fn new(
        loc: SourceLocation,
        ty: *const TypeDescriptor,
        alignment: c_ulong,
        type_check_kind: u8,
    ) -> Self {
        TypeMismatchData {
            loc,
            ty,
            alignment,
            type_check_kind,
        }
    }
}

descriptor!(TypeMismatchData, ViolationKind::TypeMismatch, |this, f| {
    fmt_type_check(f, this.type_check_kind, this.ty)?;
    write!(f, ", alignment {}", this.alignment)
});

/// `type_mismatch_v1` payload: alignment is stored as its log2.
#[repr(C)]
pub struct TypeMismatchDataV1 {
    loc: SourceLocation,
    ty: *const TypeDescriptor,
    log_alignment: u8,
    type_check_kind: u8,
}

impl TypeMismatchDataV1 {
    pub const fn new(
        loc: SourceLocation,
        ty: *const TypeDescriptor,
        log_alignment: u8,
        type_check_kind: u8,
    ) -> Self {
        TypeMismatchDataV1 {
            loc,
            ty,
            log_alignment,
            type_check_kind,
        }
    }

    pub fn alignment(&self) -> Option<u64> {
        1u64.checked_shl(u32::from(self.log_alignment))
    }
}

descriptor!(TypeMismatchDataV1, ViolationKind::TypeMismatch, |this, f| {
    fmt_type_check(f, this.type_check_kind, this.ty)?;
    match this.alignment() {
        Some(alignment) => write!(f, ", alignment {alignment}"),
        None => write!(f, ", alignment 2^{}", this.log_alignment),
    }
});

fn fmt_type_check(
    f: &mut fmt::Formatter<'_>,
    raw_kind: u8,
    ty: *const TypeDescriptor,
) -> fmt::Result {
    match TypeCheckKind::from_raw(raw_kind) {
        Some(kind) => write!(f, "{} {}", kind.as_str(), TypeName(ty)),
        None => write!(f, "check {raw_kind} on {}", TypeName(ty)),
    }
}

/// Payload shared by every arithmetic overflow entry point.
///
/// The operation is not stored; it is implied by which entry point fired.
#[repr(C)]
pub struct OverflowData {
    loc: SourceLocation,
    ty: *const TypeDescriptor,
}

impl OverflowData {
    pub const fn new(loc: SourceLocation, ty: *const TypeDescriptor) -> Self {
        OverflowData { loc, ty }
    }
}

descriptor!(OverflowData, ViolationKind::ArithmeticOverflow, |this, f| {
    write!(f, "type {}", TypeName(this.ty))
});

#[repr(C)]
pub struct ShiftOutOfBoundsData {
    loc: SourceLocation,
    lhs_type: *const TypeDescriptor,
    rhs_type: *const TypeDescriptor,
}

impl ShiftOutOfBoundsData {
    pub const fn new(
        loc: SourceLocation,
        lhs_type: *const TypeDescriptor,
        rhs_type: *const TypeDescriptor,
    ) -> Self {
        ShiftOutOfBoundsData {
            loc,
            lhs_type,
            rhs_type,
        }
    }
}

descriptor!(ShiftOutOfBoundsData, ViolationKind::ShiftOutOfBounds, |this, f| {
    write!(
        f,
        "lhs {}, rhs {}",
        TypeName(this.lhs_type),
        TypeName(this.rhs_type)
    )
});

#[repr(C)]
pub struct OutOfBoundsData {
    loc: SourceLocation,
    array_type: *const TypeDescriptor,
    index_type: *const TypeDescriptor,
}

impl OutOfBoundsData {
    pub const fn new(
        loc: SourceLocation,
        array_type: *const TypeDescriptor,
        index_type: *const TypeDescriptor,
    ) -> Self {
        OutOfBoundsData {
            loc,
            array_type,
            index_type,
        }
    }
}

descriptor!(OutOfBoundsData, ViolationKind::IndexOutOfBounds, |this, f| {
    write!(
        f,
        "array {}, index {}",
        TypeName(this.array_type),
        TypeName(this.index_type)
    )
});

/// Payload for `builtin_unreachable` and `missing_return`.
#[repr(C)]
pub struct UnreachableData {
    loc: SourceLocation,
}

impl UnreachableData {
    pub const fn new(loc: SourceLocation) -> Self {
        UnreachableData { loc }
    }
}

descriptor!(UnreachableData, ViolationKind::ControlFlowUnreachable);

#[repr(C)]
pub struct VlaBoundData {
    loc: SourceLocation,
    ty: *const TypeDescriptor,
}

impl VlaBoundData {
    pub const fn new(loc: SourceLocation, ty: *const TypeDescriptor) -> Self {
        VlaBoundData { loc, ty }
    }
}

descriptor!(VlaBoundData, ViolationKind::InvalidRangeValue, |this, f| {
    write!(f, "bound type {}", TypeName(this.ty))
});

#[repr(C)]
pub struct InvalidValueData {
    loc: SourceLocation,
    ty: *const TypeDescriptor,
}

impl InvalidValueData {
    pub const fn new(loc: SourceLocation, ty: *const TypeDescriptor) -> Self {
        InvalidValueData { loc, ty }
    }
}

descriptor!(InvalidValueData, ViolationKind::InvalidRangeValue, |this, f| {
    write!(f, "type {}", TypeName(this.ty))
});

#[repr(C)]
pub struct NonnullArgData {
    loc: SourceLocation,
}

impl NonnullArgData {
    pub const fn new(loc: SourceLocation) -> Self {
        NonnullArgData { loc }
    }
}

descriptor!(NonnullArgData, ViolationKind::NonnullViolation);

#[repr(C)]
pub struct InvalidBuiltinData {
    loc: SourceLocation,
    kind: u8,
}

impl InvalidBuiltinData {
    pub const fn new(loc: SourceLocation, kind: u8) -> Self {
        InvalidBuiltinData { loc, kind }
    }
}

descriptor!(InvalidBuiltinData, ViolationKind::InvalidBuiltinUse, |this, f| {
    match BuiltinCheckKind::from_raw(this.kind) {
        Some(kind) => write!(f, "passing zero to {}()", kind.as_str()),
        None => write!(f, "builtin check {}", this.kind),
    }
});
