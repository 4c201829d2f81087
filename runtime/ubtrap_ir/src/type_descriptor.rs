//! Compiler-emitted type metadata.
//!
//! Unlike the operand values passed to entry points, type descriptors are
//! static data written by the compiler, so reading them is always sound.

use std::ffi::{c_char, CStr};
use std::ptr;

/// Broad category recorded in [`TypeDescriptor::kind`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeKind {
    /// `type_info` encodes `(log2(bit width) << 1) | signed`.
    Integer,
    /// `type_info` holds the bit width.
    Float,
    Unknown(u16),
}

impl TypeKind {
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            0 => TypeKind::Integer,
            1 => TypeKind::Float,
            other => TypeKind::Unknown(other),
        }
    }
}

/// Header of the compiler's type descriptor.
///
/// The C layout ends in a flexible `char type_name[]`; only its first byte
/// is declared here. Read the full name through [`TypeDescriptor::name`],
/// which works from a raw pointer so the read stays inside the compiler's
/// allocation.
#[repr(C)]
pub struct TypeDescriptor {
    type_kind: u16,
    type_info: u16,
    type_name: [c_char; 1],
}

impl TypeDescriptor {
    pub fn kind(&self) -> TypeKind {
        TypeKind::from_raw(self.type_kind)
    }

    /// Bit width of an integer or float type.
    pub fn bit_width(&self) -> Option<u32> {
        match self.kind() {
            TypeKind::Integer => 1u32.checked_shl(u32::from(self.type_info >> 1)),
            TypeKind::Float => Some(u32::from(self.type_info)),
            TypeKind::Unknown(_) => None,
        }
    }

    pub fn is_signed_integer(&self) -> bool {
        self.kind() == TypeKind::Integer && self.type_info & 1 != 0
    }

    /// Read the NUL-terminated type name.
    ///
    /// Returns `None` for a null descriptor.
    ///
    /// # Safety
    ///
    /// A non-null `this` must point at a compiler-emitted descriptor whose
    /// name is NUL-terminated and lives for `'a`.
    pub unsafe fn name<'a>(this: *const TypeDescriptor) -> Option<&'a CStr> {
        if this.is_null() {
            return None;
        }
        let name = ptr::addr_of!((*this).type_name).cast::<c_char>();
        Some(CStr::from_ptr(name))
    }
}

/// Rust-side storage for a type descriptor with an inline name.
///
/// Lets Rust code (and tests) build descriptors with the same layout the
/// compiler emits. `N` includes the trailing NUL.
#[repr(C)]
pub struct StaticTypeDescriptor<const N: usize> {
    type_kind: u16,
    type_info: u16,
    type_name: [u8; N],
}

impl<const N: usize> StaticTypeDescriptor<N> {
    /// `name` must end in a NUL byte.
    pub const fn new(kind: u16, info: u16, name: [u8; N]) -> Self {
        assert!(N > 0 && name[N - 1] == 0, "type name must be NUL-terminated");
        StaticTypeDescriptor {
            type_kind: kind,
            type_info: info,
            type_name: name,
        }
    }

    /// Signed or unsigned integer of `2^log2_bits` bits.
    pub const fn integer(log2_bits: u16, signed: bool, name: [u8; N]) -> Self {
        Self::new(0, (log2_bits << 1) | signed as u16, name)
    }

    pub const fn as_ptr(&self) -> *const TypeDescriptor {
        ptr::from_ref(self).cast::<TypeDescriptor>()
    }
}
