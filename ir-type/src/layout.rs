use super::{StructType, Type};

/// Read-only target layout queries for the Quill ABI.
///
/// The debug-info layer consumes these answers when constructing composite type
/// descriptions, and asserts that the coordinates it is handed agree with them.
/// It never computes layout itself.
///
/// Quill currently has a single target: a 64-bit, byte-addressable address
/// space with natural alignment for all primitives, so this type carries no
/// state yet. It exists so that layout consumers are insulated from that
/// assumption.
#[derive(Default, Debug, Copy, Clone)]
pub struct TargetLayout;

impl TargetLayout {
    pub const fn new() -> Self {
        Self
    }

    /// The size of `ty` in bytes, including padding for alignment
    pub fn byte_size_of(&self, ty: &Type) -> usize {
        ty.size_in_bytes()
    }

    /// The size of `ty` in bits
    pub fn bit_size_of(&self, ty: &Type) -> usize {
        ty.size_in_bits()
    }

    /// The ABI-mandated minimum alignment of `ty`, in bytes
    pub fn abi_alignment_of(&self, ty: &Type) -> usize {
        ty.min_alignment()
    }

    /// The ABI-mandated minimum alignment of `ty`, in bits
    pub fn abi_bit_alignment_of(&self, ty: &Type) -> usize {
        ty.min_alignment() * 8
    }

    /// The alignment of `ty` when passed on the call frame.
    ///
    /// Matches the ABI alignment on the current target.
    pub fn call_frame_alignment_of(&self, ty: &Type) -> usize {
        ty.min_alignment()
    }

    /// The offset, in bits, of the field at `index` (declaration order) from the
    /// base address of a value of struct type `ty`
    pub fn bit_offset_of_element(&self, ty: &StructType, index: usize) -> usize {
        ty.get(index).offset as usize * 8
    }
}
