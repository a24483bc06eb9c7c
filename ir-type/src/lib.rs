#![no_std]

extern crate alloc;

mod alignable;
mod array_type;
mod function_type;
mod layout;
mod pointer_type;
mod struct_type;

use alloc::sync::Arc;
use core::fmt;

pub use self::{
    alignable::Alignable, array_type::ArrayType, function_type::FunctionType, layout::TargetLayout,
    pointer_type::PointerType, struct_type::*,
};

/// The type of a value in the Quill IR.
///
/// Primitive types are carried inline; compound types are behind an [Arc] so
/// that `Type` stays cheap to clone however deeply types nest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// A value that could not be typed, or that has no meaningful type
    Unknown,
    /// A single bit, the boolean type: 1 is true, 0 is false
    I1,
    /// Signed 8-bit integer
    I8,
    /// Unsigned 8-bit integer
    U8,
    /// Signed 16-bit integer
    I16,
    /// Unsigned 16-bit integer
    U16,
    /// Signed 32-bit integer
    I32,
    /// Unsigned 32-bit integer
    U32,
    /// Signed 64-bit integer
    I64,
    /// Unsigned 64-bit integer
    U64,
    /// IEEE-754 single-precision float
    F32,
    /// IEEE-754 double-precision float
    F64,
    /// The address of a value of the pointee type
    Ptr(Arc<PointerType>),
    /// An aggregate of fields with a fixed, C-like layout
    Struct(Arc<StructType>),
    /// A fixed-length sequence of one element type
    Array(Arc<ArrayType>),
    /// A reference to a function with the given signature
    Function(Arc<FunctionType>),
}

impl Type {
    /// True for types whose values occupy no memory: empty arrays, arrays of
    /// zero-sized elements, and structs all of whose fields are zero-sized
    pub fn is_zst(&self) -> bool {
        match self {
            Self::Array(ty) => ty.is_zst(),
            Self::Struct(ty) => ty.fields().iter().all(|f| f.ty.is_zst()),
            _ => false,
        }
    }

    /// True for integer and floating-point types
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// True for any integer type, including [I1](Self::I1)
    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    /// True for the signed integer types
    pub fn is_signed_integer(&self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    /// True for the unsigned integer types; [I1](Self::I1) counts as unsigned
    pub fn is_unsigned_integer(&self) -> bool {
        matches!(self, Self::I1 | Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    /// True for the floating-point types
    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    #[inline]
    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Ptr(_))
    }

    /// The pointee type, when this is a pointer type
    #[inline]
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Self::Ptr(ty) => Some(ty.pointee()),
            _ => None,
        }
    }

    #[inline]
    pub fn is_struct(&self) -> bool {
        matches!(self, Self::Struct(_))
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    #[inline]
    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// The size of values of this type in bits
    pub fn size_in_bits(&self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::I1 => 1,
            Self::I8 | Self::U8 => 8,
            Self::I16 | Self::U16 => 16,
            Self::I32 | Self::U32 | Self::F32 => 32,
            Self::I64 | Self::U64 | Self::F64 => 64,
            // Pointers and function references are addresses
            Self::Ptr(_) | Self::Function(_) => 64,
            Self::Struct(ty) => ty.size() * 8,
            Self::Array(ty) => ty.size_in_bits(),
        }
    }

    /// The size of values of this type in bytes, alignment padding included
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bits().div_ceil(8)
    }

    /// The minimum alignment of values of this type, in bytes
    pub fn min_alignment(&self) -> usize {
        match self {
            Self::Unknown | Self::I1 | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
            Self::Ptr(_) | Self::Function(_) => 8,
            Self::Struct(ty) => ty.min_alignment(),
            Self::Array(ty) => ty.min_alignment(),
        }
    }

    /// The keyword this type prints as, for the primitive types
    fn primitive_name(&self) -> Option<&'static str> {
        Some(match self {
            Self::Unknown => "?",
            Self::I1 => "i1",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            _ => return None,
        })
    }
}

macro_rules! compound_type_conversions {
    ($($variant:ident <- $ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Type {
                #[inline]
                fn from(ty: $ty) -> Type {
                    Type::$variant(Arc::new(ty))
                }
            }

            impl From<Arc<$ty>> for Type {
                #[inline]
                fn from(ty: Arc<$ty>) -> Type {
                    Type::$variant(ty)
                }
            }
        )+
    };
}

compound_type_conversions! {
    Ptr <- PointerType,
    Struct <- StructType,
    Array <- ArrayType,
    Function <- FunctionType,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.primitive_name() {
            return f.write_str(name);
        }
        match self {
            Self::Ptr(ty) => fmt::Display::fmt(ty, f),
            Self::Struct(ty) => fmt::Display::fmt(ty, f),
            Self::Array(ty) => fmt::Display::fmt(ty, f),
            Self::Function(ty) => fmt::Display::fmt(ty, f),
            _ => unreachable!("primitive types are rendered by name"),
        }
    }
}
