//! Element kinds supported by [`TupleArray`] and their link to [`AnyTupleArray`].

use crate::{any::AnyTupleArray, tuple_array::TupleArray};

/// The closed set of numeric element kinds an array can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl ElementKind {
    pub const ALL: [ElementKind; 10] = [
        ElementKind::Int8,
        ElementKind::UInt8,
        ElementKind::Int16,
        ElementKind::UInt16,
        ElementKind::Int32,
        ElementKind::UInt32,
        ElementKind::Int64,
        ElementKind::UInt64,
        ElementKind::Float32,
        ElementKind::Float64,
    ];

    /// Size of one element in bytes.
    pub fn size_in_bytes(self) -> usize {
        match self {
            ElementKind::Int8 | ElementKind::UInt8 => 1,
            ElementKind::Int16 | ElementKind::UInt16 => 2,
            ElementKind::Int32 | ElementKind::UInt32 | ElementKind::Float32 => 4,
            ElementKind::Int64 | ElementKind::UInt64 | ElementKind::Float64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Int8 => "i8",
            ElementKind::UInt8 => "u8",
            ElementKind::Int16 => "i16",
            ElementKind::UInt16 => "u16",
            ElementKind::Int32 => "i32",
            ElementKind::UInt32 => "u32",
            ElementKind::Int64 => "i64",
            ElementKind::UInt64 => "u64",
            ElementKind::Float32 => "f32",
            ElementKind::Float64 => "f64",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, ElementKind::Float32 | ElementKind::Float64)
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A numeric type that can be stored in a [`TupleArray`].
///
/// Implemented for exactly the types listed in [`ElementKind`]; the trait is sealed.
pub trait Element:
    bytemuck::Pod + PartialOrd + std::fmt::Debug + Send + Sync + sealed::Sealed + 'static
{
    /// The kind tag of this element type, fixed for every array holding it.
    const KIND: ElementKind;

    fn into_any(array: TupleArray<Self>) -> AnyTupleArray;

    fn from_any_ref(array: &AnyTupleArray) -> Option<&TupleArray<Self>>;

    fn from_any_mut(array: &mut AnyTupleArray) -> Option<&mut TupleArray<Self>>;

    fn from_any(array: AnyTupleArray) -> Result<TupleArray<Self>, AnyTupleArray>;
}

macro_rules! impl_element {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Element for $ty {
                const KIND: ElementKind = ElementKind::$kind;

                fn into_any(array: TupleArray<$ty>) -> AnyTupleArray {
                    AnyTupleArray::$kind(array)
                }

                fn from_any_ref(array: &AnyTupleArray) -> Option<&TupleArray<$ty>> {
                    match array {
                        AnyTupleArray::$kind(array) => Some(array),
                        _ => None,
                    }
                }

                fn from_any_mut(array: &mut AnyTupleArray) -> Option<&mut TupleArray<$ty>> {
                    match array {
                        AnyTupleArray::$kind(array) => Some(array),
                        _ => None,
                    }
                }

                fn from_any(array: AnyTupleArray) -> Result<TupleArray<$ty>, AnyTupleArray> {
                    match array {
                        AnyTupleArray::$kind(array) => Ok(array),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

impl_element! {
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
}
