//! `AnyTupleArray`: a tuple array of any supported element kind.
//!
//! Code that receives arrays whose element type is only known at run time holds
//! them as [`AnyTupleArray`] and recovers the typed view through
//! [`downcast_ref`](AnyTupleArray::downcast_ref) or an exhaustive `match`.

use tessera_buffer::Ownership;
use tessera_common::Result;

use crate::{
    element::{Element, ElementKind},
    options::ArrayOptions,
    tuple_array::TupleArray,
};

/// A [`TupleArray`] tagged with its element kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyTupleArray {
    Int8(TupleArray<i8>),
    UInt8(TupleArray<u8>),
    Int16(TupleArray<i16>),
    UInt16(TupleArray<u16>),
    Int32(TupleArray<i32>),
    UInt32(TupleArray<u32>),
    Int64(TupleArray<i64>),
    UInt64(TupleArray<u64>),
    Float32(TupleArray<f32>),
    Float64(TupleArray<f64>),
}

macro_rules! dispatch {
    ($self:expr, $array:ident => $body:expr) => {
        match $self {
            AnyTupleArray::Int8($array) => $body,
            AnyTupleArray::UInt8($array) => $body,
            AnyTupleArray::Int16($array) => $body,
            AnyTupleArray::UInt16($array) => $body,
            AnyTupleArray::Int32($array) => $body,
            AnyTupleArray::UInt32($array) => $body,
            AnyTupleArray::Int64($array) => $body,
            AnyTupleArray::UInt64($array) => $body,
            AnyTupleArray::Float32($array) => $body,
            AnyTupleArray::Float64($array) => $body,
        }
    };
}

impl AnyTupleArray {
    /// Creates an empty array of the given kind and tuple width.
    pub fn new(kind: ElementKind, tuple_width: usize) -> Result<AnyTupleArray> {
        Self::with_options(kind, ArrayOptions::default().with_tuple_width(tuple_width))
    }

    pub fn with_options(kind: ElementKind, options: ArrayOptions) -> Result<AnyTupleArray> {
        fn make<T: Element>(options: ArrayOptions) -> Result<AnyTupleArray> {
            TupleArray::<T>::with_options(options).map(T::into_any)
        }

        match kind {
            ElementKind::Int8 => make::<i8>(options),
            ElementKind::UInt8 => make::<u8>(options),
            ElementKind::Int16 => make::<i16>(options),
            ElementKind::UInt16 => make::<u16>(options),
            ElementKind::Int32 => make::<i32>(options),
            ElementKind::UInt32 => make::<u32>(options),
            ElementKind::Int64 => make::<i64>(options),
            ElementKind::UInt64 => make::<u64>(options),
            ElementKind::Float32 => make::<f32>(options),
            ElementKind::Float64 => make::<f64>(options),
        }
    }

    pub fn kind(&self) -> ElementKind {
        dispatch!(self, a => a.kind())
    }

    pub fn len(&self) -> usize {
        dispatch!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        dispatch!(self, a => a.is_empty())
    }

    pub fn capacity(&self) -> usize {
        dispatch!(self, a => a.capacity())
    }

    pub fn tuple_width(&self) -> usize {
        dispatch!(self, a => a.tuple_width())
    }

    pub fn num_tuples(&self) -> usize {
        dispatch!(self, a => a.num_tuples())
    }

    pub fn ownership(&self) -> Ownership {
        dispatch!(self, a => a.ownership())
    }

    /// Size in bytes of the values in use.
    pub fn size_in_bytes(&self) -> usize {
        self.len() * self.kind().size_in_bytes()
    }

    pub fn set_len(&mut self, len: usize) -> Result<()> {
        dispatch!(self, a => a.set_len(len))
    }

    pub fn reset(&mut self) {
        dispatch!(self, a => a.reset())
    }

    pub fn reclaim_unused(&mut self) -> Result<()> {
        dispatch!(self, a => a.reclaim_unused())
    }

    /// The values in use, reinterpreted as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        dispatch!(self, a => bytemuck::cast_slice(a.as_slice()))
    }

    /// The typed array, if this array holds elements of type `T`.
    pub fn downcast_ref<T: Element>(&self) -> Option<&TupleArray<T>> {
        T::from_any_ref(self)
    }

    pub fn downcast_mut<T: Element>(&mut self) -> Option<&mut TupleArray<T>> {
        T::from_any_mut(self)
    }

    /// Unwraps the typed array, or hands `self` back if the kinds differ.
    pub fn into_typed<T: Element>(self) -> std::result::Result<TupleArray<T>, AnyTupleArray> {
        T::from_any(self)
    }

    pub fn is<T: Element>(&self) -> bool {
        self.kind() == T::KIND
    }
}

impl<T: Element> From<TupleArray<T>> for AnyTupleArray {
    fn from(array: TupleArray<T>) -> AnyTupleArray {
        T::into_any(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_any_array() {
        for kind in ElementKind::ALL {
            let array = AnyTupleArray::new(kind, 2).unwrap();
            assert_eq!(array.kind(), kind);
            assert_eq!(array.tuple_width(), 2);
            assert!(array.is_empty());
        }
        assert!(AnyTupleArray::new(ElementKind::Int32, 0).is_err());
    }

    #[test]
    fn test_downcast() {
        let mut typed = TupleArray::<f32>::new(2).unwrap();
        typed.extend_from_slice(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut any = AnyTupleArray::from(typed);

        assert!(any.is::<f32>());
        assert!(any.downcast_ref::<f64>().is_none());
        assert!(any.downcast_ref::<i32>().is_none());
        assert_eq!(any.downcast_ref::<f32>().unwrap().get_value(3).unwrap(), 4.0);

        any.downcast_mut::<f32>()
            .unwrap()
            .insert_next_tuple(&[5.0, 6.0])
            .unwrap();
        assert_eq!(any.num_tuples(), 3);
        assert_eq!(any.size_in_bytes(), 24);
        assert_eq!(any.as_bytes().len(), 24);

        let any = match any.into_typed::<u8>() {
            Ok(_) => panic!("downcast to the wrong kind"),
            Err(any) => any,
        };
        let typed = any.into_typed::<f32>().unwrap();
        assert_eq!(typed.len(), 6);
    }

    #[test]
    fn test_exhaustive_match() {
        let any = AnyTupleArray::new(ElementKind::UInt16, 1).unwrap();
        let name = match &any {
            AnyTupleArray::UInt16(_) => "u16",
            _ => "other",
        };
        assert_eq!(name, "u16");
    }

    #[test]
    fn test_dispatched_length_ops() {
        let mut any = AnyTupleArray::new(ElementKind::Int64, 1).unwrap();
        any.set_len(10).unwrap();
        assert_eq!(any.len(), 10);
        any.set_len(4).unwrap();
        any.reclaim_unused().unwrap();
        assert_eq!(any.capacity(), 4);
        any.reset();
        assert!(any.is_empty());
        assert_eq!(any.ownership(), Ownership::Allocated);
    }
}
