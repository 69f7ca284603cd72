//! Fixed-increment growth arrays: a [`TupleArray`] of width one growing by a
//! constant number of values.

use std::ops::AddAssign;

use tessera_buffer::Storage;
use tessera_common::Result;

use crate::{element::Element, growth::GrowthPolicy, options::ArrayOptions, tuple_array::TupleArray};

impl<T: Element, S: Storage<T>> TupleArray<T, S> {
    /// Creates a width-one array with an initial capacity of `size` values that
    /// grows in steps of `extend` values. Both arguments are clamped to at least one.
    ///
    /// Growing to hold index `i` sets the capacity to
    /// `capacity + extend * ceil((i + 1 - capacity) / extend)`.
    ///
    /// The capacity stays at least `size` until
    /// [`reclaim_unused`](TupleArray::reclaim_unused) is called on an empty array,
    /// which releases the block; growth then restarts from zero in steps of `extend`.
    pub fn legacy(size: usize, extend: usize) -> Result<Self> {
        Self::with_options(ArrayOptions::legacy(size, extend))
    }

    /// Discards the contents and starts over with a fresh block of `size` values
    /// and a linear growth step of `extend`, both clamped to at least one.
    /// The tuple width is left unchanged.
    pub fn reinitialize(&mut self, size: usize, extend: usize) -> Result<()> {
        let growth = GrowthPolicy::linear(extend.max(1))?;
        self.replace_storage(size.max(1))?;
        self.set_growth_policy(growth)
    }
}

/// Appends every value of `rhs`.
///
/// # Panics
///
/// Panics if the tuple widths differ or the storage cannot grow; use
/// [`TupleArray::append`] to handle those cases.
impl<T, S, S2> AddAssign<&TupleArray<T, S2>> for TupleArray<T, S>
where
    T: Element,
    S: Storage<T>,
    S2: Storage<T>,
{
    fn add_assign(&mut self, rhs: &TupleArray<T, S2>) {
        if let Err(e) = self.append(rhs) {
            panic!(
                "failed to append {} array: {e}; use TupleArray::append to handle the error",
                T::KIND
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::TupleArray;

    #[test]
    fn test_legacy_linear_growth() {
        let mut array = TupleArray::<i32>::legacy(1, 4).unwrap();
        assert_eq!(array.capacity(), 1);
        array.insert_value(0, 7).unwrap();
        assert_eq!(array.capacity(), 1);
        array.insert_value(5, 9).unwrap();
        assert_eq!(array.capacity(), 9);
        assert_eq!(array.len(), 6);
        assert_eq!(array.get_value(0).unwrap(), 7);
        assert_eq!(array.get_value(5).unwrap(), 9);

        array.insert_next_value(1).unwrap();
        array.insert_next_value(2).unwrap();
        array.insert_next_value(3).unwrap();
        assert_eq!(array.capacity(), 9);
        array.insert_next_value(4).unwrap();
        assert_eq!(array.len(), 10);
        assert_eq!(array.capacity(), 13);
    }

    #[test]
    fn test_legacy_clamps_arguments() {
        let array = TupleArray::<u8>::legacy(0, 0).unwrap();
        assert_eq!(array.capacity(), 1);
        assert_eq!(array.tuple_width(), 1);
        assert_eq!(
            array.growth_policy(),
            crate::GrowthPolicy::Linear { increment: 1 }
        );
    }

    #[test]
    fn test_reclaim_empty_releases_below_initial_size() {
        let mut array = TupleArray::<i32>::legacy(1, 4).unwrap();
        array.insert_next_value(1).unwrap();
        array.reset();
        array.reclaim_unused().unwrap();
        assert_eq!(array.capacity(), 0);

        array.insert_next_value(2).unwrap();
        assert_eq!(array.capacity(), 4);
        assert_eq!(array.as_slice(), &[2]);
    }

    #[test]
    fn test_reinitialize() {
        let mut array = TupleArray::<f32>::legacy(4, 2).unwrap();
        array.extend_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        array.reinitialize(3, 10).unwrap();
        assert_eq!(array.len(), 0);
        assert_eq!(array.capacity(), 3);
        array.insert_value(3, 1.0).unwrap();
        assert_eq!(array.capacity(), 13);
    }

    #[test]
    fn test_add_assign_appends() {
        let mut a = TupleArray::<i64>::legacy(2, 2).unwrap();
        a.extend_from_slice(&[1, 2]).unwrap();
        let mut b = TupleArray::<i64>::legacy(2, 2).unwrap();
        b.extend_from_slice(&[3, 4, 5]).unwrap();
        a += &b;
        assert_eq!(a.as_slice(), &[1, 2, 3, 4, 5]);
        assert_eq!(b.len(), 3);
    }

    #[test]
    #[should_panic(expected = "use TupleArray::append to handle the error")]
    fn test_add_assign_width_mismatch_panics() {
        let mut a = TupleArray::<i64>::new(2).unwrap();
        let b = TupleArray::<i64>::new(3).unwrap();
        a += &b;
    }

    #[test]
    fn test_clone_copies_live_values() {
        let mut a = TupleArray::<u32>::legacy(8, 4).unwrap();
        a.extend_from_slice(&[9, 8, 7]).unwrap();
        let b = a.clone();
        assert_eq!(b.as_slice(), &[9, 8, 7]);
        assert_eq!(b.capacity(), 8);
        assert_eq!(b.growth_policy(), a.growth_policy());
    }
}
