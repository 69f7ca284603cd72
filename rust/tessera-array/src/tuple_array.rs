//! `TupleArray`: a resizable array of fixed-width tuples over a typed [`Storage`].

use std::{marker::PhantomData, ops::Range, ptr::NonNull};

use tessera_buffer::{DeletionMethod, OwnedBuffer, Ownership, Retention, Storage};
use tessera_common::{Result, error::Error, verify_arg};

use crate::{
    element::{Element, ElementKind},
    growth::GrowthPolicy,
    options::{ArrayOptions, BorrowedGrowth},
};

/// A typed, resizable array whose values are grouped into tuples of
/// [`tuple_width`](TupleArray::tuple_width) consecutive components.
///
/// The array keeps a logical length (the number of values in use) separately from
/// the capacity of its storage; `len() <= capacity()` holds in every reachable state.
/// Tuple operations are well defined when the length is a multiple of the tuple width.
///
/// Writes past the capacity grow the storage through the configured
/// [`GrowthPolicy`]. Any fallible operation that returns `Err` leaves the array
/// exactly as it was.
///
/// Raw pointers and slices obtained from the array are invalidated by any
/// subsequent mutating call.
pub struct TupleArray<T, S = OwnedBuffer<T>> {
    buffer: S,
    tuple_width: usize,
    len: usize,
    growth: GrowthPolicy,
    borrowed_growth: BorrowedGrowth,
    _marker: PhantomData<T>,
}

impl<T: Element, S: Storage<T>> TupleArray<T, S> {
    /// Creates an empty array with `tuple_width` components per tuple and
    /// the default (doubling) growth policy.
    pub fn new(tuple_width: usize) -> Result<Self> {
        Self::with_options(ArrayOptions::default().with_tuple_width(tuple_width))
    }

    /// Creates an empty array from validated `options`.
    pub fn with_options(options: ArrayOptions) -> Result<Self> {
        options.validate()?;
        let mut buffer = S::default();
        if options.initial_capacity != 0 {
            buffer.allocate(options.initial_capacity)?;
        }
        Ok(TupleArray {
            buffer,
            tuple_width: options.tuple_width,
            len: 0,
            growth: options.growth,
            borrowed_growth: options.borrowed_growth,
            _marker: PhantomData,
        })
    }

    /// The element kind tag of this array.
    #[inline]
    pub fn kind(&self) -> ElementKind {
        T::KIND
    }

    /// Number of values in use.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Highest valid flat index, or `None` when the array is empty.
    #[inline]
    pub fn last_index(&self) -> Option<usize> {
        self.len.checked_sub(1)
    }

    /// Number of values the storage can hold without growing.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    #[inline]
    pub fn tuple_width(&self) -> usize {
        self.tuple_width
    }

    /// Number of complete tuples in use.
    #[inline]
    pub fn num_tuples(&self) -> usize {
        self.len / self.tuple_width
    }

    pub fn growth_policy(&self) -> GrowthPolicy {
        self.growth
    }

    pub fn borrowed_growth(&self) -> BorrowedGrowth {
        self.borrowed_growth
    }

    pub fn ownership(&self) -> Ownership {
        self.buffer.ownership()
    }

    /// The backing storage.
    pub fn storage(&self) -> &S {
        &self.buffer
    }

    /// Changes the number of components per tuple. The length is reset to zero;
    /// capacity and contents are kept.
    pub fn set_tuple_width(&mut self, tuple_width: usize) -> Result<()> {
        verify_arg!(tuple_width, tuple_width > 0);
        self.tuple_width = tuple_width;
        self.len = 0;
        Ok(())
    }

    pub fn set_growth_policy(&mut self, growth: GrowthPolicy) -> Result<()> {
        growth.validate()?;
        self.growth = growth;
        Ok(())
    }

    /// Makes sure the storage can hold at least `required` values, growing it
    /// through the growth policy if needed. Never shrinks.
    pub fn ensure_capacity(&mut self, required: usize) -> Result<()> {
        let capacity = self.buffer.capacity();
        if required <= capacity {
            return Ok(());
        }
        let target = self.growth.next_capacity(capacity, required);
        log::trace!(
            "growing {} array from {capacity} to {target} values ({:?})",
            T::KIND,
            self.growth
        );
        self.resize_storage(target)
    }

    /// Sets the logical length to `len`, growing the storage if needed.
    /// Shrinking only moves the length; memory is kept until
    /// [`reclaim_unused`](TupleArray::reclaim_unused). Values between the old and the
    /// new length are unspecified after growing.
    pub fn set_len(&mut self, len: usize) -> Result<()> {
        self.ensure_capacity(len)?;
        self.len = len;
        Ok(())
    }

    /// Sets the length to `num_tuples` whole tuples.
    pub fn set_num_tuples(&mut self, num_tuples: usize) -> Result<()> {
        let len = num_tuples
            .checked_mul(self.tuple_width)
            .ok_or_else(|| Self::capacity_overflow(num_tuples.saturating_mul(self.tuple_width)))?;
        self.set_len(len)
    }

    /// Shrinks the capacity to exactly the logical length ("squeeze").
    ///
    /// An empty array releases its block entirely, whatever the growth policy, so
    /// a fixed-increment array may drop below its initial size here. The next write
    /// grows it again by the configured increment.
    ///
    /// A borrowed block is never released: depending on
    /// [`BorrowedGrowth`], the live values are copied into a new owned block or
    /// the call fails with `InvalidOperation`. An adopted block owned by the array
    /// is replaced by an owned copy and released through its deletion method.
    pub fn reclaim_unused(&mut self) -> Result<()> {
        if self.len == self.buffer.capacity() {
            return Ok(());
        }
        self.resize_storage(self.len)
    }

    /// Sets the length to zero, keeping capacity and contents.
    #[inline]
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Releases the storage and resets the length.
    pub fn clear_storage(&mut self) {
        self.buffer.release();
        self.len = 0;
    }

    /// Reads the value at `index`, failing if `index >= len()`.
    #[inline]
    pub fn get_value(&self, index: usize) -> Result<T> {
        if index < self.len {
            Ok(unsafe { self.get_value_unchecked(index) })
        } else {
            Err(Error::out_of_range(index, self.len))
        }
    }

    /// Reads the value at `index` without bounds checking.
    ///
    /// # Safety
    ///
    /// `index` must be less than [`capacity`](TupleArray::capacity); it should be less
    /// than [`len`](TupleArray::len) for the value to be meaningful.
    #[inline]
    pub unsafe fn get_value_unchecked(&self, index: usize) -> T {
        debug_assert!(index < self.buffer.capacity());
        unsafe { self.buffer.as_ptr().add(index).read() }
    }

    /// Writes the value at `index`, failing if `index >= capacity()`. Writing at or
    /// past the current length extends the length to `index + 1`. Never grows the
    /// storage, see [`insert_value`](TupleArray::insert_value).
    #[inline]
    pub fn set_value(&mut self, index: usize, value: T) -> Result<()> {
        if index < self.buffer.capacity() {
            unsafe { self.set_value_unchecked(index, value) };
            Ok(())
        } else {
            Err(Error::out_of_range(index, self.buffer.capacity()))
        }
    }

    /// Writes the value at `index` without bounds checking, extending the length
    /// to `index + 1` if it was shorter.
    ///
    /// # Safety
    ///
    /// `index` must be less than [`capacity`](TupleArray::capacity).
    #[inline]
    pub unsafe fn set_value_unchecked(&mut self, index: usize, value: T) {
        debug_assert!(index < self.buffer.capacity());
        unsafe { self.buffer.as_mut_ptr().add(index).write(value) };
        if index >= self.len {
            self.len = index + 1;
        }
    }

    /// Writes the value at `index`, growing the storage as needed. The length
    /// becomes `max(len(), index + 1)`.
    pub fn insert_value(&mut self, index: usize, value: T) -> Result<()> {
        let required = index
            .checked_add(1)
            .ok_or_else(|| Self::capacity_overflow(index.saturating_add(1)))?;
        self.ensure_capacity(required)?;
        unsafe { self.set_value_unchecked(index, value) };
        Ok(())
    }

    /// Appends `value` and returns its flat index.
    #[inline]
    pub fn insert_next_value(&mut self, value: T) -> Result<usize> {
        let index = self.len;
        if index < self.buffer.capacity() {
            unsafe { self.set_value_unchecked(index, value) };
        } else {
            self.insert_value(index, value)?;
        }
        Ok(index)
    }

    /// Returns the tuple at `tuple_index` as a slice of `tuple_width()` values.
    pub fn tuple(&self, tuple_index: usize) -> Result<&[T]> {
        match self.tuple_range(tuple_index) {
            Some(range) if range.end <= self.len => Ok(&self.as_slice()[range]),
            _ => Err(Error::out_of_range(tuple_index, self.num_tuples())),
        }
    }

    /// Copies the tuple at `tuple_index` into `out`, which must hold exactly
    /// `tuple_width()` values.
    pub fn get_tuple(&self, tuple_index: usize, out: &mut [T]) -> Result<()> {
        verify_arg!(out, out.len() == self.tuple_width);
        out.copy_from_slice(self.tuple(tuple_index)?);
        Ok(())
    }

    /// Copies the tuple at `tuple_index` into the start of `out` without checks.
    ///
    /// # Safety
    ///
    /// The tuple must lie within [`capacity`](TupleArray::capacity) and `out` must
    /// hold at least `tuple_width()` values.
    #[inline]
    pub unsafe fn get_tuple_unchecked(&self, tuple_index: usize, out: &mut [T]) {
        let width = self.tuple_width;
        debug_assert!(out.len() >= width);
        debug_assert!((tuple_index + 1) * width <= self.buffer.capacity());
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.buffer.as_ptr().add(tuple_index * width),
                out.as_mut_ptr(),
                width,
            );
        }
    }

    /// Overwrites the tuple at `tuple_index` with `values`, which must hold exactly
    /// `tuple_width()` values. The tuple must fit in the current capacity; the length
    /// is extended to cover it. Never grows the storage, see
    /// [`insert_tuple`](TupleArray::insert_tuple).
    pub fn set_tuple(&mut self, tuple_index: usize, values: &[T]) -> Result<()> {
        verify_arg!(values, values.len() == self.tuple_width);
        match self.tuple_range(tuple_index) {
            Some(range) if range.end <= self.buffer.capacity() => {
                unsafe { self.set_tuple_unchecked(tuple_index, values) };
                Ok(())
            }
            _ => Err(Error::out_of_range(
                tuple_index,
                self.buffer.capacity() / self.tuple_width,
            )),
        }
    }

    /// Overwrites the tuple at `tuple_index` from the start of `values` without
    /// checks, extending the length to cover the tuple.
    ///
    /// # Safety
    ///
    /// The tuple must lie within [`capacity`](TupleArray::capacity) and `values` must
    /// hold at least `tuple_width()` values.
    #[inline]
    pub unsafe fn set_tuple_unchecked(&mut self, tuple_index: usize, values: &[T]) {
        let width = self.tuple_width;
        let end = (tuple_index + 1) * width;
        debug_assert!(values.len() >= width);
        debug_assert!(end <= self.buffer.capacity());
        unsafe {
            std::ptr::copy_nonoverlapping(
                values.as_ptr(),
                self.buffer.as_mut_ptr().add(tuple_index * width),
                width,
            );
        }
        if end > self.len {
            self.len = end;
        }
    }

    /// Overwrites the tuple at `tuple_index`, growing the storage as needed.
    pub fn insert_tuple(&mut self, tuple_index: usize, values: &[T]) -> Result<()> {
        verify_arg!(values, values.len() == self.tuple_width);
        let range = self
            .tuple_range(tuple_index)
            .ok_or_else(|| {
                Self::capacity_overflow(
                    tuple_index
                        .saturating_mul(self.tuple_width)
                        .saturating_add(self.tuple_width),
                )
            })?;
        self.ensure_capacity(range.end)?;
        unsafe { self.set_tuple_unchecked(tuple_index, values) };
        Ok(())
    }

    /// Appends a tuple after the last complete tuple and returns its tuple index.
    pub fn insert_next_tuple(&mut self, values: &[T]) -> Result<usize> {
        let tuple_index = self.num_tuples();
        self.insert_tuple(tuple_index, values)?;
        Ok(tuple_index)
    }

    /// Reads component `component` of the tuple at `tuple_index`.
    pub fn component(&self, tuple_index: usize, component: usize) -> Result<T> {
        verify_arg!(component, component < self.tuple_width);
        let index = self.component_index(tuple_index, component)?;
        self.get_value(index)
    }

    /// Writes component `component` of the tuple at `tuple_index`, with the
    /// same capacity rule as [`set_value`](TupleArray::set_value).
    pub fn set_component(&mut self, tuple_index: usize, component: usize, value: T) -> Result<()> {
        verify_arg!(component, component < self.tuple_width);
        let index = self.component_index(tuple_index, component)?;
        self.set_value(index, value)
    }

    /// Makes room for `count` values starting at `index` and returns them as a
    /// mutable slice. The length is extended to `index + count` if it was shorter.
    /// Contents of newly covered values are unspecified.
    pub fn write_pointer(&mut self, index: usize, count: usize) -> Result<&mut [T]> {
        let end = index
            .checked_add(count)
            .ok_or_else(|| Self::capacity_overflow(index.saturating_add(count)))?;
        self.ensure_capacity(end)?;
        if end > self.len {
            self.len = end;
        }
        Ok(&mut self.as_mut_slice()[index..end])
    }

    /// Appends `values` after the current length.
    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<()> {
        let start = self.len;
        self.write_pointer(start, values.len())?
            .copy_from_slice(values);
        Ok(())
    }

    /// Appends every value of `other`, which must have the same tuple width.
    pub fn append<S2: Storage<T>>(&mut self, other: &TupleArray<T, S2>) -> Result<()> {
        verify_arg!(other, other.tuple_width() == self.tuple_width);
        self.extend_from_slice(other.as_slice())
    }

    /// The values in use, `[0, len())`.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.buffer.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.buffer.as_mut_ptr(), self.len) }
    }

    /// Begin and end pointers over the values in use, for linear scans.
    #[inline]
    pub fn as_ptr_range(&self) -> Range<*const T> {
        self.as_slice().as_ptr_range()
    }

    /// Iterates over complete tuples.
    pub fn tuples(&self) -> std::slice::ChunksExact<'_, T> {
        self.as_slice().chunks_exact(self.tuple_width)
    }

    /// Smallest and largest value of component `component` over the values in use,
    /// or `None` if there are none. Unordered values (NaN) are skipped.
    pub fn value_range(&self, component: usize) -> Option<(T, T)> {
        if component >= self.tuple_width {
            return None;
        }
        let mut values = self
            .as_slice()
            .iter()
            .skip(component)
            .step_by(self.tuple_width)
            .copied()
            .filter(|v| v.partial_cmp(v).is_some());
        let first = values.next()?;
        Some(values.fold((first, first), |(min, max), v| {
            (
                if v < min { v } else { min },
                if v > max { v } else { max },
            )
        }))
    }

    /// Takes over `ptr` as the array's storage for `len` fully populated values
    /// and sets the length to `len`.
    ///
    /// With [`Retention::Caller`] the array never releases `ptr`; later growth
    /// copies the values into an owned block (or fails, see [`BorrowedGrowth`]).
    /// With [`Retention::Buffer`] the array releases `ptr` through `deletion` exactly
    /// once: on drop, on the next adoption, or when a reallocation replaces it.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `len` initialized values that stay valid while the array
    /// holds them. With [`Retention::Buffer`], the block must be releasable through
    /// `deletion` and nothing else may release it.
    pub unsafe fn adopt_external(
        &mut self,
        ptr: NonNull<T>,
        len: usize,
        retention: Retention,
        deletion: DeletionMethod<T>,
    ) -> Result<()> {
        unsafe { self.buffer.adopt(ptr, len, retention, deletion)? };
        self.len = len;
        Ok(())
    }

    /// Takes over a boxed slice as the array's storage; the length becomes
    /// `data.len()`.
    pub fn adopt_boxed(&mut self, data: Box<[T]>) -> Result<()> {
        let len = data.len();
        verify_arg!(data, len > 0);
        let ptr = NonNull::from(Box::leak(data)).cast::<T>();
        let res =
            unsafe { self.adopt_external(ptr, len, Retention::Buffer, DeletionMethod::Global) };
        if res.is_err() {
            drop(unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr.as_ptr(), len))
            });
        }
        res
    }

    /// Deep copy of the values in use into an owned block with the same capacity.
    pub fn try_clone(&self) -> Result<Self> {
        let mut buffer = S::default();
        buffer.allocate(self.buffer.capacity())?;
        unsafe {
            std::ptr::copy_nonoverlapping(self.buffer.as_ptr(), buffer.as_mut_ptr(), self.len);
        }
        Ok(TupleArray {
            buffer,
            tuple_width: self.tuple_width,
            len: self.len,
            growth: self.growth,
            borrowed_growth: self.borrowed_growth,
            _marker: PhantomData,
        })
    }
}

impl<T: Element, S: Storage<T>> TupleArray<T, S> {
    /// Swaps the storage for a fresh owned block of exactly `capacity` values and
    /// resets the length.
    pub(crate) fn replace_storage(&mut self, capacity: usize) -> Result<()> {
        self.buffer.allocate(capacity)?;
        self.len = 0;
        Ok(())
    }

    /// Error for a requested element count that does not fit in `usize`. Both
    /// counts saturate.
    #[cold]
    fn capacity_overflow(elements: usize) -> Error {
        Error::allocation_failure(elements, elements.saturating_mul(std::mem::size_of::<T>()))
    }

    fn resize_storage(&mut self, capacity: usize) -> Result<()> {
        match (self.buffer.ownership(), self.borrowed_growth) {
            (Ownership::Borrowed, BorrowedGrowth::CopyOnGrow) => self.buffer.detach(capacity),
            (Ownership::Borrowed, BorrowedGrowth::Refuse) => {
                Err(Error::invalid_operation("resize borrowed storage"))
            }
            (Ownership::Allocated | Ownership::External, _) => self.buffer.reallocate(capacity),
        }
    }

    #[inline]
    fn tuple_range(&self, tuple_index: usize) -> Option<Range<usize>> {
        let start = tuple_index.checked_mul(self.tuple_width)?;
        let end = start.checked_add(self.tuple_width)?;
        Some(start..end)
    }

    #[inline]
    fn component_index(&self, tuple_index: usize, component: usize) -> Result<usize> {
        tuple_index
            .checked_mul(self.tuple_width)
            .and_then(|start| start.checked_add(component))
            .ok_or_else(|| Error::out_of_range(tuple_index, self.num_tuples()))
    }
}

impl<T: Element, S: Storage<T>> Default for TupleArray<T, S> {
    fn default() -> Self {
        TupleArray {
            buffer: S::default(),
            tuple_width: 1,
            len: 0,
            growth: GrowthPolicy::default(),
            borrowed_growth: BorrowedGrowth::default(),
            _marker: PhantomData,
        }
    }
}

/// # Panics
///
/// Panics if the copy cannot be allocated; use
/// [`try_clone`](TupleArray::try_clone) to handle that case.
impl<T: Element, S: Storage<T>> Clone for TupleArray<T, S> {
    fn clone(&self) -> Self {
        self.try_clone()
            .unwrap_or_else(|e| panic!("failed to clone {} array: {e}", T::KIND))
    }
}

impl<T: Element, S: Storage<T>> PartialEq for TupleArray<T, S> {
    fn eq(&self, other: &Self) -> bool {
        self.tuple_width == other.tuple_width && self.as_slice() == other.as_slice()
    }
}

impl<T: Element, S: Storage<T>> std::fmt::Debug for TupleArray<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TupleArray")
            .field("kind", &T::KIND)
            .field("tuple_width", &self.tuple_width)
            .field("len", &self.len)
            .field("capacity", &self.buffer.capacity())
            .field("ownership", &self.buffer.ownership())
            .field("values", &self.as_slice())
            .finish_non_exhaustive()
    }
}
