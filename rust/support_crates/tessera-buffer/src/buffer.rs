use std::ptr::NonNull;

use tessera_common::{Result, error::Error, verify_arg};

use crate::{
    ownership::{DeletionMethod, Ownership, Retention},
    raw,
    storage::Storage,
};

/// A contiguous block of `T` values that is either allocated by the buffer itself
/// or adopted from a caller.
///
/// The buffer tracks capacity only; it has no notion of a logical length. Every
/// element below [`capacity`](OwnedBuffer::capacity) is initialized: blocks allocated
/// here are zero-filled, and adopted blocks must be fully initialized by contract.
///
/// # Ownership
///
/// - [`Ownership::Allocated`]: allocated through the global allocator and released
///   on drop or replacement.
/// - [`Ownership::External`]: adopted with [`Retention::Buffer`] and released exactly
///   once through the recorded [`DeletionMethod`], either on drop, on replacement, or
///   when a reallocation moves the contents into a freshly allocated block.
/// - [`Ownership::Borrowed`]: adopted with [`Retention::Caller`] and never released
///   by the buffer.
///
/// Mutating calls may move the block; raw pointers must not be kept across them.
pub struct OwnedBuffer<T> {
    ptr: NonNull<T>,
    capacity: usize,
    ownership: Ownership,
    deletion: DeletionMethod<T>,
}

// The buffer is the only handle to its block; adopted blocks are handed over under
// the `adopt` safety contract.
unsafe impl<T: Send> Send for OwnedBuffer<T> {}

unsafe impl<T: Sync> Sync for OwnedBuffer<T> {}

impl<T> OwnedBuffer<T> {
    /// Creates an empty buffer with no allocation.
    pub fn new() -> OwnedBuffer<T> {
        OwnedBuffer {
            ptr: NonNull::dangling(),
            capacity: 0,
            ownership: Ownership::Allocated,
            deletion: DeletionMethod::Global,
        }
    }

    /// Returns the number of elements the current block holds.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Returns the method that will be used to release an adopted block.
    pub fn deletion_method(&self) -> &DeletionMethod<T> {
        &self.deletion
    }

    /// Returns a raw pointer to the first element.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Returns a mutable raw pointer to the first element.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Lets go of the current block according to its ownership and leaves the
    /// buffer empty and self-allocated. Calling it again is a no-op.
    pub fn release(&mut self) {
        if self.capacity != 0 {
            match self.ownership {
                Ownership::Allocated => unsafe { raw::deallocate(self.ptr, self.capacity) },
                Ownership::External => {
                    log::debug!(
                        "releasing adopted block of {} elements via {:?}",
                        self.capacity,
                        self.deletion
                    );
                    unsafe { self.deletion.delete(self.ptr, self.capacity) }
                }
                Ownership::Borrowed => (),
            }
        }
        self.ptr = NonNull::dangling();
        self.capacity = 0;
        self.ownership = Ownership::Allocated;
        self.deletion = DeletionMethod::Global;
    }
}

impl<T: bytemuck::Pod> OwnedBuffer<T> {
    /// Creates a buffer owning a zero-filled block of `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Result<OwnedBuffer<T>> {
        let mut buf = OwnedBuffer::new();
        buf.allocate(capacity)?;
        Ok(buf)
    }

    /// Creates a buffer owning a copy of `data`, with capacity `data.len()`.
    pub fn copy_from_slice(data: &[T]) -> Result<OwnedBuffer<T>> {
        let mut buf = OwnedBuffer::with_capacity(data.len())?;
        buf.as_mut_slice().copy_from_slice(data);
        Ok(buf)
    }

    /// Creates a buffer that takes over a boxed slice. The box's memory is released
    /// through the global allocator once the buffer lets go of it.
    pub fn from_boxed_slice(data: Box<[T]>) -> OwnedBuffer<T> {
        let mut buf = OwnedBuffer::new();
        if !data.is_empty() {
            let len = data.len();
            let ptr = NonNull::from(Box::leak(data)).cast::<T>();
            buf.ptr = ptr;
            buf.capacity = len;
            buf.ownership = Ownership::External;
        }
        buf
    }

    /// Replaces the current block with a fresh zero-filled block of `capacity`
    /// elements. The new block is obtained before the old one is released, so on
    /// failure the buffer keeps its previous block. `allocate(0)` simply releases.
    pub fn allocate(&mut self, capacity: usize) -> Result<()> {
        let ptr = raw::allocate_zeroed::<T>(capacity)?;
        self.release();
        self.ptr = ptr;
        self.capacity = capacity;
        Ok(())
    }

    /// Changes the capacity to exactly `capacity`, preserving the elements below
    /// `min(old capacity, capacity)`; new elements are zero.
    ///
    /// An externally owned block is moved into a freshly allocated block and released
    /// through its deletion method. A borrowed block cannot be reallocated, see
    /// [`detach`](OwnedBuffer::detach).
    pub fn reallocate(&mut self, capacity: usize) -> Result<()> {
        if capacity == self.capacity {
            return Ok(());
        }
        match self.ownership {
            Ownership::Allocated => {
                let ptr = unsafe { raw::reallocate_zeroed(self.ptr, self.capacity, capacity)? };
                log::trace!("reallocated buffer from {} to {capacity} elements", self.capacity);
                self.ptr = ptr;
                self.capacity = capacity;
                Ok(())
            }
            Ownership::External => self.detach(capacity),
            Ownership::Borrowed => Err(Error::invalid_operation("reallocate borrowed buffer")),
        }
    }

    /// Copies the first `min(old capacity, capacity)` elements into a fresh owned
    /// block of `capacity` elements, then lets go of the previous block according
    /// to its ownership. A borrowed block is left untouched for its owner.
    pub fn detach(&mut self, capacity: usize) -> Result<()> {
        let ptr = raw::allocate_zeroed::<T>(capacity)?;
        let keep = capacity.min(self.capacity);
        if keep != 0 {
            unsafe { std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), ptr.as_ptr(), keep) };
        }
        let previous = self.ownership;
        self.release();
        self.ptr = ptr;
        self.capacity = capacity;
        log::debug!("detached {previous:?} block into an owned block of {capacity} elements");
        Ok(())
    }

    /// Takes over `ptr` as the backing store for `len` elements.
    ///
    /// With [`Retention::Caller`] the buffer becomes [`Ownership::Borrowed`] and never
    /// releases `ptr`. With [`Retention::Buffer`] it becomes [`Ownership::External`] and
    /// releases `ptr` exactly once through `deletion`.
    ///
    /// The previously held block is released first. Adopting the block the buffer
    /// already holds is rejected as an ownership conflict, and `len` must be non-zero.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `len` initialized elements that remain valid while the
    /// buffer holds them. With [`Retention::Buffer`] the block must be releasable
    /// through `deletion`, and nothing else may release it.
    pub unsafe fn adopt(
        &mut self,
        ptr: NonNull<T>,
        len: usize,
        retention: Retention,
        deletion: DeletionMethod<T>,
    ) -> Result<()> {
        verify_arg!(len, len > 0);
        if self.capacity != 0 && ptr == self.ptr {
            return Err(Error::ownership_conflict(
                "the adopted block is already held by this buffer",
            ));
        }
        self.release();
        self.ptr = ptr;
        self.capacity = len;
        self.ownership = retention.ownership();
        self.deletion = deletion;
        log::debug!(
            "adopted block of {len} elements as {:?} ({:?})",
            self.ownership,
            self.deletion
        );
        Ok(())
    }

    /// Returns the whole block as a slice of `capacity` elements.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.capacity) }
    }

    /// Returns the whole block as a mutable slice of `capacity` elements.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.capacity) }
    }

    /// Reads the element at `index` without bounds checking.
    ///
    /// # Safety
    ///
    /// `index` must be less than [`capacity`](OwnedBuffer::capacity).
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> T {
        debug_assert!(index < self.capacity);
        unsafe { self.ptr.as_ptr().add(index).read() }
    }

    /// Writes the element at `index` without bounds checking.
    ///
    /// # Safety
    ///
    /// `index` must be less than [`capacity`](OwnedBuffer::capacity).
    #[inline]
    pub unsafe fn set_unchecked(&mut self, index: usize, value: T) {
        debug_assert!(index < self.capacity);
        unsafe { self.ptr.as_ptr().add(index).write(value) }
    }
}

impl<T> Drop for OwnedBuffer<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> Default for OwnedBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: bytemuck::Pod> From<Vec<T>> for OwnedBuffer<T> {
    fn from(vec: Vec<T>) -> Self {
        OwnedBuffer::from_boxed_slice(vec.into_boxed_slice())
    }
}

impl<T> std::fmt::Debug for OwnedBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedBuffer")
            .field("capacity", &self.capacity)
            .field("ownership", &self.ownership)
            .field("deletion", &self.deletion)
            .finish_non_exhaustive()
    }
}

impl<T: bytemuck::Pod> Storage<T> for OwnedBuffer<T> {
    #[inline]
    fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn ownership(&self) -> Ownership {
        self.ownership
    }

    fn allocate(&mut self, capacity: usize) -> Result<()> {
        OwnedBuffer::allocate(self, capacity)
    }

    fn reallocate(&mut self, capacity: usize) -> Result<()> {
        OwnedBuffer::reallocate(self, capacity)
    }

    fn detach(&mut self, capacity: usize) -> Result<()> {
        OwnedBuffer::detach(self, capacity)
    }

    unsafe fn adopt(
        &mut self,
        ptr: NonNull<T>,
        len: usize,
        retention: Retention,
        deletion: DeletionMethod<T>,
    ) -> Result<()> {
        unsafe { OwnedBuffer::adopt(self, ptr, len, retention, deletion) }
    }

    fn release(&mut self) {
        OwnedBuffer::release(self)
    }

    #[inline]
    fn as_ptr(&self) -> *const T {
        OwnedBuffer::as_ptr(self)
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        OwnedBuffer::as_mut_ptr(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use tessera_common::error::ErrorKind;

    use super::*;

    /// A deleter that frees a `Box<[T]>`-compatible block and counts invocations.
    fn counting_deleter<T: 'static>(calls: Arc<AtomicUsize>) -> DeletionMethod<T> {
        DeletionMethod::custom(move |ptr: NonNull<T>, capacity| {
            calls.fetch_add(1, Ordering::SeqCst);
            unsafe { raw::deallocate(ptr, capacity) };
        })
    }

    fn leaked_block(values: &[i32]) -> NonNull<i32> {
        NonNull::from(Box::leak(values.to_vec().into_boxed_slice())).cast()
    }

    #[test]
    fn test_buffer_new() {
        let buf = OwnedBuffer::<f64>::new();
        assert_eq!(buf.capacity(), 0);
        assert_eq!(buf.ownership(), Ownership::Allocated);
        assert!(buf.as_slice().is_empty());
    }

    #[test]
    fn test_buffer_with_capacity_is_zeroed() {
        let buf = OwnedBuffer::<u32>::with_capacity(100).unwrap();
        assert_eq!(buf.capacity(), 100);
        assert!(buf.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_buffer_allocate_replaces_contents() {
        let mut buf = OwnedBuffer::copy_from_slice(&[1u8, 2, 3]).unwrap();
        buf.allocate(5).unwrap();
        assert_eq!(buf.capacity(), 5);
        assert_eq!(buf.as_slice(), &[0, 0, 0, 0, 0]);

        buf.allocate(0).unwrap();
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn test_buffer_allocate_failure_keeps_block() {
        let mut buf = OwnedBuffer::copy_from_slice(&[7u32, 8, 9]).unwrap();
        let err = buf.allocate(usize::MAX / 2).unwrap_err();
        assert!(err.is_allocation_failure());
        assert_eq!(buf.capacity(), 3);
        assert_eq!(buf.as_slice(), &[7, 8, 9]);
    }

    #[test]
    fn test_buffer_reallocate_preserves_contents() {
        let mut buf = OwnedBuffer::copy_from_slice(&[1i16, 2, 3, 4]).unwrap();
        buf.reallocate(8).unwrap();
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 0, 0, 0, 0]);
        buf.reallocate(2).unwrap();
        assert_eq!(buf.as_slice(), &[1, 2]);
        buf.reallocate(2).unwrap();
        assert_eq!(buf.capacity(), 2);
    }

    #[test]
    fn test_buffer_reallocate_failure_keeps_block() {
        let mut buf = OwnedBuffer::copy_from_slice(&[5u64, 6]).unwrap();
        assert!(buf.reallocate(usize::MAX / 4).unwrap_err().is_allocation_failure());
        assert_eq!(buf.as_slice(), &[5, 6]);
        assert_eq!(buf.ownership(), Ownership::Allocated);
    }

    #[test]
    fn test_buffer_unchecked_access() {
        let mut buf = OwnedBuffer::<f32>::with_capacity(4).unwrap();
        unsafe {
            buf.set_unchecked(3, 1.5);
            assert_eq!(buf.get_unchecked(3), 1.5);
            assert_eq!(buf.get_unchecked(0), 0.0);
        }
    }

    #[test]
    fn test_buffer_adopt_retained_never_freed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut data = [10i32, 20, 30, 40];
        {
            let mut buf = OwnedBuffer::<i32>::new();
            unsafe {
                buf.adopt(
                    NonNull::from(&mut data).cast(),
                    4,
                    Retention::Caller,
                    counting_deleter(calls.clone()),
                )
                .unwrap();
            }
            assert_eq!(buf.ownership(), Ownership::Borrowed);
            assert_eq!(buf.as_slice(), &[10, 20, 30, 40]);
            buf.as_mut_slice()[0] = 11;

            let err = buf.reallocate(8).unwrap_err();
            assert!(matches!(err.kind(), ErrorKind::InvalidOperation { .. }));
            assert_eq!(buf.capacity(), 4);

            buf.release();
            buf.release();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(data, [11, 20, 30, 40]);
    }

    #[test]
    fn test_buffer_adopt_owned_freed_once_on_drop() {
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let mut buf = OwnedBuffer::<i32>::new();
            unsafe {
                buf.adopt(
                    leaked_block(&[1, 2, 3]),
                    3,
                    Retention::Buffer,
                    counting_deleter(calls.clone()),
                )
                .unwrap();
            }
            assert_eq!(buf.ownership(), Ownership::External);
            assert_eq!(buf.as_slice(), &[1, 2, 3]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_buffer_adopt_owned_freed_once_on_reallocate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut buf = OwnedBuffer::<i32>::new();
        unsafe {
            buf.adopt(
                leaked_block(&[1, 2, 3]),
                3,
                Retention::Buffer,
                counting_deleter(calls.clone()),
            )
            .unwrap();
        }
        buf.reallocate(6).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(buf.ownership(), Ownership::Allocated);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 0, 0, 0]);

        drop(buf);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_buffer_adopt_releases_previous() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut buf = OwnedBuffer::<i32>::new();
        unsafe {
            buf.adopt(
                leaked_block(&[1]),
                1,
                Retention::Buffer,
                counting_deleter(first.clone()),
            )
            .unwrap();
            buf.adopt(
                leaked_block(&[2, 2]),
                2,
                Retention::Buffer,
                counting_deleter(second.clone()),
            )
            .unwrap();
        }
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        buf.release();
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn test_buffer_adopt_rejects_invalid_arguments() {
        let mut buf = OwnedBuffer::copy_from_slice(&[1i32, 2]).unwrap();
        let ptr = NonNull::new(buf.as_mut_ptr()).unwrap();
        let err = unsafe { buf.adopt(ptr, 2, Retention::Buffer, DeletionMethod::Global) }
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OwnershipConflict { .. }));
        assert_eq!(buf.as_slice(), &[1, 2]);

        let mut other = [0i32; 2];
        let err = unsafe {
            buf.adopt(
                NonNull::from(&mut other).cast(),
                0,
                Retention::Caller,
                DeletionMethod::Global,
            )
        }
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
        assert_eq!(buf.ownership(), Ownership::Allocated);
    }

    #[test]
    fn test_buffer_detach_borrowed() {
        let mut data = [3u8, 4, 5];
        let mut buf = OwnedBuffer::<u8>::new();
        unsafe {
            buf.adopt(
                NonNull::from(&mut data).cast(),
                3,
                Retention::Caller,
                DeletionMethod::LibcFree,
            )
            .unwrap();
        }
        buf.detach(5).unwrap();
        assert_eq!(buf.ownership(), Ownership::Allocated);
        assert_eq!(buf.as_slice(), &[3, 4, 5, 0, 0]);
        buf.as_mut_slice()[0] = 9;
        assert_eq!(data, [3, 4, 5]);
    }

    #[test]
    fn test_buffer_adopt_libc_block() {
        let mut buf = OwnedBuffer::<u32>::new();
        unsafe {
            let ptr = libc::malloc(4 * std::mem::size_of::<u32>()).cast::<u32>();
            let ptr = NonNull::new(ptr).expect("malloc");
            for i in 0..4 {
                ptr.as_ptr().add(i).write(i as u32 * 10);
            }
            buf.adopt(ptr, 4, Retention::Buffer, DeletionMethod::LibcFree)
                .unwrap();
        }
        assert_eq!(buf.as_slice(), &[0, 10, 20, 30]);
        buf.reallocate(2).unwrap();
        assert_eq!(buf.as_slice(), &[0, 10]);
        assert_eq!(buf.ownership(), Ownership::Allocated);
    }

    #[test]
    fn test_buffer_from_vec() {
        let buf = OwnedBuffer::from(vec![1.0f64, 2.0]);
        assert_eq!(buf.ownership(), Ownership::External);
        assert!(matches!(buf.deletion_method(), DeletionMethod::Global));
        assert_eq!(buf.as_slice(), &[1.0, 2.0]);

        let empty = OwnedBuffer::from(Vec::<f64>::new());
        assert_eq!(empty.capacity(), 0);
        assert_eq!(empty.ownership(), Ownership::Allocated);
    }

    #[test]
    fn test_buffer_debug_format() {
        let buf = OwnedBuffer::<i8>::with_capacity(2).unwrap();
        let s = format!("{buf:?}");
        assert!(s.contains("OwnedBuffer"));
        assert!(s.contains("capacity: 2"));
        assert!(s.contains("Allocated"));
    }

    #[test]
    fn test_buffer_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OwnedBuffer<f32>>();
    }
}
