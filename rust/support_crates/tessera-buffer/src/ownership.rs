//! Ownership bookkeeping for [`OwnedBuffer`](crate::OwnedBuffer).

use std::{ptr::NonNull, sync::Arc};

/// Who is responsible for releasing the block currently held by a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// The block was allocated by the buffer itself through the global allocator.
    Allocated,
    /// The block was supplied by a caller and handed over to the buffer, which
    /// releases it through the recorded [`DeletionMethod`].
    External,
    /// The block was supplied by a caller who keeps responsibility for it.
    /// The buffer never releases it.
    Borrowed,
}

impl Ownership {
    /// Returns `true` if the buffer must release the block when it is dropped
    /// or replaced.
    #[inline]
    pub fn is_owned(self) -> bool {
        !matches!(self, Ownership::Borrowed)
    }
}

/// Retention flag passed along with an adopted block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Retention {
    /// The caller keeps the block alive and frees it; the buffer only borrows it.
    Caller,
    /// Responsibility for the block moves to the buffer.
    Buffer,
}

impl Retention {
    pub fn ownership(self) -> Ownership {
        match self {
            Retention::Caller => Ownership::Borrowed,
            Retention::Buffer => Ownership::External,
        }
    }
}

/// A caller-supplied release routine, invoked with the block's start and its
/// capacity in elements.
pub type Deleter<T> = Arc<dyn Fn(NonNull<T>, usize) + Send + Sync + 'static>;

/// How an adopted block must be released.
pub enum DeletionMethod<T> {
    /// Return the block to the Rust global allocator using
    /// `Layout::array::<T>(capacity)`. This matches blocks produced by
    /// `Box<[T]>` and by [`raw::allocate_zeroed`](crate::raw::allocate_zeroed).
    Global,
    /// Release the block with `libc::free`; the block came from `malloc`.
    LibcFree,
    /// Release the block with a caller-supplied routine.
    Custom(Deleter<T>),
}

impl<T> DeletionMethod<T> {
    pub fn custom<F>(deleter: F) -> DeletionMethod<T>
    where
        F: Fn(NonNull<T>, usize) + Send + Sync + 'static,
    {
        DeletionMethod::Custom(Arc::new(deleter))
    }

    /// Releases `ptr` according to this method.
    ///
    /// # Safety
    ///
    /// `ptr` must denote a live block of `capacity` elements obtained in a way that
    /// is compatible with this method, and it must not be used afterwards.
    pub(crate) unsafe fn delete(&self, ptr: NonNull<T>, capacity: usize) {
        match self {
            DeletionMethod::Global => unsafe { crate::raw::deallocate(ptr, capacity) },
            DeletionMethod::LibcFree => unsafe { libc::free(ptr.as_ptr().cast()) },
            DeletionMethod::Custom(deleter) => deleter(ptr, capacity),
        }
    }
}

impl<T> Clone for DeletionMethod<T> {
    fn clone(&self) -> Self {
        match self {
            DeletionMethod::Global => DeletionMethod::Global,
            DeletionMethod::LibcFree => DeletionMethod::LibcFree,
            DeletionMethod::Custom(deleter) => DeletionMethod::Custom(deleter.clone()),
        }
    }
}

impl<T> std::fmt::Debug for DeletionMethod<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeletionMethod::Global => f.write_str("Global"),
            DeletionMethod::LibcFree => f.write_str("LibcFree"),
            DeletionMethod::Custom(_) => f.write_str("Custom"),
        }
    }
}
