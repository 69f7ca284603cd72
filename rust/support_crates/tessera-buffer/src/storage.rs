//! `Storage`: the narrow memory-management interface a container needs from its
//! backing buffer.

use std::ptr::NonNull;

use tessera_common::Result;

use crate::ownership::{DeletionMethod, Ownership, Retention};

/// Backing store for a typed container.
///
/// A container drives its storage exclusively through this trait: it never reaches
/// into the buffer's ownership bookkeeping directly. Any mutating call may move the
/// block, so pointers obtained from [`as_ptr`](Storage::as_ptr) or
/// [`as_mut_ptr`](Storage::as_mut_ptr) are valid only until the next mutating call.
///
/// Every fallible operation leaves the storage unchanged when it returns `Err`.
pub trait Storage<T>: Default {
    /// Number of elements the current block can hold.
    fn capacity(&self) -> usize;

    /// Who is responsible for releasing the current block.
    fn ownership(&self) -> Ownership;

    /// Replaces the current block with a fresh, exclusively owned block of
    /// `capacity` elements. Contents are not preserved.
    fn allocate(&mut self, capacity: usize) -> Result<()>;

    /// Changes the capacity to exactly `capacity`, preserving the elements below
    /// `min(old capacity, capacity)`. Fails on a borrowed block.
    fn reallocate(&mut self, capacity: usize) -> Result<()>;

    /// Copies the first `min(old capacity, capacity)` elements into a fresh owned
    /// block of `capacity` elements and lets go of the current block according to
    /// its ownership. This is the only way to grow or shrink a borrowed block.
    fn detach(&mut self, capacity: usize) -> Result<()>;

    /// Takes over `ptr` as the backing store for `len` elements, releasing the
    /// previously held block first.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `len` initialized elements that stay valid for as long
    /// as the storage holds them. With [`Retention::Buffer`], the block must be
    /// releasable through `deletion` and no one else may release it.
    unsafe fn adopt(
        &mut self,
        ptr: NonNull<T>,
        len: usize,
        retention: Retention,
        deletion: DeletionMethod<T>,
    ) -> Result<()>;

    /// Lets go of the current block according to its ownership and leaves the
    /// storage empty. Idempotent.
    fn release(&mut self);

    /// Pointer to the first element. Non-null and aligned even when the capacity
    /// is zero.
    fn as_ptr(&self) -> *const T;

    fn as_mut_ptr(&mut self) -> *mut T;
}
