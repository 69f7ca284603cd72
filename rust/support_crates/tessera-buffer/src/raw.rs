//! Fallible, zero-initializing allocation of typed element blocks on top of the
//! global allocator.
//!
//! All blocks produced here use `Layout::array::<T>(elements)`, so they can be
//! released with [`deallocate`] or adopted with [`DeletionMethod::Global`](crate::DeletionMethod::Global).
//! A request for zero elements yields a dangling pointer and no allocation.

use std::{alloc::Layout, ptr::NonNull};

use tessera_common::{Result, error::Error};

/// Allocates a block of `elements` values of type `T`, all bytes set to zero.
pub fn allocate_zeroed<T>(elements: usize) -> Result<NonNull<T>> {
    const { assert!(std::mem::size_of::<T>() != 0) };
    if elements == 0 {
        return Ok(NonNull::dangling());
    }
    let layout = layout_for::<T>(elements)?;
    let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
    NonNull::new(ptr.cast::<T>()).ok_or_else(|| allocation_failed(elements, layout.size()))
}

/// Resizes a block previously obtained from [`allocate_zeroed`], preserving the
/// first `min(old_elements, new_elements)` values and zeroing any new tail.
///
/// On failure the original block is left untouched and still owned by the caller.
///
/// # Safety
///
/// `ptr` must come from this module with exactly `old_elements` elements and must
/// not be used after a successful call.
pub unsafe fn reallocate_zeroed<T>(
    ptr: NonNull<T>,
    old_elements: usize,
    new_elements: usize,
) -> Result<NonNull<T>> {
    if old_elements == 0 {
        return allocate_zeroed(new_elements);
    }
    if new_elements == 0 {
        unsafe { deallocate(ptr, old_elements) };
        return Ok(NonNull::dangling());
    }
    let old_layout = layout_for::<T>(old_elements)?;
    let new_layout = layout_for::<T>(new_elements)?;
    let raw = unsafe { std::alloc::realloc(ptr.as_ptr().cast(), old_layout, new_layout.size()) };
    let new_ptr = NonNull::new(raw.cast::<T>())
        .ok_or_else(|| allocation_failed(new_elements, new_layout.size()))?;
    if new_elements > old_elements {
        unsafe {
            new_ptr
                .as_ptr()
                .add(old_elements)
                .write_bytes(0, new_elements - old_elements);
        }
    }
    Ok(new_ptr)
}

/// Releases a block obtained from [`allocate_zeroed`] (or an equivalent
/// `Box<[T]>` of `elements` values).
///
/// # Safety
///
/// `ptr` must denote a live global-allocator block laid out as
/// `Layout::array::<T>(elements)`.
pub unsafe fn deallocate<T>(ptr: NonNull<T>, elements: usize) {
    if elements == 0 {
        return;
    }
    if let Ok(layout) = Layout::array::<T>(elements) {
        unsafe { std::alloc::dealloc(ptr.as_ptr().cast(), layout) };
    }
}

fn layout_for<T>(elements: usize) -> Result<Layout> {
    Layout::array::<T>(elements).map_err(|_| {
        allocation_failed(
            elements,
            elements.saturating_mul(std::mem::size_of::<T>()),
        )
    })
}

#[cold]
fn allocation_failed(elements: usize, bytes: usize) -> Error {
    log::warn!("allocation of {elements} elements ({bytes} bytes) failed");
    Error::allocation_failure(elements, bytes)
}
