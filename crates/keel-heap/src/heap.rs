//! The heap capability trait.

#![allow(unsafe_code)]

use std::ptr;

use crate::block;

/// A source of raw memory blocks with a known address range.
///
/// Pointers are raw and nullable: a null return means the request failed.
/// Operations that dereference or release a caller-supplied pointer are
/// `unsafe` because the heap cannot verify the pointer's provenance.
///
/// Implementations are shared between threads through `Arc<dyn Heap>`, so
/// they synchronise their own state.
pub trait Heap: Send + Sync {
    /// Allocate `size` bytes. Returns null on failure.
    fn malloc(&self, size: usize) -> *mut u8;

    /// Release the block at `*ptr` and clear `*ptr` to null. A null `*ptr`
    /// is a no-op.
    ///
    /// # Safety
    ///
    /// A non-null `*ptr` must have been returned by this heap's `malloc`,
    /// `realloc` or `duplicate` and not freed since.
    unsafe fn free(&self, ptr: &mut *mut u8);

    /// Resize the block at `*ptr` to `new_size` bytes, preserving the
    /// common prefix of its contents.
    ///
    /// On success `*ptr` is updated and the new pointer returned. On failure
    /// null is returned and `*ptr` still owns the original block. A null
    /// `*ptr` behaves like `malloc`; `new_size == 0` frees the block.
    ///
    /// # Safety
    ///
    /// Same contract as [`free`](Self::free).
    unsafe fn realloc(&self, ptr: &mut *mut u8, new_size: usize) -> *mut u8;

    /// Copy `size` bytes from `data` into a fresh block of this heap.
    ///
    /// With `size == 0`, `data` is treated as a zero-terminated string and
    /// copied up to and including the terminator.
    ///
    /// # Safety
    ///
    /// `data` must be readable for `size` bytes, or up to its terminator
    /// when `size == 0`.
    unsafe fn duplicate(&self, data: *const u8, size: usize) -> *mut u8 {
        if data.is_null() {
            return ptr::null_mut();
        }
        // SAFETY: forwarded from the caller.
        let len = if size == 0 {
            unsafe { block::terminated_len(data) }
        } else {
            size
        };
        let copy = self.malloc(len);
        if !copy.is_null() {
            // SAFETY: `copy` is a fresh block of `len` bytes and cannot
            // overlap `data`.
            unsafe { ptr::copy_nonoverlapping(data, copy, len) };
        }
        copy
    }

    /// Lowest address managed by this heap.
    fn first_address(&self) -> usize;

    /// Highest address managed by this heap (inclusive).
    fn last_address(&self) -> usize;

    /// Whether `address` lies within `[first_address, last_address]`.
    fn owns(&self, address: usize) -> bool {
        address >= self.first_address() && address <= self.last_address()
    }

    /// Name of this heap, used for lookup by name.
    fn name(&self) -> &str;
}

/// Span of a heap's address range, used to prefer inner heaps.
pub(crate) fn span(heap: &dyn Heap) -> usize {
    heap.last_address().wrapping_sub(heap.first_address())
}
