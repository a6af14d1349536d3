//! The process-wide default heap over the global allocator.

#![allow(unsafe_code)]

use std::alloc::{alloc, dealloc, realloc};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

use crate::block;
use crate::heap::Heap;

/// Name reported by [`StandardHeap`].
pub const STANDARD_HEAP_NAME: &str = "Standard";

/// The default heap, backed by the Rust global allocator.
///
/// Its address range is not known up front: `first_address` and
/// `last_address` widen to cover every block ever handed out, so until the
/// first allocation the range is empty and `owns` is false everywhere.
#[derive(Debug)]
pub struct StandardHeap {
    first: AtomicUsize,
    last: AtomicUsize,
    live_blocks: AtomicUsize,
}

impl StandardHeap {
    /// A standard heap that has not handed out any block yet.
    pub const fn new() -> Self {
        Self {
            first: AtomicUsize::new(usize::MAX),
            last: AtomicUsize::new(0),
            live_blocks: AtomicUsize::new(0),
        }
    }

    /// Blocks currently allocated and not yet freed.
    pub fn live_blocks(&self) -> usize {
        self.live_blocks.load(Ordering::Relaxed)
    }

    fn track(&self, ptr: *mut u8, size: usize) {
        let start = ptr as usize;
        let end = start + size.saturating_sub(1);
        self.first.fetch_min(start, Ordering::Relaxed);
        self.last.fetch_max(end, Ordering::Relaxed);
    }
}

impl Default for StandardHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap for StandardHeap {
    fn malloc(&self, size: usize) -> *mut u8 {
        let Some(layout) = block::layout_for(size) else {
            return ptr::null_mut();
        };
        // SAFETY: `layout` is never zero-sized since it includes the header.
        let base = unsafe { alloc(layout) };
        if base.is_null() {
            return ptr::null_mut();
        }
        // SAFETY: `base` is a fresh, ALIGN-aligned block of HEADER + size bytes.
        let user = unsafe { block::seal(base, size) };
        self.track(user, size);
        self.live_blocks.fetch_add(1, Ordering::Relaxed);
        trace!(target: "keel::heap", size, "standard malloc");
        user
    }

    unsafe fn free(&self, ptr: &mut *mut u8) {
        if ptr.is_null() {
            return;
        }
        // SAFETY: the caller guarantees `*ptr` came from this heap.
        unsafe {
            let (base, size) = block::open(*ptr);
            if let Some(layout) = block::layout_for(size) {
                dealloc(base, layout);
            }
        }
        self.live_blocks.fetch_sub(1, Ordering::Relaxed);
        *ptr = ptr::null_mut();
    }

    unsafe fn realloc(&self, ptr: &mut *mut u8, new_size: usize) -> *mut u8 {
        if ptr.is_null() {
            let fresh = self.malloc(new_size);
            *ptr = fresh;
            return fresh;
        }
        if new_size == 0 {
            // SAFETY: forwarded from the caller.
            unsafe { self.free(ptr) };
            return ptr::null_mut();
        }
        let Some(new_layout) = block::layout_for(new_size) else {
            return ptr::null_mut();
        };
        // SAFETY: the caller guarantees `*ptr` came from this heap, so the
        // header is intact and the old layout can be rebuilt from it.
        unsafe {
            let (base, size) = block::open(*ptr);
            let Some(old_layout) = block::layout_for(size) else {
                return ptr::null_mut();
            };
            let moved = realloc(base, old_layout, new_layout.size());
            if moved.is_null() {
                return ptr::null_mut();
            }
            let user = block::seal(moved, new_size);
            self.track(user, new_size);
            *ptr = user;
            user
        }
    }

    fn first_address(&self) -> usize {
        self.first.load(Ordering::Relaxed)
    }

    fn last_address(&self) -> usize {
        self.last.load(Ordering::Relaxed)
    }

    fn name(&self) -> &str {
        STANDARD_HEAP_NAME
    }
}
