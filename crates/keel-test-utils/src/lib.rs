//! Test utilities and mock types for Keel development.
//!
//! Provides [`FixedRangeHeap`], a [`Heap`] that claims an arbitrary
//! address range without owning any memory, for exercising heap
//! resolution, plus the payload and startup fixtures in [`fixtures`].

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use keel_heap::Heap;

/// A heap that claims `[first, last]` but never hands out memory.
///
/// `malloc` and `realloc` always fail. `free` only counts the call and
/// clears the pointer, so it is safe to route any address to it.
#[derive(Debug)]
pub struct FixedRangeHeap {
    name: String,
    first: usize,
    last: usize,
    frees: AtomicUsize,
}

impl FixedRangeHeap {
    pub fn new(name: impl Into<String>, first: usize, last: usize) -> Self {
        Self {
            name: name.into(),
            first,
            last,
            frees: AtomicUsize::new(0),
        }
    }

    /// Convenience: build and erase to `Arc<dyn Heap>`.
    pub fn shared(name: impl Into<String>, first: usize, last: usize) -> Arc<dyn Heap> {
        Arc::new(Self::new(name, first, last))
    }

    /// Number of `free` calls routed here.
    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::Relaxed)
    }
}

impl Heap for FixedRangeHeap {
    fn malloc(&self, _size: usize) -> *mut u8 {
        ptr::null_mut()
    }

    unsafe fn free(&self, ptr: &mut *mut u8) {
        self.frees.fetch_add(1, Ordering::Relaxed);
        *ptr = ptr::null_mut();
    }

    unsafe fn realloc(&self, _ptr: &mut *mut u8, _new_size: usize) -> *mut u8 {
        ptr::null_mut()
    }

    fn first_address(&self) -> usize {
        self.first
    }

    fn last_address(&self) -> usize {
        self.last
    }

    fn name(&self) -> &str {
        &self.name
    }
}
