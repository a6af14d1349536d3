//! A named bump heap over one fixed region.

#![allow(unsafe_code)]

use std::alloc::{alloc, dealloc, Layout};
use std::fmt;
use std::ptr::{self, NonNull};

use keel_sync::FastPollingMutex;
use tracing::trace;

use crate::block;
use crate::heap::Heap;

#[derive(Debug, Default)]
struct Cursor {
    /// Offset of the next free byte.
    next: usize,
    /// Offset of the most recent block's header, if still live.
    last_block: Option<usize>,
    live_blocks: usize,
}

/// A bump allocator over a single region acquired at construction.
///
/// Blocks are carved off the front of the region. Freeing the most recent
/// block rolls the cursor back; any other free only decrements the live
/// count, and its space returns at [`reset`](Self::reset). The address
/// range is the whole region, so a `RegionHeap` carved inside another
/// heap's range is found first by address lookup.
pub struct RegionHeap {
    name: String,
    base: NonNull<u8>,
    layout: Layout,
    cursor: FastPollingMutex<Cursor>,
}

// SAFETY: the region is owned exclusively by this heap and every cursor
// update happens under `cursor`'s lock.
unsafe impl Send for RegionHeap {}
// SAFETY: as above; `base` is never written through except for block
// headers inside blocks the lock has just reserved.
unsafe impl Sync for RegionHeap {}

impl RegionHeap {
    /// Acquire a region of `capacity` bytes. Returns `None` if `capacity`
    /// is zero or the allocation fails.
    pub fn new(name: impl Into<String>, capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        let layout = Layout::from_size_align(block::align_up(capacity)?, block::ALIGN).ok()?;
        // SAFETY: `layout` has non-zero size.
        let base = NonNull::new(unsafe { alloc(layout) })?;
        Some(Self {
            name: name.into(),
            base,
            layout,
            cursor: FastPollingMutex::new(Cursor::default()),
        })
    }

    /// Total bytes in the region.
    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    /// Bytes consumed by blocks and their headers.
    pub fn used(&self) -> usize {
        self.cursor.lock().next
    }

    /// Blocks handed out and not yet freed.
    pub fn live_blocks(&self) -> usize {
        self.cursor.lock().live_blocks
    }

    /// Rewind the region to empty.
    ///
    /// # Safety
    ///
    /// No block handed out before the reset may be used or freed afterwards.
    pub unsafe fn reset(&self) {
        *self.cursor.lock() = Cursor::default();
    }

    fn offset_of(&self, ptr: *mut u8) -> usize {
        ptr as usize - self.base.as_ptr() as usize
    }

    /// Reserve a block for `size` payload bytes and return its header
    /// offset.
    fn reserve(&self, size: usize) -> Option<usize> {
        let total = block::align_up(size.checked_add(block::HEADER)?)?;
        let mut cursor = self.cursor.lock();
        let start = cursor.next;
        let end = start.checked_add(total)?;
        if end > self.capacity() {
            return None;
        }
        cursor.next = end;
        cursor.last_block = Some(start);
        cursor.live_blocks += 1;
        Some(start)
    }
}

impl Heap for RegionHeap {
    fn malloc(&self, size: usize) -> *mut u8 {
        match self.reserve(size) {
            Some(offset) => {
                trace!(target: "keel::heap", heap = %self.name, size, offset, "region malloc");
                // SAFETY: `reserve` handed this thread exclusive use of
                // [offset, offset + HEADER + size) inside the region, and
                // offsets are ALIGN multiples.
                unsafe { block::seal(self.base.as_ptr().add(offset), size) }
            }
            None => ptr::null_mut(),
        }
    }

    unsafe fn free(&self, ptr: &mut *mut u8) {
        if ptr.is_null() || !self.owns(*ptr as usize) {
            return;
        }
        // SAFETY: the caller guarantees `*ptr` is a live block of this heap.
        let (base, _) = unsafe { block::open(*ptr) };
        let offset = self.offset_of(base);
        let mut cursor = self.cursor.lock();
        if cursor.last_block == Some(offset) {
            cursor.next = offset;
            cursor.last_block = None;
        }
        cursor.live_blocks = cursor.live_blocks.saturating_sub(1);
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
        // SAFETY: the caller guarantees `*ptr` is a live block of this heap.
        let (base, old_size) = unsafe { block::open(*ptr) };
        let offset = self.offset_of(base);

        {
            let mut cursor = self.cursor.lock();
            if cursor.last_block == Some(offset) {
                let end = new_size
                    .checked_add(block::HEADER)
                    .and_then(block::align_up)
                    .and_then(|total| offset.checked_add(total));
                if let Some(end) = end.filter(|&e| e <= self.capacity()) {
                    cursor.next = end;
                    // SAFETY: the block stays at `base`; only its header changes.
                    return unsafe {
                        let user = block::seal(base, new_size);
                        *ptr = user;
                        user
                    };
                }
            }
        }

        let fresh = self.malloc(new_size);
        if fresh.is_null() {
            return fresh;
        }
        // SAFETY: distinct live blocks never overlap.
        unsafe {
            ptr::copy_nonoverlapping(*ptr, fresh, old_size.min(new_size));
            self.free(ptr);
        }
        *ptr = fresh;
        fresh
    }

    fn first_address(&self) -> usize {
        self.base.as_ptr() as usize
    }

    fn last_address(&self) -> usize {
        self.first_address() + self.capacity() - 1
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for RegionHeap {
    fn drop(&mut self) {
        // SAFETY: `base` was allocated in `new` with exactly this layout.
        unsafe { dealloc(self.base.as_ptr(), self.layout) };
    }
}

impl fmt::Debug for RegionHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionHeap")
            .field("name", &self.name)
            .field("first_address", &format_args!("{:#x}", self.first_address()))
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
