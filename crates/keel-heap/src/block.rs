//! Size-prefixed block layout shared by the built-in heaps.
//!
//! ```text
//!  base                      user pointer
//!   │                           │
//!   ▼                           ▼
//!   [ size: usize | padding ]   [ size bytes ... ]
//!   ◄──────── HEADER ────────►
//! ```

#![allow(unsafe_code)]

use std::alloc::Layout;

/// Alignment of every block handed out.
pub(crate) const ALIGN: usize = 16;

/// Bytes reserved in front of each block for its size.
pub(crate) const HEADER: usize = 16;

/// Layout of a whole block (header included) for a `size`-byte payload.
pub(crate) fn layout_for(size: usize) -> Option<Layout> {
    let total = size.checked_add(HEADER)?;
    Layout::from_size_align(total, ALIGN).ok()
}

/// Round `n` up to the next multiple of [`ALIGN`].
pub(crate) fn align_up(n: usize) -> Option<usize> {
    Some(n.checked_add(ALIGN - 1)? & !(ALIGN - 1))
}

/// Write the size header at `base` and return the user pointer.
///
/// # Safety
///
/// `base` must be valid for writes of `HEADER` bytes and aligned to
/// [`ALIGN`].
pub(crate) unsafe fn seal(base: *mut u8, size: usize) -> *mut u8 {
    // SAFETY: caller guarantees `base` is writable and aligned for usize.
    unsafe {
        base.cast::<usize>().write(size);
        base.add(HEADER)
    }
}

/// Recover the block base and payload size from a user pointer.
///
/// # Safety
///
/// `ptr` must have been returned by [`seal`] and not yet released.
pub(crate) unsafe fn open(ptr: *mut u8) -> (*mut u8, usize) {
    // SAFETY: `seal` placed the header exactly HEADER bytes before `ptr`.
    unsafe {
        let base = ptr.sub(HEADER);
        (base, base.cast::<usize>().read())
    }
}

/// Length of the zero-terminated byte string at `ptr`, terminator included.
///
/// # Safety
///
/// `ptr` must point to readable memory containing a zero byte.
pub(crate) unsafe fn terminated_len(ptr: *const u8) -> usize {
    let mut n = 0;
    // SAFETY: caller guarantees a terminator before the end of the object.
    unsafe {
        while *ptr.add(n) != 0 {
            n += 1;
        }
    }
    n + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_block_alignment() {
        assert_eq!(align_up(0), Some(0));
        assert_eq!(align_up(1), Some(16));
        assert_eq!(align_up(16), Some(16));
        assert_eq!(align_up(17), Some(32));
        assert_eq!(align_up(usize::MAX), None);
    }

    #[test]
    fn layout_includes_header() {
        let layout = layout_for(10).unwrap();
        assert_eq!(layout.size(), 26);
        assert_eq!(layout.align(), ALIGN);
        assert!(layout_for(usize::MAX).is_none());
    }

    #[test]
    fn terminated_len_counts_terminator() {
        let s = b"abc\0def";
        assert_eq!(unsafe { terminated_len(s.as_ptr()) }, 4);
    }
}
