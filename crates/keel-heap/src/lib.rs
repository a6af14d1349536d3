//! Heap abstraction and heap registry for Keel.
//!
//! A [`Heap`] hands out raw blocks and reports the address range it
//! manages. [`HeapManager`] keeps a bounded [`HeapDatabase`] of registered
//! heaps and routes every `free`/`realloc` to the heap that owns the
//! pointer, preferring the innermost heap when ranges nest:
//!
//! ```text
//!   StandardHeap  [first ................................. last]
//!   RegionHeap "pool"        [first ............. last]
//!   RegionHeap "scratch"          [first .. last]
//!                                      ▲
//!                 find_heap_by_address(p) → "scratch" (smallest span)
//! ```
//!
//! [`StaticListHolder`] is a growable list of fixed-size byte elements
//! whose storage is a single block obtained from any [`Heap`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

mod block;
pub mod database;
pub mod heap;
pub mod list;
pub mod manager;
pub mod region;
pub mod standard;

pub use database::{HeapDatabase, MAX_HEAPS};
pub use heap::Heap;
pub use list::{ListConfig, StaticListHolder};
pub use manager::HeapManager;
pub use region::RegionHeap;
pub use standard::StandardHeap;
