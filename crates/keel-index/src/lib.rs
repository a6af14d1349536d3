//! Multi-level index allocator for Keel.
//!
//! [`MultiLevelIndex`] is a fixed fan-out trie that hands out dense integer
//! handles for stored payloads and reclaims them on free, in O(depth) time.
//! Each node tracks two occupancy bitmasks per slot: whether the slot is in
//! use and whether the subtree below it is full. Child nodes are created on
//! demand and released when they empty.
//!
//! ```text
//!  depth 2, level_size_bits 1 (fan-out 2)
//!
//!            root  in_use=11 full=01
//!           /    \
//!     leaf [A, B]  leaf [C, _]
//!
//!  handle = root digit · leaf digit  →  A=0b00 B=0b01 C=0b10
//! ```
//!
//! Structures are not internally synchronised; mutation takes `&mut self`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod fixed;
pub mod index;
pub mod masks;
mod node;

pub use config::IndexConfig;
pub use fixed::FixedMultiLevelIndex;
pub use index::MultiLevelIndex;
pub use masks::SlotMasks;
