//! Class registry for Keel.
//!
//! Every registered class gets a [`ClassRegistryItem`] and a stable
//! [`ClassHandle`] from the two-level [`ClassRegistryIndex`]: up to 256
//! cells of 256 entries, handle `(cell << 8) | slot`. The process-wide
//! registry is reached through [`ClassRegistryIndex::instance`] and brought
//! up and cleared by its startup entry.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod global;
pub mod index;
pub mod item;

pub use global::{find_class, register_class, STARTUP_ENTRY};
pub use index::{ClassHandle, ClassRegistryIndex, CELL_SIZE, INVALID_HANDLE, MAX_CELLS};
pub use item::ClassRegistryItem;
