//! Keel: a bare-metal foundation layer of sparse handle tables, heap
//! selection, a class registry, and ordered subsystem startup.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Keel sub-crates. For most users, adding `keel` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use keel::prelude::*;
//!
//! keel::logging::init();
//! let mut startup = keel::bootstrap().unwrap();
//!
//! // Sparse handle table: fan-out 4, depth 2, 16 slots.
//! let mut table: MultiLevelIndex<&str> = MultiLevelIndex::with_levels(2, 2).unwrap();
//! let h = table.store("sensor").unwrap();
//! assert_eq!(table.read(h), Some(&"sensor"));
//!
//! // Allocate from the standard heap and route the pointer back.
//! let mut p = keel::heap::manager::malloc(64, None);
//! assert!(!p.is_null());
//! assert!(unsafe { keel::heap::manager::free(&mut p) });
//!
//! assert_eq!(keel::shutdown(&mut startup), ErrorFlags::NONE);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `keel-core` | Error enums, `ErrorFlags`, `Handle`, `Timeout` |
//! | [`sync`] | `keel-sync` | `FastPollingMutex` |
//! | [`startup`] | `keel-startup` | `StartupManager`, `StartupEntry`, `FnEntry` |
//! | [`heap`] | `keel-heap` | Heaps, heap database and manager, `StaticListHolder` |
//! | [`index`] | `keel-index` | `MultiLevelIndex` and its fixed-fan-out wrapper |
//! | [`registry`] | `keel-registry` | Class descriptors and the process-wide registry |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod bootstrap;
pub mod logging;

pub use bootstrap::{bootstrap, bootstrap_with, shutdown, startup_manager};

/// Error types, error flags, handle widths, and timeouts (`keel-core`).
pub use keel_core as types;

/// Fast-polling spin lock (`keel-sync`).
pub use keel_sync as sync;

/// Dependency-ordered initialisation and teardown (`keel-startup`).
pub use keel_startup as startup;

/// Heaps, heap selection, and growable fixed-element lists (`keel-heap`).
///
/// The process-wide allocation entry points live in
/// [`heap::manager`].
pub use keel_heap as heap;

/// Multi-level sparse handle index (`keel-index`).
pub use keel_index as index;

/// Class descriptors and the process-wide class registry
/// (`keel-registry`).
pub use keel_registry as registry;

/// Common imports for typical Keel usage.
///
/// ```rust
/// use keel::prelude::*;
/// ```
pub mod prelude {
    // Core
    pub use keel_core::{
        ConfigError, ErrorFlags, Handle, IndexError, RegistryError, StartupError, SyncError,
        Timeout,
    };

    // Sync
    pub use keel_sync::{FastPollingMutex, PollConfig};

    // Startup
    pub use keel_startup::{FnEntry, HookResult, StartupEntry, StartupManager};

    // Heaps
    pub use keel_heap::{
        Heap, HeapDatabase, HeapManager, ListConfig, RegionHeap, StandardHeap, StaticListHolder,
    };

    // Index
    pub use keel_index::{FixedMultiLevelIndex, IndexConfig, MultiLevelIndex};

    // Registry
    pub use keel_registry::{ClassHandle, ClassRegistryIndex, ClassRegistryItem};
}
