//! Dependency-ordered startup and teardown for Keel subsystems.
//!
//! Subsystems (the heap manager, the class registry) contribute a
//! [`StartupEntry`]: a unique name, the tags it satisfies, the names or
//! tags it depends on, and `init`/`finish` hooks. [`StartupManager`] runs
//! every `init` after the inits it depends on, and runs `finish` in exact
//! reverse order of init completion.
//!
//! ```text
//! register(entries...)
//!     │
//! initialise() ── depth-first over dependencies
//!     │            in-progress flag  → InternalSetupError on a cycle
//!     │            completion        → startup order 0, 1, 2, ...
//!     │
//! terminate()  ── finish() by descending startup order
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod entry;
pub mod manager;

pub use entry::{FnEntry, HookResult, StartupEntry};
pub use manager::StartupManager;
