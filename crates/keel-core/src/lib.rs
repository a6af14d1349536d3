//! Core types and traits for the Keel systems foundation.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Keel workspace:
//! handle types, timeouts, error types, and composable error flags.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod flags;
pub mod handle;
pub mod timeout;

pub use error::{ConfigError, IndexError, RegistryError, StartupError, SyncError};
pub use flags::ErrorFlags;
pub use handle::Handle;
pub use timeout::Timeout;
