//! Fast-polling spin lock for Keel registries.
//!
//! Registry scans are short (a handful of slots), and they must be callable
//! where blocking syscalls are unsafe: early startup, or from inside an
//! allocator's own error path. [`FastPollingMutex`] busy-polls an atomic
//! flag instead of parking the thread, optionally sleeping between polls,
//! and gives up when a [`Timeout`](keel_core::Timeout) expires.
//!
//! This crate contains the workspace's only lock-internal `unsafe`, confined
//! to `spin.rs`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod spin;

pub use config::PollConfig;
pub use spin::{FastPollingMutex, FastPollingMutexGuard};
