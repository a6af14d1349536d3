//! Error types for the Keel foundation.
//!
//! Organized by subsystem: handle indexing, synchronization, startup
//! ordering, class registration, and configuration validation. Heap
//! registry operations report plain `bool`/`Option` outcomes and have no
//! enum here.

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Errors from multi-level index operations (`store` / `free_index`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexError {
    /// No free slot at the level being filled, or a handle digit that
    /// does not address any slot.
    OutOfRange,
    /// A child node could not be allocated.
    OutOfMemory,
    /// The handle refers to a slot that is not in use. Indicates a stale
    /// or fabricated handle passed by the caller.
    FatalError,
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "index out of range or level saturated"),
            Self::OutOfMemory => write!(f, "index node allocation failed"),
            Self::FatalError => write!(f, "handle refers to an unused slot"),
        }
    }
}

impl Error for IndexError {}

/// Errors from the fast-polling spin lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncError {
    /// The lock was not acquired before the timeout expired.
    Timeout {
        /// How long the caller polled before giving up.
        waited: Duration,
    },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { waited } => {
                write!(f, "lock not acquired within {} us", waited.as_micros())
            }
        }
    }
}

impl Error for SyncError {}

/// Errors from the startup/teardown manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartupError {
    /// A dependency cycle was found: the entry was reached again while its
    /// own initialisation was still in progress.
    InternalSetupError {
        /// The entry whose initialisation was re-entered.
        entry: String,
    },
    /// An entry's `init` hook failed.
    InitialisationError {
        /// The failing entry.
        entry: String,
        /// Description supplied by the entry.
        reason: String,
    },
    /// A declared dependency matches no registered entry name or tag.
    UnknownDependency {
        /// The entry declaring the dependency.
        entry: String,
        /// The unmatched dependency.
        dependency: String,
    },
    /// Two entries were registered under the same name.
    DuplicateEntry {
        /// The contested name.
        name: String,
    },
    /// An entry's `finish` hook failed during teardown.
    FinishError {
        /// The failing entry.
        entry: String,
        /// Description supplied by the entry.
        reason: String,
    },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InternalSetupError { entry } => {
                write!(f, "dependency cycle detected at startup entry '{entry}'")
            }
            Self::InitialisationError { entry, reason } => {
                write!(f, "startup entry '{entry}' failed to initialise: {reason}")
            }
            Self::UnknownDependency { entry, dependency } => {
                write!(
                    f,
                    "startup entry '{entry}' depends on unknown '{dependency}'"
                )
            }
            Self::DuplicateEntry { name } => {
                write!(f, "startup entry '{name}' registered twice")
            }
            Self::FinishError { entry, reason } => {
                write!(f, "startup entry '{entry}' failed to finish: {reason}")
            }
        }
    }
}

impl Error for StartupError {}

/// Errors from the class registry index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Every cell of the registry is occupied.
    Full {
        /// Maximum number of registrations.
        capacity: u32,
    },
    /// A class with this name is already registered.
    NameInUse {
        /// The contested class name.
        name: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full { capacity } => {
                write!(f, "class registry full ({capacity} registrations)")
            }
            Self::NameInUse { name } => write!(f, "class '{name}' already registered"),
        }
    }
}

impl Error for RegistryError {}

/// A configuration parameter failed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric parameter is outside its permitted range.
    OutOfBounds {
        /// Name of the parameter.
        parameter: &'static str,
        /// The rejected value.
        value: u64,
        /// Smallest accepted value.
        min: u64,
        /// Largest accepted value.
        max: u64,
    },
    /// The handle type cannot represent every handle the structure can
    /// produce.
    HandleTooNarrow {
        /// Bits needed to encode the largest handle.
        required_bits: u32,
        /// Bits available in the handle type.
        available_bits: u32,
    },
    /// The structure's initial storage could not be allocated.
    OutOfMemory {
        /// What was being built.
        structure: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds {
                parameter,
                value,
                min,
                max,
            } => {
                write!(f, "{parameter} = {value} is outside [{min}, {max}]")
            }
            Self::HandleTooNarrow {
                required_bits,
                available_bits,
            } => {
                write!(
                    f,
                    "handle type has {available_bits} bits, {required_bits} required"
                )
            }
            Self::OutOfMemory { structure } => {
                write!(f, "initial allocation of {structure} failed")
            }
        }
    }
}

impl Error for ConfigError {}
