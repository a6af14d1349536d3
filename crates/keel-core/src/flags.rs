//! Composable error flags.
//!
//! [`ErrorFlags`] is a bit set that any Keel error converts into. Callers
//! that aggregate several outcomes (a teardown pass, a batch of frees)
//! OR the flags together and inspect the union once.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::error::{IndexError, RegistryError, StartupError, SyncError};

/// A set of error conditions. The empty set means success.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ErrorFlags(u32);

impl ErrorFlags {
    /// No error.
    pub const NONE: Self = Self(0);
    /// Slot or handle out of range, or a saturated structure.
    pub const OUT_OF_RANGE: Self = Self(1 << 0);
    /// An allocation failed.
    pub const OUT_OF_MEMORY: Self = Self(1 << 1);
    /// Contract violation or broken internal invariant.
    pub const FATAL_ERROR: Self = Self(1 << 2);
    /// Startup dependency cycle or inconsistent startup graph.
    pub const INTERNAL_SETUP_ERROR: Self = Self(1 << 3);
    /// An initialisation or finish hook failed.
    pub const INITIALISATION_ERROR: Self = Self(1 << 4);
    /// A bounded wait expired.
    pub const TIMEOUT: Self = Self(1 << 5);

    /// Raw bit representation.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether no flag is set.
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Whether every flag in `other` is also set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ErrorFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ErrorFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ErrorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ErrorFlags, &str); 6] = [
            (ErrorFlags::OUT_OF_RANGE, "out_of_range"),
            (ErrorFlags::OUT_OF_MEMORY, "out_of_memory"),
            (ErrorFlags::FATAL_ERROR, "fatal_error"),
            (ErrorFlags::INTERNAL_SETUP_ERROR, "internal_setup_error"),
            (ErrorFlags::INITIALISATION_ERROR, "initialisation_error"),
            (ErrorFlags::TIMEOUT, "timeout"),
        ];
        if self.is_ok() {
            return write!(f, "no_error");
        }
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl From<IndexError> for ErrorFlags {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::OutOfRange => Self::OUT_OF_RANGE,
            IndexError::OutOfMemory => Self::OUT_OF_MEMORY,
            IndexError::FatalError => Self::FATAL_ERROR,
        }
    }
}

impl From<SyncError> for ErrorFlags {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Timeout { .. } => Self::TIMEOUT,
        }
    }
}

impl From<&StartupError> for ErrorFlags {
    fn from(e: &StartupError) -> Self {
        match e {
            StartupError::InternalSetupError { .. }
            | StartupError::UnknownDependency { .. }
            | StartupError::DuplicateEntry { .. } => Self::INTERNAL_SETUP_ERROR,
            StartupError::InitialisationError { .. } | StartupError::FinishError { .. } => {
                Self::INITIALISATION_ERROR
            }
        }
    }
}

impl From<&RegistryError> for ErrorFlags {
    fn from(e: &RegistryError) -> Self {
        match e {
            RegistryError::Full { .. } => Self::OUT_OF_RANGE,
            RegistryError::NameInUse { .. } => Self::FATAL_ERROR,
        }
    }
}
