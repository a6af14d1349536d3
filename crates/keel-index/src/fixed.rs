//! Compile-time fan-out variant of the multi-level index.

use std::ops::Deref;

use keel_core::{ConfigError, Handle, IndexError};

use crate::config::IndexConfig;
use crate::index::MultiLevelIndex;

/// A [`MultiLevelIndex`] whose bits per level are fixed at compile time.
///
/// `BITS` outside `1..=6` fails to compile:
///
/// ```compile_fail
/// let _ = keel_index::FixedMultiLevelIndex::<u8, 7>::new(1);
/// ```
///
/// Read-only accessors are available through `Deref`.
#[derive(Debug)]
pub struct FixedMultiLevelIndex<T, const BITS: u8, H: Handle = u32> {
    inner: MultiLevelIndex<T, H>,
}

impl<T, const BITS: u8, H: Handle> FixedMultiLevelIndex<T, BITS, H> {
    const BITS_IN_RANGE: () = assert!(
        BITS >= 1 && BITS <= IndexConfig::MAX_LEVEL_SIZE_BITS,
        "level size bits must be in 1..=6"
    );

    /// Fan-out of every node.
    pub const FAN_OUT: u32 = 1 << BITS;

    /// An empty index `depth` levels deep.
    pub fn new(depth: u8) -> Result<Self, ConfigError> {
        let () = Self::BITS_IN_RANGE;
        Ok(Self {
            inner: MultiLevelIndex::new(IndexConfig::new(depth, BITS))?,
        })
    }

    /// See [`MultiLevelIndex::store`].
    pub fn store(&mut self, data: T) -> Result<H, IndexError> {
        self.inner.store(data)
    }

    /// See [`MultiLevelIndex::read_mut`].
    pub fn read_mut(&mut self, handle: H) -> Option<&mut T> {
        self.inner.read_mut(handle)
    }

    /// See [`MultiLevelIndex::free_index`].
    pub fn free_index(&mut self, handle: H) -> Result<T, IndexError> {
        self.inner.free_index(handle)
    }

    /// Unwrap into the dynamic index.
    pub fn into_inner(self) -> MultiLevelIndex<T, H> {
        self.inner
    }
}

impl<T, const BITS: u8, H: Handle> Deref for FixedMultiLevelIndex<T, BITS, H> {
    type Target = MultiLevelIndex<T, H>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
