//! The multi-level index allocator.

use std::fmt;
use std::marker::PhantomData;

use keel_core::{ConfigError, Handle, IndexError};

use crate::config::IndexConfig;
use crate::masks::SlotMasks;
use crate::node::Node;

/// A fixed fan-out trie mapping dense handles of type `H` to payloads.
///
/// `store` always picks the lowest handle whose path has room, so handles
/// pack from zero in store order and a freed handle is the next one reused
/// when it is the lowest gap:
///
/// ```
/// use keel_index::MultiLevelIndex;
///
/// let mut index: MultiLevelIndex<&str, u8> = MultiLevelIndex::with_levels(2, 1).unwrap();
/// for (expected, name) in ["A", "B", "C", "D"].into_iter().enumerate() {
///     assert_eq!(index.store(name).unwrap(), expected as u8);
/// }
/// assert!(index.store("overflow").is_err());
///
/// assert_eq!(index.free_index(1).unwrap(), "B");
/// assert_eq!(index.store("E").unwrap(), 1);
/// assert_eq!(index.read(1), Some(&"E"));
/// ```
pub struct MultiLevelIndex<T, H: Handle = u32> {
    root: Node<T>,
    config: IndexConfig,
    len: u64,
    _handle: PhantomData<H>,
}

impl<T, H: Handle> MultiLevelIndex<T, H> {
    /// Build an empty index of the given shape.
    ///
    /// Fails if the shape is invalid, its handles do not fit in `H`, or
    /// the root node cannot be allocated.
    pub fn new(config: IndexConfig) -> Result<Self, ConfigError> {
        config.validate_for::<H>()?;
        let root = Node::try_new(config.level_size_bits, config.depth - 1)
            .ok_or(ConfigError::OutOfMemory {
                structure: "index root",
            })?;
        Ok(Self {
            root,
            config,
            len: 0,
            _handle: PhantomData,
        })
    }

    /// Shorthand for `new(IndexConfig::new(depth, level_size_bits))`.
    pub fn with_levels(depth: u8, level_size_bits: u8) -> Result<Self, ConfigError> {
        Self::new(IndexConfig::new(depth, level_size_bits))
    }

    /// Store `data` and return its handle.
    ///
    /// # Errors
    ///
    /// [`IndexError::OutOfRange`] when the index is full,
    /// [`IndexError::OutOfMemory`] when a node cannot be allocated. The
    /// payload is dropped on failure.
    pub fn store(&mut self, data: T) -> Result<H, IndexError> {
        let raw = self.root.store(data)?;
        match H::from_u64(raw) {
            Some(handle) => {
                self.len += 1;
                Ok(handle)
            }
            None => {
                // Unreachable for validated configs; undo rather than leak.
                let undone = self.root.free(raw);
                debug_assert!(undone.is_ok(), "handle {raw:#x} was just stored");
                drop(undone);
                Err(IndexError::OutOfRange)
            }
        }
    }

    /// The payload stored under `handle`, if any.
    pub fn read(&self, handle: H) -> Option<&T> {
        let raw = self.in_range(handle).ok()?;
        self.root.read(raw)
    }

    /// Mutable access to the payload stored under `handle`, if any.
    pub fn read_mut(&mut self, handle: H) -> Option<&mut T> {
        let raw = self.in_range(handle).ok()?;
        self.root.read_mut(raw)
    }

    /// Remove and return the payload stored under `handle`.
    ///
    /// # Errors
    ///
    /// [`IndexError::OutOfRange`] if `handle` is beyond the capacity,
    /// [`IndexError::FatalError`] if it names an unused slot.
    pub fn free_index(&mut self, handle: H) -> Result<T, IndexError> {
        let raw = self.in_range(handle)?;
        let data = self.root.free(raw)?;
        self.len -= 1;
        Ok(data)
    }

    /// Whether `handle` currently names a payload.
    pub fn contains(&self, handle: H) -> bool {
        self.read(handle).is_some()
    }

    fn in_range(&self, handle: H) -> Result<u64, IndexError> {
        let raw = handle.to_u64();
        match raw.checked_shr(self.config.handle_bits()) {
            Some(high) if high != 0 => Err(IndexError::OutOfRange),
            _ => Ok(raw),
        }
    }

    /// Number of stored payloads.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of payloads: `fan_out ^ depth`.
    pub fn capacity(&self) -> u64 {
        self.config.capacity()
    }

    /// Whether every handle is taken.
    pub fn is_full(&self) -> bool {
        self.root.is_full()
    }

    /// Number of levels.
    pub fn depth(&self) -> u8 {
        self.config.depth
    }

    /// Handle bits per level.
    pub fn level_size_bits(&self) -> u8 {
        self.config.level_size_bits
    }

    /// The shape this index was built with.
    pub fn config(&self) -> IndexConfig {
        self.config
    }

    /// Occupancy masks of the root node.
    pub fn root_masks(&self) -> SlotMasks {
        self.root.masks()
    }
}

impl<T, H: Handle> fmt::Debug for MultiLevelIndex<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiLevelIndex")
            .field("depth", &self.config.depth)
            .field("level_size_bits", &self.config.level_size_bits)
            .field("len", &self.len)
            .field("root_masks", &self.root.masks())
            .finish()
    }
}
