//! Index shape configuration.

use keel_core::{ConfigError, Handle};

/// Shape of a [`MultiLevelIndex`](crate::MultiLevelIndex).
///
/// Capacity is `2^(depth * level_size_bits)` payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexConfig {
    /// Number of levels, leaf level included.
    ///
    /// Default: 2. Must be at least 1.
    pub depth: u8,

    /// Bits of handle contributed by each level; fan-out is
    /// `2^level_size_bits`.
    ///
    /// Default: 4 (fan-out 16). Must be in `1..=6` since occupancy masks
    /// are 64 bits wide.
    pub level_size_bits: u8,
}

impl IndexConfig {
    /// Default number of levels.
    pub const DEFAULT_DEPTH: u8 = 2;

    /// Default bits per level.
    pub const DEFAULT_LEVEL_SIZE_BITS: u8 = 4;

    /// Largest supported bits per level.
    pub const MAX_LEVEL_SIZE_BITS: u8 = 6;

    /// A config with the given shape.
    pub const fn new(depth: u8, level_size_bits: u8) -> Self {
        Self {
            depth,
            level_size_bits,
        }
    }

    /// Slots per node.
    pub const fn fan_out(&self) -> u32 {
        1 << self.level_size_bits
    }

    /// Total handle bits: `depth * level_size_bits`.
    pub const fn handle_bits(&self) -> u32 {
        self.depth as u32 * self.level_size_bits as u32
    }

    /// Number of payloads the index can hold, saturating at `u64::MAX`.
    pub fn capacity(&self) -> u64 {
        match self.handle_bits() {
            bits if bits >= 64 => u64::MAX,
            bits => 1u64 << bits,
        }
    }

    /// Check the shape is buildable and its handles fit in 64 bits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth == 0 {
            return Err(ConfigError::OutOfBounds {
                parameter: "depth",
                value: 0,
                min: 1,
                max: 64,
            });
        }
        if self.level_size_bits == 0 || self.level_size_bits > Self::MAX_LEVEL_SIZE_BITS {
            return Err(ConfigError::OutOfBounds {
                parameter: "level_size_bits",
                value: u64::from(self.level_size_bits),
                min: 1,
                max: u64::from(Self::MAX_LEVEL_SIZE_BITS),
            });
        }
        if self.handle_bits() > 64 {
            return Err(ConfigError::HandleTooNarrow {
                required_bits: self.handle_bits(),
                available_bits: 64,
            });
        }
        Ok(())
    }

    /// [`validate`](Self::validate), and additionally check every handle
    /// fits in `H`.
    pub fn validate_for<H: Handle>(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.handle_bits() > H::BITS {
            return Err(ConfigError::HandleTooNarrow {
                required_bits: self.handle_bits(),
                available_bits: H::BITS,
            });
        }
        Ok(())
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DEPTH, Self::DEFAULT_LEVEL_SIZE_BITS)
    }
}
