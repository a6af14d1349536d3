//! Per-node slot occupancy bitmasks.

/// Occupancy of the slots of one index node.
///
/// Bit `i` of `in_use` is set when slot `i` holds a payload or a child.
/// Bit `i` of `full` is set when slot `i` cannot take another payload: a
/// leaf slot holding data, or an internal slot whose subtree is full.
///
/// Invariant: `full ⊆ in_use`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SlotMasks {
    /// Slots that are occupied.
    pub in_use: u64,
    /// Slots whose subtree has no spare capacity.
    pub full: u64,
}

impl SlotMasks {
    /// Mask with one bit set per slot of a `fan_out`-slot node.
    #[inline]
    pub const fn all_slots(fan_out: u32) -> u64 {
        if fan_out >= 64 {
            u64::MAX
        } else {
            (1u64 << fan_out) - 1
        }
    }

    /// Lowest slot that is unused or in use but not full.
    #[inline]
    pub fn first_free_space_slot(&self, fan_out: u32) -> Option<u32> {
        lowest(!self.full & Self::all_slots(fan_out))
    }

    /// Lowest unused slot.
    #[inline]
    pub fn first_empty_slot(&self, fan_out: u32) -> Option<u32> {
        lowest(!self.in_use & Self::all_slots(fan_out))
    }

    /// Whether `slot` is in use.
    #[inline]
    pub fn is_used(&self, slot: u32) -> bool {
        self.in_use & (1 << slot) != 0
    }

    /// Whether `slot` is marked full.
    #[inline]
    pub fn is_slot_full(&self, slot: u32) -> bool {
        self.full & (1 << slot) != 0
    }

    /// Mark `slot` used, and full iff `full`.
    #[inline]
    pub fn mark(&mut self, slot: u32, full: bool) {
        let bit = 1 << slot;
        self.in_use |= bit;
        if full {
            self.full |= bit;
        } else {
            self.full &= !bit;
        }
    }

    /// Mark `slot` unused.
    #[inline]
    pub fn clear(&mut self, slot: u32) {
        let bit = !(1 << slot);
        self.in_use &= bit;
        self.full &= bit;
    }

    /// Whether every one of `fan_out` slots is used and full.
    #[inline]
    pub fn is_full(&self, fan_out: u32) -> bool {
        let all = Self::all_slots(fan_out);
        self.in_use & self.full & all == all
    }

    /// Whether no slot is used.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.in_use == 0
    }

    /// Number of slots in use.
    #[inline]
    pub fn used_count(&self) -> u32 {
        self.in_use.count_ones()
    }
}

#[inline]
fn lowest(candidates: u64) -> Option<u32> {
    (candidates != 0).then(|| candidates.trailing_zeros())
}
