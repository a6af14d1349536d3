//! Trie nodes shared by the dynamic and fixed fan-out indexes.
//!
//! Handles are built from one `level_size_bits`-wide digit per level, with
//! the root's digit most significant. A node at height `n_levels` (leaves
//! are height 0) finds its digit at bit offset `level_size_bits * n_levels`.

use keel_core::IndexError;
use tracing::trace;

use crate::masks::SlotMasks;

pub(crate) enum Node<T> {
    Leaf {
        masks: SlotMasks,
        slots: Box<[Option<T>]>,
    },
    Internal {
        masks: SlotMasks,
        n_levels: u8,
        children: Box<[Option<Box<Node<T>>>]>,
    },
}

/// A boxed slice of `len` empty slots, or `None` if allocation fails.
fn empty_slots<S>(len: usize) -> Option<Box<[Option<S>]>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).ok()?;
    v.resize_with(len, || None);
    Some(v.into_boxed_slice())
}

impl<T> Node<T> {
    /// A node at height `n_levels` with `2^level_size_bits` empty slots, or
    /// `None` if its slots cannot be allocated.
    pub(crate) fn try_new(level_size_bits: u8, n_levels: u8) -> Option<Self> {
        let fan_out = 1usize << level_size_bits;
        let masks = SlotMasks::default();
        Some(if n_levels == 0 {
            Self::Leaf {
                masks,
                slots: empty_slots(fan_out)?,
            }
        } else {
            Self::Internal {
                masks,
                n_levels,
                children: empty_slots(fan_out)?,
            }
        })
    }

    pub(crate) fn masks(&self) -> SlotMasks {
        match self {
            Self::Leaf { masks, .. } | Self::Internal { masks, .. } => *masks,
        }
    }

    fn fan_out(&self) -> u32 {
        match self {
            Self::Leaf { slots, .. } => slots.len() as u32,
            Self::Internal { children, .. } => children.len() as u32,
        }
    }

    fn level_size_bits(&self) -> u32 {
        self.fan_out().trailing_zeros()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.masks().is_full(self.fan_out())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.masks().is_empty()
    }

    /// This node's digit of `handle`.
    fn digit(&self, handle: u64) -> usize {
        let bits = self.level_size_bits();
        let n_levels = match self {
            Self::Leaf { .. } => 0,
            Self::Internal { n_levels, .. } => u32::from(*n_levels),
        };
        ((handle >> (bits * n_levels)) & (u64::from(self.fan_out()) - 1)) as usize
    }

    /// Store `data` in the lowest free position of this subtree and return
    /// its handle relative to this node.
    pub(crate) fn store(&mut self, data: T) -> Result<u64, IndexError> {
        let fan_out = self.fan_out();
        let bits = self.level_size_bits();
        match self {
            Self::Leaf { masks, slots } => {
                let slot = masks.first_empty_slot(fan_out).ok_or(IndexError::OutOfRange)?;
                slots[slot as usize] = Some(data);
                masks.mark(slot, true);
                Ok(u64::from(slot))
            }
            Self::Internal {
                masks,
                n_levels,
                children,
            } => {
                let slot = masks
                    .first_free_space_slot(fan_out)
                    .ok_or(IndexError::OutOfRange)?;
                let child_levels = *n_levels - 1;
                let child_slot = &mut children[slot as usize];
                if child_slot.is_none() {
                    let child = Node::try_new(bits as u8, child_levels)
                        .ok_or(IndexError::OutOfMemory)?;
                    trace!(
                        target: "keel::index",
                        n_levels = child_levels,
                        slot,
                        "node created"
                    );
                    *child_slot = Some(Box::new(child));
                }
                let Some(child) = child_slot.as_mut() else {
                    return Err(IndexError::FatalError);
                };
                let stored = child.store(data);
                let (child_full, child_empty) = (child.is_full(), child.is_empty());
                let sub = match stored {
                    Ok(sub) => sub,
                    Err(e) => {
                        if child_empty {
                            *child_slot = None;
                        }
                        return Err(e);
                    }
                };
                masks.mark(slot, child_full);
                Ok((u64::from(slot) << (bits * u32::from(*n_levels))) | sub)
            }
        }
    }

    pub(crate) fn read(&self, handle: u64) -> Option<&T> {
        let digit = self.digit(handle);
        match self {
            Self::Leaf { slots, .. } => slots.get(digit)?.as_ref(),
            Self::Internal { children, .. } => children.get(digit)?.as_ref()?.read(handle),
        }
    }

    pub(crate) fn read_mut(&mut self, handle: u64) -> Option<&mut T> {
        let digit = self.digit(handle);
        match self {
            Self::Leaf { slots, .. } => slots.get_mut(digit)?.as_mut(),
            Self::Internal { children, .. } => {
                children.get_mut(digit)?.as_mut()?.read_mut(handle)
            }
        }
    }

    /// Remove and return the payload at `handle`, releasing children that
    /// become empty.
    pub(crate) fn free(&mut self, handle: u64) -> Result<T, IndexError> {
        let digit = self.digit(handle);
        match self {
            Self::Leaf { masks, slots } => {
                let slot = slots.get_mut(digit).ok_or(IndexError::OutOfRange)?;
                let data = slot.take().ok_or(IndexError::FatalError)?;
                masks.clear(digit as u32);
                Ok(data)
            }
            Self::Internal {
                masks,
                n_levels,
                children,
            } => {
                if !masks.is_used(digit as u32) {
                    return Err(IndexError::FatalError);
                }
                let child_slot = children.get_mut(digit).ok_or(IndexError::OutOfRange)?;
                let child = child_slot.as_mut().ok_or(IndexError::FatalError)?;
                let data = child.free(handle)?;
                if child.is_empty() {
                    *child_slot = None;
                    masks.clear(digit as u32);
                    let child_levels = *n_levels - 1;
                    trace!(
                        target: "keel::index",
                        n_levels = child_levels,
                        slot = digit,
                        "node released"
                    );
                } else {
                    masks.mark(digit as u32, false);
                }
                Ok(data)
            }
        }
    }
}
