//! A growable list of fixed-size byte elements.

#![allow(unsafe_code)]

use std::fmt;
use std::ptr;
use std::slice;
use std::sync::Arc;

use keel_core::ConfigError;

use crate::heap::Heap;
use crate::manager::HeapManager;

/// Configuration for a [`StaticListHolder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListConfig {
    /// Size of one element in bytes. Must be non-zero.
    pub element_size: u32,

    /// Number of elements added to the capacity on each growth.
    ///
    /// Default: 64. Must be non-zero, and one chunk
    /// (`granularity * element_size` bytes) must fit in `u32`.
    pub granularity: u32,
}

impl ListConfig {
    /// Default growth chunk, in elements.
    pub const DEFAULT_GRANULARITY: u32 = 64;

    /// A config for `element_size`-byte elements with the default
    /// granularity.
    pub fn new(element_size: u32) -> Self {
        Self {
            element_size,
            granularity: Self::DEFAULT_GRANULARITY,
        }
    }

    /// Replace the growth granularity.
    pub fn with_granularity(mut self, granularity: u32) -> Self {
        self.granularity = granularity;
        self
    }

    /// Check every parameter is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.element_size == 0 {
            return Err(ConfigError::OutOfBounds {
                parameter: "element_size",
                value: 0,
                min: 1,
                max: u64::from(u32::MAX),
            });
        }
        let max_granularity = u32::MAX / self.element_size;
        if self.granularity == 0 || self.granularity > max_granularity {
            return Err(ConfigError::OutOfBounds {
                parameter: "granularity",
                value: u64::from(self.granularity),
                min: 1,
                max: u64::from(max_granularity),
            });
        }
        Ok(())
    }

    /// Largest number of elements a list with this config can hold: the
    /// largest whole number of growth chunks whose byte size fits in `u32`.
    pub fn max_capacity(&self) -> u32 {
        let chunk = self.granularity * self.element_size;
        ((u32::MAX / chunk) * chunk) / self.element_size
    }
}

/// An ordered list of equally sized byte elements stored in one block of a
/// [`Heap`].
///
/// The block comes from the process-wide standard heap unless another heap
/// is given at construction, and is resized through [`Heap::realloc`].
/// Storage grows by whole granularity chunks up to
/// [`max_capacity`](Self::max_capacity) and never shrinks. Every mutating
/// operation reports success as a `bool` and leaves the list unchanged on
/// failure; an element slice whose length differs from the element size is
/// rejected.
///
/// Invariant: `size <= capacity <= max_capacity`, and a non-null `block`
/// holds at least `capacity * element_size` bytes.
pub struct StaticListHolder {
    config: ListConfig,
    max_capacity: u32,
    capacity: u32,
    size: u32,
    heap: Arc<dyn Heap>,
    block: *mut u8,
}

// SAFETY: `block` is owned exclusively by this list and only reached through
// `&self`/`&mut self`; the heap it came from is `Send + Sync`.
unsafe impl Send for StaticListHolder {}
// SAFETY: shared access only reads the block.
unsafe impl Sync for StaticListHolder {}

impl StaticListHolder {
    /// An empty list of `element_size`-byte elements growing by
    /// `granularity` elements at a time, backed by the standard heap.
    pub fn new(element_size: u32, granularity: u32) -> Result<Self, ConfigError> {
        Self::from_config(ListConfig {
            element_size,
            granularity,
        })
    }

    /// An empty list from a validated config, backed by the standard heap.
    /// Nothing is allocated until the first element arrives.
    pub fn from_config(config: ListConfig) -> Result<Self, ConfigError> {
        let standard = Arc::clone(HeapManager::global().standard_heap());
        Self::with_heap(config, standard)
    }

    /// An empty list whose storage comes from `heap`.
    pub fn with_heap(config: ListConfig, heap: Arc<dyn Heap>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            max_capacity: config.max_capacity(),
            config,
            capacity: 0,
            size: 0,
            heap,
            block: ptr::null_mut(),
        })
    }

    /// The heap holding the elements.
    pub fn heap(&self) -> &Arc<dyn Heap> {
        &self.heap
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> u32 {
        self.config.element_size
    }

    /// Elements added per growth.
    pub fn allocation_granularity(&self) -> u32 {
        self.config.granularity
    }

    /// Upper bound on capacity.
    pub fn max_capacity(&self) -> u32 {
        self.max_capacity
    }

    /// Number of stored elements.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of elements storable without growing.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Whether the list holds no elements.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    fn elem(&self) -> usize {
        self.config.element_size as usize
    }

    #[inline]
    fn offset(&self, position: u32) -> usize {
        position as usize * self.elem()
    }

    /// Grow capacity by one granularity chunk.
    ///
    /// Fails if the new capacity would exceed `max_capacity` or the heap
    /// cannot provide the larger block.
    pub fn increase_capacity(&mut self) -> bool {
        let Some(new_capacity) = self
            .capacity
            .checked_add(self.config.granularity)
            .filter(|&c| c <= self.max_capacity)
        else {
            return false;
        };
        let bytes = new_capacity as usize * self.elem();
        // SAFETY: `block` is null or the live block this list got from `heap`.
        let grown = unsafe { self.heap.realloc(&mut self.block, bytes) };
        if grown.is_null() {
            return false;
        }
        self.capacity = new_capacity;
        true
    }

    fn ensure_room(&mut self) -> bool {
        self.size < self.capacity || self.increase_capacity()
    }

    /// Append a copy of `element`.
    pub fn add(&mut self, element: &[u8]) -> bool {
        let size = self.size;
        self.insert(size, element)
    }

    /// Insert a copy of `element` at `position`, shifting later elements
    /// right. `position == size` appends.
    pub fn insert(&mut self, position: u32, element: &[u8]) -> bool {
        if position > self.size || element.len() != self.elem() || !self.ensure_room() {
            return false;
        }
        let at = self.offset(position);
        let tail = self.offset(self.size) - at;
        // SAFETY: `ensure_room` left room for one more element, so both the
        // shifted tail and the new element stay inside the block.
        unsafe {
            let slot = self.block.add(at);
            ptr::copy(slot, slot.add(self.elem()), tail);
            ptr::copy_nonoverlapping(element.as_ptr(), slot, self.elem());
        }
        self.size += 1;
        true
    }

    /// Copy the element at `position` into `out`.
    pub fn peek(&self, position: u32, out: &mut [u8]) -> bool {
        match self.get(position) {
            Some(element) if out.len() == element.len() => {
                out.copy_from_slice(element);
                true
            }
            _ => false,
        }
    }

    /// Borrow the element at `position`.
    pub fn get(&self, position: u32) -> Option<&[u8]> {
        if position >= self.size {
            return None;
        }
        let range = self.offset(position)..self.offset(position + 1);
        Some(&self.as_bytes()[range])
    }

    /// Overwrite the element at `position` with `element`.
    pub fn set(&mut self, position: u32, element: &[u8]) -> bool {
        if position >= self.size || element.len() != self.elem() {
            return false;
        }
        let range = self.offset(position)..self.offset(position + 1);
        self.as_bytes_mut()[range].copy_from_slice(element);
        true
    }

    /// Delete the element at `position`, shifting later elements left.
    pub fn remove(&mut self, position: u32) -> bool {
        if position >= self.size {
            return false;
        }
        let live = self.offset(self.size);
        let start = self.offset(position);
        let elem = self.elem();
        self.as_bytes_mut()[start..live].rotate_left(elem);
        self.size -= 1;
        true
    }

    /// Copy the element at `position` into `out`, then remove it.
    pub fn extract(&mut self, position: u32, out: &mut [u8]) -> bool {
        self.peek(position, out) && self.remove(position)
    }

    /// Position of the first element byte-equal to `element`.
    pub fn find(&self, element: &[u8]) -> Option<u32> {
        if element.len() != self.elem() {
            return None;
        }
        self.iter().position(|e| e == element).map(|p| p as u32)
    }

    /// All live elements, packed back to back.
    pub fn as_bytes(&self) -> &[u8] {
        if self.size == 0 {
            return &[];
        }
        // SAFETY: a non-empty list has a live block holding `size` elements.
        unsafe { slice::from_raw_parts(self.block, self.offset(self.size)) }
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        if self.size == 0 {
            return &mut [];
        }
        let len = self.offset(self.size);
        // SAFETY: as in `as_bytes`; `&mut self` makes the borrow exclusive.
        unsafe { slice::from_raw_parts_mut(self.block, len) }
    }

    /// Iterate over the live elements.
    pub fn iter(&self) -> std::slice::ChunksExact<'_, u8> {
        self.as_bytes().chunks_exact(self.elem())
    }
}

impl Drop for StaticListHolder {
    fn drop(&mut self) {
        // SAFETY: `block` is null or the live block this list got from `heap`.
        unsafe { self.heap.free(&mut self.block) };
    }
}

impl fmt::Debug for StaticListHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticListHolder")
            .field("element_size", &self.config.element_size)
            .field("size", &self.size)
            .field("capacity", &self.capacity)
            .field("heap", &self.heap.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionHeap;

    fn list_u32(granularity: u32) -> StaticListHolder {
        StaticListHolder::new(4, granularity).unwrap()
    }

    fn read_u32(list: &StaticListHolder, position: u32) -> u32 {
        let mut out = [0u8; 4];
        assert!(list.peek(position, &mut out));
        u32::from_ne_bytes(out)
    }

    #[test]
    fn zero_parameters_rejected() {
        assert!(StaticListHolder::new(0, 4).is_err());
        assert!(StaticListHolder::new(4, 0).is_err());
        assert!(StaticListHolder::new(u32::MAX, 2).is_err());
    }

    #[test]
    fn default_granularity_is_64() {
        let config = ListConfig::new(8);
        assert_eq!(config.granularity, ListConfig::DEFAULT_GRANULARITY);
        assert_eq!(ListConfig::DEFAULT_GRANULARITY, 64);
    }

    #[test]
    fn max_capacity_is_whole_chunks() {
        let list = StaticListHolder::new(4, 10).unwrap();
        let chunk = 40u32;
        let expected = ((u32::MAX / chunk) * chunk) / 4;
        assert_eq!(list.max_capacity(), expected);
        assert_eq!(list.max_capacity() % 10, 0);
    }

    #[test]
    fn nothing_allocated_until_first_add() {
        let mut list = list_u32(4);
        assert_eq!(list.capacity(), 0);
        assert!(list.add(&7u32.to_ne_bytes()));
        assert_eq!(list.capacity(), 4);
        assert_eq!(list.size(), 1);
    }

    #[test]
    fn growth_after_granularity_plus_one_adds() {
        let granularity = 8;
        let mut list = list_u32(granularity);
        for v in 0..=granularity {
            assert!(list.add(&v.to_ne_bytes()));
        }
        assert_eq!(list.capacity(), 2 * granularity);
        assert_eq!(list.size(), granularity + 1);
    }

    #[test]
    fn insert_at_zero_shifts_right() {
        let mut list = list_u32(4);
        for v in [10u32, 20, 30] {
            assert!(list.add(&v.to_ne_bytes()));
        }
        assert!(list.insert(0, &5u32.to_ne_bytes()));
        let values: Vec<u32> = (0..list.size()).map(|i| read_u32(&list, i)).collect();
        assert_eq!(values, [5, 10, 20, 30]);
    }

    #[test]
    fn insert_past_end_fails() {
        let mut list = list_u32(4);
        assert!(!list.insert(1, &1u32.to_ne_bytes()));
        assert!(list.insert(0, &1u32.to_ne_bytes()));
        assert!(list.insert(1, &2u32.to_ne_bytes()));
        assert_eq!(read_u32(&list, 1), 2);
    }

    #[test]
    fn wrong_element_length_rejected() {
        let mut list = list_u32(4);
        assert!(!list.add(&[1, 2, 3]));
        assert!(!list.insert(0, &[]));
        assert_eq!(list.size(), 0);
        assert_eq!(list.capacity(), 0);
        let mut short = [0u8; 2];
        assert!(list.add(&9u32.to_ne_bytes()));
        assert!(!list.peek(0, &mut short));
    }

    #[test]
    fn bounds_checked_access() {
        let mut list = list_u32(4);
        let mut out = [0u8; 4];
        assert!(!list.peek(0, &mut out));
        assert!(!list.remove(0));
        assert!(!list.extract(0, &mut out));
        assert!(!list.set(0, &out));
        assert!(list.add(&1u32.to_ne_bytes()));
        assert!(!list.peek(1, &mut out));
    }

    #[test]
    fn extract_returns_and_removes() {
        let mut list = list_u32(4);
        for v in [1u32, 2, 3] {
            list.add(&v.to_ne_bytes());
        }
        let mut out = [0u8; 4];
        assert!(list.extract(1, &mut out));
        assert_eq!(u32::from_ne_bytes(out), 2);
        assert_eq!(list.size(), 2);
        assert_eq!(read_u32(&list, 1), 3);
    }

    #[test]
    fn set_overwrites_and_find_locates() {
        let mut list = list_u32(4);
        for v in [1u32, 2, 3, 2] {
            list.add(&v.to_ne_bytes());
        }
        assert_eq!(list.find(&2u32.to_ne_bytes()), Some(1));
        assert!(list.set(1, &9u32.to_ne_bytes()));
        assert_eq!(list.find(&2u32.to_ne_bytes()), Some(3));
        assert_eq!(list.find(&7u32.to_ne_bytes()), None);
        assert_eq!(list.find(&[0]), None);
    }

    #[test]
    fn capacity_ceiling_blocks_growth() {
        // Exactly one chunk fits under u32::MAX.
        let element_size = u32::MAX / 2 + 1;
        let mut list = StaticListHolder::new(element_size, 1).unwrap();
        assert_eq!(list.max_capacity(), 1);

        list.capacity = list.max_capacity();
        assert!(!list.increase_capacity());
        assert_eq!(list.capacity(), 1);
    }

    #[test]
    fn defaults_to_the_standard_heap() {
        let list = list_u32(4);
        assert_eq!(list.heap().name(), crate::standard::STANDARD_HEAP_NAME);
    }

    #[test]
    fn storage_lives_in_the_backing_heap() {
        let region = Arc::new(RegionHeap::new("lists", 256).unwrap());
        let heap: Arc<dyn Heap> = region.clone();
        let mut list = StaticListHolder::with_heap(ListConfig::new(4).with_granularity(4), heap)
            .unwrap();
        for v in 0..6u32 {
            assert!(list.add(&v.to_ne_bytes()));
        }
        assert!(region.owns(list.as_bytes().as_ptr() as usize));
        assert_eq!(region.live_blocks(), 1);
        assert_eq!(read_u32(&list, 5), 5);

        drop(list);
        assert_eq!(region.live_blocks(), 0);
        assert_eq!(region.used(), 0);
    }

    #[test]
    fn exhausted_heap_blocks_growth_without_losing_elements() {
        // Room for one 16-byte chunk plus its header, not for two.
        let region: Arc<dyn Heap> = Arc::new(RegionHeap::new("tight", 32).unwrap());
        let mut list = StaticListHolder::with_heap(ListConfig::new(4).with_granularity(4), region)
            .unwrap();
        for v in 0..4u32 {
            assert!(list.add(&v.to_ne_bytes()));
        }
        assert!(!list.add(&9u32.to_ne_bytes()));
        assert!(!list.insert(0, &9u32.to_ne_bytes()));
        assert_eq!(list.capacity(), 4);
        let values: Vec<u32> = (0..list.size()).map(|i| read_u32(&list, i)).collect();
        assert_eq!(values, [0, 1, 2, 3]);
    }

    #[test]
    fn iter_and_as_bytes_cover_live_elements() {
        let mut list = StaticListHolder::new(2, 4).unwrap();
        list.add(&[1, 2]);
        list.add(&[3, 4]);
        assert_eq!(list.as_bytes(), [1, 2, 3, 4]);
        assert_eq!(list.iter().collect::<Vec<_>>(), [&[1u8, 2][..], &[3, 4][..]]);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Add(u32),
            Insert(u32, u32),
            Remove(u32),
            Set(u32, u32),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                any::<u32>().prop_map(Op::Add),
                (0u32..40, any::<u32>()).prop_map(|(p, v)| Op::Insert(p, v)),
                (0u32..40).prop_map(Op::Remove),
                (0u32..40, any::<u32>()).prop_map(|(p, v)| Op::Set(p, v)),
            ]
        }

        proptest! {
            #[test]
            fn behaves_like_vec(ops in proptest::collection::vec(op(), 0..200), gran in 1u32..9) {
                let mut list = StaticListHolder::new(4, gran).unwrap();
                let mut model: Vec<u32> = Vec::new();
                for op in ops {
                    match op {
                        Op::Add(v) => {
                            prop_assert!(list.add(&v.to_ne_bytes()));
                            model.push(v);
                        }
                        Op::Insert(p, v) => {
                            let ok = (p as usize) <= model.len();
                            prop_assert_eq!(list.insert(p, &v.to_ne_bytes()), ok);
                            if ok {
                                model.insert(p as usize, v);
                            }
                        }
                        Op::Remove(p) => {
                            let ok = (p as usize) < model.len();
                            prop_assert_eq!(list.remove(p), ok);
                            if ok {
                                model.remove(p as usize);
                            }
                        }
                        Op::Set(p, v) => {
                            let ok = (p as usize) < model.len();
                            prop_assert_eq!(list.set(p, &v.to_ne_bytes()), ok);
                            if ok {
                                model[p as usize] = v;
                            }
                        }
                    }
                    prop_assert!(list.size() <= list.capacity());
                    prop_assert_eq!(list.capacity() % gran, 0);
                }
                let got: Vec<u32> = list
                    .iter()
                    .map(|e| u32::from_ne_bytes([e[0], e[1], e[2], e[3]]))
                    .collect();
                prop_assert_eq!(got, model);
            }
        }
    }
}
