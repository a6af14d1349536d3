//! The bounded registry of heaps.

use std::fmt;
use std::sync::Arc;

use keel_sync::{FastPollingMutex, FastPollingMutexGuard, PollConfig};
use tracing::{debug, warn};

use crate::heap::{self, Heap};

/// Maximum number of heaps that can be registered at once.
pub const MAX_HEAPS: usize = 16;

type Slots = [Option<Arc<dyn Heap>>; MAX_HEAPS];

/// A fixed table of up to [`MAX_HEAPS`] registered heaps.
///
/// Every scan and mutation takes the table's spin lock, and no heap method
/// other than the address and name accessors is called while it is held.
/// Unregistered heaps are dropped only after the lock is released, so a
/// heap's own `Drop` may use the database.
/// Heaps are identified by `Arc` pointer identity, not by name: two
/// distinct heaps may share a name and lookup by name returns the first.
pub struct HeapDatabase {
    slots: FastPollingMutex<Slots>,
    poll: PollConfig,
}

impl HeapDatabase {
    /// An empty database whose lock waits indefinitely.
    pub fn new() -> Self {
        Self::with_poll_config(PollConfig::default())
    }

    /// An empty database whose lock follows `poll`. A lock timeout makes
    /// the operation fail as if the heap were not found.
    pub fn with_poll_config(poll: PollConfig) -> Self {
        Self {
            slots: FastPollingMutex::new(std::array::from_fn(|_| None)),
            poll,
        }
    }

    fn lock(&self) -> Option<FastPollingMutexGuard<'_, Slots>> {
        match self.slots.lock_with(&self.poll) {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!(target: "keel::heap", error = %e, "heap database lock not acquired");
                None
            }
        }
    }

    /// Register `heap` in the first free slot.
    ///
    /// Fails if the same heap is already registered or all slots are taken.
    pub fn add(&self, heap: Arc<dyn Heap>) -> bool {
        let Some(mut slots) = self.lock() else {
            return false;
        };
        if slots.iter().flatten().any(|h| Arc::ptr_eq(h, &heap)) {
            warn!(target: "keel::heap", heap = heap.name(), "heap already registered");
            return false;
        }
        match slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                debug!(target: "keel::heap", heap = heap.name(), "heap registered");
                *slot = Some(heap);
                true
            }
            None => {
                warn!(
                    target: "keel::heap",
                    heap = heap.name(),
                    capacity = MAX_HEAPS,
                    "heap database full"
                );
                false
            }
        }
    }

    /// Unregister `heap`, matched by identity.
    pub fn remove(&self, heap: &Arc<dyn Heap>) -> bool {
        let Some(mut slots) = self.lock() else {
            return false;
        };
        let removed = slots
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|h| Arc::ptr_eq(h, heap)))
            .and_then(Option::take);
        drop(slots);
        match removed {
            Some(old) => {
                debug!(target: "keel::heap", heap = heap.name(), "heap removed");
                drop(old);
                true
            }
            None => {
                warn!(target: "keel::heap", heap = heap.name(), "heap not registered");
                false
            }
        }
    }

    /// The registered heap owning `address` with the smallest address span.
    ///
    /// Nested heaps are expected to be registered with tighter bounds than
    /// the heap they are carved from, so the smallest span is the innermost
    /// owner. On equal spans the heap in the lower slot wins.
    pub fn find_by_address(&self, address: usize) -> Option<Arc<dyn Heap>> {
        let slots = self.lock()?;
        let mut found: Option<(&Arc<dyn Heap>, usize)> = None;
        for h in slots.iter().flatten() {
            if !h.owns(address) {
                continue;
            }
            let span = heap::span(h.as_ref());
            if found.is_none_or(|(_, best)| span < best) {
                found = Some((h, span));
            }
        }
        found.map(|(h, _)| Arc::clone(h))
    }

    /// The first registered heap named `name`.
    pub fn find_by_name(&self, name: &str) -> Option<Arc<dyn Heap>> {
        let slots = self.lock()?;
        slots.iter().flatten().find(|h| h.name() == name).cloned()
    }

    /// Unregister every heap, returning how many were removed.
    pub fn clear(&self) -> usize {
        let Some(mut slots) = self.lock() else {
            return 0;
        };
        let removed: Vec<Arc<dyn Heap>> = slots.iter_mut().filter_map(Option::take).collect();
        drop(slots);
        removed.len()
    }

    /// Whether `heap` is registered.
    pub fn contains(&self, heap: &Arc<dyn Heap>) -> bool {
        self.lock()
            .is_some_and(|slots| slots.iter().flatten().any(|h| Arc::ptr_eq(h, heap)))
    }

    /// Number of registered heaps.
    pub fn len(&self) -> usize {
        self.lock().map_or(0, |slots| slots.iter().flatten().count())
    }

    /// Whether no heap is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HeapDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HeapDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .lock()
            .map(|slots| slots.iter().flatten().map(|h| h.name().to_string()).collect())
            .unwrap_or_default();
        f.debug_struct("HeapDatabase").field("heaps", &names).finish()
    }
}
