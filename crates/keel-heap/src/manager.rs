//! Heap selection: route allocations to named heaps and pointers back to
//! the heap that owns them.

#![allow(unsafe_code)]

use std::ptr;
use std::sync::{Arc, OnceLock};

use keel_startup::FnEntry;
use tracing::{debug, error, warn};

use crate::database::HeapDatabase;
use crate::heap::Heap;
use crate::standard::StandardHeap;

/// Name of the heap manager's startup entry.
pub const STARTUP_ENTRY: &str = "HeapManager";

/// A heap database plus the standard heap it falls back to.
///
/// Most code uses the process-wide [`HeapManager::global`] through the
/// free functions of this module; tests and embedders can build private
/// managers.
#[derive(Debug)]
pub struct HeapManager {
    database: HeapDatabase,
    standard: Arc<StandardHeap>,
}

static GLOBAL: OnceLock<HeapManager> = OnceLock::new();

impl HeapManager {
    /// A manager with an empty database and its own standard heap.
    pub fn new() -> Self {
        Self::with_database(HeapDatabase::new())
    }

    /// A manager over an existing (possibly pre-populated) database.
    pub fn with_database(database: HeapDatabase) -> Self {
        Self {
            database,
            standard: Arc::new(StandardHeap::new()),
        }
    }

    /// The process-wide manager, created on first use.
    pub fn global() -> &'static HeapManager {
        GLOBAL.get_or_init(HeapManager::new)
    }

    /// The standard heap.
    pub fn standard_heap(&self) -> &Arc<StandardHeap> {
        &self.standard
    }

    /// The underlying heap database.
    pub fn database(&self) -> &HeapDatabase {
        &self.database
    }

    /// Number of registered heaps. The standard heap is not counted.
    pub fn registered_heaps(&self) -> usize {
        self.database.len()
    }

    /// Register a heap. See [`HeapDatabase::add`].
    pub fn add_heap(&self, heap: Arc<dyn Heap>) -> bool {
        self.database.add(heap)
    }

    /// Unregister a heap by identity. See [`HeapDatabase::remove`].
    pub fn remove_heap(&self, heap: &Arc<dyn Heap>) -> bool {
        self.database.remove(heap)
    }

    /// The heap owning `address`: the innermost registered heap, else the
    /// standard heap if it owns the address, else `None`.
    pub fn find_heap_by_address(&self, address: usize) -> Option<Arc<dyn Heap>> {
        if let Some(heap) = self.database.find_by_address(address) {
            return Some(heap);
        }
        if self.standard.owns(address) {
            return Some(self.standard_dyn());
        }
        None
    }

    /// The first registered heap named `name`.
    pub fn find_heap_by_name(&self, name: &str) -> Option<Arc<dyn Heap>> {
        self.database.find_by_name(name)
    }

    fn standard_dyn(&self) -> Arc<dyn Heap> {
        Arc::clone(&self.standard) as Arc<dyn Heap>
    }

    /// Allocate `size` bytes from the heap named `heap_name`, or from the
    /// standard heap when no name is given. An unknown name fails with null.
    pub fn malloc(&self, size: usize, heap_name: Option<&str>) -> *mut u8 {
        let heap = match heap_name {
            None => self.standard_dyn(),
            Some(name) => match self.find_heap_by_name(name) {
                Some(heap) => heap,
                None => {
                    error!(target: "keel::heap", heap = name, size, "malloc from unknown heap");
                    return ptr::null_mut();
                }
            },
        };
        let block = heap.malloc(size);
        if block.is_null() {
            warn!(target: "keel::heap", heap = heap.name(), size, "malloc failed");
        }
        block
    }

    /// Return `*ptr` to the heap that owns it and clear `*ptr`.
    ///
    /// Fails, leaving `*ptr` untouched, if no heap claims the address.
    ///
    /// # Safety
    ///
    /// A non-null `*ptr` must be a live block obtained from a heap known to
    /// this manager.
    pub unsafe fn free(&self, ptr: &mut *mut u8) -> bool {
        let address = *ptr as usize;
        let Some(heap) = self.find_heap_by_address(address) else {
            error!(target: "keel::heap", address, "free of unowned pointer");
            return false;
        };
        // SAFETY: forwarded from the caller; `heap` owns the address.
        unsafe { heap.free(ptr) };
        true
    }

    /// Resize `*ptr` within the heap that owns it.
    ///
    /// A null or unclaimed `*ptr` is handed to the standard heap.
    ///
    /// # Safety
    ///
    /// Same contract as [`free`](Self::free).
    pub unsafe fn realloc(&self, ptr: &mut *mut u8, size: usize) -> *mut u8 {
        let heap = self
            .find_heap_by_address(*ptr as usize)
            .unwrap_or_else(|| self.standard_dyn());
        // SAFETY: forwarded from the caller.
        let block = unsafe { heap.realloc(ptr, size) };
        if block.is_null() && size != 0 {
            warn!(target: "keel::heap", heap = heap.name(), size, "realloc failed");
        }
        block
    }

    /// Copy `size` bytes from `data` (or a zero-terminated string when
    /// `size == 0`) into a new block.
    ///
    /// The copy lands in the heap named `heap_name` if it exists, else in
    /// the heap owning `data`, else in the standard heap.
    ///
    /// # Safety
    ///
    /// See [`Heap::duplicate`].
    pub unsafe fn duplicate(
        &self,
        data: *const u8,
        size: usize,
        heap_name: Option<&str>,
    ) -> *mut u8 {
        let heap = heap_name
            .and_then(|name| self.find_heap_by_name(name))
            .or_else(|| self.find_heap_by_address(data as usize))
            .unwrap_or_else(|| self.standard_dyn());
        debug!(target: "keel::heap", heap = heap.name(), size, "duplicate");
        // SAFETY: forwarded from the caller.
        unsafe { heap.duplicate(data, size) }
    }

    /// A startup entry that brings up the process-wide manager and
    /// unregisters every heap at teardown.
    pub fn startup_entry() -> FnEntry {
        FnEntry::new(STARTUP_ENTRY)
            .tag("Heap")
            .on_init(|| {
                let manager = HeapManager::global();
                debug!(target: "keel::heap", heaps = manager.registered_heaps(), "heap manager up");
                Ok(())
            })
            .on_finish(|| {
                let removed = HeapManager::global().database().clear();
                debug!(target: "keel::heap", removed, "heap manager down");
                Ok(())
            })
    }
}

impl Default for HeapManager {
    fn default() -> Self {
        Self::new()
    }
}

// ── Process-wide shortcuts ─────────────────────────────────────────

/// [`HeapManager::malloc`] on the global manager.
pub fn malloc(size: usize, heap_name: Option<&str>) -> *mut u8 {
    HeapManager::global().malloc(size, heap_name)
}

/// [`HeapManager::free`] on the global manager.
///
/// # Safety
///
/// See [`HeapManager::free`].
pub unsafe fn free(ptr: &mut *mut u8) -> bool {
    // SAFETY: forwarded from the caller.
    unsafe { HeapManager::global().free(ptr) }
}

/// [`HeapManager::realloc`] on the global manager.
///
/// # Safety
///
/// See [`HeapManager::realloc`].
pub unsafe fn realloc(ptr: &mut *mut u8, size: usize) -> *mut u8 {
    // SAFETY: forwarded from the caller.
    unsafe { HeapManager::global().realloc(ptr, size) }
}

/// [`HeapManager::duplicate`] on the global manager.
///
/// # Safety
///
/// See [`HeapManager::duplicate`].
pub unsafe fn duplicate(data: *const u8, size: usize, heap_name: Option<&str>) -> *mut u8 {
    // SAFETY: forwarded from the caller.
    unsafe { HeapManager::global().duplicate(data, size, heap_name) }
}

/// [`HeapManager::add_heap`] on the global manager.
pub fn add_heap(heap: Arc<dyn Heap>) -> bool {
    HeapManager::global().add_heap(heap)
}

/// [`HeapManager::remove_heap`] on the global manager.
pub fn remove_heap(heap: &Arc<dyn Heap>) -> bool {
    HeapManager::global().remove_heap(heap)
}

/// [`HeapManager::find_heap_by_address`] on the global manager.
pub fn find_heap_by_address(address: usize) -> Option<Arc<dyn Heap>> {
    HeapManager::global().find_heap_by_address(address)
}

/// [`HeapManager::find_heap_by_name`] on the global manager.
pub fn find_heap_by_name(name: &str) -> Option<Arc<dyn Heap>> {
    HeapManager::global().find_heap_by_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionHeap;

    fn region(name: &str, size: usize) -> Arc<dyn Heap> {
        Arc::new(RegionHeap::new(name, size).unwrap())
    }

    #[test]
    fn unnamed_malloc_uses_standard_heap() {
        let mgr = HeapManager::new();
        let mut p = mgr.malloc(32, None);
        assert!(!p.is_null());
        let owner = mgr.find_heap_by_address(p as usize).unwrap();
        assert_eq!(owner.name(), "Standard");
        assert!(unsafe { mgr.free(&mut p) });
        assert!(p.is_null());
    }

    #[test]
    fn unknown_heap_name_fails() {
        let mgr = HeapManager::new();
        assert!(mgr.malloc(8, Some("nowhere")).is_null());
    }

    #[test]
    fn named_malloc_and_free_route_to_region() {
        let mgr = HeapManager::new();
        let pool = RegionHeap::new("pool", 256).unwrap();
        let pool = Arc::new(pool);
        assert!(mgr.add_heap(Arc::clone(&pool) as Arc<dyn Heap>));

        let mut p = mgr.malloc(16, Some("pool"));
        assert!(pool.owns(p as usize));
        assert_eq!(pool.live_blocks(), 1);
        assert!(unsafe { mgr.free(&mut p) });
        assert_eq!(pool.live_blocks(), 0);
    }

    #[test]
    fn free_of_unowned_pointer_fails() {
        let mgr = HeapManager::new();
        let local = 0u64;
        let mut p = &local as *const u64 as *mut u8;
        assert!(!unsafe { mgr.free(&mut p) });
        assert!(!p.is_null());
        let mut null = ptr::null_mut();
        assert!(!unsafe { mgr.free(&mut null) });
    }

    #[test]
    fn realloc_null_falls_back_to_standard() {
        let mgr = HeapManager::new();
        let mut p = ptr::null_mut();
        let q = unsafe { mgr.realloc(&mut p, 24) };
        assert!(!q.is_null());
        assert!(mgr.standard_heap().owns(q as usize));
        assert!(unsafe { mgr.free(&mut p) });
    }

    #[test]
    fn duplicate_prefers_named_then_owner_then_standard() {
        let mgr = HeapManager::new();
        let pool = region("pool", 256);
        assert!(mgr.add_heap(Arc::clone(&pool)));

        let src = b"hello\0";
        unsafe {
            let in_pool = mgr.duplicate(src.as_ptr(), 0, Some("pool"));
            assert!(pool.owns(in_pool as usize));

            let from_owner = mgr.duplicate(in_pool, 6, None);
            assert!(pool.owns(from_owner as usize));

            let fallback = mgr.duplicate(src.as_ptr(), 0, Some("missing"));
            assert!(mgr.standard_heap().owns(fallback as usize));
            assert_eq!(std::slice::from_raw_parts(fallback, 6), src);
        }
    }

    #[test]
    fn remove_heap_is_by_identity() {
        let mgr = HeapManager::new();
        let a = region("same", 64);
        let b = region("same", 64);
        assert!(mgr.add_heap(Arc::clone(&a)));
        assert!(!mgr.remove_heap(&b));
        assert!(mgr.remove_heap(&a));
        assert_eq!(mgr.registered_heaps(), 0);
    }
}
