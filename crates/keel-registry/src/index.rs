//! The two-level class registry index.

use std::collections::HashMap;
use std::sync::Arc;

use keel_core::RegistryError;
use tracing::debug;

use crate::item::ClassRegistryItem;

/// Stable handle of a registered class.
pub type ClassHandle = u32;

/// Sentinel for "no class": never assigned to a registered item.
pub const INVALID_HANDLE: ClassHandle = 0xFFFF_FFFF;

/// Entries per cell.
pub const CELL_SIZE: usize = 256;

/// Maximum number of cells.
pub const MAX_CELLS: usize = 256;

/// Append-only block of up to [`CELL_SIZE`] descriptors.
#[derive(Debug)]
struct Cell {
    items: Vec<Arc<ClassRegistryItem>>,
}

impl Cell {
    fn new() -> Self {
        Self {
            items: Vec::with_capacity(CELL_SIZE),
        }
    }

    fn is_full(&self) -> bool {
        self.items.len() == CELL_SIZE
    }
}

/// Append-only table of class descriptors addressed by [`ClassHandle`].
///
/// Cells are created lazily as the previous one fills, so handles are dense
/// from zero: the `n`-th class added gets handle `n`, encoded as
/// `(cell << 8) | slot`. At most `MAX_CELLS * CELL_SIZE` (65536) classes
/// fit. Class names are unique.
#[derive(Debug, Default)]
pub struct ClassRegistryIndex {
    cells: Vec<Cell>,
    by_name: HashMap<String, ClassHandle>,
}

impl ClassRegistryIndex {
    /// Total class capacity.
    pub const CAPACITY: usize = MAX_CELLS * CELL_SIZE;

    /// An empty index. No cell is allocated until the first class.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `item` and return its handle.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Full`] once 65536 classes are registered (the
    /// caller's equivalent of [`INVALID_HANDLE`]),
    /// [`RegistryError::NameInUse`] if a class of the same name exists.
    pub fn add(&mut self, mut item: ClassRegistryItem) -> Result<ClassHandle, RegistryError> {
        if self.by_name.contains_key(item.class_name()) {
            return Err(RegistryError::NameInUse {
                name: item.class_name().to_string(),
            });
        }
        if self.cells.last().is_none_or(Cell::is_full) {
            if self.cells.len() == MAX_CELLS {
                return Err(RegistryError::Full {
                    capacity: Self::CAPACITY as u32,
                });
            }
            self.cells.push(Cell::new());
        }
        let outer = self.cells.len() - 1;
        let Some(cell) = self.cells.last_mut() else {
            return Err(RegistryError::Full {
                capacity: Self::CAPACITY as u32,
            });
        };
        let handle = ((outer << 8) | cell.items.len()) as ClassHandle;
        item.set_handle(handle);
        self.by_name.insert(item.class_name().to_string(), handle);
        debug!(target: "keel::registry", class = item.class_name(), handle, "class registered");
        cell.items.push(Arc::new(item));
        Ok(handle)
    }

    /// The descriptor registered under `handle`.
    pub fn get(&self, handle: ClassHandle) -> Option<&Arc<ClassRegistryItem>> {
        let outer = (handle >> 8) as usize;
        let inner = (handle & 0xFF) as usize;
        self.cells.get(outer)?.items.get(inner)
    }

    /// The descriptor whose class name is `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<ClassRegistryItem>> {
        self.get(*self.by_name.get(name)?)
    }

    /// The descriptor whose type name is `type_name`. Linear in the number
    /// of classes.
    pub fn find_by_type_name(&self, type_name: &str) -> Option<&Arc<ClassRegistryItem>> {
        self.iter().find(|item| item.type_name() == type_name)
    }

    /// Number of registered classes.
    pub fn number_of_registered_classes(&self) -> u32 {
        match self.cells.last() {
            None => 0,
            Some(last) => ((self.cells.len() - 1) * CELL_SIZE + last.items.len()) as u32,
        }
    }

    /// Whether no class is registered.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Registered descriptors in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ClassRegistryItem>> + '_ {
        self.cells.iter().flat_map(|cell| cell.items.iter())
    }

    /// Drop every descriptor. Handles handed out earlier become dangling
    /// and will be reassigned.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.by_name.clear();
    }
}
