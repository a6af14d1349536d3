//! The process-wide class registry and its startup entry.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use keel_core::RegistryError;
use keel_startup::FnEntry;
use tracing::{debug, warn};

use crate::index::{ClassHandle, ClassRegistryIndex};
use crate::item::ClassRegistryItem;

/// Name of the registry's startup entry.
pub const STARTUP_ENTRY: &str = "ClassRegistryIndex";

/// Tag carried by the registry's startup entry.
pub const STARTUP_TAG: &str = "ClassRegistry";

static INSTANCE: OnceLock<RwLock<ClassRegistryIndex>> = OnceLock::new();

impl ClassRegistryIndex {
    /// The process-wide registry, created empty on first use.
    pub fn instance() -> &'static RwLock<ClassRegistryIndex> {
        INSTANCE.get_or_init(|| RwLock::new(ClassRegistryIndex::new()))
    }

    /// A startup entry that depends on the heap manager, creates the
    /// process-wide registry, and clears it at teardown.
    pub fn startup_entry() -> FnEntry {
        FnEntry::new(STARTUP_ENTRY)
            .tag(STARTUP_TAG)
            .depends_on("HeapManager")
            .on_init(|| {
                let classes = read_registry(|r| r.number_of_registered_classes());
                debug!(target: "keel::registry", classes, "class registry up");
                Ok(())
            })
            .on_finish(|| {
                let mut registry = ClassRegistryIndex::instance()
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                let classes = registry.number_of_registered_classes();
                registry.clear();
                debug!(target: "keel::registry", classes, "class registry cleared");
                Ok(())
            })
    }
}

fn read_registry<R>(f: impl FnOnce(&ClassRegistryIndex) -> R) -> R {
    let registry = ClassRegistryIndex::instance()
        .read()
        .unwrap_or_else(PoisonError::into_inner);
    f(&registry)
}

/// Register `item` in the process-wide registry.
pub fn register_class(item: ClassRegistryItem) -> Result<ClassHandle, RegistryError> {
    let mut registry = ClassRegistryIndex::instance()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    registry.add(item).inspect_err(|e| {
        warn!(target: "keel::registry", error = %e, "class registration failed");
    })
}

/// Look up a class by name in the process-wide registry.
pub fn find_class(name: &str) -> Option<Arc<ClassRegistryItem>> {
    read_registry(|r| r.find_by_name(name).cloned())
}
