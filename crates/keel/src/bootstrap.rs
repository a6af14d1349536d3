//! Process bring-up and teardown of the built-in singletons.

use keel_core::{ErrorFlags, StartupError};
use keel_heap::HeapManager;
use keel_registry::ClassRegistryIndex;
use keel_startup::{StartupEntry, StartupManager};
use tracing::{info, warn};

/// A startup manager holding the heap manager and class registry entries,
/// not yet initialised.
pub fn startup_manager() -> Result<StartupManager, StartupError> {
    let mut startup = StartupManager::new();
    startup.register(HeapManager::startup_entry())?;
    startup.register(ClassRegistryIndex::startup_entry())?;
    Ok(startup)
}

/// Register the built-in entries plus `extra`, then initialise everything
/// in dependency order.
///
/// Extra entries may depend on `"HeapManager"`/`"Heap"` and
/// `"ClassRegistryIndex"`/`"ClassRegistry"`.
///
/// # Errors
///
/// The first registration or initialisation failure. Entries that came up
/// before the failure are torn down before returning.
pub fn bootstrap_with(
    extra: impl IntoIterator<Item = Box<dyn StartupEntry>>,
) -> Result<StartupManager, StartupError> {
    let mut startup = startup_manager()?;
    for entry in extra {
        startup.register_boxed(entry)?;
    }
    if let Err(e) = startup.initialise() {
        let flags = shutdown(&mut startup);
        warn!(target: "keel::startup", error = %e, teardown = %flags, "bootstrap failed");
        return Err(e);
    }
    info!(target: "keel::startup", entries = startup.len(), "bootstrap complete");
    Ok(startup)
}

/// Bring up the heap manager and the class registry.
pub fn bootstrap() -> Result<StartupManager, StartupError> {
    bootstrap_with(std::iter::empty())
}

/// Tear down everything `startup` initialised, newest first, and return the
/// union of the failures. [`ErrorFlags::NONE`] means a clean teardown.
pub fn shutdown(startup: &mut StartupManager) -> ErrorFlags {
    match startup.terminate() {
        Ok(()) => ErrorFlags::NONE,
        Err(errors) => errors
            .iter()
            .fold(ErrorFlags::NONE, |flags, e| flags | ErrorFlags::from(e)),
    }
}
