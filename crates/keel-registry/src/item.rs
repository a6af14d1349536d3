//! Class descriptors.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::index::{ClassHandle, INVALID_HANDLE};

/// Descriptor of one registered class.
///
/// Everything but the live-instance counter is fixed once the item is
/// registered. The counter is atomic so that shared (`Arc`) descriptors can
/// be updated from any thread.
#[derive(Debug)]
pub struct ClassRegistryItem {
    class_name: String,
    type_name: String,
    version: String,
    size: usize,
    loadable_library: Option<String>,
    handle: ClassHandle,
    instances: AtomicU32,
}

impl ClassRegistryItem {
    /// A descriptor for a class without a Rust type behind it.
    pub fn new(class_name: impl Into<String>, version: impl Into<String>) -> Self {
        let class_name = class_name.into();
        Self {
            type_name: class_name.clone(),
            class_name,
            version: version.into(),
            size: 0,
            loadable_library: None,
            handle: INVALID_HANDLE,
            instances: AtomicU32::new(0),
        }
    }

    /// A descriptor for `T`, named by the last path segment of its type
    /// name.
    pub fn of<T: 'static>(version: impl Into<String>) -> Self {
        let type_name = std::any::type_name::<T>();
        let class_name = type_name.rsplit("::").next().unwrap_or(type_name);
        Self {
            type_name: type_name.to_string(),
            size: std::mem::size_of::<T>(),
            ..Self::new(class_name, version)
        }
    }

    /// Record the library the class was loaded from.
    pub fn with_loadable_library(mut self, library: impl Into<String>) -> Self {
        self.loadable_library = Some(library.into());
        self
    }

    pub(crate) fn set_handle(&mut self, handle: ClassHandle) {
        self.handle = handle;
    }

    /// Registered class name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Full Rust type name, or the class name for untyped descriptors.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Class version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Instance size in bytes; zero for untyped descriptors.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Library the class came from, if any.
    pub fn loadable_library(&self) -> Option<&str> {
        self.loadable_library.as_deref()
    }

    /// Handle assigned at registration, or [`INVALID_HANDLE`] before it.
    pub fn handle(&self) -> ClassHandle {
        self.handle
    }

    /// Count one more live instance.
    pub fn increment_instances(&self) -> u32 {
        self.instances.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count one fewer live instance, saturating at zero.
    pub fn decrement_instances(&self) -> u32 {
        let previous = self
            .instances
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        previous.map_or(0, |n| n - 1)
    }

    /// Live instances.
    pub fn number_of_instances(&self) -> u32 {
        self.instances.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sensor {
        _reading: [u64; 2],
    }

    #[test]
    fn typed_descriptor_uses_short_name() {
        let item = ClassRegistryItem::of::<Sensor>("1.0");
        assert_eq!(item.class_name(), "Sensor");
        assert!(item.type_name().ends_with("::Sensor"));
        assert_eq!(item.size(), 16);
        assert_eq!(item.version(), "1.0");
        assert_eq!(item.handle(), INVALID_HANDLE);
    }

    #[test]
    fn untyped_descriptor_defaults() {
        let item = ClassRegistryItem::new("Gam", "2.1").with_loadable_library("libgam.so");
        assert_eq!(item.type_name(), "Gam");
        assert_eq!(item.size(), 0);
        assert_eq!(item.loadable_library(), Some("libgam.so"));
    }

    #[test]
    fn instance_counter_saturates() {
        let item = ClassRegistryItem::new("X", "1");
        assert_eq!(item.increment_instances(), 1);
        assert_eq!(item.increment_instances(), 2);
        assert_eq!(item.decrement_instances(), 1);
        assert_eq!(item.decrement_instances(), 0);
        assert_eq!(item.decrement_instances(), 0);
        assert_eq!(item.number_of_instances(), 0);
    }
}
