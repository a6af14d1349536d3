//! Whole-process bring-up and teardown through the facade.
//!
//! The heap manager and class registry are process-wide, so every phase
//! runs inside one test to keep parallel test threads apart.

use std::sync::Arc;

use keel::prelude::*;
use keel_test_utils::fixtures::{entries, recording_entry, HookLog};

struct Actuator;

#[test]
fn bootstrap_orders_builtins_before_user_entries() {
    keel::logging::init_with_config(keel::logging::LogConfig::quiet());

    // A user entry that needs the registry comes up last and goes down first.
    let log = HookLog::default();
    let user = recording_entry("Plant", &log).depends_on("ClassRegistry");
    let mut startup = keel::bootstrap_with([Box::new(user) as Box<dyn StartupEntry>]).unwrap();
    assert_eq!(
        startup.initialisation_order(),
        ["HeapManager", "ClassRegistryIndex", "Plant"]
    );

    let handle = keel::registry::register_class(ClassRegistryItem::of::<Actuator>("1.0")).unwrap();
    assert_eq!(keel::registry::find_class("Actuator").unwrap().handle(), handle);

    let mut p = keel::heap::manager::malloc(32, None);
    assert!(!p.is_null());
    let owner = keel::heap::manager::find_heap_by_address(p as usize).unwrap();
    assert_eq!(owner.name(), "Standard");
    assert!(unsafe { keel::heap::manager::free(&mut p) });
    assert!(p.is_null());

    assert_eq!(keel::shutdown(&mut startup), ErrorFlags::NONE);
    assert_eq!(entries(&log), ["init:Plant", "finish:Plant"]);
    assert!(keel::registry::find_class("Actuator").is_none());
    assert!(!startup.is_initialised("HeapManager"));

    // A user entry with a missing dependency aborts bring-up and leaves
    // nothing initialised behind.
    let orphan = FnEntry::new("Orphan").depends_on("Telemetry");
    let err = keel::bootstrap_with([Box::new(orphan) as Box<dyn StartupEntry>]).unwrap_err();
    assert!(matches!(err, StartupError::UnknownDependency { .. }));
    assert_eq!(ErrorFlags::from(&err), ErrorFlags::INTERNAL_SETUP_ERROR);

    // A failing teardown hook shows up in the shutdown flags.
    let stubborn = FnEntry::new("Stubborn")
        .depends_on("Heap")
        .on_finish(|| Err("still busy".to_string()));
    let mut startup = keel::bootstrap_with([Box::new(stubborn) as Box<dyn StartupEntry>]).unwrap();
    assert_eq!(startup.len(), 3);
    assert_eq!(keel::shutdown(&mut startup), ErrorFlags::INITIALISATION_ERROR);
    assert!(!startup.is_initialised("Stubborn"));
}

#[test]
fn startup_manager_is_not_initialised() {
    let startup = keel::startup_manager().unwrap();
    assert_eq!(startup.len(), 2);
    assert!(startup.initialisation_order().is_empty());
    assert!(!startup.is_initialised("ClassRegistryIndex"));
}

#[test]
fn private_heap_manager_resolves_regions() {
    let manager = HeapManager::new();
    let region: Arc<dyn Heap> = Arc::new(RegionHeap::new("Scratch", 256).unwrap());
    assert!(manager.add_heap(Arc::clone(&region)));

    let mut p = manager.malloc(16, Some("Scratch"));
    assert!(!p.is_null());
    let owner = manager.find_heap_by_address(p as usize).unwrap();
    assert!(Arc::ptr_eq(&owner, &region));
    assert!(unsafe { manager.free(&mut p) });
    assert!(manager.remove_heap(&region));
}
