//! Startup ordering over generated dependency graphs.

use keel_core::ErrorFlags;
use keel_startup::{FnEntry, StartupManager};
use proptest::prelude::*;

/// `deps[i]` lists entries (all with a smaller index) that entry `i`
/// depends on. Registration happens in reverse so that dependencies are
/// always registered after their dependents.
fn acyclic_graph() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..12).prop_flat_map(|n| {
        (0..n)
            .map(|i| {
                if i == 0 {
                    Just(Vec::new()).boxed()
                } else {
                    proptest::collection::vec(0..i, 0..3).boxed()
                }
            })
            .collect::<Vec<_>>()
    })
}

proptest! {
    #[test]
    fn every_entry_starts_after_its_dependencies(deps in acyclic_graph()) {
        let mut mgr = StartupManager::new();
        for (i, d) in deps.iter().enumerate().rev() {
            let mut entry = FnEntry::new(format!("e{i}"));
            for j in d {
                entry = entry.depends_on(format!("e{j}"));
            }
            mgr.register(entry).unwrap();
        }
        mgr.initialise().unwrap();

        for (i, d) in deps.iter().enumerate() {
            let own = mgr.startup_order(&format!("e{i}")).unwrap();
            for j in d {
                let dep = mgr.startup_order(&format!("e{j}")).unwrap();
                prop_assert!(dep < own);
            }
        }

        let mut orders: Vec<u32> = (0..deps.len())
            .map(|i| mgr.startup_order(&format!("e{i}")).unwrap())
            .collect();
        orders.sort_unstable();
        prop_assert_eq!(orders, (0..deps.len() as u32).collect::<Vec<_>>());
    }
}

#[test]
fn teardown_failures_fold_into_flags() {
    let mut mgr = StartupManager::new();
    mgr.register(FnEntry::new("A").on_finish(|| Err("a".into())))
        .unwrap();
    mgr.register(FnEntry::new("B").on_finish(|| Err("b".into())))
        .unwrap();
    mgr.initialise().unwrap();

    let failures = mgr.terminate().unwrap_err();
    assert_eq!(failures.len(), 2);
    let flags = failures
        .iter()
        .fold(ErrorFlags::NONE, |acc, e| acc | ErrorFlags::from(e));
    assert_eq!(flags, ErrorFlags::INITIALISATION_ERROR);
}

#[test]
fn entries_can_be_reinitialised_after_teardown() {
    let mut mgr = StartupManager::new();
    mgr.register(FnEntry::new("A")).unwrap();
    mgr.register(FnEntry::new("B").depends_on("A")).unwrap();
    mgr.initialise().unwrap();
    mgr.terminate().unwrap();
    mgr.initialise().unwrap();
    assert_eq!(mgr.startup_order("A"), Some(0));
    assert_eq!(mgr.startup_order("B"), Some(1));
}
