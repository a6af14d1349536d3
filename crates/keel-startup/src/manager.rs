//! The startup manager: dependency resolution, ordering, and teardown.

use indexmap::IndexMap;
use keel_core::StartupError;
use tracing::{debug, error, info, warn};

use crate::entry::StartupEntry;

// ── Entry state ────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Pending,
    InProgress,
    Initialised,
}

struct Slot {
    entry: Box<dyn StartupEntry>,
    phase: Phase,
    order: Option<u32>,
}

// ── Manager ────────────────────────────────────────────────────────

/// Runs registered [`StartupEntry`]s in dependency order and tears them
/// down in reverse.
///
/// Entries are kept in registration order; that order breaks ties between
/// entries with no dependency relation. Each completed `init` receives the
/// next value of a monotonic startup-order counter, and `finish` runs by
/// strictly decreasing startup order.
#[derive(Default)]
pub struct StartupManager {
    entries: IndexMap<String, Slot>,
    next_order: u32,
    /// Entry indices in init completion order.
    completed: Vec<usize>,
}

impl StartupManager {
    /// An empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry. Names must be unique.
    pub fn register(&mut self, entry: impl StartupEntry + 'static) -> Result<(), StartupError> {
        self.register_boxed(Box::new(entry))
    }

    /// Register an already boxed entry.
    pub fn register_boxed(&mut self, entry: Box<dyn StartupEntry>) -> Result<(), StartupError> {
        let name = entry.name().to_string();
        if self.entries.contains_key(&name) {
            return Err(StartupError::DuplicateEntry { name });
        }
        debug!(target: "keel::startup", entry = %name, "registered startup entry");
        self.entries.insert(
            name,
            Slot {
                entry,
                phase: Phase::Pending,
                order: None,
            },
        );
        Ok(())
    }

    /// Initialise every pending entry after the entries it depends on.
    ///
    /// Entries already initialised are skipped, so entries registered after
    /// a previous call can be brought up with another call. The first
    /// failure aborts the pass; entries initialised before it stay up and
    /// are finished by [`terminate`](Self::terminate).
    pub fn initialise(&mut self) -> Result<(), StartupError> {
        for index in 0..self.entries.len() {
            self.initialise_entry(index)?;
        }
        Ok(())
    }

    fn initialise_entry(&mut self, index: usize) -> Result<(), StartupError> {
        let name = {
            let (name, slot) = self.slot_at(index)?;
            match slot.phase {
                Phase::Initialised => return Ok(()),
                Phase::InProgress => {
                    error!(target: "keel::startup", entry = %name, "startup dependency cycle");
                    return Err(StartupError::InternalSetupError {
                        entry: name.clone(),
                    });
                }
                Phase::Pending => name.clone(),
            }
        };
        self.set_phase(index, Phase::InProgress);

        let result = self.initialise_dependencies(index, &name).and_then(|()| {
            let slot = self.slot_at_mut(index)?;
            slot.entry
                .init()
                .map_err(|reason| StartupError::InitialisationError {
                    entry: name.clone(),
                    reason,
                })
        });

        match result {
            Ok(()) => {
                let order = self.next_order;
                self.next_order += 1;
                let slot = self.slot_at_mut(index)?;
                slot.phase = Phase::Initialised;
                slot.order = Some(order);
                self.completed.push(index);
                info!(target: "keel::startup", entry = %name, order, "initialised");
                Ok(())
            }
            Err(e) => {
                self.set_phase(index, Phase::Pending);
                if matches!(e, StartupError::InitialisationError { .. }) {
                    error!(
                        target: "keel::startup",
                        entry = %name,
                        error = %e,
                        "initialisation failed"
                    );
                }
                Err(e)
            }
        }
    }

    fn initialise_dependencies(&mut self, index: usize, name: &str) -> Result<(), StartupError> {
        let dependencies: Vec<String> = self.slot_at(index)?.1.entry.dependencies().to_vec();
        for dependency in dependencies {
            let providers = self.providers_of(&dependency);
            if providers.is_empty() {
                error!(
                    target: "keel::startup",
                    entry = %name,
                    dependency = %dependency,
                    "unknown startup dependency"
                );
                return Err(StartupError::UnknownDependency {
                    entry: name.to_string(),
                    dependency,
                });
            }
            for provider in providers {
                self.initialise_entry(provider)?;
            }
        }
        Ok(())
    }

    /// Indices of every entry whose name or one of whose tags equals
    /// `dependency`.
    fn providers_of(&self, dependency: &str) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, (name, slot))| {
                name.as_str() == dependency || slot.entry.tags().iter().any(|t| t == dependency)
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Finish every initialised entry in strictly decreasing startup order.
    ///
    /// A failing `finish` does not stop teardown; all failures are returned
    /// together. Finished entries return to the pending state.
    pub fn terminate(&mut self) -> Result<(), Vec<StartupError>> {
        let mut failures = Vec::new();
        while let Some(index) = self.completed.pop() {
            let Some((name, slot)) = self.entries.get_index_mut(index) else {
                continue;
            };
            let outcome = slot.entry.finish();
            slot.phase = Phase::Pending;
            slot.order = None;
            match outcome {
                Ok(()) => info!(target: "keel::startup", entry = %name, "finished"),
                Err(reason) => {
                    warn!(
                        target: "keel::startup",
                        entry = %name,
                        reason = %reason,
                        "finish failed"
                    );
                    failures.push(StartupError::FinishError {
                        entry: name.clone(),
                        reason,
                    });
                }
            }
        }
        self.next_order = 0;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    // ── Queries ────────────────────────────────────────────────────

    /// The startup order assigned to `name`, if it is initialised.
    pub fn startup_order(&self, name: &str) -> Option<u32> {
        self.entries.get(name)?.order
    }

    /// Whether `name` completed `init` and has not been finished.
    pub fn is_initialised(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .is_some_and(|slot| slot.phase == Phase::Initialised)
    }

    /// Names of initialised entries in init completion order.
    pub fn initialisation_order(&self) -> Vec<&str> {
        self.completed
            .iter()
            .filter_map(|&i| self.entries.get_index(i).map(|(name, _)| name.as_str()))
            .collect()
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Internals ──────────────────────────────────────────────────

    fn slot_at(&self, index: usize) -> Result<(&String, &Slot), StartupError> {
        self.entries
            .get_index(index)
            .ok_or_else(|| StartupError::InternalSetupError {
                entry: format!("#{index}"),
            })
    }

    fn slot_at_mut(&mut self, index: usize) -> Result<&mut Slot, StartupError> {
        self.entries
            .get_index_mut(index)
            .map(|(_, slot)| slot)
            .ok_or_else(|| StartupError::InternalSetupError {
                entry: format!("#{index}"),
            })
    }

    fn set_phase(&mut self, index: usize, phase: Phase) {
        if let Some((_, slot)) = self.entries.get_index_mut(index) {
            slot.phase = phase;
        }
    }
}

impl std::fmt::Debug for StartupManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupManager")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .field("initialised", &self.initialisation_order())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::FnEntry;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    fn logged(name: &str, log: &Log) -> FnEntry {
        let init_log = Arc::clone(log);
        let finish_log = Arc::clone(log);
        let init_name = format!("init:{name}");
        let finish_name = format!("finish:{name}");
        FnEntry::new(name)
            .on_init(move || {
                init_log.lock().unwrap().push(init_name.clone());
                Ok(())
            })
            .on_finish(move || {
                finish_log.lock().unwrap().push(finish_name.clone());
                Ok(())
            })
    }

    #[test]
    fn dependency_runs_first() {
        let log = Log::default();
        let mut mgr = StartupManager::new();
        mgr.register(logged("Registry", &log).depends_on("Heap")).unwrap();
        mgr.register(logged("Heap", &log)).unwrap();
        mgr.initialise().unwrap();

        assert_eq!(*log.lock().unwrap(), ["init:Heap", "init:Registry"]);
        assert_eq!(mgr.startup_order("Heap"), Some(0));
        assert_eq!(mgr.startup_order("Registry"), Some(1));
        assert_eq!(mgr.initialisation_order(), ["Heap", "Registry"]);
    }

    #[test]
    fn tag_dependency_waits_for_every_carrier() {
        let log = Log::default();
        let mut mgr = StartupManager::new();
        mgr.register(logged("Consumer", &log).depends_on("Io")).unwrap();
        mgr.register(logged("Serial", &log).tag("Io")).unwrap();
        mgr.register(logged("Console", &log).tag("Io")).unwrap();
        mgr.initialise().unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            ["init:Serial", "init:Console", "init:Consumer"]
        );
    }

    #[test]
    fn cycle_is_internal_setup_error() {
        let mut mgr = StartupManager::new();
        mgr.register(FnEntry::new("A").depends_on("B")).unwrap();
        mgr.register(FnEntry::new("B").depends_on("A")).unwrap();
        let err = mgr.initialise().unwrap_err();
        assert!(matches!(err, StartupError::InternalSetupError { .. }));
        assert!(!mgr.is_initialised("A"));
        assert!(!mgr.is_initialised("B"));
    }

    #[test]
    fn self_tag_dependency_is_a_cycle() {
        let mut mgr = StartupManager::new();
        mgr.register(FnEntry::new("A").tag("t").depends_on("t")).unwrap();
        assert_eq!(
            mgr.initialise(),
            Err(StartupError::InternalSetupError { entry: "A".into() })
        );
    }

    #[test]
    fn unknown_dependency_is_reported() {
        let mut mgr = StartupManager::new();
        mgr.register(FnEntry::new("A").depends_on("Missing")).unwrap();
        assert_eq!(
            mgr.initialise(),
            Err(StartupError::UnknownDependency {
                entry: "A".into(),
                dependency: "Missing".into(),
            })
        );
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut mgr = StartupManager::new();
        mgr.register(FnEntry::new("A")).unwrap();
        assert_eq!(
            mgr.register(FnEntry::new("A")),
            Err(StartupError::DuplicateEntry { name: "A".into() })
        );
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn init_failure_aborts_and_reports_reason() {
        let mut mgr = StartupManager::new();
        mgr.register(FnEntry::new("Ok")).unwrap();
        mgr.register(FnEntry::new("Bad").on_init(|| Err("no memory".into())))
            .unwrap();
        let err = mgr.initialise().unwrap_err();
        assert_eq!(
            err,
            StartupError::InitialisationError {
                entry: "Bad".into(),
                reason: "no memory".into(),
            }
        );
        assert!(mgr.is_initialised("Ok"));
        assert!(!mgr.is_initialised("Bad"));
    }

    #[test]
    fn teardown_is_reverse_of_completion() {
        let log = Log::default();
        let mut mgr = StartupManager::new();
        mgr.register(logged("C", &log).depends_on("B")).unwrap();
        mgr.register(logged("B", &log).depends_on("A")).unwrap();
        mgr.register(logged("A", &log)).unwrap();
        mgr.initialise().unwrap();
        log.lock().unwrap().clear();

        mgr.terminate().unwrap();
        assert_eq!(*log.lock().unwrap(), ["finish:C", "finish:B", "finish:A"]);
        assert!(!mgr.is_initialised("A"));
        assert_eq!(mgr.startup_order("A"), None);
    }

    #[test]
    fn teardown_continues_past_failures() {
        let log = Log::default();
        let mut mgr = StartupManager::new();
        mgr.register(logged("A", &log)).unwrap();
        mgr.register(FnEntry::new("B").on_finish(|| Err("busy".into())))
            .unwrap();
        mgr.initialise().unwrap();

        let failures = mgr.terminate().unwrap_err();
        assert_eq!(
            failures,
            [StartupError::FinishError {
                entry: "B".into(),
                reason: "busy".into(),
            }]
        );
        assert_eq!(*log.lock().unwrap(), ["init:A", "finish:A"]);
    }

    #[test]
    fn initialise_is_idempotent() {
        let count = Arc::new(Mutex::new(0));
        let c = Arc::clone(&count);
        let mut mgr = StartupManager::new();
        mgr.register(FnEntry::new("A").on_init(move || {
            *c.lock().unwrap() += 1;
            Ok(())
        }))
        .unwrap();
        mgr.initialise().unwrap();
        mgr.initialise().unwrap();
        assert_eq!(*count.lock().unwrap(), 1);
    }
}
