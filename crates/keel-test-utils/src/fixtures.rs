//! Reusable payload and startup fixtures.
//!
//! - [`DropCounter`] / [`Tracked`]: payloads that count their drops, for
//!   checking that index structures release exactly what they hold.
//! - [`recording_entry`]: a startup entry that logs its hooks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use keel_startup::FnEntry;

/// Shared count of dropped [`Tracked`] values.
#[derive(Clone, Debug, Default)]
pub struct DropCounter(Arc<AtomicUsize>);

impl DropCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a payload carrying `id` that bumps this counter when dropped.
    pub fn track(&self, id: u64) -> Tracked {
        Tracked {
            id,
            counter: Arc::clone(&self.0),
        }
    }

    pub fn dropped(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// A payload that records its own drop.
#[derive(Debug)]
pub struct Tracked {
    pub id: u64,
    counter: Arc<AtomicUsize>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shared log of hook invocations, as `"init:Name"` / `"finish:Name"`.
pub type HookLog = Arc<Mutex<Vec<String>>>;

/// A startup entry named `name` that appends to `log` from both hooks.
pub fn recording_entry(name: &str, log: &HookLog) -> FnEntry {
    let init_log = Arc::clone(log);
    let finish_log = Arc::clone(log);
    let init_msg = format!("init:{name}");
    let finish_msg = format!("finish:{name}");
    FnEntry::new(name)
        .on_init(move || {
            push(&init_log, &init_msg);
            Ok(())
        })
        .on_finish(move || {
            push(&finish_log, &finish_msg);
            Ok(())
        })
}

fn push(log: &HookLog, msg: &str) {
    if let Ok(mut entries) = log.lock() {
        entries.push(msg.to_string());
    }
}

/// Snapshot of a hook log.
pub fn entries(log: &HookLog) -> Vec<String> {
    log.lock().map(|e| e.clone()).unwrap_or_default()
}
