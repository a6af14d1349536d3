//! Benchmark workloads for the Keel foundation layer.
//!
//! - [`filled_index`]: an index pre-populated to a given occupancy
//! - [`churn_plan`]: a seeded, reproducible sequence of stores and frees
//! - [`nested_regions`]: address ranges nested like real heap layouts

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use keel_index::{IndexConfig, MultiLevelIndex};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Index shape used by the reference workloads: fan-out 16, depth 4,
/// 65536 slots.
pub const REFERENCE_CONFIG: IndexConfig = IndexConfig {
    depth: 4,
    level_size_bits: 4,
};

/// A reference-shaped index holding `count` payloads, with their handles.
pub fn filled_index(count: u32) -> (MultiLevelIndex<u64>, Vec<u32>) {
    let mut index = MultiLevelIndex::new(REFERENCE_CONFIG).unwrap();
    let handles = (0..count)
        .map(|v| index.store(u64::from(v)).unwrap())
        .collect();
    (index, handles)
}

/// One step of a churn workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Churn {
    /// Store a new payload.
    Store,
    /// Free the live handle at this position (modulo the live count).
    Free(usize),
}

/// `steps` store/free operations drawn from a ChaCha8 stream seeded with
/// `seed`. Stores outnumber frees two to one so the index keeps growing.
pub fn churn_plan(seed: u64, steps: usize) -> Vec<Churn> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..steps)
        .map(|_| {
            let draw = rng.next_u32();
            if draw % 3 == 0 {
                Churn::Free((draw >> 2) as usize)
            } else {
                Churn::Store
            }
        })
        .collect()
}

/// Replay `plan` against `index`, returning the handles still live.
pub fn run_churn(index: &mut MultiLevelIndex<u64>, plan: &[Churn]) -> Vec<u32> {
    let mut live = Vec::new();
    for (i, step) in plan.iter().enumerate() {
        match *step {
            Churn::Store => {
                if let Ok(h) = index.store(i as u64) {
                    live.push(h);
                }
            }
            Churn::Free(at) if !live.is_empty() => {
                let h = live.swap_remove(at % live.len());
                let _ = index.free_index(h);
            }
            Churn::Free(_) => {}
        }
    }
    live
}

/// `count` address ranges, each strictly inside the previous one, as
/// `(first, last)` pairs starting from `[0x1000_0000, 0x1FFF_FFFF]`.
pub fn nested_regions(count: usize) -> Vec<(usize, usize)> {
    let mut first = 0x1000_0000usize;
    let mut last = 0x1FFF_FFFFusize;
    let mut regions = Vec::with_capacity(count);
    for _ in 0..count {
        regions.push((first, last));
        first += 0x10_0000;
        last -= 0x10_0000;
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn churn_plan_is_reproducible() {
        assert_eq!(churn_plan(7, 256), churn_plan(7, 256));
        assert_ne!(churn_plan(7, 256), churn_plan(8, 256));
    }

    #[test]
    fn churn_keeps_index_consistent() {
        let mut index = MultiLevelIndex::new(REFERENCE_CONFIG).unwrap();
        let live = run_churn(&mut index, &churn_plan(42, 4096));
        assert_eq!(index.len(), live.len() as u64);
        assert!(live.iter().all(|&h| index.contains(h)));
    }

    #[test]
    fn regions_nest() {
        let regions = nested_regions(16);
        for pair in regions.windows(2) {
            assert!(pair[1].0 > pair[0].0 && pair[1].1 < pair[0].1);
        }
    }
}
