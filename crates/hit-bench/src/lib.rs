//! Benchmark workloads for the Hit memory primitives.
//!
//! Workloads are generated up front from a seed so that every benchmark
//! iteration replays the same operations and the RNG stays out of the
//! measured loop:
//!
//! - [`removal_order`]: which live handle to remove at each step
//! - [`allocation_sizes`]: free list request sizes in a bounded range

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Resource count used by the handle list benchmarks.
pub const HANDLE_LIST_SIZE: usize = 10_000;

/// Region size used by the free list benchmarks.
pub const FREELIST_REGION: u64 = 1 << 20;

/// For step `i` of `count` removals from a list that starts with `live`
/// entries, a position in `0..live - i`.
///
/// # Panics
///
/// Panics if `count > live`.
pub fn removal_order(live: usize, count: usize, seed: u64) -> Vec<usize> {
    assert!(count <= live, "cannot remove {count} of {live} entries");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|i| (rng.next_u64() % (live - i) as u64) as usize)
        .collect()
}

/// `count` allocation sizes in `1..=max`.
pub fn allocation_sizes(count: usize, max: u64, seed: u64) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count).map(|_| 1 + rng.next_u64() % max).collect()
}
