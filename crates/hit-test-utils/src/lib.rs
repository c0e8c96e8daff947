//! Test fixtures for Hit memory development.
//!
//! - [`DropTally`] / [`DropCounter`]: an element type whose drops are
//!   counted, for checking that constructing containers destroy exactly
//!   what they own.
//! - [`InstanceData`]: a plain-old-data record shaped like a render
//!   pipeline instance, for the non-constructing containers.
//! - [`seeded_rng`]: deterministic randomness for scenario tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{DropCounter, DropTally, InstanceData};

use rand_chacha::rand_core::SeedableRng;
pub use rand_chacha::ChaCha8Rng;

/// A ChaCha8 generator seeded from `seed`.
///
/// The same seed yields the same sequence on every platform, so failures
/// in randomized scenarios reproduce.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Uniform index in `0..bound` drawn from `rng`.
///
/// # Panics
///
/// Panics if `bound` is zero.
pub fn pick_index(rng: &mut ChaCha8Rng, bound: usize) -> usize {
    use rand_chacha::rand_core::RngCore;
    assert!(bound > 0, "cannot pick from an empty range");
    (rng.next_u64() % bound as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = seeded_rng(7);
        let mut b = seeded_rng(7);
        for _ in 0..16 {
            assert_eq!(pick_index(&mut a, 1000), pick_index(&mut b, 1000));
        }
    }

    #[test]
    fn pick_stays_in_bounds() {
        let mut rng = seeded_rng(1);
        for bound in 1..50 {
            assert!(pick_index(&mut rng, bound) < bound);
        }
    }
}
