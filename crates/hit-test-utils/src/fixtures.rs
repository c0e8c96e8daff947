//! Element types for container tests.

use std::cell::Cell;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};

/// Shared count of [`DropCounter`] drops.
#[derive(Clone, Debug, Default)]
pub struct DropTally(Rc<Cell<usize>>);

impl DropTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a counter reporting to this tally.
    pub fn counter(&self, value: u32) -> DropCounter {
        DropCounter {
            value,
            tally: self.clone(),
        }
    }

    /// Number of counters dropped so far.
    pub fn drops(&self) -> usize {
        self.0.get()
    }
}

/// Element that bumps its [`DropTally`] when dropped.
///
/// Clones report to the same tally, so a clone that is dropped counts too.
#[derive(Clone, Debug)]
pub struct DropCounter {
    value: u32,
    tally: DropTally,
}

impl DropCounter {
    pub fn value(&self) -> u32 {
        self.value
    }
}

impl PartialEq for DropCounter {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Drop for DropCounter {
    fn drop(&mut self) {
        let drops = &self.tally.0;
        drops.set(drops.get() + 1);
    }
}

/// Per-instance record of a render pipeline.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    pub material: u32,
    pub flags: u32,
    pub tint: [f32; 4],
}

impl InstanceData {
    /// An instance whose every field is derived from `seed`.
    pub fn from_seed(seed: u32) -> Self {
        let f = seed as f32;
        Self {
            material: seed,
            flags: seed.rotate_left(7),
            tint: [f, f + 0.25, f + 0.5, 1.0],
        }
    }
}
