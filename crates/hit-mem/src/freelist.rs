//! Offset/size sub-allocator with coalescing.
//!
//! [`FreelistCore`] manages the byte range `[0, total_size)` of some
//! external buffer. It never touches memory; it only decides which
//! offsets are handed out. Free space is kept as disjoint ranges indexed
//! twice: by offset (for coalescing on release) and by `(size, offset)`
//! (for best-fit lookup on allocation). The range produced by the latest
//! release is remembered, and the next allocation takes it first if it
//! fits, so a release followed by an allocation of the same size lands
//! back in the released space.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::MemoryError;

/// Free-range allocator over an abstract `[0, total_size)` region.
///
/// Invariants, after every operation:
/// - free ranges are disjoint and never adjacent (adjacent ranges merge);
/// - `used + sum(free range sizes) == total_size`.
#[derive(Clone, Debug)]
pub struct FreelistCore {
    /// Free ranges: offset -> size.
    by_offset: BTreeMap<u64, u64>,
    /// Free ranges as `(size, offset)`.
    by_size: BTreeSet<(u64, u64)>,
    total_size: u64,
    used: u64,
    /// Start of the free range the latest `pop_size` produced. Consumed by
    /// the next `push_size`.
    recent: Option<u64>,
}

impl FreelistCore {
    /// Size managed by [`FreelistCore::default`].
    pub const DEFAULT_SIZE: u64 = 8;

    /// Manage `total_size` bytes, all free.
    pub fn new(total_size: u64) -> Self {
        let mut core = Self {
            by_offset: BTreeMap::new(),
            by_size: BTreeSet::new(),
            total_size,
            used: 0,
            recent: None,
        };
        core.insert_range(0, total_size);
        core
    }

    /// Reserve `size` bytes and return their offset.
    ///
    /// Takes the range left by the immediately preceding
    /// [`pop_size`](Self::pop_size) when it fits. Otherwise picks the
    /// smallest free range that fits (lowest offset on ties). The
    /// remainder of the chosen range goes back to the free set.
    pub fn push_size(&mut self, size: u64) -> Result<u64, MemoryError> {
        let recent = self.recent.take();
        if size == 0 {
            tracing::warn!("attempting to allocate 0 bytes from a free list");
            return Err(MemoryError::ZeroSize);
        }
        let released = recent
            .and_then(|start| self.by_offset.get(&start).map(|&len| (len, start)))
            .filter(|&(len, _)| len >= size);
        let best_fit = || self.by_size.range((size, 0)..).next().copied();
        let Some((range_size, offset)) = released.or_else(best_fit) else {
            let largest_free = self.largest_free_range();
            tracing::warn!(size, largest_free, "can't find space in free list");
            return Err(MemoryError::OutOfSpace {
                requested: size,
                largest_free,
            });
        };
        self.remove_range(offset, range_size);
        self.insert_range(offset + size, range_size - size);
        self.used += size;
        Ok(offset)
    }

    /// Return `[offset, offset + size)` to the free set, merging it with
    /// free neighbours on either side.
    ///
    /// The range need not match an earlier `push_size` exactly; any part
    /// of used space may be released.
    pub fn pop_size(&mut self, size: u64, offset: u64) -> Result<(), MemoryError> {
        let end = match offset.checked_add(size) {
            Some(end) if size > 0 && end <= self.total_size => end,
            _ => {
                tracing::warn!(offset, size, total = self.total_size, "invalid free list range");
                return Err(MemoryError::InvalidRange {
                    offset,
                    size,
                    total: self.total_size,
                });
            }
        };

        // The last free range starting before `end` overlaps the released
        // range iff any free range does.
        if let Some((&free_offset, &free_size)) = self.by_offset.range(..end).next_back() {
            if free_offset + free_size > offset {
                tracing::warn!(offset, size, "attempting to release free space");
                return Err(MemoryError::DoubleFree { offset, size });
            }
        }

        let mut start = offset;
        let mut len = size;
        if let Some((&prev_offset, &prev_size)) = self.by_offset.range(..offset).next_back() {
            if prev_offset + prev_size == offset {
                self.remove_range(prev_offset, prev_size);
                start = prev_offset;
                len += prev_size;
            }
        }
        if let Some(&next_size) = self.by_offset.get(&end) {
            self.remove_range(end, next_size);
            len += next_size;
        }
        self.insert_range(start, len);
        self.recent = Some(start);
        self.used -= size;
        Ok(())
    }

    /// Grow the managed region to `new_size` bytes.
    ///
    /// The added space extends the trailing free range, or becomes a new
    /// one if the tail is in use. Shrinking is rejected.
    pub fn resize(&mut self, new_size: u64) -> Result<(), MemoryError> {
        if new_size < self.total_size {
            tracing::warn!(
                current = self.total_size,
                requested = new_size,
                "can't shrink a free list"
            );
            return Err(MemoryError::ShrinkRejected {
                current: self.total_size,
                requested: new_size,
            });
        }
        let added = new_size - self.total_size;
        if added == 0 {
            return Ok(());
        }
        match self.by_offset.last_key_value().map(|(&o, &s)| (o, s)) {
            Some((offset, size)) if offset + size == self.total_size => {
                self.remove_range(offset, size);
                self.insert_range(offset, size + added);
            }
            _ => self.insert_range(self.total_size, added),
        }
        self.total_size = new_size;
        Ok(())
    }

    /// Free everything.
    pub fn clear(&mut self) {
        self.by_offset.clear();
        self.by_size.clear();
        self.insert_range(0, self.total_size);
        self.used = 0;
        self.recent = None;
    }

    /// Bytes not in use.
    pub fn free_space(&self) -> u64 {
        self.total_size - self.used
    }

    /// Alias of [`free_space`](Self::free_space).
    pub fn get_free_space(&self) -> u64 {
        self.free_space()
    }

    /// Bytes in use.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Size of the managed region.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Free ranges as `(offset, size)`, in offset order.
    pub fn free_ranges(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.by_offset.iter().map(|(&offset, &size)| (offset, size))
    }

    /// Number of free ranges.
    pub fn free_range_count(&self) -> usize {
        self.by_offset.len()
    }

    /// Size of the largest free range, 0 when nothing is free.
    pub fn largest_free_range(&self) -> u64 {
        self.by_size.last().map_or(0, |&(size, _)| size)
    }

    fn insert_range(&mut self, offset: u64, size: u64) {
        if size == 0 {
            return;
        }
        self.by_offset.insert(offset, size);
        self.by_size.insert((size, offset));
    }

    fn remove_range(&mut self, offset: u64, size: u64) {
        self.by_offset.remove(&offset);
        self.by_size.remove(&(size, offset));
    }
}

impl Default for FreelistCore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}
