//! Growable linear byte arena.
//!
//! An [`Arena`] is a contiguous byte buffer with stack discipline: bytes are
//! pushed onto the end and popped off the end. When a push does not fit,
//! the buffer is reallocated to the next power of two above
//! `capacity + requested`, preserving its contents. Popped space is never
//! returned to the allocator, only reused by later pushes.
//!
//! Pushes return byte offsets, not pointers. An offset stays meaningful
//! across growth; a pointer would not.

use std::fmt;

use crate::error::MemoryError;
use crate::raw::{self, Block};
use crate::usage::{self, AllocationId, MemoryUsage};

/// A growable, stack-discipline byte buffer.
///
/// # Thread Safety
///
/// Not thread-safe. One owner per arena.
pub struct Arena {
    /// Backing storage, `raw::blocks_for(capacity)` blocks long.
    blocks: Vec<Block>,
    /// Logical capacity in bytes.
    capacity: usize,
    /// Bytes pushed and not yet popped.
    used: usize,
    usage: MemoryUsage,
    /// Registry entry; `Some` exactly when a buffer is owned.
    allocation: Option<AllocationId>,
}

impl Arena {
    /// An arena with no buffer. The first push or `create` allocates.
    pub const fn new() -> Self {
        Self {
            blocks: Vec::new(),
            capacity: 0,
            used: 0,
            usage: MemoryUsage::Any,
            allocation: None,
        }
    }

    /// Create an arena owning `size` zeroed bytes.
    pub fn with_capacity(size: usize, usage: MemoryUsage) -> Result<Self, MemoryError> {
        let mut arena = Self::new();
        arena.create(size, usage)?;
        Ok(arena)
    }

    /// Allocate the backing buffer.
    ///
    /// Fails if `size` is zero or the arena already owns a buffer.
    pub fn create(&mut self, size: usize, usage: MemoryUsage) -> Result<(), MemoryError> {
        if size == 0 {
            tracing::warn!(%usage, "attempting to create an arena with no size");
            return Err(MemoryError::ZeroSize);
        }
        if self.is_created() {
            tracing::warn!(usage = %self.usage, capacity = self.capacity, "arena is already created");
            return Err(MemoryError::AlreadyCreated {
                capacity: self.capacity,
            });
        }
        self.allocate(size, usage);
        Ok(())
    }

    /// Allocate without the recoverable checks.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or a buffer is already owned.
    pub(crate) fn allocate(&mut self, size: usize, usage: MemoryUsage) {
        assert!(size > 0, "arena allocation of 0 bytes");
        assert!(!self.is_created(), "arena is already created");
        self.blocks = vec![Block::ZERO; raw::blocks_for(size)];
        self.capacity = size;
        self.used = 0;
        self.usage = usage;
        self.allocation = Some(usage::register(usage, size));
    }

    /// Release the buffer. The arena can be created again afterwards.
    pub fn destroy(&mut self) {
        if let Some(id) = self.allocation.take() {
            usage::release(id);
        }
        self.blocks = Vec::new();
        self.capacity = 0;
        self.used = 0;
    }

    /// Reserve `size` bytes at the end of the arena and return their offset.
    ///
    /// Grows the buffer when needed. The returned bytes hold whatever was
    /// there before (zero if never written).
    ///
    /// # Panics
    ///
    /// Panics if the new size overflows `usize`.
    pub fn push_memory(&mut self, size: usize) -> usize {
        let end = self
            .used
            .checked_add(size)
            .unwrap_or_else(|| panic!("arena push of {size} bytes overflows"));
        if end > self.capacity {
            let requested = self.capacity + size;
            let new_capacity = requested
                .checked_add(1)
                .and_then(usize::checked_next_power_of_two)
                .unwrap_or_else(|| panic!("arena growth to {requested} bytes overflows"));
            self.grow_to(new_capacity);
        }
        let offset = self.used;
        self.used = end;
        offset
    }

    /// Push a copy of `bytes` and return its offset.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> usize {
        let offset = self.push_memory(bytes.len());
        self.region_mut(offset, bytes.len()).copy_from_slice(bytes);
        offset
    }

    /// Give back the last `size` pushed bytes.
    ///
    /// # Panics
    ///
    /// Panics if `size` exceeds the bytes in use.
    pub fn pop_memory(&mut self, size: usize) {
        assert!(
            size <= self.used,
            "attempting to pop {size} bytes, but the arena has used just {} bytes",
            self.used
        );
        self.used -= size;
    }

    /// Grow capacity by exactly `size` bytes without touching the cursor.
    pub fn increment_memory(&mut self, size: usize) {
        if size == 0 {
            tracing::warn!(usage = %self.usage, "attempting to increment arena memory by 0");
            return;
        }
        let new_capacity = self
            .capacity
            .checked_add(size)
            .unwrap_or_else(|| panic!("arena increment of {size} bytes overflows"));
        self.grow_to(new_capacity);
    }

    /// Forget every pushed byte. Capacity is kept.
    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Replace `other` with a byte-for-byte duplicate of this arena.
    ///
    /// `other` ends with the same capacity, usage and cursor. Copying an
    /// uncreated arena leaves `other` uncreated.
    pub fn copy_to(&self, other: &mut Arena) {
        other.destroy();
        if !self.is_created() {
            return;
        }
        other.allocate(self.capacity, self.usage);
        other.used = self.used;
        other.as_bytes_mut().copy_from_slice(self.as_bytes());
    }

    /// Bytes in use.
    pub fn size(&self) -> usize {
        self.used
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes that can be pushed before the next growth.
    pub fn remaining(&self) -> usize {
        self.capacity - self.used
    }

    /// Usage category this arena is charged to.
    pub fn usage(&self) -> MemoryUsage {
        self.usage
    }

    /// Whether a buffer is owned.
    pub fn is_created(&self) -> bool {
        self.allocation.is_some()
    }

    /// Registry id of the owned buffer.
    pub fn allocation_id(&self) -> Option<AllocationId> {
        self.allocation
    }

    /// The bytes in use.
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<Block, u8>(&self.blocks)[..self.used]
    }

    /// The bytes in use, mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let used = self.used;
        &mut bytemuck::cast_slice_mut::<Block, u8>(&mut self.blocks)[..used]
    }

    /// `len` bytes starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range reaches past the bytes in use.
    pub fn region(&self, offset: usize, len: usize) -> &[u8] {
        &self.as_bytes()[offset..offset + len]
    }

    /// `len` bytes starting at `offset`, mutably.
    ///
    /// # Panics
    ///
    /// Panics if the range reaches past the bytes in use.
    pub fn region_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        &mut self.as_bytes_mut()[offset..offset + len]
    }

    pub(crate) fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    fn grow_to(&mut self, new_capacity: usize) {
        let old_capacity = self.capacity;
        self.blocks.resize(raw::blocks_for(new_capacity), Block::ZERO);
        self.capacity = new_capacity;
        match self.allocation {
            Some(id) => usage::record_resize(id, new_capacity),
            None => self.allocation = Some(usage::register(self.usage, new_capacity)),
        }
        tracing::debug!(
            usage = %self.usage,
            old_capacity,
            new_capacity,
            "arena grown"
        );
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Arena {
    fn clone(&self) -> Self {
        let mut copy = Self::new();
        self.copy_to(&mut copy);
        copy
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("usage", &self.usage)
            .field("used", &self.used)
            .field("capacity", &self.capacity)
            .finish()
    }
}
