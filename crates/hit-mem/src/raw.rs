//! Low-level primitives for arena memory operations.
//!
//! Arena buffers are `Vec<Block>` so the base address is always aligned to
//! [`ARENA_ALIGN`]. Typed element access goes through the `unsafe fn`s
//! below; each one states the invariant its caller must hold. Call sites
//! live in `typed.rs` and nowhere else.

#![allow(unsafe_code)]

use std::mem::{align_of, size_of};
use std::ptr;

use bytemuck::{Pod, Zeroable};

/// Alignment of every arena buffer base, in bytes.
pub(crate) const ARENA_ALIGN: usize = 16;

/// Unit of arena storage.
#[derive(Clone, Copy)]
#[repr(C, align(16))]
pub(crate) struct Block([u8; ARENA_ALIGN]);

impl Block {
    pub(crate) const ZERO: Self = Self([0; ARENA_ALIGN]);
}

// SAFETY: `Block` is a byte array whose size equals its alignment, so it
// has no padding and the all-zero pattern is valid.
unsafe impl Zeroable for Block {}
// SAFETY: as above; every bit pattern of `[u8; 16]` is valid and the type
// holds no pointers.
unsafe impl Pod for Block {}

/// Number of blocks needed to hold `bytes` bytes.
pub(crate) const fn blocks_for(bytes: usize) -> usize {
    bytes.div_ceil(ARENA_ALIGN)
}

/// Panics unless `T` can live in arena memory.
pub(crate) fn assert_storable<T>() {
    assert!(
        size_of::<T>() > 0,
        "zero-sized element types cannot be stored in an arena"
    );
    assert!(
        align_of::<T>() <= ARENA_ALIGN,
        "element alignment {} exceeds arena alignment {ARENA_ALIGN}",
        align_of::<T>()
    );
}

fn debug_check_bounds<T>(blocks: &[Block], end: usize) {
    debug_assert!(
        end * size_of::<T>() <= blocks.len() * ARENA_ALIGN,
        "element range ends at {end}, buffer holds {} bytes",
        blocks.len() * ARENA_ALIGN
    );
}

/// Move `value` into element slot `index`.
///
/// # Safety
///
/// `T` must satisfy [`assert_storable`], slot `index` must lie inside
/// `blocks`, and it must not currently hold a live value (it would leak).
pub(crate) unsafe fn write<T>(blocks: &mut [Block], index: usize, value: T) {
    debug_check_bounds::<T>(blocks, index + 1);
    // SAFETY: in bounds per the caller; the base is ARENA_ALIGN-aligned and
    // `size_of::<T>()` is a multiple of `align_of::<T>()`, so every element
    // slot is aligned.
    unsafe { blocks.as_mut_ptr().cast::<T>().add(index).write(value) }
}

/// Move the value out of element slot `index`, leaving the slot dead.
///
/// # Safety
///
/// Slot `index` must hold a live `T`. After the call the caller must treat
/// the slot as uninitialised.
pub(crate) unsafe fn read<T>(blocks: &[Block], index: usize) -> T {
    debug_check_bounds::<T>(blocks, index + 1);
    // SAFETY: the slot is live and aligned per the caller.
    unsafe { blocks.as_ptr().cast::<T>().add(index).read() }
}

/// Bitwise-move slot `from` into slot `to`; `from` becomes dead.
///
/// # Safety
///
/// `from` must hold a live `T`, `to` must be dead, and `from != to`.
pub(crate) unsafe fn relocate<T>(blocks: &mut [Block], from: usize, to: usize) {
    debug_check_bounds::<T>(blocks, from.max(to) + 1);
    debug_assert_ne!(from, to);
    let base = blocks.as_mut_ptr().cast::<T>();
    // SAFETY: both slots are in bounds and distinct, so they do not overlap.
    unsafe { ptr::copy_nonoverlapping(base.add(from), base.add(to), 1) }
}

/// Drop `len` live elements starting at `start`.
///
/// # Safety
///
/// Every slot in `start..start + len` must hold a live `T`; afterwards they
/// are dead.
pub(crate) unsafe fn drop_range<T>(blocks: &mut [Block], start: usize, len: usize) {
    debug_check_bounds::<T>(blocks, start + len);
    let base = blocks.as_mut_ptr().cast::<T>();
    // SAFETY: the range is live and aligned per the caller.
    unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(base.add(start), len)) }
}

/// View the first `len` elements.
///
/// # Safety
///
/// Slots `0..len` must hold live values.
pub(crate) unsafe fn elements<T>(blocks: &[Block], len: usize) -> &[T] {
    debug_check_bounds::<T>(blocks, len);
    // SAFETY: live, aligned and in bounds per the caller. An empty `Vec`
    // yields a dangling pointer aligned to `Block`, valid for `len == 0`.
    unsafe { std::slice::from_raw_parts(blocks.as_ptr().cast::<T>(), len) }
}

/// Mutable view of the first `len` elements.
///
/// # Safety
///
/// Same as [`elements`].
pub(crate) unsafe fn elements_mut<T>(blocks: &mut [Block], len: usize) -> &mut [T] {
    debug_check_bounds::<T>(blocks, len);
    // SAFETY: see `elements`; the `&mut` borrow of `blocks` is exclusive.
    unsafe { std::slice::from_raw_parts_mut(blocks.as_mut_ptr().cast::<T>(), len) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_round_up() {
        assert_eq!(blocks_for(0), 0);
        assert_eq!(blocks_for(1), 1);
        assert_eq!(blocks_for(16), 1);
        assert_eq!(blocks_for(17), 2);
    }

    #[test]
    fn block_layout_is_aligned_bytes() {
        assert_eq!(size_of::<Block>(), ARENA_ALIGN);
        assert_eq!(align_of::<Block>(), ARENA_ALIGN);
    }

    #[test]
    #[should_panic(expected = "zero-sized")]
    fn zero_sized_types_rejected() {
        assert_storable::<()>();
    }

    #[test]
    #[should_panic(expected = "exceeds arena alignment")]
    fn over_aligned_types_rejected() {
        #[repr(align(32))]
        struct Wide(#[allow(dead_code)] u8);
        assert_storable::<Wide>();
    }

    #[test]
    fn write_then_read_moves_value() {
        let mut blocks = vec![Block::ZERO; 4];
        // SAFETY: slot 1 of a `String` array ends at byte 48 of a 64-byte
        // buffer; it is written before it is read, and read exactly once.
        unsafe {
            write(&mut blocks, 1, String::from("slot"));
            let back: String = read(&blocks, 1);
            assert_eq!(back, "slot");
        }
    }
}
