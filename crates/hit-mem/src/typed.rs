//! Typed element arenas.
//!
//! [`TypedArena`] layers element semantics over an [`Arena`]: elements are
//! pushed and popped at the end, indexed densely from zero, and the
//! element-capacity grows by the pushed count plus a quarter of the current
//! capacity whenever a push does not fit.
//!
//! The construction discipline `D` decides what popping and cloning mean.
//! [`Constructed`] arenas own their elements and drop them; [`Trivial`]
//! arenas hold `Pod` data and only move the cursor. Both share every line
//! of the push/pop/index code below.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::ops::{Index, IndexMut};

use bytemuck::Pod;

use crate::arena::Arena;
use crate::error::MemoryError;
use crate::raw;
use crate::usage::MemoryUsage;

/// Capacity growth on overflow is `count + capacity / GROWTH_DIVISOR`.
pub const GROWTH_DIVISOR: usize = 4;

/// Bytes taken by `count` values of `T`.
fn byte_len<T>(count: usize) -> usize {
    count
        .checked_mul(size_of::<T>())
        .unwrap_or_else(|| panic!("TypedArena of {count} elements overflows"))
}

mod sealed {
    pub trait Sealed {}
}

/// How a [`TypedArena`] treats element lifetimes.
///
/// Sealed: the two disciplines are [`Constructed`] and [`Trivial`].
pub trait Discipline<T>: sealed::Sealed {
    /// Whether popped, cleared or remaining elements must be dropped.
    const DROPS_ELEMENTS: bool;
}

/// Elements are owned values: dropped on pop, clear and drop; cloned one
/// by one.
#[derive(Debug)]
pub enum Constructed {}

/// Elements are plain bytes: popping only moves the cursor and cloning
/// copies the buffer.
#[derive(Debug)]
pub enum Trivial {}

impl sealed::Sealed for Constructed {}
impl sealed::Sealed for Trivial {}

impl<T> Discipline<T> for Constructed {
    const DROPS_ELEMENTS: bool = std::mem::needs_drop::<T>();
}

impl<T: Pod> Discipline<T> for Trivial {
    const DROPS_ELEMENTS: bool = false;
}

/// A [`TypedArena`] of plain-old-data elements.
pub type FastTypedArena<T> = TypedArena<T, Trivial>;

/// A densely packed, growable array of `T` stored in an [`Arena`].
///
/// An arena starts uncreated; [`create`](Self::create) (or
/// [`with_capacity`](Self::with_capacity)) must run before the first push.
///
/// Invariant: `len <= capacity` and the arena holds exactly
/// `len * size_of::<T>()` used bytes, all of them live elements.
pub struct TypedArena<T, D: Discipline<T> = Constructed> {
    arena: Arena,
    /// Live elements.
    len: usize,
    /// Element slots reserved in `arena`.
    capacity: usize,
    _marker: PhantomData<(T, fn() -> D)>,
}

impl<T, D: Discipline<T>> TypedArena<T, D> {
    /// An uncreated arena.
    pub const fn new() -> Self {
        Self {
            arena: Arena::new(),
            len: 0,
            capacity: 0,
            _marker: PhantomData,
        }
    }

    /// Create an arena with room for `capacity` elements.
    pub fn with_capacity(capacity: usize, usage: MemoryUsage) -> Result<Self, MemoryError> {
        let mut typed = Self::new();
        typed.create(capacity, usage)?;
        Ok(typed)
    }

    /// Reserve room for `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or aligned above 16 bytes, or if
    /// `capacity` elements overflow `usize` bytes.
    pub fn create(&mut self, capacity: usize, usage: MemoryUsage) -> Result<(), MemoryError> {
        raw::assert_storable::<T>();
        self.arena.create(byte_len::<T>(capacity), usage)?;
        self.capacity = capacity;
        self.len = 0;
        Ok(())
    }

    pub(crate) fn allocate(capacity: usize, usage: MemoryUsage) -> Self {
        raw::assert_storable::<T>();
        let mut typed = Self::new();
        typed.arena.allocate(byte_len::<T>(capacity), usage);
        typed.capacity = capacity;
        typed
    }

    /// Drop every element and release the buffer.
    pub fn destroy(&mut self) {
        self.clear();
        self.arena.destroy();
        self.capacity = 0;
    }

    /// Add room for `count` more elements.
    ///
    /// # Panics
    ///
    /// Panics if the arena was never created, or if the new capacity
    /// overflows `usize` bytes.
    pub fn reserve_space(&mut self, count: usize) {
        assert!(
            self.capacity > 0,
            "can't reserve space in a TypedArena that is not created"
        );
        let capacity = self
            .capacity
            .checked_add(count)
            .unwrap_or_else(|| panic!("TypedArena capacity overflows"));
        if byte_len::<T>(capacity) > self.arena.capacity() {
            self.arena.increment_memory(byte_len::<T>(count));
        }
        self.capacity = capacity;
    }

    /// Construct an element in place at the end and return it.
    ///
    /// # Panics
    ///
    /// Panics if the arena was never created.
    pub fn emplace_back(&mut self, make: impl FnOnce() -> T) -> &mut T {
        let index = self.push_back(make());
        &mut self.data_mut()[index]
    }

    /// Move `value` to the end and return its index.
    ///
    /// # Panics
    ///
    /// Panics if the arena was never created.
    pub fn push_back(&mut self, value: T) -> usize {
        self.make_room(1);
        self.push_reserved(value)
    }

    /// Drop the last element.
    ///
    /// # Panics
    ///
    /// Panics if the arena is empty.
    pub fn pop_back(&mut self) {
        assert!(
            self.len > 0,
            "attempting to pop an element from an empty TypedArena"
        );
        self.pop_array_back(1);
    }

    /// Move the last element out, or `None` when empty.
    pub fn take_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        self.arena.pop_memory(size_of::<T>());
        // SAFETY: slot `len` held the last live element; it is now past the
        // end and is read exactly once.
        Some(unsafe { raw::read(self.arena.blocks(), self.len) })
    }

    /// Move element `index` out, filling its slot with the last element.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn swap_remove(&mut self, index: usize) -> T {
        self.check_index(index);
        let last = self.len - 1;
        self.len = last;
        self.arena.pop_memory(size_of::<T>());
        let blocks = self.arena.blocks_mut();
        // SAFETY: `index` is live. Once read it is dead, so moving the live
        // last element into it leaves every slot below `last` live.
        unsafe {
            let value = raw::read(blocks, index);
            if index != last {
                raw::relocate::<T>(blocks, last, index);
            }
            value
        }
    }

    /// Drop the last `count` elements.
    ///
    /// # Panics
    ///
    /// Panics if `count > len`.
    pub fn pop_array_back(&mut self, count: usize) {
        assert!(
            count <= self.len,
            "attempting to pop {count} elements from a TypedArena holding {}",
            self.len
        );
        let start = self.len - count;
        self.len = start;
        self.arena.pop_memory(count * size_of::<T>());
        if D::DROPS_ELEMENTS {
            // SAFETY: `start..start + count` were the live tail; `len` was
            // lowered first so a panicking drop cannot cause a second drop.
            unsafe { raw::drop_range::<T>(self.arena.blocks_mut(), start, count) }
        }
    }

    /// Drop every element. Capacity is kept.
    pub fn clear(&mut self) {
        self.pop_array_back(self.len);
    }

    /// Element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn get(&self, index: usize) -> &T {
        self.check_index(index);
        &self.data()[index]
    }

    /// Element at `index`, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn get_mut(&mut self, index: usize) -> &mut T {
        self.check_index(index);
        &mut self.data_mut()[index]
    }

    /// Live elements.
    pub fn data(&self) -> &[T] {
        // SAFETY: slots `0..len` are live.
        unsafe { raw::elements(self.arena.blocks(), self.len) }
    }

    /// Live elements, mutably.
    pub fn data_mut(&mut self) -> &mut [T] {
        let len = self.len;
        // SAFETY: slots `0..len` are live.
        unsafe { raw::elements_mut(self.arena.blocks_mut(), len) }
    }

    /// Iterate over live elements.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data().iter()
    }

    /// Iterate mutably over live elements.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data_mut().iter_mut()
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Alias of [`len`](Self::len).
    pub fn size(&self) -> usize {
        self.len
    }

    /// Whether there are no live elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element slots reserved.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Usage category of the backing arena.
    pub fn usage(&self) -> MemoryUsage {
        self.arena.usage()
    }

    /// Whether the backing arena has been created.
    pub fn is_created(&self) -> bool {
        self.capacity > 0
    }

    fn check_index(&self, index: usize) {
        assert!(
            index < self.len,
            "invalid TypedArena index {index}, length is {}",
            self.len
        );
    }

    /// Make sure `count` more elements fit, growing by
    /// `count + capacity / GROWTH_DIVISOR` if not.
    fn make_room(&mut self, count: usize) {
        assert!(
            self.capacity > 0,
            "attempting to push into a TypedArena that is not created"
        );
        if self.len.saturating_add(count) > self.capacity {
            self.reserve_space(count.saturating_add(self.capacity / GROWTH_DIVISOR));
        }
    }

    /// Push into a slot already covered by `capacity`.
    fn push_reserved(&mut self, value: T) -> usize {
        debug_assert!(self.len < self.capacity);
        let index = self.len;
        self.arena.push_memory(size_of::<T>());
        // SAFETY: `index < capacity`, so the slot lies inside the buffer, and
        // it is past the live range so it holds no value.
        unsafe { raw::write(self.arena.blocks_mut(), index, value) }
        self.len += 1;
        index
    }
}

impl<T: Default> TypedArena<T, Constructed> {
    /// Append `count` default-constructed elements and return them.
    ///
    /// # Panics
    ///
    /// Panics if the arena was never created.
    pub fn push_array(&mut self, count: usize) -> &mut [T] {
        self.make_room(count);
        let start = self.len;
        for _ in 0..count {
            self.push_reserved(T::default());
        }
        &mut self.data_mut()[start..]
    }
}

impl<T: Pod> TypedArena<T, Trivial> {
    /// Append `count` elements and return them.
    ///
    /// The elements hold whatever bytes the buffer already had there: zero
    /// for never-written space, stale values for previously popped space.
    ///
    /// # Panics
    ///
    /// Panics if the arena was never created.
    pub fn push_array(&mut self, count: usize) -> &mut [T] {
        self.make_room(count);
        let start = self.len;
        self.arena.push_memory(byte_len::<T>(count));
        self.len += count;
        &mut self.data_mut()[start..]
    }

    /// Append a copy of `values` and return the index of the first.
    pub fn extend_from_slice(&mut self, values: &[T]) -> usize {
        let start = self.len;
        self.push_array(values.len()).copy_from_slice(values);
        start
    }

    /// Live elements as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.data())
    }
}

impl<T, D: Discipline<T>> Default for TypedArena<T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D: Discipline<T>> Drop for TypedArena<T, D> {
    fn drop(&mut self) {
        if D::DROPS_ELEMENTS {
            let len = std::mem::take(&mut self.len);
            // SAFETY: slots `0..len` are live; `len` is zeroed first.
            unsafe { raw::drop_range::<T>(self.arena.blocks_mut(), 0, len) }
        }
    }
}

impl<T: Clone> Clone for TypedArena<T, Constructed> {
    fn clone(&self) -> Self {
        if !self.is_created() {
            return Self::new();
        }
        let mut copy = Self::allocate(self.capacity, self.usage());
        for value in self.iter() {
            copy.push_reserved(value.clone());
        }
        copy
    }
}

impl<T: Pod> Clone for TypedArena<T, Trivial> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena.clone(),
            len: self.len,
            capacity: self.capacity,
            _marker: PhantomData,
        }
    }
}

impl<T, D: Discipline<T>> Index<usize> for TypedArena<T, D> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        self.get(index)
    }
}

impl<T, D: Discipline<T>> IndexMut<usize> for TypedArena<T, D> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.get_mut(index)
    }
}

impl<'a, T, D: Discipline<T>> IntoIterator for &'a TypedArena<T, D> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, D: Discipline<T>> fmt::Debug for TypedArena<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
