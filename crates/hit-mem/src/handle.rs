//! Generational handles.
//!
//! A [`Handle`] names a resource in a [`HandleList`](crate::HandleList) by
//! slot index and slot version. It owns nothing: when the resource is
//! removed the slot's version moves on, and every handle still carrying
//! the old version resolves to `None`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Weak reference to a `T` stored in a handle list.
///
/// Equality and hashing compare `(index, version)` only; the type
/// parameter merely keeps handles of different lists apart at compile time.
#[must_use]
pub struct Handle<T> {
    /// Slot index in the owning list.
    pub(crate) index: u32,
    /// Slot version at the time the handle was issued.
    pub(crate) version: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The handle that never resolves.
    pub const INVALID: Self = Self::new(u32::MAX, u32::MAX);

    pub(crate) const fn new(index: u32, version: u32) -> Self {
        Self {
            index,
            version,
            _marker: PhantomData,
        }
    }

    /// Slot index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Slot version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Whether neither field holds the `u32::MAX` sentinel.
    ///
    /// A valid handle may still be stale.
    pub fn is_valid(&self) -> bool {
        self.index != u32::MAX && self.version != u32::MAX
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.version == other.version
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.version.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::INVALID
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("index", &self.index)
            .field("version", &self.version)
            .finish()
    }
}

impl<T> fmt::Display for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Handle(idx={}, ver={})", self.index, self.version)
        } else {
            f.write_str("Handle(invalid)")
        }
    }
}
