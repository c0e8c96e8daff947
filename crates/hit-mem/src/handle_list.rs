//! Generational slot map.
//!
//! A [`HandleList`] stores resources densely in a [`TypedArena`] and hands
//! out [`Handle`]s that stay stable while the resources move. Insert,
//! remove and lookup are O(1):
//!
//! - **add**: push the resource, bind a slot to its index, return the
//!   slot's `(index, version)`.
//! - **remove**: bump the slot's version, then swap-remove the resource and
//!   retarget the slot of the resource that moved.
//! - **get**: compare versions, then index the resource arena.

use std::fmt;

use crate::config::HandleListConfig;
use crate::error::MemoryError;
use crate::handle::Handle;
use crate::slot::SlotTable;
use crate::typed::{Constructed, Discipline, Trivial, TypedArena};

/// A [`HandleList`] of plain-old-data resources.
pub type FastHandleList<T> = HandleList<T, Trivial>;

/// Densely packed resources addressed by generational handles.
///
/// Removing a resource may move another one in storage; its handle keeps
/// resolving to the same value. A removed resource's handle resolves to
/// `None` forever after, even once its slot is reused.
///
/// # Thread Safety
///
/// Not thread-safe. One owner per list.
pub struct HandleList<T, D: Discipline<T> = Constructed> {
    resources: TypedArena<T, D>,
    slots: SlotTable,
}

impl<T, D: Discipline<T>> HandleList<T, D> {
    /// A list with room for
    /// [`DEFAULT_INITIAL_CAPACITY`](HandleListConfig::DEFAULT_INITIAL_CAPACITY)
    /// resources.
    pub fn new() -> Self {
        Self::allocate(&HandleListConfig::default())
    }

    /// A list with room for `capacity` resources.
    pub fn with_capacity(capacity: usize) -> Result<Self, MemoryError> {
        Self::with_config(HandleListConfig::new(capacity))
    }

    /// A list built from a validated `config`.
    pub fn with_config(config: HandleListConfig) -> Result<Self, MemoryError> {
        config.validate()?;
        Ok(Self::allocate(&config))
    }

    fn allocate(config: &HandleListConfig) -> Self {
        Self {
            resources: TypedArena::allocate(config.initial_capacity, config.resource_usage),
            slots: SlotTable::new(config.initial_capacity, config.slot_usage),
        }
    }

    /// Construct a resource from `make` and return its handle.
    pub fn emplace(&mut self, make: impl FnOnce() -> T) -> Handle<T> {
        self.add(make())
    }

    /// Store `value` and return its handle.
    pub fn add(&mut self, value: T) -> Handle<T> {
        let resource = self.resources.len() as u32;
        let (index, version) = self.slots.occupy(resource);
        self.resources.push_back(value);
        tracing::trace!(index, version, "handle issued");
        Handle::new(index, version)
    }

    /// Remove and return the resource `handle` names.
    ///
    /// Returns `None` for a stale or invalid handle, leaving the list
    /// untouched.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let resource = self.slots.resolve(handle.index, handle.version)?;
        let value = if self.slots.last() == Some(handle.index) {
            self.slots.vacate_tail(handle.index);
            self.resources.take_back()
        } else {
            self.slots.vacate_relocating_tail(handle.index);
            Some(self.resources.swap_remove(resource as usize))
        };
        tracing::trace!(index = handle.index, version = handle.version, "handle released");
        value
    }

    /// The resource `handle` names, or `None` if stale or invalid.
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        let resource = self.slots.resolve(handle.index, handle.version)?;
        Some(&self.resources[resource as usize])
    }

    /// The resource `handle` names, mutably.
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let resource = self.slots.resolve(handle.index, handle.version)?;
        Some(&mut self.resources[resource as usize])
    }

    /// Whether `handle` currently names a resource.
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.slots.resolve(handle.index, handle.version).is_some()
    }

    /// Number of live resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Alias of [`len`](Self::len).
    pub fn size(&self) -> usize {
        self.resources.len()
    }

    /// Whether there are no live resources.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Live resources in storage order.
    ///
    /// Storage order changes on removal and says nothing about handles.
    pub fn data(&self) -> &[T] {
        self.resources.data()
    }

    /// Live resources in storage order, mutably.
    pub fn data_mut(&mut self) -> &mut [T] {
        self.resources.data_mut()
    }

    /// Iterate over live resources in storage order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.resources.iter()
    }

    /// Remove every resource and forget every slot.
    ///
    /// Slot versions restart from zero, so handles issued before a reset
    /// must not be used after it: they may resolve to new resources.
    pub fn reset(&mut self) {
        tracing::debug!(
            resources = self.resources.len(),
            slots = self.slots.len(),
            free_slots = self.slots.free_count(),
            "handle list reset"
        );
        self.resources.clear();
        self.slots.clear();
    }
}

impl<T, D: Discipline<T>> Default for HandleList<T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D: Discipline<T>> Clone for HandleList<T, D>
where
    TypedArena<T, D>: Clone,
{
    fn clone(&self) -> Self {
        Self {
            resources: self.resources.clone(),
            slots: self.slots.clone(),
        }
    }
}

impl<T: fmt::Debug, D: Discipline<T>> fmt::Debug for HandleList<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleList")
            .field("resources", &self.resources)
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::{self, MemoryUsage};
    use hit_test_utils::{DropTally, InstanceData};

    #[test]
    fn add_then_get() {
        let mut list: HandleList<String> = HandleList::new();
        let a = list.add("alpha".into());
        let b = list.emplace(|| "beta".into());
        assert_eq!(list.get(a).map(String::as_str), Some("alpha"));
        assert_eq!(list.get(b).map(String::as_str), Some("beta"));
        assert_eq!(list.len(), 2);
        list.slots.assert_consistent(2);
    }

    #[test]
    fn removed_handle_goes_stale() {
        let mut list: HandleList<u32> = HandleList::new();
        let h = list.add(7);
        assert_eq!(list.remove(h), Some(7));
        assert_eq!(list.get(h), None);
        assert!(!list.contains(h));
        assert_eq!(list.remove(h), None);
        assert!(list.is_empty());
    }

    #[test]
    fn reused_slot_gets_new_version() {
        let mut list: HandleList<u32> = HandleList::new();
        let old = list.add(1);
        list.remove(old);
        let new = list.add(2);
        assert_eq!(new.index(), old.index());
        assert_ne!(new.version(), old.version());
        assert_eq!(list.get(old), None);
        assert_eq!(list.get(new), Some(&2));
    }

    #[test]
    fn remove_middle_keeps_other_values() {
        let mut list: HandleList<String> = HandleList::with_capacity(2).unwrap();
        let handles: Vec<_> = (0..5).map(|i| list.add(i.to_string())).collect();
        assert_eq!(list.remove(handles[1]).as_deref(), Some("1"));
        assert_eq!(list.remove(handles[0]).as_deref(), Some("0"));
        for (i, &h) in handles.iter().enumerate().skip(2) {
            assert_eq!(list.get(h), Some(&i.to_string()));
        }
        list.slots.assert_consistent(3);
    }

    #[test]
    fn remove_tail_then_middle() {
        let mut list: HandleList<u32> = HandleList::new();
        let h: Vec<_> = (0..4).map(|i| list.add(i)).collect();
        assert_eq!(list.remove(h[3]), Some(3));
        assert_eq!(list.remove(h[0]), Some(0));
        assert_eq!(list.get(h[1]), Some(&1));
        assert_eq!(list.get(h[2]), Some(&2));
        list.slots.assert_consistent(2);
    }

    #[test]
    fn get_mut_edits_in_place() {
        let mut list: HandleList<Vec<u8>> = HandleList::new();
        let h = list.add(Vec::new());
        list.get_mut(h).unwrap().push(4);
        assert_eq!(list.get(h), Some(&vec![4]));
    }

    #[test]
    fn invalid_and_foreign_handles_resolve_to_none() {
        let mut list: HandleList<u32> = HandleList::new();
        list.add(1);
        assert_eq!(list.get(Handle::INVALID), None);
        assert_eq!(list.get(Handle::new(50, 0)), None);
        assert_eq!(list.remove(Handle::INVALID), None);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn forged_handle_to_free_slot_is_none() {
        let mut list: HandleList<u32> = HandleList::new();
        let h = list.add(1);
        list.remove(h);
        let forged = Handle::new(h.index(), h.version() + 1);
        assert_eq!(list.get(forged), None);
    }

    #[test]
    fn drops_follow_ownership() {
        let tally = DropTally::new();
        let mut list: HandleList<_> = HandleList::new();
        let a = list.add(tally.counter(1));
        list.add(tally.counter(2));
        list.add(tally.counter(3));
        let removed = list.remove(a).unwrap();
        assert_eq!(tally.drops(), 0);
        drop(removed);
        assert_eq!(tally.drops(), 1);
        list.reset();
        assert_eq!(tally.drops(), 3);
        list.add(tally.counter(4));
        drop(list);
        assert_eq!(tally.drops(), 4);
    }

    #[test]
    fn fast_list_holds_pod() {
        let mut list: FastHandleList<InstanceData> = FastHandleList::new();
        let handles: Vec<_> = (0..40).map(|i| list.add(InstanceData::from_seed(i))).collect();
        for &h in handles.iter().step_by(3) {
            list.remove(h);
        }
        for (i, &h) in handles.iter().enumerate() {
            let expected = (i % 3 != 0).then(|| InstanceData::from_seed(i as u32));
            assert_eq!(list.get(h).copied(), expected);
        }
    }

    #[test]
    fn reset_empties_list() {
        let mut list: FastHandleList<u64> = FastHandleList::new();
        for i in 0..10 {
            list.add(i);
        }
        list.reset();
        assert!(list.is_empty());
        let h = list.add(99);
        assert_eq!((h.index(), h.version()), (0, 0));
    }

    #[test]
    fn clone_is_independent() {
        let mut list: HandleList<String> = HandleList::new();
        let h = list.add("a".into());
        let mut copy = list.clone();
        copy.get_mut(h).unwrap().push('b');
        assert_eq!(list.get(h).map(String::as_str), Some("a"));
        assert_eq!(copy.get(h).map(String::as_str), Some("ab"));
        copy.slots.assert_consistent(1);
    }

    #[test]
    fn fast_clone_keeps_handles_and_free_slots() {
        let mut list: FastHandleList<InstanceData> = FastHandleList::new();
        let handles: Vec<_> = (0..10).map(|i| list.add(InstanceData::from_seed(i))).collect();
        list.remove(handles[4]);
        let mut copy = list.clone();
        copy.slots.assert_consistent(9);
        assert_eq!(copy.get(handles[4]), None);
        assert_eq!(copy.get(handles[7]).copied(), Some(InstanceData::from_seed(7)));
        let reused = copy.add(InstanceData::from_seed(99));
        assert_eq!(reused.index(), handles[4].index());
        assert_eq!(list.len(), 9);
        assert_eq!(list.get(reused), None);
    }

    #[test]
    fn zero_capacity_config_rejected() {
        assert!(matches!(
            HandleList::<u8>::with_capacity(0),
            Err(MemoryError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn arenas_charged_to_configured_usage() {
        let config = HandleListConfig::new(16).with_resource_usage(MemoryUsage::Renderer);
        let list: FastHandleList<u32> = HandleList::with_config(config).unwrap();
        assert_eq!(list.resources.usage(), MemoryUsage::Renderer);
        let ids: Vec<_> = usage::live_allocations()
            .into_iter()
            .filter(|(_, r)| r.usage == MemoryUsage::HandleList)
            .collect();
        assert!(!ids.is_empty());
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashMap;

        proptest! {
            #[test]
            fn matches_map_model(ops in proptest::collection::vec(any::<(bool, u16)>(), 1..300)) {
                let mut list: HandleList<u32> = HandleList::with_capacity(4).unwrap();
                let mut live: Vec<Handle<u32>> = Vec::new();
                let mut dead: Vec<Handle<u32>> = Vec::new();
                let mut model: HashMap<Handle<u32>, u32> = HashMap::new();
                let mut next = 0u32;

                for (insert, pick) in ops {
                    if insert || live.is_empty() {
                        let h = list.add(next);
                        prop_assert!(model.insert(h, next).is_none());
                        live.push(h);
                        next += 1;
                    } else {
                        let h = live.swap_remove(pick as usize % live.len());
                        prop_assert_eq!(list.remove(h), model.remove(&h));
                        dead.push(h);
                    }
                    prop_assert_eq!(list.len(), model.len());
                    list.slots.assert_consistent(model.len());
                }
                for (h, v) in &model {
                    prop_assert_eq!(list.get(*h), Some(v));
                }
                for h in &dead {
                    prop_assert_eq!(list.get(*h), None);
                }
            }
        }
    }
}
