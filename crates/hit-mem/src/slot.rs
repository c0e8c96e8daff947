//! Slot bookkeeping behind a handle list.
//!
//! Every issued handle names a [`Slot`]. Occupied slots form a doubly
//! linked chain threaded through `back`/`next`; vacated slots form a
//! singly linked free list threaded through `next`. Links are slot
//! indices with [`NIL`] as the terminator.
//!
//! Chain invariant: walking the occupied chain from its head visits the
//! slots in the order of the resources they back, so `last` always backs
//! the final resource. Removing the final resource pops it; removing any
//! other resource moves the final one into the hole, and its slot takes
//! the removed slot's place in the chain.

use bytemuck::{Pod, Zeroable};

use crate::typed::FastTypedArena;
use crate::usage::MemoryUsage;

/// Link terminator.
pub(crate) const NIL: i32 = -1;

/// `resource_index` of a vacated slot.
pub(crate) const NO_RESOURCE: u32 = u32::MAX;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct Slot {
    pub(crate) resource_index: u32,
    pub(crate) version: u32,
    pub(crate) next: i32,
    pub(crate) back: i32,
}

impl Slot {
    const VACANT: Self = Self {
        resource_index: NO_RESOURCE,
        version: 0,
        next: NIL,
        back: NIL,
    };
}

/// Version following `version`. Skips `u32::MAX`, which only
/// [`Handle::INVALID`](crate::Handle::INVALID) carries.
fn next_version(version: u32) -> u32 {
    if version >= u32::MAX - 1 {
        0
    } else {
        version + 1
    }
}

fn link_index(slot: u32) -> i32 {
    slot as i32
}

#[derive(Clone)]
pub(crate) struct SlotTable {
    slots: FastTypedArena<Slot>,
    /// Head of the free list.
    free_start: i32,
    free_count: usize,
    /// Tail of the occupied chain. The penultimate slot is `slot(last).back`.
    last: i32,
}

impl SlotTable {
    pub(crate) fn new(capacity: usize, usage: MemoryUsage) -> Self {
        Self {
            slots: FastTypedArena::allocate(capacity, usage),
            free_start: NIL,
            free_count: 0,
            last: NIL,
        }
    }

    /// Bind a fresh or recycled slot to `resource_index`, which must be the
    /// new final resource. Returns the slot's `(index, version)`.
    pub(crate) fn occupy(&mut self, resource_index: u32) -> (u32, u32) {
        let slot = self.acquire();
        self.slot_mut(slot).resource_index = resource_index;
        self.append(slot);
        let version = self.slot(slot).version;
        (slot as u32, version)
    }

    /// Resource backing `(index, version)`, if that handle is current.
    pub(crate) fn resolve(&self, index: u32, version: u32) -> Option<u32> {
        let slot = self.slots.data().get(index as usize)?;
        (slot.version == version && slot.resource_index != NO_RESOURCE)
            .then_some(slot.resource_index)
    }

    /// Vacate `removed`, which backs the final resource.
    pub(crate) fn vacate_tail(&mut self, removed: u32) {
        let removed = link_index(removed);
        debug_assert_eq!(removed, self.last);
        self.last = self.slot(removed).back;
        self.unlink(removed);
        self.release(removed);
    }

    /// Vacate `removed`, which does not back the final resource. The final
    /// resource moves into `removed`'s resource index and its slot takes
    /// `removed`'s place in the chain.
    pub(crate) fn vacate_relocating_tail(&mut self, removed: u32) {
        let removed = link_index(removed);
        let tail = self.last;
        debug_assert_ne!(removed, tail);
        let target = self.slot(removed).resource_index;
        let tail_back = self.slot(tail).back;

        self.slot_mut(tail).resource_index = target;
        self.unlink(tail);
        self.replace(removed, tail);
        self.last = if tail_back == removed { tail } else { tail_back };
        self.release(removed);
    }

    /// Forget every slot. Versions restart from zero.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_start = NIL;
        self.free_count = 0;
        self.last = NIL;
    }

    /// Slot backing the final resource.
    pub(crate) fn last(&self) -> Option<u32> {
        (self.last != NIL).then_some(self.last as u32)
    }

    /// Slots ever handed out, occupied or free.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Vacated slots waiting for reuse.
    pub(crate) fn free_count(&self) -> usize {
        self.free_count
    }

    fn slot(&self, index: i32) -> &Slot {
        &self.slots[index as usize]
    }

    fn slot_mut(&mut self, index: i32) -> &mut Slot {
        &mut self.slots[index as usize]
    }

    /// Pop the free list, or push a new slot.
    fn acquire(&mut self) -> i32 {
        if self.free_start != NIL {
            let slot = self.free_start;
            self.free_start = self.slot(slot).next;
            self.free_count -= 1;
            self.slot_mut(slot).next = NIL;
            return slot;
        }
        assert!(
            self.slots.len() < i32::MAX as usize,
            "handle list exceeded {} slots",
            i32::MAX
        );
        link_index(self.slots.push_back(Slot::VACANT) as u32)
    }

    /// Put `slot` at the end of the occupied chain.
    fn append(&mut self, slot: i32) {
        self.link(slot, self.last, NIL);
        self.last = slot;
    }

    /// Insert detached `slot` between `back` and `next`.
    fn link(&mut self, slot: i32, back: i32, next: i32) {
        {
            let s = self.slot_mut(slot);
            s.back = back;
            s.next = next;
        }
        if back != NIL {
            self.slot_mut(back).next = slot;
        }
        if next != NIL {
            self.slot_mut(next).back = slot;
        }
    }

    /// Detach `slot`, joining its neighbours.
    fn unlink(&mut self, slot: i32) {
        let Slot { back, next, .. } = *self.slot(slot);
        if back != NIL {
            self.slot_mut(back).next = next;
        }
        if next != NIL {
            self.slot_mut(next).back = back;
        }
        let s = self.slot_mut(slot);
        s.back = NIL;
        s.next = NIL;
    }

    /// Put detached `new` where `old` sits in the chain; `old` ends detached.
    fn replace(&mut self, old: i32, new: i32) {
        let Slot { back, next, .. } = *self.slot(old);
        self.unlink(old);
        self.link(new, back, next);
    }

    /// Bump the version and push `slot` onto the free list.
    fn release(&mut self, slot: i32) {
        let free_start = self.free_start;
        let s = self.slot_mut(slot);
        s.version = next_version(s.version);
        s.resource_index = NO_RESOURCE;
        s.next = free_start;
        s.back = NIL;
        self.free_start = slot;
        self.free_count += 1;
    }
}

#[cfg(test)]
impl SlotTable {
    /// Walk the chain and free list, asserting every structural invariant
    /// for a list holding `resources` resources.
    pub(crate) fn assert_consistent(&self, resources: usize) {
        let mut visited = vec![false; self.slots.len()];

        let mut expected = resources;
        let mut cursor = self.last;
        let mut after = NIL;
        while cursor != NIL {
            assert!(expected > 0, "occupied chain longer than {resources}");
            expected -= 1;
            let slot = self.slot(cursor);
            assert_eq!(slot.resource_index as usize, expected, "slot {cursor} out of order");
            assert_eq!(slot.next, after, "slot {cursor} has a broken next link");
            assert!(!visited[cursor as usize], "slot {cursor} visited twice");
            visited[cursor as usize] = true;
            after = cursor;
            cursor = slot.back;
        }
        assert_eq!(expected, 0, "occupied chain shorter than {resources}");

        let mut free = 0;
        let mut cursor = self.free_start;
        while cursor != NIL {
            let slot = self.slot(cursor);
            assert_eq!(slot.resource_index, NO_RESOURCE);
            assert!(!visited[cursor as usize], "free slot {cursor} also occupied");
            assert_ne!(slot.version, u32::MAX);
            visited[cursor as usize] = true;
            free += 1;
            cursor = slot.next;
        }
        assert_eq!(free, self.free_count);
        assert!(visited.iter().all(|&v| v), "orphaned slot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SlotTable {
        SlotTable::new(4, MemoryUsage::HandleList)
    }

    /// Occupy `n` slots backing resources `0..n`.
    fn filled(n: u32) -> SlotTable {
        let mut table = table();
        for r in 0..n {
            assert_eq!(table.occupy(r), (r, 0));
        }
        table
    }

    fn chain(table: &SlotTable) -> Vec<i32> {
        let mut out = Vec::new();
        let mut cursor = table.last;
        while cursor != NIL {
            out.push(cursor);
            cursor = table.slot(cursor).back;
        }
        out.reverse();
        out
    }

    #[test]
    fn occupy_appends_in_order() {
        let table = filled(3);
        assert_eq!(chain(&table), vec![0, 1, 2]);
        assert_eq!(table.last(), Some(2));
        table.assert_consistent(3);
    }

    #[test]
    fn resolve_checks_version() {
        let table = filled(2);
        assert_eq!(table.resolve(1, 0), Some(1));
        assert_eq!(table.resolve(1, 1), None);
        assert_eq!(table.resolve(9, 0), None);
    }

    #[test]
    fn vacate_tail_pops_chain() {
        let mut table = filled(3);
        table.vacate_tail(2);
        assert_eq!(chain(&table), vec![0, 1]);
        assert_eq!(table.resolve(2, 0), None);
        assert_eq!(table.free_count(), 1);
        table.assert_consistent(2);
    }

    #[test]
    fn vacate_only_slot_empties_chain() {
        let mut table = filled(1);
        table.vacate_tail(0);
        assert_eq!(table.last(), None);
        table.assert_consistent(0);
    }

    #[test]
    fn relocating_tail_takes_removed_position() {
        let mut table = filled(4);
        table.vacate_relocating_tail(1);
        assert_eq!(chain(&table), vec![0, 3, 2]);
        assert_eq!(table.resolve(3, 0), Some(1));
        assert_eq!(table.last(), Some(2));
        table.assert_consistent(3);
    }

    #[test]
    fn penultimate_is_back_link_of_last() {
        let mut table = filled(4);
        assert_eq!(table.slot(table.last).back, 2);
        table.vacate_relocating_tail(1);
        assert_eq!(table.slot(table.last).back, 3);
        table.vacate_tail(2);
        assert_eq!(table.last(), Some(3));
        assert_eq!(table.slot(table.last).back, 0);
    }

    #[test]
    fn relocating_tail_next_to_removed() {
        let mut table = filled(3);
        table.vacate_relocating_tail(1);
        assert_eq!(chain(&table), vec![0, 2]);
        assert_eq!(table.last(), Some(2));
        table.assert_consistent(2);
    }

    #[test]
    fn relocating_tail_into_head() {
        let mut table = filled(3);
        table.vacate_relocating_tail(0);
        assert_eq!(chain(&table), vec![2, 1]);
        assert_eq!(table.resolve(2, 0), Some(0));
        table.assert_consistent(2);
    }

    #[test]
    fn released_slot_is_reused_with_new_version() {
        let mut table = filled(2);
        table.vacate_relocating_tail(0);
        assert_eq!(table.occupy(1), (0, 1));
        assert_eq!(table.resolve(0, 0), None);
        assert_eq!(table.resolve(0, 1), Some(1));
        table.assert_consistent(2);
    }

    #[test]
    fn free_list_is_lifo() {
        let mut table = filled(3);
        table.vacate_tail(2);
        table.vacate_tail(1);
        assert_eq!(table.occupy(1).0, 1);
        assert_eq!(table.occupy(2).0, 2);
        assert_eq!(table.free_count(), 0);
    }

    #[test]
    fn link_unlink_replace_keep_neighbours() {
        let mut table = filled(3);
        table.unlink(1);
        assert_eq!(chain(&table), vec![0, 2]);
        table.link(1, 0, 2);
        assert_eq!(chain(&table), vec![0, 1, 2]);

        let extra = table.acquire();
        table.replace(1, extra);
        assert_eq!(chain(&table), vec![0, extra, 2]);
        assert_eq!(table.slot(1).back, NIL);
        assert_eq!(table.slot(1).next, NIL);
    }

    #[test]
    fn version_skips_invalid_marker() {
        assert_eq!(next_version(0), 1);
        assert_eq!(next_version(u32::MAX - 2), u32::MAX - 1);
        assert_eq!(next_version(u32::MAX - 1), 0);
    }

    #[test]
    fn clear_forgets_everything() {
        let mut table = filled(3);
        table.vacate_tail(2);
        table.clear();
        assert_eq!(table.len(), 0);
        assert_eq!(table.free_count(), 0);
        assert_eq!(table.last(), None);
        assert_eq!(table.occupy(0), (0, 0));
    }
}
