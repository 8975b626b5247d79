//! Slot storage: a fixed-capacity, contiguous run of `(key, value)` slots.

use crate::sentinel::{SentinelKey, SlotState};

/// One slot of the table. The slot's state is derived from its key.
#[derive(Clone, Debug)]
pub struct Slot<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    // Cached at insertion; growth re-seats by this hash without calling `K: Hash`.
    pub(crate) hash: u64,
}

impl<K, V> Slot<K, V>
where
    K: SentinelKey,
    V: Default,
{
    fn empty() -> Self {
        Slot {
            key: K::empty(),
            value: V::default(),
            hash: 0,
        }
    }

    fn tombstone() -> Self {
        Slot {
            key: K::tombstone(),
            value: V::default(),
            hash: 0,
        }
    }
}

impl<K: SentinelKey, V> Slot<K, V> {
    #[inline]
    pub fn state(&self) -> SlotState {
        self.key.slot_state()
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.state() == SlotState::Live
    }
}

impl<K, V> Slot<K, V> {
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Hash recorded when the entry was written; zero for sentinel slots.
    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }
}

/// Owns every slot of a [`DenseMap`](crate::DenseMap). Capacity is fixed for
/// the lifetime of a `Storage`; growth replaces it wholesale.
#[derive(Clone, Debug)]
pub struct Storage<K, V> {
    slots: Box<[Slot<K, V>]>,
}

impl<K, V> Storage<K, V>
where
    K: SentinelKey,
    V: Default,
{
    /// Allocates `capacity` empty slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "storage capacity must be non-zero");
        let slots = (0..capacity).map(|_| Slot::empty()).collect();
        Storage { slots }
    }

    /// Writes an entry into an available slot.
    pub(crate) fn occupy(&mut self, index: usize, hash: u64, key: K, value: V) {
        let slot = &mut self.slots[index];
        debug_assert!(slot.state().is_available(), "occupying a live slot");
        slot.hash = hash;
        slot.key = key;
        slot.value = value;
    }

    /// Replaces a live entry with a tombstone and hands the entry back.
    pub(crate) fn bury(&mut self, index: usize) -> (K, V) {
        debug_assert!(self.slots[index].is_live(), "burying a non-live slot");
        let Slot { key, value, .. } = core::mem::replace(&mut self.slots[index], Slot::tombstone());
        (key, value)
    }

    /// Resets every slot to empty.
    pub(crate) fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = Slot::empty();
        }
    }
}

impl<K: SentinelKey, V> Storage<K, V> {
    #[inline]
    pub fn state(&self, index: usize) -> SlotState {
        self.slots[index].state()
    }

    /// Index of the first live slot at or after `from`.
    pub fn next_live(&self, from: usize) -> Option<usize> {
        self.slots
            .get(from..)?
            .iter()
            .position(Slot::is_live)
            .map(|offset| from + offset)
    }

    /// Consumes the storage, yielding its live slots in slot order.
    pub(crate) fn into_live(self) -> impl Iterator<Item = Slot<K, V>> {
        self.slots.into_vec().into_iter().filter(Slot::is_live)
    }
}

impl<K, V> Storage<K, V> {
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Home index of `hash`: `hash mod capacity`.
    #[inline]
    pub fn start_index(&self, hash: u64) -> usize {
        (hash % self.slots.len() as u64) as usize
    }

    #[inline]
    pub fn slot(&self, index: usize) -> &Slot<K, V> {
        &self.slots[index]
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut Slot<K, V> {
        &mut self.slots[index]
    }

    #[inline]
    pub fn as_slice(&self) -> &[Slot<K, V>] {
        &self.slots
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [Slot<K, V>] {
        &mut self.slots
    }

    #[inline]
    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        self.slots.swap(a, b);
    }

    pub(crate) fn into_slots(self) -> Vec<Slot<K, V>> {
        self.slots.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: fresh storage holds exactly `capacity` empty slots.
    #[test]
    fn new_storage_is_all_empty() {
        let s: Storage<String, i32> = Storage::new(8);
        assert_eq!(s.capacity(), 8);
        assert!((0..8).all(|i| s.state(i) == SlotState::Empty));
        assert_eq!(s.next_live(0), None);
    }

    #[test]
    #[should_panic(expected = "storage capacity must be non-zero")]
    fn zero_capacity_rejected() {
        let _s: Storage<u32, u32> = Storage::new(0);
    }

    /// Invariant: occupy makes a slot live; bury turns it into a tombstone
    /// with a default value and returns the entry.
    #[test]
    fn occupy_then_bury() {
        let mut s: Storage<String, i32> = Storage::new(4);
        s.occupy(2, 42, "a".to_string(), 7);
        assert_eq!(s.state(2), SlotState::Live);
        assert_eq!(s.slot(2).hash(), 42);
        assert_eq!(s.next_live(0), Some(2));
        assert_eq!(s.next_live(3), None);

        let (k, v) = s.bury(2);
        assert_eq!((k.as_str(), v), ("a", 7));
        assert_eq!(s.state(2), SlotState::Tombstone);
        assert_eq!(*s.slot(2).value(), 0);
        assert_eq!(s.next_live(0), None);
    }

    #[test]
    fn start_index_wraps_by_capacity() {
        let s: Storage<u32, u32> = Storage::new(8);
        assert_eq!(s.start_index(0), 0);
        assert_eq!(s.start_index(13), 5);
        assert_eq!(s.start_index(u64::MAX), (u64::MAX % 8) as usize);
    }

    /// Invariant: into_live drops sentinel slots and keeps slot order.
    #[test]
    fn into_live_keeps_only_live_slots_in_order() {
        let mut s: Storage<u32, &'static str> = Storage::new(8);
        s.occupy(5, 5, 50, "x");
        s.occupy(1, 1, 10, "y");
        s.occupy(3, 3, 30, "z");
        let _ = s.bury(3);
        let keys: Vec<u32> = s.into_live().map(|slot| slot.key).collect();
        assert_eq!(keys, vec![10, 50]);
    }

    #[test]
    fn clear_resets_every_slot() {
        let mut s: Storage<u32, u32> = Storage::new(4);
        s.occupy(0, 0, 1, 1);
        s.occupy(1, 1, 2, 2);
        let _ = s.bury(1);
        s.clear();
        assert!((0..4).all(|i| s.state(i) == SlotState::Empty));
    }
}
