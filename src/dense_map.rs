//! DenseMap: the public façade. Owns the slot storage, delegates slot
//! selection to a [`ProbeStrategy`], tracks live and tombstone counts and
//! grows before the load-factor bound would be exceeded.

use crate::builder::DenseMapBuilder;
use crate::error::{CursorError, ProbeError};
use crate::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::observer::MapObserver;
use crate::probe::{LinearProbe, Lookup, ProbeStrategy};
use crate::sentinel::{SentinelKey, SlotState};
use crate::storage::{Slot, Storage};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::Index;
use hashbrown::hash_map::DefaultHashBuilder;

/// Number of slots allocated by [`DenseMap::new`].
pub const DEFAULT_CAPACITY: usize = 8;

/// Default upper bound for `(live + tombstones) / capacity`.
pub const MAX_LOAD: f64 = 0.77;

/// Position of a live entry, tagged with the map generation it was
/// obtained in.
///
/// A cursor stays valid until the map relocates entries: growth, a
/// compacting lookup, or `clear`. Using it afterwards yields
/// [`CursorError::Invalidated`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Cursor {
    index: usize,
    generation: u64,
}

impl Cursor {
    /// Physical slot index.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Open-addressing hash map with sentinel-encoded slot states and
/// tombstone deletion.
///
/// Single-owner and single-threaded; callers sharing a map must serialize
/// access themselves.
pub struct DenseMap<K, V, P = LinearProbe, S = DefaultHashBuilder> {
    storage: Storage<K, V>,
    live: usize,
    tombstones: usize,
    generation: u64,
    max_load: f64,
    probe: P,
    hasher: S,
    observer: Box<dyn MapObserver>,
}

impl<K, V> DenseMap<K, V>
where
    K: SentinelKey + Hash,
    V: Default,
{
    /// Creates an empty map with [`DEFAULT_CAPACITY`] slots.
    pub fn new() -> Self {
        DenseMapBuilder::new().build()
    }

    /// Creates an empty map with at least `capacity` slots (rounded up to a
    /// power of two).
    pub fn with_capacity(capacity: usize) -> Self {
        DenseMapBuilder::new().initial_capacity(capacity).build()
    }

    pub fn builder() -> DenseMapBuilder<K, V> {
        DenseMapBuilder::new()
    }
}

impl<K, V, S> DenseMap<K, V, LinearProbe, S>
where
    K: SentinelKey + Hash,
    V: Default,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        DenseMapBuilder::new().build_with_hasher(hasher)
    }
}

impl<K, V, P> DenseMap<K, V, P>
where
    K: SentinelKey + Hash,
    V: Default,
    P: ProbeStrategy,
{
    pub fn with_probe(probe: P) -> Self {
        DenseMapBuilder::new().probe_strategy(probe).build()
    }
}

impl<K, V, P, S> Default for DenseMap<K, V, P, S>
where
    K: SentinelKey + Hash,
    V: Default,
    P: ProbeStrategy + Default,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        DenseMapBuilder::new()
            .probe_strategy(P::default())
            .build_with_hasher(S::default())
    }
}

impl<K, V, P, S> DenseMap<K, V, P, S> {
    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Number of tombstone slots left by erasures since the last growth.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// `(live + tombstones) / capacity`.
    pub fn load_factor(&self) -> f64 {
        (self.live + self.tombstones) as f64 / self.capacity() as f64
    }

    pub fn max_load_factor(&self) -> f64 {
        self.max_load
    }

    /// Bumped whenever entries may have moved; cursors from an older
    /// generation are rejected.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Read-only view of the slot storage.
    pub fn storage(&self) -> &Storage<K, V> {
        &self.storage
    }

    fn check_generation(&self, cursor: Cursor) -> Result<(), CursorError> {
        if cursor.generation == self.generation {
            Ok(())
        } else {
            Err(CursorError::Invalidated {
                cursor: cursor.generation,
                current: self.generation,
            })
        }
    }
}

impl<K, V, P, S> DenseMap<K, V, P, S>
where
    K: SentinelKey + Hash,
    V: Default,
    P: ProbeStrategy,
    S: BuildHasher,
{
    pub(crate) fn from_parts(
        capacity: usize,
        max_load: f64,
        probe: P,
        hasher: S,
        observer: Box<dyn MapObserver>,
    ) -> Self {
        Self {
            storage: Storage::new(capacity),
            live: 0,
            tombstones: 0,
            generation: 0,
            max_load,
            probe,
            hasher,
            observer,
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Inserts `key -> value`. If `key` is already live its value is
    /// replaced and the previous value returned.
    ///
    /// # Panics
    ///
    /// Panics if `key` equals one of `K`'s sentinel values.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        assert_not_sentinel(&key);
        let hash = self.make_hash(&key);
        match self.find_index(hash, &key) {
            Some(index) => Some(core::mem::replace(
                &mut self.storage.slot_mut(index).value,
                value,
            )),
            None => {
                self.insert_new(hash, key, value);
                None
            }
        }
    }

    /// Looks up `key`, compacting its probe chain on the way. Returns a
    /// cursor to the entry's (possibly new) position.
    pub fn find<Q>(&mut self, key: &Q) -> Option<Cursor>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(key);
        let index = self.find_index(hash, key)?;
        Some(Cursor {
            index,
            generation: self.generation,
        })
    }

    /// Non-compacting lookup.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(key);
        match self.probe.find_impl(&self.storage, hash, key) {
            Lookup::Hit { index, .. } => {
                let slot = self.storage.slot(index);
                Some((&slot.key, &slot.value))
            }
            Lookup::Miss => None,
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(key).is_some()
    }

    /// Compacting lookup returning mutable access to the value.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(key);
        let index = self.find_index(hash, key)?;
        Some(&mut self.storage.slot_mut(index).value)
    }

    /// Returns the value for `key`, first inserting `default()` if absent.
    /// `default` only runs on a miss.
    ///
    /// The reference stays valid until the next structural mutation.
    ///
    /// # Panics
    ///
    /// Panics if `key` equals one of `K`'s sentinel values.
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        assert_not_sentinel(&key);
        let hash = self.make_hash(&key);
        let index = match self.find_index(hash, &key) {
            Some(index) => index,
            None => self.insert_new(hash, key, default()),
        };
        &mut self.storage.slot_mut(index).value
    }

    /// Returns the value for `key`, first inserting `V::default()` if absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V {
        self.get_or_insert_with(key, V::default)
    }

    /// Erases `key`, returning its value. A miss mutates nothing and
    /// returns `None`.
    pub fn erase<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(key);
        let index = self.find_index(hash, key)?;
        Some(self.bury(index))
    }

    /// Erases the entry under `cursor`. The cursor remains usable for
    /// [`advance`](Self::advance).
    pub fn erase_at(&mut self, cursor: Cursor) -> Result<(K, V), CursorError> {
        let index = self.live_index(cursor)?;
        Ok(self.bury(index))
    }

    /// Cursor to the first live slot in slot order.
    pub fn first(&self) -> Option<Cursor> {
        self.storage.next_live(0).map(|index| Cursor {
            index,
            generation: self.generation,
        })
    }

    /// Cursor to the next live slot after `cursor`, or `None` at the end.
    pub fn advance(&self, cursor: Cursor) -> Result<Option<Cursor>, CursorError> {
        self.check_generation(cursor)?;
        Ok(self.storage.next_live(cursor.index + 1).map(|index| Cursor {
            index,
            generation: self.generation,
        }))
    }

    pub fn key_at(&self, cursor: Cursor) -> Result<&K, CursorError> {
        let index = self.live_index(cursor)?;
        Ok(&self.storage.slot(index).key)
    }

    pub fn value_at(&self, cursor: Cursor) -> Result<&V, CursorError> {
        let index = self.live_index(cursor)?;
        Ok(&self.storage.slot(index).value)
    }

    pub fn value_at_mut(&mut self, cursor: Cursor) -> Result<&mut V, CursorError> {
        let index = self.live_index(cursor)?;
        Ok(&mut self.storage.slot_mut(index).value)
    }

    /// Grows, if needed, so that `additional` further inserts of new keys
    /// do not trigger growth.
    ///
    /// # Panics
    ///
    /// Panics with "capacity overflow" if the required capacity exceeds
    /// `usize`.
    pub fn reserve(&mut self, additional: usize) {
        if self.exceeds_max_load(additional) {
            let required_live = self
                .live
                .checked_add(additional)
                .unwrap_or_else(|| capacity_overflow());
            self.grow(required_live);
        }
    }

    /// Removes every entry. Capacity is kept.
    pub fn clear(&mut self) {
        self.storage.clear();
        self.live = 0;
        self.tombstones = 0;
        self.generation += 1;
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.storage.as_slice(), self.live)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(self.storage.as_mut_slice(), self.live)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }

    fn live_index(&self, cursor: Cursor) -> Result<usize, CursorError> {
        self.check_generation(cursor)?;
        let index = cursor.index;
        if index < self.capacity() && self.storage.slot(index).is_live() {
            Ok(index)
        } else {
            Err(CursorError::NotLive { index })
        }
    }

    /// Compacting probe; bumps the generation when an entry moved.
    fn find_index<Q>(&mut self, hash: u64, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let found = self.probe.find(&mut self.storage, hash, key)?;
        if let Some(from) = found.relocated_from {
            self.generation += 1;
            self.observer.on_compaction(from, found.index);
        }
        Some(found.index)
    }

    /// Places a key known to be absent, growing first when needed.
    fn insert_new(&mut self, hash: u64, key: K, value: V) -> usize {
        self.reserve(1);
        let index = match self.probe.find_available(&self.storage, hash, &key) {
            Ok(index) => index,
            Err(e @ ProbeError::DuplicateKey { .. }) => {
                unreachable!("lookup missed a live key: {e}")
            }
            Err(e @ ProbeError::TableFull { .. }) => {
                panic!("load factor bound violated: {e}")
            }
        };
        if self.storage.state(index) == SlotState::Tombstone {
            self.tombstones -= 1;
        }
        self.storage.occupy(index, hash, key, value);
        self.live += 1;
        index
    }

    fn bury(&mut self, index: usize) -> (K, V) {
        let entry = self.storage.bury(index);
        self.live -= 1;
        self.tombstones += 1;
        self.observer.on_tombstone(index);
        entry
    }

    fn exceeds_max_load(&self, additional: usize) -> bool {
        let occupied = self
            .live
            .checked_add(self.tombstones)
            .and_then(|n| n.checked_add(additional))
            .unwrap_or_else(|| capacity_overflow());
        occupied as f64 / self.capacity() as f64 > self.max_load
    }

    /// Capacity to rebuild into so that `required_live` entries fit under
    /// the load bound. Stays at the current capacity when the live entries
    /// alone fill at most half of it; tombstones caused the overflow then.
    fn target_capacity(&self, required_live: usize) -> usize {
        let capacity = self.capacity();
        let fits = |c: usize| required_live as f64 / c as f64 <= self.max_load;
        let half_full = required_live
            .checked_mul(2)
            .map_or(false, |doubled| doubled <= capacity);
        if half_full && fits(capacity) {
            return capacity;
        }
        let mut new_capacity = capacity;
        loop {
            new_capacity = new_capacity
                .checked_mul(2)
                .unwrap_or_else(|| capacity_overflow());
            if fits(new_capacity) {
                return new_capacity;
            }
        }
    }

    /// Rebuilds the storage at [`target_capacity`](Self::target_capacity)
    /// and re-seats every live entry. Drops all tombstones.
    fn grow(&mut self, required_live: usize) {
        let old_capacity = self.capacity();
        let new_capacity = self.target_capacity(required_live);

        let old = core::mem::replace(&mut self.storage, Storage::new(new_capacity));
        for Slot { key, value, hash } in old.into_live() {
            let index = match self.probe.find_available(&self.storage, hash, &key) {
                Ok(index) => index,
                Err(e) => panic!("rehash into {new_capacity} slots failed: {e}"),
            };
            self.storage.occupy(index, hash, key, value);
        }
        self.tombstones = 0;
        self.generation += 1;
        self.observer.on_grow(old_capacity, new_capacity, self.live);
    }
}

#[cold]
#[inline(never)]
pub(crate) fn capacity_overflow() -> ! {
    panic!("capacity overflow")
}

fn assert_not_sentinel<K: SentinelKey>(key: &K) {
    assert!(
        !key.is_sentinel(),
        "sentinel key values cannot be inserted into a DenseMap"
    );
}

impl<K, V, P, S> IntoIterator for DenseMap<K, V, P, S>
where
    K: SentinelKey,
{
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.storage.into_slots(), self.live)
    }
}

impl<'a, K, V, P, S> IntoIterator for &'a DenseMap<K, V, P, S>
where
    K: SentinelKey + Hash,
    V: Default,
    P: ProbeStrategy,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, P, S> IntoIterator for &'a mut DenseMap<K, V, P, S>
where
    K: SentinelKey + Hash,
    V: Default,
    P: ProbeStrategy,
    S: BuildHasher,
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, P, S> Extend<(K, V)> for DenseMap<K, V, P, S>
where
    K: SentinelKey + Hash,
    V: Default,
    P: ProbeStrategy,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, P, S> FromIterator<(K, V)> for DenseMap<K, V, P, S>
where
    K: SentinelKey + Hash,
    V: Default,
    P: ProbeStrategy + Default,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<K, Q, V, P, S> Index<&Q> for DenseMap<K, V, P, S>
where
    K: SentinelKey + Hash + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    V: Default,
    P: ProbeStrategy,
    S: BuildHasher,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if `key` is not present.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K, V, P, S> fmt::Debug for DenseMap<K, V, P, S>
where
    K: SentinelKey + Hash + fmt::Debug,
    V: Default + fmt::Debug,
    P: ProbeStrategy,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
