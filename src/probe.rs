//! Probe strategies: the deterministic slot order used to place and find keys.
//!
//! A strategy only scans. Both scans are bounded by one full wraparound
//! (`capacity` probes), so they terminate even when no slot is empty.

use crate::error::ProbeError;
use crate::sentinel::{SentinelKey, SlotState};
use crate::storage::Storage;
use core::borrow::Borrow;

/// Outcome of a non-mutating lookup scan.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Lookup {
    /// The key is live at `index`; `first_tombstone` is the earliest
    /// tombstone passed on the way there, if any.
    Hit {
        index: usize,
        first_tombstone: Option<usize>,
    },
    Miss,
}

/// Result of [`ProbeStrategy::find`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Found {
    /// Where the entry lives now.
    pub index: usize,
    /// Where the entry lived before compaction moved it, if it moved.
    pub relocated_from: Option<usize>,
}

/// Collision-resolution policy for [`DenseMap`](crate::DenseMap).
pub trait ProbeStrategy {
    /// Slot to use for inserting `key`, which must not be live in `storage`.
    ///
    /// Returns the first empty or tombstone slot in probe order. Fails with
    /// `DuplicateKey` if `key` is met first, or `TableFull` if the scan
    /// wraps around without finding an available slot.
    fn find_available<K, V>(
        &self,
        storage: &Storage<K, V>,
        hash: u64,
        key: &K,
    ) -> Result<usize, ProbeError>
    where
        K: SentinelKey;

    /// Scans for `key` without touching the storage. Stops at the first
    /// empty slot or after one full wraparound.
    fn find_impl<K, V, Q>(&self, storage: &Storage<K, V>, hash: u64, key: &Q) -> Lookup
    where
        K: SentinelKey + Borrow<Q>,
        Q: ?Sized + Eq;

    /// Lookup with lazy-deletion compaction: a hit found behind a tombstone
    /// is swapped into the first tombstone of its chain.
    fn find<K, V, Q>(&self, storage: &mut Storage<K, V>, hash: u64, key: &Q) -> Option<Found>
    where
        K: SentinelKey + Borrow<Q>,
        Q: ?Sized + Eq,
    {
        match self.find_impl(storage, hash, key) {
            Lookup::Miss => None,
            Lookup::Hit {
                index,
                first_tombstone: None,
            } => Some(Found {
                index,
                relocated_from: None,
            }),
            Lookup::Hit {
                index,
                first_tombstone: Some(tombstone),
            } => {
                storage.swap(index, tombstone);
                Some(Found {
                    index: tombstone,
                    relocated_from: Some(index),
                })
            }
        }
    }
}

/// Scans `start, start + 1, ...` modulo capacity.
#[derive(Copy, Clone, Debug, Default)]
pub struct LinearProbe;

impl LinearProbe {
    fn sequence(start: usize, capacity: usize) -> impl Iterator<Item = usize> {
        (0..capacity).map(move |step| (start + step) % capacity)
    }
}

impl ProbeStrategy for LinearProbe {
    fn find_available<K, V>(
        &self,
        storage: &Storage<K, V>,
        hash: u64,
        key: &K,
    ) -> Result<usize, ProbeError>
    where
        K: SentinelKey,
    {
        let start = storage.start_index(hash);
        available_along(storage, hash, key, Self::sequence(start, storage.capacity()))
    }

    fn find_impl<K, V, Q>(&self, storage: &Storage<K, V>, hash: u64, key: &Q) -> Lookup
    where
        K: SentinelKey + Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let start = storage.start_index(hash);
        lookup_along(storage, hash, key, Self::sequence(start, storage.capacity()))
    }
}

/// Scans `start + i(i+1)/2` modulo capacity (triangular steps).
///
/// Visits every slot only when the capacity is a power of two, which
/// [`DenseMap`](crate::DenseMap) always maintains.
#[derive(Copy, Clone, Debug, Default)]
pub struct QuadraticProbe;

impl QuadraticProbe {
    fn sequence(start: usize, capacity: usize) -> impl Iterator<Item = usize> {
        let mut pos = start;
        (0..capacity).map(move |step| {
            pos = (pos + step) % capacity;
            pos
        })
    }
}

impl ProbeStrategy for QuadraticProbe {
    fn find_available<K, V>(
        &self,
        storage: &Storage<K, V>,
        hash: u64,
        key: &K,
    ) -> Result<usize, ProbeError>
    where
        K: SentinelKey,
    {
        let start = storage.start_index(hash);
        available_along(storage, hash, key, Self::sequence(start, storage.capacity()))
    }

    fn find_impl<K, V, Q>(&self, storage: &Storage<K, V>, hash: u64, key: &Q) -> Lookup
    where
        K: SentinelKey + Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let start = storage.start_index(hash);
        lookup_along(storage, hash, key, Self::sequence(start, storage.capacity()))
    }
}

fn available_along<K, V>(
    storage: &Storage<K, V>,
    hash: u64,
    key: &K,
    probes: impl Iterator<Item = usize>,
) -> Result<usize, ProbeError>
where
    K: SentinelKey,
{
    for index in probes {
        let slot = storage.slot(index);
        match slot.state() {
            SlotState::Empty | SlotState::Tombstone => return Ok(index),
            SlotState::Live if slot.hash() == hash && slot.key() == key => {
                return Err(ProbeError::DuplicateKey { index })
            }
            SlotState::Live => {}
        }
    }
    Err(ProbeError::TableFull {
        capacity: storage.capacity(),
    })
}

fn lookup_along<K, V, Q>(
    storage: &Storage<K, V>,
    hash: u64,
    key: &Q,
    probes: impl Iterator<Item = usize>,
) -> Lookup
where
    K: SentinelKey + Borrow<Q>,
    Q: ?Sized + Eq,
{
    let mut first_tombstone = None;
    for index in probes {
        let slot = storage.slot(index);
        match slot.state() {
            SlotState::Empty => return Lookup::Miss,
            SlotState::Tombstone => {
                first_tombstone.get_or_insert(index);
            }
            SlotState::Live
                if slot.hash() == hash && Borrow::<Q>::borrow(slot.key()) == key =>
            {
                return Lookup::Hit {
                    index,
                    first_tombstone,
                }
            }
            SlotState::Live => {}
        }
    }
    Lookup::Miss
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_with(capacity: usize, entries: &[(usize, u64, &'static str)]) -> Storage<String, i32> {
        let mut s = Storage::new(capacity);
        for (i, &(index, hash, key)) in entries.iter().enumerate() {
            s.occupy(index, hash, key.to_string(), i as i32);
        }
        s
    }

    #[test]
    fn linear_sequence_wraps_once() {
        let seq: Vec<usize> = LinearProbe::sequence(6, 8).collect();
        assert_eq!(seq, vec![6, 7, 0, 1, 2, 3, 4, 5]);
    }

    /// Invariant: triangular probing visits every slot of a power-of-two table
    /// exactly once.
    #[test]
    fn quadratic_sequence_covers_power_of_two_tables() {
        for capacity in [1usize, 2, 4, 8, 16, 64] {
            for start in 0..capacity {
                let mut seen: Vec<usize> = QuadraticProbe::sequence(start, capacity).collect();
                assert_eq!(seen[0], start);
                seen.sort_unstable();
                assert_eq!(seen, (0..capacity).collect::<Vec<_>>());
            }
        }
    }

    /// Invariant: find_available returns the home slot when free and the next
    /// free slot in probe order otherwise.
    #[test]
    fn find_available_skips_live_slots() {
        let s = storage_with(8, &[(3, 3, "a"), (4, 11, "b")]);
        let key = "c".to_string();
        assert_eq!(LinearProbe.find_available(&s, 19, &key), Ok(5));
        assert_eq!(LinearProbe.find_available(&s, 0, &key), Ok(0));
    }

    /// Invariant: a tombstone is an insertion target.
    #[test]
    fn find_available_reuses_tombstone() {
        let mut s = storage_with(8, &[(3, 3, "a"), (4, 11, "b")]);
        let _ = s.bury(3);
        assert_eq!(LinearProbe.find_available(&s, 3, &"c".to_string()), Ok(3));
    }

    #[test]
    fn find_available_reports_duplicate() {
        let s = storage_with(8, &[(3, 3, "a"), (4, 11, "b")]);
        assert_eq!(
            LinearProbe.find_available(&s, 11, &"b".to_string()),
            Err(ProbeError::DuplicateKey { index: 4 })
        );
    }

    /// Invariant: a table of only live keys reports TableFull instead of looping.
    #[test]
    fn find_available_reports_table_full() {
        let s = storage_with(2, &[(0, 0, "a"), (1, 1, "b")]);
        assert_eq!(
            LinearProbe.find_available(&s, 0, &"c".to_string()),
            Err(ProbeError::TableFull { capacity: 2 })
        );
        assert_eq!(
            QuadraticProbe.find_available(&s, 1, &"c".to_string()),
            Err(ProbeError::TableFull { capacity: 2 })
        );
    }

    #[test]
    fn find_impl_hit_and_miss() {
        let s = storage_with(8, &[(3, 3, "a"), (4, 11, "b")]);
        assert_eq!(
            LinearProbe.find_impl(&s, 11, "b"),
            Lookup::Hit {
                index: 4,
                first_tombstone: None
            }
        );
        // Stops at the empty slot 5.
        assert_eq!(LinearProbe.find_impl(&s, 11, "z"), Lookup::Miss);
        // Same hash, different key.
        assert_eq!(LinearProbe.find_impl(&s, 3, "b"), Lookup::Miss);
    }

    /// Invariant: find swaps a hit into the first tombstone of its chain and
    /// reports the new index.
    #[test]
    fn find_compacts_into_first_tombstone() {
        let mut s = storage_with(8, &[(2, 2, "a"), (3, 2, "b"), (4, 2, "c")]);
        let _ = s.bury(2);
        let _ = s.bury(3);
        assert_eq!(
            LinearProbe.find_impl(&s, 2, "c"),
            Lookup::Hit {
                index: 4,
                first_tombstone: Some(2)
            }
        );

        let found = LinearProbe.find(&mut s, 2, "c").expect("c present");
        assert_eq!(
            found,
            Found {
                index: 2,
                relocated_from: Some(4)
            }
        );
        assert_eq!(s.slot(2).key(), "c");
        assert_eq!(*s.slot(2).value(), 2);
        assert_eq!(s.state(3), SlotState::Tombstone);
        assert_eq!(s.state(4), SlotState::Tombstone);

        // Second lookup hits directly.
        assert_eq!(
            LinearProbe.find(&mut s, 2, "c"),
            Some(Found {
                index: 2,
                relocated_from: None
            })
        );
    }

    /// Invariant: a lookup in a table with no empty slot stops after one
    /// wraparound.
    #[test]
    fn find_impl_terminates_without_empty_slots() {
        let mut s = storage_with(4, &[(0, 0, "a"), (1, 1, "b"), (2, 2, "c"), (3, 3, "d")]);
        let _ = s.bury(1);
        let _ = s.bury(3);
        assert_eq!(LinearProbe.find_impl(&s, 1, "zz"), Lookup::Miss);
        assert_eq!(QuadraticProbe.find_impl(&s, 1, "zz"), Lookup::Miss);
        assert_eq!(LinearProbe.find(&mut s, 3, "zz"), None);
    }

    #[test]
    fn quadratic_probe_places_and_finds() {
        let mut s: Storage<String, i32> = Storage::new(8);
        for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
            let key = key.to_string();
            let index = QuadraticProbe.find_available(&s, 5, &key).expect("room");
            s.occupy(index, 5, key, i as i32);
        }
        // Triangular offsets from 5: 5, 6, 0 (5+3), 3 (5+6).
        assert_eq!(s.slot(5).key(), "a");
        assert_eq!(s.slot(6).key(), "b");
        assert_eq!(s.slot(0).key(), "c");
        assert_eq!(s.slot(3).key(), "d");
        for key in ["a", "b", "c", "d"] {
            assert!(matches!(QuadraticProbe.find_impl(&s, 5, key), Lookup::Hit { .. }));
        }
    }
}
