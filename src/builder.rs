use crate::dense_map::{capacity_overflow, DenseMap, DEFAULT_CAPACITY, MAX_LOAD};
use crate::observer::{MapObserver, NoopObserver};
use crate::probe::{LinearProbe, ProbeStrategy};
use crate::sentinel::SentinelKey;

use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use hashbrown::hash_map::DefaultHashBuilder;

#[cfg(feature = "logging")]
use crate::observer::LogObserver;

/// Builds a [`DenseMap`] with various configuration knobs.
///
/// # Examples
///
/// ```rust
/// use dense_map::{DenseMap, QuadraticProbe};
///
/// let mut map: DenseMap<String, u32, QuadraticProbe> = DenseMap::builder()
///     // At least 100 slots, rounded up to a power of two.
///     .initial_capacity(100)
///     // Grow once (live + tombstones + 1) / capacity exceeds one half.
///     .max_load_factor(0.5)
///     .probe_strategy(QuadraticProbe)
///     .build();
///
/// map.insert("alpha".to_string(), 1);
/// assert_eq!(map.capacity(), 128);
/// assert_eq!(map.get("alpha"), Some(&1));
/// ```
pub struct DenseMapBuilder<K, V, P = LinearProbe> {
    initial_capacity: usize,
    max_load_factor: f64,
    probe: P,
    observer: Option<Box<dyn MapObserver>>,
    map_type: PhantomData<fn() -> (K, V)>,
}

impl<K, V> DenseMapBuilder<K, V> {
    /// Construct a new `DenseMapBuilder` with [`DEFAULT_CAPACITY`] slots,
    /// a [`MAX_LOAD`] bound and linear probing.
    pub fn new() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            max_load_factor: MAX_LOAD,
            probe: LinearProbe,
            observer: None,
            map_type: PhantomData,
        }
    }
}

impl<K, V> Default for DenseMapBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, P> DenseMapBuilder<K, V, P> {
    /// Sets the initial number of slots. Rounded up to a power of two; zero
    /// is treated as one.
    pub fn initial_capacity(self, capacity: usize) -> Self {
        Self {
            initial_capacity: capacity,
            ..self
        }
    }

    /// Sets the bound on `(live + tombstones) / capacity` that triggers
    /// growth.
    ///
    /// # Panics
    ///
    /// `DenseMapBuilder::build*` methods will panic unless
    /// `0 < max_load_factor < 1`.
    pub fn max_load_factor(self, max_load_factor: f64) -> Self {
        Self {
            max_load_factor,
            ..self
        }
    }

    /// Replaces the probe strategy.
    pub fn probe_strategy<Q>(self, probe: Q) -> DenseMapBuilder<K, V, Q> {
        DenseMapBuilder {
            initial_capacity: self.initial_capacity,
            max_load_factor: self.max_load_factor,
            probe,
            observer: self.observer,
            map_type: PhantomData,
        }
    }

    /// Installs an observer for growth, compaction and erase events.
    pub fn observer(self, observer: impl MapObserver + 'static) -> Self {
        Self {
            observer: Some(Box::new(observer)),
            ..self
        }
    }

    /// Installs a [`LogObserver`] labelled with `name`.
    #[cfg(feature = "logging")]
    pub fn logging(self, name: impl Into<String>) -> Self {
        self.observer(LogObserver::named(name))
    }
}

impl<K, V, P> DenseMapBuilder<K, V, P>
where
    K: SentinelKey + Hash,
    V: Default,
    P: ProbeStrategy,
{
    /// Builds a `DenseMap<K, V, P>` with the default hasher.
    ///
    /// # Panics
    ///
    /// Panics if the max load factor is not within `(0, 1)`, or if the
    /// initial capacity rounds up past `usize::MAX`.
    pub fn build(self) -> DenseMap<K, V, P, DefaultHashBuilder> {
        self.build_with_hasher(DefaultHashBuilder::default())
    }

    /// Builds a `DenseMap<K, V, P, S>` with the given `hasher`.
    ///
    /// # Panics
    ///
    /// Panics if the max load factor is not within `(0, 1)`, or if the
    /// initial capacity rounds up past `usize::MAX`.
    pub fn build_with_hasher<S>(self, hasher: S) -> DenseMap<K, V, P, S>
    where
        S: BuildHasher,
    {
        ensure_max_load_factor_or_panic(self.max_load_factor);
        let capacity = self
            .initial_capacity
            .max(1)
            .checked_next_power_of_two()
            .unwrap_or_else(|| capacity_overflow());
        let observer = self
            .observer
            .unwrap_or_else(|| Box::new(NoopObserver) as Box<dyn MapObserver>);
        DenseMap::from_parts(capacity, self.max_load_factor, self.probe, hasher, observer)
    }
}

fn ensure_max_load_factor_or_panic(max_load_factor: f64) {
    assert!(
        max_load_factor > 0.0 && max_load_factor < 1.0,
        "max_load_factor must be within (0, 1), got {max_load_factor}"
    );
}
