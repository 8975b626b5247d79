//! dense-map: a single-threaded, open-addressing hash map whose slot
//! states are encoded in the keys themselves, with pluggable probing and
//! lazy (tombstone) deletion.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a flat `(key, value)` table that resolves collisions by scanning
//!   neighbouring slots, reclaims erased slots lazily, and grows before a
//!   load-factor bound is crossed.
//! - Layers:
//!   - `SentinelKey`: per key type, two reserved values (`empty`,
//!     `tombstone`) that mark a slot's state. No side-band tag exists.
//!   - `Storage<K, V>`: fixed-capacity boxed slice of slots; owns entries.
//!   - `ProbeStrategy`: computes the insertion slot (`find_available`) and
//!     the lookup slot (`find_impl`) for a hash. `LinearProbe` is the
//!     default; `QuadraticProbe` is provided.
//!   - `DenseMap<K, V, P, S>`: public façade. Tracks live and tombstone
//!     counts, converts probing errors into map semantics, grows.
//!   - `MessageBus`: a typed publish/subscribe registry consuming the map
//!     through upsert-by-key and value iteration.
//!
//! Constraints
//! - Single-threaded and single-owner; no internal locking. Callers that
//!   share a map across threads must serialize access externally.
//! - `(live + tombstones) / capacity <= max_load` (0.77 by default) after
//!   every insert. Growth re-seats live entries in slot order and drops
//!   every tombstone. It doubles capacity, unless the live entries alone
//!   fill at most half of it; then the table is rebuilt at the same size.
//! - Capacities are powers of two.
//! - Keys equal to a sentinel can never be inserted; doing so panics.
//!
//! Lookup and compaction
//! - `find` (and the `&mut self` lookups built on it) moves an entry found
//!   behind a tombstone into the first tombstone of its probe chain.
//!   `get`/`contains_key` take `&self` and never move anything.
//! - Both probe scans stop after one full wraparound, so a table with no
//!   empty slot cannot loop forever.
//!
//! Hasher and rehashing invariants
//! - Each slot stores the `u64` hash computed at insertion. Growth re-seats
//!   entries using the stored hash; `K: Hash` is never invoked after
//!   insertion.
//!
//! Iteration and cursors
//! - Borrowing iterators walk slots in physical order and hold the map
//!   borrowed, so relocation while iterating is rejected at compile time.
//! - `Cursor` is a `(slot index, generation)` pair usable across mutations.
//!   The generation is bumped on growth, compaction and `clear`; a cursor
//!   from an older generation fails with `CursorError::Invalidated`
//!   instead of reading a relocated slot.
//!
//! Errors
//! - A missing key is `None`, never an error.
//! - `ProbeError::DuplicateKey` and `ProbeError::TableFull` stay inside the
//!   façade. The former is impossible because lookups precede inserts; the
//!   latter indicates a broken load-factor invariant and panics.
//!
//! Notes and non-goals
//! - No `Send`/`Sync` guarantees are documented beyond what the compiler
//!   derives; observers are boxed trait objects without thread bounds.
//! - No serialization, no custom allocators.
//! - The map does not implement `Clone` or `PartialEq`.

mod builder;
mod dense_map;
mod dense_map_proptest;
pub mod error;
pub mod iter;
mod message_bus;
pub mod observer;
pub mod probe;
pub mod sentinel;
pub mod storage;

// Public surface
pub use builder::DenseMapBuilder;
pub use dense_map::{Cursor, DenseMap, DEFAULT_CAPACITY, MAX_LOAD};
pub use error::{CursorError, ProbeError, SubscriptionError};
pub use message_bus::{MessageBus, Subscription, TopicId};
#[cfg(feature = "logging")]
pub use observer::LogObserver;
pub use observer::{MapObserver, NoopObserver};
pub use probe::{Found, LinearProbe, Lookup, ProbeStrategy, QuadraticProbe};
pub use sentinel::{SentinelKey, SlotState};
pub use storage::{Slot, Storage};
