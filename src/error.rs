//! Error kinds.
//!
//! A missing key is never an error: lookups and erasures report it as
//! `None`.

/// Failure of a probing primitive. Handled entirely inside
/// [`DenseMap`](crate::DenseMap); never returned to its callers.
#[derive(thiserror::Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ProbeError {
    /// The key being placed is already live at `index`.
    #[error("key is already present at slot {index}")]
    DuplicateKey { index: usize },

    /// A full wraparound scan found neither an empty nor a tombstone slot.
    #[error("no available slot after scanning all {capacity} slots")]
    TableFull { capacity: usize },
}

/// The error type for cursor-based access on [`DenseMap`](crate::DenseMap).
#[derive(thiserror::Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum CursorError {
    /// The map relocated entries (growth, compaction or clear) after the
    /// cursor was obtained.
    #[error("cursor from generation {cursor} used after the map moved to generation {current}")]
    Invalidated { cursor: u64, current: u64 },

    /// The cursor's slot no longer holds a live entry.
    #[error("slot {index} does not hold a live entry")]
    NotLive { index: usize },
}

/// The error type for [`MessageBus::unsubscribe`](crate::MessageBus::unsubscribe).
#[derive(thiserror::Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum SubscriptionError {
    /// The subscription was already cancelled.
    #[error("unknown subscription")]
    Unknown,
}
