//! Sentinel key policy: per key type, the two reserved values that encode
//! a slot's state in place of a side-band tag.
//!
//! A slot whose key equals [`SentinelKey::empty`] has never been occupied; a
//! slot whose key equals [`SentinelKey::tombstone`] held an entry that was
//! erased. Every other key value is live. Real keys must never equal either
//! sentinel; the map rejects such inserts with a panic.

use core::any::TypeId;

/// State of a slot, recovered by comparing its key against the sentinels.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SlotState {
    Live,
    Empty,
    Tombstone,
}

impl SlotState {
    /// `Empty` and `Tombstone` slots may receive a new entry.
    #[inline]
    pub fn is_available(self) -> bool {
        !matches!(self, SlotState::Live)
    }
}

/// Reserved key values for a key type.
///
/// Implementations must satisfy `empty() != tombstone()`, and neither value
/// may ever be produced by real data.
pub trait SentinelKey: Eq + Sized {
    /// Key stored in never-occupied slots.
    fn empty() -> Self;

    /// Key stored in slots whose entry was erased.
    fn tombstone() -> Self;

    #[inline]
    fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    #[inline]
    fn is_tombstone(&self) -> bool {
        *self == Self::tombstone()
    }

    #[inline]
    fn is_sentinel(&self) -> bool {
        self.is_empty() || self.is_tombstone()
    }

    #[inline]
    fn slot_state(&self) -> SlotState {
        if self.is_empty() {
            SlotState::Empty
        } else if self.is_tombstone() {
            SlotState::Tombstone
        } else {
            SlotState::Live
        }
    }
}

// U+FFFF is a Unicode non-character: never valid in interchanged text.
const STR_TOMBSTONE: &str = "\u{FFFF}";

impl SentinelKey for String {
    fn empty() -> Self {
        String::new()
    }

    fn tombstone() -> Self {
        STR_TOMBSTONE.to_string()
    }

    // Avoid allocating a fresh sentinel on every probe.
    #[inline]
    fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    #[inline]
    fn is_tombstone(&self) -> bool {
        self == STR_TOMBSTONE
    }
}

impl SentinelKey for &'static str {
    fn empty() -> Self {
        ""
    }

    fn tombstone() -> Self {
        STR_TOMBSTONE
    }
}

impl SentinelKey for char {
    fn empty() -> Self {
        '\u{FFFE}'
    }

    fn tombstone() -> Self {
        '\u{FFFF}'
    }
}

macro_rules! int_sentinels {
    ($($t:ty),* $(,)?) => {
        $(
            impl SentinelKey for $t {
                #[inline]
                fn empty() -> Self {
                    <$t>::MAX
                }

                #[inline]
                fn tombstone() -> Self {
                    <$t>::MAX - 1
                }
            }
        )*
    };
}

int_sentinels!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

// Private markers: no caller can name them, so no caller key can collide.
struct EmptyType;
struct TombstoneType;

impl SentinelKey for TypeId {
    fn empty() -> Self {
        TypeId::of::<EmptyType>()
    }

    fn tombstone() -> Self {
        TypeId::of::<TombstoneType>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_policy<K: SentinelKey + core::fmt::Debug>() {
        assert!(K::empty().is_empty());
        assert!(K::tombstone().is_tombstone());
        assert_ne!(K::empty(), K::tombstone());
        assert!(!K::empty().is_tombstone());
        assert!(!K::tombstone().is_empty());
        assert_eq!(K::empty().slot_state(), SlotState::Empty);
        assert_eq!(K::tombstone().slot_state(), SlotState::Tombstone);
    }

    /// Invariant: every built-in policy satisfies the sentinel contract.
    #[test]
    fn builtin_policies_are_consistent() {
        check_policy::<String>();
        check_policy::<&'static str>();
        check_policy::<char>();
        check_policy::<u8>();
        check_policy::<u32>();
        check_policy::<u64>();
        check_policy::<usize>();
        check_policy::<i32>();
        check_policy::<i64>();
        check_policy::<TypeId>();
    }

    /// Invariant: ordinary values are classified as live.
    #[test]
    fn ordinary_keys_are_live() {
        assert_eq!("key0".to_string().slot_state(), SlotState::Live);
        assert_eq!("a".slot_state(), SlotState::Live);
        assert_eq!(0u64.slot_state(), SlotState::Live);
        assert_eq!((-1i32).slot_state(), SlotState::Live);
        assert_eq!('x'.slot_state(), SlotState::Live);
        assert_eq!(TypeId::of::<u32>().slot_state(), SlotState::Live);
        assert_eq!(TypeId::of::<()>().slot_state(), SlotState::Live);
    }

    #[test]
    fn availability() {
        assert!(SlotState::Empty.is_available());
        assert!(SlotState::Tombstone.is_available());
        assert!(!SlotState::Live.is_available());
    }
}
