#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]

mod arena;
pub mod ordered_map;

extern crate alloc;

#[cfg(feature = "std")]
type RandomState = std::hash::RandomState;
#[cfg(not(feature = "std"))]
type RandomState = hashbrown::DefaultHashBuilder;

/// A hash map that remembers the order in which keys were first inserted,
/// implemented as a circular doubly-linked list of arena slots indexed by a
/// hash table for O(1) lookups.
///
/// This is the main type alias using the default hasher. For custom hashers,
/// use [`ordered_map::OrderedMap`] directly.
///
/// # Examples
///
/// ```
/// use orderedmap::OrderedMap;
///
/// let mut map = OrderedMap::new();
/// map.insert("a", 1);
/// map.insert("b", 2);
///
/// let entries: Vec<_> = map.iter().collect();
/// assert_eq!(entries, [(&"a", &1), (&"b", &2)]);
/// ```
pub type OrderedMap<K, V> = crate::ordered_map::OrderedMap<K, V, RandomState>;
use core::num::NonZeroU32;

pub use ordered_map::Direction;
pub use ordered_map::End;
pub use ordered_map::IntoIter;
pub use ordered_map::Iter;
pub use ordered_map::Keys;
pub use ordered_map::LiveIter;
pub use ordered_map::Values;

/// Index of a slot in the ring arena. Slot 0 is always the sentinel.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub(crate) struct Ptr(NonZeroU32);

impl core::fmt::Debug for Ptr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Ptr({})", self.0.get() - 1)
    }
}

impl Ptr {
    pub(crate) const SENTINEL: Ptr = Ptr(NonZeroU32::MIN);

    /// # Panics
    ///
    /// Panics if `index` does not fit in a `Ptr`, i.e. the arena has run out
    /// of addressable slots.
    pub(crate) fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index)
            .ok()
            .and_then(|index| index.checked_add(1))
            .and_then(NonZeroU32::new);
        match raw {
            Some(raw) => Ptr(raw),
            None => panic!("Index too large to fit in Ptr: {index}"),
        }
    }

    pub(crate) fn unchecked_get(self) -> usize {
        self.0.get() as usize - 1
    }

    pub(crate) fn is_sentinel(self) -> bool {
        self == Ptr::SENTINEL
    }
}
