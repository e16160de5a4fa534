use alloc::sync::Arc;
use alloc::sync::Weak;
use core::iter::FusedIterator;

use crate::Ptr;
use crate::RandomState;
use crate::arena::Arena;
use crate::arena::SlotState;
use crate::ordered_map::OrderedMap;

/// The way a [`LiveIter`] walks the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// From the oldest entry to the newest.
    Forward,
    /// From the newest entry to the oldest.
    Reverse,
}

/// A cursor over an [`OrderedMap`] that survives mutation of the map.
///
/// Unlike [`Iter`], a `LiveIter` does not borrow the map. Each call to
/// [`next`](LiveIter::next) takes the map by reference and follows the ring
/// from wherever the cursor currently sits, so inserts, removals and value
/// updates made between steps are observed:
///
/// - A value updated before the cursor reaches it is seen with its new value.
/// - A key inserted during a forward walk is appended before the end marker
///   and is visited in the same walk. During a reverse walk it lands behind
///   the cursor and is not visited.
/// - Removing the entry under the cursor does not lose the cursor's place;
///   the next step continues to the entry that followed it.
/// - Removing an entry ahead of the cursor drops it from the walk.
///
/// Once `next` has returned `None` the cursor is finished for good, even if
/// the map grows afterwards. A finished cursor no longer holds back removed
/// slots, so keeping one around costs the map nothing.
///
/// Created by [`OrderedMap::live_iter`] and [`OrderedMap::live_iter_rev`].
///
/// # Panics
///
/// `next` panics when given a map other than the one that created the
/// cursor.
///
/// # Examples
///
/// ```
/// use orderedmap::OrderedMap;
///
/// let mut map: OrderedMap<_, _> = (0..5).map(|i| (i, i)).collect();
/// let mut cursor = map.live_iter();
/// while let Some((&key, _)) = cursor.next(&map) {
///     if key % 2 == 0 {
///         map.insert(key, 100);
///     }
/// }
/// assert!(cursor.is_finished());
///
/// let entries: Vec<_> = map.iter().map(|(&k, &v)| (k, v)).collect();
/// assert_eq!(entries, [(0, 100), (1, 1), (2, 100), (3, 3), (4, 100)]);
/// ```
#[derive(Debug, Clone)]
pub struct LiveIter {
    cursor: Option<Ptr>,
    direction: Direction,
    // Held only for its strong count; dropped when the walk finishes.
    _pin: Option<Arc<()>>,
    owner: Weak<()>,
}

impl LiveIter {
    pub(crate) fn new(pin: Arc<()>, direction: Direction) -> Self {
        LiveIter {
            cursor: Some(Ptr::SENTINEL),
            direction,
            owner: Arc::downgrade(&pin),
            _pin: Some(pin),
        }
    }

    /// The direction this cursor walks in.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns `true` once the cursor has walked past the last entry.
    pub fn is_finished(&self) -> bool {
        self.cursor.is_none()
    }

    /// Advances the cursor one entry along the live ring of `map` and returns
    /// that entry, or `None` if the walk is over.
    pub fn next<'m, K, V, S>(&mut self, map: &'m OrderedMap<K, V, S>) -> Option<(&'m K, &'m V)> {
        assert!(
            core::ptr::eq(self.owner.as_ptr(), Arc::as_ptr(&map.pins)),
            "LiveIter used with a map other than the one that created it"
        );

        let mut ptr = self.cursor?;
        loop {
            let links = map.nodes.links(ptr);
            ptr = match self.direction {
                Direction::Forward => links.next(),
                Direction::Reverse => links.prev(),
            };

            match map.nodes.links(ptr).state() {
                SlotState::Sentinel => {
                    self.cursor = None;
                    self._pin = None;
                    return None;
                }
                SlotState::Live(data) => {
                    self.cursor = Some(ptr);
                    return Some((&data.key, &data.value));
                }
                // Removed while we were parked on or before it; its links
                // still lead back into the ring.
                SlotState::Retired => {}
                SlotState::Free { .. } => {
                    unreachable!("cursor reached a reclaimed slot")
                }
            }
        }
    }
}

#[derive(Debug)]
/// An iterator over the entries of an `OrderedMap`, oldest first.
///
/// This struct is created by the [`iter`] method on [`OrderedMap`]. It
/// borrows the map, so the map cannot change while it is alive; see
/// [`LiveIter`] for that.
///
/// [`iter`]: OrderedMap::iter
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
/// for (key, value) in map.iter() {
///     println!("{}: {}", key, value);
/// }
/// ```
pub struct Iter<'a, K, V> {
    nodes: &'a Arena<K, V>,
    front: Ptr,
    back: Ptr,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(nodes: &'a Arena<K, V>, len: usize) -> Self {
        Iter {
            nodes,
            front: nodes.head(),
            back: nodes.tail(),
            remaining: len,
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let ptr = self.front;
        self.front = self.nodes.links(ptr).next();
        self.remaining -= 1;

        let data = &self.nodes[ptr];
        Some((&data.key, &data.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let ptr = self.back;
        self.back = self.nodes.links(ptr).prev();
        self.remaining -= 1;

        let data = &self.nodes[ptr];
        Some((&data.key, &data.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// An iterator over the keys of an `OrderedMap`, oldest first.
///
/// Created by [`OrderedMap::keys`].
#[derive(Debug)]
pub struct Keys<'a, K, V> {
    pub(super) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// An iterator over the values of an `OrderedMap`, oldest first.
///
/// Created by [`OrderedMap::values`].
#[derive(Debug)]
pub struct Values<'a, K, V> {
    pub(super) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}

#[derive(Debug)]
/// An owning iterator over the entries of an `OrderedMap`, oldest first.
///
/// This struct is created by the [`into_iter`] method on [`OrderedMap`]
/// (provided by the [`IntoIterator`] trait).
///
/// [`into_iter`]: IntoIterator::into_iter
/// [`IntoIterator`]: core::iter::IntoIterator
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
/// let drained: Vec<_> = map.into_iter().rev().collect();
/// assert_eq!(drained, [("b", 2), ("a", 1)]);
/// ```
pub struct IntoIter<K, V, S = RandomState> {
    pub(super) map: OrderedMap<K, V, S>,
}

impl<K, V, S> Iterator for IntoIter<K, V, S> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.map.pop_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.map.len(), Some(self.map.len()))
    }
}

impl<K, V, S> DoubleEndedIterator for IntoIter<K, V, S> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.map.pop_last()
    }
}

impl<K, V, S> ExactSizeIterator for IntoIter<K, V, S> {}

impl<K, V, S> FusedIterator for IntoIter<K, V, S> {}
