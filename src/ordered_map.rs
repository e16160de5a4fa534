//! Insertion-ordered hash map.
//!
//! This module provides the core [`OrderedMap`] type and its iterators. The
//! map keeps its entries on a circular doubly-linked list anchored by a
//! sentinel slot, and indexes them through a hash table for O(1) access.
//!
//! Besides ordinary borrowing iteration, the map hands out [`LiveIter`]
//! cursors that do not borrow it. A cursor re-reads the ring on every step,
//! so the map can be mutated between calls to [`LiveIter::next`].
//!
//! # Examples
//!
//! ```
//! use orderedmap::ordered_map::OrderedMap;
//!
//! let mut map = OrderedMap::new();
//! map.insert("first", 1);
//! map.insert("second", 2);
//!
//! // Iteration preserves insertion order
//! let entries: Vec<_> = map.iter().collect();
//! assert_eq!(entries, [(&"first", &1), (&"second", &2)]);
//! ```

use alloc::sync::Arc;
use core::borrow::Borrow;
use core::fmt;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::ops::Index;

use hashbrown::HashTable;
use hashbrown::hash_table;

use crate::Ptr;
use crate::RandomState;
use crate::arena::Arena;
use crate::arena::LLData;

mod iter;

pub use iter::Direction;
pub use iter::IntoIter;
pub use iter::Iter;
pub use iter::Keys;
pub use iter::LiveIter;
pub use iter::Values;

/// Selects one end of the map's order.
///
/// `First` is the oldest end, `Last` the newest. A plain `bool` converts with
/// `true` meaning [`End::Last`].
///
/// # Examples
///
/// ```
/// use orderedmap::End;
///
/// assert_eq!(End::from(true), End::Last);
/// assert_eq!(End::from(false), End::First);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum End {
    /// The oldest entry, where iteration starts.
    First,
    /// The newest entry, where new keys are appended.
    Last,
}

impl From<bool> for End {
    fn from(last: bool) -> Self {
        if last { End::Last } else { End::First }
    }
}

/// A hash map that preserves insertion order.
///
/// New keys are appended at the end; re-inserting an existing key replaces
/// its value without moving it. Entries can be popped from either end and
/// moved to either end in O(1).
///
/// The generic parameters are:
/// - `K`: Key type, must implement `Hash + Eq`
/// - `V`: Value type
/// - `S`: Hash builder type, defaults to the standard hasher
///
/// # Examples
///
/// ```
/// use orderedmap::ordered_map::OrderedMap;
///
/// let mut map = OrderedMap::new();
/// map.insert("apple", 5);
/// map.insert("banana", 3);
/// map.insert("cherry", 8);
/// map.move_to_first(&"cherry");
///
/// assert_eq!(map.pop_first(), Some(("cherry", 8)));
/// assert_eq!(map.pop_last(), Some(("banana", 3)));
/// assert_eq!(map.to_string(), "OrderedMap[apple:5, ]");
/// ```
pub struct OrderedMap<K, V, S = RandomState> {
    nodes: Arena<K, V>,
    table: HashTable<Ptr>,
    hasher: S,
    /// One strong count per unfinished [`LiveIter`], plus our own.
    pins: Arc<()>,
}

impl<K, V> OrderedMap<K, V> {
    /// Creates a new, empty map.
    ///
    /// # Examples
    ///
    /// ```
    /// use orderedmap::OrderedMap;
    ///
    /// let mut map: OrderedMap<&str, i32> = OrderedMap::new();
    /// assert!(map.is_empty());
    /// map.insert("key", 42);
    /// assert!(!map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new map able to hold at least `capacity` entries without
    /// reallocating.
    ///
    /// # Examples
    ///
    /// ```
    /// use orderedmap::OrderedMap;
    ///
    /// let map: OrderedMap<&str, i32> = OrderedMap::with_capacity(10);
    /// assert_eq!(map.len(), 0);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::default())
    }
}

impl<K, V, S> OrderedMap<K, V, S> {
    /// Creates a new, empty map which will use the given hash builder.
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    /// Creates a new map with the specified capacity and hasher.
    ///
    /// # Examples
    ///
    /// ```
    /// # use hashbrown::DefaultHashBuilder as RandomState;
    /// use orderedmap::ordered_map::OrderedMap;
    ///
    /// let hasher = RandomState::default();
    /// let mut map: OrderedMap<&str, i32, _> = OrderedMap::with_capacity_and_hasher(10, hasher);
    /// map.insert("key", 42);
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        OrderedMap {
            nodes: Arena::with_capacity(capacity),
            table: HashTable::with_capacity(capacity),
            hasher,
            pins: Arc::new(()),
        }
    }

    /// Returns a reference to the map's hash builder.
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Returns the number of entries in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use orderedmap::OrderedMap;
    ///
    /// let mut map = OrderedMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the oldest entry, or `None` if the map is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use orderedmap::OrderedMap;
    ///
    /// let mut map = OrderedMap::new();
    /// assert_eq!(map.first(), None);
    /// map.insert("a", 1);
    /// map.insert("b", 2);
    /// assert_eq!(map.first(), Some((&"a", &1)));
    /// ```
    pub fn first(&self) -> Option<(&K, &V)> {
        self.entry_at(self.nodes.head())
    }

    /// Returns the newest entry, or `None` if the map is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use orderedmap::OrderedMap;
    ///
    /// let mut map = OrderedMap::new();
    /// map.insert("a", 1);
    /// map.insert("b", 2);
    /// assert_eq!(map.last(), Some((&"b", &2)));
    /// ```
    pub fn last(&self) -> Option<(&K, &V)> {
        self.entry_at(self.nodes.tail())
    }

    fn entry_at(&self, ptr: Ptr) -> Option<(&K, &V)> {
        if ptr.is_sentinel() {
            return None;
        }
        let data = &self.nodes[ptr];
        Some((&data.key, &data.value))
    }

    /// Removes and returns the entry at the given end, or `None` if the map
    /// is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use orderedmap::{End, OrderedMap};
    ///
    /// let mut map: OrderedMap<_, _> = (0..3).map(|i| (i, i * 10)).collect();
    /// assert_eq!(map.pop(End::Last), Some((2, 20)));
    /// assert_eq!(map.pop(End::First), Some((0, 0)));
    /// assert_eq!(map.pop(true.into()), Some((1, 10)));
    /// assert_eq!(map.pop(End::First), None);
    /// ```
    pub fn pop(&mut self, end: End) -> Option<(K, V)> {
        let ptr = match end {
            End::First => self.nodes.head(),
            End::Last => self.nodes.tail(),
        };
        if ptr.is_sentinel() {
            return None;
        }
        let data = self.remove_ptr(ptr);
        Some((data.key, data.value))
    }

    /// Removes and returns the oldest entry.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.pop(End::First)
    }

    /// Removes and returns the newest entry.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.pop(End::Last)
    }

    /// Removes all entries.
    ///
    /// Outstanding [`LiveIter`]s finish on their next step.
    ///
    /// # Examples
    ///
    /// ```
    /// use orderedmap::OrderedMap;
    ///
    /// let mut map = OrderedMap::new();
    /// map.insert("a", 1);
    /// map.clear();
    /// assert!(map.is_empty());
    /// assert_eq!(map.first(), None);
    /// ```
    pub fn clear(&mut self) {
        if self.is_pinned() {
            #[cfg(feature = "tracing")]
            tracing::trace!(len = self.len(), "clearing map with live cursors");
            let mut ptr = self.nodes.head();
            while !ptr.is_sentinel() {
                self.nodes.unlink(ptr);
                self.nodes.retire(ptr);
                ptr = self.nodes.head();
            }
            self.table.clear();
        } else {
            self.nodes.clear();
            self.table.clear();
        }
    }

    /// Retains only the entries for which `f` returns `true`, visiting them
    /// in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use orderedmap::OrderedMap;
    ///
    /// let mut map: OrderedMap<_, _> = (0..6).map(|i| (i, i)).collect();
    /// map.retain(|k, v| {
    ///     *v *= 10;
    ///     k % 2 == 0
    /// });
    /// assert_eq!(map.to_string(), "OrderedMap[0:0, 2:20, 4:40, ]");
    /// ```
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut ptr = self.nodes.head();
        while !ptr.is_sentinel() {
            let next = self.nodes.links(ptr).next();
            let data = &mut self.nodes[ptr];
            if !f(&data.key, &mut data.value) {
                self.remove_ptr(ptr);
            }
            ptr = next;
        }
    }

    /// Shrinks the capacity of the map as much as possible.
    pub fn shrink_to_fit(&mut self) {
        self.reclaim_if_unpinned();
        let nodes = &self.nodes;
        self.table.shrink_to_fit(|&ptr| nodes[ptr].hash);
        self.nodes.shrink_to_fit();
    }

    /// Returns a borrowing iterator over the entries in order. Use
    /// [`Iterator::rev`] to walk from the newest entry.
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
    /// let reversed: Vec<_> = map.iter().rev().collect();
    /// assert_eq!(reversed, [(&"b", &2), (&"a", &1)]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.nodes, self.len())
    }

    /// Returns an iterator over the keys in order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values in order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Creates a cursor that walks the map from oldest to newest without
    /// borrowing it.
    ///
    /// The map may be freely mutated between steps. Values updated ahead of
    /// the cursor are seen with their new value, keys inserted during the
    /// walk are reached before it finishes, and removing the entry under the
    /// cursor does not stop it.
    ///
    /// # Examples
    ///
    /// ```
    /// use orderedmap::OrderedMap;
    ///
    /// let mut map: OrderedMap<_, _> = (0..3).map(|i| (i, i)).collect();
    /// let mut cursor = map.live_iter();
    /// let mut seen = Vec::new();
    /// while let Some((&key, _)) = cursor.next(&map) {
    ///     seen.push(key);
    ///     if key < 3 {
    ///         map.insert(key + 10, key);
    ///     }
    ///     map.remove(&key);
    /// }
    /// assert_eq!(seen, [0, 1, 2, 10, 11, 12]);
    /// assert!(map.is_empty());
    /// ```
    pub fn live_iter(&self) -> LiveIter {
        LiveIter::new(Arc::clone(&self.pins), Direction::Forward)
    }

    /// Creates a cursor that walks the map from newest to oldest without
    /// borrowing it.
    ///
    /// Keys inserted during a reverse walk land behind the cursor and are not
    /// visited.
    pub fn live_iter_rev(&self) -> LiveIter {
        LiveIter::new(Arc::clone(&self.pins), Direction::Reverse)
    }

    fn is_pinned(&self) -> bool {
        Arc::strong_count(&self.pins) > 1
    }

    fn reclaim_if_unpinned(&mut self) {
        if self.nodes.retired_len() == 0 || self.is_pinned() {
            return;
        }
        let _reclaimed = self.nodes.reclaim_retired();
        #[cfg(feature = "tracing")]
        tracing::trace!(reclaimed = _reclaimed, "reclaimed retired slots");
    }

    /// Unlinks a live slot and drops it from the index. While cursors exist
    /// the slot is retired with its links intact instead of freed.
    fn remove_ptr(&mut self, ptr: Ptr) -> LLData<K, V> {
        let hash = self.nodes[ptr].hash;
        match self.table.find_entry(hash, |&p| p == ptr) {
            Ok(occupied) => {
                occupied.remove();
            }
            Err(_) => unreachable!("live slot missing from the index"),
        }

        self.nodes.unlink(ptr);
        if self.is_pinned() {
            self.nodes.retire(ptr)
        } else {
            let data = self.nodes.free(ptr);
            self.reclaim_if_unpinned();
            data
        }
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> OrderedMap<K, V, S> {
    fn find<Q>(&self, key: &Q) -> Option<Ptr>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let nodes = &self.nodes;
        self.table
            .find(self.hasher.hash_one(key), |&ptr| {
                <K as Borrow<Q>>::borrow(&nodes[ptr].key) == key
            })
            .copied()
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map did not have this key present, `None` is returned and the
    /// entry is appended at the newest end.
    ///
    /// If the map did have this key present, the value is updated and the old
    /// value is returned. The entry is **not** moved.
    ///
    /// # Examples
    ///
    /// ```
    /// use orderedmap::OrderedMap;
    ///
    /// let mut map = OrderedMap::new();
    /// assert_eq!(map.insert(37, "a"), None);
    /// map.insert(38, "b");
    /// assert_eq!(map.insert(37, "c"), Some("a"));
    /// assert_eq!(map.first(), Some((&37, &"c")));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.reclaim_if_unpinned();

        let hash = self.hasher.hash_one(&key);
        let Self { nodes, table, .. } = self;
        let entry = table.entry(
            hash,
            |&ptr| nodes[ptr].key == key,
            |&ptr| nodes[ptr].hash,
        );
        match entry {
            hash_table::Entry::Occupied(occupied) => {
                let ptr = *occupied.get();
                Some(core::mem::replace(&mut nodes[ptr].value, value))
            }
            hash_table::Entry::Vacant(vacant) => {
                let ptr = nodes.alloc(key, value, hash);
                nodes.link_before(ptr, Ptr::SENTINEL);
                vacant.insert(ptr);
                None
            }
        }
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but
    /// `Hash` and `Eq` on the borrowed form must match those for the key type.
    ///
    /// # Examples
    ///
    /// ```
    /// use orderedmap::OrderedMap;
    ///
    /// let mut map = OrderedMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).map(|ptr| &self.nodes[ptr].value)
    }

    /// Returns the stored key and value corresponding to the key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).and_then(|ptr| self.entry_at(ptr))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use orderedmap::OrderedMap;
    ///
    /// let mut map = OrderedMap::new();
    /// map.insert(1, "a");
    /// if let Some(x) = map.get_mut(&1) {
    ///     *x = "b";
    /// }
    /// assert_eq!(map[&1], "b");
    /// ```
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let ptr = self.find(key)?;
        Some(&mut self.nodes[ptr].value)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Removes a key from the map, returning the value if the key was
    /// previously in the map. Removing an absent key is a no-op.
    ///
    /// # Examples
    ///
    /// ```
    /// use orderedmap::OrderedMap;
    ///
    /// let mut map = OrderedMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value if the
    /// key was previously in the map.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let ptr = self.find(key)?;
        let data = self.remove_ptr(ptr);
        Some((data.key, data.value))
    }

    /// Moves an existing entry to the given end, keeping its value. Returns
    /// `false` and leaves the map untouched if the key is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use orderedmap::{End, OrderedMap};
    ///
    /// let mut map: OrderedMap<_, _> = (0..4).map(|i| (i, ())).collect();
    /// assert!(map.move_to(&0, End::Last));
    /// assert!(map.move_to(&2, End::First));
    /// assert!(!map.move_to(&9, End::First));
    /// assert_eq!(map.keys().copied().collect::<Vec<_>>(), [2, 1, 3, 0]);
    /// ```
    pub fn move_to<Q>(&mut self, key: &Q, end: End) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(ptr) = self.find(key) else {
            return false;
        };

        self.nodes.unlink(ptr);
        match end {
            End::First => self.nodes.link_after(ptr, Ptr::SENTINEL),
            End::Last => self.nodes.link_before(ptr, Ptr::SENTINEL),
        }
        true
    }

    /// Moves an existing entry to the oldest end.
    pub fn move_to_first<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.move_to(key, End::First)
    }

    /// Moves an existing entry to the newest end.
    pub fn move_to_last<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.move_to(key, End::Last)
    }
}

impl<K: Clone, V: Clone, S: Clone> Clone for OrderedMap<K, V, S> {
    fn clone(&self) -> Self {
        OrderedMap {
            nodes: self.nodes.clone(),
            table: self.table.clone(),
            hasher: self.hasher.clone(),
            pins: Arc::new(()),
        }
    }
}

impl<K, V, S: Default> Default for OrderedMap<K, V, S> {
    fn default() -> Self {
        OrderedMap::with_capacity_and_hasher(0, S::default())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for OrderedMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display, S> fmt::Display for OrderedMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OrderedMap[")?;
        for (key, value) in self.iter() {
            write!(f, "{key}:{value}, ")?;
        }
        f.write_str("]")
    }
}

impl<K, V, S> PartialEq for OrderedMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }

        self.iter()
            .all(|(key, value)| other.get(key).is_some_and(|v| *value == *v))
    }
}

impl<K, V, S> Eq for OrderedMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> FromIterator<(K, V)> for OrderedMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = OrderedMap::with_capacity_and_hasher(iter.size_hint().0, S::default());
        map.extend(iter);
        map
    }
}

impl<K, V, S> Extend<(K, V)> for OrderedMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K, V, S> Extend<(&'a K, &'a V)> for OrderedMap<K, V, S>
where
    K: Hash + Eq + Copy,
    V: Copy,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: I) {
        for (&key, &value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, S> IntoIterator for OrderedMap<K, V, S> {
    type IntoIter = IntoIter<K, V, S>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { map: self }
    }
}

impl<'a, K, V, S> IntoIterator for &'a OrderedMap<K, V, S> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, Q, V, S> Index<&Q> for OrderedMap<K, V, S>
where
    K: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    S: BuildHasher,
{
    type Output = V;

    /// Returns a reference to the value for `key`.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &Self::Output {
        self.get(key).expect("key not found in OrderedMap")
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::string::{
        String,
        ToString,
    };
    use alloc::vec;
    use alloc::vec::Vec;

    use proptest::prelude::*;

    use super::*;
    use crate::OrderedMap;

    fn seeded(n: i32) -> OrderedMap<i32, i32> {
        (0..n).map(|i| (i, i)).collect()
    }

    fn forward(map: &OrderedMap<i32, i32>) -> Vec<(i32, i32)> {
        map.iter().map(|(&k, &v)| (k, v)).collect()
    }

    fn live_forward(map: &OrderedMap<i32, i32>) -> Vec<(i32, i32)> {
        let mut cursor = map.live_iter();
        let mut out = Vec::new();
        while let Some((&k, &v)) = cursor.next(map) {
            out.push((k, v));
        }
        out
    }

    fn live_reverse(map: &OrderedMap<i32, i32>) -> Vec<(i32, i32)> {
        let mut cursor = map.live_iter_rev();
        let mut out = Vec::new();
        while let Some((&k, &v)) = cursor.next(map) {
            out.push((k, v));
        }
        out
    }

    fn assert_consistent(map: &OrderedMap<i32, i32>) {
        let fwd = live_forward(map);
        let mut rev = live_reverse(map);
        rev.reverse();
        assert_eq!(fwd.len(), map.len());
        assert_eq!(fwd, rev);
        assert_eq!(fwd, forward(map));
    }

    #[test]
    fn test_new_and_default() {
        let map: OrderedMap<i32, Vec<i32>> = OrderedMap::default();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.first(), None);
        assert_eq!(map.last(), None);
    }

    #[test]
    fn test_insert_preserves_first_insertion_position() {
        let mut map = OrderedMap::new();
        for key in [3, 1, 4, 5, 9, 2, 6] {
            assert_eq!(map.insert(key, key * 10), None);
        }
        assert_eq!(map.insert(4, -4), Some(40));
        assert_eq!(map.insert(3, -3), Some(30));

        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, [3, 1, 4, 5, 9, 2, 6]);
        assert_eq!(map.get(&4), Some(&-4));
        assert_eq!(map.len(), 7);
        assert_consistent(&map);
    }

    #[test]
    fn test_get_and_remove_round_trip() {
        let mut map = OrderedMap::new();
        map.insert("k".to_string(), 7);
        assert_eq!(map.get("k"), Some(&7));
        assert_eq!(map.get_key_value("k"), Some((&"k".to_string(), &7)));
        assert!(map.contains_key("k"));

        map.remove("k");
        assert_eq!(map.get("k"), None);
        assert!(!map.contains_key("k"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_none_is_a_storable_value() {
        let mut map: OrderedMap<i32, Option<i32>> = OrderedMap::new();
        map.insert(1, None);
        assert_eq!(map.get(&1), Some(&None));
        assert_eq!(map.get(&2), None);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut map = seeded(3);
        assert_eq!(map.remove(&10), None);
        assert_eq!(forward(&map), [(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn test_remove_middle_head_and_tail() {
        let mut map = seeded(5);
        assert_eq!(map.remove_entry(&2), Some((2, 2)));
        assert_eq!(map.remove(&0), Some(0));
        assert_eq!(map.remove(&4), Some(4));
        assert_eq!(forward(&map), [(1, 1), (3, 3)]);
        assert_eq!(map.first(), Some((&1, &1)));
        assert_eq!(map.last(), Some((&3, &3)));
        assert_consistent(&map);
    }

    #[test]
    fn test_pop_first_drains_in_order() {
        let mut map = seeded(5);
        for expected in 0..5 {
            assert_eq!(map.pop_first(), Some((expected, expected)));
        }
        assert_eq!(map.pop_first(), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_pop_last_drains_in_reverse() {
        let mut map = seeded(5);
        for expected in (0..5).rev() {
            assert_eq!(map.pop_last(), Some((expected, expected)));
        }
        assert_eq!(map.pop_last(), None);
    }

    #[test]
    fn test_pop_with_bool_selector() {
        let mut map = seeded(2);
        assert_eq!(map.pop(true.into()), Some((1, 1)));
        assert_eq!(map.pop(false.into()), Some((0, 0)));
        assert_eq!(map.pop(End::Last), None);
    }

    #[test]
    fn test_move_to_ends() {
        let mut map = seeded(5);
        assert!(map.move_to_last(&1));
        assert!(map.move_to_first(&3));
        assert_eq!(forward(&map), [(3, 3), (0, 0), (2, 2), (4, 4), (1, 1)]);
        assert_eq!(map.len(), 5);
        assert_consistent(&map);
    }

    #[test]
    fn test_move_already_at_end_is_noop() {
        let mut map = seeded(4);
        let before = forward(&map);
        assert!(map.move_to_last(&3));
        assert!(map.move_to_first(&0));
        assert_eq!(forward(&map), before);
        assert_consistent(&map);

        let mut single = seeded(1);
        assert!(single.move_to_first(&0));
        assert!(single.move_to_last(&0));
        assert_eq!(forward(&single), [(0, 0)]);
        assert_consistent(&single);
    }

    #[test]
    fn test_move_is_idempotent() {
        let mut once = seeded(6);
        let mut twice = seeded(6);
        once.move_to_last(&2);
        twice.move_to_last(&2);
        twice.move_to_last(&2);
        assert_eq!(forward(&once), forward(&twice));
    }

    #[test]
    fn test_move_absent_key() {
        let mut map = seeded(3);
        assert!(!map.move_to(&7, End::First));
        assert!(!map.move_to(&7, End::Last));
        assert_eq!(forward(&map), [(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn test_empty_map_queries() {
        let mut map: OrderedMap<i32, i32> = OrderedMap::new();
        assert_eq!(map.first(), None);
        assert_eq!(map.last(), None);
        assert_eq!(map.pop_first(), None);
        assert_eq!(map.pop_last(), None);
        assert!(!map.move_to_first(&0));
        assert!(!map.move_to_last(&0));
        assert!(map.is_empty());
        assert_consistent(&map);
    }

    #[test]
    fn test_clear_and_reuse() {
        let mut map = seeded(10);
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.nodes.head(), Ptr::SENTINEL);
        map.insert(1, 1);
        assert_eq!(forward(&map), [(1, 1)]);
    }

    #[test]
    fn test_retain() {
        let mut map = seeded(10);
        map.retain(|k, _| k % 3 == 0);
        assert_eq!(forward(&map), [(0, 0), (3, 3), (6, 6), (9, 9)]);
        assert_consistent(&map);
    }

    #[test]
    fn test_display() {
        let mut map = OrderedMap::new();
        assert_eq!(map.to_string(), "OrderedMap[]");
        map.insert("a", 1);
        map.insert("b", 2);
        assert_eq!(map.to_string(), "OrderedMap[a:1, b:2, ]");
    }

    #[test]
    fn test_debug() {
        let mut map = OrderedMap::new();
        map.insert(2, "two");
        map.insert(1, "one");
        assert_eq!(format!("{map:?}"), r#"{2: "two", 1: "one"}"#);
    }

    #[test]
    fn test_index() {
        let map = seeded(3);
        assert_eq!(map[&2], 2);
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn test_index_missing() {
        let map = seeded(3);
        let _value = map[&3];
    }

    #[test]
    fn test_clone_is_independent() {
        let mut map = seeded(3);
        let cloned = map.clone();
        map.insert(3, 3);
        map.move_to_first(&2);
        assert_eq!(forward(&cloned), [(0, 0), (1, 1), (2, 2)]);
        assert_eq!(forward(&map), [(2, 2), (0, 0), (1, 1), (3, 3)]);
    }

    #[test]
    fn test_clone_does_not_share_pins() {
        let map = seeded(3);
        let _cursor = map.live_iter();
        let mut cloned = map.clone();
        cloned.remove(&1);
        assert_eq!(cloned.nodes.retired_len(), 0);
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = seeded(4);
        let mut b = seeded(4);
        b.move_to_first(&3);
        assert_eq!(a, b);
        b.insert(0, 100);
        assert_ne!(a, b);
    }

    #[test]
    fn test_extend_and_into_iter() {
        let mut map = seeded(2);
        map.extend([(5, 5), (1, 10)]);
        let other = seeded(3);
        map.extend(&other);

        let drained: Vec<_> = map.into_iter().collect();
        assert_eq!(drained, [(0, 0), (1, 1), (5, 5), (2, 2)]);
    }

    #[test]
    fn test_string_keys_borrowed_lookup() {
        let mut map: OrderedMap<String, usize> = OrderedMap::new();
        for word in ["alpha", "beta", "gamma"] {
            map.insert(word.to_string(), word.len());
        }
        assert!(map.move_to_first("gamma"));
        assert_eq!(map.remove("beta"), Some(4));
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["gamma", "alpha"]);
    }

    #[test]
    fn test_slots_are_reused_without_cursors() {
        let mut map = seeded(4);
        let first_slot = map.nodes.head();
        map.remove(&0);
        map.insert(10, 10);
        assert_eq!(map.nodes.tail(), first_slot);
        assert_eq!(map.nodes.retired_len(), 0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u8, u16),
        Remove(u8),
        MoveFirst(u8),
        MoveLast(u8),
        PopFirst,
        PopLast,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..16, any::<u16>()).prop_map(|(k, v)| Op::Insert(k, v)),
            (0u8..16).prop_map(Op::Remove),
            (0u8..16).prop_map(Op::MoveFirst),
            (0u8..16).prop_map(Op::MoveLast),
            Just(Op::PopFirst),
            Just(Op::PopLast),
        ]
    }

    proptest! {
        #[test]
        fn prop_matches_vec_model(ops in prop::collection::vec(op_strategy(), 0..200)) {
            let mut map: OrderedMap<u8, u16> = OrderedMap::new();
            let mut model: Vec<(u8, u16)> = Vec::new();

            for op in ops {
                match op {
                    Op::Insert(k, v) => {
                        let old = model.iter().position(|&(mk, _)| mk == k).map(|i| {
                            core::mem::replace(&mut model[i].1, v)
                        });
                        if old.is_none() {
                            model.push((k, v));
                        }
                        prop_assert_eq!(map.insert(k, v), old);
                    }
                    Op::Remove(k) => {
                        let old = model
                            .iter()
                            .position(|&(mk, _)| mk == k)
                            .map(|i| model.remove(i).1);
                        prop_assert_eq!(map.remove(&k), old);
                    }
                    Op::MoveFirst(k) | Op::MoveLast(k) => {
                        let to_last = matches!(op, Op::MoveLast(_));
                        let found = match model.iter().position(|&(mk, _)| mk == k) {
                            Some(i) => {
                                let entry = model.remove(i);
                                if to_last {
                                    model.push(entry);
                                } else {
                                    model.insert(0, entry);
                                }
                                true
                            }
                            None => false,
                        };
                        prop_assert_eq!(map.move_to(&k, to_last.into()), found);
                    }
                    Op::PopFirst => {
                        let expected = (!model.is_empty()).then(|| model.remove(0));
                        prop_assert_eq!(map.pop_first(), expected);
                    }
                    Op::PopLast => {
                        prop_assert_eq!(map.pop_last(), model.pop());
                    }
                }

                prop_assert_eq!(map.len(), model.len());
            }

            let fwd: Vec<(u8, u16)> = map.iter().map(|(&k, &v)| (k, v)).collect();
            let mut rev: Vec<(u8, u16)> = map.iter().rev().map(|(&k, &v)| (k, v)).collect();
            rev.reverse();
            prop_assert_eq!(&fwd, &model);
            prop_assert_eq!(&rev, &model);
        }
    }
}
