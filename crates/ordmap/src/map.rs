//! Ordered hash map
//!
//! Nodes live in a slot arena and link to each other by slot index, so no
//! node is ever referenced by pointer. The hash index maps each key to the
//! slot holding its node.
//!
//! List order runs from head (oldest) to tail (newest). Every structural
//! change bumps a mutation stamp that in-flight iteration checks.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use ahash::RandomState;
use tracing::trace;

use crate::error::{fatal, invalid_list, Result};
use crate::iter::{Cursor, Iter, Keys, Values};

/// Repositioning applied to an entry as a side effect of an access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Touch {
    /// Leave the entry where it is
    #[default]
    None,
    /// Move the entry to the head (the oldest end)
    MoveToFront,
    /// Move the entry to the tail (the newest end)
    MoveToBack,
}

/// Source of per-map identity tokens
static NEXT_MAP_ID: AtomicU64 = AtomicU64::new(0);

fn next_map_id() -> u64 {
    NEXT_MAP_ID.fetch_add(1, Ordering::Relaxed)
}

/// Node in the doubly-linked list
#[derive(Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) prev: Option<usize>,
    pub(crate) next: Option<usize>,
}

/// Hash map that remembers insertion order and supports O(1) reordering
///
/// # Example
///
/// ```
/// use ordmap::{OrderedMap, Touch};
///
/// let mut map = OrderedMap::new();
/// map.set("a", 1, Touch::None).set("b", 2, Touch::None);
///
/// // Touching "a" makes "b" the oldest entry
/// assert_eq!(map.get("a", Touch::MoveToBack), Some(&1));
/// assert_eq!(map.shift(), Some(2));
/// assert_eq!(map.len(), 1);
/// ```
pub struct OrderedMap<K, V> {
    /// Identity checked by detached cursors; fresh for every map and clone
    id: u64,
    index: HashMap<K, usize, RandomState>,
    nodes: Vec<Option<Node<K, V>>>,
    free_list: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    stamp: u64,
}

impl<K, V> OrderedMap<K, V> {
    /// Create an empty map
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty map with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id: next_map_id(),
            index: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            nodes: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            head: None,
            tail: None,
            stamp: 0,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Current mutation stamp.
    ///
    /// Increases by exactly one on every structural change: inserting a new
    /// key, removing an entry, moving an entry, a trim that evicts something,
    /// and clearing a non-empty map. Replacing a value in place does not
    /// count.
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Value at the head without touching it
    pub fn first(&self) -> Option<&V> {
        self.head.map(|idx| &self.node(idx).value)
    }

    /// Value at the tail without touching it
    pub fn last(&self) -> Option<&V> {
        self.tail.map(|idx| &self.node(idx).value)
    }

    /// Key at the head
    pub fn first_key(&self) -> Option<&K> {
        self.head.map(|idx| &self.node(idx).key)
    }

    /// Key at the tail
    pub fn last_key(&self) -> Option<&K> {
        self.tail.map(|idx| &self.node(idx).key)
    }

    /// Detached cursor over the entries, head to tail.
    ///
    /// Unlike [`iter`](Self::iter), a cursor does not borrow the map, so the
    /// map can still be mutated while the cursor is alive. The next step
    /// after such a mutation fails with
    /// [`Error::ModifiedDuringIteration`](crate::Error::ModifiedDuringIteration).
    /// Stepping it against any other map, clones included, fails with
    /// [`Error::ForeignCursor`](crate::Error::ForeignCursor).
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.id, self.head, self.stamp, self.len())
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Iterator over `(key, value)` pairs, head to tail
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    /// Iterator over keys, head to tail
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Iterator over values, head to tail
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Call `f(value, key, map)` for every entry, head to tail.
    ///
    /// The callback only gets a shared borrow of the map, so it cannot
    /// mutate it:
    ///
    /// ```compile_fail,E0502
    /// use ordmap::{OrderedMap, Touch};
    ///
    /// let mut map = OrderedMap::new();
    /// map.set("a", 1, Touch::None);
    /// map.for_each(|_, key, _| {
    ///     map.delete(key);
    /// });
    /// ```
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&V, &K, &Self),
    {
        let mut cursor = self.cursor();
        loop {
            match cursor.next_entry(self) {
                Ok(Some((key, value))) => f(value, key, self),
                Ok(None) => break,
                Err(err) => fatal(err),
            }
        }
    }

    pub(crate) fn node(&self, idx: usize) -> &Node<K, V> {
        match self.nodes.get(idx).and_then(Option::as_ref) {
            Some(node) => node,
            None => fatal(invalid_list(format!("slot {} is vacant", idx))),
        }
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<K, V> {
        match self.nodes.get_mut(idx).and_then(Option::as_mut) {
            Some(node) => node,
            None => fatal(invalid_list(format!("slot {} is vacant", idx))),
        }
    }

    fn alloc_node(&mut self, node: Node<K, V>) -> usize {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn free_node(&mut self, idx: usize) -> Node<K, V> {
        match self.nodes.get_mut(idx).and_then(Option::take) {
            Some(node) => {
                self.free_list.push(idx);
                node
            }
            None => fatal(invalid_list(format!("freeing vacant slot {}", idx))),
        }
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(head_idx) => self.node_mut(head_idx).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn link_back(&mut self, idx: usize) {
        let old_tail = self.tail;
        {
            let node = self.node_mut(idx);
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(tail_idx) => self.node_mut(tail_idx).next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node_mut(idx);
            (node.prev.take(), node.next.take())
        };

        match prev {
            Some(prev_idx) => self.node_mut(prev_idx).next = next,
            None => self.head = next,
        }

        match next {
            Some(next_idx) => self.node_mut(next_idx).prev = prev,
            None => self.tail = prev,
        }
    }

    /// Move the node in `idx` to the end named by `touch`.
    ///
    /// Returns false, leaving the stamp alone, when nothing moved.
    fn touch(&mut self, idx: usize, touch: Touch) -> bool {
        match touch {
            Touch::None => return false,
            Touch::MoveToFront if self.head == Some(idx) => return false,
            Touch::MoveToBack if self.tail == Some(idx) => return false,
            Touch::MoveToFront => {
                self.unlink(idx);
                self.link_front(idx);
            }
            Touch::MoveToBack => {
                self.unlink(idx);
                self.link_back(idx);
            }
        }
        self.stamp += 1;
        true
    }
}

impl<K, V> OrderedMap<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Look up a value, repositioning the entry per `touch`
    pub fn get<Q>(&mut self, key: &Q, touch: Touch) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.touch(idx, touch);
        Some(&self.node(idx).value)
    }

    /// Mutable lookup, repositioning the entry per `touch`
    pub fn get_mut<Q>(&mut self, key: &Q, touch: Touch) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.touch(idx, touch);
        Some(&mut self.node_mut(idx).value)
    }

    /// Look up a value without affecting its position
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).map(|&idx| &self.node(idx).value)
    }

    /// Check if `key` is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Insert or update an entry.
    ///
    /// An existing key keeps its position unless `touch` asks for a move.
    /// A new key is appended at the tail, or inserted at the head for
    /// [`Touch::MoveToFront`].
    pub fn set(&mut self, key: K, value: V, touch: Touch) -> &mut Self {
        if let Some(&idx) = self.index.get(&key) {
            self.node_mut(idx).value = value;
            self.touch(idx, touch);
        } else {
            let idx = self.alloc_node(Node {
                key: key.clone(),
                value,
                prev: None,
                next: None,
            });
            match touch {
                Touch::MoveToFront => self.link_front(idx),
                Touch::None | Touch::MoveToBack => self.link_back(idx),
            }
            self.index.insert(key, idx);
            self.stamp += 1;
        }
        self
    }

    /// Reposition an entry without reading it.
    ///
    /// Returns true if the entry moved.
    pub fn touch_key<Q>(&mut self, key: &Q, touch: Touch) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(key) {
            Some(&idx) => self.touch(idx, touch),
            None => false,
        }
    }

    /// Remove an entry, returning whether it was present
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).is_some()
    }

    /// Remove an entry, returning its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Remove an entry, returning its key and value
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.index.remove(key)?;
        self.unlink(idx);
        let node = self.free_node(idx);
        self.stamp += 1;
        Some((node.key, node.value))
    }

    /// Remove and return the value at the head (the oldest entry)
    pub fn shift(&mut self) -> Option<V> {
        match (self.head, self.tail) {
            (None, None) => None,
            (Some(idx), Some(_)) => Some(self.evict(idx).1),
            _ => fatal(invalid_list("head and tail disagree")),
        }
    }

    /// Remove and return the value at the tail (the newest entry)
    pub fn pop_back(&mut self) -> Option<V> {
        match (self.head, self.tail) {
            (None, None) => None,
            (Some(_), Some(idx)) => Some(self.evict(idx).1),
            _ => fatal(invalid_list("head and tail disagree")),
        }
    }

    fn evict(&mut self, idx: usize) -> (K, V) {
        self.unlink(idx);
        let node = self.free_node(idx);
        self.index.remove(&node.key);
        self.stamp += 1;
        (node.key, node.value)
    }

    /// Evict the oldest entries until at most `new_size` remain.
    ///
    /// Returns the number of evicted entries.
    pub fn trim_old(&mut self, new_size: usize) -> usize {
        let size = self.len();
        if new_size >= size {
            return 0;
        }
        if new_size == 0 {
            self.clear();
            return size;
        }

        let mut current = self.head;
        let mut remaining = size;
        while remaining > new_size {
            let Some(idx) = current else {
                fatal(invalid_list("list shorter than size"))
            };
            let node = self.free_node(idx);
            self.index.remove(&node.key);
            current = node.next;
            remaining -= 1;
        }

        self.head = current;
        if let Some(idx) = current {
            self.node_mut(idx).prev = None;
        }
        self.stamp += 1;

        let evicted = size - new_size;
        trace!(evicted, new_size, "trimmed oldest entries");
        evicted
    }

    /// Evict the newest entries until at most `new_size` remain.
    ///
    /// Returns the number of evicted entries.
    pub fn trim_new(&mut self, new_size: usize) -> usize {
        let size = self.len();
        if new_size >= size {
            return 0;
        }
        if new_size == 0 {
            self.clear();
            return size;
        }

        let mut current = self.tail;
        let mut remaining = size;
        while remaining > new_size {
            let Some(idx) = current else {
                fatal(invalid_list("list shorter than size"))
            };
            let node = self.free_node(idx);
            self.index.remove(&node.key);
            current = node.prev;
            remaining -= 1;
        }

        self.tail = current;
        if let Some(idx) = current {
            self.node_mut(idx).next = None;
        }
        self.stamp += 1;

        let evicted = size - new_size;
        trace!(evicted, new_size, "trimmed newest entries");
        evicted
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        let was_empty = self.is_empty();
        self.index.clear();
        self.nodes.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
        if !was_empty {
            self.stamp += 1;
            trace!("cleared map");
        }
    }

    /// Verify the list/index invariants.
    ///
    /// Checks that head and tail agree with the size, that walking the list
    /// visits every indexed node exactly once with consistent back links,
    /// and that the arena holds no stray nodes.
    pub fn check_invariants(&self) -> Result<()> {
        let size = self.len();

        if self.head.is_some() != self.tail.is_some() {
            return Err(invalid_list("head and tail disagree"));
        }
        if self.head.is_some() != (size > 0) {
            return Err(invalid_list(format!(
                "head/tail presence disagrees with size {}",
                size
            )));
        }

        let mut seen = 0;
        let mut prev = None;
        let mut current = self.head;
        while let Some(idx) = current {
            if seen == size {
                return Err(invalid_list("list longer than size"));
            }
            let node = self
                .nodes
                .get(idx)
                .and_then(Option::as_ref)
                .ok_or_else(|| invalid_list(format!("linked slot {} is vacant", idx)))?;
            if node.prev != prev {
                return Err(invalid_list(format!("back link mismatch at slot {}", idx)));
            }
            if self.index.get(&node.key) != Some(&idx) {
                return Err(invalid_list(format!("slot {} not indexed under its key", idx)));
            }
            seen += 1;
            prev = current;
            current = node.next;
        }

        if prev != self.tail {
            return Err(invalid_list("walk did not end at tail"));
        }
        if seen != size {
            return Err(invalid_list(format!("walked {} nodes, size is {}", seen, size)));
        }

        let occupied = self.nodes.iter().filter(|slot| slot.is_some()).count();
        if occupied != size {
            return Err(invalid_list(format!("arena holds {} nodes, size is {}", occupied, size)));
        }
        if self.nodes.len() - occupied != self.free_list.len() {
            return Err(invalid_list("free list out of sync with arena"));
        }

        Ok(())
    }
}

impl<K: Clone, V: Clone> Clone for OrderedMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            id: next_map_id(),
            index: self.index.clone(),
            nodes: self.nodes.clone(),
            free_list: self.free_list.clone(),
            head: self.head,
            tail: self.tail,
            stamp: self.stamp,
        }
    }
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OrderedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V> IntoIterator for &'a OrderedMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Hash + Eq + Clone, V> Extend<(K, V)> for OrderedMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value, Touch::None);
        }
    }
}

impl<K: Hash + Eq + Clone, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V> From<OrderedMap<K, V>> for Vec<(K, V)> {
    /// Consume the map into its entries, head to tail
    fn from(mut map: OrderedMap<K, V>) -> Self {
        let mut entries = Vec::with_capacity(map.len());
        let mut current = map.head;
        while let Some(idx) = current {
            match map.nodes.get_mut(idx).and_then(Option::take) {
                Some(node) => {
                    current = node.next;
                    entries.push((node.key, node.value));
                }
                None => fatal(invalid_list(format!("linked slot {} is vacant", idx))),
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn keys_of(map: &OrderedMap<&'static str, i32>) -> Vec<&'static str> {
        map.keys().copied().collect()
    }

    #[test]
    fn test_set_appends_in_order() {
        let mut map = OrderedMap::new();
        map.set("a", 1, Touch::None)
            .set("b", 2, Touch::None)
            .set("c", 3, Touch::MoveToBack);

        assert_eq!(keys_of(&map), vec!["a", "b", "c"]);
        assert_eq!(map.first(), Some(&1));
        assert_eq!(map.last(), Some(&3));
        assert_eq!(map.len(), 3);
        map.check_invariants().unwrap();
    }

    #[test]
    fn test_set_new_key_at_front() {
        let mut map = OrderedMap::new();
        map.set("a", 1, Touch::None);
        map.set("b", 2, Touch::MoveToFront);

        assert_eq!(keys_of(&map), vec!["b", "a"]);
        assert_eq!(map.first_key(), Some(&"b"));
        map.check_invariants().unwrap();
    }

    #[test]
    fn test_update_keeps_position_by_default() {
        let mut map = OrderedMap::new();
        map.set("a", 1, Touch::None);
        map.set("b", 2, Touch::None);
        let stamp = map.stamp();

        map.set("a", 10, Touch::None);

        assert_eq!(keys_of(&map), vec!["a", "b"]);
        assert_eq!(map.peek("a"), Some(&10));
        assert_eq!(map.len(), 2);
        assert_eq!(map.stamp(), stamp);
    }

    #[test]
    fn test_update_with_touch_moves() {
        let mut map = OrderedMap::new();
        map.set("a", 1, Touch::None);
        map.set("b", 2, Touch::None);
        map.set("a", 10, Touch::MoveToBack);

        assert_eq!(keys_of(&map), vec!["b", "a"]);
        map.check_invariants().unwrap();
    }

    #[test]
    fn test_touch_reorders_without_changing_size() {
        let mut map = OrderedMap::new();
        map.set("a", 1, Touch::None);
        map.set("b", 2, Touch::None);

        assert_eq!(map.get("a", Touch::MoveToBack), Some(&1));
        assert_eq!(map.len(), 2);
        assert_eq!(map.shift(), Some(2));
        assert_eq!(keys_of(&map), vec!["a"]);
        map.check_invariants().unwrap();
    }

    #[test]
    fn test_touch_head_tail_and_interior() {
        let mut map: OrderedMap<&str, i32> =
            [("a", 1), ("b", 2), ("c", 3), ("d", 4)].into_iter().collect();

        // interior to front
        assert!(map.touch_key("c", Touch::MoveToFront));
        assert_eq!(keys_of(&map), vec!["c", "a", "b", "d"]);
        map.check_invariants().unwrap();

        // tail to front
        assert!(map.touch_key("d", Touch::MoveToFront));
        assert_eq!(keys_of(&map), vec!["d", "c", "a", "b"]);
        map.check_invariants().unwrap();

        // head to back
        assert!(map.touch_key("d", Touch::MoveToBack));
        assert_eq!(keys_of(&map), vec!["c", "a", "b", "d"]);
        map.check_invariants().unwrap();

        // interior to back
        assert!(map.touch_key("a", Touch::MoveToBack));
        assert_eq!(keys_of(&map), vec!["c", "b", "d", "a"]);
        map.check_invariants().unwrap();

        // missing key
        assert!(!map.touch_key("z", Touch::MoveToBack));
    }

    #[test]
    fn test_touch_noop_keeps_stamp() {
        let mut map = OrderedMap::new();
        map.set("a", 1, Touch::None);
        map.set("b", 2, Touch::None);
        let stamp = map.stamp();

        assert!(!map.touch_key("a", Touch::MoveToFront));
        assert!(!map.touch_key("b", Touch::MoveToBack));
        assert!(!map.touch_key("a", Touch::None));
        map.get("b", Touch::MoveToBack);
        assert_eq!(map.stamp(), stamp);

        assert!(map.touch_key("a", Touch::MoveToBack));
        assert_eq!(map.stamp(), stamp + 1);
    }

    #[test]
    fn test_single_entry_touch() {
        let mut map = OrderedMap::new();
        map.set("a", 1, Touch::None);
        assert!(!map.touch_key("a", Touch::MoveToFront));
        assert!(!map.touch_key("a", Touch::MoveToBack));
        map.check_invariants().unwrap();
    }

    #[test]
    fn test_delete_and_remove() {
        let mut map: OrderedMap<&str, i32> =
            [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();

        assert!(map.delete("b"));
        assert!(!map.delete("b"));
        assert_eq!(keys_of(&map), vec!["a", "c"]);
        map.check_invariants().unwrap();

        assert_eq!(map.remove("a"), Some(1));
        assert_eq!(map.remove_entry("c"), Some(("c", 3)));
        assert_eq!(map.remove("c"), None);
        assert!(map.is_empty());
        assert_eq!(map.first(), None);
        map.check_invariants().unwrap();
    }

    #[test]
    fn test_slots_are_reused() {
        let mut map = OrderedMap::new();
        map.set(1, "a", Touch::None);
        map.set(2, "b", Touch::None);
        map.delete(&1);
        map.set(3, "c", Touch::None);

        assert_eq!(map.nodes.len(), 2);
        assert!(map.free_list.is_empty());
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![2, 3]);
        map.check_invariants().unwrap();
    }

    #[test]
    fn test_shift_and_pop_back() {
        let mut map: OrderedMap<&str, i32> =
            [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();

        assert_eq!(map.shift(), Some(1));
        assert_eq!(map.pop_back(), Some(3));
        assert_eq!(keys_of(&map), vec!["b"]);
        assert_eq!(map.shift(), Some(2));
        assert_eq!(map.shift(), None);
        assert_eq!(map.pop_back(), None);
        map.check_invariants().unwrap();
    }

    #[test]
    fn test_trim_old() {
        let mut map: OrderedMap<i32, i32> = (0..5).map(|i| (i, i * 10)).collect();

        assert_eq!(map.trim_old(5), 0);
        assert_eq!(map.trim_old(2), 3);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(map.peek(&0), None);
        map.check_invariants().unwrap();

        assert_eq!(map.trim_old(0), 2);
        assert!(map.is_empty());
        map.check_invariants().unwrap();
    }

    #[test]
    fn test_trim_new() {
        let mut map: OrderedMap<i32, i32> = (0..5).map(|i| (i, i * 10)).collect();

        assert_eq!(map.trim_new(10), 0);
        assert_eq!(map.trim_new(2), 3);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(map.last(), Some(&10));
        map.check_invariants().unwrap();

        // The map stays usable after a trim
        map.set(7, 70, Touch::None);
        map.set(8, 80, Touch::MoveToFront);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![8, 0, 1, 7]);
        map.check_invariants().unwrap();
    }

    #[test]
    fn test_trim_bumps_stamp_once() {
        let mut map: OrderedMap<i32, i32> = (0..5).map(|i| (i, i)).collect();
        let stamp = map.stamp();
        map.trim_old(1);
        assert_eq!(map.stamp(), stamp + 1);
        map.trim_old(1);
        assert_eq!(map.stamp(), stamp + 1);
    }

    #[test]
    fn test_empty_map_edge_cases() {
        let mut map: OrderedMap<&str, i32> = OrderedMap::new();

        assert_eq!(map.shift(), None);
        assert_eq!(map.get("a", Touch::MoveToBack), None);
        assert_eq!(map.peek("a"), None);
        assert_eq!(map.trim_old(0), 0);
        assert_eq!(map.trim_new(3), 0);
        assert_eq!(map.first(), None);
        assert_eq!(map.last(), None);
        assert_eq!(map.stamp(), 0);
        map.check_invariants().unwrap();
    }

    #[test]
    fn test_clear() {
        let mut map: OrderedMap<i32, i32> = (0..3).map(|i| (i, i)).collect();
        let stamp = map.stamp();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.stamp(), stamp + 1);
        map.check_invariants().unwrap();

        map.clear();
        assert_eq!(map.stamp(), stamp + 1);

        map.set(1, 1, Touch::None);
        assert_eq!(map.len(), 1);
        map.check_invariants().unwrap();
    }

    #[test]
    fn test_get_mut() {
        let mut map = OrderedMap::new();
        map.set("a", 1, Touch::None);
        map.set("b", 2, Touch::None);

        if let Some(value) = map.get_mut("a", Touch::MoveToBack) {
            *value += 5;
        }
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![(&"b", &2), (&"a", &6)]);
    }

    #[test]
    fn test_for_each_visits_in_order() {
        let map: OrderedMap<&str, i32> = [("a", 1), ("b", 2)].into_iter().collect();
        let mut seen = Vec::new();
        map.for_each(|value, key, this| {
            assert_eq!(this.len(), 2);
            seen.push((*key, *value));
        });
        assert_eq!(seen, vec![("a", 1), ("b", 2)]);
    }

    #[test]
    fn test_check_invariants_detects_corruption() {
        let mut map: OrderedMap<i32, i32> = (0..3).map(|i| (i, i)).collect();
        map.tail = None;
        assert!(matches!(map.check_invariants(), Err(Error::InvalidList(_))));

        let mut map: OrderedMap<i32, i32> = (0..3).map(|i| (i, i)).collect();
        map.index.remove(&1);
        assert!(map.check_invariants().is_err());
    }

    #[test]
    #[should_panic(expected = "Invalid list")]
    fn test_shift_panics_on_broken_list() {
        let mut map: OrderedMap<i32, i32> = (0..3).map(|i| (i, i)).collect();
        map.tail = None;
        map.shift();
    }

    #[test]
    fn test_into_vec() {
        let mut map: OrderedMap<&str, i32> = [("a", 1), ("b", 2)].into_iter().collect();
        map.touch_key("a", Touch::MoveToBack);
        let entries: Vec<_> = map.into();
        assert_eq!(entries, vec![("b", 2), ("a", 1)]);
    }

    #[test]
    fn test_debug_format() {
        let map: OrderedMap<&str, i32> = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(format!("{:?}", map), r#"{"a": 1, "b": 2}"#);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Operation {
        Set(u8, u32, Touch),
        Get(u8, Touch),
        Delete(u8),
        Shift,
        PopBack,
        TrimOld(usize),
        TrimNew(usize),
        Clear,
    }

    fn touch_strategy() -> impl Strategy<Value = Touch> {
        prop_oneof![
            Just(Touch::None),
            Just(Touch::MoveToFront),
            Just(Touch::MoveToBack),
        ]
    }

    fn operation_strategy() -> impl Strategy<Value = Operation> {
        prop_oneof![
            4 => (0u8..32, any::<u32>(), touch_strategy())
                .prop_map(|(k, v, t)| Operation::Set(k, v, t)),
            3 => (0u8..32, touch_strategy()).prop_map(|(k, t)| Operation::Get(k, t)),
            2 => (0u8..32).prop_map(Operation::Delete),
            1 => Just(Operation::Shift),
            1 => Just(Operation::PopBack),
            1 => (0usize..40).prop_map(Operation::TrimOld),
            1 => (0usize..40).prop_map(Operation::TrimNew),
            1 => Just(Operation::Clear),
        ]
    }

    fn apply(map: &mut OrderedMap<u8, u32>, op: Operation) {
        match op {
            Operation::Set(k, v, t) => {
                map.set(k, v, t);
            }
            Operation::Get(k, t) => {
                map.get(&k, t);
            }
            Operation::Delete(k) => {
                map.delete(&k);
            }
            Operation::Shift => {
                map.shift();
            }
            Operation::PopBack => {
                map.pop_back();
            }
            Operation::TrimOld(n) => {
                map.trim_old(n);
            }
            Operation::TrimNew(n) => {
                map.trim_new(n);
            }
            Operation::Clear => map.clear(),
        }
    }

    proptest! {
        /// Index and list stay bijective after every operation
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_ops_keep_invariants(
            ops in prop::collection::vec(operation_strategy(), 0..300)
        ) {
            let mut map = OrderedMap::new();
            for op in ops {
                apply(&mut map, op);
                if let Err(err) = map.check_invariants() {
                    prop_assert!(false, "{}", err);
                }
                prop_assert_eq!(map.keys().count(), map.len());
            }
        }

        /// The stamp never goes backwards and moves by at most one per call
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_stamp_steps_by_at_most_one(
            ops in prop::collection::vec(operation_strategy(), 0..200)
        ) {
            let mut map = OrderedMap::new();
            for op in ops {
                let before = map.stamp();
                apply(&mut map, op);
                prop_assert!(map.stamp() - before <= 1);
            }
        }

        /// Trims keep exactly the expected end of the list
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_trims_keep_the_right_end(
            len in 0u8..40,
            new_size in 0usize..50
        ) {
            let order: Vec<u8> = (0..len).collect();
            let keep = new_size.min(order.len());

            let mut old: OrderedMap<u8, u32> = order.iter().map(|&k| (k, k as u32)).collect();
            old.trim_old(new_size);
            prop_assert_eq!(
                old.keys().copied().collect::<Vec<_>>(),
                order[order.len() - keep..].to_vec()
            );

            let mut new: OrderedMap<u8, u32> = order.iter().map(|&k| (k, k as u32)).collect();
            new.trim_new(new_size);
            prop_assert_eq!(new.keys().copied().collect::<Vec<_>>(), order[..keep].to_vec());
        }
    }
}
