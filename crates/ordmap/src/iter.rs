//! Fail-fast iteration over an [`OrderedMap`]
//!
//! Every traversal captures the map's mutation stamp when it starts and
//! compares it on each step. The borrowing iterators can never observe a
//! mismatch through safe code; the detached [`Cursor`] can, and reports it
//! as [`Error::ModifiedDuringIteration`]. A cursor also remembers which map
//! made it and refuses to walk any other.

use std::iter::FusedIterator;

use crate::error::{fatal, Error, Result};
use crate::map::OrderedMap;

/// Detached, single-pass position in an [`OrderedMap`]
///
/// # Example
///
/// ```
/// use ordmap::{Error, OrderedMap, Touch};
///
/// let mut map = OrderedMap::new();
/// map.set("a", 1, Touch::None).set("b", 2, Touch::None);
///
/// let mut cursor = map.cursor();
/// assert_eq!(cursor.next_key(&map).unwrap(), Some(&"a"));
///
/// map.set("c", 3, Touch::None);
/// assert!(matches!(cursor.next_key(&map), Err(Error::ModifiedDuringIteration)));
/// ```
#[derive(Debug, Clone)]
pub struct Cursor {
    map_id: u64,
    next: Option<usize>,
    stamp: u64,
    remaining: usize,
}

impl Cursor {
    pub(crate) fn new(map_id: u64, head: Option<usize>, stamp: u64, len: usize) -> Self {
        Self {
            map_id,
            next: head,
            stamp,
            remaining: len,
        }
    }

    /// Step to the next entry.
    ///
    /// Fails with [`Error::ForeignCursor`] when `map` is not the map that
    /// created the cursor, and with [`Error::ModifiedDuringIteration`] once
    /// that map has changed shape.
    pub fn next_entry<'a, K, V>(&mut self, map: &'a OrderedMap<K, V>) -> Result<Option<(&'a K, &'a V)>> {
        if map.id() != self.map_id {
            return Err(Error::ForeignCursor);
        }
        if map.stamp() != self.stamp {
            return Err(Error::ModifiedDuringIteration);
        }
        if self.remaining == 0 {
            return Ok(None);
        }
        let Some(idx) = self.next else {
            return Ok(None);
        };

        let node = map.node(idx);
        self.next = node.next;
        self.remaining -= 1;
        Ok(Some((&node.key, &node.value)))
    }

    /// Step to the next key
    pub fn next_key<'a, K, V>(&mut self, map: &'a OrderedMap<K, V>) -> Result<Option<&'a K>> {
        Ok(self.next_entry(map)?.map(|(key, _)| key))
    }

    /// Step to the next value
    pub fn next_value<'a, K, V>(&mut self, map: &'a OrderedMap<K, V>) -> Result<Option<&'a V>> {
        Ok(self.next_entry(map)?.map(|(_, value)| value))
    }

    /// Entries left before the cursor is exhausted
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

/// Iterator over the entries of an [`OrderedMap`], head to tail
#[derive(Debug, Clone)]
pub struct Iter<'a, K, V> {
    map: &'a OrderedMap<K, V>,
    cursor: Cursor,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(map: &'a OrderedMap<K, V>) -> Self {
        Self {
            map,
            cursor: map.cursor(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.next_entry(self.map) {
            Ok(entry) => entry,
            Err(err) => fatal(err),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.cursor.remaining();
        (remaining, Some(remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over the keys of an [`OrderedMap`]
#[derive(Debug, Clone)]
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Iterator over the values of an [`OrderedMap`]
#[derive(Debug, Clone)]
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Values<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}
