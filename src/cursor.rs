//! Cursors and iterators over a `ChainedHashMap`.
//!
//! Traversal order is bucket index first, then chain order within a bucket.
//! A cursor is `(map, bucket, chain index)`; the end cursor has
//! `bucket == bucket_count()` and an unspecified chain index.
//!
//! Live cursors borrow the map, so the borrow checker already stops them
//! from outliving a mutation. [`Position`] is the detached form: it can be
//! held across mutations and re-attached with `cursor_at`, which returns
//! `None` once the position has been invalidated.

use crate::chained_hash_map::{Bucket, ChainedHashMap, Entry};
use crate::key_eq::DefaultKeyEq;
use core::fmt;
use core::iter::FusedIterator;
use slotmap::DefaultKey;
use std::collections::hash_map::RandomState;

/// First non-empty bucket at or after `from`, or `buckets.len()`.
fn first_occupied<K, V>(buckets: &[Bucket<K, V>], from: usize) -> usize {
    buckets
        .get(from..)
        .and_then(|rest| rest.iter().position(|chain| !chain.is_empty()))
        .map_or(buckets.len(), |i| from + i)
}

/// The `(bucket, pos)` that follows `(bucket, pos)`. End stays at end.
fn step<K, V>(buckets: &[Bucket<K, V>], bucket: usize, pos: usize) -> (usize, usize) {
    match buckets.get(bucket) {
        None => (buckets.len(), 0),
        Some(chain) if pos + 1 < chain.len() => (bucket, pos + 1),
        Some(_) => (first_occupied(buckets, bucket + 1), 0),
    }
}

fn entry_at<K, V>(buckets: &[Bucket<K, V>], bucket: usize, pos: usize) -> Option<&Entry<K, V>> {
    buckets.get(bucket)?.get(pos)
}

fn position_of<K, V>(buckets: &[Bucket<K, V>], layout: u64, bucket: usize, pos: usize) -> Position {
    Position {
        layout,
        bucket,
        entry: entry_at(buckets, bucket, pos).map(|e| e.handle),
    }
}

/// A cursor position detached from its borrow of the map.
///
/// Stays valid until the entry it names is erased or the bucket array is
/// rebuilt (growth or `rehash`). End positions are invalidated only by a
/// rebuild. Positions travel with the storage on `swap` and `take`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub(crate) layout: u64,
    pub(crate) bucket: usize,
    pub(crate) entry: Option<DefaultKey>,
}

impl Position {
    pub fn is_end(&self) -> bool {
        self.entry.is_none()
    }

    pub fn bucket(&self) -> usize {
        self.bucket
    }
}

/// Read-only cursor.
pub struct Cursor<'a, K, V, S = RandomState, E = DefaultKeyEq> {
    map: &'a ChainedHashMap<K, V, S, E>,
    bucket: usize,
    pos: usize,
}

impl<'a, K, V, S, E> Cursor<'a, K, V, S, E> {
    pub(crate) fn new(map: &'a ChainedHashMap<K, V, S, E>, bucket: usize, pos: usize) -> Self {
        Self { map, bucket, pos }
    }

    pub(crate) fn begin(map: &'a ChainedHashMap<K, V, S, E>) -> Self {
        Self::new(map, first_occupied(&map.buckets, 0), 0)
    }

    pub(crate) fn end(map: &'a ChainedHashMap<K, V, S, E>) -> Self {
        Self::new(map, map.buckets.len(), 0)
    }

    /// The entry under the cursor; `None` at end.
    pub fn get(&self) -> Option<(&'a K, &'a V)> {
        entry_at(&self.map.buckets, self.bucket, self.pos).map(|e| (&e.key, &e.value))
    }

    pub fn key(&self) -> Option<&'a K> {
        self.get().map(|(k, _)| k)
    }

    pub fn value(&self) -> Option<&'a V> {
        self.get().map(|(_, v)| v)
    }

    pub fn is_end(&self) -> bool {
        self.bucket >= self.map.buckets.len()
    }

    /// Bucket the cursor is in; `bucket_count()` at end.
    pub fn bucket(&self) -> usize {
        self.bucket
    }

    /// Advance to the next entry, skipping empty buckets. No-op at end.
    pub fn move_next(&mut self) {
        (self.bucket, self.pos) = step(&self.map.buckets, self.bucket, self.pos);
    }

    pub fn position(&self) -> Position {
        position_of(&self.map.buckets, self.map.layout, self.bucket, self.pos)
    }
}

impl<K, V, S, E> Clone for Cursor<'_, K, V, S, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, S, E> Copy for Cursor<'_, K, V, S, E> {}

/// Equal when both cursors borrow the same map, sit in the same bucket, and
/// either both are at end or they share a chain index.
impl<K, V, S, E> PartialEq for Cursor<'_, K, V, S, E> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.map, other.map)
            && self.bucket == other.bucket
            && (self.bucket == self.map.buckets.len() || self.pos == other.pos)
    }
}

impl<K, V, S, E> Eq for Cursor<'_, K, V, S, E> {}

impl<K, V, S, E> fmt::Debug for Cursor<'_, K, V, S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("bucket", &self.bucket)
            .field("pos", &self.pos)
            .field("end", &self.is_end())
            .finish()
    }
}

/// Cursor with write access to values. Keys stay immutable.
pub struct CursorMut<'a, K, V, S = RandomState, E = DefaultKeyEq> {
    map: &'a mut ChainedHashMap<K, V, S, E>,
    bucket: usize,
    pos: usize,
}

impl<'a, K, V, S, E> CursorMut<'a, K, V, S, E> {
    pub(crate) fn new(map: &'a mut ChainedHashMap<K, V, S, E>, bucket: usize, pos: usize) -> Self {
        Self { map, bucket, pos }
    }

    pub(crate) fn begin(map: &'a mut ChainedHashMap<K, V, S, E>) -> Self {
        let bucket = first_occupied(&map.buckets, 0);
        Self::new(map, bucket, 0)
    }

    pub(crate) fn end(map: &'a mut ChainedHashMap<K, V, S, E>) -> Self {
        let bucket = map.buckets.len();
        Self::new(map, bucket, 0)
    }

    pub fn get(&self) -> Option<(&K, &V)> {
        entry_at(&self.map.buckets, self.bucket, self.pos).map(|e| (&e.key, &e.value))
    }

    pub fn get_mut(&mut self) -> Option<(&K, &mut V)> {
        self.map
            .buckets
            .get_mut(self.bucket)?
            .get_mut(self.pos)
            .map(|e| (&e.key, &mut e.value))
    }

    pub fn key(&self) -> Option<&K> {
        self.get().map(|(k, _)| k)
    }

    pub fn value(&self) -> Option<&V> {
        self.get().map(|(_, v)| v)
    }

    pub fn value_mut(&mut self) -> Option<&mut V> {
        self.get_mut().map(|(_, v)| v)
    }

    /// Consume the cursor, keeping the value borrow for the map's lifetime.
    pub fn into_value_mut(self) -> Option<&'a mut V> {
        let map = self.map;
        map.buckets
            .get_mut(self.bucket)?
            .get_mut(self.pos)
            .map(|e| &mut e.value)
    }

    pub fn is_end(&self) -> bool {
        self.bucket >= self.map.buckets.len()
    }

    pub fn bucket(&self) -> usize {
        self.bucket
    }

    pub fn move_next(&mut self) {
        (self.bucket, self.pos) = step(&self.map.buckets, self.bucket, self.pos);
    }

    pub fn position(&self) -> Position {
        position_of(&self.map.buckets, self.map.layout, self.bucket, self.pos)
    }

    /// Read-only view at the same place.
    pub fn as_cursor(&self) -> Cursor<'_, K, V, S, E> {
        Cursor::new(self.map, self.bucket, self.pos)
    }
}

impl<K, V, S, E> PartialEq for CursorMut<'_, K, V, S, E> {
    fn eq(&self, other: &Self) -> bool {
        self.as_cursor() == other.as_cursor()
    }
}

impl<K, V, S, E> Eq for CursorMut<'_, K, V, S, E> {}

impl<K, V, S, E> fmt::Debug for CursorMut<'_, K, V, S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorMut")
            .field("bucket", &self.bucket)
            .field("pos", &self.pos)
            .field("end", &self.is_end())
            .finish()
    }
}

/// Iterator over `(&K, &V)`, driven by a [`Cursor`].
pub struct Iter<'a, K, V, S = RandomState, E = DefaultKeyEq> {
    cursor: Cursor<'a, K, V, S, E>,
    remaining: usize,
}

impl<'a, K, V, S, E> Iter<'a, K, V, S, E> {
    pub(crate) fn new(map: &'a ChainedHashMap<K, V, S, E>) -> Self {
        Self {
            cursor: Cursor::begin(map),
            remaining: map.len(),
        }
    }
}

impl<K, V, S, E> Clone for Iter<'_, K, V, S, E> {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor,
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V, S, E> Iterator for Iter<'a, K, V, S, E> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let item = self.cursor.get()?;
        self.cursor.move_next();
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, S, E> ExactSizeIterator for Iter<'_, K, V, S, E> {}
impl<K, V, S, E> FusedIterator for Iter<'_, K, V, S, E> {}

/// Iterator over `(&K, &mut V)` in cursor order.
pub struct IterMut<'a, K, V> {
    buckets: core::slice::IterMut<'a, Bucket<K, V>>,
    chain: core::slice::IterMut<'a, Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(buckets: &'a mut [Bucket<K, V>], len: usize) -> Self {
        Self {
            buckets: buckets.iter_mut(),
            chain: Default::default(),
            remaining: len,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.chain.next() {
                self.remaining -= 1;
                return Some((&e.key, &mut e.value));
            }
            self.chain = self.buckets.next()?.iter_mut();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Owning iterator over `(K, V)` in cursor order.
pub struct IntoIter<K, V> {
    buckets: std::vec::IntoIter<Bucket<K, V>>,
    chain: std::vec::IntoIter<Entry<K, V>>,
    remaining: usize,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(buckets: Vec<Bucket<K, V>>, len: usize) -> Self {
        Self {
            buckets: buckets.into_iter(),
            chain: Vec::new().into_iter(),
            remaining: len,
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.chain.next() {
                self.remaining -= 1;
                return Some((e.key, e.value));
            }
            self.chain = self.buckets.next()?.into_iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

pub struct Keys<'a, K, V, S = RandomState, E = DefaultKeyEq> {
    inner: Iter<'a, K, V, S, E>,
}

impl<'a, K, V, S, E> Keys<'a, K, V, S, E> {
    pub(crate) fn new(inner: Iter<'a, K, V, S, E>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V, S, E> Iterator for Keys<'a, K, V, S, E> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, S, E> Clone for Keys<'_, K, V, S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V, S, E> ExactSizeIterator for Keys<'_, K, V, S, E> {}
impl<K, V, S, E> FusedIterator for Keys<'_, K, V, S, E> {}

pub struct Values<'a, K, V, S = RandomState, E = DefaultKeyEq> {
    inner: Iter<'a, K, V, S, E>,
}

impl<'a, K, V, S, E> Values<'a, K, V, S, E> {
    pub(crate) fn new(inner: Iter<'a, K, V, S, E>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V, S, E> Iterator for Values<'a, K, V, S, E> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, S, E> Clone for Values<'_, K, V, S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V, S, E> ExactSizeIterator for Values<'_, K, V, S, E> {}
impl<K, V, S, E> FusedIterator for Values<'_, K, V, S, E> {}

pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> ValuesMut<'a, K, V> {
    pub(crate) fn new(inner: IterMut<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}
