//! ChainedHashMap: bucket array of chains, load-factor growth, cursor access.

use crate::cursor::{
    Cursor, CursorMut, IntoIter, Iter, IterMut, Keys, Position, Values, ValuesMut,
};
use crate::error::KeyNotFound;
use crate::key_eq::{DefaultKeyEq, KeyEq};
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::sync::atomic::{AtomicU64, Ordering};
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Bucket count used by `new()`, `Default`, and collection constructors.
pub const DEFAULT_BUCKET_COUNT: usize = 16;

/// Load factor above which the table grows.
pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 1.0;

/// Smallest threshold `set_max_load_factor` accepts: at most 64 buckets
/// per entry.
pub const MIN_MAX_LOAD_FACTOR: f32 = 1.0 / 64.0;

// Layout ids are unique across every table in the process so that a
// `Position` can never resolve against a bucket array it did not come from.
static NEXT_LAYOUT: AtomicU64 = AtomicU64::new(1);

fn fresh_layout() -> u64 {
    NEXT_LAYOUT.fetch_add(1, Ordering::Relaxed)
}

#[inline]
pub(crate) fn bucket_index(hash: u64, bucket_count: usize) -> usize {
    assert!(bucket_count != 0, "bucket lookup on a table with zero buckets");
    (hash % bucket_count as u64) as usize
}

#[inline]
fn exceeds(len: usize, bucket_count: usize, max_load_factor: f32) -> bool {
    len as f32 / bucket_count as f32 > max_load_factor
}

/// Largest bucket array a `Vec` of chains can be allocated with.
fn max_bucket_count<K, V>() -> usize {
    isize::MAX as usize / core::mem::size_of::<Bucket<K, V>>()
}

/// Double `current` until `len` entries fit under `max_load_factor`, never
/// past `cap`. Returns `current` when no doubling fits under the cap.
fn growth_target(current: usize, len: usize, max_load_factor: f32, cap: usize) -> usize {
    let mut target = current;
    while exceeds(len, target, max_load_factor) {
        match target.checked_mul(2) {
            Some(doubled) if doubled <= cap => target = doubled,
            _ => break,
        }
    }
    target
}

#[derive(Clone, Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u64,
    pub(crate) handle: DefaultKey,
}

pub(crate) type Bucket<K, V> = Vec<Entry<K, V>>;

/// A hash map resolving collisions by separate chaining.
///
/// Keys are unique under `E`. Each entry sits in bucket
/// `hash(key) % bucket_count()`, appended to that bucket's chain. When an
/// insert would push `len() / bucket_count()` above `max_load_factor()`,
/// the bucket count doubles and every entry is redistributed.
pub struct ChainedHashMap<K, V, S = RandomState, E = DefaultKeyEq> {
    hasher: S,
    key_eq: E,
    pub(crate) buckets: Vec<Bucket<K, V>>,
    // One generational handle per live entry; `len()` is its length.
    pub(crate) handles: SlotMap<DefaultKey, ()>,
    max_load_factor: f32,
    pub(crate) layout: u64,
    reentrancy: DebugReentrancy,
}

impl<K, V> ChainedHashMap<K, V> {
    /// Empty map with [`DEFAULT_BUCKET_COUNT`] buckets.
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKET_COUNT)
    }

    /// Empty map with `bucket_count` buckets.
    ///
    /// A count of zero yields a table that panics on the first lookup.
    pub fn with_buckets(bucket_count: usize) -> Self {
        Self::with_parts(bucket_count, RandomState::new(), DefaultKeyEq)
    }
}

impl<K, V, S> ChainedHashMap<K, V, S> {
    /// Empty map with [`DEFAULT_BUCKET_COUNT`] buckets hashing with `hasher`.
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_parts(DEFAULT_BUCKET_COUNT, hasher, DefaultKeyEq)
    }

    /// Empty map with `bucket_count` buckets hashing with `hasher`.
    pub fn with_buckets_and_hasher(bucket_count: usize, hasher: S) -> Self {
        Self::with_parts(bucket_count, hasher, DefaultKeyEq)
    }
}

impl<K, V, S, E> ChainedHashMap<K, V, S, E> {
    /// Empty map with every parameter chosen by the caller.
    pub fn with_parts(bucket_count: usize, hasher: S, key_eq: E) -> Self {
        let mut buckets = Vec::with_capacity(bucket_count);
        buckets.resize_with(bucket_count, Vec::new);
        Self {
            hasher,
            key_eq,
            buckets,
            handles: SlotMap::with_key(),
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            layout: fresh_layout(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    /// Number of entries across all chains.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True when the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Upper bound on the number of entries the table could hold.
    pub fn max_size(&self) -> usize {
        isize::MAX as usize / core::mem::size_of::<Entry<K, V>>().max(1)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of entries chained in bucket `i`.
    ///
    /// # Panics
    /// If `i >= bucket_count()`.
    pub fn bucket_size(&self, i: usize) -> usize {
        self.buckets[i].len()
    }

    /// `len() / bucket_count()`. Not finite for a zero-bucket table.
    pub fn load_factor(&self) -> f32 {
        self.len() as f32 / self.buckets.len() as f32
    }

    pub fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    /// Set the growth threshold and grow at once if it is already exceeded.
    ///
    /// # Panics
    /// If `max_load_factor` is below [`MIN_MAX_LOAD_FACTOR`] (NaN included).
    pub fn set_max_load_factor(&mut self, max_load_factor: f32) {
        assert!(
            max_load_factor >= MIN_MAX_LOAD_FACTOR,
            "max load factor must be at least {MIN_MAX_LOAD_FACTOR}, got {max_load_factor}"
        );
        self.max_load_factor = max_load_factor;
        self.grow_to_fit(self.len());
    }

    /// Rebuild the bucket array with exactly `bucket_count` buckets.
    ///
    /// Ignores the load factor: shrinking below it is allowed and is undone
    /// by the growth check of the next insert. Every outstanding
    /// [`Position`] becomes stale.
    ///
    /// # Panics
    /// If `bucket_count` is zero while the table holds entries.
    pub fn rehash(&mut self, bucket_count: usize) {
        assert!(
            bucket_count != 0 || self.is_empty(),
            "cannot rehash {} entries into zero buckets",
            self.len()
        );
        self.rebuild(bucket_count);
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn key_eq(&self) -> &E {
        &self.key_eq
    }

    /// Drop every entry; the bucket count is kept.
    pub fn clear(&mut self) {
        for chain in &mut self.buckets {
            chain.clear();
        }
        self.handles.clear();
    }

    /// Exchange the full contents and configuration of two maps.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Move every entry out into a new map, leaving `self` empty with
    /// [`DEFAULT_BUCKET_COUNT`] fresh buckets and the same hasher and predicate.
    pub fn take(&mut self) -> Self
    where
        S: Clone,
        E: Clone,
    {
        let empty = Self::with_parts(
            DEFAULT_BUCKET_COUNT,
            self.hasher.clone(),
            self.key_eq.clone(),
        );
        core::mem::replace(self, empty)
    }

    pub fn begin(&self) -> Cursor<'_, K, V, S, E> {
        Cursor::begin(self)
    }

    pub fn end(&self) -> Cursor<'_, K, V, S, E> {
        Cursor::end(self)
    }

    pub fn begin_mut(&mut self) -> CursorMut<'_, K, V, S, E> {
        CursorMut::begin(self)
    }

    pub fn end_mut(&mut self) -> CursorMut<'_, K, V, S, E> {
        CursorMut::end(self)
    }

    /// Re-attach a detached position, or `None` if it has been invalidated.
    pub fn cursor_at(&self, position: Position) -> Option<Cursor<'_, K, V, S, E>> {
        let (bucket, pos) = self.resolve(position)?;
        Some(Cursor::new(self, bucket, pos))
    }

    pub fn cursor_mut_at(&mut self, position: Position) -> Option<CursorMut<'_, K, V, S, E>> {
        let (bucket, pos) = self.resolve(position)?;
        Some(CursorMut::new(self, bucket, pos))
    }

    pub fn iter(&self) -> Iter<'_, K, V, S, E> {
        Iter::new(self)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let len = self.len();
        IterMut::new(&mut self.buckets, len)
    }

    pub fn keys(&self) -> Keys<'_, K, V, S, E> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V, S, E> {
        Values::new(self.iter())
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }

    /// Map a position to `(bucket, chain index)` on the current layout.
    fn resolve(&self, position: Position) -> Option<(usize, usize)> {
        if position.layout != self.layout {
            return None;
        }
        match position.entry {
            None => (position.bucket == self.buckets.len()).then_some((position.bucket, 0)),
            Some(handle) => {
                if !self.handles.contains_key(handle) {
                    return None;
                }
                let chain = self.buckets.get(position.bucket)?;
                let pos = chain.iter().position(|e| e.handle == handle)?;
                Some((position.bucket, pos))
            }
        }
    }

    /// Grow by doubling until `len` entries fit under the max load factor.
    /// Returns whether the bucket array was rebuilt.
    fn grow_to_fit(&mut self, len: usize) -> bool {
        let current = self.buckets.len();
        // A zero-bucket table is a contract violation reported by the lookup.
        if current == 0 || !exceeds(len, current, self.max_load_factor) {
            return false;
        }
        let target = growth_target(
            current,
            len,
            self.max_load_factor,
            max_bucket_count::<K, V>(),
        );
        if target == current {
            return false;
        }
        log::trace!(
            "load factor {} over {} for {} entries; growing",
            len as f32 / current as f32,
            self.max_load_factor,
            len
        );
        self.rebuild(target);
        true
    }

    /// Redistribute every entry into `bucket_count` fresh buckets using the
    /// hash stored at insertion. Issues a new layout id.
    fn rebuild(&mut self, bucket_count: usize) {
        log::debug!(
            "rehash: {} -> {} buckets ({} entries)",
            self.buckets.len(),
            bucket_count,
            self.len()
        );
        let mut fresh: Vec<Bucket<K, V>> = Vec::with_capacity(bucket_count);
        fresh.resize_with(bucket_count, Vec::new);
        for entry in self.buckets.drain(..).flatten() {
            let i = bucket_index(entry.hash, bucket_count);
            fresh[i].push(entry);
        }
        self.buckets = fresh;
        self.layout = fresh_layout();
    }
}

impl<K, V, S, E> ChainedHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Hash `q`, pick its bucket, and scan the chain for a match.
    ///
    /// This is the only place user `Hash`/`KeyEq` code runs, so it is the
    /// only place the reentrancy guard is held.
    fn locate<Q>(&self, op: &'static str, q: &Q) -> (u64, usize, Option<usize>)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let _g = self.reentrancy.enter(op);
        let hash = self.make_hash(q);
        let bucket = bucket_index(hash, self.buckets.len());
        let pos = self.buckets[bucket]
            .iter()
            .position(|e| e.hash == hash && KeyEq::<Q>::eq(&self.key_eq, e.key.borrow(), q));
        (hash, bucket, pos)
    }

    /// Bucket that `q` maps to: `hash(q) % bucket_count()`.
    ///
    /// # Panics
    /// On a zero-bucket table.
    pub fn bucket_index_for<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        let _g = self.reentrancy.enter("bucket_index_for");
        bucket_index(self.make_hash(q), self.buckets.len())
    }

    /// Find `key` or append a new entry built by `make`.
    /// Returns `(bucket, chain index, inserted)`.
    fn place<F>(&mut self, op: &'static str, key: K, make: F) -> (usize, usize, bool)
    where
        F: FnOnce() -> V,
    {
        // Catch a table left over-full by an explicit shrink.
        self.grow_to_fit(self.len());
        let (hash, mut bucket, found) = self.locate(op, &key);
        if let Some(pos) = found {
            return (bucket, pos, false);
        }
        // Build the value before touching the table so a panicking `make`
        // leaves it unchanged.
        let value = make();
        if self.grow_to_fit(self.len() + 1) {
            bucket = bucket_index(hash, self.buckets.len());
        }
        let handle = self.handles.insert(());
        let chain = &mut self.buckets[bucket];
        chain.push(Entry {
            key,
            value,
            hash,
            handle,
        });
        (bucket, chain.len() - 1, true)
    }

    /// Insert `key -> value` unless the key is present.
    ///
    /// Returns a cursor at the entry for `key` and whether it was added. An
    /// existing value is never overwritten.
    pub fn insert(&mut self, key: K, value: V) -> (CursorMut<'_, K, V, S, E>, bool) {
        let (bucket, pos, inserted) = self.place("insert", key, move || value);
        (CursorMut::new(self, bucket, pos), inserted)
    }

    /// Like [`insert`](Self::insert), but only calls `make` when the key is absent.
    pub fn insert_with<F>(&mut self, key: K, make: F) -> (CursorMut<'_, K, V, S, E>, bool)
    where
        F: FnOnce() -> V,
    {
        let (bucket, pos, inserted) = self.place("insert_with", key, make);
        (CursorMut::new(self, bucket, pos), inserted)
    }

    /// Build the pair from convertible parts, then insert it.
    pub fn emplace<A, B>(&mut self, key: A, value: B) -> (CursorMut<'_, K, V, S, E>, bool)
    where
        A: Into<K>,
        B: Into<V>,
    {
        self.insert(key.into(), value.into())
    }

    /// Value for `key`, inserting `V::default()` first if absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let (bucket, pos, _) = self.place("get_or_insert_default", key, V::default);
        &mut self.buckets[bucket][pos].value
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let (_, bucket, pos) = self.locate("get", q);
        pos.map(|p| &self.buckets[bucket][p].value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let (_, bucket, pos) = self.locate("get_mut", q);
        pos.map(|p| &mut self.buckets[bucket][p].value)
    }

    /// Value for `q`, or [`KeyNotFound`]. Never inserts.
    pub fn at<Q>(&self, q: &Q) -> Result<&V, KeyNotFound>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let (_, bucket, pos) = self.locate("at", q);
        let pos = pos.ok_or(KeyNotFound)?;
        Ok(&self.buckets[bucket][pos].value)
    }

    pub fn at_mut<Q>(&mut self, q: &Q) -> Result<&mut V, KeyNotFound>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let (_, bucket, pos) = self.locate("at_mut", q);
        let pos = pos.ok_or(KeyNotFound)?;
        Ok(&mut self.buckets[bucket][pos].value)
    }

    /// Cursor at the entry for `q`, or the end cursor.
    pub fn find<Q>(&self, q: &Q) -> Cursor<'_, K, V, S, E>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        match self.locate("find", q) {
            (_, bucket, Some(pos)) => Cursor::new(self, bucket, pos),
            _ => Cursor::end(self),
        }
    }

    pub fn find_mut<Q>(&mut self, q: &Q) -> CursorMut<'_, K, V, S, E>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        match self.locate("find_mut", q) {
            (_, bucket, Some(pos)) => CursorMut::new(self, bucket, pos),
            _ => CursorMut::end(self),
        }
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.locate("contains_key", q).2.is_some()
    }

    /// 1 if `q` is present, else 0.
    pub fn count<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        usize::from(self.locate("count", q).2.is_some())
    }

    /// Remove the entry for `q`, returning how many entries were removed (0 or 1).
    pub fn erase<Q>(&mut self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        usize::from(self.take_entry("erase", q).is_some())
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.take_entry("remove", q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.take_entry("remove_entry", q)
    }

    fn take_entry<Q>(&mut self, op: &'static str, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let (_, bucket, pos) = self.locate(op, q);
        // Vec::remove keeps the rest of the chain in insertion order.
        let entry = self.buckets[bucket].remove(pos?);
        self.handles.remove(entry.handle);
        Some((entry.key, entry.value))
    }

    /// Replace the contents with `pairs`, inserted in order.
    pub fn assign<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.clear();
        self.extend(pairs);
    }
}

impl<K, V, S, E> Default for ChainedHashMap<K, V, S, E>
where
    S: Default,
    E: Default,
{
    fn default() -> Self {
        Self::with_parts(DEFAULT_BUCKET_COUNT, S::default(), E::default())
    }
}

impl<K, V, S, E> Clone for ChainedHashMap<K, V, S, E>
where
    K: Clone,
    V: Clone,
    S: Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            key_eq: self.key_eq.clone(),
            buckets: self.buckets.clone(),
            handles: self.handles.clone(),
            max_load_factor: self.max_load_factor,
            layout: fresh_layout(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.hasher.clone_from(&source.hasher);
        self.key_eq.clone_from(&source.key_eq);
        self.buckets.clone_from(&source.buckets);
        self.handles.clone_from(&source.handles);
        self.max_load_factor = source.max_load_factor;
        self.layout = fresh_layout();
    }
}

impl<K, V, S, E> fmt::Debug for ChainedHashMap<K, V, S, E>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, E> PartialEq for ChainedHashMap<K, V, S, E>
where
    K: Hash,
    V: PartialEq,
    S: BuildHasher,
    E: KeyEq<K>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).map_or(false, |ov| v == ov))
    }
}

impl<K, V, S, E> Eq for ChainedHashMap<K, V, S, E>
where
    K: Hash,
    V: Eq,
    S: BuildHasher,
    E: KeyEq<K>,
{
}

impl<K, V, S, E> Extend<(K, V)> for ChainedHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            let _ = self.insert(k, v);
        }
    }
}

impl<K, V, S, E> FromIterator<(K, V)> for ChainedHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher + Default,
    E: KeyEq<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_parts(DEFAULT_BUCKET_COUNT, S::default(), E::default());
        map.extend(iter);
        map
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for ChainedHashMap<K, V>
where
    K: Hash + Eq,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a ChainedHashMap<K, V, S, E> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, S, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a mut ChainedHashMap<K, V, S, E> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S, E> IntoIterator for ChainedHashMap<K, V, S, E> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        let len = self.len();
        IntoIter::new(self.buckets, len)
    }
}
