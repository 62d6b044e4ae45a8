//! chained-hashmap: a single-threaded, separate-chaining hash map with an
//! explicit bucket array, a load-factor growth policy, and cursor-based
//! traversal.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: an unordered associative container whose bucket layout is
//!   observable and tunable (`bucket_count`, `bucket_size`,
//!   `bucket_index_for`, `max_load_factor`, `rehash`) while every
//!   structural invariant stays checkable from safe Rust.
//! - Layers:
//!   - `ChainedHashMap<K, V, S, E>`: a `Vec` of buckets, each a `Vec`
//!     chain of entries. All lookups go through one primitive: hash, take
//!     the bucket `hash % bucket_count`, scan the chain with `E`.
//!   - `Cursor` / `CursorMut`: `(map, bucket, chain index)` triples that
//!     walk the bucket array in order and skip empty buckets.
//!   - `Position`: the detached form of a cursor, used to carry a place in
//!     the table across mutations and find out whether it survived.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync`. The only shared state is the
//!   process-wide counter that hands out layout ids.
//! - Unique keys under `E`; a duplicate insert leaves the stored value alone.
//! - Generic over hasher `S: BuildHasher` and equality `E: KeyEq`, with
//!   static dispatch throughout.
//! - Reentrancy: user `Hash`/`KeyEq` code may not call back into the same
//!   map; debug builds panic if it does.
//!
//! Growth policy
//! - Before placing a new entry, if `(len + 1) / bucket_count` would exceed
//!   `max_load_factor`, the bucket count doubles (repeatedly if needed) and
//!   every entry is moved to `hash % new_count`. Every insert also first
//!   re-checks the current load, which repairs a table shrunk by `rehash`.
//! - Doubling never passes the largest allocatable bucket array; a table
//!   that cannot double further stays as it is.
//! - `set_max_load_factor` applies the same check at once. Thresholds below
//!   `MIN_MAX_LOAD_FACTOR` are rejected.
//! - `rehash(n)` rebuilds at exactly `n` buckets, ignoring the load factor.
//!
//! Hashing
//! - Each entry stores the `u64` hash computed at insertion; rebuilds reuse
//!   it and never call `K: Hash`. Since a map's hasher is fixed for its
//!   lifetime, this equals re-hashing every key.
//!
//! Cursor invalidation
//! - A live cursor borrows the map, so it cannot observe a mutation. The
//!   rules apply to `Position`s:
//!   - A bucket-array rebuild (growth or `rehash`) invalidates all of them,
//!     end positions included.
//!   - Erasing an entry invalidates only positions naming that entry.
//!   - Inserting without a rebuild invalidates nothing.
//! - Entries carry a generational handle from a `slotmap`, so a position
//!   naming an erased entry never resolves to a later entry reusing the slot.
//!
//! Failure model
//! - `at`/`at_mut` return `Err(KeyNotFound)` for a missing key; every other
//!   lookup is total (`Option`, `bool`, count, or end cursor).
//! - Contract violations panic: lookups on a table with zero buckets,
//!   `rehash(0)` on a non-empty table, `bucket_size` out of range, and a
//!   max load factor below `MIN_MAX_LOAD_FACTOR`.
//! - A panicking value constructor (`insert_with`, `get_or_insert_default`)
//!   adds no entry.
//!
//! Notes and non-goals
//! - No concurrent access, persistence, custom allocators, or open
//!   addressing.
//! - Keys are immutable post-insert; there is no `key_mut`.

mod chained_hash_map;
#[cfg(test)]
mod chained_hash_map_proptest;
pub mod cursor;
mod error;
pub mod key_eq;
mod reentrancy;

// Public surface
pub use chained_hash_map::{
    ChainedHashMap, DEFAULT_BUCKET_COUNT, DEFAULT_MAX_LOAD_FACTOR, MIN_MAX_LOAD_FACTOR,
};
pub use cursor::{Cursor, CursorMut, Position};
pub use error::KeyNotFound;
pub use key_eq::{DefaultKeyEq, KeyEq};
