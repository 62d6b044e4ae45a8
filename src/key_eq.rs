//! Key equality predicates.
//!
//! The table compares keys through a `KeyEq` value rather than calling `==`
//! directly, so a table can be keyed by an equivalence coarser than the
//! key type's own `Eq` (for example, ASCII case-insensitive strings). Any
//! such predicate must be paired with a hasher that maps equivalent keys to
//! the same hash.

/// Equality predicate used to match a probe against stored keys.
///
/// `Q` is the borrowed form used for lookups; the table requires
/// `KeyEq<K>` to insert and `KeyEq<Q>` to look up by `&Q` where `K: Borrow<Q>`.
pub trait KeyEq<Q: ?Sized> {
    /// Returns true when `stored` and `probe` name the same entry.
    fn eq(&self, stored: &Q, probe: &Q) -> bool;
}

/// Delegates to the key type's `Eq` implementation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DefaultKeyEq;

impl<Q> KeyEq<Q> for DefaultKeyEq
where
    Q: ?Sized + Eq,
{
    #[inline]
    fn eq(&self, stored: &Q, probe: &Q) -> bool {
        stored == probe
    }
}

impl<Q, E> KeyEq<Q> for &E
where
    Q: ?Sized,
    E: ?Sized + KeyEq<Q>,
{
    #[inline]
    fn eq(&self, stored: &Q, probe: &Q) -> bool {
        (**self).eq(stored, probe)
    }
}
