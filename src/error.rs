//! Error type for fallible lookups.

use thiserror::Error;

/// Returned by [`ChainedHashMap::at`](crate::ChainedHashMap::at) and
/// [`ChainedHashMap::at_mut`](crate::ChainedHashMap::at_mut) when the key is
/// absent. The table is left unchanged.
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[error("key not found")]
pub struct KeyNotFound;
