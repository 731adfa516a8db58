//! The contract shared by all four engines.

use crate::error::Result;
use crate::metrics::EngineStats;

/// Associative container of unique keys with a mutable associated value,
/// instrumented with cumulative comparison and structure counters.
///
/// Implementations differ only in cost profile; observable behavior is the
/// same for every engine:
/// - duplicate inserts are ignored (first writer wins) and return `false`;
/// - `search`/`search_mut`/`at` fail with [`Error::NotFound`](crate::Error::NotFound)
///   for absent keys, every other operation is total;
/// - `iter` yields entries in ascending comparator order, fresh on each call.
pub trait Container<K, V> {
    type Iter<'a>: Iterator<Item = (&'a K, &'a V)>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    /// Inserts `key -> value` unless `key` is present. Returns `true` if a
    /// new entry was created.
    fn insert(&mut self, key: K, value: V) -> bool;

    fn search(&self, key: &K) -> Result<&V>;

    fn search_mut(&mut self, key: &K) -> Result<&mut V>;

    fn contains(&self, key: &K) -> bool;

    /// Overwrites the value of an existing key.
    fn at(&mut self, key: &K, value: V) -> Result<()>;

    /// Removes `key` if present. Returns `true` if an entry was removed.
    fn remove(&mut self, key: &K) -> bool;

    /// Drops every entry. Instrumentation counters are kept.
    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter(&self) -> Self::Iter<'_>;

    /// Total key comparisons performed over the container's lifetime.
    fn comparisons(&self) -> u64;

    fn stats(&self) -> EngineStats;

    /// Human-readable engine name, e.g. for report headers.
    fn name(&self) -> &'static str;
}
