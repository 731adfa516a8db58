//! Sorted iteration for engines whose physical layout is unordered.

use crate::compare::Comparator;
use crate::metrics::Counter;

/// Entries of a hash engine in ascending comparator order.
///
/// Built fresh by every `iter()` call; it borrows the table, so the table
/// cannot change while the iterator is alive.
pub struct SortedIter<'a, K, V> {
    inner: std::vec::IntoIter<(&'a K, &'a V)>,
}

impl<'a, K, V> SortedIter<'a, K, V> {
    /// Sorts `entries` with `cmp`, charging every comparison to `comparisons`.
    pub(crate) fn new<C>(mut entries: Vec<(&'a K, &'a V)>, cmp: &C, comparisons: &Counter) -> Self
    where
        C: Comparator<K>,
    {
        entries.sort_by(|a, b| {
            comparisons.bump();
            cmp.compare(a.0, b.0)
        });
        Self {
            inner: entries.into_iter(),
        }
    }
}

impl<'a, K, V> Iterator for SortedIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for SortedIter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for SortedIter<'_, K, V> {}
