//! Word-frequency adapter over any engine.

use crate::container::Container;
use crate::error::Result;
use crate::metrics::EngineStats;
use core::fmt;
use core::marker::PhantomData;

/// Counts occurrences of keys using an engine `M` as storage.
///
/// `add` bumps an existing counter or inserts a fresh one at 1, which is how
/// a text front end drives the engines: one `add` per normalized word.
///
/// ```
/// use dict_engines::{AvlTree, FrequencyCounter};
///
/// let mut words = FrequencyCounter::new(AvlTree::<&str, u64>::new());
/// words.add_all(["b", "a", "c", "a", "d"]);
/// let counts: Vec<_> = words.iter().map(|(k, n)| (*k, *n)).collect();
/// assert_eq!(counts, [("a", 2), ("b", 1), ("c", 1), ("d", 1)]);
/// ```
pub struct FrequencyCounter<K, M> {
    inner: M,
    _key: PhantomData<fn(K)>,
}

impl<K, M> FrequencyCounter<K, M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            _key: PhantomData,
        }
    }

    /// The underlying engine, e.g. to read engine-specific metrics.
    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn into_inner(self) -> M {
        self.inner
    }
}

impl<K, M> FrequencyCounter<K, M>
where
    M: Container<K, u64>,
{
    /// Records one occurrence of `key`. Returns the updated count.
    pub fn add(&mut self, key: K) -> u64 {
        if let Ok(n) = self.inner.search_mut(&key) {
            *n += 1;
            return *n;
        }
        self.inner.insert(key, 1);
        1
    }

    pub fn add_all<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
    {
        for key in keys {
            self.add(key);
        }
    }

    pub fn frequency(&self, key: &K) -> Result<u64> {
        self.inner.search(key).copied()
    }

    /// Overwrites the count of a key already present.
    pub fn set(&mut self, key: &K, count: u64) -> Result<()> {
        self.inner.at(key, count)
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.inner.remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn clear(&mut self) {
        self.inner.clear()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> M::Iter<'_> {
        self.inner.iter()
    }

    pub fn comparisons(&self) -> u64 {
        self.inner.comparisons()
    }

    pub fn stats(&self) -> EngineStats {
        self.inner.stats()
    }

    pub fn name(&self) -> &'static str {
        self.inner.name()
    }
}

impl<K, M: Default> Default for FrequencyCounter<K, M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<K, M: fmt::Debug> fmt::Debug for FrequencyCounter<K, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FrequencyCounter").field(&self.inner).finish()
    }
}
