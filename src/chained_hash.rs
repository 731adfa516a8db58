//! ChainedHashTable: separate chaining over a prime-sized bucket array.

use crate::compare::{Comparator, NaturalOrder};
use crate::config::TableConfig;
use crate::container::Container;
use crate::error::{Error, Result};
use crate::metrics::{Counter, EngineStats};
use crate::primes::next_prime;
use crate::reentrancy::DebugReentrancy;
use crate::snapshot::SortedIter;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use hashbrown::hash_map::DefaultHashBuilder;

pub struct ChainedHashTable<K, V, S = DefaultHashBuilder, C = NaturalOrder> {
    buckets: Vec<Vec<(K, V)>>,
    len: usize,
    max_load_factor: f64,
    hasher: S,
    cmp: C,
    comparisons: Counter,
    collisions: Counter,
    reentrancy: DebugReentrancy,
}

impl<K, V> ChainedHashTable<K, V>
where
    K: Hash + Eq + Ord,
{
    pub fn new() -> Self {
        Self::with_capacity(TableConfig::DEFAULT_CAPACITY)
    }

    /// Table of `next_prime(capacity)` buckets.
    pub fn with_capacity(capacity: usize) -> Self {
        let config = TableConfig::default().with_initial_capacity(capacity);
        Self::build(config, DefaultHashBuilder::default(), NaturalOrder)
    }
}

impl<K, V> Default for ChainedHashTable<K, V>
where
    K: Hash + Eq + Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainedHashTable<K, V, S>
where
    K: Hash + Eq + Ord,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::build(TableConfig::default(), hasher, NaturalOrder)
    }
}

impl<K, V, S, C> ChainedHashTable<K, V, S, C>
where
    K: Hash + Eq,
    S: BuildHasher,
    C: Comparator<K>,
{
    pub fn with_config(config: TableConfig, hasher: S, cmp: C) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, hasher, cmp))
    }

    fn build(config: TableConfig, hasher: S, cmp: C) -> Self {
        let buckets = next_prime(config.initial_capacity);
        Self {
            buckets: (0..buckets).map(|_| Vec::new()).collect(),
            len: 0,
            max_load_factor: config.max_load_factor,
            hasher,
            cmp,
            comparisons: Counter::new(),
            collisions: Counter::new(),
            reentrancy: DebugReentrancy::new("ChainedHashTable"),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len() as f64
    }

    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    pub fn comparisons(&self) -> u64 {
        self.comparisons.get()
    }

    /// Insertions whose bucket already held at least one entry.
    pub fn collisions(&self) -> u64 {
        self.collisions.get()
    }

    /// Mean chain length over non-empty buckets; 0 for an empty table.
    pub fn average_access_length(&self) -> f64 {
        let (total, used) = self
            .buckets
            .iter()
            .filter(|b| !b.is_empty())
            .fold((0usize, 0usize), |(t, u), b| (t + b.len(), u + 1));
        if used == 0 {
            return 0.0;
        }
        total as f64 / used as f64
    }

    /// Length of the longest chain.
    pub fn max_access_length(&self) -> usize {
        self.buckets.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn insert(&mut self, key: K, value: V) -> bool {
        let _g = self.reentrancy.enter();
        let idx = self.bucket_index(&key);
        let bucket = &self.buckets[idx];
        if bucket.iter().any(|(k, _)| {
            self.comparisons.bump();
            *k == key
        }) {
            return false;
        }
        if !bucket.is_empty() {
            self.collisions.bump();
        }
        self.buckets[idx].push((key, value));
        self.len += 1;

        while self.load_factor() >= self.max_load_factor {
            let target = next_prime(2 * self.buckets.len());
            self.rehash_to(target);
        }
        true
    }

    pub fn search(&self, key: &K) -> Result<&V> {
        let _g = self.reentrancy.enter();
        let (b, i) = self.find(key).ok_or(Error::NotFound)?;
        Ok(&self.buckets[b][i].1)
    }

    pub fn search_mut(&mut self, key: &K) -> Result<&mut V> {
        let _g = self.reentrancy.enter();
        let (b, i) = self.find(key).ok_or(Error::NotFound)?;
        Ok(&mut self.buckets[b][i].1)
    }

    pub fn contains(&self, key: &K) -> bool {
        let _g = self.reentrancy.enter();
        self.find(key).is_some()
    }

    pub fn at(&mut self, key: &K, value: V) -> Result<()> {
        *self.search_mut(key)? = value;
        Ok(())
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let _g = self.reentrancy.enter();
        let (b, i) = self.find(key)?;
        self.len -= 1;
        Some(self.buckets[b].remove(i))
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.remove_entry(key).is_some()
    }

    /// Drops every entry and its chain storage; the bucket count is kept.
    pub fn clear(&mut self) {
        tracing::trace!(
            entries = self.len,
            buckets = self.buckets.len(),
            "clearing ChainedHashTable"
        );
        for bucket in &mut self.buckets {
            *bucket = Vec::new();
        }
        self.len = 0;
    }

    /// Grows to `next_prime(new_size)` buckets and redistributes every
    /// entry. Does nothing unless `new_size` exceeds the current count.
    pub fn rehash(&mut self, new_size: usize) {
        let _g = self.reentrancy.enter();
        if new_size <= self.buckets.len() {
            return;
        }
        self.rehash_to(next_prime(new_size));
    }

    /// Entries in ascending comparator order.
    pub fn iter(&self) -> SortedIter<'_, K, V> {
        let _g = self.reentrancy.enter();
        let entries = self
            .buckets
            .iter()
            .flatten()
            .map(|(k, v)| (k, v))
            .collect();
        SortedIter::new(entries, &self.cmp, &self.comparisons)
    }

    fn bucket_index(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) % self.buckets.len() as u64) as usize
    }

    fn find(&self, key: &K) -> Option<(usize, usize)> {
        let b = self.bucket_index(key);
        let i = self.buckets[b].iter().position(|(k, _)| {
            self.comparisons.bump();
            k == key
        })?;
        Some((b, i))
    }

    fn rehash_to(&mut self, new_count: usize) {
        let old_count = self.buckets.len();
        let fresh = (0..new_count).map(|_| Vec::new()).collect();
        let old = mem::replace(&mut self.buckets, fresh);
        for (k, v) in old.into_iter().flatten() {
            let b = self.bucket_index(&k);
            self.buckets[b].push((k, v));
        }
        tracing::debug!(
            old_buckets = old_count,
            new_buckets = new_count,
            entries = self.len,
            "rehashed ChainedHashTable"
        );
    }

    /// Every entry sits in the bucket its hash selects, keys are unique and
    /// the load factor is under the threshold.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let mut count = 0;
        for (b, bucket) in self.buckets.iter().enumerate() {
            for (i, (k, _)) in bucket.iter().enumerate() {
                assert_eq!(self.bucket_index(k), b, "entry in wrong bucket");
                assert!(
                    bucket[i + 1..].iter().all(|(other, _)| other != k),
                    "duplicate key in chain"
                );
                count += 1;
            }
        }
        assert_eq!(count, self.len, "len out of sync");
        assert!(self.load_factor() < self.max_load_factor, "load factor over threshold");
    }
}

impl<K, V, S, C> Container<K, V> for ChainedHashTable<K, V, S, C>
where
    K: Hash + Eq,
    S: BuildHasher,
    C: Comparator<K>,
{
    type Iter<'a> = SortedIter<'a, K, V> where Self: 'a, K: 'a, V: 'a;

    fn insert(&mut self, key: K, value: V) -> bool {
        ChainedHashTable::insert(self, key, value)
    }
    fn search(&self, key: &K) -> Result<&V> {
        ChainedHashTable::search(self, key)
    }
    fn search_mut(&mut self, key: &K) -> Result<&mut V> {
        ChainedHashTable::search_mut(self, key)
    }
    fn contains(&self, key: &K) -> bool {
        ChainedHashTable::contains(self, key)
    }
    fn at(&mut self, key: &K, value: V) -> Result<()> {
        ChainedHashTable::at(self, key, value)
    }
    fn remove(&mut self, key: &K) -> bool {
        ChainedHashTable::remove(self, key)
    }
    fn clear(&mut self) {
        ChainedHashTable::clear(self)
    }
    fn len(&self) -> usize {
        self.len
    }
    fn iter(&self) -> Self::Iter<'_> {
        ChainedHashTable::iter(self)
    }
    fn comparisons(&self) -> u64 {
        self.comparisons.get()
    }
    fn stats(&self) -> EngineStats {
        EngineStats::Hash {
            collisions: self.collisions(),
            average_access_length: self.average_access_length(),
            max_access_length: self.max_access_length(),
        }
    }
    fn name(&self) -> &'static str {
        "chained hash table"
    }
}

impl<K, V, S, C> fmt::Debug for ChainedHashTable<K, V, S, C>
where
    K: Hash + Eq + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
    C: Comparator<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
