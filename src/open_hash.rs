//! OpenHashTable: open addressing with double hashing and lazy deletion.
//!
//! Probe sequence for a key with hash `h` in a table of prime size `m`:
//! `index(i) = (h + i * (1 + h % (m - 1))) % m`. The step lies in
//! `1..m` and is coprime with `m`, so the first `m` probes visit every slot.
//!
//! Removal leaves a tombstone (`Slot::Deleted`). Lookups probe past
//! tombstones and stop at the first `Empty`; insertions reuse the earliest
//! tombstone they passed. Tombstones are dropped only by a rehash, so a
//! table under heavy remove/insert churn sees probe lengths creep up until
//! the next grow.

use crate::compare::{Comparator, NaturalOrder};
use crate::config::TableConfig;
use crate::container::Container;
use crate::error::{Error, Result};
use crate::metrics::{Counter, EngineStats, ProbeStats};
use crate::primes::next_prime;
use crate::reentrancy::DebugReentrancy;
use crate::snapshot::SortedIter;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use hashbrown::hash_map::DefaultHashBuilder;

#[derive(Debug)]
enum Slot<K, V> {
    Empty,
    Active(K, V),
    Deleted,
}

/// Outcome of scanning a key's probe sequence on behalf of an insertion.
enum Vacancy {
    Present,
    Free { slot: usize, probes: usize },
    Exhausted,
}

fn probe_sequence(hash: u64, m: usize) -> impl Iterator<Item = usize> {
    let m = m as u64;
    let start = hash % m;
    let step = 1 + hash % (m - 1);
    (0..m).map(move |i| ((start + (i * step) % m) % m) as usize)
}

fn empty_slots<K, V>(n: usize) -> Vec<Slot<K, V>> {
    (0..n).map(|_| Slot::Empty).collect()
}

pub struct OpenHashTable<K, V, S = DefaultHashBuilder, C = NaturalOrder> {
    slots: Vec<Slot<K, V>>,
    len: usize,
    tombstones: usize,
    max_load_factor: f64,
    hasher: S,
    cmp: C,
    comparisons: Counter,
    collisions: Counter,
    probes: ProbeStats,
    reentrancy: DebugReentrancy,
}

impl<K, V> OpenHashTable<K, V>
where
    K: Hash + Eq + Ord,
{
    pub fn new() -> Self {
        Self::with_capacity(TableConfig::DEFAULT_CAPACITY)
    }

    /// Table of `next_prime(capacity)` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        let config = TableConfig::default().with_initial_capacity(capacity);
        Self::build(config, DefaultHashBuilder::default(), NaturalOrder)
    }
}

impl<K, V> Default for OpenHashTable<K, V>
where
    K: Hash + Eq + Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> OpenHashTable<K, V, S>
where
    K: Hash + Eq + Ord,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::build(TableConfig::default(), hasher, NaturalOrder)
    }
}

impl<K, V, S, C> OpenHashTable<K, V, S, C>
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
        Self {
            slots: empty_slots(next_prime(config.initial_capacity)),
            len: 0,
            tombstones: 0,
            max_load_factor: config.max_load_factor,
            hasher,
            cmp,
            comparisons: Counter::new(),
            collisions: Counter::new(),
            probes: ProbeStats::default(),
            reentrancy: DebugReentrancy::new("OpenHashTable"),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.slots.len()
    }

    /// Live entries over slots; tombstones do not count.
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.slots.len() as f64
    }

    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// Slots currently holding a tombstone.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    pub fn comparisons(&self) -> u64 {
        self.comparisons.get()
    }

    /// Active slots holding another key met while probing for an insertion.
    pub fn collisions(&self) -> u64 {
        self.collisions.get()
    }

    /// Mean probes per successful insertion.
    pub fn average_access_length(&self) -> f64 {
        self.probes.average()
    }

    /// Most probes any single insertion needed.
    pub fn max_access_length(&self) -> usize {
        self.probes.max()
    }

    pub fn insert(&mut self, key: K, value: V) -> bool {
        let _g = self.reentrancy.enter();
        loop {
            match self.find_vacancy(&key) {
                Vacancy::Present => return false,
                Vacancy::Free { slot, probes } => {
                    let prev = mem::replace(&mut self.slots[slot], Slot::Active(key, value));
                    if matches!(prev, Slot::Deleted) {
                        self.tombstones -= 1;
                    }
                    self.len += 1;
                    self.probes.record(probes);
                    break;
                }
                // Every slot probed, none free; cannot happen below a load
                // factor of 1, but growing is always a valid way out.
                Vacancy::Exhausted => {
                    let target = next_prime(2 * self.slots.len());
                    self.rehash_to(target);
                }
            }
        }

        while self.load_factor() >= self.max_load_factor {
            let target = next_prime(2 * self.slots.len());
            self.rehash_to(target);
        }
        true
    }

    pub fn search(&self, key: &K) -> Result<&V> {
        let _g = self.reentrancy.enter();
        match self.find(key).map(|i| &self.slots[i]) {
            Some(Slot::Active(_, v)) => Ok(v),
            _ => Err(Error::NotFound),
        }
    }

    pub fn search_mut(&mut self, key: &K) -> Result<&mut V> {
        let _g = self.reentrancy.enter();
        let i = self.find(key).ok_or(Error::NotFound)?;
        match &mut self.slots[i] {
            Slot::Active(_, v) => Ok(v),
            _ => Err(Error::NotFound),
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        let _g = self.reentrancy.enter();
        self.find(key).is_some()
    }

    pub fn at(&mut self, key: &K, value: V) -> Result<()> {
        *self.search_mut(key)? = value;
        Ok(())
    }

    /// Marks the key's slot as a tombstone and returns its entry.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let _g = self.reentrancy.enter();
        let i = self.find(key)?;
        match mem::replace(&mut self.slots[i], Slot::Deleted) {
            Slot::Active(k, v) => {
                self.len -= 1;
                self.tombstones += 1;
                Some((k, v))
            }
            other => {
                self.slots[i] = other;
                None
            }
        }
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.remove_entry(key).is_some()
    }

    /// Empties every slot, tombstones included; the slot count is kept.
    pub fn clear(&mut self) {
        tracing::trace!(
            entries = self.len,
            tombstones = self.tombstones,
            "clearing OpenHashTable"
        );
        self.slots = empty_slots(self.slots.len());
        self.len = 0;
        self.tombstones = 0;
    }

    /// Grows to `next_prime(new_size)` slots, reinserting live entries and
    /// dropping tombstones. Does nothing unless `new_size` exceeds the
    /// current count.
    pub fn rehash(&mut self, new_size: usize) {
        let _g = self.reentrancy.enter();
        if new_size <= self.slots.len() {
            return;
        }
        self.rehash_to(next_prime(new_size));
    }

    /// Entries in ascending comparator order.
    pub fn iter(&self) -> SortedIter<'_, K, V> {
        let _g = self.reentrancy.enter();
        let entries = self
            .slots
            .iter()
            .filter_map(|s| match s {
                Slot::Active(k, v) => Some((k, v)),
                _ => None,
            })
            .collect();
        SortedIter::new(entries, &self.cmp, &self.comparisons)
    }

    fn hash(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    /// Slot index of `key`, probing until an `Empty` slot or a full cycle.
    fn find(&self, key: &K) -> Option<usize> {
        for i in probe_sequence(self.hash(key), self.slots.len()) {
            match &self.slots[i] {
                Slot::Empty => return None,
                Slot::Deleted => {}
                Slot::Active(k, _) => {
                    self.comparisons.bump();
                    if k == key {
                        return Some(i);
                    }
                }
            }
        }
        None
    }

    fn find_vacancy(&self, key: &K) -> Vacancy {
        let mut first_deleted = None;
        let mut probes = 0;
        for i in probe_sequence(self.hash(key), self.slots.len()) {
            probes += 1;
            match &self.slots[i] {
                Slot::Active(k, _) => {
                    self.comparisons.bump();
                    if k == key {
                        return Vacancy::Present;
                    }
                    self.collisions.bump();
                }
                Slot::Deleted => {
                    first_deleted.get_or_insert(i);
                }
                Slot::Empty => {
                    return Vacancy::Free {
                        slot: first_deleted.unwrap_or(i),
                        probes,
                    };
                }
            }
        }
        match first_deleted {
            Some(slot) => Vacancy::Free { slot, probes },
            None => Vacancy::Exhausted,
        }
    }

    fn rehash_to(&mut self, new_count: usize) {
        let old_count = self.slots.len();
        let dropped = self.tombstones;
        let old = mem::replace(&mut self.slots, empty_slots(new_count));
        self.tombstones = 0;
        for slot in old {
            let Slot::Active(k, v) = slot else { continue };
            let hash = self.hash(&k);
            // Callers size the table above `len`, and the sequence visits
            // every slot of a prime count.
            let Some(i) = probe_sequence(hash, new_count)
                .find(|&i| !matches!(self.slots[i], Slot::Active(..)))
            else {
                unreachable!("rehash target of {new_count} slots has no room for a live entry");
            };
            self.slots[i] = Slot::Active(k, v);
        }
        tracing::debug!(
            old_slots = old_count,
            new_slots = new_count,
            entries = self.len,
            tombstones_dropped = dropped,
            "rehashed OpenHashTable"
        );
    }

    /// Every active key is reachable along its probe sequence before any
    /// empty slot, keys are unique and counters match the slots.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let m = self.slots.len();
        let mut active = 0;
        let mut deleted = 0;
        for (i, slot) in self.slots.iter().enumerate() {
            match slot {
                Slot::Empty => {}
                Slot::Deleted => deleted += 1,
                Slot::Active(k, _) => {
                    active += 1;
                    let mut reached = false;
                    for j in probe_sequence(self.hash(k), m) {
                        match &self.slots[j] {
                            Slot::Empty => break,
                            Slot::Active(other, _) if j != i => {
                                assert!(other != k, "duplicate active key")
                            }
                            Slot::Active(..) => {
                                reached = true;
                                break;
                            }
                            Slot::Deleted => {}
                        }
                    }
                    assert!(reached, "active entry unreachable by probing");
                }
            }
        }
        assert_eq!(active, self.len, "len out of sync");
        assert_eq!(deleted, self.tombstones, "tombstone count out of sync");
        assert!(self.load_factor() < self.max_load_factor, "load factor over threshold");
    }
}

impl<K, V, S, C> Container<K, V> for OpenHashTable<K, V, S, C>
where
    K: Hash + Eq,
    S: BuildHasher,
    C: Comparator<K>,
{
    type Iter<'a> = SortedIter<'a, K, V> where Self: 'a, K: 'a, V: 'a;

    fn insert(&mut self, key: K, value: V) -> bool {
        OpenHashTable::insert(self, key, value)
    }
    fn search(&self, key: &K) -> Result<&V> {
        OpenHashTable::search(self, key)
    }
    fn search_mut(&mut self, key: &K) -> Result<&mut V> {
        OpenHashTable::search_mut(self, key)
    }
    fn contains(&self, key: &K) -> bool {
        OpenHashTable::contains(self, key)
    }
    fn at(&mut self, key: &K, value: V) -> Result<()> {
        OpenHashTable::at(self, key, value)
    }
    fn remove(&mut self, key: &K) -> bool {
        OpenHashTable::remove(self, key)
    }
    fn clear(&mut self) {
        OpenHashTable::clear(self)
    }
    fn len(&self) -> usize {
        self.len
    }
    fn iter(&self) -> Self::Iter<'_> {
        OpenHashTable::iter(self)
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
        "open-addressing hash table"
    }
}

impl<K, V, S, C> fmt::Debug for OpenHashTable<K, V, S, C>
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
