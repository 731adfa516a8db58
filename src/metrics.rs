//! Instrumentation counters.
//!
//! Counters live behind `Cell` so read-only lookups (`search`, `contains`,
//! `iter`) can still record the comparisons they perform. They only ever
//! grow; `clear` on a container leaves them untouched.

use core::cell::Cell;

/// Monotonic event counter.
#[derive(Debug, Default)]
pub(crate) struct Counter(Cell<u64>);

impl Counter {
    pub(crate) const fn new() -> Self {
        Counter(Cell::new(0))
    }

    #[inline]
    pub(crate) fn bump(&self) {
        self.add(1);
    }

    #[inline]
    pub(crate) fn add(&self, n: u64) {
        self.0.set(self.0.get().saturating_add(n));
    }

    #[inline]
    pub(crate) fn get(&self) -> u64 {
        self.0.get()
    }
}

/// Probe-length accounting for open-addressing insertions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProbeStats {
    total: u64,
    insertions: u64,
    max: usize,
}

impl ProbeStats {
    pub(crate) fn record(&mut self, probes: usize) {
        self.total += probes as u64;
        self.insertions += 1;
        self.max = self.max.max(probes);
    }

    pub(crate) fn average(&self) -> f64 {
        if self.insertions == 0 {
            return 0.0;
        }
        self.total as f64 / self.insertions as f64
    }

    pub(crate) fn max(&self) -> usize {
        self.max
    }
}

/// Engine-family specific counters, as reported by
/// [`Container::stats`](crate::Container::stats).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineStats {
    /// Balanced trees: single rotations performed (a double rotation counts two).
    Tree { rotations: u64 },
    /// Hash tables: insertions that landed on an occupied bucket/slot, plus
    /// the average and worst access length.
    ///
    /// For chaining, access length is chain length over non-empty buckets.
    /// For open addressing, it is the number of probes per insertion.
    Hash {
        collisions: u64,
        average_access_length: f64,
        max_access_length: usize,
    },
}

impl EngineStats {
    pub fn rotations(&self) -> Option<u64> {
        match *self {
            EngineStats::Tree { rotations } => Some(rotations),
            EngineStats::Hash { .. } => None,
        }
    }

    pub fn collisions(&self) -> Option<u64> {
        match *self {
            EngineStats::Hash { collisions, .. } => Some(collisions),
            EngineStats::Tree { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_is_monotonic() {
        let c = Counter::new();
        c.bump();
        c.add(4);
        assert_eq!(c.get(), 5);
    }

    #[test]
    fn probe_stats_average_and_max() {
        let mut p = ProbeStats::default();
        assert_eq!(p.average(), 0.0);
        p.record(1);
        p.record(3);
        p.record(2);
        assert_eq!(p.average(), 2.0);
        assert_eq!(p.max(), 3);
    }

    #[test]
    fn stats_accessors_by_family() {
        let t = EngineStats::Tree { rotations: 7 };
        assert_eq!(t.rotations(), Some(7));
        assert_eq!(t.collisions(), None);
        let h = EngineStats::Hash {
            collisions: 2,
            average_access_length: 1.5,
            max_access_length: 3,
        };
        assert_eq!(h.collisions(), Some(2));
        assert_eq!(h.rotations(), None);
    }
}
