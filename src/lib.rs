//! dict-engines: four interchangeable associative containers mapping
//! unique keys to values, each instrumented so their costs can be compared
//! on the same workload.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one observable contract, four cost profiles. A caller written
//!   against [`Container`] behaves identically on every engine; only the
//!   counters differ.
//! - Engines:
//!   - AvlTree<K, V, C>: height-balanced BST. Nodes live in a `SlotMap`
//!     arena and link to children by key; rebalancing counts rotations.
//!   - RbTree<K, V, C>: color-balanced BST with parent links and a shared
//!     black `nil` sentinel slot, so the classic fixups run without
//!     special-casing absent children.
//!   - ChainedHashTable<K, V, S, C>: prime-sized bucket array of chains.
//!   - OpenHashTable<K, V, S, C>: prime-sized slot array with double-hash
//!     probing and tombstones for removal.
//! - FrequencyCounter<K, M>: the word-count adapter driving any engine
//!   with `u64` values.
//!
//! Instrumentation
//! - Every comparator call and every hash-engine key-equality test counts
//!   one comparison, including the sort behind hash-engine iteration.
//! - Trees count single rotations (a double rotation is two). Hash
//!   engines count collisions and access lengths; see [`EngineStats`].
//! - Counters sit in `Cell`s so `&self` lookups can record their work.
//!   They accumulate over the container's lifetime; `clear` keeps them.
//!
//! Constraints
//! - Single-threaded: engines are `!Sync` (interior counters) and carry a
//!   `!Send` marker in their reentrancy guard.
//! - Keys are immutable once inserted; duplicate inserts leave the stored
//!   value alone and return `false`.
//! - Hash tables keep `len / bucket_count` below `max_load_factor` after
//!   every insertion, growing to the next prime at least double the
//!   current size. They never shrink.
//!
//! Reentrancy policy
//! - Engines call user code (comparators, `Hash`, `Eq`) while their
//!   structure may be mid-update. A debug-only guard at each public entry
//!   point panics if that user code calls back into the same engine.
//!   Release builds compile the guard away.
//!
//! Notes and non-goals
//! - No text ingestion, normalization or report formatting; those belong
//!   to callers of [`FrequencyCounter`].
//! - No concurrent access, persistence or shrinking.
//! - Ordered iteration on hash engines sorts a fresh snapshot per call,
//!   O(n log n) each time.

pub mod avl_tree;
pub mod chained_hash;
mod compare;
mod config;
mod container;
mod engine_proptest;
mod error;
mod frequency;
mod metrics;
pub mod open_hash;
mod primes;
pub mod rb_tree;
mod reentrancy;
mod snapshot;

// Public surface
pub use avl_tree::AvlTree;
pub use chained_hash::ChainedHashTable;
pub use compare::{CaseInsensitive, Comparator, NaturalOrder};
pub use config::TableConfig;
pub use container::Container;
pub use error::{Error, Result};
pub use frequency::FrequencyCounter;
pub use metrics::EngineStats;
pub use open_hash::OpenHashTable;
pub use rb_tree::RbTree;
pub use snapshot::SortedIter;
