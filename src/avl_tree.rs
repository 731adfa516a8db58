//! AvlTree: height-balanced binary search tree over a slotmap arena.
//!
//! Nodes live in a `SlotMap` and refer to their children by `NodeKey`;
//! a subtree is "owned" by whichever slot links to it. Dropping or clearing
//! the arena releases every node without a recursive walk.
//!
//! Balance factor is `height(right) - height(left)`. Insertion picks the
//! rotation by comparing the inserted key with the heavy child's key;
//! removal picks it from the heavy child's own balance factor, since the
//! removed key says nothing about the shape left behind.

use crate::compare::{Comparator, NaturalOrder};
use crate::container::Container;
use crate::error::{Error, Result};
use crate::metrics::{Counter, EngineStats};
use crate::reentrancy::DebugReentrancy;
use core::cmp::Ordering;
use core::fmt;
use core::mem;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    struct NodeKey;
}

#[derive(Debug)]
struct AvlNode<K, V> {
    key: K,
    value: V,
    height: i32,
    left: Option<NodeKey>,
    right: Option<NodeKey>,
}

impl<K, V> AvlNode<K, V> {
    fn leaf(key: K, value: V) -> Self {
        Self {
            key,
            value,
            height: 1,
            left: None,
            right: None,
        }
    }
}

pub struct AvlTree<K, V, C = NaturalOrder> {
    nodes: SlotMap<NodeKey, AvlNode<K, V>>,
    root: Option<NodeKey>,
    cmp: C,
    comparisons: Counter,
    rotations: Counter,
    reentrancy: DebugReentrancy,
}

impl<K, V> AvlTree<K, V>
where
    K: Ord,
{
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K, V> Default for AvlTree<K, V>
where
    K: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> AvlTree<K, V, C>
where
    C: Comparator<K>,
{
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
            cmp,
            comparisons: Counter::new(),
            rotations: Counter::new(),
            reentrancy: DebugReentrancy::new("AvlTree"),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Height of the whole tree; 0 when empty.
    pub fn height(&self) -> usize {
        self.height_of(self.root) as usize
    }

    pub fn comparisons(&self) -> u64 {
        self.comparisons.get()
    }

    pub fn rotations(&self) -> u64 {
        self.rotations.get()
    }

    pub fn insert(&mut self, key: K, value: V) -> bool {
        let _g = self.reentrancy.enter();
        let (root, inserted) = self.insert_at(self.root, key, value);
        self.root = Some(root);
        inserted.is_some()
    }

    pub fn search(&self, key: &K) -> Result<&V> {
        let _g = self.reentrancy.enter();
        self.find(key)
            .map(|n| &self.nodes[n].value)
            .ok_or(Error::NotFound)
    }

    pub fn search_mut(&mut self, key: &K) -> Result<&mut V> {
        let _g = self.reentrancy.enter();
        let n = self.find(key).ok_or(Error::NotFound)?;
        Ok(&mut self.nodes[n].value)
    }

    pub fn contains(&self, key: &K) -> bool {
        let _g = self.reentrancy.enter();
        self.find(key).is_some()
    }

    pub fn at(&mut self, key: &K, value: V) -> Result<()> {
        *self.search_mut(key)? = value;
        Ok(())
    }

    /// Removes `key` and returns its entry, rebalancing every ancestor on
    /// the way back up.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let _g = self.reentrancy.enter();
        let (root, removed) = self.remove_at(self.root, key);
        self.root = root;
        removed
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.remove_entry(key).is_some()
    }

    pub fn clear(&mut self) {
        tracing::trace!(entries = self.nodes.len(), "clearing AvlTree");
        self.nodes.clear();
        self.root = None;
    }

    /// In-order iterator, ascending by the tree's comparator.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut it = Iter {
            nodes: &self.nodes,
            stack: Vec::with_capacity(self.height()),
            remaining: self.nodes.len(),
        };
        it.push_left(self.root);
        it
    }

    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self.comparisons.bump();
        self.cmp.compare(a, b)
    }

    fn find(&self, key: &K) -> Option<NodeKey> {
        let mut cur = self.root;
        while let Some(n) = cur {
            let node = &self.nodes[n];
            cur = match self.compare(key, &node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(n),
            };
        }
        None
    }

    fn height_of(&self, n: Option<NodeKey>) -> i32 {
        n.map_or(0, |k| self.nodes[k].height)
    }

    fn balance_of(&self, n: NodeKey) -> i32 {
        let node = &self.nodes[n];
        self.height_of(node.right) - self.height_of(node.left)
    }

    fn update_height(&mut self, n: NodeKey) {
        let (l, r) = (self.nodes[n].left, self.nodes[n].right);
        self.nodes[n].height = 1 + self.height_of(l).max(self.height_of(r));
    }

    /// Lifts `p`'s left child above it; returns the new subtree root.
    fn rotate_right(&mut self, p: NodeKey) -> NodeKey {
        let Some(u) = self.nodes[p].left else {
            return p;
        };
        self.rotations.bump();
        self.nodes[p].left = self.nodes[u].right;
        self.nodes[u].right = Some(p);
        self.update_height(p);
        self.update_height(u);
        u
    }

    /// Lifts `p`'s right child above it; returns the new subtree root.
    fn rotate_left(&mut self, p: NodeKey) -> NodeKey {
        let Some(u) = self.nodes[p].right else {
            return p;
        };
        self.rotations.bump();
        self.nodes[p].right = self.nodes[u].left;
        self.nodes[u].left = Some(p);
        self.update_height(p);
        self.update_height(u);
        u
    }

    /// Returns the new subtree root and the freshly inserted node, if any.
    fn insert_at(
        &mut self,
        node: Option<NodeKey>,
        key: K,
        value: V,
    ) -> (NodeKey, Option<NodeKey>) {
        let Some(p) = node else {
            let n = self.nodes.insert(AvlNode::leaf(key, value));
            return (n, Some(n));
        };

        let inserted = match self.compare(&key, &self.nodes[p].key) {
            Ordering::Less => {
                let left = self.nodes[p].left;
                let (child, inserted) = self.insert_at(left, key, value);
                self.nodes[p].left = Some(child);
                inserted
            }
            Ordering::Greater => {
                let right = self.nodes[p].right;
                let (child, inserted) = self.insert_at(right, key, value);
                self.nodes[p].right = Some(child);
                inserted
            }
            Ordering::Equal => None,
        };

        match inserted {
            Some(n) => (self.fixup_insert(p, n), Some(n)),
            // Duplicate: no heights changed along this path.
            None => (p, None),
        }
    }

    /// Left-left, left-right, right-right and right-left cases, selected by
    /// where the inserted key falls relative to the heavy child.
    fn fixup_insert(&mut self, p: NodeKey, inserted: NodeKey) -> NodeKey {
        self.update_height(p);
        let bal = self.balance_of(p);

        if bal < -1 {
            if let Some(l) = self.nodes[p].left {
                if self.compare(&self.nodes[inserted].key, &self.nodes[l].key) == Ordering::Less {
                    return self.rotate_right(p);
                }
                let l = self.rotate_left(l);
                self.nodes[p].left = Some(l);
                return self.rotate_right(p);
            }
        } else if bal > 1 {
            if let Some(r) = self.nodes[p].right {
                if self.compare(&self.nodes[inserted].key, &self.nodes[r].key)
                    == Ordering::Greater
                {
                    return self.rotate_left(p);
                }
                let r = self.rotate_right(r);
                self.nodes[p].right = Some(r);
                return self.rotate_left(p);
            }
        }
        p
    }

    fn fixup_remove(&mut self, p: NodeKey) -> NodeKey {
        self.update_height(p);
        let bal = self.balance_of(p);

        if bal < -1 {
            if let Some(l) = self.nodes[p].left {
                if self.balance_of(l) > 0 {
                    let l = self.rotate_left(l);
                    self.nodes[p].left = Some(l);
                }
                return self.rotate_right(p);
            }
        } else if bal > 1 {
            if let Some(r) = self.nodes[p].right {
                if self.balance_of(r) < 0 {
                    let r = self.rotate_right(r);
                    self.nodes[p].right = Some(r);
                }
                return self.rotate_left(p);
            }
        }
        p
    }

    fn remove_at(&mut self, node: Option<NodeKey>, key: &K) -> (Option<NodeKey>, Option<(K, V)>) {
        let Some(p) = node else {
            return (None, None);
        };

        let removed = match self.compare(key, &self.nodes[p].key) {
            Ordering::Less => {
                let left = self.nodes[p].left;
                let (child, removed) = self.remove_at(left, key);
                self.nodes[p].left = child;
                removed
            }
            Ordering::Greater => {
                let right = self.nodes[p].right;
                let (child, removed) = self.remove_at(right, key);
                self.nodes[p].right = child;
                removed
            }
            Ordering::Equal => match (self.nodes[p].left, self.nodes[p].right) {
                (Some(_), Some(r)) => {
                    // Pull the in-order successor out of the right subtree
                    // and move its payload into `p`.
                    let (right, succ) = self.detach_min(r);
                    self.nodes[p].right = right;
                    self.nodes.remove(succ).map(|s| {
                        let node = &mut self.nodes[p];
                        (
                            mem::replace(&mut node.key, s.key),
                            mem::replace(&mut node.value, s.value),
                        )
                    })
                }
                (left, right) => {
                    let removed = self.nodes.remove(p).map(|n| (n.key, n.value));
                    return (left.or(right), removed);
                }
            },
        };

        if removed.is_none() {
            return (Some(p), None);
        }
        (Some(self.fixup_remove(p)), removed)
    }

    /// Unlinks the minimum node of the subtree rooted at `n` (leaving it in
    /// the arena) and returns the rebalanced subtree root alongside it.
    fn detach_min(&mut self, n: NodeKey) -> (Option<NodeKey>, NodeKey) {
        match self.nodes[n].left {
            None => (self.nodes[n].right, n),
            Some(l) => {
                let (left, min) = self.detach_min(l);
                self.nodes[n].left = left;
                (Some(self.fixup_remove(n)), min)
            }
        }
    }

    /// Walks the whole tree asserting ordering, stored heights and balance.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        fn walk<K, V, C: Comparator<K>>(
            t: &AvlTree<K, V, C>,
            n: Option<NodeKey>,
            lo: Option<&K>,
            hi: Option<&K>,
            count: &mut usize,
        ) -> i32 {
            let Some(k) = n else { return 0 };
            *count += 1;
            let node = &t.nodes[k];
            if let Some(lo) = lo {
                assert_eq!(t.cmp.compare(lo, &node.key), Ordering::Less, "order violated");
            }
            if let Some(hi) = hi {
                assert_eq!(t.cmp.compare(&node.key, hi), Ordering::Less, "order violated");
            }
            let hl = walk(t, node.left, lo, Some(&node.key), count);
            let hr = walk(t, node.right, Some(&node.key), hi, count);
            assert!((hr - hl).abs() <= 1, "balance factor {} out of range", hr - hl);
            assert_eq!(node.height, 1 + hl.max(hr), "stale height");
            node.height
        }
        let mut count = 0;
        walk(self, self.root, None, None, &mut count);
        assert_eq!(count, self.nodes.len(), "unreachable nodes in arena");
    }
}

/// In-order iterator over an [`AvlTree`].
pub struct Iter<'a, K, V> {
    nodes: &'a SlotMap<NodeKey, AvlNode<K, V>>,
    stack: Vec<NodeKey>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left(&mut self, mut cur: Option<NodeKey>) {
        while let Some(n) = cur {
            self.stack.push(n);
            cur = self.nodes[n].left;
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        let nodes = self.nodes;
        let node = &nodes[n];
        self.push_left(node.right);
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V, C> Container<K, V> for AvlTree<K, V, C>
where
    C: Comparator<K>,
{
    type Iter<'a> = Iter<'a, K, V> where Self: 'a, K: 'a, V: 'a;

    fn insert(&mut self, key: K, value: V) -> bool {
        AvlTree::insert(self, key, value)
    }
    fn search(&self, key: &K) -> Result<&V> {
        AvlTree::search(self, key)
    }
    fn search_mut(&mut self, key: &K) -> Result<&mut V> {
        AvlTree::search_mut(self, key)
    }
    fn contains(&self, key: &K) -> bool {
        AvlTree::contains(self, key)
    }
    fn at(&mut self, key: &K, value: V) -> Result<()> {
        AvlTree::at(self, key, value)
    }
    fn remove(&mut self, key: &K) -> bool {
        AvlTree::remove(self, key)
    }
    fn clear(&mut self) {
        AvlTree::clear(self)
    }
    fn len(&self) -> usize {
        AvlTree::len(self)
    }
    fn iter(&self) -> Self::Iter<'_> {
        AvlTree::iter(self)
    }
    fn comparisons(&self) -> u64 {
        AvlTree::comparisons(self)
    }
    fn stats(&self) -> EngineStats {
        EngineStats::Tree {
            rotations: self.rotations(),
        }
    }
    fn name(&self) -> &'static str {
        "AVL tree"
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: Comparator<K>> fmt::Debug for AvlTree<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::CaseInsensitive;

    fn keys<V, C: Comparator<String>>(t: &AvlTree<String, V, C>) -> Vec<&str> {
        t.iter().map(|(k, _)| k.as_str()).collect()
    }

    #[test]
    fn ascending_inserts_rotate_left() {
        let mut t = AvlTree::new();
        for k in 1..=3 {
            assert!(t.insert(k, k * 10));
        }
        t.check_invariants();
        assert_eq!(t.rotations(), 1);
        assert_eq!(t.height(), 2);
        assert_eq!(t.nodes[t.root.unwrap()].key, 2);
    }

    #[test]
    fn zigzag_insert_is_a_double_rotation() {
        let mut t = AvlTree::new();
        for k in [3, 1, 2] {
            t.insert(k, ());
        }
        t.check_invariants();
        assert_eq!(t.rotations(), 2);
        assert_eq!(t.nodes[t.root.unwrap()].key, 2);

        let mut t = AvlTree::new();
        for k in [1, 3, 2] {
            t.insert(k, ());
        }
        t.check_invariants();
        assert_eq!(t.rotations(), 2);
        assert_eq!(t.nodes[t.root.unwrap()].key, 2);
    }

    #[test]
    fn duplicate_insert_keeps_first_value() {
        let mut t: AvlTree<String, i32> = AvlTree::new();
        assert!(t.insert("k".to_string(), 1));
        assert!(!t.insert("k".to_string(), 2));
        assert_eq!(t.len(), 1);
        assert_eq!(t.search(&"k".to_string()), Ok(&1));
    }

    #[test]
    fn search_at_and_not_found() {
        let mut t: AvlTree<String, i32> = AvlTree::new();
        t.insert("a".to_string(), 1);
        assert_eq!(t.search(&"b".to_string()), Err(Error::NotFound));
        assert_eq!(t.at(&"b".to_string(), 5), Err(Error::NotFound));
        assert_eq!(t.at(&"a".to_string(), 5), Ok(()));
        assert_eq!(t.search(&"a".to_string()), Ok(&5));
        *t.search_mut(&"a".to_string()).unwrap() += 1;
        assert_eq!(t.search(&"a".to_string()), Ok(&6));
    }

    #[test]
    fn remove_leaf_single_child_and_two_children() {
        let mut t = AvlTree::new();
        for k in [50, 30, 70, 20, 40, 60, 80, 10] {
            t.insert(k, k);
        }
        // Leaf.
        assert_eq!(t.remove_entry(&10), Some((10, 10)));
        t.check_invariants();
        // Two children: 30 is replaced by its successor 40.
        assert_eq!(t.remove_entry(&30), Some((30, 30)));
        t.check_invariants();
        // Root with two children.
        assert!(t.remove(&50));
        t.check_invariants();
        assert!(!t.remove(&50));
        let rest: Vec<i32> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(rest, vec![20, 40, 60, 70, 80]);
        for (k, v) in t.iter() {
            assert_eq!(k, v, "payload moved with its key");
        }
    }

    #[test]
    fn removal_rebalances_ancestors() {
        let mut t = AvlTree::new();
        for k in [4, 2, 6, 1, 3, 5, 7, 8] {
            t.insert(k, ());
        }
        let before = t.rotations();
        // Removing the left side forces a rotation at the root.
        t.remove(&1);
        t.remove(&3);
        t.remove(&2);
        t.check_invariants();
        assert!(t.rotations() > before);
    }

    #[test]
    fn remove_needs_double_rotation_from_child_balance() {
        // Left child ends up right-heavy after the removal on the right.
        let mut t = AvlTree::new();
        for k in [5, 2, 8, 1, 4, 9, 3] {
            t.insert(k, ());
        }
        t.remove(&9);
        t.check_invariants();
        assert_eq!(t.nodes[t.root.unwrap()].key, 4);
    }

    #[test]
    fn many_operations_keep_invariants() {
        let mut t = AvlTree::new();
        let mut s: u64 = 7;
        for _ in 0..2_000 {
            s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
            let k = (s >> 33) % 500;
            if s & 1 == 0 {
                t.insert(k, k);
            } else {
                t.remove(&k);
            }
        }
        t.check_invariants();
        assert!(t.height() <= 13, "height {} too large", t.height());
    }

    #[test]
    fn iteration_is_sorted_and_restartable() {
        let mut t: AvlTree<String, i32> = AvlTree::new();
        for k in ["pear", "apple", "fig", "kiwi"] {
            t.insert(k.to_string(), 0);
        }
        assert_eq!(keys(&t), vec!["apple", "fig", "kiwi", "pear"]);
        assert_eq!(keys(&t), vec!["apple", "fig", "kiwi", "pear"]);
        assert_eq!(t.iter().len(), 4);
    }

    #[test]
    fn clear_keeps_counters() {
        let mut t = AvlTree::new();
        for k in 0..10 {
            t.insert(k, ());
        }
        let (cmps, rots) = (t.comparisons(), t.rotations());
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.height(), 0);
        assert_eq!(t.iter().next(), None);
        assert_eq!(t.comparisons(), cmps);
        assert_eq!(t.rotations(), rots);
        assert!(t.insert(1, ()));
    }

    #[test]
    fn search_counts_comparisons() {
        let mut t = AvlTree::new();
        for k in 1..=7 {
            t.insert(k, ());
        }
        let before = t.comparisons();
        // Perfectly balanced: 4 at the root, 1 sits at depth 3.
        assert!(t.contains(&1));
        assert_eq!(t.comparisons() - before, 3);
    }

    #[test]
    fn case_insensitive_comparator() {
        let mut t = AvlTree::with_comparator(CaseInsensitive);
        t.insert("Banana".to_string(), 1);
        t.insert("apple".to_string(), 2);
        assert!(!t.insert("BANANA".to_string(), 3));
        assert_eq!(keys(&t), vec!["apple", "Banana"]);
        assert_eq!(t.search(&"banana".to_string()), Ok(&1));
    }

    #[test]
    fn debug_prints_in_order() {
        let mut t = AvlTree::new();
        t.insert(2, 'b');
        t.insert(1, 'a');
        assert_eq!(format!("{:?}", t), "{1: 'a', 2: 'b'}");
    }
}
