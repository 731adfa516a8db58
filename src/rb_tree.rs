//! RbTree: red-black tree with a sentinel leaf, stored in a slotmap arena.
//!
//! Structure and payload are kept apart:
//! - `links: SlotMap<NodeKey, Links>` holds color and parent/child handles
//!   for every node plus one reserved black `nil` slot. `nil` terminates
//!   every leaf path and is the parent of the root, so fix-up loops never
//!   branch on "missing child".
//! - `entries: SecondaryMap<NodeKey, (K, V)>` holds the key/value of real
//!   nodes only; the sentinel never needs a payload.
//!
//! Removal of a node with two children moves the in-order successor's
//! payload into it and splices out the successor instead, so the physical
//! splice always concerns a node with at most one child.

use crate::compare::{Comparator, NaturalOrder};
use crate::container::Container;
use crate::error::{Error, Result};
use crate::metrics::{Counter, EngineStats};
use crate::reentrancy::DebugReentrancy;
use core::cmp::Ordering;
use core::fmt;
use slotmap::{new_key_type, SecondaryMap, SlotMap};

new_key_type! {
    struct NodeKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Debug, Clone, Copy)]
struct Links {
    color: Color,
    left: NodeKey,
    right: NodeKey,
    parent: NodeKey,
}

pub struct RbTree<K, V, C = NaturalOrder> {
    links: SlotMap<NodeKey, Links>,
    entries: SecondaryMap<NodeKey, (K, V)>,
    nil: NodeKey,
    root: NodeKey,
    cmp: C,
    comparisons: Counter,
    rotations: Counter,
    reentrancy: DebugReentrancy,
}

impl<K, V> RbTree<K, V>
where
    K: Ord,
{
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K, V> Default for RbTree<K, V>
where
    K: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> RbTree<K, V, C>
where
    C: Comparator<K>,
{
    pub fn with_comparator(cmp: C) -> Self {
        let mut links = SlotMap::with_key();
        let nil = links.insert_with_key(|k| Links {
            color: Color::Black,
            left: k,
            right: k,
            parent: k,
        });
        Self {
            links,
            entries: SecondaryMap::new(),
            nil,
            root: nil,
            cmp,
            comparisons: Counter::new(),
            rotations: Counter::new(),
            reentrancy: DebugReentrancy::new("RbTree"),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Longest root-to-leaf path, counted in nodes; 0 when empty.
    pub fn height(&self) -> usize {
        let mut best = 0;
        let mut stack = vec![(self.root, 0usize)];
        while let Some((n, depth)) = stack.pop() {
            if n == self.nil {
                best = best.max(depth);
                continue;
            }
            stack.push((self.left(n), depth + 1));
            stack.push((self.right(n), depth + 1));
        }
        best
    }

    pub fn comparisons(&self) -> u64 {
        self.comparisons.get()
    }

    pub fn rotations(&self) -> u64 {
        self.rotations.get()
    }

    pub fn insert(&mut self, key: K, value: V) -> bool {
        let _g = self.reentrancy.enter();
        let mut parent = self.nil;
        let mut cur = self.root;
        let mut went_left = false;
        while cur != self.nil {
            parent = cur;
            match self.compare(&key, &self.entries[cur].0) {
                Ordering::Less => {
                    cur = self.left(cur);
                    went_left = true;
                }
                Ordering::Greater => {
                    cur = self.right(cur);
                    went_left = false;
                }
                Ordering::Equal => return false,
            }
        }

        let z = self.links.insert(Links {
            color: Color::Red,
            left: self.nil,
            right: self.nil,
            parent,
        });
        self.entries.insert(z, (key, value));
        if parent == self.nil {
            self.root = z;
        } else if went_left {
            self.links[parent].left = z;
        } else {
            self.links[parent].right = z;
        }
        self.insert_fixup(z);
        true
    }

    pub fn search(&self, key: &K) -> Result<&V> {
        let _g = self.reentrancy.enter();
        self.find(key)
            .map(|n| &self.entries[n].1)
            .ok_or(Error::NotFound)
    }

    pub fn search_mut(&mut self, key: &K) -> Result<&mut V> {
        let _g = self.reentrancy.enter();
        let n = self.find(key).ok_or(Error::NotFound)?;
        Ok(&mut self.entries[n].1)
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
        let z = self.find(key)?;

        let (spliced, removed) = if self.left(z) != self.nil && self.right(z) != self.nil {
            let y = self.minimum(self.right(z));
            let successor = self.entries.remove(y)?;
            (y, self.entries.insert(z, successor))
        } else {
            (z, self.entries.remove(z))
        };

        // `spliced` has at most one real child.
        let x = if self.left(spliced) != self.nil {
            self.left(spliced)
        } else {
            self.right(spliced)
        };
        let spliced_color = self.color(spliced);
        self.transplant(spliced, x);
        self.links.remove(spliced);
        if spliced_color == Color::Black {
            self.remove_fixup(x);
        }
        removed
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.remove_entry(key).is_some()
    }

    pub fn clear(&mut self) {
        tracing::trace!(entries = self.entries.len(), "clearing RbTree");
        let nil = self.nil;
        self.links.retain(|k, _| k == nil);
        self.links[nil] = Links {
            color: Color::Black,
            left: nil,
            right: nil,
            parent: nil,
        };
        self.entries.clear();
        self.root = nil;
    }

    /// In-order iterator, ascending by the tree's comparator.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let first = if self.root == self.nil {
            self.nil
        } else {
            self.minimum(self.root)
        };
        Iter {
            links: &self.links,
            entries: &self.entries,
            nil: self.nil,
            next: first,
            remaining: self.entries.len(),
        }
    }

    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self.comparisons.bump();
        self.cmp.compare(a, b)
    }

    #[inline]
    fn left(&self, n: NodeKey) -> NodeKey {
        self.links[n].left
    }

    #[inline]
    fn right(&self, n: NodeKey) -> NodeKey {
        self.links[n].right
    }

    #[inline]
    fn parent(&self, n: NodeKey) -> NodeKey {
        self.links[n].parent
    }

    #[inline]
    fn color(&self, n: NodeKey) -> Color {
        self.links[n].color
    }

    #[inline]
    fn set_color(&mut self, n: NodeKey, color: Color) {
        self.links[n].color = color;
    }

    fn find(&self, key: &K) -> Option<NodeKey> {
        let mut cur = self.root;
        while cur != self.nil {
            cur = match self.compare(key, &self.entries[cur].0) {
                Ordering::Less => self.left(cur),
                Ordering::Greater => self.right(cur),
                Ordering::Equal => return Some(cur),
            };
        }
        None
    }

    fn minimum(&self, mut n: NodeKey) -> NodeKey {
        while self.left(n) != self.nil {
            n = self.left(n);
        }
        n
    }

    /// Makes `v` take `u`'s place under `u`'s parent. Sets `v.parent` even
    /// when `v` is the sentinel; the remove fix-up reads it from there.
    fn transplant(&mut self, u: NodeKey, v: NodeKey) {
        let p = self.parent(u);
        if p == self.nil {
            self.root = v;
        } else if u == self.left(p) {
            self.links[p].left = v;
        } else {
            self.links[p].right = v;
        }
        self.links[v].parent = p;
    }

    fn rotate_left(&mut self, x: NodeKey) {
        self.rotations.bump();
        let y = self.right(x);
        let beta = self.left(y);
        self.links[x].right = beta;
        if beta != self.nil {
            self.links[beta].parent = x;
        }
        self.transplant_rotated(x, y);
        self.links[y].left = x;
        self.links[x].parent = y;
    }

    fn rotate_right(&mut self, x: NodeKey) {
        self.rotations.bump();
        let y = self.left(x);
        let beta = self.right(y);
        self.links[x].left = beta;
        if beta != self.nil {
            self.links[beta].parent = x;
        }
        self.transplant_rotated(x, y);
        self.links[y].right = x;
        self.links[x].parent = y;
    }

    /// Hooks `y` into `x`'s former position during a rotation.
    fn transplant_rotated(&mut self, x: NodeKey, y: NodeKey) {
        let p = self.parent(x);
        self.links[y].parent = p;
        if p == self.nil {
            self.root = y;
        } else if x == self.left(p) {
            self.links[p].left = y;
        } else {
            self.links[p].right = y;
        }
    }

    fn insert_fixup(&mut self, mut z: NodeKey) {
        while self.color(self.parent(z)) == Color::Red {
            let p = self.parent(z);
            let g = self.parent(p);
            if p == self.left(g) {
                let uncle = self.right(g);
                if self.color(uncle) == Color::Red {
                    self.set_color(p, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(g, Color::Red);
                    z = g;
                } else {
                    if z == self.right(p) {
                        z = p;
                        self.rotate_left(z);
                    }
                    let p = self.parent(z);
                    let g = self.parent(p);
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.left(g);
                if self.color(uncle) == Color::Red {
                    self.set_color(p, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(g, Color::Red);
                    z = g;
                } else {
                    if z == self.left(p) {
                        z = p;
                        self.rotate_right(z);
                    }
                    let p = self.parent(z);
                    let g = self.parent(p);
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    self.rotate_left(g);
                }
            }
        }
        let root = self.root;
        self.set_color(root, Color::Black);
    }

    /// Restores black-height after splicing out a black node; `x` carries
    /// the extra black.
    fn remove_fixup(&mut self, mut x: NodeKey) {
        while x != self.root && self.color(x) == Color::Black {
            let p = self.parent(x);
            if x == self.left(p) {
                let mut w = self.right(p);
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate_left(p);
                    w = self.right(self.parent(x));
                }
                if self.color(self.left(w)) == Color::Black
                    && self.color(self.right(w)) == Color::Black
                {
                    self.set_color(w, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.color(self.right(w)) == Color::Black {
                        let wl = self.left(w);
                        self.set_color(wl, Color::Black);
                        self.set_color(w, Color::Red);
                        self.rotate_right(w);
                        w = self.right(self.parent(x));
                    }
                    let p = self.parent(x);
                    self.set_color(w, self.color(p));
                    self.set_color(p, Color::Black);
                    let wr = self.right(w);
                    self.set_color(wr, Color::Black);
                    self.rotate_left(p);
                    x = self.root;
                }
            } else {
                let mut w = self.left(p);
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate_right(p);
                    w = self.left(self.parent(x));
                }
                if self.color(self.right(w)) == Color::Black
                    && self.color(self.left(w)) == Color::Black
                {
                    self.set_color(w, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.color(self.left(w)) == Color::Black {
                        let wr = self.right(w);
                        self.set_color(wr, Color::Black);
                        self.set_color(w, Color::Red);
                        self.rotate_left(w);
                        w = self.left(self.parent(x));
                    }
                    let p = self.parent(x);
                    self.set_color(w, self.color(p));
                    self.set_color(p, Color::Black);
                    let wl = self.left(w);
                    self.set_color(wl, Color::Black);
                    self.rotate_right(p);
                    x = self.root;
                }
            }
        }
        self.set_color(x, Color::Black);
    }

    /// Asserts the red-black properties, ordering and parent links; returns
    /// the tree's black-height.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> usize {
        fn walk<K, V, C: Comparator<K>>(
            t: &RbTree<K, V, C>,
            n: NodeKey,
            lo: Option<&K>,
            hi: Option<&K>,
            count: &mut usize,
        ) -> usize {
            if n == t.nil {
                return 0;
            }
            *count += 1;
            let key = &t.entries[n].0;
            if let Some(lo) = lo {
                assert_eq!(t.cmp.compare(lo, key), Ordering::Less, "order violated");
            }
            if let Some(hi) = hi {
                assert_eq!(t.cmp.compare(key, hi), Ordering::Less, "order violated");
            }
            for child in [t.left(n), t.right(n)] {
                if child != t.nil {
                    assert_eq!(t.parent(child), n, "broken parent link");
                }
                if t.color(n) == Color::Red {
                    assert_eq!(t.color(child), Color::Black, "red node with red child");
                }
            }
            let bl = walk(t, t.left(n), lo, Some(key), count);
            let br = walk(t, t.right(n), Some(key), hi, count);
            assert_eq!(bl, br, "unequal black-height");
            bl + usize::from(t.color(n) == Color::Black)
        }
        assert_eq!(self.color(self.nil), Color::Black, "sentinel must stay black");
        assert_eq!(self.color(self.root), Color::Black, "root must be black");
        if self.root != self.nil {
            assert_eq!(self.parent(self.root), self.nil);
        }
        let mut count = 0;
        let bh = walk(self, self.root, None, None, &mut count);
        assert_eq!(count, self.entries.len(), "size mismatch");
        assert_eq!(self.links.len(), self.entries.len() + 1, "leaked links");
        bh
    }
}

/// In-order iterator over an [`RbTree`], following parent links.
pub struct Iter<'a, K, V> {
    links: &'a SlotMap<NodeKey, Links>,
    entries: &'a SecondaryMap<NodeKey, (K, V)>,
    nil: NodeKey,
    next: NodeKey,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == self.nil {
            return None;
        }
        let cur = self.next;
        let links = self.links;
        self.next = if links[cur].right != self.nil {
            let mut n = links[cur].right;
            while links[n].left != self.nil {
                n = links[n].left;
            }
            n
        } else {
            let mut child = cur;
            let mut p = links[cur].parent;
            while p != self.nil && child == links[p].right {
                child = p;
                p = links[p].parent;
            }
            p
        };
        self.remaining -= 1;
        let entries = self.entries;
        let (k, v) = &entries[cur];
        Some((k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V, C> Container<K, V> for RbTree<K, V, C>
where
    C: Comparator<K>,
{
    type Iter<'a> = Iter<'a, K, V> where Self: 'a, K: 'a, V: 'a;

    fn insert(&mut self, key: K, value: V) -> bool {
        RbTree::insert(self, key, value)
    }
    fn search(&self, key: &K) -> Result<&V> {
        RbTree::search(self, key)
    }
    fn search_mut(&mut self, key: &K) -> Result<&mut V> {
        RbTree::search_mut(self, key)
    }
    fn contains(&self, key: &K) -> bool {
        RbTree::contains(self, key)
    }
    fn at(&mut self, key: &K, value: V) -> Result<()> {
        RbTree::at(self, key, value)
    }
    fn remove(&mut self, key: &K) -> bool {
        RbTree::remove(self, key)
    }
    fn clear(&mut self) {
        RbTree::clear(self)
    }
    fn len(&self) -> usize {
        RbTree::len(self)
    }
    fn iter(&self) -> Self::Iter<'_> {
        RbTree::iter(self)
    }
    fn comparisons(&self) -> u64 {
        RbTree::comparisons(self)
    }
    fn stats(&self) -> EngineStats {
        EngineStats::Tree {
            rotations: self.rotations(),
        }
    }
    fn name(&self) -> &'static str {
        "red-black tree"
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: Comparator<K>> fmt::Debug for RbTree<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_of(keys: &[i32]) -> RbTree<i32, i32> {
        let mut t = RbTree::new();
        for &k in keys {
            assert!(t.insert(k, k * 10));
            t.check_invariants();
        }
        t
    }

    fn node(t: &RbTree<i32, i32>, key: i32) -> NodeKey {
        t.find(&key).expect("key present")
    }

    #[test]
    fn new_nodes_start_red_and_root_is_black() {
        let t = tree_of(&[2, 1, 3]);
        assert_eq!(t.color(node(&t, 2)), Color::Black);
        assert_eq!(t.color(node(&t, 1)), Color::Red);
        assert_eq!(t.color(node(&t, 3)), Color::Red);
        assert_eq!(t.rotations(), 0);
    }

    #[test]
    fn red_uncle_recolors_without_rotation() {
        let t = tree_of(&[2, 1, 3, 4]);
        assert_eq!(t.rotations(), 0);
        assert_eq!(t.color(node(&t, 1)), Color::Black);
        assert_eq!(t.color(node(&t, 3)), Color::Black);
        assert_eq!(t.color(node(&t, 4)), Color::Red);
    }

    #[test]
    fn black_uncle_outer_and_inner_cases_rotate() {
        // Outer: one rotation at the grandparent.
        let t = tree_of(&[1, 2, 3]);
        assert_eq!(t.rotations(), 1);
        assert_eq!(t.root, node(&t, 2));

        // Inner: rotate the parent first, then the grandparent.
        let t = tree_of(&[3, 1, 2]);
        assert_eq!(t.rotations(), 2);
        assert_eq!(t.root, node(&t, 2));
    }

    #[test]
    fn removing_black_leaf_with_black_sibling_recolors_sibling() {
        // 2B(1B, 3B) after dropping the red 4.
        let mut t = tree_of(&[2, 1, 3, 4]);
        assert!(t.remove(&4));
        let bh_before = t.check_invariants();
        assert_eq!(bh_before, 2);
        let rotations = t.rotations();

        // 1 is black with two black (sentinel) children; its sibling 3 is
        // black with black children, so the fix-up recolors 3 red.
        assert!(t.remove(&1));
        assert_eq!(t.check_invariants(), 1);
        assert_eq!(t.color(node(&t, 3)), Color::Red);
        assert_eq!(t.color(node(&t, 2)), Color::Black);
        assert_eq!(t.rotations(), rotations);
    }

    #[test]
    fn removal_with_far_red_nephew_rotates_once() {
        let mut t = tree_of(&[2, 1, 3, 4]);
        let rotations = t.rotations();
        assert!(t.remove(&1));
        t.check_invariants();
        assert_eq!(t.rotations() - rotations, 1);
        assert_eq!(t.root, node(&t, 3));
    }

    #[test]
    fn removal_with_near_red_nephew_rotates_twice() {
        let mut t = tree_of(&[2, 1, 4, 3]);
        let rotations = t.rotations();
        assert!(t.remove(&1));
        t.check_invariants();
        assert_eq!(t.rotations() - rotations, 2);
        assert_eq!(t.root, node(&t, 3));
    }

    #[test]
    fn removal_with_red_sibling_rotates_then_recolors() {
        // 2B(1B, 4R(3B, 5B)) once the red 6 is gone.
        let mut t = tree_of(&[1, 2, 3, 4, 5, 6]);
        assert!(t.remove(&6));
        t.check_invariants();
        assert_eq!(t.color(node(&t, 4)), Color::Red);
        let rotations = t.rotations();

        assert!(t.remove(&1));
        t.check_invariants();
        assert_eq!(t.rotations() - rotations, 1);
        assert_eq!(t.root, node(&t, 4));
        assert_eq!(t.color(node(&t, 3)), Color::Red);
    }

    #[test]
    fn removing_node_with_two_children_moves_successor_payload() {
        let mut t = tree_of(&[50, 30, 70, 20, 40, 60, 80]);
        assert_eq!(t.remove_entry(&30), Some((30, 300)));
        t.check_invariants();
        assert_eq!(t.search(&40), Ok(&400));
        assert_eq!(t.remove_entry(&50), Some((50, 500)));
        t.check_invariants();
        let got: Vec<(i32, i32)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(got, vec![(20, 200), (40, 400), (60, 600), (70, 700), (80, 800)]);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut t = tree_of(&[1, 2, 3]);
        assert!(!t.remove(&9));
        assert_eq!(t.len(), 3);
        assert_eq!(t.remove_entry(&9), None);
    }

    #[test]
    fn not_found_and_at() {
        let mut t: RbTree<String, u32> = RbTree::new();
        t.insert("x".to_string(), 1);
        assert_eq!(t.search(&"y".to_string()), Err(Error::NotFound));
        assert_eq!(t.at(&"y".to_string(), 2), Err(Error::NotFound));
        t.at(&"x".to_string(), 9).unwrap();
        assert_eq!(t.search(&"x".to_string()), Ok(&9));
        assert!(!t.insert("x".to_string(), 100));
        assert_eq!(t.search(&"x".to_string()), Ok(&9));
    }

    #[test]
    fn churn_keeps_invariants() {
        let mut t = RbTree::new();
        let mut s: u64 = 11;
        for i in 0..3_000u32 {
            s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
            let k = (s >> 33) % 400;
            if s & 3 != 0 {
                t.insert(k, i);
            } else {
                t.remove(&k);
            }
            if i % 97 == 0 {
                t.check_invariants();
            }
        }
        t.check_invariants();
        // 2 * log2(n + 1) bound for red-black trees.
        assert!(t.height() <= 18, "height {} too large", t.height());
        while let Some(k) = t.iter().next().map(|(k, _)| *k) {
            assert!(t.remove(&k));
        }
        t.check_invariants();
        assert!(t.is_empty());
    }

    #[test]
    fn clear_resets_structure_but_not_counters() {
        let mut t = tree_of(&[5, 3, 8, 1, 4]);
        let (cmps, rots) = (t.comparisons(), t.rotations());
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.iter().next(), None);
        assert_eq!(t.height(), 0);
        t.check_invariants();
        assert_eq!(t.comparisons(), cmps);
        assert_eq!(t.rotations(), rots);
        assert!(t.insert(7, 70));
        t.check_invariants();
    }

    #[test]
    fn iteration_sorted_with_reverse_comparator() {
        let mut t = RbTree::with_comparator(|a: &i32, b: &i32| b.cmp(a));
        for k in [3, 9, 1, 7] {
            t.insert(k, ());
        }
        let got: Vec<i32> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(got, vec![9, 7, 3, 1]);
        assert_eq!(t.iter().len(), 4);
    }
}
