//! Ordering strategies supplied to the engines at construction time.

use core::cmp::Ordering;

/// Total order over keys. Trees descend by it; hash engines sort their
/// iteration snapshot by it.
pub trait Comparator<K: ?Sized> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Orders keys by their `Ord` implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: ?Sized + Ord> Comparator<K> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Orders string keys ignoring case, so `"Apple" < "banana" < "Cherry"`.
///
/// Keys that differ only in case compare `Equal`; a tree keyed by this
/// comparator therefore treats them as the same entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaseInsensitive;

impl CaseInsensitive {
    fn fold(a: &str, b: &str) -> Ordering {
        let lhs = a.chars().flat_map(char::to_lowercase);
        let rhs = b.chars().flat_map(char::to_lowercase);
        lhs.cmp(rhs)
    }
}

impl Comparator<str> for CaseInsensitive {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        Self::fold(a, b)
    }
}

impl Comparator<String> for CaseInsensitive {
    fn compare(&self, a: &String, b: &String) -> Ordering {
        Self::fold(a, b)
    }
}

impl Comparator<&str> for CaseInsensitive {
    fn compare(&self, a: &&str, b: &&str) -> Ordering {
        Self::fold(a, b)
    }
}

impl<K: ?Sized, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}
