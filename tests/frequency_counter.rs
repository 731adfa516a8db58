use dict_engines::{
    AvlTree, CaseInsensitive, ChainedHashTable, Container, Error, FrequencyCounter, OpenHashTable,
    RbTree,
};

const TEXT: &str = "the quick brown fox jumps over the lazy dog the end";

fn words() -> impl Iterator<Item = String> {
    TEXT.split_whitespace().map(str::to_string)
}

fn counts<M: Container<String, u64>>(f: &FrequencyCounter<String, M>) -> Vec<(String, u64)> {
    f.iter().map(|(k, n)| (k.clone(), *n)).collect()
}

#[test]
fn engines_agree_on_word_counts() {
    let mut avl = FrequencyCounter::new(AvlTree::<String, u64>::new());
    let mut rb = FrequencyCounter::new(RbTree::<String, u64>::new());
    let mut chained = FrequencyCounter::new(ChainedHashTable::<String, u64>::new());
    let mut open = FrequencyCounter::new(OpenHashTable::<String, u64>::new());
    avl.add_all(words());
    rb.add_all(words());
    chained.add_all(words());
    open.add_all(words());

    let expected = counts(&avl);
    assert_eq!(expected.len(), 9);
    assert_eq!(expected[0], ("brown".to_string(), 1));
    assert_eq!(avl.frequency(&"the".to_string()), Ok(3));
    assert_eq!(counts(&rb), expected);
    assert_eq!(counts(&chained), expected);
    assert_eq!(counts(&open), expected);
}

#[test]
fn case_insensitive_engine_folds_keys() {
    let mut f = FrequencyCounter::new(RbTree::<String, u64, _>::with_comparator(CaseInsensitive));
    f.add_all(["Apple", "apple", "APPLE", "banana"].map(String::from));
    // The first spelling seen is the one stored.
    let got = counts(&f);
    assert_eq!(got, vec![("Apple".to_string(), 3), ("banana".to_string(), 1)]);
    assert!(f.contains(&"aPpLe".to_string()));
}

#[test]
fn counter_edits_and_errors() {
    let mut f: FrequencyCounter<String, _> = FrequencyCounter::default();
    let _: &OpenHashTable<String, u64> = f.inner();
    let x = "x".to_string();
    assert_eq!(f.frequency(&x), Err(Error::NotFound));
    assert_eq!(f.set(&x, 4), Err(Error::NotFound));
    assert_eq!(f.add(x.clone()), 1);
    f.set(&x, 41).unwrap();
    assert_eq!(f.add(x.clone()), 42);
    assert!(f.remove(&x));
    assert!(!f.remove(&x));
    assert!(f.is_empty());
}

#[test]
fn metrics_pass_through() {
    let mut f = FrequencyCounter::new(AvlTree::<String, u64>::new());
    assert_eq!(f.comparisons(), 0);
    f.add_all(words());
    assert!(f.comparisons() > 0);
    assert_eq!(f.comparisons(), f.inner().comparisons());
    assert_eq!(f.stats().rotations(), Some(f.inner().rotations()));
    assert_eq!(f.name(), "AVL tree");
    let before = f.comparisons();
    f.clear();
    assert_eq!(f.len(), 0);
    assert_eq!(f.comparisons(), before);
}
