//! End-to-end scenarios over the public API: ordered and reversed fills,
//! permuted workloads, bulk build, replacement semantics and the
//! split-then-merge memory profile.

use blocktree::{BTree, Comparator, Cursor, HeapAllocator, U64Cmp};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

type Tree = BTree<U64Cmp>;

fn u64_tree() -> Tree {
    BTree::new(U64Cmp, HeapAllocator)
}

/// Multiplicative-congruential shuffle, deterministic across runs.
fn shuffled(n: u64, mut seed: u64) -> Vec<u64> {
    let mut values: Vec<u64> = (0..n).collect();
    for i in (1..values.len()).rev() {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let j = (seed >> 33) as usize % (i + 1);
        values.swap(i, j);
    }
    values
}

#[test]
fn ascending_insert_thousand() {
    let mut tree = u64_tree();
    for i in 0..1000u64 {
        assert!(tree.insert(i).unwrap().is_none());
    }

    assert_eq!(tree.len(), 1000);
    assert_eq!(tree.depth(), 2);
    assert_eq!(tree.find(&500), Some(500));
    let walked: Vec<u64> = tree.iter().collect();
    assert_eq!(walked, (0..1000).collect::<Vec<_>>());
    assert_eq!(tree.self_check(), 0);
}

#[test]
fn descending_insert_thousand() {
    let mut tree = u64_tree();
    for i in (0..1000u64).rev() {
        assert!(tree.insert(i).unwrap().is_none());
    }

    assert_eq!(tree.len(), 1000);
    assert_eq!(tree.depth(), 2);
    let walked: Vec<u64> = tree.iter().collect();
    assert_eq!(walked, (0..1000).collect::<Vec<_>>());
    assert_eq!(tree.self_check(), 0);
}

#[test]
fn permuted_insert_then_delete_evens() {
    let mut tree = u64_tree();
    for v in shuffled(10_000, 0xBAD5EED) {
        tree.insert(v).unwrap();
    }
    assert_eq!(tree.len(), 10_000);
    assert_eq!(tree.self_check(), 0);

    for v in (0..10_000u64).step_by(2) {
        assert!(tree.remove(&v), "missing {}", v);
    }

    assert_eq!(tree.len(), 5_000);
    let walked: Vec<u64> = tree.iter().collect();
    let expect: Vec<u64> = (1..10_000).step_by(2).collect();
    assert_eq!(walked, expect);
    assert_eq!(tree.self_check(), 0);
}

#[test]
fn build_from_even_numbers() {
    let mut tree = u64_tree();
    let input: Vec<u64> = (0..1000).map(|i| i * 2).collect();
    tree.build(&input).unwrap();

    assert_eq!(tree.len(), 1000);
    assert_eq!(tree.find(&1000), Some(1000));
    assert_eq!(tree.find(&1001), None);

    let (mut lb, exact) = tree.lower_bound(&999);
    assert!(!exact);
    assert_eq!(tree.cursor_get(&mut lb), Some(1000));

    let (mut ub, exact) = tree.upper_bound(&1000);
    assert!(exact);
    assert!(tree.cursor_prev(&mut ub));
    assert_eq!(tree.cursor_get(&mut ub), Some(1000));

    assert_eq!(tree.self_check(), 0);
}

// Element with identity beyond its ordering key, for replacement tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
struct Entry {
    key: u64,
    tag: u64,
}

struct EntryCmp;

impl Comparator for EntryCmp {
    type Elem = Entry;
    type Key = u64;

    fn cmp_elem(&self, a: &Entry, b: &Entry) -> std::cmp::Ordering {
        a.key.cmp(&b.key)
    }

    fn cmp_key(&self, elem: &Entry, key: &u64) -> std::cmp::Ordering {
        elem.key.cmp(key)
    }
}

#[test]
fn equal_key_insert_replaces_and_reports_the_old_element() {
    let mut tree: BTree<EntryCmp> = BTree::new(EntryCmp, HeapAllocator);
    for key in 0..100u64 {
        tree.insert(Entry { key, tag: 1 }).unwrap();
    }
    let size_before = tree.len();

    let replaced = tree.insert(Entry { key: 42, tag: 2 }).unwrap();

    assert_eq!(replaced, Some(Entry { key: 42, tag: 1 }));
    assert_eq!(tree.len(), size_before);
    assert_eq!(tree.find(&42), Some(Entry { key: 42, tag: 2 }));
    assert_eq!(tree.self_check(), 0);
}

#[test]
fn split_then_merge_memory_profile() {
    let mut tree = u64_tree();

    // Fill past several splits.
    for i in 0..2000u64 {
        tree.insert(i).unwrap();
        assert_eq!(tree.self_check(), 0);
    }
    let mem_full = tree.mem_used();
    assert!(mem_full > 0);

    // Drain to force merges; reclaimed blocks stay in the garbage list, so
    // memory holds at the high-water mark.
    for i in 0..2000u64 {
        assert!(tree.remove(&i));
        assert_eq!(tree.self_check(), 0);
    }

    assert!(tree.is_empty());
    assert_eq!(tree.mem_used(), mem_full);

    // The retained memory is reused by the next fill.
    for i in 0..2000u64 {
        tree.insert(i).unwrap();
    }
    assert_eq!(tree.mem_used(), mem_full);
    assert_eq!(tree.self_check(), 0);
}

// -- algebraic laws ---------------------------------------------------------

#[test]
fn insert_then_find_law() {
    let mut tree = u64_tree();
    for v in shuffled(2000, 7) {
        tree.insert(v).unwrap();
        assert_eq!(tree.find(&v), Some(v));
    }
}

#[test]
fn delete_then_find_law() {
    let mut tree = u64_tree();
    for i in 0..2000u64 {
        tree.insert(i).unwrap();
    }

    for v in shuffled(2000, 99) {
        let before = tree.len();
        assert!(tree.remove(&v));
        assert_eq!(tree.find(&v), None);
        assert_eq!(tree.len(), before - 1);

        // Removing again is a no-op.
        assert!(!tree.remove(&v));
        assert_eq!(tree.len(), before - 1);
    }
}

#[test]
fn build_equals_repeated_insert() {
    let input: Vec<u64> = (0..7000).map(|i| i * 3).collect();

    let mut built: Tree = u64_tree();
    built.build(&input).unwrap();
    let mut inserted = u64_tree();
    for &v in &input {
        inserted.insert(v).unwrap();
    }

    assert_eq!(built.len(), inserted.len());
    let a: Vec<u64> = built.iter().collect();
    let b: Vec<u64> = inserted.iter().collect();
    assert_eq!(a, b);
    assert_eq!(built.self_check(), 0);
    assert_eq!(inserted.self_check(), 0);
}

#[test]
fn iterator_round_trip_visits_exactly_len_elements() {
    let mut tree = u64_tree();
    for v in shuffled(5000, 3) {
        tree.insert(v).unwrap();
    }

    let walked: Vec<u64> = tree.iter().collect();

    assert_eq!(walked.len(), tree.len());
    assert!(walked.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn bound_laws_on_a_sparse_key_space() {
    let mut tree = u64_tree();
    for i in 0..1000u64 {
        tree.insert(i * 10).unwrap();
    }

    for k in [0u64, 1, 9, 10, 11, 4995, 9985, 9990, 9991] {
        let (mut lb, exact) = tree.lower_bound(&k);
        assert_eq!(exact, k % 10 == 0 && k <= 9990);
        match tree.cursor_get(&mut lb) {
            Some(at) => {
                assert!(at >= k);
                // Everything before the bound is smaller.
                let mut prev = lb;
                if tree.cursor_prev(&mut prev) {
                    assert!(tree.cursor_get(&mut prev).unwrap() < k);
                }
            }
            None => assert!(k > 9990),
        }

        let (mut ub, _) = tree.upper_bound(&k);
        match tree.cursor_get(&mut ub) {
            Some(at) => {
                assert!(at > k);
                let mut prev = ub;
                if tree.cursor_prev(&mut prev) {
                    assert!(tree.cursor_get(&mut prev).unwrap() <= k);
                }
            }
            None => assert!(k >= 9990),
        }
    }
}

#[test]
fn random_sampling_stays_in_range() {
    let mut tree = u64_tree();
    for i in 0..5000u64 {
        tree.insert(i).unwrap();
    }

    let mut seed = 0x5EEDu64;
    for _ in 0..1000 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let sampled = tree.random(seed).unwrap();
        assert!(sampled < 5000);
        assert_eq!(tree.find(&sampled), Some(sampled));
    }
}

#[test]
fn cursor_round_trip_through_invalid() {
    let mut tree = u64_tree();
    for i in 0..100u64 {
        tree.insert(i).unwrap();
    }

    // Walk off the right end, then continue backwards from the rewind.
    let mut cursor: Cursor = tree.cursor_last();
    assert!(!tree.cursor_next(&mut cursor));
    assert!(tree.cursor_prev(&mut cursor));
    assert_eq!(tree.cursor_get(&mut cursor), Some(99));
}
