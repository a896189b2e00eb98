//! Tests for SortedSetStore
//!
//! These tests verify:
//! - ZADD counting and member moves
//! - Inclusive ZCOUNT / ZRANGE bounds and ordering
//! - NotFound on absent keys
//! - Concurrent ZADD on one key

use std::sync::Arc;
use std::thread;

use exokv::sorted_set::SortedSetStore;
use exokv::StoreError;

fn pairs(items: &[(&str, i64)]) -> Vec<(String, i64)> {
    items.iter().map(|(m, s)| (m.to_string(), *s)).collect()
}

// =============================================================================
// ZADD Tests
// =============================================================================

#[test]
fn test_zadd_counts_new_members() {
    let store = SortedSetStore::new();

    assert_eq!(store.zadd("z", pairs(&[("a", 1), ("b", 2)])).unwrap(), 2);
    assert_eq!(store.zadd("z", pairs(&[("a", 5), ("c", 3)])).unwrap(), 1);
    assert_eq!(store.zadd("z", pairs(&[("c", 3)])).unwrap(), 0);

    assert_eq!(store.zcard("z").unwrap(), 3);
}

#[test]
fn test_zadd_moves_member() {
    let store = SortedSetStore::new();

    store.zadd("k", pairs(&[("m", 1)])).unwrap();
    store.zadd("k", pairs(&[("m", 2)])).unwrap();

    assert_eq!(store.zcount("k", 1, 1).unwrap(), 0);
    assert_eq!(store.zcount("k", 2, 2).unwrap(), 1);
    assert_eq!(store.zcard("k").unwrap(), 1);
}

#[test]
fn test_zadd_same_member_twice_keeps_last_score() {
    let store = SortedSetStore::new();

    let added = store.zadd("k", pairs(&[("m", 1), ("m", 9)])).unwrap();

    assert_eq!(added, 1);
    assert_eq!(store.zrange("k", i64::MIN, i64::MAX).unwrap(), pairs(&[("m", 9)]));
}

#[test]
fn test_zadd_empty_is_invalid() {
    let store = SortedSetStore::new();

    let result = store.zadd("k", Vec::new());

    assert!(matches!(result, Err(StoreError::InvalidArgument(_))));
    assert!(store.is_empty());
}

// =============================================================================
// Range Tests
// =============================================================================

#[test]
fn test_zrange_inclusive_bounds() {
    let store = SortedSetStore::new();
    store
        .zadd("k", pairs(&[("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5)]))
        .unwrap();

    let range = store.zrange("k", 2, 4).unwrap();

    assert_eq!(range, pairs(&[("b", 2), ("c", 3), ("d", 4)]));
    assert_eq!(store.zcount("k", 2, 4).unwrap(), 3);
}

#[test]
fn test_zrange_orders_by_score_then_member() {
    let store = SortedSetStore::new();
    store
        .zadd("k", pairs(&[("zed", -1), ("bob", 7), ("amy", 7), ("cat", 0)]))
        .unwrap();

    let range = store.zrange("k", -10, 10).unwrap();

    assert_eq!(
        range,
        pairs(&[("zed", -1), ("cat", 0), ("amy", 7), ("bob", 7)])
    );
}

#[test]
fn test_zcount_negative_and_extreme_scores() {
    let store = SortedSetStore::new();
    store
        .zadd("k", pairs(&[("lo", i64::MIN), ("hi", i64::MAX), ("mid", 0)]))
        .unwrap();

    assert_eq!(store.zcount("k", i64::MIN, i64::MAX).unwrap(), 3);
    assert_eq!(store.zcount("k", i64::MIN, -1).unwrap(), 1);
    assert_eq!(store.zcount("k", 10, -10).unwrap(), 0);
}

#[test]
fn test_absent_key_is_not_found() {
    let store = SortedSetStore::new();

    assert!(matches!(store.zcard("none"), Err(StoreError::NotFound)));
    assert!(matches!(store.zcount("none", 0, 1), Err(StoreError::NotFound)));
    assert!(matches!(store.zrange("none", 0, 1), Err(StoreError::NotFound)));
}

#[test]
fn test_empty_range_on_existing_key() {
    let store = SortedSetStore::new();
    store.zadd("k", pairs(&[("a", 1)])).unwrap();

    assert!(store.zrange("k", 2, 3).unwrap().is_empty());
    assert_eq!(store.zcount("k", 2, 3).unwrap(), 0);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_zadd_one_key() {
    let store = Arc::new(SortedSetStore::new());

    let mut handles = vec![];

    for i in 0..8 {
        let store = Arc::clone(&store);
        let handle = thread::spawn(move || {
            let mut added = 0;
            for j in 0..50 {
                added += store
                    .zadd("board", vec![(format!("m{}_{}", i, j), j as i64)])
                    .unwrap();
            }
            added
        });
        handles.push(handle);
    }

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(total, 400);
    assert_eq!(store.zcard("board").unwrap(), 400);
    assert_eq!(store.zcount("board", 0, 0).unwrap(), 8);
}

#[test]
fn test_readers_during_writes() {
    let store = Arc::new(SortedSetStore::new());
    store.zadd("k", pairs(&[("seed", 0)])).unwrap();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for j in 1..=200 {
                store.zadd("k", vec![(format!("m{}", j), j)]).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..200 {
                    let card = store.zcard("k").unwrap();
                    let range = store.zrange("k", i64::MIN, i64::MAX).unwrap();
                    assert!(card >= 1);
                    assert!(!range.is_empty());
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(store.zcard("k").unwrap(), 201);
}
