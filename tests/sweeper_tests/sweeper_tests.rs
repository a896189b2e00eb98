//! Tests for the expiration sweeper
//!
//! These tests verify:
//! - Expired entries are evicted and reported exactly once
//! - Live entries survive
//! - A panicking hook does not stop the sweeper
//! - Start/stop lifecycle

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use exokv::sweeper::Eviction;
use exokv::{Config, Store, StoreError};
use parking_lot::Mutex;

// =============================================================================
// Helper Functions
// =============================================================================

fn store_with_interval(interval: Duration) -> Store {
    Store::new(Config::builder().sweep_interval(interval).build()).unwrap()
}

fn recording_hook(store: &Store) -> Arc<Mutex<Vec<Eviction>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store.set_eviction_hook(Some(Arc::new(move |eviction: &Eviction| {
        sink.lock().push(eviction.clone());
    })));
    seen
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// =============================================================================
// Manual Sweep Tests
// =============================================================================

#[test]
fn test_sweep_evicts_and_notifies_once() {
    let store = store_with_interval(Duration::from_secs(60));
    let seen = recording_hook(&store);

    store.set("k", "v", Some(Duration::from_millis(1))).unwrap();
    thread::sleep(Duration::from_millis(5));

    assert_eq!(store.sweep_expired(), 1);
    assert_eq!(store.sweep_expired(), 0);

    assert!(matches!(store.get("k"), Err(StoreError::NotFound)));
    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].key, "k");
    assert_eq!(seen[0].value, Bytes::from_static(b"v"));
    assert!(seen[0].expires_at.is_some());
}

#[test]
fn test_sweep_keeps_unexpired_entries() {
    let store = store_with_interval(Duration::from_secs(60));
    let seen = recording_hook(&store);

    store.set("forever", "a", None).unwrap();
    store.set("later", "b", Some(Duration::from_secs(3600))).unwrap();

    assert_eq!(store.sweep_expired(), 0);
    assert!(seen.lock().is_empty());
    assert_eq!(store.scalars().len(), 2);
}

#[test]
fn test_sweep_without_hook() {
    let store = store_with_interval(Duration::from_secs(60));
    store.set("k", "v", Some(Duration::from_millis(1))).unwrap();
    thread::sleep(Duration::from_millis(5));

    assert_eq!(store.sweep_expired(), 1);
    assert!(store.scalars().is_empty());
}

#[test]
fn test_sweep_ignores_sorted_sets() {
    let store = store_with_interval(Duration::from_secs(60));
    store.zadd("z", vec![("m".to_string(), 1)]).unwrap();

    assert_eq!(store.sweep_expired(), 0);
    assert_eq!(store.zcard("z").unwrap(), 1);
}

#[test]
fn test_panicking_hook_does_not_abort_sweep() {
    let store = store_with_interval(Duration::from_secs(60));
    let counter = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&counter);
    store.set_eviction_hook(Some(Arc::new(move |_: &Eviction| {
        *sink.lock() += 1;
        panic!("hook failure");
    })));

    for i in 0..3 {
        store
            .set(&format!("k{}", i), "v", Some(Duration::from_millis(1)))
            .unwrap();
    }
    thread::sleep(Duration::from_millis(5));

    assert_eq!(store.sweep_expired(), 3);
    assert_eq!(*counter.lock(), 3);
    assert!(store.scalars().is_empty());
}

// =============================================================================
// Background Sweeper Tests
// =============================================================================

#[test]
fn test_background_sweeper_evicts() {
    let store = store_with_interval(Duration::from_millis(10));
    let seen = recording_hook(&store);

    store.set("k", "v", Some(Duration::from_millis(5))).unwrap();
    store.set("stay", "v", None).unwrap();
    assert!(store.start_sweeper().unwrap());

    assert!(wait_until(Duration::from_secs(5), || !store.scalars().contains_key("k")));
    assert!(store.stop_sweeper());

    assert_eq!(seen.lock().len(), 1);
    assert_eq!(store.get("stay").unwrap(), Bytes::from_static(b"v"));
}

#[test]
fn test_hook_replaced_at_runtime() {
    let store = store_with_interval(Duration::from_millis(10));
    let first = recording_hook(&store);
    assert!(store.start_sweeper().unwrap());

    store.set("a", "1", Some(Duration::from_millis(1))).unwrap();
    assert!(wait_until(Duration::from_secs(5), || first.lock().len() == 1));

    let second = recording_hook(&store);
    store.set("b", "2", Some(Duration::from_millis(1))).unwrap();
    assert!(wait_until(Duration::from_secs(5), || second.lock().len() == 1));
    store.stop_sweeper();

    assert_eq!(first.lock().len(), 1);
    assert_eq!(second.lock()[0].key, "b");
}

#[test]
fn test_sweeper_lifecycle() {
    let store = store_with_interval(Duration::from_millis(10));

    assert!(!store.is_sweeper_running());
    assert!(!store.stop_sweeper());

    assert!(store.start_sweeper().unwrap());
    assert!(!store.start_sweeper().unwrap());
    assert!(store.is_sweeper_running());

    assert!(store.stop_sweeper());
    assert!(!store.is_sweeper_running());

    // Restartable after a stop
    assert!(store.start_sweeper().unwrap());
    assert!(store.stop_sweeper());
}

#[test]
fn test_shutdown_stops_sweeper_before_saving() {
    let temp = tempfile::TempDir::new().unwrap();
    let config = Config::builder()
        .sweep_interval(Duration::from_millis(10))
        .snapshot_path(temp.path().join("final.snapshot"))
        .build();
    let store = Store::new(config).unwrap();
    store.set("k", "v", None).unwrap();
    store.start_sweeper().unwrap();

    let stats = store.shutdown(true).unwrap().unwrap();

    assert!(!store.is_sweeper_running());
    assert_eq!(stats.scalars, 1);
    assert!(temp.path().join("final.snapshot").exists());
}
