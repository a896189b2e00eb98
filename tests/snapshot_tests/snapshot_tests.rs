//! Tests for snapshot save/load
//!
//! These tests verify:
//! - Save/load restores keys, values, expirations and sorted sets
//! - Distant expirations survive unchanged
//! - Load replaces rather than merges
//! - Deterministic encoding
//! - Corrupt, truncated and missing files leave the store unchanged

use std::fs;
use std::time::Duration;

use bytes::Bytes;
use exokv::snapshot::{self, BucketRecord, ScalarRecord, SnapshotImage, SortedSetRecord};
use exokv::{Config, Store, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .snapshot_path(temp_dir.path().join("exokv.snapshot"))
        .build();
    let store = Store::new(config).unwrap();
    (temp_dir, store)
}

fn populate(store: &Store) {
    store.set("plain", "value", None).unwrap();
    store.set("expiring", "soon", Some(Duration::from_secs(600))).unwrap();
    store.set("binary", vec![0u8, 1, 2, 255], None).unwrap();
    store.set_bit("bits", 13, 1, None).unwrap();
    store
        .zadd(
            "board",
            vec![("alice".to_string(), 10), ("bob".to_string(), 20), ("carol".to_string(), 10)],
        )
        .unwrap();
    store.zadd("single", vec![("only".to_string(), -4)]).unwrap();
}

// =============================================================================
// Round-Trip Tests
// =============================================================================

#[test]
fn test_save_load_restores_state() {
    let (temp, source) = setup_temp_store();
    populate(&source);
    let expiring_ttl = source.ttl("expiring").unwrap();

    let path = temp.path().join("state.snapshot");
    let saved = source.save(&path).unwrap();

    let (_temp2, target) = setup_temp_store();
    let loaded = target.load(&path).unwrap();

    assert_eq!(saved.scalars, 4);
    assert_eq!(saved.sorted_sets, 2);
    assert_eq!(saved, loaded);

    assert_eq!(target.scalars().keys(), source.scalars().keys());
    assert_eq!(target.sorted_sets().keys(), source.sorted_sets().keys());
    assert_eq!(target.get("plain").unwrap(), Bytes::from_static(b"value"));
    assert_eq!(target.get("binary").unwrap().as_ref(), &[0u8, 1, 2, 255]);
    assert_eq!(target.get_bit("bits", 13).unwrap(), 1);
    assert_eq!(target.ttl("plain").unwrap(), None);

    // Absolute expiration survives, so the remaining TTL can only shrink
    let restored_ttl = target.ttl("expiring").unwrap().unwrap();
    assert!(restored_ttl <= expiring_ttl.unwrap());
    assert!(restored_ttl > Duration::from_secs(500));

    assert_eq!(
        target.zrange("board", i64::MIN, i64::MAX).unwrap(),
        source.zrange("board", i64::MIN, i64::MAX).unwrap()
    );
    assert_eq!(target.zcount("single", -4, -4).unwrap(), 1);
}

#[test]
fn test_distant_expirations_round_trip() {
    const YEAR: u64 = 365 * 24 * 3600;
    let (temp, source) = setup_temp_store();
    source.set("centuries", "v", Some(Duration::from_secs(300 * YEAR))).unwrap();
    source.set("century", "v", Some(Duration::from_secs(100 * YEAR))).unwrap();
    let century_ttl = source.ttl("century").unwrap().unwrap();

    let path = temp.path().join("distant.snapshot");
    source.save(&path).unwrap();
    let (_temp2, target) = setup_temp_store();
    target.load(&path).unwrap();

    // Past the encodable range the key never expires, before and after
    assert_eq!(source.ttl("centuries").unwrap(), None);
    assert_eq!(target.ttl("centuries").unwrap(), None);

    let restored = target.ttl("century").unwrap().unwrap();
    assert!(restored <= century_ttl);
    assert!(century_ttl - restored < Duration::from_secs(5));
}

#[test]
fn test_load_replaces_existing_state() {
    let (temp, store) = setup_temp_store();
    store.set("kept", "1", None).unwrap();
    let path = temp.path().join("a.snapshot");
    store.save(&path).unwrap();

    store.set("added_later", "2", None).unwrap();
    store.zadd("z", vec![("m".to_string(), 1)]).unwrap();
    store.load(&path).unwrap();

    assert_eq!(store.scalars().keys(), vec!["kept"]);
    assert!(store.sorted_sets().is_empty());
}

#[test]
fn test_encoding_is_deterministic() {
    let (temp, first) = setup_temp_store();
    populate(&first);
    let (_temp2, second) = setup_temp_store();
    // Same logical state, inserted in a different order
    second.zadd("single", vec![("only".to_string(), -4)]).unwrap();
    second
        .zadd(
            "board",
            vec![("carol".to_string(), 10), ("bob".to_string(), 20), ("alice".to_string(), 10)],
        )
        .unwrap();
    second.set_bit("bits", 13, 1, None).unwrap();
    second.set("binary", vec![0u8, 1, 2, 255], None).unwrap();
    second.set("plain", "value", None).unwrap();

    // Expirations differ by creation time, so compare without that key
    first.delete("expiring");

    let a = temp.path().join("a.snapshot");
    let b = temp.path().join("b.snapshot");
    first.save(&a).unwrap();
    second.save(&b).unwrap();

    assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
}

#[test]
fn test_empty_store_round_trip() {
    let (temp, store) = setup_temp_store();
    let path = temp.path().join("empty.snapshot");

    let stats = store.save(&path).unwrap();
    store.load(&path).unwrap();

    assert_eq!(stats.bytes, 16);
    assert!(store.is_empty());
}

#[test]
fn test_configured_snapshot_path() {
    let (temp, store) = setup_temp_store();
    store.set("k", "v", None).unwrap();

    store.save_snapshot().unwrap();
    store.delete("k");
    store.load_snapshot().unwrap();

    assert!(temp.path().join("exokv.snapshot").exists());
    assert_eq!(store.get("k").unwrap(), Bytes::from_static(b"v"));
}

// =============================================================================
// Failure Tests
// =============================================================================

fn assert_unchanged(store: &Store) {
    assert_eq!(store.get("plain").unwrap(), Bytes::from_static(b"value"));
    assert_eq!(store.zcard("board").unwrap(), 3);
    assert_eq!(store.len(), 6);
}

#[test]
fn test_truncated_snapshot_leaves_store_unchanged() {
    let (temp, store) = setup_temp_store();
    populate(&store);
    let path = temp.path().join("t.snapshot");
    store.save(&path).unwrap();

    let data = fs::read(&path).unwrap();
    fs::write(&path, &data[..data.len() - 3]).unwrap();

    assert!(matches!(store.load(&path), Err(StoreError::Codec(_))));
    assert_unchanged(&store);
}

#[test]
fn test_garbage_snapshot_leaves_store_unchanged() {
    let (temp, store) = setup_temp_store();
    populate(&store);
    let path = temp.path().join("garbage.snapshot");
    fs::write(&path, b"this is not a snapshot at all").unwrap();

    assert!(store.load(&path).is_err());
    assert_unchanged(&store);
}

#[test]
fn test_trailing_bytes_rejected() {
    let (temp, store) = setup_temp_store();
    populate(&store);
    let path = temp.path().join("trail.snapshot");
    store.save(&path).unwrap();

    let mut data = fs::read(&path).unwrap();
    data.push(0);
    fs::write(&path, data).unwrap();

    assert!(matches!(store.load(&path), Err(StoreError::Codec(_))));
    assert_unchanged(&store);
}

#[test]
fn test_missing_file_is_io_error() {
    let (temp, store) = setup_temp_store();
    populate(&store);

    let result = store.load(temp.path().join("does-not-exist"));

    assert!(matches!(result, Err(StoreError::Io(_))));
    assert_unchanged(&store);
}

fn write_image(temp: &TempDir, name: &str, image: &SnapshotImage) -> std::path::PathBuf {
    let path = temp.path().join(name);
    fs::write(&path, snapshot::encode(image).unwrap()).unwrap();
    path
}

#[test]
fn test_negative_expiration_rejected() {
    let (temp, store) = setup_temp_store();
    populate(&store);
    let image = SnapshotImage {
        scalars: vec![ScalarRecord {
            key: "k".into(),
            value: Bytes::from_static(b"v"),
            expires_at_nanos: -1,
        }],
        sorted_sets: Vec::new(),
    };
    let path = write_image(&temp, "neg.snapshot", &image);

    assert!(matches!(store.load(&path), Err(StoreError::Codec(_))));
    assert_unchanged(&store);
}

#[test]
fn test_member_in_two_buckets_rejected() {
    let (temp, store) = setup_temp_store();
    populate(&store);
    let image = SnapshotImage {
        scalars: Vec::new(),
        sorted_sets: vec![SortedSetRecord {
            key: "z".into(),
            buckets: vec![
                BucketRecord {
                    score: 1,
                    members: vec!["m".into()],
                },
                BucketRecord {
                    score: 2,
                    members: vec!["m".into()],
                },
            ],
        }],
    };
    let path = write_image(&temp, "dup.snapshot", &image);

    assert!(matches!(store.load(&path), Err(StoreError::Codec(_))));
    assert_unchanged(&store);
}

#[test]
fn test_invalid_utf8_key_rejected() {
    let (temp, store) = setup_temp_store();
    populate(&store);

    let mut data = Vec::new();
    data.extend_from_slice(&1u64.to_le_bytes());
    data.extend_from_slice(&2u64.to_le_bytes());
    data.extend_from_slice(&[0xC3, 0x28]);
    data.extend_from_slice(&0u64.to_le_bytes());
    data.extend_from_slice(&0i64.to_le_bytes());
    data.extend_from_slice(&0u64.to_le_bytes());
    let path = temp.path().join("utf8.snapshot");
    fs::write(&path, data).unwrap();

    assert!(matches!(store.load(&path), Err(StoreError::Codec(_))));
    assert_unchanged(&store);
}
