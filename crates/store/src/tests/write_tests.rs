use super::helpers::{data_file_size, open_tmp, record_size};
use crate::{Store, StoreError, StoreOptions};

// --------------------- Put & get ---------------------

#[test]
fn put_get_roundtrip() {
    let (_dir, store) = open_tmp();

    store.put(b"a", b"1").unwrap();
    assert_eq!(store.get(b"a").unwrap(), b"1");
    store.close().unwrap();
}

#[test]
fn last_write_wins() {
    let (_dir, store) = open_tmp();

    store.put(b"k", b"v1").unwrap();
    store.put(b"k", b"v2").unwrap();
    assert_eq!(store.get(b"k").unwrap(), b"v2");
}

#[test]
fn overwrites_keep_only_latest_visible() {
    let (_dir, store) = open_tmp();

    for i in 0..50u32 {
        store.put(b"k", format!("v{}", i).as_bytes()).unwrap();
    }
    assert_eq!(store.get(b"k").unwrap(), b"v49");
    assert_eq!(store.len(), 1);
}

#[test]
fn empty_value_is_storable() {
    let (_dir, store) = open_tmp();

    store.put(b"k", b"").unwrap();
    assert_eq!(store.get(b"k").unwrap(), b"");
    // get cannot tell an empty value from an absent key; contains_key can.
    assert!(store.contains_key(b"k"));
    assert!(!store.contains_key(b"missing"));
}

#[test]
fn every_put_appends_one_record() {
    let (dir, store) = open_tmp();

    store.put(b"a", b"11").unwrap();
    store.put(b"b", b"22").unwrap();
    store.put(b"a", b"33").unwrap(); // overwrite still appends

    let expected = record_size(b"a", b"11") + record_size(b"b", b"22") + record_size(b"a", b"33");
    assert_eq!(store.log_size().unwrap(), expected);
    assert_eq!(data_file_size(dir.path()), expected);
}

// --------------------- Empty-key inertia ---------------------

#[test]
fn empty_key_operations_are_noops() {
    let (_dir, store) = open_tmp();
    store.put(b"real", b"v").unwrap();
    let size_before = store.log_size().unwrap();

    store.put(b"", b"x").unwrap();
    assert_eq!(store.get(b"").unwrap(), b"");
    store.del(b"").unwrap();

    assert_eq!(store.log_size().unwrap(), size_before);
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(b"real").unwrap(), b"v");
}

// --------------------- Delete ---------------------

#[test]
fn del_hides_prior_put() {
    let (_dir, store) = open_tmp();

    store.put(b"k", b"v").unwrap();
    store.del(b"k").unwrap();
    assert_eq!(store.get(b"k").unwrap(), b"");
    assert!(!store.contains_key(b"k"));
    assert_eq!(store.len(), 0);
}

#[test]
fn del_is_idempotent() {
    let (_dir, store) = open_tmp();

    store.put(b"k", b"v").unwrap();
    store.del(b"k").unwrap();
    store.del(b"k").unwrap();
    assert_eq!(store.get(b"k").unwrap(), b"");
}

#[test]
fn del_missing_key_writes_nothing() {
    let (_dir, store) = open_tmp();
    store.put(b"other", b"v").unwrap();
    let size_before = store.log_size().unwrap();

    store.del(b"never-written").unwrap();
    assert_eq!(store.log_size().unwrap(), size_before);
}

#[test]
fn del_appends_a_tombstone() {
    let (_dir, store) = open_tmp();

    store.put(b"k", b"value").unwrap();
    let size_before = store.log_size().unwrap();
    store.del(b"k").unwrap();

    // A tombstone is a record with an empty value.
    assert_eq!(store.log_size().unwrap(), size_before + record_size(b"k", b""));
}

#[test]
fn put_after_del_revives_key() {
    let (_dir, store) = open_tmp();

    store.put(b"k", b"v1").unwrap();
    store.del(b"k").unwrap();
    store.put(b"k", b"v2").unwrap();
    assert_eq!(store.get(b"k").unwrap(), b"v2");
}

// --------------------- Close contract ---------------------

#[test]
fn double_close_is_invalid() {
    let (_dir, store) = open_tmp();
    store.close().unwrap();
    assert!(matches!(
        store.close(),
        Err(StoreError::InvalidDatabaseFile)
    ));
}

#[test]
fn operations_after_close_fail() {
    let (_dir, store) = open_tmp();
    store.put(b"k", b"v").unwrap();
    store.close().unwrap();

    assert!(matches!(
        store.put(b"k", b"v"),
        Err(StoreError::InvalidDatabaseFile)
    ));
    assert!(matches!(
        store.get(b"k"),
        Err(StoreError::InvalidDatabaseFile)
    ));
    assert!(matches!(
        store.del(b"k"),
        Err(StoreError::InvalidDatabaseFile)
    ));
    assert!(matches!(
        store.merge(),
        Err(StoreError::InvalidDatabaseFile)
    ));
    assert!(matches!(
        store.sync(),
        Err(StoreError::InvalidDatabaseFile)
    ));
    assert!(matches!(
        store.log_size(),
        Err(StoreError::InvalidDatabaseFile)
    ));
}

#[test]
fn empty_key_is_still_a_noop_after_close() {
    let (_dir, store) = open_tmp();
    store.close().unwrap();

    // The empty-key check comes before the open-file check.
    store.put(b"", b"x").unwrap();
    assert_eq!(store.get(b"").unwrap(), b"");
    store.del(b"").unwrap();
}

// --------------------- Durability knobs ---------------------

#[test]
fn sync_writes_option_roundtrips() {
    let dir = tempfile::tempdir().unwrap();
    let store =
        Store::open_with_options(dir.path(), StoreOptions { sync_writes: true }).unwrap();

    store.put(b"k", b"v").unwrap();
    store.del(b"k").unwrap();
    store.put(b"k", b"v2").unwrap();
    assert_eq!(store.get(b"k").unwrap(), b"v2");
}

#[test]
fn explicit_sync_does_not_error() {
    let (_dir, store) = open_tmp();
    store.put(b"k", b"v").unwrap();
    store.sync().unwrap();
}
