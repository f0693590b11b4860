//! Snapshot store error-message, atomic-write-safety, and init integration tests.

use assert_fs::prelude::*;
use chrono::Utc;
use cohorts_core::{store, NewGroup, StoreError};
use predicates::prelude::predicate;
use std::fs;

fn academic() -> NewGroup {
    NewGroup {
        idnumber: "academic".into(),
        name: "Academic".into(),
        description: "Auto populated Academic".into(),
    }
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_snapshot_returns_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = store::load_at(home.path()).unwrap_err();
    assert!(matches!(err, StoreError::SnapshotNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("snapshot not found"));
    assert!(err.to_string().contains("snapshot.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".cohorts/snapshot.yaml")
        .write_binary(b": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = store::load_at(home.path()).unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("snapshot.yaml"), "must contain file path, got: {msg}");
}

#[test]
fn load_wrong_type_yaml_returns_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".cohorts/snapshot.yaml")
        .write_str("- this is a list, not a mapping\n")
        .expect("write");

    let err = store::load_at(home.path()).unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn mid_write_crash_leaves_original_intact() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let mut snapshot = store::init_at(home.path()).expect("init");
    snapshot.cohorts.insert_group(academic(), Utc::now());
    store::save_at(home.path(), &snapshot).expect("save");

    let path = store::snapshot_path_at(home.path());
    let original_bytes = fs::read(&path).expect("read original");

    // Simulate crash: .tmp written but process died before rename
    let tmp = path.with_file_name("snapshot.yaml.tmp");
    fs::write(&tmp, b"CRASH - INCOMPLETE WRITE").expect("write crash tmp");

    let reloaded = store::load_at(home.path()).expect("load after crash");
    assert_eq!(reloaded.cohorts.groups.len(), 1);
    assert_eq!(original_bytes, fs::read(&path).expect("read after crash"));
}

#[test]
fn save_overwrites_stale_tmp_orphan() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    store::init_at(home.path()).expect("init");
    home.child(".cohorts/snapshot.yaml.tmp")
        .write_str("orphan")
        .expect("write orphan");

    let snapshot = store::load_at(home.path()).expect("load");
    store::save_at(home.path(), &snapshot).expect("save");
    home.child(".cohorts/snapshot.yaml.tmp")
        .assert(predicate::path::missing());
}

// ---------------------------------------------------------------------------
// 3. Init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_snapshot_with_private_mode() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let snapshot = store::init_at(home.path()).expect("init");
    assert_eq!(snapshot.version, store::SNAPSHOT_VERSION);

    home.child(".cohorts/snapshot.yaml")
        .assert(predicate::path::exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let path = store::snapshot_path_at(home.path());
        let mode = fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "expected 0600, got {mode:o}");
    }
}

#[test]
fn init_does_not_clobber_existing_snapshot() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let mut snapshot = store::init_at(home.path()).expect("first init");
    snapshot.cohorts.insert_group(academic(), Utc::now());
    store::save_at(home.path(), &snapshot).expect("save");

    let again = store::init_at(home.path()).expect("second init");
    assert_eq!(again.cohorts.groups.len(), 1);
    assert_eq!(again.cohorts.groups[0].idnumber, "academic");
}
