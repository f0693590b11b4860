//! YAML snapshot of the host's directory and cohort tables.
//!
//! # Storage layout
//!
//! ```text
//! ~/.cohorts/
//!   config.yaml     (settings: mode 0600, optional)
//!   snapshot.yaml   (people, courses, enrolments, groups, members: mode 0600)
//! ```
//!
//! # API pattern
//!
//! Every filesystem function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::types::Snapshot;

/// Current on-disk snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.cohorts/`
///
/// Creates the directory (mode `0700`) if it does not yet exist.
pub fn cohorts_dir_at(home: &Path) -> Result<PathBuf, StoreError> {
    let dir = home.join(".cohorts");
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

/// `<home>/.cohorts/snapshot.yaml`: pure, no I/O.
pub fn snapshot_path_at(home: &Path) -> PathBuf {
    home.join(".cohorts").join("snapshot.yaml")
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load the snapshot from `<home>/.cohorts/snapshot.yaml`.
///
/// Returns `StoreError::SnapshotNotFound` if absent,
/// `StoreError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<Snapshot, StoreError> {
    let path = snapshot_path_at(home);
    if !path.exists() {
        return Err(StoreError::SnapshotNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Snapshot, StoreError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the snapshot.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    cohorts_dir_at(home)?;
    let yaml = serde_yaml::to_string(snapshot)?;
    write_atomic(&snapshot_path_at(home), &yaml)
}

/// `save_at` convenience wrapper.
pub fn save(snapshot: &Snapshot) -> Result<(), StoreError> {
    save_at(&home()?, snapshot)
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Create an empty snapshot if none exists.
///
/// Idempotent: an existing snapshot is loaded and returned unchanged.
pub fn init_at(home: &Path) -> Result<Snapshot, StoreError> {
    if snapshot_path_at(home).exists() {
        return load_at(home);
    }
    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        ..Default::default()
    };
    save_at(home, &snapshot)?;
    Ok(snapshot)
}

/// `init_at` convenience wrapper.
pub fn init() -> Result<Snapshot, StoreError> {
    init_at(&home()?)
}

// ---------------------------------------------------------------------------
// Crate helpers
// ---------------------------------------------------------------------------

pub(crate) fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

/// Write `contents` to a `.tmp` sibling of `path`, then rename over it.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));
    std::fs::write(&tmp_path, contents)?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
