//! Persisted build-directory state: the
//! `meson-private`/`meson-info`/`meson-logs` layout, coredata
//! snapshotting, tracked-input-file hashing, and the reconfiguration
//! short-circuit ("did anything this run depends on actually change")
//! that decides whether a bare re-invocation needs to re-run the whole
//! interpreter.
//!
//! Grounded on `examples/jpmacdonald-apl/crates/apl-core/src/io/
//! artifacts.rs` (content-hash-keyed store) and `apl-core/src/paths.rs`
//! (fixed subdirectory layout under one root), generalized from a
//! package cache to a single build directory's persisted configure
//! state. All writes are staged to a temp file and atomically renamed
//! so no partial persisted state is ever written.

pub mod types;

pub use types::{CoreData, StateError};

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// The three fixed subdirectories under a build root.
#[derive(Debug, Clone)]
pub struct Layout {
    pub build_root: PathBuf,
}

impl Layout {
    pub fn new(build_root: impl Into<PathBuf>) -> Self {
        Self { build_root: build_root.into() }
    }

    pub fn private_dir(&self) -> PathBuf {
        self.build_root.join("meson-private")
    }

    pub fn info_dir(&self) -> PathBuf {
        self.build_root.join("meson-info")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.build_root.join("meson-logs")
    }

    pub fn coredata_path(&self) -> PathBuf {
        self.private_dir().join("coredata.json")
    }

    pub fn introspect_path(&self) -> PathBuf {
        self.info_dir().join("intro.json")
    }

    pub fn ensure_dirs(&self) -> Result<(), StateError> {
        for dir in [self.private_dir(), self.info_dir(), self.logs_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| StateError::Write(dir.display().to_string(), e.to_string()))?;
        }
        Ok(())
    }
}

/// SHA-256 content hash of a tracked input file (project DSL files,
/// toolchain descriptors, option declarations, `configure_file`
/// inputs), used as the reconfiguration fingerprint.
pub fn hash_file(path: &Path) -> Result<String, StateError> {
    let bytes = std::fs::read(path).map_err(|e| StateError::Read(path.display().to_string(), e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write `bytes` to `path` via a sibling temp file plus rename, so a
/// crash or cancellation never leaves a half-written file in place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StateError> {
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, bytes).map_err(|e| StateError::Write(tmp_path.display().to_string(), e.to_string()))?;
    std::fs::rename(&tmp_path, path).map_err(|e| StateError::Write(path.display().to_string(), e.to_string()))?;
    Ok(())
}

pub fn save_coredata(layout: &Layout, data: &CoreData) -> Result<(), StateError> {
    layout.ensure_dirs()?;
    let json = serde_json::to_vec_pretty(data)
        .map_err(|e| StateError::Write(layout.coredata_path().display().to_string(), e.to_string()))?;
    write_atomic(&layout.coredata_path(), &json)
}

/// `None` means no prior configuration exists at this build root (a
/// fresh `setup`, not a reconfigure).
pub fn load_coredata(layout: &Layout) -> Result<Option<CoreData>, StateError> {
    let path = layout.coredata_path();
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path).map_err(|e| StateError::Read(path.display().to_string(), e.to_string()))?;
    let data: CoreData =
        serde_json::from_str(&text).map_err(|e| StateError::Parse(path.display().to_string(), e.to_string()))?;
    Ok(Some(data))
}

pub fn write_introspection(layout: &Layout, snapshot: &serde_json::Value) -> Result<(), StateError> {
    layout.ensure_dirs()?;
    let json = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| StateError::Write(layout.introspect_path().display().to_string(), e.to_string()))?;
    write_atomic(&layout.introspect_path(), &json)
}

pub fn write_log(layout: &Layout, name: &str, content: &str) -> Result<(), StateError> {
    layout.ensure_dirs()?;
    let path = layout.logs_dir().join(name);
    std::fs::write(&path, content).map_err(|e| StateError::Write(path.display().to_string(), e.to_string()))
}

/// Recompute the hash of every tracked path and compare against the
/// previous run's coredata. Any changed hash, or any
/// explicit CLI option change, forces a full interpreter re-run;
/// otherwise the previous configuration is reused as-is.
pub fn needs_reconfigure(
    previous: &CoreData,
    tracked_paths: &[PathBuf],
    cli_options_changed: bool,
) -> Result<bool, StateError> {
    if cli_options_changed {
        return Ok(true);
    }
    if tracked_paths.len() != previous.tracked_file_hashes.len() {
        return Ok(true);
    }
    for path in tracked_paths {
        let key = path.display().to_string();
        let Some(prev_hash) = previous.tracked_file_hashes.get(&key) else {
            return Ok(true);
        };
        if &hash_file(path)? != prev_hash {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn hash_tracked_paths(tracked_paths: &[PathBuf]) -> Result<indexmap::IndexMap<String, String>, StateError> {
    let mut hashes = indexmap::IndexMap::new();
    for path in tracked_paths {
        hashes.insert(path.display().to_string(), hash_file(path)?);
    }
    Ok(hashes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let mut data = CoreData::new("demo", "1.0");
        data.options.insert("werror".to_string(), crate::options::OptionValue::Bool(true));
        save_coredata(&layout, &data).unwrap();

        let loaded = load_coredata(&layout).unwrap().unwrap();
        assert_eq!(loaded.project_name, "demo");
        assert_eq!(loaded.options.get("werror"), Some(&crate::options::OptionValue::Bool(true)));
    }

    #[test]
    fn missing_coredata_is_none() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        assert!(load_coredata(&layout).unwrap().is_none());
    }

    #[test]
    fn unchanged_tracked_files_skip_reconfigure() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("meson.build");
        std::fs::write(&file, "project('demo')").unwrap();

        let mut data = CoreData::new("demo", "1.0");
        data.tracked_file_hashes = hash_tracked_paths(&[file.clone()]).unwrap();

        assert!(!needs_reconfigure(&data, &[file], false).unwrap());
    }

    #[test]
    fn edited_tracked_file_forces_reconfigure() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("meson.build");
        std::fs::write(&file, "project('demo')").unwrap();

        let mut data = CoreData::new("demo", "1.0");
        data.tracked_file_hashes = hash_tracked_paths(&[file.clone()]).unwrap();

        std::fs::write(&file, "project('demo2')").unwrap();
        assert!(needs_reconfigure(&data, &[file], false).unwrap());
    }

    #[test]
    fn cli_option_change_always_forces_reconfigure() {
        let data = CoreData::new("demo", "1.0");
        assert!(needs_reconfigure(&data, &[], true).unwrap());
    }
}
