//! # File I/O
//!
//! Disk helpers shared by the config file and the field feedback log:
//! - **Atomic saves**: write to `.tmp`, fsync, rename over the target
//! - **File locking**: an OS lock (fs2) plus a `.lock` sidecar naming the
//!   holder, so a second collector appending to the same shared log gets a
//!   readable "locked by" message
//! - **Version validation**: semver check of stored schema versions
//!
//! ## Example
//!
//! ```rust,no_run
//! use elter_core::file_io::{append_locked, FileLock};
//! use std::path::Path;
//!
//! let log = Path::new("validation_data.txt");
//! append_locked(log, "collector@example.org", "Name: Ana\n").unwrap();
//!
//! // Or hold the lock across several writes
//! let lock = FileLock::acquire(log, "collector@example.org").unwrap();
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use semver::Version;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{ToolbarError, ToolbarResult};

/// Hours after which a lock left behind by a crashed process is ignored
const STALE_LOCK_HOURS: i64 = 24;

/// Sidecar metadata written to `<file>.lock`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub user_id: String,
    pub machine: String,
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: machine_name(),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }

    fn is_stale(&self) -> bool {
        if self.machine == machine_name() && !process_alive(self.pid) {
            return true;
        }
        (Utc::now() - self.locked_at).num_hours() > STALE_LOCK_HOURS
    }
}

fn machine_name() -> String {
    ["HOSTNAME", "HOST", "COMPUTERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Exclusive lock on a file, released on drop.
pub struct FileLock {
    path: PathBuf,
    lock_path: PathBuf,
    handle: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Take the lock or fail right away with [`ToolbarError::FileLocked`].
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> ToolbarResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if let Some(holder) = Self::check(path) {
            return Err(ToolbarError::file_locked(
                path.display().to_string(),
                format!("{} ({})", holder.user_id, holder.machine),
                holder.locked_at.to_rfc3339(),
            ));
        }

        // Not truncated until the OS lock is ours, so a loser never wipes
        // the holder's info
        let mut handle = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| io_error("create lock", &lock_path, e))?;

        let refused = || ToolbarError::file_locked(path.display().to_string(), "another process", "unknown");
        handle.try_lock_exclusive().map_err(|_| refused())?;

        // The previous holder may have unlinked the sidecar we opened
        if !is_current(&handle, &lock_path) {
            let _ = FileExt::unlock(&handle);
            return Err(refused());
        }

        let body = serde_json::to_string_pretty(&info)
            .map_err(|e| ToolbarError::serialization(e.to_string()))?;
        handle
            .set_len(0)
            .and_then(|_| handle.write_all(body.as_bytes()))
            .and_then(|_| handle.sync_all())
            .map_err(|e| io_error("write lock", &lock_path, e))?;

        Ok(FileLock {
            path: path.to_path_buf(),
            lock_path,
            handle,
            info,
        })
    }

    /// Current holder of a live lock, if any
    pub fn check(path: &Path) -> Option<LockInfo> {
        let lock_path = lock_path_for(path);
        let mut text = String::new();
        File::open(&lock_path).ok()?.read_to_string(&mut text).ok()?;
        let info: LockInfo = serde_json::from_str(&text).ok()?;
        if info.is_stale() {
            None
        } else {
            Some(info)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.handle);
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// Whether `lock_path` still names the file behind `handle`
#[cfg(unix)]
fn is_current(handle: &File, lock_path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (handle.metadata(), fs::metadata(lock_path)) {
        (Ok(open), Ok(named)) => open.dev() == named.dev() && open.ino() == named.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_current(_handle: &File, lock_path: &Path) -> bool {
    lock_path.exists()
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock_path = path.to_path_buf();
    let extension = path
        .extension()
        .map(|e| format!("{}.lock", e.to_string_lossy()))
        .unwrap_or_else(|| "lock".to_string());
    lock_path.set_extension(extension);
    lock_path
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let extension = path
        .extension()
        .map(|e| format!("{}.tmp", e.to_string_lossy()))
        .unwrap_or_else(|| "tmp".to_string());
    tmp.set_extension(extension);
    tmp
}

fn io_error(operation: &str, path: &Path, e: std::io::Error) -> ToolbarError {
    ToolbarError::file_error(operation, path.display().to_string(), e.to_string())
}

/// Serialize `value` as pretty JSON and replace `path` atomically.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> ToolbarResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ToolbarError::serialization(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error("create directory", parent, e))?;
    }

    let tmp_path = tmp_path_for(path);
    let mut tmp = File::create(&tmp_path).map_err(|e| io_error("create temp file", &tmp_path, e))?;
    tmp.write_all(json.as_bytes())
        .and_then(|_| tmp.sync_all())
        .map_err(|e| io_error("write temp file", &tmp_path, e))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_error("rename to final", path, e)
    })
}

/// Read and parse a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> ToolbarResult<T> {
    let text = fs::read_to_string(path).map_err(|e| io_error("read", path, e))?;
    serde_json::from_str(&text)
        .map_err(|e| ToolbarError::serialization(format!("Invalid JSON in {}: {}", path.display(), e)))
}

/// Append `text` to `path` while holding its [`FileLock`].
pub fn append_locked(path: &Path, user_id: &str, text: &str) -> ToolbarResult<()> {
    let _lock = FileLock::acquire(path, user_id)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| io_error("open for append", path, e))?;
    file.write_all(text.as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(|e| io_error("append", path, e))
}

/// A stored schema version is readable if its major matches and, while
/// still on 0.x, its minor is not newer than ours.
pub fn validate_version(file_version: &str, expected: &str) -> ToolbarResult<()> {
    let mismatch = || ToolbarError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: expected.to_string(),
    };

    let found = Version::parse(file_version).map_err(|_| mismatch())?;
    let current = Version::parse(expected).map_err(|_| mismatch())?;

    if found.major != current.major {
        return Err(mismatch());
    }
    if current.major == 0 && found.minor > current.minor {
        return Err(mismatch());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    fn temp_path(name: &str) -> PathBuf {
        temp_dir().join(format!("elter_file_io_{}_{}", std::process::id(), name))
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_lock_and_tmp_paths() {
        let path = Path::new("/data/validation_data.txt");
        assert_eq!(lock_path_for(path), Path::new("/data/validation_data.txt.lock"));
        assert_eq!(tmp_path_for(Path::new("elter.json")), Path::new("elter.json.tmp"));
    }

    #[test]
    fn test_save_and_load_json() {
        let path = temp_path("sample.json");
        let sample = Sample {
            name: "Doñana".to_string(),
            count: 3,
        };
        save_json(&sample, &path).unwrap();
        assert!(!tmp_path_for(&path).exists());

        let loaded: Sample = load_json(&path).unwrap();
        assert_eq!(loaded, sample);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file_is_file_error() {
        let err = load_json::<Sample>(&temp_path("missing.json")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_ERROR");
    }

    #[test]
    fn test_second_lock_is_refused() {
        let path = temp_path("locked.txt");
        let lock = FileLock::acquire(&path, "first@example.org").unwrap();
        assert_eq!(lock.info.user_id, "first@example.org");

        let err = FileLock::acquire(&path, "second@example.org").err().unwrap();
        assert_eq!(err.error_code(), "FILE_LOCKED");
        assert!(err.to_string().contains("first@example.org"));

        drop(lock);
        assert!(!lock_path_for(&path).exists());
        assert!(FileLock::acquire(&path, "second@example.org").is_ok());
    }

    #[test]
    fn test_refused_lock_leaves_holder_sidecar_alone() {
        let path = temp_path("held.txt");
        let lock = FileLock::acquire(&path, "first@example.org").unwrap();
        // Unreadable holder info gets past the sidecar check; the OS lock
        // must still refuse without touching the file
        fs::write(lock_path_for(&path), "held").unwrap();

        let err = FileLock::acquire(&path, "second@example.org").err().unwrap();
        assert_eq!(err.error_code(), "FILE_LOCKED");
        assert_eq!(fs::read_to_string(lock_path_for(&path)).unwrap(), "held");

        drop(lock);
        assert!(!lock_path_for(&path).exists());
    }

    #[test]
    fn test_lock_rewrites_leftover_sidecar() {
        let path = temp_path("leftover.txt");
        fs::write(lock_path_for(&path), "a much longer leftover from a crashed writer, not json").unwrap();

        let lock = FileLock::acquire(&path, "ana@example.org").unwrap();
        let text = fs::read_to_string(lock_path_for(&path)).unwrap();
        let info: LockInfo = serde_json::from_str(&text).unwrap();
        assert_eq!(info.user_id, "ana@example.org");
        drop(lock);
    }

    #[test]
    fn test_append_locked_appends() {
        let path = temp_path("append.txt");
        let _ = fs::remove_file(&path);
        append_locked(&path, "a", "one\n").unwrap();
        append_locked(&path, "b", "two\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version("0.1.0", "0.1.0").is_ok());
        assert!(validate_version("0.1.7", "0.1.0").is_ok());
        assert!(validate_version("0.0.9", "0.1.0").is_ok());
        assert!(validate_version("0.2.0", "0.1.0").is_err());
        assert!(validate_version("1.0.0", "0.1.0").is_err());
        assert!(validate_version("one", "0.1.0").is_err());
    }
}
