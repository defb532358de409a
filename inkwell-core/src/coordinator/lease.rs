//! One coordinator per device
//!
//! A lease is held in two places: an in-process set of device ids, and a
//! lock file `<lock_dir>/<device>.lock` holding the owner's PID so a second
//! process is refused too. A lock file whose PID is gone is stale and gets
//! replaced.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};

use tracing::{debug, warn};

use super::error::CoordinatorError;

static ACTIVE: LazyLock<Mutex<HashSet<String>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

/// Exclusive right to coordinate one device; released on drop
#[derive(Debug)]
pub struct CoordinatorLease {
    device_id: String,
    path: PathBuf,
}

impl CoordinatorLease {
    pub fn acquire(device_id: &str, lock_dir: &Path) -> Result<Self, CoordinatorError> {
        let pid = std::process::id();
        {
            let mut active = ACTIVE.lock().unwrap_or_else(|e| e.into_inner());
            if !active.insert(device_id.to_string()) {
                return Err(CoordinatorError::AlreadyRunning {
                    device: device_id.to_string(),
                    pid,
                });
            }
        }

        let path = lock_path(lock_dir, device_id);
        match write_lock_file(&path, pid) {
            Ok(()) => {
                debug!(device = %device_id, path = %path.display(), "Coordinator lease acquired");
                Ok(Self {
                    device_id: device_id.to_string(),
                    path,
                })
            }
            Err(e) => {
                forget(device_id);
                Err(e)
            }
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CoordinatorLease {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %e, "Failed to remove lock file");
        }
        forget(&self.device_id);
    }
}

fn forget(device_id: &str) {
    ACTIVE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .remove(device_id);
}

/// Lock file path; path separators in the id are replaced
pub fn lock_path(lock_dir: &Path, device_id: &str) -> PathBuf {
    let safe: String = device_id
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    lock_dir.join(format!("{safe}.lock"))
}

/// PID recorded in a lock file, if any
pub fn read_lock_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn write_lock_file(path: &Path, pid: u32) -> Result<(), CoordinatorError> {
    let io_err = |source| CoordinatorError::LockIo {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    // Two tries: the second follows removal of a stale file
    for _ in 0..2 {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                writeln!(file, "{pid}").map_err(io_err)?;
                return Ok(());
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let device = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match read_lock_pid(path) {
                    Some(owner) if owner != pid && is_process_alive(owner) => {
                        return Err(CoordinatorError::AlreadyRunning { device, pid: owner });
                    }
                    owner => {
                        warn!(path = %path.display(), ?owner, "Replacing stale lock file");
                        match fs::remove_file(path) {
                            Ok(()) => {}
                            Err(e) if e.kind() == ErrorKind::NotFound => {}
                            Err(e) => return Err(io_err(e)),
                        }
                    }
                }
            }
            Err(e) => return Err(io_err(e)),
        }
    }

    Err(io_err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "lock file reappeared while replacing it",
    )))
}

/// Check whether a process exists
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: signal 0 performs the permission and existence checks only
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_acquire_writes_pid_and_drop_removes() {
        let dir = tempdir().unwrap();
        let lease = CoordinatorLease::acquire("lease-a", dir.path()).unwrap();

        assert_eq!(read_lock_pid(lease.path()), Some(std::process::id()));
        let path = lease.path().to_path_buf();
        drop(lease);
        assert!(!path.exists());
    }

    #[test]
    fn test_second_lease_in_process_is_refused() {
        let dir = tempdir().unwrap();
        let _lease = CoordinatorLease::acquire("lease-b", dir.path()).unwrap();

        let err = CoordinatorLease::acquire("lease-b", dir.path()).unwrap_err();
        assert!(matches!(err, CoordinatorError::AlreadyRunning { .. }));
    }

    #[test]
    fn test_lease_is_reusable_after_drop() {
        let dir = tempdir().unwrap();
        drop(CoordinatorLease::acquire("lease-c", dir.path()).unwrap());
        CoordinatorLease::acquire("lease-c", dir.path()).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_live_foreign_lock_is_refused() {
        let dir = tempdir().unwrap();
        // pid 1 always exists
        fs::write(lock_path(dir.path(), "lease-d"), "1\n").unwrap();

        let err = CoordinatorLease::acquire("lease-d", dir.path()).unwrap_err();
        assert!(matches!(err, CoordinatorError::AlreadyRunning { pid: 1, .. }));

        // the in-process claim was rolled back
        fs::remove_file(lock_path(dir.path(), "lease-d")).unwrap();
        CoordinatorLease::acquire("lease-d", dir.path()).unwrap();
    }

    #[test]
    fn test_stale_lock_is_replaced() {
        let dir = tempdir().unwrap();
        let path = lock_path(dir.path(), "lease-e");
        fs::write(&path, "999999999\n").unwrap();

        let lease = CoordinatorLease::acquire("lease-e", dir.path()).unwrap();
        assert_eq!(read_lock_pid(lease.path()), Some(std::process::id()));
    }

    #[test]
    fn test_garbage_lock_is_replaced() {
        let dir = tempdir().unwrap();
        fs::write(lock_path(dir.path(), "lease-f"), "not a pid").unwrap();
        CoordinatorLease::acquire("lease-f", dir.path()).unwrap();
    }

    #[test]
    fn test_lock_path_sanitizes_separators() {
        let path = lock_path(Path::new("/state"), "a/b");
        assert_eq!(path, PathBuf::from("/state/a_b.lock"));
    }

    #[cfg(unix)]
    #[test]
    fn test_current_process_is_alive() {
        assert!(is_process_alive(std::process::id()));
        assert!(!is_process_alive(999_999_999));
    }
}
