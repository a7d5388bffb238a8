//! Advisory OS-level file locks shared by every process on the host.
//!
//! Each `vlanctl`/`ifgroupctl` request runs in its own process, so the
//! in-memory locks of a [`ConfigStore`](crate::ConfigStore) only order
//! threads of one request. Anything read-modify-written across requests
//! (the configuration document, the pending change log) is ordered with
//! an `flock` taken through `fs2`.
//!
//! The lock belongs to the open file description: two handles opened on
//! the same path exclude each other even inside one process.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use ifcfg_common::{IfCfgError, IfCfgResult};
use tracing::{trace, warn};

/// An open file with an `flock` held until drop.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Blocks until `file` is locked exclusively.
    pub fn exclusive(file: File, path: impl Into<PathBuf>) -> IfCfgResult<Self> {
        let path = path.into();
        FileExt::lock_exclusive(&file).map_err(|e| IfCfgError::storage(&path, e))?;
        trace!(path = %path.display(), "Exclusive lock taken");
        Ok(Self { file, path })
    }

    /// Blocks until `file` is locked shared.
    pub fn shared(file: File, path: impl Into<PathBuf>) -> IfCfgResult<Self> {
        let path = path.into();
        FileExt::lock_shared(&file).map_err(|e| IfCfgError::storage(&path, e))?;
        trace!(path = %path.display(), "Shared lock taken");
        Ok(Self { file, path })
    }

    /// Creates (if needed) and exclusively locks a sidecar lock file.
    ///
    /// The lock file is never written and never removed.
    pub fn sidecar(path: &Path) -> IfCfgResult<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| IfCfgError::storage(dir, e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| IfCfgError::storage(path, e))?;
        Self::exclusive(file, path)
    }

    /// The locked file, for I/O while the lock is held.
    pub fn file(&self) -> &File {
        &self.file
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "Failed to release file lock");
        }
    }
}

/// `<path>.lock`, next to the file it guards.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}
