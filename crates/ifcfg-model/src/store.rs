//! File-backed configuration store.
//!
//! [`ConfigStore`] caches the committed document of one process. All
//! mutations go through a [`Transaction`], which holds two locks for the
//! duration of one request: the store's in-memory writer lock and an `flock`
//! on `<config>.lock` shared with every other process using the same file.
//! Under both locks the document is re-read from disk, so a transaction
//! always starts from the latest committed revision, whoever wrote it.
//!
//! Nothing becomes visible (in memory or on disk) until
//! [`Transaction::commit`] has written the whole document to a temporary
//! file, synced it and renamed it over the previous one.
//!
//! Readers take a [`ConfigStore::snapshot`] of the cached document. It is
//! refreshed whenever this store opens a transaction.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use ifcfg_common::{IfCfgError, IfCfgResult};
use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::{debug, info};

use crate::document::ConfigDocument;
use crate::lock::{sidecar_path, FileLock};

/// Shared, durable configuration document.
#[derive(Debug)]
pub struct ConfigStore {
    /// Persistence target; `None` keeps the document in memory only.
    path: Option<PathBuf>,
    document: RwLock<ConfigDocument>,
}

impl ConfigStore {
    /// Loads the document at `path`. A missing file yields an empty document
    /// that will be created on first commit.
    pub fn open(path: impl Into<PathBuf>) -> IfCfgResult<Self> {
        let path = path.into();
        let document = read_document(&path)?;
        debug!(revision = document.revision(), "Configuration loaded");
        Ok(Self {
            path: Some(path),
            document: RwLock::new(document),
        })
    }

    /// Creates a store that never touches the filesystem.
    pub fn in_memory(document: ConfigDocument) -> Self {
        Self {
            path: None,
            document: RwLock::new(document),
        }
    }

    /// Returns a copy of the committed document.
    pub fn snapshot(&self) -> ConfigDocument {
        self.document.read().clone()
    }

    /// Returns the committed revision.
    pub fn revision(&self) -> u64 {
        self.document.read().revision()
    }

    /// Opens a write transaction, blocking until no other one is active in
    /// this or any other process.
    pub fn transaction(&self) -> IfCfgResult<Transaction<'_>> {
        let mut guard = self.document.write();
        let file_lock = match self.path.as_deref() {
            Some(path) => {
                let lock = FileLock::sidecar(&sidecar_path(path))?;
                let latest = read_document(path)?;
                if latest.revision() != guard.revision() {
                    debug!(
                        cached = guard.revision(),
                        latest = latest.revision(),
                        "Configuration changed on disk, reloading"
                    );
                }
                *guard = latest;
                Some(lock)
            }
            None => None,
        };
        let working = guard.clone();
        Ok(Transaction {
            path: self.path.as_deref(),
            guard,
            working,
            _file_lock: file_lock,
        })
    }
}

/// Request-scoped write access to a [`ConfigStore`].
///
/// Dropping a transaction without committing discards its changes.
pub struct Transaction<'a> {
    path: Option<&'a Path>,
    guard: RwLockWriteGuard<'a, ConfigDocument>,
    working: ConfigDocument,
    /// Held for the lifetime of the transaction; `None` for in-memory stores.
    _file_lock: Option<FileLock>,
}

impl Transaction<'_> {
    /// The working copy, including uncommitted changes.
    pub fn document(&self) -> &ConfigDocument {
        &self.working
    }

    /// Mutable access to the working copy.
    pub fn document_mut(&mut self) -> &mut ConfigDocument {
        &mut self.working
    }

    /// Persists the working copy and publishes it as the new revision.
    ///
    /// On failure the committed document is unchanged and the working copy
    /// keeps its edits.
    pub fn commit(&mut self) -> IfCfgResult<u64> {
        let mut next = self.working.clone();
        next.bump_revision();
        if let Some(path) = self.path {
            write_atomic(path, &next)?;
        }
        let revision = next.revision();
        self.working = next.clone();
        *self.guard = next;
        info!(revision, "Configuration committed");
        Ok(revision)
    }
}

/// Reads the persisted document; a missing file is an empty document.
fn read_document(path: &Path) -> IfCfgResult<ConfigDocument> {
    match fs::read_to_string(path) {
        Ok(text) => ConfigDocument::parse(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "Configuration not found, starting empty");
            Ok(ConfigDocument::new())
        }
        Err(e) => Err(IfCfgError::storage(path, e)),
    }
}

/// Must be called with the sidecar lock held.
fn write_atomic(path: &Path, document: &ConfigDocument) -> IfCfgResult<()> {
    let content = document.to_pretty_json()?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| IfCfgError::storage(dir, e))?;
    }

    // readers of `path` only ever see a complete document
    let temp_path = path.with_extension("tmp");
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| IfCfgError::storage(&temp_path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| IfCfgError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| IfCfgError::storage(&temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| IfCfgError::storage(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifcfg_common::field_values;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::open(dir.path().join("config.json")).unwrap();
        assert_eq!(store.revision(), 0);
        assert!(store.snapshot().root().is_empty());
    }

    #[test]
    fn test_commit_persists_and_bumps_revision() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("config.json");
        let store = ConfigStore::open(&path).unwrap();

        let mut tx = store.transaction().unwrap();
        tx.document_mut()
            .insert_record("vlans.vlan", "a", &field_values! { "tag" => "10" })
            .unwrap();
        assert_eq!(tx.commit().unwrap(), 1);
        drop(tx);

        assert_eq!(store.revision(), 1);
        assert!(!path.with_extension("tmp").exists());
        assert!(sidecar_path(&path).exists());

        let reopened = ConfigStore::open(&path).unwrap();
        assert_eq!(reopened.revision(), 1);
        assert_eq!(
            reopened.snapshot().record("vlans.vlan", "a"),
            Some(field_values! { "tag" => "10" })
        );
    }

    #[test]
    fn test_dropped_transaction_changes_nothing() {
        let store = ConfigStore::in_memory(ConfigDocument::new());
        {
            let mut tx = store.transaction().unwrap();
            tx.document_mut().set_scalar("system.hostname", "fw").unwrap();
        }
        assert_eq!(store.revision(), 0);
        assert!(store.snapshot().scalar("system.hostname").is_none());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = ConfigStore::in_memory(ConfigDocument::new());
        let before = store.snapshot();
        let mut tx = store.transaction().unwrap();
        tx.document_mut().set_scalar("system.hostname", "fw").unwrap();
        tx.commit().unwrap();
        drop(tx);
        assert!(before.scalar("system.hostname").is_none());
        assert_eq!(
            store.snapshot().scalar("system.hostname").as_deref(),
            Some("fw")
        );
    }

    #[test]
    fn test_transaction_starts_from_other_handles_commit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let first = ConfigStore::open(&path).unwrap();
        let second = ConfigStore::open(&path).unwrap();

        let mut tx = first.transaction().unwrap();
        tx.document_mut().set_scalar("system.hostname", "fw").unwrap();
        tx.commit().unwrap();
        drop(tx);

        // cached copy is stale until the next transaction
        assert_eq!(second.revision(), 0);

        let mut tx = second.transaction().unwrap();
        assert_eq!(tx.document().scalar("system.hostname").as_deref(), Some("fw"));
        tx.document_mut().set_scalar("system.domain", "lan").unwrap();
        assert_eq!(tx.commit().unwrap(), 2);
        drop(tx);

        let on_disk = ConfigStore::open(&path).unwrap().snapshot();
        assert_eq!(on_disk.scalar("system.hostname").as_deref(), Some("fw"));
        assert_eq!(on_disk.scalar("system.domain").as_deref(), Some("lan"));
        assert_eq!(second.snapshot(), on_disk);
    }

    #[test]
    fn test_concurrent_handles_serialize_commits() {
        const HANDLES: usize = 4;
        const COMMITS: usize = 10;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let writers: Vec<_> = (0..HANDLES)
            .map(|h| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let store = ConfigStore::open(&path).unwrap();
                    for c in 0..COMMITS {
                        let mut tx = store.transaction().unwrap();
                        tx.document_mut()
                            .insert_record(
                                "vlans.vlan",
                                &format!("h{}-c{}", h, c),
                                &field_values! { "tag" => c + 1 },
                            )
                            .unwrap();
                        tx.commit().unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let on_disk = ConfigStore::open(&path).unwrap().snapshot();
        assert_eq!(on_disk.records("vlans.vlan").len(), HANDLES * COMMITS);
        assert_eq!(on_disk.revision(), (HANDLES * COMMITS) as u64);
    }

    #[test]
    fn test_open_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ConfigStore::open(&path),
            Err(IfCfgError::Document { .. })
        ));
    }
}
