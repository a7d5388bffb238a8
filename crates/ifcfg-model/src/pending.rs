//! Durable log of retired interface names awaiting reconfiguration.
//!
//! The log is a newline-delimited text file. Any number of requests may
//! append concurrently; each append writes one complete line while holding
//! an OS-level exclusive lock on the file. The reconfiguration step consumes
//! the log with [`PendingChangeLog::drain`], which reads and truncates it
//! under the same lock so no append is lost between the two.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use ifcfg_common::{IfCfgError, IfCfgResult};
use tracing::debug;

use crate::lock::FileLock;

/// Append-only queue of retired identifiers.
#[derive(Debug, Clone)]
pub struct PendingChangeLog {
    path: PathBuf,
}

impl PendingChangeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one identifier as a single line.
    pub fn append(&self, value: &str) -> IfCfgResult<()> {
        if value.is_empty() || value.contains(['\n', '\r']) {
            return Err(IfCfgError::invalid_config(
                "pending",
                format!("not a single-line identifier: {:?}", value),
            ));
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| IfCfgError::storage(&self.path, e))?;

        let lock = FileLock::exclusive(file, &self.path)?;
        let line = format!("{}\n", value);
        lock.file()
            .write_all(line.as_bytes())
            .map_err(|e| IfCfgError::storage(&self.path, e))?;
        lock.file()
            .sync_data()
            .map_err(|e| IfCfgError::storage(&self.path, e))?;

        debug!(path = %self.path.display(), value, "Recorded pending removal");
        Ok(())
    }

    /// Lists pending identifiers without consuming them.
    pub fn entries(&self) -> IfCfgResult<Vec<String>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(IfCfgError::storage(&self.path, e)),
        };
        let lock = FileLock::shared(file, &self.path)?;
        let mut content = String::new();
        lock.file()
            .read_to_string(&mut content)
            .map_err(|e| IfCfgError::storage(&self.path, e))?;
        Ok(parse_lines(&content))
    }

    /// Returns all pending identifiers and empties the log.
    pub fn drain(&self) -> IfCfgResult<Vec<String>> {
        let file = match OpenOptions::new().read(true).write(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(IfCfgError::storage(&self.path, e)),
        };
        let lock = FileLock::exclusive(file, &self.path)?;
        let mut content = String::new();
        lock.file()
            .read_to_string(&mut content)
            .map_err(|e| IfCfgError::storage(&self.path, e))?;
        lock.file()
            .set_len(0)
            .map_err(|e| IfCfgError::storage(&self.path, e))?;
        lock.file()
            .sync_data()
            .map_err(|e| IfCfgError::storage(&self.path, e))?;

        let entries = parse_lines(&content);
        debug!(path = %self.path.display(), count = entries.len(), "Drained pending removals");
        Ok(entries)
    }
}

fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_entries() {
        let dir = TempDir::new().unwrap();
        let log = PendingChangeLog::new(dir.path().join(".vlans.removed"));

        assert!(log.entries().unwrap().is_empty());
        log.append("em0_vlan10").unwrap();
        log.append("em0_vlan20").unwrap();

        assert_eq!(log.entries().unwrap(), vec!["em0_vlan10", "em0_vlan20"]);
        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw, "em0_vlan10\nem0_vlan20\n");
    }

    #[test]
    fn test_append_rejects_multiline_and_empty() {
        let dir = TempDir::new().unwrap();
        let log = PendingChangeLog::new(dir.path().join("log"));
        assert!(log.append("").is_err());
        assert!(log.append("em0_vlan1\nem0_vlan2").is_err());
        assert!(!log.path().exists());
    }

    #[test]
    fn test_drain_empties_log() {
        let dir = TempDir::new().unwrap();
        let log = PendingChangeLog::new(dir.path().join("log"));
        assert!(log.drain().unwrap().is_empty());

        log.append("em0_vlan10").unwrap();
        assert_eq!(log.drain().unwrap(), vec!["em0_vlan10"]);
        assert!(log.entries().unwrap().is_empty());

        log.append("em1_vlan5").unwrap();
        assert_eq!(log.entries().unwrap(), vec!["em1_vlan5"]);
    }

    #[test]
    fn test_concurrent_appends_keep_every_line() {
        const WRITERS: usize = 16;
        const PER_WRITER: usize = 25;

        let dir = TempDir::new().unwrap();
        let log = Arc::new(PendingChangeLog::new(dir.path().join("log")));

        let handles: Vec<_> = (0..WRITERS)
            .map(|w| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..PER_WRITER {
                        log.append(&format!("em{}_vlan{}", w, i + 1)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert!(raw.ends_with('\n'));
        let mut lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), WRITERS * PER_WRITER);
        lines.sort_unstable();
        lines.dedup();
        assert_eq!(lines.len(), WRITERS * PER_WRITER);
        assert!(lines.iter().all(|l| l.starts_with("em") && l.contains("_vlan")));
    }
}
