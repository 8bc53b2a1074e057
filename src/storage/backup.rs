//! Rotating snapshot backups
//!
//! Before the durable snapshot is replaced, the previous file is copied into
//! a backup directory with a timestamped name, and old backups are pruned to
//! a retention count. Migration failures can then offer restore-from-backup.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};

const BACKUP_PREFIX: &str = "snapshot_";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S%3f";

/// Manages timestamped copies of the snapshot file
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
    retention: usize,
}

impl BackupManager {
    /// Create a manager keeping at most `retention` backups
    pub fn new(dir: PathBuf, retention: usize) -> Self {
        Self { dir, retention }
    }

    /// Copy the current snapshot file into the backup directory, then prune.
    /// A missing source is a no-op (nothing to back up on first save).
    pub fn backup_file(&self, source: &Path) -> LedgerResult<()> {
        if !source.exists() {
            return Ok(());
        }

        fs::create_dir_all(&self.dir).map_err(|e| {
            LedgerError::Storage(format!(
                "Failed to create backup directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT);
        let target = self.dir.join(format!("{}{}.json", BACKUP_PREFIX, timestamp));
        fs::copy(source, &target).map_err(|e| {
            LedgerError::Storage(format!("Failed to back up snapshot: {}", e))
        })?;
        debug!(backup = %target.display(), "snapshot backed up");

        self.prune()
    }

    /// All backups, newest first
    pub fn list(&self) -> LedgerResult<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .map_err(|e| LedgerError::Storage(format!("Failed to read backup directory: {}", e)))?
        {
            let entry =
                entry.map_err(|e| LedgerError::Storage(format!("Failed to read entry: {}", e)))?;
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(BACKUP_PREFIX) && name.ends_with(".json") {
                backups.push(path);
            }
        }

        // Timestamped names sort chronologically.
        backups.sort();
        backups.reverse();
        Ok(backups)
    }

    /// The most recent backup, if any
    pub fn latest(&self) -> LedgerResult<Option<PathBuf>> {
        Ok(self.list()?.into_iter().next())
    }

    fn prune(&self) -> LedgerResult<()> {
        let backups = self.list()?;
        for stale in backups.iter().skip(self.retention) {
            fs::remove_file(stale).map_err(|e| {
                LedgerError::Storage(format!("Failed to prune backup: {}", e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_source(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("snapshot.json");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_source_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let manager = BackupManager::new(temp_dir.path().join("backups"), 3);
        manager
            .backup_file(&temp_dir.path().join("missing.json"))
            .unwrap();
        assert!(manager.list().unwrap().is_empty());
    }

    #[test]
    fn test_backup_copies_contents() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_source(&temp_dir, r#"{"schema_version":4}"#);
        let manager = BackupManager::new(temp_dir.path().join("backups"), 3);

        manager.backup_file(&source).unwrap();
        let latest = manager.latest().unwrap().unwrap();
        assert_eq!(
            fs::read_to_string(latest).unwrap(),
            r#"{"schema_version":4}"#
        );
    }

    #[test]
    fn test_prune_keeps_newest() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_source(&temp_dir, "{}");
        let manager = BackupManager::new(temp_dir.path().join("backups"), 2);

        for _ in 0..5 {
            manager.backup_file(&source).unwrap();
            // Distinct millisecond timestamps keep names unique.
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let backups = manager.list().unwrap();
        assert_eq!(backups.len(), 2);
        // Newest first.
        assert!(backups[0].file_name().unwrap() > backups[1].file_name().unwrap());
    }
}
