//! Path management
//!
//! Resolves the platform data directory for the engine, with an environment
//! variable override for tests and portable installs.
//!
//! ## Path Resolution Order
//!
//! 1. `POCKETLEDGER_DATA_DIR` environment variable (if set)
//! 2. The platform data directory (e.g. `~/.local/share/pocketledger` on
//!    Linux, `~/Library/Application Support/pocketledger` on macOS)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::{LedgerError, LedgerResult};

/// Manages all paths used by the engine
#[derive(Debug, Clone)]
pub struct LedgerPaths {
    /// Base directory for all engine data
    base_dir: PathBuf,
}

impl LedgerPaths {
    /// Create paths using the platform default (or the env override)
    pub fn new() -> LedgerResult<Self> {
        let base_dir = if let Ok(custom) = std::env::var("POCKETLEDGER_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            ProjectDirs::from("", "", "pocketledger")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| {
                    LedgerError::Config("Could not determine a data directory".into())
                })?
        };

        Ok(Self { base_dir })
    }

    /// Create paths rooted at a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// The base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// The data directory holding the snapshot
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// The rotating backup directory
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// The durable snapshot file
    pub fn snapshot_file(&self) -> PathBuf {
        self.data_dir().join("snapshot.json")
    }

    /// The settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Ensure the base, data, and backup directories exist
    pub fn ensure_directories(&self) -> LedgerResult<()> {
        for dir in [self.base_dir.clone(), self.data_dir(), self.backup_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                LedgerError::Io(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}
