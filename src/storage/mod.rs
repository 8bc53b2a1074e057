//! Snapshot persistence
//!
//! Serializes the versioned snapshot to a single JSON document on disk,
//! optionally wrapped in an authenticated-encryption envelope. Saves are
//! atomic (write-new-then-swap) and the previous durable snapshot is copied
//! into rotating backups before being replaced. Loads return the raw
//! document so the migration chain can run before deserialization.

pub mod backup;
pub mod file_io;

pub use backup::BackupManager;
pub use file_io::{read_json_opt, read_json_value, write_json_atomic};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::crypto::{decrypt, encrypt, DerivedKey, EncryptionEnvelope};
use crate::error::{LedgerError, LedgerResult};
use crate::models::Snapshot;

/// On-disk form of an encrypted snapshot. The schema version is duplicated
/// outside the ciphertext for diagnostics; the version inside the decrypted
/// payload is authoritative.
#[derive(Debug, Serialize, Deserialize)]
struct EncryptedFile {
    schema_version: u32,
    encryption: EncryptionEnvelope,
}

/// Reads and writes the durable snapshot file
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    backups: BackupManager,
}

impl SnapshotStore {
    /// Create a store for the given snapshot path and backup directory
    pub fn new(path: PathBuf, backup_dir: PathBuf, retention: usize) -> Self {
        Self {
            path,
            backups: BackupManager::new(backup_dir, retention),
        }
    }

    /// The durable snapshot path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The rotating backups alongside the snapshot
    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Whether a durable snapshot exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Persist the snapshot, encrypting when a key is supplied.
    ///
    /// The previous durable file is backed up first, then atomically
    /// replaced; on any failure the previous snapshot is still intact.
    pub fn save(&self, snapshot: &Snapshot, key: Option<&DerivedKey>) -> LedgerResult<()> {
        self.backups.backup_file(&self.path)?;

        match key {
            None => write_json_atomic(&self.path, snapshot)?,
            Some(key) => {
                let plaintext = serde_json::to_vec(snapshot)?;
                let envelope = encrypt(&plaintext, key)?;
                let file = EncryptedFile {
                    schema_version: snapshot.schema_version,
                    encryption: envelope,
                };
                write_json_atomic(&self.path, &file)?;
            }
        }

        info!(
            path = %self.path.display(),
            encrypted = key.is_some(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Load the raw snapshot document, decrypting when necessary.
    ///
    /// Returns `Ok(None)` only when no snapshot exists (fresh install).
    /// An unreadable file, a missing passphrase, or a failed decryption is
    /// an error, never silently empty state.
    pub fn load(&self, key: Option<&DerivedKey>) -> LedgerResult<Option<Value>> {
        let Some(document) = read_json_value(&self.path)? else {
            return Ok(None);
        };

        if document.get("encryption").is_some() {
            let file: EncryptedFile = serde_json::from_value(document).map_err(|e| {
                LedgerError::Storage(format!("Invalid encryption envelope: {}", e))
            })?;
            let key = key.ok_or(LedgerError::PassphraseRequired)?;
            let plaintext = decrypt(&file.encryption, key)?;
            let value = serde_json::from_slice(&plaintext).map_err(|e| {
                LedgerError::Storage(format!("Decrypted snapshot is not valid JSON: {}", e))
            })?;
            Ok(Some(value))
        } else {
            Ok(Some(document))
        }
    }
}
