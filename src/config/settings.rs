//! User settings
//!
//! Engine-level preferences persisted outside the snapshot: duplicate
//! detection tuning, encryption configuration, and backup retention. Rule
//! and budget/goal configuration live inside the snapshot, not here.

use serde::{Deserialize, Serialize};

use super::paths::LedgerPaths;
use crate::crypto::{decrypt, derive_key, encrypt, DerivedKey, EncryptionEnvelope,
    KeyDerivationParams};
use crate::engine::DedupeConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::{read_json_opt, write_json_atomic};

/// Known plaintext used to verify a passphrase before touching the snapshot
const CANARY: &[u8] = b"pocketledger-key-check";

/// Encryption settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EncryptionSettings {
    /// Whether snapshot encryption is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Key derivation parameters (salt, memory cost, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_params: Option<KeyDerivationParams>,

    /// A small encrypted canary used to verify the passphrase early,
    /// before attempting to decrypt the snapshot itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canary: Option<EncryptionEnvelope>,
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Duplicate detection tuning
    #[serde(default)]
    pub dedupe: DedupeConfig,

    /// Snapshot encryption configuration
    #[serde(default)]
    pub encryption: EncryptionSettings,

    /// How many rotating snapshot backups to keep
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,
}

fn default_backup_retention() -> usize {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dedupe: DedupeConfig::default(),
            encryption: EncryptionSettings::default(),
            backup_retention: default_backup_retention(),
        }
    }
}

impl Settings {
    /// Load settings, creating the default file on first run
    pub fn load_or_create(paths: &LedgerPaths) -> LedgerResult<Self> {
        match read_json_opt::<Self, _>(paths.settings_file())? {
            Some(settings) => Ok(settings),
            None => {
                let settings = Self::default();
                settings.save(paths)?;
                Ok(settings)
            }
        }
    }

    /// Persist settings atomically
    pub fn save(&self, paths: &LedgerPaths) -> LedgerResult<()> {
        write_json_atomic(paths.settings_file(), self)
    }

    /// Turn encryption on: generate a salt, derive the key, and store a
    /// canary so future unlocks can verify the passphrase. Returns the key
    /// so the caller can re-save the snapshot encrypted immediately.
    pub fn enable_encryption(&mut self, passphrase: &str) -> LedgerResult<DerivedKey> {
        if passphrase.is_empty() {
            return Err(LedgerError::Validation(
                "Passphrase cannot be empty".into(),
            ));
        }
        let params = KeyDerivationParams::generate();
        let key = derive_key(passphrase, &params)?;
        self.canary_from(&key)?;
        self.encryption.key_params = Some(params);
        self.encryption.enabled = true;
        Ok(key)
    }

    fn canary_from(&mut self, key: &DerivedKey) -> LedgerResult<()> {
        self.encryption.canary = Some(encrypt(CANARY, key)?);
        Ok(())
    }

    /// Derive and verify the key for the configured encryption, if any.
    ///
    /// Returns `Ok(None)` when encryption is disabled. A wrong passphrase
    /// fails with [`LedgerError::CannotDecrypt`] before the snapshot is
    /// ever read.
    pub fn unlock(&self, passphrase: Option<&str>) -> LedgerResult<Option<DerivedKey>> {
        if !self.encryption.enabled {
            return Ok(None);
        }

        let passphrase = passphrase.ok_or(LedgerError::PassphraseRequired)?;
        let params = self.encryption.key_params.as_ref().ok_or_else(|| {
            LedgerError::Config("Encryption enabled but key parameters are missing".into())
        })?;

        let key = derive_key(passphrase, params)?;
        if let Some(canary) = &self.encryption.canary {
            let plaintext = decrypt(canary, &key)?;
            if plaintext != CANARY {
                return Err(LedgerError::CannotDecrypt);
            }
        }
        Ok(Some(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_paths() -> (TempDir, LedgerPaths) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();
        (temp_dir, paths)
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let (_temp_dir, paths) = test_paths();
        let settings = Settings::load_or_create(&paths).unwrap();

        assert!(!settings.encryption.enabled);
        assert_eq!(settings.backup_retention, 10);
        assert!(paths.settings_file().exists());

        // Second load reads the file back.
        let again = Settings::load_or_create(&paths).unwrap();
        assert_eq!(again.dedupe.window_days, settings.dedupe.window_days);
    }

    #[test]
    fn test_enable_encryption_and_unlock() {
        let (_temp_dir, paths) = test_paths();
        let mut settings = Settings::load_or_create(&paths).unwrap();

        let key = settings.enable_encryption("a sturdy passphrase").unwrap();
        settings.save(&paths).unwrap();

        let reloaded = Settings::load_or_create(&paths).unwrap();
        let unlocked = reloaded
            .unlock(Some("a sturdy passphrase"))
            .unwrap()
            .unwrap();
        assert_eq!(key.as_bytes(), unlocked.as_bytes());
    }

    #[test]
    fn test_unlock_wrong_passphrase_fails_early() {
        let (_temp_dir, paths) = test_paths();
        let mut settings = Settings::load_or_create(&paths).unwrap();
        settings.enable_encryption("correct").unwrap();

        assert!(matches!(
            settings.unlock(Some("incorrect")),
            Err(LedgerError::CannotDecrypt)
        ));
    }

    #[test]
    fn test_unlock_without_passphrase() {
        let (_temp_dir, paths) = test_paths();
        let mut settings = Settings::load_or_create(&paths).unwrap();

        // Disabled encryption needs no passphrase.
        assert!(settings.unlock(None).unwrap().is_none());

        settings.enable_encryption("secret").unwrap();
        assert!(matches!(
            settings.unlock(None),
            Err(LedgerError::PassphraseRequired)
        ));
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        let (_temp_dir, paths) = test_paths();
        let mut settings = Settings::load_or_create(&paths).unwrap();
        assert!(matches!(
            settings.enable_encryption(""),
            Err(LedgerError::Validation(_))
        ));
    }
}
