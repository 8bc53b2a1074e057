//! Key derivation using Argon2id
//!
//! Derives the snapshot encryption key from a user passphrase with Argon2id.
//! The derivation parameters (including the salt) are persisted in settings
//! so the same passphrase always yields the same key; the key itself is
//! zeroized on drop and never persisted.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{LedgerError, LedgerResult};

/// Parameters for key derivation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyDerivationParams {
    /// Salt for key derivation (base64 encoded)
    pub salt: String,
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Time cost (iterations)
    pub time_cost: u32,
    /// Parallelism degree
    pub parallelism: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            salt: String::new(), // generated on first use
            memory_cost: 65536,  // 64 MiB
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KeyDerivationParams {
    /// Create new params with a freshly generated random salt
    pub fn generate() -> Self {
        let salt = SaltString::generate(&mut OsRng);
        Self {
            salt: salt.as_str().to_string(),
            ..Default::default()
        }
    }
}

/// A derived 256-bit encryption key, zeroized on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; 32],
}

impl DerivedKey {
    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

/// Derive an encryption key from a passphrase
pub fn derive_key(passphrase: &str, params: &KeyDerivationParams) -> LedgerResult<DerivedKey> {
    let salt = SaltString::from_b64(&params.salt)
        .map_err(|e| LedgerError::Encryption(format!("Invalid salt: {}", e)))?;
    let mut salt_buf = [0u8; 64];
    let salt_bytes = salt
        .decode_b64(&mut salt_buf)
        .map_err(|e| LedgerError::Encryption(format!("Invalid salt encoding: {}", e)))?;

    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(32), // output length for AES-256
    )
    .map_err(|e| LedgerError::Encryption(format!("Invalid Argon2 parameters: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt_bytes, &mut key)
        .map_err(|e| LedgerError::Encryption(format!("Key derivation failed: {}", e)))?;

    Ok(DerivedKey { key })
}
