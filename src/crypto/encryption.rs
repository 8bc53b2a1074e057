//! AES-256-GCM snapshot encryption
//!
//! Wraps the serialized snapshot payload in an authenticated-encryption
//! envelope. Every encryption generates a fresh nonce; the GCM
//! authentication tag is appended to the ciphertext, so tampering or a
//! wrong key surfaces as a distinct cannot-decrypt error rather than
//! garbage (or empty) data.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

use super::key_derivation::DerivedKey;

/// Algorithm tag written into every envelope
pub const ALGORITHM: &str = "aes256-gcm";

/// Size of the AES-GCM nonce in bytes (96 bits)
const NONCE_SIZE: usize = 12;

/// An encrypted payload with its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionEnvelope {
    /// Algorithm tag for future upgrades
    pub algorithm: String,

    /// Nonce used for this encryption (base64)
    pub nonce: String,

    /// Ciphertext with the authentication tag appended (base64)
    pub ciphertext: String,
}

/// Encrypt a payload under a derived key
pub fn encrypt(plaintext: &[u8], key: &DerivedKey) -> LedgerResult<EncryptionEnvelope> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| LedgerError::Encryption(format!("Failed to create cipher: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| LedgerError::Encryption(format!("Encryption failed: {}", e)))?;

    Ok(EncryptionEnvelope {
        algorithm: ALGORITHM.to_string(),
        nonce: BASE64.encode(nonce_bytes),
        ciphertext: BASE64.encode(&ciphertext),
    })
}

/// Decrypt an envelope under a derived key.
///
/// Returns [`LedgerError::CannotDecrypt`] when authentication fails (wrong
/// key or tampered data).
pub fn decrypt(envelope: &EncryptionEnvelope, key: &DerivedKey) -> LedgerResult<Vec<u8>> {
    if envelope.algorithm != ALGORITHM {
        return Err(LedgerError::Encryption(format!(
            "Unsupported encryption algorithm: {}",
            envelope.algorithm
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| LedgerError::Encryption(format!("Failed to create cipher: {}", e)))?;

    let nonce_bytes = BASE64
        .decode(&envelope.nonce)
        .map_err(|e| LedgerError::Encryption(format!("Invalid nonce encoding: {}", e)))?;
    if nonce_bytes.len() != NONCE_SIZE {
        return Err(LedgerError::Encryption(format!(
            "Invalid nonce size: expected {}, got {}",
            NONCE_SIZE,
            nonce_bytes.len()
        )));
    }
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = BASE64
        .decode(&envelope.ciphertext)
        .map_err(|e| LedgerError::Encryption(format!("Invalid ciphertext encoding: {}", e)))?;

    cipher
        .decrypt(nonce, ciphertext.as_ref())
        .map_err(|_| LedgerError::CannotDecrypt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key_derivation::{derive_key, KeyDerivationParams};

    fn test_key(passphrase: &str) -> DerivedKey {
        derive_key(passphrase, &KeyDerivationParams::generate()).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let key = test_key("passphrase");
        let plaintext = br#"{"schema_version":4}"#;

        let envelope = encrypt(plaintext, &key).unwrap();
        assert_eq!(envelope.algorithm, ALGORITHM);

        let decrypted = decrypt(&envelope, &key).unwrap();
        assert_eq!(plaintext.as_slice(), decrypted);
    }

    #[test]
    fn test_fresh_nonce_every_time() {
        let key = test_key("passphrase");
        let a = encrypt(b"same payload", &key).unwrap();
        let b = encrypt(b"same payload", &key).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_is_cannot_decrypt() {
        let envelope = encrypt(b"secret", &test_key("right")).unwrap();
        let result = decrypt(&envelope, &test_key("wrong"));
        assert!(matches!(result, Err(LedgerError::CannotDecrypt)));
    }

    #[test]
    fn test_tampered_ciphertext_is_cannot_decrypt() {
        let key = test_key("passphrase");
        let mut envelope = encrypt(b"secret", &key).unwrap();

        let mut bytes = BASE64.decode(&envelope.ciphertext).unwrap();
        bytes[0] ^= 0xFF;
        envelope.ciphertext = BASE64.encode(&bytes);

        assert!(matches!(
            decrypt(&envelope, &key),
            Err(LedgerError::CannotDecrypt)
        ));
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let key = test_key("passphrase");
        let mut envelope = encrypt(b"secret", &key).unwrap();
        envelope.algorithm = "rot13".into();
        assert!(matches!(
            decrypt(&envelope, &key),
            Err(LedgerError::Encryption(_))
        ));
    }
}
