//! Snapshot encryption
//!
//! Argon2id turns a passphrase into a 256-bit key; AES-256-GCM wraps the
//! serialized snapshot in an authenticated envelope. Encryption is optional
//! and configured in settings.

pub mod encryption;
pub mod key_derivation;

pub use encryption::{decrypt, encrypt, EncryptionEnvelope, ALGORITHM};
pub use key_derivation::{derive_key, DerivedKey, KeyDerivationParams};
