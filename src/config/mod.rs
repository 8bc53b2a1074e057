//! Configuration and path management

pub mod paths;
pub mod settings;

pub use paths::LedgerPaths;
pub use settings::{EncryptionSettings, Settings};
