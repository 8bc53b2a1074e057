//! Custom error types for pocketledger
//!
//! This module defines the error hierarchy for the engine using thiserror
//! for ergonomic error definitions. Hard integrity failures, migration
//! failures, and persistence failures are distinct variants so callers can
//! react differently to each (reject the mutation, offer restore-from-backup,
//! retry the save).

use thiserror::Error;

use crate::engine::validator::Violation;

/// The main error type for pocketledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for a single entity (mutation rejected)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Hard cross-entity invariant broken; the mutation was rejected and the
    /// snapshot is unchanged
    #[error("Integrity check failed: {}", format_violations(.violations))]
    Integrity { violations: Vec<Violation> },

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// Fatal migration failure; the caller must not proceed with this
    /// snapshot and should offer restore-from-backup or reset
    #[error("Migration error: {0}")]
    Migration(String),

    /// The persisted snapshot was written by a newer app version
    #[error("Snapshot schema version {found} is newer than the latest supported version {latest}")]
    UnsupportedSchema { found: u32, latest: u32 },

    /// A gap in the upgrader chain; a configuration error, never a skip
    #[error("No upgrader registered for schema version {from}")]
    MissingUpgrader { from: u32 },

    /// Save/load failure; the previous durable snapshot is intact
    #[error("Storage error: {0}")]
    Storage(String),

    /// Encryption setup or encoding errors
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Wrong passphrase or tampered ciphertext; never an empty snapshot
    #[error("Cannot decrypt snapshot: wrong passphrase or corrupted data")]
    CannotDecrypt,

    /// The snapshot on disk is encrypted but no passphrase was supplied
    #[error("Snapshot is encrypted but no passphrase was provided")]
    PassphraseRequired,

    /// Attempted to mutate a voided transaction
    #[error("Transaction is voided: {0}")]
    Voided(String),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl LedgerError {
    /// Create a "not found" error for accounts
    pub fn account_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Account",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for categories
    pub fn category_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Category",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for transactions
    pub fn transaction_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Transaction",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for budgets
    pub fn budget_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Budget",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for goals
    pub fn goal_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Goal",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for automation rules
    pub fn rule_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Rule",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a hard integrity rejection
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }

    /// Check if this is a fatal migration failure
    pub fn is_migration(&self) -> bool {
        matches!(
            self,
            Self::Migration(_) | Self::UnsupportedSchema { .. } | Self::MissingUpgrader { .. }
        )
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for pocketledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::Config("missing data dir".into());
        assert_eq!(err.to_string(), "Configuration error: missing data dir");
    }

    #[test]
    fn test_not_found_error() {
        let err = LedgerError::account_not_found("Checking");
        assert_eq!(err.to_string(), "Account not found: Checking");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unsupported_schema_display() {
        let err = LedgerError::UnsupportedSchema {
            found: 9,
            latest: 4,
        };
        assert_eq!(
            err.to_string(),
            "Snapshot schema version 9 is newer than the latest supported version 4"
        );
        assert!(err.is_migration());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let ledger_err: LedgerError = io_err.into();
        assert!(matches!(ledger_err, LedgerError::Io(_)));
    }
}
