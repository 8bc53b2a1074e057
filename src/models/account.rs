//! Account model
//!
//! Represents financial accounts (checking, savings, credit cards, etc.).
//! Each account caches a running balance; the cache is derived state and is
//! recomputed on every committed mutation, so the invariant "balance equals
//! the sum of all non-voided transactions referencing the account" always
//! holds in committed snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::AccountId;
use super::money::Money;

/// Type of financial account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Checking account
    #[default]
    Checking,
    /// Savings account
    Savings,
    /// Credit card
    Credit,
    /// Cash/wallet
    Cash,
    /// Investment account
    Investment,
    /// Other account type
    Other,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checking => write!(f, "Checking"),
            Self::Savings => write!(f, "Savings"),
            Self::Credit => write!(f, "Credit Card"),
            Self::Cash => write!(f, "Cash"),
            Self::Investment => write!(f, "Investment"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// A financial account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,

    /// Display name (e.g., "Chase Checking")
    pub name: String,

    /// Type of account
    pub kind: AccountKind,

    /// ISO 4217 currency code (e.g., "USD")
    pub currency: String,

    /// Cached running balance; derived from non-voided transactions
    #[serde(default)]
    pub balance: Money,

    /// Whether the account accepts new transactions. Deactivated accounts
    /// keep their history; they are never hard-deleted.
    #[serde(default = "default_active")]
    pub active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last modified
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Account {
    /// Create a new active account with a zero balance
    pub fn new(name: impl Into<String>, kind: AccountKind, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            name: name.into(),
            kind,
            currency: currency.into(),
            balance: Money::zero(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Deactivate the account (soft-void; history is kept)
    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }

    /// Reactivate the account
    pub fn reactivate(&mut self) {
        self.active = true;
        self.updated_at = Utc::now();
    }

    /// Validate the account's own fields
    pub fn validate(&self) -> Result<(), AccountValidationError> {
        if self.name.trim().is_empty() {
            return Err(AccountValidationError::EmptyName);
        }
        if self.name.len() > 100 {
            return Err(AccountValidationError::NameTooLong(self.name.len()));
        }
        if self.currency.trim().is_empty() {
            return Err(AccountValidationError::EmptyCurrency);
        }
        Ok(())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

/// Validation errors for accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountValidationError {
    EmptyName,
    NameTooLong(usize),
    EmptyCurrency,
}

impl fmt::Display for AccountValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Account name cannot be empty"),
            Self::NameTooLong(len) => {
                write!(f, "Account name too long ({} chars, max 100)", len)
            }
            Self::EmptyCurrency => write!(f, "Account currency cannot be empty"),
        }
    }
}

impl std::error::Error for AccountValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account() {
        let account = Account::new("Checking", AccountKind::Checking, "USD");
        assert_eq!(account.name, "Checking");
        assert_eq!(account.currency, "USD");
        assert!(account.active);
        assert_eq!(account.balance, Money::zero());
    }

    #[test]
    fn test_deactivate_reactivate() {
        let mut account = Account::new("Old card", AccountKind::Credit, "USD");
        account.deactivate();
        assert!(!account.active);
        account.reactivate();
        assert!(account.active);
    }

    #[test]
    fn test_validation() {
        let mut account = Account::new("Valid", AccountKind::Cash, "EUR");
        assert!(account.validate().is_ok());

        account.name = String::new();
        assert_eq!(account.validate(), Err(AccountValidationError::EmptyName));

        account.name = "a".repeat(101);
        assert!(matches!(
            account.validate(),
            Err(AccountValidationError::NameTooLong(_))
        ));

        account.name = "ok".into();
        account.currency = "  ".into();
        assert_eq!(
            account.validate(),
            Err(AccountValidationError::EmptyCurrency)
        );
    }

    #[test]
    fn test_serde_defaults_active() {
        // Older documents may omit the active flag entirely.
        let json = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "name": "Checking",
            "kind": "checking",
            "currency": "USD",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        }"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert!(account.active);
        assert_eq!(account.balance, Money::zero());
    }
}
