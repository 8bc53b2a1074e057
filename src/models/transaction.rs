//! Transaction model
//!
//! Represents financial transactions with support for category splits,
//! linked transfer legs, tags, and soft-void semantics. Transactions are
//! never hard-deleted while anything references them; they are voided
//! instead, and voided transactions are excluded from balances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AccountId, CategoryId, RuleId, TransactionId, TransferGroupId};
use super::money::Money;

/// Where a transaction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Entered by hand
    #[default]
    Manual,
    /// Imported from a bank feed or file
    Imported,
    /// Created by an automation rule
    RuleGenerated,
    /// Created by splitting another transaction
    SplitDerived,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Imported => write!(f, "imported"),
            Self::RuleGenerated => write!(f, "rule-generated"),
            Self::SplitDerived => write!(f, "split-derived"),
        }
    }
}

/// A tag on a transaction, recording its provenance
///
/// A tag attached by an automation rule remembers the rule's id; if that
/// rule is later removed the tag becomes an orphan, which the integrity
/// repair pass drops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,

    /// The rule that attached this tag, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<RuleId>,
}

impl Tag {
    /// Create a user-attached tag
    pub fn manual(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule_id: None,
        }
    }

    /// Create a rule-attached tag
    pub fn from_rule(name: impl Into<String>, rule_id: RuleId) -> Self {
        Self {
            name: name.into(),
            rule_id: Some(rule_id),
        }
    }

    /// Whether an automation rule attached this tag
    pub fn is_rule_generated(&self) -> bool {
        self.rule_id.is_some()
    }
}

/// A portion of a transaction allocated to a specific category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPortion {
    /// The category for this portion
    pub category_id: CategoryId,

    /// The amount for this portion (same sign as the parent transaction)
    pub amount: Money,

    /// Optional memo for this portion
    #[serde(default)]
    pub memo: String,
}

impl SplitPortion {
    /// Create a new split portion
    pub fn new(category_id: CategoryId, amount: Money) -> Self {
        Self {
            category_id,
            amount,
            memo: String::new(),
        }
    }
}

/// A financial transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,

    /// The account this transaction belongs to
    pub account_id: AccountId,

    /// For transfer legs, the account on the other side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_account_id: Option<AccountId>,

    /// Signed amount (positive for inflow, negative for outflow)
    pub amount: Money,

    /// ISO 4217 currency code of the amount
    pub currency: String,

    /// Category (None for uncategorized, split, or transfer transactions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,

    /// When the transaction occurred
    pub timestamp: DateTime<Utc>,

    /// Free-text note / merchant description
    #[serde(default)]
    pub note: String,

    /// Tags, each with provenance
    #[serde(default)]
    pub tags: Vec<Tag>,

    /// Where the transaction came from
    #[serde(default)]
    pub origin: Origin,

    /// Soft-delete flag; voided transactions are excluded from balances
    #[serde(default)]
    pub voided: bool,

    /// Flagged for user review. Monotonic under rule application: once set
    /// by a rule it is never cleared by a later rule.
    #[serde(default)]
    pub review: bool,

    /// Both legs of a transfer share a group id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_group: Option<TransferGroupId>,

    /// Category allocations; if non-empty, category_id is None
    #[serde(default)]
    pub splits: Vec<SplitPortion>,

    /// For split-derived transactions, the voided parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_parent: Option<TransactionId>,

    /// When the transaction was created
    pub created_at: DateTime<Utc>,

    /// When the transaction was last modified
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new manual transaction
    pub fn new(
        account_id: AccountId,
        timestamp: DateTime<Utc>,
        amount: Money,
        currency: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            account_id,
            counter_account_id: None,
            amount,
            currency: currency.into(),
            category_id: None,
            timestamp,
            note: String::new(),
            tags: Vec::new(),
            origin: Origin::Manual,
            voided: false,
            review: false,
            transfer_group: None,
            splits: Vec::new(),
            split_parent: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Builder-style category
    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Check if this transaction is one leg of a transfer
    pub fn is_transfer(&self) -> bool {
        self.transfer_group.is_some()
    }

    /// Check if this is a split transaction
    pub fn is_split(&self) -> bool {
        !self.splits.is_empty()
    }

    /// Check if a tag with the given name is present
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    /// Add a tag unless one with the same name already exists
    pub fn add_tag(&mut self, tag: Tag) {
        if !self.has_tag(&tag.name) {
            self.tags.push(tag);
            self.updated_at = Utc::now();
        }
    }

    /// Set a single category, clearing any splits
    pub fn set_category(&mut self, category_id: CategoryId) {
        self.splits.clear();
        self.category_id = Some(category_id);
        self.updated_at = Utc::now();
    }

    /// Flag for review; rule application never clears this flag
    pub fn flag_for_review(&mut self) {
        self.review = true;
        self.updated_at = Utc::now();
    }

    /// Void this transaction (soft delete)
    pub fn void(&mut self) {
        self.voided = true;
        self.updated_at = Utc::now();
    }

    /// Total of all split portions (must equal the transaction amount)
    pub fn splits_total(&self) -> Money {
        self.splits.iter().map(|s| s.amount).sum()
    }

    /// Validate the transaction's own fields
    pub fn validate(&self) -> Result<(), TransactionValidationError> {
        if self.amount.is_zero() {
            return Err(TransactionValidationError::ZeroAmount);
        }

        if self.is_split() {
            let splits_total = self.splits_total();
            if splits_total != self.amount {
                return Err(TransactionValidationError::SplitsMismatch {
                    amount: self.amount,
                    splits_total,
                });
            }
        }

        if self.category_id.is_some() && !self.splits.is_empty() {
            return Err(TransactionValidationError::CategoryAndSplits);
        }

        if self.is_transfer() && (self.category_id.is_some() || !self.splits.is_empty()) {
            return Err(TransactionValidationError::TransferWithCategory);
        }

        if self.counter_account_id == Some(self.account_id) {
            return Err(TransactionValidationError::SelfTransfer);
        }

        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.timestamp.format("%Y-%m-%d"),
            self.note,
            self.amount,
            self.currency
        )
    }
}

/// Validation errors for transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionValidationError {
    ZeroAmount,
    SplitsMismatch { amount: Money, splits_total: Money },
    CategoryAndSplits,
    TransferWithCategory,
    SelfTransfer,
}

impl fmt::Display for TransactionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroAmount => write!(f, "Transaction amount must be non-zero"),
            Self::SplitsMismatch {
                amount,
                splits_total,
            } => write!(
                f,
                "Split totals ({}) do not match transaction amount ({})",
                splits_total, amount
            ),
            Self::CategoryAndSplits => {
                write!(f, "Transaction cannot have both a category and splits")
            }
            Self::TransferWithCategory => {
                write!(f, "Transfer legs cannot carry a category or splits")
            }
            Self::SelfTransfer => {
                write!(f, "Transfer counter-account cannot equal the account")
            }
        }
    }
}

impl std::error::Error for TransactionValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_transaction() {
        let account_id = AccountId::new();
        let txn = Transaction::new(account_id, ts(2026, 1, 15), Money::from_cents(-5000), "USD");
        assert_eq!(txn.account_id, account_id);
        assert_eq!(txn.origin, Origin::Manual);
        assert!(!txn.voided);
        assert!(!txn.review);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let txn = Transaction::new(AccountId::new(), ts(2026, 1, 15), Money::zero(), "USD");
        assert_eq!(txn.validate(), Err(TransactionValidationError::ZeroAmount));
    }

    #[test]
    fn test_split_validation() {
        let mut txn = Transaction::new(
            AccountId::new(),
            ts(2026, 1, 15),
            Money::from_cents(-10000),
            "USD",
        );
        txn.splits
            .push(SplitPortion::new(CategoryId::new(), Money::from_cents(-6000)));
        txn.splits
            .push(SplitPortion::new(CategoryId::new(), Money::from_cents(-4000)));
        assert!(txn.validate().is_ok());
        assert_eq!(txn.splits_total(), Money::from_cents(-10000));

        txn.splits.pop();
        assert!(matches!(
            txn.validate(),
            Err(TransactionValidationError::SplitsMismatch { .. })
        ));
    }

    #[test]
    fn test_set_category_clears_splits() {
        let mut txn = Transaction::new(
            AccountId::new(),
            ts(2026, 1, 15),
            Money::from_cents(-10000),
            "USD",
        );
        txn.splits
            .push(SplitPortion::new(CategoryId::new(), Money::from_cents(-10000)));
        let cat = CategoryId::new();
        txn.set_category(cat);
        assert!(txn.splits.is_empty());
        assert_eq!(txn.category_id, Some(cat));
    }

    #[test]
    fn test_transfer_with_category_rejected() {
        let mut txn = Transaction::new(
            AccountId::new(),
            ts(2026, 1, 15),
            Money::from_cents(-5000),
            "USD",
        );
        txn.transfer_group = Some(TransferGroupId::new());
        txn.category_id = Some(CategoryId::new());
        assert_eq!(
            txn.validate(),
            Err(TransactionValidationError::TransferWithCategory)
        );
    }

    #[test]
    fn test_tag_dedupe_by_name() {
        let mut txn = Transaction::new(
            AccountId::new(),
            ts(2026, 1, 15),
            Money::from_cents(-5000),
            "USD",
        );
        let rule_id = RuleId::new();
        txn.add_tag(Tag::manual("coffee"));
        txn.add_tag(Tag::from_rule("coffee", rule_id));
        assert_eq!(txn.tags.len(), 1);
        assert!(!txn.tags[0].is_rule_generated());
    }

    #[test]
    fn test_serde_round_trip_with_defaults() {
        let mut txn = Transaction::new(
            AccountId::new(),
            ts(2026, 1, 15),
            Money::from_cents(-5000),
            "USD",
        )
        .with_note("POS COFFEE 0231");
        txn.add_tag(Tag::from_rule("coffee", RuleId::new()));

        let json = serde_json::to_string(&txn).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, txn.id);
        assert_eq!(back.tags, txn.tags);
        assert_eq!(back.note, txn.note);
    }

    #[test]
    fn test_display() {
        let txn = Transaction::new(
            AccountId::new(),
            ts(2026, 1, 15),
            Money::from_cents(-5000),
            "USD",
        )
        .with_note("Grocer");
        assert_eq!(format!("{}", txn), "2026-01-15 Grocer -50.00 USD");
    }
}
