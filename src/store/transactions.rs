//! Transaction operations
//!
//! Every transaction write runs the full pipeline before committing: the
//! automation rules mutate the incoming transaction, the duplicate detector
//! scores it against the existing window, and the integrity check validates
//! the staged snapshot. Hard violations reject the write with the committed
//! state untouched; duplicates and soft violations come back on the outcome
//! for the caller to surface; nothing is merged or dropped automatically.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::engine::{rules, DuplicateCandidate, RuleWarning, Violation};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    AccountId, Money, Origin, RuleId, SplitPortion, Transaction, TransactionId, TransferGroupId,
};

use super::Ledger;

/// What happened when a transaction was written
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    /// The transaction as committed (after rule application)
    pub transaction: Transaction,

    /// Rules that matched, in evaluation order
    pub applied_rules: Vec<RuleId>,

    /// Rules skipped as malformed
    pub rule_warnings: Vec<RuleWarning>,

    /// Possible duplicates of this transaction, best first. The caller
    /// decides whether to confirm with the user; nothing was merged.
    pub duplicates: Vec<DuplicateCandidate>,

    /// Soft violations present after the commit
    pub warnings: Vec<Violation>,
}

/// Both legs of a committed transfer
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// The outflow leg (negative amount, on the source account)
    pub from_leg: Transaction,

    /// The inflow leg (positive amount, on the destination account)
    pub to_leg: Transaction,

    /// Soft violations present after the commit
    pub warnings: Vec<Violation>,
}

impl Ledger {
    /// Add a new transaction, running rules, duplicate detection, and
    /// integrity checks before committing.
    pub fn add_transaction(&mut self, transaction: Transaction) -> LedgerResult<CommitOutcome> {
        if self.snapshot.transaction(transaction.id).is_some() {
            return Err(LedgerError::Duplicate {
                entity_type: "Transaction",
                identifier: transaction.id.to_string(),
            });
        }
        self.write_transaction(transaction, true)
    }

    /// Replace an existing transaction, re-running the same pipeline
    pub fn update_transaction(
        &mut self,
        mut transaction: Transaction,
    ) -> LedgerResult<CommitOutcome> {
        let existing = self
            .snapshot
            .transaction(transaction.id)
            .ok_or_else(|| LedgerError::transaction_not_found(transaction.id.to_string()))?;
        if existing.voided {
            return Err(LedgerError::Voided(transaction.id.to_string()));
        }
        transaction.updated_at = Utc::now();
        self.write_transaction(transaction, false)
    }

    fn write_transaction(
        &mut self,
        transaction: Transaction,
        is_new: bool,
    ) -> LedgerResult<CommitOutcome> {
        transaction
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        let account = self
            .snapshot
            .account(transaction.account_id)
            .ok_or_else(|| LedgerError::account_not_found(transaction.account_id.to_string()))?;
        if !account.active {
            return Err(LedgerError::Validation(format!(
                "Account '{}' is inactive and cannot accept transactions",
                account.name
            )));
        }

        // Transfer legs are managed through the transfer operations and
        // bypass rules and duplicate detection.
        let (processed, applied_rules, rule_warnings, duplicates) = if transaction.is_transfer() {
            (transaction, Vec::new(), Vec::new(), Vec::new())
        } else {
            let outcome = rules::apply(transaction, &self.snapshot.rules);
            let duplicates = self
                .detector
                .find_candidates(&outcome.transaction, &self.snapshot.transactions);
            (
                outcome.transaction,
                outcome.applied,
                outcome.warnings,
                duplicates,
            )
        };

        if !duplicates.is_empty() {
            debug!(
                transaction = %processed.id,
                candidates = duplicates.len(),
                "possible duplicates detected"
            );
        }

        let mut staged = self.snapshot.clone();
        if is_new {
            staged.transactions.push(processed.clone());
        } else if let Some(slot) = staged.transaction_mut(processed.id) {
            *slot = processed.clone();
        }
        let warnings = self.commit(staged)?;

        Ok(CommitOutcome {
            transaction: processed,
            applied_rules,
            rule_warnings,
            duplicates,
            warnings,
        })
    }

    /// Void a transaction. Voiding one leg of a transfer voids the other
    /// leg too, so a half-voided transfer is never committed.
    pub fn void_transaction(&mut self, id: TransactionId) -> LedgerResult<Vec<Violation>> {
        let transaction = self
            .snapshot
            .transaction(id)
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;
        if transaction.voided {
            return Err(LedgerError::Voided(id.to_string()));
        }

        let mut staged = self.snapshot.clone();
        match transaction.transfer_group {
            Some(group) => {
                for leg in staged
                    .transactions
                    .iter_mut()
                    .filter(|t| t.transfer_group == Some(group))
                {
                    leg.void();
                }
            }
            None => {
                if let Some(slot) = staged.transaction_mut(id) {
                    slot.void();
                }
            }
        }
        self.commit(staged)
    }

    /// Split a transaction into separate derived transactions, one per
    /// portion. The original is voided, and each child records it as the
    /// split parent.
    pub fn split_transaction(
        &mut self,
        id: TransactionId,
        portions: Vec<SplitPortion>,
    ) -> LedgerResult<Vec<Transaction>> {
        let original = self
            .snapshot
            .transaction(id)
            .cloned()
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;
        if original.voided {
            return Err(LedgerError::Voided(id.to_string()));
        }
        if original.is_transfer() {
            return Err(LedgerError::Validation(
                "Transfer legs cannot be split".into(),
            ));
        }
        if portions.is_empty() {
            return Err(LedgerError::Validation(
                "Split requires at least one portion".into(),
            ));
        }
        if portions.iter().any(|p| p.amount.is_zero()) {
            return Err(LedgerError::Validation(
                "Split portions must be non-zero".into(),
            ));
        }
        let total: Money = portions.iter().map(|p| p.amount).sum();
        if total != original.amount {
            return Err(LedgerError::Validation(format!(
                "Split portions sum to {}, transaction amount is {}",
                total, original.amount
            )));
        }

        let children: Vec<Transaction> = portions
            .into_iter()
            .map(|portion| {
                let mut child = Transaction::new(
                    original.account_id,
                    original.timestamp,
                    portion.amount,
                    original.currency.clone(),
                );
                child.note = if portion.memo.is_empty() {
                    original.note.clone()
                } else {
                    portion.memo
                };
                child.category_id = Some(portion.category_id);
                child.origin = Origin::SplitDerived;
                child.split_parent = Some(original.id);
                child
            })
            .collect();

        let mut staged = self.snapshot.clone();
        if let Some(slot) = staged.transaction_mut(id) {
            slot.void();
        }
        staged.transactions.extend(children.clone());
        self.commit(staged)?;
        Ok(children)
    }

    /// Move money between two accounts: creates two linked legs sharing a
    /// transfer group, committed together or not at all.
    pub fn add_transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Money,
        timestamp: DateTime<Utc>,
        note: Option<String>,
    ) -> LedgerResult<TransferOutcome> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation(
                "Transfer amount must be positive".into(),
            ));
        }
        if from == to {
            return Err(LedgerError::Validation(
                "Cannot transfer to the same account".into(),
            ));
        }

        let from_account = self
            .snapshot
            .account(from)
            .ok_or_else(|| LedgerError::account_not_found(from.to_string()))?;
        let to_account = self
            .snapshot
            .account(to)
            .ok_or_else(|| LedgerError::account_not_found(to.to_string()))?;
        for account in [from_account, to_account] {
            if !account.active {
                return Err(LedgerError::Validation(format!(
                    "Account '{}' is inactive and cannot be used for transfers",
                    account.name
                )));
            }
        }
        if from_account.currency != to_account.currency {
            return Err(LedgerError::Validation(format!(
                "Cannot transfer between {} and {} accounts without a conversion",
                from_account.currency, to_account.currency
            )));
        }

        let group = TransferGroupId::new();
        let currency = from_account.currency.clone();

        let mut from_leg = Transaction::new(from, timestamp, -amount, currency.clone());
        from_leg.note = note
            .clone()
            .unwrap_or_else(|| format!("Transfer to {}", to_account.name));
        from_leg.counter_account_id = Some(to);
        from_leg.transfer_group = Some(group);

        let mut to_leg = Transaction::new(to, timestamp, amount, currency);
        to_leg.note = note.unwrap_or_else(|| format!("Transfer from {}", from_account.name));
        to_leg.counter_account_id = Some(from);
        to_leg.transfer_group = Some(group);

        for leg in [&from_leg, &to_leg] {
            leg.validate()
                .map_err(|e| LedgerError::Validation(e.to_string()))?;
        }

        // Both legs stage together; either both commit or neither does.
        let mut staged = self.snapshot.clone();
        staged.transactions.push(from_leg.clone());
        staged.transactions.push(to_leg.clone());
        let warnings = self.commit(staged)?;

        Ok(TransferOutcome {
            from_leg,
            to_leg,
            warnings,
        })
    }
}
