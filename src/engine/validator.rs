//! Cross-entity integrity checking
//!
//! Pure functions over a snapshot: `validate` reports violations, `repair`
//! applies only deterministic, non-destructive fixes (recompute cached
//! balances, drop rule-generated orphan tags) and reports everything it
//! cannot fix rather than guessing. Callers block mutations on hard
//! violations and surface soft ones as warnings.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::{
    AccountId, BudgetId, CategoryId, GoalId, Money, RuleId, Snapshot, TransactionId,
    TransferGroupId,
};

/// Whether a violation blocks the mutation or is warn-and-continue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Hard,
    Soft,
}

/// A single integrity violation found in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Two entities in one collection share an identifier
    DuplicateId { id: String },

    /// Transaction references a missing account
    MissingAccount {
        transaction_id: TransactionId,
        account_id: AccountId,
    },

    /// Transfer leg references a missing counter account
    MissingCounterAccount {
        transaction_id: TransactionId,
        account_id: AccountId,
    },

    /// Transaction references a missing category
    MissingCategory {
        transaction_id: TransactionId,
        category_id: CategoryId,
    },

    /// Split portion references a missing category
    MissingSplitCategory {
        transaction_id: TransactionId,
        category_id: CategoryId,
    },

    /// Category references a missing parent
    MissingParentCategory {
        category_id: CategoryId,
        parent_id: CategoryId,
    },

    /// Budget references a missing category
    MissingBudgetCategory {
        budget_id: BudgetId,
        category_id: CategoryId,
    },

    /// Category participates in a parent cycle
    CategoryCycle { category_id: CategoryId },

    /// Transaction amount is zero
    ZeroAmount { transaction_id: TransactionId },

    /// Split portions do not sum to the transaction amount
    SplitMismatch { transaction_id: TransactionId },

    /// A transfer group does not have exactly two legs
    TransferLegCount {
        transfer_group: TransferGroupId,
        legs: usize,
    },

    /// A transfer's legs do not cancel out
    TransferImbalance {
        transfer_group: TransferGroupId,
        total: Money,
    },

    /// One transfer leg is voided and the other is not
    HalfVoidTransfer { transfer_group: TransferGroupId },

    /// Cached account balance disagrees with its transactions
    BalanceDrift {
        account_id: AccountId,
        cached: Money,
        actual: Money,
    },

    /// Tag attached by a rule that no longer exists
    OrphanRuleTag {
        transaction_id: TransactionId,
        tag: String,
    },

    /// Goal references a missing account
    MissingGoalAccount {
        goal_id: GoalId,
        account_id: AccountId,
    },
}

impl Violation {
    /// Classify the violation
    pub fn severity(&self) -> Severity {
        match self {
            Self::DuplicateId { .. }
            | Self::MissingAccount { .. }
            | Self::MissingCounterAccount { .. }
            | Self::MissingCategory { .. }
            | Self::MissingSplitCategory { .. }
            | Self::MissingParentCategory { .. }
            | Self::MissingBudgetCategory { .. }
            | Self::CategoryCycle { .. }
            | Self::ZeroAmount { .. }
            | Self::SplitMismatch { .. }
            | Self::TransferLegCount { .. }
            | Self::TransferImbalance { .. }
            | Self::HalfVoidTransfer { .. } => Severity::Hard,
            Self::BalanceDrift { .. }
            | Self::OrphanRuleTag { .. }
            | Self::MissingGoalAccount { .. } => Severity::Soft,
        }
    }

    /// Whether this violation blocks a mutation
    pub fn is_hard(&self) -> bool {
        self.severity() == Severity::Hard
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId { id } => write!(f, "duplicate identifier {}", id),
            Self::MissingAccount {
                transaction_id,
                account_id,
            } => write!(
                f,
                "transaction {} references missing account {}",
                transaction_id, account_id
            ),
            Self::MissingCounterAccount {
                transaction_id,
                account_id,
            } => write!(
                f,
                "transfer leg {} references missing counter account {}",
                transaction_id, account_id
            ),
            Self::MissingCategory {
                transaction_id,
                category_id,
            } => write!(
                f,
                "transaction {} references missing category {}",
                transaction_id, category_id
            ),
            Self::MissingSplitCategory {
                transaction_id,
                category_id,
            } => write!(
                f,
                "split on transaction {} references missing category {}",
                transaction_id, category_id
            ),
            Self::MissingParentCategory {
                category_id,
                parent_id,
            } => write!(
                f,
                "category {} references missing parent {}",
                category_id, parent_id
            ),
            Self::MissingBudgetCategory {
                budget_id,
                category_id,
            } => write!(
                f,
                "budget {} references missing category {}",
                budget_id, category_id
            ),
            Self::CategoryCycle { category_id } => {
                write!(f, "category {} is part of a parent cycle", category_id)
            }
            Self::ZeroAmount { transaction_id } => {
                write!(f, "transaction {} has a zero amount", transaction_id)
            }
            Self::SplitMismatch { transaction_id } => write!(
                f,
                "split portions on transaction {} do not sum to its amount",
                transaction_id
            ),
            Self::TransferLegCount {
                transfer_group,
                legs,
            } => write!(
                f,
                "transfer group {} has {} leg(s), expected 2",
                transfer_group, legs
            ),
            Self::TransferImbalance {
                transfer_group,
                total,
            } => write!(
                f,
                "transfer group {} legs sum to {}, expected zero",
                transfer_group, total
            ),
            Self::HalfVoidTransfer { transfer_group } => write!(
                f,
                "transfer group {} has one voided leg and one live leg",
                transfer_group
            ),
            Self::BalanceDrift {
                account_id,
                cached,
                actual,
            } => write!(
                f,
                "account {} cached balance {} drifted from actual {}",
                account_id, cached, actual
            ),
            Self::OrphanRuleTag {
                transaction_id,
                tag,
            } => write!(
                f,
                "transaction {} carries tag {:?} from a removed rule",
                transaction_id, tag
            ),
            Self::MissingGoalAccount {
                goal_id,
                account_id,
            } => write!(
                f,
                "goal {} references missing account {}",
                goal_id, account_id
            ),
        }
    }
}

/// Check every cross-entity invariant in the snapshot
pub fn validate(snapshot: &Snapshot) -> Vec<Violation> {
    let mut violations = Vec::new();

    check_duplicate_ids(snapshot, &mut violations);

    let account_ids: HashSet<AccountId> = snapshot.accounts.iter().map(|a| a.id).collect();
    let category_ids: HashSet<CategoryId> = snapshot.categories.iter().map(|c| c.id).collect();
    let rule_ids: HashSet<RuleId> = snapshot.rules.iter().map(|r| r.id).collect();

    for category in &snapshot.categories {
        if let Some(parent_id) = category.parent_id {
            if !category_ids.contains(&parent_id) {
                violations.push(Violation::MissingParentCategory {
                    category_id: category.id,
                    parent_id,
                });
            }
        }
        if snapshot.category_in_cycle(category.id) {
            violations.push(Violation::CategoryCycle {
                category_id: category.id,
            });
        }
    }

    for budget in &snapshot.budgets {
        if !category_ids.contains(&budget.category_id) {
            violations.push(Violation::MissingBudgetCategory {
                budget_id: budget.id,
                category_id: budget.category_id,
            });
        }
    }

    for goal in &snapshot.goals {
        if let Some(account_id) = goal.account_id {
            if !account_ids.contains(&account_id) {
                violations.push(Violation::MissingGoalAccount {
                    goal_id: goal.id,
                    account_id,
                });
            }
        }
    }

    for txn in &snapshot.transactions {
        if !account_ids.contains(&txn.account_id) {
            violations.push(Violation::MissingAccount {
                transaction_id: txn.id,
                account_id: txn.account_id,
            });
        }
        if let Some(counter) = txn.counter_account_id {
            if !account_ids.contains(&counter) {
                violations.push(Violation::MissingCounterAccount {
                    transaction_id: txn.id,
                    account_id: counter,
                });
            }
        }
        if let Some(category_id) = txn.category_id {
            if !category_ids.contains(&category_id) {
                violations.push(Violation::MissingCategory {
                    transaction_id: txn.id,
                    category_id,
                });
            }
        }
        for split in &txn.splits {
            if !category_ids.contains(&split.category_id) {
                violations.push(Violation::MissingSplitCategory {
                    transaction_id: txn.id,
                    category_id: split.category_id,
                });
            }
        }
        if txn.amount.is_zero() {
            violations.push(Violation::ZeroAmount {
                transaction_id: txn.id,
            });
        }
        if !txn.splits.is_empty() && txn.splits_total() != txn.amount {
            violations.push(Violation::SplitMismatch {
                transaction_id: txn.id,
            });
        }
        for tag in &txn.tags {
            if let Some(rule_id) = tag.rule_id {
                if !rule_ids.contains(&rule_id) {
                    violations.push(Violation::OrphanRuleTag {
                        transaction_id: txn.id,
                        tag: tag.name.clone(),
                    });
                }
            }
        }
    }

    check_transfer_groups(snapshot, &mut violations);

    for account in &snapshot.accounts {
        let actual = snapshot.computed_balance(account.id);
        if account.balance != actual {
            violations.push(Violation::BalanceDrift {
                account_id: account.id,
                cached: account.balance,
                actual,
            });
        }
    }

    violations
}

/// Apply deterministic repairs, then report everything still wrong.
///
/// Fixes: recompute cached balances, drop tags whose source rule no longer
/// exists. Dangling references, cycles, and transfer mismatches are left as
/// reported violations. Repairing twice yields the same snapshot as once.
pub fn repair(mut snapshot: Snapshot) -> (Snapshot, Vec<Violation>) {
    let rule_ids: HashSet<RuleId> = snapshot.rules.iter().map(|r| r.id).collect();
    for txn in &mut snapshot.transactions {
        txn.tags
            .retain(|tag| tag.rule_id.map_or(true, |id| rule_ids.contains(&id)));
    }

    snapshot.recompute_balances();

    let remaining = validate(&snapshot);
    (snapshot, remaining)
}

fn check_duplicate_ids(snapshot: &Snapshot, violations: &mut Vec<Violation>) {
    fn check<I: Iterator<Item = uuid::Uuid>>(iter: I, violations: &mut Vec<Violation>) {
        let mut seen = HashSet::new();
        for id in iter {
            if !seen.insert(id) {
                violations.push(Violation::DuplicateId { id: id.to_string() });
            }
        }
    }

    check(snapshot.accounts.iter().map(|a| *a.id.as_uuid()), violations);
    check(
        snapshot.categories.iter().map(|c| *c.id.as_uuid()),
        violations,
    );
    check(snapshot.budgets.iter().map(|b| *b.id.as_uuid()), violations);
    check(snapshot.goals.iter().map(|g| *g.id.as_uuid()), violations);
    check(snapshot.rules.iter().map(|r| *r.id.as_uuid()), violations);
    check(
        snapshot.transactions.iter().map(|t| *t.id.as_uuid()),
        violations,
    );
}

fn check_transfer_groups(snapshot: &Snapshot, violations: &mut Vec<Violation>) {
    let mut groups: HashMap<TransferGroupId, Vec<&crate::models::Transaction>> = HashMap::new();
    for txn in &snapshot.transactions {
        if let Some(group) = txn.transfer_group {
            groups.entry(group).or_default().push(txn);
        }
    }

    let mut ordered: Vec<_> = groups.into_iter().collect();
    ordered.sort_by_key(|(group, _)| *group);

    for (group, legs) in ordered {
        if legs.len() != 2 {
            violations.push(Violation::TransferLegCount {
                transfer_group: group,
                legs: legs.len(),
            });
            continue;
        }
        let (a, b) = (legs[0], legs[1]);
        if a.voided != b.voided {
            violations.push(Violation::HalfVoidTransfer {
                transfer_group: group,
            });
        }
        if a.currency == b.currency {
            let total = a.amount + b.amount;
            if !total.is_zero() {
                violations.push(Violation::TransferImbalance {
                    transfer_group: group,
                    total,
                });
            }
        } else {
            // Without an exchange-rate source the best cross-currency check
            // is that the legs point in opposite directions.
            if a.amount.is_positive() == b.amount.is_positive() {
                violations.push(Violation::TransferImbalance {
                    transfer_group: group,
                    total: a.amount + b.amount,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Account, AccountKind, AutomationRule, Category, Money, Snapshot, Tag, Transaction,
        TransferGroupId,
    };
    use chrono::{DateTime, TimeZone, Utc};

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    fn snapshot_with_account() -> (Snapshot, crate::models::AccountId) {
        let mut snapshot = Snapshot::empty();
        let account = Account::new("Checking", AccountKind::Checking, "USD");
        let id = account.id;
        snapshot.accounts.push(account);
        (snapshot, id)
    }

    #[test]
    fn test_clean_snapshot_validates() {
        let (mut snapshot, account_id) = snapshot_with_account();
        snapshot
            .transactions
            .push(Transaction::new(account_id, ts(), Money::from_cents(-500), "USD"));
        snapshot.recompute_balances();
        assert!(validate(&snapshot).is_empty());
    }

    #[test]
    fn test_dangling_account_is_hard() {
        let mut snapshot = Snapshot::empty();
        snapshot.transactions.push(Transaction::new(
            crate::models::AccountId::new(),
            ts(),
            Money::from_cents(-500),
            "USD",
        ));
        let violations = validate(&snapshot);
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::MissingAccount { .. }) && v.is_hard()));
    }

    #[test]
    fn test_balance_drift_is_soft_and_repairable() {
        let (mut snapshot, account_id) = snapshot_with_account();
        snapshot
            .transactions
            .push(Transaction::new(account_id, ts(), Money::from_cents(-500), "USD"));
        // Cached balance left stale on purpose.
        let violations = validate(&snapshot);
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::BalanceDrift { .. }) && !v.is_hard()));

        let (repaired, remaining) = repair(snapshot);
        assert!(remaining.is_empty());
        assert_eq!(
            repaired.account(account_id).unwrap().balance,
            Money::from_cents(-500)
        );
    }

    #[test]
    fn test_repair_is_idempotent() {
        let (mut snapshot, account_id) = snapshot_with_account();
        snapshot
            .transactions
            .push(Transaction::new(account_id, ts(), Money::from_cents(-500), "USD"));
        let (once, _) = repair(snapshot);
        let (twice, remaining) = repair(once.clone());
        assert!(remaining.is_empty());
        assert_eq!(
            serde_json::to_string(&once).unwrap(),
            serde_json::to_string(&twice).unwrap()
        );
    }

    #[test]
    fn test_orphan_rule_tag_dropped_by_repair() {
        let (mut snapshot, account_id) = snapshot_with_account();
        let live_rule = AutomationRule::new("Live", 1);
        let live_id = live_rule.id;
        snapshot.rules.push(live_rule);

        let mut txn = Transaction::new(account_id, ts(), Money::from_cents(-500), "USD");
        txn.add_tag(Tag::from_rule("kept", live_id));
        txn.add_tag(Tag::from_rule("orphan", crate::models::RuleId::new()));
        txn.add_tag(Tag::manual("mine"));
        snapshot.transactions.push(txn);
        snapshot.recompute_balances();

        let violations = validate(&snapshot);
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::OrphanRuleTag { .. })));

        let (repaired, remaining) = repair(snapshot);
        assert!(remaining.is_empty());
        let tags: Vec<_> = repaired.transactions[0]
            .tags
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(tags, vec!["kept", "mine"]);
    }

    #[test]
    fn test_transfer_imbalance_detected() {
        let (mut snapshot, from_id) = snapshot_with_account();
        let to = Account::new("Savings", AccountKind::Savings, "USD");
        let to_id = to.id;
        snapshot.accounts.push(to);

        let group = TransferGroupId::new();
        let mut out_leg = Transaction::new(from_id, ts(), Money::from_cents(-5000), "USD");
        out_leg.transfer_group = Some(group);
        out_leg.counter_account_id = Some(to_id);
        let mut in_leg = Transaction::new(to_id, ts(), Money::from_cents(4000), "USD");
        in_leg.transfer_group = Some(group);
        in_leg.counter_account_id = Some(from_id);
        snapshot.transactions.extend([out_leg, in_leg]);
        snapshot.recompute_balances();

        let violations = validate(&snapshot);
        assert!(violations.iter().any(|v| matches!(
            v,
            Violation::TransferImbalance { total, .. } if *total == Money::from_cents(-1000)
        )));
    }

    #[test]
    fn test_half_void_transfer_detected() {
        let (mut snapshot, from_id) = snapshot_with_account();
        let to = Account::new("Savings", AccountKind::Savings, "USD");
        let to_id = to.id;
        snapshot.accounts.push(to);

        let group = TransferGroupId::new();
        let mut out_leg = Transaction::new(from_id, ts(), Money::from_cents(-5000), "USD");
        out_leg.transfer_group = Some(group);
        out_leg.void();
        let mut in_leg = Transaction::new(to_id, ts(), Money::from_cents(5000), "USD");
        in_leg.transfer_group = Some(group);
        snapshot.transactions.extend([out_leg, in_leg]);
        snapshot.recompute_balances();

        let violations = validate(&snapshot);
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::HalfVoidTransfer { .. })));
    }

    #[test]
    fn test_category_cycle_detected() {
        let mut snapshot = Snapshot::empty();
        let mut a = Category::new("A");
        let mut b = Category::new("B");
        let (a_id, b_id) = (a.id, b.id);
        a.parent_id = Some(b_id);
        b.parent_id = Some(a_id);
        snapshot.categories.extend([a, b]);

        let violations = validate(&snapshot);
        let cycle_count = violations
            .iter()
            .filter(|v| matches!(v, Violation::CategoryCycle { .. }))
            .count();
        assert_eq!(cycle_count, 2);
    }

    #[test]
    fn test_duplicate_id_detected() {
        let (mut snapshot, account_id) = snapshot_with_account();
        let txn = Transaction::new(account_id, ts(), Money::from_cents(-500), "USD");
        let clone = txn.clone();
        snapshot.transactions.push(txn);
        snapshot.transactions.push(clone);
        snapshot.recompute_balances();

        let violations = validate(&snapshot);
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::DuplicateId { .. })));
    }
}
