//! Versioned snapshot aggregate
//!
//! The snapshot is the unit of persistence: every entity collection plus the
//! schema version, which is declared first so it is the first field written
//! to disk. Collections are plain per-entity sequences; entities reference
//! each other by typed id and are looked up through the accessors here, so
//! there is no pointer graph to keep consistent.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::account::Account;
use super::budget::Budget;
use super::category::Category;
use super::goal::Goal;
use super::ids::{AccountId, BudgetId, CategoryId, GoalId, RuleId, TransactionId, TransferGroupId};
use super::money::Money;
use super::rule::AutomationRule;
use super::transaction::Transaction;

/// Current persisted schema version. Bump together with a new upgrader in
/// the migrate module.
pub const SCHEMA_VERSION: u32 = 4;

/// The full persisted state of the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Declared first so it serializes first
    pub schema_version: u32,

    #[serde(default)]
    pub accounts: Vec<Account>,

    #[serde(default)]
    pub categories: Vec<Category>,

    #[serde(default)]
    pub budgets: Vec<Budget>,

    #[serde(default)]
    pub goals: Vec<Goal>,

    #[serde(default)]
    pub rules: Vec<AutomationRule>,

    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Snapshot {
    /// Create an empty snapshot at the current schema version
    pub fn empty() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            accounts: Vec::new(),
            categories: Vec::new(),
            budgets: Vec::new(),
            goals: Vec::new(),
            rules: Vec::new(),
            transactions: Vec::new(),
        }
    }

    // Lookup accessors. Collections stay small enough in a personal ledger
    // that linear scans are fine here.

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn account_mut(&mut self, id: AccountId) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.id == id)
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn category_mut(&mut self, id: CategoryId) -> Option<&mut Category> {
        self.categories.iter_mut().find(|c| c.id == id)
    }

    pub fn budget(&self, id: BudgetId) -> Option<&Budget> {
        self.budgets.iter().find(|b| b.id == id)
    }

    pub fn budget_mut(&mut self, id: BudgetId) -> Option<&mut Budget> {
        self.budgets.iter_mut().find(|b| b.id == id)
    }

    pub fn goal(&self, id: GoalId) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    pub fn goal_mut(&mut self, id: GoalId) -> Option<&mut Goal> {
        self.goals.iter_mut().find(|g| g.id == id)
    }

    pub fn rule(&self, id: RuleId) -> Option<&AutomationRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn rule_mut(&mut self, id: RuleId) -> Option<&mut AutomationRule> {
        self.rules.iter_mut().find(|r| r.id == id)
    }

    pub fn transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn transaction_mut(&mut self, id: TransactionId) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|t| t.id == id)
    }

    /// All legs of a transfer group, in stored order
    pub fn transfer_legs(&self, group: TransferGroupId) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.transfer_group == Some(group))
            .collect()
    }

    /// Non-voided transactions on an account
    pub fn transactions_for_account(
        &self,
        account_id: AccountId,
    ) -> impl Iterator<Item = &Transaction> {
        self.transactions
            .iter()
            .filter(move |t| t.account_id == account_id && !t.voided)
    }

    /// Sum of all non-voided transaction amounts on an account
    pub fn computed_balance(&self, account_id: AccountId) -> Money {
        self.transactions_for_account(account_id)
            .map(|t| t.amount)
            .sum()
    }

    /// Recompute every account's cached balance from its transactions.
    /// Called before committing any mutation so the balance invariant holds
    /// in every committed snapshot.
    pub fn recompute_balances(&mut self) {
        let balances: Vec<(AccountId, Money)> = self
            .accounts
            .iter()
            .map(|a| (a.id, self.computed_balance(a.id)))
            .collect();
        for (id, balance) in balances {
            if let Some(account) = self.account_mut(id) {
                account.balance = balance;
            }
        }
    }

    /// A category plus all its descendants, walking parent links.
    /// Cycle-safe: each category is visited at most once.
    pub fn category_with_descendants(&self, id: CategoryId) -> Vec<CategoryId> {
        let mut result = vec![id];
        let mut seen: HashSet<CategoryId> = HashSet::from([id]);
        let mut cursor = 0;
        while cursor < result.len() {
            let current = result[cursor];
            cursor += 1;
            for child in self
                .categories
                .iter()
                .filter(|c| c.parent_id == Some(current))
            {
                if seen.insert(child.id) {
                    result.push(child.id);
                }
            }
        }
        result
    }

    /// Whether following parent links from `id` ever revisits a category
    pub fn category_in_cycle(&self, id: CategoryId) -> bool {
        let mut seen: HashSet<CategoryId> = HashSet::new();
        let mut current = Some(id);
        while let Some(cat_id) = current {
            if !seen.insert(cat_id) {
                return true;
            }
            current = self.category(cat_id).and_then(|c| c.parent_id);
        }
        false
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
