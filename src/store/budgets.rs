//! Budget operations
//!
//! One budget per category. Spending counts every non-voided transaction
//! categorized under the budget's category or any of its descendants,
//! including split portions. Rollover walks the period windows from the
//! budget's creation forward, carrying unspent room or overspend debt
//! according to the policy.

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Budget, BudgetId, CategoryId, Money, Period, RolloverPolicy};

use super::Ledger;

/// Walking more windows than this means a corrupt created_at; bail out.
const MAX_ROLLOVER_WINDOWS: usize = 10_000;

/// A budget's standing within one period window
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetStatus {
    pub budget_id: BudgetId,

    /// Start of the window containing the queried instant
    pub window_start: DateTime<Utc>,

    /// Start of the next window
    pub window_end: DateTime<Utc>,

    /// Outflow charged against the budget in this window
    pub spent: Money,

    /// Amount carried in from previous windows per the rollover policy
    pub carried: Money,

    /// limit + carried - spent; negative when overspent
    pub available: Money,
}

impl Ledger {
    /// Create or update the budget for a category
    pub fn set_budget(
        &mut self,
        category_id: CategoryId,
        period: Period,
        limit: Money,
        rollover: RolloverPolicy,
    ) -> LedgerResult<Budget> {
        if self.snapshot.category(category_id).is_none() {
            return Err(LedgerError::category_not_found(category_id.to_string()));
        }

        let mut staged = self.snapshot.clone();
        let budget = match staged.budgets.iter_mut().find(|b| b.category_id == category_id) {
            Some(existing) => {
                existing.period = period;
                existing.limit = limit;
                existing.rollover = rollover;
                existing.updated_at = Utc::now();
                existing.clone()
            }
            None => {
                let mut budget = Budget::new(category_id, period, limit);
                budget.rollover = rollover;
                staged.budgets.push(budget.clone());
                if let Some(category) = staged.category_mut(category_id) {
                    category.budget_id = Some(budget.id);
                }
                budget
            }
        };
        budget
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.commit(staged)?;
        Ok(budget)
    }

    /// Remove a budget and clear the category back-reference
    pub fn remove_budget(&mut self, id: BudgetId) -> LedgerResult<()> {
        let budget = self
            .snapshot
            .budget(id)
            .ok_or_else(|| LedgerError::budget_not_found(id.to_string()))?;
        let category_id = budget.category_id;

        let mut staged = self.snapshot.clone();
        staged.budgets.retain(|b| b.id != id);
        if let Some(category) = staged.category_mut(category_id) {
            if category.budget_id == Some(id) {
                category.budget_id = None;
            }
        }
        self.commit(staged)?;
        Ok(())
    }

    /// The budget's standing in the window containing `at`
    pub fn budget_status(&self, id: BudgetId, at: DateTime<Utc>) -> LedgerResult<BudgetStatus> {
        let budget = self
            .snapshot
            .budget(id)
            .ok_or_else(|| LedgerError::budget_not_found(id.to_string()))?;

        let categories: std::collections::HashSet<CategoryId> = self
            .snapshot
            .category_with_descendants(budget.category_id)
            .into_iter()
            .collect();

        let window_start = budget.period.window_start(at);
        let window_end = budget.period.next_window_start(at);
        let carried = self.carried_into(budget, window_start, &categories);
        let spent = self.spent_between(&categories, window_start, window_end);

        Ok(BudgetStatus {
            budget_id: id,
            window_start,
            window_end,
            spent,
            carried,
            available: budget.limit + carried - spent,
        })
    }

    /// Fold the rollover policy over every window from the budget's
    /// creation up to (not including) `target_start`.
    fn carried_into(
        &self,
        budget: &Budget,
        target_start: DateTime<Utc>,
        categories: &std::collections::HashSet<CategoryId>,
    ) -> Money {
        if budget.rollover == RolloverPolicy::None {
            return Money::zero();
        }

        let mut carry = Money::zero();
        let mut cursor = budget.period.window_start(budget.created_at);
        let mut steps = 0;
        while cursor < target_start && steps < MAX_ROLLOVER_WINDOWS {
            let next = budget.period.next_window_start(cursor);
            let spent = self.spent_between(categories, cursor, next);
            let leftover = budget.limit + carry - spent;
            carry = match budget.rollover {
                RolloverPolicy::None => Money::zero(),
                RolloverPolicy::CarryUnspent => {
                    if leftover.is_positive() {
                        leftover
                    } else {
                        Money::zero()
                    }
                }
                RolloverPolicy::CarryOverspend => {
                    if leftover.is_negative() {
                        leftover
                    } else {
                        Money::zero()
                    }
                }
            };
            cursor = next;
            steps += 1;
        }
        carry
    }

    /// Outflow charged to the given categories in [start, end). Inflows
    /// (refunds) reduce the figure; split portions count individually.
    fn spent_between(
        &self,
        categories: &std::collections::HashSet<CategoryId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Money {
        let mut total = Money::zero();
        for txn in self
            .snapshot
            .transactions
            .iter()
            .filter(|t| !t.voided && t.timestamp >= start && t.timestamp < end)
        {
            if txn.splits.is_empty() {
                if let Some(category_id) = txn.category_id {
                    if categories.contains(&category_id) {
                        total += txn.amount;
                    }
                }
            } else {
                for portion in &txn.splits {
                    if categories.contains(&portion.category_id) {
                        total += portion.amount;
                    }
                }
            }
        }
        -total
    }
}
