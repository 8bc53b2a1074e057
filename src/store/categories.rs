//! Category operations
//!
//! Categories form a tree; re-parenting is validated against cycles at
//! commit time, and removal follows the soft-void rule: a category still
//! referenced anywhere is archived, never hard-deleted.

use chrono::Utc;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Action, Category, CategoryId, Condition};

use super::Ledger;

impl Ledger {
    /// Create a category, optionally under a parent
    pub fn add_category(
        &mut self,
        name: impl Into<String>,
        parent: Option<CategoryId>,
    ) -> LedgerResult<Category> {
        if let Some(parent_id) = parent {
            if self.snapshot.category(parent_id).is_none() {
                return Err(LedgerError::category_not_found(parent_id.to_string()));
            }
        }

        let category = match parent {
            Some(parent_id) => Category::with_parent(name, parent_id),
            None => Category::new(name),
        };
        category
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        let mut staged = self.snapshot.clone();
        staged.categories.push(category.clone());
        self.commit(staged)?;
        Ok(category)
    }

    /// Rename a category
    pub fn rename_category(
        &mut self,
        id: CategoryId,
        name: impl Into<String>,
    ) -> LedgerResult<()> {
        let name = name.into();
        let mut staged = self.snapshot.clone();
        let category = staged
            .category_mut(id)
            .ok_or_else(|| LedgerError::category_not_found(id.to_string()))?;
        category.name = name;
        category.updated_at = Utc::now();
        category
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;
        self.commit(staged)?;
        Ok(())
    }

    /// Move a category under a new parent (or to the top level).
    /// A move that would create a cycle is rejected with the tree unchanged.
    pub fn set_category_parent(
        &mut self,
        id: CategoryId,
        parent: Option<CategoryId>,
    ) -> LedgerResult<()> {
        if self.snapshot.category(id).is_none() {
            return Err(LedgerError::category_not_found(id.to_string()));
        }
        if let Some(parent_id) = parent {
            if self.snapshot.category(parent_id).is_none() {
                return Err(LedgerError::category_not_found(parent_id.to_string()));
            }
            if parent_id == id {
                return Err(LedgerError::Validation(
                    "Category cannot be its own parent".into(),
                ));
            }
        }

        let mut staged = self.snapshot.clone();
        if let Some(category) = staged.category_mut(id) {
            category.parent_id = parent;
            category.updated_at = Utc::now();
        }
        self.commit(staged)?;
        Ok(())
    }

    /// Remove a category. Hard-deletes only when nothing references it;
    /// otherwise archives it and keeps the references valid. Returns true
    /// when the category was hard-deleted.
    pub fn remove_category(&mut self, id: CategoryId) -> LedgerResult<bool> {
        if self.snapshot.category(id).is_none() {
            return Err(LedgerError::category_not_found(id.to_string()));
        }

        let mut staged = self.snapshot.clone();
        if self.category_is_referenced(id) {
            if let Some(category) = staged.category_mut(id) {
                category.archive();
            }
            self.commit(staged)?;
            Ok(false)
        } else {
            staged.categories.retain(|c| c.id != id);
            self.commit(staged)?;
            Ok(true)
        }
    }

    fn category_is_referenced(&self, id: CategoryId) -> bool {
        let by_transaction = self.snapshot.transactions.iter().any(|t| {
            t.category_id == Some(id) || t.splits.iter().any(|s| s.category_id == id)
        });
        let by_child = self
            .snapshot
            .categories
            .iter()
            .any(|c| c.parent_id == Some(id));
        let by_budget = self.snapshot.budgets.iter().any(|b| b.category_id == id);
        let by_rule = self.snapshot.rules.iter().any(|r| {
            r.conditions
                .iter()
                .any(|c| matches!(c, Condition::CategoryIs { category_id } if *category_id == id))
                || r.actions.iter().any(|a| match a {
                    Action::SetCategory { category_id } => *category_id == id,
                    Action::Split { portions } => {
                        portions.iter().any(|p| p.category_id == id)
                    }
                    _ => false,
                })
        });
        by_transaction || by_child || by_budget || by_rule
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::open_ledger;
    use super::*;
    use crate::models::{AccountKind, Money, Transaction};
    use chrono::TimeZone;

    #[test]
    fn test_add_category_tree() {
        let (_temp_dir, mut ledger) = open_ledger();
        let food = ledger.add_category("Food", None).unwrap();
        let dining = ledger.add_category("Dining", Some(food.id)).unwrap();

        assert_eq!(
            ledger.snapshot().category(dining.id).unwrap().parent_id,
            Some(food.id)
        );
    }

    #[test]
    fn test_reparent_cycle_rejected_tree_unchanged() {
        let (_temp_dir, mut ledger) = open_ledger();
        let food = ledger.add_category("Food", None).unwrap();
        let dining = ledger.add_category("Dining", Some(food.id)).unwrap();
        let coffee = ledger.add_category("Coffee", Some(dining.id)).unwrap();

        // Food under Coffee would close the loop.
        let result = ledger.set_category_parent(food.id, Some(coffee.id));
        assert!(result.unwrap_err().is_integrity());
        assert!(ledger.snapshot().category(food.id).unwrap().parent_id.is_none());
    }

    #[test]
    fn test_remove_unreferenced_category_hard_deletes() {
        let (_temp_dir, mut ledger) = open_ledger();
        let category = ledger.add_category("Temp", None).unwrap();

        assert!(ledger.remove_category(category.id).unwrap());
        assert!(ledger.snapshot().category(category.id).is_none());
    }

    #[test]
    fn test_remove_referenced_category_archives() {
        let (_temp_dir, mut ledger) = open_ledger();
        let account = ledger
            .add_account("Checking", AccountKind::Checking, "USD")
            .unwrap();
        let category = ledger.add_category("Groceries", None).unwrap();
        ledger
            .add_transaction(
                Transaction::new(
                    account.id,
                    chrono::Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap(),
                    Money::from_cents(-4200),
                    "USD",
                )
                .with_category(category.id),
            )
            .unwrap();

        assert!(!ledger.remove_category(category.id).unwrap());
        let kept = ledger.snapshot().category(category.id).unwrap();
        assert!(kept.archived);
    }

    #[test]
    fn test_missing_parent_rejected() {
        let (_temp_dir, mut ledger) = open_ledger();
        let result = ledger.add_category("Orphan", Some(CategoryId::new()));
        assert!(result.unwrap_err().is_not_found());
    }
}
