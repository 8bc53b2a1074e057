//! Goal operations

use chrono::Utc;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Goal, GoalId, Money};

use super::Ledger;

impl Ledger {
    /// Add a savings goal. A linked account must exist at creation time.
    pub fn add_goal(&mut self, goal: Goal) -> LedgerResult<Goal> {
        goal.validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;
        if let Some(account_id) = goal.account_id {
            if self.snapshot.account(account_id).is_none() {
                return Err(LedgerError::account_not_found(account_id.to_string()));
            }
        }

        let mut staged = self.snapshot.clone();
        staged.goals.push(goal.clone());
        self.commit(staged)?;
        Ok(goal)
    }

    /// Record progress toward a goal
    pub fn update_goal_progress(&mut self, id: GoalId, saved: Money) -> LedgerResult<()> {
        if saved.is_negative() {
            return Err(LedgerError::Validation(
                "Saved amount cannot be negative".into(),
            ));
        }

        let mut staged = self.snapshot.clone();
        let goal = staged
            .goal_mut(id)
            .ok_or_else(|| LedgerError::goal_not_found(id.to_string()))?;
        goal.saved_amount = saved;
        goal.updated_at = Utc::now();
        self.commit(staged)?;
        Ok(())
    }

    /// Remove a goal. Nothing references goals, so removal is always a
    /// hard delete.
    pub fn remove_goal(&mut self, id: GoalId) -> LedgerResult<()> {
        if self.snapshot.goal(id).is_none() {
            return Err(LedgerError::goal_not_found(id.to_string()));
        }
        let mut staged = self.snapshot.clone();
        staged.goals.retain(|g| g.id != id);
        self.commit(staged)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::open_ledger;
    use super::*;
    use crate::models::AccountKind;

    #[test]
    fn test_goal_lifecycle() {
        let (_temp_dir, mut ledger) = open_ledger();
        let account = ledger
            .add_account("Savings", AccountKind::Savings, "USD")
            .unwrap();

        let mut goal = Goal::new("Emergency fund", Money::from_cents(500000));
        goal.account_id = Some(account.id);
        let goal = ledger.add_goal(goal).unwrap();

        ledger
            .update_goal_progress(goal.id, Money::from_cents(125000))
            .unwrap();
        let stored = ledger.snapshot().goal(goal.id).unwrap();
        assert_eq!(stored.saved_amount, Money::from_cents(125000));
        assert!((stored.progress() - 0.25).abs() < f64::EPSILON);

        ledger.remove_goal(goal.id).unwrap();
        assert!(ledger.snapshot().goals.is_empty());
    }

    #[test]
    fn test_goal_with_missing_account_rejected() {
        let (_temp_dir, mut ledger) = open_ledger();
        let mut goal = Goal::new("Orphan", Money::from_cents(1000));
        goal.account_id = Some(crate::models::AccountId::new());

        assert!(ledger.add_goal(goal).unwrap_err().is_not_found());
    }

    #[test]
    fn test_negative_progress_rejected() {
        let (_temp_dir, mut ledger) = open_ledger();
        let goal = ledger
            .add_goal(Goal::new("Fund", Money::from_cents(1000)))
            .unwrap();
        assert!(matches!(
            ledger.update_goal_progress(goal.id, Money::from_cents(-1)),
            Err(LedgerError::Validation(_))
        ));
    }
}
