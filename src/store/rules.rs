//! Automation rule management
//!
//! Rules live in the snapshot and run against every transaction write.
//! Adding a rule checks that the entities it references exist, so a rule
//! can never introduce a dangling reference when it later fires. Removing
//! a rule orphans the tags it attached; the commit surfaces those as soft
//! violations and the repair pass drops them.

use chrono::Utc;

use crate::engine::{rules, RuleOutcome, Violation};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Action, AutomationRule, Condition, RuleId, TransactionId};

use super::Ledger;

impl Ledger {
    /// Add an automation rule
    pub fn add_rule(&mut self, rule: AutomationRule) -> LedgerResult<()> {
        rule.validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;
        self.check_rule_references(&rule)?;

        if self.snapshot.rule(rule.id).is_some() {
            return Err(LedgerError::Duplicate {
                entity_type: "Rule",
                identifier: rule.id.to_string(),
            });
        }

        let mut staged = self.snapshot.clone();
        staged.rules.push(rule);
        self.commit(staged)?;
        Ok(())
    }

    /// Replace an existing rule
    pub fn update_rule(&mut self, mut rule: AutomationRule) -> LedgerResult<()> {
        rule.validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;
        self.check_rule_references(&rule)?;
        if self.snapshot.rule(rule.id).is_none() {
            return Err(LedgerError::rule_not_found(rule.id.to_string()));
        }

        rule.updated_at = Utc::now();
        let mut staged = self.snapshot.clone();
        if let Some(slot) = staged.rule_mut(rule.id) {
            *slot = rule;
        }
        self.commit(staged)?;
        Ok(())
    }

    /// Enable or disable a rule
    pub fn set_rule_enabled(&mut self, id: RuleId, enabled: bool) -> LedgerResult<()> {
        let mut staged = self.snapshot.clone();
        let rule = staged
            .rule_mut(id)
            .ok_or_else(|| LedgerError::rule_not_found(id.to_string()))?;
        rule.enabled = enabled;
        rule.updated_at = Utc::now();
        self.commit(staged)?;
        Ok(())
    }

    /// Remove a rule. Tags it attached become orphans; they come back as
    /// soft violations here and the repair pass removes them.
    pub fn remove_rule(&mut self, id: RuleId) -> LedgerResult<Vec<Violation>> {
        if self.snapshot.rule(id).is_none() {
            return Err(LedgerError::rule_not_found(id.to_string()));
        }
        let mut staged = self.snapshot.clone();
        staged.rules.retain(|r| r.id != id);
        self.commit(staged)
    }

    /// Dry-run the rule pipeline against an existing transaction without
    /// committing anything.
    pub fn preview_rules(&self, id: TransactionId) -> LedgerResult<RuleOutcome> {
        let transaction = self
            .snapshot
            .transaction(id)
            .cloned()
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;
        Ok(rules::apply(transaction, &self.snapshot.rules))
    }

    /// A rule that fires must never introduce a dangling reference, so the
    /// categories and accounts it names have to exist up front.
    fn check_rule_references(&self, rule: &AutomationRule) -> LedgerResult<()> {
        for condition in &rule.conditions {
            match condition {
                Condition::CategoryIs { category_id } => {
                    if self.snapshot.category(*category_id).is_none() {
                        return Err(LedgerError::category_not_found(category_id.to_string()));
                    }
                }
                Condition::AccountIs { account_id } => {
                    if self.snapshot.account(*account_id).is_none() {
                        return Err(LedgerError::account_not_found(account_id.to_string()));
                    }
                }
                _ => {}
            }
        }
        for action in &rule.actions {
            match action {
                Action::SetCategory { category_id } => {
                    if self.snapshot.category(*category_id).is_none() {
                        return Err(LedgerError::category_not_found(category_id.to_string()));
                    }
                }
                Action::Split { portions } => {
                    for portion in portions {
                        if self.snapshot.category(portion.category_id).is_none() {
                            return Err(LedgerError::category_not_found(
                                portion.category_id.to_string(),
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::open_ledger;
    use super::*;
    use crate::models::{AccountKind, Money, Transaction};
    use chrono::TimeZone;

    fn sample_transaction(
        ledger: &mut Ledger,
        note: &str,
    ) -> crate::models::Transaction {
        let account = ledger
            .add_account("Checking", AccountKind::Checking, "USD")
            .unwrap();
        ledger
            .add_transaction(
                Transaction::new(
                    account.id,
                    chrono::Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap(),
                    Money::from_cents(-450),
                    "USD",
                )
                .with_note(note),
            )
            .unwrap()
            .transaction
    }

    #[test]
    fn test_rule_referencing_missing_category_rejected() {
        let (_temp_dir, mut ledger) = open_ledger();
        let rule = AutomationRule::new("Bad", 1).with_action(Action::SetCategory {
            category_id: crate::models::CategoryId::new(),
        });
        assert!(ledger.add_rule(rule).unwrap_err().is_not_found());
    }

    #[test]
    fn test_disable_rule_stops_it_firing() {
        let (_temp_dir, mut ledger) = open_ledger();
        let rule = AutomationRule::new("Tagger", 1)
            .with_condition(Condition::NoteContains { text: "cafe".into() })
            .with_action(Action::AddTag { tag: "coffee".into() });
        let rule_id = rule.id;
        ledger.add_rule(rule).unwrap();
        ledger.set_rule_enabled(rule_id, false).unwrap();

        let committed = sample_transaction(&mut ledger, "CAFE LUNA");
        assert!(!committed.has_tag("coffee"));
    }

    #[test]
    fn test_remove_rule_surfaces_orphan_tags_and_repair_drops_them() {
        let (_temp_dir, mut ledger) = open_ledger();
        let rule = AutomationRule::new("Tagger", 1)
            .with_condition(Condition::NoteContains { text: "cafe".into() })
            .with_action(Action::AddTag { tag: "coffee".into() });
        let rule_id = rule.id;
        ledger.add_rule(rule).unwrap();

        let committed = sample_transaction(&mut ledger, "CAFE LUNA");
        assert!(committed.has_tag("coffee"));

        let warnings = ledger.remove_rule(rule_id).unwrap();
        assert!(warnings
            .iter()
            .any(|v| matches!(v, Violation::OrphanRuleTag { .. })));

        let remaining = ledger.run_repair();
        assert!(remaining.is_empty());
        assert!(!ledger
            .snapshot()
            .transaction(committed.id)
            .unwrap()
            .has_tag("coffee"));
    }

    #[test]
    fn test_preview_rules_does_not_commit() {
        let (_temp_dir, mut ledger) = open_ledger();
        let committed = sample_transaction(&mut ledger, "CAFE LUNA");

        let rule = AutomationRule::new("Tagger", 1)
            .with_condition(Condition::NoteContains { text: "cafe".into() })
            .with_action(Action::AddTag { tag: "coffee".into() });
        ledger.add_rule(rule).unwrap();

        let preview = ledger.preview_rules(committed.id).unwrap();
        assert!(preview.transaction.has_tag("coffee"));
        // The committed transaction is untouched.
        assert!(!ledger
            .snapshot()
            .transaction(committed.id)
            .unwrap()
            .has_tag("coffee"));
    }
}
