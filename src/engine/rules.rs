//! Automation rule application
//!
//! Applies enabled rules to a transaction in ascending priority order. Each
//! rule's conditions are evaluated against the transaction's *current* state,
//! so an earlier rule's actions are visible to later rules. Across rules the
//! last writer wins per field, except the review flag which is monotonic.
//! A malformed rule is skipped with a warning and never aborts processing.

use std::collections::HashMap;

use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::models::{Action, AutomationRule, Condition, RuleId, Tag, Transaction};

/// A non-fatal problem while evaluating one rule. The rule was skipped (or
/// one action was); the transaction and the remaining rules proceed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleWarning {
    pub rule_id: RuleId,
    pub message: String,
}

/// Result of running the rule pipeline over one transaction
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    /// The transaction after all matching rules ran
    pub transaction: Transaction,

    /// Rules that matched and applied, in evaluation order
    pub applied: Vec<RuleId>,

    /// Rules (or single actions) that were skipped as malformed
    pub warnings: Vec<RuleWarning>,
}

/// Apply `rules` to `transaction`.
///
/// Rules run in ascending priority order (ties broken by id so evaluation
/// order is stable); disabled rules never participate. Evaluation stops
/// early only when a matching rule carries an explicit [`Action::Stop`];
/// the stopping rule's remaining actions still apply.
pub fn apply(transaction: Transaction, rules: &[AutomationRule]) -> RuleOutcome {
    let mut ordered: Vec<&AutomationRule> = rules.iter().filter(|r| r.enabled).collect();
    ordered.sort_by_key(|r| (r.priority, r.id));

    let mut outcome = RuleOutcome {
        transaction,
        applied: Vec::new(),
        warnings: Vec::new(),
    };
    let mut regex_cache: HashMap<&str, Regex> = HashMap::new();

    'rules: for rule in ordered {
        let matched = match rule_matches(rule, &outcome.transaction, &mut regex_cache) {
            Ok(matched) => matched,
            Err(message) => {
                warn!(rule = %rule.name, %message, "skipping malformed rule");
                outcome.warnings.push(RuleWarning {
                    rule_id: rule.id,
                    message,
                });
                continue;
            }
        };
        if !matched {
            continue;
        }

        outcome.applied.push(rule.id);
        let mut stop = false;
        for action in &rule.actions {
            match action {
                Action::SetCategory { category_id } => {
                    outcome.transaction.set_category(*category_id);
                }
                Action::AddTag { tag } => {
                    outcome.transaction.add_tag(Tag::from_rule(tag.clone(), rule.id));
                }
                Action::Rename { note } => {
                    outcome.transaction.note = note.clone();
                }
                Action::FlagForReview => {
                    outcome.transaction.flag_for_review();
                }
                Action::Split { portions } => {
                    let total: crate::models::Money =
                        portions.iter().map(|p| p.amount).sum();
                    if total != outcome.transaction.amount {
                        let message = format!(
                            "split portions sum to {}, transaction amount is {}",
                            total, outcome.transaction.amount
                        );
                        warn!(rule = %rule.name, %message, "skipping split action");
                        outcome.warnings.push(RuleWarning {
                            rule_id: rule.id,
                            message,
                        });
                        continue;
                    }
                    outcome.transaction.category_id = None;
                    outcome.transaction.splits = portions.clone();
                }
                Action::Stop => {
                    stop = true;
                }
            }
        }
        if stop {
            break 'rules;
        }
    }

    outcome
}

/// Whether every condition of the rule holds. An error means the rule is
/// malformed (e.g., an invalid regex) and must be skipped.
fn rule_matches<'a>(
    rule: &'a AutomationRule,
    transaction: &Transaction,
    regex_cache: &mut HashMap<&'a str, Regex>,
) -> Result<bool, String> {
    for condition in &rule.conditions {
        if !condition_holds(condition, transaction, regex_cache)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn condition_holds<'a>(
    condition: &'a Condition,
    transaction: &Transaction,
    regex_cache: &mut HashMap<&'a str, Regex>,
) -> Result<bool, String> {
    Ok(match condition {
        Condition::AmountEquals { amount } => transaction.amount == *amount,
        Condition::AmountAbove { amount } => transaction.amount > *amount,
        Condition::AmountBelow { amount } => transaction.amount < *amount,
        Condition::NoteEquals { text } => {
            transaction.note.eq_ignore_ascii_case(text)
        }
        Condition::NoteContains { text } => transaction
            .note
            .to_lowercase()
            .contains(&text.to_lowercase()),
        Condition::NoteMatches { pattern } => {
            let regex = match regex_cache.entry(pattern.as_str()) {
                std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
                std::collections::hash_map::Entry::Vacant(entry) => {
                    let compiled = Regex::new(pattern)
                        .map_err(|e| format!("invalid regex {:?}: {}", pattern, e))?;
                    entry.insert(compiled)
                }
            };
            regex.is_match(&transaction.note)
        }
        Condition::CategoryIs { category_id } => {
            transaction.category_id == Some(*category_id)
        }
        Condition::AccountIs { account_id } => transaction.account_id == *account_id,
        Condition::HasTag { tag } => transaction.has_tag(tag),
    })
}
