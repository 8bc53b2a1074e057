//! Automation rule model
//!
//! Rules match incoming transactions against a list of conditions and apply
//! a list of actions on match. Conditions and actions are closed tagged
//! enums so every operator/field combination is handled exhaustively at
//! compile time; there is no free-form field access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AccountId, CategoryId, RuleId};
use super::money::Money;
use super::transaction::SplitPortion;

/// A single match condition. A rule matches when every one of its conditions
/// evaluates true against the transaction's current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Amount equals exactly
    AmountEquals { amount: Money },
    /// Amount strictly greater than
    AmountAbove { amount: Money },
    /// Amount strictly less than
    AmountBelow { amount: Money },
    /// Note equals (case-insensitive)
    NoteEquals { text: String },
    /// Note contains (case-insensitive)
    NoteContains { text: String },
    /// Note matches a regular expression
    NoteMatches { pattern: String },
    /// Categorized as exactly this category
    CategoryIs { category_id: CategoryId },
    /// Belongs to this account
    AccountIs { account_id: AccountId },
    /// Tag set contains a tag with this name
    HasTag { tag: String },
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmountEquals { amount } => write!(f, "amount == {}", amount),
            Self::AmountAbove { amount } => write!(f, "amount > {}", amount),
            Self::AmountBelow { amount } => write!(f, "amount < {}", amount),
            Self::NoteEquals { text } => write!(f, "note == {:?}", text),
            Self::NoteContains { text } => write!(f, "note contains {:?}", text),
            Self::NoteMatches { pattern } => write!(f, "note matches /{}/", pattern),
            Self::CategoryIs { category_id } => write!(f, "category is {}", category_id),
            Self::AccountIs { account_id } => write!(f, "account is {}", account_id),
            Self::HasTag { tag } => write!(f, "has tag {:?}", tag),
        }
    }
}

/// An action applied when a rule matches. Actions apply in list order;
/// across rules, the last writer wins per field, except `FlagForReview`
/// which is monotonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Set the category (clears splits; last writer wins)
    SetCategory { category_id: CategoryId },
    /// Add a tag (no-op if a tag with the name exists)
    AddTag { tag: String },
    /// Replace the note text
    Rename { note: String },
    /// Flag the transaction for review; never cleared by a later rule
    FlagForReview,
    /// Allocate the amount across categories (clears the single category);
    /// portions must sum to the transaction amount
    Split { portions: Vec<SplitPortion> },
    /// Stop evaluating subsequent rules after this rule finishes
    Stop,
}

/// An automation rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRule {
    /// Unique identifier
    pub id: RuleId,

    /// Display name
    pub name: String,

    /// All conditions must hold for the rule to match; an empty list
    /// matches every transaction
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Actions applied in order on match
    #[serde(default)]
    pub actions: Vec<Action>,

    /// Evaluation order: lower numbers run first
    #[serde(default)]
    pub priority: i32,

    /// Disabled rules never participate
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// When the rule was created
    pub created_at: DateTime<Utc>,

    /// When the rule was last modified
    pub updated_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

impl AutomationRule {
    /// Create a new enabled rule with no conditions or actions
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        let now = Utc::now();
        Self {
            id: RuleId::new(),
            name: name.into(),
            conditions: Vec::new(),
            actions: Vec::new(),
            priority,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style condition
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Builder-style action
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Whether any action carries the stop directive
    pub fn has_stop(&self) -> bool {
        self.actions.iter().any(|a| matches!(a, Action::Stop))
    }

    /// Validate the rule's own fields
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        if self.name.trim().is_empty() {
            return Err(RuleValidationError::EmptyName);
        }
        if self.actions.is_empty() {
            return Err(RuleValidationError::NoActions);
        }
        Ok(())
    }
}

impl fmt::Display for AutomationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (priority {})", self.name, self.priority)
    }
}

/// Validation errors for automation rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleValidationError {
    EmptyName,
    NoActions,
}

impl fmt::Display for RuleValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Rule name cannot be empty"),
            Self::NoActions => write!(f, "Rule must have at least one action"),
        }
    }
}

impl std::error::Error for RuleValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let category_id = CategoryId::new();
        let rule = AutomationRule::new("Coffee shops", 10)
            .with_condition(Condition::NoteContains {
                text: "coffee".into(),
            })
            .with_action(Action::SetCategory { category_id })
            .with_action(Action::AddTag {
                tag: "caffeine".into(),
            });

        assert_eq!(rule.conditions.len(), 1);
        assert_eq!(rule.actions.len(), 2);
        assert!(rule.enabled);
        assert!(!rule.has_stop());
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let rule = AutomationRule::new("", 0).with_action(Action::FlagForReview);
        assert_eq!(rule.validate(), Err(RuleValidationError::EmptyName));

        let rule = AutomationRule::new("No actions", 0);
        assert_eq!(rule.validate(), Err(RuleValidationError::NoActions));
    }

    #[test]
    fn test_condition_serde_tagging() {
        let condition = Condition::AmountAbove {
            amount: Money::from_cents(10000),
        };
        let json = serde_json::to_string(&condition).unwrap();
        assert_eq!(json, r#"{"type":"amount_above","amount":10000}"#);

        let back: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, condition);
    }

    #[test]
    fn test_action_serde_tagging() {
        let action = Action::FlagForReview;
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"type":"flag_for_review"}"#);

        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn test_enabled_defaults_true_when_missing() {
        let json = format!(
            r#"{{
                "id": "{}",
                "name": "Legacy rule",
                "priority": 5,
                "created_at": "2025-01-01T00:00:00Z",
                "updated_at": "2025-01-01T00:00:00Z"
            }}"#,
            uuid::Uuid::new_v4()
        );
        let rule: AutomationRule = serde_json::from_str(&json).unwrap();
        assert!(rule.enabled);
        assert!(rule.conditions.is_empty());
    }
}
