//! Savings goal model
//!
//! A goal tracks progress toward a target amount, optionally tied to an
//! account and a target date. Goals live in the snapshot alongside budgets.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AccountId, GoalId};
use super::money::Money;

/// A savings goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    /// Unique identifier
    pub id: GoalId,

    /// Goal name (e.g., "Emergency fund")
    pub name: String,

    /// Target amount (positive)
    pub target_amount: Money,

    /// Amount saved so far
    #[serde(default)]
    pub saved_amount: Money,

    /// Optional deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,

    /// Optional account the goal draws progress from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,

    /// Notes about this goal
    #[serde(default)]
    pub notes: String,

    /// When the goal was created
    pub created_at: DateTime<Utc>,

    /// When the goal was last modified
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    /// Create a new goal
    pub fn new(name: impl Into<String>, target_amount: Money) -> Self {
        let now = Utc::now();
        Self {
            id: GoalId::new(),
            name: name.into(),
            target_amount,
            saved_amount: Money::zero(),
            target_date: None,
            account_id: None,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Fraction complete in [0, 1]
    pub fn progress(&self) -> f64 {
        if !self.target_amount.is_positive() {
            return 0.0;
        }
        let ratio = self.saved_amount.cents() as f64 / self.target_amount.cents() as f64;
        ratio.clamp(0.0, 1.0)
    }

    /// Whether the saved amount has reached the target
    pub fn is_complete(&self) -> bool {
        self.saved_amount >= self.target_amount
    }

    /// Validate the goal's own fields
    pub fn validate(&self) -> Result<(), GoalValidationError> {
        if self.name.trim().is_empty() {
            return Err(GoalValidationError::EmptyName);
        }
        if !self.target_amount.is_positive() {
            return Err(GoalValidationError::NonPositiveTarget(self.target_amount));
        }
        Ok(())
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} / {}",
            self.name, self.saved_amount, self.target_amount
        )
    }
}

/// Validation errors for goals
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalValidationError {
    EmptyName,
    NonPositiveTarget(Money),
}

impl fmt::Display for GoalValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Goal name cannot be empty"),
            Self::NonPositiveTarget(amount) => {
                write!(f, "Goal target must be positive, got {}", amount)
            }
        }
    }
}

impl std::error::Error for GoalValidationError {}
