//! Budget model
//!
//! A budget caps spending in one category over a recurring period. Rollover
//! policies carry unspent room (or overspend debt) from one period window
//! into the next.

use chrono::{DateTime, Datelike, Days, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{BudgetId, CategoryId};
use super::money::Money;

/// Recurring budget interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// ISO weeks, Monday to Sunday
    Weekly,
    /// Calendar months
    #[default]
    Monthly,
    /// Calendar years
    Yearly,
}

impl Period {
    /// The start of the period window containing `at` (UTC)
    pub fn window_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let date = at.date_naive();
        let start = match self {
            Self::Weekly => {
                let back = date.weekday().num_days_from_monday() as u64;
                date.checked_sub_days(Days::new(back)).unwrap_or(date)
            }
            Self::Monthly => date.with_day(1).unwrap_or(date),
            Self::Yearly => date.with_day(1).and_then(|d| d.with_month(1)).unwrap_or(date),
        };
        Utc.from_utc_datetime(&start.and_time(chrono::NaiveTime::MIN))
    }

    /// The start of the period window immediately after the one containing `at`
    pub fn next_window_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let start = self.window_start(at);
        match self {
            Self::Weekly => start + chrono::Duration::days(7),
            Self::Monthly => start
                .checked_add_months(Months::new(1))
                .unwrap_or(start),
            Self::Yearly => start
                .checked_add_months(Months::new(12))
                .unwrap_or(start),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
        }
    }
}

/// What happens to the gap between limit and spending when a period ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RolloverPolicy {
    /// Every period starts fresh at the limit
    #[default]
    None,
    /// Unspent room carries into the next period; overspend is forgiven
    CarryUnspent,
    /// Overspend reduces the next period; unspent room is forfeited
    CarryOverspend,
}

/// A spending cap on one category over a recurring period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    /// Unique identifier
    pub id: BudgetId,

    /// The category this budget caps
    pub category_id: CategoryId,

    /// Recurring interval
    #[serde(default)]
    pub period: Period,

    /// Spending limit per period (positive)
    pub limit: Money,

    /// Rollover policy between periods
    #[serde(default)]
    pub rollover: RolloverPolicy,

    /// When the budget was created; rollover accrual starts here
    pub created_at: DateTime<Utc>,

    /// When the budget was last modified
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    /// Create a new budget
    pub fn new(category_id: CategoryId, period: Period, limit: Money) -> Self {
        let now = Utc::now();
        Self {
            id: BudgetId::new(),
            category_id,
            period,
            limit,
            rollover: RolloverPolicy::None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate the budget's own fields
    pub fn validate(&self) -> Result<(), BudgetValidationError> {
        if !self.limit.is_positive() {
            return Err(BudgetValidationError::NonPositiveLimit(self.limit));
        }
        Ok(())
    }
}

/// Validation errors for budgets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudgetValidationError {
    NonPositiveLimit(Money),
}

impl fmt::Display for BudgetValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveLimit(limit) => {
                write!(f, "Budget limit must be positive, got {}", limit)
            }
        }
    }
}

impl std::error::Error for BudgetValidationError {}
