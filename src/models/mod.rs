//! Core data models
//!
//! Entities reference each other by typed id only; the snapshot owns every
//! collection and all cross-entity invariants are enforced by the engine
//! modules at mutation time.

pub mod account;
pub mod budget;
pub mod category;
pub mod goal;
pub mod ids;
pub mod money;
pub mod rule;
pub mod snapshot;
pub mod transaction;

pub use account::{Account, AccountKind};
pub use budget::{Budget, Period, RolloverPolicy};
pub use category::Category;
pub use goal::Goal;
pub use ids::{
    AccountId, BudgetId, CategoryId, GoalId, RuleId, TransactionId, TransferGroupId,
};
pub use money::Money;
pub use rule::{Action, AutomationRule, Condition};
pub use snapshot::{Snapshot, SCHEMA_VERSION};
pub use transaction::{Origin, SplitPortion, Tag, Transaction};
