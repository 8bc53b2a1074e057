//! pocketledger - local financial data engine
//!
//! The canonical state behind a personal-finance app: accounts,
//! transactions, categories, budgets, goals, and automation rules, held in
//! a versioned snapshot that persists (optionally encrypted) to a single
//! durable file.
//!
//! # Architecture
//!
//! - `config`: paths and user settings
//! - `error`: the typed error hierarchy
//! - `models`: entity definitions and the snapshot aggregate
//! - `engine`: integrity checking, duplicate detection, rule application
//! - `migrate`: forward-only schema upgrades over raw persisted documents
//! - `crypto`: Argon2id key derivation and AES-256-GCM envelopes
//! - `storage`: atomic snapshot persistence with rotating backups
//! - `store`: the [`Ledger`] state container and every mutation path
//!
//! # Example
//!
//! ```rust,no_run
//! use pocketledger::config::LedgerPaths;
//! use pocketledger::models::{AccountKind, Money, Transaction};
//! use pocketledger::Ledger;
//!
//! # fn main() -> Result<(), pocketledger::LedgerError> {
//! let mut ledger = Ledger::open(LedgerPaths::new()?, None)?;
//! let account = ledger.add_account("Checking", AccountKind::Checking, "USD")?;
//! let outcome = ledger.add_transaction(
//!     Transaction::new(
//!         account.id,
//!         chrono::Utc::now(),
//!         Money::from_cents(-450),
//!         "USD",
//!     )
//!     .with_note("ESPRESSO BAR 22"),
//! )?;
//! for candidate in &outcome.duplicates {
//!     println!("possible duplicate: {}", candidate.transaction_id);
//! }
//! ledger.flush()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod migrate;
pub mod models;
pub mod storage;
pub mod store;

pub use error::{LedgerError, LedgerResult};
pub use store::{BudgetStatus, CommitOutcome, Ledger, TransferOutcome};
